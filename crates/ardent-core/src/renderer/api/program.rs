// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Opaque program handles and the pipeline stages they bind to.
//!
//! Program source handling is deliberately thin: the core hands source text
//! to the backend and receives a handle back. Compilation, reflection, and
//! caching stay behind the backend boundary.

use crate::ardent_bitflags;
use std::borrow::Cow;

/// An opaque handle to a compiled program owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub usize);

/// The pipeline stage a program runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStage {
    /// Per-vertex processing.
    Vertex,
    /// Per-fragment processing.
    Fragment,
}

impl ProgramStage {
    /// The single-bit mask for this stage.
    #[inline]
    pub const fn mask(self) -> StageMask {
        match self {
            ProgramStage::Vertex => StageMask::VERTEX,
            ProgramStage::Fragment => StageMask::FRAGMENT,
        }
    }
}

ardent_bitflags! {
    /// A set of pipeline stages, used to track which stages hold bindings.
    pub struct StageMask: u8 {
        /// The vertex stage.
        const VERTEX = 1 << 0;
        /// The fragment stage.
        const FRAGMENT = 1 << 1;
    }
}

impl StageMask {
    /// Both programmable stages.
    pub const ALL: Self = Self::VERTEX.with(Self::FRAGMENT);
}

/// A descriptor used to register a program with a backend.
#[derive(Debug, Clone)]
pub struct ProgramDescriptor<'a> {
    /// An optional debug label for the program.
    pub label: Option<Cow<'a, str>>,
    /// The stage the program is written for.
    pub stage: ProgramStage,
    /// Backend-dialect source text.
    pub source: Cow<'a, str>,
    /// Name of the entry function inside `source`.
    pub entry_point: Cow<'a, str>,
}
