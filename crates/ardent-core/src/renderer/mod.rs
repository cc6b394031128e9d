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

//! The backend-agnostic rendering core.
//!
//! This module owns the "what" of rendering: descriptors and handles in
//! [`api`], the [`RenderBackend`] contract a concrete backend implements, and
//! the machinery layered on top of that contract. The "how" lives in a
//! backend crate such as `ardent-infra`, which maps the contract onto a real
//! graphics API.
//!
//! The layered pieces are:
//!
//! * [`scratch`] - a fixed arena of linked blocks serving small, short-lived
//!   staging allocations.
//! * [`staging`] - per-buffer lock bookkeeping that routes each lock through
//!   the scratch pool or a native mapping.
//! * [`fixed_function`] - built-in program selection for draws that arrive
//!   without a full set of application programs.
//! * [`system`] - the [`RenderSystem`] facade tying the above to one backend
//!   and holding all per-context state.

pub mod api;
pub mod error;
pub mod fixed_function;
pub mod scratch;
pub mod staging;
pub mod system;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the most important types for easier use.
pub use self::api::*;
pub use self::error::{BackendError, BufferError, EmulationError, RenderError, ScratchError};
pub use self::fixed_function::{
    EmulationCatalog, EmulationConstants, FixedFunctionSelector, FragmentVariant, SignatureKind,
};
pub use self::scratch::{ScratchBufferPool, ScratchHandle, SCRATCH_BLOCK_HEADER};
pub use self::staging::{LockRoute, StagingBuffer};
pub use self::system::RenderSystem;
pub use self::traits::RenderBackend;
