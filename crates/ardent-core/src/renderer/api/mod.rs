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

//! Shared data structures of the rendering API.

pub mod buffer;
pub mod command;
pub mod program;
pub mod settings;
pub mod stats;
pub mod vertex;

pub use buffer::{
    BufferDescriptor, BufferHandle, BufferId, BufferKind, BufferRegion, BufferUsage, IndexFormat,
    LockMode,
};
pub use command::{DrawCommand, IndexedDraw, IndexedDrawCommand, RenderOperation};
pub use program::{ProgramDescriptor, ProgramHandle, ProgramStage, StageMask};
pub use settings::StagingConfig;
pub use stats::RenderStats;
pub use vertex::{
    DuplicateAttribute, VertexAttribute, VertexAttributeFormat, VertexLayout, VertexSemantic,
    VertexSignature,
};
