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

//! Draw submission types.
//!
//! [`RenderOperation`] is what the engine hands to
//! [`RenderSystem::render`](crate::renderer::RenderSystem::render); it speaks
//! in engine-side [`BufferHandle`]s. [`DrawCommand`] is the translated form a
//! [`RenderBackend`](crate::renderer::traits::RenderBackend) receives, with
//! native [`BufferId`]s and resolved index formats.

use super::buffer::{BufferHandle, BufferId, IndexFormat};
use super::vertex::VertexLayout;

/// An indexed-draw attachment for a [`RenderOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDraw {
    /// The index buffer to read from. Must have been created as an index buffer.
    pub buffer: BufferHandle,
    /// Number of indices to draw.
    pub index_count: u32,
}

/// A single draw request as submitted by the engine.
#[derive(Debug, Clone)]
pub struct RenderOperation {
    /// The vertex buffer feeding the draw.
    pub vertex_buffer: BufferHandle,
    /// How the vertex buffer's bytes are laid out.
    pub layout: VertexLayout,
    /// Number of vertices available; the draw consumes all of them unless
    /// `indexed` is present.
    pub vertex_count: u32,
    /// Present for indexed draws.
    pub indexed: Option<IndexedDraw>,
    /// Whether the fixed-function texture stage is enabled for this draw.
    ///
    /// Only consulted when emulation selects a fragment program; application
    /// programs ignore it.
    pub texturing_enabled: bool,
}

/// The resolved index attachment inside a [`DrawCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDrawCommand {
    /// Native id of the index buffer.
    pub buffer: BufferId,
    /// Element width of the index data.
    pub format: IndexFormat,
    /// Number of indices to draw.
    pub index_count: u32,
}

/// A draw request translated into backend terms.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    /// Native id of the vertex buffer.
    pub vertex_buffer: BufferId,
    /// How the vertex buffer's bytes are laid out.
    pub layout: VertexLayout,
    /// Number of vertices in the stream.
    pub vertex_count: u32,
    /// Present for indexed draws.
    pub indexed: Option<IndexedDrawCommand>,
}
