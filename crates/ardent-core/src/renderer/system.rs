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

//! The render system facade.
//!
//! [`RenderSystem`] ties the staging pieces together and owns all per-context
//! state, so two systems over two backends never share anything:
//!
//! ```text
//!             ┌───────────────────────────────┐
//!             │          RenderSystem         │
//!             │                               │
//!  lock ────► │  StagingBuffer ◄─► Scratch    │
//!  unlock     │      table         pool       │
//!             │                               │
//!  render ──► │  FixedFunctionSelector        │
//!             │  world/view/projection        │
//!             └──────────────┬────────────────┘
//!                            ▼
//!                     dyn RenderBackend
//! ```
//!
//! Buffers are addressed by [`BufferHandle`]; the mapping to native
//! [`BufferId`](crate::renderer::api::BufferId)s stays internal. Draws whose
//! program stages are not fully bound are transparently wrapped in a
//! fixed-function emulation session.

use crate::math::Mat4;
use crate::renderer::api::{
    BufferHandle, BufferKind, BufferRegion, BufferUsage, DrawCommand, IndexFormat,
    IndexedDrawCommand, LockMode, ProgramDescriptor, ProgramHandle, ProgramStage, RenderOperation,
    RenderStats, StageMask, StagingConfig,
};
use crate::renderer::error::{BufferError, RenderError};
use crate::renderer::fixed_function::{EmulationCatalog, EmulationConstants, FixedFunctionSelector};
use crate::renderer::scratch::ScratchBufferPool;
use crate::renderer::staging::{LockRoute, StagingBuffer};
use crate::renderer::traits::RenderBackend;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns every buffer, the scratch pool, and the fixed-function state for one
/// rendering context.
#[derive(Debug)]
pub struct RenderSystem {
    backend: Arc<dyn RenderBackend>,
    config: StagingConfig,
    scratch: ScratchBufferPool,
    buffers: HashMap<BufferHandle, StagingBuffer>,
    next_buffer: usize,
    selector: FixedFunctionSelector,
    world: Mat4,
    view: Mat4,
    projection: Mat4,
    bound: StageMask,
    stats: RenderStats,
}

impl RenderSystem {
    /// Creates a render system over `backend`.
    ///
    /// `catalog` holds the backend's compiled built-in programs; `config`
    /// sizes the scratch pool and places the scratch/map threshold.
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        catalog: EmulationCatalog,
        config: StagingConfig,
    ) -> Self {
        log::info!(
            "Render system up: {} byte scratch pool, {} byte map threshold",
            config.scratch_capacity,
            config.map_threshold
        );
        let scratch = ScratchBufferPool::new(config.scratch_capacity);
        Self {
            backend,
            config,
            scratch,
            buffers: HashMap::new(),
            next_buffer: 1,
            selector: FixedFunctionSelector::new(catalog),
            world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            bound: StageMask::EMPTY,
            stats: RenderStats::default(),
        }
    }

    fn next_handle(&mut self) -> BufferHandle {
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        handle
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&StagingBuffer, BufferError> {
        self.buffers
            .get(&handle)
            .ok_or(BufferError::Unknown { handle })
    }

    /// Creates a vertex buffer of `vertex_count` vertices of `vertex_stride`
    /// bytes each.
    pub fn create_vertex_buffer(
        &mut self,
        vertex_stride: u32,
        vertex_count: u32,
        label: Option<&str>,
    ) -> Result<BufferHandle, RenderError> {
        let size = u64::from(vertex_stride) * u64::from(vertex_count);
        let buffer = StagingBuffer::create(
            self.backend.as_ref(),
            BufferKind::Vertex,
            size,
            BufferUsage::EMPTY,
            label,
        )?;
        let handle = self.next_handle();
        self.buffers.insert(handle, buffer);
        Ok(handle)
    }

    /// Creates an index buffer of `index_count` indices of `format`.
    pub fn create_index_buffer(
        &mut self,
        format: IndexFormat,
        index_count: u32,
        label: Option<&str>,
    ) -> Result<BufferHandle, RenderError> {
        let size = format.byte_size() * u64::from(index_count);
        let buffer = StagingBuffer::create(
            self.backend.as_ref(),
            BufferKind::Index(format),
            size,
            BufferUsage::EMPTY,
            label,
        )?;
        let handle = self.next_handle();
        self.buffers.insert(handle, buffer);
        Ok(handle)
    }

    /// Destroys a buffer, force-releasing any lock still open on it.
    pub fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<(), RenderError> {
        let buffer = self
            .buffers
            .remove(&handle)
            .ok_or(BufferError::Unknown { handle })?;
        buffer.destroy(&mut self.scratch, self.backend.as_ref())?;
        Ok(())
    }

    /// Total size of a buffer in bytes.
    pub fn buffer_size(&self, handle: BufferHandle) -> Result<u64, RenderError> {
        Ok(self.buffer(handle)?.size())
    }

    /// Whether a lock is outstanding on a buffer.
    pub fn is_buffer_locked(&self, handle: BufferHandle) -> Result<bool, RenderError> {
        Ok(self.buffer(handle)?.is_locked())
    }

    /// Locks a byte region of a buffer and returns its mutable staging view.
    ///
    /// The view stays valid until [`unlock_buffer`](Self::unlock_buffer);
    /// whether it lives in the scratch pool or a native mapping is decided by
    /// the region length against the configured threshold, with scratch
    /// exhaustion silently falling back to a mapping.
    pub fn lock_buffer(
        &mut self,
        handle: BufferHandle,
        region: BufferRegion,
        mode: LockMode,
    ) -> Result<&mut [u8], RenderError> {
        let buffer = self
            .buffers
            .get_mut(&handle)
            .ok_or(BufferError::Unknown { handle })?;
        let route = buffer.lock(
            &mut self.scratch,
            self.backend.as_ref(),
            &self.config,
            region,
            mode,
        )?;
        match route {
            LockRoute::Scratch => self.stats.scratch_locks += 1,
            LockRoute::Mapped => self.stats.mapped_locks += 1,
        }
        Ok(buffer.locked_bytes(&mut self.scratch)?)
    }

    /// Locks a buffer in its entirety.
    pub fn lock_buffer_full(
        &mut self,
        handle: BufferHandle,
        mode: LockMode,
    ) -> Result<&mut [u8], RenderError> {
        let size = self.buffer_size(handle)?;
        self.lock_buffer(handle, BufferRegion::new(0, size), mode)
    }

    /// Releases the lock on a buffer, flushing staged bytes if it was
    /// writable.
    pub fn unlock_buffer(&mut self, handle: BufferHandle) -> Result<(), RenderError> {
        let buffer = self
            .buffers
            .get_mut(&handle)
            .ok_or(BufferError::Unknown { handle })?;
        let staged = match (buffer.lock_route(), buffer.locked_region(), buffer.lock_mode()) {
            (Some(LockRoute::Scratch), Some(region), Some(mode)) if mode.is_writable() => {
                region.length
            }
            _ => 0,
        };
        buffer.unlock(&mut self.scratch, self.backend.as_ref())?;
        self.stats.bytes_staged += staged;
        Ok(())
    }

    /// Writes `data` into a buffer at `offset` through a short-lived lock.
    ///
    /// `discard_whole` promises the previous contents are disposable, which
    /// skips the read-before-write prefill on the scratch route.
    pub fn write_buffer_data(
        &mut self,
        handle: BufferHandle,
        offset: u64,
        data: &[u8],
        discard_whole: bool,
    ) -> Result<(), RenderError> {
        let mode = if discard_whole {
            LockMode::WriteDiscard
        } else {
            LockMode::ReadWrite
        };
        let region = BufferRegion::new(offset, data.len() as u64);
        self.lock_buffer(handle, region, mode)?.copy_from_slice(data);
        self.unlock_buffer(handle)
    }

    /// Reads a buffer at `offset` into `dst` through a short-lived lock.
    pub fn read_buffer_data(
        &mut self,
        handle: BufferHandle,
        offset: u64,
        dst: &mut [u8],
    ) -> Result<(), RenderError> {
        let region = BufferRegion::new(offset, dst.len() as u64);
        let bytes = self.lock_buffer(handle, region, LockMode::ReadOnly)?;
        dst.copy_from_slice(bytes);
        self.unlock_buffer(handle)
    }

    /// Copies `length` bytes between two distinct buffers.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_buffer(
        &mut self,
        source: BufferHandle,
        dest: BufferHandle,
        source_offset: u64,
        dest_offset: u64,
        length: u64,
        discard_whole: bool,
    ) -> Result<(), RenderError> {
        if source == dest {
            return Err(BufferError::SelfCopy { handle: source }.into());
        }
        let mut src = self
            .buffers
            .remove(&source)
            .ok_or(BufferError::Unknown { handle: source })?;
        let result = match self.buffers.get_mut(&dest) {
            None => Err(BufferError::Unknown { handle: dest }.into()),
            Some(dst) => dst
                .copy_from(
                    &mut src,
                    &mut self.scratch,
                    self.backend.as_ref(),
                    &self.config,
                    source_offset,
                    dest_offset,
                    length,
                    discard_whole,
                )
                .map_err(RenderError::from),
        };
        self.buffers.insert(source, src);
        result
    }

    /// Compiles a program through the backend.
    pub fn create_program(
        &self,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramHandle, RenderError> {
        Ok(self.backend.create_program(descriptor)?)
    }

    /// Destroys a compiled program.
    pub fn destroy_program(&self, handle: ProgramHandle) -> Result<(), RenderError> {
        Ok(self.backend.destroy_program(handle)?)
    }

    /// Binds an application program to a stage.
    ///
    /// Stages with an application program are left alone by fixed-function
    /// emulation; once both stages are bound, draws go through unemulated.
    pub fn bind_program(
        &mut self,
        stage: ProgramStage,
        handle: ProgramHandle,
    ) -> Result<(), RenderError> {
        self.backend.bind_program(stage, handle)?;
        self.bound.insert(stage.mask());
        Ok(())
    }

    /// Removes the application program from a stage.
    pub fn unbind_program(&mut self, stage: ProgramStage) -> Result<(), RenderError> {
        self.backend.unbind_program(stage)?;
        self.bound.remove(stage.mask());
        Ok(())
    }

    /// Pushes constants to the application program bound at `stage`.
    pub fn set_program_constants(
        &self,
        stage: ProgramStage,
        data: &[u8],
    ) -> Result<(), RenderError> {
        Ok(self.backend.set_program_constants(stage, data)?)
    }

    /// Sets the model-to-world transform used by emulated draws.
    pub fn set_world_matrix(&mut self, world: Mat4) {
        self.world = world;
    }

    /// Sets the world-to-camera transform used by emulated draws.
    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Sets the camera-to-clip transform used by emulated draws.
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// The current model-to-world transform.
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    /// The current world-to-camera transform.
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// The current camera-to-clip transform.
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Counters accumulated since the last [`reset_stats`](Self::reset_stats).
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Zeroes all counters, typically at a frame boundary.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Issues one draw, emulating whichever program stages the application
    /// left unbound.
    ///
    /// The referenced buffers must exist, be of the right kind, and have no
    /// outstanding lock. When emulation kicks in, the current transform
    /// matrices are pushed to the built-in vertex program and the borrowed
    /// stages are released again before this returns, whether or not the draw
    /// itself succeeded.
    pub fn render(&mut self, op: &RenderOperation) -> Result<(), RenderError> {
        let vertex = self.buffer(op.vertex_buffer)?;
        if !matches!(vertex.kind(), BufferKind::Vertex) {
            return Err(BufferError::WrongKind {
                handle: op.vertex_buffer,
                expected: "vertex",
            }
            .into());
        }
        if vertex.is_locked() {
            return Err(BufferError::StillLocked { id: vertex.id() }.into());
        }
        let vertex_id = vertex.id();

        let indexed = match &op.indexed {
            None => None,
            Some(draw) => {
                let index = self.buffer(draw.buffer)?;
                let format = match index.kind() {
                    BufferKind::Index(format) => format,
                    BufferKind::Vertex => {
                        return Err(BufferError::WrongKind {
                            handle: draw.buffer,
                            expected: "index",
                        }
                        .into());
                    }
                };
                if index.is_locked() {
                    return Err(BufferError::StillLocked { id: index.id() }.into());
                }
                Some(IndexedDrawCommand {
                    buffer: index.id(),
                    format,
                    index_count: draw.index_count,
                })
            }
        };

        let command = DrawCommand {
            vertex_buffer: vertex_id,
            layout: op.layout.clone(),
            vertex_count: op.vertex_count,
            indexed,
        };

        let emulated = !self.bound.contains(StageMask::ALL);
        if emulated {
            let constants = EmulationConstants::new(&self.world, &self.view, &self.projection);
            self.selector.begin(
                self.backend.as_ref(),
                &op.layout.signature(),
                op.texturing_enabled,
                &constants,
                self.bound,
            )?;
        }

        let drawn = self.backend.draw(&command).map_err(RenderError::from);
        let ended = if emulated {
            self.selector.end(self.backend.as_ref()).map_err(RenderError::from)
        } else {
            Ok(())
        };
        drawn?;
        ended?;

        self.stats.draw_calls += 1;
        if emulated {
            self.stats.emulated_draws += 1;
        }
        Ok(())
    }
}

impl Drop for RenderSystem {
    fn drop(&mut self) {
        if self.buffers.is_empty() {
            return;
        }
        log::warn!(
            "Render system dropped with {} live buffer(s)",
            self.buffers.len()
        );
        for (handle, buffer) in self.buffers.drain() {
            if let Err(error) = buffer.destroy(&mut self.scratch, self.backend.as_ref()) {
                log::warn!("Failed to destroy {:?} during shutdown: {}", handle, error);
            }
        }
    }
}
