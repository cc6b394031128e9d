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

use crate::renderer::api::*;
use crate::renderer::error::BackendError;
use std::fmt::Debug;

/// The outbound contract between the render system and a native graphics API.
///
/// Every operation is synchronous: when a call returns, its effect is visible
/// to subsequent calls on the same backend. Implementations are free to batch
/// work internally as long as that ordering guarantee holds.
pub trait RenderBackend: Send + Sync + Debug + 'static {
    /// Creates a native buffer.
    /// ## Arguments
    /// * `descriptor` - A reference to a `BufferDescriptor` with the size and usage of the buffer.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, BackendError>;

    /// Destroys a native buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to be destroyed.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), BackendError>;

    /// Replaces a sub-range of a buffer with the given bytes.
    ///
    /// When `discard_whole` is `true` the caller asserts that `data` replaces
    /// the buffer's entire contents, which lets the backend orphan the old
    /// storage instead of synchronizing with in-flight reads.
    /// ## Arguments
    /// * `id` - The ID of the buffer to write to.
    /// * `offset` - The offset in the buffer where the data will be written.
    /// * `data` - A slice of bytes containing the data to be written.
    /// * `discard_whole` - Whether the write replaces the whole buffer.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn write_buffer(
        &self,
        id: BufferId,
        offset: u64,
        data: &[u8],
        discard_whole: bool,
    ) -> Result<(), BackendError>;

    /// Reads a sub-range of a buffer into `dst`.
    /// ## Arguments
    /// * `id` - The ID of the buffer to read from.
    /// * `offset` - The offset in the buffer where the read starts.
    /// * `dst` - The destination slice; its length is the number of bytes read.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn read_buffer(&self, id: BufferId, offset: u64, dst: &mut [u8]) -> Result<(), BackendError>;

    /// Maps a region of a buffer for direct access.
    ///
    /// The returned bytes hold the region's current contents, except under
    /// [`LockMode::WriteDiscard`] where they start out zeroed and the backend
    /// may orphan the previous storage. The caller must hand the bytes back
    /// through [`unmap_buffer`](RenderBackend::unmap_buffer).
    /// ## Arguments
    /// * `id` - The ID of the buffer to map.
    /// * `region` - The byte range to map.
    /// * `mode` - The access mode the caller locked with.
    /// ## Returns
    /// A `Result` containing the mapped bytes or an error if mapping fails.
    fn map_buffer(
        &self,
        id: BufferId,
        region: BufferRegion,
        mode: LockMode,
    ) -> Result<Vec<u8>, BackendError>;

    /// Ends a mapping started by [`map_buffer`](RenderBackend::map_buffer).
    ///
    /// For writable modes the backend commits `data` back into the mapped
    /// region; for [`LockMode::ReadOnly`] the bytes are discarded.
    /// ## Arguments
    /// * `id` - The ID of the mapped buffer.
    /// * `region` - The byte range that was mapped.
    /// * `mode` - The access mode the region was mapped with.
    /// * `data` - The bytes returned by `map_buffer`, possibly modified.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn unmap_buffer(
        &self,
        id: BufferId,
        region: BufferRegion,
        mode: LockMode,
        data: &[u8],
    ) -> Result<(), BackendError>;

    /// Registers a program from backend-dialect source.
    /// ## Arguments
    /// * `descriptor` - A reference to a `ProgramDescriptor` with the stage, source, and entry point.
    /// ## Returns
    /// A `Result` containing the handle of the created program or an error if the creation fails.
    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, BackendError>;

    /// Destroys a program.
    /// ## Arguments
    /// * `handle` - The handle of the program to be destroyed.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn destroy_program(&self, handle: ProgramHandle) -> Result<(), BackendError>;

    /// Binds a program to a pipeline stage. The binding persists until the
    /// stage is rebound or unbound.
    /// ## Arguments
    /// * `stage` - The stage to bind to.
    /// * `handle` - The program to bind.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn bind_program(&self, stage: ProgramStage, handle: ProgramHandle)
        -> Result<(), BackendError>;

    /// Clears the binding of a pipeline stage. Unbinding an already-empty
    /// stage is a no-op.
    /// ## Arguments
    /// * `stage` - The stage to clear.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn unbind_program(&self, stage: ProgramStage) -> Result<(), BackendError>;

    /// Uploads a constant block for the program bound at `stage`.
    /// ## Arguments
    /// * `stage` - The stage whose constants are being set.
    /// * `data` - The raw constant block bytes.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn set_program_constants(&self, stage: ProgramStage, data: &[u8]) -> Result<(), BackendError>;

    /// Executes a draw with the currently bound programs.
    /// ## Arguments
    /// * `command` - The translated draw command with native buffer ids.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn draw(&self, command: &DrawCommand) -> Result<(), BackendError>;
}
