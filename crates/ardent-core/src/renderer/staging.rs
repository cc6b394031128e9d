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

//! CPU-side staging for lockable GPU buffers.
//!
//! A [`StagingBuffer`] wraps one native buffer and mediates every lock through
//! one of two routes:
//!
//! ```text
//!  lock(region, mode)
//!        │
//!        ├── region.length < map_threshold ──► ScratchBufferPool
//!        │                                          │
//!        │                                 hit ─────┤───── exhausted
//!        │                                          ▼            │
//!        │                                   Scratch lock        │
//!        │                                                       ▼
//!        └── region.length >= map_threshold ──────────────► native map
//! ```
//!
//! A scratch lock borrows a block from the shared [`ScratchBufferPool`]; on
//! unlock the staged bytes are flushed with a sub-range write and the block is
//! returned to the pool. A native map asks the backend for the mapping
//! directly. Either way the caller sees the same mutable byte slice, so the
//! route is an internal detail apart from its cost.
//!
//! The pool is borrowed mutably for the duration of each call rather than
//! owned here, which keeps one pool shared across every buffer of a
//! [`RenderSystem`](crate::renderer::RenderSystem) without interior locking.

use crate::renderer::api::{
    BufferDescriptor, BufferId, BufferKind, BufferRegion, BufferUsage, LockMode, StagingConfig,
};
use crate::renderer::error::BufferError;
use crate::renderer::scratch::{ScratchBufferPool, ScratchHandle};
use crate::renderer::traits::RenderBackend;
use std::borrow::Cow;

/// The route a lock was served through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockRoute {
    /// The lock is backed by a block of the shared scratch pool.
    Scratch,
    /// The lock is backed by a native mapping of the buffer itself.
    Mapped,
}

/// Where the bytes of the current lock live.
#[derive(Debug)]
enum LockState {
    Unlocked,
    Scratch {
        handle: ScratchHandle,
        region: BufferRegion,
        mode: LockMode,
    },
    Mapped {
        bytes: Vec<u8>,
        region: BufferRegion,
        mode: LockMode,
    },
}

/// A native buffer plus the CPU-side state needed to lock it.
///
/// At most one lock is outstanding per buffer. Locking an already locked
/// buffer or unlocking an unlocked one is a caller bug and reported as an
/// error; running out of scratch space is not, and silently falls back to a
/// native mapping.
#[derive(Debug)]
pub struct StagingBuffer {
    id: BufferId,
    kind: BufferKind,
    size: u64,
    usage: BufferUsage,
    state: LockState,
}

impl StagingBuffer {
    /// Creates the native buffer and wraps it for staging.
    ///
    /// Transfer usages are always added so the flush and prefill paths work,
    /// and the binding usage matching `kind` is added so the buffer can be
    /// drawn from.
    pub fn create(
        backend: &dyn RenderBackend,
        kind: BufferKind,
        size: u64,
        usage: BufferUsage,
        label: Option<&str>,
    ) -> Result<Self, BufferError> {
        let mut usage = usage | BufferUsage::COPY_SRC | BufferUsage::COPY_DST;
        usage.insert(match kind {
            BufferKind::Vertex => BufferUsage::VERTEX,
            BufferKind::Index(_) => BufferUsage::INDEX,
        });
        let descriptor = BufferDescriptor {
            label: label.map(Cow::Borrowed),
            size,
            usage,
        };
        let id = backend.create_buffer(&descriptor)?;
        Ok(Self {
            id,
            kind,
            size,
            usage,
            state: LockState::Unlocked,
        })
    }

    /// The backend identifier of the underlying native buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// What the buffer holds.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Total size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The usages the native buffer was created with.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Whether a lock is currently outstanding.
    pub fn is_locked(&self) -> bool {
        !matches!(self.state, LockState::Unlocked)
    }

    /// The route of the outstanding lock, if any.
    pub fn lock_route(&self) -> Option<LockRoute> {
        match self.state {
            LockState::Unlocked => None,
            LockState::Scratch { .. } => Some(LockRoute::Scratch),
            LockState::Mapped { .. } => Some(LockRoute::Mapped),
        }
    }

    /// The region of the outstanding lock, if any.
    pub fn locked_region(&self) -> Option<BufferRegion> {
        match self.state {
            LockState::Unlocked => None,
            LockState::Scratch { region, .. } | LockState::Mapped { region, .. } => Some(region),
        }
    }

    /// The mode of the outstanding lock, if any.
    pub fn lock_mode(&self) -> Option<LockMode> {
        match self.state {
            LockState::Unlocked => None,
            LockState::Scratch { mode, .. } | LockState::Mapped { mode, .. } => Some(mode),
        }
    }

    /// Locks `region` for CPU access and reports which route served it.
    ///
    /// Regions shorter than [`StagingConfig::map_threshold`] are staged in the
    /// scratch pool when a block is available; the block is prefilled with the
    /// buffer's current contents unless `mode` discards them. Longer regions,
    /// and any region the exhausted pool cannot serve, go through a native
    /// mapping instead.
    ///
    /// ## Arguments
    ///
    /// * `pool` - The shared scratch pool to stage small locks in.
    /// * `backend` - The backend owning the native buffer.
    /// * `config` - Tunables deciding the scratch/map split.
    /// * `region` - The byte range to lock; must lie within the buffer.
    /// * `mode` - The access the caller needs.
    ///
    /// ## Returns
    ///
    /// The [`LockRoute`] taken, or an error if the buffer is already locked,
    /// the region is out of range, or the backend refuses the mapping.
    pub fn lock(
        &mut self,
        pool: &mut ScratchBufferPool,
        backend: &dyn RenderBackend,
        config: &StagingConfig,
        region: BufferRegion,
        mode: LockMode,
    ) -> Result<LockRoute, BufferError> {
        if self.is_locked() {
            return Err(BufferError::AlreadyLocked { id: self.id });
        }
        if !region.fits_within(self.size) {
            return Err(BufferError::OutOfBounds {
                id: self.id,
                region,
                size: self.size,
            });
        }

        if region.length < config.map_threshold {
            if let Some(handle) = pool.allocate(region.length as usize) {
                if !mode.discards_contents() {
                    let payload = pool.payload_mut(handle)?;
                    let staged = &mut payload[..region.length as usize];
                    if let Err(error) = backend.read_buffer(self.id, region.offset, staged) {
                        if let Err(stale) = pool.deallocate(handle) {
                            log::warn!(
                                "Leaked scratch block after failed prefill of {:?}: {}",
                                self.id,
                                stale
                            );
                        }
                        return Err(error.into());
                    }
                }
                self.state = LockState::Scratch {
                    handle,
                    region,
                    mode,
                };
                return Ok(LockRoute::Scratch);
            }
            log::debug!(
                "Scratch pool exhausted ({} bytes requested for {:?}); mapping natively",
                region.length,
                self.id
            );
        }

        let bytes = backend.map_buffer(self.id, region, mode)?;
        self.state = LockState::Mapped {
            bytes,
            region,
            mode,
        };
        Ok(LockRoute::Mapped)
    }

    /// The mutable byte view of the outstanding lock.
    ///
    /// `pool` must be the same pool the lock was taken against; a scratch lock
    /// resolves its bytes there, a mapped lock owns them directly.
    pub fn locked_bytes<'a>(
        &'a mut self,
        pool: &'a mut ScratchBufferPool,
    ) -> Result<&'a mut [u8], BufferError> {
        match &mut self.state {
            LockState::Unlocked => Err(BufferError::NotLocked { id: self.id }),
            LockState::Scratch { handle, region, .. } => {
                let payload = pool.payload_mut(*handle)?;
                Ok(&mut payload[..region.length as usize])
            }
            LockState::Mapped { bytes, .. } => Ok(bytes.as_mut_slice()),
        }
    }

    /// Releases the outstanding lock, committing staged bytes if it was
    /// writable.
    ///
    /// A writable scratch lock is flushed with a sub-range write; when the
    /// locked region covers the whole buffer the write carries the
    /// whole-buffer discard hint so the backend may replace the allocation
    /// outright. The scratch block is returned to the pool even when the
    /// flush fails, so a backend error never strands pool space.
    pub fn unlock(
        &mut self,
        pool: &mut ScratchBufferPool,
        backend: &dyn RenderBackend,
    ) -> Result<(), BufferError> {
        match std::mem::replace(&mut self.state, LockState::Unlocked) {
            LockState::Unlocked => Err(BufferError::NotLocked { id: self.id }),
            LockState::Scratch {
                handle,
                region,
                mode,
            } => {
                let flush = if mode.is_writable() {
                    pool.payload(handle)
                        .map_err(BufferError::from)
                        .and_then(|payload| {
                            let staged = &payload[..region.length as usize];
                            backend
                                .write_buffer(
                                    self.id,
                                    region.offset,
                                    staged,
                                    region.covers(self.size),
                                )
                                .map_err(BufferError::from)
                        })
                } else {
                    Ok(())
                };
                let released = pool.deallocate(handle).map_err(BufferError::from);
                flush?;
                released
            }
            LockState::Mapped {
                bytes,
                region,
                mode,
            } => backend
                .unmap_buffer(self.id, region, mode, &bytes)
                .map_err(BufferError::from),
        }
    }

    /// Destroys the native buffer, force-releasing any outstanding lock.
    ///
    /// Staged bytes of a still-open lock are dropped without being committed;
    /// a warning is logged because this usually indicates a missing `unlock`.
    pub fn destroy(
        mut self,
        pool: &mut ScratchBufferPool,
        backend: &dyn RenderBackend,
    ) -> Result<(), BufferError> {
        match std::mem::replace(&mut self.state, LockState::Unlocked) {
            LockState::Unlocked => {}
            LockState::Scratch { handle, .. } => {
                log::warn!(
                    "Destroying {:?} while scratch-locked; staged bytes dropped",
                    self.id
                );
                if let Err(error) = pool.deallocate(handle) {
                    log::warn!("Failed to release scratch block of {:?}: {}", self.id, error);
                }
            }
            LockState::Mapped { bytes, region, .. } => {
                log::warn!(
                    "Destroying {:?} while mapped; staged bytes dropped",
                    self.id
                );
                if let Err(error) =
                    backend.unmap_buffer(self.id, region, LockMode::ReadOnly, &bytes)
                {
                    log::warn!("Failed to unmap {:?} during destroy: {}", self.id, error);
                }
            }
        }
        backend.destroy_buffer(self.id).map_err(BufferError::from)
    }

    /// Writes `data` at `offset` through a short-lived lock.
    ///
    /// Passing `discard_whole` promises the previous contents are not needed,
    /// which skips the read-before-write prefill on the scratch route.
    pub fn write_data(
        &mut self,
        pool: &mut ScratchBufferPool,
        backend: &dyn RenderBackend,
        config: &StagingConfig,
        offset: u64,
        data: &[u8],
        discard_whole: bool,
    ) -> Result<(), BufferError> {
        let region = BufferRegion::new(offset, data.len() as u64);
        let mode = if discard_whole {
            LockMode::WriteDiscard
        } else {
            LockMode::ReadWrite
        };
        self.lock(pool, backend, config, region, mode)?;
        self.locked_bytes(pool)?.copy_from_slice(data);
        self.unlock(pool, backend)
    }

    /// Reads the buffer at `offset` into `dst` through a short-lived lock.
    pub fn read_data(
        &mut self,
        pool: &mut ScratchBufferPool,
        backend: &dyn RenderBackend,
        config: &StagingConfig,
        offset: u64,
        dst: &mut [u8],
    ) -> Result<(), BufferError> {
        let region = BufferRegion::new(offset, dst.len() as u64);
        self.lock(pool, backend, config, region, LockMode::ReadOnly)?;
        dst.copy_from_slice(self.locked_bytes(pool)?);
        self.unlock(pool, backend)
    }

    /// Copies `length` bytes from `source` into this buffer.
    ///
    /// The source is locked read-only and the destination through
    /// [`write_data`](Self::write_data), so both locks are released before
    /// this returns.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_from(
        &mut self,
        source: &mut StagingBuffer,
        pool: &mut ScratchBufferPool,
        backend: &dyn RenderBackend,
        config: &StagingConfig,
        source_offset: u64,
        dest_offset: u64,
        length: u64,
        discard_whole: bool,
    ) -> Result<(), BufferError> {
        let mut staged = vec![0u8; length as usize];
        source.read_data(pool, backend, config, source_offset, &mut staged)?;
        self.write_data(pool, backend, config, dest_offset, &staged, discard_whole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::{BackendEvent, MockBackend};

    fn test_config() -> StagingConfig {
        StagingConfig {
            scratch_capacity: 512,
            map_threshold: 64,
        }
    }

    fn make_buffer(backend: &MockBackend, size: u64) -> StagingBuffer {
        StagingBuffer::create(backend, BufferKind::Vertex, size, BufferUsage::EMPTY, None)
            .expect("buffer creation should succeed")
    }

    fn reads(backend: &MockBackend) -> usize {
        backend.count(|e| matches!(e, BackendEvent::Read { .. }))
    }

    fn writes(backend: &MockBackend) -> usize {
        backend.count(|e| matches!(e, BackendEvent::Write { .. }))
    }

    #[test]
    fn create_adds_transfer_and_binding_usages() {
        let backend = MockBackend::new();
        let vertex = make_buffer(&backend, 64);
        assert!(vertex.usage().contains(BufferUsage::VERTEX));
        assert!(vertex.usage().contains(BufferUsage::COPY_SRC));
        assert!(vertex.usage().contains(BufferUsage::COPY_DST));

        let index = StagingBuffer::create(
            &backend,
            BufferKind::Index(crate::renderer::api::IndexFormat::Uint16),
            64,
            BufferUsage::EMPTY,
            None,
        )
        .unwrap();
        assert!(index.usage().contains(BufferUsage::INDEX));
        assert!(!index.usage().contains(BufferUsage::VERTEX));
    }

    #[test]
    fn map_threshold_is_exclusive() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 256);

        let route = buffer
            .lock(
                &mut pool,
                &backend,
                &config,
                BufferRegion::new(0, 63),
                LockMode::ReadWrite,
            )
            .unwrap();
        assert_eq!(route, LockRoute::Scratch);
        buffer.unlock(&mut pool, &backend).unwrap();

        let route = buffer
            .lock(
                &mut pool,
                &backend,
                &config,
                BufferRegion::new(0, 64),
                LockMode::ReadWrite,
            )
            .unwrap();
        assert_eq!(route, LockRoute::Mapped);
        buffer.unlock(&mut pool, &backend).unwrap();
        assert_eq!(pool.used_bytes(), 0);
    }

    #[test]
    fn read_write_lock_prefills_from_native_contents() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);

        let pattern: Vec<u8> = (0u8..32).collect();
        buffer
            .write_data(&mut pool, &backend, &config, 0, &pattern, true)
            .unwrap();
        backend.clear_events();

        buffer
            .lock(
                &mut pool,
                &backend,
                &config,
                BufferRegion::new(8, 16),
                LockMode::ReadWrite,
            )
            .unwrap();
        assert_eq!(reads(&backend), 1);
        assert_eq!(buffer.locked_bytes(&mut pool).unwrap(), &pattern[8..24]);
        buffer.unlock(&mut pool, &backend).unwrap();
    }

    #[test]
    fn write_discard_lock_skips_prefill() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);

        buffer
            .lock(
                &mut pool,
                &backend,
                &config,
                BufferRegion::new(0, 32),
                LockMode::WriteDiscard,
            )
            .unwrap();
        assert_eq!(reads(&backend), 0);
        buffer.locked_bytes(&mut pool).unwrap().fill(0xAB);
        buffer.unlock(&mut pool, &backend).unwrap();
        assert_eq!(backend.buffer_contents(buffer.id()), vec![0xAB; 32]);
    }

    #[test]
    fn read_only_unlock_flushes_nothing() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);
        backend.clear_events();

        buffer
            .lock(
                &mut pool,
                &backend,
                &config,
                BufferRegion::new(0, 16),
                LockMode::ReadOnly,
            )
            .unwrap();
        buffer.unlock(&mut pool, &backend).unwrap();
        assert_eq!(writes(&backend), 0);
        assert_eq!(pool.used_bytes(), 0);
    }

    #[test]
    fn full_cover_flush_carries_the_discard_hint() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);

        buffer
            .lock(
                &mut pool,
                &backend,
                &config,
                BufferRegion::new(0, 32),
                LockMode::WriteDiscard,
            )
            .unwrap();
        buffer.locked_bytes(&mut pool).unwrap().fill(0x11);
        buffer.unlock(&mut pool, &backend).unwrap();

        assert_eq!(
            backend.count(|e| matches!(
                e,
                BackendEvent::Write {
                    discard_whole: true,
                    ..
                }
            )),
            1
        );

        // A partial flush must not claim to replace the whole buffer.
        backend.clear_events();
        buffer
            .write_data(&mut pool, &backend, &config, 8, &[0x22; 8], false)
            .unwrap();
        assert_eq!(
            backend.count(|e| matches!(
                e,
                BackendEvent::Write {
                    discard_whole: false,
                    ..
                }
            )),
            1
        );
    }

    #[test]
    fn partial_write_preserves_surrounding_bytes() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);

        buffer
            .write_data(&mut pool, &backend, &config, 0, &[0xAA; 32], true)
            .unwrap();
        buffer
            .write_data(&mut pool, &backend, &config, 8, &[0x55; 8], false)
            .unwrap();

        let mut contents = [0u8; 32];
        buffer
            .read_data(&mut pool, &backend, &config, 0, &mut contents)
            .unwrap();
        assert_eq!(&contents[..8], &[0xAA; 8]);
        assert_eq!(&contents[8..16], &[0x55; 8]);
        assert_eq!(&contents[16..], &[0xAA; 16]);
    }

    #[test]
    fn staged_writes_round_trip_through_both_routes() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 256);

        // Large enough to map natively.
        let big: Vec<u8> = (0..128u32).map(|i| (i * 3) as u8).collect();
        buffer
            .write_data(&mut pool, &backend, &config, 0, &big, false)
            .unwrap();

        // Small enough to stage in scratch.
        let small = [0xF0u8; 16];
        buffer
            .write_data(&mut pool, &backend, &config, 128, &small, false)
            .unwrap();

        let mut head = [0u8; 8];
        buffer
            .read_data(&mut pool, &backend, &config, 4, &mut head)
            .unwrap();
        assert_eq!(&head, &big[4..12]);

        let mut tail = [0u8; 16];
        buffer
            .read_data(&mut pool, &backend, &config, 128, &mut tail)
            .unwrap();
        assert_eq!(&tail, &small);
    }

    #[test]
    fn exhausted_pool_falls_back_to_native_map() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let region = BufferRegion::new(0, 48);

        // Eight 48-byte locks tile the 512-byte arena exactly.
        let mut held: Vec<StagingBuffer> = (0..8).map(|_| make_buffer(&backend, 48)).collect();
        for buffer in &mut held {
            let route = buffer
                .lock(&mut pool, &backend, &config, region, LockMode::WriteDiscard)
                .unwrap();
            assert_eq!(route, LockRoute::Scratch);
        }

        let mut overflow = make_buffer(&backend, 48);
        let route = overflow
            .lock(&mut pool, &backend, &config, region, LockMode::WriteDiscard)
            .unwrap();
        assert_eq!(route, LockRoute::Mapped);
        overflow.unlock(&mut pool, &backend).unwrap();

        // Releasing one scratch lock makes the pool serve small locks again.
        held[0].unlock(&mut pool, &backend).unwrap();
        let route = overflow
            .lock(&mut pool, &backend, &config, region, LockMode::WriteDiscard)
            .unwrap();
        assert_eq!(route, LockRoute::Scratch);
        overflow.unlock(&mut pool, &backend).unwrap();
        for buffer in &mut held[1..] {
            buffer.unlock(&mut pool, &backend).unwrap();
        }
        assert_eq!(pool.used_bytes(), 0);
    }

    #[test]
    fn double_lock_is_rejected() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);
        let region = BufferRegion::new(0, 16);

        buffer
            .lock(&mut pool, &backend, &config, region, LockMode::ReadWrite)
            .unwrap();
        let second = buffer.lock(&mut pool, &backend, &config, region, LockMode::ReadOnly);
        assert!(matches!(second, Err(BufferError::AlreadyLocked { .. })));

        buffer.unlock(&mut pool, &backend).unwrap();
        let again = buffer.unlock(&mut pool, &backend);
        assert!(matches!(again, Err(BufferError::NotLocked { .. })));
    }

    #[test]
    fn out_of_range_lock_is_rejected() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 256);

        let past_end = buffer.lock(
            &mut pool,
            &backend,
            &config,
            BufferRegion::new(240, 32),
            LockMode::ReadWrite,
        );
        assert!(matches!(past_end, Err(BufferError::OutOfBounds { .. })));

        let empty = buffer.lock(
            &mut pool,
            &backend,
            &config,
            BufferRegion::new(0, 0),
            LockMode::ReadWrite,
        );
        assert!(matches!(empty, Err(BufferError::OutOfBounds { .. })));
        assert!(!buffer.is_locked());
        assert_eq!(pool.used_bytes(), 0);
    }

    #[test]
    fn map_failure_leaves_the_buffer_unlocked() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 256);
        let region = BufferRegion::new(0, 128);

        backend.fail_next_map();
        let failed = buffer.lock(&mut pool, &backend, &config, region, LockMode::ReadWrite);
        assert!(matches!(failed, Err(BufferError::Backend(_))));
        assert!(!buffer.is_locked());

        // The failure is transient; the next attempt succeeds.
        let route = buffer
            .lock(&mut pool, &backend, &config, region, LockMode::ReadWrite)
            .unwrap();
        assert_eq!(route, LockRoute::Mapped);
        buffer.unlock(&mut pool, &backend).unwrap();
    }

    #[test]
    fn failed_prefill_releases_the_scratch_block() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);

        backend.fail_next_read();
        let failed = buffer.lock(
            &mut pool,
            &backend,
            &config,
            BufferRegion::new(0, 16),
            LockMode::ReadWrite,
        );
        assert!(matches!(failed, Err(BufferError::Backend(_))));
        assert!(!buffer.is_locked());
        assert_eq!(pool.used_bytes(), 0);
    }

    #[test]
    fn unlock_releases_scratch_even_when_the_flush_fails() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);

        buffer
            .lock(
                &mut pool,
                &backend,
                &config,
                BufferRegion::new(0, 16),
                LockMode::ReadWrite,
            )
            .unwrap();
        backend.fail_next_write();
        let failed = buffer.unlock(&mut pool, &backend);
        assert!(matches!(failed, Err(BufferError::Backend(_))));
        assert!(!buffer.is_locked());
        assert_eq!(pool.used_bytes(), 0);
    }

    #[test]
    fn destroy_while_locked_commits_nothing() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut buffer = make_buffer(&backend, 32);
        backend.clear_events();

        buffer
            .lock(
                &mut pool,
                &backend,
                &config,
                BufferRegion::new(0, 16),
                LockMode::ReadWrite,
            )
            .unwrap();
        buffer.locked_bytes(&mut pool).unwrap().fill(0xEE);
        buffer.destroy(&mut pool, &backend).unwrap();

        assert_eq!(writes(&backend), 0);
        assert_eq!(pool.used_bytes(), 0);
        assert_eq!(backend.buffer_count(), 0);
    }

    #[test]
    fn copy_from_transfers_bytes_between_buffers() {
        let backend = MockBackend::new();
        let config = test_config();
        let mut pool = ScratchBufferPool::new(config.scratch_capacity);
        let mut source = make_buffer(&backend, 32);
        let mut dest = make_buffer(&backend, 32);

        let pattern: Vec<u8> = (0u8..32).collect();
        source
            .write_data(&mut pool, &backend, &config, 0, &pattern, true)
            .unwrap();
        dest.copy_from(
            &mut source,
            &mut pool,
            &backend,
            &config,
            4,
            8,
            16,
            false,
        )
        .unwrap();

        let mut contents = [0u8; 32];
        dest.read_data(&mut pool, &backend, &config, 0, &mut contents)
            .unwrap();
        assert_eq!(&contents[..8], &[0u8; 8]);
        assert_eq!(&contents[8..24], &pattern[4..20]);
        assert_eq!(&contents[24..], &[0u8; 8]);
        assert!(!source.is_locked());
        assert!(!dest.is_locked());
    }
}
