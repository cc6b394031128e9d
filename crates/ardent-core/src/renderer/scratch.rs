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

//! Transient CPU-side staging memory for buffer locks.
//!
//! The [`ScratchBufferPool`] owns one contiguous arena and hands out
//! short-lived byte windows from it. Allocations live for a single
//! lock/unlock cycle, so fragmentation stays low and a simple first-fit
//! free list with aggressive coalescing is enough.
//!
//! # Architecture
//!
//! ```text
//! arena:  [hdr|payload........][hdr|payload....][hdr|payload..........]
//!          \_ used block _/     \_ free block _/ \_ used block _/
//! ```
//!
//! Every block carries a fixed-size header footprint inside the arena, and
//! allocation sizes are rounded up to that same footprint, so block starts
//! stay aligned without per-block padding. The block table is kept outside
//! the arena, ordered by offset; the header bytes themselves are reserved
//! but never interpreted.

use crate::renderer::error::ScratchError;

/// Arena footprint reserved ahead of every block's payload, in bytes.
///
/// Doubles as the pool's allocation alignment: requested sizes round up to a
/// multiple of it, which keeps every payload start aligned to it as well.
pub const SCRATCH_BLOCK_HEADER: usize = 16;

/// A handle to a live scratch allocation.
///
/// The value is the arena offset of the block's header, which makes handles
/// cheap to validate: a handle is live iff a used block starts there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScratchHandle(pub usize);

/// One entry in the offset-ordered block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScratchBlock {
    /// Arena offset of the block's header.
    offset: usize,
    /// Payload size in bytes; the block's arena footprint is
    /// `SCRATCH_BLOCK_HEADER + size`.
    size: usize,
    free: bool,
}

impl ScratchBlock {
    #[inline]
    fn footprint(&self) -> usize {
        SCRATCH_BLOCK_HEADER + self.size
    }
}

/// A fixed arena servicing transient staging allocations.
///
/// Exhaustion is not an error: [`allocate`](ScratchBufferPool::allocate)
/// returns `None` and the caller falls back to native mapping. Freeing a
/// handle that does not name a live allocation is a protocol violation and
/// returns [`ScratchError::InvalidHandle`].
#[derive(Debug)]
pub struct ScratchBufferPool {
    arena: Vec<u8>,
    blocks: Vec<ScratchBlock>,
}

impl ScratchBufferPool {
    /// Creates a pool with at least `capacity` bytes of arena.
    ///
    /// The capacity is rounded up to a multiple of [`SCRATCH_BLOCK_HEADER`]
    /// so the initial free block tiles the arena exactly.
    pub fn new(capacity: usize) -> Self {
        let capacity = align_up(capacity.max(SCRATCH_BLOCK_HEADER));
        log::debug!("Scratch pool initialized with {capacity} byte arena");
        Self {
            arena: vec![0; capacity],
            blocks: vec![ScratchBlock {
                offset: 0,
                size: capacity - SCRATCH_BLOCK_HEADER,
                free: true,
            }],
        }
    }

    /// Total arena size in bytes, headers included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Arena bytes currently claimed by live allocations, headers included.
    pub fn used_bytes(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| !b.free)
            .map(ScratchBlock::footprint)
            .sum()
    }

    /// Number of blocks in the table, free and used alike.
    ///
    /// A fully coalesced idle pool reports exactly one block.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Claims `size` bytes from the arena, or `None` if no free block fits.
    ///
    /// The request is rounded up to the pool alignment and satisfied by the
    /// first free block large enough, scanning from the arena start. The
    /// chosen block is split when the remainder can still hold a header and
    /// at least one payload byte; otherwise the whole block is claimed and
    /// the payload simply runs a little long.
    pub fn allocate(&mut self, size: usize) -> Option<ScratchHandle> {
        let size = align_up(size.max(1));
        let pos = self
            .blocks
            .iter()
            .position(|b| b.free && b.size >= size)?;

        let spare = self.blocks[pos].size - size;
        if spare > SCRATCH_BLOCK_HEADER {
            let remainder = ScratchBlock {
                offset: self.blocks[pos].offset + SCRATCH_BLOCK_HEADER + size,
                size: spare - SCRATCH_BLOCK_HEADER,
                free: true,
            };
            self.blocks[pos].size = size;
            self.blocks.insert(pos + 1, remainder);
        }

        self.blocks[pos].free = false;
        Some(ScratchHandle(self.blocks[pos].offset))
    }

    /// Releases a live allocation back to the arena.
    ///
    /// The freed block is merged with its free neighbors on either side so
    /// that adjacent free space always forms a single block.
    ///
    /// # Errors
    ///
    /// Returns [`ScratchError::InvalidHandle`] if `handle` does not name a
    /// live allocation (stale, already freed, or forged).
    pub fn deallocate(&mut self, handle: ScratchHandle) -> Result<(), ScratchError> {
        let pos = self.position_of(handle)?;
        self.blocks[pos].free = true;

        // Absorb the successor first so `pos` stays valid for the
        // predecessor merge.
        if pos + 1 < self.blocks.len() && self.blocks[pos + 1].free {
            let absorbed = self.blocks.remove(pos + 1);
            self.blocks[pos].size += absorbed.footprint();
        }
        if pos > 0 && self.blocks[pos - 1].free {
            let absorbed = self.blocks.remove(pos);
            self.blocks[pos - 1].size += absorbed.footprint();
        }
        Ok(())
    }

    /// Read access to a live allocation's payload.
    ///
    /// The slice may be longer than the requested size due to alignment
    /// rounding; callers track their own lengths.
    pub fn payload(&self, handle: ScratchHandle) -> Result<&[u8], ScratchError> {
        let block = self.blocks[self.position_of(handle)?];
        let start = block.offset + SCRATCH_BLOCK_HEADER;
        Ok(&self.arena[start..start + block.size])
    }

    /// Write access to a live allocation's payload.
    pub fn payload_mut(&mut self, handle: ScratchHandle) -> Result<&mut [u8], ScratchError> {
        let block = self.blocks[self.position_of(handle)?];
        let start = block.offset + SCRATCH_BLOCK_HEADER;
        Ok(&mut self.arena[start..start + block.size])
    }

    fn position_of(&self, handle: ScratchHandle) -> Result<usize, ScratchError> {
        self.blocks
            .iter()
            .position(|b| b.offset == handle.0 && !b.free)
            .ok_or(ScratchError::InvalidHandle { handle })
    }
}

#[inline]
fn align_up(size: usize) -> usize {
    (size + SCRATCH_BLOCK_HEADER - 1) & !(SCRATCH_BLOCK_HEADER - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every byte of the arena must be accounted for by exactly one block.
    fn assert_conserved(pool: &ScratchBufferPool) {
        let total: usize = pool.blocks.iter().map(ScratchBlock::footprint).sum();
        assert_eq!(
            total,
            pool.capacity(),
            "block footprints must tile the arena exactly: {:?}",
            pool.blocks
        );
        for pair in pool.blocks.windows(2) {
            assert_eq!(
                pair[0].offset + pair[0].footprint(),
                pair[1].offset,
                "blocks must be contiguous and ordered: {:?}",
                pool.blocks
            );
        }
    }

    #[test]
    fn test_new_pool_is_one_free_block() {
        let pool = ScratchBufferPool::new(1024);
        assert_eq!(pool.capacity(), 1024);
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.used_bytes(), 0);
        assert_conserved(&pool);
    }

    #[test]
    fn test_capacity_rounds_up_to_alignment() {
        let pool = ScratchBufferPool::new(1000);
        assert_eq!(pool.capacity(), 1008);
        let tiny = ScratchBufferPool::new(1);
        assert_eq!(tiny.capacity(), SCRATCH_BLOCK_HEADER);
    }

    #[test]
    fn test_two_allocations_then_frees_restore_one_block() {
        // 1024-byte arena, 16-byte headers: two 100-byte allocations round
        // up to 112 bytes each; freeing both in either order must leave a
        // single free block spanning the whole arena again.
        let mut pool = ScratchBufferPool::new(1024);
        let a = pool.allocate(100).expect("first allocation fits");
        let b = pool.allocate(100).expect("second allocation fits");
        assert_conserved(&pool);
        assert_eq!(pool.used_bytes(), 2 * (16 + 112));

        pool.deallocate(a).unwrap();
        assert_conserved(&pool);
        pool.deallocate(b).unwrap();
        assert_conserved(&pool);

        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.used_bytes(), 0);
        assert_eq!(pool.blocks[0].size, 1024 - 16);
    }

    #[test]
    fn test_free_order_does_not_matter_for_coalescing() {
        let mut pool = ScratchBufferPool::new(2048);
        let handles: Vec<_> = (0..5).map(|_| pool.allocate(64).unwrap()).collect();
        assert_conserved(&pool);

        // Free in an interleaved order: middle, ends, rest.
        for &i in &[2usize, 0, 4, 1, 3] {
            pool.deallocate(handles[i]).unwrap();
            assert_conserved(&pool);
        }
        assert_eq!(pool.block_count(), 1, "all free space must coalesce");
    }

    #[test]
    fn test_allocations_do_not_overlap() {
        let mut pool = ScratchBufferPool::new(4096);
        let handles: Vec<_> = (0..8).map(|_| pool.allocate(100).unwrap()).collect();

        for (i, &handle) in handles.iter().enumerate() {
            let fill = i as u8 + 1;
            for byte in pool.payload_mut(handle).unwrap() {
                *byte = fill;
            }
        }
        for (i, &handle) in handles.iter().enumerate() {
            let fill = i as u8 + 1;
            assert!(
                pool.payload(handle).unwrap().iter().all(|&b| b == fill),
                "allocation {i} was clobbered by a neighbor"
            );
        }
    }

    #[test]
    fn test_first_fit_reuses_earliest_hole() {
        let mut pool = ScratchBufferPool::new(1024);
        let a = pool.allocate(64).unwrap();
        let _b = pool.allocate(64).unwrap();
        let a_offset = a.0;

        pool.deallocate(a).unwrap();
        let c = pool.allocate(32).unwrap();
        assert_eq!(c.0, a_offset, "first-fit must claim the earliest hole");
        assert_conserved(&pool);
    }

    #[test]
    fn test_split_only_when_remainder_is_usable() {
        // Arena with a single free payload of exactly 64 bytes.
        let mut pool = ScratchBufferPool::new(64 + SCRATCH_BLOCK_HEADER);

        // Remainder would be zero: claim whole, no split.
        let a = pool.allocate(64).unwrap();
        assert_eq!(pool.block_count(), 1);
        pool.deallocate(a).unwrap();

        // Remainder would be exactly one header with no payload: still no
        // split, the allocation absorbs the spare bytes.
        let b = pool.allocate(48).unwrap();
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.payload(b).unwrap().len(), 64);
        pool.deallocate(b).unwrap();

        // Remainder leaves a header plus payload: split.
        let c = pool.allocate(32).unwrap();
        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.payload(c).unwrap().len(), 32);
        assert_conserved(&pool);
    }

    #[test]
    fn test_exhaustion_is_recoverable() {
        let mut pool = ScratchBufferPool::new(128);
        let a = pool.allocate(112).expect("whole arena minus header");
        assert!(pool.allocate(1).is_none(), "arena is exhausted");

        pool.deallocate(a).unwrap();
        assert!(
            pool.allocate(1).is_some(),
            "pool must recover once space is freed"
        );
    }

    #[test]
    fn test_requests_round_up_to_alignment() {
        let mut pool = ScratchBufferPool::new(256);
        let a = pool.allocate(1).unwrap();
        assert_eq!(pool.payload(a).unwrap().len(), SCRATCH_BLOCK_HEADER);
        let b = pool.allocate(17).unwrap();
        assert_eq!(pool.payload(b).unwrap().len(), 32);
        assert_eq!(a.0 % SCRATCH_BLOCK_HEADER, 0);
        assert_eq!(b.0 % SCRATCH_BLOCK_HEADER, 0);
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut pool = ScratchBufferPool::new(256);
        let a = pool.allocate(32).unwrap();
        pool.deallocate(a).unwrap();
        assert!(matches!(
            pool.deallocate(a),
            Err(ScratchError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn test_forged_handle_is_rejected() {
        let mut pool = ScratchBufferPool::new(256);
        let _a = pool.allocate(32).unwrap();
        // Offset 8 can never start a block: blocks are header-aligned.
        assert!(pool.deallocate(ScratchHandle(8)).is_err());
        // Offset of a free block is not a live allocation either.
        assert!(pool.deallocate(ScratchHandle(48)).is_err());
        assert!(pool.payload(ScratchHandle(8)).is_err());
    }

    #[test]
    fn test_churn_conserves_arena() {
        let mut pool = ScratchBufferPool::new(4096);
        let mut live = Vec::new();

        // Deterministic alloc/free interleaving with varied sizes.
        for round in 0..6usize {
            for size in [24, 200, 64, 16, 512] {
                if let Some(h) = pool.allocate(size + round) {
                    live.push(h);
                }
                assert_conserved(&pool);
            }
            // Free every other live handle.
            let mut i = 0;
            live.retain(|&h| {
                i += 1;
                if i % 2 == 0 {
                    pool.deallocate(h).unwrap();
                    false
                } else {
                    true
                }
            });
            assert_conserved(&pool);
        }

        for h in live {
            pool.deallocate(h).unwrap();
        }
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.used_bytes(), 0);
    }
}
