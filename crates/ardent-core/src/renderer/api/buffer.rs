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

//! Defines data structures related to hardware buffer resources.

use crate::ardent_bitflags;
use std::borrow::Cow;

ardent_bitflags! {
    /// A set of flags describing the allowed usages of a buffer.
    ///
    /// The backend uses them to place the buffer in the most suitable memory
    /// type and to validate accesses at runtime.
    pub struct BufferUsage: u32 {
        /// The buffer can be mapped for reading on the CPU.
        const MAP_READ = 1 << 0;
        /// The buffer can be mapped for writing on the CPU.
        const MAP_WRITE = 1 << 1;
        /// The buffer can be the source of a copy operation.
        const COPY_SRC = 1 << 2;
        /// The buffer can be the destination of a copy operation.
        const COPY_DST = 1 << 3;
        /// The buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 4;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 5;
        /// The buffer can be bound as a uniform buffer.
        const UNIFORM = 1 << 6;
    }
}

/// A descriptor used to create a native buffer through a
/// [`RenderBackend`](crate::renderer::traits::RenderBackend).
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// A bitmask of [`BufferUsage`] flags describing how the buffer will be used.
    pub usage: BufferUsage,
}

/// An opaque handle to a native buffer resource, issued by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// A handle to a lockable buffer registered with a
/// [`RenderSystem`](crate::renderer::RenderSystem).
///
/// Unlike [`BufferId`], which names the native resource inside a backend,
/// this handle names the engine-side staging wrapper that mediates the
/// lock/unlock protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub usize);

/// The element width of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    Uint16,
    /// 32-bit unsigned indices.
    Uint32,
}

impl IndexFormat {
    /// Size of a single index element in bytes.
    #[inline]
    pub const fn byte_size(self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// What a lockable buffer holds.
///
/// Vertex and index buffers share one staging and locking implementation;
/// the kind only matters when the buffer is attached to a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertex data, interpreted through a vertex layout at draw time.
    Vertex,
    /// Index data with the given element width.
    Index(IndexFormat),
}

/// A byte range within a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRegion {
    /// Start of the range in bytes from the beginning of the buffer.
    pub offset: u64,
    /// Length of the range in bytes.
    pub length: u64,
}

impl BufferRegion {
    /// Creates a region from an offset and a length.
    #[inline]
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Returns `true` if the region lies entirely inside a buffer of
    /// `buffer_size` bytes. Empty regions are rejected.
    #[inline]
    pub fn fits_within(&self, buffer_size: u64) -> bool {
        self.length > 0
            && self
                .offset
                .checked_add(self.length)
                .is_some_and(|end| end <= buffer_size)
    }

    /// Returns `true` if the region spans a whole buffer of `buffer_size` bytes.
    #[inline]
    pub fn covers(&self, buffer_size: u64) -> bool {
        self.offset == 0 && self.length == buffer_size
    }
}

/// How locked memory may be accessed, and what the buffer's previous
/// contents are worth during the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// The caller only reads. Nothing is written back on unlock.
    ReadOnly,
    /// The caller may read and write. The locked view starts out holding the
    /// buffer's current contents.
    ReadWrite,
    /// The caller overwrites the region without reading it first. The locked
    /// view starts out undefined, and the backend may orphan the previous
    /// storage.
    WriteDiscard,
}

impl LockMode {
    /// Returns `true` if modifications must be written back on unlock.
    #[inline]
    pub const fn is_writable(self) -> bool {
        matches!(self, LockMode::ReadWrite | LockMode::WriteDiscard)
    }

    /// Returns `true` if the previous contents of the locked region are
    /// discarded rather than made visible to the caller.
    #[inline]
    pub const fn discards_contents(self) -> bool {
        matches!(self, LockMode::WriteDiscard)
    }
}
