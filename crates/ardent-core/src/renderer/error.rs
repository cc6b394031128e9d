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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Protocol violations (double locks, unlocking an unlocked buffer, freeing a
//! dead scratch handle, drawing an unsupported vertex signature) surface as
//! dedicated variants rather than panics; whether they abort the application
//! is the caller's policy. Scratch-pool exhaustion is *not* an error: the
//! staging layer falls back to native mapping internally.

use crate::renderer::api::buffer::{BufferHandle, BufferId, BufferRegion};
use crate::renderer::api::program::{ProgramHandle, ProgramStage};
use crate::renderer::api::vertex::VertexSignature;
use crate::renderer::scratch::ScratchHandle;
use std::fmt;

/// An error raised by the scratch buffer pool.
#[derive(Debug)]
pub enum ScratchError {
    /// A handle was passed that does not name a live allocation. This covers
    /// double frees, stale handles, and forged offsets alike.
    InvalidHandle {
        /// The offending handle.
        handle: ScratchHandle,
    },
}

impl fmt::Display for ScratchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScratchError::InvalidHandle { handle } => {
                write!(
                    f,
                    "Scratch handle does not match a live allocation: {handle:?}"
                )
            }
        }
    }
}

impl std::error::Error for ScratchError {}

/// An error raised by a backend implementation.
#[derive(Debug)]
pub enum BackendError {
    /// A native resource could not be created.
    ResourceCreation {
        /// A descriptive label for the resource, if available.
        label: Option<String>,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// The given buffer id is not known to the backend.
    UnknownBuffer {
        /// The unknown id.
        id: BufferId,
    },
    /// The given program handle is not known to the backend.
    UnknownProgram {
        /// The unknown handle.
        handle: ProgramHandle,
    },
    /// A transfer or mapping touched bytes outside the buffer.
    OutOfBounds {
        /// The buffer being accessed.
        id: BufferId,
        /// Start of the access in bytes.
        offset: u64,
        /// Length of the access in bytes.
        length: u64,
        /// Actual size of the buffer in bytes.
        size: u64,
    },
    /// The backend could not map the requested range.
    MapFailed {
        /// The buffer being mapped.
        id: BufferId,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// A draw was submitted while a required stage had no program bound.
    NoProgramBound {
        /// The empty stage.
        stage: ProgramStage,
    },
    /// An unexpected backend-internal failure.
    Internal(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ResourceCreation { label, details } => {
                write!(
                    f,
                    "Failed to create '{}': {}",
                    label.as_deref().unwrap_or("Unknown"),
                    details
                )
            }
            BackendError::UnknownBuffer { id } => {
                write!(f, "Backend has no buffer with ID: {id:?}")
            }
            BackendError::UnknownProgram { handle } => {
                write!(f, "Backend has no program with handle: {handle:?}")
            }
            BackendError::OutOfBounds {
                id,
                offset,
                length,
                size,
            } => {
                write!(
                    f,
                    "Access of {length} bytes at offset {offset} exceeds buffer {id:?} of {size} bytes"
                )
            }
            BackendError::MapFailed { id, details } => {
                write!(f, "Failed to map buffer {id:?}: {details}")
            }
            BackendError::NoProgramBound { stage } => {
                write!(f, "No program bound for the {stage:?} stage")
            }
            BackendError::Internal(msg) => {
                write!(f, "Internal backend error: {msg}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// An error raised by the buffer lock/unlock protocol.
#[derive(Debug)]
pub enum BufferError {
    /// No buffer is registered under the given handle.
    Unknown {
        /// The unknown handle.
        handle: BufferHandle,
    },
    /// A lock was requested on a buffer that is already locked.
    AlreadyLocked {
        /// The locked buffer's native id.
        id: BufferId,
    },
    /// An unlock (or locked-data access) was requested on an unlocked buffer.
    NotLocked {
        /// The unlocked buffer's native id.
        id: BufferId,
    },
    /// The requested region does not fit inside the buffer.
    OutOfBounds {
        /// The buffer's native id.
        id: BufferId,
        /// The rejected region.
        region: BufferRegion,
        /// Actual size of the buffer in bytes.
        size: u64,
    },
    /// The buffer is locked and cannot take part in this operation.
    StillLocked {
        /// The locked buffer's native id.
        id: BufferId,
    },
    /// The buffer exists but is the wrong kind for this operation.
    WrongKind {
        /// The buffer's handle.
        handle: BufferHandle,
        /// The kind this operation needs, e.g. `"vertex"`.
        expected: &'static str,
    },
    /// A copy named the same buffer as both source and destination.
    SelfCopy {
        /// The buffer named twice.
        handle: BufferHandle,
    },
    /// A scratch-pool error occurred while servicing the lock.
    Scratch(ScratchError),
    /// A backend error occurred while servicing the lock.
    Backend(BackendError),
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::Unknown { handle } => {
                write!(f, "No buffer is registered under {handle:?}")
            }
            BufferError::AlreadyLocked { id } => {
                write!(f, "Buffer {id:?} is already locked")
            }
            BufferError::NotLocked { id } => {
                write!(f, "Buffer {id:?} is not locked")
            }
            BufferError::OutOfBounds { id, region, size } => {
                write!(
                    f,
                    "Lock region at offset {} of {} bytes exceeds buffer {id:?} of {size} bytes",
                    region.offset, region.length
                )
            }
            BufferError::StillLocked { id } => {
                write!(f, "Buffer {id:?} is still locked")
            }
            BufferError::WrongKind { handle, expected } => {
                write!(f, "Buffer {handle:?} is not a {expected} buffer")
            }
            BufferError::SelfCopy { handle } => {
                write!(f, "Source and destination are the same buffer: {handle:?}")
            }
            BufferError::Scratch(err) => write!(f, "Scratch pool error: {err}"),
            BufferError::Backend(err) => write!(f, "Backend buffer operation failed: {err}"),
        }
    }
}

impl std::error::Error for BufferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferError::Scratch(err) => Some(err),
            BufferError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ScratchError> for BufferError {
    fn from(err: ScratchError) -> Self {
        BufferError::Scratch(err)
    }
}

impl From<BackendError> for BufferError {
    fn from(err: BackendError) -> Self {
        BufferError::Backend(err)
    }
}

/// An error raised by the fixed-function emulation layer.
#[derive(Debug)]
pub enum EmulationError {
    /// The draw's vertex signature matches none of the pre-authored programs.
    UnsupportedSignature {
        /// The signature that could not be matched.
        signature: VertexSignature,
    },
    /// An emulation session was started while one was already active.
    AlreadyEmulating,
    /// An emulation session was ended while none was active.
    NotEmulating,
    /// A backend error occurred while binding or unbinding programs.
    Backend(BackendError),
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulationError::UnsupportedSignature { signature } => {
                write!(
                    f,
                    "No fixed-function program covers vertex signature '{signature}'"
                )
            }
            EmulationError::AlreadyEmulating => {
                write!(f, "A fixed-function emulation session is already active.")
            }
            EmulationError::NotEmulating => {
                write!(f, "No fixed-function emulation session is active.")
            }
            EmulationError::Backend(err) => {
                write!(f, "Backend program operation failed: {err}")
            }
        }
    }
}

impl std::error::Error for EmulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmulationError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for EmulationError {
    fn from(err: BackendError) -> Self {
        EmulationError::Backend(err)
    }
}

/// A high-level error surfaced by the [`RenderSystem`](crate::renderer::RenderSystem).
#[derive(Debug)]
pub enum RenderError {
    /// A buffer lock/unlock operation failed.
    Buffer(BufferError),
    /// Fixed-function emulation failed.
    Emulation(EmulationError),
    /// A backend operation failed.
    Backend(BackendError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Buffer(err) => write!(f, "Buffer operation failed: {err}"),
            RenderError::Emulation(err) => {
                write!(f, "Fixed-function emulation failed: {err}")
            }
            RenderError::Backend(err) => write!(f, "Backend operation failed: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Buffer(err) => Some(err),
            RenderError::Emulation(err) => Some(err),
            RenderError::Backend(err) => Some(err),
        }
    }
}

impl From<BufferError> for RenderError {
    fn from(err: BufferError) -> Self {
        RenderError::Buffer(err)
    }
}

impl From<EmulationError> for RenderError {
    fn from(err: EmulationError) -> Self {
        RenderError::Emulation(err)
    }
}

impl From<BackendError> for RenderError {
    fn from(err: BackendError) -> Self {
        RenderError::Backend(err)
    }
}

impl From<ScratchError> for RenderError {
    fn from(err: ScratchError) -> Self {
        RenderError::Buffer(BufferError::Scratch(err))
    }
}
