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

//! A byte-accurate mock backend for unit tests.
//!
//! The mock stores real buffer contents so round-trip assertions work, and it
//! records every call as a [`BackendEvent`] so tests can assert ordering
//! (constants after binds, unbinds after draws) and call counts (reads
//! skipped under discard, writes skipped for read-only locks).

use crate::renderer::api::*;
use crate::renderer::error::BackendError;
use crate::renderer::fixed_function::EmulationCatalog;
use crate::renderer::traits::RenderBackend;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Registers an empty-source program of `stage` on the mock.
pub(crate) fn make_test_program(backend: &MockBackend, stage: ProgramStage) -> ProgramHandle {
    backend
        .create_program(&ProgramDescriptor {
            label: None,
            stage,
            source: Cow::Borrowed(""),
            entry_point: Cow::Borrowed("main"),
        })
        .unwrap()
}

/// Registers a complete built-in program catalog on the mock.
pub(crate) fn make_test_catalog(backend: &MockBackend) -> EmulationCatalog {
    EmulationCatalog {
        position: make_test_program(backend, ProgramStage::Vertex),
        position_texcoord: make_test_program(backend, ProgramStage::Vertex),
        position_color: make_test_program(backend, ProgramStage::Vertex),
        position_color_texcoord: make_test_program(backend, ProgramStage::Vertex),
        position_texcoord_color: make_test_program(backend, ProgramStage::Vertex),
        position_normal_texcoord: make_test_program(backend, ProgramStage::Vertex),
        position_normal_color: make_test_program(backend, ProgramStage::Vertex),
        fragment_texture: make_test_program(backend, ProgramStage::Fragment),
        fragment_color: make_test_program(backend, ProgramStage::Fragment),
        fragment_texture_color: make_test_program(backend, ProgramStage::Fragment),
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackendEvent {
    BufferCreated(BufferId),
    BufferDestroyed(BufferId),
    Write {
        id: BufferId,
        offset: u64,
        len: usize,
        discard_whole: bool,
    },
    Read {
        id: BufferId,
        offset: u64,
        len: usize,
    },
    Map {
        id: BufferId,
        mode: LockMode,
    },
    Unmap {
        id: BufferId,
        mode: LockMode,
    },
    Bind {
        stage: ProgramStage,
        handle: ProgramHandle,
    },
    Unbind {
        stage: ProgramStage,
    },
    Constants {
        stage: ProgramStage,
        len: usize,
    },
    Draw {
        vertex_buffer: BufferId,
        indexed: bool,
    },
}

#[derive(Debug)]
struct MockBuffer {
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct BoundPrograms {
    vertex: Option<ProgramHandle>,
    fragment: Option<ProgramHandle>,
}

/// An in-memory [`RenderBackend`] with byte-accurate buffers.
#[derive(Debug)]
pub(crate) struct MockBackend {
    next_id: AtomicUsize,
    buffers: Mutex<HashMap<usize, MockBuffer>>,
    programs: Mutex<HashMap<usize, ProgramStage>>,
    bound: Mutex<BoundPrograms>,
    events: Mutex<Vec<BackendEvent>>,
    fail_next_map: AtomicBool,
    fail_next_read: AtomicBool,
    fail_next_write: AtomicBool,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            buffers: Mutex::new(HashMap::new()),
            programs: Mutex::new(HashMap::new()),
            bound: Mutex::new(BoundPrograms::default()),
            events: Mutex::new(Vec::new()),
            fail_next_map: AtomicBool::new(false),
            fail_next_read: AtomicBool::new(false),
            fail_next_write: AtomicBool::new(false),
        }
    }

    fn next(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn record(&self, event: BackendEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Snapshot of every recorded call, in order.
    pub(crate) fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Number of recorded calls matching `pred`.
    pub(crate) fn count(&self, pred: impl Fn(&BackendEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    /// Current contents of a native buffer.
    pub(crate) fn buffer_contents(&self, id: BufferId) -> Vec<u8> {
        self.buffers.lock().unwrap()[&id.0].data.clone()
    }

    pub(crate) fn buffer_count(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }

    pub(crate) fn bound_program(&self, stage: ProgramStage) -> Option<ProgramHandle> {
        let bound = self.bound.lock().unwrap();
        match stage {
            ProgramStage::Vertex => bound.vertex,
            ProgramStage::Fragment => bound.fragment,
        }
    }

    /// Makes the next `map_buffer` call fail, exercising error propagation.
    pub(crate) fn fail_next_map(&self) {
        self.fail_next_map.store(true, Ordering::Relaxed);
    }

    /// Makes the next `read_buffer` call fail.
    pub(crate) fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::Relaxed);
    }

    /// Makes the next `write_buffer` call fail.
    pub(crate) fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::Relaxed);
    }

    fn check_range(
        id: BufferId,
        data_len: usize,
        offset: u64,
        length: u64,
    ) -> Result<(), BackendError> {
        let size = data_len as u64;
        if offset.checked_add(length).map_or(true, |end| end > size) {
            return Err(BackendError::OutOfBounds {
                id,
                offset,
                length,
                size,
            });
        }
        Ok(())
    }
}

impl RenderBackend for MockBackend {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, BackendError> {
        let id = BufferId(self.next());
        self.buffers.lock().unwrap().insert(
            id.0,
            MockBuffer {
                data: vec![0; descriptor.size as usize],
            },
        );
        self.record(BackendEvent::BufferCreated(id));
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), BackendError> {
        self.buffers
            .lock()
            .unwrap()
            .remove(&id.0)
            .ok_or(BackendError::UnknownBuffer { id })?;
        self.record(BackendEvent::BufferDestroyed(id));
        Ok(())
    }

    fn write_buffer(
        &self,
        id: BufferId,
        offset: u64,
        data: &[u8],
        discard_whole: bool,
    ) -> Result<(), BackendError> {
        if self.fail_next_write.swap(false, Ordering::Relaxed) {
            return Err(BackendError::Internal("mock write failure".to_string()));
        }
        let mut buffers = self.buffers.lock().unwrap();
        let buffer = buffers
            .get_mut(&id.0)
            .ok_or(BackendError::UnknownBuffer { id })?;
        Self::check_range(id, buffer.data.len(), offset, data.len() as u64)?;
        if discard_whole && !(offset == 0 && data.len() == buffer.data.len()) {
            return Err(BackendError::Internal(
                "discard_whole write does not cover the whole buffer".to_string(),
            ));
        }
        buffer.data[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        self.record(BackendEvent::Write {
            id,
            offset,
            len: data.len(),
            discard_whole,
        });
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, dst: &mut [u8]) -> Result<(), BackendError> {
        if self.fail_next_read.swap(false, Ordering::Relaxed) {
            return Err(BackendError::Internal("mock read failure".to_string()));
        }
        let buffers = self.buffers.lock().unwrap();
        let buffer = buffers.get(&id.0).ok_or(BackendError::UnknownBuffer { id })?;
        Self::check_range(id, buffer.data.len(), offset, dst.len() as u64)?;
        dst.copy_from_slice(&buffer.data[offset as usize..offset as usize + dst.len()]);
        self.record(BackendEvent::Read {
            id,
            offset,
            len: dst.len(),
        });
        Ok(())
    }

    fn map_buffer(
        &self,
        id: BufferId,
        region: BufferRegion,
        mode: LockMode,
    ) -> Result<Vec<u8>, BackendError> {
        if self.fail_next_map.swap(false, Ordering::Relaxed) {
            return Err(BackendError::MapFailed {
                id,
                details: "mock map failure".to_string(),
            });
        }
        let buffers = self.buffers.lock().unwrap();
        let buffer = buffers.get(&id.0).ok_or(BackendError::UnknownBuffer { id })?;
        Self::check_range(id, buffer.data.len(), region.offset, region.length)?;
        let bytes = if mode.discards_contents() {
            vec![0; region.length as usize]
        } else {
            buffer.data[region.offset as usize..(region.offset + region.length) as usize].to_vec()
        };
        self.record(BackendEvent::Map { id, mode });
        Ok(bytes)
    }

    fn unmap_buffer(
        &self,
        id: BufferId,
        region: BufferRegion,
        mode: LockMode,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let mut buffers = self.buffers.lock().unwrap();
        let buffer = buffers
            .get_mut(&id.0)
            .ok_or(BackendError::UnknownBuffer { id })?;
        Self::check_range(id, buffer.data.len(), region.offset, region.length)?;
        if mode.is_writable() {
            buffer.data[region.offset as usize..(region.offset + region.length) as usize]
                .copy_from_slice(data);
        }
        self.record(BackendEvent::Unmap { id, mode });
        Ok(())
    }

    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, BackendError> {
        let handle = ProgramHandle(self.next());
        self.programs
            .lock()
            .unwrap()
            .insert(handle.0, descriptor.stage);
        Ok(handle)
    }

    fn destroy_program(&self, handle: ProgramHandle) -> Result<(), BackendError> {
        self.programs
            .lock()
            .unwrap()
            .remove(&handle.0)
            .ok_or(BackendError::UnknownProgram { handle })?;
        Ok(())
    }

    fn bind_program(
        &self,
        stage: ProgramStage,
        handle: ProgramHandle,
    ) -> Result<(), BackendError> {
        let programs = self.programs.lock().unwrap();
        match programs.get(&handle.0) {
            None => return Err(BackendError::UnknownProgram { handle }),
            Some(&registered) if registered != stage => {
                return Err(BackendError::Internal(format!(
                    "program {handle:?} is a {registered:?} program, bound as {stage:?}"
                )));
            }
            Some(_) => {}
        }
        drop(programs);

        let mut bound = self.bound.lock().unwrap();
        match stage {
            ProgramStage::Vertex => bound.vertex = Some(handle),
            ProgramStage::Fragment => bound.fragment = Some(handle),
        }
        self.record(BackendEvent::Bind { stage, handle });
        Ok(())
    }

    fn unbind_program(&self, stage: ProgramStage) -> Result<(), BackendError> {
        let mut bound = self.bound.lock().unwrap();
        match stage {
            ProgramStage::Vertex => bound.vertex = None,
            ProgramStage::Fragment => bound.fragment = None,
        }
        self.record(BackendEvent::Unbind { stage });
        Ok(())
    }

    fn set_program_constants(&self, stage: ProgramStage, data: &[u8]) -> Result<(), BackendError> {
        self.record(BackendEvent::Constants {
            stage,
            len: data.len(),
        });
        Ok(())
    }

    fn draw(&self, command: &DrawCommand) -> Result<(), BackendError> {
        {
            let bound = self.bound.lock().unwrap();
            if bound.vertex.is_none() {
                return Err(BackendError::NoProgramBound {
                    stage: ProgramStage::Vertex,
                });
            }
            if bound.fragment.is_none() {
                return Err(BackendError::NoProgramBound {
                    stage: ProgramStage::Fragment,
                });
            }
        }
        let buffers = self.buffers.lock().unwrap();
        if !buffers.contains_key(&command.vertex_buffer.0) {
            return Err(BackendError::UnknownBuffer {
                id: command.vertex_buffer,
            });
        }
        if let Some(indexed) = &command.indexed {
            if !buffers.contains_key(&indexed.buffer.0) {
                return Err(BackendError::UnknownBuffer { id: indexed.buffer });
            }
        }
        drop(buffers);
        self.record(BackendEvent::Draw {
            vertex_buffer: command.vertex_buffer,
            indexed: command.indexed.is_some(),
        });
        Ok(())
    }
}
