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

//! The wgpu implementation of the rendering contract.
//!
//! [`WgpuRenderBackend`] owns a `wgpu::Device` and `wgpu::Queue` and maps
//! every [`RenderBackend`] operation onto them. Two choices shape the
//! implementation:
//!
//! * **Shadow copies.** Every native buffer keeps a CPU shadow of its
//!   contents. Reads and mappings are served from the shadow without a GPU
//!   round-trip, and sub-range writes use it to source the padded edges
//!   `Queue::write_buffer` demands (copy offsets and sizes must be 4-byte
//!   aligned).
//! * **A fixed binding interface.** Every pipeline compiles against one bind
//!   group layout: binding 0 is the vertex-stage constant block, bindings 1
//!   and 2 a stage texture and sampler (a 1x1 white fallback when nothing
//!   else is bound), binding 3 the fragment-stage constant block. Programs
//!   may declare any subset. Draws are recorded into a small offscreen color
//!   target, one pass per draw.
//!
//! Pipelines are compiled lazily per (vertex program, fragment program,
//! vertex layout) triple and cached for reuse.

use ardent_core::renderer::{
    BackendError, BufferDescriptor, BufferId, BufferRegion, DrawCommand, EmulationConstants,
    LockMode, ProgramDescriptor, ProgramHandle, ProgramStage, RenderBackend, VertexLayout,
};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::conversions::{vertex_attributes, IntoWgpu};

/// Size of one stage's constant block: three column-major `mat4x4<f32>`.
const CONSTANT_BLOCK_SIZE: u64 = std::mem::size_of::<EmulationConstants>() as u64;

/// Format of the offscreen color target draws are recorded into.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Edge length of the offscreen color target, in texels.
const TARGET_SIZE: u32 = 64;

/// Rounds `value` up to `wgpu::COPY_BUFFER_ALIGNMENT`.
fn pad_to_copy_alignment(value: u64) -> u64 {
    value.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

/// Widens `[offset, offset + length)` to copy alignment on both edges,
/// clamped to `padded_size`.
fn aligned_span(offset: u64, length: u64, padded_size: u64) -> (u64, u64) {
    let start = offset - offset % wgpu::COPY_BUFFER_ALIGNMENT;
    let end = pad_to_copy_alignment(offset + length).min(padded_size);
    (start, end)
}

#[derive(Debug)]
struct BufferEntry {
    wgpu_buffer: wgpu::Buffer,
    /// CPU shadow of the contents, padded to copy alignment.
    shadow: Vec<u8>,
    /// Logical size in bytes; the native buffer may be padded past this.
    size: u64,
}

#[derive(Debug)]
struct ProgramEntry {
    module: wgpu::ShaderModule,
    stage: ProgramStage,
    entry_point: String,
}

/// Cache key of one compiled pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    vertex: ProgramHandle,
    fragment: ProgramHandle,
    layout: VertexLayout,
}

#[derive(Debug, Default, Clone, Copy)]
struct BoundPrograms {
    vertex: Option<ProgramHandle>,
    fragment: Option<ProgramHandle>,
}

/// A [`RenderBackend`] over a wgpu device and queue.
#[derive(Debug)]
pub struct WgpuRenderBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    buffers: Mutex<HashMap<BufferId, BufferEntry>>,
    programs: Mutex<HashMap<ProgramHandle, ProgramEntry>>,
    pipelines: Mutex<HashMap<PipelineKey, wgpu::RenderPipeline>>,
    bound: Mutex<BoundPrograms>,

    next_buffer_id: AtomicUsize,
    next_program_id: AtomicUsize,

    // The fixed binding environment shared by every pipeline.
    pipeline_layout: wgpu::PipelineLayout,
    bind_group: wgpu::BindGroup,
    vertex_constants: wgpu::Buffer,
    fragment_constants: wgpu::Buffer,
    target_view: wgpu::TextureView,

    // VRAM Tracking
    vram_allocated_bytes: AtomicUsize,
    vram_peak_bytes: AtomicU64,
}

impl WgpuRenderBackend {
    /// Builds the backend over an existing device and queue.
    ///
    /// Creation compiles no programs; callers typically follow up with
    /// [`register_emulation_programs`](super::shaders::register_emulation_programs)
    /// to fill the catalog.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        // 1. One constant block per programmable stage.
        let vertex_constants = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ardent_vertex_constants"),
            size: CONSTANT_BLOCK_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let fragment_constants = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ardent_fragment_constants"),
            size: CONSTANT_BLOCK_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // 2. Fallback 1x1 white texture and its sampler.
        let fallback_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ardent_fallback_texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &fallback_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0xFF, 0xFF, 0xFF, 0xFF],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let fallback_view = fallback_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());

        // 3. The shared bind group layout every pipeline compiles against.
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ardent_stage_bindings"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(CONSTANT_BLOCK_SIZE),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(CONSTANT_BLOCK_SIZE),
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ardent_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ardent_stage_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: vertex_constants.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&fallback_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: fragment_constants.as_entire_binding(),
                },
            ],
        });

        // 4. The offscreen color target draws are recorded into.
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ardent_offscreen_target"),
            size: wgpu::Extent3d {
                width: TARGET_SIZE,
                height: TARGET_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        log::info!(
            "WgpuRenderBackend: Ready ({TARGET_SIZE}x{TARGET_SIZE} offscreen target, {CONSTANT_BLOCK_SIZE} byte constant blocks)"
        );

        Self {
            device,
            queue,
            buffers: Mutex::new(HashMap::new()),
            programs: Mutex::new(HashMap::new()),
            pipelines: Mutex::new(HashMap::new()),
            bound: Mutex::new(BoundPrograms::default()),
            next_buffer_id: AtomicUsize::new(1),
            next_program_id: AtomicUsize::new(1),
            pipeline_layout,
            bind_group,
            vertex_constants,
            fragment_constants,
            target_view,
            vram_allocated_bytes: AtomicUsize::new(0),
            vram_peak_bytes: AtomicU64::new(0),
        }
    }

    // --- ID Generation Helpers ---

    fn generate_buffer_id(&self) -> BufferId {
        BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_program_handle(&self) -> ProgramHandle {
        ProgramHandle(self.next_program_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Bytes currently allocated in native buffers.
    pub fn vram_allocated_bytes(&self) -> usize {
        self.vram_allocated_bytes.load(Ordering::Relaxed)
    }

    /// High-water mark of native buffer allocation.
    pub fn vram_peak_bytes(&self) -> u64 {
        self.vram_peak_bytes.load(Ordering::Relaxed)
    }

    /// Blocks until the device has drained all submitted work.
    pub fn wait_idle(&self) -> Result<(), BackendError> {
        self.device
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .map_err(|e| BackendError::Internal(format!("Device poll failed: {e:?}")))
    }

    /// Compiles the pipeline for one program pair and vertex layout.
    fn compile_pipeline(
        &self,
        vertex: ProgramHandle,
        fragment: ProgramHandle,
        layout: &VertexLayout,
    ) -> Result<wgpu::RenderPipeline, BackendError> {
        let programs = self
            .programs
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (programs): {e}")))?;
        let vertex_entry = programs
            .get(&vertex)
            .ok_or(BackendError::UnknownProgram { handle: vertex })?;
        let fragment_entry = programs
            .get(&fragment)
            .ok_or(BackendError::UnknownProgram { handle: fragment })?;

        let attributes = vertex_attributes(layout);
        let buffers = [wgpu::VertexBufferLayout {
            array_stride: u64::from(layout.stride()),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ardent_draw_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_entry.module,
                    entry_point: Some(vertex_entry.entry_point.as_str()),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_entry.module,
                    entry_point: Some(fragment_entry.entry_point.as_str()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        log::debug!(
            "WgpuRenderBackend: Compiled pipeline for programs {:?}/{:?} over '{}'",
            vertex,
            fragment,
            layout.signature()
        );
        Ok(pipeline)
    }
}

impl RenderBackend for WgpuRenderBackend {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, BackendError> {
        // CPU access is served from the shadow copy rather than a native
        // mapping, and every flush goes through `Queue::write_buffer`, so the
        // mappable usages are dropped and COPY_DST is always present.
        let mut usage = descriptor.usage.into_wgpu() | wgpu::BufferUsages::COPY_DST;
        usage.remove(wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::MAP_WRITE);

        // Padding the native buffer to copy alignment lets sub-range flushes
        // widen their edges without falling off the end.
        let padded_size = pad_to_copy_alignment(descriptor.size);
        let wgpu_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: padded_size,
            usage,
            mapped_at_creation: false,
        });

        let id = self.generate_buffer_id();

        // Track VRAM usage
        self.vram_allocated_bytes
            .fetch_add(padded_size as usize, Ordering::Relaxed);
        let current_vram = self.vram_allocated_bytes.load(Ordering::Relaxed) as u64;
        self.vram_peak_bytes
            .fetch_max(current_vram, Ordering::Relaxed);

        self.buffers
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (buffers): {e}")))?
            .insert(
                id,
                BufferEntry {
                    wgpu_buffer,
                    shadow: vec![0u8; padded_size as usize],
                    size: descriptor.size,
                },
            );

        log::info!(
            "WgpuRenderBackend: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), BackendError> {
        let mut buffers = self
            .buffers
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (buffers): {e}")))?;
        let entry = buffers
            .remove(&id)
            .ok_or(BackendError::UnknownBuffer { id })?;
        self.vram_allocated_bytes
            .fetch_sub(entry.shadow.len(), Ordering::Relaxed);
        log::debug!("WgpuRenderBackend: Destroyed buffer with ID: {id:?}");
        Ok(())
    }

    fn write_buffer(
        &self,
        id: BufferId,
        offset: u64,
        data: &[u8],
        discard_whole: bool,
    ) -> Result<(), BackendError> {
        // 1. Get the resources
        let mut buffers = self
            .buffers
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (buffers): {e}")))?;
        let entry = buffers
            .get_mut(&id)
            .ok_or(BackendError::UnknownBuffer { id })?;

        // 2. Validate the range and the discard covenant
        let length = data.len() as u64;
        if offset + length > entry.size {
            return Err(BackendError::OutOfBounds {
                id,
                offset,
                length,
                size: entry.size,
            });
        }
        if discard_whole && !(offset == 0 && length == entry.size) {
            return Err(BackendError::Internal(
                "discard_whole write does not cover the whole buffer".to_string(),
            ));
        }
        if data.is_empty() {
            return Ok(());
        }

        // 3. Update the shadow, then flush the aligned span around the write.
        // The widened edges are sourced from the shadow, so neighbouring
        // bytes survive unaligned writes.
        entry.shadow[offset as usize..(offset + length) as usize].copy_from_slice(data);
        let (start, end) = aligned_span(offset, length, entry.shadow.len() as u64);
        self.queue.write_buffer(
            &entry.wgpu_buffer,
            start,
            &entry.shadow[start as usize..end as usize],
        );

        log::debug!(
            "WgpuRenderBackend: Wrote {} bytes to buffer ID: {:?} at offset {} (discard: {})",
            data.len(),
            id,
            offset,
            discard_whole
        );
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, dst: &mut [u8]) -> Result<(), BackendError> {
        let buffers = self
            .buffers
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (buffers): {e}")))?;
        let entry = buffers.get(&id).ok_or(BackendError::UnknownBuffer { id })?;

        let length = dst.len() as u64;
        if offset + length > entry.size {
            return Err(BackendError::OutOfBounds {
                id,
                offset,
                length,
                size: entry.size,
            });
        }

        // Every write flows through this backend, so the shadow is current
        // and the read needs no GPU round-trip.
        dst.copy_from_slice(&entry.shadow[offset as usize..(offset + length) as usize]);
        Ok(())
    }

    fn map_buffer(
        &self,
        id: BufferId,
        region: BufferRegion,
        mode: LockMode,
    ) -> Result<Vec<u8>, BackendError> {
        let buffers = self
            .buffers
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (buffers): {e}")))?;
        let entry = buffers.get(&id).ok_or(BackendError::UnknownBuffer { id })?;
        if !region.fits_within(entry.size) {
            return Err(BackendError::OutOfBounds {
                id,
                offset: region.offset,
                length: region.length,
                size: entry.size,
            });
        }

        let bytes = if mode.discards_contents() {
            vec![0u8; region.length as usize]
        } else {
            entry.shadow[region.offset as usize..(region.offset + region.length) as usize].to_vec()
        };
        log::debug!(
            "WgpuRenderBackend: Mapped {} bytes of {:?} ({:?})",
            region.length,
            id,
            mode
        );
        Ok(bytes)
    }

    fn unmap_buffer(
        &self,
        id: BufferId,
        region: BufferRegion,
        mode: LockMode,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let size = {
            let buffers = self
                .buffers
                .lock()
                .map_err(|e| BackendError::Internal(format!("Mutex poisoned (buffers): {e}")))?;
            buffers
                .get(&id)
                .ok_or(BackendError::UnknownBuffer { id })?
                .size
        };

        if !mode.is_writable() {
            log::debug!("WgpuRenderBackend: Discarded read-only mapping of {id:?}");
            return Ok(());
        }
        if data.len() as u64 != region.length {
            return Err(BackendError::Internal(format!(
                "unmap of {:?} returned {} bytes for a {} byte region",
                id,
                data.len(),
                region.length
            )));
        }
        self.write_buffer(id, region.offset, data, region.covers(size))
    }

    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, BackendError> {
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: descriptor.label.as_deref(),
            source: wgpu::ShaderSource::Wgsl(descriptor.source.clone()),
        });

        let handle = self.generate_program_handle();
        self.programs
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (programs): {e}")))?
            .insert(
                handle,
                ProgramEntry {
                    module,
                    stage: descriptor.stage,
                    entry_point: descriptor.entry_point.to_string(),
                },
            );

        log::info!(
            "WgpuRenderBackend: Created {:?} program '{}' with handle {:?}",
            descriptor.stage,
            descriptor.label.as_deref().unwrap_or_default(),
            handle
        );
        Ok(handle)
    }

    fn destroy_program(&self, handle: ProgramHandle) -> Result<(), BackendError> {
        let mut programs = self
            .programs
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (programs): {e}")))?;
        if programs.remove(&handle).is_none() {
            return Err(BackendError::UnknownProgram { handle });
        }
        drop(programs);

        // Drop every pipeline compiled against the dead program.
        self.pipelines
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (pipelines): {e}")))?
            .retain(|key, _| key.vertex != handle && key.fragment != handle);

        log::debug!("WgpuRenderBackend: Destroyed program {handle:?}");
        Ok(())
    }

    fn bind_program(
        &self,
        stage: ProgramStage,
        handle: ProgramHandle,
    ) -> Result<(), BackendError> {
        {
            let programs = self
                .programs
                .lock()
                .map_err(|e| BackendError::Internal(format!("Mutex poisoned (programs): {e}")))?;
            let entry = programs
                .get(&handle)
                .ok_or(BackendError::UnknownProgram { handle })?;
            if entry.stage != stage {
                return Err(BackendError::Internal(format!(
                    "program {handle:?} is a {:?} program, bound as {stage:?}",
                    entry.stage
                )));
            }
        }

        let mut bound = self
            .bound
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (bound): {e}")))?;
        match stage {
            ProgramStage::Vertex => bound.vertex = Some(handle),
            ProgramStage::Fragment => bound.fragment = Some(handle),
        }
        log::debug!("WgpuRenderBackend: Bound {stage:?} program {handle:?}");
        Ok(())
    }

    fn unbind_program(&self, stage: ProgramStage) -> Result<(), BackendError> {
        let mut bound = self
            .bound
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (bound): {e}")))?;
        match stage {
            ProgramStage::Vertex => bound.vertex = None,
            ProgramStage::Fragment => bound.fragment = None,
        }
        Ok(())
    }

    fn set_program_constants(&self, stage: ProgramStage, data: &[u8]) -> Result<(), BackendError> {
        if data.len() as u64 > CONSTANT_BLOCK_SIZE {
            return Err(BackendError::Internal(format!(
                "constant block of {} bytes exceeds the {} byte stage buffer",
                data.len(),
                CONSTANT_BLOCK_SIZE
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        let target = match stage {
            ProgramStage::Vertex => &self.vertex_constants,
            ProgramStage::Fragment => &self.fragment_constants,
        };
        // Queue::write_buffer demands copy-aligned sizes; short blocks get a
        // zero-padded tail.
        if data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            self.queue.write_buffer(target, 0, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(pad_to_copy_alignment(data.len() as u64) as usize, 0);
            self.queue.write_buffer(target, 0, &padded);
        }
        log::debug!(
            "WgpuRenderBackend: Uploaded {} constant bytes to the {stage:?} stage",
            data.len()
        );
        Ok(())
    }

    fn draw(&self, command: &DrawCommand) -> Result<(), BackendError> {
        // 1. Resolve the bound program pair.
        let (vertex_program, fragment_program) = {
            let bound = self
                .bound
                .lock()
                .map_err(|e| BackendError::Internal(format!("Mutex poisoned (bound): {e}")))?;
            let vertex = bound.vertex.ok_or(BackendError::NoProgramBound {
                stage: ProgramStage::Vertex,
            })?;
            let fragment = bound.fragment.ok_or(BackendError::NoProgramBound {
                stage: ProgramStage::Fragment,
            })?;
            (vertex, fragment)
        };

        // 2. Fetch or compile the pipeline for this pair and vertex layout.
        let key = PipelineKey {
            vertex: vertex_program,
            fragment: fragment_program,
            layout: command.layout.clone(),
        };
        let mut pipelines = self
            .pipelines
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (pipelines): {e}")))?;
        let pipeline = match pipelines.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(slot) => {
                let pipeline =
                    self.compile_pipeline(vertex_program, fragment_program, &command.layout)?;
                slot.insert(pipeline)
            }
        };

        // 3. Record one pass into the offscreen target.
        let buffers = self
            .buffers
            .lock()
            .map_err(|e| BackendError::Internal(format!("Mutex poisoned (buffers): {e}")))?;
        let vertex_entry = buffers
            .get(&command.vertex_buffer)
            .ok_or(BackendError::UnknownBuffer {
                id: command.vertex_buffer,
            })?;
        let index_entry = match &command.indexed {
            Some(indexed) => Some(buffers.get(&indexed.buffer).ok_or(
                BackendError::UnknownBuffer { id: indexed.buffer },
            )?),
            None => None,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ardent_draw_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ardent_draw_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_entry.wgpu_buffer.slice(..));
            match (&command.indexed, index_entry) {
                (Some(indexed), Some(entry)) => {
                    pass.set_index_buffer(entry.wgpu_buffer.slice(..), indexed.format.into_wgpu());
                    pass.draw_indexed(0..indexed.index_count, 0, 0..1);
                }
                _ => pass.draw(0..command.vertex_count, 0..1),
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        log::debug!(
            "WgpuRenderBackend: Drew {} from buffer {:?}",
            match &command.indexed {
                Some(indexed) => format!("{} indices", indexed.index_count),
                None => format!("{} vertices", command.vertex_count),
            },
            command.vertex_buffer
        );
        Ok(())
    }
}
