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

// Ardent headless demo
// Draws one fixed-function triangle through the wgpu backend without a window.

use std::mem;
use std::sync::Arc;

use anyhow::Result;
use ardent_core::math::{Mat4, Vec3};
use ardent_core::renderer::{
    RenderBackend, RenderOperation, RenderSystem, StagingConfig, VertexAttribute,
    VertexAttributeFormat, VertexLayout, VertexSemantic,
};
use ardent_infra::graphics::wgpu::{WgpuContext, WgpuRenderBackend};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 4],
}

impl Vertex {
    fn layout() -> Result<VertexLayout> {
        Ok(VertexLayout::new(
            vec![
                VertexAttribute::new(VertexSemantic::Position, VertexAttributeFormat::Float32x3, 0),
                VertexAttribute::new(
                    VertexSemantic::Color,
                    VertexAttributeFormat::Float32x4,
                    mem::size_of::<[f32; 3]>() as u32,
                ),
            ],
            mem::size_of::<Vertex>() as u32,
        )?)
    }
}

const VERTICES: &[Vertex] = &[
    Vertex {
        position: [0.0, 0.5, 0.0],
        color: [1.0, 0.0, 0.0, 1.0],
    },
    Vertex {
        position: [-0.5, -0.5, 0.0],
        color: [0.0, 1.0, 0.0, 1.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.0],
        color: [0.0, 0.0, 1.0, 1.0],
    },
];

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let context = WgpuContext::new_blocking()?;
    log::info!(
        "Headless demo on '{}' ({:?})",
        context.adapter_name,
        context.adapter_backend
    );

    let backend = Arc::new(WgpuRenderBackend::new(context.device, context.queue));
    let catalog = ardent_infra::graphics::wgpu::shaders::register_emulation_programs(
        backend.as_ref(),
    )?;
    let mut system = RenderSystem::new(
        backend.clone() as Arc<dyn RenderBackend>,
        catalog,
        StagingConfig::default(),
    );

    // Upload the triangle through the staging path. The write is small
    // enough to ride the scratch pool.
    let layout = Vertex::layout()?;
    let triangle = system.create_vertex_buffer(
        mem::size_of::<Vertex>() as u32,
        VERTICES.len() as u32,
        Some("demo_triangle"),
    )?;
    system.write_buffer_data(triangle, 0, bytemuck::cast_slice(VERTICES), true)?;

    // No application programs are bound, so the draw is emulated from the
    // vertex signature (position + color) and the current transforms.
    system.set_world_matrix(Mat4::from_scale(Vec3::new(0.8, 0.8, 1.0)));
    system.render(&RenderOperation {
        vertex_buffer: triangle,
        layout,
        vertex_count: VERTICES.len() as u32,
        indexed: None,
        texturing_enabled: false,
    })?;
    backend.wait_idle()?;

    let stats = system.stats();
    log::info!(
        "Frame done: {} draw(s), {} emulated, {} bytes staged",
        stats.draw_calls,
        stats.emulated_draws,
        stats.bytes_staged
    );

    system.destroy_buffer(triangle)?;
    Ok(())
}
