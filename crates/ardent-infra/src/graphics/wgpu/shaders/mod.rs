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

//! The embedded WGSL sources of the fixed-function emulation catalog.
//!
//! Seven vertex programs cover the supported vertex signatures and three
//! fragment programs cover the texturing variants. Every vertex program
//! writes the same output interface (color at `@location(0)`, uv at
//! `@location(1)`), so any vertex program links against any fragment
//! program.
//!
//! # Available Shaders
//!
//! - [`POSITION_WGSL`]: position-only vertices, shaded opaque white.
//! - [`POSITION_TEXCOORD_WGSL`]: position + texture coordinates.
//! - [`POSITION_COLOR_WGSL`]: position + per-vertex color.
//! - [`POSITION_COLOR_TEXCOORD_WGSL`]: position, color, texcoord order.
//! - [`POSITION_TEXCOORD_COLOR_WGSL`]: position, texcoord, color order.
//! - [`POSITION_NORMAL_TEXCOORD_WGSL`]: headlight-shaded, textured.
//! - [`POSITION_NORMAL_COLOR_WGSL`]: headlight-shaded, vertex-colored.
//! - [`FRAGMENT_TEXTURE_WGSL`]: sample the stage texture.
//! - [`FRAGMENT_COLOR_WGSL`]: pass the interpolated color through.
//! - [`FRAGMENT_TEXTURE_COLOR_WGSL`]: texel modulated by color.
//!
//! # Usage
//!
//! ```ignore
//! let backend = WgpuRenderBackend::new(device, queue);
//! let catalog = shaders::register_emulation_programs(&backend)?;
//! let system = RenderSystem::new(Arc::new(backend), catalog, config);
//! ```

use ardent_core::renderer::{
    BackendError, EmulationCatalog, ProgramDescriptor, ProgramStage, RenderBackend,
};
use std::borrow::Cow;

/// Vertex program for position-only streams.
pub const POSITION_WGSL: &str = include_str!("position.wgsl");

/// Vertex program for position + texcoord streams.
pub const POSITION_TEXCOORD_WGSL: &str = include_str!("position_texcoord.wgsl");

/// Vertex program for position + color streams.
pub const POSITION_COLOR_WGSL: &str = include_str!("position_color.wgsl");

/// Vertex program for streams declaring color before texcoord.
pub const POSITION_COLOR_TEXCOORD_WGSL: &str = include_str!("position_color_texcoord.wgsl");

/// Vertex program for streams declaring texcoord before color.
pub const POSITION_TEXCOORD_COLOR_WGSL: &str = include_str!("position_texcoord_color.wgsl");

/// Vertex program for position + normal + texcoord streams.
pub const POSITION_NORMAL_TEXCOORD_WGSL: &str = include_str!("position_normal_texcoord.wgsl");

/// Vertex program for position + normal + color streams.
pub const POSITION_NORMAL_COLOR_WGSL: &str = include_str!("position_normal_color.wgsl");

/// Fragment program sampling the stage texture.
pub const FRAGMENT_TEXTURE_WGSL: &str = include_str!("fragment_texture.wgsl");

/// Fragment program passing the interpolated color through.
pub const FRAGMENT_COLOR_WGSL: &str = include_str!("fragment_color.wgsl");

/// Fragment program modulating the sampled texel by the interpolated color.
pub const FRAGMENT_TEXTURE_COLOR_WGSL: &str = include_str!("fragment_texture_color.wgsl");

/// Compiles the ten built-in programs and assembles the emulation catalog.
///
/// ## Arguments
/// * `backend` - The backend the programs are registered against.
///
/// ## Returns
/// The filled [`EmulationCatalog`], or the first error the backend reported
/// while compiling.
pub fn register_emulation_programs(
    backend: &dyn RenderBackend,
) -> Result<EmulationCatalog, BackendError> {
    let vertex = |label: &'static str, source: &'static str| ProgramDescriptor {
        label: Some(Cow::Borrowed(label)),
        stage: ProgramStage::Vertex,
        source: Cow::Borrowed(source),
        entry_point: Cow::Borrowed("vs_main"),
    };
    let fragment = |label: &'static str, source: &'static str| ProgramDescriptor {
        label: Some(Cow::Borrowed(label)),
        stage: ProgramStage::Fragment,
        source: Cow::Borrowed(source),
        entry_point: Cow::Borrowed("fs_main"),
    };

    Ok(EmulationCatalog {
        position: backend.create_program(&vertex("ff_position", POSITION_WGSL))?,
        position_texcoord: backend
            .create_program(&vertex("ff_position_texcoord", POSITION_TEXCOORD_WGSL))?,
        position_color: backend.create_program(&vertex("ff_position_color", POSITION_COLOR_WGSL))?,
        position_color_texcoord: backend.create_program(&vertex(
            "ff_position_color_texcoord",
            POSITION_COLOR_TEXCOORD_WGSL,
        ))?,
        position_texcoord_color: backend.create_program(&vertex(
            "ff_position_texcoord_color",
            POSITION_TEXCOORD_COLOR_WGSL,
        ))?,
        position_normal_texcoord: backend.create_program(&vertex(
            "ff_position_normal_texcoord",
            POSITION_NORMAL_TEXCOORD_WGSL,
        ))?,
        position_normal_color: backend.create_program(&vertex(
            "ff_position_normal_color",
            POSITION_NORMAL_COLOR_WGSL,
        ))?,
        fragment_texture: backend
            .create_program(&fragment("ff_fragment_texture", FRAGMENT_TEXTURE_WGSL))?,
        fragment_color: backend
            .create_program(&fragment("ff_fragment_color", FRAGMENT_COLOR_WGSL))?,
        fragment_texture_color: backend.create_program(&fragment(
            "ff_fragment_texture_color",
            FRAGMENT_TEXTURE_COLOR_WGSL,
        ))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX_SOURCES: [(&str, &str); 7] = [
        ("position", POSITION_WGSL),
        ("position_texcoord", POSITION_TEXCOORD_WGSL),
        ("position_color", POSITION_COLOR_WGSL),
        ("position_color_texcoord", POSITION_COLOR_TEXCOORD_WGSL),
        ("position_texcoord_color", POSITION_TEXCOORD_COLOR_WGSL),
        ("position_normal_texcoord", POSITION_NORMAL_TEXCOORD_WGSL),
        ("position_normal_color", POSITION_NORMAL_COLOR_WGSL),
    ];

    const FRAGMENT_SOURCES: [(&str, &str); 3] = [
        ("fragment_texture", FRAGMENT_TEXTURE_WGSL),
        ("fragment_color", FRAGMENT_COLOR_WGSL),
        ("fragment_texture_color", FRAGMENT_TEXTURE_COLOR_WGSL),
    ];

    #[test]
    fn test_vertex_shaders_loaded() {
        for (name, source) in VERTEX_SOURCES {
            assert!(source.contains("@vertex"), "{name} lacks a vertex entry");
            assert!(source.contains("fn vs_main"), "{name} lacks vs_main");
            assert!(
                source.contains("var<uniform> transforms"),
                "{name} lacks the transform block"
            );
        }
    }

    #[test]
    fn test_fragment_shaders_loaded() {
        for (name, source) in FRAGMENT_SOURCES {
            assert!(source.contains("@fragment"), "{name} lacks a fragment entry");
            assert!(source.contains("fn fs_main"), "{name} lacks fs_main");
        }
    }

    #[test]
    fn test_texture_variants_sample_the_stage_texture() {
        assert!(FRAGMENT_TEXTURE_WGSL.contains("texture_2d"));
        assert!(FRAGMENT_TEXTURE_COLOR_WGSL.contains("texture_2d"));
        assert!(!FRAGMENT_COLOR_WGSL.contains("texture_2d"));
    }

    #[test]
    fn test_vertex_shaders_share_one_output_interface() {
        // Any vertex program must link against any fragment program, so all
        // of them have to emit color at location 0 and uv at location 1.
        for (name, source) in VERTEX_SOURCES {
            assert!(
                source.contains("@location(0) color: vec4<f32>"),
                "{name} breaks the color output contract"
            );
            assert!(
                source.contains("@location(1) uv: vec2<f32>"),
                "{name} breaks the uv output contract"
            );
        }
    }
}
