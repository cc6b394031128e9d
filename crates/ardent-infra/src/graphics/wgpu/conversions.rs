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

//! Mappings between `ardent-core` rendering types and their wgpu
//! counterparts.
//!
//! The [`shader_location`] table is load-bearing: the WGSL sources in
//! [`shaders`](super::shaders) hard-code these `@location` indices, so any
//! vertex layout expanded through [`vertex_attributes`] lines up with any
//! pipeline compiled from the catalog.

use ardent_core::renderer::{
    BufferUsage, IndexFormat, VertexAttributeFormat, VertexLayout, VertexSemantic,
};

/// A local extension trait converting engine types into their wgpu
/// equivalents without colliding with the orphan rule, while keeping an
/// idiomatic `.into_wgpu()` call syntax.
pub trait IntoWgpu<W> {
    /// Performs the conversion.
    fn into_wgpu(self) -> W;
}

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let mut usages = wgpu::BufferUsages::empty();
        if self.contains(BufferUsage::MAP_READ) {
            usages |= wgpu::BufferUsages::MAP_READ;
        }
        if self.contains(BufferUsage::MAP_WRITE) {
            usages |= wgpu::BufferUsages::MAP_WRITE;
        }
        if self.contains(BufferUsage::COPY_SRC) {
            usages |= wgpu::BufferUsages::COPY_SRC;
        }
        if self.contains(BufferUsage::COPY_DST) {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        if self.contains(BufferUsage::VERTEX) {
            usages |= wgpu::BufferUsages::VERTEX;
        }
        if self.contains(BufferUsage::INDEX) {
            usages |= wgpu::BufferUsages::INDEX;
        }
        if self.contains(BufferUsage::UNIFORM) {
            usages |= wgpu::BufferUsages::UNIFORM;
        }
        usages
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl IntoWgpu<wgpu::VertexFormat> for VertexAttributeFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexAttributeFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexAttributeFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexAttributeFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexAttributeFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
        }
    }
}

/// The `@location` index an attribute occupies in the emulation shaders.
///
/// Semantic set 0 gets the base slot; further sets are shifted past the whole
/// table so repeated semantics never collide.
pub fn shader_location(semantic: VertexSemantic, semantic_index: u32) -> u32 {
    let base = match semantic {
        VertexSemantic::Position => 0,
        VertexSemantic::Normal => 1,
        VertexSemantic::Color => 2,
        VertexSemantic::TexCoord => 3,
        VertexSemantic::Tangent => 4,
    };
    base + semantic_index * 5
}

/// Expands a [`VertexLayout`] into the wgpu attribute list of one vertex
/// buffer slot, with shader locations assigned per [`shader_location`].
pub fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes()
        .iter()
        .map(|attribute| wgpu::VertexAttribute {
            format: attribute.format.into_wgpu(),
            offset: u64::from(attribute.offset),
            shader_location: shader_location(attribute.semantic, attribute.semantic_index),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ardent_core::renderer::VertexAttribute;

    #[test]
    fn buffer_usage_conversion_maps_every_flag() {
        let all = BufferUsage::MAP_READ
            | BufferUsage::MAP_WRITE
            | BufferUsage::COPY_SRC
            | BufferUsage::COPY_DST
            | BufferUsage::VERTEX
            | BufferUsage::INDEX
            | BufferUsage::UNIFORM;
        let converted = all.into_wgpu();
        assert!(converted.contains(wgpu::BufferUsages::MAP_READ));
        assert!(converted.contains(wgpu::BufferUsages::MAP_WRITE));
        assert!(converted.contains(wgpu::BufferUsages::COPY_SRC));
        assert!(converted.contains(wgpu::BufferUsages::COPY_DST));
        assert!(converted.contains(wgpu::BufferUsages::VERTEX));
        assert!(converted.contains(wgpu::BufferUsages::INDEX));
        assert!(converted.contains(wgpu::BufferUsages::UNIFORM));

        assert_eq!(BufferUsage::EMPTY.into_wgpu(), wgpu::BufferUsages::empty());
        assert_eq!(
            BufferUsage::VERTEX.into_wgpu(),
            wgpu::BufferUsages::VERTEX
        );
    }

    #[test]
    fn index_format_conversion() {
        assert_eq!(IndexFormat::Uint16.into_wgpu(), wgpu::IndexFormat::Uint16);
        assert_eq!(IndexFormat::Uint32.into_wgpu(), wgpu::IndexFormat::Uint32);
    }

    #[test]
    fn vertex_format_sizes_survive_conversion() {
        for format in [
            VertexAttributeFormat::Float32x2,
            VertexAttributeFormat::Float32x3,
            VertexAttributeFormat::Float32x4,
            VertexAttributeFormat::Unorm8x4,
        ] {
            assert_eq!(
                u64::from(format.byte_size()),
                format.into_wgpu().size(),
                "{format:?}"
            );
        }
    }

    #[test]
    fn shader_locations_are_distinct_across_semantics_and_sets() {
        use VertexSemantic::*;
        let mut seen = std::collections::HashSet::new();
        for semantic in [Position, Normal, Color, TexCoord, Tangent] {
            for set in 0..2 {
                assert!(
                    seen.insert(shader_location(semantic, set)),
                    "{semantic:?} set {set} collides"
                );
            }
        }
    }

    #[test]
    fn layout_expansion_preserves_offsets_and_formats() {
        let layout = VertexLayout::new(
            vec![
                VertexAttribute::new(VertexSemantic::Position, VertexAttributeFormat::Float32x3, 0),
                VertexAttribute::new(VertexSemantic::TexCoord, VertexAttributeFormat::Float32x2, 12),
            ],
            20,
        )
        .unwrap();

        let attributes = vertex_attributes(&layout);
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].shader_location, 0);
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(attributes[1].shader_location, 3);
        assert_eq!(attributes[1].offset, 12);
        assert_eq!(attributes[1].format, wgpu::VertexFormat::Float32x2);
    }
}
