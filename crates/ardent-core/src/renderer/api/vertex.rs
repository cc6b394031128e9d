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

//! Vertex attribute layouts and the ordered signatures derived from them.

use std::fmt;

/// The meaning a vertex attribute carries into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    /// Object-space position.
    Position,
    /// Surface normal.
    Normal,
    /// Per-vertex color.
    Color,
    /// Texture coordinates.
    TexCoord,
    /// Surface tangent.
    Tangent,
}

impl VertexSemantic {
    /// A short lowercase name, used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            VertexSemantic::Position => "position",
            VertexSemantic::Normal => "normal",
            VertexSemantic::Color => "color",
            VertexSemantic::TexCoord => "texcoord",
            VertexSemantic::Tangent => "tangent",
        }
    }
}

/// The in-memory format of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// Four normalized unsigned bytes, commonly packed colors.
    Unorm8x4,
}

impl VertexAttributeFormat {
    /// Size of one attribute of this format in bytes.
    #[inline]
    pub const fn byte_size(self) -> u32 {
        match self {
            VertexAttributeFormat::Float32x2 => 8,
            VertexAttributeFormat::Float32x3 => 12,
            VertexAttributeFormat::Float32x4 => 16,
            VertexAttributeFormat::Unorm8x4 => 4,
        }
    }
}

/// One attribute within a [`VertexLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// What the attribute means.
    pub semantic: VertexSemantic,
    /// Distinguishes repeated semantics (e.g. a second texture coordinate set).
    pub semantic_index: u32,
    /// How the attribute is stored.
    pub format: VertexAttributeFormat,
    /// Byte offset of the attribute within one vertex.
    pub offset: u32,
}

impl VertexAttribute {
    /// Creates an attribute with semantic index 0.
    pub const fn new(semantic: VertexSemantic, format: VertexAttributeFormat, offset: u32) -> Self {
        Self {
            semantic,
            semantic_index: 0,
            format,
            offset,
        }
    }
}

/// An ordered description of the attributes in one vertex stream.
///
/// Attribute order is meaningful: two layouts carrying the same attributes in
/// a different order produce different [`VertexSignature`]s and may select
/// different emulation programs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: u32,
}

impl VertexLayout {
    /// Creates a layout from an ordered attribute list and the vertex stride.
    ///
    /// # Errors
    ///
    /// Rejects layouts where the same `(semantic, semantic_index)` pair
    /// appears more than once.
    pub fn new(
        attributes: Vec<VertexAttribute>,
        stride: u32,
    ) -> Result<Self, DuplicateAttribute> {
        for (i, a) in attributes.iter().enumerate() {
            for b in &attributes[i + 1..] {
                if a.semantic == b.semantic && a.semantic_index == b.semantic_index {
                    return Err(DuplicateAttribute {
                        semantic: a.semantic,
                        semantic_index: a.semantic_index,
                    });
                }
            }
        }
        Ok(Self { attributes, stride })
    }

    /// The attributes, in declaration order.
    #[inline]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Byte distance between consecutive vertices.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Returns `true` if any attribute carries the given semantic.
    pub fn has_semantic(&self, semantic: VertexSemantic) -> bool {
        self.attributes.iter().any(|a| a.semantic == semantic)
    }

    /// Derives the ordered semantic signature of this layout.
    pub fn signature(&self) -> VertexSignature {
        VertexSignature(self.attributes.iter().map(|a| a.semantic).collect())
    }
}

/// The error returned when a [`VertexLayout`] declares the same attribute twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateAttribute {
    /// The repeated semantic.
    pub semantic: VertexSemantic,
    /// The repeated semantic index.
    pub semantic_index: u32,
}

impl fmt::Display for DuplicateAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vertex layout declares '{}' (set {}) more than once",
            self.semantic.name(),
            self.semantic_index
        )
    }
}

impl std::error::Error for DuplicateAttribute {}

/// The ordered list of semantics a vertex layout exposes.
///
/// This is the key the fixed-function selector classifies against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexSignature(Vec<VertexSemantic>);

impl VertexSignature {
    /// The semantics in declaration order.
    #[inline]
    pub fn semantics(&self) -> &[VertexSemantic] {
        &self.0
    }

    /// Returns `true` if the signature carries the given semantic anywhere.
    pub fn has(&self, semantic: VertexSemantic) -> bool {
        self.0.contains(&semantic)
    }
}

impl From<Vec<VertexSemantic>> for VertexSignature {
    fn from(semantics: Vec<VertexSemantic>) -> Self {
        Self(semantics)
    }
}

impl fmt::Display for VertexSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(empty)");
        }
        for (i, semantic) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}", semantic.name())?;
        }
        Ok(())
    }
}
