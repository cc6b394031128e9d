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

//! Fixed-function emulation over a fully programmable pipeline.
//!
//! Draws that arrive without an application program on every stage still have
//! to produce correct output, so the renderer keeps a small catalog of
//! built-in programs and a [`FixedFunctionSelector`] that fills the gaps for
//! the duration of one draw:
//!
//! 1. The vertex layout's ordered [`VertexSignature`] is classified into one
//!    of the supported [`SignatureKind`]s; anything else is rejected before
//!    any pipeline state changes.
//! 2. The matching vertex program is bound and fed the current
//!    world/view/projection matrices as [`EmulationConstants`].
//! 3. A fragment program is chosen from texturing and the presence of a color
//!    attribute.
//! 4. After the draw, [`end`](FixedFunctionSelector::end) unbinds exactly the
//!    stages the selector bound, leaving application bindings untouched.

use crate::math::Mat4;
use crate::renderer::api::{ProgramHandle, ProgramStage, StageMask, VertexSemantic, VertexSignature};
use crate::renderer::error::EmulationError;
use crate::renderer::traits::RenderBackend;

/// The vertex signatures the built-in programs cover.
///
/// Classification is order-sensitive: a signature listing texture coordinates
/// before its color attribute interpolates differently than one listing them
/// the other way around, so the two get distinct kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    /// Position only.
    Position,
    /// Position, then texture coordinates.
    PositionTexcoord,
    /// Position, then color.
    PositionColor,
    /// Position, color, texture coordinates.
    PositionColorTexcoord,
    /// Position, texture coordinates, color.
    PositionTexcoordColor,
    /// Position, normal, texture coordinates.
    PositionNormalTexcoord,
    /// Position, normal, color.
    PositionNormalColor,
}

impl SignatureKind {
    /// Maps an ordered signature to its kind, or `None` when no built-in
    /// vertex program covers it.
    pub fn classify(signature: &VertexSignature) -> Option<Self> {
        use VertexSemantic::{Color, Normal, Position, TexCoord};
        match signature.semantics() {
            [Position] => Some(Self::Position),
            [Position, TexCoord] => Some(Self::PositionTexcoord),
            [Position, Color] => Some(Self::PositionColor),
            [Position, Color, TexCoord] => Some(Self::PositionColorTexcoord),
            [Position, TexCoord, Color] => Some(Self::PositionTexcoordColor),
            [Position, Normal, TexCoord] => Some(Self::PositionNormalTexcoord),
            [Position, Normal, Color] => Some(Self::PositionNormalColor),
            _ => None,
        }
    }

    /// Whether vertices of this kind carry a color attribute.
    pub fn has_color(self) -> bool {
        matches!(
            self,
            Self::PositionColor
                | Self::PositionColorTexcoord
                | Self::PositionTexcoordColor
                | Self::PositionNormalColor
        )
    }
}

/// The built-in fragment programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentVariant {
    /// Sample the bound texture.
    Texture,
    /// Pass the interpolated vertex color through.
    Color,
    /// Modulate the sampled texel by the interpolated color.
    TextureColor,
}

impl FragmentVariant {
    /// Picks the fragment program for a draw.
    ///
    /// Untextured draws always use the color variant; vertex programs emit an
    /// opaque white color when the signature has no color attribute, so the
    /// pass-through shades such geometry solid white.
    pub fn select(texturing_enabled: bool, has_color: bool) -> Self {
        match (texturing_enabled, has_color) {
            (true, true) => Self::TextureColor,
            (true, false) => Self::Texture,
            (false, _) => Self::Color,
        }
    }
}

/// Handles of every built-in program, one per signature kind and fragment
/// variant.
///
/// The backend compiles these once at startup; the struct is plain data so a
/// backend can assemble it without this module knowing where the sources live.
#[derive(Debug, Clone, Copy)]
pub struct EmulationCatalog {
    /// Vertex program for [`SignatureKind::Position`].
    pub position: ProgramHandle,
    /// Vertex program for [`SignatureKind::PositionTexcoord`].
    pub position_texcoord: ProgramHandle,
    /// Vertex program for [`SignatureKind::PositionColor`].
    pub position_color: ProgramHandle,
    /// Vertex program for [`SignatureKind::PositionColorTexcoord`].
    pub position_color_texcoord: ProgramHandle,
    /// Vertex program for [`SignatureKind::PositionTexcoordColor`].
    pub position_texcoord_color: ProgramHandle,
    /// Vertex program for [`SignatureKind::PositionNormalTexcoord`].
    pub position_normal_texcoord: ProgramHandle,
    /// Vertex program for [`SignatureKind::PositionNormalColor`].
    pub position_normal_color: ProgramHandle,
    /// Fragment program for [`FragmentVariant::Texture`].
    pub fragment_texture: ProgramHandle,
    /// Fragment program for [`FragmentVariant::Color`].
    pub fragment_color: ProgramHandle,
    /// Fragment program for [`FragmentVariant::TextureColor`].
    pub fragment_texture_color: ProgramHandle,
}

impl EmulationCatalog {
    /// The vertex program covering `kind`.
    pub fn vertex_program(&self, kind: SignatureKind) -> ProgramHandle {
        match kind {
            SignatureKind::Position => self.position,
            SignatureKind::PositionTexcoord => self.position_texcoord,
            SignatureKind::PositionColor => self.position_color,
            SignatureKind::PositionColorTexcoord => self.position_color_texcoord,
            SignatureKind::PositionTexcoordColor => self.position_texcoord_color,
            SignatureKind::PositionNormalTexcoord => self.position_normal_texcoord,
            SignatureKind::PositionNormalColor => self.position_normal_color,
        }
    }

    /// The fragment program implementing `variant`.
    pub fn fragment_program(&self, variant: FragmentVariant) -> ProgramHandle {
        match variant {
            FragmentVariant::Texture => self.fragment_texture,
            FragmentVariant::Color => self.fragment_color,
            FragmentVariant::TextureColor => self.fragment_texture_color,
        }
    }
}

/// The transform constants pushed to built-in vertex programs.
///
/// Matrices are stored column-major as WGSL expects them; the struct layout
/// matches a uniform block of three `mat4x4<f32>` fields.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EmulationConstants {
    /// Model-to-world transform.
    pub world: [[f32; 4]; 4],
    /// World-to-camera transform.
    pub view: [[f32; 4]; 4],
    /// Camera-to-clip transform.
    pub projection: [[f32; 4]; 4],
}

impl EmulationConstants {
    /// Packs the three transform matrices for upload.
    pub fn new(world: &Mat4, view: &Mat4, projection: &Mat4) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }

    /// The raw bytes to hand to [`RenderBackend::set_program_constants`].
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[derive(Debug, Clone, Copy)]
struct EmulationSession {
    bound: StageMask,
}

/// Binds built-in programs around draws that lack application programs.
///
/// The selector is either idle or inside one emulation session. Sessions do
/// not nest; the caller brackets each emulated draw with
/// [`begin`](Self::begin) and [`end`](Self::end).
#[derive(Debug)]
pub struct FixedFunctionSelector {
    catalog: EmulationCatalog,
    session: Option<EmulationSession>,
}

impl FixedFunctionSelector {
    /// Creates an idle selector over a compiled program catalog.
    pub fn new(catalog: EmulationCatalog) -> Self {
        Self {
            catalog,
            session: None,
        }
    }

    /// The catalog the selector binds from.
    pub fn catalog(&self) -> &EmulationCatalog {
        &self.catalog
    }

    /// Whether an emulation session is open.
    pub fn is_emulating(&self) -> bool {
        self.session.is_some()
    }

    /// Opens an emulation session for one draw.
    ///
    /// Only the stages absent from `already_bound` are filled in, so
    /// application programs keep their stage. A freshly bound vertex program
    /// receives `constants` immediately; a stage the application owns is
    /// never written to.
    ///
    /// ## Arguments
    ///
    /// * `backend` - The backend to bind programs on.
    /// * `signature` - The ordered vertex signature of the incoming geometry.
    /// * `texturing_enabled` - Whether the draw samples a texture.
    /// * `constants` - Transform matrices for the emulated vertex stage.
    /// * `already_bound` - The stages the application has programs on.
    ///
    /// ## Returns
    ///
    /// An error if a session is already open or no built-in vertex program
    /// covers `signature`; in both cases no pipeline state has changed.
    pub fn begin(
        &mut self,
        backend: &dyn RenderBackend,
        signature: &VertexSignature,
        texturing_enabled: bool,
        constants: &EmulationConstants,
        already_bound: StageMask,
    ) -> Result<(), EmulationError> {
        if self.session.is_some() {
            return Err(EmulationError::AlreadyEmulating);
        }

        // Classify before touching the backend so rejection is side-effect
        // free.
        let kind = SignatureKind::classify(signature).ok_or_else(|| {
            EmulationError::UnsupportedSignature {
                signature: signature.clone(),
            }
        })?;

        let mut bound = StageMask::EMPTY;
        if !already_bound.contains(StageMask::VERTEX) {
            backend.bind_program(ProgramStage::Vertex, self.catalog.vertex_program(kind))?;
            bound.insert(StageMask::VERTEX);
            if let Err(error) =
                backend.set_program_constants(ProgramStage::Vertex, constants.as_bytes())
            {
                self.release(backend, bound);
                return Err(error.into());
            }
        }
        if !already_bound.contains(StageMask::FRAGMENT) {
            let variant = FragmentVariant::select(texturing_enabled, kind.has_color());
            if let Err(error) =
                backend.bind_program(ProgramStage::Fragment, self.catalog.fragment_program(variant))
            {
                self.release(backend, bound);
                return Err(error.into());
            }
            bound.insert(StageMask::FRAGMENT);
        }

        self.session = Some(EmulationSession { bound });
        Ok(())
    }

    /// Closes the open session, unbinding exactly the stages it bound.
    ///
    /// Both stages are released even when the first unbind fails; the first
    /// error is returned.
    pub fn end(&mut self, backend: &dyn RenderBackend) -> Result<(), EmulationError> {
        let session = self.session.take().ok_or(EmulationError::NotEmulating)?;
        let vertex = if session.bound.contains(StageMask::VERTEX) {
            backend.unbind_program(ProgramStage::Vertex)
        } else {
            Ok(())
        };
        let fragment = if session.bound.contains(StageMask::FRAGMENT) {
            backend.unbind_program(ProgramStage::Fragment)
        } else {
            Ok(())
        };
        vertex.and(fragment).map_err(EmulationError::from)
    }

    /// Best-effort rollback for a partially opened session.
    fn release(&self, backend: &dyn RenderBackend, bound: StageMask) {
        for stage in [ProgramStage::Vertex, ProgramStage::Fragment] {
            if bound.contains(stage.mask()) {
                if let Err(error) = backend.unbind_program(stage) {
                    log::warn!("Failed to roll back emulated {:?} program: {}", stage, error);
                }
            }
        }
    }
}
