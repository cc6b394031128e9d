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

//! Minimal linear-algebra primitives for transform state.
//!
//! The render system only needs column-major 4x4 matrices and their vector
//! companions to carry world/view/projection state into program constants,
//! so this module stays deliberately small.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub mod matrix;
pub mod vector;

pub use self::matrix::Mat4;
pub use self::vector::{Vec3, Vec4};

/// Returns `true` if `a` and `b` differ by less than [`EPSILON`].
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}
