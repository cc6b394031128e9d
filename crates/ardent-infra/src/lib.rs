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

//! Concrete implementations of the `ardent-core` contracts.
//!
//! Where `ardent-core` defines what a backend must do, this crate supplies
//! one that actually does it: the [`graphics`] module maps the
//! [`RenderBackend`](ardent_core::renderer::RenderBackend) contract onto
//! `wgpu`, together with the WGSL programs backing fixed-function emulation
//! and a headless context helper for bootstrapping a device.

pub mod graphics;
