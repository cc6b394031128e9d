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

//! Counters describing render-system activity.

/// Accumulated counters for draws and staging traffic.
///
/// Counters only ever grow; call [`reset`](RenderStats::reset) at whatever
/// cadence the telemetry layer samples them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Draws submitted through the system.
    pub draw_calls: u64,
    /// Draws that went through fixed-function emulation for at least one stage.
    pub emulated_draws: u64,
    /// Locks serviced by the scratch pool.
    pub scratch_locks: u64,
    /// Locks serviced by native mapping.
    pub mapped_locks: u64,
    /// Bytes flushed from scratch memory into native buffers on unlock.
    pub bytes_staged: u64,
}

impl RenderStats {
    /// Clears every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
