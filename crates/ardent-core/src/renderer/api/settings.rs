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

//! Tunables for the staging path.

/// Configuration for scratch staging and lock routing.
///
/// The defaults suit desktop drivers; embedded targets with tight CPU memory
/// may want a smaller pool and a lower threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingConfig {
    /// Total size of the scratch arena in bytes.
    ///
    /// Rounded up to the pool's block alignment at construction.
    pub scratch_capacity: usize,
    /// Locks shorter than this many bytes try the scratch pool first;
    /// everything at or above it maps natively.
    pub map_threshold: u64,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            scratch_capacity: 1024 * 1024,
            map_threshold: 32 * 1024,
        }
    }
}
