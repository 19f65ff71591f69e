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

//! Engine-wide settings for the resource, I/O and graphics subsystems.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A collection of every tunable knob, grouped by subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Background decompression of packaged resources.
    pub decompression: DecompressionSettings,
    /// Deferred deletion of GPU objects.
    pub deferred_delete: DeferredDeleteSettings,
    /// The shader program cache.
    pub shader_cache: ShaderCacheSettings,
    /// Initial sizing of resource manager tables.
    pub resource_pool: ResourcePoolSettings,
    /// Resource name resolution.
    pub paths: PathSettings,
    /// The asynchronous I/O table.
    pub io: IoSettings,
}

/// Settings for streaming decompression on worker threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompressionSettings {
    /// Whether large compressed entries are decoded by the worker pool.
    pub enabled: bool,
    /// Compressed size at or above which an entry is streamed.
    pub threshold: u64,
    /// Size of each read fed to the decoder.
    pub block_size: u32,
    /// Number of worker threads. Latched the first time decompression is enabled.
    pub num_workers: usize,
}

impl DecompressionSettings {
    /// The threshold actually applied: never at or below the block size.
    pub fn effective_threshold(&self) -> u64 {
        let floor = u64::from(self.block_size) + 1;
        self.threshold.max(floor)
    }
}

impl Default for DecompressionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 65_536,
            block_size: 65_536,
            num_workers: 1,
        }
    }
}

/// Settings for the deferred-deletion queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeferredDeleteSettings {
    /// Initial (or fixed) number of entries.
    pub size: usize,
    /// If `true`, the queue never grows and flushes itself when full.
    pub fixed: bool,
}

impl Default for DeferredDeleteSettings {
    fn default() -> Self {
        Self {
            size: 64,
            fixed: false,
        }
    }
}

/// Settings for the shader program cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderCacheSettings {
    /// Number of slots allocated up front. `0` defers allocation to the first lookup.
    pub initial_capacity: usize,
    /// Whether the table may grow when full instead of evicting.
    pub dynamic_resize: bool,
}

impl Default for ShaderCacheSettings {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            dynamic_resize: true,
        }
    }
}

/// Initial sizing hint for resource manager record tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePoolSettings {
    /// Number of records to reserve space for.
    pub num_records: usize,
}

/// Settings for resolving resource names to host paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Whether names may resolve to the host filesystem at all.
    pub host_access: bool,
    /// Explicit base directory for relative names. Defaults to the executable's directory.
    pub data_dir: Option<PathBuf>,
    /// Name of an environment variable that overrides the base directory.
    pub data_dir_env: Option<String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            host_access: true,
            data_dir: None,
            data_dir_env: option_env!("SIL_DATA_DIR_ENV").map(str::to_owned),
        }
    }
}

/// Settings for the asynchronous I/O table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoSettings {
    /// Number of requests that may be in flight at once, across all managers.
    pub max_in_flight: usize,
}

impl Default for IoSettings {
    fn default() -> Self {
        Self { max_in_flight: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_never_at_or_below_block_size() {
        let mut settings = DecompressionSettings {
            threshold: 100,
            block_size: 4096,
            ..Default::default()
        };
        assert_eq!(settings.effective_threshold(), 4097);
        settings.threshold = 4096;
        assert_eq!(settings.effective_threshold(), 4097);
        settings.threshold = 10_000;
        assert_eq!(settings.effective_threshold(), 10_000);
    }

    #[test]
    fn defaults_are_sane() {
        let settings = EngineSettings::default();
        assert!(!settings.decompression.enabled);
        assert!(settings.shader_cache.dynamic_resize);
        assert!(settings.paths.host_access);
        assert!(settings.io.max_in_flight > 0);
    }
}
