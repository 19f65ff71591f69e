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

use serde::Deserialize;
use std::path::PathBuf;

/// Represents the structure of the `Pack.toml` manifest file.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct PackManifest {
    /// Directory whose files become pack entries.
    pub source: PathBuf,
    /// Archive to write.
    pub output: PathBuf,
    /// Decompressed size of each compressed block.
    pub block_size: u32,
    /// File extensions stored LZ4-compressed, without the dot.
    pub compress: Vec<String>,
}

impl Default for PackManifest {
    /// Packs `resources/assets` into `.dist/assets.silpack`, uncompressed.
    fn default() -> Self {
        Self {
            source: PathBuf::from("resources/assets"),
            output: PathBuf::from(".dist/assets.silpack"),
            block_size: 64 * 1024,
            compress: Vec::new(),
        }
    }
}

impl PackManifest {
    /// Returns `true` if files with `extension` are stored compressed.
    pub fn compresses(&self, extension: &str) -> bool {
        self.compress
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
