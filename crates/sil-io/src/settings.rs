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

//! Loading [`EngineSettings`] from RON documents.

use sil_core::EngineSettings;
use std::path::Path;
use thiserror::Error;

/// An error raised while reading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not valid RON for [`EngineSettings`].
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The settings could not be serialized.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

/// Parses settings from a RON string. Missing fields take their defaults.
pub fn parse_settings(source: &str) -> Result<EngineSettings, SettingsError> {
    Ok(ron::from_str(source)?)
}

/// Reads settings from a RON file.
pub fn load_settings(path: impl AsRef<Path>) -> Result<EngineSettings, SettingsError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    let settings = parse_settings(&source)?;
    log::debug!("Loaded settings from '{}'", path.display());
    Ok(settings)
}

/// Renders settings as pretty-printed RON.
pub fn to_ron_string(settings: &EngineSettings) -> Result<String, SettingsError> {
    let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
    Ok(ron::ser::to_string_pretty(settings, pretty)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = parse_settings(
            "(decompression: (enabled: true, num_workers: 3), shader_cache: (dynamic_resize: false))",
        )
        .unwrap();
        assert!(settings.decompression.enabled);
        assert_eq!(settings.decompression.num_workers, 3);
        assert_eq!(settings.decompression.block_size, 65_536);
        assert!(!settings.shader_cache.dynamic_resize);
        assert_eq!(settings.deferred_delete.size, 64);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        let mut settings = EngineSettings::default();
        settings.io.max_in_flight = 7;
        settings.deferred_delete.fixed = true;
        std::fs::write(&path, to_ron_string(&settings).unwrap()).unwrap();

        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn malformed_document() {
        assert!(matches!(
            parse_settings("(decompression: (enabled: maybe))"),
            Err(SettingsError::Parse(_))
        ));
    }
}
