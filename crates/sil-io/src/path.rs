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

//! Mapping of resource names that fall through every package to host paths.

use sil_core::config::PathSettings;
use sil_core::{ResourceError, MAX_PATH_LEN};
use std::path::PathBuf;

/// Literal prefix that escapes a name to the host filesystem.
pub const HOST_PREFIX: &str = "host:";

/// Builds host filesystem paths from resource names.
///
/// Only names not claimed by a registered package ever reach this resolver.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base: String,
    host_access: bool,
}

impl PathResolver {
    /// Creates a resolver from path settings.
    ///
    /// The base directory for relative names is, in order of preference: the
    /// explicit `data_dir`, the directory named by the `data_dir_env`
    /// environment variable, the directory of the running executable
    /// (symlinks resolved), and finally the current directory.
    pub fn from_settings(settings: &PathSettings) -> Self {
        let base = settings
            .data_dir
            .clone()
            .or_else(|| {
                let var = settings.data_dir_env.as_deref()?;
                std::env::var_os(var).map(PathBuf::from)
            })
            .or_else(executable_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        log::debug!("Host resource base directory: {}", base.display());
        Self::new(base.to_string_lossy().into_owned(), settings.host_access)
    }

    /// Creates a resolver with an explicit base directory.
    pub fn new(base: impl Into<String>, host_access: bool) -> Self {
        let mut base = base.into();
        while base.len() > 1 && base.ends_with('/') {
            base.pop();
        }
        Self { base, host_access }
    }

    /// The base directory prepended to relative names.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Whether host filesystem access is allowed.
    pub fn host_access(&self) -> bool {
        self.host_access
    }

    /// Enables or disables host filesystem access.
    pub fn set_host_access(&mut self, enabled: bool) {
        self.host_access = enabled;
    }

    /// Builds the host path for `name`.
    ///
    /// `host:<path>` yields `<path>` verbatim, `/<path>` is used as is, and
    /// anything else is placed under the base directory.
    ///
    /// # Errors
    /// - [`ResourceError::Disabled`] when host access is turned off.
    /// - [`ResourceError::PathTooLong`] when the result exceeds
    ///   [`MAX_PATH_LEN`] bytes.
    pub fn host_path(&self, name: &str) -> Result<PathBuf, ResourceError> {
        if !self.host_access {
            return Err(ResourceError::Disabled(name.to_owned()));
        }
        let path = if let Some(rest) = name.strip_prefix(HOST_PREFIX) {
            rest.to_owned()
        } else if name.starts_with('/') {
            name.to_owned()
        } else {
            format!("{}/{}", self.base, name)
        };
        if path.len() > MAX_PATH_LEN {
            return Err(ResourceError::PathTooLong(path.len()));
        }
        Ok(PathBuf::from(path))
    }
}

fn executable_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent().map(PathBuf::from)
}
