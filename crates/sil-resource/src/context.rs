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

//! Services shared by every resource manager of an engine.

use sil_core::config::DecompressionSettings;
use sil_core::{ResourceCodec, ResourceError};
use sil_io::{AsyncLoader, Vfs};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Process-unique identity of a resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerId(u64);

impl ManagerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// The collaborators a resource manager loads through.
///
/// Cloning is cheap; managers created from clones of one context share the
/// VFS, the I/O table and the decompression settings.
#[derive(Clone)]
pub struct ResourceContext {
    vfs: Arc<Vfs>,
    loader: Arc<AsyncLoader>,
    codec: Arc<dyn ResourceCodec>,
    decompression: Arc<RwLock<DecompressionSettings>>,
}

impl fmt::Debug for ResourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceContext")
            .field("vfs", &self.vfs)
            .field("loader", &self.loader)
            .field("decompression", &self.decompression)
            .finish_non_exhaustive()
    }
}

impl ResourceContext {
    /// Creates a context with background decompression disabled.
    pub fn new(vfs: Arc<Vfs>, loader: Arc<AsyncLoader>, codec: Arc<dyn ResourceCodec>) -> Self {
        Self {
            vfs,
            loader,
            codec,
            decompression: Arc::new(RwLock::new(DecompressionSettings::default())),
        }
    }

    /// The virtual filesystem names are resolved against.
    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    /// The shared asynchronous loader.
    pub fn loader(&self) -> &Arc<AsyncLoader> {
        &self.loader
    }

    /// The codec producing typed payloads.
    pub fn codec(&self) -> &Arc<dyn ResourceCodec> {
        &self.codec
    }

    /// Current background decompression settings.
    pub fn decompression(&self) -> DecompressionSettings {
        self.decompression
            .read()
            .expect("decompression settings lock poisoned")
            .clone()
    }

    /// Replaces the background decompression settings.
    ///
    /// Enabling starts the worker pool on first use; the worker count given the
    /// first time is kept for the lifetime of the loader.
    pub fn set_decompression(&self, settings: DecompressionSettings) -> Result<(), ResourceError> {
        if settings.enabled {
            self.loader.enable_decompression(settings.num_workers)?;
        }
        log::debug!(
            "Background decompression {} (threshold {}, block size {})",
            if settings.enabled { "enabled" } else { "disabled" },
            settings.effective_threshold(),
            settings.block_size
        );
        *self
            .decompression
            .write()
            .expect("decompression settings lock poisoned") = settings;
        Ok(())
    }
}
