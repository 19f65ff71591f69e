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

use anyhow::{Context, Result};
use sil_core::config::DecompressionSettings;
use sil_core::{EngineSettings, GpuObject, PackageModule, Renderer, ResourceCodec, ResourceError};
use sil_graphics::{DeferredDeleteQueue, Lookup, ShaderCache, ShaderCacheError};
use sil_input::{BuiltinDeviceDatabase, DeviceDatabase, DeviceId, HidDescriptor, HidJoystick};
use sil_io::{AsyncLoader, PackFile, PackageToken, Vfs};
use sil_resource::{ResourceContext, ResourceManager};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// One instance of every SIL service.
///
/// The engine itself lives on the GPU thread: the shader cache, the
/// deferred-deletion queue and the renderer are not shared. The resource
/// context it hands to managers is, so managers may move to other threads.
pub struct Engine<R: Renderer = Box<dyn Renderer>> {
    settings: EngineSettings,
    context: ResourceContext,
    shaders: ShaderCache,
    deleter: DeferredDeleteQueue,
    devices: Arc<dyn DeviceDatabase>,
    renderer: R,
}

impl<R: Renderer> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("context", &self.context)
            .field("shaders", &self.shaders.used())
            .field("pending_deletions", &self.deleter.len())
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl<R: Renderer> Engine<R> {
    /// Starts the services described by `settings`.
    pub fn new(settings: EngineSettings, codec: Arc<dyn ResourceCodec>, renderer: R) -> Result<Self> {
        let vfs = Arc::new(Vfs::new(&settings.paths));
        let loader = Arc::new(
            AsyncLoader::new(&settings.io).context("Failed to start the asynchronous loader")?,
        );
        let context = ResourceContext::new(vfs, loader, codec);
        if settings.decompression.enabled {
            context
                .set_decompression(settings.decompression.clone())
                .context("Failed to start background decompression")?;
        }
        let shaders =
            ShaderCache::new(&settings.shader_cache).context("Failed to allocate the shader cache")?;
        let deleter = DeferredDeleteQueue::new(&settings.deferred_delete);

        log::info!(
            "SIL engine started ({} I/O slot(s), host access {})",
            settings.io.max_in_flight,
            if settings.paths.host_access { "on" } else { "off" }
        );
        Ok(Self {
            settings,
            context,
            shaders,
            deleter,
            devices: Arc::new(BuiltinDeviceDatabase::default()),
            renderer,
        })
    }

    /// Starts the services described by a RON settings file.
    pub fn from_settings_file(
        path: impl AsRef<Path>,
        codec: Arc<dyn ResourceCodec>,
        renderer: R,
    ) -> Result<Self> {
        let path = path.as_ref();
        let settings = sil_io::settings::load_settings(path)
            .with_context(|| format!("Failed to load settings from '{}'", path.display()))?;
        Self::new(settings, codec, renderer)
    }

    /// The settings the engine runs with.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The services shared with resource managers.
    pub fn context(&self) -> &ResourceContext {
        &self.context
    }

    /// The virtual filesystem.
    pub fn vfs(&self) -> &Arc<Vfs> {
        self.context.vfs()
    }

    // --- Packages ---

    /// Mounts a package on top of the package stack.
    pub fn register_package(&self, module: Arc<dyn PackageModule>) -> PackageToken {
        self.vfs().register(module)
    }

    /// Opens a pack archive and mounts it under `prefix`.
    pub fn register_pack_file(
        &self,
        path: impl AsRef<Path>,
        prefix: impl Into<String>,
    ) -> Result<PackageToken> {
        let path = path.as_ref();
        let pack = PackFile::open(path, prefix)
            .with_context(|| format!("Failed to open pack '{}'", path.display()))?;
        Ok(self.register_package(Arc::new(pack)))
    }

    /// Unmounts a package. Returns `false` if the token is unknown.
    pub fn unregister_package(&self, token: PackageToken) -> bool {
        self.vfs().unregister(token).is_some()
    }

    /// Enables or disables access to the host filesystem.
    pub fn set_host_access(&mut self, enabled: bool) {
        self.settings.paths.host_access = enabled;
        self.vfs().set_host_access(enabled);
    }

    // --- Resources ---

    /// Creates a resource manager sharing this engine's loader.
    pub fn create_resource_manager(&self, name: impl Into<String>) -> ResourceManager {
        ResourceManager::with_pool(name, self.context.clone(), &self.settings.resource_pool)
    }

    /// Reconfigures background decompression for every manager.
    pub fn set_background_decompression(
        &mut self,
        settings: DecompressionSettings,
    ) -> Result<(), ResourceError> {
        self.context.set_decompression(settings.clone())?;
        self.settings.decompression = settings;
        Ok(())
    }

    // --- Graphics ---

    /// Looks up or creates the shader cache entry for `key`.
    pub fn shader_lookup(&mut self, key: u32) -> Result<Lookup<'_>, ShaderCacheError> {
        self.shaders
            .lookup(key, &mut self.deleter, &mut self.renderer)
    }

    /// The shader program cache.
    pub fn shader_cache(&self) -> &ShaderCache {
        &self.shaders
    }

    /// The shader program cache, for installing a compile context.
    pub fn shader_cache_mut(&mut self) -> &mut ShaderCache {
        &mut self.shaders
    }

    /// Drops every cached shader, queueing their programs for deletion.
    pub fn clear_shader_cache(&mut self) {
        self.shaders.clear(&mut self.deleter, &mut self.renderer);
    }

    /// Queues a GPU object for deletion at the next safe point.
    pub fn delete_gpu_object<T: GpuObject>(&mut self, object: T) {
        self.deleter.delete(&mut self.renderer, object);
    }

    /// The deferred-deletion queue.
    pub fn delete_queue(&self) -> &DeferredDeleteQueue {
        &self.deleter
    }

    /// Releases every queued GPU object.
    pub fn free_dead_resources(&mut self, also_free_buffer: bool) {
        self.deleter
            .free_dead_resources(&mut self.renderer, also_free_buffer);
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    // --- Input ---

    /// Replaces the table of known device layouts.
    pub fn set_device_database(&mut self, database: Arc<dyn DeviceDatabase>) {
        self.devices = database;
    }

    /// Builds the normaliser for an attached HID device.
    pub fn create_joystick(&self, device: DeviceId, descriptor: &HidDescriptor) -> HidJoystick {
        HidJoystick::new(device, descriptor, Some(self.devices.as_ref()))
    }
}

impl<R: Renderer> Drop for Engine<R> {
    fn drop(&mut self) {
        self.shaders.clear(&mut self.deleter, &mut self.renderer);
        self.deleter.free_dead_resources(&mut self.renderer, true);
        log::info!("SIL engine shut down");
    }
}
