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

#![allow(dead_code)]

use sil_core::config::IoSettings;
use sil_core::{
    AllocFlags, FileRegion, FontHandle, ResourceCodec, ResourceError, SoundHandle, TextureHandle,
};
use sil_io::{AsyncLoader, MemoryPackage, PathResolver, Vfs};
use sil_resource::ResourceContext;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A codec that hands out sequential handles, counts releases and refuses to
/// decode any file whose name contains `bad`.
#[derive(Debug, Default)]
pub struct CountingCodec {
    next: AtomicU64,
    pub decoded: Mutex<Vec<(String, usize)>>,
    pub textures_released: AtomicUsize,
    pub fonts_released: AtomicUsize,
    pub sounds_released: AtomicUsize,
    pub streams: Mutex<Vec<FileRegion>>,
}

impl CountingCodec {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<u64, ResourceError> {
        if name.contains("bad") {
            return Err(ResourceError::DecodeFailed(name.to_owned()));
        }
        self.decoded
            .lock()
            .unwrap()
            .push((name.to_owned(), bytes.len()));
        Ok(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn released_textures(&self) -> usize {
        self.textures_released.load(Ordering::SeqCst)
    }

    pub fn released_sounds(&self) -> usize {
        self.sounds_released.load(Ordering::SeqCst)
    }

    pub fn released_fonts(&self) -> usize {
        self.fonts_released.load(Ordering::SeqCst)
    }
}

impl ResourceCodec for CountingCodec {
    fn decode_texture(
        &self,
        name: &str,
        bytes: &[u8],
        _: AllocFlags,
    ) -> Result<TextureHandle, ResourceError> {
        self.decode(name, bytes).map(TextureHandle)
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        _: AllocFlags,
    ) -> Result<TextureHandle, ResourceError> {
        if width == 0 || height == 0 {
            return Err(ResourceError::DecodeFailed("empty texture".into()));
        }
        Ok(TextureHandle(self.next.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn decode_bitmap_font(&self, name: &str, bytes: &[u8]) -> Result<FontHandle, ResourceError> {
        self.decode(name, bytes).map(FontHandle)
    }

    fn decode_freetype_font(&self, name: &str, bytes: &[u8]) -> Result<FontHandle, ResourceError> {
        self.decode(name, bytes).map(FontHandle)
    }

    fn decode_sound(&self, name: &str, bytes: &[u8]) -> Result<SoundHandle, ResourceError> {
        self.decode(name, bytes).map(SoundHandle)
    }

    fn open_sound_stream(&self, region: FileRegion) -> Result<SoundHandle, ResourceError> {
        self.streams.lock().unwrap().push(region);
        Ok(SoundHandle(self.next.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn release_texture(&self, _: TextureHandle) {
        self.textures_released.fetch_add(1, Ordering::SeqCst);
    }

    fn release_font(&self, _: FontHandle) {
        self.fonts_released.fetch_add(1, Ordering::SeqCst);
    }

    fn release_sound(&self, _: SoundHandle) {
        self.sounds_released.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Rig {
    pub ctx: ResourceContext,
    pub codec: Arc<CountingCodec>,
}

/// A context resolving host names under `base`, with `max_in_flight` I/O slots.
pub fn rig_with(base: &Path, max_in_flight: usize) -> Rig {
    let _ = env_logger::builder().is_test(true).try_init();
    let vfs = Arc::new(Vfs::with_resolver(PathResolver::new(
        base.to_string_lossy(),
        true,
    )));
    let loader = Arc::new(AsyncLoader::new(&IoSettings { max_in_flight }).unwrap());
    let codec = Arc::new(CountingCodec::default());
    let ctx = ResourceContext::new(vfs, loader, codec.clone());
    Rig { ctx, codec }
}

pub fn rig(base: &Path) -> Rig {
    rig_with(base, 64)
}

/// Registers an in-memory package under `prefix`.
pub fn mount(rig: &Rig, package: MemoryPackage) {
    rig.ctx.vfs().register(Arc::new(package));
}
