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

use sil_sdk::prelude::*;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out sequential handles and never fails.
#[derive(Debug, Default)]
struct SequentialCodec {
    next: AtomicU64,
}

impl SequentialCodec {
    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl ResourceCodec for SequentialCodec {
    fn decode_texture(
        &self,
        _name: &str,
        _bytes: &[u8],
        _flags: AllocFlags,
    ) -> Result<TextureHandle, ResourceError> {
        Ok(TextureHandle(self.next()))
    }

    fn create_texture(
        &self,
        _width: u32,
        _height: u32,
        _flags: AllocFlags,
    ) -> Result<TextureHandle, ResourceError> {
        Ok(TextureHandle(self.next()))
    }

    fn decode_bitmap_font(&self, _name: &str, _bytes: &[u8]) -> Result<FontHandle, ResourceError> {
        Ok(FontHandle(self.next()))
    }

    fn decode_freetype_font(&self, _name: &str, _bytes: &[u8]) -> Result<FontHandle, ResourceError> {
        Ok(FontHandle(self.next()))
    }

    fn decode_sound(&self, _name: &str, _bytes: &[u8]) -> Result<SoundHandle, ResourceError> {
        Ok(SoundHandle(self.next()))
    }

    fn open_sound_stream(&self, _source: FileRegion) -> Result<SoundHandle, ResourceError> {
        Ok(SoundHandle(self.next()))
    }

    fn release_texture(&self, _texture: TextureHandle) {}

    fn release_font(&self, _font: FontHandle) {}

    fn release_sound(&self, _sound: SoundHandle) {}
}

fn engine(settings: EngineSettings) -> Engine<RecordingRenderer> {
    let _ = env_logger::builder().is_test(true).try_init();
    Engine::new(
        settings,
        Arc::new(SequentialCodec::default()),
        RecordingRenderer::default(),
    )
    .unwrap()
}

fn raw(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

#[test]
fn packages_feed_resource_managers() {
    let engine = engine(EngineSettings::default());
    let token = engine.register_package(Arc::new(
        MemoryPackage::new("game/").with_file("level.txt", b"level one".to_vec()),
    ));
    let manager = engine.create_resource_manager("level");

    let id = manager.load_data("game/level.txt").unwrap();
    manager.wait(manager.mark());
    assert_eq!(&*manager.get_data(id).unwrap(), b"level one");

    assert!(engine.unregister_package(token));
    assert!(!engine.unregister_package(token));
    assert!(!engine.vfs().exists("game/level.txt"));
}

#[test]
fn pack_files_mount_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.silpack");
    let mut builder = PackBuilder::new();
    builder.add("readme.txt", b"hello".to_vec()).unwrap();
    builder
        .add_compressed("big.bin", &vec![7u8; 10_000])
        .unwrap();
    builder.write_file(&path).unwrap();

    let engine = engine(EngineSettings::default());
    engine.register_pack_file(&path, "assets/").unwrap();
    let manager = engine.create_resource_manager("assets");
    let readme = manager.load_data("assets/readme.txt").unwrap();
    let big = manager.load_data("assets/big.bin").unwrap();
    manager.wait(manager.mark());

    assert_eq!(&*manager.get_data(readme).unwrap(), b"hello");
    assert_eq!(manager.data_len(big).unwrap(), 10_000);
    assert!(engine.register_pack_file(dir.path().join("missing.silpack"), "x").is_err());
}

#[test]
fn host_access_can_be_turned_off() {
    let mut engine = engine(EngineSettings::default());
    assert!(engine.vfs().host_access());
    engine.set_host_access(false);
    assert!(!engine.settings().paths.host_access);

    let manager = engine.create_resource_manager("host");
    assert!(matches!(
        manager.load_data("/etc/hostname"),
        Err(ResourceError::Disabled(_))
    ));
}

#[test]
fn shader_programs_are_released_on_clear() {
    let mut engine = engine(EngineSettings::default());
    {
        let lookup = engine.shader_lookup(42).unwrap();
        lookup.entry.set_program(ProgramId::from_raw(raw(9)));
    }
    assert_eq!(engine.shader_cache().used(), 1);
    assert_eq!(
        engine.shader_lookup(INVALID_SHADER_KEY).unwrap_err(),
        ShaderCacheError::InvalidKey
    );

    engine.clear_shader_cache();
    assert_eq!(engine.delete_queue().len(), 1);
    engine.free_dead_resources(false);
    assert_eq!(engine.renderer().released_of(GpuObjectKind::Program), vec![9]);
}

#[test]
fn gpu_objects_wait_for_the_safe_point() {
    let mut engine = engine(EngineSettings::default());
    engine.delete_gpu_object(TextureId::from_raw(raw(3)));
    engine.delete_gpu_object(BufferId::from_raw(raw(4)));

    assert_eq!(engine.renderer().unbound, vec![3]);
    assert!(engine.renderer().released.is_empty());

    engine.free_dead_resources(true);
    assert_eq!(
        engine.renderer().released,
        vec![(GpuObjectKind::Texture, 3), (GpuObjectKind::Buffer, 4)]
    );
    assert!(engine.delete_queue().is_empty());
}

#[test]
fn joysticks_use_the_builtin_layouts() {
    let engine = engine(EngineSettings::default());
    let descriptor = HidDescriptor::new(0x054C, 0x09CC, 0x0100, "Wireless Controller")
        .with_numbered_buttons(14)
        .with_axis(ValueAxis::X, 0, 255)
        .with_axis(ValueAxis::Y, 0, 255)
        .with_axis(ValueAxis::Z, 0, 255)
        .with_axis(ValueAxis::RX, 0, 255)
        .with_axis(ValueAxis::RY, 0, 255)
        .with_axis(ValueAxis::RZ, 0, 255)
        .with_axis(ValueAxis::Hat, 0, 7);
    let pad = engine.create_joystick(DeviceId(1), &descriptor);

    assert_eq!(pad.button_mapping(LogicalButton::A), Some(1));
    assert_eq!(pad.button_mapping(LogicalButton::R2), Some(15));
}

#[test]
fn background_decompression_can_be_enabled_later() {
    let mut engine = engine(EngineSettings::default());
    engine
        .set_background_decompression(DecompressionSettings {
            enabled: true,
            threshold: 0,
            block_size: 1024,
            num_workers: 2,
        })
        .unwrap();
    assert!(engine.settings().decompression.enabled);
    assert!(engine.context().loader().decompression_enabled());
}
