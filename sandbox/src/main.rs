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

// SIL Sandbox
// Headless demo: builds a pack, mounts it, loads resources through it,
// drives the shader cache and feeds a simulated joystick.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use sil_sdk::prelude::*;

/// Stands in for the image, font and audio decoders.
#[derive(Debug, Default)]
struct HeadlessCodec {
    next: AtomicU64,
}

impl HeadlessCodec {
    fn handle(&self, what: &str, name: &str, len: usize) -> u64 {
        let handle = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        log::info!("Decoded {what} '{name}' ({len} bytes) as #{handle}");
        handle
    }
}

impl ResourceCodec for HeadlessCodec {
    fn decode_texture(
        &self,
        name: &str,
        bytes: &[u8],
        _flags: AllocFlags,
    ) -> Result<TextureHandle, ResourceError> {
        Ok(TextureHandle(self.handle("texture", name, bytes.len())))
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        _flags: AllocFlags,
    ) -> Result<TextureHandle, ResourceError> {
        let name = format!("{width}x{height}");
        Ok(TextureHandle(self.handle("blank texture", &name, 0)))
    }

    fn decode_bitmap_font(&self, name: &str, bytes: &[u8]) -> Result<FontHandle, ResourceError> {
        Ok(FontHandle(self.handle("bitmap font", name, bytes.len())))
    }

    fn decode_freetype_font(&self, name: &str, bytes: &[u8]) -> Result<FontHandle, ResourceError> {
        Ok(FontHandle(self.handle("font", name, bytes.len())))
    }

    fn decode_sound(&self, name: &str, bytes: &[u8]) -> Result<SoundHandle, ResourceError> {
        Ok(SoundHandle(self.handle("sound", name, bytes.len())))
    }

    fn open_sound_stream(&self, source: FileRegion) -> Result<SoundHandle, ResourceError> {
        let len = usize::try_from(source.len()).unwrap_or(usize::MAX);
        Ok(SoundHandle(self.handle("sound stream", "<file>", len)))
    }

    fn release_texture(&self, texture: TextureHandle) {
        log::info!("Released texture #{}", texture.0);
    }

    fn release_font(&self, font: FontHandle) {
        log::info!("Released font #{}", font.0);
    }

    fn release_sound(&self, sound: SoundHandle) {
        log::info!("Released sound #{}", sound.0);
    }
}

fn build_pack(path: &std::path::Path) -> Result<()> {
    let mut builder = PackBuilder::new().with_block_size(4096);
    builder.add("config/level.txt", b"width=64\nheight=48\n".to_vec())?;
    builder.add("textures/player.png", vec![0x89; 512])?;
    let music: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    builder.add_compressed("audio/theme.ogg", &music)?;
    builder.write_file(path)?;
    log::info!("Wrote {} entries to '{}'", builder.len(), path.display());
    Ok(())
}

fn load_resources(engine: &mut Engine<RecordingRenderer>) -> Result<()> {
    engine.set_background_decompression(DecompressionSettings {
        enabled: true,
        threshold: 0,
        block_size: 4096,
        num_workers: 2,
    })?;

    let manager = engine.create_resource_manager("sandbox");
    let level = manager.load_data("game/config/level.txt")?;
    let player = manager.load_texture("game/textures/player.png", AllocFlags::NONE)?;
    let theme = manager.load_sound("game/audio/theme.ogg")?;
    let epoch = manager.mark();
    manager.wait(epoch);

    let text = manager.get_data(level)?;
    log::info!("Level config:\n{}", String::from_utf8_lossy(&text));
    log::info!("Player texture: {:?}", manager.get_texture(player)?);
    log::info!("Theme sound: {:?}", manager.get_sound(theme)?);

    let alias = manager.link_weak(&manager, player)?;
    manager.free(player)?;
    log::info!("Weak link after free: {:?}", manager.state(alias));
    Ok(())
}

fn exercise_shaders(engine: &mut Engine<RecordingRenderer>) -> Result<()> {
    for key in 1..=3u32 {
        let lookup = engine.shader_lookup(key)?;
        if lookup.entry.program().is_none() {
            let raw = NonZeroU32::new(100 + key).context("program names start at 1")?;
            lookup.entry.set_program(ProgramId::from_raw(raw));
            lookup
                .entry
                .set_uniform(BuiltinUniform::Transform, Some(key as i32));
        }
    }
    log::info!("{} shader(s) cached", engine.shader_cache().used());

    engine.clear_shader_cache();
    let raw = NonZeroU32::new(7).context("texture names start at 1")?;
    engine.delete_gpu_object(TextureId::from_raw(raw));
    engine.free_dead_resources(false);
    log::info!("Released GPU objects: {:?}", engine.renderer().released);
    Ok(())
}

fn simulate_joystick(engine: &Engine<RecordingRenderer>) {
    let descriptor = HidDescriptor::new(0x054C, 0x09CC, 0x0100, "Wireless Controller")
        .with_numbered_buttons(14)
        .with_axis(ValueAxis::X, 0, 255)
        .with_axis(ValueAxis::Y, 0, 255)
        .with_axis(ValueAxis::Z, 0, 255)
        .with_axis(ValueAxis::RX, 0, 255)
        .with_axis(ValueAxis::RY, 0, 255)
        .with_axis(ValueAxis::RZ, 0, 255)
        .with_axis(ValueAxis::Hat, 0, 7);
    let mut pad = engine.create_joystick(DeviceId(0), &descriptor);
    let mut events: Vec<JoystickEvent> = Vec::new();
    let desktop = 0x01;
    let buttons = 0x09;

    pad.connect(&mut events, 0);
    pad.button_event(&mut events, buttons, 2, 1, 1);
    pad.value_event(&mut events, desktop, ValueAxis::X.usage(), 255, 2);
    pad.value_event(&mut events, desktop, ValueAxis::Y.usage(), 0, 2);
    pad.value_event(&mut events, desktop, ValueAxis::Hat.usage(), 2, 3);
    pad.value_event(&mut events, desktop, ValueAxis::RX.usage(), 200, 4);
    pad.flush_events(&mut events);
    pad.disconnect(&mut events, 5);

    for event in &events {
        log::info!("{event:?}");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let pack = std::env::temp_dir().join("sil-sandbox.silpack");
    build_pack(&pack).context("Failed to build the demo pack")?;

    let codec = Arc::new(HeadlessCodec::default());
    let mut engine = Engine::new(EngineSettings::default(), codec, RecordingRenderer::default())?;
    engine.register_pack_file(&pack, "game/")?;

    load_resources(&mut engine)?;
    exercise_shaders(&mut engine)?;
    simulate_joystick(&engine);

    drop(engine);
    std::fs::remove_file(&pack)
        .with_context(|| format!("Failed to remove '{}'", pack.display()))?;
    Ok(())
}
