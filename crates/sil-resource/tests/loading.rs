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

mod common;

use common::{mount, rig, rig_with};
use sil_core::config::DecompressionSettings;
use sil_core::{AllocFlags, ResourceError, ResourceKind, ResourceState};
use sil_io::MemoryPackage;
use sil_resource::ResourceManager;
use std::fs;
use tempfile::tempdir;

fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

#[test]
fn wait_on_mark_covers_earlier_loads_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), b"first").unwrap();
    fs::write(dir.path().join("b.bin"), b"second").unwrap();
    let rig = rig(dir.path());
    let manager = ResourceManager::new("levels", rig.ctx);

    let a = manager.load_data("a.bin").unwrap();
    let barrier = manager.mark();
    let b = manager.load_data("b.bin").unwrap();

    assert!(manager.mark_epoch(a).unwrap() <= barrier);
    assert!(manager.mark_epoch(b).unwrap() > barrier);

    manager.wait(barrier);
    assert!(manager.sync(barrier));
    assert_eq!(manager.state(a), Ok(ResourceState::Ready));
    assert_eq!(&*manager.get_data(a).unwrap(), b"first");

    let all = manager.mark();
    manager.wait(all);
    assert_eq!(&*manager.get_data(b).unwrap(), b"second");
}

#[test]
fn loading_resources_are_not_ready_until_collected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("slow.bin"), vec![1u8; 4096]).unwrap();
    let rig = rig(dir.path());
    let manager = ResourceManager::new("m", rig.ctx);

    let id = manager.load_data("slow.bin").unwrap();
    if manager.state(id) == Ok(ResourceState::Loading) {
        assert_eq!(manager.get_data(id), Err(ResourceError::NotReady));
    }
    manager.wait(manager.mark());
    assert_eq!(manager.data_len(id), Ok(4096));
}

#[test]
fn decoded_kinds_go_through_the_codec() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("tex.png"), b"png bytes").unwrap();
    fs::write(dir.path().join("font.fnt"), b"font").unwrap();
    fs::write(dir.path().join("jump.wav"), b"wave").unwrap();
    fs::write(dir.path().join("bad.png"), b"broken").unwrap();
    let rig = rig(dir.path());
    let manager = ResourceManager::new("m", rig.ctx);

    let texture = manager.load_texture("tex.png", AllocFlags::TOP).unwrap();
    let font = manager.load_freetype_font("font.fnt").unwrap();
    let sound = manager.load_sound("jump.wav").unwrap();
    let broken = manager.load_texture("bad.png", AllocFlags::NONE).unwrap();
    manager.wait(manager.mark());

    assert!(manager.get_texture(texture).is_ok());
    assert!(manager.get_font(font).is_ok());
    assert!(manager.get_sound(sound).is_ok());
    assert_eq!(manager.state(broken), Ok(ResourceState::Failed));
    assert_eq!(
        manager.get_texture(broken),
        Err(ResourceError::DecodeFailed("bad.png".into()))
    );

    let decoded = rig.codec.decoded.lock().unwrap().clone();
    assert!(decoded.contains(&("tex.png".to_owned(), 9)));
    assert_eq!(decoded.len(), 3);

    manager.free(broken).unwrap();
    manager.free_all();
    assert_eq!(rig.codec.released_textures(), 1);
    assert_eq!(rig.codec.released_fonts(), 1);
    assert_eq!(rig.codec.released_sounds(), 1);
}

#[test]
fn load_reports_resolution_errors() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("here.bin"), b"x").unwrap();
    let rig = rig(dir.path());
    let manager = ResourceManager::new("m", rig.ctx.clone());

    assert_eq!(
        manager.load_data("missing.bin"),
        Err(ResourceError::NotFound("missing.bin".into()))
    );
    assert_eq!(
        manager.load(ResourceKind::File, "here.bin", AllocFlags::NONE),
        Err(ResourceError::WrongKind {
            expected: ResourceKind::Data,
            found: ResourceKind::File,
        })
    );

    rig.ctx.vfs().set_host_access(false);
    assert!(matches!(
        manager.load_data("here.bin"),
        Err(ResourceError::Disabled(_))
    ));
    assert!(manager.is_empty());
}

#[test]
fn compressed_entries_are_decoded_on_collection() {
    let dir = tempdir().unwrap();
    let rig = rig(dir.path());
    let big = noise(100_000);
    mount(
        &rig,
        MemoryPackage::new("pak:")
            .with_compressed_file("big.bin", &big, 4096)
            .with_file("small.txt", b"plain".to_vec()),
    );
    let manager = ResourceManager::new("m", rig.ctx);

    let packed = manager.load_data("pak:big.bin").unwrap();
    let plain = manager.load_data("pak:small.txt").unwrap();
    manager.wait(manager.mark());
    assert_eq!(&*manager.get_data(packed).unwrap(), &big[..]);
    assert_eq!(&*manager.get_data(plain).unwrap(), b"plain");
}

#[test]
fn large_compressed_entries_stream_through_the_worker_pool() {
    let dir = tempdir().unwrap();
    let rig = rig(dir.path());
    rig.ctx
        .set_decompression(DecompressionSettings {
            enabled: true,
            threshold: 0,
            block_size: 1024,
            num_workers: 2,
        })
        .unwrap();
    assert_eq!(rig.ctx.loader().decompression_workers(), 2);

    let big = noise(64 * 1024);
    let tiny = noise(200);
    mount(
        &rig,
        MemoryPackage::new("pak:")
            .with_compressed_file("big.bin", &big, 4096)
            .with_compressed_file("tiny.bin", &tiny, 4096),
    );
    let manager = ResourceManager::new("m", rig.ctx);

    let streamed = manager.load_data("pak:big.bin").unwrap();
    let inline = manager.load_data("pak:tiny.bin").unwrap();
    manager.wait(manager.mark());
    assert_eq!(&*manager.get_data(streamed).unwrap(), &big[..]);
    assert_eq!(&*manager.get_data(inline).unwrap(), &tiny[..]);
}

#[test]
fn directory_style_prefixes_strip_to_the_entry_name() {
    let dir = tempdir().unwrap();
    let rig = rig(dir.path());
    mount(
        &rig,
        MemoryPackage::new("game/")
            .with_file("config/level.txt", b"level one".to_vec())
            .with_compressed_file("maps/big.bin", &noise(4096), 512),
    );
    let manager = ResourceManager::new("m", rig.ctx);

    let level = manager.load_data("game/config/level.txt").unwrap();
    let map = manager.load_data("game/maps/big.bin").unwrap();
    manager.wait(manager.mark());
    assert_eq!(&*manager.get_data(level).unwrap(), b"level one");
    assert_eq!(&*manager.get_data(map).unwrap(), &noise(4096)[..]);

    assert!(matches!(
        manager.load_data("gamer/config/level.txt"),
        Err(ResourceError::NotFound(_))
    ));
}

#[test]
fn loads_queue_when_the_io_table_is_full() {
    let dir = tempdir().unwrap();
    for i in 0..6 {
        fs::write(dir.path().join(format!("f{i}.bin")), vec![i as u8; 1000]).unwrap();
    }
    let rig = rig_with(dir.path(), 1);
    let first = ResourceManager::new("first", rig.ctx.clone());
    let second = ResourceManager::new("second", rig.ctx);

    let ours: Vec<_> = (0..3)
        .map(|i| first.load_data(&format!("f{i}.bin")).unwrap())
        .collect();
    let theirs: Vec<_> = (3..6)
        .map(|i| second.load_data(&format!("f{i}.bin")).unwrap())
        .collect();

    assert_eq!(first.state(ours[0]), Ok(ResourceState::Loading));
    for id in &ours[1..] {
        assert_eq!(first.state(*id), Ok(ResourceState::Reserved));
    }
    for id in &theirs {
        assert_eq!(second.state(*id), Ok(ResourceState::Reserved));
    }

    first.wait(first.mark());
    for (i, id) in ours.iter().enumerate() {
        assert_eq!(&*first.get_data(*id).unwrap(), &vec![i as u8; 1000][..]);
    }
    second.wait(second.mark());
    for (i, id) in theirs.iter().enumerate() {
        assert_eq!(
            &*second.get_data(*id).unwrap(),
            &vec![(i + 3) as u8; 1000][..]
        );
    }
}

#[test]
fn freeing_a_loading_resource_waits_for_it() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), vec![5u8; 10_000]).unwrap();
    let rig = rig(dir.path());
    let manager = ResourceManager::new("m", rig.ctx);

    let id = manager.load_data("a.bin").unwrap();
    manager.free(id).unwrap();
    assert!(manager.is_empty());
    assert!(manager.sync(manager.mark()));
}

#[test]
fn file_resources_read_without_loading() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("f.bin"), b"0123456789").unwrap();
    let rig = rig(dir.path());
    let manager = ResourceManager::new("m", rig.ctx);

    let file = manager.open_file("f.bin").unwrap();
    assert_eq!(manager.state(file), Ok(ResourceState::Ready));
    assert_eq!(manager.file_size(file), Ok(10));

    let mut buf = [0u8; 4];
    assert_eq!(manager.read_file(file, &mut buf), Ok(4));
    assert_eq!(&buf, b"0123");
    assert_eq!(manager.tell_file(file), Ok(4));
    manager.seek_file(file, 8).unwrap();
    assert_eq!(manager.read_file(file, &mut buf), Ok(2));
    assert_eq!(&buf[..2], b"89");
    assert_eq!(manager.read_file(file, &mut buf), Ok(0));
    assert_eq!(manager.read_file_at(file, &mut buf, 3), Ok(4));
    assert_eq!(&buf, b"3456");
    assert_eq!(manager.tell_file(file), Ok(10));

    let sound = manager.open_sound_from_file(file, 2, 4).unwrap();
    assert_eq!(manager.kind(sound), Ok(ResourceKind::StreamingSound));
    assert_eq!(rig.codec.streams.lock().unwrap()[0].len(), 4);
    assert_eq!(
        manager.open_sound_from_file(file, 8, 4),
        Err(ResourceError::BadRange {
            offset: 8,
            size: 4,
            len: 10,
        })
    );

    let whole = manager.open_sound("f.bin").unwrap();
    assert!(manager.get_sound(whole).is_ok());
    manager.free(sound).unwrap();
    manager.free(whole).unwrap();
    assert_eq!(rig.codec.released_sounds(), 2);
}

#[test]
fn compressed_package_entries_cannot_be_opened_as_files() {
    let dir = tempdir().unwrap();
    let rig = rig(dir.path());
    mount(
        &rig,
        MemoryPackage::new("pak:").with_compressed_file("z.bin", &noise(500), 128),
    );
    let manager = ResourceManager::new("m", rig.ctx);
    assert_eq!(
        manager.open_file("pak:z.bin"),
        Err(ResourceError::CompressedInPackage("pak:z.bin".into()))
    );
}
