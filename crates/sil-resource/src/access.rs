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

//! Typed access, in-memory creation, and file and stream resources.

use crate::cell::Payload;
use crate::manager::ResourceManager;
use sil_core::{
    AllocFlags, FileRegion, FontHandle, ResourceError, ResourceId, ResourceKind, SoundHandle,
    TextureHandle,
};
use std::panic::Location;
use std::sync::Arc;

fn mismatch(expected: ResourceKind, found: ResourceKind) -> ResourceError {
    ResourceError::WrongKind { expected, found }
}

fn is_font(kind: ResourceKind) -> bool {
    matches!(kind, ResourceKind::BitmapFont | ResourceKind::FreetypeFont)
}

fn is_sound(kind: ResourceKind) -> bool {
    matches!(kind, ResourceKind::Sound | ResourceKind::StreamingSound)
}

impl ResourceManager {
    /// Runs `f` on the ready payload of `id` and its file cursor.
    ///
    /// Checks run in order: unknown ID, stale weak link, kind, then the
    /// payload's lifecycle state.
    fn access<R>(
        &self,
        id: ResourceId,
        expected: ResourceKind,
        accepts: fn(ResourceKind) -> bool,
        f: impl FnOnce(&mut Payload, &mut u64) -> Result<R, ResourceError>,
    ) -> Result<R, ResourceError> {
        let mut state = self.lock();
        let record = state.record_mut(id)?;
        if record.is_stale() {
            return Err(ResourceError::Stale);
        }
        let found = record.cell.kind();
        if !accepts(found) {
            return Err(mismatch(expected, found));
        }
        let cursor = &mut record.file_pos;
        record.cell.with_payload(|payload| f(payload, cursor))
    }

    fn data<R>(
        &self,
        id: ResourceId,
        f: impl FnOnce(&mut Arc<[u8]>) -> Result<R, ResourceError>,
    ) -> Result<R, ResourceError> {
        self.access(
            id,
            ResourceKind::Data,
            |kind| kind == ResourceKind::Data,
            |payload, _| match payload {
                Payload::Data(bytes) => f(bytes),
                _ => Err(mismatch(ResourceKind::Data, ResourceKind::Data)),
            },
        )
    }

    fn region<R>(
        &self,
        id: ResourceId,
        f: impl FnOnce(&FileRegion, &mut u64) -> Result<R, ResourceError>,
    ) -> Result<R, ResourceError> {
        self.access(
            id,
            ResourceKind::File,
            |kind| kind == ResourceKind::File,
            |payload, cursor| match payload {
                Payload::File(region) => f(region, cursor),
                _ => Err(mismatch(ResourceKind::File, ResourceKind::File)),
            },
        )
    }

    /// The bytes of a Data resource.
    ///
    /// The returned buffer is shared; later [`update_data`](Self::update_data)
    /// calls do not affect it.
    pub fn get_data(&self, id: ResourceId) -> Result<Arc<[u8]>, ResourceError> {
        self.data(id, |bytes| Ok(bytes.clone()))
    }

    /// Length in bytes of a Data resource.
    pub fn data_len(&self, id: ResourceId) -> Result<usize, ResourceError> {
        self.data(id, |bytes| Ok(bytes.len()))
    }

    /// Mutates the bytes of a Data resource in place.
    ///
    /// The change is visible through every strong link. Buffers previously
    /// returned by [`get_data`](Self::get_data) keep the old content.
    pub fn update_data<R>(
        &self,
        id: ResourceId,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, ResourceError> {
        self.data(id, |bytes| {
            if Arc::get_mut(bytes).is_none() {
                let copy: Arc<[u8]> = Arc::from(&bytes[..]);
                *bytes = copy;
            }
            Arc::get_mut(bytes)
                .map(f)
                .ok_or(ResourceError::OutOfMemory)
        })
    }

    /// The texture handle of a Texture resource.
    pub fn get_texture(&self, id: ResourceId) -> Result<TextureHandle, ResourceError> {
        self.access(
            id,
            ResourceKind::Texture,
            |kind| kind == ResourceKind::Texture,
            |payload, _| match payload {
                Payload::Texture(texture) => Ok(*texture),
                _ => Err(mismatch(ResourceKind::Texture, ResourceKind::Texture)),
            },
        )
    }

    /// The font handle of a bitmap or scalable font resource.
    pub fn get_font(&self, id: ResourceId) -> Result<FontHandle, ResourceError> {
        self.access(id, ResourceKind::BitmapFont, is_font, |payload, _| {
            match payload {
                Payload::Font(font) => Ok(*font),
                _ => Err(mismatch(ResourceKind::BitmapFont, ResourceKind::BitmapFont)),
            }
        })
    }

    /// The sound handle of a resident or streaming sound resource.
    pub fn get_sound(&self, id: ResourceId) -> Result<SoundHandle, ResourceError> {
        self.access(id, ResourceKind::Sound, is_sound, |payload, _| match payload {
            Payload::Sound(sound) => Ok(*sound),
            _ => Err(mismatch(ResourceKind::Sound, ResourceKind::Sound)),
        })
    }

    /// The byte range a File resource reads from.
    pub fn file_region(&self, id: ResourceId) -> Result<FileRegion, ResourceError> {
        self.region(id, |region, _| Ok(region.clone()))
    }

    /// Creates a zero-filled Data resource of `size` bytes.
    #[track_caller]
    pub fn new_data(&self, size: usize, flags: AllocFlags) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size)?;
        bytes.resize(size, 0);
        self.insert_ready(ResourceKind::Data, Payload::Data(bytes.into()), flags, origin)
    }

    /// Creates a Data resource holding a copy of `bytes`.
    #[track_caller]
    pub fn copy_data(&self, bytes: &[u8], flags: AllocFlags) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        let mut owned = Vec::new();
        owned.try_reserve_exact(bytes.len())?;
        owned.extend_from_slice(bytes);
        self.insert_ready(ResourceKind::Data, Payload::Data(owned.into()), flags, origin)
    }

    /// Creates a Data resource taking ownership of `bytes`.
    #[track_caller]
    pub fn take_data(&self, bytes: Vec<u8>, flags: AllocFlags) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        self.insert_ready(ResourceKind::Data, Payload::Data(bytes.into()), flags, origin)
    }

    /// Creates a blank texture through the codec.
    #[track_caller]
    pub fn new_texture(
        &self,
        width: u32,
        height: u32,
        flags: AllocFlags,
    ) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        let texture = self.ctx.codec().create_texture(width, height, flags)?;
        self.insert_ready(ResourceKind::Texture, Payload::Texture(texture), flags, origin)
    }

    /// Adopts an existing texture; it is released with the resource.
    #[track_caller]
    pub fn take_texture(
        &self,
        texture: TextureHandle,
        flags: AllocFlags,
    ) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        self.insert_ready(ResourceKind::Texture, Payload::Texture(texture), flags, origin)
    }

    /// Adopts an existing bitmap font.
    #[track_caller]
    pub fn take_bitmap_font(&self, font: FontHandle) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        self.insert_ready(
            ResourceKind::BitmapFont,
            Payload::Font(font),
            AllocFlags::NONE,
            origin,
        )
    }

    /// Adopts an existing scalable font.
    #[track_caller]
    pub fn take_freetype_font(&self, font: FontHandle) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        self.insert_ready(
            ResourceKind::FreetypeFont,
            Payload::Font(font),
            AllocFlags::NONE,
            origin,
        )
    }

    /// Adopts an existing resident sound.
    #[track_caller]
    pub fn take_sound(&self, sound: SoundHandle) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        self.insert_ready(
            ResourceKind::Sound,
            Payload::Sound(sound),
            AllocFlags::NONE,
            origin,
        )
    }

    /// Opens `name` for synchronous positioned reads.
    ///
    /// The resource is Ready immediately. Compressed package entries cannot be
    /// opened this way.
    #[track_caller]
    pub fn open_file(&self, name: &str) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        let region = self.ctx.vfs().file_region(name)?;
        log::trace!("Opened '{name}' ({} bytes)", region.len());
        self.insert_ready(ResourceKind::File, Payload::File(region), AllocFlags::NONE, origin)
    }

    /// Reads from the current position of a File resource and advances it.
    ///
    /// Returns the number of bytes read, which is 0 at the end of the file.
    pub fn read_file(&self, id: ResourceId, buf: &mut [u8]) -> Result<usize, ResourceError> {
        self.region(id, |region, cursor| {
            let n = region.read_at(buf, *cursor)?;
            *cursor += n as u64;
            Ok(n)
        })
    }

    /// Reads at `pos` without moving the current position.
    pub fn read_file_at(
        &self,
        id: ResourceId,
        buf: &mut [u8],
        pos: u64,
    ) -> Result<usize, ResourceError> {
        self.region(id, |region, _| Ok(region.read_at(buf, pos)?))
    }

    /// Moves the current position of a File resource. Positions past the end
    /// are allowed; reads there return 0 bytes.
    pub fn seek_file(&self, id: ResourceId, pos: u64) -> Result<(), ResourceError> {
        self.region(id, |_, cursor| {
            *cursor = pos;
            Ok(())
        })
    }

    /// Current position of a File resource.
    pub fn tell_file(&self, id: ResourceId) -> Result<u64, ResourceError> {
        self.region(id, |_, cursor| Ok(*cursor))
    }

    /// Size in bytes of a File resource.
    pub fn file_size(&self, id: ResourceId) -> Result<u64, ResourceError> {
        self.region(id, |region, _| Ok(region.len()))
    }

    /// Opens `name` as a streaming sound.
    #[track_caller]
    pub fn open_sound(&self, name: &str) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        let region = self.ctx.vfs().file_region(name)?;
        self.insert_stream(region, origin)
    }

    /// Opens `size` bytes at `offset` of an open File resource as a
    /// streaming sound.
    ///
    /// # Errors
    /// [`ResourceError::BadRange`] if the range does not fit the file.
    #[track_caller]
    pub fn open_sound_from_file(
        &self,
        file: ResourceId,
        offset: u64,
        size: u64,
    ) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        let region = self.file_region(file)?.sub_region(offset, size)?;
        self.insert_stream(region, origin)
    }

    fn insert_stream(
        &self,
        region: FileRegion,
        origin: &'static Location<'static>,
    ) -> Result<ResourceId, ResourceError> {
        let sound = self.ctx.codec().open_sound_stream(region)?;
        self.insert_ready(
            ResourceKind::StreamingSound,
            Payload::Sound(sound),
            AllocFlags::NONE,
            origin,
        )
    }
}
