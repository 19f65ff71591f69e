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

//! The interface to the opaque producers of decoded resources.
//!
//! Image, font and audio decoders live outside the core. The resource manager
//! only needs to hand them bytes (or a file window, for streamed sounds) and
//! receive an opaque handle back, and to return that handle exactly once when
//! the last strong reference goes away.

use crate::error::ResourceError;
use crate::package::FileRegion;
use crate::resource::AllocFlags;

/// An opaque handle to a decoded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// An opaque handle to a decoded font (bitmap or FreeType).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontHandle(pub u64);

/// An opaque handle to a decoded or streaming sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundHandle(pub u64);

/// Decoders and allocators for the typed resource kinds.
///
/// Implementations must be callable from any thread. Decode methods run on the
/// thread that completes a load (the caller of `sync`/`wait`), never while the
/// codec is being called re-entrantly by the resource manager.
pub trait ResourceCodec: Send + Sync {
    /// Decodes an image file into a texture.
    fn decode_texture(
        &self,
        name: &str,
        bytes: &[u8],
        flags: AllocFlags,
    ) -> Result<TextureHandle, ResourceError>;

    /// Allocates a blank texture.
    fn create_texture(
        &self,
        width: u32,
        height: u32,
        flags: AllocFlags,
    ) -> Result<TextureHandle, ResourceError>;

    /// Decodes a bitmap font description.
    fn decode_bitmap_font(&self, name: &str, bytes: &[u8]) -> Result<FontHandle, ResourceError>;

    /// Decodes a FreeType-compatible font file.
    fn decode_freetype_font(&self, name: &str, bytes: &[u8]) -> Result<FontHandle, ResourceError>;

    /// Decodes a complete sound file held in memory.
    fn decode_sound(&self, name: &str, bytes: &[u8]) -> Result<SoundHandle, ResourceError>;

    /// Opens a sound that will be streamed from `source` while it plays.
    fn open_sound_stream(&self, source: FileRegion) -> Result<SoundHandle, ResourceError>;

    /// Releases a texture previously returned by this codec.
    fn release_texture(&self, texture: TextureHandle);

    /// Releases a font previously returned by this codec.
    fn release_font(&self, font: FontHandle);

    /// Releases a sound previously returned by this codec.
    fn release_sound(&self, sound: SoundHandle);
}
