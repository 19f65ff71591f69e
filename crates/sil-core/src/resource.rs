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

//! Primitive types describing managed resources.
//!
//! These are the "common language" of the resource subsystem: the identifier a
//! manager hands out, the kind tag checked on every typed access, the lifecycle
//! state, and the allocation hints that travel with each record.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// An opaque identifier for a resource, issued by a single resource manager.
///
/// IDs are non-zero, stable for the lifetime of the record and never recycled
/// by the manager that issued them. The value is meaningless to any other
/// manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResourceId(u32);

impl ResourceId {
    /// The null ID. Never issued; freeing it is a no-op.
    pub const NULL: ResourceId = ResourceId(0);

    /// Wraps a raw ID value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw ID value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` for [`ResourceId::NULL`].
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The type tag stored with every resource record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A raw byte buffer.
    Data,
    /// A decoded texture.
    Texture,
    /// A bitmap font.
    BitmapFont,
    /// A FreeType-rendered font.
    FreetypeFont,
    /// A fully decoded sound.
    Sound,
    /// A random-access file that is not read into memory.
    File,
    /// A sound streamed from a file as it plays.
    StreamingSound,
    /// A strong link to another record's payload.
    Link,
    /// A weak link to another record's payload.
    WeakLink,
}

impl ResourceKind {
    /// Returns `true` if this kind may be produced by an asynchronous load.
    pub fn is_loadable(self) -> bool {
        matches!(
            self,
            ResourceKind::Data
                | ResourceKind::Texture
                | ResourceKind::BitmapFont
                | ResourceKind::FreetypeFont
                | ResourceKind::Sound
        )
    }

    /// Returns `true` for [`ResourceKind::Link`] and [`ResourceKind::WeakLink`].
    pub fn is_link(self) -> bool {
        matches!(self, ResourceKind::Link | ResourceKind::WeakLink)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The lifecycle state of a resource record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// The ID has been issued but no data is attached yet.
    Reserved,
    /// A background load is in flight.
    Loading,
    /// The payload is available.
    Ready,
    /// The load failed; the record keeps the error until freed.
    Failed,
    /// A weak link whose target has been destroyed.
    Stale,
}

/// Memory-pool hints carried by a record.
///
/// The hints never change behaviour visible through the public API except for
/// [`AllocFlags::CLEAR`], which zero-fills newly allocated data buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AllocFlags(u32);

impl AllocFlags {
    /// No hints.
    pub const NONE: AllocFlags = AllocFlags(0);
    /// Allocate from the top of the pool (long-lived data).
    pub const TOP: AllocFlags = AllocFlags(1 << 0);
    /// Short-lived allocation.
    pub const TEMP: AllocFlags = AllocFlags(1 << 1);
    /// Zero-fill the allocation.
    pub const CLEAR: AllocFlags = AllocFlags(1 << 2);

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: AllocFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for AllocFlags {
    type Output = AllocFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        AllocFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for AllocFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
