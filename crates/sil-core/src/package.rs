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

//! Contracts between the virtual filesystem and the producers of named byte streams.
//!
//! A [`PackageModule`] is an overlayable, prefix-addressed producer (an archive
//! on disk, an in-memory bundle, ...). The resolver strips the module's prefix
//! before delegating, so every method here receives names relative to the
//! package root.

use crate::error::ResourceError;
use crate::MAX_LIST_DEPTH;
use std::fmt::Debug;
use std::io::{self, Read};
use std::sync::Arc;

/// A source of bytes that supports positioned reads from several threads.
pub trait RandomAccess: Send + Sync + Debug {
    /// Reads up to `buf.len()` bytes starting at absolute position `pos`.
    ///
    /// Returns the number of bytes read; `0` means end of source.
    fn read_at(&self, buf: &mut [u8], pos: u64) -> io::Result<usize>;
}

/// A window `[base, base + len)` onto a [`RandomAccess`] source.
///
/// This is the opaque `(handle, base_offset, length)` triple handed out for
/// random-access resources. Cloning is cheap and shares the underlying source.
#[derive(Debug, Clone)]
pub struct FileRegion {
    source: Arc<dyn RandomAccess>,
    base: u64,
    len: u64,
}

impl FileRegion {
    /// Creates a region over `source`.
    pub fn new(source: Arc<dyn RandomAccess>, base: u64, len: u64) -> Self {
        Self { source, base, len }
    }

    /// Offset of the region within the underlying source.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Length of the region in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` for a zero-length region.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads from the region at a position relative to its start.
    ///
    /// Reads are clipped to the end of the region.
    pub fn read_at(&self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        if pos >= self.len {
            return Ok(0);
        }
        let avail = (self.len - pos).min(buf.len() as u64) as usize;
        self.source.read_at(&mut buf[..avail], self.base + pos)
    }

    /// Fills `buf` completely from `pos`, failing on a short read.
    pub fn read_exact_at(&self, mut buf: &mut [u8], mut pos: u64) -> io::Result<()> {
        while !buf.is_empty() {
            let n = self.read_at(buf, pos)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "region ended before buffer was filled",
                ));
            }
            buf = &mut buf[n..];
            pos += n as u64;
        }
        Ok(())
    }

    /// Returns the sub-region `[offset, offset + size)`.
    ///
    /// # Errors
    /// Returns [`ResourceError::BadRange`] if the range does not fit.
    pub fn sub_region(&self, offset: u64, size: u64) -> Result<FileRegion, ResourceError> {
        match offset.checked_add(size) {
            Some(end) if end <= self.len => Ok(FileRegion {
                source: self.source.clone(),
                base: self.base + offset,
                len: size,
            }),
            _ => Err(ResourceError::BadRange {
                offset,
                size,
                len: self.len,
            }),
        }
    }

    /// Returns a sequential reader over the whole region.
    pub fn reader(&self) -> RegionReader {
        RegionReader {
            region: self.clone(),
            pos: 0,
        }
    }
}

/// A sequential [`Read`] adapter over a [`FileRegion`].
#[derive(Debug)]
pub struct RegionReader {
    region: FileRegion,
    pos: u64,
}

impl Read for RegionReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.region.read_at(buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }
}

/// A streaming decoder for one compressed package entry.
///
/// The caller feeds stored bytes in chunks of any size; the decoder appends
/// every fully decoded byte to `output`. Output buffers are preallocated by
/// the caller from the entry's decompressed size.
pub trait Decompressor: Send {
    /// Feeds a chunk of stored (compressed) bytes.
    fn feed(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(), ResourceError>;

    /// Signals end of input, failing if the stream was truncated.
    fn finish(&mut self, output: &mut Vec<u8>) -> Result<(), ResourceError>;
}

/// A registered producer of named byte streams.
///
/// Names passed to every method are relative to the package root (the
/// registration prefix has already been stripped).
pub trait PackageModule: Send + Sync + Debug {
    /// The prefix this package is registered under. Empty matches any name
    /// that does not start with `host:` or `/`.
    fn prefix(&self) -> &str;

    /// Returns `true` iff `name` resolves within this package.
    fn exists(&self, name: &str) -> bool;

    /// Decompressed size of `name`, if it exists.
    fn size(&self, name: &str) -> Option<u64>;

    /// `(compressed_size, decompressed_size)` for compressed entries; `None`
    /// for uncompressed or missing entries.
    fn compressed_extent(&self, name: &str) -> Option<(u64, u64)>;

    /// Opens `name` for sequential reading. Compressed entries are decoded
    /// transparently.
    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceError>;

    /// Opens the stored bytes of `name` without decoding them.
    fn open_raw(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceError>;

    /// Creates a streaming decoder for a compressed entry.
    fn decompressor(&self, name: &str) -> Result<Box<dyn Decompressor>, ResourceError>;

    /// Lists file names under `dir`, relative to `dir`.
    fn list(&self, dir: &str, recursive: bool) -> Result<Vec<String>, ResourceError>;

    /// Returns a random-access window onto an uncompressed entry.
    ///
    /// # Errors
    /// Compressed entries are refused with [`ResourceError::CompressedInPackage`].
    fn file_region(&self, name: &str) -> Result<FileRegion, ResourceError>;
}

/// Filters a flat list of package paths down to the entries under `dir`.
///
/// Returned names are relative to `dir`. Non-recursive listings keep direct
/// children only; recursive listings stop at [`MAX_LIST_DEPTH`] levels.
pub fn filter_listing<'a>(
    names: impl IntoIterator<Item = &'a str>,
    dir: &str,
    recursive: bool,
) -> Vec<String> {
    let dir = dir.trim_end_matches('/');
    let max_depth = if recursive { MAX_LIST_DEPTH } else { 0 };
    names
        .into_iter()
        .filter_map(|name| {
            if dir.is_empty() {
                Some(name)
            } else {
                name.strip_prefix(dir)?.strip_prefix('/')
            }
        })
        .filter(|rel| !rel.is_empty() && rel.matches('/').count() <= max_depth)
        .map(str::to_owned)
        .collect()
}
