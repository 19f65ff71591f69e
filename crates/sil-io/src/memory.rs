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

//! A package backed by in-memory buffers.

use crate::pack::{compress_blocks, Lz4BlockDecompressor, Lz4BlockReader};
use sil_core::package::filter_listing;
use sil_core::{Decompressor, FileRegion, PackageModule, RandomAccess, ResourceError};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

#[derive(Debug)]
struct SharedBytes(Arc<[u8]>);

impl RandomAccess for SharedBytes {
    fn read_at(&self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        let Ok(pos) = usize::try_from(pos) else {
            return Ok(0);
        };
        let Some(rest) = self.0.get(pos..) else {
            return Ok(0);
        };
        let n = buf.len().min(rest.len());
        buf[..n].copy_from_slice(&rest[..n]);
        Ok(n)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    stored: Arc<[u8]>,
    size: u64,
    block_size: Option<u32>,
}

/// A prefix-addressed package whose entries live in memory.
///
/// ```
/// use sil_core::PackageModule;
/// use sil_io::MemoryPackage;
///
/// let pkg = MemoryPackage::new("mem:").with_file("greeting.txt", b"hello".to_vec());
/// assert!(pkg.exists("greeting.txt"));
/// assert_eq!(pkg.size("greeting.txt"), Some(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryPackage {
    prefix: String,
    entries: BTreeMap<String, MemoryEntry>,
}

impl MemoryPackage {
    /// Creates an empty package registered under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) an uncompressed entry.
    pub fn with_file(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.insert_file(name, data);
        self
    }

    /// Adds (or replaces) an entry stored as LZ4 blocks of `block_size` bytes.
    pub fn with_compressed_file(
        mut self,
        name: impl Into<String>,
        data: &[u8],
        block_size: u32,
    ) -> Self {
        let block_size = block_size.max(1);
        self.entries.insert(
            name.into(),
            MemoryEntry {
                stored: compress_blocks(data, block_size).into(),
                size: data.len() as u64,
                block_size: Some(block_size),
            },
        );
        self
    }

    /// Adds (or replaces) an uncompressed entry in place.
    pub fn insert_file(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let size = data.len() as u64;
        self.entries.insert(
            name.into(),
            MemoryEntry {
                stored: data.into(),
                size,
                block_size: None,
            },
        );
    }

    fn get(&self, name: &str) -> Result<&MemoryEntry, ResourceError> {
        self.entries
            .get(name)
            .ok_or_else(|| ResourceError::NotFound(format!("{}{}", self.prefix, name)))
    }
}

impl PackageModule for MemoryPackage {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn size(&self, name: &str) -> Option<u64> {
        self.entries.get(name).map(|e| e.size)
    }

    fn compressed_extent(&self, name: &str) -> Option<(u64, u64)> {
        let entry = self.entries.get(name)?;
        entry.block_size.map(|_| (entry.stored.len() as u64, entry.size))
    }

    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        let entry = self.get(name)?;
        let raw = Cursor::new(entry.stored.clone());
        match entry.block_size {
            Some(block_size) => Ok(Box::new(Lz4BlockReader::new(raw, entry.size, block_size))),
            None => Ok(Box::new(raw)),
        }
    }

    fn open_raw(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        let entry = self.get(name)?;
        Ok(Box::new(Cursor::new(entry.stored.clone())))
    }

    fn decompressor(&self, name: &str) -> Result<Box<dyn Decompressor>, ResourceError> {
        let entry = self.get(name)?;
        match entry.block_size {
            Some(block_size) => Ok(Box::new(Lz4BlockDecompressor::new(entry.size, block_size))),
            None => Err(ResourceError::DecodeFailed(format!(
                "'{}{}' is not compressed",
                self.prefix, name
            ))),
        }
    }

    fn list(&self, dir: &str, recursive: bool) -> Result<Vec<String>, ResourceError> {
        Ok(filter_listing(
            self.entries.keys().map(String::as_str),
            dir,
            recursive,
        ))
    }

    fn file_region(&self, name: &str) -> Result<FileRegion, ResourceError> {
        let entry = self.get(name)?;
        if entry.block_size.is_some() {
            return Err(ResourceError::CompressedInPackage(format!(
                "{}{}",
                self.prefix, name
            )));
        }
        let len = entry.stored.len() as u64;
        Ok(FileRegion::new(
            Arc::new(SharedBytes(entry.stored.clone())),
            0,
            len,
        ))
    }
}
