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

use super::format::{EntryRecord, PackHeader};
use super::lz4::{Lz4BlockDecompressor, Lz4BlockReader};
use super::PackError;
use crate::host::SharedFile;
use sil_core::package::filter_listing;
use sil_core::{Decompressor, FileRegion, PackageModule, RandomAccess, ResourceError};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct PackEntry {
    name: String,
    record: EntryRecord,
}

/// A pack archive opened from disk and registered under a prefix.
///
/// The table is read once at open time; entry data is read on demand through
/// a shared file handle, so every reader and region handed out stays valid
/// for as long as it is alive, even after the package is unregistered.
#[derive(Debug)]
pub struct PackFile {
    prefix: String,
    path: PathBuf,
    file: Arc<SharedFile>,
    entries: Vec<PackEntry>,
}

impl PackFile {
    /// Opens and validates the archive at `path`.
    ///
    /// # Errors
    /// Any [`PackError`] describing why the file is not a usable archive.
    pub fn open(path: impl AsRef<Path>, prefix: impl Into<String>) -> Result<Self, PackError> {
        let path = path.as_ref();
        let file = Arc::new(SharedFile::open(path)?);
        let file_len = file.len()?;
        let region = FileRegion::new(file.clone(), 0, file_len);

        let mut header_bytes = [0u8; PackHeader::SIZE];
        read_exact(&region, &mut header_bytes, 0)?;
        let header = PackHeader::decode(&header_bytes)?;

        let table_len = (header.entry_count as u64) * EntryRecord::SIZE as u64;
        let names_at = PackHeader::SIZE as u64 + table_len;
        let data_at = names_at + u64::from(header.names_len);
        if data_at > file_len {
            return Err(PackError::Truncated);
        }

        let mut table = vec![0u8; table_len as usize];
        read_exact(&region, &mut table, PackHeader::SIZE as u64)?;
        let mut names = vec![0u8; header.names_len as usize];
        read_exact(&region, &mut names, names_at)?;

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for raw in table.chunks_exact(EntryRecord::SIZE) {
            let record = EntryRecord::decode(raw)?;
            let entry = validate(record, &names, data_at, file_len)?;
            if let Some(prev) = entries.last().map(|e: &PackEntry| e.name.as_str()) {
                if prev >= entry.name.as_str() {
                    return Err(PackError::Corrupt(format!(
                        "entry '{}' is out of order",
                        entry.name
                    )));
                }
            }
            entries.push(entry);
        }

        let prefix = prefix.into();
        log::debug!(
            "Opened pack '{}' with {} entries under prefix '{}'",
            path.display(),
            entries.len(),
            prefix
        );
        Ok(Self {
            prefix,
            path: path.to_path_buf(),
            file,
            entries,
        })
    }

    /// Path of the archive on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` for an archive with no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over every entry name, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    fn find(&self, name: &str) -> Option<&EntryRecord> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i].record)
    }

    fn get(&self, name: &str) -> Result<&EntryRecord, ResourceError> {
        self.find(name)
            .ok_or_else(|| ResourceError::NotFound(format!("{}{}", self.prefix, name)))
    }

    fn stored_region(&self, record: &EntryRecord) -> FileRegion {
        let source: Arc<dyn RandomAccess> = self.file.clone();
        FileRegion::new(source, record.offset, record.stored_size)
    }
}

fn read_exact(region: &FileRegion, buf: &mut [u8], pos: u64) -> Result<(), PackError> {
    region.read_exact_at(buf, pos).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            PackError::Truncated
        } else {
            PackError::Io(e)
        }
    })
}

fn validate(
    record: EntryRecord,
    names: &[u8],
    data_at: u64,
    file_len: u64,
) -> Result<PackEntry, PackError> {
    let start = record.name_offset as usize;
    let end = start
        .checked_add(record.name_len as usize)
        .filter(|end| *end <= names.len())
        .ok_or_else(|| PackError::Corrupt("entry name outside the name blob".into()))?;
    let name = std::str::from_utf8(&names[start..end])
        .map_err(|_| PackError::Corrupt("entry name is not UTF-8".into()))?
        .to_owned();

    let in_bounds = match record.offset.checked_add(record.stored_size) {
        Some(end) => record.offset >= data_at && end <= file_len,
        None => false,
    };
    if !in_bounds {
        return Err(PackError::Corrupt(format!("data of '{name}' is out of bounds")));
    }
    if record.is_compressed() {
        if record.block_size == 0 {
            return Err(PackError::Corrupt(format!("'{name}' has a zero block size")));
        }
    } else if record.stored_size != record.size {
        return Err(PackError::Corrupt(format!(
            "stored entry '{name}' has mismatched sizes"
        )));
    }
    Ok(PackEntry { name, record })
}

impl PackageModule for PackFile {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn size(&self, name: &str) -> Option<u64> {
        self.find(name).map(|r| r.size)
    }

    fn compressed_extent(&self, name: &str) -> Option<(u64, u64)> {
        self.find(name)
            .filter(|r| r.is_compressed())
            .map(|r| (r.stored_size, r.size))
    }

    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        let record = self.get(name)?;
        let raw = self.stored_region(record).reader();
        if record.is_compressed() {
            Ok(Box::new(Lz4BlockReader::new(
                raw,
                record.size,
                record.block_size,
            )))
        } else {
            Ok(Box::new(raw))
        }
    }

    fn open_raw(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        let record = self.get(name)?;
        Ok(Box::new(self.stored_region(record).reader()))
    }

    fn decompressor(&self, name: &str) -> Result<Box<dyn Decompressor>, ResourceError> {
        let record = self.get(name)?;
        if !record.is_compressed() {
            return Err(ResourceError::DecodeFailed(format!(
                "'{}{}' is not compressed",
                self.prefix, name
            )));
        }
        Ok(Box::new(Lz4BlockDecompressor::new(
            record.size,
            record.block_size,
        )))
    }

    fn list(&self, dir: &str, recursive: bool) -> Result<Vec<String>, ResourceError> {
        Ok(filter_listing(self.names(), dir, recursive))
    }

    fn file_region(&self, name: &str) -> Result<FileRegion, ResourceError> {
        let record = self.get(name)?;
        if record.is_compressed() {
            return Err(ResourceError::CompressedInPackage(format!(
                "{}{}",
                self.prefix, name
            )));
        }
        Ok(self.stored_region(record))
    }
}
