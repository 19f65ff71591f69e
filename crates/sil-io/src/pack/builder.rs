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

use super::format::{EntryRecord, PackHeader, ENTRY_COMPRESSED};
use super::lz4::compress_blocks;
use super::PackError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default decoded size of one compressed block.
pub const DEFAULT_BLOCK_SIZE: u32 = 64 * 1024;

#[derive(Debug)]
struct PendingEntry {
    stored: Vec<u8>,
    size: u64,
    block_size: Option<u32>,
}

/// Assembles a pack archive in memory and writes it out in one go.
#[derive(Debug)]
pub struct PackBuilder {
    block_size: u32,
    entries: BTreeMap<String, PendingEntry>,
}

impl Default for PackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackBuilder {
    /// Creates an empty builder using [`DEFAULT_BLOCK_SIZE`].
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            entries: BTreeMap::new(),
        }
    }

    /// Sets the block size used by subsequent compressed entries.
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entry was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry stored verbatim.
    pub fn add(&mut self, name: &str, data: Vec<u8>) -> Result<&mut Self, PackError> {
        let size = data.len() as u64;
        self.insert(
            name,
            PendingEntry {
                stored: data,
                size,
                block_size: None,
            },
        )
    }

    /// Adds an entry stored as LZ4 blocks.
    pub fn add_compressed(&mut self, name: &str, data: &[u8]) -> Result<&mut Self, PackError> {
        let stored = compress_blocks(data, self.block_size);
        self.insert(
            name,
            PendingEntry {
                stored,
                size: data.len() as u64,
                block_size: Some(self.block_size),
            },
        )
    }

    fn insert(&mut self, name: &str, entry: PendingEntry) -> Result<&mut Self, PackError> {
        if name.is_empty() || name.starts_with('/') || name.ends_with('/') {
            return Err(PackError::InvalidName(name.to_owned()));
        }
        if self.entries.contains_key(name) {
            return Err(PackError::DuplicateEntry(name.to_owned()));
        }
        self.entries.insert(name.to_owned(), entry);
        Ok(self)
    }

    /// Writes the archive to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), PackError> {
        let too_large = || PackError::Corrupt("archive exceeds format limits".into());

        let entry_count = u32::try_from(self.entries.len()).map_err(|_| too_large())?;
        let names_len: usize = self.entries.keys().map(String::len).sum();
        let names_len = u32::try_from(names_len).map_err(|_| too_large())?;

        let mut offset = (PackHeader::SIZE + self.entries.len() * EntryRecord::SIZE) as u64
            + u64::from(names_len);
        let mut name_offset = 0u32;

        out.write_all(&PackHeader::new(entry_count, names_len).encode())?;
        for (name, entry) in &self.entries {
            let name_len = name.len() as u32;
            let record = EntryRecord {
                name_offset,
                name_len,
                offset,
                stored_size: entry.stored.len() as u64,
                size: entry.size,
                flags: if entry.block_size.is_some() {
                    ENTRY_COMPRESSED
                } else {
                    0
                },
                block_size: entry.block_size.unwrap_or(0),
            };
            out.write_all(&record.encode())?;
            name_offset += name_len;
            offset += record.stored_size;
        }
        for name in self.entries.keys() {
            out.write_all(name.as_bytes())?;
        }
        for entry in self.entries.values() {
            out.write_all(&entry.stored)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Writes the archive to a new file at `path`.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), PackError> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        log::info!(
            "Wrote pack '{}' with {} entries",
            path.display(),
            self.entries.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicates_and_bad_names() {
        let mut builder = PackBuilder::new();
        builder.add("a.txt", b"a".to_vec()).unwrap();
        assert!(matches!(
            builder.add("a.txt", b"b".to_vec()),
            Err(PackError::DuplicateEntry(_))
        ));
        assert!(matches!(
            builder.add("/abs", Vec::new()),
            Err(PackError::InvalidName(_))
        ));
        assert!(matches!(
            builder.add_compressed("", b"x"),
            Err(PackError::InvalidName(_))
        ));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn layout_starts_with_header_and_sorted_names() {
        let mut builder = PackBuilder::new();
        builder.add("b", b"BB".to_vec()).unwrap();
        builder.add("a", b"A".to_vec()).unwrap();

        let mut bytes = Vec::new();
        builder.write_to(&mut bytes).unwrap();

        let header = PackHeader::decode(&bytes).unwrap();
        assert_eq!(header.entry_count, 2);
        assert_eq!(header.names_len, 2);
        let names_at = PackHeader::SIZE + 2 * EntryRecord::SIZE;
        assert_eq!(&bytes[names_at..names_at + 2], b"ab");
        assert_eq!(&bytes[names_at + 2..], b"ABB");
    }
}
