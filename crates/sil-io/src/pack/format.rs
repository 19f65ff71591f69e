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

//! On-disk records of the pack format. All integers are little-endian.

use super::PackError;

/// First four bytes of every pack.
pub const PACK_MAGIC: [u8; 4] = *b"SILP";
/// The only format version understood by this crate.
pub const PACK_VERSION: u32 = 1;
/// Entry flag: the data is a sequence of LZ4 blocks.
pub const ENTRY_COMPRESSED: u32 = 1;

/// The fixed-size archive header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackHeader {
    /// Always [`PACK_MAGIC`].
    pub magic: [u8; 4],
    /// Format version.
    pub version: u32,
    /// Number of [`EntryRecord`]s following the header.
    pub entry_count: u32,
    /// Length of the name blob following the table.
    pub names_len: u32,
}

/// One row of the entry table.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EntryRecord {
    /// Offset of the name within the name blob.
    pub name_offset: u32,
    /// Length of the name in bytes.
    pub name_len: u32,
    /// Absolute file offset of the stored data.
    pub offset: u64,
    /// Number of bytes stored in the archive.
    pub stored_size: u64,
    /// Number of bytes after decoding.
    pub size: u64,
    /// Bit set of `ENTRY_*` flags.
    pub flags: u32,
    /// Decoded size of every block but the last. Zero for stored entries.
    pub block_size: u32,
}

impl PackHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = std::mem::size_of::<PackHeader>();

    /// Creates a header for the current format version.
    pub fn new(entry_count: u32, names_len: u32) -> Self {
        Self {
            magic: PACK_MAGIC,
            version: PACK_VERSION,
            entry_count,
            names_len,
        }
    }

    /// Decodes and validates a header.
    pub fn decode(bytes: &[u8]) -> Result<Self, PackError> {
        let raw = bytes.get(..Self::SIZE).ok_or(PackError::Truncated)?;
        let header: PackHeader = bytemuck::pod_read_unaligned(raw);
        if header.magic != PACK_MAGIC {
            return Err(PackError::BadMagic);
        }
        let header = Self {
            magic: header.magic,
            version: u32::from_le(header.version),
            entry_count: u32::from_le(header.entry_count),
            names_len: u32::from_le(header.names_len),
        };
        if header.version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(header.version));
        }
        Ok(header)
    }

    /// Encodes the header.
    pub fn encode(&self) -> [u8; PackHeader::SIZE] {
        let le = Self {
            magic: self.magic,
            version: self.version.to_le(),
            entry_count: self.entry_count.to_le(),
            names_len: self.names_len.to_le(),
        };
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(bytemuck::bytes_of(&le));
        out
    }
}

impl EntryRecord {
    /// Encoded size in bytes.
    pub const SIZE: usize = std::mem::size_of::<EntryRecord>();

    /// Whether the entry is stored as LZ4 blocks.
    pub fn is_compressed(&self) -> bool {
        self.flags & ENTRY_COMPRESSED != 0
    }

    /// Decodes one record. `bytes` must hold at least [`Self::SIZE`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, PackError> {
        let raw = bytes.get(..Self::SIZE).ok_or(PackError::Truncated)?;
        let record: EntryRecord = bytemuck::pod_read_unaligned(raw);
        Ok(record.swap_le())
    }

    /// Encodes the record.
    pub fn encode(&self) -> [u8; EntryRecord::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(bytemuck::bytes_of(&self.swap_le()));
        out
    }

    // Converting to and from little-endian is the same operation.
    fn swap_le(self) -> Self {
        Self {
            name_offset: u32::from_le(self.name_offset),
            name_len: u32::from_le(self.name_len),
            offset: u64::from_le(self.offset),
            stored_size: u64::from_le(self.stored_size),
            size: u64::from_le(self.size),
            flags: u32::from_le(self.flags),
            block_size: u32::from_le(self.block_size),
        }
    }
}
