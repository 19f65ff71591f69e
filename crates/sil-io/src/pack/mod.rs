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

//! The SIL pack archive.
//!
//! A pack is a single file holding a sorted table of named entries. Each entry
//! is either stored verbatim, in which case it can be opened for random access,
//! or as a sequence of independently LZ4-compressed blocks that must be
//! decoded front to back.
//!
//! ```text
//! +-----------+----------------------+-----------+-------------+
//! | header 16 | entry table 40 * n   | name blob | entry data  |
//! +-----------+----------------------+-----------+-------------+
//! ```

mod builder;
mod format;
mod lz4;
mod reader;

pub use builder::PackBuilder;
pub use format::{EntryRecord, PackHeader, ENTRY_COMPRESSED, PACK_MAGIC, PACK_VERSION};
pub use lz4::{compress_blocks, Lz4BlockDecompressor, Lz4BlockReader};
pub use reader::PackFile;

use sil_core::ResourceError;
use thiserror::Error;

/// An error raised while reading or writing a pack archive.
#[derive(Debug, Error)]
pub enum PackError {
    /// The file does not start with the pack magic.
    #[error("Not a SIL pack archive (bad magic)")]
    BadMagic,
    /// The archive was written by an unknown format version.
    #[error("Unsupported pack version {0}")]
    UnsupportedVersion(u32),
    /// The file ends before its header, table or data do.
    #[error("Pack archive is truncated")]
    Truncated,
    /// The table is internally inconsistent.
    #[error("Corrupt pack archive: {0}")]
    Corrupt(String),
    /// The builder was given an entry name that cannot be stored.
    #[error("Invalid entry name '{0}'")]
    InvalidName(String),
    /// The builder was given the same entry name twice.
    #[error("Duplicate entry '{0}'")]
    DuplicateEntry(String),
    /// Reading or writing the underlying file failed.
    #[error("Pack I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PackError> for ResourceError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::Io(io) => ResourceError::from(io),
            other => ResourceError::Io(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_errors_convert_to_io() {
        let err: ResourceError = PackError::BadMagic.into();
        assert_eq!(
            err,
            ResourceError::Io("Not a SIL pack archive (bad magic)".into())
        );

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ResourceError = PackError::Io(io).into();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }
}
