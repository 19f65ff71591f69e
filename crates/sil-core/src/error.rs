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

//! Defines the error taxonomy shared by the resource and I/O subsystems.

use crate::resource::ResourceKind;
use thiserror::Error;

/// An error raised while resolving, loading, linking or accessing a resource.
///
/// The type is `Clone` because a record whose load failed keeps the error and
/// reports it again on every later access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The resource name does not resolve to anything.
    #[error("Resource '{0}' not found")]
    NotFound(String),
    /// The ID exists but holds a different kind of resource.
    #[error("Wrong resource kind: expected {expected}, found {found}")]
    WrongKind {
        /// The kind the caller asked for.
        expected: ResourceKind,
        /// The kind actually stored.
        found: ResourceKind,
    },
    /// The resource is still loading.
    #[error("Resource is still loading")]
    NotReady,
    /// The ID is a weak link whose target has been destroyed.
    #[error("Weak link target has been destroyed")]
    Stale,
    /// The ID is null, was never issued, or has already been freed.
    #[error("Invalid resource ID")]
    InvalidId,
    /// The constructed host path exceeds the path length limit.
    #[error("Host path is too long ({0} bytes)")]
    PathTooLong(usize),
    /// Random-access open attempted on a compressed package entry.
    #[error("Cannot open compressed package entry '{0}' for random access")]
    CompressedInPackage(String),
    /// A sub-range of a file lies outside the file.
    #[error("Range {offset}+{size} is outside a file of {len} bytes")]
    BadRange {
        /// Start of the requested range.
        offset: u64,
        /// Length of the requested range.
        size: u64,
        /// Length of the file.
        len: u64,
    },
    /// Host filesystem access was requested while it is disabled.
    #[error("Host filesystem access is disabled (requested '{0}')")]
    Disabled(String),
    /// Heap exhaustion or capacity overflow.
    #[error("Out of memory")]
    OutOfMemory,
    /// A codec reported failure while decoding a resource.
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    /// The byte producer reported a failure while reading.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ResourceError::NotFound(err.to_string()),
            std::io::ErrorKind::OutOfMemory => ResourceError::OutOfMemory,
            _ => ResourceError::Io(err.to_string()),
        }
    }
}

impl From<std::collections::TryReserveError> for ResourceError {
    fn from(_: std::collections::TryReserveError) -> Self {
        ResourceError::OutOfMemory
    }
}
