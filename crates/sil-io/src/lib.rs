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

//! I/O services for resource loading.
//!
//! - [`Vfs`]: resolves resource names through the [`PackageRegistry`] and the
//!   host filesystem ([`PathResolver`]).
//! - [`pack`]: the SIL pack archive format and its [`PackageModule`] implementation.
//! - [`MemoryPackage`]: a package backed by in-memory buffers.
//! - [`AsyncLoader`]: the background I/O thread, its bounded request table and
//!   the optional decompression worker pool.
//!
//! [`PackageModule`]: sil_core::PackageModule

#![warn(missing_docs)]

mod decompress;
mod host;
mod loader;
mod memory;
pub mod pack;
mod path;
mod registry;
pub mod settings;
mod vfs;

pub use host::SharedFile;
pub use loader::{AsyncLoader, IoJob, Ticket, TicketWaiter};
pub use memory::MemoryPackage;
pub use pack::{PackBuilder, PackError, PackFile};
pub use path::PathResolver;
pub use registry::{PackageRegistry, PackageToken};
pub use vfs::{DirListing, Resolved, Vfs};
