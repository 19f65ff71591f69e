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

//! # SIL Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! shared by the resource, I/O, graphics and input subsystems.
//!
//! Nothing in here performs I/O or owns threads. The crates built on top of it
//! (`sil-io`, `sil-resource`, `sil-graphics`, `sil-input`) provide behaviour;
//! this crate only fixes the vocabulary they use to talk to each other and to
//! the external collaborators (GPU driver, codecs, package formats).

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod error;
pub mod package;
pub mod renderer;
pub mod resource;

pub use codec::{FontHandle, ResourceCodec, SoundHandle, TextureHandle};
pub use config::EngineSettings;
pub use error::ResourceError;
pub use package::{Decompressor, FileRegion, PackageModule, RandomAccess};
pub use renderer::{GpuObject, GpuObjectKind, Renderer};
pub use resource::{AllocFlags, ResourceId, ResourceKind, ResourceState};

/// Maximum length, in bytes, of a host filesystem path built from a resource name.
pub const MAX_PATH_LEN: usize = 4096;

/// Maximum directory depth visited by recursive listings.
pub const MAX_LIST_DEPTH: usize = 15;
