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

//! # SIL Graphics
//!
//! The GPU-thread services: a queue batching GPU object deletion and the
//! shader program cache built on top of it. Neither type locks; both are
//! meant to be owned by the thread that owns the [`Renderer`](sil_core::Renderer).

pub mod delete_queue;
pub mod recording;
pub mod shader_cache;

pub use delete_queue::{DeferredDeleteQueue, PendingDeletion};
pub use recording::RecordingRenderer;
pub use shader_cache::{
    BuiltinUniform, Lookup, ShaderCache, ShaderCacheError, ShaderCompileContext, ShaderEntry,
    INVALID_SHADER_KEY,
};
