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

//! # SIL Resource
//!
//! The resource manager: asynchronous loads through the shared I/O table,
//! mark/sync/wait barriers, strong and weak links across managers, typed
//! access, and in-memory, file and streaming-sound resources.
//!
//! Payloads are shared between a resource and its links through a
//! reference-counted cell. The payload is released exactly once, when the
//! last strong holder is freed; weak links observe that as staleness.

mod access;
mod cell;
mod context;
mod loading;
mod manager;
mod record;

pub use context::{ManagerId, ResourceContext};
pub use manager::{Epoch, ResourceManager};
