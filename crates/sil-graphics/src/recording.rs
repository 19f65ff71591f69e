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

//! A [`Renderer`] that records every call instead of talking to a driver.
//!
//! Useful for headless runs and tests.

use sil_core::{GpuObjectKind, Renderer};
use std::num::NonZeroU32;

/// Records releases, unbinds and GPU syncs.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// Every released object, in release order.
    pub released: Vec<(GpuObjectKind, u32)>,
    /// Every texture unbound.
    pub unbound: Vec<u32>,
    /// Number of `finish` calls.
    pub finishes: usize,
}

impl RecordingRenderer {
    /// Released objects of `kind`, in release order.
    pub fn released_of(&self, kind: GpuObjectKind) -> Vec<u32> {
        self.released
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, raw)| *raw)
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn release_object(&mut self, kind: GpuObjectKind, raw: NonZeroU32) {
        self.released.push((kind, raw.get()));
    }

    fn unbind_texture(&mut self, texture: NonZeroU32) {
        self.unbound.push(texture.get());
    }

    fn finish(&mut self) {
        self.finishes += 1;
    }
}
