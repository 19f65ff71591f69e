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

//! The shader program cache.
//!
//! Programs are cached in an open-addressing table keyed by a caller-defined
//! 32-bit key. Probing is linear from `key % capacity`. When the table is full
//! it either grows, or (fixed-size tables) evicts the least recently used
//! entry and rehashes.

use crate::delete_queue::DeferredDeleteQueue;
use sil_core::config::ShaderCacheSettings;
use sil_core::renderer::ProgramId;
use sil_core::Renderer;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// The key no shader can ever be stored under.
pub const INVALID_SHADER_KEY: u32 = 0xFFFF_FFFF;

/// Capacity allocated on first lookup by a growable cache created empty.
pub const DEFAULT_CAPACITY: usize = 100;

/// Slots added each time a growable cache fills up.
pub const GROWTH_STRIDE: usize = 100;

/// Errors returned by [`ShaderCache::lookup`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShaderCacheError {
    /// The key is [`INVALID_SHADER_KEY`].
    #[error("Shader key 0xFFFFFFFF is reserved")]
    InvalidKey,
    /// A fixed-size cache was created with no slots.
    #[error("Shader cache has no slots and may not grow")]
    NotInitialized,
    /// Rehashing after an eviction could not place an entry.
    #[error("Rehash failed to place shader key {key:#x}")]
    RehashFailed {
        /// The key being looked up.
        key: u32,
    },
    /// The slot table could not be allocated.
    #[error("Out of memory allocating {0} shader cache slots")]
    OutOfMemory(usize),
}

/// Built-in uniforms every cached program may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinUniform {
    /// Combined model-view-projection transform.
    Transform,
    /// Texture coordinate offset.
    TextureOffset,
    /// Constant vertex colour.
    FixedColor,
    /// Fog start, end and density.
    FogParams,
    /// Fog colour.
    FogColor,
    /// Alpha test reference value.
    AlphaRef,
    /// Point sprite size.
    PointSize,
}

impl BuiltinUniform {
    /// Number of built-in uniforms.
    pub const COUNT: usize = 7;

    /// Every built-in uniform, in slot order.
    pub const ALL: [BuiltinUniform; Self::COUNT] = [
        BuiltinUniform::Transform,
        BuiltinUniform::TextureOffset,
        BuiltinUniform::FixedColor,
        BuiltinUniform::FogParams,
        BuiltinUniform::FogColor,
        BuiltinUniform::AlphaRef,
        BuiltinUniform::PointSize,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Lets a worker thread compile shaders in a context sharing objects with
/// the GPU thread.
pub trait ShaderCompileContext: Send + Sync + Debug {
    /// Makes the shared context current on the calling thread.
    fn make_current(&self) -> bool;

    /// Releases the context from the calling thread.
    fn release(&self);
}

/// One slot of the cache.
#[derive(Debug, Default)]
pub struct ShaderEntry {
    last_used: u64,
    key: u32,
    program: Option<ProgramId>,
    builtin: [Option<i32>; BuiltinUniform::COUNT],
    user: Vec<(String, i32)>,
}

impl ShaderEntry {
    fn is_live(&self) -> bool {
        self.last_used != 0
    }

    /// Resets everything but the usage stamp.
    fn reset(&mut self) -> Option<ProgramId> {
        self.builtin = Default::default();
        self.user = Vec::new();
        self.program.take()
    }

    /// The key this entry is stored under.
    pub fn key(&self) -> u32 {
        self.key
    }

    /// Usage stamp of the last lookup that returned this entry.
    pub fn last_used(&self) -> u64 {
        self.last_used
    }

    /// The compiled program, if one has been stored.
    pub fn program(&self) -> Option<&ProgramId> {
        self.program.as_ref()
    }

    /// Stores a compiled program, returning the one it replaces.
    pub fn set_program(&mut self, program: ProgramId) -> Option<ProgramId> {
        self.program.replace(program)
    }

    /// Removes the compiled program, for instance after a failed link.
    pub fn take_program(&mut self) -> Option<ProgramId> {
        self.program.take()
    }

    /// Location of a built-in uniform, if the program uses it.
    pub fn uniform(&self, uniform: BuiltinUniform) -> Option<i32> {
        self.builtin[uniform.slot()]
    }

    /// Records the location of a built-in uniform.
    pub fn set_uniform(&mut self, uniform: BuiltinUniform, location: Option<i32>) {
        self.builtin[uniform.slot()] = location;
    }

    /// Location of a user uniform.
    pub fn user_uniform(&self, name: &str) -> Option<i32> {
        self.user
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, location)| *location)
    }

    /// Records the location of a user uniform.
    pub fn set_user_uniform(&mut self, name: &str, location: i32) {
        match self.user.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = location,
            None => self.user.push((name.to_owned(), location)),
        }
    }

    /// Every user uniform, in registration order.
    pub fn user_uniforms(&self) -> &[(String, i32)] {
        &self.user
    }
}

/// The result of [`ShaderCache::lookup`].
#[derive(Debug)]
pub struct Lookup<'a> {
    /// The entry for the key. A fresh entry has no program.
    pub entry: &'a mut ShaderEntry,
    /// `true` if the table was reallocated; any entry data copied out of the
    /// cache earlier must be looked up again.
    pub invalidated: bool,
}

/// Cache of compiled shader programs.
///
/// Only the GPU thread touches the cache. Usage stamps come from a counter
/// that starts odd and advances by two, so a stamp is never zero, the value
/// marking a free slot.
#[derive(Debug)]
pub struct ShaderCache {
    slots: Vec<ShaderEntry>,
    counter: u64,
    used: usize,
    dynamic_resize: bool,
    compile_context: Option<Arc<dyn ShaderCompileContext>>,
}

impl ShaderCache {
    /// Creates a cache with `settings.initial_capacity` slots.
    ///
    /// A growable cache created with zero slots allocates
    /// [`DEFAULT_CAPACITY`] on its first lookup.
    pub fn new(settings: &ShaderCacheSettings) -> Result<Self, ShaderCacheError> {
        Ok(Self {
            slots: allocate(settings.initial_capacity)?,
            counter: 1,
            used: 0,
            dynamic_resize: settings.dynamic_resize,
            compile_context: None,
        })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Returns `true` if the cache grows instead of evicting.
    pub fn dynamic_resize(&self) -> bool {
        self.dynamic_resize
    }

    /// Installs (or removes) the context used for off-thread compilation.
    pub fn set_compile_context(&mut self, context: Option<Arc<dyn ShaderCompileContext>>) {
        self.compile_context = context;
    }

    /// The context used for off-thread compilation, if any.
    pub fn compile_context(&self) -> Option<&Arc<dyn ShaderCompileContext>> {
        self.compile_context.as_ref()
    }

    /// Returns the entry for `key`, creating it if needed.
    ///
    /// Every call bumps the entry's usage stamp. If the table is full, a
    /// growable cache grows by [`GROWTH_STRIDE`] slots; a fixed one evicts
    /// the least recently used entry, queueing its program on `deleter`, and
    /// rehashes. Both cases report `invalidated`.
    pub fn lookup(
        &mut self,
        key: u32,
        deleter: &mut DeferredDeleteQueue,
        renderer: &mut dyn Renderer,
    ) -> Result<Lookup<'_>, ShaderCacheError> {
        if key == INVALID_SHADER_KEY {
            return Err(ShaderCacheError::InvalidKey);
        }
        if self.slots.is_empty() {
            if !self.dynamic_resize {
                return Err(ShaderCacheError::NotInitialized);
            }
            self.slots = allocate(DEFAULT_CAPACITY)?;
        }

        if let Some(index) = self.probe(key) {
            return Ok(Lookup {
                entry: &mut self.slots[index],
                invalidated: false,
            });
        }

        if self.dynamic_resize {
            let capacity = self.slots.len() + GROWTH_STRIDE;
            log::debug!("Shader cache full, growing to {capacity} slots");
            self.rehash(capacity, key)?;
        } else {
            self.evict_for(key, deleter, renderer);
            self.rehash(self.slots.len(), key)?;
        }
        let index = self.probe(key).ok_or(ShaderCacheError::RehashFailed { key })?;
        Ok(Lookup {
            entry: &mut self.slots[index],
            invalidated: true,
        })
    }

    fn bump(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(2);
        self.counter
    }

    /// Finds `key` or seizes a free slot for it.
    fn probe(&mut self, key: u32) -> Option<usize> {
        let capacity = self.slots.len();
        let start = key as usize % capacity;
        for step in 0..capacity {
            let index = (start + step) % capacity;
            let slot = &self.slots[index];
            if slot.is_live() && slot.key != key {
                continue;
            }
            if !slot.is_live() {
                self.used += 1;
            }
            let stamp = self.bump();
            let slot = &mut self.slots[index];
            slot.key = key;
            slot.last_used = stamp;
            return Some(index);
        }
        None
    }

    /// Hands the least recently used slot over to `key`.
    fn evict_for(&mut self, key: u32, deleter: &mut DeferredDeleteQueue, renderer: &mut dyn Renderer) {
        let counter = self.counter;
        let Some(victim) = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_live())
            .max_by_key(|(_, slot)| counter.wrapping_sub(slot.last_used))
            .map(|(index, _)| index)
        else {
            return;
        };
        let stamp = self.bump();
        let slot = &mut self.slots[victim];
        log::debug!(
            "Shader cache full, evicting key {:#x} for key {key:#x}",
            slot.key
        );
        if let Some(program) = slot.reset() {
            deleter.delete(renderer, program);
        }
        slot.key = key;
        slot.last_used = stamp;
    }

    /// Moves every live entry into a fresh table of `capacity` slots.
    fn rehash(&mut self, capacity: usize, key: u32) -> Result<(), ShaderCacheError> {
        let old = std::mem::replace(&mut self.slots, allocate(capacity)?);
        for entry in old.into_iter().filter(ShaderEntry::is_live) {
            let start = entry.key as usize % capacity;
            let free = (0..capacity)
                .map(|step| (start + step) % capacity)
                .find(|&index| !self.slots[index].is_live());
            match free {
                Some(index) => self.slots[index] = entry,
                None => {
                    debug_assert!(false, "rehash could not place shader key {:#x}", entry.key);
                    log::error!("Rehash could not place shader key {:#x}", entry.key);
                    return Err(ShaderCacheError::RehashFailed { key });
                }
            }
        }
        log::debug!("Rehashed shader cache into {capacity} slots");
        Ok(())
    }

    /// Drops every entry, queueing their programs for deletion.
    ///
    /// A growable cache also frees its table.
    pub fn clear(&mut self, deleter: &mut DeferredDeleteQueue, renderer: &mut dyn Renderer) {
        for slot in self.slots.iter_mut().filter(|slot| slot.is_live()) {
            if let Some(program) = slot.reset() {
                deleter.delete(renderer, program);
            }
            slot.last_used = 0;
        }
        self.used = 0;
        if self.dynamic_resize {
            self.slots = Vec::new();
        }
    }
}

fn allocate(capacity: usize) -> Result<Vec<ShaderEntry>, ShaderCacheError> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| ShaderCacheError::OutOfMemory(capacity))?;
    slots.resize_with(capacity, ShaderEntry::default);
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingRenderer;
    use sil_core::config::DeferredDeleteSettings;
    use sil_core::{GpuObject, GpuObjectKind};
    use std::num::NonZeroU32;

    struct Gpu {
        queue: DeferredDeleteQueue,
        renderer: RecordingRenderer,
    }

    impl Gpu {
        fn new() -> Self {
            Self {
                queue: DeferredDeleteQueue::new(&DeferredDeleteSettings::default()),
                renderer: RecordingRenderer::default(),
            }
        }
    }

    fn program(raw: u32) -> ProgramId {
        ProgramId::from_raw(NonZeroU32::new(raw).unwrap())
    }

    fn cache(initial_capacity: usize, dynamic_resize: bool) -> ShaderCache {
        ShaderCache::new(&ShaderCacheSettings {
            initial_capacity,
            dynamic_resize,
        })
        .unwrap()
    }

    #[test]
    fn fixed_cache_evicts_least_recently_used() {
        let mut gpu = Gpu::new();
        let mut cache = cache(4, false);
        for key in 1..=4u32 {
            let lookup = cache.lookup(key, &mut gpu.queue, &mut gpu.renderer).unwrap();
            assert!(!lookup.invalidated);
            assert!(lookup.entry.program().is_none());
            lookup.entry.set_program(program(key * 10));
        }
        for key in 1..=3u32 {
            let lookup = cache.lookup(key, &mut gpu.queue, &mut gpu.renderer).unwrap();
            assert_eq!(lookup.entry.program().map(|p| p.raw().get()), Some(key * 10));
        }

        let lookup = cache.lookup(5, &mut gpu.queue, &mut gpu.renderer).unwrap();
        assert!(lookup.invalidated);
        assert_eq!(lookup.entry.key(), 5);
        assert!(lookup.entry.program().is_none());
        assert_eq!(cache.used(), 4);
        assert_eq!(
            gpu.queue.pending().iter().map(|p| (p.kind, p.raw.get())).collect::<Vec<_>>(),
            vec![(GpuObjectKind::Program, 40)]
        );

        for key in 1..=3u32 {
            let lookup = cache.lookup(key, &mut gpu.queue, &mut gpu.renderer).unwrap();
            assert!(!lookup.invalidated);
            assert_eq!(lookup.entry.program().map(|p| p.raw().get()), Some(key * 10));
        }
        gpu.queue.free_dead_resources(&mut gpu.renderer, false);
    }

    #[test]
    fn usage_stamps_strictly_increase() {
        let mut gpu = Gpu::new();
        let mut cache = cache(8, false);
        let mut last = 0;
        for key in [3u32, 3, 11, 3, 11, 19, 3] {
            let stamp = cache
                .lookup(key, &mut gpu.queue, &mut gpu.renderer)
                .unwrap()
                .entry
                .last_used();
            assert!(stamp > last);
            assert_ne!(stamp, 0);
            last = stamp;
        }
        assert_eq!(cache.used(), 3);
    }

    #[test]
    fn colliding_keys_probe_linearly() {
        let mut gpu = Gpu::new();
        let mut cache = cache(4, false);
        cache.lookup(2, &mut gpu.queue, &mut gpu.renderer).unwrap();
        cache.lookup(6, &mut gpu.queue, &mut gpu.renderer).unwrap();
        cache.lookup(10, &mut gpu.queue, &mut gpu.renderer).unwrap();
        assert_eq!(cache.slots[2].key(), 2);
        assert_eq!(cache.slots[3].key(), 6);
        assert_eq!(cache.slots[0].key(), 10);
    }

    #[test]
    fn dynamic_cache_allocates_and_grows() {
        let mut gpu = Gpu::new();
        let mut cache = cache(0, true);
        assert_eq!(cache.capacity(), 0);
        for key in 0..DEFAULT_CAPACITY as u32 {
            let lookup = cache.lookup(key, &mut gpu.queue, &mut gpu.renderer).unwrap();
            assert!(!lookup.invalidated);
            lookup.entry.set_program(program(key + 1));
        }
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);

        let lookup = cache.lookup(1000, &mut gpu.queue, &mut gpu.renderer).unwrap();
        assert!(lookup.invalidated);
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY + GROWTH_STRIDE);
        assert_eq!(cache.used(), DEFAULT_CAPACITY + 1);
        assert!(gpu.queue.is_empty());

        let lookup = cache.lookup(42, &mut gpu.queue, &mut gpu.renderer).unwrap();
        assert_eq!(lookup.entry.program().map(|p| p.raw().get()), Some(43));

        cache.clear(&mut gpu.queue, &mut gpu.renderer);
        assert_eq!(cache.used(), 0);
        assert_eq!(cache.capacity(), 0);
        assert_eq!(gpu.queue.len(), DEFAULT_CAPACITY);
        gpu.queue.free_dead_resources(&mut gpu.renderer, true);
        assert_eq!(gpu.renderer.released_of(GpuObjectKind::Program).len(), DEFAULT_CAPACITY);
    }

    #[test]
    fn fixed_clear_keeps_the_table() {
        let mut gpu = Gpu::new();
        let mut cache = cache(4, false);
        let lookup = cache.lookup(1, &mut gpu.queue, &mut gpu.renderer).unwrap();
        lookup.entry.set_program(program(5));
        lookup.entry.set_uniform(BuiltinUniform::Transform, Some(0));
        lookup.entry.set_user_uniform("u_time", 4);
        cache.clear(&mut gpu.queue, &mut gpu.renderer);
        assert_eq!(cache.capacity(), 4);
        assert_eq!(cache.used(), 0);

        let lookup = cache.lookup(1, &mut gpu.queue, &mut gpu.renderer).unwrap();
        assert!(lookup.entry.program().is_none());
        assert_eq!(lookup.entry.uniform(BuiltinUniform::Transform), None);
        assert!(lookup.entry.user_uniforms().is_empty());
        gpu.queue.free_dead_resources(&mut gpu.renderer, false);
    }

    #[test]
    fn rejects_invalid_key_and_empty_fixed_table() {
        let mut gpu = Gpu::new();
        let mut growable = cache(4, true);
        assert_eq!(
            growable
                .lookup(INVALID_SHADER_KEY, &mut gpu.queue, &mut gpu.renderer)
                .unwrap_err(),
            ShaderCacheError::InvalidKey
        );
        let mut empty = cache(0, false);
        assert_eq!(
            empty
                .lookup(1, &mut gpu.queue, &mut gpu.renderer)
                .unwrap_err(),
            ShaderCacheError::NotInitialized
        );
    }

    #[test]
    fn user_uniforms_are_replaced_by_name() {
        let mut entry = ShaderEntry::default();
        entry.set_user_uniform("u_color", 1);
        entry.set_user_uniform("u_size", 2);
        entry.set_user_uniform("u_color", 7);
        assert_eq!(entry.user_uniform("u_color"), Some(7));
        assert_eq!(entry.user_uniforms().len(), 2);
        assert_eq!(BuiltinUniform::ALL.len(), BuiltinUniform::COUNT);
    }
}
