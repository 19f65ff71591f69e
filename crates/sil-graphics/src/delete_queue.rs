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

//! Batched release of GPU objects.
//!
//! Destroying a GPU object while commands that reference it may still be in
//! flight is unsafe on most drivers, so objects are queued here and released
//! together at a point where the caller knows the GPU is idle.

use sil_core::config::DeferredDeleteSettings;
use sil_core::{GpuObject, GpuObjectKind, Renderer};
use std::num::NonZeroU32;

/// Number of entries added each time a growable queue runs out of room.
pub const GROWTH_STRIDE: usize = 64;

/// A GPU object waiting to be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDeletion {
    /// The class of object.
    pub kind: GpuObjectKind,
    /// The raw driver name.
    pub raw: NonZeroU32,
}

/// A queue of GPU objects released in batches.
///
/// The queue is owned by the GPU thread and needs no locking.
///
/// - A fixed queue never grows; when it is full it is flushed before the
///   new entry is appended.
/// - A growable queue grows by [`GROWTH_STRIDE`] entries; if that allocation
///   fails the new object is released on the spot instead.
#[derive(Debug)]
pub struct DeferredDeleteQueue {
    entries: Vec<PendingDeletion>,
    capacity: usize,
    fixed: bool,
}

impl DeferredDeleteQueue {
    /// Creates a queue sized from `settings`.
    pub fn new(settings: &DeferredDeleteSettings) -> Self {
        let mut entries = Vec::new();
        let capacity = match entries.try_reserve_exact(settings.size) {
            Ok(()) => settings.size,
            Err(_) => {
                log::warn!(
                    "Could not allocate a deferred-delete queue of {} entries",
                    settings.size
                );
                0
            }
        };
        Self {
            entries,
            capacity,
            fixed: settings.fixed,
        }
    }

    /// Number of queued objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries the queue holds before it flushes or grows.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` for a fixed-size queue.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// The queued objects, oldest first.
    pub fn pending(&self) -> &[PendingDeletion] {
        &self.entries
    }

    /// Queues a typed GPU object for release.
    pub fn delete<T: GpuObject>(&mut self, renderer: &mut dyn Renderer, object: T) {
        self.push(renderer, T::KIND, object.into_raw());
    }

    /// Queues a raw GPU object for release.
    ///
    /// Textures are unbound from every texture unit first, so a queued texture
    /// is never sampled again.
    pub fn push(&mut self, renderer: &mut dyn Renderer, kind: GpuObjectKind, raw: NonZeroU32) {
        if kind == GpuObjectKind::Texture {
            renderer.unbind_texture(raw);
        }
        if self.entries.len() >= self.capacity {
            if self.fixed {
                if self.capacity == 0 {
                    renderer.release_object(kind, raw);
                    return;
                }
                log::debug!(
                    "Deferred-delete queue full ({} entries), flushing",
                    self.entries.len()
                );
                self.flush(renderer);
            } else if !self.grow() {
                log::warn!(
                    "Deferred-delete queue cannot grow past {} entries, releasing {:?} {} now",
                    self.capacity,
                    kind,
                    raw
                );
                renderer.release_object(kind, raw);
                return;
            }
        }
        self.entries.push(PendingDeletion { kind, raw });
    }

    fn grow(&mut self) -> bool {
        let target = self.capacity + GROWTH_STRIDE;
        let additional = target - self.entries.len();
        if self.entries.try_reserve_exact(additional).is_err() {
            return false;
        }
        self.capacity = target;
        true
    }

    fn flush(&mut self, renderer: &mut dyn Renderer) {
        renderer.finish();
        for entry in self.entries.drain(..) {
            renderer.release_object(entry.kind, entry.raw);
        }
    }

    /// Releases every queued object.
    ///
    /// Waits for the GPU to go idle first, so this does not belong on a hot
    /// path. With `also_free_buffer`, a growable queue also gives its storage
    /// back; it is reallocated on the next push.
    pub fn free_dead_resources(&mut self, renderer: &mut dyn Renderer, also_free_buffer: bool) {
        let count = self.entries.len();
        self.flush(renderer);
        if also_free_buffer && !self.fixed {
            self.entries = Vec::new();
            self.capacity = 0;
        }
        if count > 0 {
            log::trace!("Released {count} dead GPU object(s)");
        }
    }
}

impl Drop for DeferredDeleteQueue {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            log::warn!(
                "Deferred-delete queue dropped with {} unreleased GPU object(s)",
                self.entries.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingRenderer;
    use sil_core::renderer::{BufferId, TextureId};

    fn raw(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn queue(size: usize, fixed: bool) -> DeferredDeleteQueue {
        DeferredDeleteQueue::new(&DeferredDeleteSettings { size, fixed })
    }

    #[test]
    fn fixed_queue_flushes_before_appending() {
        let mut renderer = RecordingRenderer::default();
        let mut queue = queue(2, true);
        queue.push(&mut renderer, GpuObjectKind::Buffer, raw(1));
        queue.push(&mut renderer, GpuObjectKind::Buffer, raw(2));
        assert!(renderer.released.is_empty());

        queue.push(&mut renderer, GpuObjectKind::Shader, raw(3));
        assert_eq!(
            renderer.released,
            vec![(GpuObjectKind::Buffer, 1), (GpuObjectKind::Buffer, 2)]
        );
        assert_eq!(renderer.finishes, 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.capacity(), 2);
    }

    #[test]
    fn growable_queue_grows_by_stride() {
        let mut renderer = RecordingRenderer::default();
        let mut queue = queue(1, false);
        for n in 1..=3 {
            queue.push(&mut renderer, GpuObjectKind::Program, raw(n));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.capacity(), 1 + GROWTH_STRIDE);
        assert!(renderer.released.is_empty());
    }

    #[test]
    fn textures_are_unbound_when_queued() {
        let mut renderer = RecordingRenderer::default();
        let mut queue = queue(4, false);
        queue.delete(&mut renderer, TextureId::from_raw(raw(7)));
        queue.delete(&mut renderer, BufferId::from_raw(raw(8)));
        assert_eq!(renderer.unbound, vec![7]);
        assert_eq!(
            queue.pending(),
            &[
                PendingDeletion {
                    kind: GpuObjectKind::Texture,
                    raw: raw(7)
                },
                PendingDeletion {
                    kind: GpuObjectKind::Buffer,
                    raw: raw(8)
                },
            ]
        );
    }

    #[test]
    fn free_dead_resources_drains_and_optionally_frees_storage() {
        let mut renderer = RecordingRenderer::default();
        let mut queue = queue(8, false);
        queue.push(&mut renderer, GpuObjectKind::Framebuffer, raw(1));
        queue.free_dead_resources(&mut renderer, false);
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 8);
        assert_eq!(renderer.finishes, 1);

        queue.push(&mut renderer, GpuObjectKind::Renderbuffer, raw(2));
        queue.free_dead_resources(&mut renderer, true);
        assert_eq!(queue.capacity(), 0);
        assert_eq!(renderer.released.len(), 2);

        queue.push(&mut renderer, GpuObjectKind::VertexArray, raw(3));
        assert_eq!(queue.capacity(), GROWTH_STRIDE);
    }

    #[test]
    fn fixed_queue_keeps_its_storage() {
        let mut renderer = RecordingRenderer::default();
        let mut queue = queue(3, true);
        queue.push(&mut renderer, GpuObjectKind::Pipeline, raw(1));
        queue.free_dead_resources(&mut renderer, true);
        assert_eq!(queue.capacity(), 3);
        assert!(queue.is_fixed());
    }

    #[test]
    fn zero_sized_fixed_queue_releases_immediately() {
        let mut renderer = RecordingRenderer::default();
        let mut queue = queue(0, true);
        queue.push(&mut renderer, GpuObjectKind::Buffer, raw(5));
        assert!(queue.is_empty());
        assert_eq!(renderer.released, vec![(GpuObjectKind::Buffer, 5)]);
    }
}
