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

//! The payload cell shared by a resource and every link to it.

use crate::context::ManagerId;
use sil_core::{
    FileRegion, FontHandle, ResourceCodec, ResourceError, ResourceId, ResourceKind, ResourceState,
    SoundHandle, TextureHandle,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The typed content of a resource.
#[derive(Debug, Clone, Default)]
pub(crate) enum Payload {
    #[default]
    Empty,
    Data(Arc<[u8]>),
    Texture(TextureHandle),
    Font(FontHandle),
    Sound(SoundHandle),
    File(FileRegion),
}

#[derive(Debug, Clone)]
enum Status {
    Loading,
    Ready,
    Failed(ResourceError),
    Released,
}

/// A weak link registered with a cell, kept for diagnostics.
#[derive(Debug, Clone, Copy)]
struct WeakBackref {
    manager: ManagerId,
    id: ResourceId,
}

#[derive(Debug)]
struct CellInner {
    status: Status,
    payload: Payload,
    strong: usize,
    weak: Vec<Option<WeakBackref>>,
    free_weak: Vec<usize>,
}

/// Shared state of one resource payload.
///
/// The original record and all of its links point at the same cell. The cell
/// counts strong holders and keeps an arena of weak back-references; when
/// the strong count reaches zero the cell flips to released under its lock,
/// which is what every weak link observes as staleness, and only then hands
/// the payload back to the codec.
pub(crate) struct ResourceCell {
    kind: ResourceKind,
    codec: Arc<dyn ResourceCodec>,
    inner: Mutex<CellInner>,
}

impl fmt::Debug for ResourceCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCell")
            .field("kind", &self.kind)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl ResourceCell {
    /// A cell whose payload is still being loaded.
    pub(crate) fn loading(kind: ResourceKind, codec: Arc<dyn ResourceCodec>) -> Arc<Self> {
        Self::with_status(kind, codec, Status::Loading, Payload::Empty)
    }

    /// A cell that is immediately usable.
    pub(crate) fn ready(
        kind: ResourceKind,
        codec: Arc<dyn ResourceCodec>,
        payload: Payload,
    ) -> Arc<Self> {
        Self::with_status(kind, codec, Status::Ready, payload)
    }

    fn with_status(
        kind: ResourceKind,
        codec: Arc<dyn ResourceCodec>,
        status: Status,
        payload: Payload,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            codec,
            inner: Mutex::new(CellInner {
                status,
                payload,
                strong: 1,
                weak: Vec::new(),
                free_weak: Vec::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CellInner> {
        self.inner.lock().expect("resource cell lock poisoned")
    }

    /// The kind of the payload.
    pub(crate) fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Lifecycle state as seen through a strong holder.
    pub(crate) fn state(&self) -> ResourceState {
        match self.lock().status {
            Status::Loading => ResourceState::Loading,
            Status::Ready => ResourceState::Ready,
            Status::Failed(_) => ResourceState::Failed,
            Status::Released => ResourceState::Stale,
        }
    }

    /// Returns `true` once the last strong holder has gone.
    pub(crate) fn is_released(&self) -> bool {
        matches!(self.lock().status, Status::Released)
    }

    /// Number of strong holders.
    pub(crate) fn strong_count(&self) -> usize {
        self.lock().strong
    }

    /// Number of live weak links.
    pub(crate) fn weak_count(&self) -> usize {
        self.lock().weak.iter().flatten().count()
    }

    /// Stores the outcome of a load.
    pub(crate) fn complete(&self, result: Result<Payload, ResourceError>) {
        let mut inner = self.lock();
        match result {
            Ok(payload) => {
                inner.payload = payload;
                inner.status = Status::Ready;
            }
            Err(err) => inner.status = Status::Failed(err),
        }
    }

    /// Runs `f` on the payload if it is ready.
    ///
    /// # Errors
    /// [`ResourceError::NotReady`] while loading, the stored error after a
    /// failed load, and [`ResourceError::Stale`] once released.
    pub(crate) fn with_payload<R>(
        &self,
        f: impl FnOnce(&mut Payload) -> Result<R, ResourceError>,
    ) -> Result<R, ResourceError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match &inner.status {
            Status::Loading => Err(ResourceError::NotReady),
            Status::Failed(err) => Err(err.clone()),
            Status::Released => Err(ResourceError::Stale),
            Status::Ready => f(&mut inner.payload),
        }
    }

    /// Adds a strong holder.
    pub(crate) fn add_strong(&self) -> Result<(), ResourceError> {
        let mut inner = self.lock();
        if matches!(inner.status, Status::Released) {
            return Err(ResourceError::Stale);
        }
        inner.strong += 1;
        Ok(())
    }

    /// Registers a weak link, returning its arena slot.
    pub(crate) fn add_weak(
        &self,
        manager: ManagerId,
        id: ResourceId,
    ) -> Result<usize, ResourceError> {
        let mut inner = self.lock();
        if matches!(inner.status, Status::Released) {
            return Err(ResourceError::Stale);
        }
        let backref = Some(WeakBackref { manager, id });
        let slot = match inner.free_weak.pop() {
            Some(slot) => {
                inner.weak[slot] = backref;
                slot
            }
            None => {
                inner.weak.push(backref);
                inner.weak.len() - 1
            }
        };
        Ok(slot)
    }

    /// Unregisters a weak link. A released cell has already dropped its arena.
    pub(crate) fn remove_weak(&self, slot: usize) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if let Some(entry) = inner.weak.get_mut(slot) {
            if entry.take().is_some() {
                inner.free_weak.push(slot);
            }
        }
    }

    /// Drops one strong holder, releasing the payload on the last one.
    ///
    /// Returns `true` if this call released the payload.
    pub(crate) fn release_strong(&self) -> bool {
        let payload = {
            let mut inner = self.lock();
            inner.strong = inner.strong.saturating_sub(1);
            if inner.strong > 0 || matches!(inner.status, Status::Released) {
                return false;
            }
            inner.status = Status::Released;
            for backref in inner.weak.drain(..).flatten() {
                log::debug!(
                    "Weak link {} of manager {} is now stale",
                    backref.id,
                    backref.manager
                );
            }
            inner.free_weak.clear();
            std::mem::take(&mut inner.payload)
        };
        self.release_payload(payload);
        true
    }

    fn release_payload(&self, payload: Payload) {
        match payload {
            Payload::Texture(texture) => self.codec.release_texture(texture),
            Payload::Font(font) => self.codec.release_font(font),
            Payload::Sound(sound) => self.codec.release_sound(sound),
            Payload::Empty | Payload::Data(_) | Payload::File(_) => {}
        }
    }
}
