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

//! Asynchronous loads: job construction, submission, collection and decode.

use crate::cell::{Payload, ResourceCell};
use crate::manager::{ManagerState, ResourceManager};
use crate::record::{Finish, LinkMode, PendingLoad, Record, Stage};
use sil_core::{AllocFlags, ResourceCodec, ResourceError, ResourceId, ResourceKind};
use sil_io::{IoJob, Resolved};
use std::panic::Location;

impl Finish {
    fn apply(self, bytes: Vec<u8>) -> Result<Vec<u8>, ResourceError> {
        match self {
            Finish::Direct => Ok(bytes),
            Finish::Decompress {
                mut decompressor,
                size,
            } => {
                let size = usize::try_from(size).map_err(|_| ResourceError::OutOfMemory)?;
                let mut out = Vec::new();
                out.try_reserve_exact(size)?;
                decompressor.feed(&bytes, &mut out)?;
                decompressor.finish(&mut out)?;
                Ok(out)
            }
        }
    }
}

fn decode(
    codec: &dyn ResourceCodec,
    kind: ResourceKind,
    name: &str,
    bytes: Vec<u8>,
    flags: AllocFlags,
) -> Result<Payload, ResourceError> {
    match kind {
        ResourceKind::Data => Ok(Payload::Data(bytes.into())),
        ResourceKind::Texture => codec
            .decode_texture(name, &bytes, flags)
            .map(Payload::Texture),
        ResourceKind::BitmapFont => codec.decode_bitmap_font(name, &bytes).map(Payload::Font),
        ResourceKind::FreetypeFont => codec
            .decode_freetype_font(name, &bytes)
            .map(Payload::Font),
        ResourceKind::Sound => codec.decode_sound(name, &bytes).map(Payload::Sound),
        found => Err(ResourceError::WrongKind {
            expected: ResourceKind::Data,
            found,
        }),
    }
}

impl ResourceManager {
    /// Starts loading `name` as a resource of `kind`.
    ///
    /// Returns immediately with an ID in the Loading state. The content becomes
    /// available once a [`sync`](Self::sync) or [`wait`](Self::wait) covering
    /// the current epoch has collected it. Decode failures do not surface
    /// here; the record ends up Failed and access reports the decode error.
    ///
    /// # Errors
    /// [`ResourceError::WrongKind`] for kinds that cannot be loaded from a
    /// file, [`ResourceError::NotFound`] or [`ResourceError::Disabled`] when
    /// the name does not resolve, and [`ResourceError::OutOfMemory`] when no
    /// record can be allocated.
    #[track_caller]
    pub fn load(
        &self,
        kind: ResourceKind,
        name: &str,
        flags: AllocFlags,
    ) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        if !kind.is_loadable() {
            return Err(ResourceError::WrongKind {
                expected: ResourceKind::Data,
                found: kind,
            });
        }
        let (job, finish) = self.prepare_job(name)?;
        let cell = ResourceCell::loading(kind, self.ctx.codec().clone());

        let mut state = self.lock();
        let epoch = state.mark_counter;
        let id = state.insert(|id| {
            let mut record = Record::new(cell, LinkMode::Original, (self.id(), id), flags, origin);
            record.mark_epoch = epoch;
            record
        })?;
        let stage = match self.ctx.loader().try_submit(job) {
            Ok(ticket) => Stage::InFlight(ticket),
            Err(job) => {
                log::debug!("I/O table full, queueing {id} '{name}'");
                Stage::Queued(job)
            }
        };
        state.record_mut(id)?.pending = Some(PendingLoad {
            name: name.to_owned(),
            stage,
            finish,
        });
        state.mark_loading(epoch, id);
        log::trace!("Loading {id} '{name}' in epoch {epoch}");
        Ok(id)
    }

    /// Loads raw bytes.
    #[track_caller]
    pub fn load_data(&self, name: &str) -> Result<ResourceId, ResourceError> {
        self.load(ResourceKind::Data, name, AllocFlags::NONE)
    }

    /// Loads and decodes a texture.
    #[track_caller]
    pub fn load_texture(&self, name: &str, flags: AllocFlags) -> Result<ResourceId, ResourceError> {
        self.load(ResourceKind::Texture, name, flags)
    }

    /// Loads and decodes a bitmap font.
    #[track_caller]
    pub fn load_bitmap_font(&self, name: &str) -> Result<ResourceId, ResourceError> {
        self.load(ResourceKind::BitmapFont, name, AllocFlags::NONE)
    }

    /// Loads and decodes a scalable font.
    #[track_caller]
    pub fn load_freetype_font(&self, name: &str) -> Result<ResourceId, ResourceError> {
        self.load(ResourceKind::FreetypeFont, name, AllocFlags::NONE)
    }

    /// Loads and decodes a fully resident sound.
    #[track_caller]
    pub fn load_sound(&self, name: &str) -> Result<ResourceId, ResourceError> {
        self.load(ResourceKind::Sound, name, AllocFlags::NONE)
    }

    /// Builds the I/O job for `name` and what to do with its output.
    ///
    /// Compressed package entries at or above the decompression threshold are
    /// decoded block by block on the worker pool while being read, provided
    /// background decompression is on; smaller ones are read raw and decoded
    /// by whichever thread collects them.
    fn prepare_job(&self, name: &str) -> Result<(IoJob, Finish), ResourceError> {
        let vfs = self.ctx.vfs();
        let not_found = || ResourceError::NotFound(name.to_owned());
        if let Resolved::Package { module, name: entry } = vfs.resolve(name)? {
            if !module.exists(entry) {
                return Err(not_found());
            }
            if let Some((stored, size)) = module.compressed_extent(entry) {
                let settings = self.ctx.decompression();
                let reader = module.open_raw(entry)?;
                let decompressor = module.decompressor(entry)?;
                let stream = settings.enabled
                    && self.ctx.loader().decompression_enabled()
                    && stored >= settings.effective_threshold();
                let job = if stream {
                    let job = IoJob::Stream {
                        name: name.to_owned(),
                        reader,
                        decompressor,
                        size,
                        block_size: settings.block_size,
                    };
                    (job, Finish::Direct)
                } else {
                    let job = IoJob::Read {
                        name: name.to_owned(),
                        reader,
                        size_hint: stored,
                    };
                    (job, Finish::Decompress { decompressor, size })
                };
                return Ok(job);
            }
        }
        let size = vfs.size(name).ok_or_else(not_found)?;
        let reader = vfs.open_for_read(name)?;
        let job = IoJob::Read {
            name: name.to_owned(),
            reader,
            size_hint: size,
        };
        Ok((job, Finish::Direct))
    }

    /// Advances every pending load without blocking.
    ///
    /// Queued jobs are submitted if the table has room; finished ones are
    /// collected, decompressed if needed and decoded on the calling thread.
    pub(crate) fn poll_loads(&self, state: &mut ManagerState) {
        for (epoch, id) in state.loading_ids() {
            let done = match state.records.get_mut(&id) {
                Some(record) => self.advance(id, record),
                None => true,
            };
            if done {
                state.unmark_loading(epoch, id);
            }
        }
    }

    /// Returns `true` once the record has left the Loading state.
    fn advance(&self, id: ResourceId, record: &mut Record) -> bool {
        let Some(mut pending) = record.pending.take() else {
            return true;
        };
        match pending.stage {
            Stage::Queued(job) => {
                pending.stage = match self.ctx.loader().try_submit(job) {
                    Ok(ticket) => {
                        log::trace!("Submitted queued load {id} '{}'", pending.name);
                        Stage::InFlight(ticket)
                    }
                    Err(job) => Stage::Queued(job),
                };
                record.pending = Some(pending);
                false
            }
            Stage::InFlight(ticket) if ticket.is_complete() => {
                let PendingLoad { name, finish, .. } = pending;
                let result = ticket
                    .into_result()
                    .and_then(|bytes| finish.apply(bytes))
                    .and_then(|bytes| {
                        decode(
                            self.ctx.codec().as_ref(),
                            record.cell.kind(),
                            &name,
                            bytes,
                            record.flags,
                        )
                    });
                match &result {
                    Ok(_) => log::debug!("Loaded {id} '{name}'"),
                    Err(err) => log::warn!("Failed to load {id} '{name}': {err}"),
                }
                record.cell.complete(result);
                true
            }
            Stage::InFlight(ticket) => {
                pending.stage = Stage::InFlight(ticket);
                record.pending = Some(pending);
                false
            }
        }
    }
}
