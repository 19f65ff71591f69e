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

//! The resource manager: record table, marks, barriers, links and lifetime.

use crate::cell::{Payload, ResourceCell};
use crate::context::{ManagerId, ResourceContext};
use crate::record::{LinkMode, Record, Stage};
use sil_core::config::ResourcePoolSettings;
use sil_core::{AllocFlags, ResourceError, ResourceId, ResourceKind, ResourceState};
use sil_io::{AsyncLoader, TicketWaiter};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard};

/// A mark epoch returned by [`ResourceManager::mark`].
pub type Epoch = u32;

#[derive(Debug)]
pub(crate) struct ManagerState {
    pub(crate) records: HashMap<ResourceId, Record>,
    next_id: u32,
    pub(crate) mark_counter: Epoch,
    /// Loading records, partitioned by the epoch they were loaded in.
    pub(crate) loading: BTreeMap<Epoch, BTreeSet<ResourceId>>,
}

/// What a blocking call has to wait for before it can make progress.
pub(crate) enum Blocker {
    Ticket(TicketWaiter),
    Slot,
}

impl Blocker {
    pub(crate) fn block(self, loader: &AsyncLoader) {
        match self {
            Blocker::Ticket(waiter) => waiter.wait(),
            Blocker::Slot => loader.wait_for_slot(),
        }
    }
}

impl ManagerState {
    fn with_capacity(num_records: usize) -> Self {
        Self {
            records: HashMap::with_capacity(num_records),
            next_id: 1,
            mark_counter: 1,
            loading: BTreeMap::new(),
        }
    }

    /// Issues a fresh ID and stores the record built for it.
    pub(crate) fn insert(
        &mut self,
        make: impl FnOnce(ResourceId) -> Record,
    ) -> Result<ResourceId, ResourceError> {
        let id = self.allocate_id()?;
        self.insert_with_id(id, make(id))?;
        Ok(id)
    }

    pub(crate) fn allocate_id(&mut self) -> Result<ResourceId, ResourceError> {
        let raw = self.next_id;
        self.next_id = raw.checked_add(1).ok_or(ResourceError::OutOfMemory)?;
        Ok(ResourceId::from_raw(raw))
    }

    pub(crate) fn insert_with_id(
        &mut self,
        id: ResourceId,
        record: Record,
    ) -> Result<(), ResourceError> {
        self.records.try_reserve(1)?;
        self.records.insert(id, record);
        Ok(())
    }

    pub(crate) fn record(&self, id: ResourceId) -> Result<&Record, ResourceError> {
        self.records.get(&id).ok_or(ResourceError::InvalidId)
    }

    pub(crate) fn record_mut(&mut self, id: ResourceId) -> Result<&mut Record, ResourceError> {
        self.records.get_mut(&id).ok_or(ResourceError::InvalidId)
    }

    pub(crate) fn mark_loading(&mut self, epoch: Epoch, id: ResourceId) {
        self.loading.entry(epoch).or_default().insert(id);
    }

    pub(crate) fn unmark_loading(&mut self, epoch: Epoch, id: ResourceId) {
        if let Some(ids) = self.loading.get_mut(&epoch) {
            ids.remove(&id);
            if ids.is_empty() {
                self.loading.remove(&epoch);
            }
        }
    }

    /// Returns `true` if any record loaded at or before `epoch` is still loading.
    pub(crate) fn loading_through(&self, epoch: Epoch) -> bool {
        self.loading.range(..=epoch).next().is_some()
    }

    /// Every loading ID with its epoch, oldest epoch first.
    pub(crate) fn loading_ids(&self) -> Vec<(Epoch, ResourceId)> {
        self.loading
            .iter()
            .flat_map(|(epoch, ids)| ids.iter().map(move |id| (*epoch, *id)))
            .collect()
    }

    fn waiter_of(&self, id: ResourceId) -> Option<TicketWaiter> {
        match &self.records.get(&id)?.pending.as_ref()?.stage {
            Stage::InFlight(ticket) => Some(ticket.waiter()),
            Stage::Queued(_) => None,
        }
    }

    /// Chooses what to block on to make progress on `targets`.
    ///
    /// A target already in flight is waited on directly. A target still
    /// queued needs a table slot: if this manager has any job in flight,
    /// collecting it frees one, so that job is waited on instead of the table.
    pub(crate) fn blocker(&self, targets: &[ResourceId]) -> Blocker {
        let own = self.loading.values().flatten();
        targets
            .iter()
            .chain(own)
            .find_map(|id| self.waiter_of(*id))
            .map_or(Blocker::Slot, Blocker::Ticket)
    }
}

/// An asynchronous, reference-counted, type-tagged resource cache.
///
/// Every operation locks this manager's record table only; a manager never
/// holds its own lock while taking another manager's, so links between
/// managers cannot deadlock.
///
/// # Example
///
/// ```no_run
/// # use sil_resource::ResourceManager;
/// # fn demo(manager: &ResourceManager) -> Result<(), sil_core::ResourceError> {
/// let a = manager.load_data("levels/a.bin")?;
/// let barrier = manager.mark();
/// let b = manager.load_data("levels/b.bin")?;
/// manager.wait(barrier);
/// let bytes = manager.get_data(a)?;
/// # let _ = (b, bytes);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResourceManager {
    id: ManagerId,
    name: String,
    pub(crate) ctx: ResourceContext,
    state: Mutex<ManagerState>,
}

impl ResourceManager {
    /// Creates an empty manager.
    pub fn new(name: impl Into<String>, ctx: ResourceContext) -> Self {
        Self::with_pool(name, ctx, &ResourcePoolSettings::default())
    }

    /// Creates an empty manager with room for `pool.num_records` records.
    pub fn with_pool(
        name: impl Into<String>,
        ctx: ResourceContext,
        pool: &ResourcePoolSettings,
    ) -> Self {
        let manager = Self {
            id: ManagerId::next(),
            name: name.into(),
            ctx,
            state: Mutex::new(ManagerState::with_capacity(pool.num_records)),
        };
        log::debug!(
            "Created resource manager {} '{}'",
            manager.id,
            manager.name
        );
        manager
    }

    /// This manager's identity.
    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// The name given at creation, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared services this manager loads through.
    pub fn context(&self) -> &ResourceContext {
        &self.ctx
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().expect("resource manager lock poisoned")
    }

    /// Stores a ready payload under a fresh ID.
    ///
    /// If no ID can be issued the payload is released immediately.
    pub(crate) fn insert_ready(
        &self,
        kind: ResourceKind,
        payload: Payload,
        flags: AllocFlags,
        origin: &'static Location<'static>,
    ) -> Result<ResourceId, ResourceError> {
        let cell = ResourceCell::ready(kind, self.ctx.codec().clone(), payload);
        let inserted = self.lock().insert(|id| {
            Record::new(
                cell.clone(),
                LinkMode::Original,
                (self.id, id),
                flags,
                origin,
            )
        });
        if inserted.is_err() {
            cell.release_strong();
        }
        inserted
    }

    /// Returns the current epoch and starts a new one.
    ///
    /// Loads issued before this call carry an epoch no greater than the one
    /// returned; loads issued after it carry a greater one.
    pub fn mark(&self) -> Epoch {
        let mut state = self.lock();
        let epoch = state.mark_counter;
        state.mark_counter = epoch.wrapping_add(1).max(1);
        epoch
    }

    /// Returns `true` iff no load issued at or before `epoch` is still loading.
    ///
    /// Never blocks. Finished loads are collected (and decoded) on the calling
    /// thread.
    pub fn sync(&self, epoch: Epoch) -> bool {
        let mut state = self.lock();
        self.poll_loads(&mut state);
        !state.loading_through(epoch)
    }

    /// Blocks until [`sync(epoch)`](Self::sync) would return `true`.
    ///
    /// When the shared I/O table is saturated by loads of another manager
    /// that are never collected, this blocks forever.
    pub fn wait(&self, epoch: Epoch) {
        loop {
            let blocker = {
                let mut state = self.lock();
                self.poll_loads(&mut state);
                if !state.loading_through(epoch) {
                    return;
                }
                let targets: Vec<ResourceId> = state
                    .loading
                    .range(..=epoch)
                    .flat_map(|(_, ids)| ids.iter().copied())
                    .collect();
                state.blocker(&targets)
            };
            blocker.block(self.ctx.loader());
        }
    }

    /// Drops one hold on `id`.
    ///
    /// Freeing the original or a strong link releases the payload once the
    /// last strong holder is gone; freeing a weak link only unregisters it.
    /// Freeing [`ResourceId::NULL`] does nothing. Freeing a record that is
    /// still loading blocks until the load finishes.
    pub fn free(&self, id: ResourceId) -> Result<(), ResourceError> {
        if id.is_null() {
            return Ok(());
        }
        loop {
            let blocker = {
                let mut state = self.lock();
                if state.record(id)?.pending.is_some() {
                    self.poll_loads(&mut state);
                }
                if state.record(id)?.pending.is_none() {
                    let record = state.records.remove(&id).ok_or(ResourceError::InvalidId)?;
                    drop(state);
                    self.release_record(id, record);
                    return Ok(());
                }
                state.blocker(&[id])
            };
            blocker.block(self.ctx.loader());
        }
    }

    fn release_record(&self, id: ResourceId, record: Record) {
        match record.mode {
            LinkMode::Original | LinkMode::Strong => {
                if record.cell.release_strong() {
                    log::trace!("Released payload of {id} in manager {}", self.id);
                }
            }
            LinkMode::Weak { slot } => record.cell.remove_weak(slot),
        }
    }

    /// Frees every record, first waiting for every in-flight load.
    pub fn free_all(&self) {
        self.wait(Epoch::MAX);
        let records = {
            let mut state = self.lock();
            state.loading.clear();
            std::mem::take(&mut state.records)
        };
        if !records.is_empty() {
            log::debug!(
                "Freeing {} record(s) of manager {}",
                records.len(),
                self.id
            );
        }
        // Weak links first, so releasing a payload finds no live back-reference.
        let (weak, strong): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|(_, r)| matches!(r.mode, LinkMode::Weak { .. }));
        for (id, record) in weak.into_iter().chain(strong) {
            self.release_record(id, record);
        }
    }

    /// Looks up `id` and hands its cell to `f` under this manager's lock.
    fn share(
        &self,
        id: ResourceId,
        f: impl FnOnce(&ResourceCell) -> Result<(), ResourceError>,
    ) -> Result<(Arc<ResourceCell>, (ManagerId, ResourceId)), ResourceError> {
        if id.is_null() {
            return Err(ResourceError::InvalidId);
        }
        let state = self.lock();
        let record = state.record(id)?;
        if record.is_stale() {
            return Err(ResourceError::Stale);
        }
        f(&record.cell)?;
        Ok((record.cell.clone(), record.target))
    }

    /// Creates a strong link to `other_id` of `other` (which may be `self`).
    ///
    /// Linking to a link targets the original payload.
    #[track_caller]
    pub fn link(
        &self,
        other: &ResourceManager,
        other_id: ResourceId,
    ) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        let (cell, target) = other.share(other_id, ResourceCell::add_strong)?;
        let inserted = self.lock().insert(|_| {
            Record::new(
                cell.clone(),
                LinkMode::Strong,
                target,
                AllocFlags::NONE,
                origin,
            )
        });
        match inserted {
            Ok(id) => {
                log::trace!("Linked {id} to {} of manager {}", target.1, target.0);
                Ok(id)
            }
            Err(err) => {
                cell.release_strong();
                Err(err)
            }
        }
    }

    /// Creates a weak link to `other_id` of `other` (which may be `self`).
    ///
    /// The link does not keep the payload alive; once the target's last strong
    /// holder is freed, the link is stale.
    #[track_caller]
    pub fn link_weak(
        &self,
        other: &ResourceManager,
        other_id: ResourceId,
    ) -> Result<ResourceId, ResourceError> {
        let origin = Location::caller();
        let (cell, target) = other.share(other_id, |_| Ok(()))?;
        let mut state = self.lock();
        let id = state.allocate_id()?;
        let slot = cell.add_weak(self.id, id)?;
        let record = Record::new(
            cell.clone(),
            LinkMode::Weak { slot },
            target,
            AllocFlags::NONE,
            origin,
        );
        if let Err(err) = state.insert_with_id(id, record) {
            cell.remove_weak(slot);
            return Err(err);
        }
        log::trace!(
            "Weakly linked {id} to {} of manager {}",
            target.1,
            target.0
        );
        Ok(id)
    }

    /// Returns `true` iff `id` is a weak link whose target is gone.
    pub fn is_stale(&self, id: ResourceId) -> bool {
        self.lock()
            .records
            .get(&id)
            .is_some_and(Record::is_stale)
    }

    /// Lifecycle state of `id`.
    pub fn state(&self, id: ResourceId) -> Result<ResourceState, ResourceError> {
        let state = self.lock();
        let record = state.record(id)?;
        if record.is_stale() {
            return Ok(ResourceState::Stale);
        }
        Ok(record.state())
    }

    /// Kind of `id`. Links report [`ResourceKind::Link`] or
    /// [`ResourceKind::WeakLink`].
    pub fn kind(&self, id: ResourceId) -> Result<ResourceKind, ResourceError> {
        Ok(self.lock().record(id)?.kind())
    }

    /// Number of strong holders of the payload behind `id`.
    pub fn refcount(&self, id: ResourceId) -> Result<usize, ResourceError> {
        Ok(self.lock().record(id)?.cell.strong_count())
    }

    /// Number of live weak links to the payload behind `id`.
    pub fn weak_count(&self, id: ResourceId) -> Result<usize, ResourceError> {
        Ok(self.lock().record(id)?.cell.weak_count())
    }

    /// The manager and ID of the record that created the payload behind `id`.
    pub fn link_target(&self, id: ResourceId) -> Result<(ManagerId, ResourceId), ResourceError> {
        Ok(self.lock().record(id)?.target)
    }

    /// Allocation hints recorded for `id`.
    pub fn alloc_flags(&self, id: ResourceId) -> Result<AllocFlags, ResourceError> {
        Ok(self.lock().record(id)?.flags)
    }

    /// Epoch in which `id` was loaded, or 0 if it was never loaded.
    pub fn mark_epoch(&self, id: ResourceId) -> Result<Epoch, ResourceError> {
        Ok(self.lock().record(id)?.mark_epoch)
    }

    /// Source location of the call that created `id`. Always `None` in
    /// release builds.
    pub fn origin(&self, id: ResourceId) -> Option<&'static Location<'static>> {
        self.lock().records.get(&id)?.origin
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Returns `true` if the manager holds no records.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.free_all();
        log::debug!("Destroyed resource manager {} '{}'", self.id, self.name);
    }
}
