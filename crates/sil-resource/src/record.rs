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

use crate::cell::ResourceCell;
use crate::context::ManagerId;
use sil_core::{AllocFlags, Decompressor, ResourceId, ResourceKind, ResourceState};
use sil_io::{IoJob, Ticket};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// How a record holds its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkMode {
    /// The record that created the payload.
    Original,
    /// A strong link.
    Strong,
    /// A weak link, registered at `slot` of the cell's back-reference arena.
    Weak { slot: usize },
}

/// Post-processing applied to the bytes a job returns.
pub(crate) enum Finish {
    /// Bytes are the final content.
    Direct,
    /// Bytes are compressed and decoded on the collecting thread.
    Decompress {
        decompressor: Box<dyn Decompressor>,
        size: u64,
    },
}

/// Where an in-progress load stands.
pub(crate) enum Stage {
    /// The I/O table was full at submission time.
    Queued(IoJob),
    /// The job is running or has finished and awaits collection.
    InFlight(Ticket),
}

/// Bookkeeping for a record in the Loading state.
pub(crate) struct PendingLoad {
    pub(crate) name: String,
    pub(crate) stage: Stage,
    pub(crate) finish: Finish,
}

impl fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match &self.stage {
            Stage::Queued(_) => "queued",
            Stage::InFlight(_) => "in flight",
        };
        f.debug_struct("PendingLoad")
            .field("name", &self.name)
            .field("stage", &stage)
            .field("decompress", &matches!(self.finish, Finish::Decompress { .. }))
            .finish()
    }
}

/// One entry of a manager's record table.
#[derive(Debug)]
pub(crate) struct Record {
    pub(crate) cell: Arc<ResourceCell>,
    pub(crate) mode: LinkMode,
    /// The original record, for links; the record itself otherwise.
    pub(crate) target: (ManagerId, ResourceId),
    pub(crate) mark_epoch: u32,
    pub(crate) flags: AllocFlags,
    pub(crate) file_pos: u64,
    pub(crate) pending: Option<PendingLoad>,
    pub(crate) origin: Option<&'static Location<'static>>,
}

impl Record {
    pub(crate) fn new(
        cell: Arc<ResourceCell>,
        mode: LinkMode,
        target: (ManagerId, ResourceId),
        flags: AllocFlags,
        origin: &'static Location<'static>,
    ) -> Self {
        Self {
            cell,
            mode,
            target,
            mark_epoch: 0,
            flags,
            file_pos: 0,
            pending: None,
            origin: cfg!(debug_assertions).then_some(origin),
        }
    }

    /// The kind reported for this ID: links report their link kind.
    pub(crate) fn kind(&self) -> ResourceKind {
        match self.mode {
            LinkMode::Original => self.cell.kind(),
            LinkMode::Strong => ResourceKind::Link,
            LinkMode::Weak { .. } => ResourceKind::WeakLink,
        }
    }

    pub(crate) fn state(&self) -> ResourceState {
        if let Some(pending) = &self.pending {
            if matches!(pending.stage, Stage::Queued(_)) {
                return ResourceState::Reserved;
            }
        }
        self.cell.state()
    }

    /// Returns `true` for a weak link whose target is gone.
    pub(crate) fn is_stale(&self) -> bool {
        matches!(self.mode, LinkMode::Weak { .. }) && self.cell.is_released()
    }
}
