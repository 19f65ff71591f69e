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

//! The asynchronous I/O loader.
//!
//! One background thread runs whole-file reads. Streaming decompression jobs
//! go to the decompression worker pool once it has been enabled, and run on the
//! I/O thread otherwise.
//!
//! Every submitted job occupies one slot of a bounded table until its
//! [`Ticket`] is dropped. The table is shared by every resource manager that
//! uses the same loader.

use crate::decompress::DecompressionPool;
use crossbeam_channel::Sender;
use sil_core::config::IoSettings;
use sil_core::{Decompressor, ResourceError};
use std::fmt;
use std::io::Read;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};
use std::thread;

/// A unit of work for the loader.
pub enum IoJob {
    /// Read a byte source to its end.
    Read {
        /// Resource name, for diagnostics.
        name: String,
        /// The source.
        reader: Box<dyn Read + Send>,
        /// Expected length, used to size the buffer up front.
        size_hint: u64,
    },
    /// Stream stored bytes through a decoder, one block at a time.
    Stream {
        /// Resource name, for diagnostics.
        name: String,
        /// The stored (compressed) bytes.
        reader: Box<dyn Read + Send>,
        /// Decoder for the stored bytes.
        decompressor: Box<dyn Decompressor>,
        /// Decoded length; the output buffer is preallocated to it.
        size: u64,
        /// Number of stored bytes read per step.
        block_size: u32,
    },
}

impl fmt::Debug for IoJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoJob::Read {
                name, size_hint, ..
            } => f
                .debug_struct("Read")
                .field("name", name)
                .field("size_hint", size_hint)
                .finish_non_exhaustive(),
            IoJob::Stream {
                name,
                size,
                block_size,
                ..
            } => f
                .debug_struct("Stream")
                .field("name", name)
                .field("size", size)
                .field("block_size", block_size)
                .finish_non_exhaustive(),
        }
    }
}

impl IoJob {
    /// The resource name the job was created for.
    pub fn name(&self) -> &str {
        match self {
            IoJob::Read { name, .. } | IoJob::Stream { name, .. } => name,
        }
    }

    /// Whether the job needs a decompression worker.
    pub fn is_stream(&self) -> bool {
        matches!(self, IoJob::Stream { .. })
    }

    /// Runs the job on the current thread.
    pub fn run(self) -> Result<Vec<u8>, ResourceError> {
        match self {
            IoJob::Read {
                mut reader,
                size_hint,
                ..
            } => {
                let mut out = Vec::new();
                out.try_reserve_exact(buffer_len(size_hint)?)?;
                reader.read_to_end(&mut out)?;
                Ok(out)
            }
            IoJob::Stream {
                mut reader,
                mut decompressor,
                size,
                block_size,
                ..
            } => {
                let mut out = Vec::new();
                out.try_reserve_exact(buffer_len(size)?)?;
                let mut block = vec![0u8; block_size.max(1) as usize];
                loop {
                    let n = reader.read(&mut block)?;
                    if n == 0 {
                        break;
                    }
                    decompressor.feed(&block[..n], &mut out)?;
                }
                decompressor.finish(&mut out)?;
                Ok(out)
            }
        }
    }
}

fn buffer_len(size: u64) -> Result<usize, ResourceError> {
    usize::try_from(size).map_err(|_| ResourceError::OutOfMemory)
}

#[derive(Debug, Default)]
struct TicketSlot {
    finished: bool,
    result: Option<Result<Vec<u8>, ResourceError>>,
}

/// Completion state shared by a ticket and its waiters.
///
/// `finished` stays set after the owner takes the result.
#[derive(Debug, Default)]
struct TicketState {
    slot: Mutex<TicketSlot>,
    done: Condvar,
}

impl TicketState {
    fn lock(&self) -> MutexGuard<'_, TicketSlot> {
        self.slot.lock().expect("ticket lock poisoned")
    }

    fn complete(&self, result: Result<Vec<u8>, ResourceError>) {
        let mut slot = self.lock();
        slot.result = Some(result);
        slot.finished = true;
        self.done.notify_all();
    }

    fn is_complete(&self) -> bool {
        self.lock().finished
    }

    fn wait(&self) -> MutexGuard<'_, TicketSlot> {
        let mut slot = self.lock();
        while !slot.finished {
            slot = self.done.wait(slot).expect("ticket lock poisoned");
        }
        slot
    }
}

/// A job travelling to the I/O thread or a decompression worker.
pub(crate) struct Request {
    job: IoJob,
    state: Arc<TicketState>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request").field("job", &self.job).finish()
    }
}

impl Request {
    pub(crate) fn execute(self) {
        let name = self.job.name().to_owned();
        let result = self.job.run();
        if let Err(err) = &result {
            log::warn!("Background load of '{name}' failed: {err}");
        } else {
            log::trace!("Background load of '{name}' finished");
        }
        self.state.complete(result);
    }
}

#[derive(Debug)]
struct IoTable {
    in_use: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
}

impl IoTable {
    fn try_acquire(self: &Arc<Self>) -> Option<IoSlot> {
        let mut in_use = self.in_use.lock().expect("io table lock poisoned");
        if *in_use >= self.capacity {
            return None;
        }
        *in_use += 1;
        Some(IoSlot {
            table: Arc::clone(self),
        })
    }

    fn wait_for_free(&self) {
        let mut in_use = self.in_use.lock().expect("io table lock poisoned");
        while *in_use >= self.capacity {
            in_use = self.freed.wait(in_use).expect("io table lock poisoned");
        }
    }

    fn in_use(&self) -> usize {
        *self.in_use.lock().expect("io table lock poisoned")
    }
}

#[derive(Debug)]
struct IoSlot {
    table: Arc<IoTable>,
}

impl Drop for IoSlot {
    fn drop(&mut self) {
        let mut in_use = self.table.in_use.lock().expect("io table lock poisoned");
        *in_use -= 1;
        self.table.freed.notify_all();
    }
}

/// The pending result of a submitted job.
///
/// The ticket holds one slot of the loader's table until it is dropped or
/// consumed.
#[derive(Debug)]
pub struct Ticket {
    state: Arc<TicketState>,
    _slot: IoSlot,
}

impl Ticket {
    /// Returns `true` once the job has finished.
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Blocks until the job has finished.
    pub fn wait(&self) {
        drop(self.state.wait());
    }

    /// Returns a handle that can wait for completion without owning the ticket.
    pub fn waiter(&self) -> TicketWaiter {
        TicketWaiter {
            state: Arc::clone(&self.state),
        }
    }

    /// Blocks until the job has finished and returns its result.
    ///
    /// Consuming the ticket frees its table slot.
    pub fn into_result(self) -> Result<Vec<u8>, ResourceError> {
        let result = self.state.wait().result.take();
        result.unwrap_or_else(|| Err(ResourceError::Io("ticket result already collected".into())))
    }
}

/// Waits for a [`Ticket`] owned by someone else.
#[derive(Debug, Clone)]
pub struct TicketWaiter {
    state: Arc<TicketState>,
}

impl TicketWaiter {
    /// Returns `true` once the job has finished.
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Blocks until the job has finished.
    pub fn wait(&self) {
        drop(self.state.wait());
    }
}

/// The background I/O service.
///
/// # Deadlock
/// Slots are only released when the owner of a ticket collects or drops it.
/// A caller blocked in [`AsyncLoader::wait_for_slot`] while every slot is held
/// by tickets that another, idle resource manager never collects will wait
/// forever. This is not detected.
#[derive(Debug)]
pub struct AsyncLoader {
    table: Arc<IoTable>,
    sender: Option<Sender<Request>>,
    thread: Option<thread::JoinHandle<()>>,
    stream_sender: Arc<OnceLock<Sender<Request>>>,
    pool: OnceLock<DecompressionPool>,
}

impl AsyncLoader {
    /// Starts the I/O thread.
    pub fn new(settings: &IoSettings) -> Result<Self, ResourceError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Request>();
        let stream_sender: Arc<OnceLock<Sender<Request>>> = Arc::new(OnceLock::new());
        let worker_streams = Arc::clone(&stream_sender);

        let thread = thread::Builder::new()
            .name("sil-io".into())
            .spawn(move || {
                log::debug!("I/O thread started");
                for request in receiver.iter() {
                    if request.job.is_stream() {
                        if let Some(pool) = worker_streams.get() {
                            if let Err(returned) = pool.send(request) {
                                returned.into_inner().execute();
                            }
                            continue;
                        }
                    }
                    request.execute();
                }
                log::debug!("I/O thread stopped");
            })?;

        Ok(Self {
            table: Arc::new(IoTable {
                in_use: Mutex::new(0),
                freed: Condvar::new(),
                capacity: settings.max_in_flight.max(1),
            }),
            sender: Some(sender),
            thread: Some(thread),
            stream_sender,
            pool: OnceLock::new(),
        })
    }

    /// Starts the decompression pool. Only the first call has an effect:
    /// the number of workers is latched.
    pub fn enable_decompression(&self, num_workers: usize) -> Result<(), ResourceError> {
        if self.pool.get().is_some() {
            return Ok(());
        }
        let pool = DecompressionPool::new(num_workers)?;
        let sender = pool.sender();
        if self.pool.set(pool).is_ok() {
            let _ = self.stream_sender.set(sender);
        }
        Ok(())
    }

    /// Whether streaming jobs are handed to the decompression pool.
    pub fn decompression_enabled(&self) -> bool {
        self.pool.get().is_some()
    }

    /// Number of decompression workers, or `0` if the pool is not running.
    pub fn decompression_workers(&self) -> usize {
        self.pool.get().map_or(0, DecompressionPool::num_workers)
    }

    /// Number of table slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity
    }

    /// Number of slots currently held by tickets.
    pub fn in_flight(&self) -> usize {
        self.table.in_use()
    }

    /// Queues a job without blocking.
    ///
    /// # Errors
    /// Hands the job back when every table slot is in use.
    pub fn try_submit(&self, job: IoJob) -> Result<Ticket, IoJob> {
        let Some(slot) = self.table.try_acquire() else {
            return Err(job);
        };
        let state = Arc::new(TicketState::default());
        let request = Request {
            job,
            state: Arc::clone(&state),
        };
        log::trace!("Submitting {:?}", request.job);
        let sent = match &self.sender {
            Some(sender) => sender.send(request).map_err(|e| e.into_inner()),
            None => Err(request),
        };
        if let Err(request) = sent {
            request
                .state
                .complete(Err(ResourceError::Io("I/O thread has stopped".into())));
        }
        Ok(Ticket { state, _slot: slot })
    }

    /// Blocks until at least one table slot is free.
    ///
    /// See the type-level documentation for the deadlock this can cause.
    pub fn wait_for_slot(&self) {
        self.table.wait_for_free();
    }
}

impl Drop for AsyncLoader {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("The I/O thread panicked");
            }
        }
    }
}
