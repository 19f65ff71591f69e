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

//! The fixed-size pool of streaming decompression workers.

use crate::loader::Request;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often an idle worker checks whether it should stop.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Worker threads decoding compressed entries into preallocated buffers.
#[derive(Debug)]
pub(crate) struct DecompressionPool {
    sender: Sender<Request>,
    stop: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl DecompressionPool {
    /// Starts `num_workers` workers (at least one).
    pub(crate) fn new(num_workers: usize) -> std::io::Result<Self> {
        let num_workers = num_workers.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<Request>();
        let stop = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(num_workers);
        for index in 0..num_workers {
            let receiver = receiver.clone();
            let stop = Arc::clone(&stop);
            let handle = thread::Builder::new()
                .name(format!("sil-decompress-{index}"))
                .spawn(move || worker_loop(index, receiver, stop))?;
            workers.push(handle);
        }
        log::debug!("Started {num_workers} decompression worker(s)");

        Ok(Self {
            sender,
            stop,
            workers,
        })
    }

    /// Number of worker threads.
    pub(crate) fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// A handle for queueing streaming jobs.
    pub(crate) fn sender(&self) -> Sender<Request> {
        self.sender.clone()
    }
}

fn worker_loop(index: usize, receiver: Receiver<Request>, stop: Arc<AtomicBool>) {
    loop {
        match receiver.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(request) => request.execute(),
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::trace!("Decompression worker {index} stopped");
}

impl Drop for DecompressionPool {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("A decompression worker panicked");
            }
        }
    }
}
