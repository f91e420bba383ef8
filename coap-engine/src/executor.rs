// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Pluggable task execution for an [`crate::Endpoint`].
//!
//! The engine never spawns onto a global runtime: timers, retransmission
//! callbacks, and observer notifications are all posted through an
//! [`Executor`] supplied by the caller. This keeps the crate usable both in a
//! production binary with a worker pool and in tests that want deterministic,
//! synchronous execution.

use futures::future::BoxFuture;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// Runs boxed futures to completion somewhere, at some point.
///
/// Implementors only need to drive the future; they are not expected to
/// return a handle or result, since every caller in this crate communicates
/// results back through channels or shared state captured in the future
/// itself.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Schedules `task` for execution. Implementations may run it inline,
    /// hand it to a worker thread, or queue it; the only contract is that it
    /// eventually runs to completion (or is dropped at shutdown).
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Runs every spawned task to completion immediately, on the calling thread.
///
/// Useful for unit and integration tests where a deterministic, single-threaded
/// schedule is easier to reason about than a real thread pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        futures::executor::block_on(task);
    }
}

/// A small fixed-size pool of worker threads, each running a
/// [`futures::executor::LocalPool`]-style single-threaded executor fed by a
/// shared channel.
///
/// Tasks are distributed round-robin-ish by whichever worker is free to take
/// the next item off the channel; there is no work-stealing and no per-task
/// priority. This matches the needs of a CoAP endpoint, whose tasks are
/// short-lived retransmission timers and handler invocations rather than
/// long-running compute.
pub struct ThreadPoolExecutor {
    sender: mpsc::Sender<BoxFuture<'static, ()>>,
    _workers: Vec<thread::JoinHandle<()>>,
}

impl fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolExecutor")
            .field("workers", &self._workers.len())
            .finish()
    }
}

impl ThreadPoolExecutor {
    /// Starts `worker_count` threads, each pulling tasks off a shared queue
    /// and running them to completion with `futures::executor::block_on`.
    ///
    /// `worker_count` is clamped to at least `1`.
    pub fn new(worker_count: usize) -> Arc<Self> {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = mpsc::channel::<BoxFuture<'static, ()>>();
        let receiver = Arc::new(std::sync::Mutex::new(receiver));

        let workers = (0..worker_count)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("coap-engine-worker-{}", id))
                    .spawn(move || loop {
                        let task = {
                            let receiver = receiver.lock().expect("worker channel poisoned");
                            receiver.recv()
                        };
                        match task {
                            Ok(task) => {
                                if catch_unwind(AssertUnwindSafe(|| {
                                    futures::executor::block_on(task)
                                }))
                                .is_err()
                                {
                                    error!("coap-engine worker {} task panicked", id);
                                }
                            }
                            Err(_) => break,
                        }
                    })
                    .expect("failed to spawn coap-engine worker thread")
            })
            .collect();

        Arc::new(ThreadPoolExecutor {
            sender,
            _workers: workers,
        })
    }
}

impl Executor for ThreadPoolExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        if self.sender.send(task).is_err() {
            error!("coap-engine: dropped task, all worker threads have exited");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::FutureExt;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn inline_executor_runs_synchronously() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        InlineExecutor.spawn(
            async move {
                ran_clone.store(true, Ordering::SeqCst);
            }
            .boxed(),
        );
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn thread_pool_executor_runs_spawned_tasks() {
        let (tx, rx) = mpsc::channel();
        let pool = ThreadPoolExecutor::new(2);
        for i in 0..4 {
            let tx = tx.clone();
            pool.spawn(
                async move {
                    tx.send(i).unwrap();
                }
                .boxed(),
            );
        }
        let mut seen: Vec<i32> = (0..4).map(|_| rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
