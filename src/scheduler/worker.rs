// src/scheduler/worker.rs

//! Worker threads.
//!
//! A worker sleeps on its own auto-reset event until the scheduler assigns it
//! a task. It then runs that task and keeps draining the ready queue; when
//! the queue is empty it registers itself as idle, asks for a scheduling
//! pass, and goes back to sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::{Result, TaskweaveError};
use crate::scheduler::Scheduler;
use crate::sync::SyncEvent;
use crate::task::TaskRef;

pub(crate) struct WorkerThread {
    index: usize,
    slot: Mutex<Option<TaskRef>>,
    wake: SyncEvent,
    force_exit: AtomicBool,
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: Mutex<Option<ThreadId>>,
}

impl WorkerThread {
    pub fn spawn(index: usize, scheduler: Scheduler, prefix: &str) -> Result<Arc<Self>> {
        let worker = Arc::new(Self {
            index,
            slot: Mutex::new(None),
            wake: SyncEvent::auto_reset(),
            force_exit: AtomicBool::new(false),
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
            thread_id: Mutex::new(None),
        });

        let name = format!("{prefix}-{index}");
        let runner = Arc::clone(&worker);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || runner.run(&scheduler))
            .map_err(|e| TaskweaveError::ThreadSpawn(format!("{name}: {e}")))?;

        *worker.thread_id.lock() = Some(handle.thread().id());
        *worker.handle.lock() = Some(handle);
        Ok(worker)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Hand `task` to this worker and wake it.
    ///
    /// Only called for a worker that was just taken off the idle queue, so
    /// the slot is always empty here.
    pub fn set_task(&self, task: TaskRef) {
        let previous = self.slot.lock().replace(task);
        debug_assert!(previous.is_none(), "worker {} was handed two tasks", self.index);
        self.wake.trigger();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(SeqCst)
    }

    pub fn is_current_thread(&self) -> bool {
        *self.thread_id.lock() == Some(thread::current().id())
    }

    /// Ask the loop to exit at its next check.
    pub fn prepare_quit(&self) {
        self.force_exit.store(true, SeqCst);
        self.wake.trigger();
    }

    /// Wait for the thread to finish. A worker never joins itself.
    pub fn join(&self) {
        if self.is_current_thread() {
            debug!(worker = self.index, "not joining the current worker thread");
            return;
        }
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(worker = self.index, "worker thread terminated abnormally");
            }
        }
    }

    fn should_exit(&self) -> bool {
        self.force_exit.load(SeqCst)
    }

    fn run(self: &Arc<Self>, scheduler: &Scheduler) {
        self.running.store(true, SeqCst);
        debug!(worker = self.index, "worker started");

        loop {
            self.wake.wait();
            if self.should_exit() {
                break;
            }

            let mut current = self.slot.lock().take();
            if current.is_none() {
                // Woken without work: we are still on the idle queue.
                continue;
            }

            while let Some(task) = current {
                task.trigger(scheduler);
                current = if self.should_exit() {
                    None
                } else {
                    scheduler.next_ready_task()
                };
            }
            if self.should_exit() {
                break;
            }

            scheduler.add_idle_worker(Arc::clone(self));
            scheduler.scheduler_slice();
        }

        self.running.store(false, SeqCst);
        debug!(worker = self.index, "worker stopped");
    }
}
