// src/scheduler/rescan.rs

//! Background rescan thread.
//!
//! With [`RescanMode::Background`](crate::types::RescanMode::Background) a
//! dedicated thread runs a scheduling pass every `rescan_interval`, and
//! earlier whenever a pass request lands while another pass holds the lock.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::{Result, TaskweaveError};
use crate::scheduler::Scheduler;
use crate::sync::SyncEvent;

#[derive(Default)]
pub(crate) struct Rescanner {
    wake: SyncEvent,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Rescanner {
    pub fn start(&self, scheduler: Scheduler, interval: Duration, name: String) -> Result<()> {
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                debug!(?interval, "background rescan started");
                while !scheduler.is_exiting() {
                    scheduler.scheduler_slice();
                    let Some(rescanner) = scheduler.rescanner() else {
                        break;
                    };
                    rescanner.wake.wait_timeout(interval);
                }
                debug!("background rescan stopped");
            })
            .map_err(|e| TaskweaveError::ThreadSpawn(format!("{name}: {e}")))?;
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Nudge the thread into an early pass.
    pub fn wake(&self) {
        self.wake.trigger();
    }

    /// Wake the thread and wait for it. The scheduler must already be
    /// marked as exiting.
    pub fn stop(&self) {
        self.wake.trigger();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("background rescan thread terminated abnormally");
            }
        }
    }
}
