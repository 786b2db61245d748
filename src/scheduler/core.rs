// src/scheduler/core.rs

//! The scheduler handle and its owner.
//!
//! [`Scheduler`] is a cheap, cloneable handle shared by callers, workers and
//! task bodies. [`TaskScheduler`] owns the worker threads and shuts them down
//! when dropped.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering::SeqCst, fence};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::scheduler::config::SchedulerConfig;
use crate::scheduler::rescan::Rescanner;
use crate::scheduler::stats::{SchedulerStats, StatsCounters};
use crate::scheduler::table::ActiveTable;
use crate::scheduler::worker::WorkerThread;
use crate::sync::{LockFreeQueue, SpinLockNoWait};
use crate::task::TaskRef;
use crate::types::RescanMode;

/// Capacity levels reported in logs as the outstanding count moves.
const LEVEL_NORMAL: u8 = 0;
const LEVEL_HALF_FULL: u8 = 1;
const LEVEL_FULL: u8 = 2;

pub(crate) struct Shared {
    pub(crate) config: SchedulerConfig,
    pub(crate) num_threads: usize,
    pub(crate) workers: Mutex<Vec<Arc<WorkerThread>>>,
    pub(crate) idle: LockFreeQueue<Arc<WorkerThread>>,
    /// Tasks waiting for the next pass to look at them.
    pub(crate) pending: LockFreeQueue<TaskRef>,
    /// Tasks that may run now but found no idle worker.
    pub(crate) ready: LockFreeQueue<TaskRef>,
    pub(crate) table: SpinLockNoWait<ActiveTable>,
    pub(crate) slice_requested: AtomicBool,
    pub(crate) exiting: AtomicBool,
    capacity_level: AtomicU8,
    pub(crate) rescan: Option<Rescanner>,
    pub(crate) stats: StatsCounters,
}

/// Handle to a running scheduler.
///
/// Every operation is safe to call from any thread, including from inside a
/// task body. After [`prepare_quit`](Scheduler::prepare_quit) every
/// operation is a silent no-op.
#[derive(Clone)]
pub struct Scheduler {
    pub(crate) shared: Arc<Shared>,
}

impl Scheduler {
    /// Submit `task`, and recursively every dependency not yet submitted.
    ///
    /// A task with nothing to wait on that nobody depends on goes straight to
    /// an idle worker (or the ready queue). Everything else is registered
    /// through the next scheduling pass.
    pub fn add_task(&self, task: TaskRef) {
        self.submit(task, false);
    }

    pub(crate) fn submit(&self, task: TaskRef, as_dependency: bool) {
        if self.is_exiting() {
            debug!(task = task.id(), "add_task after shutdown ignored");
            return;
        }
        if !task.flags.try_submit() {
            // Tasks pulled in as somebody's dependency may also be submitted
            // explicitly; anything else is a double submission.
            if !as_dependency && !task.is_dependency() {
                debug_assert!(false, "task {} submitted twice", task.id());
                warn!(task = task.id(), "task submitted twice; ignoring");
            }
            return;
        }
        StatsCounters::bump(&self.shared.stats.submitted);

        let deps = task.dependencies();
        for dep in &deps {
            debug_assert!(dep.id() != task.id(), "task {} depends on itself", task.id());
            dep.flags.set_dependency(true);
            if !dep.is_submitted() {
                self.submit(Arc::clone(dep), true);
            }
        }

        if deps.is_empty() && !task.is_dependency() {
            self.schedule_task(task);
        } else {
            self.add_pending_task(task);
            self.scheduler_slice();
        }
        self.report_capacity();
    }

    /// Mark `task` scheduled and hand it to an idle worker, or park it on the
    /// ready queue if every worker is busy.
    pub(crate) fn schedule_task(&self, task: TaskRef) {
        if self.is_exiting() {
            return;
        }
        task.flags.set_scheduled(true);
        match self.shared.idle.deq() {
            Some(worker) => {
                StatsCounters::bump(&self.shared.stats.dispatched_direct);
                worker.set_task(task);
            }
            None => {
                self.add_ready_task(task);
                // A worker may have gone idle between our look at the idle
                // queue and the enqueue above.
                self.balance();
            }
        }
    }

    pub(crate) fn add_ready_task(&self, task: TaskRef) {
        StatsCounters::bump(&self.shared.stats.ready_enqueued);
        self.shared.ready.enq(task);
    }

    pub(crate) fn next_ready_task(&self) -> Option<TaskRef> {
        if self.is_exiting() {
            return None;
        }
        self.shared.ready.deq()
    }

    pub(crate) fn add_idle_worker(&self, worker: Arc<WorkerThread>) {
        if self.is_exiting() {
            return;
        }
        self.shared.idle.enq(worker);
        self.balance();
    }

    pub(crate) fn add_pending_task(&self, task: TaskRef) {
        if self.is_exiting() {
            return;
        }
        self.shared.pending.enq(task);
    }

    pub(crate) fn rescanner(&self) -> Option<&Rescanner> {
        self.shared.rescan.as_ref()
    }

    pub(crate) fn record_completion(&self) {
        StatsCounters::bump(&self.shared.stats.completed);
    }

    pub(crate) fn record_panic(&self) {
        StatsCounters::bump(&self.shared.stats.panics);
    }

    /// Stop the scheduler.
    ///
    /// Workers finish the task they are running and exit; queued tasks are
    /// dropped without running. Idempotent. When called from a worker thread
    /// that worker is signalled but not joined.
    pub fn prepare_quit(&self) {
        if self.shared.exiting.swap(true, SeqCst) {
            return;
        }
        info!("task scheduler shutting down");

        if let Some(rescan) = &self.shared.rescan {
            rescan.stop();
        }

        // Cloned so the lock is not held while joining.
        let workers = self.shared.workers.lock().clone();
        for worker in &workers {
            worker.prepare_quit();
        }
        for worker in &workers {
            worker.join();
        }

        self.shared.idle.clear();
        self.shared.pending.clear();
        self.shared.ready.clear();
        // Pairs with the fence in `scheduler_slice`: if the table is busy, the
        // pass holding it sees `exiting` and clears it on the way out.
        fence(SeqCst);
        match self.shared.table.try_lock() {
            Some(mut table) => table.clear(),
            None => debug!("active table busy during shutdown; the running pass clears it"),
        }
        debug!(workers = workers.len(), "task scheduler stopped");
    }

    pub fn is_exiting(&self) -> bool {
        self.shared.exiting.load(SeqCst)
    }

    /// Tasks waiting in the pending and ready queues.
    pub fn num_tasks(&self) -> usize {
        self.shared.pending.len() + self.shared.ready.len()
    }

    pub fn is_full(&self) -> bool {
        self.num_tasks() > self.shared.config.max_tasks
    }

    pub fn is_half_full(&self) -> bool {
        self.num_tasks() > self.shared.config.max_tasks / 2
    }

    pub fn num_threads(&self) -> usize {
        self.shared.num_threads
    }

    /// Workers currently parked on the idle queue.
    pub fn idle_workers(&self) -> usize {
        self.shared.idle.len()
    }

    /// Worker threads whose loop is still alive.
    pub fn running_workers(&self) -> usize {
        self.shared
            .workers
            .lock()
            .iter()
            .filter(|w| w.is_running())
            .count()
    }

    /// Tasks currently registered in the active table, if no pass is running.
    pub fn active_tasks(&self) -> Option<usize> {
        self.shared.table.try_lock().map(|table| table.len())
    }

    pub fn stats(&self) -> SchedulerStats {
        self.shared.stats.snapshot()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    fn report_capacity(&self) {
        let level = if self.is_full() {
            LEVEL_FULL
        } else if self.is_half_full() {
            LEVEL_HALF_FULL
        } else {
            LEVEL_NORMAL
        };
        let previous = self.shared.capacity_level.swap(level, SeqCst);
        if level <= previous {
            return;
        }
        let outstanding = self.num_tasks();
        let max = self.shared.config.max_tasks;
        if level == LEVEL_FULL {
            error!(outstanding, max, "task scheduler is full");
        } else {
            warn!(outstanding, max, "task scheduler is half full");
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("num_threads", &self.num_threads())
            .field("num_tasks", &self.num_tasks())
            .field("idle_workers", &self.idle_workers())
            .field("exiting", &self.is_exiting())
            .finish()
    }
}

/// Owner of a scheduler and its worker threads.
///
/// Dereferences to [`Scheduler`]. Dropping it calls
/// [`prepare_quit`](Scheduler::prepare_quit).
pub struct TaskScheduler {
    scheduler: Scheduler,
}

impl TaskScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let num_threads = config.effective_threads();
        let rescan = (config.rescan == RescanMode::Background).then(Rescanner::default);

        let shared = Arc::new(Shared {
            num_threads,
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            idle: LockFreeQueue::new(),
            pending: LockFreeQueue::new(),
            ready: LockFreeQueue::new(),
            table: SpinLockNoWait::new(ActiveTable::new(config.table_size)),
            slice_requested: AtomicBool::new(false),
            exiting: AtomicBool::new(false),
            capacity_level: AtomicU8::new(LEVEL_NORMAL),
            rescan,
            stats: StatsCounters::default(),
            config,
        });
        let owner = TaskScheduler {
            scheduler: Scheduler { shared },
        };

        // On error `owner` is dropped, which stops whatever already started.
        owner.start_threads()?;
        info!(
            num_threads,
            rescan = ?owner.config().rescan,
            "task scheduler initialized"
        );
        Ok(owner)
    }

    /// Scheduler with `num_threads` workers and default settings otherwise.
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        Self::new(SchedulerConfig::default().num_threads(num_threads))
    }

    pub fn handle(&self) -> Scheduler {
        self.scheduler.clone()
    }

    fn start_threads(&self) -> Result<()> {
        let shared = &self.scheduler.shared;
        let prefix = shared.config.thread_name_prefix.clone();

        for index in 0..shared.num_threads {
            let worker = WorkerThread::spawn(index, self.scheduler.clone(), &prefix)?;
            shared.workers.lock().push(Arc::clone(&worker));
            self.scheduler.add_idle_worker(worker);
        }

        if let Some(rescan) = &shared.rescan {
            rescan.start(
                self.scheduler.clone(),
                shared.config.rescan_interval,
                format!("{prefix}-rescan"),
            )?;
        }
        Ok(())
    }
}

impl Deref for TaskScheduler {
    type Target = Scheduler;

    fn deref(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.scheduler.prepare_quit();
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.scheduler, f)
    }
}
