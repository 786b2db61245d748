#![allow(dead_code)]

pub use taskweave_test_utils::builders;
pub use taskweave_test_utils::timeline::{Mark, Timeline};
pub use taskweave_test_utils::{init_tracing, wait_until};

use std::time::Duration;

use taskweave::{SchedulerConfig, TaskRef, TaskScheduler};

/// Generous upper bound for anything a test waits on.
pub const TIMEOUT: Duration = Duration::from_secs(10);

pub fn scheduler(threads: usize) -> TaskScheduler {
    init_tracing();
    TaskScheduler::new(
        SchedulerConfig::default()
            .num_threads(threads)
            .thread_name_prefix("test-worker"),
    )
    .expect("scheduler should start")
}

pub fn sync_all(tasks: &[&TaskRef]) {
    for task in tasks {
        assert!(
            task.sync_timeout(TIMEOUT),
            "task {:?} did not complete in time: {task:?}",
            task.name()
        );
    }
}
