// tests/concurrent_submit.rs

mod common;
use crate::common::{scheduler, Mark, Timeline, TIMEOUT};

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use taskweave::{Task, TaskRef};

const SUBMITTERS: usize = 6;
const CHAIN_LEN: usize = 40;

fn link(t: usize, i: usize) -> String {
    format!("c{t}-{i}")
}

#[test]
fn chains_sharing_a_dependency_submitted_from_many_threads() {
    for round in 0..10 {
        let sched = scheduler(4);
        let tl = Timeline::new();
        let shared = Task::builder(tl.job("shared", Duration::from_millis(1)))
            .wait_handle()
            .build();
        let barrier = Arc::new(Barrier::new(SUBMITTERS));

        let submitters: Vec<_> = (0..SUBMITTERS)
            .map(|t| {
                let handle = sched.handle();
                let tl = tl.clone();
                let shared = Arc::clone(&shared);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut chain: Vec<TaskRef> = Vec::with_capacity(CHAIN_LEN);
                    for i in 0..CHAIN_LEN {
                        let prev = chain.last().unwrap_or(&shared);
                        let task = Task::builder(tl.job(&link(t, i), Duration::ZERO))
                            .depends_on(prev)
                            .wait_handle()
                            .build();
                        chain.push(task);
                    }

                    barrier.wait();
                    // Links go in one by one; each later link marks the one
                    // before it as a dependency.
                    for task in &chain {
                        handle.add_task(Arc::clone(task));
                    }
                    // Already pulled in by the first link, so this is ignored.
                    handle.add_task(Arc::clone(&shared));
                    chain
                })
            })
            .collect();

        let chains: Vec<Vec<TaskRef>> = submitters
            .into_iter()
            .map(|s| s.join().unwrap())
            .collect();

        assert!(shared.sync_timeout(TIMEOUT), "round {round}: shared never completed");
        for chain in &chains {
            for task in chain {
                assert!(
                    task.sync_timeout(TIMEOUT),
                    "round {round}: {:?} never completed",
                    task.name()
                );
            }
        }

        assert_eq!(tl.count_of("shared", Mark::Began), 1, "round {round}");
        assert_eq!(tl.count_of("shared", Mark::Completed), 1, "round {round}");
        for t in 0..SUBMITTERS {
            tl.assert_before("shared", Mark::Completed, &link(t, 0), Mark::Began);
            for i in 1..CHAIN_LEN {
                assert_eq!(tl.count_of(&link(t, i), Mark::Began), 1);
                tl.assert_before(&link(t, i - 1), Mark::Completed, &link(t, i), Mark::Began);
            }
        }
        assert_eq!(sched.stats().completed, (1 + SUBMITTERS * CHAIN_LEN) as u64);
    }
}
