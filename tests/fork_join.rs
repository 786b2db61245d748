// tests/fork_join.rs

mod common;
use crate::common::{scheduler, sync_all, Mark, Timeline, TIMEOUT};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use taskweave::sync::ThreadSafeCounter;
use taskweave::{Scheduler, Task, TaskRunState};

#[test]
fn sync_on_parent_waits_for_all_children() {
    let sched = scheduler(4);
    let finished = Arc::new(AtomicUsize::new(0));

    let parent = {
        let finished = Arc::clone(&finished);
        Task::builder(move |s: &Scheduler| {
            let me = Task::current().expect("running inside a task");
            for _ in 0..3 {
                let finished = Arc::clone(&finished);
                me.spawn_child(s, move |_: &Scheduler| {
                    thread::sleep(Duration::from_millis(30));
                    finished.fetch_add(1, Ordering::SeqCst);
                });
            }
            // Return right away; the children are still sleeping.
        })
        .wait_handle()
        .build()
    };

    sched.add_task(parent.clone());

    // Sync from a third thread, as a render/main thread would.
    let waiter = {
        let parent = parent.clone();
        let finished = Arc::clone(&finished);
        thread::spawn(move || {
            assert!(parent.sync_timeout(TIMEOUT));
            finished.load(Ordering::SeqCst)
        })
    };

    assert_eq!(waiter.join().unwrap(), 3);
    assert_eq!(parent.child_count(), 0);
    assert_eq!(parent.run_state(), TaskRunState::Completed);
}

#[test]
fn parent_completion_follows_every_child_completion() {
    let sched = scheduler(3);
    let tl = Timeline::new();

    let parent = {
        let tl = tl.clone();
        Task::builder(move |s: &Scheduler| {
            let me = Task::current().unwrap();
            for i in 0..4 {
                me.spawn_child(s, tl.job(&format!("child{i}"), Duration::from_millis(5 * i)));
            }
        })
        .wait_handle()
        .build()
    };
    // Record the parent's completion through a dependent that starts after it.
    let after = Task::builder(tl.job("after", Duration::ZERO))
        .depends_on(&parent)
        .wait_handle()
        .build();

    sched.add_task(after.clone());
    sync_all(&[&parent, &after]);

    for i in 0..4 {
        tl.assert_before(&format!("child{i}"), Mark::Completed, "after", Mark::Began);
    }
}

#[test]
fn grandchildren_hold_up_the_root() {
    let sched = scheduler(2);
    let leaves = Arc::new(AtomicUsize::new(0));

    let root = {
        let leaves = Arc::clone(&leaves);
        Task::builder(move |s: &Scheduler| {
            let me = Task::current().unwrap();
            for _ in 0..2 {
                let leaves = Arc::clone(&leaves);
                me.spawn_child(s, move |s: &Scheduler| {
                    let me = Task::current().unwrap();
                    for _ in 0..2 {
                        let leaves = Arc::clone(&leaves);
                        me.spawn_child(s, move |_: &Scheduler| {
                            thread::sleep(Duration::from_millis(10));
                            leaves.fetch_add(1, Ordering::SeqCst);
                        });
                    }
                });
            }
        })
        .wait_handle()
        .build()
    };

    sched.add_task(root.clone());
    sync_all(&[&root]);
    assert_eq!(leaves.load(Ordering::SeqCst), 4);
}

#[test]
fn external_counter_counts_down_once_per_task() {
    let sched = scheduler(4);
    let outstanding = Arc::new(ThreadSafeCounter::new(0));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            outstanding.increment();
            Task::builder(|_: &Scheduler| thread::sleep(Duration::from_millis(1)))
                .external_counter(Arc::clone(&outstanding))
                .wait_handle()
                .build()
        })
        .collect();
    for t in &tasks {
        sched.add_task(t.clone());
    }
    for t in &tasks {
        assert!(t.sync_timeout(TIMEOUT));
    }
    assert_eq!(outstanding.get(), 0);
}
