#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use taskweave::{Job, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// The body started.
    Began,
    /// The body returned.
    Ended,
    /// Completion observers were notified.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub label: String,
    pub mark: Mark,
    /// Position in the global order of events on this timeline.
    pub seq: u64,
}

/// Thread-safe recorder of job events, used to assert ordering.
#[derive(Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: &str, mark: Mark) {
        let mut events = self.events.lock();
        let seq = events.len() as u64;
        events.push(Event {
            label: label.to_string(),
            mark,
            seq,
        });
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn seq_of(&self, label: &str, mark: Mark) -> Option<u64> {
        self.events
            .lock()
            .iter()
            .find(|e| e.label == label && e.mark == mark)
            .map(|e| e.seq)
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.events.lock().iter().filter(|e| e.mark == mark).count()
    }

    pub fn count_of(&self, label: &str, mark: Mark) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.label == label && e.mark == mark)
            .count()
    }

    /// Panics unless `first`'s `first_mark` was recorded before `second`'s
    /// `second_mark`.
    pub fn assert_before(&self, first: &str, first_mark: Mark, second: &str, second_mark: Mark) {
        let a = self
            .seq_of(first, first_mark)
            .unwrap_or_else(|| panic!("{first} never recorded {first_mark:?}"));
        let b = self
            .seq_of(second, second_mark)
            .unwrap_or_else(|| panic!("{second} never recorded {second_mark:?}"));
        assert!(
            a < b,
            "expected {first}:{first_mark:?} (#{a}) before {second}:{second_mark:?} (#{b})\n{:#?}",
            self.events()
        );
    }

    /// A job that records its events on this timeline and sleeps for `work`.
    pub fn job(&self, label: &str, work: Duration) -> RecordingJob {
        RecordingJob {
            label: label.to_string(),
            timeline: self.clone(),
            work,
        }
    }
}

pub struct RecordingJob {
    label: String,
    timeline: Timeline,
    work: Duration,
}

impl Job for RecordingJob {
    fn execute(&self, _scheduler: &Scheduler) {
        self.timeline.record(&self.label, Mark::Began);
        if !self.work.is_zero() {
            thread::sleep(self.work);
        }
        self.timeline.record(&self.label, Mark::Ended);
    }

    fn completed(&self) {
        self.timeline.record(&self.label, Mark::Completed);
    }

    fn name(&self) -> Option<&str> {
        Some(&self.label)
    }
}
