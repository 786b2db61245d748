// src/scheduler/table.rs

//! The active table: tasks that are waiting on dependencies, that others
//! depend on, or whose completion is owned by the scheduling pass.
//!
//! Buckets are indexed by `id & (size - 1)`; each bucket is the collision
//! chain for that index. The table is only ever touched by the thread that
//! holds the scheduling-pass lock, so it needs no synchronization of its own.

use crate::task::{TaskId, TaskRef};

pub(crate) struct ActiveTable {
    buckets: Vec<Vec<TaskRef>>,
    mask: usize,
    len: usize,
}

impl ActiveTable {
    /// `size` must be a power of two.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            buckets: (0..size).map(|_| Vec::new()).collect(),
            mask: size - 1,
            len: 0,
        }
    }

    #[inline]
    fn bucket_of(&self, id: TaskId) -> usize {
        (id as usize) & self.mask
    }

    pub fn insert(&mut self, task: TaskRef) {
        debug_assert!(!task.is_hashed(), "task {} is already hashed", task.id());
        debug_assert!(!self.contains(task.id()));
        let bucket = self.bucket_of(task.id());
        task.flags.set_hashed(true);
        self.buckets[bucket].push(task);
        self.len += 1;
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.buckets[self.bucket_of(id)]
            .iter()
            .any(|t| t.id() == id)
    }

    /// Walk every bucket, dropping the tasks for which `keep` returns false.
    ///
    /// Removed tasks have their hashed flag cleared. `keep` may also clear it
    /// early itself, before handing the task to a worker.
    pub fn retain(&mut self, mut keep: impl FnMut(&TaskRef) -> bool) {
        let mut removed = 0;
        for bucket in &mut self.buckets {
            bucket.retain(|task| {
                if keep(task) {
                    true
                } else {
                    task.flags.set_hashed(false);
                    removed += 1;
                    false
                }
            });
        }
        self.len -= removed;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.retain(|_| false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use crate::task::Task;

    fn noop() -> TaskRef {
        Task::new(|_: &Scheduler| {})
    }

    #[test]
    fn insert_marks_hashed_and_retain_unmarks() {
        let mut table = ActiveTable::new(4);
        let a = noop();
        let b = noop();
        table.insert(a.clone());
        table.insert(b.clone());
        assert_eq!(table.len(), 2);
        assert!(a.is_hashed() && b.is_hashed());
        assert!(table.contains(a.id()));

        let a_id = a.id();
        table.retain(|t| t.id() != a_id);
        assert_eq!(table.len(), 1);
        assert!(!a.is_hashed());
        assert!(b.is_hashed());
        assert!(!table.contains(a_id));
    }

    #[test]
    fn colliding_ids_share_a_bucket() {
        // A single bucket forces every task onto one chain.
        let mut table = ActiveTable::new(1);
        let tasks: Vec<_> = (0..5).map(|_| noop()).collect();
        for t in &tasks {
            table.insert(t.clone());
        }
        assert!(tasks.iter().all(|t| table.contains(t.id())));
        table.clear();
        assert!(table.is_empty());
        assert!(tasks.iter().all(|t| !t.is_hashed()));
    }
}
