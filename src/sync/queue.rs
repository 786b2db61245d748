// src/sync/queue.rs

//! Unbounded multi-producer, multi-consumer lock-free FIFO.
//!
//! This is the classic Michael–Scott queue:
//!
//! - `head` always points at a sentinel node whose value has already been
//!   taken (or never existed). The first real value lives in `head.next`.
//! - `enq` links a new node after the last node with a CAS on its `next`
//!   pointer, then tries to swing `tail` forward. Those two steps are not
//!   atomic together, so every operation that observes a lagging `tail`
//!   finishes the swing itself before continuing ("helping").
//! - `deq` moves `head` forward with a CAS; the old sentinel is retired and
//!   the node holding the value becomes the new sentinel.
//!
//! Retired nodes are reclaimed through `crossbeam-epoch`, so a thread that
//! still holds a pointer to a node it loaded before a concurrent `deq` never
//! reads freed memory. Nothing here blocks.

use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering::*};

use crossbeam_epoch::{self as epoch, Atomic, Owned, Shared};
use crossbeam_utils::CachePadded;

struct Node<T> {
    /// Initialized for every node except the current sentinel, whose value
    /// was moved out by the `deq` that made it the sentinel.
    value: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

pub struct LockFreeQueue<T> {
    head: CachePadded<Atomic<Node<T>>>,
    tail: CachePadded<Atomic<Node<T>>>,
    len: AtomicUsize,
}

impl<T> LockFreeQueue<T> {
    pub fn new() -> Self {
        let queue = Self {
            head: CachePadded::new(Atomic::null()),
            tail: CachePadded::new(Atomic::null()),
            len: AtomicUsize::new(0),
        };
        let sentinel = Owned::new(Node {
            value: MaybeUninit::uninit(),
            next: Atomic::null(),
        });
        // Safety: the queue is not shared with any other thread yet.
        unsafe {
            let guard = epoch::unprotected();
            let sentinel = sentinel.into_shared(guard);
            queue.head.store(sentinel, Relaxed);
            queue.tail.store(sentinel, Relaxed);
        }
        queue
    }

    /// Append `value` at the tail.
    pub fn enq(&self, value: T) {
        let guard = &epoch::pin();
        let new = Owned::new(Node {
            value: MaybeUninit::new(value),
            next: Atomic::null(),
        })
        .into_shared(guard);

        loop {
            let tail = self.tail.load(Acquire, guard);
            // Safety: `tail` is never null and cannot be reclaimed while we
            // are pinned.
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Acquire, guard);

            // Re-check before writing to cut down on failed CASes.
            if tail != self.tail.load(Acquire, guard) {
                continue;
            }

            if next.is_null() {
                if tail_ref
                    .next
                    .compare_exchange(Shared::null(), new, Release, Relaxed, guard)
                    .is_ok()
                {
                    // Failing here is fine: somebody already helped.
                    let _ = self
                        .tail
                        .compare_exchange(tail, new, Release, Relaxed, guard);
                    break;
                }
            } else {
                // Another enqueue is half done; finish its tail swing.
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Release, Relaxed, guard);
            }
        }

        self.len.fetch_add(1, Relaxed);
    }

    /// Remove the value at the head, or `None` if the queue is empty.
    pub fn deq(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let head = self.head.load(Acquire, guard);
            let tail = self.tail.load(Acquire, guard);
            // Safety: `head` is never null and is protected by the guard.
            let next = unsafe { head.deref() }.next.load(Acquire, guard);

            if head != self.head.load(Acquire, guard) {
                continue;
            }

            // Safety: protected by the guard.
            let next_ref = match unsafe { next.as_ref() } {
                Some(node) => node,
                None => return None,
            };

            if head == tail {
                // `tail` is lagging behind a completed link; help it along.
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Release, Relaxed, guard);
                continue;
            }

            if self
                .head
                .compare_exchange(head, next, Release, Relaxed, guard)
                .is_ok()
            {
                // Safety: winning the CAS makes this thread the only one that
                // takes the value out of `next`, which is now the sentinel and
                // is never read for its value again.
                let value = unsafe { next_ref.value.as_ptr().read() };
                // Safety: the old sentinel is unreachable from the queue now;
                // readers that loaded it earlier are still pinned.
                unsafe { guard.defer_destroy(head) };
                self.len.fetch_sub(1, Relaxed);
                return Some(value);
            }
        }
    }

    /// Approximate number of queued values. Exact when the queue is quiescent.
    pub fn len(&self) -> usize {
        self.len.load(Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(Acquire, guard);
        // Safety: `head` is never null and is protected by the guard.
        unsafe { head.deref() }.next.load(Acquire, guard).is_null()
    }

    /// Drop every queued value.
    pub fn clear(&self) {
        while self.deq().is_some() {}
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        self.clear();
        // Safety: `&mut self` guarantees no concurrent access, and the only
        // node left is the sentinel, whose value is uninitialized.
        unsafe {
            let guard = epoch::unprotected();
            let sentinel = self.head.load(Relaxed, guard);
            drop(sentinel.into_owned());
        }
    }
}

impl<T> fmt::Debug for LockFreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}
