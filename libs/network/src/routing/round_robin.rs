//! Round-robin load balancer
//!
//! Holds a deduplicated, insertion-ordered set of equivalent targets for one
//! routing key and hands out the next target in rotation. Selection happens
//! on every dispatch, so the read path is lock-free: an immutable snapshot of
//! the target list is swapped in on every mutation and `next_target` only
//! performs an atomic counter increment against it.
//!
//! Fairness contract: over a long run with a stable target set of size N,
//! each target is selected with frequency 1/N. Rotation order is insertion
//! order of the live targets.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-key rotation over a dynamic set of equivalent targets.
#[derive(Debug)]
pub struct RoundRobinScheduler<T> {
    /// Authoritative target list, insertion-ordered, deduplicated.
    targets: Mutex<Vec<T>>,
    /// Immutable snapshot read by `next_target` without locking.
    snapshot: ArcSwap<Vec<T>>,
    cursor: AtomicUsize,
}

impl<T: Clone + PartialEq> RoundRobinScheduler<T> {
    pub fn new() -> Self {
        Self {
            targets: Mutex::new(Vec::new()),
            snapshot: ArcSwap::from_pointee(Vec::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Add a target; returns `false` if it was already registered.
    pub fn register(&self, target: T) -> bool {
        let mut targets = self.targets.lock();
        if targets.contains(&target) {
            return false;
        }
        targets.push(target);
        self.snapshot.store(Arc::new(targets.clone()));
        true
    }

    /// Remove a target; returns `false` if it was not registered.
    pub fn deregister(&self, target: &T) -> bool {
        let mut targets = self.targets.lock();
        let before = targets.len();
        targets.retain(|t| t != target);
        if targets.len() == before {
            return false;
        }
        self.snapshot.store(Arc::new(targets.clone()));
        true
    }

    /// Next target in rotation, or `None` when the set is empty.
    ///
    /// Lock-free: loads the current snapshot and indexes it by an atomic
    /// counter. Concurrent mutation only affects which snapshot a racing call
    /// observes, never the iteration itself.
    pub fn next_target(&self) -> Option<T> {
        let snapshot = self.snapshot.load();
        if snapshot.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % snapshot.len();
        Some(snapshot[index].clone())
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}

impl<T: Clone + PartialEq> Default for RoundRobinScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Deep copy so the copy-and-swap table strategy can clone whole bundles.
// The rotation position carries over to keep fairness across swaps.
impl<T: Clone + PartialEq> Clone for RoundRobinScheduler<T> {
    fn clone(&self) -> Self {
        let targets = self.targets.lock().clone();
        Self {
            snapshot: ArcSwap::from_pointee(targets.clone()),
            targets: Mutex::new(targets),
            cursor: AtomicUsize::new(self.cursor.load(Ordering::Relaxed)),
        }
    }
}
