//! Bounded per-preference hand-off queues.
//!
//! A [`Bucket`] is a FIFO of feasible candidates whose worst preference
//! equals the bucket's level. Producers block while it is full and consumers
//! block while it is empty; both waits poll the cancellation token.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::models::{Candidate, Preference};
use crate::termination::Cancellation;

/// Granularity of cancellation checks while blocked.
const WAIT_SLICE: Duration = Duration::from_millis(20);

/// Bounded blocking FIFO of candidates for one preference level.
#[derive(Debug)]
pub struct Bucket {
    level: Preference,
    capacity: usize,
    queue: Mutex<VecDeque<Candidate>>,
    not_empty: Condvar,
    not_full: Condvar,
    seeded: AtomicBool,
}

impl Bucket {
    pub fn new(level: Preference, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            level,
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            seeded: AtomicBool::new(false),
        }
    }

    pub fn level(&self) -> Preference {
        self.level
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether any candidate was ever put here.
    pub fn is_seeded(&self) -> bool {
        self.seeded.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Candidate>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, mut queue: MutexGuard<'_, VecDeque<Candidate>>, candidate: Candidate) {
        queue.push_back(candidate);
        self.seeded.store(true, Ordering::Relaxed);
        drop(queue);
        self.not_empty.notify_one();
    }

    /// Blocks while full. Hands the candidate back once cancelled.
    pub fn put(&self, candidate: Candidate, cancel: &Cancellation) -> Result<(), Candidate> {
        let mut queue = self.lock();
        while queue.len() >= self.capacity {
            if cancel.is_cancelled() {
                return Err(candidate);
            }
            queue = self
                .not_full
                .wait_timeout(queue, WAIT_SLICE)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        self.push(queue, candidate);
        Ok(())
    }

    /// Non-blocking put. Hands the candidate back when full.
    pub fn try_put(&self, candidate: Candidate) -> Result<(), Candidate> {
        let queue = self.lock();
        if queue.len() >= self.capacity {
            return Err(candidate);
        }
        self.push(queue, candidate);
        Ok(())
    }

    /// Blocks while empty. `None` once cancelled.
    pub fn take(&self, cancel: &Cancellation) -> Option<Candidate> {
        let mut queue = self.lock();
        loop {
            if let Some(candidate) = queue.pop_front() {
                drop(queue);
                self.not_full.notify_one();
                return Some(candidate);
            }
            if cancel.is_cancelled() {
                return None;
            }
            queue = self
                .not_empty
                .wait_timeout(queue, WAIT_SLICE)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Non-blocking take.
    pub fn try_take(&self) -> Option<Candidate> {
        let candidate = self.lock().pop_front();
        if candidate.is_some() {
            self.not_full.notify_one();
        }
        candidate
    }
}

/// One bucket per distinct preference value.
#[derive(Debug)]
pub struct BucketSet {
    levels: Vec<Preference>,
    buckets: Vec<Bucket>,
}

impl BucketSet {
    /// `levels` must be sorted ascending.
    pub fn new(levels: &[Preference], capacity: usize) -> Self {
        Self {
            levels: levels.to_vec(),
            buckets: levels.iter().map(|&l| Bucket::new(l, capacity)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn levels(&self) -> &[Preference] {
        &self.levels
    }

    /// Index of the bucket for worst preference `level`.
    pub fn index_of(&self, level: Preference) -> Option<usize> {
        self.levels.binary_search(&level).ok()
    }

    #[inline]
    pub fn bucket(&self, index: usize) -> &Bucket {
        &self.buckets[index]
    }

    /// Bucket for worst preference `level`.
    pub fn for_level(&self, level: Preference) -> Option<&Bucket> {
        self.index_of(level).map(|i| &self.buckets[i])
    }

    /// Lowest level that has received a candidate.
    pub fn leading(&self) -> Option<usize> {
        self.buckets.iter().position(Bucket::is_seeded)
    }
}
