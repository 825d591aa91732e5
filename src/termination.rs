//! Wall-clock budgets and the shared cancellation signal.
//!
//! Every blocking loop and backtracking step polls a [`Cancellation`]. The
//! token trips either explicitly or once its time budget is spent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock budget measured from its creation.
#[derive(Clone, Copy, Debug)]
pub struct TimeBudget {
    started_at: Instant,
    budget: Duration,
}

impl TimeBudget {
    /// Budget measured from now.
    pub fn starting_now(budget: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time left, zero once exceeded.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started_at.elapsed())
    }

    pub fn is_exceeded(&self) -> bool {
        self.started_at.elapsed() >= self.budget
    }
}

/// Cloneable cancellation token shared by every solver thread.
#[derive(Clone, Debug)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    budget: TimeBudget,
}

impl Cancellation {
    /// Token that trips after `budget`.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            budget: TimeBudget::starting_now(budget),
        }
    }

    /// Token that only trips through [`Cancellation::cancel`].
    pub fn never() -> Self {
        Self::with_budget(Duration::MAX)
    }

    /// Trips the token for every clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether the token was tripped or the budget is spent.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        if self.budget.is_exceeded() {
            self.cancel();
            return true;
        }
        false
    }

    pub fn elapsed(&self) -> Duration {
        self.budget.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.budget.remaining()
    }

    /// Earliest of the overall deadline and `limit` from now.
    pub fn deadline_within(&self, limit: Duration) -> Instant {
        Instant::now() + self.remaining().min(limit)
    }
}
