//! One-way progress reporting.
//!
//! The solver pushes a [`ProgressReport`] to a [`ProgressObserver`] on a
//! fixed interval. Observers never influence the search.

use std::time::Duration;

use log::info;

use crate::fitness::Fitness;
use crate::models::Preference;

/// State of one GA level at report time.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelStatus {
    /// Preference value the level is keyed by.
    pub level: Preference,
    pub generation: usize,
    pub population: usize,
    /// Best fitness in the current population.
    pub best: Option<Fitness>,
    /// Candidates waiting in the level's bucket.
    pub bucket_len: usize,
}

impl LevelStatus {
    pub fn new(level: Preference) -> Self {
        Self {
            level,
            generation: 0,
            population: 0,
            best: None,
            bucket_len: 0,
        }
    }
}

/// Snapshot of a running solve.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    /// Best fitness found so far.
    pub best: Option<Fitness>,
    /// Time left before the deadline.
    pub eta: Duration,
    pub levels: Vec<LevelStatus>,
}

/// Receives progress reports.
pub trait ProgressObserver {
    fn on_progress(&self, report: &ProgressReport);
}

/// Reports progress through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress(&self, report: &ProgressReport) {
        let best = match report.best {
            Some(f) => format!("({}, {:.4})", f.major, f.minor),
            None => "none".to_string(),
        };
        let active = report.levels.iter().filter(|l| l.population > 0).count();
        info!(
            "Best {best}, {active}/{} levels active, {:.1}s left",
            report.levels.len(),
            report.eta.as_secs_f64()
        );
    }
}
