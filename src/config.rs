//! Solver configuration.
//!
//! [`SolverConfig`] enumerates every recognized option with its default.
//! It round-trips through serde so callers can load it from any format.
//!
//! # Example
//!
//! ```
//! use u_workshop::config::{SolverConfig, Strategy};
//!
//! let config = SolverConfig::default()
//!     .with_timeout_ms(500)
//!     .with_seed(7)
//!     .with_strategy(Strategy::Greedy);
//! assert_eq!(config.timeout_ms, 500);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ga::operators::GeneticOperators;
use crate::models::Preference;

/// Top-level solving strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Repeated greedy construction plus local refinement.
    Greedy,
    /// Multi-level concurrent genetic algorithm.
    Genetic,
}

/// Parent selection inside a GA level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    /// Top-N by fitness.
    Elitist,
    /// Best of `size` random picks.
    Tournament { size: usize },
}

/// Every solver option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget for the whole run.
    pub timeout_ms: u64,
    /// Base seed; thread `i` uses `seed + i`.
    pub seed: u64,
    /// Exponent `E` of the minor objective.
    pub preference_exponent: f64,
    pub strategy: Strategy,
    /// Threads producing seed candidates.
    pub presolver_threads: usize,
    /// Parallel crossover workers of the leading level.
    pub crossover_workers: usize,
    /// Target generation size per level.
    pub population_size: usize,
    /// Candidates carried over unchanged per generation.
    pub elite_count: usize,
    pub selection: SelectionType,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    /// Capacity of each preference bucket.
    pub bucket_capacity: usize,
    /// Presolve schedulings with the backtracking search instead of greedy.
    pub use_backtracking: bool,
    /// Pause between preference-pump sweeps.
    pub pump_interval_ms: u64,
    /// Longest displacement chain the pump follows.
    pub pump_max_depth: usize,
    /// Budget of a single pump call.
    pub pump_timeout_ms: u64,
    /// Interval of progress reports.
    pub status_interval_ms: u64,
    /// Sleep per level of distance from the leading level.
    pub throttle_ms: u64,
    /// Ceiling on the preference bound of the critical set analysis.
    pub max_preference: Option<Preference>,
    pub operators: GeneticOperators,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            seed: 42,
            preference_exponent: crate::fitness::DEFAULT_PREFERENCE_EXPONENT,
            strategy: Strategy::Genetic,
            presolver_threads: 2,
            crossover_workers: 2,
            population_size: 32,
            elite_count: 4,
            selection: SelectionType::Tournament { size: 3 },
            crossover_rate: 0.8,
            mutation_rate: 0.3,
            bucket_capacity: 64,
            use_backtracking: false,
            pump_interval_ms: 250,
            pump_max_depth: 4,
            pump_timeout_ms: 100,
            status_interval_ms: 1_000,
            throttle_ms: 2,
            max_preference: None,
            operators: GeneticOperators::default(),
        }
    }
}

impl SolverConfig {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_preference_exponent(mut self, exponent: f64) -> Self {
        self.preference_exponent = exponent;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_presolver_threads(mut self, threads: usize) -> Self {
        self.presolver_threads = threads;
        self
    }

    pub fn with_crossover_workers(mut self, workers: usize) -> Self {
        self.crossover_workers = workers;
        self
    }

    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_selection(mut self, selection: SelectionType) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_bucket_capacity(mut self, capacity: usize) -> Self {
        self.bucket_capacity = capacity;
        self
    }

    pub fn with_backtracking(mut self, enabled: bool) -> Self {
        self.use_backtracking = enabled;
        self
    }

    pub fn with_max_preference(mut self, ceiling: Preference) -> Self {
        self.max_preference = Some(ceiling);
        self
    }

    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn pump_timeout(&self) -> Duration {
        Duration::from_millis(self.pump_timeout_ms)
    }

    /// Seed of the `index`-th worker stream.
    pub fn thread_seed(&self, index: u64) -> u64 {
        self.seed.wrapping_add(index)
    }
}
