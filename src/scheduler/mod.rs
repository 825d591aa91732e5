//! Constructive schedulers and KPI evaluation.
//!
//! Provides the two producers of schedulings and candidates plus solution
//! quality metrics.
//!
//! # Algorithms
//!
//! - [`GreedySolver`]: randomized, never backtracks, linear passes. Seeds GA
//!   populations and serves as the default presolver.
//! - [`BacktrackingScheduler`]: complete slot search with capacity,
//!   constraint and critical-set pruning; [`SchedulingStream`] repeats it
//!   lazily.
//!
//! # KPI
//!
//! [`SolutionKpi`] summarizes preference distribution and workshop fill.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Schaerf (1999), "A Survey of Automated Timetabling"

mod backtracking;
mod greedy;
mod kpi;

pub(crate) use backtracking::slot_allowed;
pub use backtracking::{BacktrackingScheduler, SchedulingStream};
pub use greedy::GreedySolver;
pub use kpi::SolutionKpi;
