//! Candidate-local refinement.
//!
//! # Submodules
//!
//! - [`LocalSearch`]: shift/swap fixed-point improvement. Used as a GA
//!   mutation and as a post-processing pass.
//! - [`PreferencePump`]: bounded augmenting chains that remove every use of
//!   a bad preference level.
//!
//! Neither ever turns a feasible candidate infeasible. Failing to improve is
//! a normal outcome, reported as zero moves or [`PumpResult::Fail`].

mod local_search;
mod pump;

pub use local_search::{LocalSearch, LocalSearchStats};
pub use pump::{PreferencePump, PumpResult};
