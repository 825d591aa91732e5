//! Workshop scheduling and participant assignment.
//!
//! Places workshops into time slots and participants into one workshop per
//! slot, respecting capacities and constraints while minimizing the worst
//! preference anyone receives, then the weighted overall dissatisfaction.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Workshop`, `Participant`, `Constraint`,
//!   `InputData`, `Candidate`, `Scheduling`, `Solution`
//! - **`validation`**: Input integrity checks (duplicate names, references,
//!   continuation cycles)
//! - **`fitness`**: Feasibility predicate and lexicographic objective
//! - **`critical`**: Critical-set analysis and preference lower bound
//! - **`scheduler`**: Greedy and backtracking constructors, KPIs
//! - **`local`**: Shift/swap local search and the preference pump
//! - **`ga`**: Multi-level concurrent genetic algorithm
//! - **`solver`**: `Solver` trait and the built-in strategies
//!
//! # Example
//!
//! ```
//! use u_workshop::config::{SolverConfig, Strategy};
//! use u_workshop::models::{InputDataBuilder, Participant, Workshop};
//!
//! let input = InputDataBuilder::new()
//!     .with_slot("Morning")
//!     .with_workshop(Workshop::new("Pottery", 1, 2))
//!     .with_workshop(Workshop::new("Painting", 1, 2))
//!     .with_participant(Participant::new("Ann", vec![0, 1]))
//!     .with_participant(Participant::new("Bob", vec![1, 0]))
//!     .build()
//!     .unwrap();
//!
//! let config = SolverConfig::default()
//!     .with_timeout_ms(50)
//!     .with_strategy(Strategy::Greedy);
//! let solution = u_workshop::solve(&input, &config, None).unwrap();
//! assert_eq!(solution.fitness.major, 0.0);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Cantú-Paz (2000), "Efficient and Accurate Parallel Genetic Algorithms"

pub mod config;
pub mod critical;
pub mod error;
pub mod fitness;
pub mod ga;
pub mod local;
pub mod models;
pub mod progress;
pub mod scheduler;
pub mod solver;
pub mod termination;
pub mod validation;

pub use config::{SolverConfig, Strategy};
pub use error::{InputError, SolveError, SolveResult};
pub use models::{InputData, Solution};
pub use solver::Solver;

use progress::ProgressObserver;

/// Solves `input` with the strategy selected in `config`.
pub fn solve(
    input: &InputData,
    config: &SolverConfig,
    observer: Option<&dyn ProgressObserver>,
) -> SolveResult<Solution> {
    solver::from_config(config.clone(), observer).solve(input)
}
