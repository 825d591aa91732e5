//! Multi-level concurrent genetic algorithm.
//!
//! One island per preference value present in the input. Islands exchange
//! candidates only through bounded [`Bucket`]s keyed by the worst
//! preference a candidate uses, so an offspring that improves (or worsens)
//! migrates to the island responsible for it.
//!
//! # Encoding
//!
//! [`Candidate`](crate::models::Candidate): workshop slots followed by each
//! participant's workshops in slot order.
//!
//! # Submodules
//!
//! - [`operators`]: Runtime-selectable crossover and mutation strategies
//! - [`GaLevel`]: a single island's generation loop
//! - [`GaSystem`]: presolvers, islands, pump thread and status reporting
//!
//! # Reference
//! - Whitley et al. (1999), "The island model genetic algorithm"
//! - Cantú-Paz (2000), "Efficient and Accurate Parallel Genetic Algorithms"

mod bucket;
mod level;
pub mod operators;
mod system;

pub use bucket::{Bucket, BucketSet};
pub use level::{GaLevel, LevelContext, LevelShared, SharedBest};
pub use operators::{CrossoverType, GeneticOperators, MutationType};
pub use system::GaSystem;
