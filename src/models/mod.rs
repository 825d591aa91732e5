//! Workshop problem domain models.
//!
//! Provides the problem definition ([`InputData`]) and the solution
//! representations shared by every solver component.
//!
//! # Domain Mappings
//!
//! | u-workshop | Summer academy | Conference | School |
//! |------------|----------------|------------|--------|
//! | Workshop | Course | Session | Elective |
//! | Participant | Attendee | Delegate | Student |
//! | Slot | Course block | Time track | Period |
//! | Conductor | Course leader | Speaker | Teacher |

mod candidate;
mod constraint;
mod input;
mod solution;
mod union_find;
mod workshop;

pub use candidate::{Candidate, Scheduling};
pub use constraint::{Constraint, SequenceKind};
pub use input::{InputData, InputDataBuilder, DEFAULT_SLOT};
pub use solution::{Solution, Violation, ViolationType};
pub use union_find::UnionFind;
pub use workshop::{Participant, Preference, Workshop};
