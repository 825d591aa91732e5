//! Solution model.
//!
//! A solution is the final scheduling plus participant assignment handed to
//! output. It is verified against every structural invariant before a run
//! accepts it.

use serde::{Deserialize, Serialize};

use super::{Candidate, InputData};
use crate::error::SolveError;
use crate::fitness::{find_violations, Fitness};

/// Final workshop → slot scheduling and participant assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Slot per workshop.
    pub scheduling: Vec<usize>,
    /// Workshop per participant and slot: `assignment[p][s]`.
    pub assignment: Vec<Vec<usize>>,
    /// Objective value of the underlying candidate.
    pub fitness: Fitness,
}

/// A broken structural invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity (workshop or participant name).
    pub entity: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of structural violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Workshop attended by fewer than its minimum.
    BelowMinimum,
    /// Workshop attended by more than its maximum.
    CapacityExceeded,
    /// Participant does not attend exactly one workshop per slot.
    SlotConflict,
    /// A declared or generated constraint does not hold.
    ConstraintViolated,
    /// Gene outside the workshop or slot range.
    InvalidIndex,
}

impl Violation {
    pub(crate) fn new(
        violation_type: ViolationType,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity: entity.into(),
            message: message.into(),
        }
    }
}

impl Solution {
    /// Extracts a solution from a candidate, keeping its ordinal order.
    pub fn from_candidate(c: &Candidate, fitness: Fitness) -> Self {
        let scheduling = (0..c.workshop_count()).map(|w| c.slot_of(w)).collect();
        let assignment = (0..c.participant_count())
            .map(|p| c.workshops_of(p).to_vec())
            .collect();
        Self {
            scheduling,
            assignment,
            fitness,
        }
    }

    /// Checks capacity, one-workshop-per-slot and every constraint.
    pub fn verify(&self, input: &InputData) -> Result<(), SolveError> {
        let shape_ok = self.scheduling.len() == input.workshop_count()
            && self.assignment.len() == input.participant_count()
            && self.assignment.iter().all(|row| row.len() == input.slot_count());
        if !shape_ok {
            return Err(SolveError::InvalidSolution(vec![Violation::new(
                ViolationType::InvalidIndex,
                "solution",
                "Solution dimensions do not match the input",
            )]));
        }
        let violations = find_violations(input, &Candidate::from_solution(self));
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SolveError::InvalidSolution(violations))
        }
    }

    /// Slot of workshop `w`.
    pub fn slot_of(&self, w: usize) -> usize {
        self.scheduling[w]
    }

    /// Workshop participant `p` attends in `slot`.
    pub fn workshop_of(&self, p: usize, slot: usize) -> usize {
        self.assignment[p][slot]
    }

    /// Participants of workshop `w`.
    pub fn participants_of(&self, w: usize) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter(|(_, row)| row.contains(&w))
            .map(|(p, _)| p)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputDataBuilder, Participant, Workshop};

    fn input() -> InputData {
        InputDataBuilder::new()
            .with_slot("1")
            .with_slot("2")
            .with_workshop(Workshop::new("A", 1, 2))
            .with_workshop(Workshop::new("B", 1, 2))
            .with_participant(Participant::new("p0", vec![1, 2]))
            .with_participant(Participant::new("p1", vec![2, 1]))
            .build()
            .unwrap()
    }

    fn candidate() -> Candidate {
        let mut c = Candidate::new(&input());
        c.set_slot(0, 0);
        c.set_slot(1, 1);
        for p in 0..2 {
            c.set_workshop(p, 0, 0);
            c.set_workshop(p, 1, 1);
        }
        c
    }

    #[test]
    fn test_round_trip() {
        let c = candidate();
        let solution = Solution::from_candidate(&c, Fitness::new(2.0, 1.0));
        assert_eq!(Candidate::from_solution(&solution), c);
        assert_eq!(solution.participants_of(1), vec![0, 1]);
        assert_eq!(solution.workshop_of(1, 0), 0);
        assert_eq!(solution.slot_of(1), 1);
    }

    #[test]
    fn test_round_trip_keeps_ordinal_order() {
        let mut c = candidate();
        c.set_workshop(0, 0, 1);
        c.set_workshop(0, 1, 0);
        let solution = Solution::from_candidate(&c, Fitness::INFEASIBLE);
        assert_eq!(Candidate::from_solution(&solution), c);
        // Listed out of slot order, so verification flags it
        assert!(solution.verify(&input()).is_err());
    }

    #[test]
    fn test_verify_accepts_feasible() {
        let solution = Solution::from_candidate(&candidate(), Fitness::new(2.0, 1.0));
        assert!(solution.verify(&input()).is_ok());
    }

    #[test]
    fn test_verify_reports_violations() {
        let mut solution = Solution::from_candidate(&candidate(), Fitness::new(2.0, 1.0));
        // both workshops in slot 0: every participant double-booked
        solution.scheduling[1] = 0;
        match solution.verify(&input()) {
            Err(SolveError::InvalidSolution(v)) => {
                assert!(v.iter().any(|x| x.violation_type == ViolationType::SlotConflict));
            }
            other => panic!("expected violations, got {other:?}"),
        }

        let mut truncated = Solution::from_candidate(&candidate(), Fitness::new(2.0, 1.0));
        truncated.assignment.pop();
        assert!(truncated.verify(&input()).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let solution = Solution::from_candidate(&candidate(), Fitness::new(2.0, 0.5));
        let json = serde_json::to_string(&solution).unwrap();
        let back: Solution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, solution);
    }
}
