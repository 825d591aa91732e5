//! Shift/swap local optimization.
//!
//! # Moves
//!
//! - **Shift**: move one participant to another workshop of the same slot
//!   they strictly prefer, keeping both workshops within capacity.
//! - **Swap**: exchange the workshops of two participants in one slot when
//!   both strictly gain.
//!
//! Rounds repeat until neither move fires. Every accepted move is checked
//! against the full feasibility predicate and rolled back otherwise.
//! Participants never leave a workshop they are required to attend, and
//! dependent workshops are left alone.

use crate::fitness::FitnessEvaluator;
use crate::models::{Candidate, InputData};

/// Number of moves applied by one optimization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalSearchStats {
    pub shifts: usize,
    pub swaps: usize,
}

impl LocalSearchStats {
    pub fn total(&self) -> usize {
        self.shifts + self.swaps
    }
}

/// Deterministic fixed-point improver.
#[derive(Debug, Clone, Copy)]
pub struct LocalSearch<'a> {
    evaluator: &'a FitnessEvaluator,
}

impl<'a> LocalSearch<'a> {
    pub fn new(evaluator: &'a FitnessEvaluator) -> Self {
        Self { evaluator }
    }

    /// Runs shift and swap rounds until neither improves.
    ///
    /// Infeasible candidates are returned untouched.
    pub fn optimize(&self, candidate: &mut Candidate) -> LocalSearchStats {
        let mut stats = LocalSearchStats::default();
        if !self.evaluator.is_feasible(candidate) {
            return stats;
        }
        loop {
            let shifts = self.shift_round(candidate);
            let swaps = self.swap_round(candidate);
            stats.shifts += shifts;
            stats.swaps += swaps;
            if shifts + swaps == 0 {
                return stats;
            }
        }
    }

    /// One pass of shift moves over every participant and slot.
    pub fn shift_round(&self, candidate: &mut Candidate) -> usize {
        let input = self.evaluator.input();
        let mut counts = candidate.participant_counts();
        let by_slot = candidate.workshops_by_slot();
        let mut applied = 0;

        for p in 0..candidate.participant_count() {
            for ordinal in 0..candidate.slot_count() {
                let from = candidate.workshop_of(p, ordinal);
                if !is_movable(input, p, from) || counts[from] <= input.min_participants(from) {
                    continue;
                }
                let current = input.preference(p, from);
                let mut targets: Vec<usize> = by_slot[candidate.slot_of(from)]
                    .iter()
                    .copied()
                    .filter(|&to| {
                        to != from
                            && !input.is_dependent(to)
                            && !input.must_avoid(p, to)
                            && counts[to] < input.max_participants(to)
                            && input.preference(p, to) < current
                    })
                    .collect();
                targets.sort_by_key(|&to| (input.preference(p, to), to));

                for to in targets {
                    candidate.set_workshop(p, ordinal, to);
                    if self.evaluator.is_feasible(candidate) {
                        counts[from] -= 1;
                        counts[to] += 1;
                        applied += 1;
                        break;
                    }
                    candidate.set_workshop(p, ordinal, from);
                }
            }
        }
        applied
    }

    /// One pass of pairwise swaps within every slot.
    pub fn swap_round(&self, candidate: &mut Candidate) -> usize {
        let input = self.evaluator.input();
        let participants = candidate.participant_count();
        let mut applied = 0;

        for slot in 0..candidate.slot_count() {
            for p1 in 0..participants {
                for p2 in (p1 + 1)..participants {
                    let (Some(o1), Some(o2)) = (
                        candidate.ordinal_in_slot(p1, slot),
                        candidate.ordinal_in_slot(p2, slot),
                    ) else {
                        continue;
                    };
                    let w1 = candidate.workshop_of(p1, o1);
                    let w2 = candidate.workshop_of(p2, o2);
                    let improves = w1 != w2
                        && is_movable(input, p1, w1)
                        && is_movable(input, p2, w2)
                        && !input.is_dependent(w1)
                        && !input.is_dependent(w2)
                        && !input.must_avoid(p1, w2)
                        && !input.must_avoid(p2, w1)
                        && input.preference(p1, w2) < input.preference(p1, w1)
                        && input.preference(p2, w1) < input.preference(p2, w2);
                    if !improves {
                        continue;
                    }
                    candidate.set_workshop(p1, o1, w2);
                    candidate.set_workshop(p2, o2, w1);
                    if self.evaluator.is_feasible(candidate) {
                        applied += 1;
                    } else {
                        candidate.set_workshop(p1, o1, w1);
                        candidate.set_workshop(p2, o2, w2);
                    }
                }
            }
        }
        applied
    }
}

/// Whether `p` may leave `w`.
pub(crate) fn is_movable(input: &InputData, p: usize, w: usize) -> bool {
    !input.is_dependent(w) && !input.must_attend(p, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Constraint, InputDataBuilder, Participant, Workshop};
    use std::sync::Arc;

    fn evaluator() -> FitnessEvaluator {
        let input = InputDataBuilder::new()
            .with_slot("1")
            .with_workshop(Workshop::new("A", 0, 2))
            .with_workshop(Workshop::new("B", 0, 2))
            .with_workshop(Workshop::new("C", 0, 2))
            .with_participant(Participant::new("p0", vec![1, 2, 3]))
            .with_participant(Participant::new("p1", vec![3, 1, 2]))
            .with_participant(Participant::new("p2", vec![1, 3, 2]))
            .build()
            .unwrap();
        FitnessEvaluator::new(Arc::new(input), 3.0)
    }

    fn assigned(rows: &[usize]) -> Candidate {
        let mut c = Candidate::with_dimensions(3, rows.len(), 1);
        for (p, &w) in rows.iter().enumerate() {
            c.set_workshop(p, 0, w);
        }
        c
    }

    #[test]
    fn test_shift_improves() {
        let eval = evaluator();
        let mut c = assigned(&[2, 2, 1]);
        let before = eval.evaluate(&c);
        let shifted = LocalSearch::new(&eval).shift_round(&mut c);
        assert!(shifted > 0);
        let after = eval.evaluate(&c);
        assert!(after.is_feasible());
        assert!(after <= before);
    }

    #[test]
    fn test_swap_when_both_gain() {
        let eval = evaluator();
        // p1 sits in A (3), p2 sits in B (3); swapping gives 1 and 1
        let input = eval.input();
        let mut c = assigned(&[0, 0, 1]);
        assert_eq!(input.preference(1, 0), 3);
        let ls = LocalSearch::new(&eval);
        let swaps = ls.swap_round(&mut c);
        assert_eq!(swaps, 1);
        assert_eq!(c.workshops_of(1), &[1]);
        assert_eq!(c.workshops_of(2), &[0]);
    }

    #[test]
    fn test_fixed_point_is_idempotent() {
        let eval = evaluator();
        let ls = LocalSearch::new(&eval);
        let mut c = assigned(&[2, 0, 1]);
        let first = ls.optimize(&mut c);
        assert!(first.total() > 0);
        let second = ls.optimize(&mut c);
        assert_eq!(second.total(), 0);
        assert_eq!(eval.evaluate(&c).major, 1.0);
    }

    #[test]
    fn test_required_attendance_stays() {
        let input = InputDataBuilder::new()
            .with_slot("1")
            .with_workshop(Workshop::new("A", 0, 2))
            .with_workshop(Workshop::new("B", 0, 2))
            .with_participant(Participant::new("p0", vec![5, 1]))
            .with_constraint(Constraint::attends(0, 0))
            .build()
            .unwrap();
        let eval = FitnessEvaluator::new(Arc::new(input), 3.0);
        let mut c = Candidate::with_dimensions(2, 1, 1);
        c.set_workshop(0, 0, 0);
        assert_eq!(LocalSearch::new(&eval).optimize(&mut c).total(), 0);
        assert!(c.attends(0, 0));
    }

    #[test]
    fn test_infeasible_untouched() {
        let eval = evaluator();
        // A over capacity
        let mut c = assigned(&[0, 0, 0]);
        let copy = c.clone();
        assert_eq!(LocalSearch::new(&eval).optimize(&mut c).total(), 0);
        assert_eq!(c, copy);
    }
}
