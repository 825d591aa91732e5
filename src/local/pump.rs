//! Preference pump: augmenting chains that remove bad preferences.
//!
//! For every assignment at or above a threshold, look for a better workshop
//! in the same slot. A full target is made room in by displacing one of its
//! participants into another acceptable workshop, recursively, which forms
//! an augmenting chain over the participant ↔ workshop compatibility graph.
//! The workshop the chain starts from counts as having one free seat, so a
//! chain may close back into it.
//!
//! Chains are bounded by depth and a wall-clock budget; a visited set stops
//! cycles. Required attendances (conductors included) are never displaced.
//! Every chain is applied to a scratch copy and only committed when the
//! result is feasible.
//!
//! # Reference
//! Hopcroft & Karp (1973), "An n^5/2 algorithm for maximum matchings in
//! bipartite graphs" (augmenting paths)

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;

use super::local_search::is_movable;
use crate::fitness::FitnessEvaluator;
use crate::models::{Candidate, Preference};

/// Outcome of one pump call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpResult {
    /// Every assignment at or above the threshold was removed.
    Success,
    /// Some were removed.
    Partial,
    /// None could be removed.
    Fail,
}

/// A single step of a chain: `participant` moves `from` → `to` in one slot.
#[derive(Debug, Clone, Copy)]
struct Move {
    participant: usize,
    from: usize,
    to: usize,
}

/// Augmenting-chain heuristic over one candidate.
#[derive(Debug, Clone, Copy)]
pub struct PreferencePump {
    max_depth: usize,
    timeout: Duration,
}

impl Default for PreferencePump {
    fn default() -> Self {
        Self {
            max_depth: 4,
            timeout: Duration::from_millis(100),
        }
    }
}

impl PreferencePump {
    pub fn new(max_depth: usize, timeout: Duration) -> Self {
        Self { max_depth, timeout }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tries to remove every assignment with preference `>= threshold`.
    ///
    /// A feasible candidate stays feasible.
    pub fn pump<R: Rng + ?Sized>(
        &self,
        evaluator: &FitnessEvaluator,
        candidate: &mut Candidate,
        threshold: Preference,
        rng: &mut R,
    ) -> PumpResult {
        let input = evaluator.input();
        let deadline = Instant::now() + self.timeout;

        let mut violations: Vec<(usize, usize)> = (0..candidate.participant_count())
            .flat_map(|p| (0..candidate.slot_count()).map(move |o| (p, o)))
            .filter(|&(p, o)| input.preference(p, candidate.workshop_of(p, o)) >= threshold)
            .collect();
        if violations.is_empty() {
            return PumpResult::Success;
        }
        if !evaluator.is_feasible(candidate) {
            return PumpResult::Fail;
        }
        violations.shuffle(rng);

        let total = violations.len();
        let mut fixed = 0;
        for (p, ordinal) in violations {
            if Instant::now() >= deadline {
                break;
            }
            let from = candidate.workshop_of(p, ordinal);
            if input.preference(p, from) < threshold || !is_movable(input, p, from) {
                continue;
            }
            let mut chain = Chain {
                evaluator,
                candidate: &*candidate,
                threshold,
                slot: candidate.slot_of(from),
                freed: from,
                counts: candidate.participant_counts(),
                visited: HashSet::from([p]),
                deadline,
            };
            let mut targets = chain.entry_targets(p, from);
            targets.shuffle(rng);

            let mut committed = None;
            for to in targets {
                let Some(mut moves) = chain.make_room(to, self.max_depth, rng) else {
                    continue;
                };
                moves.push(Move {
                    participant: p,
                    from,
                    to,
                });
                let mut scratch = candidate.clone();
                apply(&mut scratch, &moves);
                if evaluator.is_feasible(&scratch) {
                    committed = Some(scratch);
                    break;
                }
            }
            if let Some(scratch) = committed {
                *candidate = scratch;
                fixed += 1;
            }
        }

        if fixed == total {
            PumpResult::Success
        } else if fixed > 0 {
            PumpResult::Partial
        } else {
            PumpResult::Fail
        }
    }
}

fn apply(candidate: &mut Candidate, moves: &[Move]) {
    for m in moves {
        if let Some(ordinal) = candidate.ordinal_of(m.participant, m.from) {
            candidate.set_workshop(m.participant, ordinal, m.to);
        }
    }
}

struct Chain<'a> {
    evaluator: &'a FitnessEvaluator,
    candidate: &'a Candidate,
    threshold: Preference,
    slot: usize,
    freed: usize,
    counts: Vec<usize>,
    visited: HashSet<usize>,
    deadline: Instant,
}

impl Chain<'_> {
    /// Same-slot workshops `p` could move to from `from` without a new
    /// violation.
    fn entry_targets(&self, p: usize, from: usize) -> Vec<usize> {
        let input = self.evaluator.input();
        (0..input.workshop_count())
            .filter(|&w| {
                w != from
                    && self.candidate.slot_of(w) == self.slot
                    && !input.is_dependent(w)
                    && !input.must_avoid(p, w)
                    && input.preference(p, w) < self.threshold
            })
            .collect()
    }

    /// Moves that free one seat in `target`, deepest first.
    fn make_room<R: Rng + ?Sized>(
        &mut self,
        target: usize,
        depth: usize,
        rng: &mut R,
    ) -> Option<Vec<Move>> {
        let input = self.evaluator.input();
        if target == self.freed || self.counts[target] < input.max_participants(target) {
            return Some(Vec::new());
        }
        if depth == 0 || Instant::now() >= self.deadline {
            return None;
        }

        let mut occupants: Vec<usize> = (0..self.candidate.participant_count())
            .filter(|&q| {
                !self.visited.contains(&q)
                    && self.candidate.attends(q, target)
                    && is_movable(input, q, target)
            })
            .collect();
        occupants.shuffle(rng);

        for q in occupants {
            self.visited.insert(q);
            let mut targets = self.entry_targets(q, target);
            targets.shuffle(rng);
            for next in targets {
                if let Some(mut moves) = self.make_room(next, depth - 1, rng) {
                    moves.push(Move {
                        participant: q,
                        from: target,
                        to: next,
                    });
                    return Some(moves);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputDataBuilder, Participant, Workshop};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn evaluator() -> FitnessEvaluator {
        // One slot; A and B hold one seat each, C is the fallback
        let input = InputDataBuilder::new()
            .with_slot("1")
            .with_workshop(Workshop::new("A", 0, 1))
            .with_workshop(Workshop::new("B", 0, 1))
            .with_workshop(Workshop::new("C", 0, 3))
            .with_participant(Participant::new("p0", vec![1, 2, 9]))
            .with_participant(Participant::new("p1", vec![1, 9, 9]))
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
    fn test_direct_move() {
        let eval = evaluator();
        let mut c = assigned(&[2, 0]);
        let mut rng = SmallRng::seed_from_u64(42);
        let result = PreferencePump::default().pump(&eval, &mut c, 5, &mut rng);
        assert_eq!(result, PumpResult::Success);
        assert_eq!(c.workshops_of(0), &[1]);
        assert!(eval.is_feasible(&c));
    }

    #[test]
    fn test_chain_displaces_occupant() {
        let eval = evaluator();
        // p1 wants A, which p0 occupies; p0 can move on to B
        let mut c = assigned(&[0, 2]);
        let mut rng = SmallRng::seed_from_u64(42);
        let result = PreferencePump::default().pump(&eval, &mut c, 5, &mut rng);
        assert_eq!(result, PumpResult::Success);
        assert_eq!(c.workshops_of(0), &[1]);
        assert_eq!(c.workshops_of(1), &[0]);
        assert!(eval.is_feasible(&c));
    }

    #[test]
    fn test_depth_zero_cannot_displace() {
        let eval = evaluator();
        let mut c = assigned(&[0, 2]);
        let mut rng = SmallRng::seed_from_u64(42);
        let result = PreferencePump::default()
            .with_max_depth(0)
            .pump(&eval, &mut c, 5, &mut rng);
        assert_eq!(result, PumpResult::Fail);
        assert_eq!(c, assigned(&[0, 2]));
    }

    #[test]
    fn test_nothing_to_do() {
        let eval = evaluator();
        let mut c = assigned(&[1, 0]);
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(
            PreferencePump::default().pump(&eval, &mut c, 5, &mut rng),
            PumpResult::Success
        );
    }

    #[test]
    fn test_keeps_feasibility_on_partial() {
        let input = InputDataBuilder::new()
            .with_slot("1")
            .with_workshop(Workshop::new("A", 0, 1))
            .with_workshop(Workshop::new("C", 0, 3))
            .with_participant(Participant::new("p0", vec![1, 9]))
            .with_participant(Participant::new("p1", vec![1, 9]))
            .build()
            .unwrap();
        let eval = FitnessEvaluator::new(Arc::new(input), 3.0);
        let mut c = Candidate::with_dimensions(2, 2, 1);
        c.set_workshop(0, 0, 1);
        c.set_workshop(1, 0, 1);
        let mut rng = SmallRng::seed_from_u64(42);
        let result = PreferencePump::default().pump(&eval, &mut c, 5, &mut rng);
        assert_eq!(result, PumpResult::Partial);
        assert!(eval.is_feasible(&c));
        assert_eq!(c.participant_counts(), vec![1, 1]);
    }
}
