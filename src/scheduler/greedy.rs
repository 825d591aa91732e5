//! Greedy construction of complete candidates.
//!
//! # Algorithm
//!
//! 1. Shuffle workshops (constrained ones first) and place each into the
//!    emptiest slot that stays capacity-feasible, honoring scheduling
//!    constraints against already placed workshops where possible.
//! 2. Pre-place required attendances (conductors, `Contains`).
//! 3. Visit participants in random order and give each free slot the most
//!    preferred workshop with room left.
//! 4. Repair workshops below their minimum by pulling participants over
//!    from same-slot workshops that can spare them, cheapest first.
//!
//! Participants bound by a workshop-set equality move as one unit, and a
//! dependent workshop group is entered or left as a whole.
//!
//! # Complexity
//! O(P · S · W) for the assignment, plus O(W · P · S) per repair round.

use std::cmp::Reverse;
use std::sync::Arc;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::slot_allowed;
use crate::fitness::is_feasible;
use crate::models::{Candidate, Constraint, InputData, Scheduling, SequenceKind, UnionFind};

/// Fast randomized producer of feasible candidates.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rand::{rngs::SmallRng, SeedableRng};
/// use u_workshop::models::{InputDataBuilder, Participant, Workshop};
/// use u_workshop::scheduler::GreedySolver;
///
/// let input = InputDataBuilder::new()
///     .with_slot("Morning")
///     .with_workshop(Workshop::new("Pottery", 1, 2))
///     .with_workshop(Workshop::new("Painting", 1, 2))
///     .with_participant(Participant::new("Ann", vec![0, 1]))
///     .with_participant(Participant::new("Bob", vec![1, 0]))
///     .build()
///     .unwrap();
///
/// let solver = GreedySolver::new(Arc::new(input));
/// let candidate = solver.solve(&mut SmallRng::seed_from_u64(42)).unwrap();
/// assert_eq!(candidate.workshops_of(0), &[0]);
/// ```
#[derive(Debug, Clone)]
pub struct GreedySolver {
    input: Arc<InputData>,
    units: Vec<Vec<usize>>,
}

impl GreedySolver {
    /// Creates a solver for `input`.
    pub fn new(input: Arc<InputData>) -> Self {
        let mut uf = UnionFind::new(input.participant_count());
        for c in input.assignment_constraints() {
            if let Constraint::SequenceEquals {
                kind: SequenceKind::ParticipantWorkshops,
                first,
                second,
            } = *c
            {
                uf.union(first, second);
            }
        }
        Self {
            units: uf.groups(),
            input,
        }
    }

    pub fn input(&self) -> &InputData {
        &self.input
    }

    /// Scheduling followed by assignment.
    pub fn solve<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Candidate> {
        let scheduling = self.schedule(rng)?;
        self.assign(&scheduling, rng)
    }

    /// Places every workshop into a slot.
    ///
    /// Returns `None` when some workshop fits no slot capacity-wise.
    pub fn schedule<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Scheduling> {
        let input = &*self.input;
        let slots = input.slot_count();
        let participants = input.participant_count();

        let mut order: Vec<usize> = (0..input.workshop_count()).collect();
        order.shuffle(rng);
        order.sort_by_key(|&w| Reverse(input.scheduling_constraints_of(w).next().is_some()));

        let mut scheduling = Scheduling::new(input.workshop_count());
        for &w in &order {
            let capacity = scheduling.capacity_by_slot(input);
            let mut candidates: Vec<usize> = (0..slots).collect();
            candidates.shuffle(rng);
            candidates.sort_by_key(|&s| {
                (
                    Reverse(participants.saturating_sub(capacity[s].1)),
                    capacity[s].0,
                )
            });

            let constrained = candidates.iter().copied().find(|&s| {
                input
                    .scheduling_constraints_of(w)
                    .all(|c| slot_allowed(c, w, s, &scheduling, slots))
                    && fits(&scheduling, input, w, s)
            });
            let Some(slot) =
                constrained.or_else(|| candidates.iter().copied().find(|&s| fits(&scheduling, input, w, s)))
            else {
                debug!("Greedy scheduling found no slot for workshop #{w}");
                return None;
            };
            scheduling.assign(w, slot);
        }
        Some(scheduling)
    }

    /// Assigns participants on top of a complete scheduling.
    ///
    /// Returns `None` unless the resulting candidate is feasible.
    pub fn assign<R: Rng + ?Sized>(
        &self,
        scheduling: &Scheduling,
        rng: &mut R,
    ) -> Option<Candidate> {
        let input = &*self.input;
        let slot_of: Vec<usize> = (0..input.workshop_count())
            .map(|w| scheduling.slot_of(w))
            .collect::<Option<_>>()?;
        let mut state = AssignState::new(input, slot_of);

        for unit in &self.units {
            for &p in unit {
                for c in input.assignment_constraints_of_participant(p) {
                    if let Constraint::Contains {
                        participant,
                        workshop,
                    } = *c
                    {
                        if participant == p && !state.require(unit, workshop) {
                            debug!("Greedy assignment: conflicting requirements for participant #{p}");
                            return None;
                        }
                    }
                }
            }
        }

        let mut units: Vec<&Vec<usize>> = self.units.iter().collect();
        units.shuffle(rng);
        let mut free: Vec<usize> = Vec::with_capacity(input.slot_count());
        for unit in units {
            loop {
                free.clear();
                free.extend((0..input.slot_count()).filter(|&s| state.rows[unit[0]][s].is_none()));
                if free.is_empty() {
                    break;
                }
                free.shuffle(rng);
                // Fewest enterable workshops first
                let Some((s, mut options)) = free
                    .iter()
                    .map(|&s| {
                        let options: Vec<usize> = state.by_slot[s]
                            .iter()
                            .copied()
                            .filter(|&w| state.can_enter(unit, w))
                            .collect();
                        (s, options)
                    })
                    .min_by_key(|(_, options)| options.len())
                else {
                    break;
                };
                options.shuffle(rng);
                let best = options.into_iter().min_by_key(|&w| {
                    let cost: u64 = input
                        .group_members(w)
                        .iter()
                        .flat_map(|&m| unit.iter().map(move |&p| input.preference(p, m) as u64))
                        .sum();
                    let missing = input.min_participants(w).saturating_sub(state.counts[w]);
                    (cost, Reverse(missing))
                });
                let Some(w) = best else {
                    debug!("Greedy assignment: no workshop with room in slot #{s}");
                    return None;
                };
                state.enter(unit, w);
            }
        }

        state.repair(&self.units, rng);

        let candidate = state.into_candidate()?;
        if is_feasible(input, &candidate) {
            Some(candidate)
        } else {
            debug!("Greedy candidate rejected by the feasibility check");
            None
        }
    }
}

fn fits(scheduling: &Scheduling, input: &InputData, w: usize, slot: usize) -> bool {
    let mut trial = scheduling.clone();
    trial.assign(w, slot);
    trial.is_capacity_feasible(input)
}

struct AssignState<'a> {
    input: &'a InputData,
    slot_of: Vec<usize>,
    by_slot: Vec<Vec<usize>>,
    rows: Vec<Vec<Option<usize>>>,
    counts: Vec<usize>,
}

impl<'a> AssignState<'a> {
    fn new(input: &'a InputData, slot_of: Vec<usize>) -> Self {
        let mut by_slot = vec![Vec::new(); input.slot_count()];
        for (w, &s) in slot_of.iter().enumerate() {
            by_slot[s].push(w);
        }
        Self {
            input,
            slot_of,
            by_slot,
            rows: vec![vec![None; input.slot_count()]; input.participant_count()],
            counts: vec![0; input.workshop_count()],
        }
    }

    /// Pre-places `unit` into `w`'s group. `false` on a slot clash.
    fn require(&mut self, unit: &[usize], w: usize) -> bool {
        for &m in self.input.group_members(w) {
            let s = self.slot_of[m];
            match self.rows[unit[0]][s] {
                Some(x) if x == m => {}
                Some(_) => return false,
                None => self.put(unit, m),
            }
        }
        true
    }

    fn can_enter(&self, unit: &[usize], w: usize) -> bool {
        self.input.group_members(w).iter().all(|&m| {
            self.rows[unit[0]][self.slot_of[m]].is_none()
                && self.counts[m] + unit.len() <= self.input.max_participants(m)
                && unit.iter().all(|&p| !self.input.must_avoid(p, m))
        })
    }

    fn enter(&mut self, unit: &[usize], w: usize) {
        for &m in self.input.group_members(w) {
            self.put(unit, m);
        }
    }

    fn put(&mut self, unit: &[usize], w: usize) {
        let s = self.slot_of[w];
        for &p in unit {
            self.rows[p][s] = Some(w);
        }
        self.counts[w] += unit.len();
    }

    /// Cost of moving `unit` into `w`'s group, `None` if not allowed.
    fn move_cost(&self, unit: &[usize], w: usize) -> Option<i64> {
        let input = self.input;
        let k = unit.len();
        let mut cost = 0i64;
        for &m in input.group_members(w) {
            let x = self.rows[unit[0]][self.slot_of[m]]?;
            let leavable = x != m
                && !input.is_dependent(x)
                && self.counts[x] >= input.min_participants(x) + k
                && self.counts[m] + k <= input.max_participants(m)
                && unit
                    .iter()
                    .all(|&p| !input.must_attend(p, x) && !input.must_avoid(p, m));
            if !leavable {
                return None;
            }
            for &p in unit {
                cost += input.preference(p, m) as i64 - input.preference(p, x) as i64;
            }
        }
        Some(cost)
    }

    fn move_into(&mut self, unit: &[usize], w: usize) {
        for &m in self.input.group_members(w) {
            let s = self.slot_of[m];
            if let Some(x) = self.rows[unit[0]][s] {
                self.counts[x] -= unit.len();
            }
            self.put(unit, m);
        }
    }

    /// Fills workshops below their minimum from same-slot surplus.
    fn repair<R: Rng + ?Sized>(&mut self, units: &[Vec<usize>], rng: &mut R) {
        let mut order: Vec<usize> = (0..self.input.workshop_count()).collect();
        order.shuffle(rng);
        for w in order {
            while self.counts[w] < self.input.min_participants(w) {
                let best = units
                    .iter()
                    .filter_map(|u| self.move_cost(u, w).map(|c| (c, u)))
                    .min_by_key(|(c, _)| *c);
                match best {
                    Some((_, unit)) => self.move_into(unit, w),
                    None => break,
                }
            }
        }
    }

    fn into_candidate(self) -> Option<Candidate> {
        let input = self.input;
        let mut candidate = Candidate::new(input);
        for (w, &s) in self.slot_of.iter().enumerate() {
            candidate.set_slot(w, s);
        }
        for (p, row) in self.rows.iter().enumerate() {
            for (s, w) in row.iter().enumerate() {
                candidate.set_workshop(p, s, (*w)?);
            }
        }
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::FitnessEvaluator;
    use crate::models::{Participant, Workshop, InputDataBuilder};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn four_participants(workshops: &[(&str, usize, usize)], prefs: [Vec<u32>; 4]) -> Arc<InputData> {
        let mut builder = InputDataBuilder::new().with_slot("1").with_slot("2");
        for &(name, min, max) in workshops {
            builder = builder.with_workshop(Workshop::new(name, min, max));
        }
        for (i, p) in prefs.into_iter().enumerate() {
            builder = builder.with_participant(Participant::new(format!("p{i}"), p));
        }
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_infeasible_capacity() {
        let input = four_participants(
            &[("A", 2, 2), ("B", 2, 2), ("C", 2, 2)],
            [vec![1, 2, 3], vec![1, 2, 3], vec![3, 2, 1], vec![3, 2, 1]],
        );
        let solver = GreedySolver::new(input);
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10 {
            assert!(solver.schedule(&mut rng).is_none());
            assert!(solver.solve(&mut rng).is_none());
        }
    }

    #[test]
    fn test_feasible_spread() {
        let input = four_participants(
            &[("A", 2, 2), ("B", 2, 2), ("C", 2, 2), ("D", 2, 2)],
            [
                vec![1, 2, 3, 4],
                vec![2, 1, 4, 3],
                vec![3, 4, 1, 2],
                vec![4, 3, 2, 1],
            ],
        );
        let solver = GreedySolver::new(input.clone());
        let evaluator = FitnessEvaluator::new(input.clone(), 3.0);
        let mut rng = SmallRng::seed_from_u64(42);
        let candidate = solver.solve(&mut rng).unwrap();

        assert!(evaluator.is_feasible(&candidate));
        assert!(candidate.participant_counts().iter().all(|&n| n == 2));
        for p in 0..4 {
            let mut slots: Vec<usize> = candidate
                .workshops_of(p)
                .iter()
                .map(|&w| candidate.slot_of(w))
                .collect();
            slots.sort_unstable();
            assert_eq!(slots, vec![0, 1]);
        }
        let fitness = evaluator.evaluate(&candidate);
        assert_eq!(fitness.major, evaluator.worst_preference(&candidate) as f64);
    }

    #[test]
    fn test_conductors_and_exclusions() {
        let input = Arc::new(
            InputDataBuilder::new()
                .with_slot("1")
                .with_slot("2")
                .with_workshop(Workshop::new("A", 1, 3).with_conductor(0))
                .with_workshop(Workshop::new("B", 1, 3))
                .with_workshop(Workshop::new("C", 1, 3))
                .with_workshop(Workshop::new("D", 1, 3))
                .with_participant(Participant::new("p0", vec![5, 1, 1, 1]))
                .with_participant(Participant::new("p1", vec![1, 2, 3, 4]))
                .with_participant(Participant::new("p2", vec![1, 2, 3, 4]))
                .with_constraint(Constraint::avoids(1, 1))
                .build()
                .unwrap(),
        );
        let solver = GreedySolver::new(input);
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10 {
            if let Some(c) = solver.solve(&mut rng) {
                assert!(c.attends(0, 0));
                assert!(!c.attends(1, 1));
            }
        }
    }

    #[test]
    fn test_series_and_same_workshops() {
        let input = Arc::new(
            InputDataBuilder::new()
                .with_slot("1")
                .with_slot("2")
                .with_workshop(Workshop::new("Part 1", 0, 4).with_continuation(1))
                .with_workshop(Workshop::new("Part 2", 0, 4))
                .with_workshop(Workshop::new("X", 0, 4))
                .with_workshop(Workshop::new("Y", 0, 4))
                .with_participant(Participant::new("p0", vec![1, 1, 2, 2]))
                .with_participant(Participant::new("p1", vec![2, 2, 1, 1]))
                .with_participant(Participant::new("p2", vec![2, 2, 1, 1]))
                .with_constraint(Constraint::same_workshops(0, 1))
                .build()
                .unwrap(),
        );
        let solver = GreedySolver::new(input.clone());
        let mut rng = SmallRng::seed_from_u64(42);
        let c = solver.solve(&mut rng).unwrap();
        assert!(is_feasible(&input, &c));
        assert_eq!(c.slot_of(1), c.slot_of(0) + 1);
        assert_eq!(c.attends(0, 0), c.attends(0, 1));
        assert_eq!(c.workshops_of(0), c.workshops_of(1));
    }

    #[test]
    fn test_repair_fills_minimum() {
        // Everybody prefers A, but B needs two participants
        let mut builder = InputDataBuilder::new()
            .with_slot("only")
            .with_workshop(Workshop::new("A", 0, 4))
            .with_workshop(Workshop::new("B", 2, 4));
        for i in 0..4 {
            builder = builder.with_participant(Participant::new(format!("p{i}"), vec![1, 2]));
        }
        let input = Arc::new(builder.build().unwrap());
        let solver = GreedySolver::new(input.clone());
        let mut rng = SmallRng::seed_from_u64(42);
        let c = solver.solve(&mut rng).unwrap();
        assert_eq!(c.participant_counts(), vec![2, 2]);
    }
}
