//! Randomized backtracking search for workshop schedulings.
//!
//! # Algorithm
//!
//! 1. Order workshops most-constrained first, ties broken randomly.
//! 2. At each depth compute the workshop's slot domain by composing the
//!    explicit constraint filter, the capacity-impossibility filter and the
//!    critical-set filter.
//! 3. Critical slots (a slot that cannot reach the participant count
//!    without this workshop) restrict the domain: exactly one forces it,
//!    more than one prunes the branch.
//! 4. Remaining slots are tried emptiest first, ties broken randomly.
//! 5. On domain exhaustion pop the decision stack; fail when it underflows
//!    or the cancellation token trips.
//!
//! [`SchedulingStream`] repeats the search lazily and relaxes the preference
//! ceiling after repeated failures.
//!
//! # Reference
//! Haralick & Elliott (1980), "Increasing tree search efficiency for
//! constraint satisfaction problems"

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::critical::{CriticalSet, CriticalSetAnalysis};
use crate::models::{Constraint, InputData, Preference, Scheduling};
use crate::termination::Cancellation;

/// Consecutive failed searches before the stream relaxes its ceiling.
const FAILURES_BEFORE_RELAXING: usize = 4;

struct Frame {
    workshop: usize,
    options: Vec<usize>,
    next: usize,
}

/// Backtracking producer of complete schedulings.
#[derive(Debug, Clone)]
pub struct BacktrackingScheduler {
    input: Arc<InputData>,
    analysis: Option<Arc<CriticalSetAnalysis>>,
    ceiling: Option<Preference>,
    critical: Vec<CriticalSet>,
    sets_of: Vec<Vec<usize>>,
    search_timeout: Option<Duration>,
    cancel: Cancellation,
}

impl BacktrackingScheduler {
    /// Scheduler without critical-set pruning.
    pub fn new(input: Arc<InputData>) -> Self {
        let workshops = input.workshop_count();
        Self {
            input,
            analysis: None,
            ceiling: None,
            critical: Vec::new(),
            sets_of: vec![Vec::new(); workshops],
            search_timeout: None,
            cancel: Cancellation::never(),
        }
    }

    /// Prunes with `analysis`, starting at its preference bound.
    pub fn with_analysis(mut self, analysis: Arc<CriticalSetAnalysis>) -> Self {
        let bound = analysis.preference_bound();
        self.analysis = Some(analysis);
        self.set_ceiling(bound);
        self
    }

    /// Overrides the preference ceiling the critical sets are taken for.
    pub fn with_ceiling(mut self, ceiling: Preference) -> Self {
        self.set_ceiling(Some(ceiling));
        self
    }

    /// Limits every single search call.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn ceiling(&self) -> Option<Preference> {
        self.ceiling
    }

    fn set_ceiling(&mut self, ceiling: Option<Preference>) {
        self.ceiling = ceiling;
        self.critical = match (&self.analysis, ceiling) {
            (Some(analysis), Some(level)) => {
                analysis.for_preference(level).into_iter().cloned().collect()
            }
            _ => Vec::new(),
        };
        self.sets_of = vec![Vec::new(); self.input.workshop_count()];
        for (i, set) in self.critical.iter().enumerate() {
            for &w in &set.workshops {
                self.sets_of[w].push(i);
            }
        }
    }

    /// One randomized search.
    pub fn search<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Scheduling> {
        let input = &*self.input;
        let workshops = input.workshop_count();
        let deadline = self
            .search_timeout
            .map(|t| self.cancel.deadline_within(t));
        let order = self.variable_order(rng);

        let mut scheduling = Scheduling::new(workshops);
        if workshops == 0 {
            return Some(scheduling);
        }
        let mut stack: Vec<Frame> = Vec::with_capacity(workshops);
        let options = self.domain(&scheduling, order[0], rng);
        stack.push(Frame {
            workshop: order[0],
            options,
            next: 0,
        });

        let mut steps: u64 = 0;
        loop {
            if self.cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                debug!("Backtracking interrupted after {steps} steps");
                return None;
            }
            steps += 1;

            let Some(frame) = stack.last_mut() else {
                debug!("Backtracking exhausted after {steps} steps");
                return None;
            };
            if frame.next < frame.options.len() {
                let slot = frame.options[frame.next];
                frame.next += 1;
                scheduling.assign(frame.workshop, slot);
                let depth = stack.len();
                if depth == workshops {
                    return Some(scheduling);
                }
                let w = order[depth];
                let options = self.domain(&scheduling, w, rng);
                stack.push(Frame {
                    workshop: w,
                    options,
                    next: 0,
                });
            } else {
                scheduling.unassign(frame.workshop);
                stack.pop();
            }
        }
    }

    /// Lazy, unbounded sequence of schedulings.
    pub fn stream<R: Rng>(self, rng: R) -> SchedulingStream<R> {
        let relax_levels = match (&self.analysis, self.ceiling) {
            (Some(_), Some(ceiling)) => self
                .input
                .preference_levels()
                .iter()
                .copied()
                .filter(|&l| l > ceiling)
                .collect(),
            _ => Vec::new(),
        };
        SchedulingStream {
            scheduler: self,
            rng,
            relax_levels,
            failures: 0,
        }
    }

    fn variable_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let input = &*self.input;
        let mut order: Vec<usize> = (0..input.workshop_count()).collect();
        order.shuffle(rng);
        order.sort_by_key(|&w| {
            let constraints = input.scheduling_constraints_of(w).count();
            std::cmp::Reverse((constraints, self.sets_of[w].len(), input.min_participants(w)))
        });
        order
    }

    /// Feasible slots for `w`, in trial order.
    fn domain<R: Rng + ?Sized>(&self, scheduling: &Scheduling, w: usize, rng: &mut R) -> Vec<usize> {
        let input = &*self.input;
        let slots = input.slot_count();
        let participants = input.participant_count();

        let capacity = scheduling.capacity_by_slot(input);
        let undecided_max: usize = scheduling
            .undecided()
            .map(|u| input.max_participants(u))
            .sum();
        let others_max = undecided_max - input.max_participants(w);

        let critical: Vec<usize> = (0..slots)
            .filter(|&s| participants.saturating_sub(capacity[s].1) > others_max)
            .collect();
        if critical.len() > 1 {
            return Vec::new();
        }

        let mut trial = scheduling.clone();
        let mut options: Vec<usize> = (0..slots)
            .filter(|&s| critical.is_empty() || critical[0] == s)
            .filter(|&s| {
                input
                    .scheduling_constraints_of(w)
                    .all(|c| slot_allowed(c, w, s, scheduling, slots))
            })
            .filter(|&s| {
                trial.assign(w, s);
                trial.is_capacity_feasible(input) && self.covers_critical_sets(&trial, w)
            })
            .collect();

        options.shuffle(rng);
        options.sort_by_key(|&s| capacity[s].1);
        options
    }

    /// Every critical set containing `w` can still span all slots.
    fn covers_critical_sets(&self, scheduling: &Scheduling, w: usize) -> bool {
        let slots = self.input.slot_count();
        let mut seen = vec![false; slots];
        self.sets_of[w].iter().all(|&i| {
            seen.iter_mut().for_each(|x| *x = false);
            let mut covered = 0;
            let mut undecided = 0;
            for &member in &self.critical[i].workshops {
                match scheduling.slot_of(member) {
                    Some(s) if !seen[s] => {
                        seen[s] = true;
                        covered += 1;
                    }
                    Some(_) => {}
                    None => undecided += 1,
                }
            }
            covered + undecided >= slots
        })
    }
}

/// Whether placing `w` in `slot` keeps `constraint` satisfiable.
pub(crate) fn slot_allowed(
    constraint: &Constraint,
    w: usize,
    slot: usize,
    scheduling: &Scheduling,
    slots: usize,
) -> bool {
    match *constraint {
        Constraint::FixedValue { workshop, slot: fixed } => workshop != w || slot == fixed,
        Constraint::ForbiddenValue {
            workshop,
            slot: forbidden,
        } => workshop != w || slot != forbidden,
        Constraint::Equals { first, second } => {
            let other = if first == w { second } else { first };
            scheduling.slot_of(other).map_or(true, |o| o == slot)
        }
        Constraint::NotEquals { first, second } => {
            let other = if first == w { second } else { first };
            scheduling.slot_of(other).map_or(true, |o| o != slot)
        }
        Constraint::Offset {
            first,
            second,
            offset,
        } => {
            let (other, target) = if first == w {
                (second, slot as i64 + offset as i64)
            } else {
                (first, slot as i64 - offset as i64)
            };
            if target < 0 || target >= slots as i64 {
                return false;
            }
            scheduling
                .slot_of(other)
                .map_or(true, |o| o as i64 == target)
        }
        _ => true,
    }
}

/// Iterator over schedulings from repeated randomized searches.
pub struct SchedulingStream<R> {
    scheduler: BacktrackingScheduler,
    rng: R,
    relax_levels: Vec<Preference>,
    failures: usize,
}

impl<R: Rng> SchedulingStream<R> {
    /// Ceiling currently used for pruning.
    pub fn ceiling(&self) -> Option<Preference> {
        self.scheduler.ceiling()
    }
}

impl<R: Rng> Iterator for SchedulingStream<R> {
    type Item = Scheduling;

    fn next(&mut self) -> Option<Scheduling> {
        loop {
            if self.scheduler.cancel.is_cancelled() {
                return None;
            }
            if let Some(scheduling) = self.scheduler.search(&mut self.rng) {
                self.failures = 0;
                return Some(scheduling);
            }
            self.failures += 1;
            if self.failures < FAILURES_BEFORE_RELAXING {
                continue;
            }
            self.failures = 0;
            if self.relax_levels.is_empty() {
                if self.scheduler.ceiling.is_none() {
                    return None;
                }
                debug!("Dropping critical-set pruning after repeated failures");
                self.scheduler.set_ceiling(None);
            } else {
                let next = self.relax_levels.remove(0);
                debug!("Relaxing scheduling ceiling to {next}");
                self.scheduler.set_ceiling(Some(next));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputDataBuilder, Participant, Workshop};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn spread_input() -> Arc<InputData> {
        Arc::new(
            InputDataBuilder::new()
                .with_slot("1")
                .with_slot("2")
                .with_workshop(Workshop::new("A", 2, 2))
                .with_workshop(Workshop::new("B", 2, 2))
                .with_workshop(Workshop::new("C", 2, 2))
                .with_workshop(Workshop::new("D", 2, 2))
                .with_participant(Participant::new("p0", vec![1, 2, 3, 4]))
                .with_participant(Participant::new("p1", vec![2, 1, 4, 3]))
                .with_participant(Participant::new("p2", vec![3, 4, 1, 2]))
                .with_participant(Participant::new("p3", vec![4, 3, 2, 1]))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_finds_capacity_feasible_scheduling() {
        let input = spread_input();
        let scheduler = BacktrackingScheduler::new(input.clone());
        let mut rng = SmallRng::seed_from_u64(42);
        let scheduling = scheduler.search(&mut rng).unwrap();
        assert!(scheduling.is_complete());
        assert!(scheduling.is_capacity_feasible(&input));
        assert_eq!(scheduling.capacity_by_slot(&input), vec![(4, 4), (4, 4)]);
    }

    #[test]
    fn test_honors_scheduling_constraints() {
        let input = Arc::new(
            InputDataBuilder::new()
                .with_slot("1")
                .with_slot("2")
                .with_slot("3")
                .with_workshop(Workshop::new("A", 0, 3))
                .with_workshop(Workshop::new("B", 0, 3))
                .with_workshop(Workshop::new("C", 0, 3))
                .with_workshop(Workshop::new("D", 0, 3))
                .with_participant(Participant::new("p0", vec![1, 1, 1, 1]))
                .with_constraint(Constraint::fixed(0, 2))
                .with_constraint(Constraint::offset(1, 2, 1))
                .with_constraint(Constraint::different_slot(3, 0))
                .build()
                .unwrap(),
        );
        let scheduler = BacktrackingScheduler::new(input);
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10 {
            let s = scheduler.search(&mut rng).unwrap();
            assert_eq!(s.slot_of(0), Some(2));
            assert_eq!(s.slot_of(2).unwrap(), s.slot_of(1).unwrap() + 1);
            assert_ne!(s.slot_of(3), Some(2));
        }
    }

    #[test]
    fn test_infeasible_capacity_exhausts() {
        let input = Arc::new(
            InputDataBuilder::new()
                .with_slot("1")
                .with_slot("2")
                .with_workshop(Workshop::new("A", 2, 2))
                .with_workshop(Workshop::new("B", 2, 2))
                .with_workshop(Workshop::new("C", 2, 2))
                .with_participant(Participant::new("p0", vec![1, 1, 1]))
                .with_participant(Participant::new("p1", vec![1, 1, 1]))
                .with_participant(Participant::new("p2", vec![1, 1, 1]))
                .with_participant(Participant::new("p3", vec![1, 1, 1]))
                .build()
                .unwrap(),
        );
        let scheduler = BacktrackingScheduler::new(input);
        let mut rng = SmallRng::seed_from_u64(42);
        assert!(scheduler.search(&mut rng).is_none());
    }

    #[test]
    fn test_critical_sets_prune() {
        // p0 only accepts A and B at ceiling 1, so they must be apart
        let input = Arc::new(
            InputDataBuilder::new()
                .with_slot("1")
                .with_slot("2")
                .with_workshop(Workshop::new("A", 0, 4))
                .with_workshop(Workshop::new("B", 0, 4))
                .with_workshop(Workshop::new("C", 0, 4))
                .with_participant(Participant::new("p0", vec![1, 1, 5]))
                .build()
                .unwrap(),
        );
        let analysis = Arc::new(CriticalSetAnalysis::new(&input));
        assert_eq!(analysis.preference_bound(), Some(1));
        let scheduler = BacktrackingScheduler::new(input).with_analysis(analysis);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..10 {
            let s = scheduler.search(&mut rng).unwrap();
            assert_ne!(s.slot_of(0), s.slot_of(1));
        }
    }

    #[test]
    fn test_stream_yields_and_stops_on_cancel() {
        let cancel = Cancellation::never();
        let scheduler = BacktrackingScheduler::new(spread_input()).with_cancellation(cancel.clone());
        let mut stream = scheduler.stream(SmallRng::seed_from_u64(42));
        assert!(stream.next().is_some());
        assert!(stream.next().is_some());
        cancel.cancel();
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_slot_allowed_offset_range() {
        let s = Scheduling::new(2);
        let c = Constraint::offset(0, 1, 1);
        assert!(slot_allowed(&c, 0, 0, &s, 2));
        assert!(!slot_allowed(&c, 0, 1, &s, 2));
        assert!(!slot_allowed(&c, 1, 0, &s, 2));
        assert!(slot_allowed(&c, 1, 1, &s, 2));
    }
}
