//! Feasibility and objective evaluation.
//!
//! # Objective
//!
//! Lexicographic pair `(major, minor)`:
//! - `major`: worst preference any participant is assigned.
//! - `minor`: `Σ (pref + 1)^E / maxPreference^E` over every assignment.
//!
//! Infeasible candidates evaluate to `(+∞, +∞)`.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{
    Candidate, Constraint, InputData, Preference, SequenceKind, Violation, ViolationType,
};

/// Default preference exponent `E`.
pub const DEFAULT_PREFERENCE_EXPONENT: f64 = 3.0;

/// Lexicographic objective value. Lower is better.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fitness {
    /// Worst preference used.
    pub major: f64,
    /// Weighted aggregate dissatisfaction.
    pub minor: f64,
}

impl Fitness {
    /// Value of every infeasible candidate.
    pub const INFEASIBLE: Fitness = Fitness {
        major: f64::INFINITY,
        minor: f64::INFINITY,
    };

    /// Creates a fitness, collapsing non-finite parts to [`Fitness::INFEASIBLE`].
    pub fn new(major: f64, minor: f64) -> Self {
        if major.is_finite() && minor.is_finite() {
            Self { major, minor }
        } else {
            Self::INFEASIBLE
        }
    }

    #[inline]
    pub fn is_feasible(&self) -> bool {
        self.major.is_finite()
    }

    /// Worst preference as a preference value, for feasible fitness.
    pub fn worst_preference(&self) -> Option<Preference> {
        self.is_feasible().then_some(self.major as Preference)
    }
}

impl PartialEq for Fitness {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fitness {}

impl PartialOrd for Fitness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fitness {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .total_cmp(&other.major)
            .then(self.minor.total_cmp(&other.minor))
    }
}

/// Pure `Candidate -> Fitness` evaluator bound to one problem.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    input: Arc<InputData>,
    exponent: f64,
    scaling: f64,
}

impl FitnessEvaluator {
    /// Creates an evaluator with preference exponent `exponent`.
    pub fn new(input: Arc<InputData>, exponent: f64) -> Self {
        let scaling = (input.max_preference().max(1) as f64).powf(exponent);
        Self {
            input,
            exponent,
            scaling,
        }
    }

    pub fn input(&self) -> &InputData {
        &self.input
    }

    /// Shared handle to the problem.
    pub fn input_arc(&self) -> &Arc<InputData> {
        &self.input
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    #[inline]
    pub fn is_feasible(&self, candidate: &Candidate) -> bool {
        is_feasible(&self.input, candidate)
    }

    /// Feasibility check followed by the objective.
    pub fn evaluate(&self, candidate: &Candidate) -> Fitness {
        if !self.is_feasible(candidate) {
            return Fitness::INFEASIBLE;
        }
        self.objective(candidate)
    }

    /// Objective without the feasibility check.
    pub fn objective(&self, candidate: &Candidate) -> Fitness {
        let mut worst: Preference = 0;
        let mut sum = 0.0;
        for p in 0..candidate.participant_count() {
            for &w in candidate.workshops_of(p) {
                let pref = self.input.preference(p, w);
                worst = worst.max(pref);
                sum += (pref as f64 + 1.0).powf(self.exponent);
            }
        }
        Fitness::new(worst as f64, sum / self.scaling)
    }

    /// Worst preference used, ignoring feasibility.
    pub fn worst_preference(&self, candidate: &Candidate) -> Preference {
        (0..candidate.participant_count())
            .flat_map(|p| {
                candidate
                    .workshops_of(p)
                    .iter()
                    .map(move |&w| self.input.preference(p, w))
            })
            .max()
            .unwrap_or(0)
    }
}

/// Whether a constraint holds on a complete candidate.
pub fn constraint_holds(candidate: &Candidate, constraint: &Constraint) -> bool {
    match *constraint {
        Constraint::FixedValue { workshop, slot } => candidate.slot_of(workshop) == slot,
        Constraint::ForbiddenValue { workshop, slot } => candidate.slot_of(workshop) != slot,
        Constraint::Equals { first, second } => candidate.slot_of(first) == candidate.slot_of(second),
        Constraint::NotEquals { first, second } => {
            candidate.slot_of(first) != candidate.slot_of(second)
        }
        Constraint::Offset {
            first,
            second,
            offset,
        } => candidate.slot_of(second) as i64 == candidate.slot_of(first) as i64 + offset as i64,
        Constraint::Contains {
            participant,
            workshop,
        } => candidate.attends(participant, workshop),
        Constraint::NotContains {
            participant,
            workshop,
        } => !candidate.attends(participant, workshop),
        Constraint::SequenceEquals {
            kind: SequenceKind::ParticipantWorkshops,
            first,
            second,
        } => {
            let mut a = candidate.workshops_of(first).to_vec();
            let mut b = candidate.workshops_of(second).to_vec();
            a.sort_unstable();
            b.sort_unstable();
            a == b
        }
        Constraint::SequenceEquals {
            kind: SequenceKind::WorkshopParticipants,
            first,
            second,
        } => (0..candidate.participant_count())
            .all(|p| candidate.attends(p, first) == candidate.attends(p, second)),
    }
}

/// Full feasibility predicate: indices, one workshop per slot in canonical
/// order, capacities, and every constraint.
pub fn is_feasible(input: &InputData, candidate: &Candidate) -> bool {
    let slots = input.slot_count();
    let workshops = input.workshop_count();
    if (0..workshops).any(|w| candidate.slot_of(w) >= slots) {
        return false;
    }

    // Canonical order: ordinal `s` holds the slot-`s` workshop
    let mut counts = vec![0usize; workshops];
    for p in 0..input.participant_count() {
        for (ordinal, &w) in candidate.workshops_of(p).iter().enumerate() {
            if w >= workshops || candidate.slot_of(w) != ordinal {
                return false;
            }
            counts[w] += 1;
        }
    }

    let capacity_ok = (0..workshops).all(|w| {
        counts[w] >= input.min_participants(w) && counts[w] <= input.max_participants(w)
    });
    capacity_ok
        && input
            .scheduling_constraints()
            .iter()
            .chain(input.assignment_constraints())
            .all(|c| constraint_holds(candidate, c))
}

/// Every broken invariant of a candidate, for reporting.
pub fn find_violations(input: &InputData, candidate: &Candidate) -> Vec<Violation> {
    let mut violations = Vec::new();
    let slots = input.slot_count();
    let workshops = input.workshop_count();

    for w in 0..workshops {
        if candidate.slot_of(w) >= slots {
            violations.push(Violation::new(
                ViolationType::InvalidIndex,
                &input.workshop(w).name,
                format!("Workshop scheduled in unknown slot #{}", candidate.slot_of(w)),
            ));
        }
    }
    if !violations.is_empty() {
        return violations;
    }

    let mut counts = vec![0usize; workshops];
    for p in 0..input.participant_count() {
        let name = &input.participant(p).name;
        for (ordinal, &w) in candidate.workshops_of(p).iter().enumerate() {
            if w >= workshops {
                violations.push(Violation::new(
                    ViolationType::InvalidIndex,
                    name,
                    format!("Assigned to unknown workshop #{w}"),
                ));
                continue;
            }
            counts[w] += 1;
            let s = candidate.slot_of(w);
            if s != ordinal {
                violations.push(Violation::new(
                    ViolationType::SlotConflict,
                    name,
                    format!(
                        "Attends '{}' of slot '{}' in place of slot '{}'",
                        input.workshop(w).name,
                        input.slots()[s],
                        input.slots()[ordinal]
                    ),
                ));
            }
        }
    }

    for w in 0..workshops {
        let ws = input.workshop(w);
        if counts[w] < ws.min_participants {
            violations.push(Violation::new(
                ViolationType::BelowMinimum,
                &ws.name,
                format!("{} participants, minimum is {}", counts[w], ws.min_participants),
            ));
        }
        if counts[w] > ws.max_participants {
            violations.push(Violation::new(
                ViolationType::CapacityExceeded,
                &ws.name,
                format!("{} participants, maximum is {}", counts[w], ws.max_participants),
            ));
        }
    }

    let all_in_range = violations
        .iter()
        .all(|v| v.violation_type != ViolationType::InvalidIndex);
    if all_in_range {
        for c in input
            .scheduling_constraints()
            .iter()
            .chain(input.assignment_constraints())
        {
            if !constraint_holds(candidate, c) {
                violations.push(Violation::new(
                    ViolationType::ConstraintViolated,
                    "constraint",
                    format!("{c:?} does not hold"),
                ));
            }
        }
    }

    violations
}
