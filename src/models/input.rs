//! Immutable, validated problem model.
//!
//! [`InputData`] is built once per run through [`InputDataBuilder`] and shared
//! read-only by every solver component. Construction folds conductor and
//! multi-part series requirements into generated constraints, checks the
//! constraint set for contradictions, and pre-merges preferences and
//! capacities across dependent workshop groups.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Constraint, Participant, Preference, SequenceKind, UnionFind, Workshop};
use crate::error::InputError;
use crate::validation::validate_input;

/// Name of the slot injected when the input defines none.
pub const DEFAULT_SLOT: &str = "default";

/// Builder for [`InputData`].
///
/// # Example
/// ```
/// use u_workshop::models::{InputDataBuilder, Participant, Workshop};
///
/// let input = InputDataBuilder::new()
///     .with_slot("Morning")
///     .with_workshop(Workshop::new("Pottery", 1, 2))
///     .with_participant(Participant::new("Ann", vec![0]))
///     .build()
///     .unwrap();
/// assert_eq!(input.slot_count(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputDataBuilder {
    workshops: Vec<Workshop>,
    participants: Vec<Participant>,
    slots: Vec<String>,
    constraints: Vec<Constraint>,
}

impl InputDataBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slot.
    pub fn with_slot(mut self, name: impl Into<String>) -> Self {
        self.slots.push(name.into());
        self
    }

    /// Adds a workshop.
    pub fn with_workshop(mut self, workshop: Workshop) -> Self {
        self.workshops.push(workshop);
        self
    }

    /// Adds a participant.
    pub fn with_participant(mut self, participant: Participant) -> Self {
        self.participants.push(participant);
        self
    }

    /// Adds a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Adds several constraints.
    pub fn with_constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Validates, reduces and freezes the problem.
    pub fn build(self) -> Result<InputData, InputError> {
        let Self {
            mut workshops,
            mut participants,
            mut slots,
            constraints: user_constraints,
        } = self;

        if workshops.is_empty() || participants.is_empty() {
            return Err(InputError::EmptyInput);
        }
        if slots.is_empty() {
            slots.push(DEFAULT_SLOT.to_string());
        }
        validate_input(&workshops, &participants, &slots, &user_constraints)
            .map_err(InputError::Validation)?;

        let mut constraints = user_constraints;
        let mut conducted: Vec<Vec<usize>> = vec![Vec::new(); participants.len()];
        for (w, workshop) in workshops.iter().enumerate() {
            for &c in &workshop.conductors {
                constraints.push(Constraint::attends(c, w));
                participants[c].preferences[w] = 0;
                conducted[c].push(w);
            }
            if let Some(next) = workshop.continuation {
                constraints.push(Constraint::offset(w, next, 1));
                constraints.push(Constraint::same_audience(w, next));
            }
        }
        // A conductor can only be in one place at a time
        for own in conducted.iter() {
            for (i, &a) in own.iter().enumerate() {
                for &b in &own[i + 1..] {
                    if workshops[a].continuation != Some(b) && workshops[b].continuation != Some(a)
                    {
                        constraints.push(Constraint::different_slot(a, b));
                    }
                }
            }
        }

        let mut reduced: Vec<Constraint> =
            constraints.into_iter().filter_map(Constraint::reduce).collect();
        reduced.sort();
        reduced.dedup();
        check_contradictions(&reduced, workshops.len(), slots.len())?;

        // Dependent groups: workshops whose audiences must be identical
        let mut uf = UnionFind::new(workshops.len());
        for c in &reduced {
            if let Constraint::SequenceEquals {
                kind: SequenceKind::WorkshopParticipants,
                first,
                second,
            } = *c
            {
                uf.union(first, second);
            }
        }
        let groups = uf.groups();
        let mut group_of = vec![0; workshops.len()];
        for (g, members) in groups.iter().enumerate() {
            for &w in members {
                group_of[w] = g;
            }
            if members.len() < 2 {
                continue;
            }
            let min = members.iter().map(|&w| workshops[w].min_participants).max().unwrap_or(0);
            let max = members.iter().map(|&w| workshops[w].max_participants).min().unwrap_or(0);
            if min > max {
                return Err(InputError::CapacityConflict {
                    group: members.iter().map(|&w| workshops[w].name.clone()).collect(),
                });
            }
            for &w in members {
                workshops[w].min_participants = min;
                workshops[w].max_participants = max;
            }
            for p in participants.iter_mut() {
                let best = members.iter().map(|&w| p.preferences[w]).min().unwrap_or(0);
                for &w in members {
                    p.preferences[w] = best;
                }
            }
        }

        let (scheduling_constraints, assignment_constraints): (Vec<_>, Vec<_>) =
            reduced.into_iter().partition(Constraint::is_scheduling);

        let mut scheduling_by_workshop = vec![Vec::new(); workshops.len()];
        for (i, c) in scheduling_constraints.iter().enumerate() {
            for w in c.workshops() {
                scheduling_by_workshop[w].push(i);
            }
        }
        let mut assignment_by_participant = vec![Vec::new(); participants.len()];
        for (i, c) in assignment_constraints.iter().enumerate() {
            for p in c.participants() {
                assignment_by_participant[p].push(i);
            }
        }

        let mut preference_levels: Vec<Preference> = participants
            .iter()
            .flat_map(|p| p.preferences.iter().copied())
            .collect();
        preference_levels.sort_unstable();
        preference_levels.dedup();
        let max_preference = preference_levels.last().copied().unwrap_or(0);

        debug!(
            "Built input: {} workshops, {} participants, {} slots, {} scheduling / {} assignment constraints, {} preference levels",
            workshops.len(),
            participants.len(),
            slots.len(),
            scheduling_constraints.len(),
            assignment_constraints.len(),
            preference_levels.len()
        );

        Ok(InputData {
            workshops,
            participants,
            slots,
            scheduling_constraints,
            assignment_constraints,
            scheduling_by_workshop,
            assignment_by_participant,
            groups,
            group_of,
            conducted,
            preference_levels,
            max_preference,
        })
    }
}

/// Rejects constraint sets that no scheduling or assignment can satisfy.
fn check_contradictions(
    constraints: &[Constraint],
    workshop_count: usize,
    slot_count: usize,
) -> Result<(), InputError> {
    let mut classes = UnionFind::new(workshop_count);
    for c in constraints {
        if let Constraint::Equals { first, second } = *c {
            classes.union(first, second);
        }
    }

    let mut fixed: Vec<Option<usize>> = vec![None; workshop_count];
    let mut forbidden: HashSet<(usize, usize)> = HashSet::new();
    for c in constraints {
        match *c {
            Constraint::FixedValue { workshop, slot } => {
                let root = classes.find(workshop);
                match fixed[root] {
                    Some(other) if other != slot => {
                        return Err(InputError::Contradiction(format!(
                            "workshop #{workshop} is fixed to slots #{other} and #{slot}"
                        )));
                    }
                    _ => fixed[root] = Some(slot),
                }
            }
            Constraint::ForbiddenValue { workshop, slot } => {
                forbidden.insert((classes.find(workshop), slot));
            }
            _ => {}
        }
    }

    for root in 0..workshop_count {
        if let Some(slot) = fixed[root] {
            if forbidden.contains(&(root, slot)) {
                return Err(InputError::Contradiction(format!(
                    "workshop #{root} is both fixed to and forbidden from slot #{slot}"
                )));
            }
        }
        if (0..slot_count).all(|s| forbidden.contains(&(root, s))) {
            return Err(InputError::Contradiction(format!(
                "every slot is forbidden for workshop #{root}"
            )));
        }
    }

    let mut contains: HashSet<(usize, usize)> = HashSet::new();
    for c in constraints {
        if let Constraint::Contains {
            participant,
            workshop,
        } = *c
        {
            contains.insert((participant, workshop));
        }
    }

    for c in constraints {
        match *c {
            Constraint::NotEquals { first, second } => {
                let (a, b) = (classes.find(first), classes.find(second));
                if a == b || (fixed[a].is_some() && fixed[a] == fixed[b]) {
                    return Err(InputError::Contradiction(format!(
                        "workshops #{first} and #{second} must share and must not share a slot"
                    )));
                }
            }
            Constraint::Offset {
                first,
                second,
                offset,
            } => {
                let (a, b) = (classes.find(first), classes.find(second));
                let span = offset.unsigned_abs() as usize;
                if a == b || span >= slot_count {
                    return Err(InputError::Contradiction(format!(
                        "workshop #{second} cannot be {offset} slots after #{first}"
                    )));
                }
                if let (Some(fa), Some(fb)) = (fixed[a], fixed[b]) {
                    if fa as i64 + offset as i64 != fb as i64 {
                        return Err(InputError::Contradiction(format!(
                            "fixed slots of #{first} and #{second} violate their offset {offset}"
                        )));
                    }
                }
            }
            Constraint::NotContains {
                participant,
                workshop,
            } if contains.contains(&(participant, workshop)) => {
                return Err(InputError::Contradiction(format!(
                    "participant #{participant} must and must not attend workshop #{workshop}"
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Validated, immutable problem definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputData {
    workshops: Vec<Workshop>,
    participants: Vec<Participant>,
    slots: Vec<String>,
    scheduling_constraints: Vec<Constraint>,
    assignment_constraints: Vec<Constraint>,
    scheduling_by_workshop: Vec<Vec<usize>>,
    assignment_by_participant: Vec<Vec<usize>>,
    groups: Vec<Vec<usize>>,
    group_of: Vec<usize>,
    conducted: Vec<Vec<usize>>,
    preference_levels: Vec<Preference>,
    max_preference: Preference,
}

impl InputData {
    /// Starts a builder.
    pub fn builder() -> InputDataBuilder {
        InputDataBuilder::new()
    }

    #[inline]
    pub fn workshop_count(&self) -> usize {
        self.workshops.len()
    }

    #[inline]
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn workshops(&self) -> &[Workshop] {
        &self.workshops
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    #[inline]
    pub fn workshop(&self, w: usize) -> &Workshop {
        &self.workshops[w]
    }

    #[inline]
    pub fn participant(&self, p: usize) -> &Participant {
        &self.participants[p]
    }

    /// Group-merged preference of participant `p` for workshop `w`.
    #[inline]
    pub fn preference(&self, p: usize, w: usize) -> Preference {
        self.participants[p].preferences[w]
    }

    #[inline]
    pub fn min_participants(&self, w: usize) -> usize {
        self.workshops[w].min_participants
    }

    #[inline]
    pub fn max_participants(&self, w: usize) -> usize {
        self.workshops[w].max_participants
    }

    /// Whether `p` conducts `w`.
    #[inline]
    pub fn is_conductor(&self, p: usize, w: usize) -> bool {
        self.workshops[w].is_conductor(p)
    }

    /// Workshops conducted by `p`.
    pub fn conducted_by(&self, p: usize) -> &[usize] {
        &self.conducted[p]
    }

    /// Scheduling constraints (workshop ↔ slot).
    pub fn scheduling_constraints(&self) -> &[Constraint] {
        &self.scheduling_constraints
    }

    /// Assignment constraints (participant ↔ workshop).
    pub fn assignment_constraints(&self) -> &[Constraint] {
        &self.assignment_constraints
    }

    /// Scheduling constraints mentioning workshop `w`.
    pub fn scheduling_constraints_of(&self, w: usize) -> impl Iterator<Item = &Constraint> {
        self.scheduling_by_workshop[w]
            .iter()
            .map(move |&i| &self.scheduling_constraints[i])
    }

    /// Assignment constraints mentioning participant `p`.
    pub fn assignment_constraints_of_participant(
        &self,
        p: usize,
    ) -> impl Iterator<Item = &Constraint> {
        self.assignment_by_participant[p]
            .iter()
            .map(move |&i| &self.assignment_constraints[i])
    }

    /// Whether the participant is required to attend `w`.
    pub fn must_attend(&self, p: usize, w: usize) -> bool {
        self.assignment_constraints_of_participant(p).any(|c| {
            matches!(*c, Constraint::Contains { participant, workshop } if participant == p && workshop == w)
        })
    }

    /// Whether the participant is forbidden from `w`.
    pub fn must_avoid(&self, p: usize, w: usize) -> bool {
        self.assignment_constraints_of_participant(p).any(|c| {
            matches!(*c, Constraint::NotContains { participant, workshop } if participant == p && workshop == w)
        })
    }

    /// Members of `w`'s dependent group, `w` included.
    #[inline]
    pub fn group_members(&self, w: usize) -> &[usize] {
        &self.groups[self.group_of[w]]
    }

    /// Whether `w` shares its audience with another workshop.
    #[inline]
    pub fn is_dependent(&self, w: usize) -> bool {
        self.group_members(w).len() > 1
    }

    /// Sorted distinct preference values.
    pub fn preference_levels(&self) -> &[Preference] {
        &self.preference_levels
    }

    /// Worst preference value present.
    #[inline]
    pub fn max_preference(&self) -> Preference {
        self.max_preference
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> InputDataBuilder {
        InputDataBuilder::new()
            .with_slot("Morning")
            .with_slot("Afternoon")
            .with_workshop(Workshop::new("A", 1, 3).with_conductor(0))
            .with_workshop(Workshop::new("B", 1, 3))
            .with_workshop(Workshop::new("C", 1, 3))
            .with_participant(Participant::new("Ann", vec![2, 1, 3]))
            .with_participant(Participant::new("Bob", vec![1, 2, 3]))
    }

    #[test]
    fn test_conductor_folding() {
        let input = base().build().unwrap();
        assert_eq!(input.preference(0, 0), 0);
        assert!(input.must_attend(0, 0));
        assert_eq!(input.conducted_by(0), &[0]);
        assert_eq!(input.preference_levels(), &[0, 1, 2, 3]);
        assert_eq!(input.max_preference(), 3);
    }

    #[test]
    fn test_synthetic_slot() {
        let input = InputDataBuilder::new()
            .with_workshop(Workshop::new("A", 0, 5))
            .with_participant(Participant::new("Ann", vec![1]))
            .build()
            .unwrap();
        assert_eq!(input.slots(), &[DEFAULT_SLOT.to_string()]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(InputDataBuilder::new().build().unwrap_err(), InputError::EmptyInput);
    }

    #[test]
    fn test_continuation_groups_and_merges() {
        let input = InputDataBuilder::new()
            .with_slot("1")
            .with_slot("2")
            .with_workshop(Workshop::new("Series I", 2, 5).with_continuation(1))
            .with_workshop(Workshop::new("Series II", 1, 4))
            .with_workshop(Workshop::new("Other", 1, 9))
            .with_participant(Participant::new("Ann", vec![3, 1, 2]))
            .build()
            .unwrap();

        assert!(input.is_dependent(0));
        assert_eq!(input.group_members(1), &[0, 1]);
        assert!(!input.is_dependent(2));
        assert_eq!(input.min_participants(1), 2);
        assert_eq!(input.max_participants(0), 4);
        assert_eq!(input.preference(0, 0), 1);
        assert_eq!(input.preference(0, 1), 1);
        assert!(input
            .scheduling_constraints()
            .contains(&Constraint::offset(0, 1, 1)));
    }

    #[test]
    fn test_shared_conductor_forces_different_slots() {
        let input = base()
            .with_workshop(Workshop::new("D", 1, 3).with_conductor(0))
            .with_participant(Participant::new("Cid", vec![1, 1, 1, 1]))
            .build();
        // Ann and Bob have three preferences, now four workshops exist
        assert!(matches!(input, Err(InputError::Validation(_))));

        let input = InputDataBuilder::new()
            .with_slot("1")
            .with_slot("2")
            .with_workshop(Workshop::new("A", 1, 3).with_conductor(0))
            .with_workshop(Workshop::new("B", 1, 3).with_conductor(0))
            .with_participant(Participant::new("Ann", vec![1, 1]))
            .build()
            .unwrap();
        assert!(input
            .scheduling_constraints()
            .contains(&Constraint::different_slot(0, 1)));
    }

    #[test]
    fn test_duplicates_removed() {
        let input = base()
            .with_constraint(Constraint::same_slot(1, 2))
            .with_constraint(Constraint::same_slot(2, 1))
            .build()
            .unwrap();
        let count = input
            .scheduling_constraints()
            .iter()
            .filter(|c| matches!(c, Constraint::Equals { .. }))
            .count();
        assert_eq!(count, 1);
        assert_eq!(input.scheduling_constraints_of(2).count(), 1);
    }

    #[test]
    fn test_contradictions() {
        let err = base()
            .with_constraint(Constraint::same_slot(1, 2))
            .with_constraint(Constraint::different_slot(2, 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::Contradiction(_)));

        let err = base()
            .with_constraint(Constraint::fixed(1, 0))
            .with_constraint(Constraint::fixed(1, 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::Contradiction(_)));

        let err = base()
            .with_constraint(Constraint::fixed(2, 1))
            .with_constraint(Constraint::forbidden(2, 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::Contradiction(_)));

        let err = base()
            .with_constraint(Constraint::offset(1, 2, 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::Contradiction(_)));

        // C can go nowhere
        let err = base()
            .with_constraint(Constraint::forbidden(2, 0))
            .with_constraint(Constraint::forbidden(2, 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::Contradiction(msg) if msg.contains("every slot")));

        let err = base()
            .with_constraint(Constraint::avoids(0, 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::Contradiction(_)));
    }

    #[test]
    fn test_group_capacity_conflict() {
        let err = InputDataBuilder::new()
            .with_slot("1")
            .with_slot("2")
            .with_workshop(Workshop::new("Part 1", 5, 6).with_continuation(1))
            .with_workshop(Workshop::new("Part 2", 1, 3))
            .with_participant(Participant::new("Ann", vec![1, 1]))
            .build()
            .unwrap_err();
        assert!(matches!(err, InputError::CapacityConflict { .. }));
    }
}
