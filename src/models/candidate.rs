//! Flat candidate encoding and partial schedulings.
//!
//! # Encoding
//!
//! A [`Candidate`] is a single integer vector:
//! - `[0, W)`: slot of each workshop.
//! - `[W, W + P·S)`: for each (participant, ordinal) the workshop attended.
//!
//! Candidates are kept canonical: ordinal `s` holds the workshop the
//! participant attends in slot `s`. [`Candidate::normalize`] restores this
//! after operations that only preserve the slot-distinctness invariant.

use serde::{Deserialize, Serialize};

use super::{InputData, Solution};

/// Workshop → slot mapping plus participant → workshop assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    genes: Vec<usize>,
    workshop_count: usize,
    slot_count: usize,
}

impl Candidate {
    /// All-zero candidate sized for `input`.
    pub fn new(input: &InputData) -> Self {
        Self::with_dimensions(
            input.workshop_count(),
            input.participant_count(),
            input.slot_count(),
        )
    }

    /// All-zero candidate with explicit dimensions.
    pub fn with_dimensions(workshops: usize, participants: usize, slots: usize) -> Self {
        Self {
            genes: vec![0; workshops + participants * slots],
            workshop_count: workshops,
            slot_count: slots,
        }
    }

    /// Rebuilds the canonical candidate from a solution.
    pub fn from_solution(solution: &Solution) -> Self {
        let workshops = solution.scheduling.len();
        let slots = solution.assignment.first().map_or(0, Vec::len);
        let mut c = Self::with_dimensions(workshops, solution.assignment.len(), slots);
        for (w, &s) in solution.scheduling.iter().enumerate() {
            c.set_slot(w, s);
        }
        for (p, row) in solution.assignment.iter().enumerate() {
            for (s, &w) in row.iter().enumerate() {
                c.set_workshop(p, s, w);
            }
        }
        c
    }

    #[inline]
    pub fn workshop_count(&self) -> usize {
        self.workshop_count
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    #[inline]
    pub fn participant_count(&self) -> usize {
        if self.slot_count == 0 {
            0
        } else {
            (self.genes.len() - self.workshop_count) / self.slot_count
        }
    }

    /// Raw gene vector.
    pub fn genes(&self) -> &[usize] {
        &self.genes
    }

    /// Slot assigned to workshop `w`.
    #[inline]
    pub fn slot_of(&self, w: usize) -> usize {
        self.genes[w]
    }

    #[inline]
    pub fn set_slot(&mut self, w: usize, slot: usize) {
        self.genes[w] = slot;
    }

    #[inline]
    fn offset(&self, p: usize, ordinal: usize) -> usize {
        self.workshop_count + p * self.slot_count + ordinal
    }

    /// Workshop participant `p` attends at `ordinal`.
    #[inline]
    pub fn workshop_of(&self, p: usize, ordinal: usize) -> usize {
        self.genes[self.offset(p, ordinal)]
    }

    #[inline]
    pub fn set_workshop(&mut self, p: usize, ordinal: usize, w: usize) {
        let i = self.offset(p, ordinal);
        self.genes[i] = w;
    }

    /// All workshops of participant `p`, by ordinal.
    #[inline]
    pub fn workshops_of(&self, p: usize) -> &[usize] {
        let start = self.offset(p, 0);
        &self.genes[start..start + self.slot_count]
    }

    /// Ordinal at which `p` attends `w`, if at all.
    pub fn ordinal_of(&self, p: usize, w: usize) -> Option<usize> {
        self.workshops_of(p).iter().position(|&x| x == w)
    }

    /// Whether `p` attends `w`.
    #[inline]
    pub fn attends(&self, p: usize, w: usize) -> bool {
        self.workshops_of(p).contains(&w)
    }

    /// Ordinal holding the workshop `p` attends in `slot`.
    pub fn ordinal_in_slot(&self, p: usize, slot: usize) -> Option<usize> {
        self.workshops_of(p)
            .iter()
            .position(|&w| self.slot_of(w) == slot)
    }

    /// Attendance count per workshop.
    pub fn participant_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.workshop_count];
        for &w in &self.genes[self.workshop_count..] {
            counts[w] += 1;
        }
        counts
    }

    /// Participants of every workshop.
    pub fn audiences(&self) -> Vec<Vec<usize>> {
        let mut audiences = vec![Vec::new(); self.workshop_count];
        for p in 0..self.participant_count() {
            for &w in self.workshops_of(p) {
                audiences[w].push(p);
            }
        }
        audiences
    }

    /// Workshops scheduled in each slot.
    pub fn workshops_by_slot(&self) -> Vec<Vec<usize>> {
        let mut by_slot = vec![Vec::new(); self.slot_count];
        for w in 0..self.workshop_count {
            let s = self.slot_of(w);
            if s < self.slot_count {
                by_slot[s].push(w);
            }
        }
        by_slot
    }

    /// Reorders every participant's ordinals so ordinal `s` is in slot `s`.
    ///
    /// Participants whose workshops do not cover distinct slots are left
    /// untouched; the feasibility check rejects them anyway.
    pub fn normalize(&mut self) {
        let slots = self.slot_count;
        let mut row = vec![usize::MAX; slots];
        for p in 0..self.participant_count() {
            row.iter_mut().for_each(|x| *x = usize::MAX);
            let mut distinct = true;
            for &w in self.workshops_of(p) {
                let s = self.slot_of(w);
                if s >= slots || row[s] != usize::MAX {
                    distinct = false;
                    break;
                }
                row[s] = w;
            }
            if distinct {
                for (s, &w) in row.iter().enumerate() {
                    self.set_workshop(p, s, w);
                }
            }
        }
    }
}

/// A partial or complete workshop → slot mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduling {
    slots: Vec<Option<usize>>,
}

impl Scheduling {
    /// Empty scheduling for `workshops` workshops.
    pub fn new(workshops: usize) -> Self {
        Self {
            slots: vec![None; workshops],
        }
    }

    /// Slot of `w`, if decided.
    #[inline]
    pub fn slot_of(&self, w: usize) -> Option<usize> {
        self.slots[w]
    }

    #[inline]
    pub fn assign(&mut self, w: usize, slot: usize) {
        self.slots[w] = Some(slot);
    }

    #[inline]
    pub fn unassign(&mut self, w: usize) {
        self.slots[w] = None;
    }

    /// Whether every workshop has a slot.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Number of workshops.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Undecided workshops.
    pub fn undecided(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(w, _)| w)
    }

    /// Summed (min, max) capacity of decided workshops per slot.
    pub fn capacity_by_slot(&self, input: &InputData) -> Vec<(usize, usize)> {
        let mut sums = vec![(0, 0); input.slot_count()];
        for (w, slot) in self.slots.iter().enumerate() {
            if let Some(s) = *slot {
                sums[s].0 += input.min_participants(w);
                sums[s].1 += input.max_participants(w);
            }
        }
        sums
    }

    /// Capacity feasibility without any assignment.
    ///
    /// Each slot must leave room for every participant's minimum demands and
    /// must be able to seat every participant once the undecided workshops
    /// are added.
    pub fn is_capacity_feasible(&self, input: &InputData) -> bool {
        let participants = input.participant_count();
        let undecided_max: usize = self.undecided().map(|w| input.max_participants(w)).sum();
        let sums = self.capacity_by_slot(input);
        let mut deficit = 0;
        for &(min, max) in &sums {
            if min > participants || max + undecided_max < participants {
                return false;
            }
            deficit += participants.saturating_sub(max);
        }
        deficit <= undecided_max
    }
}
