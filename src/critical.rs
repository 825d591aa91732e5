//! Critical set analysis.
//!
//! A [`CriticalSet`] `(t, X)` records that some participant, when no
//! assignment may exceed preference `t`, can only be served by workshops in
//! `X`. Those workshops must therefore cover every slot for any ceiling
//! `c ≤ t`. A set dominates another when it is a subset with a threshold at
//! least as high; only non-dominated sets are retained.
//!
//! The preference bound is the lowest level at which every applicable set
//! spans enough distinct slots. Below it no scheduling can exist. This is a
//! Hall-type covering condition: `|X|` workshops cannot serve a participant
//! in every slot unless they occupy `slot_count` distinct slots.

use log::debug;

use crate::models::{Constraint, InputData, Preference, UnionFind};

/// Workshops that must jointly cover every slot up to `threshold`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalSet {
    /// Highest ceiling this set applies to.
    pub threshold: Preference,
    /// Sorted workshop indices.
    pub workshops: Vec<usize>,
}

impl CriticalSet {
    /// Whether `self.workshops ⊆ other.workshops`.
    pub fn is_subset_of(&self, other: &CriticalSet) -> bool {
        is_sorted_subset(&self.workshops, &other.workshops)
    }

    /// Whether this set makes `other` redundant.
    pub fn dominates(&self, other: &CriticalSet) -> bool {
        self.threshold >= other.threshold && self.is_subset_of(other)
    }
}

fn is_sorted_subset(small: &[usize], large: &[usize]) -> bool {
    if small.len() > large.len() {
        return false;
    }
    let mut j = 0;
    for &x in small {
        while j < large.len() && large[j] < x {
            j += 1;
        }
        if j == large.len() || large[j] != x {
            return false;
        }
        j += 1;
    }
    true
}

/// Retained critical sets and the derived preference bound.
#[derive(Debug, Clone)]
pub struct CriticalSetAnalysis {
    sets: Vec<CriticalSet>,
    slot_class: Vec<usize>,
    slot_count: usize,
    bound: Option<Preference>,
}

impl CriticalSetAnalysis {
    /// Analysis over every preference level.
    pub fn new(input: &InputData) -> Self {
        Self::with_ceiling(input, None)
    }

    /// Analysis restricted to levels up to `ceiling`.
    pub fn with_ceiling(input: &InputData, ceiling: Option<Preference>) -> Self {
        let slot_count = input.slot_count();
        let participants = input.participant_count();
        let slot_class = slot_equality_classes(input);

        let levels: Vec<Preference> = input
            .preference_levels()
            .iter()
            .copied()
            .filter(|&l| ceiling.map_or(true, |c| l <= c))
            .collect();

        let mut sets: Vec<CriticalSet> = Vec::new();
        // Worst level first so that higher thresholds are inserted first
        for &level in levels.iter().rev() {
            let first_of_level = sets.len();
            for p in 0..participants {
                let workshops: Vec<usize> = (0..input.workshop_count())
                    .filter(|&w| input.preference(p, w) <= level)
                    .collect();
                let min_sum: usize = workshops.iter().map(|&w| input.min_participants(w)).sum();
                if min_sum > participants * slot_count.saturating_sub(1) {
                    continue;
                }
                let candidate = CriticalSet {
                    threshold: level,
                    workshops,
                };
                if sets.iter().any(|s| s.dominates(&candidate)) {
                    continue;
                }
                sets.push(candidate);
            }
            thin_level(&mut sets, first_of_level);
        }

        let mut analysis = Self {
            sets,
            slot_class,
            slot_count,
            bound: None,
        };
        analysis.bound = if levels.is_empty() {
            None
        } else if analysis.sets.is_empty() {
            Some(input.max_preference())
        } else {
            levels
                .iter()
                .copied()
                .find(|&l| analysis.is_level_feasible(l))
        };

        debug!(
            "Critical set analysis: {} sets retained, preference bound {:?}",
            analysis.sets.len(),
            analysis.bound
        );
        analysis
    }

    /// All retained sets.
    pub fn sets(&self) -> &[CriticalSet] {
        &self.sets
    }

    /// Lowest structurally feasible preference level, `None` when no level
    /// within the ceiling is feasible.
    pub fn preference_bound(&self) -> Option<Preference> {
        self.bound
    }

    /// Minimal sets that apply under ceiling `level`.
    pub fn for_preference(&self, level: Preference) -> Vec<&CriticalSet> {
        let applicable: Vec<&CriticalSet> =
            self.sets.iter().filter(|s| s.threshold >= level).collect();
        applicable
            .iter()
            .enumerate()
            .filter(|(i, s)| {
                !applicable.iter().enumerate().any(|(j, o)| {
                    *i != j
                        && o.is_subset_of(s)
                        // equal sets: keep the first
                        && (o.workshops.len() < s.workshops.len() || j < *i)
                })
            })
            .map(|(_, s)| *s)
            .collect()
    }

    /// Distinct slots a set can span at most, given slot equalities.
    pub fn effective_size(&self, set: &CriticalSet) -> usize {
        let mut classes: Vec<usize> = set.workshops.iter().map(|&w| self.slot_class[w]).collect();
        classes.sort_unstable();
        classes.dedup();
        classes.len()
    }

    /// Whether every set applying at `level` can still cover all slots.
    pub fn is_level_feasible(&self, level: Preference) -> bool {
        self.sets
            .iter()
            .filter(|s| s.threshold >= level)
            .all(|s| self.effective_size(s) >= self.slot_count)
    }
}

/// Removes sets of the current level that contain another set of the level.
fn thin_level(sets: &mut Vec<CriticalSet>, first_of_level: usize) {
    let level_sets = sets.split_off(first_of_level);
    let mut kept: Vec<CriticalSet> = Vec::with_capacity(level_sets.len());
    for (i, s) in level_sets.iter().enumerate() {
        let covered = level_sets.iter().enumerate().any(|(j, o)| {
            i != j && o.is_subset_of(s) && (o.workshops.len() < s.workshops.len() || j < i)
        });
        if !covered {
            kept.push(s.clone());
        }
    }
    sets.extend(kept);
}

/// Class id per workshop; workshops forced into the same slot share a class.
fn slot_equality_classes(input: &InputData) -> Vec<usize> {
    let workshops = input.workshop_count();
    let mut uf = UnionFind::new(workshops);
    let mut fixed_to: Vec<Option<usize>> = vec![None; input.slot_count()];
    for c in input.scheduling_constraints() {
        match *c {
            Constraint::Equals { first, second } => {
                uf.union(first, second);
            }
            Constraint::FixedValue { workshop, slot } => match fixed_to[slot] {
                Some(other) => {
                    uf.union(other, workshop);
                }
                None => fixed_to[slot] = Some(workshop),
            },
            _ => {}
        }
    }
    (0..workshops).map(|w| uf.find(w)).collect()
}
