//! Configurable genetic operators for workshop candidates.
//!
//! Provides runtime-selectable crossover and weighted mutation strategies
//! via [`GeneticOperators`].
//!
//! # Usage
//!
//! ```
//! use u_workshop::ga::operators::{CrossoverType, GeneticOperators, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_type, CrossoverType::SlotBlock);
//! assert!(ops.weight(MutationType::Reassign) > 0);
//! ```

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::fitness::FitnessEvaluator;
use crate::local::LocalSearch;
use crate::models::{Candidate, InputData};

/// Crossover strategy.
///
/// Both variants only exchange the assignment blocks of slots whose
/// workshop sets agree between the parents, so scheduling constraints stay
/// intact. Parents without any agreeing slot pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossoverType {
    /// Exchange the block of one random agreeing slot.
    SlotBlock,
    /// Exchange each agreeing slot's block with probability 1/2.
    UniformSlot,
}

/// Mutation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationType {
    /// Move one participant to another workshop of the same slot.
    Reassign,
    /// Exchange the workshops of two participants within one slot.
    ParticipantSwap,
    /// Exchange the slots of two workshops and re-map their audiences.
    WorkshopSwap,
    /// Run shift/swap local search to its fixed point.
    LocalOptimization,
}

const MUTATION_TYPES: [MutationType; 4] = [
    MutationType::Reassign,
    MutationType::ParticipantSwap,
    MutationType::WorkshopSwap,
    MutationType::LocalOptimization,
];

/// Runtime-selectable genetic operators.
///
/// # Example
///
/// ```
/// use u_workshop::ga::operators::{CrossoverType, GeneticOperators};
///
/// let ops = GeneticOperators {
///     crossover_type: CrossoverType::UniformSlot,
///     mutation_weights: [1, 1, 0, 0],
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneticOperators {
    /// Crossover strategy.
    pub crossover_type: CrossoverType,
    /// Relative weights of reassign, participant swap, workshop swap and
    /// local optimization.
    pub mutation_weights: [u32; 4],
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            crossover_type: CrossoverType::SlotBlock,
            mutation_weights: [4, 4, 1, 1],
        }
    }
}

impl GeneticOperators {
    /// Weight of one mutation type.
    pub fn weight(&self, mutation: MutationType) -> u32 {
        let i = MUTATION_TYPES
            .iter()
            .position(|&m| m == mutation)
            .unwrap_or(0);
        self.mutation_weights[i]
    }

    /// Draws a mutation type by weight; reassign when all weights are zero.
    pub fn pick_mutation<R: Rng + ?Sized>(&self, rng: &mut R) -> MutationType {
        let total: u32 = self.mutation_weights.iter().sum();
        if total == 0 {
            return MutationType::Reassign;
        }
        let mut roll = rng.random_range(0..total);
        for (i, &w) in self.mutation_weights.iter().enumerate() {
            if roll < w {
                return MUTATION_TYPES[i];
            }
            roll -= w;
        }
        MutationType::Reassign
    }

    /// Performs crossover using the configured strategy.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        p1: &Candidate,
        p2: &Candidate,
        rng: &mut R,
    ) -> (Candidate, Candidate) {
        let agreeing = agreeing_slots(p1, p2);
        let mut c1 = p1.clone();
        let mut c2 = p2.clone();
        if agreeing.is_empty() {
            return (c1, c2);
        }
        let exchanged: Vec<usize> = match self.crossover_type {
            CrossoverType::SlotBlock => agreeing.choose(rng).copied().into_iter().collect(),
            CrossoverType::UniformSlot => agreeing
                .into_iter()
                .filter(|_| rng.random_bool(0.5))
                .collect(),
        };
        for slot in exchanged {
            exchange_block(&mut c1, &mut c2, slot);
        }
        (c1, c2)
    }

    /// Performs one weighted mutation.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        evaluator: &FitnessEvaluator,
        candidate: &mut Candidate,
        rng: &mut R,
    ) -> MutationType {
        let mutation = self.pick_mutation(rng);
        let input = evaluator.input();
        match mutation {
            MutationType::Reassign => reassign_mutation(input, candidate, rng),
            MutationType::ParticipantSwap => participant_swap_mutation(input, candidate, rng),
            MutationType::WorkshopSwap => workshop_swap_mutation(input, candidate, rng),
            MutationType::LocalOptimization => {
                LocalSearch::new(evaluator).optimize(candidate);
            }
        }
        mutation
    }
}

/// Slots whose workshop sets are identical in both parents.
fn agreeing_slots(p1: &Candidate, p2: &Candidate) -> Vec<usize> {
    let a = p1.workshops_by_slot();
    let b = p2.workshops_by_slot();
    (0..p1.slot_count()).filter(|&s| a[s] == b[s]).collect()
}

fn exchange_block(c1: &mut Candidate, c2: &mut Candidate, slot: usize) {
    for p in 0..c1.participant_count() {
        let (Some(o1), Some(o2)) = (c1.ordinal_in_slot(p, slot), c2.ordinal_in_slot(p, slot)) else {
            continue;
        };
        let w1 = c1.workshop_of(p, o1);
        let w2 = c2.workshop_of(p, o2);
        c1.set_workshop(p, o1, w2);
        c2.set_workshop(p, o2, w1);
    }
}

fn can_leave(input: &InputData, p: usize, w: usize) -> bool {
    !input.is_dependent(w) && !input.must_attend(p, w)
}

fn can_join(input: &InputData, p: usize, w: usize) -> bool {
    !input.is_dependent(w) && !input.must_avoid(p, w)
}

/// Moves a random participant to another workshop of the same slot.
pub fn reassign_mutation<R: Rng + ?Sized>(input: &InputData, candidate: &mut Candidate, rng: &mut R) {
    let participants = candidate.participant_count();
    let slots = candidate.slot_count();
    if participants == 0 || slots == 0 {
        return;
    }
    let p = rng.random_range(0..participants);
    let ordinal = rng.random_range(0..slots);
    let from = candidate.workshop_of(p, ordinal);
    if !can_leave(input, p, from) {
        return;
    }
    let slot = candidate.slot_of(from);
    let options: Vec<usize> = (0..candidate.workshop_count())
        .filter(|&w| w != from && candidate.slot_of(w) == slot && can_join(input, p, w))
        .collect();
    if let Some(&to) = options.choose(rng) {
        candidate.set_workshop(p, ordinal, to);
    }
}

/// Swaps the workshops of two random participants within a random slot.
pub fn participant_swap_mutation<R: Rng + ?Sized>(
    input: &InputData,
    candidate: &mut Candidate,
    rng: &mut R,
) {
    let participants = candidate.participant_count();
    if participants < 2 || candidate.slot_count() == 0 {
        return;
    }
    let slot = rng.random_range(0..candidate.slot_count());
    let p1 = rng.random_range(0..participants);
    let p2 = rng.random_range(0..participants);
    let (Some(o1), Some(o2)) = (
        candidate.ordinal_in_slot(p1, slot),
        candidate.ordinal_in_slot(p2, slot),
    ) else {
        return;
    };
    let w1 = candidate.workshop_of(p1, o1);
    let w2 = candidate.workshop_of(p2, o2);
    if w1 == w2
        || !can_leave(input, p1, w1)
        || !can_leave(input, p2, w2)
        || !can_join(input, p1, w2)
        || !can_join(input, p2, w1)
    {
        return;
    }
    candidate.set_workshop(p1, o1, w2);
    candidate.set_workshop(p2, o2, w1);
}

/// Exchanges the slots of two workshops and re-maps affected participants.
///
/// Attendees of a moved workshop follow it into its new slot and receive
/// their most preferred workshop with room in the slot they vacated. The
/// candidate is restored when some attendee has no such workshop.
pub fn workshop_swap_mutation<R: Rng + ?Sized>(
    input: &InputData,
    candidate: &mut Candidate,
    rng: &mut R,
) {
    let movable: Vec<usize> = (0..candidate.workshop_count())
        .filter(|&w| !input.is_dependent(w))
        .collect();
    let (Some(&a), Some(&b)) = (movable.choose(rng), movable.choose(rng)) else {
        return;
    };
    let (slot_a, slot_b) = (candidate.slot_of(a), candidate.slot_of(b));
    if slot_a == slot_b {
        return;
    }
    let original = candidate.clone();
    candidate.set_slot(a, slot_b);
    candidate.set_slot(b, slot_a);

    let mut counts = candidate.participant_counts();
    for p in 0..candidate.participant_count() {
        let attends_a = candidate.attends(p, a);
        let attends_b = candidate.attends(p, b);
        if attends_a == attends_b {
            // Both or neither: the slot pair just trades places
            continue;
        }
        let (moved, vacated) = if attends_a { (a, slot_a) } else { (b, slot_b) };
        let target_slot = candidate.slot_of(moved);
        // The workshop previously held in the moved one's new slot
        let Some(clash) = (0..candidate.slot_count()).find(|&o| {
            let w = candidate.workshop_of(p, o);
            w != moved && candidate.slot_of(w) == target_slot
        }) else {
            continue;
        };
        let displaced = candidate.workshop_of(p, clash);
        counts[displaced] -= 1;

        let replacement = (0..candidate.workshop_count())
            .filter(|&w| {
                candidate.slot_of(w) == vacated
                    && !input.is_dependent(w)
                    && !input.must_avoid(p, w)
                    && counts[w] < input.max_participants(w)
            })
            .min_by_key(|&w| (input.preference(p, w), w));
        let Some(replacement) = replacement else {
            *candidate = original;
            return;
        };
        counts[replacement] += 1;
        candidate.set_workshop(p, clash, replacement);
    }
    candidate.normalize();
}

/// Shuffles `items` and returns the first `n`.
pub(crate) fn sample<T: Clone, R: Rng + ?Sized>(items: &[T], n: usize, rng: &mut R) -> Vec<T> {
    let mut pool = items.to_vec();
    pool.shuffle(rng);
    pool.truncate(n);
    pool
}
