//! Workshop and participant models.
//!
//! A workshop is a schedulable activity with a capacity range and zero or
//! more conductors. A participant ranks every workshop; lower preference
//! values are more desired.

use serde::{Deserialize, Serialize};

/// Preference value. Lower = more desired, `0` = own workshop.
pub type Preference = u32;

/// A workshop to be placed in exactly one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workshop {
    /// Unique workshop name.
    pub name: String,
    /// Minimum number of participants (conductors included).
    pub min_participants: usize,
    /// Maximum number of participants (conductors included).
    pub max_participants: usize,
    /// Participant indices of the conductors.
    pub conductors: Vec<usize>,
    /// Follow-up part of a multi-part series, held in the next slot with the
    /// same audience.
    pub continuation: Option<usize>,
}

impl Workshop {
    /// Creates a workshop with the given capacity range.
    pub fn new(name: impl Into<String>, min_participants: usize, max_participants: usize) -> Self {
        Self {
            name: name.into(),
            min_participants,
            max_participants,
            conductors: Vec::new(),
            continuation: None,
        }
    }

    /// Adds a conductor (participant index).
    pub fn with_conductor(mut self, participant: usize) -> Self {
        self.conductors.push(participant);
        self
    }

    /// Links a continuation (workshop index).
    pub fn with_continuation(mut self, workshop: usize) -> Self {
        self.continuation = Some(workshop);
        self
    }

    /// Whether `participant` conducts this workshop.
    #[inline]
    pub fn is_conductor(&self, participant: usize) -> bool {
        self.conductors.contains(&participant)
    }
}

/// A participant with a preference for every workshop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique participant name.
    pub name: String,
    /// Preference per workshop index.
    pub preferences: Vec<Preference>,
}

impl Participant {
    /// Creates a participant from a preference vector indexed by workshop.
    pub fn new(name: impl Into<String>, preferences: Vec<Preference>) -> Self {
        Self {
            name: name.into(),
            preferences,
        }
    }

    /// Preference for a workshop.
    #[inline]
    pub fn preference(&self, workshop: usize) -> Preference {
        self.preferences[workshop]
    }

    /// Worst (highest) preference value this participant has given.
    pub fn worst_preference(&self) -> Preference {
        self.preferences.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workshop_builder() {
        let w = Workshop::new("Pottery", 3, 8)
            .with_conductor(2)
            .with_conductor(5)
            .with_continuation(1);

        assert_eq!(w.name, "Pottery");
        assert_eq!(w.min_participants, 3);
        assert_eq!(w.max_participants, 8);
        assert_eq!(w.conductors, vec![2, 5]);
        assert_eq!(w.continuation, Some(1));
        assert!(w.is_conductor(5));
        assert!(!w.is_conductor(0));
    }

    #[test]
    fn test_participant_preferences() {
        let p = Participant::new("Ann", vec![0, 3, 1]);
        assert_eq!(p.preference(1), 3);
        assert_eq!(p.worst_preference(), 3);
        assert_eq!(Participant::new("Nobody", vec![]).worst_preference(), 0);
    }
}
