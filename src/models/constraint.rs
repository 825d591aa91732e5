//! Scheduling and assignment constraints.
//!
//! Constraints arrive pre-built as a tagged variant over workshop, slot and
//! participant indices. Scheduling constraints relate workshops to slots;
//! assignment constraints relate participants to workshops.

use serde::{Deserialize, Serialize};

/// Which sets a [`Constraint::SequenceEquals`] compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SequenceKind {
    /// The workshop sets of two participants are identical.
    ParticipantWorkshops,
    /// The audiences of two workshops are identical.
    WorkshopParticipants,
}

/// A relational constraint over the problem's index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Constraint {
    /// Workshop must be held in `slot`.
    FixedValue { workshop: usize, slot: usize },

    /// Workshop must not be held in `slot`.
    ForbiddenValue { workshop: usize, slot: usize },

    /// Both workshops are held in the same slot.
    Equals { first: usize, second: usize },

    /// The workshops are held in different slots.
    NotEquals { first: usize, second: usize },

    /// `slot(second) == slot(first) + offset`.
    Offset {
        first: usize,
        second: usize,
        offset: i32,
    },

    /// Participant attends the workshop.
    Contains { participant: usize, workshop: usize },

    /// Participant does not attend the workshop.
    NotContains { participant: usize, workshop: usize },

    /// Two participants attend the same workshops, or two workshops have the
    /// same audience.
    SequenceEquals {
        kind: SequenceKind,
        first: usize,
        second: usize,
    },
}

impl Constraint {
    /// Creates a fixed-slot constraint.
    pub fn fixed(workshop: usize, slot: usize) -> Self {
        Self::FixedValue { workshop, slot }
    }

    /// Creates a forbidden-slot constraint.
    pub fn forbidden(workshop: usize, slot: usize) -> Self {
        Self::ForbiddenValue { workshop, slot }
    }

    /// Creates a same-slot constraint.
    pub fn same_slot(first: usize, second: usize) -> Self {
        Self::Equals { first, second }
    }

    /// Creates a different-slot constraint.
    pub fn different_slot(first: usize, second: usize) -> Self {
        Self::NotEquals { first, second }
    }

    /// Creates an offset constraint: `second` is `offset` slots after `first`.
    pub fn offset(first: usize, second: usize, offset: i32) -> Self {
        Self::Offset {
            first,
            second,
            offset,
        }
    }

    /// Creates an attendance constraint.
    pub fn attends(participant: usize, workshop: usize) -> Self {
        Self::Contains {
            participant,
            workshop,
        }
    }

    /// Creates an exclusion constraint.
    pub fn avoids(participant: usize, workshop: usize) -> Self {
        Self::NotContains {
            participant,
            workshop,
        }
    }

    /// Two participants attend identical workshops.
    pub fn same_workshops(first: usize, second: usize) -> Self {
        Self::SequenceEquals {
            kind: SequenceKind::ParticipantWorkshops,
            first,
            second,
        }
    }

    /// Two workshops have identical audiences.
    pub fn same_audience(first: usize, second: usize) -> Self {
        Self::SequenceEquals {
            kind: SequenceKind::WorkshopParticipants,
            first,
            second,
        }
    }

    /// Logical negation, where one is representable as a single constraint.
    pub fn negate(&self) -> Option<Self> {
        match *self {
            Self::FixedValue { workshop, slot } => Some(Self::ForbiddenValue { workshop, slot }),
            Self::ForbiddenValue { workshop, slot } => Some(Self::FixedValue { workshop, slot }),
            Self::Equals { first, second } => Some(Self::NotEquals { first, second }),
            Self::NotEquals { first, second } => Some(Self::Equals { first, second }),
            Self::Contains {
                participant,
                workshop,
            } => Some(Self::NotContains {
                participant,
                workshop,
            }),
            Self::NotContains {
                participant,
                workshop,
            } => Some(Self::Contains {
                participant,
                workshop,
            }),
            Self::Offset { .. } | Self::SequenceEquals { .. } => None,
        }
    }

    /// Whether this constrains the workshop → slot mapping.
    pub fn is_scheduling(&self) -> bool {
        matches!(
            self,
            Self::FixedValue { .. }
                | Self::ForbiddenValue { .. }
                | Self::Equals { .. }
                | Self::NotEquals { .. }
                | Self::Offset { .. }
        )
    }

    /// Workshops referenced by this constraint.
    pub fn workshops(&self) -> Vec<usize> {
        match *self {
            Self::FixedValue { workshop, .. } | Self::ForbiddenValue { workshop, .. } => {
                vec![workshop]
            }
            Self::Equals { first, second }
            | Self::NotEquals { first, second }
            | Self::Offset { first, second, .. } => vec![first, second],
            Self::Contains { workshop, .. } | Self::NotContains { workshop, .. } => vec![workshop],
            Self::SequenceEquals {
                kind: SequenceKind::WorkshopParticipants,
                first,
                second,
            } => vec![first, second],
            Self::SequenceEquals { .. } => Vec::new(),
        }
    }

    /// Participants referenced by this constraint.
    pub fn participants(&self) -> Vec<usize> {
        match *self {
            Self::Contains { participant, .. } | Self::NotContains { participant, .. } => {
                vec![participant]
            }
            Self::SequenceEquals {
                kind: SequenceKind::ParticipantWorkshops,
                first,
                second,
            } => vec![first, second],
            _ => Vec::new(),
        }
    }

    /// Canonical form: symmetric relations ordered, trivial ones dropped.
    ///
    /// Returns `None` for tautologies such as `Equals(w, w)`.
    pub(crate) fn reduce(self) -> Option<Self> {
        match self {
            Self::Equals { first, second } if first == second => None,
            Self::Offset {
                first,
                second,
                offset: 0,
            } => Self::Equals { first, second }.reduce(),
            Self::Offset {
                first,
                second,
                offset,
            } if offset < 0 => Some(Self::Offset {
                first: second,
                second: first,
                offset: -offset,
            }),
            Self::SequenceEquals { first, second, .. } if first == second => None,
            Self::Equals { first, second } => Some(Self::Equals {
                first: first.min(second),
                second: first.max(second),
            }),
            Self::NotEquals { first, second } => Some(Self::NotEquals {
                first: first.min(second),
                second: first.max(second),
            }),
            Self::SequenceEquals {
                kind,
                first,
                second,
            } => Some(Self::SequenceEquals {
                kind,
                first: first.min(second),
                second: first.max(second),
            }),
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negate_pairs() {
        assert_eq!(Constraint::fixed(1, 2).negate(), Some(Constraint::forbidden(1, 2)));
        assert_eq!(Constraint::forbidden(1, 2).negate(), Some(Constraint::fixed(1, 2)));
        assert_eq!(
            Constraint::same_slot(0, 3).negate(),
            Some(Constraint::different_slot(0, 3))
        );
        assert_eq!(Constraint::attends(4, 1).negate(), Some(Constraint::avoids(4, 1)));
        assert_eq!(Constraint::offset(0, 1, 1).negate(), None);
        assert_eq!(Constraint::same_audience(0, 1).negate(), None);
    }

    #[test]
    fn test_negate_is_involution() {
        let c = Constraint::avoids(2, 7);
        assert_eq!(c.negate().and_then(|n| n.negate()), Some(c));
    }

    #[test]
    fn test_reduce_canonical() {
        assert_eq!(Constraint::same_slot(3, 3).reduce(), None);
        assert_eq!(
            Constraint::same_slot(5, 2).reduce(),
            Some(Constraint::same_slot(2, 5))
        );
        assert_eq!(
            Constraint::offset(4, 1, -2).reduce(),
            Some(Constraint::offset(1, 4, 2))
        );
        assert_eq!(
            Constraint::offset(4, 1, 0).reduce(),
            Some(Constraint::same_slot(1, 4))
        );
        assert_eq!(Constraint::same_workshops(1, 1).reduce(), None);
    }

    #[test]
    fn test_classification() {
        assert!(Constraint::fixed(0, 0).is_scheduling());
        assert!(Constraint::offset(0, 1, 1).is_scheduling());
        assert!(!Constraint::attends(0, 0).is_scheduling());
        assert!(!Constraint::same_audience(0, 1).is_scheduling());
        assert_eq!(Constraint::same_audience(0, 1).workshops(), vec![0, 1]);
        assert!(Constraint::same_workshops(0, 1).workshops().is_empty());
        assert_eq!(Constraint::same_workshops(0, 1).participants(), vec![0, 1]);
    }
}
