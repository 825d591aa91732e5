//! Input validation for workshop problems.
//!
//! Checks structural integrity of workshops, participants, slots and
//! constraints before the problem model is built. Detects:
//! - Duplicate names
//! - Inverted capacity ranges
//! - Preference vectors of the wrong length
//! - Out-of-range conductor, continuation and constraint references
//! - Cyclic or branching continuation chains
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{Constraint, Participant, Workshop};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same name.
    DuplicateName,
    /// A workshop's minimum exceeds its maximum.
    InvalidCapacity,
    /// A participant's preference vector does not cover every workshop.
    PreferenceLength,
    /// An index points outside the workshop/participant/slot range.
    InvalidReference,
    /// Continuation links form a cycle or a workshop continues two others.
    InvalidContinuation,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates raw input before building an [`InputData`](crate::models::InputData).
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(
    workshops: &[Workshop],
    participants: &[Participant],
    slots: &[String],
    constraints: &[Constraint],
) -> ValidationResult {
    let mut errors = Vec::new();

    check_unique("workshop", workshops.iter().map(|w| w.name.as_str()), &mut errors);
    check_unique("participant", participants.iter().map(|p| p.name.as_str()), &mut errors);
    check_unique("slot", slots.iter().map(|s| s.as_str()), &mut errors);

    for w in workshops {
        if w.min_participants > w.max_participants {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCapacity,
                format!(
                    "Workshop '{}' has min {} > max {}",
                    w.name, w.min_participants, w.max_participants
                ),
            ));
        }
        for &c in &w.conductors {
            if c >= participants.len() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("Workshop '{}' references unknown conductor #{c}", w.name),
                ));
            }
        }
        if let Some(next) = w.continuation {
            if next >= workshops.len() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("Workshop '{}' references unknown continuation #{next}", w.name),
                ));
            }
        }
    }

    for p in participants {
        if p.preferences.len() != workshops.len() {
            errors.push(ValidationError::new(
                ValidationErrorKind::PreferenceLength,
                format!(
                    "Participant '{}' ranks {} workshops, expected {}",
                    p.name,
                    p.preferences.len(),
                    workshops.len()
                ),
            ));
        }
    }

    for c in constraints {
        let bad_workshop = c.workshops().into_iter().any(|w| w >= workshops.len());
        let bad_participant = c.participants().into_iter().any(|p| p >= participants.len());
        let bad_slot = match *c {
            Constraint::FixedValue { slot, .. } | Constraint::ForbiddenValue { slot, .. } => {
                slot >= slots.len()
            }
            _ => false,
        };
        if bad_workshop || bad_participant || bad_slot {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidReference,
                format!("Constraint {c:?} references an unknown index"),
            ));
        }
    }

    if let Some(err) = detect_continuation_cycles(workshops) {
        errors.push(err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unique<'a>(
    what: &str,
    names: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateName,
                format!("Duplicate {what} name: {name}"),
            ));
        }
    }
}

/// Detects cycles and merges in the continuation graph.
///
/// Every workshop has at most one continuation, so the graph is a set of
/// chains unless a node is reached twice.
fn detect_continuation_cycles(workshops: &[Workshop]) -> Option<ValidationError> {
    let n = workshops.len();
    let mut predecessor: Vec<Option<usize>> = vec![None; n];
    for (w, workshop) in workshops.iter().enumerate() {
        if let Some(next) = workshop.continuation.filter(|&x| x < n) {
            if let Some(prev) = predecessor[next] {
                return Some(ValidationError::new(
                    ValidationErrorKind::InvalidContinuation,
                    format!(
                        "Workshop '{}' continues both '{}' and '{}'",
                        workshops[next].name, workshops[prev].name, workshop.name
                    ),
                ));
            }
            predecessor[next] = Some(w);
        }
    }

    // DFS along the chain; revisiting a node on the current path is a cycle
    let mut visited = vec![false; n];
    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut on_path = HashSet::new();
        let mut cur = Some(start);
        while let Some(w) = cur {
            if on_path.contains(&w) {
                return Some(ValidationError::new(
                    ValidationErrorKind::InvalidContinuation,
                    format!("Cyclic continuation involving workshop '{}'", workshops[w].name),
                ));
            }
            if visited[w] {
                break;
            }
            visited[w] = true;
            on_path.insert(w);
            cur = workshops[w].continuation.filter(|&x| x < n);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_workshops() -> Vec<Workshop> {
        vec![
            Workshop::new("Pottery", 1, 4).with_conductor(0),
            Workshop::new("Chess", 1, 4),
            Workshop::new("Chess II", 1, 4),
        ]
    }

    fn sample_participants() -> Vec<Participant> {
        vec![
            Participant::new("Ann", vec![0, 1, 2]),
            Participant::new("Bob", vec![2, 0, 1]),
        ]
    }

    fn slots() -> Vec<String> {
        vec!["Morning".into(), "Afternoon".into()]
    }

    #[test]
    fn test_valid_input() {
        let mut ws = sample_workshops();
        ws[1].continuation = Some(2);
        assert!(validate_input(&ws, &sample_participants(), &slots(), &[]).is_ok());
    }

    #[test]
    fn test_duplicate_names() {
        let ws = vec![Workshop::new("A", 1, 2), Workshop::new("A", 1, 2), Workshop::new("B", 1, 2)];
        let errors = validate_input(&ws, &sample_participants(), &slots(), &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateName && e.message.contains("workshop")));

        let dup_slots = vec!["X".to_string(), "X".to_string()];
        let errors =
            validate_input(&sample_workshops(), &sample_participants(), &dup_slots, &[]).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("slot")));
    }

    #[test]
    fn test_inverted_capacity() {
        let mut ws = sample_workshops();
        ws[0].min_participants = 9;
        let errors = validate_input(&ws, &sample_participants(), &slots(), &[]).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidCapacity);
    }

    #[test]
    fn test_preference_length() {
        let ps = vec![Participant::new("Ann", vec![0, 1])];
        let errors = validate_input(&sample_workshops(), &ps, &slots(), &[]).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::PreferenceLength);
    }

    #[test]
    fn test_invalid_references() {
        let ws = vec![Workshop::new("A", 1, 2).with_conductor(7).with_continuation(9)];
        let ps = vec![Participant::new("Ann", vec![0])];
        let constraints = vec![Constraint::fixed(0, 5), Constraint::attends(3, 0)];
        let errors = validate_input(&ws, &ps, &slots(), &constraints).unwrap_err();
        let refs = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::InvalidReference)
            .count();
        assert_eq!(refs, 4);
    }

    #[test]
    fn test_cyclic_continuation() {
        let mut ws = sample_workshops();
        ws[1].continuation = Some(2);
        ws[2].continuation = Some(1);
        let errors = validate_input(&ws, &sample_participants(), &slots(), &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidContinuation));
    }

    #[test]
    fn test_three_workshop_continuation_cycle() {
        let mut ws = sample_workshops();
        ws[0].continuation = Some(1);
        ws[1].continuation = Some(2);
        ws[2].continuation = Some(0);
        let errors = validate_input(&ws, &sample_participants(), &slots(), &[]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidContinuation);
        assert!(errors[0].message.starts_with("Cyclic continuation"));
    }

    #[test]
    fn test_self_continuation() {
        let mut ws = sample_workshops();
        ws[2].continuation = Some(2);
        let errors = validate_input(&ws, &sample_participants(), &slots(), &[]).unwrap_err();
        assert!(errors[0].message.contains("'Chess II'"));
    }

    #[test]
    fn test_slot_bound_is_exclusive() {
        let ok = vec![Constraint::fixed(0, 1), Constraint::forbidden(1, 0)];
        assert!(validate_input(&sample_workshops(), &sample_participants(), &slots(), &ok).is_ok());

        let past_end = vec![Constraint::forbidden(1, 2)];
        let errors =
            validate_input(&sample_workshops(), &sample_participants(), &slots(), &past_end)
                .unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidReference);
    }

    #[test]
    fn test_branching_continuation() {
        let mut ws = sample_workshops();
        ws[0].continuation = Some(2);
        ws[1].continuation = Some(2);
        let errors = validate_input(&ws, &sample_participants(), &slots(), &[]).unwrap_err();
        assert!(errors[0].message.contains("continues both"));
    }
}
