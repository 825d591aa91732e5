use thiserror::Error;

use crate::models::Violation;
use crate::validation::ValidationError;

pub type SolveResult<T> = Result<T, SolveError>;

/// Problems with the input detected before any search starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Input is structurally invalid: {}", summarize(.0))]
    Validation(Vec<ValidationError>),
    #[error("Constraints contradict each other: {0}")]
    Contradiction(String),
    #[error("Dependent workshops {group:?} have no common capacity range")]
    CapacityConflict { group: Vec<String> },
    #[error("Input has no workshops or no participants")]
    EmptyInput,
}

/// Outcome of a solve attempt that did not produce an accepted solution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("No feasible solution was found")]
    NoSolutionFound,
    #[error("Solver produced a solution violating {} invariant(s)", .0.len())]
    InvalidSolution(Vec<Violation>),
    #[error(transparent)]
    Input(#[from] InputError),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_validation_message_lists_all() {
        let err = InputError::Validation(vec![
            ValidationError::new(ValidationErrorKind::DuplicateName, "Duplicate slot name: Mon"),
            ValidationError::new(ValidationErrorKind::InvalidCapacity, "Workshop 'A' has min 5 > max 2"),
        ]);
        let text = err.to_string();
        assert!(text.contains("Mon"));
        assert!(text.contains("min 5 > max 2"));
    }

    #[test]
    fn test_input_error_converts() {
        let err: SolveError = InputError::EmptyInput.into();
        assert_eq!(err, SolveError::Input(InputError::EmptyInput));
        assert_eq!(err.to_string(), "Input has no workshops or no participants");
    }
}
