//! Error types for the discrete-choice engine

use thiserror::Error;

/// Discrete-choice error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The utility map handed to a distribution function was empty.
    #[error("Empty input: received an empty utility map")]
    EmptyInput,

    /// One or more alternatives have no anchor in the structure or model.
    #[error("Unknown alternative(s): {}", .0.join(", "))]
    UnknownAlternative(Vec<String>),

    /// Allocation weights of cross-nested alternatives do not sum to one.
    ///
    /// Carries `(alternative, sum of alpha)` for every offender.
    #[error("Allocation weights do not sum to 1 for: {}", format_weights(.0))]
    InvalidAllocationWeights(Vec<(String, f64)>),

    /// Selection was requested from an empty probability map.
    #[error("Cannot select from an empty choice set")]
    EmptyChoiceSet,

    /// The nest structure could not be built.
    #[error("Structure error: {0}")]
    Structure(String),

    /// Internal invariant broken during evaluation (a bug, not a user error).
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parameter or utility expression could not be parsed.
    #[error("Expression error: {0}")]
    Expression(String),
}

fn format_weights(weights: &[(String, f64)]) -> String {
    weights.iter().map(|(alt, sum)| format!("{alt} (sum {sum})")).collect::<Vec<_>>().join(", ")
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_alternative_names_every_offender() {
        let err = Error::UnknownAlternative(vec!["WALK".into(), "TRAM".into()]);
        assert_eq!(err.to_string(), "Unknown alternative(s): WALK, TRAM");
    }

    #[test]
    fn test_allocation_weights_message() {
        let err = Error::InvalidAllocationWeights(vec![("1".into(), 0.7)]);
        assert_eq!(err.to_string(), "Allocation weights do not sum to 1 for: 1 (sum 0.7)");
    }
}
