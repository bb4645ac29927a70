//! Engine error types.
//!
//! Validation failures are returned to the immediate caller before any
//! scoring happens. Degraded data (unknown modality, unknown case) is not an
//! error and never appears here.

use thiserror::Error;

/// Malformed or out-of-range input rejected before scoring.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Age below zero or above the plausible maximum.
    #[error("invalid age: {0}")]
    InvalidAge(i32),

    /// Chief complaint is empty or whitespace.
    #[error("chief complaint is empty")]
    EmptyComplaint,

    /// A lab result carries a NaN or infinite value.
    #[error("lab result '{0}' has a non-finite value")]
    NonFiniteLab(String),

    /// Modality identifier is empty or whitespace.
    #[error("modality identifier is empty")]
    EmptyModalityId,

    /// Radiation dose is negative or not a number.
    #[error("modality '{id}' has invalid radiation dose {value} mSv")]
    InvalidRadiation { id: String, value: f64 },

    /// Typical cost is negative or not a number.
    #[error("modality '{id}' has invalid cost {value}")]
    InvalidCost { id: String, value: f64 },

    /// Engine baseline off the 1-9 scale or not a number.
    #[error("baseline score {0} is outside [1, 9]")]
    InvalidBaseline(f64),
}

/// A rule table that violates the rule-base invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleBaseError {
    /// Rules with no effect are not allowed in the table.
    #[error("rule '{0}' has a zero contribution")]
    ZeroContribution(String),

    /// A single rule may move the score by at most the contribution limit.
    #[error("rule '{id}' contribution {contribution} exceeds the limit of {limit}")]
    ContributionOutOfRange {
        id: String,
        contribution: f64,
        limit: f64,
    },

    /// Two rules share the same identifier.
    #[error("duplicate rule id: {0}")]
    DuplicateRule(String),

    /// A rule that applies to no modality can never fire.
    #[error("rule '{0}' lists no modalities")]
    NoModalities(String),

    /// Modality-specific baselines must lie on the score scale.
    #[error("baseline {value} for modality '{modality}' is outside [1, 9]")]
    BaselineOutOfRange { modality: String, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(ValidationError::InvalidAge(-3).to_string(), "invalid age: -3");
        assert_eq!(
            RuleBaseError::ZeroContribution("r1".into()).to_string(),
            "rule 'r1' has a zero contribution"
        );
        assert_eq!(
            ValidationError::InvalidBaseline(0.0).to_string(),
            "baseline score 0 is outside [1, 9]"
        );
    }
}
