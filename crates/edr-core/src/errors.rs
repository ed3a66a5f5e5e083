//! Validation errors for structurally invalid input

use serde::{Deserialize, Serialize};

/// A request failed structural validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Invalid request: {}", .violations.join(", "))]
pub struct ValidationError {
    violations: Vec<String>,
}

impl ValidationError {
    /// Create a validation error from its violations
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }

    /// Individual violations
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Consume into the violations
    pub fn into_violations(self) -> Vec<String> {
        self.violations
    }
}

/// A query specification is structurally invalid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum QueryError {
    /// Field is not queryable
    #[error("Unknown query field: {field}")]
    UnknownField {
        /// Offending field path
        field: String,
    },

    /// Operator is not supported
    #[error("Unsupported operator '{operator}' on field {field}")]
    UnsupportedOperator {
        /// Field the criterion targets
        field: String,
        /// Offending operator
        operator: String,
    },

    /// Right operand has the wrong shape for its operator
    #[error("Invalid operand for {field}: {message}")]
    InvalidOperand {
        /// Field the criterion targets
        field: String,
        /// What is wrong
        message: String,
    },

    /// Limit is outside the accepted range
    #[error("Limit must be between 1 and {max}, got {limit}")]
    InvalidLimit {
        /// Requested limit
        limit: usize,
        /// Largest accepted limit
        max: usize,
    },
}
