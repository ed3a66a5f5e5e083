//! Uniform result model shared by every EDR operation
//!
//! Expected outcomes (missing entries, uniqueness violations, malformed input) are
//! values, never panics. Three layers report through their own failure type:
//!
//! - [`StoreFailure`] at the persistence boundary
//! - [`DispatchFailure`] when handing a negotiation to the asynchronous pipeline
//! - [`ServiceFailure`] at the façade, the only type callers ever see
//!
//! Lower layers are translated into [`ServiceFailure`] through a fixed mapping:
//! `From<StoreFailure>` and [`ServiceFailure::from_dispatch`]. There are no other conversions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a façade operation
pub type ServiceResult<T> = Result<T, ServiceFailure>;

/// Result of a persistence operation
pub type StoreResult<T> = Result<T, StoreFailure>;

/// Result of handing work to the asynchronous negotiation pipeline
pub type DispatchResult<T> = Result<T, DispatchFailure>;

/// Reason attached to a [`ServiceFailure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceFailureReason {
    /// Lookup or delete target is absent
    NotFound,
    /// A live entry already exists for the key
    Conflict,
    /// Structurally invalid input
    BadRequest,
    /// Infrastructure failure not classifiable above
    Unexpected,
}

impl fmt::Display for ServiceFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unexpected => "UNEXPECTED",
        };
        f.write_str(s)
    }
}

/// Failure returned by the EDR service façade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{}: {}", .reason, .messages.join(", "))]
pub struct ServiceFailure {
    reason: ServiceFailureReason,
    messages: Vec<String>,
}

impl ServiceFailure {
    /// Create a failure with a single message
    pub fn new(reason: ServiceFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            messages: vec![message.into()],
        }
    }

    /// Create a failure carrying several messages
    pub fn with_messages(reason: ServiceFailureReason, messages: Vec<String>) -> Self {
        Self { reason, messages }
    }

    /// Create a not found failure
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ServiceFailureReason::NotFound, message)
    }

    /// Create a conflict failure
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ServiceFailureReason::Conflict, message)
    }

    /// Create a bad request failure
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ServiceFailureReason::BadRequest, message)
    }

    /// Create an unexpected failure
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ServiceFailureReason::Unexpected, message)
    }

    /// Translate a dispatch failure. Every dispatch failure is unexpected at the façade.
    pub fn from_dispatch(failure: DispatchFailure) -> Self {
        Self::with_messages(ServiceFailureReason::Unexpected, failure.messages)
    }

    /// Reason for the failure
    pub fn reason(&self) -> ServiceFailureReason {
        self.reason
    }

    /// Human-readable messages
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Messages joined into one detail string
    pub fn failure_detail(&self) -> String {
        self.messages.join(", ")
    }
}

impl From<StoreFailure> for ServiceFailure {
    fn from(failure: StoreFailure) -> Self {
        let reason = match failure.reason {
            StoreFailureReason::NotFound => ServiceFailureReason::NotFound,
            StoreFailureReason::AlreadyExists => ServiceFailureReason::Conflict,
            StoreFailureReason::GenericError => ServiceFailureReason::Unexpected,
        };
        Self::new(reason, failure.message)
    }
}

/// Reason attached to a [`StoreFailure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreFailureReason {
    /// No live entry under the key
    NotFound,
    /// A live entry already exists under the key
    AlreadyExists,
    /// Persistence medium failure
    GenericError,
}

/// Failure returned by an [`EdrCache`](crate::effects::EdrCache) implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason:?}: {message}")]
pub struct StoreFailure {
    reason: StoreFailureReason,
    message: String,
}

impl StoreFailure {
    /// Create a not found failure
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            reason: StoreFailureReason::NotFound,
            message: message.into(),
        }
    }

    /// Create an already exists failure
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self {
            reason: StoreFailureReason::AlreadyExists,
            message: message.into(),
        }
    }

    /// Create a generic persistence failure
    pub fn generic_error(message: impl Into<String>) -> Self {
        Self {
            reason: StoreFailureReason::GenericError,
            message: message.into(),
        }
    }

    /// Reason for the failure
    pub fn reason(&self) -> StoreFailureReason {
        self.reason
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Status of a failed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    /// The request will never be accepted as is
    FatalError,
    /// The pipeline is saturated; the same request may be accepted later
    ErrorRetry,
}

/// Failure to accept a negotiation into the asynchronous pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{:?}: {}", .status, .messages.join(", "))]
pub struct DispatchFailure {
    status: DispatchStatus,
    messages: Vec<String>,
}

impl DispatchFailure {
    /// Create a fatal dispatch failure
    pub fn fatal(messages: Vec<String>) -> Self {
        Self {
            status: DispatchStatus::FatalError,
            messages,
        }
    }

    /// Create a retryable dispatch failure
    pub fn retry(message: impl Into<String>) -> Self {
        Self {
            status: DispatchStatus::ErrorRetry,
            messages: vec![message.into()],
        }
    }

    /// Dispatch status
    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    /// Human-readable messages
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}
