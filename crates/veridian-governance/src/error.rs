//! Error types for the governance domain.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{ActionId, ExceptionId, ExceptionStatus, RiskId, RiskStatus};

/// A rating input outside the scoring domain.
///
/// Raised by the scoring engine instead of silently producing NaN or
/// infinity from out-of-domain input.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidRatingError {
    /// Impact rating outside the 1-3 scale.
    #[error("impact rating must be between 1 and 3, got {0}")]
    ImpactOutOfRange(u8),

    /// Probability rating outside the 1-3 scale.
    #[error("probability rating must be between 1 and 3, got {0}")]
    ProbabilityOutOfRange(u8),

    /// Safeguard rating not a finite value in (0, 1].
    #[error("safeguard rating must be a finite value in (0, 1], got {0}")]
    SafeguardOutOfRange(f64),
}

/// Errors that can occur in governance operations.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// A rating input was outside the scoring domain.
    #[error(transparent)]
    InvalidRating(#[from] InvalidRatingError),

    /// The specified risk was not found.
    #[error("risk not found: {0}")]
    RiskNotFound(RiskId),

    /// The specified policy exception was not found.
    #[error("policy exception not found: {0}")]
    ExceptionNotFound(ExceptionId),

    /// The specified remediation action was not found.
    #[error("remediation action not found: {0}")]
    ActionNotFound(ActionId),

    /// The risk is closed and rejects further mutation.
    #[error("risk {0} is closed and can no longer be modified")]
    RiskClosed(RiskId),

    /// The exception is archived and rejects further mutation.
    #[error("policy exception {0} is archived and can no longer be modified")]
    ExceptionArchived(ExceptionId),

    /// The requested risk status change is not a permitted transition.
    #[error("cannot move risk from {from} to {to}")]
    InvalidRiskTransition {
        /// Status the risk currently has.
        from: RiskStatus,
        /// Status that was requested.
        to: RiskStatus,
    },

    /// The requested exception status change is not a permitted transition.
    #[error("cannot move policy exception from {from} to {to}")]
    InvalidExceptionTransition {
        /// Status the exception currently has.
        from: ExceptionStatus,
        /// Status that was requested.
        to: ExceptionStatus,
    },

    /// Exception expiry beyond the six-month ceiling from its start date.
    #[error("expiry date {expiry} exceeds the six-month ceiling from start date {start}")]
    ExpiryBeyondCeiling {
        /// Exception start date.
        start: NaiveDate,
        /// Requested expiry date.
        expiry: NaiveDate,
    },

    /// Exception expiry precedes its start date.
    #[error("expiry date {expiry} precedes start date {start}")]
    ExpiryBeforeStart {
        /// Exception start date.
        start: NaiveDate,
        /// Requested expiry date.
        expiry: NaiveDate,
    },

    /// The risk assessment accompanying an exception is missing a field.
    #[error("risk assessment is incomplete: missing {0}")]
    IncompleteAssessment(&'static str),

    /// A required free-text field was empty or whitespace.
    #[error("{0} must not be blank")]
    BlankField(&'static str),
}

/// Convenience Result type for governance operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
