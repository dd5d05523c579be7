//! Type definitions for the governance domain.
//!
//! Includes newtype wrappers for record IDs and enums for domain values.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ID Types (Newtype Pattern)
// ============================================================================

/// Unique identifier for a risk register entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskId(pub i64);

impl RiskId {
    /// Get the inner key.
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RiskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RiskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RiskId> for i64 {
    fn from(id: RiskId) -> Self {
        id.0
    }
}

/// Unique identifier for a policy exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExceptionId(pub i64);

impl ExceptionId {
    /// Get the inner key.
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ExceptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ExceptionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ExceptionId> for i64 {
    fn from(id: ExceptionId) -> Self {
        id.0
    }
}

/// Unique identifier for a remediation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub i64);

impl ActionId {
    /// Get the inner key.
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ActionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ActionId> for i64 {
    fn from(id: ActionId) -> Self {
        id.0
    }
}

/// Unique identifier for an organizational unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgUnitId(pub i64);

impl OrgUnitId {
    /// Get the inner key.
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl fmt::Display for OrgUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrgUnitId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<OrgUnitId> for i64 {
    fn from(id: OrgUnitId) -> Self {
        id.0
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Severity band of a computed risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grc_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Score below the medium band.
    #[default]
    Low,
    /// Score within the medium band.
    Medium,
    /// Score at or above the high band.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Risk register entry status.
///
/// Formal acceptance is a separate axis tracked through `accepted_by`;
/// a risk can be in review and already accepted at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grc_risk_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    /// Entry is being drafted.
    #[default]
    Draft,
    /// Entry is under review.
    InReview,
    /// Entry has passed review.
    Accepted,
    /// Entry is closed; closing is terminal.
    Closed,
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::InReview => write!(f, "in_review"),
            Self::Accepted => write!(f, "accepted"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Policy exception status.
///
/// Expiry is not a stored status; it is derived from `expiry_date` on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grc_exception_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExceptionStatus {
    /// Exception has been requested and awaits approval.
    #[default]
    Requested,
    /// Exception has been approved but is not yet in force.
    Approved,
    /// Exception is in force.
    Active,
    /// Exception was soft-closed; archiving is terminal.
    Archived,
}

impl fmt::Display for ExceptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Approved => write!(f, "approved"),
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// Remediation action status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grc_action_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Action has not been started.
    #[default]
    Open,
    /// Action is being worked on.
    InProgress,
    /// Action is done.
    Completed,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Treatment strategy chosen for a risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grc_treatment_strategy", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TreatmentStrategy {
    /// Reduce the risk with safeguards and remediation actions.
    #[default]
    Mitigate,
    /// Accept the risk as-is.
    Accept,
    /// Transfer the risk to a third party.
    Transfer,
    /// Avoid the activity producing the risk.
    Avoid,
}

impl fmt::Display for TreatmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mitigate => write!(f, "mitigate"),
            Self::Accept => write!(f, "accept"),
            Self::Transfer => write!(f, "transfer"),
            Self::Avoid => write!(f, "avoid"),
        }
    }
}

// ============================================================================
// Entity Links
// ============================================================================

/// Kind of record a remediation action can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grc_linked_entity_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LinkedEntityType {
    /// A risk register entry.
    Risk,
    /// A policy exception.
    Exception,
    /// An asset inventory entry.
    Asset,
}

impl fmt::Display for LinkedEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Risk => write!(f, "risk"),
            Self::Exception => write!(f, "exception"),
            Self::Asset => write!(f, "asset"),
        }
    }
}

/// A `(entity_type, entity_id)` pair stored on a remediation action.
///
/// The action side is the authoritative copy; the "linked actions" view on a
/// risk or exception is always derived by querying actions for this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityLink {
    /// Kind of the linked record.
    pub entity_type: LinkedEntityType,
    /// Key of the linked record.
    pub entity_id: i64,
}

impl EntityLink {
    /// Link to a risk register entry.
    pub fn risk(id: RiskId) -> Self {
        Self {
            entity_type: LinkedEntityType::Risk,
            entity_id: id.into_inner(),
        }
    }

    /// Link to a policy exception.
    pub fn exception(id: ExceptionId) -> Self {
        Self {
            entity_type: LinkedEntityType::Exception,
            entity_id: id.into_inner(),
        }
    }

    /// Link to an asset inventory entry.
    pub fn asset(id: i64) -> Self {
        Self {
            entity_type: LinkedEntityType::Asset,
            entity_id: id,
        }
    }
}

impl fmt::Display for EntityLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}
