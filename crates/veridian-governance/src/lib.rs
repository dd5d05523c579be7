//! Governance, risk and compliance (GRC) domain logic.
//!
//! This crate provides the core domain logic behind the risk register,
//! policy exceptions, and remediation actions: quantitative risk scoring,
//! the treatment lifecycle, entity linkage, and organizational scoping.
//!
//! # Features
//!
//! - Deterministic risk scoring (`e^impact × probability / safeguard`) with
//!   severity band classification
//! - Residual-risk projection and reduction percentage for planned treatments
//! - Risk treatment lifecycle: drafting, review, formal acceptance sign-off,
//!   terminal closure, and overdue-review detection
//! - Policy exceptions created atomically with their mandatory risk
//!   assessment, with a six-month expiry ceiling and derived expiry flags
//! - Remediation actions holding the authoritative link set to risks,
//!   exceptions, and assets
//! - Organizational tree queries for unit-and-descendants report scoping
//! - Audit logging for all register changes
//!
//! # Services
//!
//! The [`services`] module provides business logic for:
//! - [`services::RiskService`] - risk register CRUD, acceptance, closure,
//!   review tracking
//! - [`services::ExceptionService`] - policy exception wizard, approval
//!   workflow, archiving
//! - [`services::ActionService`] - remediation actions and link management
//!
//! Storage is reached through per-entity store traits with in-memory
//! implementations for testing and embedding; time is read through the
//! [`clock::Clock`] trait so expiry and overdue predicates stay
//! deterministic under test.

pub mod audit;
pub mod clock;
pub mod error;
pub mod org;
pub mod scoring;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{GovernanceError, InvalidRatingError, Result};
pub use types::{
    ActionId,
    ActionStatus,
    EntityLink,
    ExceptionId,
    ExceptionStatus,
    LinkedEntityType,
    OrgUnitId,
    RiskId,
    RiskStatus,
    Severity,
    TreatmentStrategy,
};

// Re-export the scoring engine surface
pub use scoring::{
    classify, reduction_percent, residual, score, RatingTriple, HIGH_THRESHOLD, MEDIUM_THRESHOLD,
};

// Re-export hierarchy queries
pub use org::{build_path_map, collect_descendant_ids, flatten, FlatUnit, OrgUnit};

// Re-export service types
pub use services::{
    Action,
    ActionService,
    ActionStore,
    CreateActionInput,
    CreateExceptionInput,
    CreateRiskInput,
    ExceptionService,
    ExceptionStore,
    InMemoryActionStore,
    InMemoryExceptionStore,
    InMemoryRiskStore,
    ListOptions,
    PolicyException,
    Risk,
    RiskAssessmentInput,
    RiskService,
    RiskStore,
    UpdateActionInput,
    UpdateExceptionInput,
    UpdateRiskInput,
};

// Re-export clock and audit types
pub use audit::{AuditStore, GovernanceAuditAction, GovernanceAuditEvent, InMemoryAuditStore};
pub use clock::{Clock, FixedClock, SystemClock};
