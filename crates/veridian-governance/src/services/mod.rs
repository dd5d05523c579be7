//! Service layer for the GRC registers.
//!
//! This module provides business logic services for the risk register,
//! policy exceptions, and remediation actions. Each service validates its
//! inputs, applies the treatment-lifecycle rules, and logs audit events;
//! storage is reached through per-entity store traits with in-memory
//! implementations for testing and embedding.

pub mod action;
pub mod exception;
pub mod risk;

// Re-export commonly used types
pub use action::{
    Action, ActionFilter, ActionService, ActionStore, CreateActionInput, InMemoryActionStore,
    UpdateActionInput,
};
pub use exception::{
    CreateExceptionInput, ExceptionFilter, ExceptionService, ExceptionStore, InMemoryExceptionStore,
    PolicyException, RiskAssessmentInput, UpdateExceptionInput, EXPIRING_SOON_DAYS,
    MAX_EXCEPTION_MONTHS,
};
pub use risk::{
    CreateRiskInput, InMemoryRiskStore, Risk, RiskFilter, RiskService, RiskStore, UpdateRiskInput,
    REVIEW_INTERVAL_DAYS,
};

/// Options for list operations.
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Maximum number of results.
    pub limit: i64,
    /// Number of results to skip.
    pub offset: i64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}
