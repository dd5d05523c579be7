//! Common test utilities for veridian-governance integration tests.
//!
//! Provides shared wiring for integration testing the governance crate. All
//! tests use in-memory stores and a fixed clock for isolation and
//! determinism.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use veridian_governance::audit::InMemoryAuditStore;
use veridian_governance::clock::FixedClock;
use veridian_governance::services::action::{ActionService, InMemoryActionStore};
use veridian_governance::services::exception::{ExceptionService, InMemoryExceptionStore};
use veridian_governance::services::risk::{InMemoryRiskStore, RiskService};

/// All the in-memory stores for test isolation.
#[derive(Clone)]
pub struct TestStores {
    pub risk_store: Arc<InMemoryRiskStore>,
    pub exception_store: Arc<InMemoryExceptionStore>,
    pub action_store: Arc<InMemoryActionStore>,
    pub audit_store: Arc<InMemoryAuditStore>,
}

impl TestStores {
    /// Create a new set of isolated test stores.
    pub fn new() -> Self {
        Self {
            risk_store: Arc::new(InMemoryRiskStore::new()),
            exception_store: Arc::new(InMemoryExceptionStore::new()),
            action_store: Arc::new(InMemoryActionStore::new()),
            audit_store: Arc::new(InMemoryAuditStore::new()),
        }
    }
}

/// The governance services wired to the test stores.
pub struct TestServices {
    pub risk: RiskService,
    pub exception: ExceptionService,
    pub action: ActionService,
}

/// Everything an integration test needs.
pub struct TestContext {
    pub stores: TestStores,
    pub services: TestServices,
    pub clock: Arc<FixedClock>,
}

impl TestContext {
    /// Create a context pinned to the default test instant.
    pub fn new() -> Self {
        Self::at("2025-06-01T09:00:00Z".parse().unwrap())
    }

    /// Create a context pinned to a chosen instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        let stores = TestStores::new();
        let clock = Arc::new(FixedClock::new(instant));
        let services = TestServices {
            risk: RiskService::new(
                stores.risk_store.clone(),
                stores.audit_store.clone(),
                clock.clone(),
            ),
            exception: ExceptionService::new(
                stores.exception_store.clone(),
                stores.risk_store.clone(),
                stores.audit_store.clone(),
                clock.clone(),
            ),
            action: ActionService::new(
                stores.action_store.clone(),
                stores.audit_store.clone(),
                clock.clone(),
            ),
        };
        Self {
            stores,
            services,
            clock,
        }
    }
}
