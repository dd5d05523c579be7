//! Integration tests for the policy exception workflow.
//!
//! Covers the two-step wizard (exception data plus mandatory risk
//! assessment), the approval chain, the expiry ceiling, and the derived
//! expiry flags.

mod common;

use veridian_governance::audit::AuditEventFilter;
use veridian_governance::AuditStore;
use veridian_governance::error::GovernanceError;
use veridian_governance::services::exception::ExceptionFilter;
use veridian_governance::services::ListOptions;
use veridian_governance::types::ExceptionStatus;

use common::fixtures::{self, date};
use common::TestContext;

#[tokio::test]
async fn test_wizard_creates_exception_and_risk_atomically() {
    let ctx = TestContext::new();

    let (exception, risk) = ctx
        .services
        .exception
        .create_with_risk(fixtures::exception_input("Defer MFA rollout"), "jsmith")
        .await
        .expect("create exception");

    assert_eq!(exception.risk_id, risk.id);
    assert_eq!(risk.asset_name, "Legacy VPN appliance");

    // The implicit risk is a first-class register entry.
    let stored = ctx.services.risk.get(risk.id).await.unwrap();
    assert!(stored.is_some());

    // Both creations hit the audit trail.
    let events = ctx
        .stores
        .audit_store
        .query_events(AuditEventFilter {
            risk_id: Some(risk.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_incomplete_assessment_fails_without_orphans() {
    let ctx = TestContext::new();

    let mut input = fixtures::exception_input("Defer MFA rollout");
    input.risk.safeguard = None;
    let err = ctx
        .services
        .exception
        .create_with_risk(input, "jsmith")
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::IncompleteAssessment(_)));

    assert!(ctx.stores.exception_store.is_empty().await);
    assert!(ctx.stores.risk_store.is_empty().await);
    assert_eq!(ctx.stores.audit_store.event_count().await, 0);
}

#[tokio::test]
async fn test_expiry_ceiling_boundaries() {
    let ctx = TestContext::new();

    // Exactly six months: accepted.
    let mut input = fixtures::exception_input("Six month window");
    input.expiry_date = date("2025-12-01");
    assert!(ctx
        .services
        .exception
        .create_with_risk(input, "jsmith")
        .await
        .is_ok());

    // Seven months: rejected.
    let mut input = fixtures::exception_input("Seven month window");
    input.expiry_date = date("2026-01-01");
    let err = ctx
        .services
        .exception
        .create_with_risk(input, "jsmith")
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::ExpiryBeyondCeiling { .. }));
}

#[tokio::test]
async fn test_approval_chain_and_archive() {
    let ctx = TestContext::new();
    let (exception, risk) = ctx
        .services
        .exception
        .create_with_risk(fixtures::exception_input("Defer MFA rollout"), "jsmith")
        .await
        .unwrap();

    let approved = ctx
        .services
        .exception
        .approve(exception.id, "ciso")
        .await
        .unwrap();
    assert_eq!(approved.status, ExceptionStatus::Approved);

    let active = ctx
        .services
        .exception
        .activate(exception.id, "jsmith")
        .await
        .unwrap();
    assert_eq!(active.status, ExceptionStatus::Active);

    let archived = ctx
        .services
        .exception
        .archive(exception.id, "jsmith")
        .await
        .unwrap();
    assert_eq!(archived.status, ExceptionStatus::Archived);
    assert!(archived.closed_at.is_some());

    // Soft close: the linked risk is untouched.
    assert!(ctx.services.risk.get(risk.id).await.unwrap().is_some());

    // One-directional.
    let err = ctx
        .services
        .exception
        .approve(exception.id, "ciso")
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::ExceptionArchived(_)));
}

#[tokio::test]
async fn test_expiring_soon_window_follows_clock() {
    let ctx = TestContext::new();
    ctx.services
        .exception
        .create_with_risk(fixtures::exception_input("Defer MFA rollout"), "jsmith")
        .await
        .unwrap();

    // Ninety-two days out: not yet.
    let soon = ctx
        .services
        .exception
        .list_expiring_soon(ExceptionFilter::default(), &ListOptions::default())
        .await
        .unwrap();
    assert!(soon.is_empty());

    // Thirty days before expiry: flagged.
    ctx.clock.set("2025-08-02T09:00:00Z".parse().unwrap());
    let soon = ctx
        .services
        .exception
        .list_expiring_soon(ExceptionFilter::default(), &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(soon.len(), 1);

    // Past expiry: expired, no longer merely expiring.
    ctx.clock.set("2025-09-02T09:00:00Z".parse().unwrap());
    let soon = ctx
        .services
        .exception
        .list_expiring_soon(ExceptionFilter::default(), &ListOptions::default())
        .await
        .unwrap();
    assert!(soon.is_empty());

    let expired = ctx
        .services
        .exception
        .list_expired(ExceptionFilter::default(), &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
}
