//! Integration tests for the risk treatment lifecycle.
//!
//! These tests walk a risk through scoring, treatment planning, acceptance,
//! review tracking, and closure against in-memory stores.

mod common;

use chrono::Duration;
use veridian_governance::error::GovernanceError;
use veridian_governance::scoring::RatingTriple;
use veridian_governance::services::risk::{RiskFilter, UpdateRiskInput, REVIEW_INTERVAL_DAYS};
use veridian_governance::services::ListOptions;
use veridian_governance::types::{RiskStatus, Severity};

use common::fixtures;
use common::TestContext;

#[tokio::test]
async fn test_full_treatment_lifecycle() {
    let ctx = TestContext::new();

    // A medium-severity scenario enters the register.
    let risk = ctx
        .services
        .risk
        .create(fixtures::risk_input("Customer database"), "jsmith")
        .await
        .expect("create risk");
    assert_eq!(risk.status, RiskStatus::Draft);
    assert_eq!(risk.severity().unwrap(), Severity::Medium);
    assert!((risk.score().unwrap() - 59.112_448_791_445_2).abs() < 1e-9);

    // A treatment plan with target ratings projects the residual risk.
    let planned = ctx
        .services
        .risk
        .update(
            risk.id,
            UpdateRiskInput {
                target: Some(RatingTriple::new(1, 1, 0.95)),
                treatment_plan: Some("Encrypt at rest, rotate credentials".to_string()),
                ..Default::default()
            },
            "jsmith",
        )
        .await
        .expect("plan treatment");
    let reduction = planned.reduction_percent().unwrap().unwrap();
    assert!((reduction - 95.159_5).abs() < 1e-3);

    // Review starts; the CISO signs off while review is still open.
    ctx.services
        .risk
        .set_status(risk.id, RiskStatus::InReview, "jsmith")
        .await
        .expect("start review");
    let accepted = ctx
        .services
        .risk
        .accept(risk.id, "ciso", Some("Residual risk tolerable".to_string()))
        .await
        .expect("accept");
    assert_eq!(accepted.status, RiskStatus::InReview);
    assert!(accepted.is_accepted());

    // Closure is terminal.
    let closed = ctx.services.risk.close(risk.id, "jsmith").await.expect("close");
    assert_eq!(closed.status, RiskStatus::Closed);
    let err = ctx
        .services
        .risk
        .update(
            risk.id,
            UpdateRiskInput {
                rating: Some(RatingTriple::new(1, 1, 0.95)),
                ..Default::default()
            },
            "jsmith",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::RiskClosed(_)));
}

#[tokio::test]
async fn test_rating_edit_moves_severity_band() {
    let ctx = TestContext::new();
    let risk = ctx
        .services
        .risk
        .create(fixtures::risk_input("Build server"), "jsmith")
        .await
        .unwrap();

    let escalated = ctx
        .services
        .risk
        .update(
            risk.id,
            UpdateRiskInput {
                rating: Some(RatingTriple::new(3, 3, 0.10)),
                ..Default::default()
            },
            "jsmith",
        )
        .await
        .unwrap();

    assert_eq!(escalated.severity().unwrap(), Severity::High);
    assert!((escalated.score().unwrap() - 602.566_1).abs() < 1e-3);
}

#[tokio::test]
async fn test_overdue_review_detection() {
    let ctx = TestContext::new();
    let risk = ctx
        .services
        .risk
        .create(fixtures::risk_input("Customer database"), "jsmith")
        .await
        .unwrap();

    // Fresh risks are not overdue even though they were never reviewed.
    assert!(!ctx.services.risk.is_overdue_review(risk.id).await.unwrap());

    // Never reviewed and older than the window: overdue.
    ctx.clock.advance(Duration::days(REVIEW_INTERVAL_DAYS + 1));
    assert!(ctx.services.risk.is_overdue_review(risk.id).await.unwrap());

    // A review resets the window.
    ctx.services.risk.mark_reviewed(risk.id, "jsmith").await.unwrap();
    ctx.clock.advance(Duration::days(10));
    assert!(!ctx.services.risk.is_overdue_review(risk.id).await.unwrap());

    // The register can list what is overdue right now.
    ctx.clock.advance(Duration::days(REVIEW_INTERVAL_DAYS));
    let overdue = ctx
        .services
        .risk
        .list_overdue(RiskFilter::default(), &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, risk.id);
}

#[tokio::test]
async fn test_register_filters() {
    let ctx = TestContext::new();
    ctx.services
        .risk
        .create(fixtures::risk_input("Customer database"), "jsmith")
        .await
        .unwrap();

    let mut high = fixtures::risk_input("Domain controller");
    high.rating = RatingTriple::new(3, 2, 0.10);
    ctx.services.risk.create(high, "jsmith").await.unwrap();

    let highs = ctx
        .services
        .risk
        .list(
            &RiskFilter {
                severity: Some(Severity::High),
                ..Default::default()
            },
            &ListOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(highs.len(), 1);
    assert_eq!(highs[0].asset_name, "Domain controller");

    let by_asset = ctx
        .services
        .risk
        .count(&RiskFilter {
            asset_contains: Some("customer".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_asset, 1);
}
