//! Test fixture factories for integration tests.

use chrono::NaiveDate;
use veridian_governance::scoring::RatingTriple;
use veridian_governance::services::action::CreateActionInput;
use veridian_governance::services::exception::{CreateExceptionInput, RiskAssessmentInput};
use veridian_governance::services::risk::CreateRiskInput;
use veridian_governance::types::{OrgUnitId, TreatmentStrategy};

/// Parse a `YYYY-MM-DD` date.
pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// A medium-severity risk input for a named asset.
pub fn risk_input(asset: &str) -> CreateRiskInput {
    CreateRiskInput {
        org_unit_id: OrgUnitId(1),
        asset_name: asset.to_string(),
        security_area_id: Some(3),
        threat_ids: vec![10],
        vulnerability_ids: vec![20],
        rating: RatingTriple::new(2, 2, 0.25),
        target: None,
        strategy: TreatmentStrategy::Mitigate,
        owner: Some("jsmith".to_string()),
        treatment_plan: None,
        treatment_deadline: None,
    }
}

/// A complete risk assessment payload for the exception wizard.
pub fn assessment(asset: &str) -> RiskAssessmentInput {
    RiskAssessmentInput {
        asset_name: Some(asset.to_string()),
        security_area_id: Some(2),
        threat_ids: vec![7],
        vulnerability_ids: vec![12],
        impact: Some(2),
        probability: Some(2),
        safeguard: Some(0.25),
        ..Default::default()
    }
}

/// A three-month exception input with a complete assessment.
pub fn exception_input(title: &str) -> CreateExceptionInput {
    CreateExceptionInput {
        policy_id: 4,
        org_unit_id: OrgUnitId(1),
        title: title.to_string(),
        description: None,
        requested_by: "jsmith".to_string(),
        start_date: date("2025-06-01"),
        expiry_date: date("2025-09-01"),
        risk: assessment("Legacy VPN appliance"),
    }
}

/// A remediation action input.
pub fn action_input(title: &str) -> CreateActionInput {
    CreateActionInput {
        title: title.to_string(),
        owner: Some("jsmith".to_string()),
        due_date: None,
        origin: None,
    }
}
