//! Risk register service.
//!
//! This module provides the `RiskService` for managing risk register entries
//! through their treatment lifecycle: creation, rating edits with score
//! recomputation, formal acceptance, closure, and review tracking.
//!
//! The risk score and residual risk are derived values. They are recomputed
//! from the rating fields on every read and are never stored as independent
//! state here; hosts may persist them only as a read-optimization cache.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::audit::{AuditStore, GovernanceAuditAction, GovernanceAuditEventInput};
use crate::clock::Clock;
use crate::error::{GovernanceError, InvalidRatingError, Result};
use crate::org::{collect_descendant_ids, OrgUnit};
use crate::scoring::{classify, reduction_percent, RatingTriple};
use crate::services::ListOptions;
use crate::types::{OrgUnitId, RiskId, RiskStatus, Severity, TreatmentStrategy};

/// Days between reviews before a risk counts as overdue.
pub const REVIEW_INTERVAL_DAYS: i64 = 90;

// ============================================================================
// Domain Types
// ============================================================================

/// A risk register entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    /// Unique identifier.
    pub id: RiskId,
    /// Organizational unit the risk is scoped to.
    pub org_unit_id: OrgUnitId,
    /// Asset the scenario concerns.
    pub asset_name: String,
    /// Security area dictionary reference.
    pub security_area_id: Option<i64>,
    /// Threat dictionary references.
    pub threat_ids: Vec<i64>,
    /// Vulnerability dictionary references.
    pub vulnerability_ids: Vec<i64>,
    /// Current impact/probability/safeguard ratings.
    pub rating: RatingTriple,
    /// Ratings targeted by the treatment plan, once one exists.
    pub target: Option<RatingTriple>,
    /// Register status. Orthogonal to formal acceptance.
    pub status: RiskStatus,
    /// Chosen treatment strategy.
    pub strategy: TreatmentStrategy,
    /// Risk owner.
    pub owner: Option<String>,
    /// Treatment plan description.
    pub treatment_plan: Option<String>,
    /// Deadline for the treatment plan.
    pub treatment_deadline: Option<NaiveDate>,
    /// Who formally accepted the risk.
    pub accepted_by: Option<String>,
    /// When the risk was formally accepted.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Justification recorded at acceptance.
    pub acceptance_justification: Option<String>,
    /// Next scheduled review date.
    pub next_review_date: Option<NaiveDate>,
    /// When the risk was last reviewed.
    pub last_review_at: Option<DateTime<Utc>>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl Risk {
    /// Current risk score, recomputed from the rating fields.
    pub fn score(&self) -> std::result::Result<f64, InvalidRatingError> {
        self.rating.score()
    }

    /// Severity band of the current score.
    pub fn severity(&self) -> std::result::Result<Severity, InvalidRatingError> {
        Ok(classify(self.rating.score()?))
    }

    /// Residual risk projected by the treatment targets, when set.
    pub fn residual_score(&self) -> std::result::Result<Option<f64>, InvalidRatingError> {
        self.target.map(|t| t.score()).transpose()
    }

    /// Score reduction the treatment plan would achieve, when targets are set.
    pub fn reduction_percent(&self) -> std::result::Result<Option<f64>, InvalidRatingError> {
        let Some(residual) = self.residual_score()? else {
            return Ok(None);
        };
        Ok(Some(reduction_percent(self.score()?, residual)))
    }

    /// Whether the risk has been formally accepted.
    ///
    /// Independent of [`Risk::status`]: a risk under review can already carry
    /// a sign-off.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.accepted_by.is_some()
    }

    /// Whether the risk is overdue for review as of `now`.
    ///
    /// A risk that has never been reviewed counts from its creation instant,
    /// so a never-reviewed risk older than the review window is overdue.
    /// Recomputed on read, never persisted.
    #[must_use]
    pub fn is_overdue_review(&self, now: DateTime<Utc>) -> bool {
        let anchor = self.last_review_at.unwrap_or(self.created_at);
        now - anchor > Duration::days(REVIEW_INTERVAL_DAYS)
    }
}

/// Input for creating a risk register entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRiskInput {
    /// Organizational unit the risk is scoped to.
    pub org_unit_id: OrgUnitId,
    /// Asset the scenario concerns.
    pub asset_name: String,
    /// Security area dictionary reference.
    pub security_area_id: Option<i64>,
    /// Threat dictionary references.
    pub threat_ids: Vec<i64>,
    /// Vulnerability dictionary references.
    pub vulnerability_ids: Vec<i64>,
    /// Current impact/probability/safeguard ratings.
    pub rating: RatingTriple,
    /// Ratings targeted by the treatment plan.
    pub target: Option<RatingTriple>,
    /// Chosen treatment strategy.
    pub strategy: TreatmentStrategy,
    /// Risk owner.
    pub owner: Option<String>,
    /// Treatment plan description.
    pub treatment_plan: Option<String>,
    /// Deadline for the treatment plan.
    pub treatment_deadline: Option<NaiveDate>,
}

/// Input for updating a risk register entry.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRiskInput {
    /// New organizational unit.
    pub org_unit_id: Option<OrgUnitId>,
    /// New asset name.
    pub asset_name: Option<String>,
    /// New security area reference.
    pub security_area_id: Option<i64>,
    /// New threat references.
    pub threat_ids: Option<Vec<i64>>,
    /// New vulnerability references.
    pub vulnerability_ids: Option<Vec<i64>>,
    /// New current ratings; triggers score recomputation.
    pub rating: Option<RatingTriple>,
    /// New treatment target ratings.
    pub target: Option<RatingTriple>,
    /// New treatment strategy.
    pub strategy: Option<TreatmentStrategy>,
    /// New owner.
    pub owner: Option<String>,
    /// New treatment plan.
    pub treatment_plan: Option<String>,
    /// New treatment deadline.
    pub treatment_deadline: Option<NaiveDate>,
    /// New next review date.
    pub next_review_date: Option<NaiveDate>,
}

/// Filter options for listing risks.
#[derive(Debug, Clone, Default)]
pub struct RiskFilter {
    /// Restrict to these organizational units.
    pub org_unit_ids: Option<HashSet<OrgUnitId>>,
    /// Filter by status.
    pub status: Option<RiskStatus>,
    /// Filter by severity band of the current score.
    pub severity: Option<Severity>,
    /// Filter by treatment strategy.
    pub strategy: Option<TreatmentStrategy>,
    /// Filter by formal acceptance.
    pub accepted: Option<bool>,
    /// Keep only risks overdue for review at this instant.
    pub overdue_as_of: Option<DateTime<Utc>>,
    /// Filter by asset name containing string (case-insensitive).
    pub asset_contains: Option<String>,
}

impl RiskFilter {
    fn matches(&self, risk: &Risk) -> bool {
        self.org_unit_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&risk.org_unit_id))
            && self.status.is_none_or(|s| risk.status == s)
            && self
                .severity
                .is_none_or(|band| risk.severity().map(|s| s == band).unwrap_or(false))
            && self.strategy.is_none_or(|s| risk.strategy == s)
            && self.accepted.is_none_or(|a| risk.is_accepted() == a)
            && self
                .overdue_as_of
                .is_none_or(|now| risk.is_overdue_review(now))
            && self.asset_contains.as_ref().is_none_or(|needle| {
                risk.asset_name
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for risk storage backends.
#[async_trait::async_trait]
pub trait RiskStore: Send + Sync {
    /// Get a risk by ID.
    async fn get(&self, id: RiskId) -> Result<Option<Risk>>;

    /// Create a new risk.
    async fn create(&self, input: CreateRiskInput, now: DateTime<Utc>) -> Result<Risk>;

    /// Replace an existing risk. Returns `None` when the id is unknown.
    async fn save(&self, risk: Risk) -> Result<Option<Risk>>;

    /// List risks with filtering and pagination, ordered by id.
    async fn list(&self, filter: &RiskFilter, options: &ListOptions) -> Result<Vec<Risk>>;

    /// Count risks with filtering.
    async fn count(&self, filter: &RiskFilter) -> Result<i64>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory risk store for testing.
#[derive(Debug)]
pub struct InMemoryRiskStore {
    risks: Arc<RwLock<HashMap<RiskId, Risk>>>,
    next_id: AtomicI64,
}

impl Default for InMemoryRiskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRiskStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            risks: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored risks (for testing).
    pub async fn len(&self) -> usize {
        self.risks.read().await.len()
    }

    /// Whether the store is empty (for testing).
    pub async fn is_empty(&self) -> bool {
        self.risks.read().await.is_empty()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.risks.write().await.clear();
    }
}

#[async_trait::async_trait]
impl RiskStore for InMemoryRiskStore {
    async fn get(&self, id: RiskId) -> Result<Option<Risk>> {
        Ok(self.risks.read().await.get(&id).cloned())
    }

    async fn create(&self, input: CreateRiskInput, now: DateTime<Utc>) -> Result<Risk> {
        let id = RiskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let risk = Risk {
            id,
            org_unit_id: input.org_unit_id,
            asset_name: input.asset_name,
            security_area_id: input.security_area_id,
            threat_ids: input.threat_ids,
            vulnerability_ids: input.vulnerability_ids,
            rating: input.rating,
            target: input.target,
            status: RiskStatus::Draft,
            strategy: input.strategy,
            owner: input.owner,
            treatment_plan: input.treatment_plan,
            treatment_deadline: input.treatment_deadline,
            accepted_by: None,
            accepted_at: None,
            acceptance_justification: None,
            next_review_date: None,
            last_review_at: None,
            created_at: now,
            updated_at: now,
        };
        self.risks.write().await.insert(id, risk.clone());
        Ok(risk)
    }

    async fn save(&self, risk: Risk) -> Result<Option<Risk>> {
        let mut risks = self.risks.write().await;
        if !risks.contains_key(&risk.id) {
            return Ok(None);
        }
        risks.insert(risk.id, risk.clone());
        Ok(Some(risk))
    }

    async fn list(&self, filter: &RiskFilter, options: &ListOptions) -> Result<Vec<Risk>> {
        let risks = self.risks.read().await;
        let mut results: Vec<_> = risks.values().filter(|r| filter.matches(r)).cloned().collect();
        results.sort_by_key(|r| r.id);
        Ok(results
            .into_iter()
            .skip(options.offset as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &RiskFilter) -> Result<i64> {
        let risks = self.risks.read().await;
        Ok(risks.values().filter(|r| filter.matches(r)).count() as i64)
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for managing the risk register.
pub struct RiskService {
    store: Arc<dyn RiskStore>,
    audit_store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl RiskService {
    /// Create a new risk service.
    pub fn new(
        store: Arc<dyn RiskStore>,
        audit_store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            audit_store,
            clock,
        }
    }

    /// Create a risk register entry.
    pub async fn create(&self, input: CreateRiskInput, actor: &str) -> Result<Risk> {
        validate_assessment(&input)?;

        let risk = self.store.create(input, self.clock.now()).await?;
        debug!(risk_id = %risk.id, "risk created");

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                risk_id: Some(risk.id),
                action: GovernanceAuditAction::RiskCreated,
                actor: actor.to_string(),
                after_state: Some(serde_json::to_value(&risk).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(risk)
    }

    /// Get a risk by ID.
    pub async fn get(&self, id: RiskId) -> Result<Option<Risk>> {
        self.store.get(id).await
    }

    /// Update a risk register entry.
    ///
    /// Rating edits are permitted in any non-closed status; the derived score
    /// follows the new ratings immediately since it is computed on read.
    pub async fn update(&self, id: RiskId, input: UpdateRiskInput, actor: &str) -> Result<Risk> {
        let before = self.require_open(id).await?;

        if let Some(rating) = &input.rating {
            rating.validate()?;
        }
        if let Some(target) = &input.target {
            target.validate()?;
        }
        if let Some(asset_name) = &input.asset_name {
            if asset_name.trim().is_empty() {
                return Err(GovernanceError::BlankField("asset_name"));
            }
        }

        let mut risk = before.clone();
        if let Some(org_unit_id) = input.org_unit_id {
            risk.org_unit_id = org_unit_id;
        }
        if let Some(asset_name) = input.asset_name {
            risk.asset_name = asset_name;
        }
        if let Some(security_area_id) = input.security_area_id {
            risk.security_area_id = Some(security_area_id);
        }
        if let Some(threat_ids) = input.threat_ids {
            risk.threat_ids = threat_ids;
        }
        if let Some(vulnerability_ids) = input.vulnerability_ids {
            risk.vulnerability_ids = vulnerability_ids;
        }
        if let Some(rating) = input.rating {
            risk.rating = rating;
        }
        if let Some(target) = input.target {
            risk.target = Some(target);
        }
        if let Some(strategy) = input.strategy {
            risk.strategy = strategy;
        }
        if let Some(owner) = input.owner {
            risk.owner = Some(owner);
        }
        if let Some(treatment_plan) = input.treatment_plan {
            risk.treatment_plan = Some(treatment_plan);
        }
        if let Some(treatment_deadline) = input.treatment_deadline {
            risk.treatment_deadline = Some(treatment_deadline);
        }
        if let Some(next_review_date) = input.next_review_date {
            risk.next_review_date = Some(next_review_date);
        }
        risk.updated_at = self.clock.now();

        let updated = self
            .store
            .save(risk)
            .await?
            .ok_or(GovernanceError::RiskNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                risk_id: Some(id),
                action: GovernanceAuditAction::RiskUpdated,
                actor: actor.to_string(),
                before_state: Some(serde_json::to_value(&before).unwrap_or_default()),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Move a risk between working statuses.
    ///
    /// Closing goes through [`RiskService::close`]; a closed risk rejects any
    /// further transition.
    pub async fn set_status(&self, id: RiskId, status: RiskStatus, actor: &str) -> Result<Risk> {
        let before = self.require_open(id).await?;

        if status == RiskStatus::Closed {
            return Err(GovernanceError::InvalidRiskTransition {
                from: before.status,
                to: status,
            });
        }

        let mut risk = before.clone();
        risk.status = status;
        risk.updated_at = self.clock.now();

        let updated = self
            .store
            .save(risk)
            .await?
            .ok_or(GovernanceError::RiskNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                risk_id: Some(id),
                action: GovernanceAuditAction::RiskUpdated,
                actor: actor.to_string(),
                before_state: Some(serde_json::to_value(&before).unwrap_or_default()),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Formally accept a risk, or re-affirm an earlier acceptance.
    ///
    /// Acceptance is orthogonal to status: the register status is left
    /// untouched. Re-accepting overwrites the acceptor and timestamp rather
    /// than erroring.
    #[instrument(skip(self, justification), fields(risk_id = %id))]
    pub async fn accept(
        &self,
        id: RiskId,
        accepted_by: &str,
        justification: Option<String>,
    ) -> Result<Risk> {
        if accepted_by.trim().is_empty() {
            return Err(GovernanceError::BlankField("accepted_by"));
        }

        let before = self.require_open(id).await?;

        let mut risk = before.clone();
        risk.accepted_by = Some(accepted_by.to_string());
        risk.accepted_at = Some(self.clock.now());
        risk.acceptance_justification = justification;
        risk.updated_at = self.clock.now();

        let updated = self
            .store
            .save(risk)
            .await?
            .ok_or(GovernanceError::RiskNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                risk_id: Some(id),
                action: GovernanceAuditAction::RiskAccepted,
                actor: accepted_by.to_string(),
                before_state: Some(serde_json::to_value(&before).unwrap_or_default()),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Close a risk. Closing is terminal: no reopen operation exists.
    #[instrument(skip(self), fields(risk_id = %id))]
    pub async fn close(&self, id: RiskId, actor: &str) -> Result<Risk> {
        let before = self.require_open(id).await?;

        let mut risk = before.clone();
        risk.status = RiskStatus::Closed;
        risk.updated_at = self.clock.now();

        let updated = self
            .store
            .save(risk)
            .await?
            .ok_or(GovernanceError::RiskNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                risk_id: Some(id),
                action: GovernanceAuditAction::RiskClosed,
                actor: actor.to_string(),
                before_state: Some(serde_json::to_value(&before).unwrap_or_default()),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Record a completed review, resetting the overdue window.
    pub async fn mark_reviewed(&self, id: RiskId, actor: &str) -> Result<Risk> {
        let before = self.require_open(id).await?;

        let now = self.clock.now();
        let mut risk = before.clone();
        risk.last_review_at = Some(now);
        risk.next_review_date = Some(self.clock.today() + Duration::days(REVIEW_INTERVAL_DAYS));
        risk.updated_at = now;

        let updated = self
            .store
            .save(risk)
            .await?
            .ok_or(GovernanceError::RiskNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                risk_id: Some(id),
                action: GovernanceAuditAction::RiskReviewed,
                actor: actor.to_string(),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Whether a risk is overdue for review right now.
    pub async fn is_overdue_review(&self, id: RiskId) -> Result<bool> {
        let risk = self
            .store
            .get(id)
            .await?
            .ok_or(GovernanceError::RiskNotFound(id))?;
        Ok(risk.is_overdue_review(self.clock.now()))
    }

    /// List risks with filtering and pagination.
    pub async fn list(&self, filter: &RiskFilter, options: &ListOptions) -> Result<Vec<Risk>> {
        self.store.list(filter, options).await
    }

    /// Count risks with filtering.
    pub async fn count(&self, filter: &RiskFilter) -> Result<i64> {
        self.store.count(filter).await
    }

    /// List risks scoped to an organizational unit and everything beneath it.
    ///
    /// An unknown unit scopes to nothing and yields an empty list.
    pub async fn list_in_org_subtree(
        &self,
        org_tree: &[OrgUnit],
        unit: OrgUnitId,
        mut filter: RiskFilter,
        options: &ListOptions,
    ) -> Result<Vec<Risk>> {
        filter.org_unit_ids = Some(collect_descendant_ids(org_tree, unit));
        self.store.list(&filter, options).await
    }

    /// List risks currently overdue for review.
    pub async fn list_overdue(&self, mut filter: RiskFilter, options: &ListOptions) -> Result<Vec<Risk>> {
        filter.overdue_as_of = Some(self.clock.now());
        self.store.list(&filter, options).await
    }

    /// Load a risk and reject the operation if it is closed.
    async fn require_open(&self, id: RiskId) -> Result<Risk> {
        let risk = self
            .store
            .get(id)
            .await?
            .ok_or(GovernanceError::RiskNotFound(id))?;
        if risk.status == RiskStatus::Closed {
            return Err(GovernanceError::RiskClosed(id));
        }
        Ok(risk)
    }
}

/// Shared creation-time validation, also used by the exception wizard.
pub(crate) fn validate_assessment(input: &CreateRiskInput) -> Result<()> {
    if input.asset_name.trim().is_empty() {
        return Err(GovernanceError::BlankField("asset_name"));
    }
    input.rating.validate()?;
    if let Some(target) = &input.target {
        target.validate()?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
