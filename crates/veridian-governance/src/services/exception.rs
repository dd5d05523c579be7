//! Policy exception service.
//!
//! A policy exception is a formally approved, time-boxed deviation from a
//! security policy. Every exception is paired with exactly one risk
//! assessment, created atomically with it through the two-step wizard: the
//! wizard collects the exception data and the risk assessment, and
//! [`ExceptionService::create_with_risk`] persists both or neither.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::audit::{AuditStore, GovernanceAuditAction, GovernanceAuditEventInput};
use crate::clock::Clock;
use crate::error::{GovernanceError, Result};
use crate::scoring::RatingTriple;
use crate::services::risk::{validate_assessment, CreateRiskInput, Risk, RiskStore};
use crate::services::ListOptions;
use crate::types::{ExceptionId, ExceptionStatus, OrgUnitId, RiskId, TreatmentStrategy};

/// Days before expiry during which an exception counts as expiring soon.
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// Ceiling on the exception window: expiry at most this many calendar months
/// after the start date.
pub const MAX_EXCEPTION_MONTHS: u32 = 6;

// ============================================================================
// Domain Types
// ============================================================================

/// A policy exception record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyException {
    /// Unique identifier.
    pub id: ExceptionId,
    /// Policy the exception deviates from.
    pub policy_id: i64,
    /// Organizational unit the exception is scoped to.
    pub org_unit_id: OrgUnitId,
    /// Short title.
    pub title: String,
    /// Detailed description.
    pub description: Option<String>,
    /// Who requested the exception.
    pub requested_by: String,
    /// Who approved the exception.
    pub approved_by: Option<String>,
    /// First day the exception is in force.
    pub start_date: NaiveDate,
    /// Last day the exception is in force.
    pub expiry_date: NaiveDate,
    /// Workflow status. Expiry is derived, not a stored status.
    pub status: ExceptionStatus,
    /// The risk assessment this exception was created with.
    pub risk_id: RiskId,
    /// When the exception was archived.
    pub closed_at: Option<DateTime<Utc>>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl PolicyException {
    /// Whether the exception has lapsed as of `today`. Recomputed on read.
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    /// Whether the exception lapses within the next 30 days. Recomputed on
    /// read; an already-expired exception is not "expiring soon".
    #[must_use]
    pub fn is_expiring_soon(&self, today: NaiveDate) -> bool {
        let days_left = (self.expiry_date - today).num_days();
        (0..=EXPIRING_SOON_DAYS).contains(&days_left)
    }
}

/// Risk assessment payload collected by the second wizard step.
///
/// Fields the wizard cannot submit without are optional here so that an
/// incomplete assessment is representable, and rejected as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskAssessmentInput {
    /// Asset the scenario concerns.
    pub asset_name: Option<String>,
    /// Security area dictionary reference.
    pub security_area_id: Option<i64>,
    /// Threat dictionary references.
    pub threat_ids: Vec<i64>,
    /// Vulnerability dictionary references.
    pub vulnerability_ids: Vec<i64>,
    /// Impact rating, 1-3.
    pub impact: Option<u8>,
    /// Probability rating, 1-3.
    pub probability: Option<u8>,
    /// Safeguard effectiveness rating in (0, 1].
    pub safeguard: Option<f64>,
    /// Ratings targeted by the treatment plan.
    pub target: Option<RatingTriple>,
    /// Treatment strategy; defaults to acceptance for exception-borne risks.
    pub strategy: Option<TreatmentStrategy>,
    /// Risk owner.
    pub owner: Option<String>,
    /// Treatment plan description.
    pub treatment_plan: Option<String>,
    /// Deadline for the treatment plan.
    pub treatment_deadline: Option<NaiveDate>,
}

impl RiskAssessmentInput {
    /// Convert into a risk creation input, rejecting incomplete payloads.
    fn into_create_risk(self, org_unit_id: OrgUnitId) -> Result<CreateRiskInput> {
        let asset_name = self
            .asset_name
            .ok_or(GovernanceError::IncompleteAssessment("asset_name"))?;
        let impact = self
            .impact
            .ok_or(GovernanceError::IncompleteAssessment("impact_level"))?;
        let probability = self
            .probability
            .ok_or(GovernanceError::IncompleteAssessment("probability_level"))?;
        let safeguard = self
            .safeguard
            .ok_or(GovernanceError::IncompleteAssessment("safeguard_rating"))?;

        let input = CreateRiskInput {
            org_unit_id,
            asset_name,
            security_area_id: self.security_area_id,
            threat_ids: self.threat_ids,
            vulnerability_ids: self.vulnerability_ids,
            rating: RatingTriple::new(impact, probability, safeguard),
            target: self.target,
            strategy: self.strategy.unwrap_or(TreatmentStrategy::Accept),
            owner: self.owner,
            treatment_plan: self.treatment_plan,
            treatment_deadline: self.treatment_deadline,
        };
        validate_assessment(&input)?;
        Ok(input)
    }
}

/// Input for creating a policy exception together with its risk assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExceptionInput {
    /// Policy the exception deviates from.
    pub policy_id: i64,
    /// Organizational unit the exception is scoped to.
    pub org_unit_id: OrgUnitId,
    /// Short title.
    pub title: String,
    /// Detailed description.
    pub description: Option<String>,
    /// Who requested the exception.
    pub requested_by: String,
    /// First day the exception is in force.
    pub start_date: NaiveDate,
    /// Last day the exception is in force.
    pub expiry_date: NaiveDate,
    /// The mandatory risk assessment.
    pub risk: RiskAssessmentInput,
}

/// Input for updating a policy exception.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExceptionInput {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New start date.
    pub start_date: Option<NaiveDate>,
    /// New expiry date; the six-month ceiling still applies.
    pub expiry_date: Option<NaiveDate>,
}

/// Filter options for listing exceptions.
#[derive(Debug, Clone, Default)]
pub struct ExceptionFilter {
    /// Filter by policy.
    pub policy_id: Option<i64>,
    /// Restrict to these organizational units.
    pub org_unit_ids: Option<HashSet<OrgUnitId>>,
    /// Filter by status.
    pub status: Option<ExceptionStatus>,
    /// Keep only exceptions expired as of this date.
    pub expired_as_of: Option<NaiveDate>,
    /// Keep only exceptions expiring soon as of this date.
    pub expiring_soon_as_of: Option<NaiveDate>,
}

impl ExceptionFilter {
    fn matches(&self, exception: &PolicyException) -> bool {
        self.policy_id.is_none_or(|id| exception.policy_id == id)
            && self
                .org_unit_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&exception.org_unit_id))
            && self.status.is_none_or(|s| exception.status == s)
            && self
                .expired_as_of
                .is_none_or(|today| exception.is_expired(today))
            && self
                .expiring_soon_as_of
                .is_none_or(|today| exception.is_expiring_soon(today))
    }
}

/// Check the exception window against the six-month ceiling.
///
/// Violations are validation errors, never a silent clamp.
fn validate_window(start: NaiveDate, expiry: NaiveDate) -> Result<()> {
    if expiry < start {
        return Err(GovernanceError::ExpiryBeforeStart { start, expiry });
    }
    let ceiling = start
        .checked_add_months(Months::new(MAX_EXCEPTION_MONTHS))
        .ok_or(GovernanceError::ExpiryBeyondCeiling { start, expiry })?;
    if expiry > ceiling {
        return Err(GovernanceError::ExpiryBeyondCeiling { start, expiry });
    }
    Ok(())
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for policy exception storage backends.
#[async_trait::async_trait]
pub trait ExceptionStore: Send + Sync {
    /// Get an exception by ID.
    async fn get(&self, id: ExceptionId) -> Result<Option<PolicyException>>;

    /// Create a new exception bound to an already-created risk.
    async fn create(
        &self,
        input: CreateExceptionInput,
        risk_id: RiskId,
        now: DateTime<Utc>,
    ) -> Result<PolicyException>;

    /// Replace an existing exception. Returns `None` when the id is unknown.
    async fn save(&self, exception: PolicyException) -> Result<Option<PolicyException>>;

    /// List exceptions with filtering and pagination, ordered by id.
    async fn list(
        &self,
        filter: &ExceptionFilter,
        options: &ListOptions,
    ) -> Result<Vec<PolicyException>>;

    /// Count exceptions with filtering.
    async fn count(&self, filter: &ExceptionFilter) -> Result<i64>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory exception store for testing.
#[derive(Debug)]
pub struct InMemoryExceptionStore {
    exceptions: Arc<RwLock<HashMap<ExceptionId, PolicyException>>>,
    next_id: AtomicI64,
}

impl Default for InMemoryExceptionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryExceptionStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            exceptions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored exceptions (for testing).
    pub async fn len(&self) -> usize {
        self.exceptions.read().await.len()
    }

    /// Whether the store is empty (for testing).
    pub async fn is_empty(&self) -> bool {
        self.exceptions.read().await.is_empty()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.exceptions.write().await.clear();
    }
}

#[async_trait::async_trait]
impl ExceptionStore for InMemoryExceptionStore {
    async fn get(&self, id: ExceptionId) -> Result<Option<PolicyException>> {
        Ok(self.exceptions.read().await.get(&id).cloned())
    }

    async fn create(
        &self,
        input: CreateExceptionInput,
        risk_id: RiskId,
        now: DateTime<Utc>,
    ) -> Result<PolicyException> {
        let id = ExceptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let exception = PolicyException {
            id,
            policy_id: input.policy_id,
            org_unit_id: input.org_unit_id,
            title: input.title,
            description: input.description,
            requested_by: input.requested_by,
            approved_by: None,
            start_date: input.start_date,
            expiry_date: input.expiry_date,
            status: ExceptionStatus::Requested,
            risk_id,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.exceptions.write().await.insert(id, exception.clone());
        Ok(exception)
    }

    async fn save(&self, exception: PolicyException) -> Result<Option<PolicyException>> {
        let mut exceptions = self.exceptions.write().await;
        if !exceptions.contains_key(&exception.id) {
            return Ok(None);
        }
        exceptions.insert(exception.id, exception.clone());
        Ok(Some(exception))
    }

    async fn list(
        &self,
        filter: &ExceptionFilter,
        options: &ListOptions,
    ) -> Result<Vec<PolicyException>> {
        let exceptions = self.exceptions.read().await;
        let mut results: Vec<_> = exceptions
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        results.sort_by_key(|e| e.id);
        Ok(results
            .into_iter()
            .skip(options.offset as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &ExceptionFilter) -> Result<i64> {
        let exceptions = self.exceptions.read().await;
        Ok(exceptions.values().filter(|e| filter.matches(e)).count() as i64)
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for managing policy exceptions.
pub struct ExceptionService {
    store: Arc<dyn ExceptionStore>,
    risk_store: Arc<dyn RiskStore>,
    audit_store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl ExceptionService {
    /// Create a new exception service.
    pub fn new(
        store: Arc<dyn ExceptionStore>,
        risk_store: Arc<dyn RiskStore>,
        audit_store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            risk_store,
            audit_store,
            clock,
        }
    }

    /// Create a policy exception and its risk assessment in one operation.
    ///
    /// Everything is validated up front; an incomplete assessment or an
    /// invalid exception window leaves no record behind. Hosts backing the
    /// stores with a database must run both inserts in one transaction.
    #[instrument(skip(self, input), fields(policy_id = input.policy_id))]
    pub async fn create_with_risk(
        &self,
        input: CreateExceptionInput,
        actor: &str,
    ) -> Result<(PolicyException, Risk)> {
        if input.title.trim().is_empty() {
            return Err(GovernanceError::BlankField("title"));
        }
        if input.requested_by.trim().is_empty() {
            return Err(GovernanceError::BlankField("requested_by"));
        }
        validate_window(input.start_date, input.expiry_date)?;

        let risk_input = input.risk.clone().into_create_risk(input.org_unit_id)?;

        let now = self.clock.now();
        let risk = self.risk_store.create(risk_input, now).await?;
        let exception = self.store.create(input, risk.id, now).await?;
        debug!(exception_id = %exception.id, risk_id = %risk.id, "policy exception created");

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                risk_id: Some(risk.id),
                action: GovernanceAuditAction::RiskCreated,
                actor: actor.to_string(),
                after_state: Some(serde_json::to_value(&risk).unwrap_or_default()),
                ..Default::default()
            })
            .await?;
        self.audit_store
            .log_event(GovernanceAuditEventInput {
                exception_id: Some(exception.id),
                risk_id: Some(risk.id),
                action: GovernanceAuditAction::ExceptionCreated,
                actor: actor.to_string(),
                after_state: Some(serde_json::to_value(&exception).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok((exception, risk))
    }

    /// Get an exception by ID.
    pub async fn get(&self, id: ExceptionId) -> Result<Option<PolicyException>> {
        self.store.get(id).await
    }

    /// Update an exception. The six-month ceiling is re-checked against the
    /// effective start/expiry pair.
    pub async fn update(
        &self,
        id: ExceptionId,
        input: UpdateExceptionInput,
        actor: &str,
    ) -> Result<PolicyException> {
        let before = self.require_open(id).await?;

        let start = input.start_date.unwrap_or(before.start_date);
        let expiry = input.expiry_date.unwrap_or(before.expiry_date);
        validate_window(start, expiry)?;

        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(GovernanceError::BlankField("title"));
            }
        }

        let mut exception = before.clone();
        if let Some(title) = input.title {
            exception.title = title;
        }
        if let Some(description) = input.description {
            exception.description = Some(description);
        }
        exception.start_date = start;
        exception.expiry_date = expiry;
        exception.updated_at = self.clock.now();

        let updated = self
            .store
            .save(exception)
            .await?
            .ok_or(GovernanceError::ExceptionNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                exception_id: Some(id),
                action: GovernanceAuditAction::ExceptionUpdated,
                actor: actor.to_string(),
                before_state: Some(serde_json::to_value(&before).unwrap_or_default()),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Approve a requested exception.
    pub async fn approve(&self, id: ExceptionId, approved_by: &str) -> Result<PolicyException> {
        if approved_by.trim().is_empty() {
            return Err(GovernanceError::BlankField("approved_by"));
        }
        let exception = self
            .transition(id, ExceptionStatus::Requested, ExceptionStatus::Approved, |e| {
                e.approved_by = Some(approved_by.to_string());
            })
            .await?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                exception_id: Some(id),
                action: GovernanceAuditAction::ExceptionApproved,
                actor: approved_by.to_string(),
                after_state: Some(serde_json::to_value(&exception).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(exception)
    }

    /// Put an approved exception in force.
    pub async fn activate(&self, id: ExceptionId, actor: &str) -> Result<PolicyException> {
        let exception = self
            .transition(id, ExceptionStatus::Approved, ExceptionStatus::Active, |_| {})
            .await?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                exception_id: Some(id),
                action: GovernanceAuditAction::ExceptionActivated,
                actor: actor.to_string(),
                after_state: Some(serde_json::to_value(&exception).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(exception)
    }

    /// Archive an exception.
    ///
    /// A soft close: the record and its linked risk and actions survive.
    /// Archiving is one-directional.
    #[instrument(skip(self), fields(exception_id = %id))]
    pub async fn archive(&self, id: ExceptionId, actor: &str) -> Result<PolicyException> {
        let before = self.require_open(id).await?;

        let now = self.clock.now();
        let mut exception = before.clone();
        exception.status = ExceptionStatus::Archived;
        exception.closed_at = Some(now);
        exception.updated_at = now;

        let updated = self
            .store
            .save(exception)
            .await?
            .ok_or(GovernanceError::ExceptionNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                exception_id: Some(id),
                action: GovernanceAuditAction::ExceptionArchived,
                actor: actor.to_string(),
                before_state: Some(serde_json::to_value(&before).unwrap_or_default()),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// List exceptions with filtering and pagination.
    pub async fn list(
        &self,
        filter: &ExceptionFilter,
        options: &ListOptions,
    ) -> Result<Vec<PolicyException>> {
        self.store.list(filter, options).await
    }

    /// Count exceptions with filtering.
    pub async fn count(&self, filter: &ExceptionFilter) -> Result<i64> {
        self.store.count(filter).await
    }

    /// List exceptions that lapse within the next 30 days.
    pub async fn list_expiring_soon(
        &self,
        mut filter: ExceptionFilter,
        options: &ListOptions,
    ) -> Result<Vec<PolicyException>> {
        filter.expiring_soon_as_of = Some(self.clock.today());
        self.store.list(&filter, options).await
    }

    /// List exceptions that have already lapsed.
    pub async fn list_expired(
        &self,
        mut filter: ExceptionFilter,
        options: &ListOptions,
    ) -> Result<Vec<PolicyException>> {
        filter.expired_as_of = Some(self.clock.today());
        self.store.list(&filter, options).await
    }

    /// Load an exception and reject the operation if it is archived.
    async fn require_open(&self, id: ExceptionId) -> Result<PolicyException> {
        let exception = self
            .store
            .get(id)
            .await?
            .ok_or(GovernanceError::ExceptionNotFound(id))?;
        if exception.status == ExceptionStatus::Archived {
            return Err(GovernanceError::ExceptionArchived(id));
        }
        Ok(exception)
    }

    /// Move an exception from `from` to `to`, applying `mutate` on the way.
    async fn transition(
        &self,
        id: ExceptionId,
        from: ExceptionStatus,
        to: ExceptionStatus,
        mutate: impl FnOnce(&mut PolicyException),
    ) -> Result<PolicyException> {
        let before = self.require_open(id).await?;
        if before.status != from {
            return Err(GovernanceError::InvalidExceptionTransition {
                from: before.status,
                to,
            });
        }

        let mut exception = before;
        exception.status = to;
        mutate(&mut exception);
        exception.updated_at = self.clock.now();

        self.store
            .save(exception)
            .await?
            .ok_or(GovernanceError::ExceptionNotFound(id))
    }
}

// ============================================================================
// Tests
// ============================================================================
