//! Audit logging for governance operations.
//!
//! Every mutation of a risk, policy exception, or remediation action emits an
//! event through the pluggable [`AuditStore`]. Durable storage of the trail
//! is the host's concern; [`InMemoryAuditStore`] backs tests and embedding.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{ActionId, ExceptionId, RiskId};

/// Action recorded by a governance audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceAuditAction {
    /// Risk register entry was created.
    #[default]
    RiskCreated,
    /// Risk register entry was updated.
    RiskUpdated,
    /// Risk was formally accepted (or re-affirmed).
    RiskAccepted,
    /// Risk was closed.
    RiskClosed,
    /// Risk review was recorded.
    RiskReviewed,
    /// Policy exception was created (together with its risk assessment).
    ExceptionCreated,
    /// Policy exception was updated.
    ExceptionUpdated,
    /// Policy exception was approved.
    ExceptionApproved,
    /// Policy exception was activated.
    ExceptionActivated,
    /// Policy exception was archived.
    ExceptionArchived,
    /// Remediation action was created.
    ActionCreated,
    /// Remediation action was updated.
    ActionUpdated,
    /// Remediation action was linked to a record.
    ActionLinked,
    /// Remediation action was unlinked from a record.
    ActionUnlinked,
}

impl std::fmt::Display for GovernanceAuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RiskCreated => write!(f, "risk_created"),
            Self::RiskUpdated => write!(f, "risk_updated"),
            Self::RiskAccepted => write!(f, "risk_accepted"),
            Self::RiskClosed => write!(f, "risk_closed"),
            Self::RiskReviewed => write!(f, "risk_reviewed"),
            Self::ExceptionCreated => write!(f, "exception_created"),
            Self::ExceptionUpdated => write!(f, "exception_updated"),
            Self::ExceptionApproved => write!(f, "exception_approved"),
            Self::ExceptionActivated => write!(f, "exception_activated"),
            Self::ExceptionArchived => write!(f, "exception_archived"),
            Self::ActionCreated => write!(f, "action_created"),
            Self::ActionUpdated => write!(f, "action_updated"),
            Self::ActionLinked => write!(f, "action_linked"),
            Self::ActionUnlinked => write!(f, "action_unlinked"),
        }
    }
}

/// An audit event for a governance operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceAuditEvent {
    /// Unique identifier for the event.
    pub id: Uuid,
    /// The risk involved (if any).
    pub risk_id: Option<RiskId>,
    /// The policy exception involved (if any).
    pub exception_id: Option<ExceptionId>,
    /// The remediation action involved (if any).
    pub action_id: Option<ActionId>,
    /// Action performed.
    pub action: GovernanceAuditAction,
    /// Who performed the action.
    pub actor: String,
    /// State before the change (JSON).
    pub before_state: Option<serde_json::Value>,
    /// State after the change (JSON).
    pub after_state: Option<serde_json::Value>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

/// Input for creating an audit event.
#[derive(Debug, Clone, Default)]
pub struct GovernanceAuditEventInput {
    /// The risk involved (if any).
    pub risk_id: Option<RiskId>,
    /// The policy exception involved (if any).
    pub exception_id: Option<ExceptionId>,
    /// The remediation action involved (if any).
    pub action_id: Option<ActionId>,
    /// Action performed.
    pub action: GovernanceAuditAction,
    /// Who performed the action.
    pub actor: String,
    /// State before the change (JSON).
    pub before_state: Option<serde_json::Value>,
    /// State after the change (JSON).
    pub after_state: Option<serde_json::Value>,
}

/// Filter for querying audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditEventFilter {
    /// Filter by risk ID.
    pub risk_id: Option<RiskId>,
    /// Filter by policy exception ID.
    pub exception_id: Option<ExceptionId>,
    /// Filter by remediation action ID.
    pub action_id: Option<ActionId>,
    /// Filter by action type.
    pub action: Option<GovernanceAuditAction>,
    /// Filter by actor.
    pub actor: Option<String>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

/// Trait for audit event storage backends.
#[async_trait::async_trait]
pub trait AuditStore: Send + Sync {
    /// Log an audit event.
    async fn log_event(&self, input: GovernanceAuditEventInput) -> Result<GovernanceAuditEvent>;

    /// Query audit events, oldest first.
    async fn query_events(&self, filter: AuditEventFilter) -> Result<Vec<GovernanceAuditEvent>>;
}

/// In-memory audit store for testing.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    events: Arc<RwLock<Vec<GovernanceAuditEvent>>>,
}

impl InMemoryAuditStore {
    /// Create a new in-memory audit store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of logged events (for testing).
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clear all events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait::async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn log_event(&self, input: GovernanceAuditEventInput) -> Result<GovernanceAuditEvent> {
        let event = GovernanceAuditEvent {
            id: Uuid::new_v4(),
            risk_id: input.risk_id,
            exception_id: input.exception_id,
            action_id: input.action_id,
            action: input.action,
            actor: input.actor,
            before_state: input.before_state,
            after_state: input.after_state,
            timestamp: Utc::now(),
        };
        self.events.write().await.push(event.clone());
        Ok(event)
    }

    async fn query_events(&self, filter: AuditEventFilter) -> Result<Vec<GovernanceAuditEvent>> {
        let events = self.events.read().await;
        let results: Vec<_> = events
            .iter()
            .filter(|e| filter.risk_id.is_none_or(|id| e.risk_id == Some(id)))
            .filter(|e| filter.exception_id.is_none_or(|id| e.exception_id == Some(id)))
            .filter(|e| filter.action_id.is_none_or(|id| e.action_id == Some(id)))
            .filter(|e| filter.action.is_none_or(|a| e.action == a))
            .filter(|e| filter.actor.as_ref().is_none_or(|a| &e.actor == a))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_event_assigns_id_and_timestamp() {
        let store = InMemoryAuditStore::new();
        let event = store
            .log_event(GovernanceAuditEventInput {
                risk_id: Some(RiskId(1)),
                action: GovernanceAuditAction::RiskCreated,
                actor: "jsmith".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(event.risk_id, Some(RiskId(1)));
        assert_eq!(event.actor, "jsmith");
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_query_events_filters_by_entity_and_action() {
        let store = InMemoryAuditStore::new();
        for (risk, action) in [
            (RiskId(1), GovernanceAuditAction::RiskCreated),
            (RiskId(1), GovernanceAuditAction::RiskAccepted),
            (RiskId(2), GovernanceAuditAction::RiskCreated),
        ] {
            store
                .log_event(GovernanceAuditEventInput {
                    risk_id: Some(risk),
                    action,
                    actor: "jsmith".to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let for_risk = store
            .query_events(AuditEventFilter {
                risk_id: Some(RiskId(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(for_risk.len(), 2);

        let created = store
            .query_events(AuditEventFilter {
                action: Some(GovernanceAuditAction::RiskCreated),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
    }

    #[test]
    fn test_audit_action_display() {
        assert_eq!(
            GovernanceAuditAction::ExceptionCreated.to_string(),
            "exception_created"
        );
        assert_eq!(GovernanceAuditAction::ActionLinked.to_string(), "action_linked");
    }
}
