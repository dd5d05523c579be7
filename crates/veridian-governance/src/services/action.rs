//! Remediation action service and entity linkage.
//!
//! Actions are owned independently and carry the authoritative set of
//! `(entity_type, entity_id)` links. The "linked actions" view shown on a
//! risk or exception is always derived by querying actions for the pair;
//! there is no second stored list that could drift.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::audit::{AuditStore, GovernanceAuditAction, GovernanceAuditEventInput};
use crate::clock::Clock;
use crate::error::{GovernanceError, Result};
use crate::services::ListOptions;
use crate::types::{ActionId, ActionStatus, EntityLink};

// ============================================================================
// Domain Types
// ============================================================================

/// A remediation action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier.
    pub id: ActionId,
    /// Short title.
    pub title: String,
    /// Who is responsible for the action.
    pub owner: Option<String>,
    /// When the action is due.
    pub due_date: Option<NaiveDate>,
    /// Current status.
    pub status: ActionStatus,
    /// Records this action is linked to. This is the authoritative copy.
    pub links: Vec<EntityLink>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl Action {
    /// Whether this action is linked to the given record.
    #[must_use]
    pub fn is_linked_to(&self, link: EntityLink) -> bool {
        self.links.contains(&link)
    }
}

/// Input for creating a remediation action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActionInput {
    /// Short title.
    pub title: String,
    /// Who is responsible for the action.
    pub owner: Option<String>,
    /// When the action is due.
    pub due_date: Option<NaiveDate>,
    /// Record this action is created from, linked in the same operation.
    ///
    /// Inline creation from a risk or exception editor passes the editor's
    /// record here; there is no create-then-link two-step.
    pub origin: Option<EntityLink>,
}

/// Input for updating a remediation action.
///
/// `None` fields are left unchanged. Links change through
/// [`ActionService::link`] and [`ActionService::unlink`] only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateActionInput {
    /// New title.
    pub title: Option<String>,
    /// New owner.
    pub owner: Option<String>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
    /// New status.
    pub status: Option<ActionStatus>,
}

/// Filter options for listing actions.
#[derive(Debug, Clone, Default)]
pub struct ActionFilter {
    /// Filter by status.
    pub status: Option<ActionStatus>,
    /// Filter by owner.
    pub owner: Option<String>,
    /// Keep only actions linked to this record.
    pub linked_to: Option<EntityLink>,
}

impl ActionFilter {
    fn matches(&self, action: &Action) -> bool {
        self.status.is_none_or(|s| action.status == s)
            && self
                .owner
                .as_ref()
                .is_none_or(|o| action.owner.as_ref() == Some(o))
            && self.linked_to.is_none_or(|link| action.is_linked_to(link))
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for action storage backends.
///
/// Hosts must apply [`ActionStore::save`] atomically per action so that
/// concurrent link mutations cannot interleave; the link algorithms assume a
/// single mutator at a time.
#[async_trait::async_trait]
pub trait ActionStore: Send + Sync {
    /// Get an action by ID.
    async fn get(&self, id: ActionId) -> Result<Option<Action>>;

    /// Create a new action.
    async fn create(&self, input: CreateActionInput, now: DateTime<Utc>) -> Result<Action>;

    /// Replace an existing action. Returns `None` when the id is unknown.
    async fn save(&self, action: Action) -> Result<Option<Action>>;

    /// List actions with filtering and pagination, ordered by id.
    async fn list(&self, filter: &ActionFilter, options: &ListOptions) -> Result<Vec<Action>>;

    /// Count actions with filtering.
    async fn count(&self, filter: &ActionFilter) -> Result<i64>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory action store for testing.
#[derive(Debug)]
pub struct InMemoryActionStore {
    actions: Arc<RwLock<HashMap<ActionId, Action>>>,
    next_id: AtomicI64,
}

impl Default for InMemoryActionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryActionStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored actions (for testing).
    pub async fn len(&self) -> usize {
        self.actions.read().await.len()
    }

    /// Whether the store is empty (for testing).
    pub async fn is_empty(&self) -> bool {
        self.actions.read().await.is_empty()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.actions.write().await.clear();
    }
}

#[async_trait::async_trait]
impl ActionStore for InMemoryActionStore {
    async fn get(&self, id: ActionId) -> Result<Option<Action>> {
        Ok(self.actions.read().await.get(&id).cloned())
    }

    async fn create(&self, input: CreateActionInput, now: DateTime<Utc>) -> Result<Action> {
        let id = ActionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let action = Action {
            id,
            title: input.title,
            owner: input.owner,
            due_date: input.due_date,
            status: ActionStatus::Open,
            links: input.origin.into_iter().collect(),
            created_at: now,
            updated_at: now,
        };
        self.actions.write().await.insert(id, action.clone());
        Ok(action)
    }

    async fn save(&self, action: Action) -> Result<Option<Action>> {
        let mut actions = self.actions.write().await;
        if !actions.contains_key(&action.id) {
            return Ok(None);
        }
        actions.insert(action.id, action.clone());
        Ok(Some(action))
    }

    async fn list(&self, filter: &ActionFilter, options: &ListOptions) -> Result<Vec<Action>> {
        let actions = self.actions.read().await;
        let mut results: Vec<_> = actions
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        results.sort_by_key(|a| a.id);
        Ok(results
            .into_iter()
            .skip(options.offset as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &ActionFilter) -> Result<i64> {
        let actions = self.actions.read().await;
        Ok(actions.values().filter(|a| filter.matches(a)).count() as i64)
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for managing remediation actions and their links.
pub struct ActionService {
    store: Arc<dyn ActionStore>,
    audit_store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl ActionService {
    /// Create a new action service.
    pub fn new(
        store: Arc<dyn ActionStore>,
        audit_store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            audit_store,
            clock,
        }
    }

    /// Create a remediation action, linking it to its originating record in
    /// the same operation when one is given.
    pub async fn create(&self, input: CreateActionInput, actor: &str) -> Result<Action> {
        if input.title.trim().is_empty() {
            return Err(GovernanceError::BlankField("title"));
        }

        let action = self.store.create(input, self.clock.now()).await?;
        debug!(action_id = %action.id, "action created");

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                action_id: Some(action.id),
                action: GovernanceAuditAction::ActionCreated,
                actor: actor.to_string(),
                after_state: Some(serde_json::to_value(&action).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(action)
    }

    /// Get an action by ID.
    pub async fn get(&self, id: ActionId) -> Result<Option<Action>> {
        self.store.get(id).await
    }

    /// Update an action's own fields.
    pub async fn update(&self, id: ActionId, input: UpdateActionInput, actor: &str) -> Result<Action> {
        let before = self
            .store
            .get(id)
            .await?
            .ok_or(GovernanceError::ActionNotFound(id))?;

        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(GovernanceError::BlankField("title"));
            }
        }

        let mut action = before.clone();
        if let Some(title) = input.title {
            action.title = title;
        }
        if let Some(owner) = input.owner {
            action.owner = Some(owner);
        }
        if let Some(due_date) = input.due_date {
            action.due_date = Some(due_date);
        }
        if let Some(status) = input.status {
            action.status = status;
        }
        action.updated_at = self.clock.now();

        let updated = self
            .store
            .save(action)
            .await?
            .ok_or(GovernanceError::ActionNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                action_id: Some(id),
                action: GovernanceAuditAction::ActionUpdated,
                actor: actor.to_string(),
                before_state: Some(serde_json::to_value(&before).unwrap_or_default()),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Link an action to a record. Linking an already-linked pair is a no-op.
    pub async fn link(&self, id: ActionId, link: EntityLink, actor: &str) -> Result<Action> {
        let action = self
            .store
            .get(id)
            .await?
            .ok_or(GovernanceError::ActionNotFound(id))?;

        if action.is_linked_to(link) {
            return Ok(action);
        }

        let mut linked = action;
        linked.links.push(link);
        linked.updated_at = self.clock.now();

        let updated = self
            .store
            .save(linked)
            .await?
            .ok_or(GovernanceError::ActionNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                action_id: Some(id),
                action: GovernanceAuditAction::ActionLinked,
                actor: actor.to_string(),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// Unlink an action from a record. Unlinking a pair that is not present
    /// is a no-op.
    pub async fn unlink(&self, id: ActionId, link: EntityLink, actor: &str) -> Result<Action> {
        let action = self
            .store
            .get(id)
            .await?
            .ok_or(GovernanceError::ActionNotFound(id))?;

        if !action.is_linked_to(link) {
            return Ok(action);
        }

        let mut unlinked = action;
        unlinked.links.retain(|l| *l != link);
        unlinked.updated_at = self.clock.now();

        let updated = self
            .store
            .save(unlinked)
            .await?
            .ok_or(GovernanceError::ActionNotFound(id))?;

        self.audit_store
            .log_event(GovernanceAuditEventInput {
                action_id: Some(id),
                action: GovernanceAuditAction::ActionUnlinked,
                actor: actor.to_string(),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        Ok(updated)
    }

    /// The actions linked to a record: the derived "linked actions" view.
    pub async fn linked_actions(&self, link: EntityLink) -> Result<Vec<Action>> {
        self.store
            .list(
                &ActionFilter {
                    linked_to: Some(link),
                    ..Default::default()
                },
                &ListOptions::default(),
            )
            .await
    }

    /// List actions with filtering and pagination.
    pub async fn list(&self, filter: &ActionFilter, options: &ListOptions) -> Result<Vec<Action>> {
        self.store.list(filter, options).await
    }

    /// Count actions with filtering.
    pub async fn count(&self, filter: &ActionFilter) -> Result<i64> {
        self.store.count(filter).await
    }
}

// ============================================================================
// Tests
// ============================================================================
