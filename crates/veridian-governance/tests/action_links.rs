//! Integration tests for remediation action linkage.
//!
//! The action's link set is the single source of truth; these tests check
//! that the derived views on risks and exceptions always agree with it.

mod common;

use veridian_governance::types::EntityLink;

use common::fixtures;
use common::TestContext;

#[tokio::test]
async fn test_inline_creation_from_risk_editor() {
    let ctx = TestContext::new();
    let risk = ctx
        .services
        .risk
        .create(fixtures::risk_input("Customer database"), "jsmith")
        .await
        .unwrap();

    let mut input = fixtures::action_input("Encrypt backups");
    input.origin = Some(EntityLink::risk(risk.id));
    let action = ctx.services.action.create(input, "jsmith").await.unwrap();

    // The originating pair is present without a separate link call.
    let linked = ctx
        .services
        .action
        .linked_actions(EntityLink::risk(risk.id))
        .await
        .unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id, action.id);
}

#[tokio::test]
async fn test_action_shared_between_risk_and_exception() {
    let ctx = TestContext::new();
    let risk = ctx
        .services
        .risk
        .create(fixtures::risk_input("Customer database"), "jsmith")
        .await
        .unwrap();
    let (exception, _) = ctx
        .services
        .exception
        .create_with_risk(fixtures::exception_input("Defer MFA rollout"), "jsmith")
        .await
        .unwrap();

    let action = ctx
        .services
        .action
        .create(fixtures::action_input("Roll out MFA"), "jsmith")
        .await
        .unwrap();

    ctx.services
        .action
        .link(action.id, EntityLink::risk(risk.id), "jsmith")
        .await
        .unwrap();
    ctx.services
        .action
        .link(action.id, EntityLink::exception(exception.id), "jsmith")
        .await
        .unwrap();

    // Both derived views see the same action.
    let from_risk = ctx
        .services
        .action
        .linked_actions(EntityLink::risk(risk.id))
        .await
        .unwrap();
    let from_exception = ctx
        .services
        .action
        .linked_actions(EntityLink::exception(exception.id))
        .await
        .unwrap();
    assert_eq!(from_risk.len(), 1);
    assert_eq!(from_exception.len(), 1);
    assert_eq!(from_risk[0].id, from_exception[0].id);

    // Unlinking from one record leaves the other view intact.
    ctx.services
        .action
        .unlink(action.id, EntityLink::risk(risk.id), "jsmith")
        .await
        .unwrap();
    assert!(ctx
        .services
        .action
        .linked_actions(EntityLink::risk(risk.id))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        ctx.services
            .action
            .linked_actions(EntityLink::exception(exception.id))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_double_link_keeps_single_pair() {
    let ctx = TestContext::new();
    let action = ctx
        .services
        .action
        .create(fixtures::action_input("Patch firmware"), "jsmith")
        .await
        .unwrap();

    let link = EntityLink::risk(veridian_governance::types::RiskId(5));
    ctx.services.action.link(action.id, link, "jsmith").await.unwrap();
    let after = ctx.services.action.link(action.id, link, "jsmith").await.unwrap();

    assert_eq!(after.links.iter().filter(|l| **l == link).count(), 1);
}
