use serde_json::json;

use crate::controller::fsm::conditions;
use crate::controller::status_reducer::{
    merge_patch, resolve_condition, should_patch_status, status_patch,
    upsert_condition,
};
use crate::crd::common::{ConditionStatus, ConditionType};
use crate::crd::function::FunctionStatus;

#[test]
fn upsert_keeps_order_and_transition_time_when_status_is_unchanged() {
    let mut conds = Vec::new();
    upsert_condition(&mut conds, conditions::references_resolved(true, "ok"), "t1");
    upsert_condition(
        &mut conds,
        conditions::synced_for_phase(crate::controller::fsm::Phase::Updating, None),
        "t1",
    );
    upsert_condition(
        &mut conds,
        conditions::synced_for_phase(
            crate::controller::fsm::Phase::Updating,
            Some("still applying"),
        ),
        "t2",
    );
    assert_eq!(conds.len(), 2);
    assert_eq!(conds[0].type_, ConditionType::ReferencesResolved);
    assert_eq!(conds[1].type_, ConditionType::ResourceSynced);
    assert_eq!(conds[1].last_transition_time.as_deref(), Some("t1"));
    assert_eq!(conds[1].message.as_deref(), Some("still applying"));

    upsert_condition(
        &mut conds,
        conditions::synced_for_phase(crate::controller::fsm::Phase::Synced, None),
        "t3",
    );
    assert_eq!(conds[1].status, ConditionStatus::True);
    assert_eq!(conds[1].last_transition_time.as_deref(), Some("t3"));
}

#[test]
fn resolve_only_touches_true_conditions() {
    let mut conds = Vec::new();
    resolve_condition(&mut conds, ConditionType::Terminal, "t1");
    assert!(conds.is_empty());

    upsert_condition(&mut conds, conditions::terminal("bad input"), "t1");
    resolve_condition(&mut conds, ConditionType::Terminal, "t2");
    assert_eq!(conds[0].status, ConditionStatus::False);
    assert_eq!(conds[0].message, None);
    assert_eq!(conds[0].last_transition_time.as_deref(), Some("t2"));
}

#[test]
fn transition_time_alone_does_not_trigger_a_patch() {
    let mut a = FunctionStatus::default();
    upsert_condition(&mut a.ack.conditions, conditions::terminal("x"), "t1");
    let mut b = a.clone();
    b.ack.conditions[0].last_transition_time = Some("t9".into());
    assert!(!should_patch_status(Some(&a), &b));

    b.state = Some("Active".into());
    assert!(should_patch_status(Some(&a), &b));
    assert!(should_patch_status(None, &b));
}

#[test]
fn removed_keys_become_nulls() {
    let old = json!({"state": "Pending", "ack": 1, "nested": {"a": 1, "b": 2}});
    let new = json!({"ack": 1, "nested": {"a": 1}});
    assert_eq!(
        merge_patch(&old, &new),
        json!({"state": null, "nested": {"b": null}})
    );
}

#[test]
fn status_patch_starts_from_empty_when_no_status_exists() {
    let status = FunctionStatus {
        state: Some("Active".into()),
        ..Default::default()
    };
    let patch = status_patch(None, &status).expect("patch");
    assert_eq!(patch["state"], json!("Active"));
}
