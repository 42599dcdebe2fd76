use crate::controller::fsm::{EvalInput, FsmAction, Phase, Remote, evaluate};

fn input() -> EvalInput {
    EvalInput {
        is_deleting: false,
        has_finalizer: true,
        terminal: false,
        generation_changed: false,
        remote: None,
    }
}

fn remote(exists: bool, settling: bool, pending_ops: usize) -> Option<Remote> {
    Some(Remote {
        exists,
        settling,
        pending_ops,
    })
}

#[test]
fn deletion_wins_over_everything() {
    let out = evaluate(EvalInput {
        is_deleting: true,
        terminal: true,
        ..input()
    });
    assert_eq!(out.phase, Phase::Deleting);
    assert_eq!(
        out.actions,
        vec![FsmAction::Delete, FsmAction::RemoveFinalizer]
    );
}

#[test]
fn deletion_without_finalizer_is_a_noop() {
    let out = evaluate(EvalInput {
        is_deleting: true,
        has_finalizer: false,
        ..input()
    });
    assert_eq!(out.phase, Phase::Deleting);
    assert!(out.actions.is_empty());
}

#[test]
fn terminal_is_sticky_for_the_same_generation() {
    let out = evaluate(EvalInput {
        terminal: true,
        remote: remote(true, false, 3),
        ..input()
    });
    assert_eq!(out.phase, Phase::Terminal);
    assert!(out.actions.is_empty());
}

#[test]
fn terminal_is_reevaluated_after_a_spec_change() {
    let out = evaluate(EvalInput {
        terminal: true,
        generation_changed: true,
        ..input()
    });
    assert_eq!(out.phase, Phase::Observing);
    assert_eq!(out.actions, vec![FsmAction::Observe]);
}

#[test]
fn first_pass_adds_the_finalizer_before_observing() {
    let out = evaluate(EvalInput {
        has_finalizer: false,
        ..input()
    });
    assert_eq!(
        out.actions,
        vec![FsmAction::AddFinalizer, FsmAction::Observe]
    );
}

#[test]
fn missing_remote_resource_is_created() {
    let out = evaluate(EvalInput {
        remote: remote(false, false, 0),
        ..input()
    });
    assert_eq!(out.phase, Phase::Creating);
    assert_eq!(out.actions, vec![FsmAction::Create]);
}

#[test]
fn settling_resources_are_not_touched() {
    let out = evaluate(EvalInput {
        remote: remote(true, true, 2),
        ..input()
    });
    assert_eq!(out.phase, Phase::Settling);
    assert_eq!(out.actions, vec![FsmAction::AwaitSettle]);
}

#[test]
fn drift_is_applied_and_no_drift_is_synced() {
    let out = evaluate(EvalInput {
        remote: remote(true, false, 2),
        ..input()
    });
    assert_eq!(out.phase, Phase::Updating);
    assert_eq!(out.actions, vec![FsmAction::ApplyOps(2)]);

    let out = evaluate(EvalInput {
        remote: remote(true, false, 0),
        ..input()
    });
    assert_eq!(out.phase, Phase::Synced);
    assert!(out.actions.is_empty());
}
