use super::evaluator::Phase;
use crate::crd::common::{Condition, ConditionStatus, ConditionType};

pub const REASON_SYNCED: &str = "Synced";
pub const REASON_PENDING: &str = "Pending";
pub const REASON_RESOLVED: &str = "Resolved";
pub const REASON_UNRESOLVED: &str = "Unresolved";
pub const REASON_TERMINAL: &str = "TerminalError";
pub const REASON_RECOVERABLE: &str = "RecoverableError";

/// A condition without a transition time; the status reducer stamps it.
pub fn condition(
    type_: ConditionType,
    status: ConditionStatus,
    reason: &str,
    message: impl Into<String>,
) -> Condition {
    Condition {
        type_,
        status,
        reason: Some(reason.to_string()),
        message: Some(message.into()),
        last_transition_time: None,
    }
}

/// `ACK.ResourceSynced` for the phase a reconcile pass ended in.
pub fn synced_for_phase(phase: Phase, detail: Option<&str>) -> Condition {
    let (status, reason, message) = match phase {
        Phase::Synced => (
            ConditionStatus::True,
            REASON_SYNCED,
            "Resource synced successfully",
        ),
        Phase::Creating => (
            ConditionStatus::False,
            REASON_PENDING,
            "Resource created; waiting for it to converge",
        ),
        Phase::Updating => (
            ConditionStatus::False,
            REASON_PENDING,
            "Applying changes",
        ),
        Phase::Settling => (
            ConditionStatus::False,
            REASON_PENDING,
            "Waiting for AWS to finish a pending operation",
        ),
        Phase::Observing => (
            ConditionStatus::False,
            REASON_PENDING,
            "Waiting for dependencies",
        ),
        Phase::Terminal => (
            ConditionStatus::False,
            REASON_TERMINAL,
            "Resource is in a terminal state",
        ),
        Phase::Deleting => (
            ConditionStatus::False,
            REASON_PENDING,
            "Resource is being deleted",
        ),
    };
    condition(
        ConditionType::ResourceSynced,
        status,
        reason,
        detail.unwrap_or(message),
    )
}

pub fn terminal(message: &str) -> Condition {
    condition(
        ConditionType::Terminal,
        ConditionStatus::True,
        REASON_TERMINAL,
        message,
    )
}

pub fn recoverable(message: &str) -> Condition {
    condition(
        ConditionType::Recoverable,
        ConditionStatus::True,
        REASON_RECOVERABLE,
        message,
    )
}

pub fn references_resolved(ok: bool, message: &str) -> Condition {
    condition(
        ConditionType::ReferencesResolved,
        ok.into(),
        if ok { REASON_RESOLVED } else { REASON_UNRESOLVED },
        message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_synced_phase_reports_true() {
        for phase in [
            Phase::Observing,
            Phase::Creating,
            Phase::Updating,
            Phase::Settling,
            Phase::Terminal,
            Phase::Deleting,
        ] {
            let c = synced_for_phase(phase, None);
            assert_eq!(c.status, ConditionStatus::False, "{phase:?}");
        }
        let c = synced_for_phase(Phase::Synced, None);
        assert_eq!(c.type_, ConditionType::ResourceSynced);
        assert_eq!(c.status, ConditionStatus::True);
    }

    #[test]
    fn detail_overrides_the_default_message() {
        let c = synced_for_phase(Phase::Settling, Some("Function is Pending"));
        assert_eq!(c.message.as_deref(), Some("Function is Pending"));
    }
}
