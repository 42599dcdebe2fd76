use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder};

pub const REASON_CREATED: &str = "Created";
pub const REASON_UPDATED: &str = "Updated";
pub const REASON_SYNCED: &str = "Synced";
pub const REASON_DELETED: &str = "Deleted";
pub const REASON_TERMINAL: &str = "Terminal";
pub const REASON_REFERENCES: &str = "ReferencesUnresolved";
pub const REASON_RECOVERABLE: &str = "Recoverable";

/// A lifecycle transition worth surfacing as a Kubernetes event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub warning: bool,
    pub reason: &'static str,
    pub action: &'static str,
    pub note: Option<String>,
}

impl LifecycleEvent {
    pub fn normal(reason: &'static str, action: &'static str, note: Option<String>) -> Self {
        Self {
            warning: false,
            reason,
            action,
            note,
        }
    }

    pub fn warning(reason: &'static str, action: &'static str, note: Option<String>) -> Self {
        Self {
            warning: true,
            reason,
            action,
            note,
        }
    }
}

pub async fn emit_event(
    recorder: &Recorder,
    obj_ref: &ObjectReference,
    ev: &LifecycleEvent,
) {
    let _ = recorder
        .publish(
            &Event {
                type_: if ev.warning {
                    EventType::Warning
                } else {
                    EventType::Normal
                },
                reason: ev.reason.into(),
                note: ev.note.clone(),
                action: ev.action.into(),
                secondary: None,
            },
            obj_ref,
        )
        .await;
}
