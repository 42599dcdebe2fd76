use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, trace};

use crate::crd::common::{Condition, ConditionStatus, ConditionType};

pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Upsert `incoming` by type, in place, so condition order is stable.
/// `lastTransitionTime` only moves when the status actually flips.
pub fn upsert_condition(
    conditions: &mut Vec<Condition>,
    incoming: Condition,
    now: &str,
) {
    match conditions.iter_mut().find(|c| c.type_ == incoming.type_) {
        Some(existing) => {
            if existing.status != incoming.status
                || existing.last_transition_time.is_none()
            {
                existing.last_transition_time = Some(now.to_string());
            }
            existing.status = incoming.status;
            existing.reason = incoming.reason;
            existing.message = incoming.message;
        }
        None => conditions.push(Condition {
            last_transition_time: Some(now.to_string()),
            ..incoming
        }),
    }
}

/// Flip a `True` condition to `False`. Absent conditions stay absent.
pub fn resolve_condition(
    conditions: &mut [Condition],
    type_: ConditionType,
    now: &str,
) {
    if let Some(c) = conditions
        .iter_mut()
        .find(|c| c.type_ == type_ && c.status == ConditionStatus::True)
    {
        c.status = ConditionStatus::False;
        c.reason = Some("Resolved".into());
        c.message = None;
        c.last_transition_time = Some(now.to_string());
    }
}

pub fn should_patch_status<S: Serialize>(current: Option<&S>, desired: &S) -> bool {
    match current {
        None => {
            debug!("should_patch_status: no current status, patching");
            true
        }
        Some(cur) => {
            let cur_norm = normalize_status(cur);
            let des_norm = normalize_status(desired);
            let differs = cur_norm != des_norm;
            if differs {
                debug!(
                    "should_patch_status: status differs, patching\ncurrent={}\ndesired={}",
                    cur_norm, des_norm
                );
            } else {
                trace!("should_patch_status: status identical, skipping patch");
            }
            differs
        }
    }
}

fn normalize_status<S: Serialize>(s: &S) -> Value {
    let mut v = serde_json::to_value(s).unwrap_or_else(|_| json!({}));
    if let Some(Value::Array(conds)) = v.get_mut("conditions") {
        for c in conds.iter_mut() {
            if let Some(obj) = c.as_object_mut() {
                obj.remove("lastTransitionTime");
            }
        }
    }
    v
}

/// JSON merge patch turning `current` into `desired`. Keys that disappeared
/// are sent as `null` so the API server drops them.
pub fn status_patch<S: Serialize>(
    current: Option<&S>,
    desired: &S,
) -> Result<Value, serde_json::Error> {
    let old = match current {
        Some(c) => serde_json::to_value(c)?,
        None => json!({}),
    };
    let new = serde_json::to_value(desired)?;
    Ok(merge_patch(&old, &new))
}

pub fn merge_patch(old: &Value, new: &Value) -> Value {
    match (old, new) {
        (Value::Object(o), Value::Object(n)) => {
            let mut out = Map::new();
            for (k, v) in n {
                match o.get(k) {
                    Some(ov) if ov == v => {}
                    Some(ov) => {
                        out.insert(k.clone(), merge_patch(ov, v));
                    }
                    None => {
                        out.insert(k.clone(), v.clone());
                    }
                }
            }
            for k in o.keys() {
                if !n.contains_key(k) {
                    out.insert(k.clone(), Value::Null);
                }
            }
            Value::Object(out)
        }
        _ => new.clone(),
    }
}
