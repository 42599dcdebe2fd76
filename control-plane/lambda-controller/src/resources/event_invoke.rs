//! Asynchronous invocation settings, shared by functions, aliases and
//! versions (each addressed by its qualifier).

use crate::aws::{AwsError, AwsResultExt, EventInvokeConfig};
use crate::crd::common::FunctionEventInvokeConfig;

use super::AwsCtx;

#[derive(Clone, Debug, PartialEq)]
pub enum EventInvokeOp {
    Put(EventInvokeConfig),
    Delete,
}

pub fn to_model(cfg: &FunctionEventInvokeConfig) -> EventInvokeConfig {
    let dest = cfg.destination_config.as_ref();
    EventInvokeConfig {
        maximum_retry_attempts: cfg.maximum_retry_attempts,
        maximum_event_age_in_seconds: cfg.maximum_event_age_in_seconds,
        on_success: dest
            .and_then(|d| d.on_success.as_ref())
            .and_then(|d| d.destination.clone()),
        on_failure: dest
            .and_then(|d| d.on_failure.as_ref())
            .and_then(|d| d.destination.clone()),
    }
}

/// `managed` is whether the controller set this config before.
pub fn plan(
    desired: Option<&FunctionEventInvokeConfig>,
    observed: Option<&EventInvokeConfig>,
    managed: bool,
) -> Option<EventInvokeOp> {
    match (desired, observed) {
        (Some(d), obs) => {
            let want = to_model(d);
            (obs != Some(&want)).then_some(EventInvokeOp::Put(want))
        }
        (None, Some(_)) if managed => Some(EventInvokeOp::Delete),
        _ => None,
    }
}

pub async fn read(
    aws: &AwsCtx<'_>,
    function_name: &str,
    qualifier: Option<&str>,
) -> Result<Option<EventInvokeConfig>, AwsError> {
    let api = aws.api;
    aws.call("GetFunctionEventInvokeConfig", move || {
        api.get_function_event_invoke_config(function_name, qualifier)
    })
    .await
    .found()
}

pub async fn apply(
    aws: &AwsCtx<'_>,
    function_name: &str,
    qualifier: Option<&str>,
    op: EventInvokeOp,
) -> Result<(), AwsError> {
    let api = aws.api;
    match op {
        EventInvokeOp::Put(cfg) => {
            // Another CR may share this function and qualifier.
            if read(aws, function_name, qualifier).await?.as_ref() == Some(&cfg) {
                return Ok(());
            }
            aws.call("PutFunctionEventInvokeConfig", move || {
                api.put_function_event_invoke_config(
                    function_name,
                    qualifier,
                    cfg.clone(),
                )
            })
            .await
        }
        EventInvokeOp::Delete => aws
            .call("DeleteFunctionEventInvokeConfig", move || {
                api.delete_function_event_invoke_config(function_name, qualifier)
            })
            .await
            .ignore_not_found(),
    }
}
