//! Event source mappings are addressed by the UUID AWS assigns at creation,
//! which is recorded in status before anything else happens.

use std::time::Duration;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

use super::delta::{Intent, drifted, intent, same_set};
use super::{Applied, AwsCtx, KindStatus, ResourceManager};
use crate::aws::arn::function_name;
use crate::aws::{
    self, AwsResultExt, DestinationTargets, EventSourceMappingConfiguration,
    EventSourceMappingInput,
};
use crate::config::TimingConfig;
use crate::controller::ReconcileErr;
use crate::controller::references::{FUNCTION, ReferenceResolver};
use crate::crd::common::DestinationConfig;
use crate::crd::event_source_mapping::{
    EventSourceMapping, EventSourceMappingSpec, FilterCriteria,
};
use crate::crd::ManagedFields;

/// States in which AWS rejects updates; wait them out.
const TRANSITIONAL_STATES: &[&str] =
    &["Creating", "Enabling", "Disabling", "Updating", "Deleting"];

#[derive(Clone, Debug)]
pub struct EsmDesired {
    pub spec: EventSourceMappingSpec,
    pub function_name: String,
}

#[derive(Clone, Debug)]
pub struct EsmObserved {
    pub mapping: EventSourceMappingConfiguration,
    pub arn: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EsmOp {
    /// Every changed field in one `UpdateEventSourceMapping` call.
    Update(EventSourceMappingInput),
}

pub struct EventSourceMappingManager;

fn mapping_arn(aws: &AwsCtx<'_>, uuid: &str) -> String {
    format!(
        "arn:aws:lambda:{}:{}:event-source-mapping:{}",
        aws.region, aws.account_id, uuid
    )
}

/// A filter without a pattern is the same as an empty pattern.
fn filter_patterns(criteria: &FilterCriteria) -> Vec<String> {
    criteria
        .filters
        .iter()
        .map(|f| f.pattern.clone().unwrap_or_default())
        .collect()
}

fn destination_targets(cfg: &DestinationConfig) -> DestinationTargets {
    DestinationTargets {
        on_success: cfg.on_success.as_ref().and_then(|d| d.destination.clone()),
        on_failure: cfg.on_failure.as_ref().and_then(|d| d.destination.clone()),
    }
}

fn source_access(spec: &EventSourceMappingSpec) -> Option<Vec<aws::SourceAccessConfiguration>> {
    spec.source_access_configurations.as_ref().map(|v| {
        v.iter()
            .map(|s| aws::SourceAccessConfiguration {
                type_: s.type_.clone(),
                uri: s.uri.clone(),
            })
            .collect()
    })
}

fn enabled_state(state: Option<&str>) -> Option<bool> {
    match state? {
        "Enabled" | "Enabling" => Some(true),
        "Disabled" | "Disabling" => Some(false),
        _ => None,
    }
}

fn create_input(d: &EsmDesired) -> EventSourceMappingInput {
    let spec = &d.spec;
    EventSourceMappingInput {
        uuid: None,
        function_name: Some(d.function_name.clone()),
        event_source_arn: spec.event_source_arn.clone(),
        enabled: spec.enabled,
        batch_size: spec.batch_size,
        maximum_batching_window_in_seconds: spec.maximum_batching_window_in_seconds,
        starting_position: spec.starting_position.clone(),
        maximum_retry_attempts: spec.maximum_retry_attempts,
        maximum_record_age_in_seconds: spec.maximum_record_age_in_seconds,
        bisect_batch_on_function_error: spec.bisect_batch_on_function_error,
        parallelization_factor: spec.parallelization_factor,
        filter_patterns: spec.filter_criteria.as_ref().map(filter_patterns),
        destination_config: spec.destination_config.as_ref().map(destination_targets),
        scaling_maximum_concurrency: spec
            .scaling_config
            .as_ref()
            .map(|s| s.maximum_concurrency),
        function_response_types: spec.function_response_types.clone(),
        tumbling_window_in_seconds: spec.tumbling_window_in_seconds,
        queues: spec.queues.clone(),
        source_access_configurations: source_access(spec),
    }
}

/// Scalar fields: only a set value that AWS does not report is sent.
macro_rules! scalar_drift {
    ($update:ident, $spec:ident, $obs:ident, $($field:ident),+ $(,)?) => {
        $(
            if drifted($spec.$field.as_ref(), $obs.$field.as_ref()) {
                $update.$field = $spec.$field.clone();
            }
        )+
    };
}

fn update_input(
    d: &EsmDesired,
    obs: &EventSourceMappingConfiguration,
    managed: &ManagedFields,
) -> EventSourceMappingInput {
    let spec = &d.spec;
    let mut u = EventSourceMappingInput {
        uuid: Some(obs.uuid.clone()),
        ..Default::default()
    };

    let current_fn = obs.function_arn.as_deref().map(function_name);
    if current_fn != Some(function_name(&d.function_name)) {
        u.function_name = Some(d.function_name.clone());
    }

    match intent(spec.enabled.as_ref(), managed, "enabled") {
        Intent::Set(e) if enabled_state(obs.state.as_deref()) != Some(*e) => {
            u.enabled = Some(*e)
        }
        Intent::Clear if enabled_state(obs.state.as_deref()) == Some(false) => {
            u.enabled = Some(true)
        }
        _ => {}
    }

    scalar_drift!(
        u,
        spec,
        obs,
        batch_size,
        maximum_batching_window_in_seconds,
        maximum_retry_attempts,
        maximum_record_age_in_seconds,
        bisect_batch_on_function_error,
        parallelization_factor,
        tumbling_window_in_seconds,
    );

    let have_filters = obs.filter_patterns.clone().unwrap_or_default();
    match intent(spec.filter_criteria.as_ref(), managed, "filterCriteria") {
        // Order matters to AWS; compare as lists.
        Intent::Set(fc) => {
            let want = filter_patterns(fc);
            if want != have_filters {
                u.filter_patterns = Some(want);
            }
        }
        Intent::Clear if obs.filter_patterns.is_some() => u.filter_patterns = Some(vec![]),
        _ => {}
    }

    let have_dest = obs.destination_config.clone().unwrap_or_default();
    match intent(spec.destination_config.as_ref(), managed, "destinationConfig") {
        Intent::Set(dc) => {
            let want = destination_targets(dc);
            if want != have_dest {
                u.destination_config = Some(want);
            }
        }
        Intent::Clear if !have_dest.is_empty() => {
            u.destination_config = Some(DestinationTargets::default())
        }
        _ => {}
    }

    match intent(spec.scaling_config.as_ref(), managed, "scalingConfig") {
        Intent::Set(sc) if sc.maximum_concurrency != obs.scaling_maximum_concurrency => {
            u.scaling_maximum_concurrency = Some(sc.maximum_concurrency)
        }
        Intent::Clear if obs.scaling_maximum_concurrency.is_some() => {
            u.scaling_maximum_concurrency = Some(None)
        }
        _ => {}
    }

    match intent(
        spec.function_response_types.as_ref(),
        managed,
        "functionResponseTypes",
    ) {
        Intent::Set(t) if !same_set(t, &obs.function_response_types) => {
            u.function_response_types = Some(t.clone())
        }
        Intent::Clear if !obs.function_response_types.is_empty() => {
            u.function_response_types = Some(vec![])
        }
        _ => {}
    }

    if let Some(sac) = source_access(spec) {
        if sac != obs.source_access_configurations {
            u.source_access_configurations = Some(sac);
        }
    }
    u
}

#[async_trait]
impl ResourceManager for EventSourceMappingManager {
    type Kind = EventSourceMapping;
    type Desired = EsmDesired;
    type Observed = EsmObserved;
    type Op = EsmOp;

    async fn resolve(
        &self,
        obj: &EventSourceMapping,
        refs: &ReferenceResolver,
    ) -> Result<EsmDesired, ReconcileErr> {
        let ns = obj.namespace().unwrap_or_else(|| "default".into());
        let function_name = refs
            .require(
                &ns,
                "functionName",
                obj.spec.function_name.as_deref(),
                obj.spec.function_ref.as_ref(),
                &FUNCTION,
            )
            .await?;
        Ok(EsmDesired {
            spec: obj.spec.clone(),
            function_name,
        })
    }

    fn desired_from_status(&self, obj: &EventSourceMapping) -> Option<EsmDesired> {
        let status = obj.status.as_ref()?;
        status.uuid.as_ref()?;
        Some(EsmDesired {
            spec: obj.spec.clone(),
            function_name: status
                .function_arn
                .as_deref()
                .map(function_name)
                .unwrap_or_default()
                .to_string(),
        })
    }

    fn has_references(&self, obj: &EventSourceMapping) -> bool {
        obj.spec.function_ref.is_some()
    }

    fn validate(&self, desired: &EsmDesired) -> Result<(), ReconcileErr> {
        if desired.spec.event_source_arn.is_none() && desired.spec.queues.is_none() {
            return Err(ReconcileErr::Terminal(
                "one of eventSourceARN or queues must be set".into(),
            ));
        }
        Ok(())
    }

    async fn read(
        &self,
        aws: &AwsCtx<'_>,
        _desired: &EsmDesired,
        status: &KindStatus<EventSourceMapping>,
    ) -> Result<Option<EsmObserved>, ReconcileErr> {
        let Some(uuid) = status.uuid.as_deref() else {
            return Ok(None);
        };
        let api = aws.api;
        let mapping = aws
            .call("GetEventSourceMapping", move || api.get_event_source_mapping(uuid))
            .await
            .found()?;
        Ok(mapping.map(|mapping| EsmObserved {
            arn: mapping_arn(aws, &mapping.uuid),
            mapping,
        }))
    }

    async fn create(
        &self,
        aws: &AwsCtx<'_>,
        desired: &EsmDesired,
        status: &mut KindStatus<EventSourceMapping>,
    ) -> Result<Option<String>, ReconcileErr> {
        let input = create_input(desired);
        let api = aws.api;
        let mapping = aws
            .call("CreateEventSourceMapping", move || {
                api.create_event_source_mapping(input.clone())
            })
            .await?;
        info!(uuid = %mapping.uuid, "event source mapping created");
        let arn = mapping_arn(aws, &mapping.uuid);
        status.uuid = Some(mapping.uuid);
        status.state = mapping.state;
        status.state_transition_reason = mapping.state_transition_reason;
        status.function_arn = mapping.function_arn;
        status.last_modified = mapping.last_modified;
        Ok(Some(arn))
    }

    fn requeue_hint(
        &self,
        observed: &EsmObserved,
        timing: &TimingConfig,
    ) -> Option<(Duration, String)> {
        let state = observed.mapping.state.as_deref()?;
        TRANSITIONAL_STATES
            .contains(&state)
            .then(|| (timing.settle_requeue(), format!("EventSourceMapping is {state}")))
    }

    fn plan(
        &self,
        desired: &EsmDesired,
        observed: &EsmObserved,
        managed: &ManagedFields,
    ) -> Vec<EsmOp> {
        let u = update_input(desired, &observed.mapping, managed);
        if u.is_noop_update() {
            vec![]
        } else {
            vec![EsmOp::Update(u)]
        }
    }

    async fn apply(
        &self,
        aws: &AwsCtx<'_>,
        _desired: &EsmDesired,
        _observed: &EsmObserved,
        ops: Vec<EsmOp>,
        status: &mut KindStatus<EventSourceMapping>,
    ) -> Result<Applied, ReconcileErr> {
        let api = aws.api;
        for EsmOp::Update(input) in ops {
            let mapping = aws
                .call("UpdateEventSourceMapping", move || {
                    api.update_event_source_mapping(input.clone())
                })
                .await?;
            status.state = mapping.state;
            status.last_modified = mapping.last_modified;
        }
        Ok(Applied::Continue)
    }

    async fn delete(
        &self,
        aws: &AwsCtx<'_>,
        _desired: &EsmDesired,
        status: &KindStatus<EventSourceMapping>,
    ) -> Result<(), ReconcileErr> {
        let Some(uuid) = status.uuid.as_deref() else {
            return Ok(());
        };
        let api = aws.api;
        aws.call("DeleteEventSourceMapping", move || {
            api.delete_event_source_mapping(uuid)
        })
        .await
        .ignore_not_found()?;
        Ok(())
    }

    fn project(&self, observed: &EsmObserved, status: &mut KindStatus<EventSourceMapping>) {
        let m = &observed.mapping;
        status.uuid = Some(m.uuid.clone());
        status.state = m.state.clone();
        status.state_transition_reason = m.state_transition_reason.clone();
        status.function_arn = m.function_arn.clone();
        status.last_modified = m.last_modified.clone();
    }

    fn arn(&self, observed: &EsmObserved) -> Option<String> {
        Some(observed.arn.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::common::Destination;
    use crate::crd::event_source_mapping::{Filter, ScalingConfig};

    fn desired(spec: EventSourceMappingSpec) -> EsmDesired {
        EsmDesired {
            spec,
            function_name: "fn".into(),
        }
    }

    fn spec() -> EventSourceMappingSpec {
        EventSourceMappingSpec {
            function_name: Some("fn".into()),
            event_source_arn: Some("arn:aws:sqs:us-west-2:1:q".into()),
            batch_size: Some(10),
            ..Default::default()
        }
    }

    fn observed() -> EventSourceMappingConfiguration {
        EventSourceMappingConfiguration {
            uuid: "u-1".into(),
            function_arn: Some("arn:aws:lambda:us-west-2:1:function:fn".into()),
            event_source_arn: Some("arn:aws:sqs:us-west-2:1:q".into()),
            batch_size: Some(10),
            maximum_batching_window_in_seconds: Some(0),
            state: Some("Enabled".into()),
            ..Default::default()
        }
    }

    fn filter(p: &str) -> Filter {
        Filter {
            pattern: Some(p.into()),
        }
    }

    #[test]
    fn unchanged_mapping_is_a_noop() {
        let u = update_input(&desired(spec()), &observed(), &ManagedFields::new());
        assert!(u.is_noop_update());
    }

    #[test]
    fn changes_ride_a_single_update() {
        let mut s = spec();
        s.batch_size = Some(5);
        s.enabled = Some(false);
        s.scaling_config = Some(ScalingConfig {
            maximum_concurrency: Some(4),
        });
        let u = update_input(&desired(s), &observed(), &ManagedFields::new());
        assert_eq!(u.uuid.as_deref(), Some("u-1"));
        assert_eq!(u.batch_size, Some(5));
        assert_eq!(u.enabled, Some(false));
        assert_eq!(u.scaling_maximum_concurrency, Some(Some(4)));
        assert_eq!(u.function_name, None);
    }

    #[test]
    fn removed_filter_criteria_are_cleared() {
        let mut obs = observed();
        obs.filter_patterns = Some(vec![r#"{"body":{"a":["1"]}}"#.into()]);
        let managed: ManagedFields = ["filterCriteria".to_string()].into();
        let u = update_input(&desired(spec()), &obs, &managed);
        assert_eq!(u.filter_patterns, Some(vec![]));

        // Never managed: left alone.
        let u = update_input(&desired(spec()), &obs, &ManagedFields::new());
        assert!(u.is_noop_update());
    }

    #[test]
    fn filter_order_matters_and_missing_pattern_means_empty() {
        let mut obs = observed();
        obs.filter_patterns = Some(vec!["a".into(), "b".into()]);
        let mut s = spec();
        s.filter_criteria = Some(FilterCriteria {
            filters: vec![filter("b"), filter("a")],
        });
        let u = update_input(&desired(s.clone()), &obs, &ManagedFields::new());
        assert_eq!(u.filter_patterns, Some(vec!["b".to_string(), "a".to_string()]));

        obs.filter_patterns = Some(vec![String::new()]);
        s.filter_criteria = Some(FilterCriteria {
            filters: vec![Filter { pattern: None }],
        });
        assert!(update_input(&desired(s), &obs, &ManagedFields::new()).is_noop_update());
    }

    #[test]
    fn removed_destinations_and_scaling_are_cleared() {
        let mut obs = observed();
        obs.destination_config = Some(DestinationTargets {
            on_failure: Some("arn:aws:sqs:us-west-2:1:dlq".into()),
            on_success: None,
        });
        obs.scaling_maximum_concurrency = Some(3);
        let managed: ManagedFields =
            ["destinationConfig".to_string(), "scalingConfig".to_string()].into();
        let u = update_input(&desired(spec()), &obs, &managed);
        assert_eq!(u.destination_config, Some(DestinationTargets::default()));
        assert_eq!(u.scaling_maximum_concurrency, Some(None));

        let mut s = spec();
        s.destination_config = Some(DestinationConfig {
            on_failure: Some(Destination {
                destination: Some("arn:aws:sqs:us-west-2:1:dlq".into()),
            }),
            on_success: None,
        });
        let u = update_input(&desired(s), &obs, &managed);
        assert_eq!(u.destination_config, None);
    }

    #[test]
    fn transitional_states_requeue() {
        let timing = TimingConfig::default();
        let mut obs = EsmObserved {
            mapping: observed(),
            arn: "arn".into(),
        };
        assert!(EventSourceMappingManager.requeue_hint(&obs, &timing).is_none());
        obs.mapping.state = Some("Updating".into());
        assert!(EventSourceMappingManager.requeue_hint(&obs, &timing).is_some());
    }
}
