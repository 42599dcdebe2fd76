use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{
    AckStatusFields, AwsResourceReferenceWrapper, DestinationConfig,
    ManagedFields, impl_ack_status, mark,
};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[kube(
    group = "lambda.services.k8s.aws",
    version = "v1alpha1",
    kind = "EventSourceMapping",
    plural = "eventsourcemappings",
    namespaced,
    status = "EventSourceMappingStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct EventSourceMappingSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// May name a Function in another namespace when policy allows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_ref: Option<AwsResourceReferenceWrapper>,
    #[serde(rename = "eventSourceARN", skip_serializing_if = "Option::is_none")]
    pub event_source_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_batching_window_in_seconds: Option<i32>,
    /// `TRIM_HORIZON`, `LATEST` or `AT_TIMESTAMP`; streams only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_retry_attempts: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_record_age_in_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bisect_batch_on_function_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelization_factor: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_criteria: Option<FilterCriteria>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_config: Option<DestinationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling_config: Option<ScalingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tumbling_window_in_seconds: Option<i32>,
    /// Amazon MQ queue names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queues: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_access_configurations: Option<Vec<SourceAccessConfiguration>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct FilterCriteria {
    #[serde(default)]
    pub filters: Vec<Filter>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_concurrency: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct SourceAccessConfiguration {
    #[serde(rename = "type_", alias = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSourceMappingStatus {
    #[serde(flatten)]
    pub ack: AckStatusFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_transition_reason: Option<String>,
    #[serde(rename = "functionARN", skip_serializing_if = "Option::is_none")]
    pub function_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl_ack_status!(EventSourceMappingStatus);

impl EventSourceMappingSpec {
    pub fn managed_fields(&self) -> ManagedFields {
        let mut m = ManagedFields::new();
        mark(&mut m, "batchSize", self.batch_size.is_some());
        mark(
            &mut m,
            "maximumBatchingWindowInSeconds",
            self.maximum_batching_window_in_seconds.is_some(),
        );
        mark(&mut m, "maximumRetryAttempts", self.maximum_retry_attempts.is_some());
        mark(
            &mut m,
            "maximumRecordAgeInSeconds",
            self.maximum_record_age_in_seconds.is_some(),
        );
        mark(
            &mut m,
            "bisectBatchOnFunctionError",
            self.bisect_batch_on_function_error.is_some(),
        );
        mark(&mut m, "parallelizationFactor", self.parallelization_factor.is_some());
        mark(&mut m, "enabled", self.enabled.is_some());
        mark(&mut m, "filterCriteria", self.filter_criteria.is_some());
        mark(&mut m, "destinationConfig", self.destination_config.is_some());
        mark(&mut m, "scalingConfig", self.scaling_config.is_some());
        mark(
            &mut m,
            "functionResponseTypes",
            self.function_response_types.is_some(),
        );
        mark(
            &mut m,
            "tumblingWindowInSeconds",
            self.tumbling_window_in_seconds.is_some(),
        );
        mark(
            &mut m,
            "sourceAccessConfigurations",
            self.source_access_configurations.is_some(),
        );
        m
    }
}
