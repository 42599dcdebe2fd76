//! Typed request/response shapes for the Lambda control plane.
//!
//! These mirror the AWS API closely but stay independent of any SDK so the
//! differ and the in-memory backend can share them.

use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VpcConfig {
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageConfig {
    pub command: Vec<String>,
    pub entry_point: Vec<String>,
    pub working_directory: Option<String>,
}

/// `GetFunction` / `GetFunctionConfiguration` output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionConfiguration {
    pub function_name: String,
    pub function_arn: String,
    pub runtime: Option<String>,
    pub role: Option<String>,
    pub handler: Option<String>,
    pub description: Option<String>,
    pub timeout: Option<i32>,
    pub memory_size: Option<i32>,
    pub code_sha256: Option<String>,
    pub version: Option<String>,
    pub revision_id: Option<String>,
    pub state: Option<String>,
    pub state_reason: Option<String>,
    pub last_update_status: Option<String>,
    pub last_modified: Option<String>,
    pub package_type: Option<String>,
    pub architectures: Vec<String>,
    pub environment: BTreeMap<String, String>,
    /// Layer version ARNs in load order.
    pub layers: Vec<String>,
    pub dead_letter_target_arn: Option<String>,
    pub snap_start_apply_on: Option<String>,
    pub ephemeral_storage_size: Option<i32>,
    pub kms_key_arn: Option<String>,
    pub tracing_mode: Option<String>,
    pub vpc_config: Option<VpcConfig>,
    pub image_config: Option<ImageConfig>,
}

/// `GetFunction` output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionDescription {
    pub configuration: FunctionConfiguration,
    pub image_uri: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub reserved_concurrency: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionCode {
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub s3_object_version: Option<String>,
    pub image_uri: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateFunctionInput {
    pub function_name: String,
    pub role: Option<String>,
    pub code: FunctionCode,
    pub package_type: Option<String>,
    pub runtime: Option<String>,
    pub handler: Option<String>,
    pub description: Option<String>,
    pub timeout: Option<i32>,
    pub memory_size: Option<i32>,
    pub architectures: Vec<String>,
    pub environment: Option<BTreeMap<String, String>>,
    pub tags: BTreeMap<String, String>,
    pub code_signing_config_arn: Option<String>,
    pub dead_letter_target_arn: Option<String>,
    pub snap_start_apply_on: Option<String>,
    pub ephemeral_storage_size: Option<i32>,
    pub layers: Vec<String>,
    pub kms_key_arn: Option<String>,
    pub tracing_mode: Option<String>,
    pub vpc_config: Option<VpcConfig>,
    pub image_config: Option<ImageConfig>,
}

/// Only `Some` fields are sent. Clearing uses an empty value
/// (`Some(String::new())`, `Some(vec![])`, ...), the way the API expects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateFunctionConfigurationInput {
    pub function_name: String,
    pub revision_id: Option<String>,
    pub role: Option<String>,
    pub runtime: Option<String>,
    pub handler: Option<String>,
    pub description: Option<String>,
    pub timeout: Option<i32>,
    pub memory_size: Option<i32>,
    pub environment: Option<BTreeMap<String, String>>,
    pub layers: Option<Vec<String>>,
    pub dead_letter_target_arn: Option<String>,
    pub snap_start_apply_on: Option<String>,
    pub ephemeral_storage_size: Option<i32>,
    pub kms_key_arn: Option<String>,
    pub tracing_mode: Option<String>,
    pub vpc_config: Option<VpcConfig>,
    pub image_config: Option<ImageConfig>,
}

impl UpdateFunctionConfigurationInput {
    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.runtime.is_none()
            && self.handler.is_none()
            && self.description.is_none()
            && self.timeout.is_none()
            && self.memory_size.is_none()
            && self.environment.is_none()
            && self.layers.is_none()
            && self.dead_letter_target_arn.is_none()
            && self.snap_start_apply_on.is_none()
            && self.ephemeral_storage_size.is_none()
            && self.kms_key_arn.is_none()
            && self.tracing_mode.is_none()
            && self.vpc_config.is_none()
            && self.image_config.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateFunctionCodeInput {
    pub function_name: String,
    pub revision_id: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub s3_object_version: Option<String>,
    pub image_uri: Option<String>,
    pub architectures: Option<Vec<String>>,
}

/// Flattened `FunctionEventInvokeConfig`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventInvokeConfig {
    pub maximum_retry_attempts: Option<i32>,
    pub maximum_event_age_in_seconds: Option<i32>,
    pub on_success: Option<String>,
    pub on_failure: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AliasConfiguration {
    pub alias_arn: String,
    pub name: String,
    pub function_version: String,
    pub description: Option<String>,
    pub routing_weights: BTreeMap<String, f64>,
    pub revision_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AliasInput {
    pub function_name: String,
    pub name: String,
    pub function_version: String,
    pub description: Option<String>,
    pub routing_weights: Option<BTreeMap<String, f64>>,
    pub revision_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProvisionedConcurrency {
    pub requested: i32,
    pub allocated: Option<i32>,
    pub status: Option<String>,
}

/// One statement of a function's resource-based policy, keyed by
/// `statement_id`. `AddPermission` has no update form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Permission {
    pub statement_id: String,
    pub action: String,
    pub principal: String,
    pub source_arn: Option<String>,
    pub source_account: Option<String>,
    pub event_source_token: Option<String>,
    pub principal_org_id: Option<String>,
    pub function_url_auth_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublishVersionInput {
    pub function_name: String,
    pub description: Option<String>,
    pub code_sha256: Option<String>,
    pub revision_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceAccessConfiguration {
    pub type_: Option<String>,
    pub uri: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DestinationTargets {
    pub on_success: Option<String>,
    pub on_failure: Option<String>,
}

impl DestinationTargets {
    pub fn is_empty(&self) -> bool {
        self.on_success.is_none() && self.on_failure.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSourceMappingConfiguration {
    pub uuid: String,
    pub function_arn: Option<String>,
    pub event_source_arn: Option<String>,
    pub batch_size: Option<i32>,
    pub maximum_batching_window_in_seconds: Option<i32>,
    pub starting_position: Option<String>,
    pub maximum_retry_attempts: Option<i32>,
    pub maximum_record_age_in_seconds: Option<i32>,
    pub bisect_batch_on_function_error: Option<bool>,
    pub parallelization_factor: Option<i32>,
    /// Filter patterns; `None` when AWS returns no `FilterCriteria` key.
    pub filter_patterns: Option<Vec<String>>,
    pub destination_config: Option<DestinationTargets>,
    pub scaling_maximum_concurrency: Option<i32>,
    pub function_response_types: Vec<String>,
    pub tumbling_window_in_seconds: Option<i32>,
    pub queues: Vec<String>,
    pub source_access_configurations: Vec<SourceAccessConfiguration>,
    pub state: Option<String>,
    pub state_transition_reason: Option<String>,
    pub last_modified: Option<String>,
    pub last_processing_result: Option<String>,
}

/// Create and update share one shape; update only sends `Some` fields and
/// ignores the create-only ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSourceMappingInput {
    pub uuid: Option<String>,
    pub function_name: Option<String>,
    pub event_source_arn: Option<String>,
    pub enabled: Option<bool>,
    pub batch_size: Option<i32>,
    pub maximum_batching_window_in_seconds: Option<i32>,
    pub starting_position: Option<String>,
    pub maximum_retry_attempts: Option<i32>,
    pub maximum_record_age_in_seconds: Option<i32>,
    pub bisect_batch_on_function_error: Option<bool>,
    pub parallelization_factor: Option<i32>,
    /// `Some(vec![])` removes the criteria.
    pub filter_patterns: Option<Vec<String>>,
    /// `Some(empty)` removes the destinations.
    pub destination_config: Option<DestinationTargets>,
    /// `Some(None)` removes the scaling config.
    pub scaling_maximum_concurrency: Option<Option<i32>>,
    pub function_response_types: Option<Vec<String>>,
    pub tumbling_window_in_seconds: Option<i32>,
    pub queues: Option<Vec<String>>,
    pub source_access_configurations: Option<Vec<SourceAccessConfiguration>>,
}

impl EventSourceMappingInput {
    /// True when an update would carry no field besides the identifiers.
    pub fn is_noop_update(&self) -> bool {
        self.function_name.is_none()
            && self.enabled.is_none()
            && self.batch_size.is_none()
            && self.maximum_batching_window_in_seconds.is_none()
            && self.maximum_retry_attempts.is_none()
            && self.maximum_record_age_in_seconds.is_none()
            && self.bisect_batch_on_function_error.is_none()
            && self.parallelization_factor.is_none()
            && self.filter_patterns.is_none()
            && self.destination_config.is_none()
            && self.scaling_maximum_concurrency.is_none()
            && self.function_response_types.is_none()
            && self.tumbling_window_in_seconds.is_none()
            && self.source_access_configurations.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeSigningConfigDescription {
    pub arn: String,
    pub id: String,
    pub description: Option<String>,
    pub signing_profile_version_arns: Vec<String>,
    pub untrusted_artifact_on_deployment: String,
    pub last_modified: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeSigningConfigInput {
    pub description: Option<String>,
    pub signing_profile_version_arns: Vec<String>,
    pub untrusted_artifact_on_deployment: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cors {
    pub allow_credentials: Option<bool>,
    pub allow_headers: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_origins: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionUrlConfig {
    pub function_url: String,
    pub function_arn: String,
    pub auth_type: String,
    pub cors: Option<Cors>,
    pub creation_time: Option<String>,
    pub last_modified: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionUrlConfigInput {
    pub function_name: String,
    pub qualifier: Option<String>,
    pub auth_type: Option<String>,
    /// `Some(Cors::default())` clears every CORS setting.
    pub cors: Option<Cors>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerContent {
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub s3_object_version: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublishLayerVersionInput {
    pub layer_name: String,
    pub content: LayerContent,
    pub description: Option<String>,
    pub compatible_runtimes: Vec<String>,
    pub compatible_architectures: Vec<String>,
    pub license_info: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerVersionDescription {
    pub layer_arn: String,
    pub layer_version_arn: String,
    pub version: i64,
    pub description: Option<String>,
    pub created_date: Option<String>,
    pub compatible_runtimes: Vec<String>,
    pub compatible_architectures: Vec<String>,
    pub license_info: Option<String>,
    pub code_sha256: Option<String>,
}
