use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{
    AckStatusFields, AwsResourceReferenceWrapper, FunctionEventInvokeConfig,
    ManagedFields, impl_ack_status, mark,
};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[kube(
    group = "lambda.services.k8s.aws",
    version = "v1alpha1",
    kind = "Function",
    plural = "functions",
    namespaced,
    status = "FunctionStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// Name of the Lambda function in AWS.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_ref: Option<AwsResourceReferenceWrapper>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<FunctionCode>,
    /// `Zip` (default) or `Image`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architectures: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    /// `0` is a real value (throttle everything); absent means unreserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_concurrent_executions: Option<i32>,
    #[serde(
        rename = "codeSigningConfigARN",
        skip_serializing_if = "Option::is_none"
    )]
    pub code_signing_config_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_letter_config: Option<DeadLetterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_start: Option<SnapStart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage: Option<EphemeralStorage>,
    /// Layer version ARNs, in load order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_event_invoke_config: Option<FunctionEventInvokeConfig>,
    #[serde(rename = "kmsKeyARN", skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_ref: Option<AwsResourceReferenceWrapper>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracing_config: Option<TracingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket_ref: Option<AwsResourceReferenceWrapper>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_object_version: Option<String>,
    /// Expected base64 SHA-256 of the deployment package; a change triggers
    /// a code update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(rename = "imageURI", skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct Environment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct DeadLetterConfig {
    #[serde(rename = "targetARN", skip_serializing_if = "Option::is_none")]
    pub target_arn: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapStart {
    /// `PublishedVersions` or `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_on: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct EphemeralStorage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct TracingConfig {
    /// `Active` or `PassThrough`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct VpcConfig {
    #[serde(rename = "subnetIDs", default)]
    pub subnet_ids: Vec<String>,
    #[serde(rename = "securityGroupIDs", default)]
    pub security_group_ids: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_point: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStatus {
    #[serde(flatten)]
    pub ack: AckStatusFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_status: Option<String>,
    #[serde(rename = "codeSHA256", skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,
    #[serde(rename = "revisionID", skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl_ack_status!(FunctionStatus);

pub const PACKAGE_TYPE_IMAGE: &str = "Image";
pub const PACKAGE_TYPE_ZIP: &str = "Zip";

impl FunctionSpec {
    pub fn package_type(&self) -> &str {
        self.package_type.as_deref().unwrap_or(PACKAGE_TYPE_ZIP)
    }

    pub fn is_image(&self) -> bool {
        self.package_type() == PACKAGE_TYPE_IMAGE
    }

    pub fn managed_fields(&self) -> ManagedFields {
        let mut m = ManagedFields::new();
        mark(&mut m, "runtime", self.runtime.is_some());
        mark(&mut m, "handler", self.handler.is_some());
        mark(&mut m, "timeout", self.timeout.is_some());
        mark(&mut m, "memorySize", self.memory_size.is_some());
        mark(&mut m, "description", self.description.is_some());
        mark(&mut m, "architectures", self.architectures.is_some());
        mark(&mut m, "environment", self.environment.is_some());
        mark(&mut m, "tags", self.tags.is_some());
        mark(
            &mut m,
            "reservedConcurrentExecutions",
            self.reserved_concurrent_executions.is_some(),
        );
        mark(
            &mut m,
            "codeSigningConfigARN",
            self.code_signing_config_arn.is_some(),
        );
        mark(&mut m, "deadLetterConfig", self.dead_letter_config.is_some());
        mark(&mut m, "snapStart", self.snap_start.is_some());
        mark(&mut m, "ephemeralStorage", self.ephemeral_storage.is_some());
        mark(&mut m, "layers", self.layers.is_some());
        mark(
            &mut m,
            "functionEventInvokeConfig",
            self.function_event_invoke_config.is_some(),
        );
        mark(
            &mut m,
            "kmsKeyARN",
            self.kms_key_arn.is_some() || self.kms_key_ref.is_some(),
        );
        mark(&mut m, "tracingConfig", self.tracing_config.is_some());
        mark(&mut m, "vpcConfig", self.vpc_config.is_some());
        mark(&mut m, "imageConfig", self.image_config.is_some());
        m
    }
}
