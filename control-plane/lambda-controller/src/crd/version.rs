use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{
    AckStatusFields, AwsResourceReferenceWrapper, FunctionEventInvokeConfig,
    ManagedFields, impl_ack_status, mark,
};

/// A published, immutable snapshot of a function. Only the event-invoke
/// sub-resource can change after publication.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[kube(
    group = "lambda.services.k8s.aws",
    version = "v1alpha1",
    kind = "Version",
    plural = "versions",
    namespaced,
    status = "VersionStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VersionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_ref: Option<AwsResourceReferenceWrapper>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only publish if the function's code hash matches.
    #[serde(rename = "codeSHA256", skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,
    /// Only publish if the function's revision matches.
    #[serde(rename = "revisionID", skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_event_invoke_config: Option<FunctionEventInvokeConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionStatus {
    #[serde(flatten)]
    pub ack: AckStatusFields,
    /// AWS-assigned version number, e.g. "1".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "codeSHA256", skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl_ack_status!(VersionStatus);

impl VersionSpec {
    pub fn managed_fields(&self) -> ManagedFields {
        let mut m = ManagedFields::new();
        mark(
            &mut m,
            "functionEventInvokeConfig",
            self.function_event_invoke_config.is_some(),
        );
        m
    }
}
