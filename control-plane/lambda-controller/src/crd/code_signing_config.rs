use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{AckStatusFields, ManagedFields, impl_ack_status, mark};

/// Standalone resource; functions attach to it by ARN only.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[kube(
    group = "lambda.services.k8s.aws",
    version = "v1alpha1",
    kind = "CodeSigningConfig",
    plural = "codesigningconfigs",
    namespaced,
    status = "CodeSigningConfigStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct CodeSigningConfigSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub allowed_publishers: AllowedPublishers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_signing_policies: Option<CodeSigningPolicies>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct AllowedPublishers {
    #[serde(rename = "signingProfileVersionARNs", default)]
    pub signing_profile_version_arns: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeSigningPolicies {
    /// `Warn` (AWS default) or `Enforce`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub untrusted_artifact_on_deployment: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeSigningConfigStatus {
    #[serde(flatten)]
    pub ack: AckStatusFields,
    #[serde(rename = "codeSigningConfigID", skip_serializing_if = "Option::is_none")]
    pub code_signing_config_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl_ack_status!(CodeSigningConfigStatus);

impl CodeSigningConfigSpec {
    pub fn managed_fields(&self) -> ManagedFields {
        let mut m = ManagedFields::new();
        mark(&mut m, "description", self.description.is_some());
        mark(&mut m, "codeSigningPolicies", self.code_signing_policies.is_some());
        m
    }
}
