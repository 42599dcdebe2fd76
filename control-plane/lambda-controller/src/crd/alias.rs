use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{
    AckStatusFields, AwsResourceReferenceWrapper, FunctionEventInvokeConfig,
    ManagedFields, ProvisionedConcurrencyConfig, impl_ack_status, mark,
};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[kube(
    group = "lambda.services.k8s.aws",
    version = "v1alpha1",
    kind = "Alias",
    plural = "aliases",
    namespaced,
    status = "AliasStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct AliasSpec {
    /// Alias name; together with the function name this is the AWS identity.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_ref: Option<AwsResourceReferenceWrapper>,
    pub function_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_config: Option<AliasRoutingConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_concurrency_config: Option<ProvisionedConcurrencyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_event_invoke_config: Option<FunctionEventInvokeConfig>,
    /// Resource-policy statements granted on `function:alias`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<AddPermissionInput>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AliasRoutingConfiguration {
    /// Secondary version → traffic weight (0.0..1.0).
    #[serde(default)]
    pub additional_version_weights: BTreeMap<String, f64>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddPermissionInput {
    #[serde(rename = "statementID")]
    pub statement_id: String,
    pub action: String,
    pub principal: String,
    #[serde(rename = "sourceARN", skip_serializing_if = "Option::is_none")]
    pub source_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_source_token: Option<String>,
    #[serde(rename = "principalOrgID", skip_serializing_if = "Option::is_none")]
    pub principal_org_id: Option<String>,
    #[serde(rename = "functionURLAuthType", skip_serializing_if = "Option::is_none")]
    pub function_url_auth_type: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AliasStatus {
    #[serde(flatten)]
    pub ack: AckStatusFields,
    #[serde(rename = "revisionID", skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
}

impl_ack_status!(AliasStatus);

impl AliasSpec {
    pub fn managed_fields(&self) -> ManagedFields {
        let mut m = ManagedFields::new();
        mark(&mut m, "description", self.description.is_some());
        mark(&mut m, "routingConfig", self.routing_config.is_some());
        mark(
            &mut m,
            "provisionedConcurrencyConfig",
            self.provisioned_concurrency_config.is_some(),
        );
        mark(
            &mut m,
            "functionEventInvokeConfig",
            self.function_event_invoke_config.is_some(),
        );
        mark(&mut m, "permissions", self.permissions.is_some());
        m
    }
}
