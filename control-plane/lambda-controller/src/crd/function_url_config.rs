use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{
    AckStatusFields, AwsResourceReferenceWrapper, ManagedFields,
    impl_ack_status, mark,
};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[kube(
    group = "lambda.services.k8s.aws",
    version = "v1alpha1",
    kind = "FunctionURLConfig",
    plural = "functionurlconfigs",
    namespaced,
    status = "FunctionURLConfigStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionURLConfigSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_ref: Option<AwsResourceReferenceWrapper>,
    /// Alias name or `$LATEST`; unqualified when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// `AWS_IAM` or `NONE`.
    pub auth_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors: Option<Cors>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_headers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_methods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose_headers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionURLConfigStatus {
    #[serde(flatten)]
    pub ack: AckStatusFields,
    #[serde(rename = "functionARN", skip_serializing_if = "Option::is_none")]
    pub function_arn: Option<String>,
    #[serde(rename = "functionURL", skip_serializing_if = "Option::is_none")]
    pub function_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

impl_ack_status!(FunctionURLConfigStatus);

impl FunctionURLConfigSpec {
    pub fn managed_fields(&self) -> ManagedFields {
        let mut m = ManagedFields::new();
        mark(&mut m, "cors", self.cors.is_some());
        m
    }
}
