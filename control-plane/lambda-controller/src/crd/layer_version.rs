use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{AckStatusFields, ManagedFields, impl_ack_status};

/// One CR owns every AWS layer version it publishes; deleting the CR
/// removes all of them.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[kube(
    group = "lambda.services.k8s.aws",
    version = "v1alpha1",
    kind = "LayerVersion",
    plural = "layerversions",
    namespaced,
    status = "LayerVersionStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct LayerVersionSpec {
    pub layer_name: String,
    pub content: LayerVersionContentInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible_runtimes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible_architectures: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_info: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayerVersionContentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_object_version: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayerVersionStatus {
    #[serde(flatten)]
    pub ack: AckStatusFields,
    /// The current (latest published) version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_number: Option<i64>,
    #[serde(rename = "layerARN", skip_serializing_if = "Option::is_none")]
    pub layer_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    /// Every version this resource has published and not yet deleted.
    #[serde(default)]
    pub published_versions: Vec<PublishedLayerVersion>,
    /// Digest of the spec that produced `versionNumber`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_fingerprint: Option<String>,
}

/// A published version together with the layer name it was published
/// under, which may since have changed in the spec.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublishedLayerVersion {
    pub layer_name: String,
    pub version: i64,
}

impl_ack_status!(LayerVersionStatus);

impl LayerVersionStatus {
    /// Layer name of the current version, if one was published.
    pub fn current_layer_name(&self) -> Option<&str> {
        let current = self.version_number?;
        self.published_versions
            .iter()
            .rev()
            .find(|p| p.version == current)
            .map(|p| p.layer_name.as_str())
    }
}

impl LayerVersionSpec {
    /// Every field is baked into the published version, so nothing is
    /// tracked as separately managed.
    pub fn managed_fields(&self) -> ManagedFields {
        ManagedFields::new()
    }
}
