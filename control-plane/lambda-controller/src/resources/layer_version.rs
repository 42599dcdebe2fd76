//! Layer versions are immutable: any spec change publishes a new version.
//! One resource therefore owns every version it ever published, under every
//! layer name it has used, and all of them go away when it is deleted.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;

use super::{Applied, AwsCtx, KindStatus, ResourceManager};
use crate::aws::{
    AwsResultExt, LayerContent, LayerVersionDescription, PublishLayerVersionInput,
};
use crate::controller::ReconcileErr;
use crate::controller::references::ReferenceResolver;
use crate::crd::ManagedFields;
use crate::crd::layer_version::{LayerVersion, LayerVersionSpec, PublishedLayerVersion};

#[derive(Clone, Debug)]
pub struct LayerDesired {
    pub spec: LayerVersionSpec,
    /// Digest of everything baked into a published version.
    pub fingerprint: String,
}

#[derive(Clone, Debug)]
pub struct LayerObserved {
    pub version: LayerVersionDescription,
    /// Fingerprint recorded when `version` was published.
    pub fingerprint: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerOp {
    Publish,
}

pub struct LayerVersionManager;

fn sorted(v: &Option<Vec<String>>) -> Vec<&String> {
    v.iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn fingerprint(spec: &LayerVersionSpec) -> String {
    let doc = json!({
        "layerName": spec.layer_name,
        "s3Bucket": spec.content.s3_bucket,
        "s3Key": spec.content.s3_key,
        "s3ObjectVersion": spec.content.s3_object_version,
        "description": spec.description,
        "compatibleRuntimes": sorted(&spec.compatible_runtimes),
        "compatibleArchitectures": sorted(&spec.compatible_architectures),
        "licenseInfo": spec.license_info,
    });
    format!("{:x}", Sha256::digest(doc.to_string().as_bytes()))
}

async fn publish(
    aws: &AwsCtx<'_>,
    desired: &LayerDesired,
    status: &mut KindStatus<LayerVersion>,
) -> Result<LayerVersionDescription, ReconcileErr> {
    let spec = &desired.spec;
    let input = PublishLayerVersionInput {
        layer_name: spec.layer_name.clone(),
        content: LayerContent {
            s3_bucket: spec.content.s3_bucket.clone(),
            s3_key: spec.content.s3_key.clone(),
            s3_object_version: spec.content.s3_object_version.clone(),
        },
        description: spec.description.clone(),
        compatible_runtimes: spec.compatible_runtimes.clone().unwrap_or_default(),
        compatible_architectures: spec.compatible_architectures.clone().unwrap_or_default(),
        license_info: spec.license_info.clone(),
    };
    let api = aws.api;
    let desc = aws
        .call("PublishLayerVersion", move || {
            api.publish_layer_version(input.clone())
        })
        .await?;
    info!(layer = %spec.layer_name, version = desc.version, "layer version published");
    status.version_number = Some(desc.version);
    status.layer_arn = Some(desc.layer_arn.clone());
    status.created_date = desc.created_date.clone();
    status.content_fingerprint = Some(desired.fingerprint.clone());
    let published = PublishedLayerVersion {
        layer_name: spec.layer_name.clone(),
        version: desc.version,
    };
    if !status.published_versions.contains(&published) {
        status.published_versions.push(published);
    }
    Ok(desc)
}

/// Versions recorded in status, grouped by layer name. The spec's current
/// name is always present, even with nothing recorded under it.
fn recorded_versions(
    desired: &LayerDesired,
    status: &KindStatus<LayerVersion>,
) -> BTreeMap<String, BTreeSet<i64>> {
    let mut by_name: BTreeMap<String, BTreeSet<i64>> = BTreeMap::new();
    by_name.entry(desired.spec.layer_name.clone()).or_default();
    for p in &status.published_versions {
        by_name
            .entry(p.layer_name.clone())
            .or_default()
            .insert(p.version);
    }
    if let Some(current) = status.version_number {
        let name = status
            .current_layer_name()
            .unwrap_or(desired.spec.layer_name.as_str());
        by_name.entry(name.to_string()).or_default().insert(current);
    }
    by_name
}

#[async_trait]
impl ResourceManager for LayerVersionManager {
    type Kind = LayerVersion;
    type Desired = LayerDesired;
    type Observed = LayerObserved;
    type Op = LayerOp;

    async fn resolve(
        &self,
        obj: &LayerVersion,
        _refs: &ReferenceResolver,
    ) -> Result<LayerDesired, ReconcileErr> {
        Ok(LayerDesired {
            fingerprint: fingerprint(&obj.spec),
            spec: obj.spec.clone(),
        })
    }

    fn desired_from_status(&self, obj: &LayerVersion) -> Option<LayerDesired> {
        Some(LayerDesired {
            fingerprint: fingerprint(&obj.spec),
            spec: obj.spec.clone(),
        })
    }

    fn has_references(&self, _obj: &LayerVersion) -> bool {
        false
    }

    fn validate(&self, desired: &LayerDesired) -> Result<(), ReconcileErr> {
        let content = &desired.spec.content;
        if content.s3_bucket.is_none() || content.s3_key.is_none() {
            return Err(ReconcileErr::Terminal(
                "content.s3Bucket and content.s3Key must be set".into(),
            ));
        }
        Ok(())
    }

    async fn read(
        &self,
        aws: &AwsCtx<'_>,
        desired: &LayerDesired,
        status: &KindStatus<LayerVersion>,
    ) -> Result<Option<LayerObserved>, ReconcileErr> {
        let Some(number) = status.version_number else {
            return Ok(None);
        };
        let api = aws.api;
        let name = status
            .current_layer_name()
            .unwrap_or(desired.spec.layer_name.as_str());
        let version = aws
            .call("GetLayerVersion", move || api.get_layer_version(name, number))
            .await
            .found()?;
        Ok(version.map(|version| LayerObserved {
            version,
            fingerprint: status.content_fingerprint.clone(),
        }))
    }

    async fn create(
        &self,
        aws: &AwsCtx<'_>,
        desired: &LayerDesired,
        status: &mut KindStatus<LayerVersion>,
    ) -> Result<Option<String>, ReconcileErr> {
        let desc = publish(aws, desired, status).await?;
        Ok(Some(desc.layer_version_arn))
    }

    fn plan(
        &self,
        desired: &LayerDesired,
        observed: &LayerObserved,
        _managed: &ManagedFields,
    ) -> Vec<LayerOp> {
        if observed.fingerprint.as_deref() == Some(desired.fingerprint.as_str()) {
            vec![]
        } else {
            vec![LayerOp::Publish]
        }
    }

    async fn apply(
        &self,
        aws: &AwsCtx<'_>,
        desired: &LayerDesired,
        _observed: &LayerObserved,
        ops: Vec<LayerOp>,
        status: &mut KindStatus<LayerVersion>,
    ) -> Result<Applied, ReconcileErr> {
        if ops.contains(&LayerOp::Publish) {
            publish(aws, desired, status).await?;
        }
        Ok(Applied::Continue)
    }

    /// Deletes every version under every layer name this resource used:
    /// the ones recorded in status and any AWS still lists under those
    /// names.
    async fn delete(
        &self,
        aws: &AwsCtx<'_>,
        desired: &LayerDesired,
        status: &KindStatus<LayerVersion>,
    ) -> Result<(), ReconcileErr> {
        let api = aws.api;
        let mut versions = recorded_versions(desired, status);
        for (name, owned) in versions.iter_mut() {
            let name = name.as_str();
            let listed = aws
                .call("ListLayerVersions", move || api.list_layer_versions(name))
                .await?;
            owned.extend(listed.iter().map(|v| v.version));
        }
        for (name, owned) in &versions {
            let name = name.as_str();
            for &version in owned {
                info!(layer = %name, version, "deleting layer version");
                aws.call("DeleteLayerVersion", move || {
                    api.delete_layer_version(name, version)
                })
                .await
                .ignore_not_found()?;
            }
        }
        Ok(())
    }

    async fn is_gone(
        &self,
        aws: &AwsCtx<'_>,
        desired: &LayerDesired,
        status: &KindStatus<LayerVersion>,
    ) -> Result<bool, ReconcileErr> {
        let api = aws.api;
        for name in recorded_versions(desired, status).keys() {
            let name = name.as_str();
            let listed = aws
                .call("ListLayerVersions", move || api.list_layer_versions(name))
                .await?;
            if !listed.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn project(&self, observed: &LayerObserved, status: &mut KindStatus<LayerVersion>) {
        let v = &observed.version;
        status.version_number = Some(v.version);
        status.layer_arn = Some(v.layer_arn.clone());
        status.created_date = v.created_date.clone();
    }

    fn arn(&self, observed: &LayerObserved) -> Option<String> {
        Some(observed.version.layer_version_arn.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::layer_version::LayerVersionContentInput;

    fn spec() -> LayerVersionSpec {
        LayerVersionSpec {
            layer_name: "deps".into(),
            content: LayerVersionContentInput {
                s3_bucket: Some("bucket".into()),
                s3_key: Some("layer.zip".into()),
                s3_object_version: None,
            },
            compatible_runtimes: Some(vec!["python3.12".into(), "python3.11".into()]),
            ..Default::default()
        }
    }

    #[test]
    fn fingerprint_ignores_runtime_order_but_not_content() {
        let a = spec();
        let mut b = spec();
        b.compatible_runtimes = Some(vec!["python3.11".into(), "python3.12".into()]);
        assert_eq!(fingerprint(&a), fingerprint(&b));

        b.content.s3_key = Some("layer-v2.zip".into());
        assert_ne!(fingerprint(&a), fingerprint(&b));

        let mut c = spec();
        c.description = Some("new".into());
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn renamed_layers_keep_versions_recorded_under_the_old_name() {
        let mut renamed = spec();
        renamed.layer_name = "deps-v2".into();
        assert_ne!(fingerprint(&spec()), fingerprint(&renamed));

        let desired = LayerDesired {
            fingerprint: fingerprint(&renamed),
            spec: renamed,
        };
        let status = crate::crd::layer_version::LayerVersionStatus {
            version_number: Some(1),
            published_versions: vec![
                PublishedLayerVersion {
                    layer_name: "deps".into(),
                    version: 1,
                },
            ],
            ..Default::default()
        };
        assert_eq!(status.current_layer_name(), Some("deps"));
        let grouped = recorded_versions(&desired, &status);
        assert_eq!(grouped["deps"], BTreeSet::from([1]));
        assert!(grouped["deps-v2"].is_empty());
    }

    #[test]
    fn changed_spec_publishes_a_new_version() {
        let desired = LayerDesired {
            fingerprint: fingerprint(&spec()),
            spec: spec(),
        };
        let observed = LayerObserved {
            version: LayerVersionDescription {
                version: 1,
                ..Default::default()
            },
            fingerprint: Some(desired.fingerprint.clone()),
        };
        assert!(
            LayerVersionManager
                .plan(&desired, &observed, &ManagedFields::new())
                .is_empty()
        );
        let stale = LayerObserved {
            fingerprint: Some("older".into()),
            ..observed
        };
        assert_eq!(
            LayerVersionManager.plan(&desired, &stale, &ManagedFields::new()),
            vec![LayerOp::Publish]
        );
    }
}
