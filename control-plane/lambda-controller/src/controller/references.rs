//! Turns `*Ref` fields into concrete identifiers by reading the referenced
//! ACK resource from the cluster.
//!
//! A reference only resolves when its target exists, reports
//! `ACK.ResourceSynced=True`, is not terminal, and carries the field the
//! referrer needs (its AWS name or its ARN).

use std::sync::Arc;

use async_trait::async_trait;
use kube::Client;
use kube::api::Api;
use kube::core::{DynamicObject, GroupVersionKind};
use kube::discovery::ApiResource;
use serde_json::Value;
use tracing::debug;

use super::ReconcileErr;
use crate::crd::common::AwsResourceReferenceWrapper;

/// Which field of the target becomes the resolved value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetField {
    SpecName,
    StatusArn,
}

impl TargetField {
    fn describe(&self) -> &'static str {
        match self {
            TargetField::SpecName => "spec.name",
            TargetField::StatusArn => "status.ackResourceMetadata.arn",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ReferenceTarget {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    pub field: TargetField,
}

pub const FUNCTION: ReferenceTarget = ReferenceTarget {
    group: "lambda.services.k8s.aws",
    version: "v1alpha1",
    kind: "Function",
    plural: "functions",
    field: TargetField::SpecName,
};

pub const IAM_ROLE: ReferenceTarget = ReferenceTarget {
    group: "iam.services.k8s.aws",
    version: "v1alpha1",
    kind: "Role",
    plural: "roles",
    field: TargetField::StatusArn,
};

pub const S3_BUCKET: ReferenceTarget = ReferenceTarget {
    group: "s3.services.k8s.aws",
    version: "v1alpha1",
    kind: "Bucket",
    plural: "buckets",
    field: TargetField::SpecName,
};

pub const KMS_KEY: ReferenceTarget = ReferenceTarget {
    group: "kms.services.k8s.aws",
    version: "v1alpha1",
    kind: "Key",
    plural: "keys",
    field: TargetField::StatusArn,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferencedObject {
    pub spec: Value,
    pub status: Value,
}

impl ReferencedObject {
    fn condition_is_true(&self, type_: &str) -> bool {
        self.status
            .get("conditions")
            .and_then(Value::as_array)
            .map(|conds| {
                conds.iter().any(|c| {
                    c.get("type").and_then(Value::as_str) == Some(type_)
                        && c.get("status").and_then(Value::as_str)
                            == Some("True")
                })
            })
            .unwrap_or(false)
    }

    fn field(&self, field: TargetField) -> Option<String> {
        let v = match field {
            TargetField::SpecName => self.spec.get("name"),
            TargetField::StatusArn => self
                .status
                .get("ackResourceMetadata")
                .and_then(|m| m.get("arn")),
        };
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("referenced {kind} {namespace}/{name} does not exist")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("referenced {kind} {namespace}/{name} is not synced yet")]
    NotSynced {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("referenced {kind} {namespace}/{name} is in a terminal state")]
    Terminal {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("referenced {kind} {namespace}/{name} has no {field} yet")]
    MissingTarget {
        kind: &'static str,
        namespace: String,
        name: String,
        field: &'static str,
    },
    #[error(
        "reference to {kind} {namespace}/{name} crosses namespaces, which is not permitted"
    )]
    NamespaceNotPermitted {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("reading referenced {kind} {namespace}/{name}: {message}")]
    Read {
        kind: &'static str,
        namespace: String,
        name: String,
        message: String,
    },
}

/// Read access to referenced resources.
#[async_trait]
pub trait ReferenceReader: Send + Sync {
    async fn read(
        &self,
        target: &ReferenceTarget,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReferencedObject>, kube::Error>;
}

pub struct KubeReferenceReader {
    client: Client,
}

impl KubeReferenceReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReferenceReader for KubeReferenceReader {
    async fn read(
        &self,
        target: &ReferenceTarget,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReferencedObject>, kube::Error> {
        let gvk = GroupVersionKind::gvk(target.group, target.version, target.kind);
        let ar = ApiResource::from_gvk_with_plural(&gvk, target.plural);
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &ar);
        Ok(api.get_opt(name).await?.map(|obj| ReferencedObject {
            spec: obj.data.get("spec").cloned().unwrap_or(Value::Null),
            status: obj.data.get("status").cloned().unwrap_or(Value::Null),
        }))
    }
}

#[derive(Clone)]
pub struct ReferenceResolver {
    reader: Arc<dyn ReferenceReader>,
    allow_cross_namespace: bool,
}

impl ReferenceResolver {
    pub fn new(reader: Arc<dyn ReferenceReader>, allow_cross_namespace: bool) -> Self {
        Self {
            reader,
            allow_cross_namespace,
        }
    }

    /// Resolve an optional field that may be set directly or through a
    /// reference. Setting both is a terminal spec error.
    pub async fn resolve(
        &self,
        referrer_ns: &str,
        field: &str,
        direct: Option<&str>,
        reference: Option<&AwsResourceReferenceWrapper>,
        target: &ReferenceTarget,
    ) -> Result<Option<String>, ReconcileErr> {
        match (direct, reference) {
            (Some(_), Some(_)) => Err(ReconcileErr::Terminal(format!(
                "only one of {field} or {field}Ref may be set"
            ))),
            (Some(value), None) => Ok(Some(value.to_string())),
            (None, Some(wrapper)) => self
                .follow(referrer_ns, field, wrapper, target)
                .await
                .map(Some),
            (None, None) => Ok(None),
        }
    }

    /// Like [`resolve`](Self::resolve) but the value must end up set.
    pub async fn require(
        &self,
        referrer_ns: &str,
        field: &str,
        direct: Option<&str>,
        reference: Option<&AwsResourceReferenceWrapper>,
        target: &ReferenceTarget,
    ) -> Result<String, ReconcileErr> {
        self.resolve(referrer_ns, field, direct, reference, target)
            .await?
            .ok_or_else(|| {
                ReconcileErr::Terminal(format!(
                    "one of {field} or {field}Ref must be set"
                ))
            })
    }

    async fn follow(
        &self,
        referrer_ns: &str,
        field: &str,
        wrapper: &AwsResourceReferenceWrapper,
        target: &ReferenceTarget,
    ) -> Result<String, ReconcileErr> {
        let from = wrapper.from.as_ref();
        let name = from
            .and_then(|f| f.name.as_deref())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ReconcileErr::Terminal(format!("{field}Ref.from.name must be set"))
            })?;
        let namespace = from
            .and_then(|f| f.namespace.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or(referrer_ns);
        let kind = target.kind;
        if namespace != referrer_ns && !self.allow_cross_namespace {
            return Err(ReferenceError::NamespaceNotPermitted {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            }
            .into());
        }

        let obj = self
            .reader
            .read(target, namespace, name)
            .await
            .map_err(|e| ReferenceError::Read {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| ReferenceError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        if obj.condition_is_true("ACK.Terminal") {
            return Err(ReferenceError::Terminal {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            }
            .into());
        }
        if !obj.condition_is_true("ACK.ResourceSynced") {
            return Err(ReferenceError::NotSynced {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            }
            .into());
        }
        let value = obj.field(target.field).ok_or_else(|| {
            ReferenceError::MissingTarget {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
                field: target.field.describe(),
            }
        })?;
        debug!(%kind, %namespace, %name, field, "reference resolved");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Fixed(HashMap<(String, String), ReferencedObject>);

    #[async_trait]
    impl ReferenceReader for Fixed {
        async fn read(
            &self,
            target: &ReferenceTarget,
            namespace: &str,
            name: &str,
        ) -> Result<Option<ReferencedObject>, kube::Error> {
            let _ = target;
            Ok(self.0.get(&(namespace.to_string(), name.to_string())).cloned())
        }
    }

    fn synced_role(arn: Option<&str>) -> ReferencedObject {
        let mut status = json!({
            "conditions": [{"type": "ACK.ResourceSynced", "status": "True"}]
        });
        if let Some(arn) = arn {
            status["ackResourceMetadata"] = json!({"arn": arn});
        }
        ReferencedObject {
            spec: json!({"name": "role"}),
            status,
        }
    }

    fn resolver(objs: Vec<(&str, &str, ReferencedObject)>, cross: bool) -> ReferenceResolver {
        let map = objs
            .into_iter()
            .map(|(ns, n, o)| ((ns.to_string(), n.to_string()), o))
            .collect();
        ReferenceResolver::new(Arc::new(Fixed(map)), cross)
    }

    #[tokio::test]
    async fn direct_values_pass_through() {
        let r = resolver(vec![], false);
        let v = r
            .resolve("ns", "role", Some("arn:role"), None, &IAM_ROLE)
            .await
            .expect("resolve");
        assert_eq!(v.as_deref(), Some("arn:role"));
        assert_eq!(
            r.resolve("ns", "role", None, None, &IAM_ROLE).await.expect("none"),
            None
        );
    }

    #[tokio::test]
    async fn both_value_and_ref_is_terminal() {
        let r = resolver(vec![], false);
        let err = r
            .resolve(
                "ns",
                "role",
                Some("arn:role"),
                Some(&AwsResourceReferenceWrapper::named("r")),
                &IAM_ROLE,
            )
            .await
            .expect_err("both set");
        assert!(matches!(err, ReconcileErr::Terminal(_)));
    }

    #[tokio::test]
    async fn synced_reference_yields_its_arn() {
        let r = resolver(vec![("ns", "r", synced_role(Some("arn:aws:iam::1:role/x")))], false);
        let v = r
            .require("ns", "role", None, Some(&AwsResourceReferenceWrapper::named("r")), &IAM_ROLE)
            .await
            .expect("resolve");
        assert_eq!(v, "arn:aws:iam::1:role/x");
    }

    #[tokio::test]
    async fn unsynced_or_incomplete_references_are_not_ready() {
        let mut unsynced = synced_role(Some("arn"));
        unsynced.status["conditions"] =
            json!([{"type": "ACK.ResourceSynced", "status": "False"}]);
        let r = resolver(
            vec![("ns", "a", unsynced), ("ns", "b", synced_role(None))],
            false,
        );
        let err = r
            .require("ns", "role", None, Some(&AwsResourceReferenceWrapper::named("a")), &IAM_ROLE)
            .await
            .expect_err("unsynced");
        assert!(matches!(
            err,
            ReconcileErr::Reference(ReferenceError::NotSynced { .. })
        ));
        let err = r
            .require("ns", "role", None, Some(&AwsResourceReferenceWrapper::named("b")), &IAM_ROLE)
            .await
            .expect_err("no arn");
        assert!(matches!(
            err,
            ReconcileErr::Reference(ReferenceError::MissingTarget { .. })
        ));
        let err = r
            .require("ns", "role", None, Some(&AwsResourceReferenceWrapper::named("c")), &IAM_ROLE)
            .await
            .expect_err("missing");
        assert!(matches!(
            err,
            ReconcileErr::Reference(ReferenceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn cross_namespace_references_follow_policy() {
        let objs = vec![("other", "r", synced_role(Some("arn")))];
        let wrapper = AwsResourceReferenceWrapper::in_namespace("r", "other");

        let denied = resolver(objs.clone(), false)
            .require("ns", "role", None, Some(&wrapper), &IAM_ROLE)
            .await
            .expect_err("denied");
        assert!(matches!(
            denied,
            ReconcileErr::Reference(ReferenceError::NamespaceNotPermitted { .. })
        ));

        let allowed = resolver(objs, true)
            .require("ns", "role", None, Some(&wrapper), &IAM_ROLE)
            .await
            .expect("allowed");
        assert_eq!(allowed, "arn");
    }
}
