use std::time::Duration;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

use super::event_invoke::{self, EventInvokeOp};
use super::{Applied, AwsCtx, KindStatus, ResourceManager};
use crate::aws::arn::function_name;
use crate::aws::{AwsResultExt, EventInvokeConfig, FunctionConfiguration, PublishVersionInput};
use crate::config::TimingConfig;
use crate::controller::ReconcileErr;
use crate::controller::references::{FUNCTION, ReferenceResolver};
use crate::crd::version::{Version, VersionSpec};
use crate::crd::{AckResource, ManagedFields};

#[derive(Clone, Debug)]
pub struct VersionDesired {
    pub spec: VersionSpec,
    pub function_name: String,
}

#[derive(Clone, Debug)]
pub struct VersionObserved {
    pub config: FunctionConfiguration,
    pub event_invoke: Option<EventInvokeConfig>,
}

pub struct VersionManager;

#[async_trait]
impl ResourceManager for VersionManager {
    type Kind = Version;
    type Desired = VersionDesired;
    type Observed = VersionObserved;
    type Op = EventInvokeOp;

    async fn resolve(
        &self,
        obj: &Version,
        refs: &ReferenceResolver,
    ) -> Result<VersionDesired, ReconcileErr> {
        let ns = obj.namespace().unwrap_or_else(|| "default".into());
        let function_name = refs
            .require(
                &ns,
                "functionName",
                obj.spec.function_name.as_deref(),
                obj.spec.function_ref.as_ref(),
                &FUNCTION,
            )
            .await?;
        Ok(VersionDesired {
            spec: obj.spec.clone(),
            function_name,
        })
    }

    fn desired_from_status(&self, obj: &Version) -> Option<VersionDesired> {
        let arn = obj.ack()?.arn()?;
        Some(VersionDesired {
            spec: obj.spec.clone(),
            function_name: function_name(arn).to_string(),
        })
    }

    fn has_references(&self, obj: &Version) -> bool {
        obj.spec.function_ref.is_some()
    }

    /// Nothing exists until a version number is recorded.
    async fn read(
        &self,
        aws: &AwsCtx<'_>,
        desired: &VersionDesired,
        status: &KindStatus<Version>,
    ) -> Result<Option<VersionObserved>, ReconcileErr> {
        let Some(version) = status.version.as_deref() else {
            return Ok(None);
        };
        let api = aws.api;
        let fname = desired.function_name.as_str();
        let Some(config) = aws
            .call("GetFunctionConfiguration", move || {
                api.get_function_configuration(fname, Some(version))
            })
            .await
            .found()?
        else {
            return Ok(None);
        };
        let event_invoke = event_invoke::read(aws, fname, Some(version)).await?;
        Ok(Some(VersionObserved {
            config,
            event_invoke,
        }))
    }

    async fn create(
        &self,
        aws: &AwsCtx<'_>,
        desired: &VersionDesired,
        status: &mut KindStatus<Version>,
    ) -> Result<Option<String>, ReconcileErr> {
        let spec = &desired.spec;
        let input = PublishVersionInput {
            function_name: desired.function_name.clone(),
            description: spec.description.clone(),
            code_sha256: spec.code_sha256.clone(),
            revision_id: spec.revision_id.clone(),
        };
        let api = aws.api;
        let cfg = aws
            .call("PublishVersion", move || api.publish_version(input.clone()))
            .await?;
        info!(function = %desired.function_name, version = ?cfg.version, "version published");
        status.version = cfg.version.clone();
        status.state = cfg.state.clone();
        status.code_sha256 = cfg.code_sha256.clone();
        status.last_modified = cfg.last_modified.clone();
        Ok(Some(cfg.function_arn))
    }

    fn requeue_hint(
        &self,
        observed: &VersionObserved,
        timing: &TimingConfig,
    ) -> Option<(Duration, String)> {
        (observed.config.state.as_deref() == Some("Pending"))
            .then(|| (timing.pending_requeue(), "Version is Pending".to_string()))
    }

    /// Published versions are immutable apart from their event-invoke config.
    fn plan(
        &self,
        desired: &VersionDesired,
        observed: &VersionObserved,
        managed: &ManagedFields,
    ) -> Vec<EventInvokeOp> {
        event_invoke::plan(
            desired.spec.function_event_invoke_config.as_ref(),
            observed.event_invoke.as_ref(),
            managed.contains("functionEventInvokeConfig"),
        )
        .into_iter()
        .collect()
    }

    async fn apply(
        &self,
        aws: &AwsCtx<'_>,
        desired: &VersionDesired,
        observed: &VersionObserved,
        ops: Vec<EventInvokeOp>,
        _status: &mut KindStatus<Version>,
    ) -> Result<Applied, ReconcileErr> {
        let version = observed.config.version.as_deref();
        for op in ops {
            event_invoke::apply(aws, &desired.function_name, version, op).await?;
        }
        Ok(Applied::Continue)
    }

    async fn delete(
        &self,
        aws: &AwsCtx<'_>,
        desired: &VersionDesired,
        status: &KindStatus<Version>,
    ) -> Result<(), ReconcileErr> {
        let Some(version) = status.version.as_deref() else {
            return Ok(());
        };
        let api = aws.api;
        let fname = desired.function_name.as_str();
        aws.call("DeleteFunction", move || api.delete_function(fname, Some(version)))
            .await
            .ignore_not_found()?;
        Ok(())
    }

    fn project(&self, observed: &VersionObserved, status: &mut KindStatus<Version>) {
        let cfg = &observed.config;
        status.version = cfg.version.clone();
        status.state = cfg.state.clone();
        status.code_sha256 = cfg.code_sha256.clone();
        status.last_modified = cfg.last_modified.clone();
    }

    fn arn(&self, observed: &VersionObserved) -> Option<String> {
        Some(observed.config.function_arn.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::common::FunctionEventInvokeConfig;

    fn observed() -> VersionObserved {
        VersionObserved {
            config: FunctionConfiguration {
                function_name: "fn".into(),
                function_arn: "arn:aws:lambda:us-west-2:1:function:fn:3".into(),
                version: Some("3".into()),
                state: Some("Active".into()),
                ..Default::default()
            },
            event_invoke: None,
        }
    }

    #[test]
    fn only_event_invoke_config_is_mutable() {
        let mut spec = VersionSpec {
            function_name: Some("fn".into()),
            description: Some("changed after publish".into()),
            ..Default::default()
        };
        let d = VersionDesired {
            spec: spec.clone(),
            function_name: "fn".into(),
        };
        assert!(VersionManager.plan(&d, &observed(), &ManagedFields::new()).is_empty());

        spec.function_event_invoke_config = Some(FunctionEventInvokeConfig {
            maximum_retry_attempts: Some(0),
            ..Default::default()
        });
        let d = VersionDesired {
            spec,
            function_name: "fn".into(),
        };
        assert!(matches!(
            VersionManager.plan(&d, &observed(), &ManagedFields::new()).as_slice(),
            [EventInvokeOp::Put(c)] if c.maximum_retry_attempts == Some(0)
        ));
    }

    #[test]
    fn pending_versions_requeue() {
        let timing = TimingConfig::default();
        let mut obs = observed();
        assert!(VersionManager.requeue_hint(&obs, &timing).is_none());
        obs.config.state = Some("Pending".into());
        assert!(VersionManager.requeue_hint(&obs, &timing).is_some());
    }
}
