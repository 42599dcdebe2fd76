use async_trait::async_trait;
use tracing::info;

use super::delta::{Intent, intent, same_set};
use super::{Applied, AwsCtx, KindStatus, ResourceManager};
use crate::aws::{AwsResultExt, CodeSigningConfigDescription, CodeSigningConfigInput};
use crate::controller::ReconcileErr;
use crate::controller::references::ReferenceResolver;
use crate::crd::code_signing_config::{CodeSigningConfig, CodeSigningConfigSpec};
use crate::crd::{AckStatus, ManagedFields};

/// What AWS applies when no policy is given.
const DEFAULT_UNTRUSTED_ARTIFACT_POLICY: &str = "Warn";

#[derive(Clone, Debug, PartialEq)]
pub enum CodeSigningConfigOp {
    Update(CodeSigningConfigInput),
}

pub struct CodeSigningConfigManager;

fn policy(spec: &CodeSigningConfigSpec) -> Option<&String> {
    spec.code_signing_policies
        .as_ref()
        .and_then(|p| p.untrusted_artifact_on_deployment.as_ref())
}

fn record(desc: &CodeSigningConfigDescription, status: &mut KindStatus<CodeSigningConfig>) {
    status.code_signing_config_id = Some(desc.id.clone());
    status.last_modified = desc.last_modified.clone();
}

#[async_trait]
impl ResourceManager for CodeSigningConfigManager {
    type Kind = CodeSigningConfig;
    type Desired = CodeSigningConfigSpec;
    type Observed = CodeSigningConfigDescription;
    type Op = CodeSigningConfigOp;

    async fn resolve(
        &self,
        obj: &CodeSigningConfig,
        _refs: &ReferenceResolver,
    ) -> Result<CodeSigningConfigSpec, ReconcileErr> {
        Ok(obj.spec.clone())
    }

    fn desired_from_status(&self, obj: &CodeSigningConfig) -> Option<CodeSigningConfigSpec> {
        Some(obj.spec.clone())
    }

    fn has_references(&self, _obj: &CodeSigningConfig) -> bool {
        false
    }

    fn validate(&self, desired: &CodeSigningConfigSpec) -> Result<(), ReconcileErr> {
        if desired
            .allowed_publishers
            .signing_profile_version_arns
            .is_empty()
        {
            return Err(ReconcileErr::Terminal(
                "allowedPublishers.signingProfileVersionARNs must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Identified by the ARN recorded at creation.
    async fn read(
        &self,
        aws: &AwsCtx<'_>,
        _desired: &CodeSigningConfigSpec,
        status: &KindStatus<CodeSigningConfig>,
    ) -> Result<Option<CodeSigningConfigDescription>, ReconcileErr> {
        let Some(arn) = status.ack().arn() else {
            return Ok(None);
        };
        let api = aws.api;
        Ok(aws
            .call("GetCodeSigningConfig", move || api.get_code_signing_config(arn))
            .await
            .found()?)
    }

    async fn create(
        &self,
        aws: &AwsCtx<'_>,
        desired: &CodeSigningConfigSpec,
        status: &mut KindStatus<CodeSigningConfig>,
    ) -> Result<Option<String>, ReconcileErr> {
        let input = CodeSigningConfigInput {
            description: desired.description.clone(),
            signing_profile_version_arns: desired
                .allowed_publishers
                .signing_profile_version_arns
                .clone(),
            untrusted_artifact_on_deployment: policy(desired).cloned(),
        };
        let api = aws.api;
        let desc = aws
            .call("CreateCodeSigningConfig", move || {
                api.create_code_signing_config(input.clone())
            })
            .await?;
        info!(arn = %desc.arn, "code signing config created");
        record(&desc, status);
        Ok(Some(desc.arn))
    }

    fn plan(
        &self,
        desired: &CodeSigningConfigSpec,
        observed: &CodeSigningConfigDescription,
        managed: &ManagedFields,
    ) -> Vec<CodeSigningConfigOp> {
        let mut input = CodeSigningConfigInput::default();
        let mut changed = false;

        match intent(desired.description.as_ref(), managed, "description") {
            Intent::Set(d) if observed.description.as_ref() != Some(d) => {
                input.description = Some(d.clone());
                changed = true;
            }
            Intent::Clear if observed.description.as_deref().is_some_and(|d| !d.is_empty()) => {
                input.description = Some(String::new());
                changed = true;
            }
            _ => {}
        }

        let arns = &desired.allowed_publishers.signing_profile_version_arns;
        if !same_set(arns, &observed.signing_profile_version_arns) {
            input.signing_profile_version_arns = arns.clone();
            changed = true;
        }

        match intent(policy(desired), managed, "codeSigningPolicies") {
            Intent::Set(p) if *p != observed.untrusted_artifact_on_deployment => {
                input.untrusted_artifact_on_deployment = Some(p.clone());
                changed = true;
            }
            Intent::Clear
                if observed.untrusted_artifact_on_deployment
                    != DEFAULT_UNTRUSTED_ARTIFACT_POLICY =>
            {
                input.untrusted_artifact_on_deployment =
                    Some(DEFAULT_UNTRUSTED_ARTIFACT_POLICY.into());
                changed = true;
            }
            _ => {}
        }

        if changed {
            vec![CodeSigningConfigOp::Update(input)]
        } else {
            vec![]
        }
    }

    async fn apply(
        &self,
        aws: &AwsCtx<'_>,
        _desired: &CodeSigningConfigSpec,
        observed: &CodeSigningConfigDescription,
        ops: Vec<CodeSigningConfigOp>,
        status: &mut KindStatus<CodeSigningConfig>,
    ) -> Result<Applied, ReconcileErr> {
        let api = aws.api;
        let arn = observed.arn.as_str();
        for CodeSigningConfigOp::Update(input) in ops {
            let desc = aws
                .call("UpdateCodeSigningConfig", move || {
                    api.update_code_signing_config(arn, input.clone())
                })
                .await?;
            record(&desc, status);
        }
        Ok(Applied::Continue)
    }

    /// Fails with a conflict while a function still uses the config; the
    /// finalizer stays until it is detached.
    async fn delete(
        &self,
        aws: &AwsCtx<'_>,
        _desired: &CodeSigningConfigSpec,
        status: &KindStatus<CodeSigningConfig>,
    ) -> Result<(), ReconcileErr> {
        let Some(arn) = status.ack().arn() else {
            return Ok(());
        };
        let api = aws.api;
        aws.call("DeleteCodeSigningConfig", move || {
            api.delete_code_signing_config(arn)
        })
        .await
        .ignore_not_found()?;
        Ok(())
    }

    fn project(
        &self,
        observed: &CodeSigningConfigDescription,
        status: &mut KindStatus<CodeSigningConfig>,
    ) {
        record(observed, status);
    }

    fn arn(&self, observed: &CodeSigningConfigDescription) -> Option<String> {
        Some(observed.arn.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::code_signing_config::{AllowedPublishers, CodeSigningPolicies};

    fn spec() -> CodeSigningConfigSpec {
        CodeSigningConfigSpec {
            description: Some("signed".into()),
            allowed_publishers: AllowedPublishers {
                signing_profile_version_arns: vec!["arn:signer:a".into(), "arn:signer:b".into()],
            },
            code_signing_policies: None,
        }
    }

    fn observed() -> CodeSigningConfigDescription {
        CodeSigningConfigDescription {
            arn: "arn:aws:lambda:us-west-2:1:code-signing-config:csc-1".into(),
            id: "csc-1".into(),
            description: Some("signed".into()),
            signing_profile_version_arns: vec!["arn:signer:b".into(), "arn:signer:a".into()],
            untrusted_artifact_on_deployment: "Warn".into(),
            last_modified: None,
        }
    }

    #[test]
    fn publisher_order_does_not_matter() {
        assert!(
            CodeSigningConfigManager
                .plan(&spec(), &observed(), &ManagedFields::new())
                .is_empty()
        );
    }

    #[test]
    fn removed_policy_falls_back_to_warn() {
        let mut obs = observed();
        obs.untrusted_artifact_on_deployment = "Enforce".into();
        let managed: ManagedFields = ["codeSigningPolicies".to_string()].into();
        let ops = CodeSigningConfigManager.plan(&spec(), &obs, &managed);
        assert!(matches!(
            ops.as_slice(),
            [CodeSigningConfigOp::Update(i)]
                if i.untrusted_artifact_on_deployment.as_deref() == Some("Warn")
                    && i.signing_profile_version_arns.is_empty()
        ));

        let mut s = spec();
        s.code_signing_policies = Some(CodeSigningPolicies {
            untrusted_artifact_on_deployment: Some("Enforce".into()),
        });
        assert!(CodeSigningConfigManager.plan(&s, &obs, &managed).is_empty());
    }

    #[test]
    fn empty_publishers_are_rejected() {
        let mut s = spec();
        s.allowed_publishers.signing_profile_version_arns.clear();
        assert!(CodeSigningConfigManager.validate(&s).is_err());
    }
}
