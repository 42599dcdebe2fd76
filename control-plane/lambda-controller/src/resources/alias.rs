//! Alias: the alias itself plus three sub-resources addressed by
//! `function:alias` (provisioned concurrency, event-invoke config and
//! resource-policy statements).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::debug;

use super::delta::{Intent, intent};
use super::event_invoke::{self, EventInvokeOp};
use super::{Applied, AwsCtx, KindStatus, ResourceManager};
use crate::aws::arn::function_name;
use crate::aws::policy::{account_from_root_arn, parse_policy};
use crate::aws::{
    AliasConfiguration, AliasInput, AwsResultExt, EventInvokeConfig, Permission,
    ProvisionedConcurrency,
};
use crate::config::TimingConfig;
use crate::controller::ReconcileErr;
use crate::controller::references::{FUNCTION, ReferenceResolver};
use crate::crd::alias::{AddPermissionInput, Alias, AliasSpec};
use crate::crd::{AckResource, ManagedFields};

#[derive(Clone, Debug)]
pub struct AliasDesired {
    pub spec: AliasSpec,
    pub function_name: String,
}

#[derive(Clone, Debug)]
pub struct AliasObserved {
    pub alias: AliasConfiguration,
    pub provisioned: Option<ProvisionedConcurrency>,
    pub event_invoke: Option<EventInvokeConfig>,
    pub permissions: Vec<Permission>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AliasOp {
    Update(AliasInput),
    /// `None` deletes the provisioned concurrency config.
    ProvisionedConcurrency(Option<i32>),
    EventInvoke(EventInvokeOp),
    RemovePermission(String),
    AddPermission(Permission),
}

pub struct AliasManager;

/// Desired statement in the form `GetPolicy` reports it back, so an
/// account given as its root ARN compares equal on the next pass.
fn permission_model(p: &AddPermissionInput) -> Permission {
    Permission {
        statement_id: p.statement_id.clone(),
        action: p.action.clone(),
        principal: account_from_root_arn(&p.principal),
        source_arn: p.source_arn.clone(),
        source_account: p.source_account.clone(),
        event_source_token: p.event_source_token.clone(),
        principal_org_id: p.principal_org_id.clone(),
        function_url_auth_type: p.function_url_auth_type.clone(),
    }
}

/// Statements have no update API: anything changed is removed and added
/// back. Removals come first so a statement ID is free before reuse.
fn permission_ops(desired: &[Permission], observed: &[Permission]) -> Vec<AliasOp> {
    let want: BTreeMap<&str, &Permission> = desired
        .iter()
        .map(|p| (p.statement_id.as_str(), p))
        .collect();
    let have: BTreeMap<&str, &Permission> = observed
        .iter()
        .map(|p| (p.statement_id.as_str(), p))
        .collect();

    let mut ops: Vec<AliasOp> = have
        .iter()
        .filter(|(sid, p)| want.get(*sid) != Some(*p))
        .map(|(sid, _)| AliasOp::RemovePermission(sid.to_string()))
        .collect();
    ops.extend(
        want.iter()
            .filter(|(sid, p)| have.get(*sid) != Some(*p))
            .map(|(_, p)| AliasOp::AddPermission((*p).clone())),
    );
    ops
}

#[async_trait]
impl ResourceManager for AliasManager {
    type Kind = Alias;
    type Desired = AliasDesired;
    type Observed = AliasObserved;
    type Op = AliasOp;

    async fn resolve(
        &self,
        obj: &Alias,
        refs: &ReferenceResolver,
    ) -> Result<AliasDesired, ReconcileErr> {
        let ns = obj.namespace().unwrap_or_else(|| "default".into());
        let spec = &obj.spec;
        let function_name = refs
            .require(
                &ns,
                "functionName",
                spec.function_name.as_deref(),
                spec.function_ref.as_ref(),
                &FUNCTION,
            )
            .await?;
        Ok(AliasDesired {
            spec: spec.clone(),
            function_name,
        })
    }

    fn desired_from_status(&self, obj: &Alias) -> Option<AliasDesired> {
        let arn = obj.ack()?.arn()?;
        Some(AliasDesired {
            spec: obj.spec.clone(),
            function_name: function_name(arn).to_string(),
        })
    }

    fn has_references(&self, obj: &Alias) -> bool {
        obj.spec.function_ref.is_some()
    }

    fn validate(&self, desired: &AliasDesired) -> Result<(), ReconcileErr> {
        if let Some(routing) = &desired.spec.routing_config {
            let total: f64 = routing.additional_version_weights.values().sum();
            if routing
                .additional_version_weights
                .values()
                .any(|w| !(0.0..=1.0).contains(w))
                || total > 1.0
            {
                return Err(ReconcileErr::Terminal(
                    "routingConfig weights must be between 0.0 and 1.0".into(),
                ));
            }
        }
        Ok(())
    }

    async fn read(
        &self,
        aws: &AwsCtx<'_>,
        desired: &AliasDesired,
        _status: &KindStatus<Alias>,
    ) -> Result<Option<AliasObserved>, ReconcileErr> {
        let api = aws.api;
        let fname = desired.function_name.as_str();
        let name = desired.spec.name.as_str();
        let Some(alias) = aws
            .call("GetAlias", move || api.get_alias(fname, name))
            .await
            .found()?
        else {
            return Ok(None);
        };
        let provisioned = aws
            .call("GetProvisionedConcurrencyConfig", move || {
                api.get_provisioned_concurrency_config(fname, name)
            })
            .await
            .found()?;
        let event_invoke = event_invoke::read(aws, fname, Some(name)).await?;
        let permissions = match aws
            .call("GetPolicy", move || api.get_policy(fname, Some(name)))
            .await
            .found()?
        {
            Some(doc) => parse_policy(&doc)?,
            None => Vec::new(),
        };
        Ok(Some(AliasObserved {
            alias,
            provisioned,
            event_invoke,
            permissions,
        }))
    }

    async fn create(
        &self,
        aws: &AwsCtx<'_>,
        desired: &AliasDesired,
        status: &mut KindStatus<Alias>,
    ) -> Result<Option<String>, ReconcileErr> {
        let spec = &desired.spec;
        let input = AliasInput {
            function_name: desired.function_name.clone(),
            name: spec.name.clone(),
            function_version: spec.function_version.clone(),
            description: spec.description.clone(),
            routing_weights: spec
                .routing_config
                .as_ref()
                .map(|r| r.additional_version_weights.clone()),
            revision_id: None,
        };
        let api = aws.api;
        let alias = aws
            .call("CreateAlias", move || api.create_alias(input.clone()))
            .await?;
        status.revision_id = alias.revision_id;
        Ok(Some(alias.alias_arn))
    }

    fn requeue_hint(
        &self,
        observed: &AliasObserved,
        timing: &TimingConfig,
    ) -> Option<(Duration, String)> {
        let status = observed.provisioned.as_ref()?.status.as_deref()?;
        (status == "IN_PROGRESS").then(|| {
            (
                timing.settle_requeue(),
                "Provisioned concurrency is being allocated".to_string(),
            )
        })
    }

    fn plan(
        &self,
        desired: &AliasDesired,
        observed: &AliasObserved,
        managed: &ManagedFields,
    ) -> Vec<AliasOp> {
        let spec = &desired.spec;
        let alias = &observed.alias;
        let mut ops = Vec::new();

        let mut update = AliasInput {
            function_name: desired.function_name.clone(),
            name: spec.name.clone(),
            function_version: spec.function_version.clone(),
            description: None,
            routing_weights: None,
            revision_id: alias.revision_id.clone(),
        };
        let mut changed = spec.function_version != alias.function_version;
        match intent(spec.description.as_ref(), managed, "description") {
            Intent::Set(d) if alias.description.as_ref() != Some(d) => {
                update.description = Some(d.clone());
                changed = true;
            }
            Intent::Clear if alias.description.as_deref().is_some_and(|d| !d.is_empty()) => {
                update.description = Some(String::new());
                changed = true;
            }
            _ => {}
        }
        match intent(spec.routing_config.as_ref(), managed, "routingConfig") {
            Intent::Set(r) if r.additional_version_weights != alias.routing_weights => {
                update.routing_weights = Some(r.additional_version_weights.clone());
                changed = true;
            }
            Intent::Clear if !alias.routing_weights.is_empty() => {
                update.routing_weights = Some(BTreeMap::new());
                changed = true;
            }
            _ => {}
        }
        if changed {
            ops.push(AliasOp::Update(update));
        }

        let wanted_pc = spec
            .provisioned_concurrency_config
            .as_ref()
            .and_then(|p| p.provisioned_concurrent_executions);
        let observed_pc = observed.provisioned.as_ref().map(|p| p.requested);
        match intent(
            spec.provisioned_concurrency_config.as_ref(),
            managed,
            "provisionedConcurrencyConfig",
        ) {
            Intent::Set(_) if wanted_pc.is_some() && wanted_pc != observed_pc => {
                ops.push(AliasOp::ProvisionedConcurrency(wanted_pc))
            }
            // An empty config block reads the same as removing it.
            Intent::Set(_) | Intent::Clear
                if wanted_pc.is_none() && observed_pc.is_some() =>
            {
                ops.push(AliasOp::ProvisionedConcurrency(None))
            }
            _ => {}
        }

        if let Some(op) = event_invoke::plan(
            spec.function_event_invoke_config.as_ref(),
            observed.event_invoke.as_ref(),
            managed.contains("functionEventInvokeConfig"),
        ) {
            ops.push(AliasOp::EventInvoke(op));
        }

        match intent(spec.permissions.as_ref(), managed, "permissions") {
            Intent::Set(perms) => {
                let want: Vec<Permission> = perms.iter().map(permission_model).collect();
                ops.extend(permission_ops(&want, &observed.permissions));
            }
            Intent::Clear => ops.extend(permission_ops(&[], &observed.permissions)),
            Intent::Ignore => {}
        }
        ops
    }

    async fn apply(
        &self,
        aws: &AwsCtx<'_>,
        desired: &AliasDesired,
        _observed: &AliasObserved,
        ops: Vec<AliasOp>,
        status: &mut KindStatus<Alias>,
    ) -> Result<Applied, ReconcileErr> {
        let api = aws.api;
        let fname = desired.function_name.as_str();
        let name = desired.spec.name.as_str();
        for op in ops {
            debug!(?op, "applying alias op");
            match op {
                AliasOp::Update(input) => {
                    let alias = aws
                        .call("UpdateAlias", move || api.update_alias(input.clone()))
                        .await?;
                    status.revision_id = alias.revision_id;
                }
                AliasOp::ProvisionedConcurrency(Some(n)) => {
                    aws.call("PutProvisionedConcurrencyConfig", move || {
                        api.put_provisioned_concurrency_config(fname, name, n)
                    })
                    .await?;
                }
                AliasOp::ProvisionedConcurrency(None) => {
                    aws.call("DeleteProvisionedConcurrencyConfig", move || {
                        api.delete_provisioned_concurrency_config(fname, name)
                    })
                    .await
                    .ignore_not_found()?;
                }
                AliasOp::EventInvoke(op) => {
                    event_invoke::apply(aws, fname, Some(name), op).await?;
                }
                AliasOp::RemovePermission(sid) => {
                    let sid = sid.as_str();
                    aws.call("RemovePermission", move || {
                        api.remove_permission(fname, Some(name), sid)
                    })
                    .await
                    .ignore_not_found()?;
                }
                AliasOp::AddPermission(permission) => {
                    aws.call("AddPermission", move || {
                        api.add_permission(fname, Some(name), permission.clone())
                    })
                    .await?;
                }
            }
        }
        Ok(Applied::Continue)
    }

    async fn delete(
        &self,
        aws: &AwsCtx<'_>,
        desired: &AliasDesired,
        _status: &KindStatus<Alias>,
    ) -> Result<(), ReconcileErr> {
        let api = aws.api;
        let fname = desired.function_name.as_str();
        let name = desired.spec.name.as_str();
        aws.call("DeleteAlias", move || api.delete_alias(fname, name))
            .await
            .ignore_not_found()?;
        Ok(())
    }

    /// The alias is gone, or so is the function it belonged to.
    async fn is_gone(
        &self,
        aws: &AwsCtx<'_>,
        desired: &AliasDesired,
        _status: &KindStatus<Alias>,
    ) -> Result<bool, ReconcileErr> {
        let api = aws.api;
        let fname = desired.function_name.as_str();
        let name = desired.spec.name.as_str();
        Ok(aws
            .call("GetAlias", move || api.get_alias(fname, name))
            .await
            .found()?
            .is_none())
    }

    fn project(&self, observed: &AliasObserved, status: &mut KindStatus<Alias>) {
        status.revision_id = observed.alias.revision_id.clone();
    }

    fn arn(&self, observed: &AliasObserved) -> Option<String> {
        Some(observed.alias.alias_arn.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::alias::AliasRoutingConfiguration;
    use crate::crd::common::ProvisionedConcurrencyConfig;

    fn spec() -> AliasSpec {
        AliasSpec {
            name: "live".into(),
            function_name: Some("fn".into()),
            function_version: "$LATEST".into(),
            ..Default::default()
        }
    }

    fn desired(spec: AliasSpec) -> AliasDesired {
        AliasDesired {
            spec,
            function_name: "fn".into(),
        }
    }

    fn observed() -> AliasObserved {
        AliasObserved {
            alias: AliasConfiguration {
                alias_arn: "arn:aws:lambda:us-west-2:1:function:fn:live".into(),
                name: "live".into(),
                function_version: "$LATEST".into(),
                description: Some(String::new()),
                routing_weights: BTreeMap::new(),
                revision_id: Some("r1".into()),
            },
            provisioned: None,
            event_invoke: None,
            permissions: vec![],
        }
    }

    fn perm(sid: &str, source_arn: &str) -> AddPermissionInput {
        AddPermissionInput {
            statement_id: sid.into(),
            action: "lambda:InvokeFunction".into(),
            principal: "s3.amazonaws.com".into(),
            source_arn: Some(source_arn.into()),
            ..Default::default()
        }
    }

    #[test]
    fn unchanged_alias_plans_nothing() {
        assert!(
            AliasManager
                .plan(&desired(spec()), &observed(), &ManagedFields::new())
                .is_empty()
        );
    }

    #[test]
    fn version_and_routing_ride_one_update() {
        let mut s = spec();
        s.function_version = "2".into();
        s.routing_config = Some(AliasRoutingConfiguration {
            additional_version_weights: [("1".to_string(), 0.1)].into(),
        });
        let ops = AliasManager.plan(&desired(s), &observed(), &ManagedFields::new());
        assert!(matches!(
            ops.as_slice(),
            [AliasOp::Update(u)] if u.function_version == "2"
                && u.routing_weights.as_ref().is_some_and(|w| w.len() == 1)
                && u.revision_id.as_deref() == Some("r1")
        ));
    }

    #[test]
    fn removed_provisioned_concurrency_is_deleted() {
        let mut obs = observed();
        obs.provisioned = Some(ProvisionedConcurrency {
            requested: 2,
            allocated: Some(2),
            status: Some("READY".into()),
        });
        let managed: ManagedFields = ["provisionedConcurrencyConfig".to_string()].into();
        let ops = AliasManager.plan(&desired(spec()), &obs, &managed);
        assert_eq!(ops, vec![AliasOp::ProvisionedConcurrency(None)]);

        let mut s = spec();
        s.provisioned_concurrency_config = Some(ProvisionedConcurrencyConfig {
            provisioned_concurrent_executions: Some(5),
        });
        let ops = AliasManager.plan(&desired(s), &obs, &managed);
        assert_eq!(ops, vec![AliasOp::ProvisionedConcurrency(Some(5))]);
    }

    #[test]
    fn changed_statements_are_removed_before_being_added() {
        let mut obs = observed();
        obs.permissions = vec![
            permission_model(&perm("permission1", "arn:aws:s3:::a")),
            permission_model(&perm("permission2", "arn:aws:s3:::b")),
        ];
        let mut s = spec();
        s.permissions = Some(vec![
            perm("permission2", "arn:aws:s3:::b2"),
            perm("permission3", "arn:aws:s3:::c"),
        ]);
        let ops = AliasManager.plan(&desired(s), &obs, &ManagedFields::new());
        let names: Vec<String> = ops
            .iter()
            .map(|o| match o {
                AliasOp::RemovePermission(sid) => format!("-{sid}"),
                AliasOp::AddPermission(p) => format!("+{}", p.statement_id),
                other => panic!("unexpected op {other:?}"),
            })
            .collect();
        assert_eq!(
            names,
            vec!["-permission1", "-permission2", "+permission2", "+permission3"]
        );
    }

    #[test]
    fn root_arn_principals_match_the_account_aws_reports() {
        let want = AddPermissionInput {
            statement_id: "cross-account".into(),
            action: "lambda:InvokeFunction".into(),
            principal: "arn:aws:iam::111122223333:root".into(),
            ..Default::default()
        };
        let doc = crate::aws::policy::render_policy(
            "arn:aws:lambda:us-west-2:1:function:fn:live",
            &[permission_model(&want)],
        );
        let mut obs = observed();
        obs.permissions = parse_policy(&doc).expect("parse");
        assert_eq!(obs.permissions[0].principal, "111122223333");

        let mut s = spec();
        s.permissions = Some(vec![want]);
        assert!(
            AliasManager
                .plan(&desired(s), &obs, &ManagedFields::new())
                .is_empty()
        );
    }

    #[test]
    fn out_of_range_weights_are_terminal() {
        let mut s = spec();
        s.routing_config = Some(AliasRoutingConfiguration {
            additional_version_weights: [("1".to_string(), 1.5)].into(),
        });
        assert!(matches!(
            AliasManager.validate(&desired(s)),
            Err(ReconcileErr::Terminal(_))
        ));
    }
}
