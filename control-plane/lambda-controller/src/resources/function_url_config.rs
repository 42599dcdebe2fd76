use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

use super::delta::{Intent, intent};
use super::{Applied, AwsCtx, KindStatus, ResourceManager};
use crate::aws::arn::function_name;
use crate::aws::{self, AwsResultExt, FunctionUrlConfig, FunctionUrlConfigInput};
use crate::controller::ReconcileErr;
use crate::controller::references::{FUNCTION, ReferenceResolver};
use crate::crd::ManagedFields;
use crate::crd::function_url_config::{Cors, FunctionURLConfig, FunctionURLConfigSpec};

const AUTH_TYPES: &[&str] = &["AWS_IAM", "NONE"];

#[derive(Clone, Debug)]
pub struct UrlDesired {
    pub spec: FunctionURLConfigSpec,
    pub function_name: String,
}

impl UrlDesired {
    fn qualifier(&self) -> Option<&str> {
        self.spec.qualifier.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UrlOp {
    Update(FunctionUrlConfigInput),
}

pub struct FunctionUrlConfigManager;

fn cors_model(c: &Cors) -> aws::Cors {
    aws::Cors {
        allow_credentials: c.allow_credentials,
        allow_headers: c.allow_headers.clone().unwrap_or_default(),
        allow_methods: c.allow_methods.clone().unwrap_or_default(),
        allow_origins: c.allow_origins.clone().unwrap_or_default(),
        expose_headers: c.expose_headers.clone().unwrap_or_default(),
        max_age: c.max_age,
    }
}

fn record(url: &FunctionUrlConfig, status: &mut KindStatus<FunctionURLConfig>) {
    status.function_arn = Some(url.function_arn.clone());
    status.function_url = Some(url.function_url.clone());
    status.creation_time = url.creation_time.clone();
}

#[async_trait]
impl ResourceManager for FunctionUrlConfigManager {
    type Kind = FunctionURLConfig;
    type Desired = UrlDesired;
    type Observed = FunctionUrlConfig;
    type Op = UrlOp;

    async fn resolve(
        &self,
        obj: &FunctionURLConfig,
        refs: &ReferenceResolver,
    ) -> Result<UrlDesired, ReconcileErr> {
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
        Ok(UrlDesired {
            spec: obj.spec.clone(),
            function_name,
        })
    }

    fn desired_from_status(&self, obj: &FunctionURLConfig) -> Option<UrlDesired> {
        let arn = obj.status.as_ref()?.function_arn.as_deref()?;
        Some(UrlDesired {
            spec: obj.spec.clone(),
            function_name: function_name(arn).to_string(),
        })
    }

    fn has_references(&self, obj: &FunctionURLConfig) -> bool {
        obj.spec.function_ref.is_some()
    }

    fn validate(&self, desired: &UrlDesired) -> Result<(), ReconcileErr> {
        if !AUTH_TYPES.contains(&desired.spec.auth_type.as_str()) {
            return Err(ReconcileErr::Terminal(format!(
                "authType must be one of {}, got {:?}",
                AUTH_TYPES.join(", "),
                desired.spec.auth_type
            )));
        }
        Ok(())
    }

    async fn read(
        &self,
        aws: &AwsCtx<'_>,
        desired: &UrlDesired,
        _status: &KindStatus<FunctionURLConfig>,
    ) -> Result<Option<FunctionUrlConfig>, ReconcileErr> {
        let api = aws.api;
        let fname = desired.function_name.as_str();
        let qualifier = desired.qualifier();
        Ok(aws
            .call("GetFunctionUrlConfig", move || {
                api.get_function_url_config(fname, qualifier)
            })
            .await
            .found()?)
    }

    async fn create(
        &self,
        aws: &AwsCtx<'_>,
        desired: &UrlDesired,
        status: &mut KindStatus<FunctionURLConfig>,
    ) -> Result<Option<String>, ReconcileErr> {
        let input = FunctionUrlConfigInput {
            function_name: desired.function_name.clone(),
            qualifier: desired.spec.qualifier.clone(),
            auth_type: Some(desired.spec.auth_type.clone()),
            cors: desired.spec.cors.as_ref().map(cors_model),
        };
        let api = aws.api;
        let url = aws
            .call("CreateFunctionUrlConfig", move || {
                api.create_function_url_config(input.clone())
            })
            .await?;
        info!(url = %url.function_url, "function url created");
        record(&url, status);
        Ok(Some(url.function_arn))
    }

    fn plan(
        &self,
        desired: &UrlDesired,
        observed: &FunctionUrlConfig,
        managed: &ManagedFields,
    ) -> Vec<UrlOp> {
        let mut input = FunctionUrlConfigInput {
            function_name: desired.function_name.clone(),
            qualifier: desired.spec.qualifier.clone(),
            auth_type: None,
            cors: None,
        };
        if desired.spec.auth_type != observed.auth_type {
            input.auth_type = Some(desired.spec.auth_type.clone());
        }
        let have = observed.cors.clone().unwrap_or_default();
        match intent(desired.spec.cors.as_ref(), managed, "cors") {
            Intent::Set(c) => {
                let want = cors_model(c);
                if want != have {
                    input.cors = Some(want);
                }
            }
            Intent::Clear if observed.cors.is_some() => input.cors = Some(aws::Cors::default()),
            _ => {}
        }
        if input.auth_type.is_none() && input.cors.is_none() {
            vec![]
        } else {
            vec![UrlOp::Update(input)]
        }
    }

    async fn apply(
        &self,
        aws: &AwsCtx<'_>,
        _desired: &UrlDesired,
        _observed: &FunctionUrlConfig,
        ops: Vec<UrlOp>,
        status: &mut KindStatus<FunctionURLConfig>,
    ) -> Result<Applied, ReconcileErr> {
        let api = aws.api;
        for UrlOp::Update(input) in ops {
            let url = aws
                .call("UpdateFunctionUrlConfig", move || {
                    api.update_function_url_config(input.clone())
                })
                .await?;
            record(&url, status);
        }
        Ok(Applied::Continue)
    }

    async fn delete(
        &self,
        aws: &AwsCtx<'_>,
        desired: &UrlDesired,
        _status: &KindStatus<FunctionURLConfig>,
    ) -> Result<(), ReconcileErr> {
        let api = aws.api;
        let fname = desired.function_name.as_str();
        let qualifier = desired.qualifier();
        aws.call("DeleteFunctionUrlConfig", move || {
            api.delete_function_url_config(fname, qualifier)
        })
        .await
        .ignore_not_found()?;
        Ok(())
    }

    fn project(&self, observed: &FunctionUrlConfig, status: &mut KindStatus<FunctionURLConfig>) {
        record(observed, status);
    }

    fn arn(&self, observed: &FunctionUrlConfig) -> Option<String> {
        Some(observed.function_arn.clone())
    }
}
