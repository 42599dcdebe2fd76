//! Function: configuration, code, tags, reserved concurrency, code signing
//! attachment and asynchronous invocation settings.
//!
//! AWS refuses configuration and code updates while a previous update is
//! still in progress, so a single pass never issues both: a code change is
//! applied alone, and configuration follows once the function settles.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use super::delta::{Intent, MapDelta, drifted, intent, map_delta, same_set};
use super::event_invoke::{self, EventInvokeOp};
use super::{Applied, AwsCtx, KindStatus, ResourceManager};
use crate::aws::{
    self, AwsError, AwsResultExt, CreateFunctionInput, EventInvokeConfig,
    FunctionDescription, UpdateFunctionCodeInput,
    UpdateFunctionConfigurationInput,
};
use crate::config::TimingConfig;
use crate::controller::ReconcileErr;
use crate::controller::references::{IAM_ROLE, KMS_KEY, ReferenceResolver, S3_BUCKET};
use crate::crd::{AckResource, ManagedFields};
use crate::crd::function::{Function, FunctionSpec};

/// Message AWS returns while an image is not yet pushed to ECR.
pub const SOURCE_IMAGE_NOT_READY: &str = "Provide a valid source image.";
pub const IMAGE_WITH_CODE_SIGNING: &str =
    "cannot set function code signing config when package type is Image";

#[derive(Clone, Debug)]
pub struct FunctionDesired {
    pub spec: FunctionSpec,
    pub role: Option<String>,
    pub s3_bucket: Option<String>,
    pub kms_key_arn: Option<String>,
}

impl FunctionDesired {
    fn name(&self) -> &str {
        &self.spec.name
    }
}

#[derive(Clone, Debug)]
pub struct FunctionObserved {
    pub function: FunctionDescription,
    pub code_signing_config_arn: Option<String>,
    pub event_invoke: Option<EventInvokeConfig>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FunctionOp {
    Tags(MapDelta),
    /// `None` removes the reservation.
    ReservedConcurrency(Option<i32>),
    /// `None` detaches the config.
    CodeSigning(Option<String>),
    EventInvoke(EventInvokeOp),
    Code(UpdateFunctionCodeInput),
    Configuration(UpdateFunctionConfigurationInput),
}

pub struct FunctionManager;

/// AWS rejects an image that is not pushed yet; retry on a slow cadence
/// instead of going terminal.
fn map_code_error(e: AwsError, timing: &TimingConfig) -> ReconcileErr {
    if e.message.contains(SOURCE_IMAGE_NOT_READY) {
        return ReconcileErr::Requeue {
            reason: format!("waiting for container image: {}", e.message),
            after: timing.source_image_requeue(),
        };
    }
    e.into()
}

fn code_signing_target(spec: &FunctionSpec) -> Option<&str> {
    spec.code_signing_config_arn
        .as_deref()
        .filter(|s| !s.is_empty())
}

fn create_input(d: &FunctionDesired) -> CreateFunctionInput {
    let spec = &d.spec;
    let code = spec.code.clone().unwrap_or_default();
    CreateFunctionInput {
        function_name: spec.name.clone(),
        role: d.role.clone(),
        code: aws::FunctionCode {
            s3_bucket: d.s3_bucket.clone(),
            s3_key: code.s3_key,
            s3_object_version: code.s3_object_version,
            image_uri: code.image_uri,
        },
        package_type: spec.package_type.clone(),
        runtime: spec.runtime.clone(),
        handler: spec.handler.clone(),
        description: spec.description.clone(),
        timeout: spec.timeout,
        memory_size: spec.memory_size,
        architectures: spec.architectures.clone().unwrap_or_default(),
        environment: spec
            .environment
            .as_ref()
            .map(|e| e.variables.clone().unwrap_or_default()),
        tags: spec.tags.clone().unwrap_or_default(),
        code_signing_config_arn: if spec.is_image() {
            None
        } else {
            code_signing_target(spec).map(str::to_string)
        },
        dead_letter_target_arn: spec
            .dead_letter_config
            .as_ref()
            .and_then(|c| c.target_arn.clone()),
        snap_start_apply_on: spec.snap_start.as_ref().and_then(|s| s.apply_on.clone()),
        ephemeral_storage_size: spec.ephemeral_storage.as_ref().and_then(|e| e.size),
        layers: spec.layers.clone().unwrap_or_default(),
        kms_key_arn: d.kms_key_arn.clone(),
        tracing_mode: spec.tracing_config.as_ref().and_then(|t| t.mode.clone()),
        vpc_config: spec.vpc_config.as_ref().map(vpc_model),
        image_config: spec.image_config.as_ref().map(image_model),
    }
}

fn vpc_model(v: &crate::crd::function::VpcConfig) -> aws::VpcConfig {
    aws::VpcConfig {
        subnet_ids: v.subnet_ids.clone(),
        security_group_ids: v.security_group_ids.clone(),
    }
}

fn image_model(i: &crate::crd::function::ImageConfig) -> aws::ImageConfig {
    aws::ImageConfig {
        command: i.command.clone(),
        entry_point: i.entry_point.clone(),
        working_directory: i.working_directory.clone(),
    }
}

/// Code or architecture drift, as a single `UpdateFunctionCode` call.
fn code_delta(
    d: &FunctionDesired,
    obs: &FunctionDescription,
) -> Option<UpdateFunctionCodeInput> {
    let spec = &d.spec;
    let code = spec.code.clone().unwrap_or_default();
    let cfg = &obs.configuration;
    let code_changed = if spec.is_image() {
        drifted(code.image_uri.as_ref(), obs.image_uri.as_ref())
    } else {
        drifted(code.sha256.as_ref(), cfg.code_sha256.as_ref())
    };
    let arch_changed = spec
        .architectures
        .as_ref()
        .is_some_and(|a| !same_set(a, &cfg.architectures));
    if !code_changed && !arch_changed {
        return None;
    }
    let mut input = UpdateFunctionCodeInput {
        function_name: spec.name.clone(),
        revision_id: cfg.revision_id.clone(),
        architectures: if arch_changed {
            spec.architectures.clone()
        } else {
            None
        },
        ..Default::default()
    };
    if spec.is_image() {
        input.image_uri = code.image_uri.or_else(|| obs.image_uri.clone());
    } else {
        input.s3_bucket = d.s3_bucket.clone();
        input.s3_key = code.s3_key;
        input.s3_object_version = code.s3_object_version;
    }
    Some(input)
}

/// Apply `Intent` for a string field where AWS clears with `""`.
fn string_field(
    target: &mut Option<String>,
    desired: Option<&String>,
    observed: Option<&String>,
    managed: &ManagedFields,
    field: &str,
) {
    match intent(desired, managed, field) {
        Intent::Set(v) if observed != Some(v) => *target = Some(v.clone()),
        Intent::Clear if observed.is_some_and(|o| !o.is_empty()) => {
            *target = Some(String::new())
        }
        _ => {}
    }
}

fn configuration_delta(
    d: &FunctionDesired,
    obs: &FunctionDescription,
    managed: &ManagedFields,
) -> UpdateFunctionConfigurationInput {
    let spec = &d.spec;
    let cfg = &obs.configuration;
    let mut u = UpdateFunctionConfigurationInput {
        function_name: spec.name.clone(),
        revision_id: cfg.revision_id.clone(),
        ..Default::default()
    };

    if drifted(d.role.as_ref(), cfg.role.as_ref()) {
        u.role = d.role.clone();
    }
    if drifted(spec.runtime.as_ref(), cfg.runtime.as_ref()) {
        u.runtime = spec.runtime.clone();
    }
    if drifted(spec.handler.as_ref(), cfg.handler.as_ref()) {
        u.handler = spec.handler.clone();
    }
    string_field(
        &mut u.description,
        spec.description.as_ref(),
        cfg.description.as_ref(),
        managed,
        "description",
    );
    if drifted(spec.timeout.as_ref(), cfg.timeout.as_ref()) {
        u.timeout = spec.timeout;
    }
    if drifted(spec.memory_size.as_ref(), cfg.memory_size.as_ref()) {
        u.memory_size = spec.memory_size;
    }

    match intent(spec.environment.as_ref(), managed, "environment") {
        Intent::Set(env) => {
            let vars = env.variables.clone().unwrap_or_default();
            if vars != cfg.environment {
                u.environment = Some(vars);
            }
        }
        Intent::Clear if !cfg.environment.is_empty() => {
            u.environment = Some(BTreeMap::new());
        }
        _ => {}
    }

    match intent(spec.layers.as_ref(), managed, "layers") {
        Intent::Set(layers) if *layers != cfg.layers => u.layers = Some(layers.clone()),
        Intent::Clear if !cfg.layers.is_empty() => u.layers = Some(vec![]),
        _ => {}
    }

    let dlq = spec
        .dead_letter_config
        .as_ref()
        .map(|c| c.target_arn.clone().unwrap_or_default());
    string_field(
        &mut u.dead_letter_target_arn,
        dlq.as_ref(),
        cfg.dead_letter_target_arn.as_ref(),
        managed,
        "deadLetterConfig",
    );

    let snap = spec.snap_start.as_ref().and_then(|s| s.apply_on.clone());
    match intent(snap.as_ref(), managed, "snapStart") {
        Intent::Set(v) if cfg.snap_start_apply_on.as_ref() != Some(v) => {
            u.snap_start_apply_on = Some(v.clone())
        }
        Intent::Clear
            if cfg
                .snap_start_apply_on
                .as_deref()
                .is_some_and(|v| v != "None") =>
        {
            u.snap_start_apply_on = Some("None".into())
        }
        _ => {}
    }

    let storage = spec.ephemeral_storage.as_ref().and_then(|e| e.size);
    match intent(storage.as_ref(), managed, "ephemeralStorage") {
        Intent::Set(v) if cfg.ephemeral_storage_size != Some(*v) => {
            u.ephemeral_storage_size = Some(*v)
        }
        Intent::Clear if cfg.ephemeral_storage_size.is_some_and(|v| v != 512) => {
            u.ephemeral_storage_size = Some(512)
        }
        _ => {}
    }

    string_field(
        &mut u.kms_key_arn,
        d.kms_key_arn.as_ref(),
        cfg.kms_key_arn.as_ref(),
        managed,
        "kmsKeyARN",
    );

    let mode = spec.tracing_config.as_ref().and_then(|t| t.mode.clone());
    match intent(mode.as_ref(), managed, "tracingConfig") {
        Intent::Set(v) if cfg.tracing_mode.as_ref() != Some(v) => {
            u.tracing_mode = Some(v.clone())
        }
        Intent::Clear
            if cfg
                .tracing_mode
                .as_deref()
                .is_some_and(|m| m != "PassThrough") =>
        {
            u.tracing_mode = Some("PassThrough".into())
        }
        _ => {}
    }

    match intent(spec.vpc_config.as_ref(), managed, "vpcConfig") {
        Intent::Set(v) => {
            let want = vpc_model(v);
            let have = cfg.vpc_config.clone().unwrap_or_default();
            if !same_set(&want.subnet_ids, &have.subnet_ids)
                || !same_set(&want.security_group_ids, &have.security_group_ids)
            {
                u.vpc_config = Some(want);
            }
        }
        Intent::Clear if cfg.vpc_config.is_some() => {
            u.vpc_config = Some(aws::VpcConfig::default())
        }
        _ => {}
    }

    match intent(spec.image_config.as_ref(), managed, "imageConfig") {
        Intent::Set(i) => {
            let want = image_model(i);
            if cfg.image_config.as_ref() != Some(&want) {
                u.image_config = Some(want);
            }
        }
        Intent::Clear if cfg.image_config.is_some() => {
            u.image_config = Some(aws::ImageConfig::default())
        }
        _ => {}
    }
    u
}

#[async_trait]
impl ResourceManager for FunctionManager {
    type Kind = Function;
    type Desired = FunctionDesired;
    type Observed = FunctionObserved;
    type Op = FunctionOp;

    async fn resolve(
        &self,
        obj: &Function,
        refs: &ReferenceResolver,
    ) -> Result<FunctionDesired, ReconcileErr> {
        let ns = obj.namespace().unwrap_or_else(|| "default".into());
        let spec = &obj.spec;
        let role = refs
            .require(&ns, "role", spec.role.as_deref(), spec.role_ref.as_ref(), &IAM_ROLE)
            .await?;
        let code = spec.code.as_ref();
        let s3_bucket = refs
            .resolve(
                &ns,
                "code.s3Bucket",
                code.and_then(|c| c.s3_bucket.as_deref()),
                code.and_then(|c| c.s3_bucket_ref.as_ref()),
                &S3_BUCKET,
            )
            .await?;
        let kms_key_arn = refs
            .resolve(
                &ns,
                "kmsKeyARN",
                spec.kms_key_arn.as_deref(),
                spec.kms_key_ref.as_ref(),
                &KMS_KEY,
            )
            .await?;
        Ok(FunctionDesired {
            spec: spec.clone(),
            role: Some(role),
            s3_bucket,
            kms_key_arn,
        })
    }

    fn desired_from_status(&self, obj: &Function) -> Option<FunctionDesired> {
        obj.ack()?.arn()?;
        Some(FunctionDesired {
            spec: obj.spec.clone(),
            role: None,
            s3_bucket: None,
            kms_key_arn: None,
        })
    }

    fn has_references(&self, obj: &Function) -> bool {
        let spec = &obj.spec;
        spec.role_ref.is_some()
            || spec.kms_key_ref.is_some()
            || spec
                .code
                .as_ref()
                .is_some_and(|c| c.s3_bucket_ref.is_some())
    }

    fn terminal_aws_error(&self, err: &AwsError) -> bool {
        err.code == "InvalidParameterValueException"
    }

    fn validate(&self, desired: &FunctionDesired) -> Result<(), ReconcileErr> {
        let spec = &desired.spec;
        if spec.name.is_empty() {
            return Err(ReconcileErr::Terminal("name must be set".into()));
        }
        if spec.is_image() && code_signing_target(spec).is_some() {
            return Err(ReconcileErr::Terminal(IMAGE_WITH_CODE_SIGNING.into()));
        }
        Ok(())
    }

    async fn read(
        &self,
        aws: &AwsCtx<'_>,
        desired: &FunctionDesired,
        _status: &KindStatus<Function>,
    ) -> Result<Option<FunctionObserved>, ReconcileErr> {
        let api = aws.api;
        let name = desired.name();
        let Some(function) = aws
            .call("GetFunction", move || api.get_function(name))
            .await
            .found()?
        else {
            return Ok(None);
        };
        let is_image = function.configuration.package_type.as_deref() == Some("Image");
        let code_signing_config_arn = if is_image {
            None
        } else {
            aws.call("GetFunctionCodeSigningConfig", move || {
                api.get_function_code_signing_config(name)
            })
            .await?
        };
        let event_invoke = event_invoke::read(aws, name, None).await?;
        Ok(Some(FunctionObserved {
            function,
            code_signing_config_arn,
            event_invoke,
        }))
    }

    async fn create(
        &self,
        aws: &AwsCtx<'_>,
        desired: &FunctionDesired,
        status: &mut KindStatus<Function>,
    ) -> Result<Option<String>, ReconcileErr> {
        let input = create_input(desired);
        let api = aws.api;
        let cfg = aws
            .call("CreateFunction", move || api.create_function(input.clone()))
            .await
            .map_err(|e| map_code_error(e, aws.timing))?;
        info!(function = %cfg.function_name, state = ?cfg.state, "function created");
        status.state = cfg.state.clone();
        status.state_reason = cfg.state_reason.clone();
        status.last_update_status = cfg.last_update_status.clone();
        status.code_sha256 = cfg.code_sha256.clone();
        status.revision_id = cfg.revision_id.clone();
        status.version = cfg.version.clone();
        status.last_modified = cfg.last_modified.clone();
        Ok(Some(cfg.function_arn))
    }

    fn requeue_hint(
        &self,
        observed: &FunctionObserved,
        timing: &TimingConfig,
    ) -> Option<(Duration, String)> {
        let cfg = &observed.function.configuration;
        if cfg.state.as_deref() == Some("Pending") {
            return Some((timing.pending_requeue(), "Function is Pending".into()));
        }
        if cfg.last_update_status.as_deref() == Some("InProgress") {
            return Some((
                timing.pending_requeue(),
                "Function update is in progress".into(),
            ));
        }
        None
    }

    fn plan(
        &self,
        desired: &FunctionDesired,
        observed: &FunctionObserved,
        managed: &ManagedFields,
    ) -> Vec<FunctionOp> {
        let spec = &desired.spec;
        let obs = &observed.function;
        let mut ops = Vec::new();

        match intent(spec.tags.as_ref(), managed, "tags") {
            Intent::Set(tags) => {
                let delta = map_delta(tags, &obs.tags);
                if !delta.is_empty() {
                    ops.push(FunctionOp::Tags(delta));
                }
            }
            Intent::Clear if !obs.tags.is_empty() => {
                ops.push(FunctionOp::Tags(map_delta(&BTreeMap::new(), &obs.tags)));
            }
            _ => {}
        }

        match intent(
            spec.reserved_concurrent_executions.as_ref(),
            managed,
            "reservedConcurrentExecutions",
        ) {
            Intent::Set(n) if obs.reserved_concurrency != Some(*n) => {
                ops.push(FunctionOp::ReservedConcurrency(Some(*n)))
            }
            Intent::Clear if obs.reserved_concurrency.is_some() => {
                ops.push(FunctionOp::ReservedConcurrency(None))
            }
            _ => {}
        }

        if !spec.is_image() {
            match intent(
                spec.code_signing_config_arn.as_ref(),
                managed,
                "codeSigningConfigARN",
            ) {
                Intent::Set(arn) if !arn.is_empty() => {
                    if observed.code_signing_config_arn.as_ref() != Some(arn) {
                        ops.push(FunctionOp::CodeSigning(Some(arn.clone())));
                    }
                }
                Intent::Set(_) | Intent::Clear => {
                    if observed.code_signing_config_arn.is_some() {
                        ops.push(FunctionOp::CodeSigning(None));
                    }
                }
                Intent::Ignore => {}
            }
        }

        if let Some(op) = event_invoke::plan(
            spec.function_event_invoke_config.as_ref(),
            observed.event_invoke.as_ref(),
            managed.contains("functionEventInvokeConfig"),
        ) {
            ops.push(FunctionOp::EventInvoke(op));
        }

        // Code first; configuration waits for the next pass.
        if let Some(code) = code_delta(desired, obs) {
            ops.push(FunctionOp::Code(code));
        } else {
            let cfg = configuration_delta(desired, obs, managed);
            if !cfg.is_empty() {
                ops.push(FunctionOp::Configuration(cfg));
            }
        }
        ops
    }

    async fn apply(
        &self,
        aws: &AwsCtx<'_>,
        desired: &FunctionDesired,
        observed: &FunctionObserved,
        ops: Vec<FunctionOp>,
        status: &mut KindStatus<Function>,
    ) -> Result<Applied, ReconcileErr> {
        let api = aws.api;
        let name = desired.name();
        let arn = observed.function.configuration.function_arn.as_str();
        for op in ops {
            debug!(?op, "applying function op");
            match op {
                FunctionOp::Tags(delta) => {
                    if !delta.remove.is_empty() {
                        let keys = delta.remove;
                        aws.call("UntagResource", move || {
                            api.untag_resource(arn, keys.clone())
                        })
                        .await?;
                    }
                    if !delta.upsert.is_empty() {
                        let tags = delta.upsert;
                        aws.call("TagResource", move || api.tag_resource(arn, tags.clone()))
                            .await?;
                    }
                }
                FunctionOp::ReservedConcurrency(Some(n)) => {
                    aws.call("PutFunctionConcurrency", move || {
                        api.put_function_concurrency(name, n)
                    })
                    .await?;
                }
                FunctionOp::ReservedConcurrency(None) => {
                    aws.call("DeleteFunctionConcurrency", move || {
                        api.delete_function_concurrency(name)
                    })
                    .await
                    .ignore_not_found()?;
                }
                FunctionOp::CodeSigning(Some(csc)) => {
                    let csc = csc.as_str();
                    aws.call("PutFunctionCodeSigningConfig", move || {
                        api.put_function_code_signing_config(name, csc)
                    })
                    .await?;
                }
                FunctionOp::CodeSigning(None) => {
                    aws.call("DeleteFunctionCodeSigningConfig", move || {
                        api.delete_function_code_signing_config(name)
                    })
                    .await
                    .ignore_not_found()?;
                }
                FunctionOp::EventInvoke(op) => {
                    event_invoke::apply(aws, name, None, op).await?;
                }
                FunctionOp::Code(input) => {
                    let cfg = aws
                        .call("UpdateFunctionCode", move || {
                            api.update_function_code(input.clone())
                        })
                        .await
                        .map_err(|e| map_code_error(e, aws.timing))?;
                    status.code_sha256 = cfg.code_sha256;
                    status.revision_id = cfg.revision_id;
                }
                FunctionOp::Configuration(input) => {
                    let cfg = aws
                        .call("UpdateFunctionConfiguration", move || {
                            api.update_function_configuration(input.clone())
                        })
                        .await?;
                    status.revision_id = cfg.revision_id;
                }
            }
        }
        Ok(Applied::Continue)
    }

    async fn delete(
        &self,
        aws: &AwsCtx<'_>,
        desired: &FunctionDesired,
        _status: &KindStatus<Function>,
    ) -> Result<(), ReconcileErr> {
        let api = aws.api;
        let name = desired.name();
        aws.call("DeleteFunction", move || api.delete_function(name, None))
            .await
            .ignore_not_found()?;
        Ok(())
    }

    fn project(&self, observed: &FunctionObserved, status: &mut KindStatus<Function>) {
        let cfg = &observed.function.configuration;
        status.state = cfg.state.clone();
        status.state_reason = cfg.state_reason.clone();
        status.last_update_status = cfg.last_update_status.clone();
        status.code_sha256 = cfg.code_sha256.clone();
        status.revision_id = cfg.revision_id.clone();
        status.version = cfg.version.clone();
        status.last_modified = cfg.last_modified.clone();
    }

    fn arn(&self, observed: &FunctionObserved) -> Option<String> {
        Some(observed.function.configuration.function_arn.clone())
    }
}
