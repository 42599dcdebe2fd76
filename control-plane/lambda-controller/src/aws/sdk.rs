//! [`LambdaApi`] on top of `aws-sdk-lambda`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_lambda::types as t;
use aws_types::region::Region;
use tracing::debug;

use super::error::AwsError;
use super::model::*;
use super::policy::parse_policy;
use super::LambdaApi;
use crate::config::types::AwsSettings;

#[derive(Clone)]
pub struct SdkLambda {
    client: Client,
}

impl SdkLambda {
    pub async fn from_settings(settings: &AwsSettings) -> Self {
        let sdk_config =
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(Region::new(settings.region.clone()))
                .load()
                .await;
        let mut builder = aws_sdk_lambda::config::Builder::from(&sdk_config);
        if let Some(url) = settings.endpoint_url.as_ref() {
            builder = builder.endpoint_url(url);
        }
        SdkLambda {
            client: Client::from_conf(builder.build()),
        }
    }
}

fn sdk_err<E, R>(op: &str, err: SdkError<E, R>) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let out = match err.code() {
        Some(code) => AwsError::new(code, err.message().unwrap_or_default()),
        None => match &err {
            SdkError::DispatchFailure(_) => AwsError::new(
                "DispatchFailure",
                DisplayErrorContext(&err).to_string(),
            ),
            SdkError::TimeoutError(_) => AwsError::new(
                "TimeoutError",
                DisplayErrorContext(&err).to_string(),
            ),
            _ => AwsError::new("Unknown", DisplayErrorContext(&err).to_string()),
        },
    };
    debug!(op, error = %out, "lambda call failed");
    out
}

fn build_err(err: impl std::fmt::Display) -> AwsError {
    AwsError::invalid_parameter(err.to_string())
}

/// The SDK models some required members as plain values and optional ones
/// as `Option`; these let conversions treat both the same way.
trait OptString {
    fn opt(self) -> Option<String>;
}

impl OptString for String {
    fn opt(self) -> Option<String> {
        Some(self).filter(|s| !s.is_empty())
    }
}

impl<T: AsRef<str>> OptString for Option<T> {
    fn opt(self) -> Option<String> {
        self.map(|s| s.as_ref().to_string())
    }
}

impl OptString for t::FunctionUrlAuthType {
    fn opt(self) -> Option<String> {
        Some(self.as_str().to_string())
    }
}

trait OptVec<T> {
    fn vec(self) -> Vec<T>;
}

impl<T> OptVec<T> for Vec<T> {
    fn vec(self) -> Vec<T> {
        self
    }
}

impl<T> OptVec<T> for Option<Vec<T>> {
    fn vec(self) -> Vec<T> {
        self.unwrap_or_default()
    }
}

trait OptNum<T> {
    fn num(self) -> Option<T>;
}

impl OptNum<i32> for i32 {
    fn num(self) -> Option<i32> {
        Some(self)
    }
}

impl OptNum<i32> for Option<i32> {
    fn num(self) -> Option<i32> {
        self
    }
}

impl OptNum<i64> for i64 {
    fn num(self) -> Option<i64> {
        Some(self)
    }
}

impl OptNum<i64> for Option<i64> {
    fn num(self) -> Option<i64> {
        self
    }
}

fn strings<T: AsRef<str>>(v: impl OptVec<T>) -> Vec<String> {
    v.vec().into_iter().map(|s| s.as_ref().to_string()).collect()
}

fn from_function_configuration(c: t::FunctionConfiguration) -> FunctionConfiguration {
    FunctionConfiguration {
        function_name: c.function_name.opt().unwrap_or_default(),
        function_arn: c.function_arn.opt().unwrap_or_default(),
        runtime: c.runtime.opt(),
        role: c.role.opt(),
        handler: c.handler.opt(),
        description: c.description.opt(),
        timeout: c.timeout.num(),
        memory_size: c.memory_size.num(),
        code_sha256: c.code_sha256.opt(),
        version: c.version.opt(),
        revision_id: c.revision_id.opt(),
        state: c.state.opt(),
        state_reason: c.state_reason.opt(),
        last_update_status: c.last_update_status.opt(),
        last_modified: c.last_modified.opt(),
        package_type: c.package_type.opt(),
        architectures: strings(c.architectures),
        environment: c
            .environment
            .and_then(|e| e.variables)
            .map(|v| v.into_iter().collect())
            .unwrap_or_default(),
        layers: c
            .layers
            .vec()
            .into_iter()
            .filter_map(|l| l.arn.opt())
            .collect(),
        dead_letter_target_arn: c.dead_letter_config.and_then(|d| d.target_arn.opt()),
        snap_start_apply_on: c.snap_start.and_then(|s| s.apply_on.opt()),
        ephemeral_storage_size: c.ephemeral_storage.and_then(|e| e.size.num()),
        kms_key_arn: c.kms_key_arn.opt(),
        tracing_mode: c.tracing_config.and_then(|t| t.mode.opt()),
        vpc_config: c
            .vpc_config
            .map(|v| VpcConfig {
                subnet_ids: strings(v.subnet_ids),
                security_group_ids: strings(v.security_group_ids),
            })
            .filter(|v| !(v.subnet_ids.is_empty() && v.security_group_ids.is_empty())),
        image_config: c
            .image_config_response
            .and_then(|r| r.image_config)
            .map(|i| ImageConfig {
                command: strings(i.command),
                entry_point: strings(i.entry_point),
                working_directory: i.working_directory.opt(),
            }),
    }
}

fn to_vpc(v: VpcConfig) -> t::VpcConfig {
    t::VpcConfig::builder()
        .set_subnet_ids(Some(v.subnet_ids))
        .set_security_group_ids(Some(v.security_group_ids))
        .build()
}

fn to_image_config(i: ImageConfig) -> t::ImageConfig {
    t::ImageConfig::builder()
        .set_command(Some(i.command))
        .set_entry_point(Some(i.entry_point))
        .set_working_directory(i.working_directory)
        .build()
}

fn to_environment(vars: BTreeMap<String, String>) -> t::Environment {
    t::Environment::builder()
        .set_variables(Some(vars.into_iter().collect()))
        .build()
}

fn to_ephemeral(size: i32) -> Result<t::EphemeralStorage, AwsError> {
    t::EphemeralStorage::builder()
        .size(size)
        .build()
        .map_err(build_err)
}

fn to_destination(on_success: Option<String>, on_failure: Option<String>) -> t::DestinationConfig {
    t::DestinationConfig::builder()
        .set_on_success(
            on_success.map(|d| t::OnSuccess::builder().destination(d).build()),
        )
        .set_on_failure(
            on_failure.map(|d| t::OnFailure::builder().destination(d).build()),
        )
        .build()
}

fn from_alias(a: t::AliasConfiguration) -> AliasConfiguration {
    AliasConfiguration {
        alias_arn: a.alias_arn.opt().unwrap_or_default(),
        name: a.name.opt().unwrap_or_default(),
        function_version: a.function_version.opt().unwrap_or_default(),
        description: a.description.opt(),
        routing_weights: a
            .routing_config
            .and_then(|r| r.additional_version_weights)
            .map(|w| w.into_iter().collect())
            .unwrap_or_default(),
        revision_id: a.revision_id.opt(),
    }
}

macro_rules! from_mapping {
    ($m:expr) => {{
        let m = $m;
        EventSourceMappingConfiguration {
            uuid: m.uuid.opt().unwrap_or_default(),
            function_arn: m.function_arn.opt(),
            event_source_arn: m.event_source_arn.opt(),
            batch_size: m.batch_size.num(),
            maximum_batching_window_in_seconds: m
                .maximum_batching_window_in_seconds
                .num(),
            starting_position: m.starting_position.opt(),
            maximum_retry_attempts: m.maximum_retry_attempts.num(),
            maximum_record_age_in_seconds: m.maximum_record_age_in_seconds.num(),
            bisect_batch_on_function_error: m.bisect_batch_on_function_error,
            parallelization_factor: m.parallelization_factor.num(),
            filter_patterns: m.filter_criteria.map(|f| {
                f.filters
                    .vec()
                    .into_iter()
                    .filter_map(|p| p.pattern.opt())
                    .collect()
            }),
            destination_config: m.destination_config.map(|d| DestinationTargets {
                on_success: d.on_success.and_then(|o| o.destination.opt()),
                on_failure: d.on_failure.and_then(|o| o.destination.opt()),
            }),
            scaling_maximum_concurrency: m
                .scaling_config
                .and_then(|s| s.maximum_concurrency.num()),
            function_response_types: strings(m.function_response_types),
            tumbling_window_in_seconds: m.tumbling_window_in_seconds.num(),
            queues: strings(m.queues),
            source_access_configurations: m
                .source_access_configurations
                .vec()
                .into_iter()
                .map(|s| SourceAccessConfiguration {
                    type_: s.r#type.opt(),
                    uri: s.uri.opt(),
                })
                .collect(),
            state: m.state.opt(),
            state_transition_reason: m.state_transition_reason.opt(),
            last_modified: m.last_modified.map(|d| d.to_string()),
            last_processing_result: m.last_processing_result.opt(),
        }
    }};
}

macro_rules! from_csc {
    ($c:expr) => {{
        let c = $c;
        CodeSigningConfigDescription {
            arn: c.code_signing_config_arn.opt().unwrap_or_default(),
            id: c.code_signing_config_id.opt().unwrap_or_default(),
            description: c.description.opt(),
            signing_profile_version_arns: c
                .allowed_publishers
                .map(|p| strings(p.signing_profile_version_arns))
                .unwrap_or_default(),
            untrusted_artifact_on_deployment: c
                .code_signing_policies
                .and_then(|p| p.untrusted_artifact_on_deployment.opt())
                .unwrap_or_default(),
            last_modified: c.last_modified.opt(),
        }
    }};
}

macro_rules! from_cors {
    ($c:expr) => {
        $c.map(|c| Cors {
            allow_credentials: c.allow_credentials,
            allow_headers: strings(c.allow_headers),
            allow_methods: strings(c.allow_methods),
            allow_origins: strings(c.allow_origins),
            expose_headers: strings(c.expose_headers),
            max_age: c.max_age.num(),
        })
    };
}

macro_rules! from_url {
    ($u:expr) => {{
        let u = $u;
        FunctionUrlConfig {
            function_url: u.function_url.opt().unwrap_or_default(),
            function_arn: u.function_arn.opt().unwrap_or_default(),
            auth_type: u.auth_type.opt().unwrap_or_default(),
            cors: from_cors!(u.cors),
            creation_time: u.creation_time.opt(),
            last_modified: u.last_modified_time.opt(),
        }
    }};
}

macro_rules! from_layer_version {
    ($l:expr, $arn:expr) => {{
        let l = $l;
        let layer_version_arn = l.layer_version_arn.opt().unwrap_or_default();
        LayerVersionDescription {
            layer_arn: $arn
                .unwrap_or_else(|| super::arn::layer_arn_of(&layer_version_arn).to_string()),
            version: l.version.num().unwrap_or_default(),
            description: l.description.opt(),
            created_date: l.created_date.opt(),
            compatible_runtimes: strings(l.compatible_runtimes),
            compatible_architectures: strings(l.compatible_architectures),
            license_info: l.license_info.opt(),
            code_sha256: None,
            layer_version_arn,
        }
    }};
}

fn to_cors(c: Cors) -> t::Cors {
    t::Cors::builder()
        .set_allow_credentials(c.allow_credentials)
        .set_allow_headers(Some(c.allow_headers))
        .set_allow_methods(Some(c.allow_methods))
        .set_allow_origins(Some(c.allow_origins))
        .set_expose_headers(Some(c.expose_headers))
        .set_max_age(c.max_age)
        .build()
}

#[async_trait]
impl LambdaApi for SdkLambda {
    async fn create_function(
        &self,
        input: CreateFunctionInput,
    ) -> Result<FunctionConfiguration, AwsError> {
        let code = t::FunctionCode::builder()
            .set_s3_bucket(input.code.s3_bucket)
            .set_s3_key(input.code.s3_key)
            .set_s3_object_version(input.code.s3_object_version)
            .set_image_uri(input.code.image_uri)
            .build();
        let mut req = self
            .client
            .create_function()
            .function_name(input.function_name)
            .set_role(input.role)
            .code(code)
            .set_package_type(input.package_type.map(|p| t::PackageType::from(p.as_str())))
            .set_runtime(input.runtime.map(|r| t::Runtime::from(r.as_str())))
            .set_handler(input.handler)
            .set_description(input.description)
            .set_timeout(input.timeout)
            .set_memory_size(input.memory_size)
            .set_code_signing_config_arn(input.code_signing_config_arn)
            .set_kms_key_arn(input.kms_key_arn)
            .set_vpc_config(input.vpc_config.map(to_vpc))
            .set_image_config(input.image_config.map(to_image_config))
            .set_environment(input.environment.map(to_environment));
        if !input.architectures.is_empty() {
            req = req.set_architectures(Some(
                input
                    .architectures
                    .iter()
                    .map(|a| t::Architecture::from(a.as_str()))
                    .collect(),
            ));
        }
        if !input.layers.is_empty() {
            req = req.set_layers(Some(input.layers));
        }
        if !input.tags.is_empty() {
            req = req.set_tags(Some(input.tags.into_iter().collect()));
        }
        if let Some(arn) = input.dead_letter_target_arn {
            req = req.dead_letter_config(t::DeadLetterConfig::builder().target_arn(arn).build());
        }
        if let Some(apply_on) = input.snap_start_apply_on {
            req = req.snap_start(
                t::SnapStart::builder()
                    .apply_on(t::SnapStartApplyOn::from(apply_on.as_str()))
                    .build(),
            );
        }
        if let Some(size) = input.ephemeral_storage_size {
            req = req.ephemeral_storage(to_ephemeral(size)?);
        }
        if let Some(mode) = input.tracing_mode {
            req = req.tracing_config(
                t::TracingConfig::builder()
                    .mode(t::TracingMode::from(mode.as_str()))
                    .build(),
            );
        }
        let out = req
            .send()
            .await
            .map_err(|e| sdk_err("CreateFunction", e))?;
        Ok(FunctionConfiguration {
            function_name: out.function_name.opt().unwrap_or_default(),
            function_arn: out.function_arn.opt().unwrap_or_default(),
            code_sha256: out.code_sha256.opt(),
            revision_id: out.revision_id.opt(),
            state: out.state.opt(),
            state_reason: out.state_reason.opt(),
            last_modified: out.last_modified.opt(),
            version: out.version.opt(),
            ..Default::default()
        })
    }

    async fn get_function(
        &self,
        function_name: &str,
    ) -> Result<FunctionDescription, AwsError> {
        let out = self
            .client
            .get_function()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| sdk_err("GetFunction", e))?;
        Ok(FunctionDescription {
            configuration: out
                .configuration
                .map(from_function_configuration)
                .unwrap_or_default(),
            image_uri: out.code.and_then(|c| c.image_uri),
            tags: out
                .tags
                .map(|t| t.into_iter().collect())
                .unwrap_or_default(),
            reserved_concurrency: out
                .concurrency
                .and_then(|c| c.reserved_concurrent_executions),
        })
    }

    async fn get_function_configuration(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionConfiguration, AwsError> {
        let out = self
            .client
            .get_function_configuration()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_err("GetFunctionConfiguration", e))?;
        Ok(FunctionConfiguration {
            function_name: out.function_name.opt().unwrap_or_default(),
            function_arn: out.function_arn.opt().unwrap_or_default(),
            runtime: out.runtime.opt(),
            role: out.role.opt(),
            handler: out.handler.opt(),
            description: out.description.opt(),
            timeout: out.timeout.num(),
            memory_size: out.memory_size.num(),
            code_sha256: out.code_sha256.opt(),
            version: out.version.opt(),
            revision_id: out.revision_id.opt(),
            state: out.state.opt(),
            state_reason: out.state_reason.opt(),
            last_update_status: out.last_update_status.opt(),
            last_modified: out.last_modified.opt(),
            package_type: out.package_type.opt(),
            ..Default::default()
        })
    }

    async fn update_function_configuration(
        &self,
        input: UpdateFunctionConfigurationInput,
    ) -> Result<FunctionConfiguration, AwsError> {
        let mut req = self
            .client
            .update_function_configuration()
            .function_name(input.function_name)
            .set_revision_id(input.revision_id)
            .set_role(input.role)
            .set_runtime(input.runtime.map(|r| t::Runtime::from(r.as_str())))
            .set_handler(input.handler)
            .set_description(input.description)
            .set_timeout(input.timeout)
            .set_memory_size(input.memory_size)
            .set_environment(input.environment.map(to_environment))
            .set_layers(input.layers)
            .set_kms_key_arn(input.kms_key_arn)
            .set_vpc_config(input.vpc_config.map(to_vpc))
            .set_image_config(input.image_config.map(to_image_config));
        if let Some(arn) = input.dead_letter_target_arn {
            req = req.dead_letter_config(t::DeadLetterConfig::builder().target_arn(arn).build());
        }
        if let Some(apply_on) = input.snap_start_apply_on {
            req = req.snap_start(
                t::SnapStart::builder()
                    .apply_on(t::SnapStartApplyOn::from(apply_on.as_str()))
                    .build(),
            );
        }
        if let Some(size) = input.ephemeral_storage_size {
            req = req.ephemeral_storage(to_ephemeral(size)?);
        }
        if let Some(mode) = input.tracing_mode {
            req = req.tracing_config(
                t::TracingConfig::builder()
                    .mode(t::TracingMode::from(mode.as_str()))
                    .build(),
            );
        }
        let out = req
            .send()
            .await
            .map_err(|e| sdk_err("UpdateFunctionConfiguration", e))?;
        Ok(FunctionConfiguration {
            function_name: out.function_name.opt().unwrap_or_default(),
            function_arn: out.function_arn.opt().unwrap_or_default(),
            revision_id: out.revision_id.opt(),
            last_update_status: out.last_update_status.opt(),
            ..Default::default()
        })
    }

    async fn update_function_code(
        &self,
        input: UpdateFunctionCodeInput,
    ) -> Result<FunctionConfiguration, AwsError> {
        let out = self
            .client
            .update_function_code()
            .function_name(input.function_name)
            .set_revision_id(input.revision_id)
            .set_s3_bucket(input.s3_bucket)
            .set_s3_key(input.s3_key)
            .set_s3_object_version(input.s3_object_version)
            .set_image_uri(input.image_uri)
            .set_architectures(input.architectures.map(|a| {
                a.iter().map(|s| t::Architecture::from(s.as_str())).collect()
            }))
            .send()
            .await
            .map_err(|e| sdk_err("UpdateFunctionCode", e))?;
        Ok(FunctionConfiguration {
            function_name: out.function_name.opt().unwrap_or_default(),
            function_arn: out.function_arn.opt().unwrap_or_default(),
            code_sha256: out.code_sha256.opt(),
            revision_id: out.revision_id.opt(),
            ..Default::default()
        })
    }

    async fn delete_function(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError> {
        self.client
            .delete_function()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_err("DeleteFunction", e))?;
        Ok(())
    }

    async fn publish_version(
        &self,
        input: PublishVersionInput,
    ) -> Result<FunctionConfiguration, AwsError> {
        let out = self
            .client
            .publish_version()
            .function_name(input.function_name)
            .set_description(input.description)
            .set_code_sha256(input.code_sha256)
            .set_revision_id(input.revision_id)
            .send()
            .await
            .map_err(|e| sdk_err("PublishVersion", e))?;
        Ok(FunctionConfiguration {
            function_name: out.function_name.opt().unwrap_or_default(),
            function_arn: out.function_arn.opt().unwrap_or_default(),
            code_sha256: out.code_sha256.opt(),
            version: out.version.opt(),
            description: out.description.opt(),
            state: out.state.opt(),
            last_modified: out.last_modified.opt(),
            revision_id: out.revision_id.opt(),
            ..Default::default()
        })
    }

    async fn get_function_concurrency(
        &self,
        function_name: &str,
    ) -> Result<Option<i32>, AwsError> {
        let out = self
            .client
            .get_function_concurrency()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| sdk_err("GetFunctionConcurrency", e))?;
        Ok(out.reserved_concurrent_executions)
    }

    async fn put_function_concurrency(
        &self,
        function_name: &str,
        reserved: i32,
    ) -> Result<(), AwsError> {
        self.client
            .put_function_concurrency()
            .function_name(function_name)
            .reserved_concurrent_executions(reserved)
            .send()
            .await
            .map_err(|e| sdk_err("PutFunctionConcurrency", e))?;
        Ok(())
    }

    async fn delete_function_concurrency(
        &self,
        function_name: &str,
    ) -> Result<(), AwsError> {
        self.client
            .delete_function_concurrency()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| sdk_err("DeleteFunctionConcurrency", e))?;
        Ok(())
    }

    async fn get_function_code_signing_config(
        &self,
        function_name: &str,
    ) -> Result<Option<String>, AwsError> {
        let out = self
            .client
            .get_function_code_signing_config()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| sdk_err("GetFunctionCodeSigningConfig", e))?;
        Ok(out.code_signing_config_arn.opt())
    }

    async fn put_function_code_signing_config(
        &self,
        function_name: &str,
        code_signing_config_arn: &str,
    ) -> Result<(), AwsError> {
        self.client
            .put_function_code_signing_config()
            .function_name(function_name)
            .code_signing_config_arn(code_signing_config_arn)
            .send()
            .await
            .map_err(|e| sdk_err("PutFunctionCodeSigningConfig", e))?;
        Ok(())
    }

    async fn delete_function_code_signing_config(
        &self,
        function_name: &str,
    ) -> Result<(), AwsError> {
        self.client
            .delete_function_code_signing_config()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| sdk_err("DeleteFunctionCodeSigningConfig", e))?;
        Ok(())
    }

    async fn tag_resource(
        &self,
        resource_arn: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<(), AwsError> {
        self.client
            .tag_resource()
            .resource(resource_arn)
            .set_tags(Some(tags.into_iter().collect()))
            .send()
            .await
            .map_err(|e| sdk_err("TagResource", e))?;
        Ok(())
    }

    async fn untag_resource(
        &self,
        resource_arn: &str,
        keys: Vec<String>,
    ) -> Result<(), AwsError> {
        self.client
            .untag_resource()
            .resource(resource_arn)
            .set_tag_keys(Some(keys))
            .send()
            .await
            .map_err(|e| sdk_err("UntagResource", e))?;
        Ok(())
    }

    async fn get_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<EventInvokeConfig, AwsError> {
        let out = self
            .client
            .get_function_event_invoke_config()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_err("GetFunctionEventInvokeConfig", e))?;
        let dest = out.destination_config;
        Ok(EventInvokeConfig {
            maximum_retry_attempts: out.maximum_retry_attempts,
            maximum_event_age_in_seconds: out.maximum_event_age_in_seconds,
            on_success: dest
                .as_ref()
                .and_then(|d| d.on_success.as_ref())
                .and_then(|o| o.destination.clone()),
            on_failure: dest
                .as_ref()
                .and_then(|d| d.on_failure.as_ref())
                .and_then(|o| o.destination.clone()),
        })
    }

    async fn put_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        config: EventInvokeConfig,
    ) -> Result<(), AwsError> {
        self.client
            .put_function_event_invoke_config()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .set_maximum_retry_attempts(config.maximum_retry_attempts)
            .set_maximum_event_age_in_seconds(config.maximum_event_age_in_seconds)
            .destination_config(to_destination(config.on_success, config.on_failure))
            .send()
            .await
            .map_err(|e| sdk_err("PutFunctionEventInvokeConfig", e))?;
        Ok(())
    }

    async fn delete_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError> {
        self.client
            .delete_function_event_invoke_config()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_err("DeleteFunctionEventInvokeConfig", e))?;
        Ok(())
    }

    async fn create_alias(
        &self,
        input: AliasInput,
    ) -> Result<AliasConfiguration, AwsError> {
        let out = self
            .client
            .create_alias()
            .function_name(input.function_name)
            .name(input.name)
            .function_version(input.function_version)
            .set_description(input.description)
            .set_routing_config(input.routing_weights.map(|w| {
                t::AliasRoutingConfiguration::builder()
                    .set_additional_version_weights(Some(w.into_iter().collect()))
                    .build()
            }))
            .send()
            .await
            .map_err(|e| sdk_err("CreateAlias", e))?;
        Ok(AliasConfiguration {
            alias_arn: out.alias_arn.opt().unwrap_or_default(),
            name: out.name.opt().unwrap_or_default(),
            function_version: out.function_version.opt().unwrap_or_default(),
            description: out.description.opt(),
            routing_weights: out
                .routing_config
                .and_then(|r| r.additional_version_weights)
                .map(|w| w.into_iter().collect())
                .unwrap_or_default(),
            revision_id: out.revision_id.opt(),
        })
    }

    async fn get_alias(
        &self,
        function_name: &str,
        name: &str,
    ) -> Result<AliasConfiguration, AwsError> {
        let out = self
            .client
            .get_alias()
            .function_name(function_name)
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_err("GetAlias", e))?;
        Ok(from_alias(
            t::AliasConfiguration::builder()
                .set_alias_arn(out.alias_arn)
                .set_name(out.name)
                .set_function_version(out.function_version)
                .set_description(out.description)
                .set_routing_config(out.routing_config)
                .set_revision_id(out.revision_id)
                .build(),
        ))
    }

    async fn update_alias(
        &self,
        input: AliasInput,
    ) -> Result<AliasConfiguration, AwsError> {
        let out = self
            .client
            .update_alias()
            .function_name(input.function_name)
            .name(input.name)
            .function_version(input.function_version)
            .set_description(input.description)
            .set_revision_id(input.revision_id)
            .set_routing_config(input.routing_weights.map(|w| {
                t::AliasRoutingConfiguration::builder()
                    .set_additional_version_weights(Some(w.into_iter().collect()))
                    .build()
            }))
            .send()
            .await
            .map_err(|e| sdk_err("UpdateAlias", e))?;
        Ok(from_alias(
            t::AliasConfiguration::builder()
                .set_alias_arn(out.alias_arn)
                .set_name(out.name)
                .set_function_version(out.function_version)
                .set_description(out.description)
                .set_routing_config(out.routing_config)
                .set_revision_id(out.revision_id)
                .build(),
        ))
    }

    async fn delete_alias(
        &self,
        function_name: &str,
        name: &str,
    ) -> Result<(), AwsError> {
        self.client
            .delete_alias()
            .function_name(function_name)
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_err("DeleteAlias", e))?;
        Ok(())
    }

    async fn get_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
    ) -> Result<ProvisionedConcurrency, AwsError> {
        let out = self
            .client
            .get_provisioned_concurrency_config()
            .function_name(function_name)
            .qualifier(qualifier)
            .send()
            .await
            .map_err(|e| sdk_err("GetProvisionedConcurrencyConfig", e))?;
        Ok(ProvisionedConcurrency {
            requested: out
                .requested_provisioned_concurrent_executions
                .unwrap_or_default(),
            allocated: out.allocated_provisioned_concurrent_executions,
            status: out.status.opt(),
        })
    }

    async fn put_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
        requested: i32,
    ) -> Result<ProvisionedConcurrency, AwsError> {
        let out = self
            .client
            .put_provisioned_concurrency_config()
            .function_name(function_name)
            .qualifier(qualifier)
            .provisioned_concurrent_executions(requested)
            .send()
            .await
            .map_err(|e| sdk_err("PutProvisionedConcurrencyConfig", e))?;
        Ok(ProvisionedConcurrency {
            requested: out
                .requested_provisioned_concurrent_executions
                .unwrap_or(requested),
            allocated: out.allocated_provisioned_concurrent_executions,
            status: out.status.opt(),
        })
    }

    async fn delete_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
    ) -> Result<(), AwsError> {
        self.client
            .delete_provisioned_concurrency_config()
            .function_name(function_name)
            .qualifier(qualifier)
            .send()
            .await
            .map_err(|e| sdk_err("DeleteProvisionedConcurrencyConfig", e))?;
        Ok(())
    }

    async fn get_policy(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<String, AwsError> {
        let out = self
            .client
            .get_policy()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_err("GetPolicy", e))?;
        let doc = out.policy.unwrap_or_default();
        // An empty statement list is reported the same way as a missing policy.
        match parse_policy(&doc) {
            Ok(perms) if perms.is_empty() => {
                Err(AwsError::not_found("policy has no statements"))
            }
            _ => Ok(doc),
        }
    }

    async fn add_permission(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        permission: Permission,
    ) -> Result<(), AwsError> {
        self.client
            .add_permission()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .statement_id(permission.statement_id)
            .action(permission.action)
            .principal(permission.principal)
            .set_source_arn(permission.source_arn)
            .set_source_account(permission.source_account)
            .set_event_source_token(permission.event_source_token)
            .set_principal_org_id(permission.principal_org_id)
            .set_function_url_auth_type(
                permission
                    .function_url_auth_type
                    .map(|a| t::FunctionUrlAuthType::from(a.as_str())),
            )
            .send()
            .await
            .map_err(|e| sdk_err("AddPermission", e))?;
        Ok(())
    }

    async fn remove_permission(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        statement_id: &str,
    ) -> Result<(), AwsError> {
        self.client
            .remove_permission()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .statement_id(statement_id)
            .send()
            .await
            .map_err(|e| sdk_err("RemovePermission", e))?;
        Ok(())
    }

    async fn create_event_source_mapping(
        &self,
        input: EventSourceMappingInput,
    ) -> Result<EventSourceMappingConfiguration, AwsError> {
        let out = self
            .client
            .create_event_source_mapping()
            .set_function_name(input.function_name)
            .set_event_source_arn(input.event_source_arn)
            .set_enabled(input.enabled)
            .set_batch_size(input.batch_size)
            .set_maximum_batching_window_in_seconds(
                input.maximum_batching_window_in_seconds,
            )
            .set_starting_position(
                input
                    .starting_position
                    .map(|p| t::EventSourcePosition::from(p.as_str())),
            )
            .set_maximum_retry_attempts(input.maximum_retry_attempts)
            .set_maximum_record_age_in_seconds(input.maximum_record_age_in_seconds)
            .set_bisect_batch_on_function_error(input.bisect_batch_on_function_error)
            .set_parallelization_factor(input.parallelization_factor)
            .set_filter_criteria(
                input
                    .filter_patterns
                    .filter(|f| !f.is_empty())
                    .map(to_filter_criteria),
            )
            .set_destination_config(
                input
                    .destination_config
                    .filter(|d| !d.is_empty())
                    .map(|d| to_destination(d.on_success, d.on_failure)),
            )
            .set_scaling_config(
                input.scaling_maximum_concurrency.flatten().map(|n| {
                    t::ScalingConfig::builder().maximum_concurrency(n).build()
                }),
            )
            .set_function_response_types(input.function_response_types.map(|v| {
                v.iter()
                    .map(|s| t::FunctionResponseType::from(s.as_str()))
                    .collect()
            }))
            .set_tumbling_window_in_seconds(input.tumbling_window_in_seconds)
            .set_queues(input.queues)
            .set_source_access_configurations(
                input.source_access_configurations.map(to_source_access),
            )
            .send()
            .await
            .map_err(|e| sdk_err("CreateEventSourceMapping", e))?;
        Ok(from_mapping!(out))
    }

    async fn get_event_source_mapping(
        &self,
        uuid: &str,
    ) -> Result<EventSourceMappingConfiguration, AwsError> {
        let out = self
            .client
            .get_event_source_mapping()
            .uuid(uuid)
            .send()
            .await
            .map_err(|e| sdk_err("GetEventSourceMapping", e))?;
        Ok(from_mapping!(out))
    }

    async fn update_event_source_mapping(
        &self,
        input: EventSourceMappingInput,
    ) -> Result<EventSourceMappingConfiguration, AwsError> {
        let out = self
            .client
            .update_event_source_mapping()
            .set_uuid(input.uuid)
            .set_function_name(input.function_name)
            .set_enabled(input.enabled)
            .set_batch_size(input.batch_size)
            .set_maximum_batching_window_in_seconds(
                input.maximum_batching_window_in_seconds,
            )
            .set_maximum_retry_attempts(input.maximum_retry_attempts)
            .set_maximum_record_age_in_seconds(input.maximum_record_age_in_seconds)
            .set_bisect_batch_on_function_error(input.bisect_batch_on_function_error)
            .set_parallelization_factor(input.parallelization_factor)
            .set_filter_criteria(input.filter_patterns.map(to_filter_criteria))
            .set_destination_config(
                input
                    .destination_config
                    .map(|d| to_destination(d.on_success, d.on_failure)),
            )
            .set_scaling_config(input.scaling_maximum_concurrency.map(|n| {
                t::ScalingConfig::builder().set_maximum_concurrency(n).build()
            }))
            .set_function_response_types(input.function_response_types.map(|v| {
                v.iter()
                    .map(|s| t::FunctionResponseType::from(s.as_str()))
                    .collect()
            }))
            .set_tumbling_window_in_seconds(input.tumbling_window_in_seconds)
            .set_source_access_configurations(
                input.source_access_configurations.map(to_source_access),
            )
            .send()
            .await
            .map_err(|e| sdk_err("UpdateEventSourceMapping", e))?;
        Ok(from_mapping!(out))
    }

    async fn delete_event_source_mapping(
        &self,
        uuid: &str,
    ) -> Result<EventSourceMappingConfiguration, AwsError> {
        let out = self
            .client
            .delete_event_source_mapping()
            .uuid(uuid)
            .send()
            .await
            .map_err(|e| sdk_err("DeleteEventSourceMapping", e))?;
        Ok(from_mapping!(out))
    }

    async fn create_code_signing_config(
        &self,
        input: CodeSigningConfigInput,
    ) -> Result<CodeSigningConfigDescription, AwsError> {
        let out = self
            .client
            .create_code_signing_config()
            .set_description(input.description)
            .allowed_publishers(
                t::AllowedPublishers::builder()
                    .set_signing_profile_version_arns(Some(
                        input.signing_profile_version_arns,
                    ))
                    .build()
                    .map_err(build_err)?,
            )
            .set_code_signing_policies(input.untrusted_artifact_on_deployment.map(
                |p| {
                    t::CodeSigningPolicies::builder()
                        .untrusted_artifact_on_deployment(
                            t::CodeSigningPolicy::from(p.as_str()),
                        )
                        .build()
                },
            ))
            .send()
            .await
            .map_err(|e| sdk_err("CreateCodeSigningConfig", e))?;
        let csc = out
            .code_signing_config
            .ok_or_else(|| AwsError::service("empty CreateCodeSigningConfig response"))?;
        Ok(from_csc!(csc))
    }

    async fn get_code_signing_config(
        &self,
        arn: &str,
    ) -> Result<CodeSigningConfigDescription, AwsError> {
        let out = self
            .client
            .get_code_signing_config()
            .code_signing_config_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_err("GetCodeSigningConfig", e))?;
        let csc = out
            .code_signing_config
            .ok_or_else(|| AwsError::not_found(format!("code signing config {arn}")))?;
        Ok(from_csc!(csc))
    }

    async fn update_code_signing_config(
        &self,
        arn: &str,
        input: CodeSigningConfigInput,
    ) -> Result<CodeSigningConfigDescription, AwsError> {
        let mut req = self
            .client
            .update_code_signing_config()
            .code_signing_config_arn(arn)
            .set_description(input.description);
        if !input.signing_profile_version_arns.is_empty() {
            req = req.allowed_publishers(
                t::AllowedPublishers::builder()
                    .set_signing_profile_version_arns(Some(
                        input.signing_profile_version_arns,
                    ))
                    .build()
                    .map_err(build_err)?,
            );
        }
        if let Some(p) = input.untrusted_artifact_on_deployment {
            req = req.code_signing_policies(
                t::CodeSigningPolicies::builder()
                    .untrusted_artifact_on_deployment(t::CodeSigningPolicy::from(
                        p.as_str(),
                    ))
                    .build(),
            );
        }
        let out = req
            .send()
            .await
            .map_err(|e| sdk_err("UpdateCodeSigningConfig", e))?;
        let csc = out
            .code_signing_config
            .ok_or_else(|| AwsError::service("empty UpdateCodeSigningConfig response"))?;
        Ok(from_csc!(csc))
    }

    async fn delete_code_signing_config(&self, arn: &str) -> Result<(), AwsError> {
        self.client
            .delete_code_signing_config()
            .code_signing_config_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_err("DeleteCodeSigningConfig", e))?;
        Ok(())
    }

    async fn create_function_url_config(
        &self,
        input: FunctionUrlConfigInput,
    ) -> Result<FunctionUrlConfig, AwsError> {
        let out = self
            .client
            .create_function_url_config()
            .function_name(input.function_name)
            .set_qualifier(input.qualifier)
            .set_auth_type(
                input
                    .auth_type
                    .map(|a| t::FunctionUrlAuthType::from(a.as_str())),
            )
            .set_cors(input.cors.map(to_cors))
            .send()
            .await
            .map_err(|e| sdk_err("CreateFunctionUrlConfig", e))?;
        Ok(FunctionUrlConfig {
            function_url: out.function_url.opt().unwrap_or_default(),
            function_arn: out.function_arn.opt().unwrap_or_default(),
            auth_type: out.auth_type.opt().unwrap_or_default(),
            cors: from_cors!(out.cors),
            creation_time: out.creation_time.opt(),
            last_modified: None,
        })
    }

    async fn get_function_url_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionUrlConfig, AwsError> {
        let out = self
            .client
            .get_function_url_config()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_err("GetFunctionUrlConfig", e))?;
        Ok(from_url!(out))
    }

    async fn update_function_url_config(
        &self,
        input: FunctionUrlConfigInput,
    ) -> Result<FunctionUrlConfig, AwsError> {
        let out = self
            .client
            .update_function_url_config()
            .function_name(input.function_name)
            .set_qualifier(input.qualifier)
            .set_auth_type(
                input
                    .auth_type
                    .map(|a| t::FunctionUrlAuthType::from(a.as_str())),
            )
            .set_cors(input.cors.map(to_cors))
            .send()
            .await
            .map_err(|e| sdk_err("UpdateFunctionUrlConfig", e))?;
        Ok(from_url!(out))
    }

    async fn delete_function_url_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError> {
        self.client
            .delete_function_url_config()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_err("DeleteFunctionUrlConfig", e))?;
        Ok(())
    }

    async fn publish_layer_version(
        &self,
        input: PublishLayerVersionInput,
    ) -> Result<LayerVersionDescription, AwsError> {
        let content = t::LayerVersionContentInput::builder()
            .set_s3_bucket(input.content.s3_bucket)
            .set_s3_key(input.content.s3_key)
            .set_s3_object_version(input.content.s3_object_version)
            .build();
        let mut req = self
            .client
            .publish_layer_version()
            .layer_name(input.layer_name)
            .content(content)
            .set_description(input.description)
            .set_license_info(input.license_info);
        if !input.compatible_runtimes.is_empty() {
            req = req.set_compatible_runtimes(Some(
                input
                    .compatible_runtimes
                    .iter()
                    .map(|r| t::Runtime::from(r.as_str()))
                    .collect(),
            ));
        }
        if !input.compatible_architectures.is_empty() {
            req = req.set_compatible_architectures(Some(
                input
                    .compatible_architectures
                    .iter()
                    .map(|a| t::Architecture::from(a.as_str()))
                    .collect(),
            ));
        }
        let out = req
            .send()
            .await
            .map_err(|e| sdk_err("PublishLayerVersion", e))?;
        let layer_arn = out.layer_arn.clone();
        let code_sha256 = out.content.as_ref().and_then(|c| c.code_sha256.clone());
        let mut desc = from_layer_version!(out, layer_arn);
        desc.code_sha256 = code_sha256;
        Ok(desc)
    }

    async fn get_layer_version(
        &self,
        layer_name: &str,
        version: i64,
    ) -> Result<LayerVersionDescription, AwsError> {
        let out = self
            .client
            .get_layer_version()
            .layer_name(layer_name)
            .version_number(version)
            .send()
            .await
            .map_err(|e| sdk_err("GetLayerVersion", e))?;
        let layer_arn = out.layer_arn.clone();
        let code_sha256 = out.content.as_ref().and_then(|c| c.code_sha256.clone());
        let mut desc = from_layer_version!(out, layer_arn);
        desc.code_sha256 = code_sha256;
        Ok(desc)
    }

    async fn list_layer_versions(
        &self,
        layer_name: &str,
    ) -> Result<Vec<LayerVersionDescription>, AwsError> {
        let mut pages = self
            .client
            .list_layer_versions()
            .layer_name(layer_name)
            .into_paginator()
            .send();
        let mut out = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_err("ListLayerVersions", e))?;
            for item in page.layer_versions.vec() {
                out.push(from_layer_version!(item, None::<String>));
            }
        }
        out.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(out)
    }

    async fn delete_layer_version(
        &self,
        layer_name: &str,
        version: i64,
    ) -> Result<(), AwsError> {
        self.client
            .delete_layer_version()
            .layer_name(layer_name)
            .version_number(version)
            .send()
            .await
            .map_err(|e| sdk_err("DeleteLayerVersion", e))?;
        Ok(())
    }
}

fn to_filter_criteria(patterns: Vec<String>) -> t::FilterCriteria {
    t::FilterCriteria::builder()
        .set_filters(Some(
            patterns
                .into_iter()
                .map(|p| t::Filter::builder().pattern(p).build())
                .collect(),
        ))
        .build()
}

fn to_source_access(
    configs: Vec<SourceAccessConfiguration>,
) -> Vec<t::SourceAccessConfiguration> {
    configs
        .into_iter()
        .map(|c| {
            t::SourceAccessConfiguration::builder()
                .set_type(
                    c.type_
                        .map(|ty| t::SourceAccessType::from(ty.as_str())),
                )
                .set_uri(c.uri)
                .build()
        })
        .collect()
}
