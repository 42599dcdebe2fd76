//! An in-process emulation of the Lambda control plane.
//!
//! It keeps AWS's observable semantics where the reconciler depends on
//! them: version numbers only grow, `PublishVersion` is a no-op when nothing
//! changed, event source mappings delete asynchronously, functions can sit
//! in `Pending`, and every mutating call is counted so idempotence can be
//! asserted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

use super::arn::{function_arn, function_name};
use super::error::AwsError;
use super::model::*;
use super::policy::render_policy;
use super::{LATEST, LambdaApi};

struct FunctionRecord {
    config: FunctionConfiguration,
    image_uri: Option<String>,
    tags: BTreeMap<String, String>,
    reserved_concurrency: Option<i32>,
    code_signing_config_arn: Option<String>,
    event_invoke: BTreeMap<String, EventInvokeConfig>,
    aliases: BTreeMap<String, AliasConfiguration>,
    provisioned: BTreeMap<String, ProvisionedConcurrency>,
    policies: BTreeMap<String, Vec<Permission>>,
    versions: BTreeMap<u64, FunctionConfiguration>,
    last_version: u64,
    /// `$LATEST` as it was when `last_version` was published.
    published_fingerprint: Option<FunctionConfiguration>,
    pending_reads_left: u32,
}

struct MappingRecord {
    config: EventSourceMappingConfiguration,
    /// Reads left before a deleting mapping disappears.
    deleting_reads_left: Option<u32>,
}

#[derive(Default)]
struct LayerRecord {
    last_version: i64,
    versions: BTreeMap<i64, LayerVersionDescription>,
}

struct InMemoryLambdaInner {
    account_id: String,
    region: String,
    functions: BTreeMap<String, FunctionRecord>,
    mappings: BTreeMap<String, MappingRecord>,
    code_signing_configs: BTreeMap<String, CodeSigningConfigDescription>,
    url_configs: BTreeMap<(String, String), FunctionUrlConfig>,
    layers: BTreeMap<String, LayerRecord>,
    objects: BTreeMap<String, String>,
    missing_images: BTreeSet<String>,
    calls: Vec<String>,
    faults: Vec<(String, AwsError)>,
    pending_reads: u32,
    mapping_delete_reads: u32,
}

#[derive(Clone)]
pub struct InMemoryLambda {
    inner: Arc<Mutex<InMemoryLambdaInner>>,
}

fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

fn now_iso() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3f+0000")
        .to_string()
}

fn new_revision() -> String {
    Uuid::new_v4().to_string()
}

fn qualifier_key(qualifier: Option<&str>) -> String {
    qualifier.unwrap_or(LATEST).to_string()
}

fn function_not_found(region: &str, account_id: &str, name: &str) -> AwsError {
    AwsError::not_found(format!(
        "Function not found: {}",
        function_arn(region, account_id, name)
    ))
}

fn object_key(bucket: &str, key: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("s3://{bucket}/{key}?versionId={v}"),
        None => format!("s3://{bucket}/{key}"),
    }
}

/// Configuration fields that make two publications identical.
fn publish_fingerprint(c: &FunctionConfiguration) -> FunctionConfiguration {
    FunctionConfiguration {
        function_name: c.function_name.clone(),
        version: None,
        function_arn: String::new(),
        revision_id: None,
        last_modified: None,
        state: None,
        state_reason: None,
        last_update_status: None,
        description: c.description.clone(),
        ..c.clone()
    }
}

impl InMemoryLambdaInner {
    fn function(&self, name_or_arn: &str) -> Result<&FunctionRecord, AwsError> {
        let name = function_name(name_or_arn);
        self.functions
            .get(name)
            .ok_or_else(|| function_not_found(&self.region, &self.account_id, name))
    }

    fn function_mut(
        &mut self,
        name_or_arn: &str,
    ) -> Result<&mut FunctionRecord, AwsError> {
        let name = function_name(name_or_arn).to_string();
        let (region, account) = (self.region.clone(), self.account_id.clone());
        self.functions
            .get_mut(&name)
            .ok_or_else(|| function_not_found(&region, &account, &name))
    }

    /// Fail with an injected fault for `op`, or record the call.
    fn mutate(&mut self, op: &str) -> Result<(), AwsError> {
        self.read(op)?;
        self.calls.push(op.to_string());
        Ok(())
    }

    fn read(&mut self, op: &str) -> Result<(), AwsError> {
        if let Some(idx) = self.faults.iter().position(|(o, _)| o == op) {
            let (_, err) = self.faults.remove(idx);
            trace!(op, %err, "injected fault");
            return Err(err);
        }
        Ok(())
    }

    fn code_sha(&self, code: &FunctionCode) -> String {
        if let Some(uri) = &code.image_uri {
            return compute_sha256(uri.as_bytes());
        }
        let key = object_key(
            code.s3_bucket.as_deref().unwrap_or_default(),
            code.s3_key.as_deref().unwrap_or_default(),
            code.s3_object_version.as_deref(),
        );
        self.objects
            .get(&key)
            .cloned()
            .unwrap_or_else(|| compute_sha256(key.as_bytes()))
    }

    fn check_image(&self, code: &FunctionCode) -> Result<(), AwsError> {
        match &code.image_uri {
            Some(uri) if self.missing_images.contains(uri) => {
                Err(AwsError::invalid_parameter(format!(
                    "Source image {uri} does not exist. Provide a valid source image."
                )))
            }
            _ => Ok(()),
        }
    }

    fn qualifier_exists(rec: &FunctionRecord, qualifier: &str) -> bool {
        qualifier == LATEST
            || rec.aliases.contains_key(qualifier)
            || qualifier
                .parse::<u64>()
                .map(|v| rec.versions.contains_key(&v))
                .unwrap_or(false)
    }

    fn resource_arn(rec: &FunctionRecord, qualifier: &str) -> String {
        if qualifier == LATEST {
            rec.config.function_arn.clone()
        } else {
            format!("{}:{}", rec.config.function_arn, qualifier)
        }
    }

    /// Count one read against a pending change; activate once none are left.
    fn settle(rec: &mut FunctionRecord) {
        if rec.pending_reads_left > 0 {
            rec.pending_reads_left -= 1;
            return;
        }
        rec.config.state = Some("Active".into());
        rec.config.state_reason = None;
        rec.config.last_update_status = Some("Successful".into());
    }

    fn touch(rec: &mut FunctionRecord, pending_reads: u32) {
        rec.config.revision_id = Some(new_revision());
        rec.config.last_modified = Some(now_iso());
        rec.pending_reads_left = pending_reads;
        if pending_reads > 0 {
            rec.config.last_update_status = Some("InProgress".into());
        }
    }

    fn ensure_not_updating(
        rec: &FunctionRecord,
        name: &str,
    ) -> Result<(), AwsError> {
        if rec.config.last_update_status.as_deref() == Some("InProgress")
            || rec.config.state.as_deref() == Some("Pending")
        {
            return Err(AwsError::conflict(format!(
                "The operation cannot be performed at this time. An update is in progress for resource: {name}"
            )));
        }
        Ok(())
    }

    fn check_revision(
        rec: &FunctionRecord,
        revision: Option<&str>,
    ) -> Result<(), AwsError> {
        match revision {
            Some(r) if rec.config.revision_id.as_deref() != Some(r) => {
                Err(AwsError::precondition_failed(
                    "The Revision Id provided does not match the latest Revision Id.",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl InMemoryLambda {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        InMemoryLambda {
            inner: Arc::new(Mutex::new(InMemoryLambdaInner {
                account_id: account_id.into(),
                region: region.into(),
                functions: BTreeMap::new(),
                mappings: BTreeMap::new(),
                code_signing_configs: BTreeMap::new(),
                url_configs: BTreeMap::new(),
                layers: BTreeMap::new(),
                objects: BTreeMap::new(),
                missing_images: BTreeSet::new(),
                calls: Vec::new(),
                faults: Vec::new(),
                pending_reads: 0,
                mapping_delete_reads: 0,
            })),
        }
    }

    /// Functions report `Pending` for this many reads after each change.
    pub async fn set_pending_reads(&self, reads: u32) {
        self.inner.lock().await.pending_reads = reads;
    }

    /// Deleted mappings stay visible (state `Deleting`) for this many reads.
    pub async fn set_mapping_delete_reads(&self, reads: u32) {
        self.inner.lock().await.mapping_delete_reads = reads;
    }

    /// Make the next call to `op` fail with `err`.
    pub async fn inject_fault(&self, op: &str, err: AwsError) {
        self.inner.lock().await.faults.push((op.to_string(), err));
    }

    /// Names of every mutating call made so far, in order.
    pub async fn mutation_calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.inner.lock().await.calls.clear();
    }

    /// Register a deployment package; returns its base64 SHA-256 the way
    /// `CodeSha256` reports it.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        version: Option<&str>,
        bytes: &[u8],
    ) -> String {
        let sha = compute_sha256(bytes);
        self.inner
            .lock()
            .await
            .objects
            .insert(object_key(bucket, key, version), sha.clone());
        sha
    }

    pub async fn set_image_missing(&self, image_uri: &str, missing: bool) {
        let mut inner = self.inner.lock().await;
        if missing {
            inner.missing_images.insert(image_uri.to_string());
        } else {
            inner.missing_images.remove(image_uri);
        }
    }

    pub async fn account_id(&self) -> String {
        self.inner.lock().await.account_id.clone()
    }
}

#[async_trait]
impl LambdaApi for InMemoryLambda {
    async fn create_function(
        &self,
        input: CreateFunctionInput,
    ) -> Result<FunctionConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("CreateFunction")?;

        if inner.functions.contains_key(&input.function_name) {
            return Err(AwsError::conflict(format!(
                "Function already exist: {}",
                input.function_name
            )));
        }
        let package_type =
            input.package_type.clone().unwrap_or_else(|| "Zip".into());
        if input.role.as_deref().unwrap_or_default().is_empty() {
            return Err(AwsError::invalid_parameter("Role is required"));
        }
        if package_type == "Zip"
            && (input.runtime.is_none() || input.handler.is_none())
        {
            return Err(AwsError::invalid_parameter(
                "Runtime and Handler are mandatory parameters for functions created with deployment packages.",
            ));
        }
        if package_type == "Image" && input.code.image_uri.is_none() {
            return Err(AwsError::invalid_parameter(
                "Please provide a valid source image.",
            ));
        }
        inner.check_image(&input.code)?;
        if let Some(csc) = input.code_signing_config_arn.as_deref() {
            if !inner.code_signing_configs.contains_key(csc) {
                return Err(AwsError::new(
                    "CodeSigningConfigNotFoundException",
                    format!("Code signing config {csc} not found"),
                ));
            }
        }

        let arn = function_arn(&inner.region, &inner.account_id, &input.function_name);
        let pending = inner.pending_reads;
        let config = FunctionConfiguration {
            function_name: input.function_name.clone(),
            function_arn: arn,
            runtime: input.runtime,
            role: input.role,
            handler: input.handler,
            description: Some(input.description.unwrap_or_default()),
            timeout: Some(input.timeout.unwrap_or(3)),
            memory_size: Some(input.memory_size.unwrap_or(128)),
            code_sha256: Some(inner.code_sha(&input.code)),
            version: Some(LATEST.into()),
            revision_id: Some(new_revision()),
            state: Some(if pending > 0 { "Pending" } else { "Active" }.into()),
            state_reason: (pending > 0)
                .then(|| "The function is being created.".to_string()),
            last_update_status: Some(
                if pending > 0 { "InProgress" } else { "Successful" }.into(),
            ),
            last_modified: Some(now_iso()),
            package_type: Some(package_type),
            architectures: if input.architectures.is_empty() {
                vec!["x86_64".into()]
            } else {
                input.architectures
            },
            environment: input.environment.unwrap_or_default(),
            layers: input.layers,
            dead_letter_target_arn: input
                .dead_letter_target_arn
                .filter(|s| !s.is_empty()),
            snap_start_apply_on: Some(
                input.snap_start_apply_on.unwrap_or_else(|| "None".into()),
            ),
            ephemeral_storage_size: Some(
                input.ephemeral_storage_size.unwrap_or(512),
            ),
            kms_key_arn: input.kms_key_arn.filter(|s| !s.is_empty()),
            tracing_mode: Some(
                input.tracing_mode.unwrap_or_else(|| "PassThrough".into()),
            ),
            vpc_config: input.vpc_config,
            image_config: input.image_config,
        };
        let rec = FunctionRecord {
            config: config.clone(),
            image_uri: input.code.image_uri,
            tags: input.tags,
            reserved_concurrency: None,
            code_signing_config_arn: input.code_signing_config_arn,
            event_invoke: BTreeMap::new(),
            aliases: BTreeMap::new(),
            provisioned: BTreeMap::new(),
            policies: BTreeMap::new(),
            versions: BTreeMap::new(),
            last_version: 0,
            published_fingerprint: None,
            pending_reads_left: pending,
        };
        inner.functions.insert(input.function_name, rec);
        Ok(config)
    }

    async fn get_function(
        &self,
        function_name: &str,
    ) -> Result<FunctionDescription, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetFunction")?;
        let rec = inner.function_mut(function_name)?;
        InMemoryLambdaInner::settle(rec);
        let out = FunctionDescription {
            configuration: rec.config.clone(),
            image_uri: rec.image_uri.clone(),
            tags: rec.tags.clone(),
            reserved_concurrency: rec.reserved_concurrency,
        };
        Ok(out)
    }

    async fn get_function_configuration(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetFunctionConfiguration")?;
        let (region, account) = (inner.region.clone(), inner.account_id.clone());
        let rec = inner.function_mut(function_name)?;
        let q = qualifier_key(qualifier);
        if q == LATEST {
            InMemoryLambdaInner::settle(rec);
            return Ok(rec.config.clone());
        }
        let version = match rec.aliases.get(&q) {
            Some(alias) => alias.function_version.clone(),
            None => q.clone(),
        };
        if version == LATEST {
            return Ok(rec.config.clone());
        }
        version
            .parse::<u64>()
            .ok()
            .and_then(|v| rec.versions.get(&v))
            .cloned()
            .ok_or_else(|| {
                function_not_found(
                    &region,
                    &account,
                    &format!("{}:{}", function_name, q),
                )
            })
    }

    async fn update_function_configuration(
        &self,
        input: UpdateFunctionConfigurationInput,
    ) -> Result<FunctionConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("UpdateFunctionConfiguration")?;
        let pending = inner.pending_reads;
        let rec = inner.function_mut(&input.function_name)?;
        InMemoryLambdaInner::ensure_not_updating(rec, &input.function_name)?;
        InMemoryLambdaInner::check_revision(rec, input.revision_id.as_deref())?;

        let c = &mut rec.config;
        if let Some(v) = input.role {
            c.role = Some(v);
        }
        if let Some(v) = input.runtime {
            c.runtime = Some(v);
        }
        if let Some(v) = input.handler {
            c.handler = Some(v);
        }
        if let Some(v) = input.description {
            c.description = Some(v);
        }
        if let Some(v) = input.timeout {
            c.timeout = Some(v);
        }
        if let Some(v) = input.memory_size {
            c.memory_size = Some(v);
        }
        if let Some(v) = input.environment {
            c.environment = v;
        }
        if let Some(v) = input.layers {
            c.layers = v;
        }
        if let Some(v) = input.dead_letter_target_arn {
            c.dead_letter_target_arn = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = input.snap_start_apply_on {
            c.snap_start_apply_on = Some(v);
        }
        if let Some(v) = input.ephemeral_storage_size {
            c.ephemeral_storage_size = Some(v);
        }
        if let Some(v) = input.kms_key_arn {
            c.kms_key_arn = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = input.tracing_mode {
            c.tracing_mode = Some(v);
        }
        if let Some(v) = input.vpc_config {
            c.vpc_config = Some(v).filter(|v| {
                !(v.subnet_ids.is_empty() && v.security_group_ids.is_empty())
            });
        }
        if let Some(v) = input.image_config {
            c.image_config = Some(v).filter(|v| *v != ImageConfig::default());
        }
        InMemoryLambdaInner::touch(rec, pending);
        Ok(rec.config.clone())
    }

    async fn update_function_code(
        &self,
        input: UpdateFunctionCodeInput,
    ) -> Result<FunctionConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("UpdateFunctionCode")?;
        let code = FunctionCode {
            s3_bucket: input.s3_bucket.clone(),
            s3_key: input.s3_key.clone(),
            s3_object_version: input.s3_object_version.clone(),
            image_uri: input.image_uri.clone(),
        };
        inner.check_image(&code)?;
        let sha = inner.code_sha(&code);
        let pending = inner.pending_reads;
        let rec = inner.function_mut(&input.function_name)?;
        InMemoryLambdaInner::ensure_not_updating(rec, &input.function_name)?;
        InMemoryLambdaInner::check_revision(rec, input.revision_id.as_deref())?;
        if code.image_uri.is_some() || code.s3_key.is_some() {
            rec.config.code_sha256 = Some(sha);
        }
        if input.image_uri.is_some() {
            rec.image_uri = input.image_uri;
        }
        if let Some(archs) = input.architectures {
            rec.config.architectures = archs;
        }
        InMemoryLambdaInner::touch(rec, pending);
        Ok(rec.config.clone())
    }

    async fn delete_function(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteFunction")?;
        let name = super::arn::function_name(function_name).to_string();
        match qualifier.filter(|q| *q != LATEST) {
            None => {
                inner.function(&name)?;
                inner.functions.remove(&name);
                inner.url_configs.retain(|(f, _), _| *f != name);
                Ok(())
            }
            Some(q) => {
                let rec = inner.function_mut(&name)?;
                let v = q.parse::<u64>().map_err(|_| {
                    AwsError::invalid_parameter(format!(
                        "Invalid version qualifier {q}"
                    ))
                })?;
                if rec.aliases.values().any(|a| a.function_version == q) {
                    return Err(AwsError::conflict(format!(
                        "Version {q} of function {name} is referenced by an alias"
                    )));
                }
                rec.versions.remove(&v).ok_or_else(|| {
                    AwsError::not_found(format!("Function not found: {name}:{q}"))
                })?;
                rec.event_invoke.remove(q);
                rec.provisioned.remove(q);
                rec.policies.remove(q);
                Ok(())
            }
        }
    }

    async fn publish_version(
        &self,
        input: PublishVersionInput,
    ) -> Result<FunctionConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("PublishVersion")?;
        let rec = inner.function_mut(&input.function_name)?;
        InMemoryLambdaInner::ensure_not_updating(rec, &input.function_name)?;
        InMemoryLambdaInner::check_revision(rec, input.revision_id.as_deref())?;
        if let Some(sha) = input.code_sha256.as_deref() {
            if rec.config.code_sha256.as_deref() != Some(sha) {
                return Err(AwsError::precondition_failed(
                    "CodeSHA256 does not match the function's current code.",
                ));
            }
        }
        let fingerprint = publish_fingerprint(&rec.config);
        if rec.published_fingerprint.as_ref() == Some(&fingerprint) {
            if let Some(last) = rec.versions.get(&rec.last_version) {
                return Ok(last.clone());
            }
        }
        rec.published_fingerprint = Some(fingerprint);
        rec.last_version += 1;
        let v = rec.last_version;
        let snapshot = FunctionConfiguration {
            version: Some(v.to_string()),
            function_arn: format!("{}:{}", rec.config.function_arn, v),
            description: Some(input.description.unwrap_or_default()),
            last_modified: Some(now_iso()),
            state: Some("Active".into()),
            ..rec.config.clone()
        };
        rec.versions.insert(v, snapshot.clone());
        Ok(snapshot)
    }

    async fn get_function_concurrency(
        &self,
        function_name: &str,
    ) -> Result<Option<i32>, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetFunctionConcurrency")?;
        Ok(inner.function(function_name)?.reserved_concurrency)
    }

    async fn put_function_concurrency(
        &self,
        function_name: &str,
        reserved: i32,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("PutFunctionConcurrency")?;
        if reserved < 0 {
            return Err(AwsError::invalid_parameter(
                "ReservedConcurrentExecutions must be >= 0",
            ));
        }
        inner.function_mut(function_name)?.reserved_concurrency = Some(reserved);
        Ok(())
    }

    async fn delete_function_concurrency(
        &self,
        function_name: &str,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteFunctionConcurrency")?;
        inner.function_mut(function_name)?.reserved_concurrency = None;
        Ok(())
    }

    async fn get_function_code_signing_config(
        &self,
        function_name: &str,
    ) -> Result<Option<String>, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetFunctionCodeSigningConfig")?;
        Ok(inner.function(function_name)?.code_signing_config_arn.clone())
    }

    async fn put_function_code_signing_config(
        &self,
        function_name: &str,
        code_signing_config_arn: &str,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("PutFunctionCodeSigningConfig")?;
        if !inner.code_signing_configs.contains_key(code_signing_config_arn) {
            return Err(AwsError::new(
                "CodeSigningConfigNotFoundException",
                format!("Code signing config {code_signing_config_arn} not found"),
            ));
        }
        let rec = inner.function_mut(function_name)?;
        if rec.config.package_type.as_deref() == Some("Image") {
            return Err(AwsError::invalid_parameter(
                "Code signing is not supported for container image functions",
            ));
        }
        rec.code_signing_config_arn = Some(code_signing_config_arn.to_string());
        Ok(())
    }

    async fn delete_function_code_signing_config(
        &self,
        function_name: &str,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteFunctionCodeSigningConfig")?;
        inner.function_mut(function_name)?.code_signing_config_arn = None;
        Ok(())
    }

    async fn tag_resource(
        &self,
        resource_arn: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("TagResource")?;
        inner.function_mut(resource_arn)?.tags.extend(tags);
        Ok(())
    }

    async fn untag_resource(
        &self,
        resource_arn: &str,
        keys: Vec<String>,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("UntagResource")?;
        let rec = inner.function_mut(resource_arn)?;
        for k in keys {
            rec.tags.remove(&k);
        }
        Ok(())
    }

    async fn get_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<EventInvokeConfig, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetFunctionEventInvokeConfig")?;
        let rec = inner.function(function_name)?;
        let q = qualifier_key(qualifier);
        rec.event_invoke.get(&q).cloned().ok_or_else(|| {
            AwsError::not_found(format!(
                "The function {} has no event invoke config.",
                InMemoryLambdaInner::resource_arn(rec, &q)
            ))
        })
    }

    async fn put_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        config: EventInvokeConfig,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("PutFunctionEventInvokeConfig")?;
        let rec = inner.function_mut(function_name)?;
        let q = qualifier_key(qualifier);
        if !InMemoryLambdaInner::qualifier_exists(rec, &q) {
            return Err(AwsError::not_found(format!(
                "Function not found: {}",
                InMemoryLambdaInner::resource_arn(rec, &q)
            )));
        }
        if let Some(n) = config.maximum_retry_attempts {
            if !(0..=2).contains(&n) {
                return Err(AwsError::invalid_parameter(
                    "MaximumRetryAttempts must be between 0 and 2",
                ));
            }
        }
        rec.event_invoke.insert(q, config);
        Ok(())
    }

    async fn delete_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteFunctionEventInvokeConfig")?;
        let rec = inner.function_mut(function_name)?;
        rec.event_invoke
            .remove(&qualifier_key(qualifier))
            .map(|_| ())
            .ok_or_else(|| AwsError::not_found("event invoke config not found"))
    }

    async fn create_alias(
        &self,
        input: AliasInput,
    ) -> Result<AliasConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("CreateAlias")?;
        let rec = inner.function_mut(&input.function_name)?;
        if rec.aliases.contains_key(&input.name) {
            return Err(AwsError::conflict(format!(
                "Alias already exists: {}",
                input.name
            )));
        }
        if !InMemoryLambdaInner::qualifier_exists(rec, &input.function_version)
            || rec.aliases.contains_key(&input.function_version)
        {
            return Err(AwsError::not_found(format!(
                "Function not found: {}:{}",
                rec.config.function_arn, input.function_version
            )));
        }
        let alias = AliasConfiguration {
            alias_arn: format!("{}:{}", rec.config.function_arn, input.name),
            name: input.name.clone(),
            function_version: input.function_version,
            description: Some(input.description.unwrap_or_default()),
            routing_weights: input.routing_weights.unwrap_or_default(),
            revision_id: Some(new_revision()),
        };
        rec.aliases.insert(input.name, alias.clone());
        Ok(alias)
    }

    async fn get_alias(
        &self,
        function_name: &str,
        name: &str,
    ) -> Result<AliasConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetAlias")?;
        let rec = inner.function(function_name)?;
        rec.aliases.get(name).cloned().ok_or_else(|| {
            AwsError::not_found(format!(
                "Alias not found: {}:{}",
                rec.config.function_arn, name
            ))
        })
    }

    async fn update_alias(
        &self,
        input: AliasInput,
    ) -> Result<AliasConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("UpdateAlias")?;
        let rec = inner.function_mut(&input.function_name)?;
        let version_ok =
            InMemoryLambdaInner::qualifier_exists(rec, &input.function_version);
        let function_arn = rec.config.function_arn.clone();
        let alias = rec.aliases.get_mut(&input.name).ok_or_else(|| {
            AwsError::not_found(format!(
                "Alias not found: {}:{}",
                function_arn, input.name
            ))
        })?;
        if let Some(r) = input.revision_id.as_deref() {
            if alias.revision_id.as_deref() != Some(r) {
                return Err(AwsError::precondition_failed(
                    "The Revision Id provided does not match the latest Revision Id.",
                ));
            }
        }
        if !version_ok {
            return Err(AwsError::not_found(format!(
                "Function not found: {}:{}",
                function_arn, input.function_version
            )));
        }
        alias.function_version = input.function_version;
        if let Some(d) = input.description {
            alias.description = Some(d);
        }
        if let Some(w) = input.routing_weights {
            alias.routing_weights = w;
        }
        alias.revision_id = Some(new_revision());
        Ok(alias.clone())
    }

    async fn delete_alias(
        &self,
        function_name: &str,
        name: &str,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteAlias")?;
        let fname = super::arn::function_name(function_name).to_string();
        let rec = inner.function_mut(&fname)?;
        rec.aliases
            .remove(name)
            .ok_or_else(|| AwsError::not_found(format!("Alias not found: {name}")))?;
        rec.event_invoke.remove(name);
        rec.provisioned.remove(name);
        rec.policies.remove(name);
        inner.url_configs.remove(&(fname, name.to_string()));
        Ok(())
    }

    async fn get_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
    ) -> Result<ProvisionedConcurrency, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetProvisionedConcurrencyConfig")?;
        let rec = inner.function(function_name)?;
        rec.provisioned.get(qualifier).cloned().ok_or_else(|| {
            AwsError::new(
                "ProvisionedConcurrencyConfigNotFoundException",
                format!(
                    "No Provisioned Concurrency Config found for this function: {}",
                    InMemoryLambdaInner::resource_arn(rec, qualifier)
                ),
            )
        })
    }

    async fn put_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
        requested: i32,
    ) -> Result<ProvisionedConcurrency, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("PutProvisionedConcurrencyConfig")?;
        let rec = inner.function_mut(function_name)?;
        if qualifier == LATEST {
            return Err(AwsError::invalid_parameter(
                "Provisioned Concurrency Configs cannot be applied to unpublished function versions.",
            ));
        }
        if !InMemoryLambdaInner::qualifier_exists(rec, qualifier) {
            return Err(AwsError::not_found(format!(
                "Function not found: {}",
                InMemoryLambdaInner::resource_arn(rec, qualifier)
            )));
        }
        if requested < 1 {
            return Err(AwsError::invalid_parameter(
                "ProvisionedConcurrentExecutions must be >= 1",
            ));
        }
        let pc = ProvisionedConcurrency {
            requested,
            allocated: Some(requested),
            status: Some("READY".into()),
        };
        rec.provisioned.insert(qualifier.to_string(), pc.clone());
        Ok(pc)
    }

    async fn delete_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteProvisionedConcurrencyConfig")?;
        let rec = inner.function_mut(function_name)?;
        rec.provisioned.remove(qualifier).map(|_| ()).ok_or_else(|| {
            AwsError::new(
                "ProvisionedConcurrencyConfigNotFoundException",
                "No Provisioned Concurrency Config found for this function",
            )
        })
    }

    async fn get_policy(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<String, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetPolicy")?;
        let rec = inner.function(function_name)?;
        let q = qualifier_key(qualifier);
        match rec.policies.get(&q).filter(|p| !p.is_empty()) {
            Some(perms) => Ok(render_policy(
                &InMemoryLambdaInner::resource_arn(rec, &q),
                perms,
            )),
            None => Err(AwsError::not_found(
                "The resource you requested does not exist.",
            )),
        }
    }

    async fn add_permission(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        permission: Permission,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("AddPermission")?;
        let rec = inner.function_mut(function_name)?;
        let q = qualifier_key(qualifier);
        if !InMemoryLambdaInner::qualifier_exists(rec, &q) {
            return Err(AwsError::not_found(format!(
                "Function not found: {}",
                InMemoryLambdaInner::resource_arn(rec, &q)
            )));
        }
        let perms = rec.policies.entry(q).or_default();
        if perms.iter().any(|p| p.statement_id == permission.statement_id) {
            return Err(AwsError::conflict(format!(
                "The statement id ({}) provided already exists. Please provide a new statement id, or remove the existing statement.",
                permission.statement_id
            )));
        }
        perms.push(permission);
        Ok(())
    }

    async fn remove_permission(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        statement_id: &str,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("RemovePermission")?;
        let rec = inner.function_mut(function_name)?;
        let perms = rec
            .policies
            .get_mut(&qualifier_key(qualifier))
            .ok_or_else(|| AwsError::not_found("No policy is associated with the given resource."))?;
        let before = perms.len();
        perms.retain(|p| p.statement_id != statement_id);
        if perms.len() == before {
            return Err(AwsError::not_found(format!(
                "Statement {statement_id} is not found in resource policy."
            )));
        }
        Ok(())
    }

    async fn create_event_source_mapping(
        &self,
        input: EventSourceMappingInput,
    ) -> Result<EventSourceMappingConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("CreateEventSourceMapping")?;
        let fname = input
            .function_name
            .clone()
            .ok_or_else(|| AwsError::invalid_parameter("FunctionName is required"))?;
        let function_arn = inner.function(&fname)?.config.function_arn.clone();
        let source = input.event_source_arn.clone().unwrap_or_default();
        let is_stream = source.contains(":kinesis:") || source.contains(":dynamodb:");
        if is_stream && input.starting_position.is_none() {
            return Err(AwsError::invalid_parameter(
                "StartingPosition is required for stream event sources",
            ));
        }
        let enabled = input.enabled.unwrap_or(true);
        let config = EventSourceMappingConfiguration {
            uuid: Uuid::new_v4().to_string(),
            function_arn: Some(function_arn),
            event_source_arn: input.event_source_arn,
            batch_size: Some(input.batch_size.unwrap_or(if is_stream { 100 } else { 10 })),
            maximum_batching_window_in_seconds: Some(
                input.maximum_batching_window_in_seconds.unwrap_or(0),
            ),
            starting_position: input.starting_position,
            maximum_retry_attempts: input.maximum_retry_attempts,
            maximum_record_age_in_seconds: input.maximum_record_age_in_seconds,
            bisect_batch_on_function_error: input.bisect_batch_on_function_error,
            parallelization_factor: input.parallelization_factor,
            filter_patterns: input.filter_patterns.filter(|f| !f.is_empty()),
            destination_config: input.destination_config.filter(|d| !d.is_empty()),
            scaling_maximum_concurrency: input.scaling_maximum_concurrency.flatten(),
            function_response_types: input.function_response_types.unwrap_or_default(),
            tumbling_window_in_seconds: input.tumbling_window_in_seconds,
            queues: input.queues.unwrap_or_default(),
            source_access_configurations: input
                .source_access_configurations
                .unwrap_or_default(),
            state: Some(if enabled { "Enabled" } else { "Disabled" }.into()),
            state_transition_reason: Some("USER_INITIATED".into()),
            last_modified: Some(now_iso()),
            last_processing_result: None,
        };
        inner.mappings.insert(
            config.uuid.clone(),
            MappingRecord {
                config: config.clone(),
                deleting_reads_left: None,
            },
        );
        Ok(config)
    }

    async fn get_event_source_mapping(
        &self,
        uuid: &str,
    ) -> Result<EventSourceMappingConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetEventSourceMapping")?;
        let not_found = || {
            AwsError::not_found(format!(
                "The resource you requested does not exist. (Service: Lambda, uuid: {uuid})"
            ))
        };
        let rec = inner.mappings.get_mut(uuid).ok_or_else(not_found)?;
        match rec.deleting_reads_left {
            Some(0) => {
                inner.mappings.remove(uuid);
                Err(not_found())
            }
            Some(n) => {
                rec.deleting_reads_left = Some(n - 1);
                Ok(rec.config.clone())
            }
            None => Ok(rec.config.clone()),
        }
    }

    async fn update_event_source_mapping(
        &self,
        input: EventSourceMappingInput,
    ) -> Result<EventSourceMappingConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("UpdateEventSourceMapping")?;
        let uuid = input
            .uuid
            .clone()
            .ok_or_else(|| AwsError::invalid_parameter("UUID is required"))?;
        let new_function_arn = match input.function_name.as_deref() {
            Some(f) => Some(inner.function(f)?.config.function_arn.clone()),
            None => None,
        };
        let rec = inner
            .mappings
            .get_mut(&uuid)
            .ok_or_else(|| AwsError::not_found("The resource you requested does not exist."))?;
        if rec.deleting_reads_left.is_some() {
            return Err(AwsError::in_use(
                "Cannot update the event source mapping because it is in use.",
            ));
        }
        let c = &mut rec.config;
        if let Some(arn) = new_function_arn {
            c.function_arn = Some(arn);
        }
        if let Some(v) = input.enabled {
            c.state = Some(if v { "Enabled" } else { "Disabled" }.into());
        }
        if let Some(v) = input.batch_size {
            c.batch_size = Some(v);
        }
        if let Some(v) = input.maximum_batching_window_in_seconds {
            c.maximum_batching_window_in_seconds = Some(v);
        }
        if let Some(v) = input.maximum_retry_attempts {
            c.maximum_retry_attempts = Some(v);
        }
        if let Some(v) = input.maximum_record_age_in_seconds {
            c.maximum_record_age_in_seconds = Some(v);
        }
        if let Some(v) = input.bisect_batch_on_function_error {
            c.bisect_batch_on_function_error = Some(v);
        }
        if let Some(v) = input.parallelization_factor {
            c.parallelization_factor = Some(v);
        }
        if let Some(v) = input.filter_patterns {
            c.filter_patterns = Some(v).filter(|f| !f.is_empty());
        }
        if let Some(v) = input.destination_config {
            c.destination_config = Some(v).filter(|d| !d.is_empty());
        }
        if let Some(v) = input.scaling_maximum_concurrency {
            c.scaling_maximum_concurrency = v;
        }
        if let Some(v) = input.function_response_types {
            c.function_response_types = v;
        }
        if let Some(v) = input.tumbling_window_in_seconds {
            c.tumbling_window_in_seconds = Some(v);
        }
        if let Some(v) = input.source_access_configurations {
            c.source_access_configurations = v;
        }
        c.last_modified = Some(now_iso());
        Ok(c.clone())
    }

    async fn delete_event_source_mapping(
        &self,
        uuid: &str,
    ) -> Result<EventSourceMappingConfiguration, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteEventSourceMapping")?;
        let reads = inner.mapping_delete_reads;
        let rec = inner
            .mappings
            .get_mut(uuid)
            .ok_or_else(|| AwsError::not_found("The resource you requested does not exist."))?;
        rec.config.state = Some("Deleting".into());
        let out = rec.config.clone();
        if reads == 0 {
            inner.mappings.remove(uuid);
        } else if rec.deleting_reads_left.is_none() {
            rec.deleting_reads_left = Some(reads);
        }
        Ok(out)
    }

    async fn create_code_signing_config(
        &self,
        input: CodeSigningConfigInput,
    ) -> Result<CodeSigningConfigDescription, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("CreateCodeSigningConfig")?;
        if input.signing_profile_version_arns.is_empty() {
            return Err(AwsError::invalid_parameter(
                "AllowedPublishers.SigningProfileVersionArns must not be empty",
            ));
        }
        let id = format!("csc-{}", &Uuid::new_v4().simple().to_string()[..17]);
        let arn = format!(
            "arn:aws:lambda:{}:{}:code-signing-config:{}",
            inner.region, inner.account_id, id
        );
        let csc = CodeSigningConfigDescription {
            arn: arn.clone(),
            id,
            description: Some(input.description.unwrap_or_default()),
            signing_profile_version_arns: input.signing_profile_version_arns,
            untrusted_artifact_on_deployment: input
                .untrusted_artifact_on_deployment
                .unwrap_or_else(|| "Warn".into()),
            last_modified: Some(now_iso()),
        };
        inner.code_signing_configs.insert(arn, csc.clone());
        Ok(csc)
    }

    async fn get_code_signing_config(
        &self,
        arn: &str,
    ) -> Result<CodeSigningConfigDescription, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetCodeSigningConfig")?;
        inner
            .code_signing_configs
            .get(arn)
            .cloned()
            .ok_or_else(|| AwsError::not_found(format!("Code signing config {arn} not found")))
    }

    async fn update_code_signing_config(
        &self,
        arn: &str,
        input: CodeSigningConfigInput,
    ) -> Result<CodeSigningConfigDescription, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("UpdateCodeSigningConfig")?;
        let csc = inner
            .code_signing_configs
            .get_mut(arn)
            .ok_or_else(|| AwsError::not_found(format!("Code signing config {arn} not found")))?;
        if let Some(d) = input.description {
            csc.description = Some(d);
        }
        if !input.signing_profile_version_arns.is_empty() {
            csc.signing_profile_version_arns = input.signing_profile_version_arns;
        }
        if let Some(p) = input.untrusted_artifact_on_deployment {
            csc.untrusted_artifact_on_deployment = p;
        }
        csc.last_modified = Some(now_iso());
        Ok(csc.clone())
    }

    async fn delete_code_signing_config(&self, arn: &str) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteCodeSigningConfig")?;
        if inner
            .functions
            .values()
            .any(|f| f.code_signing_config_arn.as_deref() == Some(arn))
        {
            return Err(AwsError::conflict(format!(
                "Code signing config {arn} is attached to one or more functions"
            )));
        }
        inner
            .code_signing_configs
            .remove(arn)
            .map(|_| ())
            .ok_or_else(|| AwsError::not_found(format!("Code signing config {arn} not found")))
    }

    async fn create_function_url_config(
        &self,
        input: FunctionUrlConfigInput,
    ) -> Result<FunctionUrlConfig, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("CreateFunctionUrlConfig")?;
        let auth_type = input.auth_type.clone().unwrap_or_default();
        if auth_type != "AWS_IAM" && auth_type != "NONE" {
            return Err(AwsError::invalid_parameter(format!(
                "Invalid AuthType: {auth_type}"
            )));
        }
        let fname = function_name(&input.function_name).to_string();
        let q = qualifier_key(input.qualifier.as_deref());
        let rec = inner.function(&fname)?;
        if q != LATEST && !rec.aliases.contains_key(&q) {
            return Err(AwsError::not_found(format!(
                "Function not found: {}",
                InMemoryLambdaInner::resource_arn(rec, &q)
            )));
        }
        let function_arn = InMemoryLambdaInner::resource_arn(rec, &q);
        let key = (fname, q);
        if inner.url_configs.contains_key(&key) {
            return Err(AwsError::conflict(
                "Failed to create function url config. Error message: FunctionUrlConfig exists for this Lambda function",
            ));
        }
        let url = FunctionUrlConfig {
            function_url: format!(
                "https://{}.lambda-url.{}.on.aws/",
                Uuid::new_v4().simple(),
                inner.region
            ),
            function_arn,
            auth_type,
            cors: input.cors.filter(|c| *c != Cors::default()),
            creation_time: Some(now_iso()),
            last_modified: Some(now_iso()),
        };
        inner.url_configs.insert(key, url.clone());
        Ok(url)
    }

    async fn get_function_url_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionUrlConfig, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetFunctionUrlConfig")?;
        let key = (
            super::arn::function_name(function_name).to_string(),
            qualifier_key(qualifier),
        );
        inner
            .url_configs
            .get(&key)
            .cloned()
            .ok_or_else(|| AwsError::not_found("The resource you requested does not exist."))
    }

    async fn update_function_url_config(
        &self,
        input: FunctionUrlConfigInput,
    ) -> Result<FunctionUrlConfig, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("UpdateFunctionUrlConfig")?;
        let key = (
            function_name(&input.function_name).to_string(),
            qualifier_key(input.qualifier.as_deref()),
        );
        let url = inner
            .url_configs
            .get_mut(&key)
            .ok_or_else(|| AwsError::not_found("The resource you requested does not exist."))?;
        if let Some(a) = input.auth_type {
            if a != "AWS_IAM" && a != "NONE" {
                return Err(AwsError::invalid_parameter(format!("Invalid AuthType: {a}")));
            }
            url.auth_type = a;
        }
        if let Some(c) = input.cors {
            url.cors = Some(c).filter(|c| *c != Cors::default());
        }
        url.last_modified = Some(now_iso());
        Ok(url.clone())
    }

    async fn delete_function_url_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteFunctionUrlConfig")?;
        let key = (
            super::arn::function_name(function_name).to_string(),
            qualifier_key(qualifier),
        );
        inner
            .url_configs
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| AwsError::not_found("The resource you requested does not exist."))
    }

    async fn publish_layer_version(
        &self,
        input: PublishLayerVersionInput,
    ) -> Result<LayerVersionDescription, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("PublishLayerVersion")?;
        if input.content.s3_bucket.is_none() || input.content.s3_key.is_none() {
            return Err(AwsError::invalid_parameter(
                "Content must specify S3Bucket and S3Key",
            ));
        }
        let layer_arn = format!(
            "arn:aws:lambda:{}:{}:layer:{}",
            inner.region, inner.account_id, input.layer_name
        );
        let sha = inner.code_sha(&FunctionCode {
            s3_bucket: input.content.s3_bucket.clone(),
            s3_key: input.content.s3_key.clone(),
            s3_object_version: input.content.s3_object_version.clone(),
            image_uri: None,
        });
        let layer = inner.layers.entry(input.layer_name).or_default();
        layer.last_version += 1;
        let v = layer.last_version;
        let desc = LayerVersionDescription {
            layer_version_arn: format!("{layer_arn}:{v}"),
            layer_arn,
            version: v,
            description: input.description.filter(|d| !d.is_empty()),
            created_date: Some(now_iso()),
            compatible_runtimes: input.compatible_runtimes,
            compatible_architectures: input.compatible_architectures,
            license_info: input.license_info,
            code_sha256: Some(sha),
        };
        layer.versions.insert(v, desc.clone());
        Ok(desc)
    }

    async fn get_layer_version(
        &self,
        layer_name: &str,
        version: i64,
    ) -> Result<LayerVersionDescription, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("GetLayerVersion")?;
        inner
            .layers
            .get(layer_name)
            .and_then(|l| l.versions.get(&version))
            .cloned()
            .ok_or_else(|| {
                AwsError::not_found(
                    "The resource you requested does not exist.",
                )
            })
    }

    async fn list_layer_versions(
        &self,
        layer_name: &str,
    ) -> Result<Vec<LayerVersionDescription>, AwsError> {
        let mut inner = self.inner.lock().await;
        inner.read("ListLayerVersions")?;
        Ok(inner
            .layers
            .get(layer_name)
            .map(|l| l.versions.values().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_layer_version(
        &self,
        layer_name: &str,
        version: i64,
    ) -> Result<(), AwsError> {
        let mut inner = self.inner.lock().await;
        inner.mutate("DeleteLayerVersion")?;
        if let Some(layer) = inner.layers.get_mut(layer_name) {
            layer.versions.remove(&version);
        }
        Ok(())
    }
}
