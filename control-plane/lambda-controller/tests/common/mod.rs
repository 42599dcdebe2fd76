#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use lambda_controller::aws::{
    CreateFunctionInput, FunctionCode, InMemoryLambda, LambdaApi,
    PublishVersionInput,
};
use lambda_controller::config::ControllerConfig;
use lambda_controller::controller::events::LifecycleEvent;
use lambda_controller::controller::reconcile::{Next, reconcile_object};
use lambda_controller::controller::references::{
    ReferenceReader, ReferenceTarget, ReferencedObject,
};
use lambda_controller::controller::store::StatusSink;
use lambda_controller::controller::{Engine, ReconcileErr};
use lambda_controller::crd::{AckResource, AckStatus, ConditionType};
use lambda_controller::resources::ResourceManager;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub const NS: &str = "default";
pub const ACCOUNT: &str = "111122223333";
pub const REGION: &str = "us-west-2";

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

/// Short waits so delete confirmation and conflict retries stay fast.
pub fn test_config() -> ControllerConfig {
    let mut cfg = ControllerConfig::default();
    cfg.aws.account_id = ACCOUNT.into();
    cfg.aws.region = REGION.into();
    cfg.timing.delete_poll_ms = 5;
    cfg.timing.delete_timeout_secs = 2;
    cfg.retry.initial_ms = 1;
    cfg.retry.max_ms = 5;
    cfg
}

/// RFC 7386 merge patch.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(fields) => {
            if !target.is_object() {
                *target = json!({});
            }
            if let Value::Object(map) = target {
                for (k, v) in fields {
                    if v.is_null() {
                        map.remove(k);
                    } else {
                        apply_merge_patch(
                            map.entry(k.clone()).or_insert(Value::Null),
                            v,
                        );
                    }
                }
            }
        }
        other => *target = other.clone(),
    }
}

/// Stands in for the API server: holds one object and applies what the
/// reconciler writes to it.
pub struct MemorySink<K> {
    obj: Mutex<K>,
    events: Mutex<Vec<LifecycleEvent>>,
    status_patches: Mutex<usize>,
}

impl<K: AckResource> MemorySink<K> {
    pub fn new(mut obj: K) -> Self {
        let meta = obj.meta_mut();
        meta.namespace.get_or_insert_with(|| NS.to_string());
        meta.generation.get_or_insert(1);
        Self {
            obj: Mutex::new(obj),
            events: Mutex::new(Vec::new()),
            status_patches: Mutex::new(0),
        }
    }

    pub fn current(&self) -> K {
        self.obj.lock().unwrap().clone()
    }

    pub fn status(&self) -> K::Status {
        self.current().status_ref().cloned().unwrap_or_default()
    }

    /// Edit the object as a user would; bumps `metadata.generation`.
    pub fn edit(&self, f: impl FnOnce(&mut K)) {
        let mut obj = self.obj.lock().unwrap();
        f(&mut obj);
        let meta = obj.meta_mut();
        meta.generation = Some(meta.generation.unwrap_or(0) + 1);
    }

    pub fn mark_deleted(&self) {
        self.obj.lock().unwrap().meta_mut().deletion_timestamp =
            Some(Time(chrono::Utc::now()));
    }

    pub fn finalizers(&self) -> Vec<String> {
        self.current().meta().finalizers.clone().unwrap_or_default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.reason).collect()
    }

    pub fn status_patches(&self) -> usize {
        *self.status_patches.lock().unwrap()
    }

    pub fn is_synced(&self) -> bool {
        self.status().ack().is_synced()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().ack().is_terminal()
    }

    pub fn condition_message(&self, t: ConditionType) -> Option<String> {
        self.status()
            .ack()
            .condition(t)
            .and_then(|c| c.message.clone())
    }
}

#[async_trait]
impl<K: AckResource> StatusSink<K> for MemorySink<K> {
    async fn patch_status(&self, _obj: &K, patch: Value) -> Result<(), ReconcileErr> {
        let mut obj = self.obj.lock().unwrap();
        let mut doc = serde_json::to_value(&*obj)?;
        let mut status = doc.get("status").cloned().unwrap_or(Value::Null);
        apply_merge_patch(&mut status, &patch);
        doc["status"] = status;
        *obj = serde_json::from_value(doc)?;
        *self.status_patches.lock().unwrap() += 1;
        Ok(())
    }

    async fn set_finalizers(
        &self,
        _obj: &K,
        finalizers: Vec<String>,
    ) -> Result<(), ReconcileErr> {
        self.obj.lock().unwrap().meta_mut().finalizers = Some(finalizers);
        Ok(())
    }

    async fn publish(&self, _obj: &K, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Referenced objects keyed by kind, namespace and name.
#[derive(Default)]
pub struct MapReader {
    objects: Mutex<BTreeMap<(String, String, String), ReferencedObject>>,
}

impl MapReader {
    pub fn put(&self, kind: &str, ns: &str, name: &str, obj: ReferencedObject) {
        self.objects
            .lock()
            .unwrap()
            .insert((kind.into(), ns.into(), name.into()), obj);
    }

    pub fn remove(&self, kind: &str, ns: &str, name: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(kind.into(), ns.into(), name.into()));
    }

    /// A Function CR that reports synced with the given AWS name.
    pub fn put_synced_function(&self, ns: &str, name: &str, aws_name: &str) {
        self.put(
            "Function",
            ns,
            name,
            ReferencedObject {
                spec: json!({"name": aws_name}),
                status: json!({
                    "conditions": [{"type": "ACK.ResourceSynced", "status": "True"}]
                }),
            },
        );
    }
}

#[async_trait]
impl ReferenceReader for MapReader {
    async fn read(
        &self,
        target: &ReferenceTarget,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReferencedObject>, kube::Error> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(target.kind.into(), namespace.into(), name.into()))
            .cloned())
    }
}

pub struct Harness {
    pub lambda: InMemoryLambda,
    pub refs: Arc<MapReader>,
    pub engine: Engine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(cfg: ControllerConfig) -> Self {
        let lambda = InMemoryLambda::new(ACCOUNT, REGION);
        let refs = Arc::new(MapReader::default());
        let engine = Engine::new(
            Arc::new(lambda.clone()),
            refs.clone(),
            cfg,
            CancellationToken::new(),
        );
        Self {
            lambda,
            refs,
            engine,
        }
    }

    pub fn api(&self) -> &dyn LambdaApi {
        &self.lambda
    }

    /// A zip function created directly in the backend, outside any CR.
    pub async fn seed_function(&self, name: &str) {
        self.lambda
            .create_function(CreateFunctionInput {
                function_name: name.to_string(),
                role: Some("arn:aws:iam::111122223333:role/lambda-basic".into()),
                runtime: Some("nodejs20.x".into()),
                handler: Some("index.handler".into()),
                code: FunctionCode {
                    s3_bucket: Some("artifacts".into()),
                    s3_key: Some(format!("{name}.zip")),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .expect("seed function");
    }

    /// Publish the function's current code; returns the version number.
    pub async fn seed_version(&self, name: &str) -> String {
        self.lambda
            .publish_version(PublishVersionInput {
                function_name: name.to_string(),
                ..Default::default()
            })
            .await
            .expect("publish version")
            .version
            .expect("version number")
    }

    /// One reconcile of the sink's current object.
    pub async fn reconcile<M: ResourceManager>(
        &self,
        manager: &M,
        sink: &MemorySink<M::Kind>,
    ) -> Result<Next, ReconcileErr> {
        let obj = sink.current();
        reconcile_object(&self.engine, manager, sink, &obj).await
    }

    /// Reconcile until the object is synced, terminal, or waiting on a
    /// change. Requeues in between are taken immediately.
    pub async fn settle<M: ResourceManager>(
        &self,
        manager: &M,
        sink: &MemorySink<M::Kind>,
    ) -> Result<Next, ReconcileErr> {
        let mut last = Next::AwaitChange;
        for _ in 0..12 {
            last = self.reconcile(manager, sink).await?;
            if last == Next::AwaitChange || sink.is_synced() {
                break;
            }
        }
        Ok(last)
    }

    /// Delete the object and reconcile until its finalizer is released.
    pub async fn delete<M: ResourceManager>(
        &self,
        manager: &M,
        sink: &MemorySink<M::Kind>,
    ) -> Result<(), ReconcileErr> {
        sink.mark_deleted();
        for _ in 0..12 {
            self.reconcile(manager, sink).await?;
            if sink.finalizers().is_empty() {
                return Ok(());
            }
        }
        panic!("finalizer was never released");
    }
}
