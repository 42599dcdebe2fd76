//! Where reconcile results are written: the object's status subresource,
//! its finalizer list, and the event stream.

use std::marker::PhantomData;

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::events::{Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use serde_json::{Value, json};
use tracing::trace;

use super::events::{LifecycleEvent, emit_event};
use super::ReconcileErr;
use crate::crd::AckResource;

#[async_trait]
pub trait StatusSink<K: AckResource>: Send + Sync {
    /// Apply a JSON merge patch to `.status`.
    async fn patch_status(&self, obj: &K, patch: Value) -> Result<(), ReconcileErr>;
    async fn set_finalizers(
        &self,
        obj: &K,
        finalizers: Vec<String>,
    ) -> Result<(), ReconcileErr>;
    async fn publish(&self, obj: &K, event: LifecycleEvent);
}

pub struct KubeSink<K> {
    client: Client,
    recorder: Recorder,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeSink<K> {
    pub fn new(client: Client, controller: &str) -> Self {
        let reporter = Reporter {
            controller: controller.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client.clone(), reporter),
            client,
            _kind: PhantomData,
        }
    }

    fn api(&self, obj: &K) -> Api<K>
    where
        K: AckResource,
    {
        let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
        Api::namespaced(self.client.clone(), &ns)
    }
}

#[async_trait]
impl<K: AckResource> StatusSink<K> for KubeSink<K> {
    async fn patch_status(&self, obj: &K, patch: Value) -> Result<(), ReconcileErr> {
        let name = obj.name_any();
        trace!(%name, %patch, "patching status");
        let body = json!({ "status": patch });
        self.api(obj)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&body))
            .await?;
        Ok(())
    }

    async fn set_finalizers(
        &self,
        obj: &K,
        finalizers: Vec<String>,
    ) -> Result<(), ReconcileErr> {
        let name = obj.name_any();
        let patch = json!({"metadata": {"finalizers": finalizers}});
        self.api(obj)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn publish(&self, obj: &K, event: LifecycleEvent) {
        emit_event(&self.recorder, &obj.object_ref(&()), &event).await;
    }
}
