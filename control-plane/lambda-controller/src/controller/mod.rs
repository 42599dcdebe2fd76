use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use kube::{
    Client, Resource, ResourceExt,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aws::{AwsError, AwsErrorKind, LambdaApi};
use crate::config::ControllerConfig;
use crate::resources::{
    AliasManager, AwsCtx, CodeSigningConfigManager, EventSourceMappingManager,
    FunctionManager, FunctionUrlConfigManager, LayerVersionManager,
    ResourceManager, VersionManager,
};
use crate::retry::{RequeueBackoff, RetryConfig};

pub mod events;
pub mod exclusion;
pub mod fsm;
pub mod reconcile;
pub mod references;
pub mod status_reducer;
pub mod store;

#[cfg(test)]
mod status_reducer_tests;

use exclusion::IdentityLocks;
use references::{ReferenceError, ReferenceReader, ReferenceResolver};
use store::{KubeSink, StatusSink};

pub const FINALIZER: &str = "finalizers.lambda.services.k8s.aws";
pub const CONTROLLER_NAME: &str = "lambda-controller";

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error(transparent)]
    Aws(#[from] AwsError),
    #[error("kubernetes api: {0}")]
    Kube(#[from] kube::Error),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    /// The spec cannot be acted on until the user changes it.
    #[error("{0}")]
    Terminal(String),
    /// Not an error from the user's point of view; try again later.
    #[error("{reason}")]
    Requeue { reason: String, after: Duration },
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

/// How a failure is surfaced and retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retried with backoff; no condition is written. AWS validation
    /// errors land here unless the kind's manager calls them terminal.
    Transient,
    /// `ACK.Terminal`; waits for a spec change.
    Validation,
    /// `ACK.ReferencesResolved=False`; requeued.
    Reference,
    /// Concurrent modification; re-read and retried, then `ACK.Recoverable`.
    Conflict,
    Requeue,
}

impl ReconcileErr {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReconcileErr::Aws(e) if e.kind == AwsErrorKind::Conflict => {
                ErrorClass::Conflict
            }
            ReconcileErr::Aws(_) => ErrorClass::Transient,
            ReconcileErr::Reference(_) => ErrorClass::Reference,
            ReconcileErr::Terminal(_) => ErrorClass::Validation,
            ReconcileErr::Requeue { .. } => ErrorClass::Requeue,
            ReconcileErr::Kube(_)
            | ReconcileErr::Serialization(_)
            | ReconcileErr::Internal(_) => ErrorClass::Transient,
        }
    }

    /// The message shown in conditions. AWS validation messages are kept
    /// verbatim.
    pub fn condition_message(&self) -> String {
        match self {
            ReconcileErr::Aws(e) => e.message.clone(),
            other => other.to_string(),
        }
    }
}

/// State shared by every kind's controller.
pub struct Engine {
    pub api: Arc<dyn LambdaApi>,
    pub resolver: ReferenceResolver,
    pub locks: IdentityLocks,
    pub cfg: ControllerConfig,
    pub retry: RetryConfig,
    pub shutdown: CancellationToken,
}

impl Engine {
    pub fn new(
        api: Arc<dyn LambdaApi>,
        reader: Arc<dyn ReferenceReader>,
        cfg: ControllerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            api,
            resolver: ReferenceResolver::new(reader, cfg.cross_namespace_allowed()),
            locks: IdentityLocks::default(),
            retry: cfg.retry.to_retry_config(),
            cfg,
            shutdown,
        }
    }

    pub fn aws(&self) -> AwsCtx<'_> {
        AwsCtx {
            api: self.api.as_ref(),
            retry: &self.retry,
            timing: &self.cfg.timing,
            region: &self.cfg.aws.region,
            account_id: &self.cfg.aws.account_id,
        }
    }
}

pub struct ControllerContext<M: ResourceManager> {
    pub engine: Arc<Engine>,
    pub manager: M,
    pub sink: Arc<dyn StatusSink<M::Kind>>,
    pub backoff: RequeueBackoff,
}

/// Run one controller per kind until shutdown.
pub async fn run_controllers(client: Client, engine: Arc<Engine>) -> anyhow::Result<()> {
    tokio::try_join!(
        run_kind(client.clone(), engine.clone(), FunctionManager),
        run_kind(client.clone(), engine.clone(), AliasManager),
        run_kind(client.clone(), engine.clone(), VersionManager),
        run_kind(client.clone(), engine.clone(), EventSourceMappingManager),
        run_kind(client.clone(), engine.clone(), CodeSigningConfigManager),
        run_kind(client.clone(), engine.clone(), FunctionUrlConfigManager),
        run_kind(client, engine, LayerVersionManager),
    )?;
    Ok(())
}

pub async fn run_kind<M: ResourceManager>(
    client: Client,
    engine: Arc<Engine>,
    manager: M,
) -> anyhow::Result<()> {
    let kind = M::Kind::kind(&()).to_string();
    let api: Api<M::Kind> = match engine.cfg.watch_namespace.as_deref() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let ctx = Arc::new(ControllerContext {
        backoff: RequeueBackoff::new(
            Duration::from_secs(1),
            engine.cfg.timing.error_backoff_max(),
        ),
        sink: Arc::new(KubeSink::<M::Kind>::new(client, CONTROLLER_NAME)),
        manager,
        engine: engine.clone(),
    });
    info!(%kind, namespace = ?engine.cfg.watch_namespace, "starting controller");

    let shutdown = engine.shutdown.clone();
    Controller::new(api, Config::default())
        .graceful_shutdown_on(async move { shutdown.cancelled().await })
        .run(reconcile_entry::<M>, error_policy::<M>, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    debug!(object = %obj_ref, ?action, "reconciled")
                }
                Err(e) => warn!(error = %e, "reconcile failed"),
            }
        })
        .await;
    info!(%kind, "controller stopped");
    Ok(())
}

async fn reconcile_entry<M: ResourceManager>(
    obj: Arc<M::Kind>,
    ctx: Arc<ControllerContext<M>>,
) -> Result<Action, ReconcileErr> {
    let key = reconcile::object_key(obj.as_ref());
    let next = reconcile::reconcile_object(
        &ctx.engine,
        &ctx.manager,
        ctx.sink.as_ref(),
        obj.as_ref(),
    )
    .await?;
    ctx.backoff.reset(&key);
    Ok(next.into_action())
}

fn error_policy<M: ResourceManager>(
    obj: Arc<M::Kind>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext<M>>,
) -> Action {
    if let ReconcileErr::Requeue { after, .. } = error {
        return Action::requeue(*after);
    }
    let key = reconcile::object_key(obj.as_ref());
    let delay = ctx.backoff.next_delay(&key);
    warn!(
        name = %obj.name_any(),
        error = %error,
        delay_ms = delay.as_millis(),
        "reconcile error; backing off"
    );
    Action::requeue(delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aws_errors_are_classified_by_kind() {
        assert_eq!(
            ReconcileErr::from(AwsError::invalid_parameter("bad")).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            ReconcileErr::from(AwsError::precondition_failed("rev")).class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            ReconcileErr::from(AwsError::throttled("slow down")).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            ReconcileErr::Terminal("x".into()).class(),
            ErrorClass::Validation
        );
    }

    #[test]
    fn aws_validation_messages_are_kept_verbatim() {
        let err = ReconcileErr::from(AwsError::invalid_parameter(
            "Runtime and Handler are mandatory parameters",
        ));
        assert_eq!(
            err.condition_message(),
            "Runtime and Handler are mandatory parameters"
        );
    }
}
