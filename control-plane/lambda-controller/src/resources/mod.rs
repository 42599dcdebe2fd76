//! Per-kind knowledge: how to resolve a spec, read the AWS resource, diff
//! the two into ordered operations, apply them, and project AWS state back
//! into status. The generic engine in `controller::reconcile` drives these.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::aws::{AwsError, LambdaApi};
use crate::config::TimingConfig;
use crate::controller::ReconcileErr;
use crate::controller::references::ReferenceResolver;
use crate::crd::{AckResource, ManagedFields};
use crate::retry::{RetryConfig, retry_with_backoff};

pub mod alias;
pub mod code_signing_config;
pub mod delta;
pub mod event_invoke;
pub mod event_source_mapping;
pub mod function;
pub mod function_url_config;
pub mod layer_version;
pub mod version;

pub use alias::AliasManager;
pub use code_signing_config::CodeSigningConfigManager;
pub use event_source_mapping::EventSourceMappingManager;
pub use function::FunctionManager;
pub use function_url_config::FunctionUrlConfigManager;
pub use layer_version::LayerVersionManager;
pub use version::VersionManager;

pub type KindStatus<K> = <K as AckResource>::Status;

/// Everything a manager needs to talk to AWS during one reconcile.
#[derive(Clone, Copy)]
pub struct AwsCtx<'a> {
    pub api: &'a dyn LambdaApi,
    pub retry: &'a RetryConfig,
    pub timing: &'a TimingConfig,
    pub region: &'a str,
    pub account_id: &'a str,
}

impl AwsCtx<'_> {
    /// Run one AWS call, absorbing throttling and service errors.
    pub async fn call<T, F, Fut>(&self, op: &str, f: F) -> Result<T, AwsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AwsError>>,
    {
        retry_with_backoff(self.retry, op, AwsError::is_retryable, f).await
    }
}

/// What the engine should do after a batch of operations was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// Read the resource again and keep going.
    Continue,
    /// Stop here and come back later.
    Requeue(Duration),
}

#[async_trait]
pub trait ResourceManager: Send + Sync + 'static {
    type Kind: AckResource;
    /// The spec with every reference replaced by a concrete identifier.
    type Desired: Clone + Debug + Send + Sync;
    type Observed: Clone + Debug + Send + Sync;
    type Op: Clone + Debug + Send + Sync;

    async fn resolve(
        &self,
        obj: &Self::Kind,
        refs: &ReferenceResolver,
    ) -> Result<Self::Desired, ReconcileErr>;

    /// Identity to delete with when references no longer resolve, taken
    /// from what status recorded at creation. `None` when nothing was
    /// ever created.
    fn desired_from_status(&self, obj: &Self::Kind) -> Option<Self::Desired>;

    fn has_references(&self, obj: &Self::Kind) -> bool;

    /// AWS errors that no retry can fix for this kind. Everything else,
    /// including validation codes AWS also returns while IAM changes
    /// propagate, is retried.
    fn terminal_aws_error(&self, _err: &AwsError) -> bool {
        false
    }

    /// Reject spec combinations AWS would refuse, before any call is made.
    fn validate(&self, _desired: &Self::Desired) -> Result<(), ReconcileErr> {
        Ok(())
    }

    async fn read(
        &self,
        aws: &AwsCtx<'_>,
        desired: &Self::Desired,
        status: &KindStatus<Self::Kind>,
    ) -> Result<Option<Self::Observed>, ReconcileErr>;

    /// Create the resource, record its identifiers in `status`, and return
    /// its ARN.
    async fn create(
        &self,
        aws: &AwsCtx<'_>,
        desired: &Self::Desired,
        status: &mut KindStatus<Self::Kind>,
    ) -> Result<Option<String>, ReconcileErr>;

    /// How long to wait when AWS reports a transitional state.
    fn requeue_hint(
        &self,
        _observed: &Self::Observed,
        _timing: &TimingConfig,
    ) -> Option<(Duration, String)> {
        None
    }

    /// Ordered operations that move `observed` towards `desired`.
    /// `managed` lists spec fields the controller owns, including ones the
    /// user just removed.
    fn plan(
        &self,
        desired: &Self::Desired,
        observed: &Self::Observed,
        managed: &ManagedFields,
    ) -> Vec<Self::Op>;

    async fn apply(
        &self,
        aws: &AwsCtx<'_>,
        desired: &Self::Desired,
        observed: &Self::Observed,
        ops: Vec<Self::Op>,
        status: &mut KindStatus<Self::Kind>,
    ) -> Result<Applied, ReconcileErr>;

    async fn delete(
        &self,
        aws: &AwsCtx<'_>,
        desired: &Self::Desired,
        status: &KindStatus<Self::Kind>,
    ) -> Result<(), ReconcileErr>;

    /// True once AWS no longer reports the resource.
    async fn is_gone(
        &self,
        aws: &AwsCtx<'_>,
        desired: &Self::Desired,
        status: &KindStatus<Self::Kind>,
    ) -> Result<bool, ReconcileErr> {
        Ok(self.read(aws, desired, status).await?.is_none())
    }

    fn project(&self, observed: &Self::Observed, status: &mut KindStatus<Self::Kind>);

    fn arn(&self, observed: &Self::Observed) -> Option<String>;
}
