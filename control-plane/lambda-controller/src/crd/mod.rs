use std::fmt::Debug;

use kube::Resource;
use kube::core::NamespaceResourceScope;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod alias;
pub mod code_signing_config;
pub mod common;
pub mod event_source_mapping;
pub mod function;
pub mod function_url_config;
pub mod layer_version;
pub mod version;

pub use alias::{Alias, AliasSpec, AliasStatus};
pub use code_signing_config::{
    CodeSigningConfig, CodeSigningConfigSpec, CodeSigningConfigStatus,
};
pub use common::{
    AckResourceMetadata, AckStatus, AckStatusFields, Condition,
    ConditionStatus, ConditionType, ManagedFields,
};
pub use event_source_mapping::{
    EventSourceMapping, EventSourceMappingSpec, EventSourceMappingStatus,
};
pub use function::{Function, FunctionSpec, FunctionStatus};
pub use function_url_config::{
    FunctionURLConfig, FunctionURLConfigSpec, FunctionURLConfigStatus,
};
pub use layer_version::{LayerVersion, LayerVersionSpec, LayerVersionStatus};
pub use version::{Version, VersionSpec, VersionStatus};

/// A namespaced Lambda custom resource driven by the generic reconciler.
pub trait AckResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    type Status: AckStatus
        + Clone
        + Debug
        + Default
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync;

    fn status_ref(&self) -> Option<&Self::Status>;
    fn status_slot(&mut self) -> &mut Option<Self::Status>;
    /// Optional spec fields set right now. Not to be confused with the
    /// server-side apply `metadata.managedFields`.
    fn spec_managed_fields(&self) -> ManagedFields;

    fn ack(&self) -> Option<&AckStatusFields> {
        self.status_ref().map(|s| s.ack())
    }
}

macro_rules! impl_ack_resource {
    ($($kind:ty => $status:ty),+ $(,)?) => {
        $(
            impl AckResource for $kind {
                type Status = $status;

                fn status_ref(&self) -> Option<&Self::Status> {
                    self.status.as_ref()
                }
                fn status_slot(&mut self) -> &mut Option<Self::Status> {
                    &mut self.status
                }
                fn spec_managed_fields(&self) -> ManagedFields {
                    self.spec.managed_fields()
                }
            }
        )+
    };
}

impl_ack_resource!(
    Function => FunctionStatus,
    Alias => AliasStatus,
    Version => VersionStatus,
    EventSourceMapping => EventSourceMappingStatus,
    CodeSigningConfig => CodeSigningConfigStatus,
    FunctionURLConfig => FunctionURLConfigStatus,
    LayerVersion => LayerVersionStatus,
);
