//! The Lambda control plane as seen by the reconciler.
//!
//! [`LambdaApi`] is the capability boundary: one method per AWS operation,
//! typed inputs and outputs, and a typed [`AwsError`]. Two backends exist:
//! [`memory::InMemoryLambda`] and, behind the `aws-sdk` feature,
//! `sdk::SdkLambda`.

use std::collections::BTreeMap;

use async_trait::async_trait;

pub mod arn;
pub mod error;
pub mod memory;
pub mod model;
pub mod policy;
#[cfg(feature = "aws-sdk")]
pub mod sdk;

pub use error::{AwsError, AwsErrorKind, AwsResultExt};
pub use memory::InMemoryLambda;
pub use model::*;

/// Qualifier that addresses the unpublished function.
pub const LATEST: &str = "$LATEST";

#[async_trait]
pub trait LambdaApi: Send + Sync {
    // Functions
    async fn create_function(
        &self,
        input: CreateFunctionInput,
    ) -> Result<FunctionConfiguration, AwsError>;
    async fn get_function(
        &self,
        function_name: &str,
    ) -> Result<FunctionDescription, AwsError>;
    async fn get_function_configuration(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionConfiguration, AwsError>;
    async fn update_function_configuration(
        &self,
        input: UpdateFunctionConfigurationInput,
    ) -> Result<FunctionConfiguration, AwsError>;
    async fn update_function_code(
        &self,
        input: UpdateFunctionCodeInput,
    ) -> Result<FunctionConfiguration, AwsError>;
    /// With a qualifier, deletes only that published version.
    async fn delete_function(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError>;
    async fn publish_version(
        &self,
        input: PublishVersionInput,
    ) -> Result<FunctionConfiguration, AwsError>;

    // Reserved concurrency
    async fn get_function_concurrency(
        &self,
        function_name: &str,
    ) -> Result<Option<i32>, AwsError>;
    async fn put_function_concurrency(
        &self,
        function_name: &str,
        reserved: i32,
    ) -> Result<(), AwsError>;
    async fn delete_function_concurrency(
        &self,
        function_name: &str,
    ) -> Result<(), AwsError>;

    // Code signing attachment
    async fn get_function_code_signing_config(
        &self,
        function_name: &str,
    ) -> Result<Option<String>, AwsError>;
    async fn put_function_code_signing_config(
        &self,
        function_name: &str,
        code_signing_config_arn: &str,
    ) -> Result<(), AwsError>;
    async fn delete_function_code_signing_config(
        &self,
        function_name: &str,
    ) -> Result<(), AwsError>;

    // Tags
    async fn tag_resource(
        &self,
        resource_arn: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<(), AwsError>;
    async fn untag_resource(
        &self,
        resource_arn: &str,
        keys: Vec<String>,
    ) -> Result<(), AwsError>;

    // Asynchronous invocation config
    async fn get_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<EventInvokeConfig, AwsError>;
    async fn put_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        config: EventInvokeConfig,
    ) -> Result<(), AwsError>;
    async fn delete_function_event_invoke_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError>;

    // Aliases
    async fn create_alias(
        &self,
        input: AliasInput,
    ) -> Result<AliasConfiguration, AwsError>;
    async fn get_alias(
        &self,
        function_name: &str,
        name: &str,
    ) -> Result<AliasConfiguration, AwsError>;
    async fn update_alias(
        &self,
        input: AliasInput,
    ) -> Result<AliasConfiguration, AwsError>;
    async fn delete_alias(
        &self,
        function_name: &str,
        name: &str,
    ) -> Result<(), AwsError>;

    // Provisioned concurrency
    async fn get_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
    ) -> Result<ProvisionedConcurrency, AwsError>;
    async fn put_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
        requested: i32,
    ) -> Result<ProvisionedConcurrency, AwsError>;
    async fn delete_provisioned_concurrency_config(
        &self,
        function_name: &str,
        qualifier: &str,
    ) -> Result<(), AwsError>;

    // Resource-based policy
    /// The raw policy document; `ResourceNotFoundException` when empty.
    async fn get_policy(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<String, AwsError>;
    async fn add_permission(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        permission: Permission,
    ) -> Result<(), AwsError>;
    async fn remove_permission(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
        statement_id: &str,
    ) -> Result<(), AwsError>;

    // Event source mappings
    async fn create_event_source_mapping(
        &self,
        input: EventSourceMappingInput,
    ) -> Result<EventSourceMappingConfiguration, AwsError>;
    async fn get_event_source_mapping(
        &self,
        uuid: &str,
    ) -> Result<EventSourceMappingConfiguration, AwsError>;
    async fn update_event_source_mapping(
        &self,
        input: EventSourceMappingInput,
    ) -> Result<EventSourceMappingConfiguration, AwsError>;
    async fn delete_event_source_mapping(
        &self,
        uuid: &str,
    ) -> Result<EventSourceMappingConfiguration, AwsError>;

    // Code signing configs
    async fn create_code_signing_config(
        &self,
        input: CodeSigningConfigInput,
    ) -> Result<CodeSigningConfigDescription, AwsError>;
    async fn get_code_signing_config(
        &self,
        arn: &str,
    ) -> Result<CodeSigningConfigDescription, AwsError>;
    async fn update_code_signing_config(
        &self,
        arn: &str,
        input: CodeSigningConfigInput,
    ) -> Result<CodeSigningConfigDescription, AwsError>;
    async fn delete_code_signing_config(&self, arn: &str)
    -> Result<(), AwsError>;

    // Function URLs
    async fn create_function_url_config(
        &self,
        input: FunctionUrlConfigInput,
    ) -> Result<FunctionUrlConfig, AwsError>;
    async fn get_function_url_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionUrlConfig, AwsError>;
    async fn update_function_url_config(
        &self,
        input: FunctionUrlConfigInput,
    ) -> Result<FunctionUrlConfig, AwsError>;
    async fn delete_function_url_config(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), AwsError>;

    // Layers
    async fn publish_layer_version(
        &self,
        input: PublishLayerVersionInput,
    ) -> Result<LayerVersionDescription, AwsError>;
    async fn get_layer_version(
        &self,
        layer_name: &str,
        version: i64,
    ) -> Result<LayerVersionDescription, AwsError>;
    /// Every version of the layer, newest first, across all pages.
    async fn list_layer_versions(
        &self,
        layer_name: &str,
    ) -> Result<Vec<LayerVersionDescription>, AwsError>;
    async fn delete_layer_version(
        &self,
        layer_name: &str,
        version: i64,
    ) -> Result<(), AwsError>;
}
