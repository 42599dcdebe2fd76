use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const GROUP: &str = "lambda.services.k8s.aws";
pub const VERSION: &str = "v1alpha1";

/// Names of optional spec fields the controller applied on its last
/// successful sync. A field missing from the spec but present here was
/// removed by the user and its AWS counterpart must be deleted.
pub type ManagedFields = BTreeSet<String>;

/// Record `name` as managed when the spec sets it.
pub fn mark(set: &mut ManagedFields, name: &str, present: bool) {
    if present {
        set.insert(name.to_string());
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "lastTransitionTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum ConditionType {
    #[serde(rename = "ACK.ResourceSynced")]
    ResourceSynced,
    #[serde(rename = "ACK.Terminal")]
    Terminal,
    #[serde(rename = "ACK.Recoverable")]
    Recoverable,
    #[serde(rename = "ACK.ReferencesResolved")]
    ReferencesResolved,
    #[serde(other)]
    Unknown,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::ResourceSynced => "ACK.ResourceSynced",
            ConditionType::Terminal => "ACK.Terminal",
            ConditionType::Recoverable => "ACK.Recoverable",
            ConditionType::ReferencesResolved => "ACK.ReferencesResolved",
            ConditionType::Unknown => "Unknown",
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(v: bool) -> Self {
        if v {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct AckResourceMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(rename = "ownerAccountID")]
    pub owner_account_id: String,
    pub region: String,
}

/// Status block shared by every kind.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AckStatusFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_resource_metadata: Option<AckResourceMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub managed_fields: Vec<String>,
}

impl AckStatusFields {
    pub fn condition(&self, t: ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == t)
    }

    pub fn is_condition_true(&self, t: ConditionType) -> bool {
        self.condition(t)
            .map(|c| c.status == ConditionStatus::True)
            .unwrap_or(false)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_condition_true(ConditionType::Terminal)
    }

    pub fn is_synced(&self) -> bool {
        self.is_condition_true(ConditionType::ResourceSynced)
    }

    pub fn arn(&self) -> Option<&str> {
        self.ack_resource_metadata
            .as_ref()
            .and_then(|m| m.arn.as_deref())
    }

    pub fn managed(&self) -> ManagedFields {
        self.managed_fields.iter().cloned().collect()
    }
}

/// Implemented by every kind's status struct so the engine can reach the
/// shared block without knowing the kind.
pub trait AckStatus {
    fn ack(&self) -> &AckStatusFields;
    fn ack_mut(&mut self) -> &mut AckStatusFields;
}

macro_rules! impl_ack_status {
    ($($status:ty),+ $(,)?) => {
        $(
            impl $crate::crd::common::AckStatus for $status {
                fn ack(&self) -> &$crate::crd::common::AckStatusFields {
                    &self.ack
                }
                fn ack_mut(&mut self) -> &mut $crate::crd::common::AckStatusFields {
                    &mut self.ack
                }
            }
        )+
    };
}
pub(crate) use impl_ack_status;

/// `fooRef: {from: {name, namespace}}`
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct AwsResourceReferenceWrapper {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<AwsResourceReference>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct AwsResourceReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl AwsResourceReferenceWrapper {
    pub fn named(name: &str) -> Self {
        Self {
            from: Some(AwsResourceReference {
                name: Some(name.to_string()),
                namespace: None,
            }),
        }
    }

    pub fn in_namespace(name: &str, namespace: &str) -> Self {
        Self {
            from: Some(AwsResourceReference {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
            }),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct Destination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DestinationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Destination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Destination>,
}

/// Asynchronous invocation settings attached to a function or qualifier.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEventInvokeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_config: Option<DestinationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_event_age_in_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_retry_attempts: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedConcurrencyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_concurrent_executions: Option<i32>,
}
