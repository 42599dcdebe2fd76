use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;

use crate::retry::RetryConfig;

/// Which Lambda control plane the controller talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// In-process emulator; useful for local clusters and demos.
    Memory,
    /// The real AWS API (requires the `aws-sdk` feature).
    Aws,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" | "inmemory" => Ok(Backend::Memory),
            "aws" | "sdk" => Ok(Backend::Aws),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct ControllerConfig {
    #[envconfig(from = "LAMBDA_CTRL_PROFILE", default = "dev")]
    pub profile: String,

    #[envconfig(from = "HTTP_PORT", default = "8088")]
    pub http_port: u16,

    /// Restrict watches to one namespace; all namespaces when unset.
    /// Env: LAMBDA_CTRL_WATCH_NAMESPACE
    #[envconfig(from = "LAMBDA_CTRL_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    #[envconfig(from = "LAMBDA_CTRL_BACKEND", default = "memory")]
    pub backend: Backend,

    /// Allow `*Ref.from.namespace` to point outside the referrer's namespace
    /// (profile default: true in dev, false in edge/full).
    /// Env: LAMBDA_CTRL_ALLOW_CROSS_NAMESPACE_REFS
    #[envconfig(from = "LAMBDA_CTRL_ALLOW_CROSS_NAMESPACE_REFS")]
    pub allow_cross_namespace_refs: Option<bool>,

    #[envconfig(nested)]
    pub aws: AwsSettings,

    #[envconfig(nested)]
    pub timing: TimingConfig,

    #[envconfig(nested)]
    pub retry: RetrySettings,
}

#[derive(Envconfig, Clone, Debug)]
pub struct AwsSettings {
    #[envconfig(from = "LAMBDA_CTRL_AWS_REGION", default = "us-west-2")]
    pub region: String,
    /// Account id used in ARNs minted by the in-memory backend and reported
    /// in `ackResourceMetadata.ownerAccountID`.
    #[envconfig(from = "LAMBDA_CTRL_AWS_ACCOUNT_ID", default = "000000000000")]
    pub account_id: String,
    /// Env: LAMBDA_CTRL_AWS_ENDPOINT_URL (e.g. a localstack endpoint)
    #[envconfig(from = "LAMBDA_CTRL_AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,
}

#[derive(Envconfig, Clone, Debug)]
pub struct TimingConfig {
    /// Periodic drift check for synced resources.
    #[envconfig(from = "LAMBDA_CTRL_RESYNC_SECS", default = "600")]
    pub resync_secs: u64,
    /// Requeue delay while a function is in the `Pending` state.
    #[envconfig(from = "LAMBDA_CTRL_PENDING_REQUEUE_SECS", default = "5")]
    pub pending_requeue_secs: u64,
    /// Requeue delay after AWS rejects a container image that is not yet pushed.
    #[envconfig(from = "LAMBDA_CTRL_SOURCE_IMAGE_REQUEUE_SECS", default = "60")]
    pub source_image_requeue_secs: u64,
    #[envconfig(from = "LAMBDA_CTRL_REFERENCE_REQUEUE_SECS", default = "10")]
    pub reference_requeue_secs: u64,
    /// Requeue delay while a sub-resource settles after an update.
    #[envconfig(from = "LAMBDA_CTRL_SETTLE_REQUEUE_SECS", default = "2")]
    pub settle_requeue_secs: u64,
    /// Upper bound on waiting for AWS to report a deleted resource as absent.
    #[envconfig(from = "LAMBDA_CTRL_DELETE_TIMEOUT_SECS", default = "30")]
    pub delete_timeout_secs: u64,
    #[envconfig(from = "LAMBDA_CTRL_DELETE_POLL_MS", default = "500")]
    pub delete_poll_ms: u64,
    /// Ceiling for the per-object error backoff.
    #[envconfig(from = "LAMBDA_CTRL_ERROR_BACKOFF_MAX_SECS", default = "300")]
    pub error_backoff_max_secs: u64,
}

#[derive(Envconfig, Clone, Debug)]
pub struct RetrySettings {
    #[envconfig(from = "LAMBDA_CTRL_RETRY_MAX_ATTEMPTS", default = "3")]
    pub max_attempts: u32,
    #[envconfig(from = "LAMBDA_CTRL_RETRY_INITIAL_MS", default = "200")]
    pub initial_ms: u64,
    #[envconfig(from = "LAMBDA_CTRL_RETRY_MAX_MS", default = "5000")]
    pub max_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            resync_secs: 600,
            pending_requeue_secs: 5,
            source_image_requeue_secs: 60,
            reference_requeue_secs: 10,
            settle_requeue_secs: 2,
            delete_timeout_secs: 30,
            delete_poll_ms: 500,
            error_backoff_max_secs: 300,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_ms: 200,
            max_ms: 5000,
        }
    }
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: "us-west-2".into(),
            account_id: "000000000000".into(),
            endpoint_url: None,
        }
    }
}

impl TimingConfig {
    pub fn resync(&self) -> Duration {
        Duration::from_secs(self.resync_secs)
    }
    pub fn pending_requeue(&self) -> Duration {
        Duration::from_secs(self.pending_requeue_secs)
    }
    pub fn source_image_requeue(&self) -> Duration {
        Duration::from_secs(self.source_image_requeue_secs)
    }
    pub fn reference_requeue(&self) -> Duration {
        Duration::from_secs(self.reference_requeue_secs)
    }
    pub fn settle_requeue(&self) -> Duration {
        Duration::from_secs(self.settle_requeue_secs)
    }
    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }
    pub fn delete_poll(&self) -> Duration {
        Duration::from_millis(self.delete_poll_ms)
    }
    pub fn error_backoff_max(&self) -> Duration {
        Duration::from_secs(self.error_backoff_max_secs)
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_ms),
            max_delay: Duration::from_millis(self.max_ms),
            backoff_multiplier: 2.0,
        }
    }
}

impl ControllerConfig {
    /// Apply profile → defaults mapping, while respecting explicit env overrides.
    ///
    /// - dev: cross-namespace references allowed
    /// - edge / full: cross-namespace references denied
    pub fn apply_profile_defaults(mut self) -> Self {
        let def_cross_ns = match self.profile.as_str() {
            "edge" | "full" | "prod" | "production" => false,
            _ /* dev */ => true,
        };
        if self.allow_cross_namespace_refs.is_none() {
            self.allow_cross_namespace_refs = Some(def_cross_ns);
        }
        self
    }

    pub fn cross_namespace_allowed(&self) -> bool {
        self.allow_cross_namespace_refs.unwrap_or(false)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            profile: "dev".into(),
            http_port: 8088,
            watch_namespace: None,
            backend: Backend::Memory,
            allow_cross_namespace_refs: None,
            aws: AwsSettings::default(),
            timing: TimingConfig::default(),
            retry: RetrySettings::default(),
        }
        .apply_profile_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(profile: &str) -> ControllerConfig {
        ControllerConfig {
            profile: profile.to_string(),
            http_port: 8088,
            watch_namespace: None,
            backend: Backend::Memory,
            allow_cross_namespace_refs: None,
            aws: AwsSettings::default(),
            timing: TimingConfig::default(),
            retry: RetrySettings::default(),
        }
    }

    #[test]
    fn profile_defaults_dev() {
        let cfg = base("dev").apply_profile_defaults();
        assert_eq!(cfg.allow_cross_namespace_refs, Some(true));
        assert!(cfg.cross_namespace_allowed());
    }

    #[test]
    fn profile_defaults_full() {
        for p in ["edge", "full", "prod", "production"] {
            let cfg = base(p).apply_profile_defaults();
            assert_eq!(cfg.allow_cross_namespace_refs, Some(false), "{p}");
        }
    }

    #[test]
    fn profile_defaults_respect_env_overrides() {
        let mut cfg = base("full");
        cfg.allow_cross_namespace_refs = Some(true);
        let cfg = cfg.apply_profile_defaults();
        assert_eq!(cfg.allow_cross_namespace_refs, Some(true));
    }

    #[test]
    fn backend_parses_aliases() {
        assert_eq!("memory".parse::<Backend>(), Ok(Backend::Memory));
        assert_eq!("AWS".parse::<Backend>(), Ok(Backend::Aws));
        assert!("gcp".parse::<Backend>().is_err());
    }

    #[test]
    fn retry_settings_never_yield_zero_attempts() {
        let settings = RetrySettings {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(settings.to_retry_config().max_attempts, 1);
    }
}
