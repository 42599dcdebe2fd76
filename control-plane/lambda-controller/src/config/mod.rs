pub mod types;

pub use types::{Backend, ControllerConfig, RetrySettings, TimingConfig};
