pub mod config;
pub mod health;
pub mod orchestrator;
pub mod setup;

pub use config::{
    ConfigError, ConfigResult, DeployConfig, HealthConfig, DEFAULT_CONFIG_FILE, PROJECT_ID_ENV,
    PROJECT_PLACEHOLDER,
};
pub use health::{HealthBody, HealthError, HealthProbe, HealthReport, HealthResult, HealthState};
pub use orchestrator::{DeployError, DeployReport, DeployResult, DeployState, Orchestrator, Step};
pub use setup::{run_setup, Prompt, SetupOptions, SetupOutcome, StdinPrompt};
