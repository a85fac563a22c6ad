use crate::types::{Account, ServiceEndpoint, ServiceName};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("'{tool}' is not installed or not on PATH. Install the Google Cloud SDK: https://cloud.google.com/sdk/docs/install")]
    ToolMissing { tool: String },

    #[error("No active gcloud account. Run: gcloud auth login")]
    NotAuthenticated,

    #[error("Command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Command `{command}` timed out after {timeout}s")]
    CommandTimeout { command: String, timeout: u64 },

    #[error("Remote deploy failed: {reason}")]
    RemoteDeployFailure { reason: String },

    #[error("Service URL unavailable: {reason}")]
    EndpointUnavailable { reason: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Local tooling the platform is driven through.
#[async_trait]
pub trait Toolchain: Send + Sync {
    fn tool_name(&self) -> &str;

    async fn ensure_installed(&self) -> PlatformResult<()>;

    async fn active_account(&self) -> PlatformResult<Account>;
}

#[async_trait]
pub trait ProjectConfigurer: Send + Sync {
    async fn set_project(&self, project_id: &str) -> PlatformResult<()>;
}

/// Enabling an already-enabled service must succeed.
#[async_trait]
pub trait ServiceEnabler: Send + Sync {
    async fn enable_service(&self, service: &ServiceName) -> PlatformResult<()>;
}

/// Submits a manifest and blocks until the remote build-and-release ends.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, manifest: &Path) -> PlatformResult<()>;
}

#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve_endpoint(&self) -> PlatformResult<ServiceEndpoint>;
}

/// Everything the orchestrator needs from a cloud platform.
pub trait CloudPlatform:
    Toolchain + ProjectConfigurer + ServiceEnabler + Deployer + EndpointResolver
{
}

impl<T> CloudPlatform for T where
    T: Toolchain + ProjectConfigurer + ServiceEnabler + Deployer + EndpointResolver
{
}
