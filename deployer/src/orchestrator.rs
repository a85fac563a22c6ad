//! Deployment pipeline.
//!
//! ```text
//! Start -> ToolsVerified -> Authenticated -> ArtifactsVerified
//!       -> ProjectConfigured -> ServicesEnabled -> Deployed -> Reported
//! ```
//!
//! Each arrow is one [`Step`]. A failing step moves the pipeline to
//! [`DeployState::Failed`] and nothing after it runs. There is no rollback
//! and no retry; the operator fixes the reported condition and runs again.

use crate::config::{ConfigError, DeployConfig};
use crate::health::HealthError;
use chrono::{DateTime, Utc};
use manifest::{ManifestEnv, ManifestError};
use platform::{Account, CloudPlatform, PlatformError, ServiceEndpoint};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(#[from] HealthError),

    #[error("Step '{step}' cannot run in state {state}")]
    OutOfOrder { step: Step, state: DeployState },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployState {
    Start,
    ToolsVerified,
    Authenticated,
    ArtifactsVerified,
    ProjectConfigured,
    ServicesEnabled,
    Deployed,
    Reported,
    /// Terminal; carries the message of the error that stopped the run
    Failed(String),
}

impl DeployState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployState::Reported | DeployState::Failed(_))
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployState::Failed(_) => write!(f, "Failed"),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    CheckTools,
    CheckAuth,
    CheckArtifacts,
    ConfigureProject,
    EnableServices,
    Deploy,
    ReportEndpoint,
}

impl Step {
    /// Full pipeline, in execution order.
    pub const ALL: [Step; 7] = [
        Step::CheckTools,
        Step::CheckAuth,
        Step::CheckArtifacts,
        Step::ConfigureProject,
        Step::EnableServices,
        Step::Deploy,
        Step::ReportEndpoint,
    ];

    /// Checks that touch nothing remote.
    pub const PREFLIGHT: [Step; 3] = [Step::CheckTools, Step::CheckAuth, Step::CheckArtifacts];

    pub fn name(&self) -> &'static str {
        match self {
            Step::CheckTools => "tool check",
            Step::CheckAuth => "auth check",
            Step::CheckArtifacts => "artifact check",
            Step::ConfigureProject => "project configuration",
            Step::EnableServices => "service enablement",
            Step::Deploy => "deploy",
            Step::ReportEndpoint => "endpoint retrieval",
        }
    }

    pub fn requires(&self) -> DeployState {
        match self {
            Step::CheckTools => DeployState::Start,
            Step::CheckAuth => DeployState::ToolsVerified,
            Step::CheckArtifacts => DeployState::Authenticated,
            Step::ConfigureProject => DeployState::ArtifactsVerified,
            Step::EnableServices => DeployState::ProjectConfigured,
            Step::Deploy => DeployState::ServicesEnabled,
            Step::ReportEndpoint => DeployState::Deployed,
        }
    }

    pub fn reaches(&self) -> DeployState {
        match self {
            Step::CheckTools => DeployState::ToolsVerified,
            Step::CheckAuth => DeployState::Authenticated,
            Step::CheckArtifacts => DeployState::ArtifactsVerified,
            Step::ConfigureProject => DeployState::ProjectConfigured,
            Step::EnableServices => DeployState::ServicesEnabled,
            Step::Deploy => DeployState::Deployed,
            Step::ReportEndpoint => DeployState::Reported,
        }
    }

    pub fn is_preflight(&self) -> bool {
        Self::PREFLIGHT.contains(self)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
    pub project_id: String,
    pub account: Option<String>,
    pub endpoint: Option<ServiceEndpoint>,
    pub states: Vec<DeployState>,
    pub unconfigured_env: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Orchestrator {
    config: DeployConfig,
    platform: Box<dyn CloudPlatform>,
    state: DeployState,
    history: Vec<DeployState>,
    account: Option<Account>,
    endpoint: Option<ServiceEndpoint>,
    unconfigured_env: Vec<String>,
}

impl Orchestrator {
    pub fn new(config: DeployConfig, platform: Box<dyn CloudPlatform>) -> DeployResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            platform,
            state: DeployState::Start,
            history: vec![DeployState::Start],
            account: None,
            endpoint: None,
            unconfigured_env: Vec::new(),
        })
    }

    pub fn state(&self) -> &DeployState {
        &self.state
    }

    pub fn history(&self) -> &[DeployState] {
        &self.history
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn endpoint(&self) -> Option<&ServiceEndpoint> {
        self.endpoint.as_ref()
    }

    /// Tool, auth and artifact checks only.
    pub async fn preflight(&mut self) -> DeployResult<DeployReport> {
        self.run(&Step::PREFLIGHT).await
    }

    pub async fn deploy(&mut self) -> DeployResult<DeployReport> {
        self.run(&Step::ALL).await
    }

    /// Runs `steps` in order, stopping at the first failure.
    pub async fn run(&mut self, steps: &[Step]) -> DeployResult<DeployReport> {
        let started_at = Utc::now();

        // A finished run keeps its outcome.
        if self.state.is_terminal() {
            if let Some(step) = steps.first() {
                return Err(DeployError::OutOfOrder {
                    step: *step,
                    state: self.state.clone(),
                });
            }
        }

        for step in steps {
            info!("Running {}", step);
            match self.run_step(*step).await {
                Ok(()) => self.transition(step.reaches()),
                Err(e) => {
                    error!("{} failed: {}", step, e);
                    println!("✗ {} failed", step);
                    self.transition(DeployState::Failed(e.to_string()));
                    return Err(e);
                }
            }
        }

        Ok(DeployReport {
            project_id: self.config.project_id.clone(),
            account: self.account.as_ref().map(|a| a.email.clone()),
            endpoint: self.endpoint.clone(),
            states: self.history.clone(),
            unconfigured_env: self.unconfigured_env.clone(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    pub async fn run_step(&mut self, step: Step) -> DeployResult<()> {
        if self.state != step.requires() {
            return Err(DeployError::OutOfOrder {
                step,
                state: self.state.clone(),
            });
        }

        match step {
            Step::CheckTools => self.check_tools().await,
            Step::CheckAuth => self.check_auth().await,
            Step::CheckArtifacts => self.check_artifacts(),
            Step::ConfigureProject => self.configure_project().await,
            Step::EnableServices => self.enable_services().await,
            Step::Deploy => self.deploy_manifest().await,
            Step::ReportEndpoint => self.report_endpoint().await,
        }
    }

    fn transition(&mut self, next: DeployState) {
        info!("State: {} -> {}", self.state, next);
        self.state = next.clone();
        self.history.push(next);
    }

    async fn check_tools(&mut self) -> DeployResult<()> {
        self.platform.ensure_installed().await?;
        println!("✓ {} is installed", self.platform.tool_name());
        Ok(())
    }

    async fn check_auth(&mut self) -> DeployResult<()> {
        let account = self.platform.active_account().await?;
        println!("✓ Authenticated as {}", account.email);
        self.account = Some(account);
        Ok(())
    }

    fn check_artifacts(&mut self) -> DeployResult<()> {
        self.config.artifacts().check(&self.config.work_dir)?;
        println!("✓ Required files present");

        let text = match std::fs::read_to_string(self.config.manifest_path()) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping inspection of {}: {}", self.config.manifest, e);
                return Ok(());
            }
        };
        let env = ManifestEnv::parse(&text);
        self.unconfigured_env = env
            .unconfigured_keys()
            .into_iter()
            .map(str::to_string)
            .collect();

        for key in &self.unconfigured_env {
            warn!(
                "{} is not set in {}; set it in the App Engine console or run `deployer setup`",
                key, self.config.manifest
            );
            println!("⚠ {} is not configured in {}", key, self.config.manifest);
        }

        Ok(())
    }

    async fn configure_project(&mut self) -> DeployResult<()> {
        self.platform.set_project(&self.config.project_id).await?;
        println!("✓ Project set to {}", self.config.project_id);
        Ok(())
    }

    async fn enable_services(&mut self) -> DeployResult<()> {
        for service in &self.config.services {
            self.platform.enable_service(service).await?;
            println!("✓ Enabled {}", service);
        }
        Ok(())
    }

    async fn deploy_manifest(&mut self) -> DeployResult<()> {
        println!("🚀 Deploying {} (this can take several minutes)...", self.config.manifest);
        self.platform
            .deploy(std::path::Path::new(&self.config.manifest))
            .await?;
        println!("✓ Deploy finished");
        Ok(())
    }

    async fn report_endpoint(&mut self) -> DeployResult<()> {
        let endpoint = self.platform.resolve_endpoint().await?;
        println!("🌐 Service URL: {}", endpoint.url);
        println!("🩺 Health check: {}", endpoint.health_url);
        self.endpoint = Some(endpoint);
        Ok(())
    }
}
