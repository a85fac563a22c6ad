//! `gcloud` subprocess implementation of the platform capabilities.
//!
//! Query commands capture their output and are bounded by
//! [`GcloudConfig::query_timeout`]. `gcloud app deploy` inherits the
//! terminal so the operator sees the remote build as it happens, and is
//! never timed out.

use crate::config::GcloudConfig;
use crate::provider::{
    Deployer, EndpointResolver, PlatformError, PlatformResult, ProjectConfigurer, ServiceEnabler,
    Toolchain,
};
use crate::types::{Account, ServiceEndpoint, ServiceName};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

pub struct GcloudPlatform {
    config: GcloudConfig,
    work_dir: PathBuf,
}

impl GcloudPlatform {
    pub fn new(config: GcloudConfig, work_dir: impl Into<PathBuf>) -> PlatformResult<Self> {
        config
            .validate()
            .map_err(|message| PlatformError::InvalidConfig { message })?;

        Ok(Self {
            config,
            work_dir: work_dir.into(),
        })
    }

    pub fn with_default_config(work_dir: impl Into<PathBuf>) -> PlatformResult<Self> {
        Self::new(GcloudConfig::default(), work_dir)
    }

    pub fn config(&self) -> &GcloudConfig {
        &self.config
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn auth_list_args() -> Vec<String> {
        vec![
            "auth".to_string(),
            "list".to_string(),
            "--filter=status:ACTIVE".to_string(),
            "--format=value(account)".to_string(),
        ]
    }

    pub fn set_project_args(project_id: &str) -> Vec<String> {
        vec![
            "config".to_string(),
            "set".to_string(),
            "project".to_string(),
            project_id.to_string(),
        ]
    }

    pub fn enable_service_args(service: &ServiceName) -> Vec<String> {
        vec![
            "services".to_string(),
            "enable".to_string(),
            service.as_str().to_string(),
        ]
    }

    pub fn deploy_args(&self, manifest: &Path) -> Vec<String> {
        let mut args = vec![
            "app".to_string(),
            "deploy".to_string(),
            manifest.display().to_string(),
        ];
        if self.config.quiet {
            args.push("--quiet".to_string());
        }
        args
    }

    pub fn describe_args() -> Vec<String> {
        vec![
            "app".to_string(),
            "describe".to_string(),
            "--format=value(defaultHostname)".to_string(),
        ]
    }

    /// First non-empty line of `gcloud auth list` output, if any.
    pub fn parse_active_account(stdout: &str) -> Option<Account> {
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|email| Account {
                email: email.to_string(),
            })
    }

    fn full_args(&self, args: &[String]) -> Vec<String> {
        let mut full = self.config.global_args();
        full.extend_from_slice(args);
        full
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.config.binary, args.join(" "))
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(args).current_dir(&self.work_dir).kill_on_drop(true);
        cmd
    }

    async fn run_captured(&self, args: &[String]) -> PlatformResult<String> {
        let args = self.full_args(args);
        let command_line = self.command_line(&args);
        debug!("Running: {}", command_line);

        let mut cmd = self.command(&args);
        cmd.stdin(Stdio::null());

        let output = match timeout(self.config.query_timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(PlatformError::CommandFailed {
                    command: command_line,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(PlatformError::CommandTimeout {
                    command: command_line,
                    timeout: self.config.query_timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(PlatformError::CommandFailed {
                command: command_line,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl Toolchain for GcloudPlatform {
    fn tool_name(&self) -> &str {
        &self.config.binary
    }

    async fn ensure_installed(&self) -> PlatformResult<()> {
        match which::which(&self.config.binary) {
            Ok(path) => {
                debug!("Found {} at {}", self.config.binary, path.display());
                Ok(())
            }
            Err(_) => Err(PlatformError::ToolMissing {
                tool: self.config.binary.clone(),
            }),
        }
    }

    async fn active_account(&self) -> PlatformResult<Account> {
        let stdout = self.run_captured(&Self::auth_list_args()).await?;
        Self::parse_active_account(&stdout).ok_or(PlatformError::NotAuthenticated)
    }
}

#[async_trait]
impl ProjectConfigurer for GcloudPlatform {
    async fn set_project(&self, project_id: &str) -> PlatformResult<()> {
        self.run_captured(&Self::set_project_args(project_id))
            .await?;
        info!("Active project set to {}", project_id);
        Ok(())
    }
}

#[async_trait]
impl ServiceEnabler for GcloudPlatform {
    async fn enable_service(&self, service: &ServiceName) -> PlatformResult<()> {
        self.run_captured(&Self::enable_service_args(service))
            .await?;
        info!("Service enabled: {}", service);
        Ok(())
    }
}

#[async_trait]
impl Deployer for GcloudPlatform {
    async fn deploy(&self, manifest: &Path) -> PlatformResult<()> {
        let args = self.full_args(&self.deploy_args(manifest));
        let command_line = self.command_line(&args);
        info!("Running: {}", command_line);

        let status = self
            .command(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| PlatformError::RemoteDeployFailure {
                reason: format!("could not start `{}`: {}", command_line, e),
            })?;

        if !status.success() {
            error!("Deploy exited with {}", status);
            return Err(PlatformError::RemoteDeployFailure {
                reason: format!("`{}` exited with {}", command_line, status),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl EndpointResolver for GcloudPlatform {
    async fn resolve_endpoint(&self) -> PlatformResult<ServiceEndpoint> {
        let stdout = self
            .run_captured(&Self::describe_args())
            .await
            .map_err(|e| PlatformError::EndpointUnavailable {
                reason: e.to_string(),
            })?;

        let hostname = stdout.trim();
        if hostname.is_empty() {
            return Err(PlatformError::EndpointUnavailable {
                reason: "gcloud reported no default hostname".to_string(),
            });
        }

        Ok(ServiceEndpoint::from_reported(hostname))
    }
}
