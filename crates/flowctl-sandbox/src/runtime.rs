//! Container runtime abstraction and the Docker CLI implementation.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::config::SandboxConfig;
use crate::error::{SandboxError, SandboxResult};
use crate::platform::RuntimeStatus;

/// Output of a command run through the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Combine stdout and stderr for display.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// A container as listed by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Comma-separated container names.
    #[serde(rename = "Names", default)]
    pub names: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    /// Human-readable status, e.g. "Up 5 minutes".
    #[serde(rename = "Status", default)]
    pub status: String,
    /// Machine state, e.g. "running" or "exited".
    #[serde(rename = "State", default)]
    pub state: String,
}

impl ContainerInfo {
    /// Whether the container carries `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.names
            .split(',')
            .any(|n| n.trim().trim_start_matches('/') == name)
    }
}

/// Operations the sandbox needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List containers, including stopped ones.
    async fn list_containers(&self) -> SandboxResult<Vec<ContainerInfo>>;

    /// Force-remove a container.
    async fn remove_container(&self, id: &str) -> SandboxResult<()>;

    async fn pull_image(&self, image: &str) -> SandboxResult<()>;

    /// Whether the image is present locally.
    async fn image_exists(&self, image: &str) -> SandboxResult<bool>;

    /// Create and start the sandbox container, returning its id.
    async fn run_container(&self, config: &SandboxConfig) -> SandboxResult<String>;

    /// Run a command inside a container.
    async fn exec(&self, container: &str, command: &[String]) -> SandboxResult<CommandOutput>;

    /// Logs of a container so far.
    async fn logs(&self, container: &str) -> SandboxResult<String>;
}

/// [`ContainerRuntime`] driving the `docker` command-line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different Docker-compatible binary (e.g. `podman`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Fail unless the runtime binary answers.
    pub fn check_available(&self) -> SandboxResult<()> {
        match RuntimeStatus::detect(&self.binary) {
            RuntimeStatus::Available { .. } => Ok(()),
            RuntimeStatus::Missing {
                binary,
                install_hint,
                ..
            } => Err(SandboxError::Unavailable {
                message: format!("{binary} is not installed or not running"),
                install_hint,
            }),
        }
    }

    /// Arguments of `docker run` for a sandbox.
    pub fn run_args(config: &SandboxConfig) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            config.name.clone(),
            "--privileged".to_string(),
        ];
        for port in &config.ports {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(source) = &config.source {
            args.push("-v".to_string());
            args.push(format!(
                "{}:{}",
                source.display(),
                crate::config::SOURCE_MOUNT_TARGET
            ));
        }
        for (key, value) in &config.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(config.image.clone());
        args
    }

    async fn output(&self, args: &[String]) -> SandboxResult<CommandOutput> {
        tracing::debug!(binary = %self.binary, ?args, "Running container runtime command");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        Ok(CommandOutput::new(
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            output.status.code().unwrap_or(-1),
        ))
    }

    async fn checked(&self, args: &[String]) -> SandboxResult<CommandOutput> {
        let output = self.output(args).await?;
        if !output.success() {
            return Err(SandboxError::CommandFailed {
                command: format!("{} {}", self.binary, args.join(" ")),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn list_containers(&self) -> SandboxResult<Vec<ContainerInfo>> {
        let output = self
            .checked(&strings(&["ps", "-a", "--no-trunc", "--format", "{{json .}}"]))
            .await?;
        parse_container_list(&output.stdout)
    }

    async fn remove_container(&self, id: &str) -> SandboxResult<()> {
        self.checked(&strings(&["rm", "-f", id])).await?;
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> SandboxResult<()> {
        self.checked(&strings(&["pull", image])).await?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> SandboxResult<bool> {
        let output = self.checked(&strings(&["images", "-q", image])).await?;
        Ok(!output.stdout.trim().is_empty())
    }

    async fn run_container(&self, config: &SandboxConfig) -> SandboxResult<String> {
        let output = self.checked(&Self::run_args(config)).await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn exec(&self, container: &str, command: &[String]) -> SandboxResult<CommandOutput> {
        let mut args = strings(&["exec", container]);
        args.extend(command.iter().cloned());
        self.output(&args).await
    }

    async fn logs(&self, container: &str) -> SandboxResult<String> {
        let output = self.checked(&strings(&["logs", container])).await?;
        Ok(output.combined_output())
    }
}

/// Parse `docker ps --format '{{json .}}'` output, one object per line.
pub fn parse_container_list(stdout: &str) -> SandboxResult<Vec<ContainerInfo>> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(SandboxError::from))
        .collect()
}
