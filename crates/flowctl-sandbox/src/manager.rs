//! Sandbox lifecycle management.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ImagePullPolicy, SandboxConfig};
use crate::error::{SandboxError, SandboxResult};
use crate::runtime::{CommandOutput, ContainerInfo, ContainerRuntime, DockerCli};

/// Prompt shown before removing an existing sandbox.
pub const REMOVE_PROMPT: &str = "Delete existing sandbox cluster [y/n]: ";

const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Manager for the local sandbox container.
pub struct SandboxManager {
    runtime: Arc<dyn ContainerRuntime>,
    config: SandboxConfig,
}

impl SandboxManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: SandboxConfig) -> Self {
        Self { runtime, config }
    }

    /// Create a manager over the Docker CLI.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Unavailable`] if `docker` does not answer.
    pub fn docker(config: SandboxConfig) -> SandboxResult<Self> {
        let cli = DockerCli::new();
        cli.check_available()?;
        Ok(Self::new(Arc::new(cli), config))
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Find the sandbox container by name.
    pub async fn get_sandbox(&self) -> SandboxResult<Option<ContainerInfo>> {
        let containers = self.runtime.list_containers().await?;
        Ok(containers
            .into_iter()
            .find(|c| c.has_name(&self.config.name)))
    }

    /// Remove an existing sandbox after confirmation.
    ///
    /// Writes [`REMOVE_PROMPT`] to `output` and reads one line from `input`;
    /// anything other than `y`/`yes` aborts with [`SandboxError::RemovalDeclined`].
    pub async fn remove_existing<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> SandboxResult<()> {
        let Some(container) = self.get_sandbox().await? else {
            return Ok(());
        };

        write!(output, "{}", REMOVE_PROMPT)?;
        output.flush()?;
        if !read_confirmation(input)? {
            return Err(SandboxError::RemovalDeclined(self.config.name.clone()));
        }

        tracing::info!(id = %container.id, "Removing existing sandbox");
        self.runtime.remove_container(&container.id).await
    }

    /// Pull the image according to the pull policy. Returns whether a pull happened.
    pub async fn pull_image(&self) -> SandboxResult<bool> {
        let image = &self.config.image;
        let pull = match self.config.pull_policy {
            ImagePullPolicy::Always => true,
            ImagePullPolicy::IfNotPresent => !self.runtime.image_exists(image).await?,
            ImagePullPolicy::Never => false,
        };
        if pull {
            tracing::info!(%image, "Pulling sandbox image");
            self.runtime.pull_image(image).await?;
        }
        Ok(pull)
    }

    /// Start a fresh sandbox and wait until it is ready. Returns the container id.
    pub async fn start<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> SandboxResult<String> {
        self.config.validate()?;
        self.remove_existing(input, output).await?;
        self.pull_image().await?;

        let id = self.runtime.run_container(&self.config).await?;
        tracing::info!(%id, name = %self.config.name, "Sandbox container started");

        self.wait_until_ready().await?;
        Ok(id)
    }

    /// Poll the sandbox logs until the ready message appears.
    pub async fn wait_until_ready(&self) -> SandboxResult<()> {
        let wait = async {
            loop {
                let logs = self.runtime.logs(&self.config.name).await?;
                if logs.contains(&self.config.ready_message) {
                    return Ok::<(), SandboxError>(());
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(self.config.ready_timeout, wait)
            .await
            .map_err(|_| SandboxError::Timeout(self.config.ready_timeout))?
    }

    /// Force-remove the sandbox container. Returns the removed container, if any.
    pub async fn teardown(&self) -> SandboxResult<Option<ContainerInfo>> {
        let container = self.get_sandbox().await?;
        if let Some(container) = &container {
            self.runtime.remove_container(&container.id).await?;
            tracing::info!(id = %container.id, "Sandbox removed");
        }
        Ok(container)
    }

    /// Run a command inside the sandbox.
    pub async fn exec(&self, command: &[String]) -> SandboxResult<CommandOutput> {
        if command.is_empty() {
            return Err(SandboxError::ConfigError("no command given".to_string()));
        }
        if self.get_sandbox().await?.is_none() {
            return Err(SandboxError::NotFound(self.config.name.clone()));
        }
        self.runtime.exec(&self.config.name, command).await
    }
}

/// Read a y/n answer.
fn read_confirmation<R: BufRead>(input: &mut R) -> std::io::Result<bool> {
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::config::DEFAULT_IMAGE;
    use crate::mock::MockRuntime;

    fn manager(runtime: Arc<MockRuntime>, config: SandboxConfig) -> SandboxManager {
        SandboxManager::new(runtime, config)
    }

    fn ready_runtime() -> MockRuntime {
        MockRuntime::new().with_logs("booting...\nSandbox is ready\n")
    }

    #[tokio::test]
    async fn test_get_sandbox() {
        let runtime = Arc::new(MockRuntime::new().with_container(
            "flowctl-sandbox",
            DEFAULT_IMAGE,
            "running",
        ));
        let sandbox = manager(runtime, SandboxConfig::new()).get_sandbox().await.unwrap();
        assert_eq!(sandbox.unwrap().state, "running");

        let runtime =
            Arc::new(MockRuntime::new().with_container("other", DEFAULT_IMAGE, "running"));
        let sandbox = manager(runtime, SandboxConfig::new()).get_sandbox().await.unwrap();
        assert!(sandbox.is_none());
    }

    #[tokio::test]
    async fn test_remove_existing_with_yes() {
        let runtime = Arc::new(MockRuntime::new().with_container(
            "flowctl-sandbox",
            DEFAULT_IMAGE,
            "running",
        ));
        let mgr = manager(runtime.clone(), SandboxConfig::new());
        let mut out = Vec::new();

        mgr.remove_existing(&mut Cursor::new("y\n"), &mut out).await.unwrap();
        assert!(runtime.called("remove flowctl-sandbox-id"));
        assert_eq!(String::from_utf8(out).unwrap(), REMOVE_PROMPT);
    }

    #[tokio::test]
    async fn test_remove_existing_declined() {
        let runtime = Arc::new(MockRuntime::new().with_container(
            "flowctl-sandbox",
            DEFAULT_IMAGE,
            "running",
        ));
        let mgr = manager(runtime.clone(), SandboxConfig::new());

        let err = mgr
            .remove_existing(&mut Cursor::new("n"), &mut std::io::sink())
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::RemovalDeclined(_)));
        assert!(!runtime.called("remove"));
    }

    #[tokio::test]
    async fn test_remove_existing_without_sandbox_does_not_prompt() {
        let runtime = Arc::new(MockRuntime::new());
        let mut out = Vec::new();
        manager(runtime, SandboxConfig::new())
            .remove_existing(&mut Cursor::new("n"), &mut out)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_pull_policies() {
        let runtime = Arc::new(MockRuntime::new().with_image("img:1"));

        let always = SandboxConfig::new().with_image("img:1");
        assert!(manager(runtime.clone(), always).pull_image().await.unwrap());

        let if_not_present = SandboxConfig::new()
            .with_image("img:1")
            .with_pull_policy(ImagePullPolicy::IfNotPresent);
        assert!(!manager(runtime.clone(), if_not_present).pull_image().await.unwrap());

        let missing = SandboxConfig::new()
            .with_image("img:2")
            .with_pull_policy(ImagePullPolicy::IfNotPresent);
        assert!(manager(runtime.clone(), missing).pull_image().await.unwrap());

        let never = SandboxConfig::new()
            .with_image("img:3")
            .with_pull_policy(ImagePullPolicy::Never);
        assert!(!manager(runtime.clone(), never).pull_image().await.unwrap());
        assert!(!runtime.called("pull img:3"));
    }

    #[tokio::test]
    async fn test_pull_failure_propagates() {
        let runtime = Arc::new(MockRuntime::new().failing_pull());
        let err = manager(runtime, SandboxConfig::new()).pull_image().await.unwrap_err();
        assert!(matches!(err, SandboxError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_start_replaces_existing_sandbox() {
        let runtime = Arc::new(ready_runtime().with_container("flowctl-sandbox", "old", "exited"));
        let mgr = manager(runtime.clone(), SandboxConfig::new());

        let id = mgr
            .start(&mut Cursor::new("yes\n"), &mut std::io::sink())
            .await
            .unwrap();
        assert_eq!(id, "flowctl-sandbox-id");
        assert_eq!(
            runtime.calls(),
            vec![
                "list".to_string(),
                "remove flowctl-sandbox-id".to_string(),
                format!("pull {}", DEFAULT_IMAGE),
                "run flowctl-sandbox".to_string(),
                "logs flowctl-sandbox".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ready_times_out() {
        let runtime = Arc::new(MockRuntime::new().with_logs("still booting"));
        let config = SandboxConfig::new().with_ready_timeout(Duration::from_secs(10));
        let err = manager(runtime.clone(), config).wait_until_ready().await.unwrap_err();
        assert!(matches!(err, SandboxError::Timeout(_)));
        assert!(runtime.calls().len() > 1);
    }

    #[tokio::test]
    async fn test_teardown() {
        let runtime = Arc::new(MockRuntime::new().with_container(
            "flowctl-sandbox",
            DEFAULT_IMAGE,
            "running",
        ));
        let mgr = manager(runtime.clone(), SandboxConfig::new());

        let removed = mgr.teardown().await.unwrap();
        assert_eq!(removed.unwrap().id, "flowctl-sandbox-id");
        assert!(mgr.get_sandbox().await.unwrap().is_none());
        assert!(mgr.teardown().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exec() {
        let runtime = Arc::new(MockRuntime::new().with_container(
            "flowctl-sandbox",
            DEFAULT_IMAGE,
            "running",
        ));
        let mgr = manager(runtime.clone(), SandboxConfig::new());

        let output = mgr.exec(&["ls".to_string(), "-la".to_string()]).await.unwrap();
        assert_eq!(output.stdout, "ls -la");
        assert!(runtime.called("exec flowctl-sandbox ls -la"));

        assert!(matches!(mgr.exec(&[]).await, Err(SandboxError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_exec_without_sandbox() {
        let mgr = manager(Arc::new(MockRuntime::new()), SandboxConfig::new());
        let err = mgr.exec(&["ls".to_string()]).await.unwrap_err();
        assert!(matches!(err, SandboxError::NotFound(_)));
    }
}
