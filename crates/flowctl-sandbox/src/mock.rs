//! In-memory container runtime for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::SandboxConfig;
use crate::error::{SandboxError, SandboxResult};
use crate::runtime::{CommandOutput, ContainerInfo, ContainerRuntime};

/// A container runtime that keeps containers and images in memory and
/// records every call.
#[derive(Debug, Default)]
pub struct MockRuntime {
    containers: Mutex<Vec<ContainerInfo>>,
    images: Mutex<HashSet<String>>,
    logs: Mutex<String>,
    fail_pull: bool,
    call_log: Mutex<Vec<String>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing container.
    pub fn with_container(self, name: &str, image: &str, state: &str) -> Self {
        self.containers.lock().unwrap().push(ContainerInfo {
            id: format!("{name}-id"),
            names: name.to_string(),
            image: image.to_string(),
            status: format!("{state} for 5 minutes"),
            state: state.to_string(),
        });
        self
    }

    /// Start with an image already present.
    pub fn with_image(self, image: &str) -> Self {
        self.images.lock().unwrap().insert(image.to_string());
        self
    }

    /// Logs returned for every container.
    pub fn with_logs(self, logs: &str) -> Self {
        *self.logs.lock().unwrap() = logs.to_string();
        self
    }

    /// Make every pull fail.
    pub fn failing_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    /// Calls made, formatted as `operation argument`.
    pub fn calls(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }

    /// Whether any call started with `prefix`.
    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.call_log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list_containers(&self) -> SandboxResult<Vec<ContainerInfo>> {
        self.record("list".to_string());
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn remove_container(&self, id: &str) -> SandboxResult<()> {
        self.record(format!("remove {id}"));
        self.containers.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> SandboxResult<()> {
        self.record(format!("pull {image}"));
        if self.fail_pull {
            return Err(SandboxError::CommandFailed {
                command: format!("docker pull {image}"),
                exit_code: 1,
                stderr: "pull access denied".to_string(),
            });
        }
        self.images.lock().unwrap().insert(image.to_string());
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> SandboxResult<bool> {
        self.record(format!("image_exists {image}"));
        Ok(self.images.lock().unwrap().contains(image))
    }

    async fn run_container(&self, config: &SandboxConfig) -> SandboxResult<String> {
        self.record(format!("run {}", config.name));
        let id = format!("{}-id", config.name);
        self.containers.lock().unwrap().push(ContainerInfo {
            id: id.clone(),
            names: config.name.clone(),
            image: config.image.clone(),
            status: "Up 1 second".to_string(),
            state: "running".to_string(),
        });
        Ok(id)
    }

    async fn exec(&self, container: &str, command: &[String]) -> SandboxResult<CommandOutput> {
        self.record(format!("exec {container} {}", command.join(" ")));
        Ok(CommandOutput::new(command.join(" "), "", 0))
    }

    async fn logs(&self, container: &str) -> SandboxResult<String> {
        self.record(format!("logs {container}"));
        Ok(self.logs.lock().unwrap().clone())
    }
}
