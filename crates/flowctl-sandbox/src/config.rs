//! Sandbox configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SandboxError;

/// Default sandbox container name.
pub const DEFAULT_SANDBOX_NAME: &str = "flowctl-sandbox";

/// Default sandbox image.
pub const DEFAULT_IMAGE: &str = "ghcr.io/flowctl/sandbox:latest";

/// Port the admin service listens on inside the sandbox.
pub const ADMIN_PORT: u16 = 30080;

/// Where the source directory is mounted inside the sandbox.
pub const SOURCE_MOUNT_TARGET: &str = "/root";

/// Log line the sandbox prints once the control plane is serving.
pub const DEFAULT_READY_MESSAGE: &str = "Sandbox is ready";

/// When to pull the sandbox image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImagePullPolicy {
    #[default]
    Always,
    IfNotPresent,
    Never,
}

impl ImagePullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePullPolicy::Always => "always",
            ImagePullPolicy::IfNotPresent => "if-not-present",
            ImagePullPolicy::Never => "never",
        }
    }
}

impl fmt::Display for ImagePullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImagePullPolicy {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "always" => Ok(ImagePullPolicy::Always),
            "if-not-present" | "ifnotpresent" => Ok(ImagePullPolicy::IfNotPresent),
            "never" => Ok(ImagePullPolicy::Never),
            other => Err(SandboxError::ConfigError(format!(
                "unknown image pull policy: {other}"
            ))),
        }
    }
}

/// A host-to-container port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl PortMapping {
    /// Map a port to the same port on the host.
    pub fn same(port: u16) -> Self {
        Self {
            host: port,
            container: port,
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// Configuration for the local sandbox container.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Container name.
    pub name: String,

    /// Image to run.
    pub image: String,

    pub pull_policy: ImagePullPolicy,

    /// Published ports.
    pub ports: Vec<PortMapping>,

    /// Host directory mounted at [`SOURCE_MOUNT_TARGET`].
    pub source: Option<PathBuf>,

    /// Extra environment variables.
    pub env: Vec<(String, String)>,

    /// Log line signalling readiness.
    pub ready_message: String,

    /// How long to wait for readiness.
    pub ready_timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SANDBOX_NAME.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            pull_policy: ImagePullPolicy::default(),
            ports: vec![
                PortMapping::same(ADMIN_PORT),
                PortMapping::same(30081),
                PortMapping::same(30084),
            ],
            source: None,
            env: Vec::new(),
            ready_message: DEFAULT_READY_MESSAGE.to_string(),
            ready_timeout: Duration::from_secs(600),
        }
    }
}

impl SandboxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_pull_policy(mut self, policy: ImagePullPolicy) -> Self {
        self.pull_policy = policy;
        self
    }

    /// Mount a host source directory.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add an environment variable.
    pub fn add_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Admin endpoint of a sandbox started with this configuration.
    pub fn admin_endpoint(&self) -> String {
        let port = self
            .ports
            .iter()
            .find(|p| p.container == ADMIN_PORT)
            .map(|p| p.host)
            .unwrap_or(ADMIN_PORT);
        format!("http://localhost:{}", port)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), SandboxError> {
        if self.name.trim().is_empty() {
            return Err(SandboxError::ConfigError("sandbox name is empty".to_string()));
        }
        if self.image.trim().is_empty() {
            return Err(SandboxError::ConfigError("sandbox image is empty".to_string()));
        }
        if let Some(source) = &self.source
            && !source.is_dir()
        {
            return Err(SandboxError::ConfigError(format!(
                "source {} is not a directory",
                source.display()
            )));
        }
        Ok(())
    }
}
