//! Config directory discovery and target resolution.
//!
//! Resolution order for connection settings (later overrides earlier):
//! 1. `defaults` section of `<config dir>/config.yaml`
//! 2. The selected context (`--context` or `current-context`)
//! 3. CLI flags and environment variables (passed in as [`TargetOverrides`])

use std::path::PathBuf;
use std::time::Duration;

use crate::{ClientConfig, ConfigError, Result};

/// Application name for XDG directory resolution.
const APP_NAME: &str = "flowctl";

/// Environment variable to override the config directory.
///
/// When set, this takes precedence over the platform default.
pub const CONFIG_DIR_ENV: &str = "FLOWCTL_CONFIG_DIR";

/// Environment variable naming the admin endpoint (read by the CLI flag parser).
pub const ADMIN_URL_ENV: &str = "FLOWCTL_ADMIN_URL";

/// Get the config directory for flowctl.
///
/// Checks `FLOWCTL_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/flowctl` on Linux, `~/Library/Application Support/flowctl` on macOS).
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Directory for rolling log files.
pub fn logs_dir() -> PathBuf {
    config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Connection settings supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct TargetOverrides {
    /// Explicit admin endpoint.
    pub admin: Option<String>,
    /// Context to use instead of `current-context`.
    pub context: Option<String>,
    /// Project override.
    pub project: Option<String>,
    /// Domain override.
    pub domain: Option<String>,
}

/// Fully resolved connection target for one invocation.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Admin service base URL.
    pub admin_url: String,
    /// Name of the context the settings came from, if any.
    pub context: Option<String>,
    /// Resolved project.
    pub project: Option<String>,
    /// Resolved domain.
    pub domain: Option<String>,
    /// Bearer token, if auth is configured.
    pub token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl ResolvedTarget {
    /// Resolved project, or an error naming the missing flag.
    pub fn require_project(&self) -> Result<&str> {
        self.project
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "project".to_string(),
                context: "flags (--project) or the active context".to_string(),
            })
    }

    /// Resolved domain, or an error naming the missing flag.
    pub fn require_domain(&self) -> Result<&str> {
        self.domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "domain".to_string(),
                context: "flags (--domain) or the active context".to_string(),
            })
    }
}

/// Layer CLI overrides on top of the selected context and file defaults.
pub fn resolve_target(
    config: &ClientConfig,
    overrides: &TargetOverrides,
) -> Result<ResolvedTarget> {
    let context = match overrides.context.as_deref() {
        Some(name) => Some(
            config
                .context(name)
                .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))?,
        ),
        None => config.current(),
    };

    let admin_url = overrides
        .admin
        .clone()
        .or_else(|| context.map(|c| c.admin.clone()))
        .filter(|url| !url.is_empty())
        .ok_or(ConfigError::NoAdminEndpoint)?;

    let project = overrides
        .project
        .clone()
        .or_else(|| context.and_then(|c| c.project.clone()))
        .or_else(|| config.defaults.project.clone());

    let domain = overrides
        .domain
        .clone()
        .or_else(|| context.and_then(|c| c.domain.clone()))
        .or_else(|| config.defaults.domain.clone());

    let token = match context.and_then(|c| c.auth.as_ref()) {
        Some(auth) => auth.resolve()?,
        None => None,
    };

    let timeout = context
        .and_then(|c| c.timeout)
        .unwrap_or(config.defaults.timeout);

    Ok(ResolvedTarget {
        admin_url,
        context: context.map(|c| c.name.clone()),
        project,
        domain,
        token,
        timeout: Duration::from_secs(timeout),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
