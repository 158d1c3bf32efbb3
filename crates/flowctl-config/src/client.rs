//! Client configuration file.
//!
//! One YAML file lists the admin endpoints flowctl can talk to, each as a
//! named context carrying the default project/domain and credentials:
//!
//! ```yaml
//! current-context: sandbox
//!
//! contexts:
//!   - name: sandbox
//!     admin: http://localhost:30080
//!     project: demo
//!     domain: development
//!   - name: prod
//!     admin: https://admin.example.com
//!     auth:
//!       type: bearer-file
//!       path: ~/.config/flowctl/prod.token
//!
//! defaults:
//!   timeout: 30
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Name of the context `flowctl sandbox start` writes.
pub const SANDBOX_CONTEXT: &str = "sandbox";

const CLIENT_CONFIG_FILE: &str = "config.yaml";

// ─────────────────────────────────────────────────────────────────────────────
// Client Config
// ─────────────────────────────────────────────────────────────────────────────

/// Contents of `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Context used when `--context` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,

    /// Known contexts, in the order they were added.
    pub contexts: Vec<Context>,

    /// Fallbacks for values no context sets.
    pub defaults: ClientDefaults,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    /// Read the config at `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_yaml(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(ConfigError::ReadFile {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Write the config to `path`, replacing any previous file in one step.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_err = |target: &Path, source| ConfigError::WriteFile {
            path: target.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }
        let staging = path.with_extension("yaml.tmp");
        std::fs::write(&staging, self.to_yaml()?).map_err(|e| write_err(staging.as_path(), e))?;
        std::fs::rename(&staging, path).map_err(|e| write_err(path, e))
    }

    /// The selected context, if it names one that exists.
    pub fn current(&self) -> Option<&Context> {
        self.current_context
            .as_deref()
            .and_then(|name| self.context(name))
    }

    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn context_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    /// Insert `context`, replacing one of the same name. Returns true if it is new.
    pub fn upsert_context(&mut self, context: Context) -> bool {
        match self.context_mut(&context.name) {
            Some(existing) => {
                *existing = context;
                false
            }
            None => {
                self.contexts.push(context);
                true
            }
        }
    }

    /// Remove a context. Removing the current context leaves none selected.
    pub fn remove_context(&mut self, name: &str) -> Option<Context> {
        let index = self.contexts.iter().position(|c| c.name == name)?;
        if self.current_context.as_deref() == Some(name) {
            self.current_context = None;
        }
        Some(self.contexts.remove(index))
    }

    /// Select an existing context.
    pub fn use_context(&mut self, name: &str) -> Result<()> {
        if self.context(name).is_none() {
            return Err(ConfigError::ContextNotFound(name.to_string()));
        }
        self.current_context = Some(name.to_string());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// An admin endpoint plus the scope and credentials used with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Context {
    pub name: String,

    /// Admin service base URL, e.g. `http://localhost:30080`.
    pub admin: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Context {
    pub fn new(name: impl Into<String>, admin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admin: admin.into(),
            project: None,
            domain: None,
            auth: None,
            timeout: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Where the bearer token for a context comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// Unauthenticated endpoint.
    None,

    /// Token stored in a file; `~/` is expanded.
    BearerFile { path: PathBuf },

    /// Token held in an environment variable.
    BearerEnv { var: String },
}

impl AuthConfig {
    /// Read the token. A configured source that yields no token is an error.
    pub fn resolve(&self) -> Result<Option<String>> {
        match self {
            AuthConfig::None => Ok(None),
            AuthConfig::BearerFile { path } => {
                let path = expand_home(path);
                let token = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
                    path: path.display().to_string(),
                    source: e,
                })?;
                non_empty_token(token.trim(), || path.display().to_string()).map(Some)
            }
            AuthConfig::BearerEnv { var } => {
                let token = std::env::var(var).unwrap_or_default();
                non_empty_token(token.trim(), || format!("${var}")).map(Some)
            }
        }
    }
}

fn non_empty_token(token: &str, source: impl FnOnce() -> String) -> Result<String> {
    if token.is_empty() {
        return Err(ConfigError::MissingField {
            field: "token".to_string(),
            context: source(),
        });
    }
    Ok(token.to_string())
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Values used when neither flags nor the selected context provide one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientDefaults {
    /// Request timeout in seconds.
    pub timeout: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            timeout: 30,
            project: None,
            domain: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading / Saving
// ─────────────────────────────────────────────────────────────────────────────

/// `<config dir>/config.yaml`.
pub fn client_config_path() -> Option<PathBuf> {
    crate::config_dir().map(|d| d.join(CLIENT_CONFIG_FILE))
}

/// Load the client config, or an empty one if there is no file.
pub fn load_client_config() -> Result<ClientConfig> {
    match client_config_path() {
        Some(path) => ClientConfig::load(&path),
        None => Ok(ClientConfig::new()),
    }
}

pub fn save_client_config(config: &ClientConfig) -> Result<()> {
    let path = client_config_path()
        .ok_or_else(|| ConfigError::Other("Could not determine config directory".to_string()))?;
    config.save(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Context {
        Context::new(SANDBOX_CONTEXT, "http://localhost:30080")
            .with_project("demo")
            .with_domain("development")
    }

    #[test]
    fn test_parse_contexts_and_defaults() {
        let yaml = r#"
current-context: prod
contexts:
  - name: sandbox
    admin: http://localhost:30080
    project: demo
  - name: prod
    admin: https://admin.example.com
    timeout: 60
    auth:
      type: bearer-file
      path: ~/.config/flowctl/prod.token
defaults:
  project: shared
"#;
        let config = ClientConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.context("sandbox").unwrap().project.as_deref(), Some("demo"));
        let prod = config.current().unwrap();
        assert_eq!(prod.timeout, Some(60));
        assert_eq!(
            prod.auth,
            Some(AuthConfig::BearerFile {
                path: PathBuf::from("~/.config/flowctl/prod.token")
            })
        );
        assert_eq!(config.defaults.project.as_deref(), Some("shared"));
        assert_eq!(config.defaults.timeout, 30);
    }

    #[test]
    fn test_empty_file_is_empty_config() {
        let config = ClientConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ClientConfig::new());
        assert!(config.current().is_none());
    }

    #[test]
    fn test_dangling_current_context_selects_nothing() {
        let config = ClientConfig::from_yaml("current-context: gone\n").unwrap();
        assert!(config.current().is_none());
    }

    #[test]
    fn test_upsert_reports_new_contexts() {
        let mut config = ClientConfig::new();
        assert!(config.upsert_context(sandbox()));
        assert!(!config.upsert_context(Context::new(SANDBOX_CONTEXT, "http://localhost:9000")));

        assert_eq!(config.contexts.len(), 1);
        let replaced = config.context(SANDBOX_CONTEXT).unwrap();
        assert_eq!(replaced.admin, "http://localhost:9000");
        assert!(replaced.project.is_none());
    }

    #[test]
    fn test_removing_current_context_clears_selection() {
        let mut config = ClientConfig::new();
        config.upsert_context(sandbox());
        config.upsert_context(Context::new("prod", "https://admin.example.com"));
        config.use_context(SANDBOX_CONTEXT).unwrap();

        config.remove_context("prod").unwrap();
        assert_eq!(config.current_context.as_deref(), Some(SANDBOX_CONTEXT));

        config.remove_context(SANDBOX_CONTEXT).unwrap();
        assert!(config.current_context.is_none());
        assert!(config.remove_context(SANDBOX_CONTEXT).is_none());
    }

    #[test]
    fn test_use_unknown_context_fails() {
        let mut config = ClientConfig::new();
        let err = config.use_context("prod").unwrap_err();
        assert!(matches!(err, ConfigError::ContextNotFound(name) if name == "prod"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowctl").join("config.yaml");

        let mut config = ClientConfig::new();
        config.upsert_context(sandbox().with_timeout(5));
        config.use_context(SANDBOX_CONTEXT).unwrap();
        config.save(&path).unwrap();

        assert_eq!(ClientConfig::load(&path).unwrap(), config);
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    fn test_load_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ClientConfig::load(&dir.path().join("config.yaml")).unwrap();
        assert!(missing.contexts.is_empty());

        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "contexts: [ {{{").unwrap();
        assert!(matches!(
            ClientConfig::load(&path),
            Err(ConfigError::ParseYaml(_))
        ));
    }

    #[test]
    fn test_bearer_file_token_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  abc123\n").unwrap();

        let auth = AuthConfig::BearerFile { path };
        assert_eq!(auth.resolve().unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_missing_or_empty_token_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = AuthConfig::BearerFile {
            path: dir.path().join("nope"),
        };
        assert!(matches!(missing.resolve(), Err(ConfigError::ReadFile { .. })));

        let empty = AuthConfig::BearerEnv {
            var: "FLOWCTL_TEST_UNSET_TOKEN".to_string(),
        };
        assert!(matches!(empty.resolve(), Err(ConfigError::MissingField { .. })));
        assert!(AuthConfig::None.resolve().unwrap().is_none());
    }

    #[test]
    fn test_bearer_env_token() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("FLOWCTL_TEST_BEARER_TOKEN", "from-env");
        }
        let auth = AuthConfig::BearerEnv {
            var: "FLOWCTL_TEST_BEARER_TOKEN".to_string(),
        };
        assert_eq!(auth.resolve().unwrap().as_deref(), Some("from-env"));
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("FLOWCTL_TEST_BEARER_TOKEN");
        }
    }

    #[test]
    fn test_expand_home() {
        let absolute = PathBuf::from("/etc/flowctl/token");
        assert_eq!(expand_home(&absolute), absolute);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/t")), home.join("t"));
        }
    }
}
