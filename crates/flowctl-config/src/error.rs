//! Errors raised while loading client config or resolving a target.

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config or token file exists but could not be read.
    #[error("cannot read '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot write '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// `config.yaml` is not valid YAML or has the wrong shape.
    #[error("invalid client config: {0}")]
    ParseYaml(String),

    #[error("no context named '{0}' in client config")]
    ContextNotFound(String),

    /// Neither `--admin`, `FLOWCTL_ADMIN_URL` nor a context gave an endpoint.
    #[error(
        "no admin endpoint configured. Pass --admin, set FLOWCTL_ADMIN_URL, or add a context with `flowctl config set-context`"
    )]
    NoAdminEndpoint,

    /// A value the command needs was not set anywhere.
    #[error("{field} is not set; provide it via {context}")]
    MissingField { field: String, context: String },

    #[error("{0}")]
    Other(String),
}
