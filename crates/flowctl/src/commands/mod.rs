//! CLI command handlers.

pub mod config;
pub mod get;
pub mod register;
pub mod sandbox;

use anyhow::Result;
use flowctl_client::AdminClient;
use flowctl_config::{ResolvedTarget, TargetOverrides};

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// How results are printed.
    pub output: OutputFormat,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Connection settings given on the command line.
    pub overrides: TargetOverrides,
}

impl Context {
    /// Resolve the connection target from the config file and flags.
    pub fn target(&self) -> Result<ResolvedTarget> {
        let config = flowctl_config::load_client_config()?;
        let target = flowctl_config::resolve_target(&config, &self.overrides)?;
        tracing::debug!(
            admin = %target.admin_url,
            context = ?target.context,
            "Resolved connection target"
        );
        Ok(target)
    }

    /// Build an admin client for `target`.
    pub fn client(&self, target: &ResolvedTarget) -> Result<AdminClient> {
        let client = AdminClient::builder()
            .base_url(&target.admin_url)
            .maybe_auth_token(target.token.clone())
            .timeout(target.timeout)
            .user_agent(format!("flowctl/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}
