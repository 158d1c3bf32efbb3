//! Sandbox command - run a local single-node cluster in a container.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use flowctl_config::{ClientConfig, SANDBOX_CONTEXT};
use flowctl_sandbox::{
    DEFAULT_IMAGE, DEFAULT_SANDBOX_NAME, ImagePullPolicy, RuntimeStatus, SandboxConfig,
    SandboxManager,
};

use super::Context;
use crate::output::print_structured;

const RUNTIME_BINARY: &str = "docker";

/// Arguments for the sandbox command.
#[derive(Args, Debug)]
pub struct SandboxArgs {
    /// Name of the sandbox container
    #[arg(long, global = true, default_value = DEFAULT_SANDBOX_NAME)]
    pub name: String,

    #[command(subcommand)]
    pub command: SandboxCommand,
}

#[derive(Subcommand, Debug)]
pub enum SandboxCommand {
    /// Show the sandbox container status
    Status,

    /// Start a fresh sandbox and point the client at it
    Start(StartArgs),

    /// Remove the sandbox container and its config context
    Teardown,

    /// Run a command inside the sandbox
    Exec {
        /// Command and arguments, after `--`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Sandbox image
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// When to pull the image: always, if-not-present or never
    #[arg(long, default_value_t = ImagePullPolicy::Always)]
    pub pull_policy: ImagePullPolicy,

    /// Directory mounted into the sandbox as the source root
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Extra environment variables (KEY=VALUE)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Seconds to wait for the sandbox to become ready
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,
}

impl StartArgs {
    fn sandbox_config(&self, name: &str) -> Result<SandboxConfig> {
        let mut config = SandboxConfig::new()
            .with_name(name)
            .with_image(&self.image)
            .with_pull_policy(self.pull_policy)
            .with_ready_timeout(Duration::from_secs(self.timeout));
        if let Some(source) = &self.source {
            config = config.with_source(source);
        }
        for pair in &self.env {
            let Some((key, value)) = pair.split_once('=') else {
                bail!("invalid --env '{}', expected KEY=VALUE", pair);
            };
            config = config.add_env(key, value);
        }
        Ok(config)
    }
}

/// Run the sandbox command.
pub async fn run(args: SandboxArgs, ctx: &Context) -> Result<()> {
    match args.command {
        SandboxCommand::Status => cmd_status(&args.name, ctx).await,
        SandboxCommand::Start(start) => cmd_start(&args.name, start).await,
        SandboxCommand::Teardown => cmd_teardown(&args.name).await,
        SandboxCommand::Exec { command } => cmd_exec(&args.name, &command).await,
    }
}

async fn cmd_status(name: &str, ctx: &Context) -> Result<()> {
    let runtime = RuntimeStatus::detect(RUNTIME_BINARY);
    if !runtime.is_available() {
        eprintln!("{} {}", style("Error:").red(), runtime);
        bail!("container runtime unavailable");
    }

    let manager = SandboxManager::docker(SandboxConfig::new().with_name(name))?;
    let sandbox = manager.get_sandbox().await?;

    if !ctx.output.is_table() {
        return print_structured(ctx.output, &sandbox);
    }

    let dim = Style::new().dim();
    match sandbox {
        Some(container) => {
            println!("{}", style("Sandbox").bold());
            println!("{}", dim.apply_to("─".repeat(50)));
            println!("  {:<10} {}", "Name:", name);
            println!("  {:<10} {}", "Image:", container.image);
            println!("  {:<10} {}", "Status:", container.status);
            println!("  {:<10} {}", "State:", container.state);
            if ctx.verbose {
                println!("  {:<10} {}", "ID:", container.id);
                println!("  {:<10} {}", "Runtime:", runtime);
            }
        }
        None => println!("{}", dim.apply_to("No sandbox found")),
    }
    Ok(())
}

async fn cmd_start(name: &str, args: StartArgs) -> Result<()> {
    let config = args.sandbox_config(name)?;
    let admin = config.admin_endpoint();
    let manager = SandboxManager::docker(config)?;

    println!("Starting sandbox {} from {}", style(name).cyan(), args.image);
    let stdin = std::io::stdin();
    let id = manager
        .start(&mut stdin.lock(), &mut std::io::stdout())
        .await?;
    tracing::debug!(%id, "Sandbox ready");

    let mut client_config = flowctl_config::load_client_config()?;
    add_sandbox_context(&mut client_config, &admin)?;
    flowctl_config::save_client_config(&client_config)?;

    println!("{} Sandbox is ready at {}", style("✓").green(), admin);
    println!("  Context '{}' is now the current context", SANDBOX_CONTEXT);
    Ok(())
}

async fn cmd_teardown(name: &str) -> Result<()> {
    let manager = SandboxManager::docker(SandboxConfig::new().with_name(name))?;

    match manager.teardown().await? {
        Some(container) => println!("{} Removed sandbox {}", style("✓").green(), container.id),
        None => println!("No sandbox found"),
    }

    if let Err(e) = remove_sandbox_context() {
        eprintln!(
            "{} failed to remove '{}' context from config: {}",
            style("Warning:").yellow(),
            SANDBOX_CONTEXT,
            e
        );
    }
    Ok(())
}

async fn cmd_exec(name: &str, command: &[String]) -> Result<()> {
    let manager = SandboxManager::docker(SandboxConfig::new().with_name(name))?;
    let output = manager.exec(command).await?;

    print!("{}", output.stdout);
    eprint!("{}", output.stderr);
    if !output.success() {
        bail!("command exited with status {}", output.exit_code);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Config context
// ─────────────────────────────────────────────────────────────────────────────

/// Point `config` at the sandbox admin endpoint.
fn add_sandbox_context(config: &mut ClientConfig, admin: &str) -> flowctl_config::Result<()> {
    let mut context = flowctl_config::Context::new(SANDBOX_CONTEXT, admin);
    if let Some(existing) = config.context(SANDBOX_CONTEXT) {
        context.project = existing.project.clone();
        context.domain = existing.domain.clone();
    }
    config.upsert_context(context);
    config.use_context(SANDBOX_CONTEXT)
}

fn remove_sandbox_context() -> flowctl_config::Result<()> {
    let mut config = flowctl_config::load_client_config()?;
    if config.remove_context(SANDBOX_CONTEXT).is_some() {
        flowctl_config::save_client_config(&config)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_args(env: &[&str]) -> StartArgs {
        StartArgs {
            image: DEFAULT_IMAGE.to_string(),
            pull_policy: ImagePullPolicy::IfNotPresent,
            source: Some(PathBuf::from("/src")),
            env: env.iter().map(|s| s.to_string()).collect(),
            timeout: 30,
        }
    }

    #[test]
    fn test_sandbox_config_from_args() {
        let config = start_args(&["A=1", "B=x=y"]).sandbox_config("dev").unwrap();
        assert_eq!(config.name, "dev");
        assert_eq!(config.pull_policy, ImagePullPolicy::IfNotPresent);
        assert_eq!(config.source, Some(PathBuf::from("/src")));
        assert_eq!(
            config.env,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "x=y".to_string())
            ]
        );
        assert_eq!(config.ready_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_env_rejected() {
        assert!(start_args(&["NOVALUE"]).sandbox_config("dev").is_err());
    }

    #[test]
    fn test_add_sandbox_context_becomes_current() {
        let mut config = ClientConfig::new();
        config.upsert_context(flowctl_config::Context::new("prod", "https://admin.example.com"));
        config.use_context("prod").unwrap();

        add_sandbox_context(&mut config, "http://localhost:30080").unwrap();

        let current = config.current().unwrap();
        assert_eq!(current.name, SANDBOX_CONTEXT);
        assert_eq!(current.admin, "http://localhost:30080");
        assert!(config.context("prod").is_some());
    }

    #[test]
    fn test_add_sandbox_context_keeps_scope() {
        let mut config = ClientConfig::new();
        config.upsert_context(
            flowctl_config::Context::new(SANDBOX_CONTEXT, "http://old:1")
                .with_project("demo")
                .with_domain("development"),
        );

        add_sandbox_context(&mut config, "http://localhost:30080").unwrap();

        let sandbox = config.context(SANDBOX_CONTEXT).unwrap();
        assert_eq!(sandbox.admin, "http://localhost:30080");
        assert_eq!(sandbox.project.as_deref(), Some("demo"));
        assert_eq!(config.contexts.len(), 1);
    }
}
