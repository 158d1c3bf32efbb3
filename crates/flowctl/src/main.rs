//! flowctl - command-line client for the workflow admin service
//!
//! Main entry point for the flowctl CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{config, get, register, sandbox};
use flowctl_config::TargetOverrides;
use output::OutputFormat;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// flowctl - register and inspect workflows on the admin service
#[derive(Parser)]
#[command(name = "flowctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Admin service URL (overrides the active context)
    #[arg(long, global = true, env = "FLOWCTL_ADMIN_URL")]
    pub admin: Option<String>,

    /// Config context to use instead of current-context
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Project to operate in
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Domain to operate in
    #[arg(short, long, global = true)]
    pub domain: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register tasks, workflows and launch plans
    Register(register::RegisterArgs),

    /// Fetch projects, tasks, workflows and launch plans
    Get(get::GetArgs),

    /// Manage the local sandbox
    Sandbox(sandbox::SandboxArgs),

    /// Client configuration and contexts
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "flowctl=debug,flowctl_register=debug,flowctl_client=debug,flowctl_sandbox=debug,flowctl_config=debug,info"
    } else {
        "flowctl=info,flowctl_register=info,flowctl_sandbox=info,warn"
    };

    let log_dir = flowctl_config::logs_dir();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "flowctl.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "flowctl=trace,flowctl_register=trace,flowctl_client=trace,flowctl_sandbox=trace,flowctl_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        output: cli.output,
        verbose: cli.verbose,
        overrides: TargetOverrides {
            admin: cli.admin,
            context: cli.context,
            project: cli.project,
            domain: cli.domain,
        },
    };

    match cli.command {
        Commands::Register(args) => register::run(args, &ctx).await,
        Commands::Get(args) => get::run(args, &ctx).await,
        Commands::Sandbox(args) => sandbox::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
