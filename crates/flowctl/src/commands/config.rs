//! Config command - client configuration and contexts.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use console::style;
use flowctl_config::{ClientConfig, Context as ClientContext, TargetOverrides};

use super::Context;
use crate::output::{OutputFormat, Table, print_structured};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the configuration file
    View,

    /// Show the current context name
    CurrentContext,

    /// List available contexts
    GetContexts,

    /// Switch to a different context
    UseContext {
        /// Context name to switch to
        name: String,
    },

    /// Create or update a context from --admin, --project and --domain
    SetContext {
        /// Context name
        name: String,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Delete a context
    DeleteContext {
        /// Context name to delete
        name: String,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::View => cmd_view(ctx).await,
        ConfigCommand::CurrentContext => cmd_current_context().await,
        ConfigCommand::GetContexts => cmd_get_contexts(ctx).await,
        ConfigCommand::UseContext { name } => cmd_use_context(&name).await,
        ConfigCommand::SetContext { name, timeout } => {
            cmd_set_context(&name, &ctx.overrides, timeout).await
        }
        ConfigCommand::DeleteContext { name } => cmd_delete_context(&name).await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn cmd_view(ctx: &Context) -> Result<()> {
    let config = flowctl_config::load_client_config()?;

    match ctx.output {
        OutputFormat::Json => print_structured(OutputFormat::Json, &config),
        OutputFormat::Table | OutputFormat::Yaml => {
            if let Some(path) = flowctl_config::client_config_path()
                && ctx.verbose
            {
                println!("{}", style(format!("# {}", path.display())).dim());
            }
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn cmd_current_context() -> Result<()> {
    let config = flowctl_config::load_client_config()?;

    match &config.current_context {
        Some(name) => println!("{}", name),
        None => {
            println!("No current context set. Use 'flowctl config use-context <name>' to set one.")
        }
    }

    Ok(())
}

async fn cmd_get_contexts(ctx: &Context) -> Result<()> {
    let config = flowctl_config::load_client_config()?;

    if !ctx.output.is_table() {
        return print_structured(ctx.output, &config.contexts);
    }

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!();
        println!("Create one with:");
        println!("  flowctl config set-context local --admin=http://localhost:30080");
        return Ok(());
    }

    let current = config.current_context.as_deref();
    let mut table = Table::new(&["CURRENT", "NAME", "ADMIN", "PROJECT", "DOMAIN"]);
    for context in &config.contexts {
        let marker = if current == Some(context.name.as_str()) { "*" } else { "" };
        table.row(vec![
            marker.to_string(),
            context.name.clone(),
            context.admin.clone(),
            context.project.clone().unwrap_or_default(),
            context.domain.clone().unwrap_or_default(),
        ]);
    }
    table.print();

    Ok(())
}

async fn cmd_use_context(name: &str) -> Result<()> {
    let mut config = flowctl_config::load_client_config()?;

    config.use_context(name)?;
    flowctl_config::save_client_config(&config)?;

    println!("Switched to context \"{}\".", name);

    Ok(())
}

async fn cmd_set_context(
    name: &str,
    overrides: &TargetOverrides,
    timeout: Option<u64>,
) -> Result<()> {
    let mut config = flowctl_config::load_client_config()?;

    let created = apply_set_context(&mut config, name, overrides, timeout)?;
    if created {
        println!("Context \"{}\" created.", name);
    } else {
        println!("Context \"{}\" modified.", name);
    }

    // The first context becomes current.
    if config.current_context.is_none() && config.contexts.len() == 1 {
        config.use_context(name)?;
        println!("Context \"{}\" set as current context.", name);
    }

    flowctl_config::save_client_config(&config)?;
    Ok(())
}

async fn cmd_delete_context(name: &str) -> Result<()> {
    let mut config = flowctl_config::load_client_config()?;

    match config.remove_context(name) {
        Some(_) => {
            flowctl_config::save_client_config(&config)?;
            println!("Context \"{}\" deleted.", name);
            if config.current_context.is_none() {
                println!(
                    "Note: No current context. Use 'flowctl config use-context <name>' to set one."
                );
            }
        }
        None => {
            println!("Context \"{}\" not found.", name);
        }
    }

    Ok(())
}

/// Create or update `name` from the connection flags. Returns whether it was created.
fn apply_set_context(
    config: &mut ClientConfig,
    name: &str,
    overrides: &TargetOverrides,
    timeout: Option<u64>,
) -> Result<bool> {
    let created = match config.context_mut(name) {
        Some(context) => {
            if let Some(admin) = &overrides.admin {
                context.admin = admin.clone();
            }
            if let Some(project) = &overrides.project {
                context.project = Some(project.clone());
            }
            if let Some(domain) = &overrides.domain {
                context.domain = Some(domain.clone());
            }
            if let Some(timeout) = timeout {
                context.timeout = Some(timeout);
            }
            false
        }
        None => {
            let admin = overrides
                .admin
                .clone()
                .ok_or_else(|| anyhow!("--admin is required when creating a new context"))?;

            let mut context = ClientContext::new(name, admin);
            context.project = overrides.project.clone();
            context.domain = overrides.domain.clone();
            context.timeout = timeout;
            config.upsert_context(context);
            true
        }
    };
    Ok(created)
}
