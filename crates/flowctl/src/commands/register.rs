//! Register command - push serialized definitions to the admin service.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::style;
use flowctl_register::{Pipeline, Report, RegistrationStatus, RunConfig};
use tokio_util::sync::CancellationToken;

use super::Context;
use crate::output::{Table, print_structured};

/// Arguments for the register command.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[command(subcommand)]
    pub command: RegisterCommand,
}

#[derive(Subcommand, Debug)]
pub enum RegisterCommand {
    /// Register serialized tasks, workflows and launch plans
    Files(FilesArgs),
}

#[derive(Args, Debug)]
pub struct FilesArgs {
    /// Files, directories or URLs to register
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Version to register every entity under
    #[arg(long)]
    pub version: Option<String>,

    /// Keep registering after a failure
    #[arg(long)]
    pub continue_on_error: bool,

    /// Treat the single input as a tar or tar.gz archive of definitions
    #[arg(long)]
    pub archive: bool,

    /// Upload the source archive to this location instead of a derived one
    #[arg(long)]
    pub source_upload_path: Option<String>,

    /// IAM role executions assume
    #[arg(long)]
    pub assumable_iam_role: Option<String>,

    /// Kubernetes service account executions run as
    #[arg(long)]
    pub k8s_service_account: Option<String>,

    /// Prefix for raw output data of executions
    #[arg(long)]
    pub output_location_prefix: Option<String>,

    /// Directory the source archive is unpacked into inside the container
    #[arg(long)]
    pub destination_directory: Option<String>,

    /// Activate schedules of registered launch plans
    #[arg(long)]
    pub enable_schedule: bool,
}

impl FilesArgs {
    fn run_config(&self, project: &str, domain: &str) -> RunConfig {
        let mut cfg = RunConfig::new(project, domain)
            .with_continue_on_error(self.continue_on_error)
            .with_archive(self.archive);
        if let Some(version) = &self.version {
            cfg = cfg.with_version(version);
        }
        if let Some(path) = &self.source_upload_path {
            cfg = cfg.with_source_upload_path(path);
        }
        cfg.assumable_iam_role = self.assumable_iam_role.clone();
        cfg.k8s_service_account = self.k8s_service_account.clone();
        cfg.output_location_prefix = self.output_location_prefix.clone();
        cfg.destination_directory = self.destination_directory.clone();
        cfg.enable_schedule = self.enable_schedule;
        cfg
    }
}

/// Run the register command.
pub async fn run(args: RegisterArgs, ctx: &Context) -> Result<()> {
    match args.command {
        RegisterCommand::Files(files) => cmd_files(files, ctx).await,
    }
}

async fn cmd_files(args: FilesArgs, ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let cfg = args.run_config(target.require_project()?, target.require_domain()?);
    let pipeline = Pipeline::for_admin(ctx.client(&target)?);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current entity");
            on_interrupt.cancel();
        }
    });

    let outcome = pipeline.run(&args.inputs, &cfg, &cancel).await?;

    if ctx.output.is_table() {
        print_report(&outcome.report);
        if let Some(location) = &outcome.upload_location {
            println!();
            println!("Source code uploaded to {}", style(location).cyan());
        }
    } else {
        print_structured(ctx.output, &outcome.report)?;
    }

    if let Some(warning) = &outcome.cleanup_warning {
        eprintln!("{} {}", style("Warning:").yellow(), warning);
    }

    outcome.into_result()?;
    Ok(())
}

fn print_report(report: &Report) {
    if report.is_empty() {
        println!("{}", style("No entities registered").dim());
        return;
    }

    let mut table = Table::new(&["NAME", "KIND", "VERSION", "STATUS", "ADDITIONAL INFO"]);
    for record in &report.records {
        table.row(vec![
            record.name.clone(),
            record.kind.clone(),
            record.version.clone(),
            record.status.as_str().to_string(),
            record.additional_info.clone(),
        ]);
    }
    table.print();

    println!();
    println!(
        "{} registered, {} already present, {} failed",
        report.count(RegistrationStatus::Success),
        report.count(RegistrationStatus::AlreadyExists),
        report.count(RegistrationStatus::Failed),
    );
}
