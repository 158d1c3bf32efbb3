//! Get command - fetch entities from the admin service.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use console::style;
use flowctl_client::{
    EntityList, Identifier, LaunchPlan, ListQuery, NamedEntity, Project, ResourceType,
};
use serde::Serialize;

use super::Context;
use crate::output::{Table, print_structured, truncate};

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(subcommand)]
    pub command: GetCommand,
}

#[derive(Subcommand, Debug)]
pub enum GetCommand {
    /// Get one project or list all projects
    Project {
        /// Project ID
        name: Option<String>,
    },

    /// Get task versions or list task names
    Task(EntityArgs),

    /// Get workflow versions or list workflow names
    Workflow(EntityArgs),

    /// Get launch plan versions or list launch plans
    #[command(name = "launchplan")]
    LaunchPlan(LaunchPlanArgs),
}

/// List paging, sorting and filtering options.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Maximum number of results per page
    #[arg(long, default_value_t = 100)]
    pub limit: u32,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Field to sort by
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort ascending
    #[arg(long)]
    pub asc: bool,

    /// Field selector, e.g. "name=wf,version!=v1"
    #[arg(long)]
    pub filter: Option<String>,
}

impl FilterArgs {
    fn to_query(&self) -> Result<ListQuery> {
        let offset = (self.page - 1).saturating_mul(self.limit);
        let filters = match self.filter.as_deref() {
            Some(selector) => Some(field_selector_filters(selector)?),
            None => None,
        };
        Ok(ListQuery {
            limit: Some(self.limit),
            token: (offset > 0).then(|| offset.to_string()),
            sort_by: self.sort_by.clone(),
            asc: self.asc,
            filters,
        })
    }
}

#[derive(Args, Debug)]
pub struct EntityArgs {
    /// Entity name; lists names when omitted
    pub name: Option<String>,

    /// Fetch this version only
    #[arg(long)]
    pub version: Option<String>,

    /// Fetch the most recent version only
    #[arg(long)]
    pub latest: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug)]
pub struct LaunchPlanArgs {
    #[command(flatten)]
    pub entity: EntityArgs,

    /// Only launch plans of this workflow
    #[arg(long)]
    pub workflow: Option<String>,

    /// Write an execution spec for the launch plan to this file
    #[arg(long)]
    pub exec_file: Option<PathBuf>,
}

/// Run the get command.
pub async fn run(args: GetArgs, ctx: &Context) -> Result<()> {
    match args.command {
        GetCommand::Project { name } => cmd_project(name, ctx).await,
        GetCommand::Task(args) => cmd_task(args, ctx).await,
        GetCommand::Workflow(args) => cmd_workflow(args, ctx).await,
        GetCommand::LaunchPlan(args) => cmd_launch_plan(args, ctx).await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn cmd_project(name: Option<String>, ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let client = ctx.client(&target)?;

    let projects = match name {
        Some(id) => vec![client.projects().get(&id).await?],
        None => client.projects().list().await?.projects,
    };

    let headers = &["ID", "NAME", "DESCRIPTION", "DOMAINS"];
    print_entities(ctx, "projects", &projects, headers, project_row)
}

async fn cmd_task(args: EntityArgs, ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let (project, domain) = (target.require_project()?, target.require_domain()?);
    let api = ctx.client(&target)?.tasks();

    let Some(name) = args.name.as_deref() else {
        let names = api.list_names(project, domain, &args.filter.to_query()?).await?;
        return print_named(ctx, &names.entities);
    };

    let tasks = if args.latest {
        let list = api.list_versions(project, domain, name, &latest_query()).await?;
        latest(list, ResourceType::Task, name)?
    } else if let Some(version) = &args.version {
        vec![api.get(&Identifier::new(project, domain, name, version)).await?]
    } else {
        api.list_versions(project, domain, name, &args.filter.to_query()?)
            .await?
            .entities
    };

    print_entities(ctx, "task versions", &tasks, VERSION_HEADERS, |t| {
        version_row(&t.id, t.created_at)
    })
}

async fn cmd_workflow(args: EntityArgs, ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let (project, domain) = (target.require_project()?, target.require_domain()?);
    let api = ctx.client(&target)?.workflows();

    let Some(name) = args.name.as_deref() else {
        let names = api.list_names(project, domain, &args.filter.to_query()?).await?;
        return print_named(ctx, &names.entities);
    };

    let workflows = if args.latest {
        let list = api.list_versions(project, domain, name, &latest_query()).await?;
        latest(list, ResourceType::Workflow, name)?
    } else if let Some(version) = &args.version {
        vec![api.get(&Identifier::new(project, domain, name, version)).await?]
    } else {
        api.list_versions(project, domain, name, &args.filter.to_query()?)
            .await?
            .entities
    };

    print_entities(ctx, "workflow versions", &workflows, VERSION_HEADERS, |w| {
        version_row(&w.id, w.created_at)
    })
}

async fn cmd_launch_plan(args: LaunchPlanArgs, ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let (project, domain) = (target.require_project()?, target.require_domain()?);
    let api = ctx.client(&target)?.launch_plans();
    let entity = &args.entity;

    if args.exec_file.is_some() && entity.name.is_none() {
        bail!("--exec-file requires a launch plan name");
    }

    let mut plans = match entity.name.as_deref() {
        Some(name) if entity.latest => {
            let list = api.list_versions(project, domain, name, &latest_query()).await?;
            latest(list, ResourceType::LaunchPlan, name)?
        }
        Some(name) => match &entity.version {
            Some(version) => {
                vec![api.get(&Identifier::new(project, domain, name, version)).await?]
            }
            None => {
                let query =
                    with_workflow_filter(entity.filter.to_query()?, args.workflow.as_deref());
                api.list_versions(project, domain, name, &query).await?.entities
            }
        },
        None => {
            let query = with_workflow_filter(entity.filter.to_query()?, args.workflow.as_deref());
            api.list(project, domain, &query).await?.entities
        }
    };

    if let Some(workflow) = args.workflow.as_deref() {
        plans.retain(|lp| lp.spec.workflow_id.name == workflow);
    }

    if let Some(path) = &args.exec_file {
        let Some(plan) = plans.first() else {
            bail!("no launch plan found to write an execution spec for");
        };
        write_exec_file(path, plan)?;
        println!(
            "Execution spec for {} written to {}",
            style(plan.id.to_string()).cyan(),
            path.display()
        );
        return Ok(());
    }

    print_entities(
        ctx,
        "launch plans",
        &plans,
        &["VERSION", "NAME", "WORKFLOW", "STATE", "SCHEDULE", "CREATED AT"],
        launch_plan_row,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────────────────

/// Translate a `key=value,key!=value` field selector into admin filters.
fn field_selector_filters(selector: &str) -> Result<String> {
    let mut filters = Vec::new();
    for term in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let filter = if let Some((key, value)) = term.split_once("!=") {
            format!("ne({},{})", key.trim(), value.trim())
        } else if let Some((key, value)) = term.split_once('=') {
            let value = value.trim_start_matches('=');
            format!("eq({},{})", key.trim(), value.trim())
        } else {
            bail!("invalid field selector '{}', expected key=value", term);
        };
        filters.push(filter);
    }
    if filters.is_empty() {
        bail!("empty field selector");
    }
    Ok(filters.join("+"))
}

fn with_workflow_filter(mut query: ListQuery, workflow: Option<&str>) -> ListQuery {
    if let Some(workflow) = workflow {
        let filter = format!("eq(workflow.name,{})", workflow);
        query.filters = Some(match query.filters.take() {
            Some(existing) => format!("{}+{}", existing, filter),
            None => filter,
        });
    }
    query
}

fn latest_query() -> ListQuery {
    ListQuery {
        sort_by: Some("created_at".to_string()),
        ..ListQuery::with_limit(1)
    }
}

fn latest<T>(list: EntityList<T>, kind: ResourceType, name: &str) -> Result<Vec<T>> {
    match list.entities.into_iter().next() {
        Some(entity) => Ok(vec![entity]),
        None => bail!("no versions of {} '{}' found", kind, name),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution spec
// ─────────────────────────────────────────────────────────────────────────────

/// Execution spec template written by `--exec-file`.
#[derive(Debug, Serialize, PartialEq)]
struct ExecutionSpec {
    launch_plan: String,
    version: String,
    inputs: BTreeMap<String, serde_json::Value>,
    target_project: String,
    target_domain: String,
    iam_role_arn: String,
    kube_service_acct: String,
}

impl ExecutionSpec {
    fn for_launch_plan(plan: &LaunchPlan) -> Self {
        let inputs = plan
            .spec
            .default_inputs
            .iter()
            .map(|(name, param)| {
                let value = param.default.clone().unwrap_or(serde_json::Value::Null);
                (name.clone(), value)
            })
            .collect();
        Self {
            launch_plan: plan.id.name.clone(),
            version: plan.id.version.clone(),
            inputs,
            target_project: String::new(),
            target_domain: String::new(),
            iam_role_arn: String::new(),
            kube_service_acct: String::new(),
        }
    }
}

fn write_exec_file(path: &Path, plan: &LaunchPlan) -> Result<()> {
    let yaml = serde_yaml::to_string(&ExecutionSpec::for_launch_plan(plan))?;
    std::fs::write(path, yaml)?;
    tracing::debug!(path = %path.display(), plan = %plan.id, "Wrote execution spec");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Printing
// ─────────────────────────────────────────────────────────────────────────────

const VERSION_HEADERS: &[&str] = &["VERSION", "NAME", "CREATED AT"];

fn print_entities<T: Serialize>(
    ctx: &Context,
    label: &str,
    items: &[T],
    headers: &[&'static str],
    row: impl Fn(&T) -> Vec<String>,
) -> Result<()> {
    if !ctx.output.is_table() {
        return print_structured(ctx.output, items);
    }
    if items.is_empty() {
        println!("{}", style(format!("No {} found", label)).dim());
        return Ok(());
    }
    let mut table = Table::new(headers);
    for item in items {
        table.row(row(item));
    }
    table.print();
    Ok(())
}

fn print_named(ctx: &Context, entities: &[NamedEntity]) -> Result<()> {
    print_entities(ctx, "entities", entities, &["NAME", "DESCRIPTION"], |e| {
        vec![e.id.name.clone(), truncate(&e.description, 60)]
    })
}

fn project_row(project: &Project) -> Vec<String> {
    let domains: Vec<&str> = project.domains.iter().map(|d| d.id.as_str()).collect();
    vec![
        project.id.clone(),
        project.name.clone(),
        truncate(&project.description, 40),
        domains.join(","),
    ]
}

fn version_row(id: &Identifier, created_at: Option<DateTime<Utc>>) -> Vec<String> {
    vec![id.version.clone(), id.name.clone(), format_time(created_at)]
}

fn launch_plan_row(plan: &LaunchPlan) -> Vec<String> {
    let state = serde_json::to_value(plan.state)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let schedule = plan
        .spec
        .schedule
        .as_ref()
        .and_then(|s| s.cron_expression.clone())
        .unwrap_or_default();
    vec![
        plan.id.version.clone(),
        plan.id.name.clone(),
        plan.spec.workflow_id.name.clone(),
        state,
        schedule,
        format_time(plan.created_at),
    ]
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
