//! Request and response types for the admin API.
//!
//! These types mirror the admin service's API contract. Entity specs keep any
//! fields they do not model in an `extra` map so definitions survive a
//! decode/re-encode cycle unchanged.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of a registrable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Task,
    Workflow,
    LaunchPlan,
}

impl ResourceType {
    /// API collection path for this resource.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceType::Task => "tasks",
            ResourceType::Workflow => "workflows",
            ResourceType::LaunchPlan => "launch_plans",
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Task => "task",
            ResourceType::Workflow => "workflow",
            ResourceType::LaunchPlan => "launch_plan",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully-qualified, versioned entity identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl Identifier {
    /// Create an identifier.
    pub fn new(
        project: impl Into<String>,
        domain: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            domain: domain.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// URL path segment `project/domain/name/version`.
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.project, self.domain, self.name, self.version
        )
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}",
            self.project, self.domain, self.name, self.version
        )
    }
}

/// Unversioned entity identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntityIdentifier {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Task specs
// ─────────────────────────────────────────────────────────────────────────────

/// Task specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub template: TaskTemplate,
}

/// Task template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Task plugin type (e.g. "python-task").
    #[serde(rename = "type", default)]
    pub task_type: String,
    /// Container the task runs in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Container definition of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflow specs
// ─────────────────────────────────────────────────────────────────────────────

/// Workflow specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub template: WorkflowTemplate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_workflows: Vec<WorkflowTemplate>,
}

/// Workflow template: a graph of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Set on sub-workflows, which are referenced by identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A workflow node referencing another entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_ref: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_ref: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_plan_ref: Option<Identifier>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Mutable references to every identifier this node points at.
    pub fn references_mut(&mut self) -> impl Iterator<Item = &mut Identifier> {
        [
            self.task_ref.as_mut(),
            self.workflow_ref.as_mut(),
            self.launch_plan_ref.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Launch plan specs
// ─────────────────────────────────────────────────────────────────────────────

/// Launch plan specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchPlanSpec {
    /// Workflow launched by this plan.
    pub workflow_id: Identifier,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_inputs: BTreeMap<String, Parameter>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fixed_inputs: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_role: Option<AuthRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output_data_config: Option<RawOutputDataConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Launch plan input parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type", default)]
    pub param_type: Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
}

/// Launch plan schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Legacy execution role settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthRole {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumable_iam_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_service_account: Option<String>,
}

/// Execution security context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as: Option<Identity>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Identity executions run as.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k8s_service_account: Option<String>,
}

/// Where executions write raw output data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOutputDataConfig {
    pub output_location_prefix: String,
}

/// Activation state of a launch plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchPlanState {
    #[default]
    Inactive,
    Active,
}

// ─────────────────────────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────────────────────────

/// A registered task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Identifier,
    pub spec: TaskSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A registered workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Identifier,
    pub spec: WorkflowSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A registered launch plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub id: Identifier,
    pub spec: LaunchPlanSpec,
    #[serde(default)]
    pub state: LaunchPlanState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Paged list of entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityList<T> {
    pub entities: Vec<T>,
    /// Continuation token; empty on the last page.
    #[serde(default)]
    pub token: String,
}

/// A named entity (all versions share the name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedEntity {
    pub resource_type: ResourceType,
    pub id: NamedEntityIdentifier,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntityRequest<S> {
    pub id: Identifier,
    pub spec: S,
    /// Location of the uploaded source archive for fast registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_upload_location: Option<String>,
}

/// Response after registering an entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEntityResponse {
    /// Server-assigned registration time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request to change a launch plan's activation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLaunchPlanStateRequest {
    pub state: LaunchPlanState,
}

// ─────────────────────────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────────────────────────

/// A project and the domains it spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub domains: Vec<Domain>,
}

/// A domain within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Response for listing projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    #[serde(default)]
    pub token: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Data proxy
// ─────────────────────────────────────────────────────────────────────────────

/// Request for a location to upload an artifact to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUploadLocationRequest {
    pub project: String,
    pub domain: String,
    pub filename: String,
    /// Hex-encoded SHA-256 of the artifact bytes.
    pub content_sha256: String,
    /// Deterministic storage key derived by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Caller-chosen destination, used verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_url: Option<String>,
}

/// Upload location handed out by the data proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUploadLocationResponse {
    /// URL the bytes are PUT to.
    pub signed_url: String,
    /// Storage URI the artifact is addressable by.
    pub native_url: String,
    /// True when an object with the same key and hash is already stored.
    #[serde(default)]
    pub exists: bool,
}
