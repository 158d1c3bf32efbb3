//! API endpoint implementations.

mod data_proxy;
mod launch_plans;
mod projects;
mod tasks;
mod workflows;

pub use data_proxy::DataProxyApi;
pub use launch_plans::LaunchPlansApi;
pub use projects::ProjectsApi;
pub use tasks::TasksApi;
pub use workflows::WorkflowsApi;

/// Query parameters shared by all list endpoints.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ListQuery {
    /// Maximum number of entities to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Continuation token from a previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Field to sort by (e.g. "created_at").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// Sort ascending instead of descending.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub asc: bool,
    /// Field selector filters, e.g. `eq(workflow.name,wf)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
}

impl ListQuery {
    /// Query returning at most `limit` entities.
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }
}
