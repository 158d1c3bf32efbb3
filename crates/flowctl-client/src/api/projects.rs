//! Projects API.

use crate::client::AdminClient;
use crate::error::Result;
use crate::types::{Project, ProjectList};

/// Projects API client.
pub struct ProjectsApi {
    client: AdminClient,
}

impl ProjectsApi {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }

    /// List all projects.
    pub async fn list(&self) -> Result<ProjectList> {
        self.client.get("projects").await
    }

    /// Get a project by ID.
    pub async fn get(&self, id: &str) -> Result<Project> {
        self.client.get(&format!("projects/{}", id)).await
    }
}
