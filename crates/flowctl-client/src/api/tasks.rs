//! Tasks API.

use super::ListQuery;
use crate::client::AdminClient;
use crate::error::Result;
use crate::types::{
    CreateEntityRequest, CreateEntityResponse, EntityList, Identifier, NamedEntity, Task, TaskSpec,
};

/// Tasks API client.
pub struct TasksApi {
    client: AdminClient,
}

impl TasksApi {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }

    /// Register a task.
    pub async fn create(
        &self,
        request: &CreateEntityRequest<TaskSpec>,
    ) -> Result<CreateEntityResponse> {
        self.client.post("tasks", request).await
    }

    /// Get one task version.
    pub async fn get(&self, id: &Identifier) -> Result<Task> {
        self.client.get(&format!("tasks/{}", id.path())).await
    }

    /// List versions of a task.
    pub async fn list_versions(
        &self,
        project: &str,
        domain: &str,
        name: &str,
        query: &ListQuery,
    ) -> Result<EntityList<Task>> {
        self.client
            .get_with_query(&format!("tasks/{}/{}/{}", project, domain, name), query)
            .await
    }

    /// List task names in a project/domain.
    pub async fn list_names(
        &self,
        project: &str,
        domain: &str,
        query: &ListQuery,
    ) -> Result<EntityList<NamedEntity>> {
        self.client
            .get_with_query(&format!("tasks/{}/{}", project, domain), query)
            .await
    }
}
