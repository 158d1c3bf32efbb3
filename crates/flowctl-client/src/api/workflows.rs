//! Workflows API.

use super::ListQuery;
use crate::client::AdminClient;
use crate::error::Result;
use crate::types::{
    CreateEntityRequest, CreateEntityResponse, EntityList, Identifier, NamedEntity, Workflow,
    WorkflowSpec,
};

/// Workflows API client.
pub struct WorkflowsApi {
    client: AdminClient,
}

impl WorkflowsApi {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }

    /// Register a workflow.
    pub async fn create(
        &self,
        request: &CreateEntityRequest<WorkflowSpec>,
    ) -> Result<CreateEntityResponse> {
        self.client.post("workflows", request).await
    }

    /// Get one workflow version.
    pub async fn get(&self, id: &Identifier) -> Result<Workflow> {
        self.client.get(&format!("workflows/{}", id.path())).await
    }

    /// List versions of a workflow.
    pub async fn list_versions(
        &self,
        project: &str,
        domain: &str,
        name: &str,
        query: &ListQuery,
    ) -> Result<EntityList<Workflow>> {
        self.client
            .get_with_query(&format!("workflows/{}/{}/{}", project, domain, name), query)
            .await
    }

    /// List workflow names in a project/domain.
    pub async fn list_names(
        &self,
        project: &str,
        domain: &str,
        query: &ListQuery,
    ) -> Result<EntityList<NamedEntity>> {
        self.client
            .get_with_query(&format!("workflows/{}/{}", project, domain), query)
            .await
    }
}
