//! Launch plans API.

use super::ListQuery;
use crate::client::AdminClient;
use crate::error::Result;
use crate::types::{
    CreateEntityRequest, CreateEntityResponse, EntityList, Identifier, LaunchPlan, LaunchPlanSpec,
    LaunchPlanState, UpdateLaunchPlanStateRequest,
};

/// Launch plans API client.
pub struct LaunchPlansApi {
    client: AdminClient,
}

impl LaunchPlansApi {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }

    /// Register a launch plan.
    pub async fn create(
        &self,
        request: &CreateEntityRequest<LaunchPlanSpec>,
    ) -> Result<CreateEntityResponse> {
        self.client.post("launch_plans", request).await
    }

    /// Get one launch plan version.
    pub async fn get(&self, id: &Identifier) -> Result<LaunchPlan> {
        self.client
            .get(&format!("launch_plans/{}", id.path()))
            .await
    }

    /// List versions of a launch plan.
    pub async fn list_versions(
        &self,
        project: &str,
        domain: &str,
        name: &str,
        query: &ListQuery,
    ) -> Result<EntityList<LaunchPlan>> {
        self.client
            .get_with_query(
                &format!("launch_plans/{}/{}/{}", project, domain, name),
                query,
            )
            .await
    }

    /// List the latest version of every launch plan in a project/domain.
    pub async fn list(
        &self,
        project: &str,
        domain: &str,
        query: &ListQuery,
    ) -> Result<EntityList<LaunchPlan>> {
        self.client
            .get_with_query(&format!("launch_plans/{}/{}", project, domain), query)
            .await
    }

    /// Activate or deactivate a launch plan version.
    pub async fn update_state(&self, id: &Identifier, state: LaunchPlanState) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .put(
                &format!("launch_plans/{}/state", id.path()),
                &UpdateLaunchPlanStateRequest { state },
            )
            .await?;
        Ok(())
    }
}
