//! Remote collaborators of the pipeline.
//!
//! The pipeline talks to the outside world through three traits so runs can
//! be driven against the admin service or against in-memory mocks.

use async_trait::async_trait;
use flowctl_client::{
    AdminClient, CreateEntityResponse, CreateUploadLocationRequest, CreateUploadLocationResponse,
    Error as ClientError, Identifier, LaunchPlanState, Result as ClientResult,
};

use crate::hydrate::RegistrationRequest;

/// Registers entities with the control plane.
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Register one entity. An identical existing entity is reported as
    /// [`ClientError::AlreadyExists`].
    async fn register(&self, request: &RegistrationRequest) -> ClientResult<CreateEntityResponse>;

    /// Activate a launch plan version.
    async fn activate_launch_plan(&self, id: &Identifier) -> ClientResult<()>;
}

/// Stores source archives.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Resolve where an artifact goes and whether it is already stored.
    async fn create_upload_location(
        &self,
        request: &CreateUploadLocationRequest,
    ) -> ClientResult<CreateUploadLocationResponse>;

    /// Transfer artifact bytes to a location returned by
    /// [`ArtifactStore::create_upload_location`].
    async fn put(&self, signed_url: &str, bytes: Vec<u8>) -> ClientResult<()>;
}

/// Downloads remote inputs.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ClientResult<Vec<u8>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin-service implementations
// ─────────────────────────────────────────────────────────────────────────────

/// [`Registrar`] backed by the admin service.
#[derive(Clone)]
pub struct AdminRegistrar {
    client: AdminClient,
}

impl AdminRegistrar {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Registrar for AdminRegistrar {
    async fn register(&self, request: &RegistrationRequest) -> ClientResult<CreateEntityResponse> {
        match request {
            RegistrationRequest::Task(req) => self.client.tasks().create(req).await,
            RegistrationRequest::Workflow(req) => self.client.workflows().create(req).await,
            RegistrationRequest::LaunchPlan(req) => self.client.launch_plans().create(req).await,
        }
    }

    async fn activate_launch_plan(&self, id: &Identifier) -> ClientResult<()> {
        self.client
            .launch_plans()
            .update_state(id, LaunchPlanState::Active)
            .await
    }
}

/// [`ArtifactStore`] backed by the admin service's data proxy.
#[derive(Clone)]
pub struct AdminArtifactStore {
    client: AdminClient,
}

impl AdminArtifactStore {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactStore for AdminArtifactStore {
    async fn create_upload_location(
        &self,
        request: &CreateUploadLocationRequest,
    ) -> ClientResult<CreateUploadLocationResponse> {
        self.client.data_proxy().create_upload_location(request).await
    }

    async fn put(&self, signed_url: &str, bytes: Vec<u8>) -> ClientResult<()> {
        self.client.data_proxy().upload(signed_url, bytes).await
    }
}

/// [`ArchiveFetcher`] for `http://` and `https://` inputs.
#[derive(Clone, Default)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> ClientResult<Vec<u8>> {
        tracing::debug!(%url, "Fetching remote input");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                code: "fetch_failed".to_string(),
                message: format!("GET {} returned {}", url, status),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Whether an input names a remote resource.
pub fn is_remote(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}
