//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use flowctl_client::{
    CreateEntityResponse, CreateUploadLocationRequest, CreateUploadLocationResponse,
    Error as ClientError, Identifier, ResourceType, Result as ClientResult,
};
use serde_json::Value;

use crate::hydrate::RegistrationRequest;
use crate::remote::{ArchiveFetcher, ArtifactStore, Registrar};

// ─────────────────────────────────────────────────────────────────────────────
// Mock Registrar
// ─────────────────────────────────────────────────────────────────────────────

/// A registrar that behaves like the admin service in memory.
///
/// Re-registering an identical entity reports already-exists, registering a
/// different entity under a taken identifier reports a conflict, and entity
/// names can be scripted to fail.
#[derive(Debug, Default)]
pub struct MockRegistrar {
    failures: Mutex<HashMap<String, String>>,
    activation_failures: Mutex<HashSet<String>>,
    registered: Mutex<HashMap<(ResourceType, Identifier), Value>>,
    request_log: Mutex<Vec<RegistrationRequest>>,
    activations: Mutex<Vec<Identifier>>,
}

impl MockRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every registration of the named entity.
    pub fn fail_on(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(name.into(), message.into());
        self
    }

    /// Reject activation of the named launch plan.
    pub fn fail_activation_of(self, name: impl Into<String>) -> Self {
        self.activation_failures.lock().unwrap().insert(name.into());
        self
    }

    /// All registration requests received, in order.
    pub fn requests(&self) -> Vec<RegistrationRequest> {
        self.request_log.lock().unwrap().clone()
    }

    /// Number of registration requests received.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().unwrap().len()
    }

    /// Names of the entities requested, in order.
    pub fn requested_names(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| request.id().name.clone())
            .collect()
    }

    /// Launch plans activated, in order.
    pub fn activations(&self) -> Vec<Identifier> {
        self.activations.lock().unwrap().clone()
    }
}

fn spec_value(request: &RegistrationRequest) -> Value {
    let value = match request {
        RegistrationRequest::Task(req) => serde_json::to_value(&req.spec),
        RegistrationRequest::Workflow(req) => serde_json::to_value(&req.spec),
        RegistrationRequest::LaunchPlan(req) => serde_json::to_value(&req.spec),
    };
    value.unwrap_or(Value::Null)
}

#[async_trait]
impl Registrar for MockRegistrar {
    async fn register(&self, request: &RegistrationRequest) -> ClientResult<CreateEntityResponse> {
        self.request_log.lock().unwrap().push(request.clone());

        let id = request.id();
        if let Some(message) = self.failures.lock().unwrap().get(&id.name) {
            return Err(ClientError::Api {
                status: 400,
                code: "invalid_argument".to_string(),
                message: message.clone(),
            });
        }

        let key = (request.kind(), id.clone());
        let spec = spec_value(request);
        let mut registered = self.registered.lock().unwrap();
        match registered.get(&key) {
            Some(existing) if *existing == spec => Err(ClientError::AlreadyExists(format!(
                "{} {} already exists",
                request.kind(),
                id
            ))),
            Some(_) => Err(ClientError::Conflict(format!(
                "{} {} already exists with a different structure",
                request.kind(),
                id
            ))),
            None => {
                registered.insert(key, spec);
                Ok(CreateEntityResponse {
                    created_at: Some(chrono::Utc::now()),
                })
            }
        }
    }

    async fn activate_launch_plan(&self, id: &Identifier) -> ClientResult<()> {
        if self.activation_failures.lock().unwrap().contains(&id.name) {
            return Err(ClientError::Api {
                status: 500,
                code: "internal".to_string(),
                message: format!("failed to activate {}", id),
            });
        }
        self.activations.lock().unwrap().push(id.clone());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Artifact Store
// ─────────────────────────────────────────────────────────────────────────────

/// An artifact store keeping objects in memory.
#[derive(Debug, Default)]
pub struct MockArtifactStore {
    failure: Option<String>,
    objects: Mutex<HashSet<String>>,
    location_log: Mutex<Vec<CreateUploadLocationRequest>>,
    put_log: Mutex<Vec<(String, usize)>>,
}

const SIGNED_PREFIX: &str = "mock://upload/";

impl MockArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Default::default()
        }
    }

    /// Upload location requests received, in order.
    pub fn location_requests(&self) -> Vec<CreateUploadLocationRequest> {
        self.location_log.lock().unwrap().clone()
    }

    /// Number of byte transfers performed.
    pub fn put_count(&self) -> usize {
        self.put_log.lock().unwrap().len()
    }

    fn check(&self) -> ClientResult<()> {
        match &self.failure {
            Some(message) => Err(ClientError::Api {
                status: 503,
                code: "unavailable".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ArtifactStore for MockArtifactStore {
    async fn create_upload_location(
        &self,
        request: &CreateUploadLocationRequest,
    ) -> ClientResult<CreateUploadLocationResponse> {
        self.location_log.lock().unwrap().push(request.clone());
        self.check()?;

        let key = request
            .native_url
            .clone()
            .or_else(|| request.key.clone())
            .unwrap_or_else(|| request.filename.clone());
        let native_url = match &request.native_url {
            Some(url) => url.clone(),
            None => format!("mock://bucket/{}", key),
        };
        Ok(CreateUploadLocationResponse {
            signed_url: format!("{}{}", SIGNED_PREFIX, key),
            native_url,
            exists: self.objects.lock().unwrap().contains(&key),
        })
    }

    async fn put(&self, signed_url: &str, bytes: Vec<u8>) -> ClientResult<()> {
        self.check()?;
        let key = signed_url.trim_start_matches(SIGNED_PREFIX).to_string();
        self.put_log.lock().unwrap().push((key.clone(), bytes.len()));
        self.objects.lock().unwrap().insert(key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Fetcher
// ─────────────────────────────────────────────────────────────────────────────

/// A fetcher serving canned bodies by URL.
#[derive(Debug, Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_body(mut self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.bodies.insert(url.into(), body);
        self
    }
}

#[async_trait]
impl ArchiveFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> ClientResult<Vec<u8>> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(url.to_string()))
    }
}
