//! Ordered registration of definitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use flowctl_client::{Identifier, ResourceType};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::definition::EntityDefinition;
use crate::hydrate::{RegistrationRequest, hydrate};
use crate::remote::Registrar;
use crate::uploader::UploadLocation;

/// Outcome of registering one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationStatus {
    Success,
    /// An identical entity was already registered.
    AlreadyExists,
    Failed,
}

impl RegistrationStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, RegistrationStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Success => "Success",
            RegistrationStatus::AlreadyExists => "AlreadyExists",
            RegistrationStatus::Failed => "Failed",
        }
    }
}

/// Result of one registration attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResult {
    /// Identifier the entity was registered under.
    pub id: Identifier,
    pub kind: ResourceType,
    /// Definition file.
    pub source: PathBuf,
    pub status: RegistrationStatus,
    /// Human-readable detail: the failure reason on failure.
    pub info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// How a sequence of registrations ended.
#[derive(Debug)]
pub enum SequenceOutcome {
    /// Every definition was attempted.
    Completed(Vec<RegistrationResult>),
    /// Fail-fast stopped at the failure at `index`; `results` ends with it.
    HaltedAt {
        index: usize,
        results: Vec<RegistrationResult>,
        error: String,
    },
    /// Cancellation was observed before the next registration.
    Cancelled(Vec<RegistrationResult>),
}

impl SequenceOutcome {
    /// Results accumulated so far, in run order.
    pub fn results(&self) -> &[RegistrationResult] {
        match self {
            SequenceOutcome::Completed(results)
            | SequenceOutcome::HaltedAt { results, .. }
            | SequenceOutcome::Cancelled(results) => results,
        }
    }

    pub fn into_results(self) -> Vec<RegistrationResult> {
        match self {
            SequenceOutcome::Completed(results)
            | SequenceOutcome::HaltedAt { results, .. }
            | SequenceOutcome::Cancelled(results) => results,
        }
    }

    /// Number of failed registrations.
    pub fn failure_count(&self) -> usize {
        self.results()
            .iter()
            .filter(|r| r.status.is_failure())
            .count()
    }
}

/// Register definitions one at a time, in order.
///
/// Later definitions may reference earlier ones, so nothing runs
/// concurrently. Without `continue_on_error` the sequence halts at the first
/// failure. Cancellation is only observed between registrations.
pub async fn register_all(
    registrar: &dyn Registrar,
    definitions: &[EntityDefinition],
    upload: Option<&UploadLocation>,
    cfg: &RunConfig,
    cancel: &CancellationToken,
) -> SequenceOutcome {
    let mut results = Vec::with_capacity(definitions.len());

    for (index, definition) in definitions.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::warn!(completed = results.len(), "Registration cancelled");
            return SequenceOutcome::Cancelled(results);
        }

        let request = hydrate(definition, cfg, upload);
        let result = register_one(registrar, &request, definition, cfg).await;
        let halt = result.status.is_failure() && !cfg.continue_on_error;
        let error = result.info.clone();
        results.push(result);

        if halt {
            return SequenceOutcome::HaltedAt {
                index,
                results,
                error,
            };
        }
    }

    SequenceOutcome::Completed(results)
}

async fn register_one(
    registrar: &dyn Registrar,
    request: &RegistrationRequest,
    definition: &EntityDefinition,
    cfg: &RunConfig,
) -> RegistrationResult {
    let id = request.id().clone();
    let kind = request.kind();
    let result = |status, info: String, created_at| RegistrationResult {
        id: id.clone(),
        kind,
        source: definition.source.clone(),
        status,
        info,
        created_at,
    };

    match registrar.register(request).await {
        Ok(response) => {
            tracing::info!(%kind, %id, "Registered entity");
            if cfg.enable_schedule && request.has_schedule() {
                if let Err(e) = registrar.activate_launch_plan(&id).await {
                    tracing::error!(%id, error = %e, "Failed to activate launch plan schedule");
                    return result(
                        RegistrationStatus::Failed,
                        format!("registered but schedule activation failed: {}", e),
                        response.created_at,
                    );
                }
                tracing::info!(%id, "Activated launch plan schedule");
                return result(
                    RegistrationStatus::Success,
                    "Successfully registered file and activated schedule".to_string(),
                    response.created_at,
                );
            }
            result(
                RegistrationStatus::Success,
                "Successfully registered file".to_string(),
                response.created_at,
            )
        }
        Err(e) if e.is_already_exists() => {
            tracing::info!(%kind, %id, "Entity already registered with identical definition");
            result(
                RegistrationStatus::AlreadyExists,
                "Entity already exists with identical definition".to_string(),
                None,
            )
        }
        Err(e) => {
            tracing::error!(%kind, %id, error = %e, "Registration failed");
            result(RegistrationStatus::Failed, e.to_string(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::mock::MockRegistrar;
    use serde_json::json;

    fn definitions() -> Vec<EntityDefinition> {
        [
            (
                "task_0.pb",
                json!({ "kind": "task", "id": { "name": "t0" }, "spec": { "template": {} } }),
            ),
            (
                "workflow_1.pb",
                json!({
                    "kind": "workflow",
                    "id": { "name": "wf1" },
                    "spec": { "template": { "nodes": [] } }
                }),
            ),
            (
                "launchplan_2.pb",
                json!({
                    "kind": "launch_plan",
                    "id": { "name": "lp2" },
                    "spec": {
                        "workflow_id": { "name": "wf1" },
                        "schedule": { "cron_expression": "@daily" }
                    }
                }),
            ),
        ]
        .into_iter()
        .map(|(file, value)| {
            EntityDefinition::decode(Path::new(file), &serde_json::to_vec(&value).unwrap()).unwrap()
        })
        .collect()
    }

    fn statuses(outcome: &SequenceOutcome) -> Vec<RegistrationStatus> {
        outcome.results().iter().map(|r| r.status).collect()
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let registrar = MockRegistrar::new();
        let outcome = register_all(
            &registrar,
            &definitions(),
            None,
            &RunConfig::new("p", "d"),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, SequenceOutcome::Completed(_)));
        assert_eq!(statuses(&outcome), vec![RegistrationStatus::Success; 3]);
        assert_eq!(registrar.requested_names(), vec!["t0", "wf1", "lp2"]);
        assert!(registrar.activations().is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast_halts_at_first_failure() {
        let registrar = MockRegistrar::new().fail_on("wf1", "invalid workflow");
        let outcome = register_all(
            &registrar,
            &definitions(),
            None,
            &RunConfig::new("p", "d"),
            &CancellationToken::new(),
        )
        .await;

        match &outcome {
            SequenceOutcome::HaltedAt { index, error, .. } => {
                assert_eq!(*index, 1);
                assert!(error.contains("invalid workflow"));
            }
            other => panic!("expected halt, got {:?}", other),
        }
        assert_eq!(
            statuses(&outcome),
            vec![RegistrationStatus::Success, RegistrationStatus::Failed]
        );
        assert_eq!(registrar.request_count(), 2);
    }

    #[tokio::test]
    async fn test_continue_on_error_attempts_everything() {
        let registrar = MockRegistrar::new().fail_on("wf1", "invalid workflow");
        let cfg = RunConfig::new("p", "d").with_continue_on_error(true);
        let outcome = register_all(
            &registrar,
            &definitions(),
            None,
            &cfg,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, SequenceOutcome::Completed(_)));
        assert_eq!(
            statuses(&outcome),
            vec![
                RegistrationStatus::Success,
                RegistrationStatus::Failed,
                RegistrationStatus::Success
            ]
        );
        assert_eq!(outcome.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_reregistration_is_idempotent() {
        let registrar = MockRegistrar::new();
        let cfg = RunConfig::new("p", "d");
        let cancel = CancellationToken::new();

        register_all(&registrar, &definitions(), None, &cfg, &cancel).await;
        let second = register_all(&registrar, &definitions(), None, &cfg, &cancel).await;

        assert!(matches!(second, SequenceOutcome::Completed(_)));
        assert_eq!(statuses(&second), vec![RegistrationStatus::AlreadyExists; 3]);
        assert_eq!(second.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_conflicting_definition_fails() {
        let registrar = MockRegistrar::new();
        let cfg = RunConfig::new("p", "d");
        let cancel = CancellationToken::new();
        let defs = definitions();
        register_all(&registrar, &defs[..1], None, &cfg, &cancel).await;

        let changed = EntityDefinition::decode(
            Path::new("task_0.pb"),
            br#"{"kind":"task","id":{"name":"t0"},"spec":{"template":{"type":"other"}}}"#,
        )
        .unwrap();
        let outcome = register_all(&registrar, &[changed], None, &cfg, &cancel).await;

        assert_eq!(statuses(&outcome), vec![RegistrationStatus::Failed]);
        assert!(outcome.results()[0].info.contains("different structure"));
    }

    #[tokio::test]
    async fn test_upload_location_injected_into_every_request() {
        let registrar = MockRegistrar::new();
        let location = UploadLocation::new("s3://bucket/fast.tar.gz");
        register_all(
            &registrar,
            &definitions(),
            Some(&location),
            &RunConfig::new("p", "d"),
            &CancellationToken::new(),
        )
        .await;

        for request in registrar.requests() {
            assert_eq!(request.source_upload_location(), Some("s3://bucket/fast.tar.gz"));
        }
    }

    #[tokio::test]
    async fn test_enable_schedule_activates_scheduled_launch_plans() {
        let registrar = MockRegistrar::new();
        let mut cfg = RunConfig::new("p", "d");
        cfg.enable_schedule = true;
        register_all(&registrar, &definitions(), None, &cfg, &CancellationToken::new()).await;

        assert_eq!(
            registrar.activations(),
            vec![Identifier::new("p", "d", "lp2", "v1")]
        );
    }

    #[tokio::test]
    async fn test_activation_failure_is_registration_failure() {
        let registrar = MockRegistrar::new().fail_activation_of("lp2");
        let mut cfg = RunConfig::new("p", "d");
        cfg.enable_schedule = true;
        let outcome =
            register_all(&registrar, &definitions(), None, &cfg, &CancellationToken::new()).await;

        assert!(matches!(outcome, SequenceOutcome::HaltedAt { index: 2, .. }));
        assert!(outcome.results()[2].info.contains("schedule activation failed"));
    }

    #[tokio::test]
    async fn test_cancellation_observed_before_registration() {
        let registrar = MockRegistrar::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = register_all(
            &registrar,
            &definitions(),
            None,
            &RunConfig::new("p", "d"),
            &cancel,
        )
        .await;

        assert!(matches!(outcome, SequenceOutcome::Cancelled(ref r) if r.is_empty()));
        assert_eq!(registrar.request_count(), 0);
    }
}
