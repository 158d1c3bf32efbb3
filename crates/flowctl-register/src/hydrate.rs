//! Registration-time overrides.
//!
//! Turns a decoded [`EntityDefinition`] into the request sent to the admin
//! service: target coordinates, version, execution identity and the source
//! archive location are filled in from the [`RunConfig`].

use flowctl_client::{
    AuthRole, CreateEntityRequest, Identifier, Identity, LaunchPlanSpec, RawOutputDataConfig,
    ResourceType, SecurityContext, TaskSpec, WorkflowSpec, WorkflowTemplate,
};

use crate::config::RunConfig;
use crate::definition::{EntityDefinition, EntitySpec};
use crate::uploader::UploadLocation;

/// Placeholder for the project in serialized references.
pub const PROJECT_PLACEHOLDER: &str = "{{ registration.project }}";
/// Placeholder for the domain in serialized references.
pub const DOMAIN_PLACEHOLDER: &str = "{{ registration.domain }}";
/// Placeholder for the version in serialized references.
pub const VERSION_PLACEHOLDER: &str = "{{ registration.version }}";
/// Container argument placeholder for the uploaded source archive.
pub const REMOTE_PACKAGE_PLACEHOLDER: &str = "{{ .remote_package_path }}";
/// Container argument placeholder for the in-container source directory.
pub const DEST_DIR_PLACEHOLDER: &str = "{{ .dest_dir }}";

/// A fully hydrated registration request.
#[derive(Debug, Clone)]
pub enum RegistrationRequest {
    Task(CreateEntityRequest<TaskSpec>),
    Workflow(CreateEntityRequest<WorkflowSpec>),
    LaunchPlan(CreateEntityRequest<LaunchPlanSpec>),
}

impl RegistrationRequest {
    /// Identifier the entity is registered under.
    pub fn id(&self) -> &Identifier {
        match self {
            RegistrationRequest::Task(req) => &req.id,
            RegistrationRequest::Workflow(req) => &req.id,
            RegistrationRequest::LaunchPlan(req) => &req.id,
        }
    }

    /// Resource type being registered.
    pub fn kind(&self) -> ResourceType {
        match self {
            RegistrationRequest::Task(_) => ResourceType::Task,
            RegistrationRequest::Workflow(_) => ResourceType::Workflow,
            RegistrationRequest::LaunchPlan(_) => ResourceType::LaunchPlan,
        }
    }

    /// Source archive location carried by the request.
    pub fn source_upload_location(&self) -> Option<&str> {
        match self {
            RegistrationRequest::Task(req) => req.source_upload_location.as_deref(),
            RegistrationRequest::Workflow(req) => req.source_upload_location.as_deref(),
            RegistrationRequest::LaunchPlan(req) => req.source_upload_location.as_deref(),
        }
    }

    /// Whether this is a launch plan with a schedule attached.
    pub fn has_schedule(&self) -> bool {
        matches!(self, RegistrationRequest::LaunchPlan(req) if req.spec.schedule.is_some())
    }
}

/// Apply run overrides to a definition.
pub fn hydrate(
    definition: &EntityDefinition,
    cfg: &RunConfig,
    upload: Option<&UploadLocation>,
) -> RegistrationRequest {
    let version = cfg.effective_version(&definition.id.version).to_string();
    let id = Identifier::new(&cfg.project, &cfg.domain, &definition.id.name, &version);
    let source_upload_location = upload.map(|location| location.to_string());

    match &definition.spec {
        EntitySpec::Task(spec) => {
            let mut spec = spec.clone();
            if let Some(location) = upload {
                hydrate_task(&mut spec, location, cfg.destination_dir());
            }
            RegistrationRequest::Task(CreateEntityRequest {
                id,
                spec,
                source_upload_location,
            })
        }
        EntitySpec::Workflow(spec) => {
            let mut spec = spec.clone();
            hydrate_workflow_template(&mut spec.template, cfg, &version);
            for sub in &mut spec.sub_workflows {
                hydrate_workflow_template(sub, cfg, &version);
            }
            RegistrationRequest::Workflow(CreateEntityRequest {
                id,
                spec,
                source_upload_location,
            })
        }
        EntitySpec::LaunchPlan(spec) => {
            let mut spec = spec.clone();
            hydrate_reference(&mut spec.workflow_id, cfg, &version);
            hydrate_launch_plan(&mut spec, cfg);
            RegistrationRequest::LaunchPlan(CreateEntityRequest {
                id,
                spec,
                source_upload_location,
            })
        }
    }
}

/// Fill in the coordinates of a reference to another entity.
///
/// Blank or placeholder fields are filled; an explicit version override
/// replaces the version unconditionally.
fn hydrate_reference(reference: &mut Identifier, cfg: &RunConfig, version: &str) {
    if is_unset(&reference.project, PROJECT_PLACEHOLDER) {
        reference.project = cfg.project.clone();
    }
    if is_unset(&reference.domain, DOMAIN_PLACEHOLDER) {
        reference.domain = cfg.domain.clone();
    }
    if cfg.version_override().is_some() || is_unset(&reference.version, VERSION_PLACEHOLDER) {
        reference.version = version.to_string();
    }
}

fn is_unset(value: &str, placeholder: &str) -> bool {
    value.is_empty() || value == placeholder
}

fn hydrate_workflow_template(template: &mut WorkflowTemplate, cfg: &RunConfig, version: &str) {
    if let Some(id) = template.id.as_mut() {
        hydrate_reference(id, cfg, version);
    }
    for node in &mut template.nodes {
        for reference in node.references_mut() {
            hydrate_reference(reference, cfg, version);
        }
    }
}

fn hydrate_task(spec: &mut TaskSpec, location: &UploadLocation, dest_dir: &str) {
    let Some(container) = spec.template.container.as_mut() else {
        return;
    };
    for arg in &mut container.args {
        if arg.contains(REMOTE_PACKAGE_PLACEHOLDER) || arg.contains(DEST_DIR_PLACEHOLDER) {
            *arg = arg
                .replace(REMOTE_PACKAGE_PLACEHOLDER, location.as_str())
                .replace(DEST_DIR_PLACEHOLDER, dest_dir);
        }
    }
}

fn hydrate_launch_plan(spec: &mut LaunchPlanSpec, cfg: &RunConfig) {
    let iam_role = cfg.assumable_iam_role.clone().filter(|s| !s.is_empty());
    let service_account = cfg.k8s_service_account.clone().filter(|s| !s.is_empty());

    if iam_role.is_some() || service_account.is_some() {
        spec.auth_role = Some(AuthRole {
            assumable_iam_role: iam_role.clone(),
            kubernetes_service_account: service_account.clone(),
        });
        spec.security_context
            .get_or_insert_with(SecurityContext::default)
            .run_as = Some(Identity {
            iam_role,
            k8s_service_account: service_account,
        });
    }

    if let Some(prefix) = cfg.output_location_prefix.as_ref().filter(|s| !s.is_empty()) {
        spec.raw_output_data_config = Some(RawOutputDataConfig {
            output_location_prefix: prefix.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use serde_json::json;

    fn definition(value: serde_json::Value) -> EntityDefinition {
        EntityDefinition::decode(Path::new("def.pb"), &serde_json::to_vec(&value).unwrap()).unwrap()
    }

    fn location() -> UploadLocation {
        UploadLocation::new("s3://bucket/p/d/v1/abc/fast.tar.gz")
    }

    #[test]
    fn test_task_gets_coordinates_and_source_location() {
        let def = definition(json!({
            "kind": "task",
            "id": { "name": "t1" },
            "spec": { "template": { "type": "python-task", "container": {
                "image": "img",
                "args": ["fast-execute", "--additional-distribution", "{{ .remote_package_path }}",
                         "--dest-dir", "{{ .dest_dir }}", "--", "run"]
            } } }
        }));
        let cfg = RunConfig::new("p", "d");
        let request = hydrate(&def, &cfg, Some(&location()));

        assert_eq!(request.id(), &Identifier::new("p", "d", "t1", "v1"));
        assert_eq!(request.source_upload_location(), Some("s3://bucket/p/d/v1/abc/fast.tar.gz"));
        let RegistrationRequest::Task(req) = request else {
            panic!("expected task");
        };
        let args = &req.spec.template.container.as_ref().unwrap().args;
        assert_eq!(args[2], "s3://bucket/p/d/v1/abc/fast.tar.gz");
        assert_eq!(args[4], ".");
        assert_eq!(args[6], "run");
    }

    #[test]
    fn test_task_placeholders_untouched_without_upload() {
        let def = definition(json!({
            "kind": "task",
            "id": { "name": "t1", "version": "own" },
            "spec": { "template": { "container": { "image": "img", "args": ["{{ .dest_dir }}"] } } }
        }));
        let RegistrationRequest::Task(req) = hydrate(&def, &RunConfig::new("p", "d"), None) else {
            panic!("expected task");
        };
        assert_eq!(req.id.version, "own");
        assert!(req.source_upload_location.is_none());
        assert_eq!(req.spec.template.container.unwrap().args, vec!["{{ .dest_dir }}"]);
    }

    #[test]
    fn test_workflow_references_follow_version_override() {
        let def = definition(json!({
            "kind": "workflow",
            "id": { "name": "wf", "version": "old" },
            "spec": { "template": { "nodes": [
                {
                    "id": "n0",
                    "task_ref": {
                        "project": "{{ registration.project }}",
                        "name": "t1",
                        "version": "old"
                    }
                },
                {
                    "id": "n1",
                    "task_ref": {
                        "project": "shared",
                        "domain": "prod",
                        "name": "lib",
                        "version": "old"
                    }
                }
            ] } }
        }));
        let cfg = RunConfig::new("p", "d").with_version("v2");
        let RegistrationRequest::Workflow(req) = hydrate(&def, &cfg, None) else {
            panic!("expected workflow");
        };
        assert_eq!(req.id.version, "v2");
        let nodes = &req.spec.template.nodes;
        assert_eq!(nodes[0].task_ref.as_ref().unwrap(), &Identifier::new("p", "d", "t1", "v2"));
        assert_eq!(
            nodes[1].task_ref.as_ref().unwrap(),
            &Identifier::new("shared", "prod", "lib", "v2")
        );
    }

    #[test]
    fn test_workflow_references_keep_their_own_version() {
        let def = definition(json!({
            "kind": "workflow",
            "id": { "name": "wf" },
            "spec": { "template": { "nodes": [
                { "id": "n0", "task_ref": { "name": "t1", "version": "pinned" } },
                { "id": "n1", "task_ref": { "name": "t2" } }
            ] } }
        }));
        let request = hydrate(&def, &RunConfig::new("p", "d"), None);
        let RegistrationRequest::Workflow(req) = request else {
            panic!("expected workflow");
        };
        let nodes = &req.spec.template.nodes;
        assert_eq!(nodes[0].task_ref.as_ref().unwrap().version, "pinned");
        assert_eq!(nodes[1].task_ref.as_ref().unwrap().version, "v1");
    }

    #[test]
    fn test_launch_plan_overrides() {
        let def = definition(json!({
            "kind": "launch_plan",
            "id": { "name": "lp" },
            "spec": {
                "workflow_id": { "name": "wf" },
                "security_context": { "secrets": [] }
            }
        }));
        let mut cfg = RunConfig::new("p", "d");
        cfg.assumable_iam_role = Some("arn:aws:iam::123456789:role/dummy".to_string());
        cfg.k8s_service_account = Some("svc".to_string());
        cfg.output_location_prefix = Some("s3://dummy/prefix".to_string());

        let RegistrationRequest::LaunchPlan(req) = hydrate(&def, &cfg, None) else {
            panic!("expected launch plan");
        };
        let spec = req.spec;
        assert_eq!(spec.workflow_id, Identifier::new("p", "d", "wf", "v1"));

        let auth = spec.auth_role.unwrap();
        assert_eq!(auth.assumable_iam_role.as_deref(), Some("arn:aws:iam::123456789:role/dummy"));
        assert_eq!(auth.kubernetes_service_account.as_deref(), Some("svc"));

        let security = spec.security_context.unwrap();
        assert!(security.extra.contains_key("secrets"));
        assert_eq!(security.run_as.unwrap().k8s_service_account.as_deref(), Some("svc"));

        assert_eq!(
            spec.raw_output_data_config.unwrap().output_location_prefix,
            "s3://dummy/prefix"
        );
    }

    #[test]
    fn test_launch_plan_without_overrides_is_unchanged() {
        let def = definition(json!({
            "kind": "launch_plan",
            "id": { "name": "lp" },
            "spec": {
                "workflow_id": { "name": "wf" },
                "schedule": { "cron_expression": "@hourly" }
            }
        }));
        let request = hydrate(&def, &RunConfig::new("p", "d"), None);
        assert!(request.has_schedule());
        let RegistrationRequest::LaunchPlan(req) = request else {
            panic!("expected launch plan");
        };
        assert!(req.spec.auth_role.is_none());
        assert!(req.spec.security_context.is_none());
        assert!(req.spec.raw_output_data_config.is_none());
    }
}
