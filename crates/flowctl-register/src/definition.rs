//! Serialized entity definitions.
//!
//! A definition file holds a JSON envelope:
//!
//! ```json
//! { "kind": "workflow",
//!   "id": { "project": "p", "domain": "d", "name": "wf", "version": "v1" },
//!   "spec": { "template": { "nodes": [] } } }
//! ```

use std::path::{Path, PathBuf};

use flowctl_client::{Identifier, LaunchPlanSpec, ResourceType, TaskSpec, WorkflowSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind-specific payload of a definition.
#[derive(Debug, Clone, PartialEq)]
pub enum EntitySpec {
    Task(TaskSpec),
    Workflow(WorkflowSpec),
    LaunchPlan(LaunchPlanSpec),
}

impl EntitySpec {
    /// Resource type of this payload.
    pub fn kind(&self) -> ResourceType {
        match self {
            EntitySpec::Task(_) => ResourceType::Task,
            EntitySpec::Workflow(_) => ResourceType::Workflow,
            EntitySpec::LaunchPlan(_) => ResourceType::LaunchPlan,
        }
    }
}

/// A decoded, registrable entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDefinition {
    /// Identity as serialized; project, domain and version are hydrated later.
    pub id: Identifier,
    pub spec: EntitySpec,
    /// File the definition was read from.
    pub source: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    kind: ResourceType,
    #[serde(default)]
    id: Identifier,
    spec: Value,
}

impl EntityDefinition {
    /// Decode a definition from file content.
    ///
    /// Fails when the content is not an envelope, the kind is unknown, the
    /// spec does not match the kind, or the name is empty.
    pub fn decode(source: &Path, bytes: &[u8]) -> Result<Self, String> {
        let envelope: Envelope =
            serde_json::from_slice(bytes).map_err(|e| format!("not an entity definition: {e}"))?;

        if envelope.id.name.trim().is_empty() {
            return Err("entity name is empty".to_string());
        }

        let spec = match envelope.kind {
            ResourceType::Task => serde_json::from_value(envelope.spec).map(EntitySpec::Task),
            ResourceType::Workflow => {
                serde_json::from_value(envelope.spec).map(EntitySpec::Workflow)
            }
            ResourceType::LaunchPlan => {
                serde_json::from_value(envelope.spec).map(EntitySpec::LaunchPlan)
            }
        }
        .map_err(|e| format!("invalid {} spec: {e}", envelope.kind))?;

        Ok(Self {
            id: envelope.id,
            spec,
            source: source.to_path_buf(),
        })
    }

    /// Encode back into envelope form.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        let spec = match &self.spec {
            EntitySpec::Task(spec) => serde_json::to_value(spec)?,
            EntitySpec::Workflow(spec) => serde_json::to_value(spec)?,
            EntitySpec::LaunchPlan(spec) => serde_json::to_value(spec)?,
        };
        serde_json::to_vec_pretty(&Envelope {
            kind: self.kind(),
            id: self.id.clone(),
            spec,
        })
    }

    /// Resource type of this definition.
    pub fn kind(&self) -> ResourceType {
        self.spec.kind()
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        &self.id.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<EntityDefinition, String> {
        let bytes = serde_json::to_vec(&value).unwrap();
        EntityDefinition::decode(Path::new("x.pb"), &bytes)
    }

    #[test]
    fn test_decode_task() {
        let def = decode(json!({
            "kind": "task",
            "id": { "name": "core.say_hello" },
            "spec": { "template": { "type": "python-task", "container": { "image": "img" } } }
        }))
        .unwrap();
        assert_eq!(def.kind(), ResourceType::Task);
        assert_eq!(def.name(), "core.say_hello");
        assert_eq!(def.id.version, "");
        assert_eq!(def.source, PathBuf::from("x.pb"));
    }

    #[test]
    fn test_decode_launch_plan() {
        let def = decode(json!({
            "kind": "launch_plan",
            "id": { "name": "lp", "version": "abc" },
            "spec": {
                "workflow_id": { "name": "wf" },
                "schedule": { "cron_expression": "0 * * * *" }
            }
        }))
        .unwrap();
        let EntitySpec::LaunchPlan(spec) = &def.spec else {
            panic!("expected launch plan");
        };
        assert_eq!(spec.workflow_id.name, "wf");
        assert!(spec.schedule.is_some());
    }

    #[test]
    fn test_decode_rejects_bad_content() {
        assert!(decode(json!({ "kind": "pipeline", "id": { "name": "x" }, "spec": {} })).is_err());
        assert!(
            decode(json!({ "kind": "task", "id": { "name": "" }, "spec": { "template": {} } }))
                .is_err()
        );
        assert!(
            decode(json!({
                "kind": "workflow",
                "id": { "name": "wf" },
                "spec": { "template": { "nodes": 3 } }
            }))
            .is_err()
        );
        assert!(EntityDefinition::decode(Path::new("x.pb"), b"\x00\x01binary").is_err());
    }

    #[test]
    fn test_encode_then_decode_preserves_definition() {
        let def = decode(json!({
            "kind": "workflow",
            "id": { "project": "p", "domain": "d", "name": "wf", "version": "v1" },
            "spec": {
                "template": {
                    "nodes": [ { "id": "n0", "task_ref": { "name": "t" } } ],
                    "metadata": { "x": 1 }
                }
            }
        }))
        .unwrap();
        let bytes = def.encode().unwrap();
        let again = EntityDefinition::decode(Path::new("x.pb"), &bytes).unwrap();
        assert_eq!(def, again);
    }
}
