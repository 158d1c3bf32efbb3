//! Registration report.

use serde::Serialize;

use crate::sequencer::{RegistrationResult, RegistrationStatus};

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    pub name: String,
    pub kind: String,
    pub version: String,
    pub status: RegistrationStatus,
    pub additional_info: String,
    /// Definition file the entity came from.
    pub file: String,
}

/// Ordered report of a registration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
    pub records: Vec<ReportRecord>,
}

impl Report {
    /// Build a report from results, preserving their order.
    pub fn build(results: &[RegistrationResult]) -> Self {
        let records = results
            .iter()
            .map(|result| ReportRecord {
                name: result.id.name.clone(),
                kind: result.kind.to_string(),
                version: result.id.version.clone(),
                status: result.status,
                additional_info: result.info.clone(),
                file: result.source.display().to_string(),
            })
            .collect();
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of records with the given status.
    pub fn count(&self, status: RegistrationStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(RegistrationStatus::Failed) > 0
    }
}
