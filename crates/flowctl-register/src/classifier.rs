//! File classification.
//!
//! Every resolved file is exactly one of: the fast-registration source
//! archive, a decodable entity definition, or invalid.

use std::path::{Path, PathBuf};

use crate::definition::EntityDefinition;
use crate::error::{RegisterError, Result};

/// Name prefix of a fast-registration source archive.
pub const SOURCE_ARCHIVE_PREFIX: &str = "fast";
/// Name suffix of a fast-registration source archive.
pub const SOURCE_ARCHIVE_SUFFIX: &str = ".tar.gz";
/// Extensions of serialized entity definitions.
pub const DEFINITION_EXTENSIONS: [&str; 2] = ["pb", "json"];

/// Classification of a single file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileKind {
    Source,
    Definition(Box<EntityDefinition>),
    Invalid(String),
}

/// A file that could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Partition of a run's files.
#[derive(Debug, Default)]
pub struct Classification {
    /// The authoritative source archive: the first candidate in input order.
    pub source_archive: Option<PathBuf>,
    /// Further source archive candidates.
    pub extra_source_archives: Vec<PathBuf>,
    /// Valid definitions in input order.
    pub definitions: Vec<EntityDefinition>,
    pub invalid: Vec<InvalidFile>,
}

impl Classification {
    /// Reject the partition if anything in it prevents registration.
    ///
    /// Any invalid file, or more than one source archive, fails the whole run.
    pub fn into_checked(self) -> Result<Self> {
        if !self.invalid.is_empty() {
            for file in &self.invalid {
                tracing::error!(
                    path = %file.path.display(),
                    reason = %file.reason,
                    "Invalid input file"
                );
            }
            return Err(RegisterError::Classification {
                reason: "unrecognized files".to_string(),
                paths: self.invalid.into_iter().map(|f| f.path).collect(),
            });
        }
        if !self.extra_source_archives.is_empty() {
            let paths = self
                .source_archive
                .into_iter()
                .chain(self.extra_source_archives)
                .collect();
            return Err(RegisterError::Classification {
                reason: "more than one source archive".to_string(),
                paths,
            });
        }
        Ok(self)
    }
}

/// Whether a path names a fast-registration source archive.
pub fn is_source_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.starts_with(SOURCE_ARCHIVE_PREFIX) && name.ends_with(SOURCE_ARCHIVE_SUFFIX)
        })
}

/// Whether a path carries a definition extension.
pub fn has_definition_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DEFINITION_EXTENSIONS.contains(&ext))
}

/// Classify one file given its content.
pub fn classify_file(path: &Path, bytes: &[u8]) -> FileKind {
    if is_source_archive(path) {
        return FileKind::Source;
    }
    if !has_definition_extension(path) {
        return FileKind::Invalid("unrecognized file type".to_string());
    }
    match EntityDefinition::decode(path, bytes) {
        Ok(definition) => FileKind::Definition(Box::new(definition)),
        Err(reason) => FileKind::Invalid(reason),
    }
}

/// Classify every file, preserving input order within each category.
pub async fn classify(files: &[PathBuf]) -> Classification {
    let mut classification = Classification::default();

    for path in files {
        let kind = if is_source_archive(path) {
            FileKind::Source
        } else {
            match tokio::fs::read(path).await {
                Ok(bytes) => classify_file(path, &bytes),
                Err(e) => FileKind::Invalid(format!("unreadable: {}", e)),
            }
        };
        tracing::debug!(path = %path.display(), kind = kind_name(&kind), "Classified file");

        match kind {
            FileKind::Source if classification.source_archive.is_none() => {
                classification.source_archive = Some(path.clone());
            }
            FileKind::Source => {
                tracing::warn!(path = %path.display(), "Additional source archive found");
                classification.extra_source_archives.push(path.clone());
            }
            FileKind::Definition(definition) => classification.definitions.push(*definition),
            FileKind::Invalid(reason) => classification.invalid.push(InvalidFile {
                path: path.clone(),
                reason,
            }),
        }
    }

    classification
}

fn kind_name(kind: &FileKind) -> &'static str {
    match kind {
        FileKind::Source => "source",
        FileKind::Definition(_) => "definition",
        FileKind::Invalid(_) => "invalid",
    }
}
