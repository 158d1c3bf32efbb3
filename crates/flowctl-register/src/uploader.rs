//! Source archive upload for fast registration.

use std::fmt;
use std::path::{Path, PathBuf};

use flowctl_client::CreateUploadLocationRequest;
use sha2::{Digest, Sha256};

use crate::error::{RegisterError, Result};
use crate::remote::ArtifactStore;

/// The source archive of a fast registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArchive {
    /// Local path the archive was read from.
    pub path: PathBuf,
    /// File name used to key the remote object.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl SourceArchive {
    /// Read an archive from disk.
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RegisterError::Upload {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            filename,
            bytes,
        })
    }

    /// Hex-encoded SHA-256 of the archive bytes.
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// Where the source archive was placed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadLocation(String);

impl UploadLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage key for an archive: `{project}/{domain}/{version}/{sha256}/{filename}`.
///
/// Identical content under the same coordinates always maps to the same key.
pub fn destination_key(
    project: &str,
    domain: &str,
    version: &str,
    archive: &SourceArchive,
) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        project,
        domain,
        version,
        archive.sha256_hex(),
        archive.filename
    )
}

/// Upload the source archive and return its location.
///
/// An explicit destination is handed to the store verbatim. Bytes are only
/// transferred when the store does not already hold the object.
pub async fn upload(
    store: &dyn ArtifactStore,
    project: &str,
    domain: &str,
    archive: &SourceArchive,
    version: &str,
    explicit_destination: Option<&str>,
) -> Result<UploadLocation> {
    let upload_error = |reason: String| RegisterError::Upload {
        path: archive.path.clone(),
        reason,
    };

    let explicit = explicit_destination.filter(|d| !d.is_empty());
    let request = CreateUploadLocationRequest {
        project: project.to_string(),
        domain: domain.to_string(),
        filename: archive.filename.clone(),
        content_sha256: archive.sha256_hex(),
        key: match explicit {
            Some(_) => None,
            None => Some(destination_key(project, domain, version, archive)),
        },
        native_url: explicit.map(str::to_string),
    };

    let location = store
        .create_upload_location(&request)
        .await
        .map_err(|e| upload_error(e.to_string()))?;

    if location.exists {
        tracing::info!(
            location = %location.native_url,
            "Source archive already uploaded, skipping transfer"
        );
    } else {
        tracing::debug!(
            size = archive.bytes.len(),
            location = %location.native_url,
            "Uploading source archive"
        );
        store
            .put(&location.signed_url, archive.bytes.clone())
            .await
            .map_err(|e| upload_error(e.to_string()))?;
    }

    let native = match explicit {
        Some(destination) => destination.to_string(),
        None => location.native_url,
    };
    Ok(UploadLocation::new(native))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockArtifactStore;

    fn archive(bytes: &[u8]) -> SourceArchive {
        SourceArchive {
            path: PathBuf::from("out/fast123abc.tar.gz"),
            filename: "fast123abc.tar.gz".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_destination_key_is_content_addressed() {
        let a = destination_key("p", "d", "v1", &archive(b"one"));
        let b = destination_key("p", "d", "v1", &archive(b"one"));
        let c = destination_key("p", "d", "v1", &archive(b"two"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("p/d/v1/"));
        assert!(a.ends_with("/fast123abc.tar.gz"));
    }

    #[tokio::test]
    async fn test_upload_twice_yields_same_location_and_one_transfer() {
        let store = MockArtifactStore::new();
        let src = archive(b"source code");

        let first = upload(&store, "p", "d", &src, "v1", None).await.unwrap();
        let second = upload(&store, "p", "d", &src, "v1", None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.location_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_explicit_destination_used_verbatim() {
        let store = MockArtifactStore::new();
        let location = upload(&store, "p", "d", &archive(b"x"), "v1", Some("s3://dummy/fast"))
            .await
            .unwrap();

        assert_eq!(location.as_str(), "s3://dummy/fast");
        let requests = store.location_requests();
        assert_eq!(requests[0].native_url.as_deref(), Some("s3://dummy/fast"));
        assert!(requests[0].key.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_is_upload_error() {
        let store = MockArtifactStore::failing("connection reset");
        let err = upload(&store, "p", "d", &archive(b"x"), "v1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Upload { .. }));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_read_missing_archive() {
        let err = SourceArchive::read(Path::new("/nonexistent/fast.tar.gz"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Upload { .. }));
    }
}
