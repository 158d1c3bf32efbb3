//! Input resolution.
//!
//! Expands the command-line inputs into a sorted list of local files,
//! downloading remote inputs and unpacking archives into a temporary
//! directory owned by the run.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{RegisterError, Result};
use crate::remote::{ArchiveFetcher, is_remote};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Files produced by [`resolve`].
///
/// Holds the temporary directory, if any, for the lifetime of the run. The
/// directory is removed by [`ResolvedInputs::cleanup`] or, failing that, on drop.
#[derive(Debug)]
pub struct ResolvedInputs {
    /// Resolved files in lexicographic order.
    pub files: Vec<PathBuf>,
    temp_dir: Option<TempDir>,
}

impl ResolvedInputs {
    /// Path of the temporary working directory.
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Remove the temporary working directory.
    pub fn cleanup(self) -> Result<()> {
        let Some(dir) = self.temp_dir else {
            return Ok(());
        };
        let path = dir.path().to_path_buf();
        dir.close().map_err(|e| RegisterError::Cleanup {
            path,
            reason: e.to_string(),
        })
    }
}

/// Resolve inputs into local files.
///
/// In archive mode exactly one input is accepted; it is fetched when remote
/// and unpacked (tar, optionally gzip-compressed) into a temporary directory.
/// Otherwise every input is a file, a directory walked recursively, or a
/// remote file downloaded into a temporary directory.
pub async fn resolve(
    inputs: &[String],
    archive: bool,
    fetcher: &dyn ArchiveFetcher,
) -> Result<ResolvedInputs> {
    if inputs.is_empty() {
        return Err(RegisterError::resolution("<none>", "no input files given"));
    }

    let mut temp_dir = None;
    let mut files = Vec::new();

    if archive {
        if inputs.len() != 1 {
            return Err(RegisterError::resolution(
                inputs.join(" "),
                format!("archive mode takes exactly one input, got {}", inputs.len()),
            ));
        }
        let input = &inputs[0];
        let bytes = read_input(input, fetcher).await?;
        let dir = create_temp_dir(input)?;
        unpack(&bytes, dir.path()).map_err(|e| RegisterError::resolution(input, e))?;
        files.extend(walk_files(dir.path()).map_err(|e| RegisterError::resolution(input, e))?);
        temp_dir = Some(dir);
    } else {
        let mut downloaded: Vec<&str> = Vec::new();
        for input in inputs {
            if is_remote(input) {
                if downloaded.contains(&input.as_str()) {
                    continue;
                }
                let bytes = read_input(input, fetcher).await?;
                let dir = match temp_dir.take() {
                    Some(dir) => dir,
                    None => create_temp_dir(input)?,
                };
                // One subdirectory per download so equal basenames never collide.
                let slot = dir.path().join(format!("{:04}", downloaded.len()));
                let target = slot.join(remote_file_name(input));
                std::fs::create_dir_all(&slot)
                    .and_then(|()| std::fs::write(&target, bytes))
                    .map_err(|e| RegisterError::resolution(input, e))?;
                files.push(target);
                downloaded.push(input.as_str());
                temp_dir = Some(dir);
                continue;
            }

            let path = Path::new(input);
            if !path.exists() {
                return Err(RegisterError::resolution(input, "no such file or directory"));
            }
            if path.is_dir() {
                files.extend(walk_files(path).map_err(|e| RegisterError::resolution(input, e))?);
            } else {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    tracing::debug!(count = files.len(), "Resolved input files");

    Ok(ResolvedInputs { files, temp_dir })
}

async fn read_input(input: &str, fetcher: &dyn ArchiveFetcher) -> Result<Vec<u8>> {
    if is_remote(input) {
        return fetcher
            .fetch(input)
            .await
            .map_err(|e| RegisterError::resolution(input, e));
    }
    tokio::fs::read(input)
        .await
        .map_err(|e| RegisterError::resolution(input, e))
}

fn create_temp_dir(input: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("register")
        .tempdir()
        .map_err(|e| RegisterError::resolution(input, e))
}

/// Unpack a tar or tar.gz archive into `dest`.
fn unpack(bytes: &[u8], dest: &Path) -> std::io::Result<()> {
    let reader: Box<dyn Read + '_> = if bytes.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(bytes))
    } else {
        Box::new(bytes)
    };
    let mut archive = tar::Archive::new(reader);
    archive.unpack(dest)?;

    // An empty or non-tar payload unpacks to nothing without complaint.
    if std::fs::read_dir(dest)?.next().is_none() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "archive is empty or not a tar archive",
        ));
    }
    Ok(())
}

/// All regular files under `dir`, recursively.
fn walk_files(dir: &Path) -> std::result::Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn remote_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "download".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFetcher;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs;

    fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        use std::io::Write;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_directory_is_walked_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2_lp.pb"), b"").unwrap();
        fs::write(dir.path().join("0_task.pb"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/1_wf.pb"), b"").unwrap();

        let inputs = vec![dir.path().to_string_lossy().into_owned()];
        let resolved = resolve(&inputs, false, &MockFetcher::new()).await.unwrap();

        assert_eq!(names(&resolved.files), vec!["0_task.pb", "2_lp.pb", "1_wf.pb"]);
        assert!(resolved.temp_dir().is_none());
        resolved.cleanup().unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_inputs_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pb");
        fs::write(&file, b"").unwrap();
        let input = file.to_string_lossy().into_owned();

        let resolved = resolve(&[input.clone(), input], false, &MockFetcher::new())
            .await
            .unwrap();
        assert_eq!(resolved.files.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_input_fails() {
        let err = resolve(&["/nonexistent/a.pb".to_string()], false, &MockFetcher::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_archive_requires_single_input() {
        let err = resolve(&["a.tgz".to_string(), "b.tgz".to_string()], true, &MockFetcher::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exactly one input"));
    }

    #[tokio::test]
    async fn test_tgz_archive_unpacked_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("out.tgz");
        fs::write(
            &archive,
            gzip(&tar_bytes(&[("b/1_wf.pb", b"{}"), ("0_task.pb", b"{}")])),
        )
        .unwrap();

        let inputs = vec![archive.to_string_lossy().into_owned()];
        let resolved = resolve(&inputs, true, &MockFetcher::new()).await.unwrap();
        let temp = resolved.temp_dir().unwrap().to_path_buf();

        assert_eq!(names(&resolved.files), vec!["0_task.pb", "1_wf.pb"]);
        assert!(resolved.files.iter().all(|f| f.starts_with(&temp)));

        resolved.cleanup().unwrap();
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn test_remote_plain_tar_archive() {
        let url = "http://localhost:8080/_pb_output.tar";
        let fetcher = MockFetcher::new().with_body(url, tar_bytes(&[("0_task.pb", b"{}")]));

        let resolved = resolve(&[url.to_string()], true, &fetcher).await.unwrap();
        assert_eq!(names(&resolved.files), vec!["0_task.pb"]);
    }

    #[tokio::test]
    async fn test_corrupt_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("out.tgz");
        fs::write(&archive, [0x1f, 0x8b, 0x00, 0x01, 0x02]).unwrap();

        let inputs = vec![archive.to_string_lossy().into_owned()];
        let err = resolve(&inputs, true, &MockFetcher::new()).await.unwrap_err();
        assert!(matches!(err, RegisterError::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_resolution_error() {
        let inputs = vec!["https://example.com/missing.tar".to_string()];
        let err = resolve(&inputs, true, &MockFetcher::new()).await.unwrap_err();
        assert!(matches!(err, RegisterError::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_remote_file_downloaded_into_temp_dir() {
        let url = "https://example.com/defs/0_task.pb?sig=abc";
        let fetcher = MockFetcher::new().with_body(url, b"{}".to_vec());

        let resolved = resolve(&[url.to_string()], false, &fetcher).await.unwrap();
        assert_eq!(names(&resolved.files), vec!["0_task.pb"]);
        assert!(resolved.temp_dir().is_some());
    }

    #[tokio::test]
    async fn test_remote_files_with_same_name_are_all_kept() {
        let first = "https://a.example.com/x/0_task.pb";
        let second = "https://b.example.com/y/0_task.pb";
        let fetcher = MockFetcher::new()
            .with_body(first, b"alpha".to_vec())
            .with_body(second, b"beta".to_vec());
        let inputs = vec![first.to_string(), second.to_string(), first.to_string()];

        let resolved = resolve(&inputs, false, &fetcher).await.unwrap();

        assert_eq!(resolved.files.len(), 2);
        let contents: Vec<Vec<u8>> = resolved
            .files
            .iter()
            .map(|f| fs::read(f).unwrap())
            .collect();
        assert_eq!(contents, vec![b"alpha".to_vec(), b"beta".to_vec()]);
        resolved.cleanup().unwrap();
    }

    #[test]
    fn test_remote_file_name() {
        assert_eq!(remote_file_name("http://h/a/b.pb"), "b.pb");
        assert_eq!(remote_file_name("http://h/a/"), "download");
    }
}
