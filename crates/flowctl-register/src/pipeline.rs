//! End-to-end registration run.

use std::path::PathBuf;
use std::sync::Arc;

use flowctl_client::AdminClient;
use tokio_util::sync::CancellationToken;

use crate::classifier::classify;
use crate::config::RunConfig;
use crate::error::{RegisterError, Result};
use crate::remote::{
    AdminArtifactStore, AdminRegistrar, ArchiveFetcher, ArtifactStore, HttpFetcher, Registrar,
};
use crate::report::Report;
use crate::resolver::resolve;
use crate::sequencer::{SequenceOutcome, register_all};
use crate::uploader::{SourceArchive, UploadLocation, upload};

/// Result of a run that reached the registration stage.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    /// Run-level error from failed or cancelled registrations.
    pub error: Option<RegisterError>,
    /// Temporary directory removal failure, reported separately.
    pub cleanup_warning: Option<RegisterError>,
    /// Where the source archive was uploaded, for fast registrations.
    pub upload_location: Option<UploadLocation>,
}

impl RunOutcome {
    /// The report, or the run-level error if there is one.
    pub fn into_result(self) -> Result<Report> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.report),
        }
    }
}

/// Registration pipeline: resolve, classify, upload, register, report.
#[derive(Clone)]
pub struct Pipeline {
    registrar: Arc<dyn Registrar>,
    store: Arc<dyn ArtifactStore>,
    fetcher: Arc<dyn ArchiveFetcher>,
}

impl Pipeline {
    /// Create a pipeline over explicit collaborators.
    pub fn new(
        registrar: Arc<dyn Registrar>,
        store: Arc<dyn ArtifactStore>,
        fetcher: Arc<dyn ArchiveFetcher>,
    ) -> Self {
        Self {
            registrar,
            store,
            fetcher,
        }
    }

    /// Create a pipeline talking to the admin service.
    pub fn for_admin(client: AdminClient) -> Self {
        Self::new(
            Arc::new(AdminRegistrar::new(client.clone())),
            Arc::new(AdminArtifactStore::new(client)),
            Arc::new(HttpFetcher::new()),
        )
    }

    /// Run the pipeline over `inputs`.
    ///
    /// Resolution, classification and upload failures are returned as `Err`
    /// with nothing registered. Once registration starts the outcome always
    /// carries a report, with any run-level error alongside it.
    pub async fn run(
        &self,
        inputs: &[String],
        cfg: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let resolved = resolve(inputs, cfg.archive, self.fetcher.as_ref())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to resolve inputs"))?;
        tracing::info!("Parsing file... Total({})", resolved.files.len());

        let result = self.register_files(&resolved.files, cfg, cancel).await;

        let cleanup_warning = match resolved.cleanup() {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to remove temporary directory");
                Some(e)
            }
        };

        let (outcome, upload_location) = result?;
        let report = Report::build(outcome.results());
        let error = run_error(&outcome);

        Ok(RunOutcome {
            report,
            error,
            cleanup_warning,
            upload_location,
        })
    }

    async fn register_files(
        &self,
        files: &[PathBuf],
        cfg: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<(SequenceOutcome, Option<UploadLocation>)> {
        let classification = classify(files).await.into_checked()?;

        let upload_location = match &classification.source_archive {
            Some(path) => {
                tracing::info!(path = %path.display(), "Fast registration detected");
                let archive = SourceArchive::read(path).await?;
                let location = upload(
                    self.store.as_ref(),
                    &cfg.project,
                    &cfg.domain,
                    &archive,
                    cfg.upload_version(),
                    cfg.source_upload_path.as_deref(),
                )
                .await
                .inspect_err(|e| tracing::error!(error = %e, "Source upload failed"))?;
                tracing::info!(%location, "Source code successfully uploaded");
                Some(location)
            }
            None => None,
        };

        let outcome = register_all(
            self.registrar.as_ref(),
            &classification.definitions,
            upload_location.as_ref(),
            cfg,
            cancel,
        )
        .await;

        Ok((outcome, upload_location))
    }
}

fn run_error(outcome: &SequenceOutcome) -> Option<RegisterError> {
    let attempted = outcome.results().len();
    match outcome {
        SequenceOutcome::Cancelled(results) => Some(RegisterError::Cancelled {
            completed: results.len(),
        }),
        SequenceOutcome::HaltedAt { error, .. } => Some(RegisterError::Registration {
            failed: outcome.failure_count(),
            attempted,
            first: error.clone(),
        }),
        SequenceOutcome::Completed(results) => {
            let first = results.iter().find(|r| r.status.is_failure())?;
            Some(RegisterError::Registration {
                failed: outcome.failure_count(),
                attempted,
                first: first.info.clone(),
            })
        }
    }
}
