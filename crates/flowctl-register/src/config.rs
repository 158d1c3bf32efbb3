//! Per-invocation registration settings.

/// Version used when neither the run nor the definition names one.
pub const DEFAULT_VERSION: &str = "v1";

/// Default directory the source archive is unpacked into inside task containers.
pub const DEFAULT_DESTINATION_DIR: &str = ".";

/// Immutable configuration for one registration run.
///
/// Built once from command-line flags and passed by reference through every
/// stage of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Target project.
    pub project: String,
    /// Target domain.
    pub domain: String,
    /// Explicit version override.
    pub version: Option<String>,
    /// Keep registering after a per-entity failure.
    pub continue_on_error: bool,
    /// The single input is a tar or tar.gz archive.
    pub archive: bool,
    /// Explicit destination for the source archive.
    pub source_upload_path: Option<String>,
    /// IAM role launch plans execute as.
    pub assumable_iam_role: Option<String>,
    /// Kubernetes service account launch plans execute as.
    pub k8s_service_account: Option<String>,
    /// Prefix for raw output data of launch plan executions.
    pub output_location_prefix: Option<String>,
    /// Directory the source archive is unpacked into inside task containers.
    pub destination_directory: Option<String>,
    /// Activate launch plans that carry a schedule.
    pub enable_schedule: bool,
}

impl RunConfig {
    /// Create a config targeting a project and domain.
    pub fn new(project: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// Set the version override.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the continue-on-error policy.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Treat the single input as an archive.
    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    /// Set an explicit source upload destination.
    pub fn with_source_upload_path(mut self, path: impl Into<String>) -> Self {
        self.source_upload_path = Some(path.into());
        self
    }

    /// Explicit version override, ignoring empty strings.
    pub fn version_override(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }

    /// Version a definition is registered under.
    ///
    /// The override wins, then the definition's own version, then [`DEFAULT_VERSION`].
    pub fn effective_version<'a>(&'a self, own: &'a str) -> &'a str {
        match self.version_override() {
            Some(version) => version,
            None if !own.is_empty() => own,
            None => DEFAULT_VERSION,
        }
    }

    /// Version used to key the source archive upload.
    pub fn upload_version(&self) -> &str {
        self.version_override().unwrap_or(DEFAULT_VERSION)
    }

    /// Destination directory for the source archive inside task containers.
    pub fn destination_dir(&self) -> &str {
        self.destination_directory
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESTINATION_DIR)
    }
}
