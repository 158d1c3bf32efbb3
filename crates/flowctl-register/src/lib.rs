//! Registration pipeline for serialized workflow entities.
//!
//! Takes a set of definition files, optionally with a fast-registration
//! source archive, and registers them against the admin service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌───────────┐   ┌────────┐
//! │ Resolver │──▶│ Classifier │──▶│ Uploader │──▶│ Sequencer │──▶│ Report │
//! └──────────┘   └────────────┘   └──────────┘   └───────────┘   └────────┘
//!  files/dirs/    source | def |   content-       ordered,         ordered
//!  URLs/archive   invalid          addressed      fail-fast or     records
//!                                  upload         best-effort
//! ```
//!
//! Every stage completes before the next begins. Remote collaborators sit
//! behind the [`Registrar`], [`ArtifactStore`] and [`ArchiveFetcher`] traits.

pub mod classifier;
pub mod config;
pub mod definition;
pub mod error;
pub mod hydrate;
pub mod mock;
pub mod pipeline;
pub mod remote;
pub mod report;
pub mod resolver;
pub mod sequencer;
pub mod uploader;

pub use classifier::{Classification, FileKind, InvalidFile, classify, classify_file};
pub use config::{DEFAULT_VERSION, RunConfig};
pub use definition::{EntityDefinition, EntitySpec};
pub use error::{RegisterError, Result};
pub use hydrate::{RegistrationRequest, hydrate};
pub use mock::{MockArtifactStore, MockFetcher, MockRegistrar};
pub use pipeline::{Pipeline, RunOutcome};
pub use remote::{
    AdminArtifactStore, AdminRegistrar, ArchiveFetcher, ArtifactStore, HttpFetcher, Registrar,
};
pub use report::{Report, ReportRecord};
pub use resolver::{ResolvedInputs, resolve};
pub use sequencer::{RegistrationResult, RegistrationStatus, SequenceOutcome, register_all};
pub use uploader::{SourceArchive, UploadLocation, destination_key, upload};
