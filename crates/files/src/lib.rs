//! CXR Artifact Storage
//!
//! Stores rendered report documents and serves them back by identifier.
//!
//! ## Design Principles
//!
//! - Artifacts are immutable once stored (a second write under the same id is rejected)
//! - A stored artifact is never observable half-written: bytes go to a temporary file in the
//!   same directory and are renamed into place once fully flushed
//! - Each artifact has a YAML metadata sidecar recording its hash, size and media type
//! - Retention and cleanup of old artifacts are out of scope
//!
//! ## Layout
//!
//! ```text
//! <reports_dir>/
//! ├── report_<id>.pdf
//! └── report_<id>.yaml
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use cxr_files::{ArtifactStore, ReportId};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ArtifactStore::open(Path::new("reports"))?;
//! let id = ReportId::new();
//! let metadata = store.persist(&id, b"%PDF-1.3 ...")?;
//! println!("stored {} bytes", metadata.size_bytes);
//! # Ok(())
//! # }
//! ```

mod store;

pub use cxr_uuid::ReportId;
pub use store::{ArtifactMetadata, ArtifactStore};

/// Errors that can occur during artifact storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory could not be created or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// No artifact is stored under the requested id
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// An artifact already exists under this id (immutability violation)
    #[error("Artifact {0} already exists in storage")]
    ArtifactAlreadyExists(String),

    /// Writing the metadata sidecar failed and the artifact could not be removed afterwards
    #[error(
        "persist failed and cleanup also failed (path: {path}): persist={persist_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterPersistFailed {
        path: std::path::PathBuf,
        #[source]
        persist_error: Box<FilesError>,
        cleanup_error: std::io::Error,
    },

    /// Metadata sidecar could not be serialised or parsed
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_yaml::Error),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
