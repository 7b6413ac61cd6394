//! Artifact store implementation.
//!
//! The [`ArtifactStore`] owns one directory. It performs minimal I/O in the constructor
//! (create + canonicalise) and every write goes through [`ArtifactStore::write_atomically`],
//! which stages the bytes in a `tempfile::NamedTempFile` inside the same directory and then
//! renames it over the final name. Rename within a directory is atomic on the filesystems we
//! target, so readers either see the whole file or nothing.

use crate::{FilesError, ReportId};
use chrono::{DateTime, Utc};
use cxr_types::NonEmptyText;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Metadata recorded next to every stored artifact.
///
/// Serialised to YAML as `report_<id>.yaml`. Contains no patient identifiers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Identifier the artifact was stored under
    pub report_id: ReportId,

    /// Hashing algorithm used (always "sha256")
    pub hash_algorithm: NonEmptyText,

    /// Hexadecimal digest of the artifact bytes
    pub hash: String,

    /// Filename within the store directory
    pub file_name: NonEmptyText,

    /// Size of the artifact in bytes
    pub size_bytes: u64,

    /// Detected media type, best-effort
    pub media_type: Option<NonEmptyText>,

    /// UTC timestamp when the artifact was stored
    pub stored_at: DateTime<Utc>,
}

/// Directory-backed store for rendered report artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Canonicalised directory holding artifacts and sidecars
    root_directory: PathBuf,
}

impl ArtifactStore {
    /// Opens (creating if necessary) the store rooted at `root_directory`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if the directory cannot be created, is not a
    /// directory, or cannot be canonicalised.
    pub fn open(root_directory: &Path) -> Result<Self, FilesError> {
        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create directory {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Stores `bytes` as the artifact for `id` and writes its metadata sidecar.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - an artifact already exists for `id`
    /// - staging, flushing or renaming the file fails (I/O)
    /// - the sidecar cannot be written; the artifact is then removed again, and
    ///   [`FilesError::CleanupAfterPersistFailed`] is returned if that removal fails too
    pub fn persist(&self, id: &ReportId, bytes: &[u8]) -> Result<ArtifactMetadata, FilesError> {
        let artifact_path = self.artifact_path(id);
        if artifact_path.exists() {
            return Err(FilesError::ArtifactAlreadyExists(id.to_string()));
        }

        self.write_atomically(&artifact_path, bytes)?;

        let metadata = ArtifactMetadata {
            report_id: *id,
            hash_algorithm: NonEmptyText::new("sha256").expect("sha256 is non-empty"),
            hash: hex::encode(Sha256::digest(bytes)),
            file_name: NonEmptyText::new(id.artifact_file_name())
                .expect("artifact file name is non-empty"),
            size_bytes: bytes.len() as u64,
            media_type: infer::get(bytes)
                .map(|kind| NonEmptyText::new(kind.mime_type()).expect("mime type is non-empty")),
            stored_at: Utc::now(),
        };

        if let Err(persist_error) = self.write_metadata(id, &metadata) {
            return match fs::remove_file(&artifact_path) {
                Ok(()) => Err(persist_error),
                Err(cleanup_error) => Err(FilesError::CleanupAfterPersistFailed {
                    path: artifact_path,
                    persist_error: Box::new(persist_error),
                    cleanup_error,
                }),
            };
        }

        tracing::debug!(
            report_id = %id,
            size_bytes = metadata.size_bytes,
            "artifact stored"
        );
        Ok(metadata)
    }

    /// Reads the artifact bytes stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::ArtifactNotFound`] if nothing is stored under `id`, or
    /// [`FilesError::Io`] if the file cannot be read.
    pub fn read(&self, id: &ReportId) -> Result<Vec<u8>, FilesError> {
        let path = self.artifact_path(id);
        if !path.is_file() {
            return Err(FilesError::ArtifactNotFound(id.to_string()));
        }
        Ok(fs::read(&path)?)
    }

    /// Reads the metadata sidecar stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::ArtifactNotFound`] if no sidecar exists, or
    /// [`FilesError::Metadata`] if it cannot be parsed.
    pub fn metadata(&self, id: &ReportId) -> Result<ArtifactMetadata, FilesError> {
        let path = self.metadata_path(id);
        if !path.is_file() {
            return Err(FilesError::ArtifactNotFound(id.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Absolute path of the artifact for `id` (which may not exist yet).
    pub fn artifact_path(&self, id: &ReportId) -> PathBuf {
        self.root_directory.join(id.artifact_file_name())
    }

    /// Returns the canonicalised store directory.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    fn metadata_path(&self, id: &ReportId) -> PathBuf {
        self.root_directory.join(id.metadata_file_name())
    }

    fn write_metadata(&self, id: &ReportId, metadata: &ArtifactMetadata) -> Result<(), FilesError> {
        let yaml = serde_yaml::to_string(metadata)?;
        self.write_atomically(&self.metadata_path(id), yaml.as_bytes())
    }

    /// Stages `bytes` next to `target` and renames into place without clobbering.
    fn write_atomically(&self, target: &Path, bytes: &[u8]) -> Result<(), FilesError> {
        let mut staged = tempfile::NamedTempFile::new_in(&self.root_directory)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist_noclobber(target).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                FilesError::ArtifactAlreadyExists(target.display().to_string())
            } else {
                FilesError::Io(e.error)
            }
        })?;
        Ok(())
    }
}
