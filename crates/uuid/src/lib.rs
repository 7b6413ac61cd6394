//! Report identifiers.
//!
//! Every report run is assigned a fresh identifier that doubles as the artifact's storage key
//! and as part of its externally visible filename. To keep filenames deterministic and safe to
//! embed in URLs, the identifier uses a *canonical* UUID representation: **32 lowercase
//! hexadecimal characters** (no hyphens).
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers (REST path segments, CLI arguments) must already be canonical;
//! [`ReportId::parse`] rejects hyphenated or uppercase input rather than normalising it, so a
//! report can only ever be addressed by one spelling.
//!
//! ## Filenames
//! For an identifier `u` the store uses:
//! - `report_<u>.pdf` for the rendered document
//! - `report_<u>.yaml` for its metadata sidecar
//! - `cxr_report_<u>.pdf` as the download filename offered to end users

mod report_id;

pub use report_id::{ReportId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
