//! # CXR Core
//!
//! Core pipeline for the chest X-ray report service.
//!
//! This crate turns a classifier score vector into a stored PDF report:
//! - Prompt construction and a single timed call to a narrative backend (Gemini)
//! - Tolerant parsing of the returned narrative into a structured document
//! - Paginated PDF layout and atomic persistence into the reports directory
//!
//! **No API concerns**: HTTP servers and CLI argument handling belong in `api-rest`, `api-shared`
//! and `cli`. Model inference also lives outside this crate; callers supply probabilities.

pub mod conditions;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod findings;
pub mod narrative;
pub mod parser;
pub mod prompt;
pub mod render;
pub mod service;

pub use conditions::{Condition, ConditionSet, Diagnosis, ScoreVector};
pub use config::CoreConfig;
pub use cxr_files::{ArtifactMetadata, ArtifactStore, FilesError};
pub use cxr_uuid::ReportId;
pub use document::{
    Block, FindingRow, FindingsTable, Interpretation, Paragraph, Section, Span,
    StructuredDocument,
};
pub use error::{BackendError, ErrorCategory, RenderError, ReportError, ReportResult};
pub use narrative::{
    validate_narrative, GeminiBackend, GeminiConfig, NarrativeBackend, NarrativeRequester,
    RawNarrative,
};
pub use parser::{SectionParser, TrailingFindings};
pub use prompt::Prompt;
pub use render::{DocumentRenderer, RenderContext, RenderedArtifact};
pub use service::ReportService;
