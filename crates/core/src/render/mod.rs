//! Document renderer.
//!
//! Rendering is split into a pure [`layout`] step and a PDF encoding step. The encoded bytes are
//! handed to the [`ArtifactStore`], which makes them visible atomically. Both steps are
//! CPU/IO-bound and run on the blocking pool when driven from async code.

pub mod layout;
mod metrics;
mod pdf;

pub use layout::{DrawOp, FontFace, Layout, Page, PageGeometry, ReportStyle, Rgb, TextStyle};

use crate::document::StructuredDocument;
use crate::error::RenderError;
use chrono::{DateTime, Utc};
use cxr_files::{ArtifactMetadata, ArtifactStore};
use cxr_uuid::ReportId;
use std::path::PathBuf;

/// Run-specific values printed in the report header.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub report_id: ReportId,
    pub generated_at: DateTime<Utc>,
}

impl RenderContext {
    pub fn new(report_id: ReportId) -> Self {
        Self {
            report_id,
            generated_at: Utc::now(),
        }
    }
}

/// A persisted report document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifact {
    pub report_id: ReportId,
    pub path: PathBuf,
    pub page_count: usize,
    pub metadata: ArtifactMetadata,
}

impl RenderedArtifact {
    pub fn download_file_name(&self) -> String {
        self.report_id.download_file_name()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer {
    style: ReportStyle,
    geometry: PageGeometry,
}

impl DocumentRenderer {
    pub fn new(style: ReportStyle, geometry: PageGeometry) -> Self {
        Self { style, geometry }
    }

    pub fn layout(&self, document: &StructuredDocument, context: &RenderContext) -> Layout {
        layout::compose(document, context, &self.style, self.geometry)
    }

    /// Lays out and encodes `document`, returning the PDF bytes and page count.
    pub fn render(
        &self,
        document: &StructuredDocument,
        context: &RenderContext,
    ) -> Result<(Vec<u8>, usize), RenderError> {
        let layout = self.layout(document, context);
        let bytes = pdf::encode(&layout)?;
        Ok((bytes, layout.page_count()))
    }

    /// Renders `document` and persists it under `context.report_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Pdf`] if encoding fails, or [`RenderError::Store`] if the artifact
    /// cannot be written. Nothing is left in the store on failure.
    pub fn render_to_store(
        &self,
        document: &StructuredDocument,
        context: &RenderContext,
        store: &ArtifactStore,
    ) -> Result<RenderedArtifact, RenderError> {
        let (bytes, page_count) = self.render(document, context)?;
        let metadata = store.persist(&context.report_id, &bytes)?;

        tracing::info!(
            report_id = %context.report_id,
            pages = page_count,
            size_bytes = metadata.size_bytes,
            "report rendered"
        );

        Ok(RenderedArtifact {
            report_id: context.report_id,
            path: store.artifact_path(&context.report_id),
            page_count,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::ConditionSet;
    use crate::parser::SectionParser;
    use tempfile::TempDir;

    #[test]
    fn empty_document_renders_title_metadata_and_disclaimer() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::open(temp.path()).unwrap();
        let context = RenderContext::new(ReportId::new());

        let artifact = DocumentRenderer::default()
            .render_to_store(&StructuredDocument::new(), &context, &store)
            .unwrap();

        assert_eq!(artifact.page_count, 2);
        assert!(artifact.path.is_file());
        let bytes = std::fs::read(&artifact.path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(
            artifact.metadata.media_type.as_ref().map(|m| m.as_str()),
            Some("application/pdf")
        );
    }

    #[test]
    fn full_report_renders_to_pdf() {
        let conditions = ConditionSet::nih_chest_xray14();
        let document = SectionParser::new(&conditions).parse_text(
            "**Summary**\n**Cardiomegaly** is likely.\n**Detailed Findings**\n\
             - Cardiomegaly: 0.81\n- Nodule: 0.40\n**Recommendations**\nFollow up.\n",
        );
        let (bytes, pages) = DocumentRenderer::default()
            .render(&document, &RenderContext::new(ReportId::new()))
            .unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(pages, 2);
    }

    #[test]
    fn existing_artifact_is_a_store_error() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::open(temp.path()).unwrap();
        let context = RenderContext::new(ReportId::new());
        let renderer = DocumentRenderer::default();
        let document = StructuredDocument::new();

        renderer.render_to_store(&document, &context, &store).unwrap();
        let second = renderer.render_to_store(&document, &context, &store);

        assert!(matches!(second, Err(RenderError::Store(_))));
    }
}
