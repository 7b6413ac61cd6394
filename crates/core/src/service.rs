//! Report pipeline service.
//!
//! `ReportService` wires the stages together for one request:
//! score vector → narrative requester → section parser → renderer → artifact store.
//! Each stage hands the next an owned value; nothing is shared between requests except the
//! read-only condition set and the store directory.

use crate::conditions::{ConditionSet, Diagnosis, ScoreVector};
use crate::config::CoreConfig;
use crate::document::StructuredDocument;
use crate::error::RenderError;
use crate::narrative::{NarrativeBackend, NarrativeRequester, RawNarrative};
use crate::parser::{SectionParser, TrailingFindings};
use crate::render::{DocumentRenderer, RenderContext, RenderedArtifact};
use crate::{ReportError, ReportResult};
use cxr_files::{ArtifactMetadata, ArtifactStore, FilesError};
use cxr_uuid::ReportId;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ReportService {
    conditions: Arc<ConditionSet>,
    requester: NarrativeRequester,
    renderer: DocumentRenderer,
    store: ArtifactStore,
    trailing_findings: TrailingFindings,
}

impl ReportService {
    /// Creates the service, opening (and creating if needed) the configured reports directory.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Configuration`] if the reports directory cannot be used.
    pub fn new(cfg: &CoreConfig, backend: Arc<dyn NarrativeBackend>) -> ReportResult<Self> {
        let store = ArtifactStore::open(cfg.reports_dir()).map_err(|e| {
            ReportError::Configuration(format!(
                "reports directory {} is unusable: {}",
                cfg.reports_dir().display(),
                e
            ))
        })?;

        Ok(Self {
            conditions: Arc::new(ConditionSet::nih_chest_xray14()),
            requester: NarrativeRequester::new(backend, cfg.narrative_timeout()),
            renderer: DocumentRenderer::default(),
            store,
            trailing_findings: cfg.trailing_findings(),
        })
    }

    pub fn with_conditions(mut self, conditions: ConditionSet) -> Self {
        self.conditions = Arc::new(conditions);
        self
    }

    pub fn with_renderer(mut self, renderer: DocumentRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn scores(&self, probabilities: &[f64]) -> ReportResult<ScoreVector> {
        self.conditions.scores(probabilities)
    }

    pub fn diagnose(&self, probabilities: &[f64]) -> ReportResult<Vec<Diagnosis>> {
        let scores = self.scores(probabilities)?;
        Ok(self.conditions.diagnose(&scores))
    }

    pub fn parse(&self, narrative: &RawNarrative) -> StructuredDocument {
        SectionParser::new(&self.conditions)
            .with_trailing_findings(self.trailing_findings)
            .parse(narrative)
    }

    /// Runs the full pipeline under a fresh report id.
    pub async fn generate(&self, probabilities: &[f64]) -> ReportResult<RenderedArtifact> {
        self.generate_with_id(probabilities, ReportId::new()).await
    }

    /// Runs the full pipeline, storing the result under `report_id`.
    ///
    /// # Errors
    ///
    /// Any [`ReportError`]: invalid input is rejected before the backend is called, and no
    /// artifact is written unless every stage succeeds.
    pub async fn generate_with_id(
        &self,
        probabilities: &[f64],
        report_id: ReportId,
    ) -> ReportResult<RenderedArtifact> {
        let scores = self.scores(probabilities)?;
        tracing::info!(%report_id, backend = self.requester.backend_name(), "generating report");

        let narrative = self.requester.request(&scores).await.inspect_err(|e| {
            tracing::warn!(%report_id, category = ?e.category(), "narrative request failed: {}", e)
        })?;
        let document = self.parse(&narrative);
        tracing::debug!(%report_id, blocks = document.blocks().len(), "narrative parsed");

        self.render(document, RenderContext::new(report_id)).await
    }

    /// Renders and persists `document` on the blocking pool.
    pub async fn render(
        &self,
        document: StructuredDocument,
        context: RenderContext,
    ) -> ReportResult<RenderedArtifact> {
        let renderer = self.renderer.clone();
        let store = self.store.clone();
        let artifact = tokio::task::spawn_blocking(move || {
            renderer.render_to_store(&document, &context, &store)
        })
        .await
        .map_err(|e| RenderError::Worker(e.to_string()))??;
        Ok(artifact)
    }

    pub fn read_artifact(&self, report_id: &ReportId) -> Result<Vec<u8>, FilesError> {
        self.store.read(report_id)
    }

    pub fn artifact_metadata(&self, report_id: &ReportId) -> Result<ArtifactMetadata, FilesError> {
        self.store.metadata(report_id)
    }
}
