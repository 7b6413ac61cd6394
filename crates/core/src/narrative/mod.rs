//! Narrative requester.
//!
//! Builds the prompt, makes exactly one call to a [`NarrativeBackend`] on tokio's blocking pool,
//! bounds the wait with a timeout and validates the returned text. There is no retry: a failed
//! or slow call surfaces to the caller as an error.
//!
//! On timeout the blocking task is detached rather than cancelled (a thread cannot be
//! interrupted mid-call); its eventual result is discarded. The backend's own HTTP timeout keeps
//! abandoned calls from holding a worker indefinitely.

mod gemini;

pub use gemini::{GeminiBackend, GeminiConfig};

use crate::conditions::ScoreVector;
use crate::error::BackendError;
use crate::parser::missing_required_sections;
use crate::prompt::Prompt;
use crate::{ReportError, ReportResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Narrative text exactly as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNarrative(String);

impl RawNarrative {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A language-model service able to turn a prompt into narrative text.
///
/// `generate` is blocking and is always called from a blocking-pool thread.
pub trait NarrativeBackend: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Checks that credentials and settings are present without touching the network.
    fn ensure_configured(&self) -> ReportResult<()> {
        Ok(())
    }

    fn generate(&self, prompt: &Prompt) -> Result<String, BackendError>;
}

/// Rejects narratives missing the `Summary` or `Detailed Findings` marker.
pub fn validate_narrative(narrative: &RawNarrative) -> ReportResult<()> {
    let missing = missing_required_sections(narrative.as_str());
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReportError::Validation { missing })
    }
}

#[derive(Clone)]
pub struct NarrativeRequester {
    backend: Arc<dyn NarrativeBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for NarrativeRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeRequester")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NarrativeRequester {
    pub fn new(backend: Arc<dyn NarrativeBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Requests and validates a narrative for `scores`.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Configuration`] if the backend is not configured (no call is made)
    /// - [`ReportError::Timeout`] if the call does not finish within the timeout
    /// - [`ReportError::Backend`] if the call fails
    /// - [`ReportError::Validation`] if the text lacks a required section marker
    pub async fn request(&self, scores: &ScoreVector) -> ReportResult<RawNarrative> {
        self.backend.ensure_configured()?;

        let prompt = Prompt::build(scores);
        let backend = Arc::clone(&self.backend);
        let started = Instant::now();
        let call = tokio::task::spawn_blocking(move || backend.generate(&prompt));

        let text = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "narrative backend timed out; abandoning call"
                );
                return Err(ReportError::Timeout(self.timeout));
            }
            Ok(Err(join_error)) => {
                return Err(BackendError::Worker(join_error.to_string()).into());
            }
            Ok(Ok(result)) => result?,
        };

        tracing::info!(
            backend = self.backend.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "narrative received"
        );

        let narrative = RawNarrative::new(text);
        validate_narrative(&narrative)?;
        Ok(narrative)
    }
}
