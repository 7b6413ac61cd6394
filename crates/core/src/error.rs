use std::time::Duration;

/// Failure reported by a narrative backend (the remote language model or a test double).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("http transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend rejected credentials (status {status})")]
    Unauthorized { status: u16 },
    #[error("backend quota exhausted: {0}")]
    QuotaExceeded(String),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend response was malformed: {0}")]
    MalformedResponse(String),
    #[error("backend returned no narrative text")]
    EmptyResponse,
    #[error("backend worker failed: {0}")]
    Worker(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure while laying out, encoding or storing a report document.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to encode pdf: {0}")]
    Pdf(String),
    #[error("failed to store report artifact: {0}")]
    Store(#[from] cxr_files::FilesError),
    #[error("render worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("narrative backend timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("narrative backend failed: {0}")]
    Backend(#[from] BackendError),
    #[error("narrative is missing required sections: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },
    #[error("failed to render report: {0}")]
    Render(#[from] RenderError),
}

/// Coarse classification of a [`ReportError`], used by outer surfaces to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidInput,
    Configuration,
    Timeout,
    Backend,
    Validation,
    Render,
}

impl ReportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::InvalidInput(_) => ErrorCategory::InvalidInput,
            ReportError::Configuration(_) => ErrorCategory::Configuration,
            ReportError::Timeout(_) => ErrorCategory::Timeout,
            ReportError::Backend(_) => ErrorCategory::Backend,
            ReportError::Validation { .. } => ErrorCategory::Validation,
            ReportError::Render(_) => ErrorCategory::Render,
        }
    }

    /// Message safe to show an end user. Never includes backend bodies or credentials.
    pub fn user_message(&self) -> &'static str {
        match self.category() {
            ErrorCategory::InvalidInput => "Invalid request",
            ErrorCategory::Configuration => "Report service is not configured",
            ErrorCategory::Timeout => "Narrative service timed out, please retry later",
            ErrorCategory::Backend => "Narrative service failed",
            ErrorCategory::Validation => "Narrative service returned an incomplete report",
            ErrorCategory::Render => "Failed to generate report document",
        }
    }
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;
