//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! request handling never reads process-wide environment variables. The `*_from_env_value`
//! helpers take the raw variable value as an argument and leave the actual `std::env` lookup
//! to the binaries.

use crate::constants::{
    DEFAULT_NARRATIVE_TIMEOUT_SECS, DEFAULT_REPORTS_DIR, DEFAULT_WORKER_THREADS,
};
use crate::parser::TrailingFindings;
use crate::{ReportError, ReportResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_NARRATIVE_TIMEOUT_SECS: f64 = 600.0;
const MAX_WORKER_THREADS: usize = 512;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    reports_dir: PathBuf,
    narrative_timeout: Duration,
    worker_threads: usize,
    trailing_findings: TrailingFindings,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        reports_dir: PathBuf,
        narrative_timeout: Duration,
        worker_threads: usize,
        trailing_findings: TrailingFindings,
    ) -> ReportResult<Self> {
        if reports_dir.as_os_str().is_empty() {
            return Err(ReportError::Configuration(
                "reports directory cannot be empty".into(),
            ));
        }
        if narrative_timeout.is_zero() {
            return Err(ReportError::Configuration(
                "narrative timeout must be greater than zero".into(),
            ));
        }
        if worker_threads == 0 {
            return Err(ReportError::Configuration(
                "worker thread count must be at least 1".into(),
            ));
        }

        Ok(Self {
            reports_dir,
            narrative_timeout,
            worker_threads,
            trailing_findings,
        })
    }

    /// Resolve every setting from raw environment values, applying defaults for unset ones.
    pub fn from_env_values(
        reports_dir: Option<String>,
        narrative_timeout_secs: Option<String>,
        worker_threads: Option<String>,
        trailing_findings: Option<String>,
    ) -> ReportResult<Self> {
        Self::new(
            reports_dir_from_env_value(reports_dir),
            narrative_timeout_from_env_value(narrative_timeout_secs)?,
            worker_threads_from_env_value(worker_threads)?,
            trailing_findings_from_env_value(trailing_findings)?,
        )
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn narrative_timeout(&self) -> Duration {
        self.narrative_timeout
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn trailing_findings(&self) -> TrailingFindings {
        self.trailing_findings
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            narrative_timeout: Duration::from_secs(DEFAULT_NARRATIVE_TIMEOUT_SECS),
            worker_threads: DEFAULT_WORKER_THREADS,
            trailing_findings: TrailingFindings::default(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the reports directory from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_REPORTS_DIR`].
pub fn reports_dir_from_env_value(value: Option<String>) -> PathBuf {
    non_blank(value)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR))
}

/// Parse the narrative timeout (in seconds, fractions allowed) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default of
/// [`DEFAULT_NARRATIVE_TIMEOUT_SECS`].
pub fn narrative_timeout_from_env_value(value: Option<String>) -> ReportResult<Duration> {
    let Some(value) = non_blank(value) else {
        return Ok(Duration::from_secs(DEFAULT_NARRATIVE_TIMEOUT_SECS));
    };

    let secs: f64 = value.parse().map_err(|_| {
        ReportError::Configuration(format!("narrative timeout is not a number: '{value}'"))
    })?;
    if !secs.is_finite() || secs <= 0.0 || secs > MAX_NARRATIVE_TIMEOUT_SECS {
        return Err(ReportError::Configuration(format!(
            "narrative timeout must be in (0, {MAX_NARRATIVE_TIMEOUT_SECS}] seconds, got {value}"
        )));
    }

    Ok(Duration::from_secs_f64(secs))
}

/// Parse the blocking worker pool size from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_WORKER_THREADS`].
pub fn worker_threads_from_env_value(value: Option<String>) -> ReportResult<usize> {
    let Some(value) = non_blank(value) else {
        return Ok(DEFAULT_WORKER_THREADS);
    };

    match value.parse::<usize>() {
        Ok(n) if (1..=MAX_WORKER_THREADS).contains(&n) => Ok(n),
        _ => Err(ReportError::Configuration(format!(
            "worker thread count must be between 1 and {MAX_WORKER_THREADS}, got '{value}'"
        ))),
    }
}

/// Parse the end-of-input findings policy (`flush` or `drop`) from an optional string value.
pub fn trailing_findings_from_env_value(value: Option<String>) -> ReportResult<TrailingFindings> {
    non_blank(value)
        .map(|v| v.parse::<TrailingFindings>())
        .transpose()
        .map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset_or_blank() {
        assert_eq!(
            narrative_timeout_from_env_value(None).unwrap(),
            Duration::from_secs(20)
        );
        assert_eq!(
            narrative_timeout_from_env_value(Some("  ".into())).unwrap(),
            Duration::from_secs(20)
        );
        assert_eq!(worker_threads_from_env_value(None).unwrap(), 8);
        assert_eq!(reports_dir_from_env_value(None), PathBuf::from("reports"));
        assert_eq!(
            trailing_findings_from_env_value(None).unwrap(),
            TrailingFindings::Flush
        );
    }

    #[test]
    fn parses_fractional_timeout() {
        assert_eq!(
            narrative_timeout_from_env_value(Some("0.5".into())).unwrap(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn rejects_bad_timeout() {
        for raw in ["abc", "0", "-3", "inf", "100000"] {
            let result = narrative_timeout_from_env_value(Some(raw.into()));
            assert!(
                matches!(result, Err(ReportError::Configuration(_))),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn rejects_bad_worker_count() {
        assert!(worker_threads_from_env_value(Some("0".into())).is_err());
        assert!(worker_threads_from_env_value(Some("many".into())).is_err());
        assert_eq!(worker_threads_from_env_value(Some("4".into())).unwrap(), 4);
    }

    #[test]
    fn parses_trailing_findings_policy() {
        assert_eq!(
            trailing_findings_from_env_value(Some("DROP".into())).unwrap(),
            TrailingFindings::Drop
        );
        assert!(trailing_findings_from_env_value(Some("keep".into())).is_err());
    }

    #[test]
    fn from_env_values_combines_helpers() {
        let cfg = CoreConfig::from_env_values(
            Some("/tmp/cxr".into()),
            Some("7".into()),
            None,
            Some("drop".into()),
        )
        .unwrap();
        assert_eq!(cfg.reports_dir(), Path::new("/tmp/cxr"));
        assert_eq!(cfg.narrative_timeout(), Duration::from_secs(7));
        assert_eq!(cfg.worker_threads(), 8);
        assert_eq!(cfg.trailing_findings(), TrailingFindings::Drop);

        assert!(CoreConfig::from_env_values(None, Some("x".into()), None, None).is_err());
    }

    #[test]
    fn new_validates_values() {
        let ok = CoreConfig::new(
            PathBuf::from("out"),
            Duration::from_secs(5),
            2,
            TrailingFindings::Drop,
        )
        .unwrap();
        assert_eq!(ok.reports_dir(), Path::new("out"));
        assert_eq!(ok.worker_threads(), 2);

        assert!(CoreConfig::new(
            PathBuf::new(),
            Duration::from_secs(5),
            2,
            TrailingFindings::Flush
        )
        .is_err());
        assert!(CoreConfig::new(
            PathBuf::from("out"),
            Duration::ZERO,
            2,
            TrailingFindings::Flush
        )
        .is_err());
        assert!(CoreConfig::new(
            PathBuf::from("out"),
            Duration::from_secs(5),
            0,
            TrailingFindings::Flush
        )
        .is_err());
    }
}
