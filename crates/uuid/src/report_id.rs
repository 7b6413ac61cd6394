use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

const ARTIFACT_PREFIX: &str = "report_";
const DOWNLOAD_PREFIX: &str = "cxr_report_";

/// Canonical identifier of a single report run.
///
/// Once constructed, the contained UUID is guaranteed to display in canonical form
/// (32 lowercase hex characters, no hyphens).
///
/// # Construction
/// - [`ReportId::new`] generates a fresh random (v4) identifier.
/// - [`ReportId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReportId(Uuid);

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportId {
    /// Generates a new identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "report id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns true if `input` is in canonical form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Filename of the rendered document inside the artifact store.
    pub fn artifact_file_name(&self) -> String {
        format!("{ARTIFACT_PREFIX}{self}.pdf")
    }

    /// Filename of the metadata sidecar inside the artifact store.
    pub fn metadata_file_name(&self) -> String {
        format!("{ARTIFACT_PREFIX}{self}.yaml")
    }

    /// Filename offered to the end user when the document is downloaded.
    pub fn download_file_name(&self) -> String {
        format!("{DOWNLOAD_PREFIX}{self}.pdf")
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ReportId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ReportId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ReportId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ReportId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_canonical() {
        let id = ReportId::new();
        assert!(ReportId::is_canonical(&id.to_string()));
    }

    #[test]
    fn test_new_ids_are_distinct() {
        assert_ne!(ReportId::new(), ReportId::new());
    }

    #[test]
    fn test_parse_valid_canonical() {
        let id = ReportId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400e29b41d4a716446655440000");
    }

    #[test]
    fn test_parse_rejects_hyphenated() {
        let err = ReportId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap_err();
        assert!(err.to_string().contains("32 lowercase hex"));
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        assert!(ReportId::parse("550E8400E29B41D4A716446655440000").is_err());
    }

    #[test]
    fn test_parse_rejects_path_traversal() {
        assert!(ReportId::parse("../../etc/passwd").is_err());
        assert!(ReportId::parse("550e8400e29b41d4a71644665544000/").is_err());
    }

    #[test]
    fn test_file_names() {
        let id = ReportId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(
            id.artifact_file_name(),
            "report_550e8400e29b41d4a716446655440000.pdf"
        );
        assert_eq!(
            id.metadata_file_name(),
            "report_550e8400e29b41d4a716446655440000.yaml"
        );
        assert_eq!(
            id.download_file_name(),
            "cxr_report_550e8400e29b41d4a716446655440000.pdf"
        );
    }

    #[test]
    fn test_from_str_matches_parse() {
        let id: ReportId = "550e8400e29b41d4a716446655440000".parse().unwrap();
        assert_eq!(id.uuid().simple().to_string(), id.to_string());
        assert!("not-an-id".parse::<ReportId>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ReportId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");
        let back: ReportId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ReportId>("\"ABC\"").is_err());
    }
}
