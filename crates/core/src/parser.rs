//! Section parser: turns raw narrative text into a [`StructuredDocument`].
//!
//! The parser is a single left-to-right pass over lines driven by a small state machine
//! (`none → summary | findings | recommendations`). Each trimmed line is classified by
//! [`classify_line`], and the classification plus the current section decides what happens:
//!
//! | line kind      | none    | summary / recommendations | findings            |
//! |----------------|---------|---------------------------|---------------------|
//! | blank          | skip    | skip                      | skip                |
//! | section marker | switch  | switch                    | switch              |
//! | bullet         | drop    | paragraph                 | finding row or drop |
//! | other text     | drop    | paragraph                 | drop                |
//!
//! Parsing never fails. Malformed rows are dropped and logged at debug level.
//!
//! The same marker classifier backs [`missing_required_sections`], which the narrative
//! requester uses to reject responses before they ever reach the parser.

use crate::conditions::ConditionSet;
use crate::document::{Block, FindingRow, Paragraph, Section, Span, StructuredDocument};
use crate::findings::FindingsAccumulator;
use crate::narrative::RawNarrative;
use crate::ReportError;
use cxr_types::{NonEmptyText, Probability};
use std::str::FromStr;

const EMPHASIS: &str = "**";
const BULLETS: [char; 3] = ['-', '*', '•'];

/// What to do with findings rows still buffered when the input ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailingFindings {
    /// Emit them as the findings table.
    #[default]
    Flush,
    /// Discard them; only a `Recommendations` marker emits the table.
    Drop,
}

impl FromStr for TrailingFindings {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flush" => Ok(TrailingFindings::Flush),
            "drop" => Ok(TrailingFindings::Drop),
            other => Err(ReportError::Configuration(format!(
                "trailing findings policy must be 'flush' or 'drop', got '{other}'"
            ))),
        }
    }
}

/// Classification of a single trimmed, non-empty line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind<'a> {
    Blank,
    /// Section marker, with any text that followed it on the same line.
    Marker(Section, &'a str),
    /// Bulleted line: the whole line and the text after the bullet.
    Bullet { line: &'a str, body: &'a str },
    Text(&'a str),
}

pub(crate) fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if let Some((section, remainder)) = detect_marker(line) {
        return LineKind::Marker(section, remainder);
    }
    if let Some(body) = bullet_body(line) {
        return LineKind::Bullet { line, body };
    }
    LineKind::Text(line)
}

/// Recognises `**Title**`, `**Title:**`, `**Title**: text` and `# Title` style markers.
///
/// Markdown `#` prefixes are stripped before matching. Without bold markers the line must be a
/// heading that consists of the title alone.
fn detect_marker(line: &str) -> Option<(Section, &str)> {
    let is_heading = line.starts_with('#');
    let rest = line.trim_start_matches('#').trim_start();

    for section in Section::ALL {
        let title = section.title();
        if let Some(inner) = rest.strip_prefix(EMPHASIS) {
            let Some(after) = strip_prefix_ignore_case(inner, title) else {
                continue;
            };
            let closed = after
                .strip_prefix(EMPHASIS)
                .or_else(|| after.strip_prefix(":**"));
            if let Some(remainder) = closed {
                return Some((section, remainder.trim_start_matches(':').trim()));
            }
        } else if is_heading {
            let matches_title = strip_prefix_ignore_case(rest, title)
                .is_some_and(|after| after.trim_start_matches(':').trim().is_empty());
            if matches_title {
                return Some((section, ""));
            }
        }
    }
    None
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn bullet_body(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if !BULLETS.contains(&first) {
        return None;
    }
    let rest = chars.as_str();
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

/// Section titles (in canonical order) whose marker never appears in `text`.
pub fn missing_required_sections(text: &str) -> Vec<&'static str> {
    let mut seen = Vec::with_capacity(Section::ALL.len());
    for line in text.lines() {
        if let LineKind::Marker(section, _) = classify_line(line) {
            seen.push(section);
        }
    }
    Section::REQUIRED
        .iter()
        .filter(|section| !seen.contains(section))
        .map(|section| section.title())
        .collect()
}

/// Splits `text` on `**` pairs into plain and bold spans.
///
/// An unpaired trailing marker is kept as literal text. Empty bold runs (`****`) vanish.
pub fn parse_inline(text: &str) -> Vec<Span> {
    let parts: Vec<&str> = text.split(EMPHASIS).collect();
    let balanced = parts.len() % 2 == 1;
    let last = parts.len() - 1;
    let mut spans: Vec<Span> = Vec::new();

    for (i, part) in parts.iter().enumerate() {
        let inside_pair = i % 2 == 1 && (balanced || i != last);
        if inside_pair {
            if !part.is_empty() {
                spans.push(Span::Bold((*part).to_string()));
            }
            continue;
        }

        let text = if i % 2 == 1 {
            format!("{EMPHASIS}{part}")
        } else {
            (*part).to_string()
        };
        if text.is_empty() {
            continue;
        }
        match spans.last_mut() {
            Some(Span::Plain(previous)) => previous.push_str(&text),
            _ => spans.push(Span::Plain(text)),
        }
    }
    spans
}

fn strip_emphasis(text: &str) -> String {
    text.replace(EMPHASIS, "")
}

/// Parser configuration. Cheap to construct per narrative.
#[derive(Debug, Clone, Copy)]
pub struct SectionParser<'a> {
    conditions: &'a ConditionSet,
    trailing_findings: TrailingFindings,
}

impl<'a> SectionParser<'a> {
    pub fn new(conditions: &'a ConditionSet) -> Self {
        Self {
            conditions,
            trailing_findings: TrailingFindings::default(),
        }
    }

    pub fn with_trailing_findings(mut self, policy: TrailingFindings) -> Self {
        self.trailing_findings = policy;
        self
    }

    pub fn parse(&self, narrative: &RawNarrative) -> StructuredDocument {
        self.parse_text(narrative.as_str())
    }

    pub fn parse_text(&self, text: &str) -> StructuredDocument {
        let mut state = ParseState::default();
        for line in text.lines() {
            self.step(&mut state, classify_line(line));
        }
        self.finish(state)
    }

    fn step(&self, state: &mut ParseState, kind: LineKind<'_>) {
        match (kind, state.current) {
            (LineKind::Blank, _) => {}
            (LineKind::Marker(section, remainder), _) => {
                if section == Section::Recommendations {
                    state.emit_findings();
                }
                state.document.push(Block::Heading(section));
                state.current = Some(section);
                if section != Section::DetailedFindings && !remainder.is_empty() {
                    state
                        .document
                        .push(Block::Paragraph(Paragraph { spans: parse_inline(remainder) }));
                }
            }
            (LineKind::Bullet { body, .. }, Some(Section::DetailedFindings)) => {
                match self.parse_finding(body) {
                    Some(row) => state.findings.append(row),
                    None => tracing::debug!(line = body, "dropping malformed finding line"),
                }
            }
            (LineKind::Text(_), Some(Section::DetailedFindings)) | (_, None) => {}
            // Bullets outside findings keep their marker so the paragraph reads as written.
            (LineKind::Bullet { line, .. } | LineKind::Text(line), Some(_)) => {
                state
                    .document
                    .push(Block::Paragraph(Paragraph { spans: parse_inline(line) }));
            }
        }
    }

    fn parse_finding(&self, body: &str) -> Option<FindingRow> {
        let (label, value) = body.split_once(':')?;
        let label = strip_emphasis(label);
        let label = NonEmptyText::new(&label).ok()?;
        let label = self
            .conditions
            .canonical_label(label.as_str())
            .cloned()
            .unwrap_or(label);

        let value: f64 = strip_emphasis(value).trim().parse().ok()?;
        let probability = Probability::new(value).ok()?;
        Some(FindingRow::new(label, probability))
    }

    fn finish(&self, mut state: ParseState) -> StructuredDocument {
        if !state.findings.is_empty() {
            match self.trailing_findings {
                TrailingFindings::Flush => state.emit_findings(),
                TrailingFindings::Drop => tracing::debug!(
                    rows = state.findings.len(),
                    "dropping findings rows left unflushed at end of narrative"
                ),
            }
        }
        state.document
    }
}

#[derive(Default)]
struct ParseState {
    current: Option<Section>,
    findings: FindingsAccumulator,
    document: StructuredDocument,
    table_emitted: bool,
}

impl ParseState {
    fn emit_findings(&mut self) {
        let Some(table) = self.findings.flush() else {
            return;
        };
        if self.table_emitted {
            tracing::debug!("dropping rows from a repeated findings section");
            return;
        }
        self.document.push(table);
        self.table_emitted = true;
    }
}
