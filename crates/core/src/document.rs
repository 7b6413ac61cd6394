//! Structured report document produced by the section parser and consumed by the renderer.

use crate::constants::{DISCLAIMER_TEXT, SIGNIFICANCE_THRESHOLD};
use cxr_types::{NonEmptyText, Probability};
use serde::Serialize;

/// Named sections a narrative is divided into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Summary,
    DetailedFindings,
    Recommendations,
}

impl Section {
    pub const ALL: [Section; 3] = [
        Section::Summary,
        Section::DetailedFindings,
        Section::Recommendations,
    ];

    /// Sections a narrative must contain to be accepted.
    pub const REQUIRED: [Section; 2] = [Section::Summary, Section::DetailedFindings];

    /// Heading text, also the marker text looked for in the narrative.
    pub fn title(self) -> &'static str {
        match self {
            Section::Summary => "Summary",
            Section::DetailedFindings => "Detailed Findings",
            Section::Recommendations => "Recommendations",
        }
    }
}

/// Run of paragraph text with uniform emphasis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "style", content = "text", rename_all = "snake_case")]
pub enum Span {
    Plain(String),
    Bold(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(text) | Span::Bold(text) => text,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, Span::Bold(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub spans: Vec<Span>,
}

impl Paragraph {
    /// Paragraph made of a single unemphasised span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            spans: vec![Span::Plain(text.into())],
        }
    }

    /// Concatenated text without emphasis markers.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    Significant,
    Normal,
}

impl Interpretation {
    pub fn from_probability(probability: Probability) -> Self {
        if probability.value() > SIGNIFICANCE_THRESHOLD {
            Interpretation::Significant
        } else {
            Interpretation::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interpretation::Significant => "significant",
            Interpretation::Normal => "normal",
        }
    }

    /// Wording used in the rendered findings table.
    pub fn display_text(self) -> &'static str {
        match self {
            Interpretation::Significant => "Significant finding",
            Interpretation::Normal => "Normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingRow {
    pub label: NonEmptyText,
    pub probability: Probability,
    pub interpretation: Interpretation,
}

impl FindingRow {
    pub fn new(label: NonEmptyText, probability: Probability) -> Self {
        Self {
            label,
            probability,
            interpretation: Interpretation::from_probability(probability),
        }
    }

    /// Probability as shown to readers, e.g. `81.00%`.
    pub fn probability_display(&self) -> String {
        self.probability.as_percentage()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingsTable {
    pub rows: Vec<FindingRow>,
}

impl FindingsTable {
    pub const HEADERS: [&'static str; 3] = ["Condition", "Probability", "Interpretation"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Block {
    Heading(Section),
    Paragraph(Paragraph),
    FindingsTable(FindingsTable),
    Disclaimer(String),
}

impl Block {
    pub fn disclaimer() -> Self {
        Block::Disclaimer(DISCLAIMER_TEXT.to_string())
    }
}

/// Ordered blocks of a report. Contains at most one findings table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredDocument {
    blocks: Vec<Block>,
}

impl StructuredDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn findings_table(&self) -> Option<&FindingsTable> {
        self.blocks.iter().find_map(|block| match block {
            Block::FindingsTable(table) => Some(table),
            _ => None,
        })
    }

    pub fn headings(&self) -> impl Iterator<Item = Section> + '_ {
        self.blocks.iter().filter_map(|block| match block {
            Block::Heading(section) => Some(*section),
            _ => None,
        })
    }
}
