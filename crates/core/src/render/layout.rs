//! Page layout: turns a [`StructuredDocument`] into positioned drawing operations.
//!
//! Layout is kept separate from PDF encoding so pagination can be tested without decoding
//! PDF bytes. Coordinates are millimetres from the bottom-left corner of the page, matching
//! `printpdf`. Text is sanitised to WinAnsi before it is measured, so every width used for
//! wrapping matches what the PDF draws.

use super::metrics::{text_width_mm, winansi_safe};
use super::RenderContext;
use crate::constants::REPORT_TITLE;
use crate::document::{Block, FindingRow, FindingsTable, Span, StructuredDocument};

pub const PT_TO_MM: f32 = 0.352_778;

/// Baseline sits this fraction of the font size above the bottom of its line box.
const DESCENT: f32 = 0.22;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
}

impl PageGeometry {
    /// US Letter with one-inch margins.
    pub const LETTER: PageGeometry = PageGeometry {
        width_mm: 215.9,
        height_mm: 279.4,
        margin_mm: 25.4,
    };

    pub fn content_width_mm(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }

    fn top_mm(&self) -> f32 {
        self.height_mm - self.margin_mm
    }

    fn bottom_mm(&self) -> f32 {
        self.margin_mm
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry::LETTER
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Oblique,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const DARK_BLUE: Rgb = Rgb::new(0.0, 0.0, 0.545);
    pub const GREY: Rgb = Rgb::new(0.5, 0.5, 0.5);
    pub const LIGHT_GREY: Rgb = Rgb::new(0.827, 0.827, 0.827);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size_pt: f32,
    pub leading_pt: f32,
    pub face: FontFace,
    pub color: Rgb,
    pub space_before_pt: f32,
    pub space_after_pt: f32,
}

impl TextStyle {
    const fn new(size_pt: f32, leading_pt: f32, face: FontFace) -> Self {
        Self {
            size_pt,
            leading_pt,
            face,
            color: Rgb::BLACK,
            space_before_pt: 0.0,
            space_after_pt: 0.0,
        }
    }
}

/// Styles for every element of a report page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStyle {
    pub title: TextStyle,
    pub metadata: TextStyle,
    pub heading: TextStyle,
    pub body: TextStyle,
    pub table_header: TextStyle,
    pub table_row: TextStyle,
    pub disclaimer: TextStyle,
    pub header_fill: Rgb,
    pub grid_color: Rgb,
    pub grid_thickness_pt: f32,
    pub cell_padding_pt: f32,
    pub column_widths_mm: [f32; 3],
    pub space_after_metadata_pt: f32,
    pub space_after_table_pt: f32,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            title: TextStyle {
                color: Rgb::DARK_BLUE,
                space_after_pt: 12.0,
                ..TextStyle::new(18.0, 22.0, FontFace::Bold)
            },
            metadata: TextStyle::new(12.0, 14.0, FontFace::Regular),
            heading: TextStyle {
                space_before_pt: 6.0,
                space_after_pt: 6.0,
                ..TextStyle::new(14.0, 17.0, FontFace::Bold)
            },
            body: TextStyle {
                space_after_pt: 6.0,
                ..TextStyle::new(12.0, 14.0, FontFace::Regular)
            },
            table_header: TextStyle::new(12.0, 14.0, FontFace::Bold),
            table_row: TextStyle::new(10.0, 12.0, FontFace::Regular),
            disclaimer: TextStyle {
                color: Rgb::GREY,
                space_before_pt: 12.0,
                ..TextStyle::new(10.0, 12.0, FontFace::Oblique)
            },
            header_fill: Rgb::LIGHT_GREY,
            grid_color: Rgb::GREY,
            grid_thickness_pt: 0.5,
            cell_padding_pt: 3.0,
            column_widths_mm: [50.8, 25.4, 63.5],
            space_after_metadata_pt: 24.0,
            space_after_table_pt: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x_mm: f32,
        y_mm: f32,
        size_pt: f32,
        face: FontFace,
        color: Rgb,
        text: String,
    },
    FillRect {
        x_mm: f32,
        y_mm: f32,
        width_mm: f32,
        height_mm: f32,
        color: Rgb,
    },
    Line {
        from_mm: (f32, f32),
        to_mm: (f32, f32),
        thickness_pt: f32,
        color: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// All text on the page, one drawn run per line.
    pub fn text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub title: String,
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Lays out a full report: title, metadata, content blocks, then the disclaimer page.
pub fn compose(
    document: &StructuredDocument,
    context: &RenderContext,
    style: &ReportStyle,
    geometry: PageGeometry,
) -> Layout {
    let mut composer = Composer::new(style, geometry);

    composer.paragraph(&[Span::Plain(REPORT_TITLE.to_string())], &style.title);
    let metadata = format!(
        "Report ID: {} | Generated: {}",
        context.report_id,
        context.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    composer.paragraph(&[Span::Plain(metadata)], &style.metadata);
    composer.advance(style.space_after_metadata_pt * PT_TO_MM);

    for block in document.blocks() {
        composer.block(block);
    }

    composer.page_break();
    composer.block(&Block::disclaimer());

    Layout {
        title: REPORT_TITLE.to_string(),
        geometry,
        pages: composer.pages,
    }
}

/// Width of the gap between two words. The space advance is the same in every face.
fn space_width_mm(size_pt: f32) -> f32 {
    text_width_mm(" ", size_pt, FontFace::Regular)
}

/// A word with its emphasis. `glued` words follow the previous word without a space.
#[derive(Debug, Clone, PartialEq)]
struct Word {
    text: String,
    bold: bool,
    glued: bool,
}

fn words(spans: &[Span]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut previous_ended_in_space = true;
    for span in spans {
        let text = winansi_safe(span.text());
        let starts_with_space = text.starts_with(char::is_whitespace);
        for (i, word) in text.split_whitespace().enumerate() {
            words.push(Word {
                text: word.to_string(),
                bold: span.is_bold(),
                glued: i == 0 && !starts_with_space && !previous_ended_in_space,
            });
        }
        if !text.is_empty() {
            previous_ended_in_space = text.ends_with(char::is_whitespace);
        }
    }
    words
}

fn word_face(word: &Word, style: &TextStyle) -> FontFace {
    if word.bold {
        FontFace::Bold
    } else {
        style.face
    }
}

/// Splits a word wider than `max_width_mm` into glued pieces that each fit.
fn split_oversized(word: Word, max_width_mm: f32, style: &TextStyle) -> Vec<Word> {
    let face = word_face(&word, style);
    if text_width_mm(&word.text, style.size_pt, face) <= max_width_mm {
        return vec![word];
    }

    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.text.chars() {
        let mut candidate = piece.clone();
        candidate.push(c);
        if !piece.is_empty() && text_width_mm(&candidate, style.size_pt, face) > max_width_mm {
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        } else {
            piece = candidate;
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| Word {
            text,
            bold: word.bold,
            glued: i > 0 || word.glued,
        })
        .collect()
}

/// Greedy line breaking between words. A glued word only starts a new line when it would
/// overflow, and a word wider than the line is broken across lines.
fn wrap_words(words: Vec<Word>, max_width_mm: f32, style: &TextStyle) -> Vec<Vec<Word>> {
    let mut lines: Vec<Vec<Word>> = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut width = 0.0;

    for word in words
        .into_iter()
        .flat_map(|w| split_oversized(w, max_width_mm, style))
    {
        let word_width = text_width_mm(&word.text, style.size_pt, word_face(&word, style));
        let gap = if current.is_empty() || word.glued {
            0.0
        } else {
            space_width_mm(style.size_pt)
        };

        if !current.is_empty() && width + gap + word_width > max_width_mm {
            lines.push(std::mem::take(&mut current));
            width = word_width;
        } else {
            width += gap + word_width;
        }
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn wrap_plain(text: &str, max_width_mm: f32, style: &TextStyle) -> Vec<String> {
    wrap_words(words(&[Span::Plain(text.to_string())]), max_width_mm, style)
        .into_iter()
        .map(|line| {
            let mut text = String::new();
            for word in line {
                if !text.is_empty() && !word.glued {
                    text.push(' ');
                }
                text.push_str(&word.text);
            }
            text
        })
        .collect()
}

struct Composer<'a> {
    style: &'a ReportStyle,
    geometry: PageGeometry,
    pages: Vec<Page>,
    cursor_mm: f32,
}

impl<'a> Composer<'a> {
    fn new(style: &'a ReportStyle, geometry: PageGeometry) -> Self {
        Self {
            style,
            geometry,
            pages: vec![Page::default()],
            cursor_mm: geometry.top_mm(),
        }
    }

    fn page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn page_break(&mut self) {
        self.pages.push(Page::default());
        self.cursor_mm = self.geometry.top_mm();
    }

    fn at_page_top(&self) -> bool {
        self.cursor_mm >= self.geometry.top_mm()
    }

    /// Starts a new page unless `height_mm` still fits above the bottom margin.
    fn ensure_space(&mut self, height_mm: f32) {
        if self.cursor_mm - height_mm < self.geometry.bottom_mm() && !self.at_page_top() {
            self.page_break();
        }
    }

    /// Moves the cursor down. Vertical space never carries over onto a new page.
    fn advance(&mut self, height_mm: f32) {
        self.cursor_mm = (self.cursor_mm - height_mm).max(self.geometry.bottom_mm());
    }

    fn block(&mut self, block: &Block) {
        let style = self.style;
        match block {
            Block::Heading(section) => {
                self.paragraph(&[Span::Plain(section.title().to_string())], &style.heading)
            }
            Block::Paragraph(paragraph) => self.paragraph(&paragraph.spans, &style.body),
            Block::FindingsTable(table) => self.table(table),
            Block::Disclaimer(text) => {
                self.paragraph(&[Span::Plain(text.clone())], &style.disclaimer)
            }
        }
    }

    fn paragraph(&mut self, spans: &[Span], style: &TextStyle) {
        if !self.at_page_top() {
            self.advance(style.space_before_pt * PT_TO_MM);
        }

        let leading_mm = style.leading_pt * PT_TO_MM;
        let width = self.geometry.content_width_mm();
        for line in wrap_words(words(spans), width, style) {
            self.ensure_space(leading_mm);
            self.cursor_mm -= leading_mm;
            let baseline = self.cursor_mm + style.size_pt * DESCENT * PT_TO_MM;
            let x = self.geometry.margin_mm;
            self.emit_line(line, x, baseline, style);
        }

        self.advance(style.space_after_pt * PT_TO_MM);
    }

    /// Draws one wrapped line, one text run per change of emphasis.
    fn emit_line(&mut self, line: Vec<Word>, x_mm: f32, baseline_mm: f32, style: &TextStyle) {
        let mut x = x_mm;
        let mut run: Option<(FontFace, f32, String)> = None;

        for word in line {
            let face = word_face(&word, style);
            let separator = if word.glued { "" } else { " " };
            let extends_run = matches!(&run, Some((run_face, _, _)) if *run_face == face);
            if extends_run {
                if let Some((_, _, text)) = run.as_mut() {
                    text.push_str(separator);
                    text.push_str(&word.text);
                }
                continue;
            }
            if let Some(finished) = run.take() {
                x = self.emit_run(finished, baseline_mm, style);
                if !word.glued {
                    x += space_width_mm(style.size_pt);
                }
            }
            run = Some((face, x, word.text));
        }
        if let Some(finished) = run {
            self.emit_run(finished, baseline_mm, style);
        }
    }

    /// Emits a run and returns the x coordinate where it ends.
    fn emit_run(
        &mut self,
        (face, x_mm, text): (FontFace, f32, String),
        baseline_mm: f32,
        style: &TextStyle,
    ) -> f32 {
        let end = x_mm + text_width_mm(&text, style.size_pt, face);
        self.page().ops.push(DrawOp::Text {
            x_mm,
            y_mm: baseline_mm,
            size_pt: style.size_pt,
            face,
            color: style.color,
            text,
        });
        end
    }

    fn table(&mut self, table: &FindingsTable) {
        let header: Vec<String> = FindingsTable::HEADERS.iter().map(|h| h.to_string()).collect();
        let header_style = self.style.table_header;

        let header_height = self.row_height(&header, &header_style);
        self.ensure_space(header_height + self.row_height(&first_row_cells(table), &self.style.table_row));
        self.row(&header, &header_style, Some(self.style.header_fill));

        for row in &table.rows {
            let cells = cells(row);
            let height = self.row_height(&cells, &self.style.table_row);
            if self.cursor_mm - height < self.geometry.bottom_mm() {
                self.page_break();
                self.row(&header, &header_style, Some(self.style.header_fill));
            }
            let row_style = self.style.table_row;
            self.row(&cells, &row_style, None);
        }

        self.advance(self.style.space_after_table_pt * PT_TO_MM);
    }

    fn cell_lines(&self, cells: &[String], style: &TextStyle) -> Vec<Vec<String>> {
        let padding = 2.0 * self.style.cell_padding_pt * PT_TO_MM;
        cells
            .iter()
            .zip(self.style.column_widths_mm)
            .map(|(cell, width)| wrap_plain(cell, width - padding, style))
            .collect()
    }

    fn row_height(&self, cells: &[String], style: &TextStyle) -> f32 {
        let lines = self
            .cell_lines(cells, style)
            .iter()
            .map(|l| l.len().max(1))
            .max()
            .unwrap_or(1);
        lines as f32 * style.leading_pt * PT_TO_MM + 2.0 * self.style.cell_padding_pt * PT_TO_MM
    }

    fn row(&mut self, cells: &[String], style: &TextStyle, fill: Option<Rgb>) {
        let height = self.row_height(cells, style);
        let top = self.cursor_mm;
        let bottom = top - height;
        let left = self.geometry.margin_mm;
        let widths = self.style.column_widths_mm;
        let total_width: f32 = widths.iter().sum();
        let padding = self.style.cell_padding_pt * PT_TO_MM;
        let leading = style.leading_pt * PT_TO_MM;

        if let Some(color) = fill {
            self.page().ops.push(DrawOp::FillRect {
                x_mm: left,
                y_mm: bottom,
                width_mm: total_width,
                height_mm: height,
                color,
            });
        }

        let mut x = left;
        for (lines, width) in self.cell_lines(cells, style).into_iter().zip(widths) {
            for (i, line) in lines.into_iter().enumerate() {
                let baseline =
                    top - padding - (i + 1) as f32 * leading + style.size_pt * DESCENT * PT_TO_MM;
                self.page().ops.push(DrawOp::Text {
                    x_mm: x + padding,
                    y_mm: baseline,
                    size_pt: style.size_pt,
                    face: style.face,
                    color: style.color,
                    text: line,
                });
            }
            x += width;
        }

        self.grid(left, top, bottom, &widths);
        self.cursor_mm = bottom;
    }

    fn grid(&mut self, left: f32, top: f32, bottom: f32, widths: &[f32; 3]) {
        let right = left + widths.iter().sum::<f32>();
        let thickness_pt = self.style.grid_thickness_pt;
        let color = self.style.grid_color;
        let mut lines = vec![((left, top), (right, top)), ((left, bottom), (right, bottom))];
        let mut x = left;
        lines.push(((x, top), (x, bottom)));
        for width in widths {
            x += width;
            lines.push(((x, top), (x, bottom)));
        }
        for (from_mm, to_mm) in lines {
            self.page().ops.push(DrawOp::Line {
                from_mm,
                to_mm,
                thickness_pt,
                color,
            });
        }
    }
}

fn cells(row: &FindingRow) -> Vec<String> {
    vec![
        row.label.to_string(),
        row.probability_display(),
        row.interpretation.display_text().to_string(),
    ]
}

fn first_row_cells(table: &FindingsTable) -> Vec<String> {
    table.rows.first().map(cells).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DISCLAIMER_TEXT;
    use crate::document::{Paragraph, Section};
    use chrono::TimeZone;
    use cxr_types::{NonEmptyText, Probability};
    use cxr_uuid::ReportId;

    fn context() -> RenderContext {
        RenderContext {
            report_id: ReportId::parse("550e8400e29b41d4a716446655440000").unwrap(),
            generated_at: chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    fn compose_default(document: &StructuredDocument) -> Layout {
        compose(document, &context(), &ReportStyle::default(), PageGeometry::LETTER)
    }

    fn flat(page: &Page) -> String {
        page.texts().collect::<Vec<_>>().join(" ")
    }

    fn row(label: &str, value: f64) -> FindingRow {
        FindingRow::new(
            NonEmptyText::new(label).unwrap(),
            Probability::new(value).unwrap(),
        )
    }

    fn text_ops(page: &Page) -> impl Iterator<Item = (&str, FontFace, f32, f32)> {
        page.ops.iter().filter_map(|op| match op {
            DrawOp::Text {
                text, face, x_mm, y_mm, ..
            } => Some((text.as_str(), *face, *x_mm, *y_mm)),
            _ => None,
        })
    }

    #[test]
    fn empty_document_has_title_metadata_and_disclaimer_page() {
        let layout = compose_default(&StructuredDocument::new());

        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.title, "Chest X-ray Analysis Report");

        let first = flat(&layout.pages[0]);
        assert!(first.starts_with("Chest X-ray Analysis Report"));
        assert!(first.contains(
            "Report ID: 550e8400e29b41d4a716446655440000 | Generated: 2026-01-02 03:04:05 UTC"
        ));

        let last = &layout.pages[1];
        assert_eq!(flat(last), DISCLAIMER_TEXT);
        assert!(text_ops(last).all(|(_, face, _, _)| face == FontFace::Oblique));
    }

    #[test]
    fn title_is_bold_dark_blue() {
        let layout = compose_default(&StructuredDocument::new());
        let DrawOp::Text {
            text,
            face,
            color,
            size_pt,
            ..
        } = &layout.pages[0].ops[0]
        else {
            panic!("first op should be the title");
        };
        assert_eq!(text, "Chest X-ray Analysis Report");
        assert_eq!(*face, FontFace::Bold);
        assert_eq!(*color, Rgb::DARK_BLUE);
        assert_eq!(*size_pt, 18.0);
    }

    #[test]
    fn findings_table_has_styled_header_and_cells() {
        let mut document = StructuredDocument::new();
        document.push(Block::Heading(Section::DetailedFindings));
        document.push(Block::FindingsTable(FindingsTable {
            rows: vec![row("Cardiomegaly", 0.81), row("Nodule", 0.40)],
        }));
        let layout = compose_default(&document);
        let page = &layout.pages[0];
        let texts: Vec<&str> = page.texts().collect();

        for expected in [
            "Detailed Findings",
            "Condition",
            "Probability",
            "Interpretation",
            "Cardiomegaly",
            "81.00%",
            "Significant finding",
            "Nodule",
            "40.00%",
            "Normal",
        ] {
            assert!(texts.contains(&expected), "missing {expected}");
        }

        let header_fills = page
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::FillRect { color, .. } if *color == Rgb::LIGHT_GREY))
            .count();
        assert_eq!(header_fills, 1);
        assert!(page.ops.iter().any(|op| matches!(op, DrawOp::Line { .. })));

        let header_face = text_ops(page)
            .find(|(text, ..)| *text == "Condition")
            .map(|(_, face, ..)| face);
        assert_eq!(header_face, Some(FontFace::Bold));
    }

    #[test]
    fn long_table_repeats_header_on_each_page() {
        let mut document = StructuredDocument::new();
        document.push(Block::FindingsTable(FindingsTable {
            rows: (0..80).map(|i| row("Mass", f64::from(i) / 100.0)).collect(),
        }));
        let layout = compose_default(&document);

        let table_pages: Vec<&Page> = layout
            .pages
            .iter()
            .filter(|page| page.texts().any(|t| t == "Mass"))
            .collect();
        assert!(table_pages.len() >= 2);
        for page in &table_pages {
            assert_eq!(page.texts().filter(|t| *t == "Condition").count(), 1);
        }
        let rows: usize = layout
            .pages
            .iter()
            .map(|page| page.texts().filter(|t| *t == "Mass").count())
            .sum();
        assert_eq!(rows, 80);
    }

    #[test]
    fn long_content_paginates_within_margins() {
        let mut document = StructuredDocument::new();
        document.push(Block::Heading(Section::Summary));
        for i in 0..120 {
            document.push(Block::Paragraph(Paragraph::plain(format!(
                "Paragraph {i} describes the appearance of the lung fields in enough words to wrap \
                 across more than one line of the page body."
            ))));
        }
        let layout = compose_default(&document);
        let geometry = PageGeometry::LETTER;

        assert!(layout.page_count() > 3);
        for page in &layout.pages {
            for op in &page.ops {
                let DrawOp::Text {
                    text,
                    face,
                    x_mm,
                    y_mm,
                    size_pt,
                    ..
                } = op
                else {
                    continue;
                };
                assert!(*y_mm >= geometry.margin_mm, "{text} below bottom margin");
                assert!(*y_mm <= geometry.height_mm - geometry.margin_mm);
                let right = x_mm + text_width_mm(text, *size_pt, *face);
                assert!(
                    right <= geometry.width_mm - geometry.margin_mm + 0.01,
                    "{text} overflows the right margin"
                );
            }
        }
        let last = layout.pages.last().unwrap();
        assert_eq!(flat(last), DISCLAIMER_TEXT);
    }

    #[test]
    fn bold_spans_become_separate_runs() {
        let mut document = StructuredDocument::new();
        document.push(Block::Paragraph(Paragraph {
            spans: vec![
                Span::Bold("Cardiomegaly".into()),
                Span::Plain(": 0.81 and ".into()),
                Span::Bold("effusion".into()),
            ],
        }));
        let layout = compose_default(&document);
        let runs: Vec<(&str, FontFace, f32)> = text_ops(&layout.pages[0])
            .skip_while(|(text, ..)| *text != "Cardiomegaly")
            .map(|(text, face, x, _)| (text, face, x))
            .collect();

        assert_eq!(runs[0].0, "Cardiomegaly");
        assert_eq!(runs[0].1, FontFace::Bold);
        assert_eq!(runs[1].0, ": 0.81 and");
        assert_eq!(runs[1].1, FontFace::Regular);
        assert_eq!(runs[2].0, "effusion");
        assert_eq!(runs[2].1, FontFace::Bold);
        assert!(runs[0].2 < runs[1].2 && runs[1].2 < runs[2].2);

        let glued_x = runs[0].2 + text_width_mm("Cardiomegaly", 12.0, FontFace::Bold);
        assert!((runs[1].2 - glued_x).abs() < 0.001);
    }

    fn right_margin_mm() -> f32 {
        PageGeometry::LETTER.width_mm - PageGeometry::LETTER.margin_mm
    }

    fn assert_within_right_margin(layout: &Layout) {
        for page in &layout.pages {
            for op in &page.ops {
                if let DrawOp::Text {
                    text,
                    face,
                    x_mm,
                    size_pt,
                    ..
                } = op
                {
                    let right = x_mm + text_width_mm(text, *size_pt, *face);
                    assert!(
                        right <= right_margin_mm() + 0.01,
                        "{text:?} ends at {right:.1}mm, right margin at {:.1}mm",
                        right_margin_mm()
                    );
                }
            }
        }
    }

    #[test]
    fn wide_glyphs_wrap_inside_right_margin() {
        let mut document = StructuredDocument::new();
        document.push(Block::Heading(Section::Summary));
        document.push(Block::Paragraph(Paragraph::plain(
            "IMPORTANT: MODERATE CARDIOMEGALY WITH BILATERAL PLEURAL EFFUSION AND WIDESPREAD \
             CONSOLIDATION, MOST MARKED IN THE RIGHT LOWER ZONE. WWW MMM WWW MMM WWW MMM.",
        )));
        document.push(Block::Paragraph(Paragraph::plain(
            "0.81 0.40 0.93 0.27 0.66 0.58 0.12 0.99 0.31 0.75 0.44 0.08 0.61 0.19 0.87 0.52 \
             2026-01-02 03:04:05 1234567890 9876543210",
        )));
        document.push(Block::Paragraph(Paragraph {
            spans: vec![
                Span::Bold("CARDIOMEGALY".into()),
                Span::Plain(": 0.81 WITH ".into()),
                Span::Bold("PLEURAL EFFUSION".into()),
                Span::Plain(" AND MARKED ".into()),
                Span::Bold("CONSOLIDATION".into()),
                Span::Plain(" IN BOTH LOWER ZONES WHICH WARRANTS URGENT REVIEW.".into()),
            ],
        }));
        let layout = compose_default(&document);

        assert_within_right_margin(&layout);
        let all = layout.pages[0].text();
        assert!(all.contains("IMPORTANT:"));
        assert!(all.contains("REVIEW."));
        assert!(all.contains("9876543210"));
    }

    #[test]
    fn mixed_emphasis_runs_abut_without_drift() {
        let mut document = StructuredDocument::new();
        document.push(Block::Paragraph(Paragraph {
            spans: vec![
                Span::Plain("MASS WITH ".into()),
                Span::Bold("WIDE MARGINS".into()),
                Span::Plain(" NOTED".into()),
            ],
        }));
        let layout = compose_default(&document);
        let runs: Vec<(&str, FontFace, f32)> = text_ops(&layout.pages[0])
            .skip_while(|(text, ..)| *text != "MASS WITH")
            .map(|(text, face, x, _)| (text, face, x))
            .collect();

        let space = text_width_mm(" ", 12.0, FontFace::Regular);
        let bold_x = runs[0].2 + text_width_mm("MASS WITH", 12.0, FontFace::Regular) + space;
        let tail_x = bold_x + text_width_mm("WIDE MARGINS", 12.0, FontFace::Bold) + space;
        assert_eq!(runs[1].0, "WIDE MARGINS");
        assert!((runs[1].2 - bold_x).abs() < 0.001);
        assert_eq!(runs[2].0, "NOTED");
        assert!((runs[2].2 - tail_x).abs() < 0.001);
    }

    #[test]
    fn unbroken_word_is_split_across_lines() {
        let word = "W".repeat(80);
        let mut document = StructuredDocument::new();
        document.push(Block::Paragraph(Paragraph::plain(word.clone())));
        let layout = compose_default(&document);

        assert_within_right_margin(&layout);
        let pieces: Vec<&str> = layout.pages[0]
            .texts()
            .filter(|t| t.starts_with('W'))
            .collect();
        assert!(pieces.len() > 1);
        assert_eq!(pieces.concat(), word);
    }

    #[test]
    fn table_cells_stay_inside_their_columns() {
        let mut document = StructuredDocument::new();
        document.push(Block::FindingsTable(FindingsTable {
            rows: vec![
                row("PLEURAL THICKENING WITH MARKED CALCIFICATION", 0.81),
                row(&"M".repeat(40), 0.40),
            ],
        }));
        let style = ReportStyle::default();
        let layout = compose_default(&document);

        let left = PageGeometry::LETTER.margin_mm;
        let mut bounds = vec![left];
        for width in style.column_widths_mm {
            bounds.push(bounds[bounds.len() - 1] + width);
        }
        let mut cells = 0;
        for op in &layout.pages[0].ops {
            let DrawOp::Text {
                text,
                face,
                x_mm,
                size_pt,
                ..
            } = op
            else {
                continue;
            };
            let Some(column) = bounds.windows(2).position(|w| *x_mm > w[0] && *x_mm < w[1]) else {
                continue;
            };
            let right = x_mm + text_width_mm(text, *size_pt, *face);
            assert!(right <= bounds[column + 1] + 0.01, "{text:?} overflows column {column}");
            cells += 1;
        }
        assert!(cells > 9);
    }

    #[test]
    fn disclaimer_block_uses_disclaimer_style() {
        let mut document = StructuredDocument::new();
        document.push(Block::disclaimer());
        let layout = compose_default(&document);

        let faces: Vec<FontFace> = text_ops(&layout.pages[0])
            .filter(|(text, ..)| text.starts_with("Disclaimer"))
            .map(|(_, face, ..)| face)
            .collect();
        assert_eq!(faces, vec![FontFace::Oblique]);
        assert_eq!(flat(&layout.pages[1]), DISCLAIMER_TEXT);
    }

    #[test]
    fn typography_is_sanitised_before_measuring() {
        let mut document = StructuredDocument::new();
        document.push(Block::Paragraph(Paragraph::plain("Heart size \u{2265} normal \u{2013} stable")));
        let layout = compose_default(&document);

        assert!(layout.pages[0]
            .texts()
            .any(|t| t == "Heart size >= normal - stable"));
    }

    #[test]
    fn wrap_plain_splits_on_width() {
        let style = ReportStyle::default().body;
        let lines = wrap_plain("alpha beta gamma delta", 20.0, &style);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "alpha beta gamma delta");
        assert_eq!(wrap_plain("", 20.0, &style), Vec::<String>::new());
    }
}
