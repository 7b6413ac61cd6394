//! Collects finding rows while the parser is inside a findings section.

use crate::document::{Block, FindingRow, FindingsTable};

#[derive(Debug, Default)]
pub struct FindingsAccumulator {
    rows: Vec<FindingRow>,
}

impl FindingsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows keep the order they were appended in. Duplicates are kept.
    pub fn append(&mut self, row: FindingRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Empties the accumulator, returning a table block if any rows were collected.
    pub fn flush(&mut self) -> Option<Block> {
        if self.rows.is_empty() {
            return None;
        }
        Some(Block::FindingsTable(FindingsTable {
            rows: std::mem::take(&mut self.rows),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxr_types::{NonEmptyText, Probability};

    fn row(label: &str, value: f64) -> FindingRow {
        FindingRow::new(
            NonEmptyText::new(label).unwrap(),
            Probability::new(value).unwrap(),
        )
    }

    #[test]
    fn flush_on_empty_returns_none() {
        let mut acc = FindingsAccumulator::new();
        assert!(acc.flush().is_none());
    }

    #[test]
    fn flush_preserves_order_and_duplicates() {
        let mut acc = FindingsAccumulator::new();
        acc.append(row("Mass", 0.2));
        acc.append(row("Edema", 0.7));
        acc.append(row("Mass", 0.3));

        let Some(Block::FindingsTable(table)) = acc.flush() else {
            panic!("expected a table");
        };
        let labels: Vec<&str> = table.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Mass", "Edema", "Mass"]);
    }

    #[test]
    fn flush_empties_accumulator() {
        let mut acc = FindingsAccumulator::new();
        acc.append(row("Mass", 0.2));
        assert!(acc.flush().is_some());
        assert!(acc.is_empty());
        assert!(acc.flush().is_none());
    }
}
