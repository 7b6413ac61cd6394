//! Condition labels, classifier score vectors and threshold diagnoses.

use crate::constants::{CONDITION_LABELS, OPTIMAL_THRESHOLDS};
use crate::{ReportError, ReportResult};
use cxr_types::{NonEmptyText, Probability};
use serde::Serialize;

/// A condition the classifier scores, with its decision threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub label: NonEmptyText,
    pub threshold: f64,
}

/// Ordered, duplicate-free set of conditions.
///
/// The order is significant: score vectors are index-aligned with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    /// The fourteen NIH ChestX-ray14 conditions with their tuned thresholds.
    pub fn nih_chest_xray14() -> Self {
        let conditions = CONDITION_LABELS
            .iter()
            .zip(OPTIMAL_THRESHOLDS)
            .map(|(label, threshold)| Condition {
                label: NonEmptyText::new(label).expect("condition label is non-empty"),
                threshold,
            })
            .collect();
        Self { conditions }
    }

    /// Builds a custom set.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidInput`] if the set is empty or two labels normalise to the
    /// same key.
    pub fn new(conditions: Vec<Condition>) -> ReportResult<Self> {
        if conditions.is_empty() {
            return Err(ReportError::InvalidInput(
                "condition set cannot be empty".into(),
            ));
        }
        for (i, condition) in conditions.iter().enumerate() {
            let key = label_key(condition.label.as_str());
            if conditions[..i]
                .iter()
                .any(|c| label_key(c.label.as_str()) == key)
            {
                return Err(ReportError::InvalidInput(format!(
                    "duplicate condition label: {}",
                    condition.label
                )));
            }
        }
        Ok(Self { conditions })
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &NonEmptyText> {
        self.conditions.iter().map(|c| &c.label)
    }

    /// Finds the canonical spelling of a label as written in free text.
    ///
    /// Matching ignores ASCII case and treats `_` and runs of whitespace alike, so
    /// `pleural thickening` resolves to `Pleural_Thickening`.
    pub fn canonical_label(&self, raw: &str) -> Option<&NonEmptyText> {
        let key = label_key(raw);
        self.labels().find(|label| label_key(label.as_str()) == key)
    }

    /// Pairs raw classifier output with the labels of this set.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidInput`] if the length differs from the set size or any value
    /// is not finite.
    pub fn scores(&self, probabilities: &[f64]) -> ReportResult<ScoreVector> {
        if probabilities.len() != self.len() {
            return Err(ReportError::InvalidInput(format!(
                "expected {} probabilities, got {}",
                self.len(),
                probabilities.len()
            )));
        }

        let entries = self
            .labels()
            .zip(probabilities)
            .map(|(label, &value)| {
                Probability::new(value)
                    .map(|p| (label.clone(), p))
                    .map_err(|e| ReportError::InvalidInput(format!("{label}: {e}")))
            })
            .collect::<ReportResult<Vec<_>>>()?;

        Ok(ScoreVector { entries })
    }

    /// Applies each condition's threshold to the matching score.
    ///
    /// A condition is positive when its probability is strictly greater than the threshold.
    pub fn diagnose(&self, scores: &ScoreVector) -> Vec<Diagnosis> {
        self.conditions
            .iter()
            .zip(scores.iter())
            .map(|(condition, (_, probability))| Diagnosis {
                label: condition.label.clone(),
                probability: *probability,
                threshold: condition.threshold,
                positive: probability.value() > condition.threshold,
            })
            .collect()
    }
}

impl Default for ConditionSet {
    fn default() -> Self {
        Self::nih_chest_xray14()
    }
}

fn label_key(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classifier output: one probability per condition, in condition-set order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreVector {
    entries: Vec<(NonEmptyText, Probability)>,
}

impl ScoreVector {
    pub fn iter(&self) -> impl Iterator<Item = &(NonEmptyText, Probability)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<Probability> {
        self.entries
            .iter()
            .find(|(l, _)| l.as_str() == label)
            .map(|(_, p)| *p)
    }
}

/// Threshold decision for a single condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub label: NonEmptyText,
    pub probability: Probability,
    pub threshold: f64,
    pub positive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(value: f64) -> Vec<f64> {
        vec![value; CONDITION_LABELS.len()]
    }

    #[test]
    fn nih_set_has_fourteen_labels_in_order() {
        let set = ConditionSet::nih_chest_xray14();
        assert_eq!(set.len(), 14);
        let labels: Vec<&str> = set.labels().map(|l| l.as_str()).collect();
        assert_eq!(labels[0], "Atelectasis");
        assert_eq!(labels[11], "Pleural_Thickening");
        assert_eq!(labels[13], "Pneumothorax");
    }

    #[test]
    fn scores_rejects_wrong_length() {
        let set = ConditionSet::nih_chest_xray14();
        let err = set.scores(&[0.1, 0.2]).unwrap_err();
        assert!(matches!(err, ReportError::InvalidInput(_)));
        assert!(err.to_string().contains("expected 14 probabilities, got 2"));
    }

    #[test]
    fn scores_rejects_nan() {
        let set = ConditionSet::nih_chest_xray14();
        let mut values = uniform(0.1);
        values[3] = f64::NAN;
        let err = set.scores(&values).unwrap_err();
        assert!(err.to_string().contains("Edema"));
    }

    #[test]
    fn scores_pairs_labels_with_values() {
        let set = ConditionSet::nih_chest_xray14();
        let mut values = uniform(0.1);
        values[1] = 0.81;
        let scores = set.scores(&values).unwrap();
        assert_eq!(scores.len(), 14);
        assert_eq!(scores.get("Cardiomegaly").unwrap().value(), 0.81);
    }

    #[test]
    fn diagnose_uses_strict_greater_than() {
        let set = ConditionSet::nih_chest_xray14();
        let mut values = uniform(0.0);
        values[10] = 0.5; // Nodule threshold is exactly 0.5
        values[1] = 0.73; // Cardiomegaly threshold is 0.7234
        let diagnoses = set.diagnose(&set.scores(&values).unwrap());

        assert!(!diagnoses[10].positive);
        assert!(diagnoses[1].positive);
        assert_eq!(diagnoses.iter().filter(|d| d.positive).count(), 1);
    }

    #[test]
    fn canonical_label_normalises_spelling() {
        let set = ConditionSet::nih_chest_xray14();
        assert_eq!(
            set.canonical_label("pleural  thickening").unwrap().as_str(),
            "Pleural_Thickening"
        );
        assert_eq!(
            set.canonical_label("CARDIOMEGALY").unwrap().as_str(),
            "Cardiomegaly"
        );
        assert!(set.canonical_label("Fracture").is_none());
    }

    #[test]
    fn custom_set_rejects_duplicates() {
        let condition = |label: &str| Condition {
            label: NonEmptyText::new(label).unwrap(),
            threshold: 0.5,
        };
        assert!(ConditionSet::new(vec![]).is_err());
        assert!(ConditionSet::new(vec![condition("Mass"), condition("mass")]).is_err());
        assert_eq!(
            ConditionSet::new(vec![condition("Mass"), condition("Nodule")])
                .unwrap()
                .len(),
            2
        );
    }
}
