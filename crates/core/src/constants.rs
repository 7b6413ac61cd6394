//! Constants used throughout the CXR core crate.
//!
//! Condition labels and thresholds follow the NIH ChestX-ray14 ordering used by the inference
//! model; the two arrays are index-aligned and must stay that way.

/// Number of conditions scored by the classifier.
pub const CONDITION_COUNT: usize = 14;

/// Condition labels in classifier output order.
pub const CONDITION_LABELS: [&str; CONDITION_COUNT] = [
    "Atelectasis",
    "Cardiomegaly",
    "Consolidation",
    "Edema",
    "Effusion",
    "Emphysema",
    "Fibrosis",
    "Hernia",
    "Infiltration",
    "Mass",
    "Nodule",
    "Pleural_Thickening",
    "Pneumonia",
    "Pneumothorax",
];

/// Per-condition decision thresholds, index-aligned with [`CONDITION_LABELS`].
pub const OPTIMAL_THRESHOLDS: [f64; CONDITION_COUNT] = [
    0.7080, 0.7234, 0.7239, 0.7236, 0.7092, 0.7224, 0.7290, 0.7307, 0.6986, 0.7143, 0.5, 0.7214,
    0.7251, 0.7295,
];

/// A parsed finding strictly above this probability is interpreted as significant.
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.5;

/// Default upper bound on a single narrative backend call.
pub const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 20;

/// Default size of the blocking worker pool.
pub const DEFAULT_WORKER_THREADS: usize = 8;

/// Default directory for rendered report artifacts.
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Title printed at the top of every report and used as the PDF document title.
pub const REPORT_TITLE: &str = "Chest X-ray Analysis Report";

/// Text of the closing disclaimer block.
pub const DISCLAIMER_TEXT: &str = "Disclaimer: This report is AI-generated and intended for \
informational purposes only. Consult a qualified healthcare professional for diagnosis and \
treatment.";
