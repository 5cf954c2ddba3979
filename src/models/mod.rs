//! Domain models for the predexplain reshaping pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`TableData`] - an ordered table: column headers plus JSON object rows
//! - [`ExplanationSlot`] - resolved column pair for one explanation slot
//! - [`ColumnClassification`] - classifier output over a table's headers
//! - [`MeltedRecord`] - one row of the melted output
//! - [`OutputShape`] - which normalized form(s) to produce

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transform::convention;

// =============================================================================
// Table
// =============================================================================

/// An in-memory table: ordered column names plus one JSON object per row.
///
/// Column order lives in `headers`, never in map iteration order. A cell is
/// *empty* when the key is missing, the value is `null`, or the value is a
/// blank string; the CSV parser stores empty cells as `null` so null-ness
/// stays distinguishable from real values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableData {
    /// Column names in table order.
    pub headers: Vec<String>,
    /// Rows as JSON objects keyed by column name.
    pub records: Vec<Value>,
}

impl TableData {
    /// Create a table from headers and rows.
    pub fn new(headers: Vec<String>, records: Vec<Value>) -> Self {
        Self { headers, records }
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Whether a column exists in the header row.
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Cell value by row index and column name, `None` if absent.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.records.get(row).and_then(|r| r.get(column))
    }
}

// =============================================================================
// Explanation Slots
// =============================================================================

/// The resolved column pair for one explanation slot index.
///
/// Slot descriptors are built once, before the row loop, so the per-row code
/// never re-parses column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationSlot {
    /// Slot index `n` from `EXPLANATION_{n}_FEATURE_NAME`.
    pub index: u32,
    /// Column holding the feature name for this slot.
    pub feature_column: String,
    /// Column holding the signed contribution strength for this slot.
    pub strength_column: String,
}

impl ExplanationSlot {
    /// Build the descriptor for slot `index` from the naming convention.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            feature_column: convention::feature_name_column(index),
            strength_column: convention::strength_column(index),
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Output of the column classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnClassification {
    /// Every column matching the explanation convention, in table order.
    /// The flat reshaper drops all of these from its output.
    pub explanation_columns: Vec<String>,
    /// Slot indices whose feature-name column holds at least one non-empty
    /// value, ascending.
    pub populated_slots: Vec<u32>,
}

impl ColumnClassification {
    /// Whether the table carries any usable explanation data.
    pub fn has_explanations(&self) -> bool {
        !self.populated_slots.is_empty()
    }
}

// =============================================================================
// Melted Output
// =============================================================================

/// One row of the melted output: `(orig_row_num, feature_name,
/// feature_strength)`.
///
/// `orig_row_num` is the row's 0-based position unless an identifier column
/// was designated, in which case it is that column's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeltedRecord {
    pub orig_row_num: Value,
    pub feature_name: String,
    pub feature_strength: Option<f64>,
}

// =============================================================================
// Output Shape
// =============================================================================

/// Which normalized form(s) a pipeline run should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    Flat,
    Melted,
    #[default]
    Both,
}

impl OutputShape {
    pub fn wants_flat(&self) -> bool {
        matches!(self, Self::Flat | Self::Both)
    }

    pub fn wants_melted(&self) -> bool {
        matches!(self, Self::Melted | Self::Both)
    }
}

impl std::str::FromStr for OutputShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "melted" | "melt" => Ok(Self::Melted),
            "both" => Ok(Self::Both),
            other => Err(format!(
                "unknown shape '{}', expected flat, melted or both",
                other
            )),
        }
    }
}

impl std::fmt::Display for OutputShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Melted => write!(f, "melted"),
            Self::Both => write!(f, "both"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
