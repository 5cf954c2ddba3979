//! The explanation column naming convention.
//!
//! Scoring exports spread each row's ranked explanations across numbered
//! column pairs: `EXPLANATION_{n}_FEATURE_NAME` holds the nth most important
//! feature, `EXPLANATION_{n}_STRENGTH` its signed contribution. Slot indices
//! need not be contiguous or start at 0.
//!
//! Column names are parsed here, once, at classification time. The per-row
//! loops in the reshapers only ever see resolved [`crate::models::ExplanationSlot`]
//! descriptors.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::FormatError;

/// Prefix shared by every explanation column.
pub const EXPLANATION_PREFIX: &str = "EXPLANATION_";

/// Suffix of the per-feature columns created by the flat reshaper.
pub const STRENGTH_OUTPUT_SUFFIX: &str = "_EXPLANATION_STRENGTH";

static FEATURE_NAME_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^EXPLANATION_(\d+)_FEATURE_NAME$").expect("valid regex"));

/// Whether a column belongs to the explanation convention at all.
pub fn is_explanation_column(name: &str) -> bool {
    name.starts_with(EXPLANATION_PREFIX)
}

/// Extract the slot index from an `EXPLANATION_{n}_FEATURE_NAME` column.
///
/// Returns `None` for anything else, including explanation columns with a
/// non-numeric middle — those are still dropped from flat output but never
/// become slots.
pub fn parse_feature_name_column(name: &str) -> Option<u32> {
    FEATURE_NAME_COLUMN
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Feature-name column for slot `index`.
pub fn feature_name_column(index: u32) -> String {
    format!("EXPLANATION_{}_FEATURE_NAME", index)
}

/// Strength column for slot `index`.
pub fn strength_column(index: u32) -> String {
    format!("EXPLANATION_{}_STRENGTH", index)
}

/// Output column holding `feature`'s strength in the flat form.
pub fn strength_output_column(feature: &str) -> String {
    format!("{}{}", feature, STRENGTH_OUTPUT_SUFFIX)
}

/// Check if a cell is "empty" (absent, null, or blank string).
pub fn is_empty_cell(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Read a cell's feature name, `None` when the cell is empty.
pub fn feature_name_of(value: Option<&Value>) -> Option<String> {
    if is_empty_cell(value) {
        return None;
    }
    match value {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        // A non-string feature name is unusual but harmless; render it.
        Some(other) => Some(other.to_string()),
        None => None,
    }
}

/// Normalize a strength cell to `f64`.
///
/// Accepts JSON numbers (in-memory callers) and numeric strings (CSV), maps
/// empty cells to `None`, and rejects anything else as a convention
/// violation.
pub fn parse_strength(
    value: Option<&Value>,
    row: usize,
    column: &str,
) -> Result<Option<f64>, FormatError> {
    if is_empty_cell(value) {
        return Ok(None);
    }
    match value {
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            FormatError::InvalidStrength {
                row,
                column: column.to_string(),
                value: s.clone(),
            }
        }),
        Some(other) => Err(FormatError::InvalidStrength {
            row,
            column: column.to_string(),
            value: other.to_string(),
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_feature_name_column() {
        assert_eq!(
            parse_feature_name_column("EXPLANATION_0_FEATURE_NAME"),
            Some(0)
        );
        assert_eq!(
            parse_feature_name_column("EXPLANATION_12_FEATURE_NAME"),
            Some(12)
        );
        assert_eq!(parse_feature_name_column("EXPLANATION_0_STRENGTH"), None);
        assert_eq!(
            parse_feature_name_column("EXPLANATION_X_FEATURE_NAME"),
            None
        );
        assert_eq!(parse_feature_name_column("age"), None);
    }

    #[test]
    fn test_column_name_builders() {
        assert_eq!(feature_name_column(7), "EXPLANATION_7_FEATURE_NAME");
        assert_eq!(strength_column(7), "EXPLANATION_7_STRENGTH");
        assert_eq!(strength_output_column("age"), "age_EXPLANATION_STRENGTH");
    }

    #[test]
    fn test_is_empty_cell() {
        assert!(is_empty_cell(None));
        assert!(is_empty_cell(Some(&Value::Null)));
        assert!(is_empty_cell(Some(&json!(""))));
        assert!(is_empty_cell(Some(&json!("   "))));
        assert!(!is_empty_cell(Some(&json!("age"))));
        assert!(!is_empty_cell(Some(&json!(0))));
        assert!(!is_empty_cell(Some(&json!(false))));
    }

    #[test]
    fn test_parse_strength_variants() {
        let col = "EXPLANATION_0_STRENGTH";
        assert_eq!(parse_strength(Some(&json!(0.5)), 0, col).unwrap(), Some(0.5));
        assert_eq!(
            parse_strength(Some(&json!("-0.25")), 0, col).unwrap(),
            Some(-0.25)
        );
        assert_eq!(parse_strength(Some(&Value::Null), 0, col).unwrap(), None);
        assert_eq!(parse_strength(Some(&json!("")), 0, col).unwrap(), None);
        assert_eq!(parse_strength(None, 0, col).unwrap(), None);
        assert!(parse_strength(Some(&json!("n/a")), 3, col).is_err());
    }

    #[test]
    fn test_feature_name_of() {
        assert_eq!(feature_name_of(Some(&json!("  age "))), Some("age".into()));
        assert_eq!(feature_name_of(Some(&Value::Null)), None);
        assert_eq!(feature_name_of(Some(&json!(""))), None);
    }
}
