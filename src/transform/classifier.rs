//! Column classifier for explanation exports.
//!
//! Scans a table's headers for explanation columns and determines which
//! numbered slots actually carry data. The classifier is a pure function of
//! the table: no state, deterministic, and safe to call on zero-row tables
//! (headers are enough to classify, an empty table simply has no populated
//! slots).

use crate::models::{ColumnClassification, TableData};

use super::convention;

/// Classify a table's columns against the explanation convention.
///
/// Returns every explanation column in table order (for later removal) and
/// the ascending slot indices whose feature-name column is not entirely
/// empty.
///
/// A slot with an all-empty feature-name column is excluded from
/// `populated_slots` but its columns still count as explanation columns —
/// the flat reshaper drops them with the rest.
pub fn classify_columns(table: &TableData) -> ColumnClassification {
    let explanation_columns: Vec<String> = table
        .headers
        .iter()
        .filter(|h| convention::is_explanation_column(h))
        .cloned()
        .collect();

    let mut populated_slots: Vec<u32> = explanation_columns
        .iter()
        .filter_map(|col| convention::parse_feature_name_column(col).map(|n| (n, col)))
        .filter(|(_, col)| {
            table
                .records
                .iter()
                .any(|row| !convention::is_empty_cell(row.get(col.as_str())))
        })
        .map(|(n, _)| n)
        .collect();

    // Indices come from distinct column names, so no duplicates to remove.
    populated_slots.sort_unstable();

    ColumnClassification {
        explanation_columns,
        populated_slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn table(headers: &[&str], records: Vec<Value>) -> TableData {
        TableData::new(headers.iter().map(|s| s.to_string()).collect(), records)
    }

    #[test]
    fn test_slot_discovery() {
        // Slot 0 populated in some row, slot 1 entirely null.
        let t = table(
            &[
                "id",
                "EXPLANATION_0_FEATURE_NAME",
                "EXPLANATION_0_STRENGTH",
                "EXPLANATION_1_FEATURE_NAME",
                "EXPLANATION_1_STRENGTH",
            ],
            vec![
                json!({"id": "a", "EXPLANATION_0_FEATURE_NAME": "age",
                       "EXPLANATION_0_STRENGTH": 0.5,
                       "EXPLANATION_1_FEATURE_NAME": null,
                       "EXPLANATION_1_STRENGTH": null}),
                json!({"id": "b", "EXPLANATION_0_FEATURE_NAME": null,
                       "EXPLANATION_0_STRENGTH": null,
                       "EXPLANATION_1_FEATURE_NAME": null,
                       "EXPLANATION_1_STRENGTH": null}),
            ],
        );

        let classification = classify_columns(&t);
        assert_eq!(classification.populated_slots, vec![0]);
        assert_eq!(classification.explanation_columns.len(), 4);
        // All-null slot's columns still marked for removal.
        assert!(classification
            .explanation_columns
            .contains(&"EXPLANATION_1_STRENGTH".to_string()));
    }

    #[test]
    fn test_explanation_columns_keep_table_order() {
        let t = table(
            &[
                "EXPLANATION_1_STRENGTH",
                "id",
                "EXPLANATION_0_FEATURE_NAME",
            ],
            vec![],
        );
        let classification = classify_columns(&t);
        assert_eq!(
            classification.explanation_columns,
            vec!["EXPLANATION_1_STRENGTH", "EXPLANATION_0_FEATURE_NAME"]
        );
    }

    #[test]
    fn test_zero_rows_classifies_headers_only() {
        let t = table(
            &["id", "EXPLANATION_0_FEATURE_NAME", "EXPLANATION_0_STRENGTH"],
            vec![],
        );
        let classification = classify_columns(&t);
        assert_eq!(classification.explanation_columns.len(), 2);
        assert!(classification.populated_slots.is_empty());
        assert!(!classification.has_explanations());
    }

    #[test]
    fn test_slots_ascending_and_sparse() {
        // Slots 2 and 7, nothing in between.
        let t = table(
            &[
                "EXPLANATION_7_FEATURE_NAME",
                "EXPLANATION_7_STRENGTH",
                "EXPLANATION_2_FEATURE_NAME",
                "EXPLANATION_2_STRENGTH",
            ],
            vec![json!({
                "EXPLANATION_7_FEATURE_NAME": "income",
                "EXPLANATION_7_STRENGTH": -0.1,
                "EXPLANATION_2_FEATURE_NAME": "age",
                "EXPLANATION_2_STRENGTH": 0.3,
            })],
        );
        let classification = classify_columns(&t);
        assert_eq!(classification.populated_slots, vec![2, 7]);
    }

    #[test]
    fn test_blank_strings_count_as_empty() {
        let t = table(
            &["EXPLANATION_0_FEATURE_NAME", "EXPLANATION_0_STRENGTH"],
            vec![
                json!({"EXPLANATION_0_FEATURE_NAME": "", "EXPLANATION_0_STRENGTH": ""}),
                json!({"EXPLANATION_0_FEATURE_NAME": "  ", "EXPLANATION_0_STRENGTH": ""}),
            ],
        );
        let classification = classify_columns(&t);
        assert!(classification.populated_slots.is_empty());
    }

    #[test]
    fn test_non_numeric_middle_is_not_a_slot() {
        let t = table(
            &["EXPLANATION_META_FEATURE_NAME"],
            vec![json!({"EXPLANATION_META_FEATURE_NAME": "x"})],
        );
        let classification = classify_columns(&t);
        assert!(classification.populated_slots.is_empty());
        assert_eq!(classification.explanation_columns.len(), 1);
    }

    #[test]
    fn test_classifier_idempotence() {
        let t = table(
            &["id", "EXPLANATION_0_FEATURE_NAME", "EXPLANATION_0_STRENGTH"],
            vec![json!({"id": "a", "EXPLANATION_0_FEATURE_NAME": "age",
                        "EXPLANATION_0_STRENGTH": 0.5})],
        );
        let first = classify_columns(&t);
        let second = classify_columns(&t);
        assert_eq!(first, second);
    }
}
