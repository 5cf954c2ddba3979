//! Flat reshaper: one output column per distinct feature.
//!
//! Turns the numbered explanation slots into per-feature columns named
//! `{feature}_EXPLANATION_STRENGTH` and drops every explanation column from
//! the result. The input table is never mutated; a new table is returned.
//!
//! The feature column set is collected in a pre-pass over all rows before any
//! column is allocated, then a second pass fills dense, null-initialized
//! value arrays. The column set therefore never depends on processing order.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Map, Value};

use crate::error::{FormatError, FormatResult};
use crate::models::{ColumnClassification, ExplanationSlot, TableData};

use super::convention;

/// Resolve populated slot indices to column descriptors.
///
/// Fails when a populated slot's strength column is missing — the convention
/// guarantees the pair exists, so its absence is structural corruption.
pub fn resolve_slots(
    table: &TableData,
    classification: &ColumnClassification,
) -> FormatResult<Vec<ExplanationSlot>> {
    classification
        .populated_slots
        .iter()
        .map(|&n| {
            let slot = ExplanationSlot::new(n);
            if !table.has_column(&slot.strength_column) {
                return Err(FormatError::MissingStrengthColumn {
                    slot: n,
                    column: slot.strength_column,
                });
            }
            Ok(slot)
        })
        .collect()
}

/// Reshape a table into the flat form.
///
/// Output columns: the passthrough columns in their original order (minus
/// every explanation column), then one `{feature}_EXPLANATION_STRENGTH`
/// column per distinct feature in first-seen order. A feature cell is null
/// for rows where that feature appeared in no slot.
///
/// If the same feature name shows up in more than one slot of a row, the
/// highest-index slot wins. Scoring jobs do not normally emit that, but it
/// is accepted rather than rejected.
pub fn to_flat(
    table: &TableData,
    classification: &ColumnClassification,
) -> FormatResult<TableData> {
    let slots = resolve_slots(table, classification)?;
    let row_count = table.records.len();

    // Pre-pass: the full feature set, first-seen order (rows in order, slots
    // ascending within a row).
    let mut feature_order: Vec<String> = Vec::new();
    let mut feature_index: HashMap<String, usize> = HashMap::new();
    for row in &table.records {
        for slot in &slots {
            if let Some(name) = convention::feature_name_of(row.get(&slot.feature_column)) {
                if !feature_index.contains_key(&name) {
                    feature_index.insert(name.clone(), feature_order.len());
                    feature_order.push(name);
                }
            }
        }
    }

    // Dense per-feature columns, null until a slot references the feature.
    let mut columns: Vec<Vec<Value>> = vec![vec![Value::Null; row_count]; feature_order.len()];

    for (row_idx, row) in table.records.iter().enumerate() {
        for slot in &slots {
            let Some(name) = convention::feature_name_of(row.get(&slot.feature_column)) else {
                continue;
            };
            let strength = convention::parse_strength(
                row.get(&slot.strength_column),
                row_idx,
                &slot.strength_column,
            )?;
            let cell = match strength {
                Some(v) => json!(v),
                None => Value::Null,
            };
            // Slots iterate ascending, so a repeated feature ends up with
            // the highest slot's strength.
            columns[feature_index[&name]][row_idx] = cell;
        }
    }

    let dropped: HashSet<&String> = classification.explanation_columns.iter().collect();
    let passthrough: Vec<&String> = table
        .headers
        .iter()
        .filter(|h| !dropped.contains(h))
        .collect();

    let feature_headers: Vec<String> = feature_order
        .iter()
        .map(|f| convention::strength_output_column(f))
        .collect();

    let mut headers: Vec<String> = passthrough.iter().map(|h| h.to_string()).collect();
    headers.extend(feature_headers.iter().cloned());

    let records: Vec<Value> = table
        .records
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut obj = Map::new();
            for h in &passthrough {
                obj.insert(
                    (*h).clone(),
                    row.get(h.as_str()).cloned().unwrap_or(Value::Null),
                );
            }
            for (col, header) in feature_headers.iter().enumerate() {
                obj.insert(header.clone(), columns[col][row_idx].clone());
            }
            Value::Object(obj)
        })
        .collect();

    Ok(TableData::new(headers, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::classifier::classify_columns;
    use serde_json::json;

    fn scored_table() -> TableData {
        // Row 0: slot0=("age", 0.5), slot1=("income", -0.2)
        // Row 1: slot0=("income", 0.3), slot1=(null, null)
        TableData::new(
            vec![
                "id".into(),
                "EXPLANATION_0_FEATURE_NAME".into(),
                "EXPLANATION_0_STRENGTH".into(),
                "EXPLANATION_1_FEATURE_NAME".into(),
                "EXPLANATION_1_STRENGTH".into(),
            ],
            vec![
                json!({"id": "a",
                       "EXPLANATION_0_FEATURE_NAME": "age",
                       "EXPLANATION_0_STRENGTH": 0.5,
                       "EXPLANATION_1_FEATURE_NAME": "income",
                       "EXPLANATION_1_STRENGTH": -0.2}),
                json!({"id": "b",
                       "EXPLANATION_0_FEATURE_NAME": "income",
                       "EXPLANATION_0_STRENGTH": 0.3,
                       "EXPLANATION_1_FEATURE_NAME": null,
                       "EXPLANATION_1_STRENGTH": null}),
            ],
        )
    }

    #[test]
    fn test_flat_scenario() {
        let table = scored_table();
        let classification = classify_columns(&table);
        let flat = to_flat(&table, &classification).unwrap();

        assert_eq!(
            flat.headers,
            vec![
                "id",
                "age_EXPLANATION_STRENGTH",
                "income_EXPLANATION_STRENGTH"
            ]
        );
        assert_eq!(flat.records[0]["age_EXPLANATION_STRENGTH"], 0.5);
        assert_eq!(flat.records[0]["income_EXPLANATION_STRENGTH"], -0.2);
        assert_eq!(flat.records[1]["age_EXPLANATION_STRENGTH"], Value::Null);
        assert_eq!(flat.records[1]["income_EXPLANATION_STRENGTH"], 0.3);
        // Passthrough survives.
        assert_eq!(flat.records[0]["id"], "a");
    }

    #[test]
    fn test_explanation_columns_dropped() {
        let table = scored_table();
        let classification = classify_columns(&table);
        let flat = to_flat(&table, &classification).unwrap();

        for header in &flat.headers {
            assert!(!header.starts_with("EXPLANATION_"), "leaked: {}", header);
        }
        assert!(flat.records[0].get("EXPLANATION_0_STRENGTH").is_none());
    }

    #[test]
    fn test_column_set_is_exactly_observed_features() {
        let table = scored_table();
        let classification = classify_columns(&table);
        let flat = to_flat(&table, &classification).unwrap();

        let feature_cols: Vec<&String> = flat
            .headers
            .iter()
            .filter(|h| h.ends_with("_EXPLANATION_STRENGTH"))
            .collect();
        assert_eq!(
            feature_cols,
            vec!["age_EXPLANATION_STRENGTH", "income_EXPLANATION_STRENGTH"]
        );
    }

    #[test]
    fn test_all_null_slot_produces_no_column() {
        let table = TableData::new(
            vec![
                "EXPLANATION_0_FEATURE_NAME".into(),
                "EXPLANATION_0_STRENGTH".into(),
                "EXPLANATION_1_FEATURE_NAME".into(),
                "EXPLANATION_1_STRENGTH".into(),
            ],
            vec![json!({"EXPLANATION_0_FEATURE_NAME": "age",
                        "EXPLANATION_0_STRENGTH": 0.1,
                        "EXPLANATION_1_FEATURE_NAME": null,
                        "EXPLANATION_1_STRENGTH": null})],
        );
        let classification = classify_columns(&table);
        let flat = to_flat(&table, &classification).unwrap();
        assert_eq!(flat.headers, vec!["age_EXPLANATION_STRENGTH"]);
    }

    #[test]
    fn test_repeated_feature_last_slot_wins() {
        let table = TableData::new(
            vec![
                "EXPLANATION_0_FEATURE_NAME".into(),
                "EXPLANATION_0_STRENGTH".into(),
                "EXPLANATION_1_FEATURE_NAME".into(),
                "EXPLANATION_1_STRENGTH".into(),
            ],
            vec![json!({"EXPLANATION_0_FEATURE_NAME": "age",
                        "EXPLANATION_0_STRENGTH": 0.5,
                        "EXPLANATION_1_FEATURE_NAME": "age",
                        "EXPLANATION_1_STRENGTH": 0.9})],
        );
        let classification = classify_columns(&table);
        let flat = to_flat(&table, &classification).unwrap();
        assert_eq!(flat.records[0]["age_EXPLANATION_STRENGTH"], 0.9);
    }

    #[test]
    fn test_missing_strength_column_fails() {
        let table = TableData::new(
            vec!["EXPLANATION_0_FEATURE_NAME".into()],
            vec![json!({"EXPLANATION_0_FEATURE_NAME": "age"})],
        );
        let classification = classify_columns(&table);
        let err = to_flat(&table, &classification).unwrap_err();
        assert!(matches!(
            err,
            FormatError::MissingStrengthColumn { slot: 0, .. }
        ));
    }

    #[test]
    fn test_string_strengths_become_numbers() {
        let table = TableData::new(
            vec![
                "EXPLANATION_0_FEATURE_NAME".into(),
                "EXPLANATION_0_STRENGTH".into(),
            ],
            vec![json!({"EXPLANATION_0_FEATURE_NAME": "age",
                        "EXPLANATION_0_STRENGTH": "0.75"})],
        );
        let classification = classify_columns(&table);
        let flat = to_flat(&table, &classification).unwrap();
        assert_eq!(flat.records[0]["age_EXPLANATION_STRENGTH"], 0.75);
    }

    #[test]
    fn test_garbage_strength_fails() {
        let table = TableData::new(
            vec![
                "EXPLANATION_0_FEATURE_NAME".into(),
                "EXPLANATION_0_STRENGTH".into(),
            ],
            vec![json!({"EXPLANATION_0_FEATURE_NAME": "age",
                        "EXPLANATION_0_STRENGTH": "high"})],
        );
        let classification = classify_columns(&table);
        assert!(matches!(
            to_flat(&table, &classification),
            Err(FormatError::InvalidStrength { row: 0, .. })
        ));
    }

    #[test]
    fn test_zero_rows_keeps_passthrough_headers() {
        let table = TableData::new(
            vec![
                "id".into(),
                "EXPLANATION_0_FEATURE_NAME".into(),
                "EXPLANATION_0_STRENGTH".into(),
            ],
            vec![],
        );
        let classification = classify_columns(&table);
        let flat = to_flat(&table, &classification).unwrap();
        assert_eq!(flat.headers, vec!["id"]);
        assert!(flat.records.is_empty());
    }
}
