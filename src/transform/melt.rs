//! Melted reshaper: one output row per (observation, populated slot) pair.
//!
//! Feature names and strengths are melted into two intermediate series keyed
//! by (row reference, slot index), joined one-to-one, and projected down to
//! `(orig_row_num, feature_name, feature_strength)`. The slot index exists
//! only to join the two series back together and is dropped from the final
//! schema.
//!
//! The join key must be unique on both sides — one name and one strength per
//! row per slot. A duplicate or unmatched key means the input is corrupted
//! and the melt fails.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::{FormatError, FormatResult};
use crate::models::{ColumnClassification, MeltedRecord, TableData};

use super::convention;
use super::flat::resolve_slots;

/// Reshape a table into the melted form.
///
/// `id_column` designates an explicit original-row identifier; without one,
/// rows are referenced by 0-based position. Candidates whose feature name is
/// empty are discarded, so rows with fewer populated slots than the
/// table-wide maximum simply contribute fewer output rows.
///
/// Output rows are ordered by (original row position, slot index).
pub fn to_melted(
    table: &TableData,
    classification: &ColumnClassification,
    id_column: Option<&str>,
) -> FormatResult<Vec<MeltedRecord>> {
    let slots = resolve_slots(table, classification)?;

    if let Some(col) = id_column {
        if !table.has_column(col) {
            return Err(FormatError::MissingColumn(col.to_string()));
        }
    }

    let row_refs: Vec<Value> = table
        .records
        .iter()
        .enumerate()
        .map(|(i, row)| match id_column {
            Some(col) => row.get(col).cloned().unwrap_or(Value::Null),
            None => json!(i),
        })
        .collect();

    // Melt names and strengths separately, keyed by (row ref, slot index).
    let mut names: HashMap<(String, u32), Option<String>> = HashMap::new();
    let mut strengths: HashMap<(String, u32), Option<f64>> = HashMap::new();
    // Candidate keys in (row position, slot) order, which fixes output order.
    let mut candidates: Vec<(usize, u32, String)> = Vec::new();

    for (row_idx, row) in table.records.iter().enumerate() {
        let ref_key = ref_repr(&row_refs[row_idx]);
        for slot in &slots {
            let key = (ref_key.clone(), slot.index);

            let name = convention::feature_name_of(row.get(&slot.feature_column));
            if names.insert(key.clone(), name).is_some() {
                return Err(FormatError::JoinKeyCollision {
                    row_ref: ref_key,
                    slot: slot.index,
                });
            }

            let strength = convention::parse_strength(
                row.get(&slot.strength_column),
                row_idx,
                &slot.strength_column,
            )?;
            strengths.insert(key, strength);
            candidates.push((row_idx, slot.index, ref_key.clone()));
        }
    }

    let mut melted = Vec::new();
    for (row_idx, slot, ref_key) in candidates {
        let key = (ref_key.clone(), slot);
        // Null feature name: the row ran out of explanations before this slot.
        let Some(feature_name) = names.get(&key).cloned().flatten() else {
            continue;
        };
        let feature_strength =
            strengths
                .get(&key)
                .copied()
                .ok_or_else(|| FormatError::JoinMismatch {
                    row_ref: ref_key,
                    slot,
                })?;
        melted.push(MeltedRecord {
            orig_row_num: row_refs[row_idx].clone(),
            feature_name,
            feature_strength,
        });
    }

    Ok(melted)
}

/// Canonical string form of a row reference, for join keys.
fn ref_repr(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
