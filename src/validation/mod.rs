//! JSON Schema validation for reshaped output rows.
//!
//! Both output shapes are validated against JSON Schema Draft 7 before they
//! leave the pipeline, so a reshaping bug surfaces as a validation count
//! instead of silently corrupt downstream data.
//!
//! # Validation Modes
//!
//! ## Flat row
//! - Passthrough columns plus `{feature}_EXPLANATION_STRENGTH` columns
//! - The schema pins every strength column to number-or-null via a
//!   `patternProperties` rule; passthrough columns are unconstrained
//!
//! ## Melted record
//! - Exactly `(orig_row_num, feature_name, feature_strength)`
//! - `orig_row_num` may be a position (integer) or an identifier (string)
//!
//! # Embedded Schemas
//!
//! Schemas are embedded at compile time from `schemas/`:
//! - `explanations-flat.json`
//! - `explanations-melted.json`

use serde_json::Value;

/// Validate a JSON object against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with every validation error otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Boolean-only variant of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate one flat output row.
pub fn validate_flat_row(data: &Value) -> Result<(), Vec<String>> {
    let schema: Value = serde_json::from_str(include_str!("../../schemas/explanations-flat.json"))
        .expect("Invalid embedded schema");
    validate(&schema, data)
}

/// Quick check against the flat row schema.
pub fn is_valid_flat_row(data: &Value) -> bool {
    let schema: Value = serde_json::from_str(include_str!("../../schemas/explanations-flat.json"))
        .expect("Invalid embedded schema");
    is_valid(&schema, data)
}

/// Validate one melted output record.
pub fn validate_melted_record(data: &Value) -> Result<(), Vec<String>> {
    let schema: Value =
        serde_json::from_str(include_str!("../../schemas/explanations-melted.json"))
            .expect("Invalid embedded schema");
    validate(&schema, data)
}

/// Quick check against the melted record schema.
pub fn is_valid_melted_record(data: &Value) -> bool {
    let schema: Value =
        serde_json::from_str(include_str!("../../schemas/explanations-melted.json"))
            .expect("Invalid embedded schema");
    is_valid(&schema, data)
}
