//! REST API types for pipeline clients.
//!
//! Both output shapes go to the client as plain JSON; the flat table ships
//! its column order explicitly since JSON objects carry none.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::MeltedRecord;
use crate::transform::pipeline::ProcessResult;

/// Response sent to clients after a CSV upload and reshape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReshapeResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready", "warning"
    pub status: String,

    /// When the reshape finished
    pub processed_at: DateTime<Utc>,

    /// Flat output, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat: Option<FlatPayload>,

    /// Melted output, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub melted: Option<Vec<MeltedRecord>>,

    /// Metadata about the run
    pub metadata: ResponseMetadata,
}

/// Flat table with explicit column order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatPayload {
    pub columns: Vec<String>,
    pub rows: Vec<Value>,
}

/// Metadata about the reshaping run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// CSV info
    pub csv_info: CsvMetadata,

    /// What the classifier found
    pub explanations: ExplanationMetadata,

    /// Validation stats
    pub validation: ValidationStats,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Classifier findings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationMetadata {
    pub explanation_column_count: usize,
    pub populated_slots: Vec<u32>,
    pub features: Vec<String>,
}

/// Validation statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub valid: usize,
    pub invalid: usize,
    pub errors: Vec<ValidationError>,
}

/// A validation error sample
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub record_index: usize,
    pub errors: Vec<String>,
}

/// Convert a ProcessResult into the client response
impl From<ProcessResult> for ReshapeResponse {
    fn from(result: ProcessResult) -> Self {
        let flat = result.flat.map(|table| FlatPayload {
            columns: table.headers,
            rows: table.records,
        });

        ReshapeResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if result.invalid_count == 0 {
                "ready"
            } else {
                "warning"
            }
            .to_string(),
            processed_at: Utc::now(),
            flat,
            melted: result.melted,
            metadata: ResponseMetadata {
                csv_info: CsvMetadata {
                    encoding: result.csv_info.encoding,
                    delimiter: result.csv_info.delimiter.to_string(),
                    row_count: result.csv_info.row_count,
                    columns: result.csv_info.headers,
                },
                explanations: ExplanationMetadata {
                    explanation_column_count: result.summary.explanation_column_count,
                    populated_slots: result.summary.populated_slots,
                    features: result.summary.features,
                },
                validation: ValidationStats {
                    valid: result.valid_count,
                    invalid: result.invalid_count,
                    errors: result
                        .validation_errors
                        .into_iter()
                        .map(|(idx, errs)| ValidationError {
                            record_index: idx,
                            errors: errs,
                        })
                        .collect(),
                },
            },
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
