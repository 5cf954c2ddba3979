//! Error types for the predexplain reshaping pipeline.
//!
//! The hierarchy mirrors the module layers:
//!
//! - [`FormatError`] - explanation naming-convention violations (core)
//! - [`crate::parser::CsvError`] - CSV parsing errors
//! - [`crate::scoring::ScoringError`] - scoring-service client errors
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::transform::pipeline::PipelineStage;

// =============================================================================
// Input Format Errors (core)
// =============================================================================

/// The input table violates the explanation column convention.
///
/// These are permanent conditions: the reshapers never partially recover,
/// retry, or repair malformed input.
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// A populated feature-name column has no matching strength column.
    #[error("slot {slot} has feature names but no '{column}' column")]
    MissingStrengthColumn { slot: u32, column: String },

    /// A strength cell holds something that is neither empty nor numeric.
    #[error("row {row}, column '{column}': '{value}' is not a numeric strength")]
    InvalidStrength {
        row: usize,
        column: String,
        value: String,
    },

    /// Two rows melted to the same (row reference, slot) key.
    #[error("duplicate melt key (row '{row_ref}', slot {slot})")]
    JoinKeyCollision { row_ref: String, slot: u32 },

    /// A melt key was present in the name series but not the strength series.
    #[error("unmatched melt key (row '{row_ref}', slot {slot})")]
    JoinMismatch { row_ref: String, slot: u32 },

    /// A designated column does not exist in the table.
    #[error("column '{0}' not found in table")]
    MissingColumn(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline`]
/// entry points. It wraps all lower-level errors and adds pipeline-specific
/// variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] crate::parser::CsvError),

    /// Explanation convention violation.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Scoring-service client error.
    #[error("Scoring error: {0}")]
    Scoring(#[from] crate::scoring::ScoringError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Table has no data rows.
    #[error("No rows to process")]
    EmptyInput,

    /// A pipeline step was called out of order.
    #[error("Pipeline is {found}, expected {expected}")]
    Stage {
        expected: PipelineStage,
        found: PipelineStage,
    },

    /// A scoring step was requested without a configured client.
    #[error("No scoring client configured")]
    NoClient,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for the core reshaping operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
