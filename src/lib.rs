//! # Predexplain - prediction explanation reshaping
//!
//! Predexplain takes the wide CSV export of a model scoring job — where each
//! row spreads its ranked feature explanations across numbered
//! `EXPLANATION_{n}_FEATURE_NAME` / `EXPLANATION_{n}_STRENGTH` column pairs —
//! and reshapes it into normalized tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Scored CSV  │────▶│   Parser    │────▶│  Classifier  │────▶│  Reshaper   │
//! │ (file/API)  │     │ (auto-enc)  │     │ (slots)      │     │ (flat/melt) │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! Two output shapes:
//!
//! - **flat**: one `{feature}_EXPLANATION_STRENGTH` column per distinct
//!   feature, explanation columns dropped, passthrough columns kept
//! - **melted**: one `(orig_row_num, feature_name, feature_strength)` row per
//!   observation × populated slot, for BI tools
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use predexplain::{process_csv, ProcessOptions};
//! use std::path::Path;
//!
//! let result = process_csv(Path::new("scored.csv"), ProcessOptions::default())?;
//! println!("{} features found", result.summary.features.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (TableData, ExplanationSlot, MeltedRecord)
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Classifier, reshapers, and pipeline
//! - [`validation`] - Output schema validation
//! - [`scoring`] - Remote scoring-service client
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Reshaping
pub mod transform;

// Validation
pub mod validation;

// Remote scoring
pub mod scoring;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{FormatError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{ColumnClassification, ExplanationSlot, MeltedRecord, OutputShape, TableData};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    csv_to_json, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv,
    parse_csv_file_auto, records_to_csv, CsvError, ParseResult,
};

// =============================================================================
// Re-exports - Reshaping core
// =============================================================================

pub use transform::{classify_columns, resolve_slots, to_flat, to_melted};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    process_bytes, process_csv, process_records, ExplanationPipeline, PipelineStage,
    ProcessOptions, ProcessResult, ReshapeSummary,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    is_valid, is_valid_flat_row, is_valid_melted_record, validate, validate_flat_row,
    validate_melted_record,
};

// =============================================================================
// Re-exports - Scoring client
// =============================================================================

pub use scoring::{ScoringClient, ScoringError};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ReshapeResponse, ResponseMetadata, ValidationStats};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
