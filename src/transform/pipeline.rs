//! High-level pipeline API for explanation reshaping.
//!
//! Two ways in:
//!
//! - Function style: [`process_csv`] / [`process_bytes`] / [`process_records`]
//!   parse, classify, reshape and validate in one call.
//! - Object style: [`ExplanationPipeline`] sequences load → request scoring →
//!   process for workflows that obtain the scored table from a remote
//!   deployment, tracking its stage between calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use predexplain::{process_csv, ProcessOptions};
//! use std::path::Path;
//!
//! let result = process_csv(Path::new("scored.csv"), ProcessOptions::default())?;
//! println!("{} melted rows", result.melted.map(|m| m.len()).unwrap_or(0));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{ColumnClassification, MeltedRecord, OutputShape, TableData};
use crate::parser::{parse_bytes_auto, parse_csv_file_auto, records_to_csv, ParseResult};
use crate::scoring::ScoringClient;
use crate::validation::{validate_flat_row, validate_melted_record};

use super::classifier::classify_columns;
use super::convention;
use super::flat::{resolve_slots, to_flat};
use super::melt::to_melted;

/// How many validation error samples to keep per run.
const MAX_ERROR_SAMPLES: usize = 10;

/// Options for a reshaping run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Which normalized form(s) to produce
    pub shape: OutputShape,

    /// Column holding an original-row identifier; row position when absent
    pub id_column: Option<String>,

    /// Skip schema validation of the output rows
    pub skip_validation: bool,
}

/// Result of a complete reshaping run
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    /// Flat table, when requested
    pub flat: Option<TableData>,

    /// Melted records, when requested
    pub melted: Option<Vec<MeltedRecord>>,

    /// What the classifier found
    pub summary: ReshapeSummary,

    /// CSV parsing metadata
    pub csv_info: CsvInfo,

    /// Number of output rows that passed schema validation
    pub valid_count: usize,

    /// Number of output rows that failed schema validation
    pub invalid_count: usize,

    /// Validation error samples (row index, errors)
    pub validation_errors: Vec<(usize, Vec<String>)>,
}

/// Classifier findings for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReshapeSummary {
    /// Number of explanation columns dropped from flat output
    pub explanation_column_count: usize,

    /// Slot indices that carried data
    pub populated_slots: Vec<u32>,

    /// Distinct feature names, first-seen order
    pub features: Vec<String>,
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Reshape a scored CSV file.
///
/// Parses with auto-detection, classifies the explanation columns, produces
/// the requested shape(s), and validates the output rows.
pub fn process_csv(path: &Path, options: ProcessOptions) -> PipelineResult<ProcessResult> {
    let parse_result = parse_csv_file_auto(path)?;
    process_parsed(parse_result, options)
}

/// Reshape scored CSV bytes.
pub fn process_bytes(bytes: &[u8], options: ProcessOptions) -> PipelineResult<ProcessResult> {
    let parse_result = parse_bytes_auto(bytes)?;
    process_parsed(parse_result, options)
}

/// Reshape already-parsed rows.
pub fn process_records(
    records: Vec<Value>,
    headers: Vec<String>,
    options: ProcessOptions,
) -> PipelineResult<ProcessResult> {
    let parse_result = ParseResult {
        records,
        encoding: "utf-8".to_string(),
        delimiter: ',',
        headers,
    };
    process_parsed(parse_result, options)
}

/// Internal: reshape a parsed table
fn process_parsed(
    parse_result: ParseResult,
    options: ProcessOptions,
) -> PipelineResult<ProcessResult> {
    log_info("📖 Reading scored table...");
    log_success(format!("Detected encoding: {}", parse_result.encoding));
    log_success(format!(
        "Detected separator: '{}'",
        format_delimiter(parse_result.delimiter)
    ));
    log_success(format!("Read {} rows", parse_result.records.len()));

    let csv_info = CsvInfo {
        encoding: parse_result.encoding.clone(),
        delimiter: parse_result.delimiter,
        headers: parse_result.headers.clone(),
        row_count: parse_result.records.len(),
    };

    if parse_result.records.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let table = parse_result.into_table();

    log_info("🔎 Classifying explanation columns...");
    let classification = classify_columns(&table);
    log_success(format!(
        "{} explanation columns, populated slots: {:?}",
        classification.explanation_columns.len(),
        classification.populated_slots
    ));
    if !classification.has_explanations() {
        log_warning("No populated explanation slots found");
    }

    let summary = summarize(&table, &classification)?;
    log_success(format!("{} distinct features", summary.features.len()));

    let flat = if options.shape.wants_flat() {
        log_info("⚙️  Reshaping to flat form...");
        let flat = to_flat(&table, &classification)?;
        log_success(format!(
            "{} rows × {} columns",
            flat.records.len(),
            flat.headers.len()
        ));
        Some(flat)
    } else {
        None
    };

    let melted = if options.shape.wants_melted() {
        log_info("⚙️  Reshaping to melted form...");
        let melted = to_melted(&table, &classification, options.id_column.as_deref())?;
        log_success(format!("{} melted rows", melted.len()));
        Some(melted)
    } else {
        None
    };

    let (valid_count, invalid_count, validation_errors) = if options.skip_validation {
        log_info("(validation skipped)");
        let total = flat.as_ref().map(|f| f.records.len()).unwrap_or(0)
            + melted.as_ref().map(|m| m.len()).unwrap_or(0);
        (total, 0, vec![])
    } else {
        log_info("✔️  Validating output rows...");
        let result = validate_outputs(flat.as_ref(), melted.as_ref());
        if result.1 == 0 {
            log_success(format!("All {} output rows valid", result.0));
        } else {
            log_warning(format!("{} valid, {} invalid", result.0, result.1));
        }
        result
    };

    Ok(ProcessResult {
        flat,
        melted,
        summary,
        csv_info,
        valid_count,
        invalid_count,
        validation_errors,
    })
}

/// Collect the classifier summary, including the distinct feature set.
fn summarize(
    table: &TableData,
    classification: &ColumnClassification,
) -> PipelineResult<ReshapeSummary> {
    let slots = resolve_slots(table, classification)?;

    let mut features: Vec<String> = Vec::new();
    for row in &table.records {
        for slot in &slots {
            if let Some(name) = convention::feature_name_of(row.get(&slot.feature_column)) {
                if !features.contains(&name) {
                    features.push(name);
                }
            }
        }
    }

    Ok(ReshapeSummary {
        explanation_column_count: classification.explanation_columns.len(),
        populated_slots: classification.populated_slots.clone(),
        features,
    })
}

/// Validate output rows against the embedded schemas.
fn validate_outputs(
    flat: Option<&TableData>,
    melted: Option<&Vec<MeltedRecord>>,
) -> (usize, usize, Vec<(usize, Vec<String>)>) {
    let mut valid = 0;
    let mut invalid = 0;
    let mut errors = Vec::new();

    if let Some(flat) = flat {
        for (i, record) in flat.records.iter().enumerate() {
            match validate_flat_row(record) {
                Ok(()) => valid += 1,
                Err(errs) => {
                    invalid += 1;
                    if errors.len() < MAX_ERROR_SAMPLES {
                        errors.push((i, errs));
                    }
                }
            }
        }
    }

    if let Some(melted) = melted {
        for (i, record) in melted.iter().enumerate() {
            let value = match serde_json::to_value(record) {
                Ok(v) => v,
                Err(e) => {
                    invalid += 1;
                    if errors.len() < MAX_ERROR_SAMPLES {
                        errors.push((i, vec![e.to_string()]));
                    }
                    continue;
                }
            };
            match validate_melted_record(&value) {
                Ok(()) => valid += 1,
                Err(errs) => {
                    invalid += 1;
                    if errors.len() < MAX_ERROR_SAMPLES {
                        errors.push((i, errs));
                    }
                }
            }
        }
    }

    (valid, invalid, errors)
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

// =============================================================================
// Stateful Orchestrator
// =============================================================================

/// Where an [`ExplanationPipeline`] currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// No data loaded yet
    Empty,
    /// Unscored data loaded, ready for a scoring request
    Loaded,
    /// Scored table with explanation columns in hand
    Scored,
    /// Reshaped output produced
    Processed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Loaded => write!(f, "loaded"),
            Self::Scored => write!(f, "scored"),
            Self::Processed => write!(f, "processed"),
        }
    }
}

/// Thin orchestrator sequencing load → request scoring → process.
///
/// Each step checks the stage it needs and fails with
/// [`PipelineError::Stage`] when called out of order, so a caller that
/// forgot to load data or request scoring hears about it instead of
/// reshaping the wrong table.
pub struct ExplanationPipeline {
    client: Option<ScoringClient>,
    table: Option<TableData>,
    stage: PipelineStage,
    max_explanations: u32,
    id_column: Option<String>,
}

impl ExplanationPipeline {
    /// Create an empty pipeline with no scoring client.
    pub fn new() -> Self {
        Self {
            client: None,
            table: None,
            stage: PipelineStage::Empty,
            max_explanations: 10,
            id_column: None,
        }
    }

    /// Attach a scoring client for [`Self::request_scoring`].
    pub fn with_client(mut self, client: ScoringClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Cap the number of explanation slots requested from the service.
    /// Deployments will not return more than 10.
    pub fn with_max_explanations(mut self, max_explanations: u32) -> Self {
        self.max_explanations = max_explanations;
        self
    }

    /// Designate an original-row identifier column for melted output.
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Current stage.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// The table currently held, if any.
    pub fn table(&self) -> Option<&TableData> {
        self.table.as_ref()
    }

    /// Load unscored data from a CSV file.
    pub fn load_csv(&mut self, path: &Path) -> PipelineResult<()> {
        let parsed = parse_csv_file_auto(path)?;
        self.table = Some(parsed.into_table());
        self.stage = PipelineStage::Loaded;
        Ok(())
    }

    /// Load unscored in-memory rows.
    pub fn load_records(&mut self, headers: Vec<String>, records: Vec<Value>) {
        self.table = Some(TableData::new(headers, records));
        self.stage = PipelineStage::Loaded;
    }

    /// Load a table that already carries explanation columns, skipping the
    /// scoring request.
    pub fn load_scored_records(&mut self, headers: Vec<String>, records: Vec<Value>) {
        self.table = Some(TableData::new(headers, records));
        self.stage = PipelineStage::Scored;
    }

    /// Load an already-scored CSV file.
    pub fn load_scored_csv(&mut self, path: &Path) -> PipelineResult<()> {
        let parsed = parse_csv_file_auto(path)?;
        self.table = Some(parsed.into_table());
        self.stage = PipelineStage::Scored;
        Ok(())
    }

    /// Submit the loaded table to a deployment and replace it with the
    /// scored result.
    pub async fn request_scoring(&mut self, deployment_id: &str) -> PipelineResult<()> {
        let table = self.table_at(PipelineStage::Loaded)?;
        let csv = records_to_csv(table, ',')?;
        let client = self.client.as_ref().ok_or(PipelineError::NoClient)?;

        log_info(format!("📡 Scoring against deployment {}...", deployment_id));
        let scored = client
            .score_csv(deployment_id, csv.as_bytes(), self.max_explanations)
            .await?;
        let parsed = parse_bytes_auto(&scored)?;
        log_success(format!("Received {} scored rows", parsed.records.len()));

        self.table = Some(parsed.into_table());
        self.stage = PipelineStage::Scored;
        Ok(())
    }

    /// Reshape the scored table into the flat form.
    pub fn flatten(&mut self) -> PipelineResult<TableData> {
        let table = self.table_at(PipelineStage::Scored)?;

        let classification = classify_columns(table);
        let flat = to_flat(table, &classification)?;
        self.stage = PipelineStage::Processed;
        Ok(flat)
    }

    /// Reshape the scored table into the melted form.
    pub fn melt(&mut self) -> PipelineResult<Vec<MeltedRecord>> {
        let table = self.table_at(PipelineStage::Scored)?;

        let classification = classify_columns(table);
        let melted = to_melted(table, &classification, self.id_column.as_deref())?;
        self.stage = PipelineStage::Processed;
        Ok(melted)
    }

    /// The held table, provided the pipeline is at `expected`.
    fn table_at(&self, expected: PipelineStage) -> Result<&TableData, PipelineError> {
        if self.stage != expected {
            return Err(PipelineError::Stage {
                expected,
                found: self.stage,
            });
        }
        self.table.as_ref().ok_or(PipelineError::Stage {
            expected,
            found: PipelineStage::Empty,
        })
    }
}

impl Default for ExplanationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scored_headers() -> Vec<String> {
        vec![
            "id".into(),
            "EXPLANATION_0_FEATURE_NAME".into(),
            "EXPLANATION_0_STRENGTH".into(),
            "EXPLANATION_1_FEATURE_NAME".into(),
            "EXPLANATION_1_STRENGTH".into(),
        ]
    }

    fn scored_records() -> Vec<Value> {
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
        ]
    }

    #[test]
    fn test_default_options() {
        let opts = ProcessOptions::default();
        assert_eq!(opts.shape, OutputShape::Both);
        assert!(opts.id_column.is_none());
        assert!(!opts.skip_validation);
    }

    #[test]
    fn test_process_records_both_shapes() {
        let result = process_records(
            scored_records(),
            scored_headers(),
            ProcessOptions::default(),
        )
        .unwrap();

        let flat = result.flat.unwrap();
        assert_eq!(
            flat.headers,
            vec![
                "id",
                "age_EXPLANATION_STRENGTH",
                "income_EXPLANATION_STRENGTH"
            ]
        );
        assert_eq!(result.melted.unwrap().len(), 3);
        assert_eq!(result.summary.populated_slots, vec![0, 1]);
        assert_eq!(result.summary.features, vec!["age", "income"]);
        assert_eq!(result.summary.explanation_column_count, 4);
        assert_eq!(result.invalid_count, 0);
        // 2 flat rows + 3 melted records validated.
        assert_eq!(result.valid_count, 5);
    }

    #[test]
    fn test_process_records_flat_only() {
        let options = ProcessOptions {
            shape: OutputShape::Flat,
            ..Default::default()
        };
        let result = process_records(scored_records(), scored_headers(), options).unwrap();
        assert!(result.flat.is_some());
        assert!(result.melted.is_none());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let result = process_records(vec![], scored_headers(), ProcessOptions::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn test_process_csv_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "id,EXPLANATION_0_FEATURE_NAME,EXPLANATION_0_STRENGTH"
        )
        .unwrap();
        writeln!(file, "a,age,0.5").unwrap();
        writeln!(file, "b,,").unwrap();

        let result = process_csv(file.path(), ProcessOptions::default()).unwrap();
        assert_eq!(result.csv_info.row_count, 2);
        assert_eq!(result.summary.features, vec!["age"]);
        assert_eq!(result.melted.unwrap().len(), 1);
    }

    #[test]
    fn test_pipeline_stage_guards() {
        let mut pipeline = ExplanationPipeline::new();
        assert_eq!(pipeline.stage(), PipelineStage::Empty);

        // Reshaping before anything is loaded is a stage error.
        let err = pipeline.flatten().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Stage {
                expected: PipelineStage::Scored,
                found: PipelineStage::Empty,
            }
        ));

        // Loaded (unscored) data cannot be reshaped either.
        pipeline.load_records(vec!["id".into()], vec![json!({"id": "a"})]);
        assert_eq!(pipeline.stage(), PipelineStage::Loaded);
        assert!(pipeline.melt().is_err());
    }

    #[test]
    fn test_pipeline_scored_flow() {
        let mut pipeline = ExplanationPipeline::new().with_id_column("id");
        pipeline.load_scored_records(scored_headers(), scored_records());
        assert_eq!(pipeline.stage(), PipelineStage::Scored);

        let melted = pipeline.melt().unwrap();
        assert_eq!(melted.len(), 3);
        assert_eq!(melted[0].orig_row_num, json!("a"));
        assert_eq!(pipeline.stage(), PipelineStage::Processed);

        // A second reshape needs a fresh scored table.
        assert!(pipeline.flatten().is_err());
    }

    #[test]
    fn test_pipeline_scoring_without_client() {
        let mut pipeline = ExplanationPipeline::new();
        pipeline.load_records(vec!["id".into()], vec![json!({"id": "a"})]);

        let err = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(pipeline.request_scoring("dep-1"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoClient));
    }

    #[test]
    fn test_skip_validation_counts_rows() {
        let options = ProcessOptions {
            skip_validation: true,
            ..Default::default()
        };
        let result = process_records(scored_records(), scored_headers(), options).unwrap();
        assert_eq!(result.valid_count, 5);
        assert_eq!(result.invalid_count, 0);
        assert!(result.validation_errors.is_empty());
    }
}
