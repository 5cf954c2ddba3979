//! Predexplain CLI - reshape prediction-explanation exports
//!
//! # Main Commands
//!
//! ```bash
//! predexplain flat scored.csv          # One column per feature
//! predexplain melt scored.csv          # One row per observation × feature
//! predexplain score input.csv -d ID    # Score remotely, then reshape
//! predexplain serve                    # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! predexplain parse scored.csv         # Just parse CSV to JSON
//! predexplain classify scored.csv      # Show explanation columns and slots
//! predexplain validate out.json --shape melted
//! ```

use clap::{Parser, Subcommand};
use predexplain::{
    classify_columns, parse_csv_file_auto, process_csv, records_to_csv, validate_flat_row,
    validate_melted_record, ExplanationPipeline, MeltedRecord, OutputShape, ProcessOptions,
    ScoringClient, TableData,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "predexplain")]
#[command(about = "Reshape prediction-explanation scoring exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a scored CSV file and output JSON rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show explanation columns and populated slots for a scored CSV
    Classify {
        /// Input CSV file
        input: PathBuf,
    },

    /// Reshape to flat form: one column per feature
    Flat {
        /// Input CSV file (already scored)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write CSV instead of JSON
        #[arg(long)]
        csv: bool,

        /// Skip output validation
        #[arg(long)]
        no_validate: bool,
    },

    /// Reshape to melted form: one row per observation × feature
    Melt {
        /// Input CSV file (already scored)
        input: PathBuf,

        /// Column holding an original-row identifier (default: row position)
        #[arg(short = 'i', long)]
        id_column: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write CSV instead of JSON
        #[arg(long)]
        csv: bool,

        /// Skip output validation
        #[arg(long)]
        no_validate: bool,
    },

    /// Score a CSV against a remote deployment, then reshape
    Score {
        /// Input CSV file (unscored)
        input: PathBuf,

        /// Deployment ID to score against
        #[arg(short = 'd', long)]
        deployment: String,

        /// Output shape: flat or melted
        #[arg(short, long, default_value = "flat")]
        shape: String,

        /// Column holding an original-row identifier (melted output)
        #[arg(short = 'i', long)]
        id_column: Option<String>,

        /// Maximum explanation slots to request (deployments cap at 10)
        #[arg(long, default_value = "10")]
        max_explanations: u32,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },

    /// Validate reshaped JSON records against the output schema
    Validate {
        /// Input JSON file (array of records)
        input: PathBuf,

        /// Which schema: flat or melted
        #[arg(short, long, default_value = "melted")]
        shape: String,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Classify { input } => cmd_classify(&input),

        Commands::Flat {
            input,
            output,
            csv,
            no_validate,
        } => cmd_reshape(
            &input,
            OutputShape::Flat,
            None,
            output.as_deref(),
            csv,
            no_validate,
        ),

        Commands::Melt {
            input,
            id_column,
            output,
            csv,
            no_validate,
        } => cmd_reshape(
            &input,
            OutputShape::Melted,
            id_column,
            output.as_deref(),
            csv,
            no_validate,
        ),

        Commands::Score {
            input,
            deployment,
            shape,
            id_column,
            max_explanations,
            output,
            csv,
        } => {
            cmd_score(
                &input,
                &deployment,
                &shape,
                id_column,
                max_explanations,
                output.as_deref(),
                csv,
            )
            .await
        }

        Commands::Validate { input, shape } => cmd_validate(&input, &shape),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = match delimiter {
        Some(d) => {
            let bytes = fs::read(input)?;
            let encoding = predexplain::detect_encoding(&bytes);
            let content = predexplain::parser::decode_content(&bytes, &encoding);
            predexplain::parser::parse_string_with_metadata(&content, d, encoding)?
        }
        None => parse_csv_file_auto(input)?,
    };

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        match result.delimiter {
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        },
        if delimiter.is_none() {
            " (auto-detected)"
        } else {
            ""
        }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_classify(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔎 Classifying: {}", input.display());

    let table = parse_csv_file_auto(input)?.into_table();
    let classification = classify_columns(&table);

    eprintln!("   Rows: {}", table.row_count());
    eprintln!(
        "   Explanation columns ({}):",
        classification.explanation_columns.len()
    );
    for col in &classification.explanation_columns {
        eprintln!("     - {}", col);
    }
    eprintln!("   Populated slots: {:?}", classification.populated_slots);

    if !classification.has_explanations() {
        eprintln!("⚠️  No populated explanation slots found");
    }

    Ok(())
}

fn cmd_reshape(
    input: &Path,
    shape: OutputShape,
    id_column: Option<String>,
    output: Option<&Path>,
    as_csv: bool,
    no_validate: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let options = ProcessOptions {
        shape,
        id_column,
        skip_validation: no_validate,
    };

    let result = process_csv(input, options)?;

    eprintln!("   Rows: {}", result.csv_info.row_count);
    eprintln!(
        "   Populated slots: {:?}",
        result.summary.populated_slots
    );
    eprintln!("   Features: {}", result.summary.features.join(", "));

    if !no_validate {
        if result.invalid_count > 0 {
            eprintln!("   ✅ Valid: {}", result.valid_count);
            eprintln!("   ❌ Invalid: {}", result.invalid_count);
            for (i, errors) in result.validation_errors.iter().take(5) {
                eprintln!("   Record {}:", i);
                for err in errors.iter().take(3) {
                    eprintln!("     - {}", err);
                }
            }
        } else {
            eprintln!("   ✅ All {} output rows valid", result.valid_count);
        }
    }

    match shape {
        OutputShape::Flat => {
            let flat = result.flat.ok_or("flat output missing from pipeline result")?;
            eprintln!("⚙️  Flat: {} rows × {} columns", flat.records.len(), flat.headers.len());
            let rendered = if as_csv {
                records_to_csv(&flat, ',')?
            } else {
                serde_json::to_string_pretty(&flat.records)?
            };
            write_output(&rendered, output)?;
        }
        OutputShape::Melted | OutputShape::Both => {
            let melted = result
                .melted
                .ok_or("melted output missing from pipeline result")?;
            eprintln!("⚙️  Melted: {} rows", melted.len());
            let rendered = if as_csv {
                records_to_csv(&melted_to_table(&melted)?, ',')?
            } else {
                serde_json::to_string_pretty(&melted)?
            };
            write_output(&rendered, output)?;
        }
    }

    eprintln!("✨ Done!");
    Ok(())
}

async fn cmd_score(
    input: &Path,
    deployment: &str,
    shape: &str,
    id_column: Option<String>,
    max_explanations: u32,
    output: Option<&Path>,
    as_csv: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let shape: OutputShape = shape.parse()?;
    if shape == OutputShape::Both {
        return Err("score outputs one shape per run, use --shape flat or --shape melted".into());
    }

    eprintln!("📄 Scoring: {}", input.display());

    let client = ScoringClient::from_env()?;
    let mut pipeline = ExplanationPipeline::new()
        .with_client(client)
        .with_max_explanations(max_explanations);
    if let Some(col) = id_column {
        pipeline = pipeline.with_id_column(col);
    }

    pipeline.load_csv(input)?;
    eprintln!(
        "   Loaded {} rows",
        pipeline.table().map(|t| t.row_count()).unwrap_or(0)
    );

    pipeline.request_scoring(deployment).await?;
    eprintln!("   ✅ Scored against deployment {}", deployment);

    match shape {
        OutputShape::Flat => {
            let flat = pipeline.flatten()?;
            eprintln!("⚙️  Flat: {} rows × {} columns", flat.records.len(), flat.headers.len());
            let rendered = if as_csv {
                records_to_csv(&flat, ',')?
            } else {
                serde_json::to_string_pretty(&flat.records)?
            };
            write_output(&rendered, output)?;
        }
        _ => {
            let melted = pipeline.melt()?;
            eprintln!("⚙️  Melted: {} rows", melted.len());
            let rendered = if as_csv {
                records_to_csv(&melted_to_table(&melted)?, ',')?
            } else {
                serde_json::to_string_pretty(&melted)?
            };
            write_output(&rendered, output)?;
        }
    }

    eprintln!("✨ Done!");
    Ok(())
}

fn cmd_validate(input: &Path, shape: &str) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let records: Vec<Value> = serde_json::from_str(&content)?;

    let validator: fn(&Value) -> Result<(), Vec<String>> = match shape {
        "flat" => validate_flat_row,
        "melted" | "melt" => validate_melted_record,
        other => return Err(format!("unknown shape '{}', expected flat or melted", other).into()),
    };

    let mut valid = 0;
    let mut invalid = 0;

    for (i, record) in records.iter().enumerate() {
        match validator(record) {
            Ok(()) => valid += 1,
            Err(errors) => {
                invalid += 1;
                if invalid <= 5 {
                    eprintln!("❌ Record {} invalid:", i);
                    for err in errors.iter().take(3) {
                        eprintln!("   - {}", err);
                    }
                }
            }
        }
    }

    eprintln!("📊 Results: {} valid, {} invalid", valid, invalid);

    if invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    predexplain::server::start_server(port).await
}

/// Render melted records as a three-column table for CSV output.
fn melted_to_table(records: &[MeltedRecord]) -> Result<TableData, serde_json::Error> {
    let headers = vec![
        "orig_row_num".to_string(),
        "feature_name".to_string(),
        "feature_strength".to_string(),
    ];
    let rows = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TableData::new(headers, rows))
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
