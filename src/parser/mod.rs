//! CSV to JSON-row parser with encoding and delimiter auto-detection.
//!
//! Scoring exports arrive as CSV in whatever encoding the exporting system
//! used. This module detects the encoding and delimiter, decodes the bytes,
//! and parses rows into JSON objects keyed by header. Empty cells become
//! JSON `null` so downstream code can distinguish an absent explanation slot
//! from a present value.
//!
//! [`records_to_csv`] goes the other way: it renders a table back to CSV for
//! submission to the scoring service.

use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;

use crate::models::TableData;

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.column {
            Some(col) => write!(f, "Line {}, column '{}': {}", self.line, col, self.message),
            None => write!(f, "Line {}: {}", self.line, self.message),
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records as JSON objects
    pub records: Vec<Value>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

impl ParseResult {
    /// View the parsed rows as a table.
    pub fn into_table(self) -> TableData {
        TableData::new(self.headers, self.records)
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string()),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        // Fallback: UTF-8 with lossy conversion
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV from a reader into JSON objects with explicit delimiter.
///
/// Each row becomes a JSON object where keys are column headers. Empty cells
/// become `null`; short rows are padded with `null`, extra cells ignored.
pub fn parse_csv<R: Read>(reader: R, delimiter: char) -> Result<Vec<Value>, CsvError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| CsvError::new(1, format!("Cannot read header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(CsvError::new(1, "Empty CSV file"));
    }

    let mut rows = Vec::new();

    for (record_idx, result) in rdr.records().enumerate() {
        let line_num = record_idx + 2; // +1 for 0-index, +1 for header

        let record =
            result.map_err(|e| CsvError::new(line_num, format!("Cannot read line: {}", e)))?;

        if record.iter().all(|v| v.is_empty()) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let cell = record.get(i).unwrap_or("");
            let value = if cell.is_empty() {
                Value::Null
            } else {
                Value::String(cell.to_string())
            };
            obj.insert(header.clone(), value);
        }

        rows.push(Value::Object(obj));
    }

    Ok(rows)
}

/// Parse a CSV string with explicit delimiter.
pub fn csv_to_json(csv: &str, delimiter: char) -> Result<Vec<Value>, CsvError> {
    parse_csv(csv.as_bytes(), delimiter)
}

/// Parse CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("/path/to/scored.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Records: {}", result.records.len());
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> Result<ParseResult, CsvError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| CsvError::new(0, format!("Cannot read file: {}", e)))?;

    parse_bytes_auto(&bytes)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<ParseResult, CsvError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse CSV string with explicit delimiter and return metadata.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> Result<ParseResult, CsvError> {
    let header_line = content
        .lines()
        .next()
        .ok_or_else(|| CsvError::new(1, "Empty CSV file"))?;

    if header_line.trim().is_empty() {
        return Err(CsvError::new(1, "No headers found"));
    }

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(Trim::All)
        .from_reader(header_line.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| CsvError::new(1, format!("Cannot read header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let records = parse_csv(content.as_bytes(), delimiter)?;

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
    })
}

/// Render a table back to CSV, for scoring submission.
///
/// Null and missing cells become empty fields; everything else is rendered
/// as its plain text form (strings unquoted unless the delimiter forces
/// quoting).
pub fn records_to_csv(table: &TableData, delimiter: char) -> Result<String, CsvError> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_writer(Vec::new());

    wtr.write_record(&table.headers)
        .map_err(|e| CsvError::new(1, format!("Cannot write header: {}", e)))?;

    for (row_idx, row) in table.records.iter().enumerate() {
        let fields: Vec<String> = table
            .headers
            .iter()
            .map(|h| match row.get(h) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        wtr.write_record(&fields)
            .map_err(|e| CsvError::new(row_idx + 2, format!("Cannot write row: {}", e)))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| CsvError::new(0, format!("Cannot flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| CsvError::new(0, format!("Invalid UTF-8: {}", e)))
}
