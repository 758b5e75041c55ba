//! Spreadsheet ingestion: upload validation, first-sheet parsing, and
//! provenance attachment.
//!
//! Validation happens before any parse attempt: the extension must be on the
//! allow-list and the file must stay under the size ceiling. Parsing treats
//! the first row of the first sheet as the header and every later row as a
//! record keyed by those headers. A workbook with no sheets, or a sheet with
//! no data rows, is a parse failure; the caller must not persist anything
//! for it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Reader};
use chrono::Utc;
use encoding_rs::{Encoding, UTF_8};
use log::info;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    cli::IngestArgs,
    data::{
        COL_COMPANY_NAME, COL_DATASET_NAME, COL_FISCAL_YEAR, COL_REPORT_PERIOD, COL_ROW_SEQ,
        COL_SOURCE_FILE, COL_UPLOAD_ID, Cell, Row,
    },
    store::{DatasetStore, JsonStore, NewDataset, STATUS_PROCESSED},
};

/// Upload size ceiling in bytes.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Accepted upload extensions, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

#[derive(Debug, Error)]
pub enum IngestError {
    /// The file was rejected before any parse attempt.
    #[error("invalid upload: {reason}")]
    Validation { reason: String },
    /// The workbook was unreadable or yielded zero data rows.
    #[error("unreadable spreadsheet: {reason}")]
    Parse { reason: String },
}

impl IngestError {
    fn validation(reason: impl Into<String>) -> Self {
        IngestError::Validation {
            reason: reason.into(),
        }
    }

    fn parse(reason: impl Into<String>) -> Self {
        IngestError::Parse {
            reason: reason.into(),
        }
    }
}

/// Provenance recorded on every ingested row under the `_` prefix.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_file: String,
    pub dataset_name: String,
    pub upload_id: Uuid,
    pub company_name: Option<String>,
    pub report_period: Option<String>,
    pub fiscal_year: Option<i64>,
}

/// Rejects uploads with a disallowed extension or an oversized payload.
pub fn validate_upload(path: &Path, size: u64) -> Result<(), IngestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(IngestError::validation(format!(
            "unsupported file type '.{extension}'; expected one of .xlsx, .xls, .csv"
        )));
    }
    if size > MAX_FILE_SIZE {
        return Err(IngestError::validation(format!(
            "file size {size} bytes exceeds the {} MB limit",
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Parses the first sheet of a spreadsheet into rows keyed by the header row.
pub fn parse_rows(path: &Path, encoding: &'static Encoding) -> Result<Vec<Row>, IngestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let rows = match extension.as_str() {
        "csv" => parse_csv(path, encoding)?,
        _ => parse_workbook(path)?,
    };
    if rows.is_empty() {
        return Err(IngestError::parse(
            "the spreadsheet is empty or contains no data rows",
        ));
    }
    Ok(rows)
}

fn parse_workbook(path: &Path) -> Result<Vec<Row>, IngestError> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|err| IngestError::parse(format!("failed to open workbook: {err}")))?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::parse("workbook contains no sheets"))?;
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|err| IngestError::parse(format!("failed to read sheet '{first_sheet}': {err}")))?;

    let mut iter = range.rows();
    let Some(header_row) = iter.next() else {
        return Ok(Vec::new());
    };
    let headers = normalize_headers(
        header_row
            .iter()
            .map(|cell| cell_display_header(cell))
            .collect(),
    );

    let mut rows = Vec::new();
    for sheet_row in iter {
        let mut row = Row::new();
        for (idx, cell) in sheet_row.iter().enumerate() {
            let Some(header) = headers.get(idx) else {
                break;
            };
            match convert_cell(cell) {
                // Missing cells keep the key absent, matching schema-less
                // row semantics.
                None => {}
                Some(value) => {
                    row.insert(header.clone(), value);
                }
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn cell_display_header(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn convert_cell(cell: &Data) -> Option<Cell> {
    match cell {
        Data::Empty => None,
        Data::Int(i) => Some(Cell::Number(*i as f64)),
        Data::Float(f) => Some(Cell::Number(*f)),
        Data::Bool(b) => Some(Cell::Bool(*b)),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(Cell::Text(trimmed.to_string()))
            }
        }
        Data::DateTime(dt) => Some(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Cell::Text(s.clone())),
        Data::Error(_) => Some(Cell::Null),
    }
}

fn parse_csv(path: &Path, encoding: &'static Encoding) -> Result<Vec<Row>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|err| IngestError::parse(format!("failed to open CSV: {err}")))?;
    let header_record = reader
        .byte_headers()
        .map_err(|err| IngestError::parse(format!("failed to read CSV header: {err}")))?
        .clone();
    let headers = normalize_headers(
        header_record
            .iter()
            .map(|field| decode_field(field, encoding))
            .collect::<Result<Vec<_>, _>>()?,
    );

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record
            .map_err(|err| IngestError::parse(format!("row {}: {err}", row_idx + 2)))?;
        let mut row = Row::new();
        for (idx, field) in record.iter().enumerate() {
            let Some(header) = headers.get(idx) else {
                break;
            };
            let value = decode_field(field, encoding)?;
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            row.insert(header.clone(), Cell::Text(trimmed.to_string()));
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> Result<String, IngestError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(IngestError::parse(format!(
            "failed to decode text as {}",
            encoding.name()
        )))
    } else {
        Ok(text.into_owned())
    }
}

/// Assigns synthetic names to blank headers and de-duplicates repeats.
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                name
            };
            let count = seen.entry(base.clone()).or_insert(0usize);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base}_{count}")
            }
        })
        .collect()
}

/// Attaches provenance columns to every row, in row order.
pub fn attach_provenance(rows: &mut [Row], provenance: &Provenance) {
    for (seq, row) in rows.iter_mut().enumerate() {
        row.insert(
            COL_SOURCE_FILE.to_string(),
            Cell::Text(provenance.source_file.clone()),
        );
        row.insert(
            COL_DATASET_NAME.to_string(),
            Cell::Text(provenance.dataset_name.clone()),
        );
        row.insert(
            COL_UPLOAD_ID.to_string(),
            Cell::Text(provenance.upload_id.to_string()),
        );
        row.insert(COL_ROW_SEQ.to_string(), Cell::Number((seq + 1) as f64));
        if let Some(company) = &provenance.company_name {
            row.insert(COL_COMPANY_NAME.to_string(), Cell::Text(company.clone()));
        }
        if let Some(period) = &provenance.report_period {
            row.insert(COL_REPORT_PERIOD.to_string(), Cell::Text(period.clone()));
        }
        if let Some(year) = provenance.fiscal_year {
            row.insert(COL_FISCAL_YEAR.to_string(), Cell::Number(year as f64));
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow::anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Handles the `ingest` command: validate, parse, attach provenance, persist.
pub fn execute(args: &IngestArgs) -> Result<()> {
    let metadata = fs::metadata(&args.input)
        .with_context(|| format!("Reading file metadata for {:?}", args.input))?;
    validate_upload(&args.input, metadata.len())?;

    let encoding = resolve_encoding(args.input_encoding.as_deref())?;
    let mut rows = parse_rows(&args.input, encoding)?;

    let provenance = Provenance {
        source_file: args
            .input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.input.display().to_string()),
        dataset_name: args.name.trim().to_string(),
        upload_id: Uuid::new_v4(),
        company_name: args.company.clone(),
        report_period: args.period.clone(),
        fiscal_year: args.fiscal_year,
    };
    attach_provenance(&mut rows, &provenance);

    let file_data = serde_json::to_string(&rows).context("Serializing parsed rows")?;
    let mut store = JsonStore::open(&args.store)
        .with_context(|| format!("Opening dataset store {:?}", args.store))?;
    let record = NewDataset {
        filename: provenance.source_file.clone(),
        dataset_name: provenance.dataset_name.clone(),
        description: args.description.clone().unwrap_or_default(),
        is_premium: args.premium,
        upload_date: Utc::now(),
        file_size: metadata.len(),
        file_data,
        uploaded_by: args.uploaded_by,
        status: STATUS_PROCESSED.to_string(),
        company_name: provenance.company_name.clone(),
        report_period: provenance.report_period.clone(),
        fiscal_year: provenance.fiscal_year,
    };
    let id = store
        .create(record)
        .with_context(|| format!("Persisting dataset '{}'", provenance.dataset_name))?;

    info!(
        "Ingested '{}' as dataset {} ('{}', {} row(s), {} bytes)",
        args.input.display(),
        id,
        provenance.dataset_name,
        rows.len(),
        metadata.len()
    );
    println!(
        "Created dataset {id}: '{}' with {} row(s)",
        provenance.dataset_name,
        rows.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn validation_rejects_disallowed_extension() {
        let err = validate_upload(&PathBuf::from("report.pdf"), 1024).unwrap_err();
        assert!(matches!(err, IngestError::Validation { .. }));
        assert!(err.to_string().contains(".pdf"));
    }

    #[test]
    fn validation_rejects_oversized_file() {
        let err = validate_upload(&PathBuf::from("big.xlsx"), MAX_FILE_SIZE + 1).unwrap_err();
        assert!(matches!(err, IngestError::Validation { .. }));
        assert!(err.to_string().contains("10 MB"));
    }

    #[test]
    fn validation_accepts_allowed_extensions_case_insensitively() {
        for name in ["a.xlsx", "b.XLS", "c.Csv"] {
            validate_upload(&PathBuf::from(name), 512).expect("accepted");
        }
    }

    #[test]
    fn headers_get_synthetic_names_and_dedup() {
        let headers = normalize_headers(vec![
            "Revenue".to_string(),
            String::new(),
            "Revenue".to_string(),
        ]);
        assert_eq!(headers, vec!["Revenue", "column_2", "Revenue_2"]);
    }

    #[test]
    fn provenance_is_attached_with_sequence_numbers() {
        let mut rows = vec![Row::new(), Row::new()];
        rows[0].insert("Revenue".to_string(), Cell::from(5.0));
        rows[1].insert("Revenue".to_string(), Cell::from(6.0));
        let provenance = Provenance {
            source_file: "q1.xlsx".to_string(),
            dataset_name: "Q1".to_string(),
            upload_id: Uuid::new_v4(),
            company_name: Some("TechCorp".to_string()),
            report_period: None,
            fiscal_year: Some(2024),
        };

        attach_provenance(&mut rows, &provenance);

        assert_eq!(rows[0][COL_ROW_SEQ], Cell::Number(1.0));
        assert_eq!(rows[1][COL_ROW_SEQ], Cell::Number(2.0));
        assert_eq!(rows[0][COL_SOURCE_FILE], Cell::Text("q1.xlsx".into()));
        assert_eq!(rows[0][COL_COMPANY_NAME], Cell::Text("TechCorp".into()));
        assert_eq!(rows[0][COL_FISCAL_YEAR], Cell::Number(2024.0));
        assert!(!rows[0].contains_key(COL_REPORT_PERIOD));
    }
}
