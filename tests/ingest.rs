mod common;

use common::{TestWorkspace, fixture_path};
use encoding_rs::UTF_8;
use finlens::data::{COL_DATASET_NAME, COL_ROW_SEQ, COL_SOURCE_FILE, Cell};
use finlens::ingest::{
    IngestError, MAX_FILE_SIZE, Provenance, attach_provenance, parse_rows, validate_upload,
};
use finlens::schema::infer_filters;
use uuid::Uuid;

#[test]
fn csv_fixture_parses_into_row_records() {
    let rows = parse_rows(&fixture_path("company_financials.csv"), UTF_8).expect("parse csv");
    assert_eq!(rows.len(), 12);

    let first = &rows[0];
    assert_eq!(first["Company"], Cell::Text("TechCorp".to_string()));
    assert_eq!(
        first["Revenue"].as_number(),
        Some(12_500_000_000.0),
        "numeric text cells expose numbers"
    );
}

#[test]
fn header_only_csv_is_a_parse_error() {
    let err = parse_rows(&fixture_path("header_only.csv"), UTF_8).unwrap_err();
    assert!(matches!(err, IngestError::Parse { .. }));
    assert!(err.to_string().contains("no data rows"));
}

#[test]
fn blank_csv_cells_leave_keys_absent() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "gaps.csv",
        "Company,Revenue\nAlpha,5000000\nBeta,\n,7000000\n",
    );
    let rows = parse_rows(&path, UTF_8).expect("parse");
    assert_eq!(rows.len(), 3);
    assert!(!rows[1].contains_key("Revenue"));
    assert!(!rows[2].contains_key("Company"));
}

#[test]
fn validation_precedes_parsing() {
    let err = validate_upload(&fixture_path("report.pdf"), 100).unwrap_err();
    assert!(matches!(err, IngestError::Validation { .. }));

    let err = validate_upload(&fixture_path("big.csv"), MAX_FILE_SIZE + 1).unwrap_err();
    assert!(matches!(err, IngestError::Validation { .. }));
}

#[test]
fn provenance_columns_stay_out_of_the_inferred_schema() {
    let mut rows = parse_rows(&fixture_path("company_financials.csv"), UTF_8).expect("parse");
    let provenance = Provenance {
        source_file: "company_financials.csv".to_string(),
        dataset_name: "FY2023 corpus".to_string(),
        upload_id: Uuid::new_v4(),
        company_name: None,
        report_period: Some("Annual 2023".to_string()),
        fiscal_year: Some(2023),
    };
    attach_provenance(&mut rows, &provenance);

    assert_eq!(rows[0][COL_SOURCE_FILE], Cell::Text("company_financials.csv".into()));
    assert_eq!(rows[0][COL_DATASET_NAME], Cell::Text("FY2023 corpus".into()));
    assert_eq!(rows[11][COL_ROW_SEQ], Cell::Number(12.0));

    let schema = infer_filters(&rows);
    assert!(schema.filter(COL_SOURCE_FILE).is_none());
    assert!(schema.filter(COL_ROW_SEQ).is_none());
    assert!(schema.filter("Company").is_some());
}
