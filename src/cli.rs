use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Explore spreadsheet-derived financial datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest a spreadsheet upload into the dataset store
    Ingest(IngestArgs),
    /// List stored datasets
    Datasets(DatasetsArgs),
    /// Update a stored dataset's metadata
    Update(UpdateArgs),
    /// Delete a stored dataset
    Delete(DeleteArgs),
    /// Preview the first rows of one stored dataset
    Preview(PreviewArgs),
    /// Infer and print the filter configuration for the accumulated rows
    Probe(ProbeArgs),
    /// Filter, sort, and paginate the accumulated rows
    View(ViewArgs),
    /// Insert built-in sample datasets into an empty store
    Seed(SeedArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Spreadsheet file to ingest (.xlsx, .xls, or .csv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Dataset store file
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Human-readable dataset name
    #[arg(short = 'n', long = "name")]
    pub name: String,
    /// Free-text dataset description
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    /// Mark the dataset as premium content
    #[arg(long)]
    pub premium: bool,
    /// Company the report belongs to
    #[arg(long)]
    pub company: Option<String>,
    /// Reporting period, e.g. "Q1 2024"
    #[arg(long)]
    pub period: Option<String>,
    /// Fiscal year of the report
    #[arg(long = "fiscal-year")]
    pub fiscal_year: Option<i64>,
    /// Uploading user's identifier
    #[arg(long = "uploaded-by", default_value_t = 1)]
    pub uploaded_by: u64,
    /// Character encoding for CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct DatasetsArgs {
    /// Dataset store file
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Page number to list (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Records per page
    #[arg(long = "page-size", default_value_t = 100)]
    pub page_size: usize,
    /// Field to order by: upload_date, dataset_name, file_size, id
    #[arg(long = "order-by", default_value = "upload_date")]
    pub order_by: String,
    /// Sort ascending instead of the default descending
    #[arg(long)]
    pub asc: bool,
    /// Show premium datasets only
    #[arg(long = "premium-only")]
    pub premium_only: bool,
    /// Restrict to records with this processing status
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Dataset store file
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Dataset id to update
    #[arg(long)]
    pub id: u64,
    /// New dataset name
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,
    /// New description
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    /// New premium flag
    #[arg(long)]
    pub premium: Option<bool>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Dataset store file
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Dataset id to delete
    #[arg(long)]
    pub id: u64,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Dataset store file
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Dataset id to preview
    #[arg(long)]
    pub id: u64,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Dataset store file
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Restrict to one dataset instead of the full accumulated set
    #[arg(long)]
    pub id: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Dataset store file
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Restrict to one dataset instead of the full accumulated set
    #[arg(long)]
    pub id: Option<u64>,
    /// Substring filter for a text column, as `column=needle`
    #[arg(long = "text", action = clap::ArgAction::Append)]
    pub text: Vec<String>,
    /// Bounds filter for a range column, as `column=low,high` in the
    /// column's display units (percent for normalized columns)
    #[arg(long = "range", action = clap::ArgAction::Append)]
    pub range: Vec<String>,
    /// Membership filter for a select column, as `column=a|b|c`
    #[arg(long = "select", action = clap::ArgAction::Append)]
    pub select: Vec<String>,
    /// Sort directive of the form `column[:asc|desc]`
    #[arg(long)]
    pub sort: Option<String>,
    /// Page to display (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page (10, 25, 50, or 100)
    #[arg(long = "page-size", default_value_t = 25, value_parser = parse_page_size)]
    pub page_size: usize,
    /// Show provenance columns alongside data columns
    #[arg(long = "show-provenance")]
    pub show_provenance: bool,
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Dataset store file
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
}

pub fn parse_page_size(value: &str) -> Result<usize, String> {
    let parsed: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if crate::view::PAGE_SIZES.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!(
            "page size must be one of {:?}",
            crate::view::PAGE_SIZES
        ))
    }
}
