//! Dataset collection handlers: list, update, delete, preview.
//!
//! These are the administrative operations around stored uploads. Every
//! handler re-fetches from the store after a successful mutation instead of
//! patching in-memory state.

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use log::info;

use crate::{
    cli::{DatasetsArgs, DeleteArgs, PreviewArgs, UpdateArgs},
    data::Row,
    schema::visible_columns,
    store::{DatasetStore, JsonStore, ListQuery, OrderField, StoredDataset},
    table,
};

/// Loads and merges the row sets of the selected datasets, re-parsing each
/// record's serialized payload. Store list order is preserved.
pub fn load_accumulated_rows(
    store: &dyn DatasetStore,
    id: Option<u64>,
) -> Result<Vec<Row>> {
    let records: Vec<StoredDataset> = match id {
        Some(id) => vec![store.get(id).with_context(|| format!("Loading dataset {id}"))?],
        None => store
            .list(&ListQuery::default())
            .context("Listing datasets")?,
    };
    let mut rows = Vec::new();
    for record in &records {
        let mut parsed = record
            .rows()
            .with_context(|| format!("Re-parsing rows of dataset {}", record.id))?;
        rows.append(&mut parsed);
    }
    Ok(rows)
}

pub fn execute_list(args: &DatasetsArgs) -> Result<()> {
    let store = JsonStore::open(&args.store)
        .with_context(|| format!("Opening dataset store {:?}", args.store))?;
    let order_by = OrderField::parse(&args.order_by)
        .ok_or_else(|| anyhow!("Unknown order field '{}'", args.order_by))?;
    let query = ListQuery {
        page: args.page,
        page_size: args.page_size,
        order_by,
        ascending: args.asc,
        premium_only: args.premium_only,
        status: args.status.clone(),
    };
    let records = store.list(&query).context("Listing datasets")?;

    if records.is_empty() {
        println!("No datasets stored yet.");
        return Ok(());
    }

    let headers = vec![
        "id".to_string(),
        "dataset".to_string(),
        "filename".to_string(),
        "size".to_string(),
        "uploaded".to_string(),
        "tier".to_string(),
        "status".to_string(),
        "records".to_string(),
    ];
    let rows = records
        .iter()
        .map(|record| {
            vec![
                record.id.to_string(),
                record.dataset_name.clone(),
                record.filename.clone(),
                format_file_size(record.file_size),
                record.upload_date.format("%Y-%m-%d %H:%M").to_string(),
                if record.is_premium {
                    "premium".to_string()
                } else {
                    "standard".to_string()
                },
                record.status.clone(),
                record.record_count().to_string(),
            ]
        })
        .collect_vec();
    table::print_table(&headers, &rows);

    let total_records: usize = records.iter().map(StoredDataset::record_count).sum();
    info!(
        "Listed {} dataset(s) with {} total row(s)",
        records.len(),
        total_records
    );
    Ok(())
}

pub fn execute_update(args: &UpdateArgs) -> Result<()> {
    let mut store = JsonStore::open(&args.store)
        .with_context(|| format!("Opening dataset store {:?}", args.store))?;
    let mut record = store
        .get(args.id)
        .with_context(|| format!("Loading dataset {}", args.id))?;

    if let Some(name) = &args.name {
        record.dataset_name = name.trim().to_string();
    }
    if let Some(description) = &args.description {
        record.description = description.clone();
    }
    if let Some(premium) = args.premium {
        record.is_premium = premium;
    }

    store
        .update(record)
        .with_context(|| format!("Updating dataset {}", args.id))?;
    info!("Updated dataset {}", args.id);
    println!("Updated dataset {}", args.id);
    Ok(())
}

pub fn execute_delete(args: &DeleteArgs) -> Result<()> {
    let mut store = JsonStore::open(&args.store)
        .with_context(|| format!("Opening dataset store {:?}", args.store))?;
    store
        .delete(args.id)
        .with_context(|| format!("Deleting dataset {}", args.id))?;
    info!("Deleted dataset {}", args.id);
    println!("Deleted dataset {}", args.id);
    Ok(())
}

pub fn execute_preview(args: &PreviewArgs) -> Result<()> {
    let store = JsonStore::open(&args.store)
        .with_context(|| format!("Opening dataset store {:?}", args.store))?;
    let record = store
        .get(args.id)
        .with_context(|| format!("Loading dataset {}", args.id))?;
    let rows = record
        .rows()
        .with_context(|| format!("Re-parsing rows of dataset {}", record.id))?;

    println!(
        "{} ({}, {} row(s))",
        record.dataset_name,
        record.filename,
        rows.len()
    );
    let columns = visible_columns(&rows);
    let preview: Vec<Vec<String>> = rows
        .iter()
        .take(args.rows)
        .map(|row| {
            columns
                .iter()
                .map(|column| crate::data::cell(row, column).display())
                .collect()
        })
        .collect();
    table::print_table(&columns, &preview);
    info!(
        "Displayed {} of {} row(s) from dataset {}",
        preview.len(),
        rows.len(),
        record.id
    );
    Ok(())
}

/// Humanizes a byte count the way the dashboard did: 1024-based units with
/// two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let scaled = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[exponent])
    } else {
        format!("{rounded} {}", UNITS[exponent])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_humanize_with_binary_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(156_780), "153.11 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }
}
