//! Dataset persistence collaborator.
//!
//! The hosted table API the dashboard talks to is modeled as the
//! [`DatasetStore`] trait: list with pagination/ordering/filters, create,
//! update, delete. [`JsonStore`] is the file-backed implementation used by
//! the CLI and the test suite; it persists the whole collection as pretty
//! JSON the same way schema metadata files are persisted elsewhere in this
//! codebase's lineage.
//!
//! On any store error the caller's in-memory state is left unchanged; the
//! command handlers re-fetch after a successful mutation instead of
//! mutating optimistically.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Row;

pub const STATUS_PROCESSED: &str = "processed";

/// Page size used when a caller does not specify one.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset {0} not found")]
    NotFound(u64),
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data error: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One persisted dataset upload. Created on successful parse + persist,
/// never mutated except by explicit update/delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDataset {
    pub id: u64,
    pub filename: String,
    pub dataset_name: String,
    pub description: String,
    pub is_premium: bool,
    pub upload_date: DateTime<Utc>,
    pub file_size: u64,
    /// JSON-serialized array of row records.
    pub file_data: String,
    pub uploaded_by: u64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<i64>,
}

impl StoredDataset {
    /// Re-parses the serialized rows. The in-memory pipeline always works on
    /// this reconstructed copy, never on live store state.
    pub fn rows(&self) -> Result<Vec<Row>, StoreError> {
        Ok(serde_json::from_str(&self.file_data)?)
    }

    pub fn record_count(&self) -> usize {
        self.rows().map(|rows| rows.len()).unwrap_or(0)
    }
}

/// Payload for `create`; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub filename: String,
    pub dataset_name: String,
    pub description: String,
    pub is_premium: bool,
    pub upload_date: DateTime<Utc>,
    pub file_size: u64,
    pub file_data: String,
    pub uploaded_by: u64,
    pub status: String,
    pub company_name: Option<String>,
    pub report_period: Option<String>,
    pub fiscal_year: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    UploadDate,
    DatasetName,
    FileSize,
    Id,
}

impl OrderField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upload_date" => Some(OrderField::UploadDate),
            "dataset_name" => Some(OrderField::DatasetName),
            "file_size" => Some(OrderField::FileSize),
            "id" => Some(OrderField::Id),
            _ => None,
        }
    }
}

/// List parameters mirroring the hosted table API's page call.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub page: usize,
    pub page_size: usize,
    pub order_by: OrderField,
    pub ascending: bool,
    pub premium_only: bool,
    pub status: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_LIST_PAGE_SIZE,
            order_by: OrderField::UploadDate,
            ascending: false,
            premium_only: false,
            status: None,
        }
    }
}

/// The four operations the pipeline needs from its persistence collaborator.
pub trait DatasetStore {
    fn list(&self, query: &ListQuery) -> Result<Vec<StoredDataset>, StoreError>;
    fn create(&mut self, record: NewDataset) -> Result<u64, StoreError>;
    fn update(&mut self, record: StoredDataset) -> Result<(), StoreError>;
    fn delete(&mut self, id: u64) -> Result<(), StoreError>;

    fn get(&self, id: u64) -> Result<StoredDataset, StoreError> {
        self.list(&ListQuery::default())?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    next_id: u64,
    records: Vec<StoredDataset>,
}

/// File-backed store holding the whole collection in one JSON document.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    document: StoreDocument,
}

impl JsonStore {
    /// Opens an existing store file, or starts an empty collection when the
    /// file does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let document = match File::open(path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreDocument {
                next_id: 1,
                records: Vec::new(),
            },
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn len(&self) -> usize {
        self.document.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.records.is_empty()
    }

    fn save(&self) -> Result<(), StoreError> {
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &self.document)?;
        Ok(())
    }
}

impl DatasetStore for JsonStore {
    fn get(&self, id: u64) -> Result<StoredDataset, StoreError> {
        self.document
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self, query: &ListQuery) -> Result<Vec<StoredDataset>, StoreError> {
        let mut records: Vec<StoredDataset> = self
            .document
            .records
            .iter()
            .filter(|record| !query.premium_only || record.is_premium)
            .filter(|record| {
                query
                    .status
                    .as_deref()
                    .is_none_or(|status| record.status == status)
            })
            .cloned()
            .collect();

        records.sort_by(|a, b| {
            let ordering = match query.order_by {
                OrderField::UploadDate => a.upload_date.cmp(&b.upload_date),
                OrderField::DatasetName => a.dataset_name.cmp(&b.dataset_name),
                OrderField::FileSize => a.file_size.cmp(&b.file_size),
                OrderField::Id => a.id.cmp(&b.id),
            };
            if query.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });

        let page = query.page.max(1);
        let page_size = query.page_size.max(1);
        Ok(records
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect())
    }

    fn create(&mut self, record: NewDataset) -> Result<u64, StoreError> {
        let id = self.document.next_id;
        self.document.next_id += 1;
        self.document.records.push(StoredDataset {
            id,
            filename: record.filename,
            dataset_name: record.dataset_name,
            description: record.description,
            is_premium: record.is_premium,
            upload_date: record.upload_date,
            file_size: record.file_size,
            file_data: record.file_data,
            uploaded_by: record.uploaded_by,
            status: record.status,
            company_name: record.company_name,
            report_period: record.report_period,
            fiscal_year: record.fiscal_year,
        });
        self.save()?;
        Ok(id)
    }

    fn update(&mut self, record: StoredDataset) -> Result<(), StoreError> {
        let slot = self
            .document
            .records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        *slot = record;
        self.save()
    }

    fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        let before = self.document.records.len();
        self.document.records.retain(|record| record.id != id);
        if self.document.records.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.save()
    }
}
