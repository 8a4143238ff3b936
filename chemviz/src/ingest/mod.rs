//! CSV ingestion pipeline.
//!
//! An upload goes through three stages:
//!
//! 1. [`read_table`] decodes the bytes and splits them into a header row and data records
//! 2. [`schema::normalize_headers`] maps the headers onto canonical fields
//! 3. [`materialize::materialize_rows`] produces typed [`EquipmentReading`]s
//!
//! [`parse_upload`] runs all three without touching the database. [`store_upload`] then persists
//! the batch, its records and the retention prune inside a single transaction, so a failure at
//! any point leaves the store exactly as it was.

pub mod materialize;
pub mod schema;

use crate::{
    config::Config,
    db::{
        handlers::{EquipmentRecords, Repository, Uploads},
        models::uploads::{UploadCreateDBRequest, UploadDBResponse},
    },
    errors::Error,
    retention,
    types::{CanonicalField, UploadId},
};
use csv::{ReaderBuilder, StringRecord, Trim};
use sqlx::PgPool;
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument};

pub use materialize::EquipmentReading;

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, ThisError)]
pub enum IngestError {
    #[error("File must be UTF-8 encoded text")]
    Encoding,

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV file contains no data rows")]
    NoRows,

    #[error("CSV file contains too many rows")]
    TooManyRows,

    /// Row numbers count data rows from 1
    #[error("Invalid row number {0}")]
    InvalidRow(usize),

    #[error("Columns '{first}' and '{second}' both map to '{field}'")]
    SchemaConflict {
        field: CanonicalField,
        first: String,
        second: String,
    },

    #[error("Row {row}: {field} value '{value}' is not a number")]
    Materialization {
        row: usize,
        field: CanonicalField,
        value: String,
    },
}

/// Decoded CSV content: the header row plus every data record
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

/// Decode and split raw upload bytes.
///
/// A leading UTF-8 byte order mark is dropped. Rows may have any number of cells; short rows are
/// padded with defaults later and surplus cells are ignored.
pub fn read_table(content: &[u8]) -> Result<Table, IngestError> {
    let text = std::str::from_utf8(content).map_err(|_| IngestError::Encoding)?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;

    Ok(Table { headers, records })
}

/// Run the full parse pipeline over an uploaded file
pub fn parse_upload(content: &[u8]) -> Result<Vec<EquipmentReading>, IngestError> {
    let table = read_table(content)?;
    if table.records.is_empty() {
        return Err(IngestError::NoRows);
    }

    let mapping = schema::normalize_headers(&table.headers)?;
    if !mapping.unmapped().is_empty() {
        debug!(unmapped = ?mapping.unmapped(), "Ignoring unrecognised columns");
    }
    if !mapping.missing().is_empty() {
        debug!(missing = ?mapping.missing(), "Defaulting columns absent from upload");
    }

    materialize::materialize_rows(&table.records, &mapping)
}

/// A persisted upload together with the batches retention evicted to make room for it
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub upload: UploadDBResponse,
    pub record_count: u64,
    pub evicted: Vec<UploadId>,
}

/// Persist a parsed upload, then prune old batches down to the retention limit.
///
/// Everything runs in one transaction: either the new batch is stored and older batches are
/// evicted, or nothing changes. Concurrent calls are serialized on the history lock, so the
/// retention limit holds once each of them commits.
#[instrument(skip(pool, readings, config), fields(rows = readings.len()), err)]
pub async fn store_upload(
    pool: &PgPool,
    file_name: &str,
    readings: &[EquipmentReading],
    config: &Config,
) -> Result<StoredUpload, Error> {
    if readings.is_empty() {
        return Err(IngestError::NoRows.into());
    }

    let mut tx = pool.begin().await.map_err(|e| Error::Database(e.into()))?;
    retention::lock_history(&mut tx).await?;

    let upload = {
        let mut uploads = Uploads::new(&mut tx);
        uploads
            .create(&UploadCreateDBRequest {
                file_name: file_name.to_string(),
            })
            .await?
    };

    let record_count = {
        let mut records = EquipmentRecords::new(&mut tx);
        records
            .insert_many(upload.id, readings, config.uploads.batch_insert_size)
            .await?
    };

    let evicted = retention::prune(&mut tx, config.retention.max_uploads).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(
        upload_id = upload.id,
        records = record_count,
        evicted = evicted.len(),
        "Stored upload"
    );

    Ok(StoredUpload {
        upload,
        record_count,
        evicted,
    })
}
