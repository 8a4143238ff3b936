use crate::db::{errors::Result, models::equipment::EquipmentRecordDBResponse};
use crate::ingest::EquipmentReading;
use crate::types::UploadId;
use sqlx::{PgConnection, Postgres, QueryBuilder};

/// Default number of rows per multi-row INSERT
pub const DEFAULT_INSERT_CHUNK: usize = 5000;

/// Filter for listing equipment records.
///
/// Without an upload, records from every retained batch are returned. Ordering is always
/// upload first, then position within the upload.
#[derive(Debug, Clone, Default)]
pub struct EquipmentFilter {
    pub upload_id: Option<UploadId>,
    pub limit: Option<i64>,
}

impl EquipmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(mut self, upload_id: UploadId) -> Self {
        self.upload_id = Some(upload_id);
        self
    }

    pub fn maybe_upload(mut self, upload_id: Option<UploadId>) -> Self {
        self.upload_id = upload_id;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &EquipmentFilter) {
    if let Some(upload_id) = filter.upload_id {
        query.push(" WHERE upload_id = ");
        query.push_bind(upload_id);
    }
}

pub struct EquipmentRecords<'c> {
    db: &'c mut PgConnection,
}

impl<'c> EquipmentRecords<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Bulk insert readings for an upload, `chunk_size` rows per statement.
    /// Returns the number of rows written.
    pub async fn insert_many(&mut self, upload_id: UploadId, readings: &[EquipmentReading], chunk_size: usize) -> Result<u64> {
        let mut inserted = 0;

        for chunk in readings.chunks(chunk_size.max(1)) {
            let mut query = QueryBuilder::<Postgres>::new(
                "INSERT INTO equipment_records (upload_id, position, equipment_name, equipment_type, flowrate, pressure, temperature) ",
            );
            query.push_values(chunk, |mut row, reading| {
                row.push_bind(upload_id)
                    .push_bind(reading.position)
                    .push_bind(&reading.equipment_name)
                    .push_bind(&reading.equipment_type)
                    .push_bind(reading.flowrate)
                    .push_bind(reading.pressure)
                    .push_bind(reading.temperature);
            });

            let result = query.build().execute(&mut *self.db).await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// List records in stored order
    pub async fn list(&mut self, filter: &EquipmentFilter) -> Result<Vec<EquipmentRecordDBResponse>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, upload_id, position, equipment_name, equipment_type, flowrate, pressure, temperature FROM equipment_records",
        );
        push_filter(&mut query, filter);
        query.push(" ORDER BY upload_id ASC, position ASC");

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ");
            query.push_bind(limit);
        }

        let records = query
            .build_query_as::<EquipmentRecordDBResponse>()
            .fetch_all(&mut *self.db)
            .await?;

        Ok(records)
    }

    pub async fn count(&mut self, filter: &EquipmentFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM equipment_records");
        push_filter(&mut query, filter);

        let count = query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?;

        Ok(count)
    }
}
