use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::uploads::{UploadCreateDBRequest, UploadDBResponse},
};
use crate::types::UploadId;
use sqlx::PgConnection;

/// Filter for listing upload batches. Results are always newest first.
#[derive(Debug, Clone, Default)]
pub struct UploadFilter {
    pub limit: Option<i64>,
}

impl UploadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub struct Uploads<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Uploads<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Delete several batches at once; their equipment records go with them via cascade.
    /// Returns the number of batches removed.
    pub async fn delete_many(&mut self, ids: &[UploadId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM uploads WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Uploads<'c> {
    type CreateRequest = UploadCreateDBRequest;
    type Response = UploadDBResponse;
    type Id = UploadId;
    type Filter = UploadFilter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let upload = sqlx::query_as::<_, UploadDBResponse>(
            r#"
            INSERT INTO uploads (file_name)
            VALUES ($1)
            RETURNING id, file_name, uploaded_at
            "#,
        )
        .bind(&request.file_name)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(upload)
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let upload = sqlx::query_as::<_, UploadDBResponse>("SELECT id, file_name, uploaded_at FROM uploads WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(upload)
    }

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = sqlx::QueryBuilder::new("SELECT id, file_name, uploaded_at FROM uploads");

        // id breaks ties between batches created in the same instant
        query.push(" ORDER BY uploaded_at DESC, id DESC");

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ");
            query.push_bind(limit);
        }

        let uploads = query.build_query_as::<UploadDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(uploads)
    }

    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM uploads WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
