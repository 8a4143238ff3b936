//! Bounded history: only the most recent upload batches are kept.
//!
//! Recency is `uploaded_at` descending with the id as tie breaker, the same order history
//! listings use.

use crate::db::{
    errors::Result,
    handlers::{Repository, Uploads, uploads::UploadFilter},
    models::uploads::UploadDBResponse,
};
use crate::types::UploadId;
use sqlx::PgConnection;
use std::cmp::Reverse;
use tracing::{info, instrument};

/// Number of upload batches retained when not configured otherwise
pub const DEFAULT_MAX_UPLOADS: usize = 5;

/// Advisory lock key shared by every ingest transaction ("chemviz" in ASCII)
const HISTORY_LOCK_KEY: i64 = 0x0063_6865_6d76_697a;

/// Take the transaction-scoped history lock.
///
/// Must be the first statement of an ingest transaction. Concurrent ingests then see each
/// other's committed batches when they prune, so the retention limit holds across overlapping
/// uploads. Released on commit or rollback.
pub async fn lock_history(conn: &mut PgConnection) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(HISTORY_LOCK_KEY)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Pick the batches to evict so that at most `keep` remain.
///
/// Input order does not matter. The result is oldest-last, matching the order the batches were
/// ranked in.
pub fn select_evictions(batches: &[UploadDBResponse], keep: usize) -> Vec<UploadId> {
    let mut ranked: Vec<&UploadDBResponse> = batches.iter().collect();
    ranked.sort_by_key(|b| Reverse((b.uploaded_at, b.id)));
    ranked.into_iter().skip(keep).map(|b| b.id).collect()
}

/// Delete every batch beyond the newest `keep`, along with its records.
///
/// Meant to run inside the transaction that inserted the newest batch.
#[instrument(skip(conn), err)]
pub async fn prune(conn: &mut PgConnection, keep: usize) -> Result<Vec<UploadId>> {
    let mut uploads = Uploads::new(conn);

    let batches = uploads.list(&UploadFilter::new()).await?;
    let evicted = select_evictions(&batches, keep);

    if !evicted.is_empty() {
        uploads.delete_many(&evicted).await?;
        metrics::counter!("chemviz_uploads_evicted_total").increment(evicted.len() as u64);
        info!(evicted = ?evicted, "Evicted old uploads");
    }

    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use sqlx::PgPool;

    fn batch(id: UploadId, minutes: i64) -> UploadDBResponse {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        UploadDBResponse {
            id,
            file_name: format!("{id}.csv"),
            uploaded_at: base + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_nothing_evicted_at_or_below_limit() {
        let batches: Vec<_> = (1..=5).map(|i| batch(i, i)).collect();
        assert!(select_evictions(&batches, 5).is_empty());
        assert!(select_evictions(&batches[..2], 5).is_empty());
        assert!(select_evictions(&[], 5).is_empty());
    }

    #[test]
    fn test_oldest_evicted_regardless_of_input_order() {
        let batches = vec![batch(3, 30), batch(1, 10), batch(6, 60), batch(2, 20), batch(5, 50), batch(4, 40)];
        assert_eq!(select_evictions(&batches, 5), vec![1]);
        assert_eq!(select_evictions(&batches, 3), vec![3, 2, 1]);
    }

    #[test]
    fn test_keep_zero_evicts_everything() {
        let batches = vec![batch(1, 1), batch(2, 2)];
        assert_eq!(select_evictions(&batches, 0), vec![2, 1]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let batches = vec![batch(7, 0), batch(8, 0), batch(9, 0)];
        assert_eq!(select_evictions(&batches, 2), vec![7]);
    }

    async fn insert_at(pool: &PgPool, file_name: &str, minutes: i64) -> UploadId {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
        sqlx::query_scalar::<_, UploadId>("INSERT INTO uploads (file_name, uploaded_at) VALUES ($1, $2) RETURNING id")
            .bind(file_name)
            .bind(at)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn test_prune_uses_timestamps_not_ids(pool: PgPool) {
        // inserted out of chronological order
        let late = insert_at(&pool, "late.csv", 100).await;
        let early = insert_at(&pool, "early.csv", 1).await;
        let middle = insert_at(&pool, "middle.csv", 50).await;

        let mut tx = pool.begin().await.unwrap();
        let evicted = prune(&mut tx, 2).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(evicted, vec![early]);

        let mut conn = pool.acquire().await.unwrap();
        let remaining: Vec<_> = Uploads::new(&mut conn)
            .list(&UploadFilter::new())
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(remaining, vec![late, middle]);
    }

    async fn retained_ids(pool: &PgPool) -> Vec<UploadId> {
        let mut conn = pool.acquire().await.unwrap();
        Uploads::new(&mut conn)
            .list(&UploadFilter::new())
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect()
    }

    #[sqlx::test]
    async fn test_prune_twice_is_noop(pool: PgPool) {
        let mut ids = Vec::new();
        for i in 0..7 {
            ids.push(insert_at(&pool, &format!("{i}.csv"), i).await);
        }

        let mut conn = pool.acquire().await.unwrap();
        let first = prune(&mut conn, 5).await.unwrap();
        assert_eq!(first, vec![ids[1], ids[0]]);
        drop(conn);
        let after_first = retained_ids(&pool).await;
        assert_eq!(after_first.len(), 5);

        let mut conn = pool.acquire().await.unwrap();
        let second = prune(&mut conn, 5).await.unwrap();
        assert!(second.is_empty());
        drop(conn);
        assert_eq!(retained_ids(&pool).await, after_first);
    }

    #[sqlx::test]
    async fn test_prune_rolls_back_with_transaction(pool: PgPool) {
        for i in 0..3 {
            insert_at(&pool, &format!("{i}.csv"), i).await;
        }

        let mut tx = pool.begin().await.unwrap();
        let evicted = prune(&mut tx, 1).await.unwrap();
        assert_eq!(evicted.len(), 2);
        tx.rollback().await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let remaining = Uploads::new(&mut conn).list(&UploadFilter::new()).await.unwrap();
        assert_eq!(remaining.len(), 3);
    }
}
