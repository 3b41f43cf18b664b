use crate::domain::record::{DrinkingRecord, Rating};
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Read access to a user's drinking history.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Newest first, at most `limit` records.
    async fn records_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<DrinkingRecord>>;
}

type RecordRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: sqlx::PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl HistoryStore for PgHistoryStore {
    async fn records_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<DrinkingRecord>> {
        anyhow::ensure!(limit >= 1, "history limit must be >= 1");

        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT id, user_id, brand, impression, rating, label_image_url, created_at, updated_at \
             FROM drinking_records \
             WHERE user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .persistent(false)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("select drinking_records failed")?;

        let total = rows.len();
        let records: Vec<DrinkingRecord> = rows.into_iter().filter_map(row_to_record).collect();
        tracing::debug!(total, kept = records.len(), "drinking history loaded");
        Ok(records)
    }
}

fn row_to_record(row: RecordRow) -> Option<DrinkingRecord> {
    let (id, user_id, brand, impression, rating, label_image_url, created_at, updated_at) = row;

    let rating = match rating.parse::<Rating>() {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(record_id = %id, error = %err, "skipping stored record");
            return None;
        }
    };

    let record = DrinkingRecord {
        id: Some(id.to_string()),
        user_id,
        brand,
        impression,
        rating,
        label_image_url,
        created_at: Some(created_at),
        updated_at: Some(updated_at),
    };
    match record.validated() {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(record_id = %id, error = %err, "skipping stored record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rating: &str, brand: &str) -> RecordRow {
        (
            Uuid::nil(),
            "u1".to_string(),
            brand.to_string(),
            " すっきり ".to_string(),
            rating.to_string(),
            None,
            Utc::now(),
            Utc::now(),
        )
    }

    #[test]
    fn converts_valid_rows() {
        let record = row_to_record(row("VERY_GOOD", "獺祭")).unwrap();
        assert_eq!(record.rating, Rating::VeryGood);
        assert_eq!(record.impression, "すっきり");
        assert_eq!(record.id.as_deref(), Some("00000000-0000-0000-0000-000000000000"));

        assert_eq!(row_to_record(row("好き", "獺祭")).unwrap().rating, Rating::Good);
    }

    #[test]
    fn skips_rows_that_fail_validation() {
        assert!(row_to_record(row("最高", "獺祭")).is_none());
        assert!(row_to_record(row("GOOD", "  ")).is_none());
    }
}
