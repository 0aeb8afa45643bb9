use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::db::StoreError;
use crate::services::learning_history::{LearningHistory, LearningStatus};

/// Persistence contract for learning-history rows, one per (user, word)
/// pair. Reads outside a transaction are best-effort snapshots; the
/// read-modify-write cycle of quiz ingestion goes through [`HistoryTx`].
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Snapshot read, no locks. Missing pairs are simply absent.
    async fn histories(
        &self,
        user_id: &str,
        word_ids: &[Uuid],
    ) -> Result<Vec<LearningHistory>, StoreError>;

    /// Opens the unit of work for one ingestion batch.
    async fn begin(&self) -> Result<Box<dyn HistoryTx>, StoreError>;
}

/// One atomic ingestion batch. Rows read through
/// `histories_for_update` stay locked until commit, so concurrent batches
/// for the same user serialize instead of losing counter updates.
#[async_trait]
pub trait HistoryTx: Send {
    async fn histories_for_update(
        &mut self,
        user_id: &str,
        word_ids: &[Uuid],
    ) -> Result<Vec<LearningHistory>, StoreError>;

    async fn insert(&mut self, rows: &[LearningHistory]) -> Result<(), StoreError>;

    async fn update(&mut self, rows: &[LearningHistory]) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const HISTORY_COLUMNS: &str = r#""user_id", "word_id", "last_viewed_at", "next_review_date", "answer_count", "nb_success", "nb_errors", "nb_unanswered", "current_streak", "best_streak", "learning_status""#;

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn histories(
        &self,
        user_id: &str,
        word_ids: &[Uuid],
    ) -> Result<Vec<LearningHistory>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {HISTORY_COLUMNS} FROM "word_learning_histories" WHERE "user_id" = $1 AND "word_id" = ANY($2)"#
        ))
        .bind(user_id)
        .bind(word_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_history_row).collect())
    }

    async fn begin(&self) -> Result<Box<dyn HistoryTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgHistoryTx { tx }))
    }
}

pub struct PgHistoryTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl HistoryTx for PgHistoryTx {
    async fn histories_for_update(
        &mut self,
        user_id: &str,
        word_ids: &[Uuid],
    ) -> Result<Vec<LearningHistory>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {HISTORY_COLUMNS} FROM "word_learning_histories" WHERE "user_id" = $1 AND "word_id" = ANY($2) FOR UPDATE"#
        ))
        .bind(user_id)
        .bind(word_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(map_history_row).collect())
    }

    async fn insert(&mut self, rows: &[LearningHistory]) -> Result<(), StoreError> {
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO "word_learning_histories"
                    ("user_id", "word_id", "last_viewed_at", "next_review_date",
                     "answer_count", "nb_success", "nb_errors", "nb_unanswered",
                     "current_streak", "best_streak", "learning_status")
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(&row.user_id)
            .bind(row.word_id)
            .bind(row.last_viewed_at)
            .bind(row.next_review_date)
            .bind(row.answer_count)
            .bind(row.nb_success)
            .bind(row.nb_errors)
            .bind(row.nb_unanswered)
            .bind(row.current_streak)
            .bind(row.best_streak)
            .bind(row.learning_status.as_str())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn update(&mut self, rows: &[LearningHistory]) -> Result<(), StoreError> {
        for row in rows {
            sqlx::query(
                r#"
                UPDATE "word_learning_histories"
                SET "last_viewed_at" = $3,
                    "next_review_date" = $4,
                    "answer_count" = $5,
                    "nb_success" = $6,
                    "nb_errors" = $7,
                    "nb_unanswered" = $8,
                    "current_streak" = $9,
                    "best_streak" = $10,
                    "learning_status" = $11
                WHERE "user_id" = $1 AND "word_id" = $2
                "#,
            )
            .bind(&row.user_id)
            .bind(row.word_id)
            .bind(row.last_viewed_at)
            .bind(row.next_review_date)
            .bind(row.answer_count)
            .bind(row.nb_success)
            .bind(row.nb_errors)
            .bind(row.nb_unanswered)
            .bind(row.current_streak)
            .bind(row.best_streak)
            .bind(row.learning_status.as_str())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn map_history_row(row: &PgRow) -> LearningHistory {
    let status: String = row.get("learning_status");
    LearningHistory {
        user_id: row.get("user_id"),
        word_id: row.get("word_id"),
        last_viewed_at: row.get("last_viewed_at"),
        next_review_date: row.get("next_review_date"),
        answer_count: row.get("answer_count"),
        nb_success: row.get("nb_success"),
        nb_errors: row.get("nb_errors"),
        nb_unanswered: row.get("nb_unanswered"),
        current_streak: row.get("current_streak"),
        best_streak: row.get("best_streak"),
        learning_status: LearningStatus::from_str(&status),
    }
}
