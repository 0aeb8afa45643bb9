use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::history::HistoryStore;
use crate::services::learning_history::{LearningHistory, QuizOutcome};
use crate::services::ServiceError;

/// One submitted answer. The outcome field is serialized as `type` on the
/// wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordQuizResult {
    pub word_id: Uuid,
    #[serde(rename = "type")]
    pub status: QuizOutcome,
}

/// Ingests quiz result batches and evolves the per-(user, word) learning
/// histories. Each call is one atomic unit: either every result in the
/// batch is applied and committed, or none are.
pub struct QuizService {
    histories: Arc<dyn HistoryStore>,
}

impl QuizService {
    pub fn new(histories: Arc<dyn HistoryStore>) -> Self {
        Self { histories }
    }

    pub async fn process_quiz_results(
        &self,
        user_id: &str,
        results: &[WordQuizResult],
    ) -> Result<(), ServiceError> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::Validation("user id is required".to_string()));
        }
        if results.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        self.apply_batch(user_id, results, now).await
    }

    /// Clock-injected variant used by the public entry point and by tests.
    pub async fn apply_batch(
        &self,
        user_id: &str,
        results: &[WordQuizResult],
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let mut word_ids: Vec<Uuid> = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();
        for result in results {
            if seen.insert(result.word_id) {
                word_ids.push(result.word_id);
            }
        }

        let mut tx = self.histories.begin().await?;

        let existing_rows = tx.histories_for_update(user_id, &word_ids).await?;
        let existing_ids: HashSet<Uuid> = existing_rows.iter().map(|row| row.word_id).collect();

        let mut rows: HashMap<Uuid, LearningHistory> = existing_rows
            .into_iter()
            .map(|row| (row.word_id, row))
            .collect();

        // Duplicate word ids inside one batch apply in submission order
        // against the same evolving row.
        for result in results {
            let history = rows
                .entry(result.word_id)
                .or_insert_with(|| LearningHistory::new(user_id, result.word_id, now));
            history.record_outcome(result.status, now);
        }

        let mut inserts: Vec<LearningHistory> = Vec::new();
        let mut updates: Vec<LearningHistory> = Vec::new();
        for word_id in &word_ids {
            let Some(row) = rows.remove(word_id) else {
                continue;
            };
            if existing_ids.contains(word_id) {
                updates.push(row);
            } else {
                inserts.push(row);
            }
        }

        tx.insert(&inserts).await?;
        tx.update(&updates).await?;
        tx.commit().await?;

        tracing::debug!(
            user_id,
            inserted = inserts.len(),
            updated = updates.len(),
            "quiz results processed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::db::memory::MemoryHistoryStore;
    use crate::services::learning_history::LearningStatus;

    fn service(store: &MemoryHistoryStore) -> QuizService {
        QuizService::new(Arc::new(store.clone()))
    }

    fn success(word_id: Uuid) -> WordQuizResult {
        WordQuizResult {
            word_id,
            status: QuizOutcome::Success,
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = MemoryHistoryStore::new();
        let counters = store.counters();

        service(&store)
            .process_quiz_results("user-1", &[])
            .await
            .unwrap();

        assert_eq!(counters.begins.load(Ordering::SeqCst), 0);
        assert_eq!(counters.writes(), 0);
    }

    #[tokio::test]
    async fn blank_user_id_is_rejected_before_storage() {
        let store = MemoryHistoryStore::new();
        let counters = store.counters();

        let err = service(&store)
            .process_quiz_results("  ", &[success(Uuid::new_v4())])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(counters.begins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_result_creates_the_history_row() {
        let store = MemoryHistoryStore::new();
        let counters = store.counters();
        let word_id = Uuid::new_v4();

        service(&store)
            .process_quiz_results("user-1", &[success(word_id)])
            .await
            .unwrap();

        let row = store.get("user-1", word_id).await.unwrap();
        assert_eq!(row.answer_count, 1);
        assert_eq!(row.nb_success, 1);
        assert_eq!(row.learning_status, LearningStatus::Learning);
        assert_eq!(counters.inserted_rows.load(Ordering::SeqCst), 1);
        assert_eq!(counters.updated_rows.load(Ordering::SeqCst), 0);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn existing_rows_are_updated_not_reinserted() {
        let store = MemoryHistoryStore::new();
        let word_id = Uuid::new_v4();
        let svc = service(&store);

        svc.process_quiz_results("user-1", &[success(word_id)])
            .await
            .unwrap();
        svc.process_quiz_results("user-1", &[success(word_id)])
            .await
            .unwrap();

        let counters = store.counters();
        assert_eq!(counters.inserted_rows.load(Ordering::SeqCst), 1);
        assert_eq!(counters.updated_rows.load(Ordering::SeqCst), 1);

        let row = store.get("user-1", word_id).await.unwrap();
        assert_eq!(row.answer_count, 2);
        assert_eq!(row.current_streak, 2);
    }

    #[tokio::test]
    async fn mixed_batch_splits_inserts_and_updates() {
        let store = MemoryHistoryStore::new();
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let svc = service(&store);

        svc.process_quiz_results("user-1", &[success(known)])
            .await
            .unwrap();

        svc.process_quiz_results(
            "user-1",
            &[
                success(known),
                WordQuizResult {
                    word_id: unknown,
                    status: QuizOutcome::Error,
                },
            ],
        )
        .await
        .unwrap();

        assert_eq!(store.len().await, 2);
        let created = store.get("user-1", unknown).await.unwrap();
        assert_eq!(created.nb_errors, 1);
        assert_eq!(created.current_streak, 0);
    }

    #[tokio::test]
    async fn duplicate_word_in_batch_applies_both_results() {
        let store = MemoryHistoryStore::new();
        let word_id = Uuid::new_v4();

        service(&store)
            .process_quiz_results("user-1", &[success(word_id), success(word_id)])
            .await
            .unwrap();

        let row = store.get("user-1", word_id).await.unwrap();
        assert_eq!(row.answer_count, 2);
        assert_eq!(row.current_streak, 2);
        // Still a single row, written once.
        assert_eq!(store.counters().inserted_rows.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn histories_of_other_users_are_untouched() {
        let store = MemoryHistoryStore::new();
        let word_id = Uuid::new_v4();
        let svc = service(&store);

        svc.process_quiz_results("user-1", &[success(word_id)])
            .await
            .unwrap();
        svc.process_quiz_results("user-2", &[success(word_id)])
            .await
            .unwrap();

        let first = store.get("user-1", word_id).await.unwrap();
        let second = store.get("user-2", word_id).await.unwrap();
        assert_eq!(first.answer_count, 1);
        assert_eq!(second.answer_count, 1);
    }
}
