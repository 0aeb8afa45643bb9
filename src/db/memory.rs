//! In-memory store implementations. They back the unit and router tests,
//! where assertions need deterministic data and per-method call counts
//! instead of a running PostgreSQL instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::db::history::{HistoryStore, HistoryTx};
use crate::db::words::{CandidateFilter, WordCatalog, WordRecord};
use crate::db::StoreError;
use crate::services::learning_history::LearningHistory;

#[derive(Debug, Default)]
pub struct StoreCounters {
    pub begins: AtomicUsize,
    pub snapshot_reads: AtomicUsize,
    pub locked_reads: AtomicUsize,
    pub inserted_rows: AtomicUsize,
    pub updated_rows: AtomicUsize,
    pub commits: AtomicUsize,
}

impl StoreCounters {
    pub fn writes(&self) -> usize {
        self.inserted_rows.load(Ordering::SeqCst) + self.updated_rows.load(Ordering::SeqCst)
    }
}

type HistoryMap = HashMap<(String, Uuid), LearningHistory>;

/// History store over a mutex-guarded map. `begin` takes the map lock and
/// holds it until commit or drop, which gives the same serialization the
/// Postgres store gets from `FOR UPDATE`.
#[derive(Clone, Default)]
pub struct MemoryHistoryStore {
    rows: Arc<Mutex<HistoryMap>>,
    counters: Arc<StoreCounters>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Arc<StoreCounters> {
        Arc::clone(&self.counters)
    }

    pub async fn seed(&self, rows: Vec<LearningHistory>) {
        let mut guard = self.rows.lock().await;
        for row in rows {
            guard.insert((row.user_id.clone(), row.word_id), row);
        }
    }

    pub async fn get(&self, user_id: &str, word_id: Uuid) -> Option<LearningHistory> {
        let guard = self.rows.lock().await;
        guard.get(&(user_id.to_string(), word_id)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn histories(
        &self,
        user_id: &str,
        word_ids: &[Uuid],
    ) -> Result<Vec<LearningHistory>, StoreError> {
        self.counters.snapshot_reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.rows.lock().await;
        Ok(word_ids
            .iter()
            .filter_map(|id| guard.get(&(user_id.to_string(), *id)).cloned())
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn HistoryTx>, StoreError> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        let guard = Arc::clone(&self.rows).lock_owned().await;
        Ok(Box::new(MemoryHistoryTx {
            guard,
            staged: Vec::new(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

pub struct MemoryHistoryTx {
    guard: OwnedMutexGuard<HistoryMap>,
    staged: Vec<LearningHistory>,
    counters: Arc<StoreCounters>,
}

#[async_trait]
impl HistoryTx for MemoryHistoryTx {
    async fn histories_for_update(
        &mut self,
        user_id: &str,
        word_ids: &[Uuid],
    ) -> Result<Vec<LearningHistory>, StoreError> {
        self.counters.locked_reads.fetch_add(1, Ordering::SeqCst);
        Ok(word_ids
            .iter()
            .filter_map(|id| self.guard.get(&(user_id.to_string(), *id)).cloned())
            .collect())
    }

    async fn insert(&mut self, rows: &[LearningHistory]) -> Result<(), StoreError> {
        self.counters
            .inserted_rows
            .fetch_add(rows.len(), Ordering::SeqCst);
        self.staged.extend_from_slice(rows);
        Ok(())
    }

    async fn update(&mut self, rows: &[LearningHistory]) -> Result<(), StoreError> {
        self.counters
            .updated_rows
            .fetch_add(rows.len(), Ordering::SeqCst);
        self.staged.extend_from_slice(rows);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        for row in self.staged.drain(..) {
            self.guard.insert((row.user_id.clone(), row.word_id), row);
        }
        Ok(())
    }
}

/// One catalog word plus the tag / level-name ids it would join to in the
/// relational schema.
#[derive(Debug, Clone, Default)]
pub struct CatalogEntry {
    pub record: WordRecord,
    pub tag_ids: Vec<Uuid>,
    pub level_name_ids: Vec<Uuid>,
}

#[derive(Clone, Default)]
pub struct MemoryWordCatalog {
    entries: Vec<CatalogEntry>,
}

impl MemoryWordCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Catalog of bare words with no tags or levels attached.
    pub fn with_word_ids(ids: &[Uuid]) -> Self {
        Self {
            entries: ids
                .iter()
                .map(|id| CatalogEntry {
                    record: WordRecord {
                        id: *id,
                        ..WordRecord::default()
                    },
                    ..CatalogEntry::default()
                })
                .collect(),
        }
    }
}

#[async_trait]
impl WordCatalog for MemoryWordCatalog {
    async fn candidate_word_ids(&self, filter: &CandidateFilter) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| {
                let tag_match = filter.tag_ids.is_empty()
                    || entry.tag_ids.iter().any(|id| filter.tag_ids.contains(id));
                let level_match = filter.level_name_ids.is_empty()
                    || entry
                        .level_name_ids
                        .iter()
                        .any(|id| filter.level_name_ids.contains(id));
                tag_match && level_match
            })
            .map(|entry| entry.record.id)
            .collect())
    }

    async fn words_by_ids(&self, ids: &[Uuid]) -> Result<Vec<WordRecord>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.entries
                    .iter()
                    .find(|entry| entry.record.id == *id)
                    .map(|entry| entry.record.clone())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn tagged_entry(tag_ids: Vec<Uuid>, level_name_ids: Vec<Uuid>) -> CatalogEntry {
        CatalogEntry {
            record: WordRecord {
                id: Uuid::new_v4(),
                ..WordRecord::default()
            },
            tag_ids,
            level_name_ids,
        }
    }

    #[tokio::test]
    async fn filter_resolution_is_idempotent() {
        let tag = Uuid::new_v4();
        let catalog = MemoryWordCatalog::new(vec![
            tagged_entry(vec![tag], vec![]),
            tagged_entry(vec![tag], vec![]),
            tagged_entry(vec![], vec![]),
        ]);
        let filter = CandidateFilter {
            tag_ids: vec![tag],
            level_name_ids: vec![],
        };

        let first: HashSet<Uuid> = catalog
            .candidate_word_ids(&filter)
            .await
            .unwrap()
            .into_iter()
            .collect();
        let second: HashSet<Uuid> = catalog
            .candidate_word_ids(&filter)
            .await
            .unwrap()
            .into_iter()
            .collect();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn both_filter_axes_must_match() {
        let tag = Uuid::new_v4();
        let level = Uuid::new_v4();
        let matching = tagged_entry(vec![tag], vec![level]);
        let matching_id = matching.record.id;
        let catalog = MemoryWordCatalog::new(vec![
            matching,
            tagged_entry(vec![tag], vec![]),
            tagged_entry(vec![], vec![level]),
        ]);

        let filter = CandidateFilter {
            tag_ids: vec![tag],
            level_name_ids: vec![level],
        };
        assert_eq!(
            catalog.candidate_word_ids(&filter).await.unwrap(),
            vec![matching_id]
        );
    }
}
