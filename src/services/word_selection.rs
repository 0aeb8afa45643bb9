use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::db::history::HistoryStore;
use crate::db::words::{CandidateFilter, WordCatalog};
use crate::services::learning_history::{LearningHistory, LearningStatus};
use crate::services::ServiceError;

/// Flat score for words the user has never been quizzed on. Mid-range so
/// they compete with moderately-due learned words without outranking
/// badly-overdue ones.
const NO_HISTORY_SCORE: f64 = 50.0;

/// Score of a word due exactly now. Overdue words climb above it by one
/// point per hour late, upcoming ones drop below it by one point per hour
/// early.
const DUE_BASE_SCORE: f64 = 100.0;

/// Window for bounded randomization: the ranked selection is shuffled
/// inside fixed windows of this size, never across them.
const SHUFFLE_GROUP_SIZE: usize = 3;

/// Selects the words a user should be quizzed on next. Ranks the filtered
/// candidate pool by review urgency, then applies bounded randomization so
/// repeated calls do not return a guessable sequence.
pub struct WordSelectionService {
    catalog: Arc<dyn WordCatalog>,
    histories: Arc<dyn HistoryStore>,
}

impl WordSelectionService {
    pub fn new(catalog: Arc<dyn WordCatalog>, histories: Arc<dyn HistoryStore>) -> Self {
        Self { catalog, histories }
    }

    /// Returns up to `min(nb, candidate set size)` word ids. An empty
    /// `user_id` skips personalization entirely and samples uniformly.
    pub async fn select_word_ids(
        &self,
        user_id: &str,
        filter: &CandidateFilter,
        nb: usize,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let candidates = self.catalog.candidate_word_ids(filter).await?;
        if candidates.is_empty() || nb == 0 {
            return Ok(Vec::new());
        }

        if user_id.trim().is_empty() {
            let mut rng = StdRng::from_os_rng();
            return Ok(sample(candidates, nb, &mut rng));
        }

        // Snapshot read: selection is advisory, staleness is acceptable.
        let histories = self.histories.histories(user_id, &candidates).await?;

        let mut rng = StdRng::from_os_rng();
        Ok(prioritize(&candidates, &histories, nb, Utc::now(), &mut rng))
    }
}

/// Uniform sample without replacement.
fn sample(mut ids: Vec<Uuid>, nb: usize, rng: &mut (impl Rng + ?Sized)) -> Vec<Uuid> {
    ids.shuffle(rng);
    ids.truncate(nb);
    ids
}

/// Ranks all candidates by priority score, keeps the top `nb`, and
/// shuffles the result within fixed windows. Never-quizzed words enter
/// the ranking at the flat mid-range score, so they mix with learned
/// words instead of forming a separate tier.
pub fn prioritize(
    candidates: &[Uuid],
    histories: &[LearningHistory],
    nb: usize,
    now: DateTime<Utc>,
    rng: &mut (impl Rng + ?Sized),
) -> Vec<Uuid> {
    let by_word: HashMap<Uuid, &LearningHistory> =
        histories.iter().map(|h| (h.word_id, h)).collect();

    let mut scored: Vec<(Uuid, f64)> = Vec::new();
    let mut without_history: Vec<Uuid> = Vec::new();
    for id in candidates {
        match by_word.get(id) {
            Some(history) => scored.push((*id, priority_score(history, now))),
            None => without_history.push(*id),
        }
    }

    // Never-quizzed words all carry the same score; randomize their order
    // so the stable sort samples them instead of following catalog order.
    without_history.shuffle(rng);
    scored.extend(without_history.into_iter().map(|id| (id, NO_HISTORY_SCORE)));

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut selected: Vec<Uuid> = scored.iter().take(nb).map(|(id, _)| *id).collect();
    shuffle_within_groups(&mut selected, SHUFFLE_GROUP_SIZE, rng);
    selected
}

/// Review-urgency score for a word the user has a history on.
pub fn priority_score(history: &LearningHistory, now: DateTime<Utc>) -> f64 {
    let time_until_review = history.next_review_date.signed_duration_since(now);
    let hours = time_until_review.num_seconds() as f64 / 3600.0;

    let mut score = if time_until_review.num_seconds() <= 0 {
        // Overdue: the later, the higher.
        DUE_BASE_SCORE + -hours
    } else {
        // Not yet due: may go negative for far-future reviews, which only
        // matters for relative ranking.
        DUE_BASE_SCORE - hours
    };

    score *= match history.learning_status {
        LearningStatus::New => 1.2,
        LearningStatus::Learning => 1.1,
        LearningStatus::Reviewing => 0.9,
        LearningStatus::Mastered => 0.7,
    };

    if history.answer_count > 0 {
        let success_rate = f64::from(history.nb_success) / f64::from(history.answer_count);
        if success_rate < 0.6 {
            score *= 1.3;
        }
    }

    score
}

/// Shuffles each contiguous window of `group_size` ids independently.
/// Coarse ordering survives: an id never leaves its window.
pub fn shuffle_within_groups(ids: &mut [Uuid], group_size: usize, rng: &mut (impl Rng + ?Sized)) {
    if group_size == 0 {
        return;
    }
    for chunk in ids.chunks_mut(group_size) {
        chunk.shuffle(rng);
    }
}
