use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Floor for the recomputed review interval. The performance multiplier can
/// reach zero or go negative after sustained failure; the next review date
/// must stay in the future.
const MIN_INTERVAL_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LearningStatus {
    New,
    Learning,
    Reviewing,
    Mastered,
}

impl Default for LearningStatus {
    fn default() -> Self {
        Self::New
    }
}

impl LearningStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LEARNING" => Self::Learning,
            "REVIEWING" => Self::Reviewing,
            "MASTERED" => Self::Mastered,
            _ => Self::New,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Learning => "LEARNING",
            Self::Reviewing => "REVIEWING",
            Self::Mastered => "MASTERED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizOutcome {
    Success,
    Error,
    Unanswered,
}

/// One learning-history row per (user, word) pair. Created lazily on the
/// first quiz result for the pair, mutated on every subsequent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningHistory {
    pub user_id: String,
    pub word_id: Uuid,
    pub last_viewed_at: DateTime<Utc>,
    pub next_review_date: DateTime<Utc>,
    #[serde(rename = "viewCount")]
    pub answer_count: i32,
    pub nb_success: i32,
    pub nb_errors: i32,
    pub nb_unanswered: i32,
    pub current_streak: i32,
    pub best_streak: i32,
    pub learning_status: LearningStatus,
}

impl LearningHistory {
    pub fn new(user_id: impl Into<String>, word_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            word_id,
            last_viewed_at: now,
            next_review_date: now,
            answer_count: 0,
            nb_success: 0,
            nb_errors: 0,
            nb_unanswered: 0,
            current_streak: 0,
            best_streak: 0,
            learning_status: LearningStatus::New,
        }
    }

    /// Applies one quiz outcome: bookkeeping, counters, status transition,
    /// then reschedule. `now` is injected so callers control the clock.
    pub fn record_outcome(&mut self, outcome: QuizOutcome, now: DateTime<Utc>) {
        self.last_viewed_at = now;
        self.answer_count += 1;

        match outcome {
            QuizOutcome::Success => {
                self.nb_success += 1;
                self.current_streak += 1;
                if self.current_streak > self.best_streak {
                    self.best_streak = self.current_streak;
                }
            }
            QuizOutcome::Error => {
                self.nb_errors += 1;
                self.current_streak = 0;
            }
            QuizOutcome::Unanswered => {
                self.nb_unanswered += 1;
                self.current_streak = 0;
            }
        }

        self.refresh_status();
        self.reschedule(now);
    }

    /// Status transition thresholds. The success rate here counts
    /// `nb_unanswered` twice in the denominator; the reschedule multiplier
    /// below uses the plain rate. The two formulas are distinct on purpose.
    fn refresh_status(&mut self) {
        let total_answers = self.nb_success + self.nb_errors + self.nb_unanswered;
        if total_answers == 0 {
            self.learning_status = LearningStatus::New;
            return;
        }

        let success_rate =
            f64::from(self.nb_success) / f64::from(total_answers + self.nb_unanswered);

        self.learning_status = if self.current_streak >= 5 && success_rate >= 0.9 {
            LearningStatus::Mastered
        } else if self.current_streak >= 3 && success_rate >= 0.7 {
            LearningStatus::Reviewing
        } else {
            LearningStatus::Learning
        };
    }

    fn reschedule(&mut self, now: DateTime<Utc>) {
        let base_interval = match self.learning_status {
            LearningStatus::New => Duration::hours(4),
            LearningStatus::Learning => Duration::hours(24),
            LearningStatus::Reviewing => Duration::hours(72),
            LearningStatus::Mastered => Duration::hours(168),
        };

        let total = f64::from(self.nb_success + self.nb_errors + self.nb_unanswered);
        let success_rate = f64::from(self.nb_success) / total;

        let mut multiplier = 1.0;
        if self.current_streak > 3 {
            multiplier += f64::from(self.current_streak) * 0.2;
        }
        if success_rate > 0.8 {
            multiplier += 0.5;
        }
        if success_rate < 0.6 {
            multiplier -= 0.5;
        }

        let secs = (base_interval.num_seconds() as f64 * multiplier) as i64;
        let interval = Duration::seconds(secs.max(MIN_INTERVAL_SECS));
        self.next_review_date = now + interval;
    }
}
