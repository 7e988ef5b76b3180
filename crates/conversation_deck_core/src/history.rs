//! crates/conversation_deck_core/src/history.rs
//!
//! The history store: sole owner of the persisted `HistoryData` blob.
//!
//! Every read-modify-write runs under one async mutex, so concurrent callers in
//! the same process cannot lose each other's updates. Storage failures never
//! reach the caller: reads fail open to an empty history and writes are
//! best-effort.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::domain::{
    now_millis, Category, CategoryStats, HistoryData, Question, QuestionId, SwipeAction,
    SwipeRecord, STORAGE_VERSION,
};
use crate::ports::{GeneratedQuestion, KeyValueStore};

/// Key under which the history blob is stored unless configured otherwise.
pub const DEFAULT_HISTORY_KEY: &str = "conversation_deck.question_history";

/// Totals across every category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AllStats {
    pub total_seen: u32,
    pub total_liked: u32,
    pub total_skipped: u32,
    pub by_category: BTreeMap<Category, CategoryStats>,
}

//=========================================================================================
// The History Store
//=========================================================================================

pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    lock: Mutex<()>,
}

impl HistoryStore {
    /// Creates a store that persists under [`DEFAULT_HISTORY_KEY`].
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DEFAULT_HISTORY_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the persisted history, or an empty one if nothing usable is stored.
    pub async fn load(&self) -> HistoryData {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Trims the swipe log and overwrites the persisted blob.
    pub async fn save(&self, data: &mut HistoryData) {
        let _guard = self.lock.lock().await;
        self.write(data).await;
    }

    /// Loads, mutates and saves the history as one unit.
    ///
    /// Returns the history as it was saved together with the closure's output.
    pub async fn update<F, T>(&self, mutate: F) -> (HistoryData, T)
    where
        F: FnOnce(&mut HistoryData) -> T + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await;
        let output = mutate(&mut data);
        self.write(&mut data).await;
        (data, output)
    }

    /// Records one swipe and returns the updated history.
    pub async fn record_swipe(
        &self,
        question_id: QuestionId,
        category: Category,
        action: SwipeAction,
        question_length: usize,
    ) -> HistoryData {
        let record = SwipeRecord {
            question_id,
            category,
            action,
            timestamp: now_millis(),
            question_length,
        };
        debug!(question_id, %category, ?action, "Recording swipe");

        let (history, ()) = self.update(|history| history.apply_swipe(record)).await;
        history
    }

    pub async fn seen_question_ids(&self, categories: &[Category]) -> BTreeSet<QuestionId> {
        self.load().await.seen_question_ids(categories)
    }

    pub async fn category_stats(&self, category: Category) -> CategoryStats {
        self.load().await.stats(category).clone()
    }

    pub async fn all_stats(&self) -> AllStats {
        let history = self.load().await;
        let mut stats = AllStats {
            total_seen: 0,
            total_liked: 0,
            total_skipped: 0,
            by_category: BTreeMap::new(),
        };
        for (category, category_stats) in history.category_stats {
            stats.total_seen += category_stats.total_seen;
            stats.total_liked += category_stats.liked;
            stats.total_skipped += category_stats.skipped;
            stats.by_category.insert(category, category_stats);
        }
        stats
    }

    /// Assigns ids to freshly generated questions and appends them to the pool.
    ///
    /// Ids continue from the highest generated id so far, never below 10000.
    pub async fn store_generated_questions(
        &self,
        questions: Vec<GeneratedQuestion>,
    ) -> Vec<Question> {
        let generated_at = now_millis();
        let (_, stored) = self
            .update(move |history| {
                let first_id = history.next_generated_id();
                let stored: Vec<Question> = questions
                    .into_iter()
                    .zip(first_id..)
                    .map(|(generated, id)| Question {
                        id,
                        category: generated.category,
                        text: generated.text,
                        is_generated: true,
                        generated_at: Some(generated_at),
                    })
                    .collect();
                history.generated_questions.extend(stored.iter().cloned());
                stored
            })
            .await;

        info!(count = stored.len(), "Stored generated questions");
        stored
    }

    pub async fn generated_questions(&self, categories: &[Category]) -> Vec<Question> {
        self.load().await.generated_in(categories)
    }

    /// Deletes the persisted blob. The next load returns first-run state.
    pub async fn clear_history(&self) {
        let _guard = self.lock.lock().await;
        match self.store.remove(&self.key).await {
            Ok(()) => info!("Question history cleared"),
            Err(e) => error!("Error clearing question history: {}", e),
        }
    }

    /// The full history, for analysis.
    pub async fn full_history(&self) -> HistoryData {
        self.load().await
    }

    //-------------------------------------------------------------------------------------
    // Unlocked helpers. Callers must hold `self.lock`.
    //-------------------------------------------------------------------------------------

    async fn read(&self) -> HistoryData {
        let stored = match self.store.get(&self.key).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return HistoryData::empty(),
            Err(e) => {
                error!("Error loading question history: {}", e);
                return HistoryData::empty();
            }
        };

        let mut data: HistoryData = match serde_json::from_str(&stored) {
            Ok(data) => data,
            Err(e) => {
                error!("Error parsing question history, starting fresh: {}", e);
                return HistoryData::empty();
            }
        };

        // No field transformations are defined between versions yet; only the stamp moves.
        if data.version != STORAGE_VERSION {
            info!(
                from = data.version,
                to = STORAGE_VERSION,
                "Migrating question history data"
            );
            data.version = STORAGE_VERSION;
        }
        data.ensure_all_categories();
        data
    }

    async fn write(&self, data: &mut HistoryData) {
        data.trim_recent_swipes();

        let json = match serde_json::to_string(data) {
            Ok(json) => json,
            Err(e) => {
                error!("Error serializing question history: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(&self.key, &json).await {
            error!("Error saving question history: {}", e);
        }
    }
}
