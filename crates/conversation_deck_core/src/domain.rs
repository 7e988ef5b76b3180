//! crates/conversation_deck_core/src/domain.rs
//!
//! Defines the core data structures for the question history engine.
//! The history aggregate is persisted as a single JSON blob, so these structs
//! also carry the serialized (camelCase) shape of that blob.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Identifier of a question. Base catalog ids live in `0..=9999`, generated
/// ids above that, and the terminal card uses `-1`.
pub type QuestionId = i64;

/// Schema version stamped on every persisted history blob.
pub const STORAGE_VERSION: u32 = 1;

/// Upper bound of the swipe log kept in the persisted blob.
pub const MAX_RECENT_SWIPES: usize = 500;

/// Highest id a base catalog question may carry.
pub const MAX_BASE_QUESTION_ID: QuestionId = 9999;

/// The current time at the millisecond precision timestamps are persisted with.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

//=========================================================================================
// Categories
//=========================================================================================

/// The closed set of question categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum Category {
    #[serde(rename = "chill")]
    Chill,
    #[serde(rename = "real talk")]
    RealTalk,
    #[serde(rename = "relationships")]
    Relationships,
    #[serde(rename = "sex")]
    Sex,
    #[serde(rename = "dating")]
    Dating,
    #[serde(rename = "t/d")]
    TruthOrDare,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Chill,
        Category::RealTalk,
        Category::Relationships,
        Category::Sex,
        Category::Dating,
        Category::TruthOrDare,
    ];

    /// The wire name of the category, as stored and as sent to the generation API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Chill => "chill",
            Category::RealTalk => "real talk",
            Category::Relationships => "relationships",
            Category::Sex => "sex",
            Category::Dating => "dating",
            Category::TruthOrDare => "t/d",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name one of the known categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

//=========================================================================================
// Questions and Swipes
//=========================================================================================

/// A single conversation question, either from the base catalog or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[cfg_attr(feature = "utoipa", schema(value_type = i64))]
    pub id: QuestionId,
    pub category: Category,
    #[serde(alias = "question")]
    pub text: String,
    #[serde(default)]
    pub is_generated: bool,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "utoipa", schema(value_type = Option<i64>))]
    pub generated_at: Option<DateTime<Utc>>,
}

impl Question {
    /// Character length of the question text.
    pub fn length(&self) -> usize {
        self.text.chars().count()
    }
}

/// What the user did with a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Liked,
    Skipped,
}

/// One entry of the swipe log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRecord {
    pub question_id: QuestionId,
    pub category: Category,
    pub action: SwipeAction,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub question_length: usize,
}

//=========================================================================================
// Per-category Statistics
//=========================================================================================

/// Engagement bookkeeping for one category.
///
/// `liked + skipped == total_seen` holds after every call to [`CategoryStats::record`],
/// and an id is never in both the liked and the skipped set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryStats {
    pub total_seen: u32,
    pub liked: u32,
    pub skipped: u32,
    #[cfg_attr(feature = "utoipa", schema(value_type = Vec<i64>))]
    pub seen_question_ids: BTreeSet<QuestionId>,
    #[cfg_attr(feature = "utoipa", schema(value_type = Vec<i64>))]
    pub liked_question_ids: BTreeSet<QuestionId>,
    #[cfg_attr(feature = "utoipa", schema(value_type = Vec<i64>))]
    pub skipped_question_ids: BTreeSet<QuestionId>,
}

static EMPTY_STATS: CategoryStats = CategoryStats {
    total_seen: 0,
    liked: 0,
    skipped: 0,
    seen_question_ids: BTreeSet::new(),
    liked_question_ids: BTreeSet::new(),
    skipped_question_ids: BTreeSet::new(),
};

impl CategoryStats {
    /// The current classification of a question, if it has one.
    pub fn classification(&self, question_id: QuestionId) -> Option<SwipeAction> {
        if self.liked_question_ids.contains(&question_id) {
            Some(SwipeAction::Liked)
        } else if self.skipped_question_ids.contains(&question_id) {
            Some(SwipeAction::Skipped)
        } else {
            None
        }
    }

    /// Applies a swipe to the counters and id sets.
    ///
    /// A first swipe counts the question as seen. A later swipe with a different
    /// action moves the question to the other bucket without touching `total_seen`.
    pub fn record(&mut self, question_id: QuestionId, action: SwipeAction) {
        if self.seen_question_ids.insert(question_id) {
            self.total_seen += 1;
            self.classify(question_id, action);
            return;
        }

        match self.classification(question_id) {
            Some(previous) if previous == action => {}
            Some(previous) => {
                self.unclassify(question_id, previous);
                self.classify(question_id, action);
            }
            // Seen but never classified only happens with a hand-edited blob.
            None => self.classify(question_id, action),
        }
    }

    /// `liked / total_seen`, or 0 when nothing was seen.
    pub fn like_ratio(&self) -> f64 {
        if self.total_seen == 0 {
            0.0
        } else {
            f64::from(self.liked) / f64::from(self.total_seen)
        }
    }

    fn classify(&mut self, question_id: QuestionId, action: SwipeAction) {
        match action {
            SwipeAction::Liked => {
                self.liked += 1;
                self.liked_question_ids.insert(question_id);
            }
            SwipeAction::Skipped => {
                self.skipped += 1;
                self.skipped_question_ids.insert(question_id);
            }
        }
    }

    fn unclassify(&mut self, question_id: QuestionId, action: SwipeAction) {
        match action {
            SwipeAction::Liked => {
                self.liked = self.liked.saturating_sub(1);
                self.liked_question_ids.remove(&question_id);
            }
            SwipeAction::Skipped => {
                self.skipped = self.skipped.saturating_sub(1);
                self.skipped_question_ids.remove(&question_id);
            }
        }
    }
}

//=========================================================================================
// Derived Preferences
//=========================================================================================

/// Character-length statistics of the questions a user liked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
    pub avg: f64,
}

impl Default for LengthRange {
    fn default() -> Self {
        Self {
            min: 30,
            max: 150,
            avg: 80.0,
        }
    }
}

/// Preferences derived from the swipe history. Recomputed wholesale on every analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub category_preferences: BTreeMap<Category, f64>,
    pub preferred_length_range: LengthRange,
    pub liked_keywords: Vec<String>,
    pub total_questions_answered: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[cfg_attr(feature = "utoipa", schema(value_type = i64))]
    pub last_played_at: DateTime<Utc>,
}

//=========================================================================================
// The History Aggregate
//=========================================================================================

/// The root aggregate persisted by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryData {
    #[serde(default)]
    pub category_stats: BTreeMap<Category, CategoryStats>,
    #[serde(default)]
    pub recent_swipes: Vec<SwipeRecord>,
    #[serde(default)]
    pub generated_questions: Vec<Question>,
    #[serde(default)]
    pub preferences: Option<UserPreferences>,
    #[serde(default)]
    pub version: u32,
}

impl Default for HistoryData {
    fn default() -> Self {
        Self::empty()
    }
}

impl HistoryData {
    /// First-run state: zeroed stats for every category and nothing else.
    pub fn empty() -> Self {
        let mut data = Self {
            category_stats: BTreeMap::new(),
            recent_swipes: Vec::new(),
            generated_questions: Vec::new(),
            preferences: None,
            version: STORAGE_VERSION,
        };
        data.ensure_all_categories();
        data
    }

    /// Seeds an empty stats entry for any category missing from the map.
    pub fn ensure_all_categories(&mut self) {
        for category in Category::ALL {
            self.category_stats.entry(category).or_default();
        }
    }

    pub fn stats(&self, category: Category) -> &CategoryStats {
        self.category_stats.get(&category).unwrap_or(&EMPTY_STATS)
    }

    pub fn stats_mut(&mut self, category: Category) -> &mut CategoryStats {
        self.category_stats.entry(category).or_default()
    }

    /// Applies a swipe to the category stats and appends it to the swipe log.
    pub fn apply_swipe(&mut self, record: SwipeRecord) {
        self.stats_mut(record.category)
            .record(record.question_id, record.action);
        self.recent_swipes.push(record);
    }

    /// Drops the oldest swipes so that at most [`MAX_RECENT_SWIPES`] remain.
    pub fn trim_recent_swipes(&mut self) {
        if self.recent_swipes.len() > MAX_RECENT_SWIPES {
            let excess = self.recent_swipes.len() - MAX_RECENT_SWIPES;
            self.recent_swipes.drain(..excess);
        }
    }

    /// Union of the seen ids of the given categories.
    pub fn seen_question_ids(&self, categories: &[Category]) -> BTreeSet<QuestionId> {
        categories
            .iter()
            .flat_map(|category| self.stats(*category).seen_question_ids.iter().copied())
            .collect()
    }

    /// Every liked id across all categories.
    pub fn liked_question_ids(&self) -> BTreeSet<QuestionId> {
        self.category_stats
            .values()
            .flat_map(|stats| stats.liked_question_ids.iter().copied())
            .collect()
    }

    pub fn generated_in(&self, categories: &[Category]) -> Vec<Question> {
        self.generated_questions
            .iter()
            .filter(|question| categories.contains(&question.category))
            .cloned()
            .collect()
    }

    /// The id the next generated question gets.
    pub fn next_generated_id(&self) -> QuestionId {
        let highest = self
            .generated_questions
            .iter()
            .map(|question| question.id)
            .max()
            .unwrap_or(MAX_BASE_QUESTION_ID);
        highest.max(MAX_BASE_QUESTION_ID) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_swipe_counts_as_seen() {
        let mut stats = CategoryStats::default();
        stats.record(1, SwipeAction::Liked);
        stats.record(2, SwipeAction::Skipped);

        assert_eq!(stats.total_seen, 2);
        assert_eq!(stats.liked, 1);
        assert_eq!(stats.skipped, 1);
        assert!(stats.liked_question_ids.contains(&1));
        assert!(stats.skipped_question_ids.contains(&2));
    }

    #[test]
    fn reswipe_with_other_action_moves_the_question() {
        let mut stats = CategoryStats::default();
        stats.record(5, SwipeAction::Liked);
        stats.record(5, SwipeAction::Skipped);

        assert_eq!(stats.total_seen, 1);
        assert_eq!(stats.liked, 0);
        assert_eq!(stats.skipped, 1);
        assert!(!stats.liked_question_ids.contains(&5));
        assert!(stats.skipped_question_ids.contains(&5));
    }

    #[test]
    fn reswipe_with_same_action_is_a_no_op() {
        let mut stats = CategoryStats::default();
        stats.record(7, SwipeAction::Liked);
        let before = stats.clone();
        stats.record(7, SwipeAction::Liked);
        assert_eq!(stats, before);
    }

    #[test]
    fn category_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
        assert_eq!(" Real Talk ".parse::<Category>(), Ok(Category::RealTalk));
        assert!("karaoke".parse::<Category>().is_err());
    }

    #[test]
    fn catalog_records_accept_the_legacy_question_field() {
        let question: Question =
            serde_json::from_str(r#"{"id": 3, "category": "t/d", "question": "Truth?"}"#).unwrap();
        assert_eq!(question.category, Category::TruthOrDare);
        assert_eq!(question.text, "Truth?");
        assert!(!question.is_generated);
        assert!(question.generated_at.is_none());
    }

    #[test]
    fn trimming_keeps_the_newest_swipes() {
        let mut data = HistoryData::empty();
        for id in 0..(MAX_RECENT_SWIPES as QuestionId + 20) {
            data.apply_swipe(SwipeRecord {
                question_id: id,
                category: Category::Chill,
                action: SwipeAction::Skipped,
                timestamp: Utc::now(),
                question_length: 10,
            });
        }
        data.trim_recent_swipes();

        assert_eq!(data.recent_swipes.len(), MAX_RECENT_SWIPES);
        assert_eq!(data.recent_swipes[0].question_id, 20);
    }

    #[test]
    fn next_generated_id_starts_above_the_base_range() {
        let mut data = HistoryData::empty();
        assert_eq!(data.next_generated_id(), 10_000);

        data.generated_questions.push(Question {
            id: 10_004,
            category: Category::Dating,
            text: "Generated".to_string(),
            is_generated: true,
            generated_at: Some(Utc::now()),
        });
        assert_eq!(data.next_generated_id(), 10_005);
    }

    #[test]
    fn history_blob_uses_category_names_as_keys() {
        let data = HistoryData::empty();
        let json = serde_json::to_value(&data).unwrap();
        assert!(json["categoryStats"]["real talk"].is_object());
        assert_eq!(json["version"], STORAGE_VERSION);

        let back: HistoryData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }

    fn arb_action() -> impl Strategy<Value = SwipeAction> {
        prop_oneof![Just(SwipeAction::Liked), Just(SwipeAction::Skipped)]
    }

    proptest! {
        #[test]
        fn counters_always_balance(swipes in prop::collection::vec((0i64..25, arb_action()), 0..200)) {
            let mut stats = CategoryStats::default();
            for (id, action) in swipes {
                stats.record(id, action);
                prop_assert_eq!(stats.liked + stats.skipped, stats.total_seen);
                prop_assert_eq!(stats.total_seen as usize, stats.seen_question_ids.len());
                prop_assert!(stats.liked_question_ids.is_disjoint(&stats.skipped_question_ids));
                prop_assert_eq!(stats.classification(id), Some(action));
            }
        }
    }
}
