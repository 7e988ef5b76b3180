//! crates/conversation_deck_core/src/preferences.rs
//!
//! Derives user preferences from the swipe history and decides when the user
//! has seen enough of the catalog to be offered generated questions.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::QuestionCatalog;
use crate::domain::{now_millis, Category, HistoryData, LengthRange, Question, UserPreferences};
use crate::history::HistoryStore;

/// Percentage of the catalog that must be seen before generated questions are offered.
pub const OFFER_THRESHOLD_PERCENT: u64 = 80;

const MAX_LIKED_KEYWORDS: usize = 20;
const MAX_CONTEXT_KEYWORDS: usize = 10;
const MAX_DOMINANT_THEMES: usize = 3;
const MAX_SAMPLED_LIKED: usize = 10;
const PREFERRED_CATEGORY_RATIO: f64 = 0.5;

//=========================================================================================
// Themes
//=========================================================================================

/// Broad question themes, each recognised by a fixed keyword list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Deep,
    Playful,
    Spicy,
    Practical,
    Social,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Deep,
        Theme::Playful,
        Theme::Spicy,
        Theme::Practical,
        Theme::Social,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Deep => "deep",
            Theme::Playful => "playful",
            Theme::Spicy => "spicy",
            Theme::Practical => "practical",
            Theme::Social => "social",
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Theme::Deep => &[
                "regret", "trauma", "fear", "vulnerable", "honest", "secret", "hardest",
                "worst", "painful", "heal", "lonely", "cry", "death", "love", "heart",
            ],
            Theme::Playful => &[
                "favorite", "would you rather", "if you could", "best", "funniest",
                "craziest", "weirdest", "embarrassing", "guilty pleasure",
            ],
            Theme::Spicy => &[
                "sex", "hook up", "turn on", "turn off", "kiss", "attraction", "body",
                "intimate", "fantasy", "bedroom",
            ],
            Theme::Practical => &[
                "money", "finance", "career", "work", "family", "kids", "marriage",
                "future", "plan", "goal",
            ],
            Theme::Social => &[
                "friend", "party", "social media", "text", "ghost", "date", "ex",
                "relationship",
            ],
        }
    }
}

/// Every theme keyword contained in the text, in dictionary order.
pub fn extract_keywords(text: &str) -> Vec<&'static str> {
    let text = text.to_lowercase();
    Theme::ALL
        .iter()
        .flat_map(|theme| theme.keywords().iter().copied())
        .filter(|keyword| text.contains(keyword))
        .collect()
}

/// How many of the keywords fall under each theme, in theme order.
pub fn theme_distribution(keywords: &[&str]) -> Vec<(Theme, usize)> {
    Theme::ALL
        .iter()
        .map(|theme| {
            let count = keywords
                .iter()
                .filter(|keyword| theme.keywords().contains(*keyword))
                .count();
            (*theme, count)
        })
        .collect()
}

//=========================================================================================
// Query Results
//=========================================================================================

/// Whether the user has seen enough of the selected categories to be offered new questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AiOffer {
    pub should_offer: bool,
    pub total_seen: u64,
    pub total_available: u64,
    pub percentage_seen: f64,
}

/// How much of one category the user has explored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CategoryEngagement {
    /// Percentage of the category's catalog seen, 0–100.
    pub score: u32,
    pub seen: u32,
    pub total: usize,
    pub like_ratio: f64,
}

//=========================================================================================
// Pure Computations
//=========================================================================================

/// Questions (base or generated) whose id is liked in any category.
pub fn liked_questions(history: &HistoryData, catalog: &QuestionCatalog) -> Vec<Question> {
    let liked_ids = history.liked_question_ids();
    catalog
        .questions()
        .iter()
        .chain(history.generated_questions.iter())
        .filter(|question| liked_ids.contains(&question.id))
        .cloned()
        .collect()
}

/// Keywords ranked by frequency, ties kept in the order they were first found.
fn rank_keywords(liked: &[Question]) -> Vec<String> {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for question in liked {
        for keyword in extract_keywords(&question.text) {
            match counts.iter_mut().find(|(known, _)| *known == keyword) {
                Some((_, count)) => *count += 1,
                None => counts.push((keyword, 1)),
            }
        }
    }

    // `sort_by` is stable, which keeps first-found order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(MAX_LIKED_KEYWORDS)
        .map(|(keyword, _)| keyword.to_string())
        .collect()
}

fn length_range(liked: &[Question]) -> LengthRange {
    let lengths: Vec<usize> = liked.iter().map(Question::length).collect();
    match (lengths.iter().min(), lengths.iter().max()) {
        (Some(&min), Some(&max)) => LengthRange {
            min,
            max,
            avg: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
        },
        _ => LengthRange::default(),
    }
}

/// Computes preferences from scratch.
pub fn compute_preferences(
    history: &HistoryData,
    catalog: &QuestionCatalog,
    now: DateTime<Utc>,
) -> UserPreferences {
    let category_preferences: BTreeMap<Category, f64> = Category::ALL
        .into_iter()
        .map(|category| (category, history.stats(category).like_ratio()))
        .collect();

    let liked = liked_questions(history, catalog);

    UserPreferences {
        category_preferences,
        preferred_length_range: length_range(&liked),
        liked_keywords: rank_keywords(&liked),
        total_questions_answered: history.category_stats.values().map(|s| s.total_seen).sum(),
        last_played_at: now,
    }
}

/// Renders the preference summary handed to a generation backend.
pub fn build_preference_context(preferences: &UserPreferences, sampled_liked: &[Question]) -> String {
    let range = &preferences.preferred_length_range;
    let mut context = String::from("User Preference Profile:\n");
    let _ = writeln!(
        context,
        "- Total questions answered: {}",
        preferences.total_questions_answered
    );
    let _ = writeln!(
        context,
        "- Preferred question length: {} characters (range: {}-{})",
        range.avg.round(),
        range.min,
        range.max
    );

    let sample_keywords: Vec<&str> = sampled_liked
        .iter()
        .flat_map(|question| extract_keywords(&question.text))
        .collect();
    let mut themes: Vec<(Theme, usize)> = theme_distribution(&sample_keywords)
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();
    themes.sort_by(|a, b| b.1.cmp(&a.1));
    if !themes.is_empty() {
        let names: Vec<&str> = themes
            .iter()
            .take(MAX_DOMINANT_THEMES)
            .map(|(theme, _)| theme.name())
            .collect();
        let _ = writeln!(context, "- Preferred themes: {}", names.join(", "));
    }

    let mut preferred: Vec<(Category, f64)> = preferences
        .category_preferences
        .iter()
        .filter(|(_, ratio)| **ratio > PREFERRED_CATEGORY_RATIO)
        .map(|(category, ratio)| (*category, *ratio))
        .collect();
    preferred.sort_by(|a, b| b.1.total_cmp(&a.1));
    if !preferred.is_empty() {
        let names: Vec<&str> = preferred.iter().map(|(category, _)| category.as_str()).collect();
        let _ = writeln!(context, "- Highly engaged categories: {}", names.join(", "));
    }

    if !preferences.liked_keywords.is_empty() {
        let keywords: Vec<&str> = preferences
            .liked_keywords
            .iter()
            .take(MAX_CONTEXT_KEYWORDS)
            .map(String::as_str)
            .collect();
        let _ = writeln!(context, "- Topics they enjoy: {}", keywords.join(", "));
    }

    if !sampled_liked.is_empty() {
        context.push_str("\nSample questions they liked:\n");
        for question in sampled_liked.iter().take(MAX_SAMPLED_LIKED) {
            let _ = writeln!(context, "- \"{}\"", question.text);
        }
    }

    context
}

/// The offer decision for a set of categories.
pub fn ai_offer(history: &HistoryData, catalog: &QuestionCatalog, categories: &[Category]) -> AiOffer {
    let unique: BTreeSet<Category> = categories.iter().copied().collect();
    let (total_seen, total_available) = unique.iter().fold((0u64, 0u64), |(seen, available), category| {
        (
            seen + u64::from(history.stats(*category).total_seen),
            available + catalog.count_in(*category) as u64,
        )
    });

    let percentage_seen = if total_available == 0 {
        0.0
    } else {
        total_seen as f64 * 100.0 / total_available as f64
    };

    AiOffer {
        // Integer comparison keeps the 80% boundary exact.
        should_offer: total_available > 0
            && total_seen * 100 >= total_available * OFFER_THRESHOLD_PERCENT,
        total_seen,
        total_available,
        percentage_seen,
    }
}

pub fn category_engagement(
    history: &HistoryData,
    catalog: &QuestionCatalog,
    category: Category,
) -> CategoryEngagement {
    let stats = history.stats(category);
    let total = catalog.count_in(category);
    let score = if total == 0 {
        0
    } else {
        (f64::from(stats.total_seen) * 100.0 / total as f64).round() as u32
    };

    CategoryEngagement {
        score: score.min(100),
        seen: stats.total_seen,
        total,
        like_ratio: stats.like_ratio(),
    }
}

//=========================================================================================
// The Analyzer Service
//=========================================================================================

pub struct PreferenceAnalyzer {
    history: Arc<HistoryStore>,
    catalog: Arc<QuestionCatalog>,
}

impl PreferenceAnalyzer {
    pub fn new(history: Arc<HistoryStore>, catalog: Arc<QuestionCatalog>) -> Self {
        Self { history, catalog }
    }

    /// Recomputes preferences and persists them into the history.
    pub async fn analyze_preferences(&self) -> UserPreferences {
        let catalog = &self.catalog;
        let (_, preferences) = self
            .history
            .update(|history| {
                let preferences = compute_preferences(history, catalog, now_millis());
                history.preferences = Some(preferences.clone());
                preferences
            })
            .await;
        debug!(
            answered = preferences.total_questions_answered,
            keywords = preferences.liked_keywords.len(),
            "Preferences analyzed"
        );
        preferences
    }

    /// A natural-language summary of the user's tastes for the generation backend.
    pub async fn generate_preference_context(&self) -> String {
        let preferences = self.analyze_preferences().await;
        let history = self.history.load().await;

        let mut liked = liked_questions(&history, &self.catalog);
        liked.shuffle(&mut rand::thread_rng());
        liked.truncate(MAX_SAMPLED_LIKED);

        build_preference_context(&preferences, &liked)
    }

    pub async fn should_offer_ai_questions(&self, categories: &[Category]) -> AiOffer {
        let history = self.history.load().await;
        ai_offer(&history, &self.catalog, categories)
    }

    pub async fn category_engagement(&self, category: Category) -> CategoryEngagement {
        let history = self.history.load().await;
        category_engagement(&history, &self.catalog, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SwipeAction;
    use crate::memory::InMemoryStore;

    fn question(id: i64, category: Category, text: &str) -> Question {
        Question {
            id,
            category,
            text: text.to_string(),
            is_generated: false,
            generated_at: None,
        }
    }

    fn catalog_of(count: i64, category: Category) -> QuestionCatalog {
        QuestionCatalog::new(
            (0..count)
                .map(|id| question(id, category, &format!("Question number {id}?")))
                .collect(),
        )
        .unwrap()
    }

    fn history_with_seen(category: Category, seen: i64) -> HistoryData {
        let mut history = HistoryData::empty();
        for id in 0..seen {
            history.stats_mut(category).record(id, SwipeAction::Skipped);
        }
        history
    }

    #[test]
    fn offer_boundary_is_exact() {
        let catalog = catalog_of(100, Category::Chill);

        let at_80 = ai_offer(&history_with_seen(Category::Chill, 80), &catalog, &[Category::Chill]);
        assert!(at_80.should_offer);
        assert_eq!(at_80.percentage_seen, 80.0);

        let at_79 = ai_offer(&history_with_seen(Category::Chill, 79), &catalog, &[Category::Chill]);
        assert!(!at_79.should_offer);

        let small = catalog_of(5, Category::Chill);
        assert!(ai_offer(&history_with_seen(Category::Chill, 4), &small, &[Category::Chill]).should_offer);
        assert!(!ai_offer(&history_with_seen(Category::Chill, 3), &small, &[Category::Chill]).should_offer);
    }

    #[test]
    fn offer_with_empty_catalog_is_zero() {
        let offer = ai_offer(&HistoryData::empty(), &QuestionCatalog::default(), &[Category::Sex]);
        assert_eq!(offer.percentage_seen, 0.0);
        assert_eq!(offer.total_available, 0);
        assert!(!offer.should_offer);
    }

    #[test]
    fn preferences_default_when_nothing_is_liked() {
        let preferences = compute_preferences(&HistoryData::empty(), &QuestionCatalog::default(), Utc::now());
        assert_eq!(preferences.preferred_length_range, LengthRange::default());
        assert!(preferences.liked_keywords.is_empty());
        assert_eq!(preferences.total_questions_answered, 0);
        assert!(preferences.category_preferences.values().all(|ratio| *ratio == 0.0));
    }

    #[test]
    fn preferences_follow_liked_questions() {
        let catalog = QuestionCatalog::new(vec![
            question(1, Category::Dating, "What is your worst date ever?"),
            question(2, Category::Dating, "Best date?"),
            question(3, Category::Dating, "Would you rather kiss or text?"),
        ])
        .unwrap();
        let mut history = HistoryData::empty();
        history.stats_mut(Category::Dating).record(1, SwipeAction::Liked);
        history.stats_mut(Category::Dating).record(2, SwipeAction::Liked);
        history.stats_mut(Category::Dating).record(3, SwipeAction::Skipped);

        let preferences = compute_preferences(&history, &catalog, Utc::now());

        assert!((preferences.category_preferences[&Category::Dating] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(preferences.preferred_length_range.min, 10);
        assert_eq!(preferences.preferred_length_range.max, 29);
        assert!((preferences.preferred_length_range.avg - 19.5).abs() < 1e-9);
        // "date" appears twice; "worst" and "best" once each, in first-found order.
        assert_eq!(preferences.liked_keywords, vec!["date", "worst", "best"]);
        assert_eq!(preferences.total_questions_answered, 3);
    }

    #[test]
    fn keywords_are_matched_as_substrings() {
        assert_eq!(extract_keywords("Your FAVORITE ex?"), vec!["favorite", "ex"]);
        let distribution = theme_distribution(&["favorite", "ex", "date"]);
        assert_eq!(distribution[1], (Theme::Playful, 1));
        assert_eq!(distribution[4], (Theme::Social, 2));
    }

    #[test]
    fn context_mentions_themes_categories_and_samples() {
        let mut category_preferences: BTreeMap<Category, f64> =
            Category::ALL.into_iter().map(|c| (c, 0.0)).collect();
        category_preferences.insert(Category::Dating, 0.9);
        category_preferences.insert(Category::Chill, 0.6);
        let preferences = UserPreferences {
            category_preferences,
            preferred_length_range: LengthRange { min: 20, max: 60, avg: 41.6 },
            liked_keywords: vec!["date".to_string(), "kiss".to_string()],
            total_questions_answered: 12,
            last_played_at: Utc::now(),
        };
        let sampled = vec![question(1, Category::Dating, "Best kiss on a date?")];

        let context = build_preference_context(&preferences, &sampled);

        assert!(context.contains("Total questions answered: 12"));
        assert!(context.contains("42 characters (range: 20-60)"));
        assert!(context.contains("Preferred themes: "));
        assert!(context.contains("Highly engaged categories: dating, chill"));
        assert!(context.contains("Topics they enjoy: date, kiss"));
        assert!(context.contains("- \"Best kiss on a date?\""));
    }

    #[test]
    fn engagement_score_is_capped_and_rounded() {
        let catalog = catalog_of(3, Category::Sex);
        let engagement = category_engagement(&history_with_seen(Category::Sex, 2), &catalog, Category::Sex);
        assert_eq!(engagement.score, 67);
        assert_eq!(engagement.like_ratio, 0.0);

        let over = category_engagement(&history_with_seen(Category::Sex, 5), &catalog, Category::Sex);
        assert_eq!(over.score, 100);
        assert_eq!(over.seen, 5);
        assert_eq!(over.total, 3);
    }

    #[tokio::test]
    async fn analysis_is_persisted() {
        let history = Arc::new(HistoryStore::new(Arc::new(InMemoryStore::new())));
        let catalog = Arc::new(catalog_of(4, Category::Chill));
        history
            .record_swipe(0, Category::Chill, SwipeAction::Liked, 18)
            .await;

        let analyzer = PreferenceAnalyzer::new(history.clone(), catalog);
        let preferences = analyzer.analyze_preferences().await;

        assert_eq!(history.load().await.preferences, Some(preferences.clone()));
        assert_eq!(preferences.category_preferences[&Category::Chill], 1.0);

        let context = analyzer.generate_preference_context().await;
        assert!(context.contains("Question number 0?"));
    }
}
