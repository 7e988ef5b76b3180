//! crates/conversation_deck_core/src/deck.rs
//!
//! Assembles the ordered card sequence for a play session.
//!
//! Building is stateless: every call reads a fresh copy of the history, and the
//! assembly itself is a pure function over that copy and a caller-supplied RNG.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::QuestionCatalog;
use crate::domain::{Category, HistoryData, Question, QuestionId};
use crate::history::HistoryStore;
use crate::preferences::{ai_offer, AiOffer};

/// Id reported by the terminal card.
pub const FINISHED_CARD_ID: QuestionId = -1;

/// Text shown on the terminal card.
pub const FINISHED_CARD_TEXT: &str = "Cards finished. Redirecting you back.";

/// Below this many cards the smart deck tops up with already-seen questions.
const MIN_DECK_BEFORE_REPEATS: usize = 10;

/// Share of the deck length used as the number of adjacent swaps in the light shuffle.
const LIGHT_SHUFFLE_RATIO: f64 = 0.2;

//=========================================================================================
// Deck Types
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DeckConfig {
    pub mix_generated_questions: bool,
    /// Maximum share (0–1) of the unseen deck that may be added as generated questions.
    pub max_generated_ratio: f64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            mix_generated_questions: true,
            max_generated_ratio: 0.3,
        }
    }
}

/// One entry of a deck.
#[derive(Debug, Clone, PartialEq)]
pub enum Card {
    Question(Question),
    /// Marks the end of the session for the UI.
    Finished,
}

impl Card {
    pub fn id(&self) -> QuestionId {
        match self {
            Card::Question(question) => question.id,
            Card::Finished => FINISHED_CARD_ID,
        }
    }

    /// The category name; empty for the terminal card.
    pub fn category_name(&self) -> &'static str {
        match self {
            Card::Question(question) => question.category.as_str(),
            Card::Finished => "",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Card::Question(question) => &question.text,
            Card::Finished => FINISHED_CARD_TEXT,
        }
    }

    pub fn question(&self) -> Option<&Question> {
        match self {
            Card::Question(question) => Some(question),
            Card::Finished => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Card::Finished)
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "kind", rename_all = "snake_case")]
        enum Wire<'a> {
            Question(&'a Question),
            Finished {
                id: QuestionId,
                category: &'static str,
                text: &'static str,
            },
        }

        match self {
            Card::Question(question) => Wire::Question(question),
            Card::Finished => Wire::Finished {
                id: FINISHED_CARD_ID,
                category: "",
                text: FINISHED_CARD_TEXT,
            },
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    /// Question cards in the deck, not counting the terminal card.
    pub total_questions: usize,
    pub unseen_questions: usize,
    pub seen_questions: usize,
    pub generated_questions: usize,
    #[serde(rename = "shouldOfferAI")]
    pub should_offer_ai: bool,
    pub percentage_seen: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct DeckBuildResult {
    /// Question cards tagged `"kind": "question"`, closed by one `"kind": "finished"` card.
    #[cfg_attr(feature = "utoipa", schema(value_type = Vec<Object>))]
    pub deck: Vec<Card>,
    pub stats: DeckStats,
}

/// Quick availability figures for a set of categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityStats {
    /// Base plus generated questions.
    pub total_available: usize,
    pub unseen_count: usize,
    pub seen_count: usize,
    pub generated_count: usize,
    /// Rounded percentage of the base questions already seen.
    pub percentage_seen: u32,
}

/// The questions a deck can be built from, split by seen state.
#[derive(Debug, Clone, Default)]
pub struct DeckPool {
    pub unseen: Vec<Question>,
    pub seen: Vec<Question>,
    /// Generated questions of the selected categories not seen yet.
    pub generated: Vec<Question>,
}

impl DeckPool {
    pub fn gather(history: &HistoryData, catalog: &QuestionCatalog, categories: &[Category]) -> Self {
        let seen_ids = history.seen_question_ids(categories);
        let (seen, unseen): (Vec<Question>, Vec<Question>) = catalog
            .in_categories(categories)
            .into_iter()
            .partition(|question| seen_ids.contains(&question.id));
        let generated = history
            .generated_in(categories)
            .into_iter()
            .filter(|question| !seen_ids.contains(&question.id))
            .collect();

        Self {
            unseen,
            seen,
            generated,
        }
    }
}

//=========================================================================================
// Shuffling Primitives
//=========================================================================================

/// Uniform Fisher–Yates shuffle.
pub fn shuffled<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> Vec<T> {
    items.shuffle(rng);
    items
}

/// Swaps `floor(0.2 * len)` randomly chosen adjacent pairs.
pub fn light_shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    if items.len() < 2 {
        return;
    }
    let swaps = (items.len() as f64 * LIGHT_SHUFFLE_RATIO).floor() as usize;
    for _ in 0..swaps {
        let idx = rng.gen_range(0..items.len() - 1);
        items.swap(idx, idx + 1);
    }
}

/// Spreads `secondary` evenly through `primary`, appending whatever does not fit.
pub fn interleave<T>(primary: Vec<T>, secondary: Vec<T>) -> Vec<T> {
    if secondary.is_empty() {
        return primary;
    }
    if primary.is_empty() {
        return secondary;
    }

    let interval = primary.len() / (secondary.len() + 1);
    let mut result = Vec::with_capacity(primary.len() + secondary.len());
    let mut secondary = secondary.into_iter();

    for (i, item) in primary.into_iter().enumerate() {
        result.push(item);
        if interval > 0 && (i + 1) % interval == 0 {
            if let Some(extra) = secondary.next() {
                result.push(extra);
            }
        }
    }
    result.extend(secondary);
    result
}

fn into_cards(questions: Vec<Question>) -> Vec<Card> {
    questions
        .into_iter()
        .map(Card::Question)
        .chain(std::iter::once(Card::Finished))
        .collect()
}

//=========================================================================================
// Deck Assembly
//=========================================================================================

/// Unseen first, generated mixed in, seen repeats only when the deck runs short.
pub fn assemble_smart_deck<R: Rng + ?Sized>(
    pool: DeckPool,
    config: &DeckConfig,
    offer: &AiOffer,
    rng: &mut R,
) -> DeckBuildResult {
    let mut deck = shuffled(pool.unseen, rng);
    let unseen_questions = deck.len();

    let mut generated_questions = 0;
    if config.mix_generated_questions && !pool.generated.is_empty() {
        let cap = (deck.len() as f64 * config.max_generated_ratio).floor() as usize;
        let mut generated = shuffled(pool.generated, rng);
        generated.truncate(cap);
        generated_questions = generated.len();
        deck = interleave(deck, generated);
    }

    let mut seen_questions = 0;
    if deck.len() < MIN_DECK_BEFORE_REPEATS && !pool.seen.is_empty() {
        seen_questions = pool.seen.len();
        deck.extend(shuffled(pool.seen, rng));
    }

    light_shuffle(&mut deck, rng);

    DeckBuildResult {
        stats: DeckStats {
            total_questions: deck.len(),
            unseen_questions,
            seen_questions,
            generated_questions,
            should_offer_ai: offer.should_offer,
            percentage_seen: offer.percentage_seen,
        },
        deck: into_cards(deck),
    }
}

/// Only unseen base questions, shuffled.
pub fn assemble_fresh_deck<R: Rng + ?Sized>(pool: DeckPool, offer: &AiOffer, rng: &mut R) -> DeckBuildResult {
    let deck = shuffled(pool.unseen, rng);
    DeckBuildResult {
        stats: DeckStats {
            total_questions: deck.len(),
            unseen_questions: deck.len(),
            seen_questions: 0,
            generated_questions: 0,
            should_offer_ai: offer.should_offer,
            percentage_seen: offer.percentage_seen,
        },
        deck: into_cards(deck),
    }
}

/// Every base question regardless of seen state, shuffled.
pub fn assemble_full_deck<R: Rng + ?Sized>(pool: DeckPool, offer: &AiOffer, rng: &mut R) -> DeckBuildResult {
    let unseen_questions = pool.unseen.len();
    let seen_questions = pool.seen.len();
    let mut all = pool.unseen;
    all.extend(pool.seen);
    let deck = shuffled(all, rng);

    DeckBuildResult {
        stats: DeckStats {
            total_questions: deck.len(),
            unseen_questions,
            seen_questions,
            generated_questions: 0,
            should_offer_ai: offer.should_offer,
            percentage_seen: offer.percentage_seen,
        },
        deck: into_cards(deck),
    }
}

//=========================================================================================
// The Deck Builder Service
//=========================================================================================

pub struct DeckBuilder {
    history: Arc<HistoryStore>,
    catalog: Arc<QuestionCatalog>,
    config: DeckConfig,
}

impl DeckBuilder {
    pub fn new(history: Arc<HistoryStore>, catalog: Arc<QuestionCatalog>) -> Self {
        Self::with_config(history, catalog, DeckConfig::default())
    }

    pub fn with_config(history: Arc<HistoryStore>, catalog: Arc<QuestionCatalog>, config: DeckConfig) -> Self {
        Self {
            history,
            catalog,
            config,
        }
    }

    async fn pool_and_offer(&self, categories: &[Category]) -> (DeckPool, AiOffer) {
        let history = self.history.load().await;
        let offer = ai_offer(&history, &self.catalog, categories);
        let pool = DeckPool::gather(&history, &self.catalog, categories);
        (pool, offer)
    }

    pub async fn build_smart_deck(&self, categories: &[Category]) -> DeckBuildResult {
        let (pool, offer) = self.pool_and_offer(categories).await;
        let result = assemble_smart_deck(pool, &self.config, &offer, &mut rand::thread_rng());
        debug!(
            cards = result.stats.total_questions,
            generated = result.stats.generated_questions,
            "Built smart deck"
        );
        result
    }

    pub async fn build_fresh_deck(&self, categories: &[Category]) -> DeckBuildResult {
        let (pool, offer) = self.pool_and_offer(categories).await;
        assemble_fresh_deck(pool, &offer, &mut rand::thread_rng())
    }

    pub async fn build_full_deck(&self, categories: &[Category]) -> DeckBuildResult {
        let (pool, offer) = self.pool_and_offer(categories).await;
        assemble_full_deck(pool, &offer, &mut rand::thread_rng())
    }

    pub async fn deck_stats(&self, categories: &[Category]) -> AvailabilityStats {
        let history = self.history.load().await;
        let seen_ids: BTreeSet<QuestionId> = history.seen_question_ids(categories);
        let base = self.catalog.in_categories(categories);
        let generated_count = history.generated_in(categories).len();

        let seen_count = base.iter().filter(|q| seen_ids.contains(&q.id)).count();
        let unseen_count = base.len() - seen_count;
        let percentage_seen = if base.is_empty() {
            0
        } else {
            (seen_count as f64 * 100.0 / base.len() as f64).round() as u32
        };

        AvailabilityStats {
            total_available: base.len() + generated_count,
            unseen_count,
            seen_count,
            generated_count,
            percentage_seen,
        }
    }
}
