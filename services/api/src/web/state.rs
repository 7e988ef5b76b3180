//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use conversation_deck_core::catalog::QuestionCatalog;
use conversation_deck_core::deck::DeckBuilder;
use conversation_deck_core::generation::QuestionGenerator;
use conversation_deck_core::history::HistoryStore;
use conversation_deck_core::ports::{KeyValueStore, QuestionGenerationService};
use conversation_deck_core::preferences::PreferenceAnalyzer;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<QuestionCatalog>,
    pub history: Arc<HistoryStore>,
    pub analyzer: Arc<PreferenceAnalyzer>,
    pub decks: Arc<DeckBuilder>,
    pub generator: Arc<QuestionGenerator>,
}

impl AppState {
    /// Wires the engine components around one store and one generation backend.
    pub fn new(
        config: Arc<Config>,
        catalog: QuestionCatalog,
        store: Arc<dyn KeyValueStore>,
        generation: Arc<dyn QuestionGenerationService>,
        fallback: Option<Arc<dyn QuestionGenerationService>>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let history = Arc::new(HistoryStore::with_key(
            store,
            config.history_storage_key.clone(),
        ));
        let analyzer = Arc::new(PreferenceAnalyzer::new(history.clone(), catalog.clone()));
        let decks = Arc::new(DeckBuilder::new(history.clone(), catalog.clone()));

        let mut generator = QuestionGenerator::new(
            generation,
            analyzer.clone(),
            history.clone(),
            catalog.clone(),
        )
        .with_timeout(config.generation_timeout);
        if let Some(fallback) = fallback {
            generator = generator.with_fallback(fallback);
        }

        Self {
            config,
            catalog,
            history,
            analyzer,
            decks,
            generator: Arc::new(generator),
        }
    }
}
