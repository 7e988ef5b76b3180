pub mod catalog;
pub mod deck;
pub mod domain;
pub mod generation;
pub mod history;
pub mod memory;
pub mod ports;
pub mod preferences;

pub use catalog::{CatalogError, QuestionCatalog};
pub use deck::{AvailabilityStats, Card, DeckBuildResult, DeckBuilder, DeckConfig, DeckStats};
pub use domain::{
    Category, CategoryStats, HistoryData, Question, QuestionId, SwipeAction, SwipeRecord,
    UnknownCategory, UserPreferences,
};
pub use generation::{BatchGenerationResult, GenerationResult, QuestionGenerator};
pub use history::{AllStats, HistoryStore};
pub use memory::InMemoryStore;
pub use ports::{
    GeneratedQuestion, GenerationRequest, KeyValueStore, PortError, PortResult,
    QuestionGenerationService,
};
pub use preferences::{AiOffer, CategoryEngagement, PreferenceAnalyzer};
