//! crates/conversation_deck_core/src/generation.rs
//!
//! Drives the external question generation backend: builds the request from the
//! user's preferences, enforces the timeout, substitutes the fallback backend on
//! failure and merges successful results into the generated-question pool.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::catalog::QuestionCatalog;
use crate::domain::{Category, Question};
use crate::history::HistoryStore;
use crate::ports::{
    GeneratedQuestion, GenerationRequest, PortError, PortResult, QuestionGenerationService,
};
use crate::preferences::PreferenceAnalyzer;

pub const DEFAULT_QUESTIONS_PER_BATCH: usize = 5;
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
const SAMPLE_QUESTION_COUNT: usize = 8;

/// Outcome of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    /// The stored questions, with their assigned ids.
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of generating for several categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BatchGenerationResult {
    pub success: bool,
    pub total_generated: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub errors: Vec<String>,
}

pub struct QuestionGenerator {
    primary: Arc<dyn QuestionGenerationService>,
    fallback: Option<Arc<dyn QuestionGenerationService>>,
    analyzer: Arc<PreferenceAnalyzer>,
    history: Arc<HistoryStore>,
    catalog: Arc<QuestionCatalog>,
    timeout: Duration,
}

impl QuestionGenerator {
    pub fn new(
        primary: Arc<dyn QuestionGenerationService>,
        analyzer: Arc<PreferenceAnalyzer>,
        history: Arc<HistoryStore>,
        catalog: Arc<QuestionCatalog>,
    ) -> Self {
        Self {
            primary,
            fallback: None,
            analyzer,
            history,
            catalog,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Backend used when the primary one fails.
    pub fn with_fallback(mut self, fallback: Arc<dyn QuestionGenerationService>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn build_request(&self, category: Category, count: usize) -> GenerationRequest {
        let preference_context = self.analyzer.generate_preference_context().await;
        let sample_questions =
            self.catalog
                .sample_texts(category, SAMPLE_QUESTION_COUNT, &mut rand::thread_rng());

        GenerationRequest {
            category,
            count,
            preference_context,
            sample_questions,
        }
    }

    /// Generates and stores new questions for one category.
    pub async fn generate_questions(&self, category: Category, count: usize) -> GenerationResult {
        let request = self.build_request(category, count).await;

        let primary = request_questions(self.primary.as_ref(), &request, self.timeout).await;
        let outcome = match (primary, &self.fallback) {
            (Err(e), Some(fallback)) => {
                warn!(%category, "Question generation failed, falling back: {}", e);
                request_questions(fallback.as_ref(), &request, self.timeout).await
            }
            (outcome, _) => outcome,
        };

        match outcome {
            Ok(generated) => {
                let questions = self.history.store_generated_questions(generated).await;
                info!(%category, count = questions.len(), "Generated new questions");
                GenerationResult {
                    success: true,
                    questions,
                    error: None,
                }
            }
            Err(e) => {
                warn!(%category, "Question generation failed: {}", e);
                GenerationResult {
                    success: false,
                    questions: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Generates for each category in turn, collecting per-category counts and errors.
    pub async fn generate_for_categories(
        &self,
        categories: &[Category],
        count_per_category: usize,
    ) -> BatchGenerationResult {
        let mut by_category: BTreeMap<Category, usize> =
            Category::ALL.into_iter().map(|category| (category, 0)).collect();
        let mut errors = Vec::new();
        let mut total_generated = 0;

        for &category in categories {
            let result = self.generate_questions(category, count_per_category).await;
            if result.success {
                *by_category.entry(category).or_insert(0) += result.questions.len();
                total_generated += result.questions.len();
            } else if let Some(error) = result.error {
                errors.push(format!("{category}: {error}"));
            }
        }

        BatchGenerationResult {
            success: total_generated > 0,
            total_generated,
            by_category,
            errors,
        }
    }
}

/// Calls one backend under a timeout. Empty results count as failures.
async fn request_questions(
    service: &dyn QuestionGenerationService,
    request: &GenerationRequest,
    timeout: Duration,
) -> PortResult<Vec<GeneratedQuestion>> {
    match tokio::time::timeout(timeout, service.generate_questions(request)).await {
        Err(_) => Err(PortError::Timeout),
        Ok(Err(e)) => Err(e),
        Ok(Ok(questions)) if questions.is_empty() => {
            Err(PortError::Unexpected("No questions generated".to_string()))
        }
        Ok(Ok(questions)) => Ok(questions),
    }
}
