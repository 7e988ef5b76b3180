//! crates/conversation_deck_core/src/catalog.rs
//!
//! The read-only base question catalog, loaded once at startup.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::domain::{Category, Question, QuestionId, MAX_BASE_QUESTION_ID};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to parse the question catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Base question id {0} is outside 0..=9999")]
    IdOutOfRange(QuestionId),
    #[error("Duplicate base question id {0}")]
    DuplicateId(QuestionId),
}

/// The fixed set of base questions. Never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Builds a catalog, rejecting ids that could collide with generated questions.
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::with_capacity(questions.len());
        let mut base = Vec::with_capacity(questions.len());

        for mut question in questions {
            if !(0..=MAX_BASE_QUESTION_ID).contains(&question.id) {
                return Err(CatalogError::IdOutOfRange(question.id));
            }
            if !ids.insert(question.id) {
                return Err(CatalogError::DuplicateId(question.id));
            }
            question.is_generated = false;
            question.generated_at = None;
            base.push(question);
        }

        Ok(Self { questions: base })
    }

    /// Parses a JSON array of `{id, category, question}` records.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Self::new(questions)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn find(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// Base questions belonging to any of the given categories, in catalog order.
    pub fn in_categories(&self, categories: &[Category]) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|question| categories.contains(&question.category))
            .cloned()
            .collect()
    }

    pub fn count_in(&self, category: Category) -> usize {
        self.questions
            .iter()
            .filter(|question| question.category == category)
            .count()
    }

    /// Up to `count` random question texts from one category.
    pub fn sample_texts<R: Rng + ?Sized>(
        &self,
        category: Category,
        count: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let in_category: Vec<&Question> = self
            .questions
            .iter()
            .filter(|question| question.category == category)
            .collect();

        in_category
            .choose_multiple(rng, count)
            .map(|question| question.text.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CATALOG: &str = r#"[
        {"id": 0, "category": "chill", "question": "Favorite snack?"},
        {"id": 1, "category": "dating", "question": "Best first date?"},
        {"id": 2, "category": "dating", "text": "Worst first date?"}
    ]"#;

    #[test]
    fn loads_and_filters_by_category() {
        let catalog = QuestionCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.count_in(Category::Dating), 2);
        assert_eq!(catalog.count_in(Category::Sex), 0);

        let dating = catalog.in_categories(&[Category::Dating]);
        assert_eq!(dating.iter().map(|q| q.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(catalog.find(2).map(|q| q.text.as_str()), Some("Worst first date?"));
    }

    #[test]
    fn rejects_ids_that_collide_with_generated_space() {
        let json = r#"[{"id": 10000, "category": "chill", "question": "Too high"}]"#;
        assert!(matches!(
            QuestionCatalog::from_json(json),
            Err(CatalogError::IdOutOfRange(10000))
        ));

        let json = r#"[
            {"id": 4, "category": "chill", "question": "One"},
            {"id": 4, "category": "sex", "question": "Two"}
        ]"#;
        assert!(matches!(
            QuestionCatalog::from_json(json),
            Err(CatalogError::DuplicateId(4))
        ));
    }

    #[test]
    fn rejects_unknown_categories() {
        let json = r#"[{"id": 1, "category": "karaoke", "question": "Sing?"}]"#;
        assert!(matches!(
            QuestionCatalog::from_json(json),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn samples_only_from_the_requested_category() {
        let catalog = QuestionCatalog::from_json(CATALOG).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let samples = catalog.sample_texts(Category::Dating, 8, &mut rng);
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|text| text.contains("first date")));
    }
}
