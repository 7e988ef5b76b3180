//! crates/conversation_deck_core/src/ports.rs
//!
//! Defines the service contracts (traits) the engine depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the concrete key-value store and question generation API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Category;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Request timed out")]
    Timeout,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

/// A string key-value store holding the serialized history blob.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    /// Overwrites any existing value under `key`.
    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;
}

//=========================================================================================
// Question Generation Port
//=========================================================================================

/// The payload sent to a question generation backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub category: Category,
    pub count: usize,
    /// Free-form summary of what the user enjoys. Opaque to the engine.
    pub preference_context: String,
    pub sample_questions: Vec<String>,
}

/// A question returned by a generation backend, before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub category: Category,
    #[serde(alias = "question")]
    pub text: String,
}

#[async_trait]
pub trait QuestionGenerationService: Send + Sync {
    /// Produces new questions for the requested category.
    ///
    /// Implementations report every kind of failure (network, non-success status,
    /// malformed payload) as a `PortError`. An empty list is treated as a failure
    /// by the caller.
    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> PortResult<Vec<GeneratedQuestion>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_port_error_has_a_readable_message() {
        let cases = [
            (
                PortError::Unexpected("API error: 502".to_string()),
                "An unexpected error occurred: API error: 502",
            ),
            (PortError::Timeout, "Request timed out"),
        ];
        for (error, message) in cases {
            // Exhaustive, so a new variant has to be added to the cases above.
            match &error {
                PortError::Unexpected(_) | PortError::Timeout => {}
            }
            assert_eq!(error.to_string(), message);
        }
    }
}
