//! services/api/src/adapters/generation_http.rs
//!
//! Calls the remote question generation API (`POST {base}/api/generate`).

use async_trait::async_trait;
use conversation_deck_core::domain::Category;
use conversation_deck_core::ports::{
    GeneratedQuestion, GenerationRequest, PortError, PortResult, QuestionGenerationService,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub struct HttpGenerationAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGenerationAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
        })
    }
}

//=========================================================================================
// Wire Format
//=========================================================================================

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    questions: Vec<WireQuestion>,
}

#[derive(Deserialize)]
struct WireQuestion {
    #[serde(default)]
    category: Option<String>,
    #[serde(alias = "text")]
    question: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

//=========================================================================================
// The Port Implementation
//=========================================================================================

#[async_trait]
impl QuestionGenerationService for HttpGenerationAdapter {
    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> PortResult<Vec<GeneratedQuestion>> {
        debug!(endpoint = %self.endpoint, category = %request.category, "Requesting generated questions");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("API error: {}", status.as_u16()));
            return Err(PortError::Unexpected(message));
        }

        let body: GenerateResponse = response.json().await.map_err(map_transport_error)?;
        if !body.success || body.questions.is_empty() {
            return Err(PortError::Unexpected("No questions generated".to_string()));
        }

        Ok(body
            .questions
            .into_iter()
            .map(|q| GeneratedQuestion {
                // Unknown or missing categories are filed under the one requested.
                category: q
                    .category
                    .and_then(|c| c.parse::<Category>().ok())
                    .unwrap_or(request.category),
                text: q.question,
            })
            .collect())
    }
}

fn map_transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout
    } else {
        PortError::Unexpected(format!("Network error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn request() -> GenerationRequest {
        GenerationRequest {
            category: Category::Dating,
            count: 2,
            preference_context: "User Preference Profile:".to_string(),
            sample_questions: vec!["Best first date?".to_string()],
        }
    }

    #[tokio::test]
    async fn posts_the_request_and_parses_questions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJsonString(
                r#"{"category": "dating", "count": 2, "sampleQuestions": ["Best first date?"]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success": true, "questions": [
                    {"category": "dating", "question": "What made you swipe right?"},
                    {"category": "space travel", "question": "Mars or the Moon?"}
                ]}"#,
            )
            .create_async()
            .await;

        let adapter = HttpGenerationAdapter::new(&server.url(), Duration::from_secs(5)).unwrap();
        let questions = adapter.generate_questions(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "What made you swipe right?");
        assert_eq!(questions[1].category, Category::Dating);
    }

    #[tokio::test]
    async fn error_status_uses_the_body_message_when_present() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let adapter = HttpGenerationAdapter::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = adapter.generate_questions(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "An unexpected error occurred: Rate limit exceeded");
    }

    #[tokio::test]
    async fn error_status_without_body_reports_the_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let adapter = HttpGenerationAdapter::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = adapter.generate_questions(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "An unexpected error occurred: API error: 500");
    }

    #[tokio::test]
    async fn unsuccessful_payload_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"success": false, "questions": []}"#)
            .create_async()
            .await;

        let adapter = HttpGenerationAdapter::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = adapter.generate_questions(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "An unexpected error occurred: No questions generated");
    }
}
