//! services/api/src/adapters/generation_llm.rs
//!
//! Generates questions directly with an OpenAI chat model, for deployments that
//! have an API key but no dedicated generation service.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use conversation_deck_core::ports::{
    GeneratedQuestion, GenerationRequest, PortError, PortResult, QuestionGenerationService,
};
use regex::Regex;

const SYSTEM_PROMPT: &str = "You write conversation starter questions for a card game played by friends and couples. \
Match the tone of the category and the sample questions. Each question must stand on its own, be under 150 characters \
and differ from the samples. Respond with ONLY the questions, one per line, no numbering, no commentary.";

pub struct OpenAiGenerationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    list_marker: Regex,
}

impl OpenAiGenerationAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: impl Into<String>) -> PortResult<Self> {
        // Leading "1.", "2)", "-" or "*" markers the model adds despite the prompt.
        let list_marker = Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*")
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Self {
            client,
            model: model.into(),
            list_marker,
        })
    }

    fn user_prompt(request: &GenerationRequest) -> String {
        let mut prompt = format!(
            "Category: {}\nWrite {} new questions.\n\n{}\n",
            request.category, request.count, request.preference_context
        );
        if !request.sample_questions.is_empty() {
            prompt.push_str("\nSample questions from this category:\n");
            for sample in &request.sample_questions {
                prompt.push_str(&format!("- {}\n", sample));
            }
        }
        prompt
    }

    /// Splits the completion into one question per non-empty line.
    fn parse_questions(&self, content: &str, count: usize) -> Vec<String> {
        content
            .lines()
            .map(|line| self.list_marker.replace(line, ""))
            .map(|line| line.trim().trim_matches('"').trim().to_string())
            .filter(|line| !line.is_empty())
            .take(count)
            .collect()
    }
}

#[async_trait]
impl QuestionGenerationService for OpenAiGenerationAdapter {
    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> PortResult<Vec<GeneratedQuestion>> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(Self::user_prompt(request))
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .temperature(0.9)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("No questions generated".to_string()))?;

        Ok(self
            .parse_questions(&content, request.count)
            .into_iter()
            .map(|text| GeneratedQuestion {
                category: request.category,
                text,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversation_deck_core::domain::Category;

    fn adapter() -> OpenAiGenerationAdapter {
        let client = Client::with_config(OpenAIConfig::new().with_api_key("sk-test"));
        OpenAiGenerationAdapter::new(client, "gpt-4o-mini").unwrap()
    }

    #[test]
    fn numbering_quotes_and_blank_lines_are_stripped() {
        let content = "1. What's your dream trip?\n\n2) \"Who taught you to cook?\"\n- Last song you cried to?\nBonus question?";
        assert_eq!(
            adapter().parse_questions(content, 3),
            vec![
                "What's your dream trip?".to_string(),
                "Who taught you to cook?".to_string(),
                "Last song you cried to?".to_string(),
            ]
        );
    }

    #[test]
    fn prompt_carries_context_and_samples() {
        let prompt = OpenAiGenerationAdapter::user_prompt(&GenerationRequest {
            category: Category::RealTalk,
            count: 5,
            preference_context: "User Preference Profile:\n- Preferred question length: ~80 characters".to_string(),
            sample_questions: vec!["What keeps you up at night?".to_string()],
        });
        assert!(prompt.starts_with("Category: real talk\nWrite 5 new questions."));
        assert!(prompt.contains("Preferred question length"));
        assert!(prompt.ends_with("- What keeps you up at night?\n"));
    }
}
