//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads the REST API accepts. Categories arrive as plain
//! strings and are validated here so unknown names become a 400 instead of a
//! generic deserialization failure.

use axum::http::StatusCode;
use conversation_deck_core::domain::{Category, QuestionId, SwipeAction};
use serde::Deserialize;
use utoipa::ToSchema;

//=========================================================================================
// Request Payloads
//=========================================================================================

/// Which kind of deck to deal.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeckMode {
    /// Unseen questions first, then generated ones, then previously seen ones.
    #[default]
    Smart,
    /// Only questions never shown before.
    Fresh,
    /// Every question in the selected categories.
    Full,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct DeckRequest {
    /// Category names, e.g. `"chill"` or `"real talk"`.
    pub categories: Vec<String>,
    #[serde(default)]
    pub mode: DeckMode,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CategoriesRequest {
    pub categories: Vec<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub question_id: QuestionId,
    pub category: String,
    /// `"liked"` or `"skipped"`.
    #[schema(value_type = String)]
    pub action: SwipeAction,
    pub question_length: usize,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct GenerateRequest {
    pub categories: Vec<String>,
    /// Questions per category. Defaults to the configured batch size.
    pub count: Option<usize>,
}

//=========================================================================================
// Validation Helpers
//=========================================================================================

pub fn parse_category(name: &str) -> Result<Category, (StatusCode, String)> {
    name.parse::<Category>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// Parses every name, rejecting the whole list on the first unknown one.
pub fn parse_categories(names: &[String]) -> Result<Vec<Category>, (StatusCode, String)> {
    names.iter().map(|name| parse_category(name)).collect()
}
