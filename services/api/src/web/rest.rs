//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::{
    parse_categories, parse_category, CategoriesRequest, DeckMode, DeckRequest, GenerateRequest,
    SwipeRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use conversation_deck_core::deck::{AvailabilityStats, DeckBuildResult, DeckStats};
use conversation_deck_core::domain::{Category, CategoryStats, LengthRange, Question, UserPreferences};
use conversation_deck_core::generation::BatchGenerationResult;
use conversation_deck_core::history::AllStats;
use conversation_deck_core::preferences::{AiOffer, CategoryEngagement};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::OpenApi;

type HandlerResult<T> = Result<Json<T>, (StatusCode, String)>;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        deck_handler,
        deck_stats_handler,
        offer_handler,
        engagement_handler,
        stats_handler,
        swipe_handler,
        preferences_handler,
        preference_context_handler,
        generate_handler,
        clear_history_handler,
    ),
    components(
        schemas(
            DeckMode, DeckRequest, CategoriesRequest, SwipeRequest, GenerateRequest,
            DeckBuildResult, DeckStats, AvailabilityStats, AiOffer, CategoryEngagement,
            AllStats, CategoryStats, UserPreferences, LengthRange, BatchGenerationResult,
            Category, Question,
        )
    ),
    tags(
        (name = "Conversation Deck API", description = "Deck building, swipe tracking and question generation.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the API router over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/deck", post(deck_handler))
        .route("/deck/stats", post(deck_stats_handler))
        .route("/offer", post(offer_handler))
        .route("/categories/{category}/engagement", get(engagement_handler))
        .route("/stats", get(stats_handler))
        .route("/swipes", post(swipe_handler))
        .route("/preferences", get(preferences_handler))
        .route("/preferences/context", get(preference_context_handler))
        .route("/generate", post(generate_handler))
        .route("/history", delete(clear_history_handler))
        .with_state(app_state)
}

//=========================================================================================
// Deck Handlers
//=========================================================================================

/// Deal a deck for the selected categories.
///
/// Every deck ends with the "Cards finished" card (id `-1`).
#[utoipa::path(
    post,
    path = "/deck",
    request_body = DeckRequest,
    responses(
        (status = 200, description = "The dealt deck and its composition", body = DeckBuildResult),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn deck_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<DeckRequest>,
) -> HandlerResult<DeckBuildResult> {
    let categories = parse_categories(&payload.categories)?;
    let result = match payload.mode {
        DeckMode::Smart => app_state.decks.build_smart_deck(&categories).await,
        DeckMode::Fresh => app_state.decks.build_fresh_deck(&categories).await,
        DeckMode::Full => app_state.decks.build_full_deck(&categories).await,
    };
    debug!(mode = ?payload.mode, cards = result.deck.len(), "Dealt deck");
    Ok(Json(result))
}

/// How many questions are left unseen in the selected categories.
#[utoipa::path(
    post,
    path = "/deck/stats",
    request_body = CategoriesRequest,
    responses(
        (status = 200, description = "Seen and unseen counts", body = AvailabilityStats),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn deck_stats_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CategoriesRequest>,
) -> HandlerResult<AvailabilityStats> {
    let categories = parse_categories(&payload.categories)?;
    Ok(Json(app_state.decks.deck_stats(&categories).await))
}

/// Whether the user has seen enough to be offered generated questions.
#[utoipa::path(
    post,
    path = "/offer",
    request_body = CategoriesRequest,
    responses(
        (status = 200, description = "The offer decision and the seen percentage", body = AiOffer),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn offer_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CategoriesRequest>,
) -> HandlerResult<AiOffer> {
    let categories = parse_categories(&payload.categories)?;
    Ok(Json(
        app_state.analyzer.should_offer_ai_questions(&categories).await,
    ))
}

//=========================================================================================
// History and Preference Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/categories/{category}/engagement",
    params(
        ("category" = String, Path, description = "Category name, URL-encoded (e.g. `real%20talk`).")
    ),
    responses(
        (status = 200, description = "Engagement score for the category", body = CategoryEngagement),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn engagement_handler(
    State(app_state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> HandlerResult<CategoryEngagement> {
    let category = parse_category(&category)?;
    Ok(Json(app_state.analyzer.category_engagement(category).await))
}

/// Totals across every category.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Seen, liked and skipped totals", body = AllStats))
)]
pub async fn stats_handler(State(app_state): State<Arc<AppState>>) -> Json<AllStats> {
    Json(app_state.history.all_stats().await)
}

/// Record a like or skip. Returns the updated stats of the swiped category.
#[utoipa::path(
    post,
    path = "/swipes",
    request_body = SwipeRequest,
    responses(
        (status = 200, description = "Updated category stats", body = CategoryStats),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn swipe_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SwipeRequest>,
) -> HandlerResult<CategoryStats> {
    let category = parse_category(&payload.category)?;
    let history = app_state
        .history
        .record_swipe(
            payload.question_id,
            category,
            payload.action,
            payload.question_length,
        )
        .await;
    Ok(Json(history.stats(category).clone()))
}

/// Recompute and persist the preference profile.
#[utoipa::path(
    get,
    path = "/preferences",
    responses((status = 200, description = "The current preference profile", body = UserPreferences))
)]
pub async fn preferences_handler(State(app_state): State<Arc<AppState>>) -> Json<UserPreferences> {
    Json(app_state.analyzer.analyze_preferences().await)
}

/// The preference summary sent to the generation backend.
#[utoipa::path(
    get,
    path = "/preferences/context",
    responses((status = 200, description = "Preference context", content_type = "text/plain", body = String))
)]
pub async fn preference_context_handler(State(app_state): State<Arc<AppState>>) -> String {
    app_state.analyzer.generate_preference_context().await
}

/// Forget every swipe, preference and generated question.
#[utoipa::path(
    delete,
    path = "/history",
    responses((status = 204, description = "History cleared"))
)]
pub async fn clear_history_handler(State(app_state): State<Arc<AppState>>) -> StatusCode {
    app_state.history.clear_history().await;
    info!("History cleared");
    StatusCode::NO_CONTENT
}

//=========================================================================================
// Generation Handler
//=========================================================================================

/// Generate new questions for each selected category.
///
/// Failures are reported per category in `errors`; the request itself only
/// fails on invalid input.
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Per-category generation summary", body = BatchGenerationResult),
        (status = 400, description = "Unknown category or zero count")
    )
)]
pub async fn generate_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> HandlerResult<BatchGenerationResult> {
    let categories = parse_categories(&payload.categories)?;
    let count = payload
        .count
        .unwrap_or(app_state.config.questions_per_batch);
    if count == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "count must be at least 1".to_string(),
        ));
    }

    let result = app_state
        .generator
        .generate_for_categories(&categories, count)
        .await;
    info!(
        total = result.total_generated,
        errors = result.errors.len(),
        "Generation batch finished"
    );
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockGenerationAdapter;
    use crate::config::Config;
    use conversation_deck_core::catalog::QuestionCatalog;
    use conversation_deck_core::deck::Card;
    use conversation_deck_core::domain::SwipeAction;
    use conversation_deck_core::memory::InMemoryStore;

    const CATALOG: &str = r#"[
        {"id": 1, "category": "chill", "question": "Favorite snack?"},
        {"id": 2, "category": "chill", "question": "Best road trip song?"},
        {"id": 3, "category": "dating", "question": "What makes a great first date?"}
    ]"#;

    fn state() -> Arc<AppState> {
        let config = Arc::new(Config::from_lookup(|_| None).unwrap());
        Arc::new(AppState::new(
            config,
            QuestionCatalog::from_json(CATALOG).unwrap(),
            Arc::new(InMemoryStore::new()),
            Arc::new(MockGenerationAdapter::new()),
            None,
        ))
    }

    fn categories(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let err = deck_handler(
            State(state()),
            Json(DeckRequest {
                categories: categories(&["chill", "gossip"]),
                mode: DeckMode::Smart,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn swipes_feed_stats_and_fresh_decks() {
        let app_state = state();

        let Json(stats) = swipe_handler(
            State(app_state.clone()),
            Json(SwipeRequest {
                question_id: 1,
                category: "chill".to_string(),
                action: SwipeAction::Liked,
                question_length: 15,
            }),
        )
        .await
        .unwrap();
        assert_eq!(stats.total_seen, 1);
        assert_eq!(stats.liked, 1);

        let Json(result) = deck_handler(
            State(app_state.clone()),
            Json(DeckRequest {
                categories: categories(&["chill"]),
                mode: DeckMode::Fresh,
            }),
        )
        .await
        .unwrap();
        assert_eq!(result.deck.len(), 2);
        assert_eq!(result.deck[0].id(), 2);
        assert_eq!(result.deck[1], Card::Finished);

        let Json(totals) = stats_handler(State(app_state)).await;
        assert_eq!(totals.total_seen, 1);
    }

    #[tokio::test]
    async fn generated_questions_are_stored_with_fresh_ids() {
        let app_state = state();

        let Json(batch) = generate_handler(
            State(app_state.clone()),
            Json(GenerateRequest {
                categories: categories(&["dating"]),
                count: Some(2),
            }),
        )
        .await
        .unwrap();
        assert!(batch.success);
        assert_eq!(batch.total_generated, 2);
        assert_eq!(batch.by_category[&Category::Dating], 2);
        assert_eq!(batch.by_category[&Category::Chill], 0);

        let stored = app_state.history.generated_questions(&[Category::Dating]).await;
        assert_eq!(stored.iter().map(|q| q.id).collect::<Vec<_>>(), vec![10_000, 10_001]);
        assert!(stored.iter().all(|q| q.is_generated));
    }

    #[tokio::test]
    async fn zero_count_is_rejected() {
        let err = generate_handler(
            State(state()),
            Json(GenerateRequest {
                categories: categories(&["chill"]),
                count: Some(0),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn clearing_history_resets_totals() {
        let app_state = state();
        let Json(stats) = swipe_handler(
            State(app_state.clone()),
            Json(SwipeRequest {
                question_id: 3,
                category: "dating".to_string(),
                action: SwipeAction::Skipped,
                question_length: 30,
            }),
        )
        .await
        .unwrap();
        assert_eq!(stats.skipped, 1);

        assert_eq!(clear_history_handler(State(app_state.clone())).await, StatusCode::NO_CONTENT);
        let Json(totals) = stats_handler(State(app_state)).await;
        assert_eq!(totals.total_seen, 0);
    }

    #[test]
    fn openapi_document_describes_response_bodies() {
        let doc = ApiDoc::openapi();
        let schemas = doc.components.expect("components").schemas;
        for name in [
            "DeckBuildResult",
            "AvailabilityStats",
            "AiOffer",
            "CategoryEngagement",
            "AllStats",
            "CategoryStats",
            "UserPreferences",
            "BatchGenerationResult",
        ] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }

        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(
            json["paths"]["/deck"]["post"]["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/DeckBuildResult"
        );
        assert_eq!(
            json["paths"]["/swipes"]["post"]["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/CategoryStats"
        );
    }

    #[test]
    fn openapi_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/deck", "/deck/stats", "/offer", "/swipes", "/generate", "/history"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
