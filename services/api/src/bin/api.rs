//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, HttpGenerationAdapter, MockGenerationAdapter, OpenAiGenerationAdapter},
    config::{Config, GenerationMode},
    error::ApiError,
    web::{rest::ApiDoc, router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{header::CONTENT_TYPE, Method};
use axum::Router;
use conversation_deck_core::catalog::QuestionCatalog;
use conversation_deck_core::ports::QuestionGenerationService;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Load the Question Catalog ---
    let catalog_json = tokio::fs::read_to_string(&config.catalog_path).await?;
    let catalog = QuestionCatalog::from_json(&catalog_json)?;
    info!(
        "Loaded {} base questions from {}",
        catalog.len(),
        config.catalog_path.display()
    );

    // --- 4. Initialize the Generation Backend ---
    let mock: Arc<dyn QuestionGenerationService> = Arc::new(MockGenerationAdapter::new());
    let generation: Arc<dyn QuestionGenerationService> = match config.generation_mode {
        GenerationMode::Mock => mock.clone(),
        GenerationMode::Http => Arc::new(HttpGenerationAdapter::new(
            &config.generation_base_url,
            config.generation_timeout,
        )?),
        GenerationMode::OpenAi => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            Arc::new(OpenAiGenerationAdapter::new(
                openai_client,
                config.generation_model.clone(),
            )?)
        }
    };
    let fallback = (config.mock_fallback && config.generation_mode != GenerationMode::Mock)
        .then(|| mock.clone());
    info!(mode = ?config.generation_mode, fallback = fallback.is_some(), "Question generation ready");

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        catalog,
        db_adapter,
        generation,
        fallback,
    ));

    // --- 6. Create the Web Router ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
