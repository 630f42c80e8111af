use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use frontdesk::config::AppConfig;
use frontdesk::db;
use frontdesk::handlers;
use frontdesk::services::ai::ollama::OllamaProvider;
use frontdesk::services::ai::openai::OpenAiProvider;
use frontdesk::services::ai::LlmProvider;
use frontdesk::services::decision::PlannerAgent;
use frontdesk::services::pms::http::HttpPmsClient;
use frontdesk::services::pms::PmsClient;
use frontdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "openai" => {
            anyhow::ensure!(
                !config.llm_api_key.is_empty(),
                "LLM_API_KEY must be set when LLM_PROVIDER=openai"
            );
            tracing::info!("using OpenAI-compatible planner (model: {})", config.llm_model);
            Box::new(OpenAiProvider::new(
                config.llm_base_url.clone(),
                config.llm_api_key.clone(),
                config.llm_model.clone(),
            ))
        }
        _ => {
            tracing::info!("using Ollama planner (url: {})", config.ollama_url);
            Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            ))
        }
    };

    let pms: Arc<dyn PmsClient> = Arc::new(HttpPmsClient::new(
        config.pms_base_url.clone(),
        config.pms_api_key.clone(),
    ));

    // Probe the practice API so a bad base URL or key shows up in the logs
    // at startup instead of mid-call.
    match pms.list_operatories().await {
        Ok(operatories) => {
            tracing::info!(operatories = operatories.len(), "practice API reachable")
        }
        Err(e) => tracing::warn!(error = %e, "practice API probe failed, continuing anyway"),
    }

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        decision: Arc::new(PlannerAgent::new(llm, pms)),
        pending_calls: Mutex::new(HashMap::new()),
        sessions: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/voice/answer", post(handlers::voice::answer))
        .route("/voice/media", get(handlers::media::media_ws))
        .route("/api/admin/sessions", get(handlers::admin::get_sessions))
        .route("/api/admin/calls", get(handlers::admin::get_calls))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
