use crate::agent::ChatAgent;
use crate::config::moods::{ Mood, ParseMoodError };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{ routing::get, Router, extract::{ Path, State }, http::StatusCode, Json };
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

#[derive(Serialize, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: String,
    pub model: String,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct MoodPreset {
    pub mood: Mood,
    pub text: &'static str,
}

#[derive(Clone)]
struct AppState {
    agent: Arc<ChatAgent>,
}

pub fn router(agent: Arc<ChatAgent>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/moods", get(moods_handler))
        .route("/api/moods/{mood}", get(mood_handler))
        .layer(cors)
        .with_state(AppState { agent })
}

pub async fn start_http_server(
    http_port: u16,
    agent: Arc<ChatAgent>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(agent);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            error!("HTTP server error: {}", e);
        }
    });

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.agent.llm_type().to_string(),
        model: state.agent.model(),
    })
}

async fn moods_handler() -> Json<Vec<MoodPreset>> {
    Json(mood_presets())
}

async fn mood_handler(
    Path(name): Path<String>,
) -> Result<Json<MoodPreset>, (StatusCode, String)> {
    mood_preset(&name)
        .map(Json)
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))
}

/// Looks a preset up by its mood name, case-insensitively.
pub fn mood_preset(name: &str) -> Result<MoodPreset, ParseMoodError> {
    let mood: Mood = name.parse()?;
    Ok(MoodPreset { mood, text: mood.preset_text() })
}

pub fn mood_presets() -> Vec<MoodPreset> {
    Mood::ALL
        .iter()
        .map(|mood| MoodPreset { mood: *mood, text: mood.preset_text() })
        .collect()
}
