mod handlers;
pub mod middleware;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::db::Database;
use crate::synth::Synthesizer;
use crate::transcripts::TranscriptClient;

use middleware::SecurityConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub synth: Arc<Synthesizer>,
    pub transcripts: TranscriptClient,
    pub locks: GenerationLocks,
}

impl AppState {
    pub fn new(db: Database, synth: Synthesizer, transcripts: TranscriptClient) -> Self {
        Self {
            db,
            synth: Arc::new(synth),
            transcripts,
            locks: GenerationLocks::default(),
        }
    }
}

/// One async lock per meeting, held for a whole generate-and-save so two
/// requests for the same meeting cannot overwrite each other.
#[derive(Clone, Default)]
pub struct GenerationLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl GenerationLocks {
    pub async fn acquire(&self, meeting_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("generation locks poisoned");
            // Entries only referenced by the map are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(meeting_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of meetings with a held or awaited lock.
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().expect("generation locks poisoned");
        locks
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

pub fn create_router(state: AppState, security: SecurityConfig) -> Router {
    let mut api = Router::new()
        // Meetings
        .route("/meetings", get(handlers::list_meetings))
        .route("/meetings", post(handlers::create_meeting))
        .route("/meetings/{id}", get(handlers::get_meeting))
        .route("/meetings/{id}", put(handlers::update_meeting))
        .route("/meetings/{id}", axum::routing::delete(handlers::delete_meeting))
        // Generation
        .route("/meetings/{id}/project-plan", post(handlers::generate_project_plan))
        .route("/meetings/{id}/backlog", post(handlers::generate_backlog))
        .route("/meetings/{id}/files", post(handlers::generate_files))
        .route("/meetings/{id}/files", get(handlers::list_files))
        .route("/meetings/{id}/files/{name}", put(handlers::update_file))
        // Transcription service proxy
        .route("/transcripts", get(handlers::list_transcripts))
        .route("/transcripts/{id}", get(handlers::get_transcript))
        .route("/transcripts/{id}/import", post(handlers::import_transcript))
        .with_state(state);

    if let Some(limiter) = security.rate_limiter.clone() {
        api = api.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }
    if security.api_key.is_some() {
        api = api.layer(axum::middleware::from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ));
    }

    // Health stays reachable without credentials
    let api = api.route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&security))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
