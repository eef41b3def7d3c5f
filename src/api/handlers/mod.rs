use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::db::SaveOutcome;
use crate::models::*;
use crate::synth::{CompletionError, SynthError};
use crate::transcripts::{TranscriptError, TranscriptSummary};

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn meeting_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Meeting not found".to_string())
}

/// Map a generation failure to a status. Upstream bodies are logged, not echoed.
fn generation_error(e: SynthError) -> (StatusCode, String) {
    match e {
        SynthError::InvalidInput(msg) => {
            tracing::warn!("Rejected generation request: {}", msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        SynthError::Completion(CompletionError::Configuration) => {
            tracing::error!("Generation requested but no completion API key is configured");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Completion service is not configured".to_string(),
            )
        }
        SynthError::Completion(CompletionError::Upstream { status, body }) => {
            tracing::error!("Completion endpoint returned {}: {}", status, body);
            (
                StatusCode::BAD_GATEWAY,
                format!("Completion service returned {}", status),
            )
        }
        e @ SynthError::IncompleteGeneration { .. } => {
            tracing::error!("{}", e);
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
        e => {
            tracing::error!("Generation failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                "Completion service request failed".to_string(),
            )
        }
    }
}

fn transcript_error(e: TranscriptError) -> (StatusCode, String) {
    match e {
        TranscriptError::Configuration => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Transcription service is not configured".to_string(),
        ),
        TranscriptError::NotFound(id) => {
            (StatusCode::NOT_FOUND, format!("Transcript not found: {}", id))
        }
        e => {
            tracing::error!("Transcription service error: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                "Transcription service request failed".to_string(),
            )
        }
    }
}

/// Whether a generation result was saved. Failures are logged; the caller
/// still returns the generated content.
fn persisted(meeting_id: Uuid, outcome: anyhow::Result<SaveOutcome>) -> bool {
    match outcome {
        Ok(SaveOutcome::Saved(_)) => true,
        Ok(SaveOutcome::NotFound) => {
            tracing::warn!(%meeting_id, "Meeting deleted before generation result was saved");
            false
        }
        Ok(SaveOutcome::Conflict { current_version }) => {
            tracing::warn!(
                %meeting_id,
                current_version,
                "Meeting changed during generation, result not saved"
            );
            false
        }
        Err(e) => {
            tracing::error!(%meeting_id, "Failed to save generation result: {}", e);
            false
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Meetings
// ============================================================

pub async fn list_meetings(
    State(state): State<AppState>,
) -> Result<Json<Vec<Meeting>>, (StatusCode, String)> {
    state.db.get_all_meetings().map(Json).map_err(internal_error)
}

pub async fn get_meeting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Meeting>, (StatusCode, String)> {
    state
        .db
        .get_meeting(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(meeting_not_found)
}

pub async fn create_meeting(
    State(state): State<AppState>,
    Json(input): Json<CreateMeetingInput>,
) -> Result<(StatusCode, Json<Meeting>), (StatusCode, String)> {
    if input.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required".to_string()));
    }
    state
        .db
        .create_meeting(input)
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(internal_error)
}

pub async fn update_meeting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMeetingInput>,
) -> Result<Json<Meeting>, (StatusCode, String)> {
    state
        .db
        .update_meeting(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(meeting_not_found)
}

pub async fn delete_meeting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.db.delete_meeting(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(meeting_not_found())
    }
}

// ============================================================
// Generation
// ============================================================

pub async fn generate_project_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<GeneratePlanInput>,
) -> Result<Json<GeneratedDocument>, (StatusCode, String)> {
    let _guard = state.locks.acquire(id).await;
    let meeting = state
        .db
        .get_meeting(id)
        .map_err(internal_error)?
        .ok_or_else(meeting_not_found)?;

    let content = state
        .synth
        .generate_project_plan(&meeting, input.duration_weeks, &input.additional_details)
        .await
        .map_err(generation_error)?;

    let persisted = persisted(
        id,
        state.db.save_project_plan(id, meeting.version, &content),
    );
    Ok(Json(GeneratedDocument { content, persisted }))
}

pub async fn generate_backlog(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<GenerateBacklogInput>,
) -> Result<Json<GeneratedDocument>, (StatusCode, String)> {
    let _guard = state.locks.acquire(id).await;
    let meeting = state
        .db
        .get_meeting(id)
        .map_err(internal_error)?
        .ok_or_else(meeting_not_found)?;

    let content = state
        .synth
        .generate_backlog(&meeting, &input.additional_details)
        .await
        .map_err(generation_error)?;

    let persisted = persisted(id, state.db.save_backlog(id, meeting.version, &content));
    Ok(Json(GeneratedDocument { content, persisted }))
}

pub async fn generate_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedFiles>, (StatusCode, String)> {
    let _guard = state.locks.acquire(id).await;
    let meeting = state
        .db
        .get_meeting(id)
        .map_err(internal_error)?
        .ok_or_else(meeting_not_found)?;

    let files = state
        .synth
        .generate_files(&meeting)
        .await
        .map_err(generation_error)?;

    let persisted = persisted(id, state.db.save_files(id, meeting.version, &files));
    Ok(Json(GeneratedFiles { files, persisted }))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FileResult>>, (StatusCode, String)> {
    state
        .db
        .get_meeting(id)
        .map_err(internal_error)?
        .map(|m| Json(m.generated_files))
        .ok_or_else(meeting_not_found)
}

pub async fn update_file(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
    Json(input): Json<UpdateFileInput>,
) -> Result<Json<FileResult>, (StatusCode, String)> {
    let _guard = state.locks.acquire(id).await;
    let meeting = state
        .db
        .update_file(id, &name, &input.content)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "File not found".to_string()))?;

    meeting
        .generated_files
        .into_iter()
        .find(|f| f.is_named(&name))
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "File not found".to_string()))
}

// ============================================================
// Transcripts
// ============================================================

/// Query parameters for listing transcripts.
#[derive(Debug, Deserialize)]
pub struct ListTranscriptsQuery {
    /// Maximum number of transcripts to return. Defaults to 20.
    pub limit: Option<u32>,
}

pub async fn list_transcripts(
    State(state): State<AppState>,
    Query(query): Query<ListTranscriptsQuery>,
) -> Result<Json<Vec<TranscriptSummary>>, (StatusCode, String)> {
    state
        .transcripts
        .list_transcripts(query.limit.unwrap_or(20))
        .await
        .map(Json)
        .map_err(transcript_error)
}

pub async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptSummary>, (StatusCode, String)> {
    state
        .transcripts
        .get_transcript(&id)
        .await
        .map(Json)
        .map_err(transcript_error)
}

/// Create a meeting from a transcript, or return the one already imported.
pub async fn import_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ImportResult>), (StatusCode, String)> {
    if let Some(meeting) = state
        .db
        .get_meeting_by_transcript(&id)
        .map_err(internal_error)?
    {
        return Ok((
            StatusCode::OK,
            Json(ImportResult {
                meeting,
                created: false,
            }),
        ));
    }

    let transcript = state
        .transcripts
        .get_transcript(&id)
        .await
        .map_err(transcript_error)?;

    let title = if transcript.title.trim().is_empty() {
        "Untitled meeting".to_string()
    } else {
        transcript.title.trim().to_string()
    };

    let created = state.db.create_meeting(CreateMeetingInput {
        title,
        transcript_id: Some(transcript.id.clone()),
        summary: transcript.summary_text(),
        ..Default::default()
    });
    let meeting = match created {
        Ok(meeting) => meeting,
        Err(e) => {
            // A concurrent import of the same transcript won the insert
            let existing = state
                .db
                .get_meeting_by_transcript(&transcript.id)
                .map_err(internal_error)?;
            return match existing {
                Some(meeting) => {
                    tracing::debug!(transcript_id = %id, "Transcript imported concurrently");
                    Ok((
                        StatusCode::OK,
                        Json(ImportResult {
                            meeting,
                            created: false,
                        }),
                    ))
                }
                None => Err(internal_error(e)),
            };
        }
    };

    tracing::info!(meeting_id = %meeting.id, transcript_id = %id, "Imported transcript");
    Ok((
        StatusCode::CREATED,
        Json(ImportResult {
            meeting,
            created: true,
        }),
    ))
}
