use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::file::FileResult;

/// A meeting and everything synthesized from it.
///
/// Source fields (`summary`, `functional_doc`, `mockups`, `markdown`,
/// `project_plan`) are the inputs to generation. The `generated_*` fields
/// are outputs. Editing a source field does not invalidate outputs that
/// were generated from an earlier value.
///
/// `version` increases on every write and backs the optimistic check used
/// when generation results are saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub title: String,
    /// Identifier of the transcript this meeting was imported from, if any.
    pub transcript_id: Option<String>,
    pub summary: String,
    pub functional_doc: String,
    pub mockups: String,
    pub markdown: String,
    pub project_plan: String,
    pub generated_project_plan: Option<String>,
    pub generated_backlog: Option<String>,
    pub generated_files: Vec<FileResult>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new meeting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMeetingInput {
    pub title: String,
    #[serde(default)]
    pub transcript_id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub functional_doc: String,
    #[serde(default)]
    pub mockups: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub project_plan: String,
}

/// Input for updating a meeting. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMeetingInput {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub functional_doc: Option<String>,
    pub mockups: Option<String>,
    pub markdown: Option<String>,
    pub project_plan: Option<String>,
}
