use serde::{Deserialize, Serialize};

use super::file::FileResult;
use super::meeting::Meeting;

/// A titled, prioritized chunk of prompt context. Priority 1 is highest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub priority: u32,
    pub title: String,
    pub content: String,
}

impl DocumentSection {
    pub fn new(priority: u32, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            priority,
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Input for generating a project plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePlanInput {
    pub duration_weeks: u32,
    #[serde(default)]
    pub additional_details: String,
}

/// Input for generating a backlog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateBacklogInput {
    #[serde(default)]
    pub additional_details: String,
}

/// Input for replacing the content of one generated file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFileInput {
    pub content: String,
}

/// Result of a text generation (plan or backlog).
///
/// `persisted` is false when the content was generated but could not be
/// saved onto the meeting; the content is still returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub content: String,
    pub persisted: bool,
}

/// Result of a file generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFiles {
    pub files: Vec<FileResult>,
    pub persisted: bool,
}

/// Outcome of importing a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub meeting: Meeting,
    /// False when the transcript had already been imported.
    pub created: bool,
}
