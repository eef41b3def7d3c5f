//! Synthesis of derived documents from meeting content.
//!
//! The pipeline for every generation is the same:
//!
//! 1. [`extract`] picks the relevant lines out of each source document.
//! 2. [`allocate`] fits the prioritized sections into the context budget.
//! 3. [`prompt`] wraps the fitted context in an instruction template.
//! 4. [`completion`] sends it to the completion endpoint.
//! 5. [`files`] recovers structured files from the reply, when files were asked for.
//!
//! [`Synthesizer`] drives the pipeline for project plans, backlogs and files.

pub mod allocate;
pub mod completion;
pub mod extract;
pub mod files;
pub mod prompt;

use thiserror::Error;

use crate::models::{CanonicalFile, DocumentSection, FileResult, Meeting};

pub use allocate::allocate;
pub use completion::{CompletionClient, CompletionError, CompletionOptions};
pub use extract::{extract, DocumentKind};
pub use files::parse_files;

/// Generation errors.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Generation incomplete after {attempts} attempts, missing: {}", .missing.join(", "))]
    IncompleteGeneration { attempts: u32, missing: Vec<String> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Tunables for a [`Synthesizer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthSettings {
    /// Character budget for the fitted context of a single prompt.
    pub context_budget: usize,
    /// Upper bound on completion calls for one file generation.
    pub max_attempts: u32,
    pub options: CompletionOptions,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            context_budget: 12_000,
            max_attempts: 3,
            options: CompletionOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Synthesizer {
    client: CompletionClient,
    settings: SynthSettings,
}

impl Synthesizer {
    pub fn new(client: CompletionClient, settings: SynthSettings) -> Self {
        Self { client, settings }
    }

    /// Context sections for a project plan, highest priority first.
    pub fn plan_sections(meeting: &Meeting) -> Vec<DocumentSection> {
        vec![
            DocumentSection::new(
                1,
                "Functional Document",
                extract(&meeting.functional_doc, DocumentKind::Functional),
            ),
            DocumentSection::new(
                2,
                "Technical Documentation",
                extract(&meeting.markdown, DocumentKind::Technical),
            ),
            DocumentSection::new(
                3,
                "UI Mockups",
                extract(&meeting.mockups, DocumentKind::Mockups),
            ),
            DocumentSection::new(4, "Meeting Summary", meeting.summary.trim()),
        ]
    }

    /// Context sections for a backlog. The generated plan is preferred over
    /// the hand-written one.
    pub fn backlog_sections(meeting: &Meeting) -> Vec<DocumentSection> {
        let plan = meeting
            .generated_project_plan
            .as_deref()
            .filter(|plan| !plan.trim().is_empty())
            .unwrap_or(&meeting.project_plan);

        vec![
            DocumentSection::new(1, "Project Plan", plan.trim()),
            DocumentSection::new(
                2,
                "Functional Document",
                extract(&meeting.functional_doc, DocumentKind::Functional),
            ),
            DocumentSection::new(
                3,
                "Technical Documentation",
                extract(&meeting.markdown, DocumentKind::Technical),
            ),
            DocumentSection::new(
                4,
                "UI Mockups",
                extract(&meeting.mockups, DocumentKind::Mockups),
            ),
        ]
    }

    pub async fn generate_project_plan(
        &self,
        meeting: &Meeting,
        duration_weeks: u32,
        additional_details: &str,
    ) -> Result<String, SynthError> {
        if duration_weeks == 0 {
            return Err(SynthError::InvalidInput(
                "duration_weeks must be greater than zero".to_string(),
            ));
        }

        let context = self.fit(&Self::plan_sections(meeting))?;
        let prompt = prompt::build_plan_prompt(&context, duration_weeks, additional_details);

        tracing::info!(meeting_id = %meeting.id, duration_weeks, "Generating project plan");
        Ok(self
            .client
            .complete(prompt::PLAN_SYSTEM_PROMPT, &prompt, self.settings.options)
            .await?)
    }

    pub async fn generate_backlog(
        &self,
        meeting: &Meeting,
        additional_details: &str,
    ) -> Result<String, SynthError> {
        let context = self.fit(&Self::backlog_sections(meeting))?;
        let prompt = prompt::build_backlog_prompt(&context, additional_details);

        tracing::info!(meeting_id = %meeting.id, "Generating backlog");
        Ok(self
            .client
            .complete(prompt::BACKLOG_SYSTEM_PROMPT, &prompt, self.settings.options)
            .await?)
    }

    /// Generate the three canonical files from the meeting summary.
    ///
    /// Each reply goes through [`parse_files`]; its recovered slots fill
    /// whichever are still missing, and follow-up calls ask only for those. Gives up after `max_attempts` calls.
    pub async fn generate_files(&self, meeting: &Meeting) -> Result<Vec<FileResult>, SynthError> {
        let summary = meeting.summary.trim();
        if summary.is_empty() {
            return Err(SynthError::InvalidInput(
                "meeting has no summary to generate files from".to_string(),
            ));
        }

        let max_attempts = self.settings.max_attempts.max(1);
        let mut slots: [Option<String>; 3] = Default::default();
        let mut attempts = 0;

        while attempts < max_attempts {
            let missing = missing_slots(&slots);
            if missing.is_empty() {
                break;
            }
            attempts += 1;

            let prompt = prompt::build_files_prompt(summary, &missing);
            let reply = self
                .client
                .complete(prompt::FILES_SYSTEM_PROMPT, &prompt, self.settings.options)
                .await?;

            for (filled, file) in slots.iter_mut().zip(files::parse_files(&reply)) {
                if filled.is_none() && files::is_recovered(&file) {
                    *filled = Some(file.content);
                }
            }

            tracing::info!(
                meeting_id = %meeting.id,
                attempt = attempts,
                still_missing = missing_slots(&slots).len(),
                "File generation attempt finished"
            );
        }

        let missing = missing_slots(&slots);
        if !missing.is_empty() {
            return Err(SynthError::IncompleteGeneration {
                attempts,
                missing: missing.iter().map(|f| f.file_name().to_string()).collect(),
            });
        }

        Ok(CanonicalFile::ALL
            .iter()
            .zip(slots)
            .map(|(slot, content)| FileResult::new(slot.file_name(), content.unwrap_or_default()))
            .collect())
    }

    fn fit(&self, sections: &[DocumentSection]) -> Result<String, SynthError> {
        if sections.iter().all(|s| s.content.trim().is_empty()) {
            return Err(SynthError::InvalidInput(
                "meeting has no content to generate from".to_string(),
            ));
        }
        Ok(allocate(sections, self.settings.context_budget))
    }
}

fn missing_slots(slots: &[Option<String>; 3]) -> Vec<CanonicalFile> {
    CanonicalFile::ALL
        .iter()
        .zip(slots)
        .filter(|(_, filled)| filled.is_none())
        .map(|(slot, _)| *slot)
        .collect()
}

/// The first `n` characters of `s`, cut on a char boundary.
pub(crate) fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
