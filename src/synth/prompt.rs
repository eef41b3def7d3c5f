//! Prompt templates.

use crate::models::CanonicalFile;

pub const PLAN_SYSTEM_PROMPT: &str = "You are an experienced project manager. \
You turn meeting notes and specifications into realistic, well structured project plans. \
Always answer in Markdown.";

pub const BACKLOG_SYSTEM_PROMPT: &str = "You are an agile product owner. \
You break project plans and specifications down into epics and user stories \
with clear acceptance criteria. Always answer in Markdown.";

pub const FILES_SYSTEM_PROMPT: &str = "You are a business analyst and UX designer. \
You write functional documents, screen mockup descriptions and technical Markdown \
documentation from meeting summaries. Reply with JSON only, no commentary.";

const NO_DETAILS: &str = "None provided.";

fn details_or_default(additional_details: &str) -> &str {
    let trimmed = additional_details.trim();
    if trimmed.is_empty() {
        NO_DETAILS
    } else {
        trimmed
    }
}

/// Project plan request for a `duration_weeks` long project.
///
/// Callers reject `duration_weeks == 0` before building.
pub fn build_plan_prompt(context: &str, duration_weeks: u32, additional_details: &str) -> String {
    format!(
        "Create a detailed project plan for a {weeks}-week project based on the meeting context below.

{context}
Additional details: {details}

The plan must contain these sections:
1. Project Overview
2. Phase Breakdown
3. Weekly Milestones
4. Resource Requirements
5. Risk Assessment
6. Timeline
7. Success Metrics

Format the whole plan in Markdown using headers for each section.
In the Timeline section, add one table per week, from Week 1 to Week {weeks}, with these columns:

| Week | Day | Task | Deliverable | Owner |
|------|-----|------|-------------|-------|

Fill every working day of every week.",
        weeks = duration_weeks,
        context = context,
        details = details_or_default(additional_details),
    )
}

/// Backlog request built from the plan and source documents.
pub fn build_backlog_prompt(context: &str, additional_details: &str) -> String {
    format!(
        "Create a product backlog from the project context below.

{context}
Additional details: {details}

Group the work into epics. For every epic, list its user stories in the form
\"As a <role>, I want <goal> so that <benefit>\".

Format the backlog in Markdown with one header per epic, followed by a table with these columns:

| ID | User Story | Acceptance Criteria | Priority | Story Points |
|----|------------|---------------------|----------|--------------|

Use MoSCoW priorities (Must, Should, Could, Won't) and Fibonacci story points.",
        context = context,
        details = details_or_default(additional_details),
    )
}

/// File generation request for the given canonical slots.
pub fn build_files_prompt(summary: &str, files: &[CanonicalFile]) -> String {
    let mut descriptions = String::new();
    for file in files {
        let description = match file {
            CanonicalFile::Functional => {
                "a functional document: goals, actors, functional requirements, business rules"
            }
            CanonicalFile::Mockups => {
                "textual mockups: every screen with its layout, fields, buttons and navigation"
            }
            CanonicalFile::Markdown => {
                "technical documentation in Markdown: architecture, data model, APIs, deployment"
            }
        };
        descriptions.push_str(&format!("- \"{}\": {}\n", file.file_name(), description));
    }

    format!(
        "Using the meeting summary below, write the following files:
{descriptions}
Meeting summary:
{summary}

Reply with a JSON array only, one object per file, exactly in this shape:
[{{\"name\": \"<file name>\", \"content\": \"<file content>\"}}]
Use the file names exactly as written above.",
        descriptions = descriptions,
        summary = summary.trim(),
    )
}
