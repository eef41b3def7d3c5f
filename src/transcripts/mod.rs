//! GraphQL client for the meeting transcription service.
//!
//! Only the read side is used: listing recent transcripts and fetching one
//! transcript's summary so it can be imported as a [`Meeting`](crate::models::Meeting).

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default GraphQL endpoint.
pub const DEFAULT_TRANSCRIPTS_URL: &str = "https://api.fireflies.ai/graphql";

const LIST_TRANSCRIPTS_QUERY: &str = "query Transcripts($limit: Int) {
  transcripts(limit: $limit) {
    id
    title
    date
    summary { overview action_items }
  }
}";

const GET_TRANSCRIPT_QUERY: &str = "query Transcript($id: String!) {
  transcript(id: $id) {
    id
    title
    date
    summary { overview action_items }
  }
}";

/// Transcription API errors.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Transcription API key is not configured")]
    Configuration,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcription API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Transcript not found: {0}")]
    NotFound(String),
}

/// A transcript as listed by the transcription service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub date: Option<f64>,
    #[serde(default)]
    pub summary: Option<TranscriptDigest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDigest {
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub action_items: Option<String>,
}

impl TranscriptSummary {
    /// Meeting summary text: the overview followed by the action items.
    pub fn summary_text(&self) -> String {
        let Some(digest) = &self.summary else {
            return String::new();
        };

        let mut parts = Vec::new();
        if let Some(overview) = digest.overview.as_deref().map(str::trim) {
            if !overview.is_empty() {
                parts.push(overview.to_string());
            }
        }
        if let Some(items) = digest.action_items.as_deref().map(str::trim) {
            if !items.is_empty() {
                parts.push(format!("Action items:\n{}", items));
            }
        }
        parts.join("\n\n")
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptsData {
    #[serde(default)]
    transcripts: Vec<TranscriptSummary>,
}

#[derive(Debug, Deserialize)]
struct TranscriptData {
    transcript: Option<TranscriptSummary>,
}

/// HTTP client for the transcription GraphQL API.
#[derive(Debug, Clone)]
pub struct TranscriptClient {
    url: String,
    api_key: Option<String>,
    client: Client,
}

impl TranscriptClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
            client: Client::new(),
        }
    }

    pub async fn list_transcripts(
        &self,
        limit: u32,
    ) -> Result<Vec<TranscriptSummary>, TranscriptError> {
        let data: TranscriptsData = self
            .query(LIST_TRANSCRIPTS_QUERY, serde_json::json!({ "limit": limit }))
            .await?;
        Ok(data.transcripts)
    }

    pub async fn get_transcript(&self, id: &str) -> Result<TranscriptSummary, TranscriptError> {
        let data: TranscriptData = self
            .query(GET_TRANSCRIPT_QUERY, serde_json::json!({ "id": id }))
            .await?;
        data.transcript
            .ok_or_else(|| TranscriptError::NotFound(id.to_string()))
    }

    /// Post a GraphQL document and unwrap its `data`.
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, TranscriptError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(TranscriptError::Configuration)?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphQlResponse<T> = response.json().await?;
        if !envelope.errors.is_empty() {
            let messages: Vec<_> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(TranscriptError::GraphQl(messages.join("; ")));
        }
        envelope
            .data
            .ok_or_else(|| TranscriptError::GraphQl("response has no data".to_string()))
    }
}
