#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Router,
};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use meeting_intel::models::Meeting;
use meeting_intel::synth::{CompletionClient, SynthSettings, Synthesizer};

pub const TEST_KEY: &str = "test-key";
pub const TEST_MODEL: &str = "test-model";

/// A request received by [`FakeUpstream`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

impl RecordedRequest {
    /// Content of the user message in a chat completion request.
    pub fn user_prompt(&self) -> String {
        self.body["messages"][1]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Clone, Default)]
struct Script {
    responses: Arc<Mutex<VecDeque<(u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    delay: Duration,
}

/// In-process HTTP server that answers every POST with the next scripted
/// response and records what it was sent.
pub struct FakeUpstream {
    pub url: String,
    script: Script,
}

impl FakeUpstream {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        Self::start_delayed(responses, Duration::ZERO).await
    }

    /// Like [`FakeUpstream::start`], but every response waits `delay` first.
    pub async fn start_delayed(responses: Vec<(u16, String)>, delay: Duration) -> Self {
        let script = Script {
            delay,
            ..Script::default()
        };
        script.responses.lock().unwrap().extend(responses);

        let app = Router::new().fallback(record).with_state(script.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/v1/chat/completions", addr),
            script,
        }
    }

    /// Serve completion envelopes wrapping each of `replies`.
    pub async fn completions(replies: &[&str]) -> Self {
        Self::start(replies.iter().map(|r| (200, completion_body(r))).collect()).await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.requests.lock().unwrap().clone()
    }
}

async fn record(
    State(script): State<Script>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    script.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    tokio::time::sleep(script.delay).await;

    let (status, body) = script
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, "no scripted response".to_string()));

    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}

pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "model": TEST_MODEL,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

pub fn canonical_files_reply(functional: &str, mockups: &str, markdown: &str) -> String {
    serde_json::json!([
        { "name": "FunctionalDoc.txt", "content": functional },
        { "name": "Mockups.txt", "content": mockups },
        { "name": "Markdown.md", "content": markdown },
    ])
    .to_string()
}

pub fn synthesizer(url: &str, settings: SynthSettings) -> Synthesizer {
    let client = CompletionClient::new(url, Some(TEST_KEY.to_string()), TEST_MODEL);
    Synthesizer::new(client, settings)
}

pub fn meeting() -> Meeting {
    let now = Utc::now();
    Meeting {
        id: Uuid::new_v4(),
        title: "Booking app kickoff".to_string(),
        transcript_id: None,
        summary: "The client wants an online booking app for their salon.".to_string(),
        functional_doc: "Customers must be able to book a slot online.\nStaff can cancel bookings."
            .to_string(),
        mockups: "Booking page with a calendar and a confirm button.".to_string(),
        markdown: "The REST API stores bookings in a Postgres database.".to_string(),
        project_plan: String::new(),
        generated_project_plan: None,
        generated_backlog: None,
        generated_files: Vec::new(),
        version: 1,
        created_at: now,
        updated_at: now,
    }
}
