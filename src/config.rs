//! Application configuration loaded from environment variables.
//!
//! Nothing is required at startup. A missing completion key only fails the
//! generation endpoints; a missing transcription key only fails the proxy.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::synth::completion::{DEFAULT_COMPLETION_URL, DEFAULT_MODEL};
use crate::synth::{CompletionClient, CompletionOptions, SynthSettings, Synthesizer};
use crate::transcripts::{TranscriptClient, DEFAULT_TRANSCRIPTS_URL};

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// SQLite file (from MINTEL_DATABASE_PATH). `None` uses the platform data dir.
    pub database_path: Option<PathBuf>,
    /// Completion API key (from MINTEL_LLM_API_KEY, falling back to OPENAI_API_KEY)
    pub llm_api_key: Option<String>,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub synth: SynthSettings,
    pub transcripts_url: String,
    pub transcripts_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            llm_api_key: None,
            llm_url: DEFAULT_COMPLETION_URL.to_string(),
            llm_model: DEFAULT_MODEL.to_string(),
            llm_timeout: Duration::from_secs(120),
            synth: SynthSettings::default(),
            transcripts_url: DEFAULT_TRANSCRIPTS_URL.to_string(),
            transcripts_api_key: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable numbers fall
    /// back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let synth = SynthSettings {
            context_budget: parse_or(&get, "MINTEL_CONTEXT_BUDGET", defaults.synth.context_budget),
            max_attempts: parse_or(
                &get,
                "MINTEL_MAX_GENERATION_ATTEMPTS",
                defaults.synth.max_attempts,
            ),
            options: CompletionOptions {
                max_tokens: parse_or(
                    &get,
                    "MINTEL_LLM_MAX_TOKENS",
                    defaults.synth.options.max_tokens,
                ),
                temperature: parse_or(
                    &get,
                    "MINTEL_LLM_TEMPERATURE",
                    defaults.synth.options.temperature,
                ),
            },
        };

        Self {
            database_path: get("MINTEL_DATABASE_PATH").map(PathBuf::from),
            llm_api_key: get("MINTEL_LLM_API_KEY").or_else(|| get("OPENAI_API_KEY")),
            llm_url: get("MINTEL_LLM_URL").unwrap_or(defaults.llm_url),
            llm_model: get("MINTEL_LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_timeout: Duration::from_secs(parse_or(
                &get,
                "MINTEL_LLM_TIMEOUT_SECS",
                defaults.llm_timeout.as_secs(),
            )),
            synth,
            transcripts_url: get("MINTEL_TRANSCRIPTS_URL").unwrap_or(defaults.transcripts_url),
            transcripts_api_key: get("MINTEL_TRANSCRIPTS_API_KEY"),
        }
    }

    pub fn synthesizer(&self) -> Synthesizer {
        let client = CompletionClient::with_timeout(
            &self.llm_url,
            self.llm_api_key.clone(),
            &self.llm_model,
            Some(self.llm_timeout),
        );
        Synthesizer::new(client, self.synth)
    }

    pub fn transcript_client(&self) -> TranscriptClient {
        TranscriptClient::new(&self.transcripts_url, self.transcripts_api_key.clone())
    }
}

fn parse_or<T: FromStr + Copy>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match get(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
