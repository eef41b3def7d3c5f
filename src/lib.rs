//! Meeting Intel: turns meeting summaries into functional specs, mockups,
//! technical docs, project plans and backlogs.
//!
//! - [`synth`]: the content-fitting and generation pipeline
//! - [`db`]: SQLite persistence of meetings and their generated artifacts
//! - [`api`]: the HTTP surface
//! - [`transcripts`]: client for the transcription service

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod synth;
pub mod transcripts;
