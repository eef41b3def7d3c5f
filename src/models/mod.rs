//! Domain models for Meeting Intel.
//!
//! # Core Concepts
//!
//! - [`Meeting`]: A persisted meeting record. Holds the source documents
//!   (functional doc, mockups, markdown, project plan) and the artifacts
//!   derived from them (generated plan, backlog, files).
//! - [`FileResult`]: One named generated file. Every file generation fills
//!   exactly the three [`CanonicalFile`] slots.
//! - [`DocumentSection`]: A titled, prioritized chunk of context assembled
//!   fresh per request. Never persisted.

mod file;
mod generation;
mod meeting;

pub use file::*;
pub use generation::*;
pub use meeting::*;
