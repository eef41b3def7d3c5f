//! Recovery of the three generated files from a free-text model reply.
//!
//! Replies are expected to be a JSON array of `{name, content}` objects but
//! often arrive wrapped in code fences, surrounded by prose, or as a flat
//! object keyed by file. Whatever comes back, [`parse_files`] returns exactly
//! the three canonical slots.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{CanonicalFile, FileResult};

/// Content of every slot when nothing could be recovered.
pub const PARSE_FAILURE_PLACEHOLDER: &str = "Failed to parse generated content.";

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+-]*[ \t]*\r?\n?").unwrap());
static TRAILING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n?```\s*$").unwrap());

/// Parse a reply into the functional, mockups and markdown slots, in that order.
pub fn parse_files(text: &str) -> [FileResult; 3] {
    let entries = recover_entries(text);
    if entries.is_empty() {
        tracing::warn!(
            "Could not recover generated files from a {} character reply",
            text.chars().count()
        );
        return CanonicalFile::ALL
            .map(|slot| FileResult::new(slot.file_name(), PARSE_FAILURE_PLACEHOLDER));
    }
    normalize(&entries)
}

/// Whether a slot returned by [`parse_files`] holds generated content.
pub fn is_recovered(file: &FileResult) -> bool {
    !file.content.trim().is_empty() && file.content != PARSE_FAILURE_PLACEHOLDER
}

/// Map entries onto the canonical slots. The first entry whose trimmed name
/// matches case-insensitively wins; unmatched slots are empty.
fn normalize(entries: &[FileResult]) -> [FileResult; 3] {
    CanonicalFile::ALL.map(|slot| {
        let content = entries
            .iter()
            .find(|entry| entry.is_named(slot.file_name()))
            .map(|entry| entry.content.clone())
            .unwrap_or_default();
        FileResult::new(slot.file_name(), content)
    })
}

pub fn strip_code_fences(text: &str) -> String {
    let text = LEADING_FENCE.replace(text, "");
    TRAILING_FENCE.replace(&text, "").trim().to_string()
}

/// Entries of the first balanced JSON array in `text` that holds any, or
/// failing that of the first such object.
fn recover_entries(text: &str) -> Vec<FileResult> {
    let text = strip_code_fences(text);
    [('[', ']'), ('{', '}')]
        .into_iter()
        .find_map(|(open, close)| {
            balanced_values(&text, open, close)
                .map(|value| entries_from_value(&value))
                .find(|entries| !entries.is_empty())
        })
        .unwrap_or_default()
}

/// Every span starting at an `open` that closes back to depth zero and
/// parses as JSON, in order of appearance.
fn balanced_values(text: &str, open: char, close: char) -> impl Iterator<Item = Value> + '_ {
    text.match_indices(open).filter_map(move |(start, _)| {
        let end = balanced_end(&text[start..], open, close)?;
        serde_json::from_str(&text[start..start + end]).ok()
    })
}

/// Byte length of the span starting at `text[0] == open` up to and including
/// its matching `close`. Delimiters inside JSON strings do not count.
fn balanced_end(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx + c.len_utf8());
            }
        }
    }
    None
}

fn entries_from_value(value: &Value) -> Vec<FileResult> {
    match value {
        Value::Array(items) => items.iter().filter_map(file_from_value).collect(),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = get_ignore_case(map, "files") {
                let entries: Vec<_> = items.iter().filter_map(file_from_value).collect();
                if !entries.is_empty() {
                    return entries;
                }
            }
            if let Some(entry) = file_from_value(value) {
                return vec![entry];
            }
            flat_object_entries(map)
        }
        _ => Vec::new(),
    }
}

/// `{"functionalDoc": "...", "mockups": "...", "markdown": "..."}` style replies.
fn flat_object_entries(map: &Map<String, Value>) -> Vec<FileResult> {
    CanonicalFile::ALL
        .into_iter()
        .filter_map(|slot| {
            let content = slot
                .object_keys()
                .iter()
                .find_map(|key| get_ignore_case(map, key))
                .and_then(content_text)?;
            Some(FileResult::new(slot.file_name(), content))
        })
        .collect()
}

fn file_from_value(value: &Value) -> Option<FileResult> {
    let map = value.as_object()?;
    let name = get_ignore_case(map, "name")?.as_str()?;
    let content = get_ignore_case(map, "content")
        .and_then(content_text)
        .unwrap_or_default();
    Some(FileResult::new(name, content))
}

/// Strings are taken as-is; nested JSON is kept in its serialized form.
fn content_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn get_ignore_case<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
