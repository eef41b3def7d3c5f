//! Keyword-driven extraction of the relevant lines of a source document.
//!
//! Each [`DocumentKind`] owns an ordered table of case-insensitive keyword
//! patterns. A line is kept when any pattern matches anywhere in it. Kept
//! lines are pooled across patterns in discovery order (pattern order first,
//! then line order), deduplicated, and capped at [`MAX_EXTRACTED_LINES`].
//! When nothing matches, the document is cut to a per-kind character ceiling.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::char_prefix;

/// Maximum number of lines an extraction returns.
pub const MAX_EXTRACTED_LINES: usize = 15;

/// Appended whenever content is cut short.
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated ...]";

/// The vocabulary used to pick lines out of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Functional,
    Technical,
    Mockups,
}

impl DocumentKind {
    /// Character ceiling for the no-match fallback.
    pub fn fallback_chars(&self) -> usize {
        match self {
            Self::Functional => 3000,
            Self::Technical => 2500,
            Self::Mockups => 2000,
        }
    }

    /// Ordered keyword patterns. Earlier patterns win the line cap.
    pub fn keyword_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Functional => FUNCTIONAL_PATTERNS,
            Self::Technical => TECHNICAL_PATTERNS,
            Self::Mockups => MOCKUP_PATTERNS,
        }
    }
}

const FUNCTIONAL_PATTERNS: &[&str] = &[
    r"(?i)\b(must|shall|should|requires?|required|requirements?)\b",
    r"(?i)\b(features?|functionality|capabilit(y|ies)|use cases?|user stor(y|ies))\b",
    r"(?i)\b(users?|customers?|admins?|administrators?|actors?|personas?)\b.*\b(can|able to|wants?|needs?)\b",
    r"(?i)\b(workflows?|process(es)?|scenarios?|steps?)\b",
    r"(?i)\b(business rules?|validations?|constraints?|acceptance criteria)\b",
];

const TECHNICAL_PATTERNS: &[&str] = &[
    r"(?i)\b(apis?|endpoints?|rest|graphql|webhooks?)\b",
    r"(?i)\b(databases?|schemas?|tables?|migrations?|sql|orm)\b",
    r"(?i)\b(architecture|services?|microservices?|components?|modules?|integrations?)\b",
    r"(?i)\b(authentication|authorization|security|tokens?|encryption)\b",
    r"(?i)\b(performance|scalab(le|ility)|latency|cach(e|ing)|deploy(ment|ments)?)\b",
];

const MOCKUP_PATTERNS: &[&str] = &[
    r"(?i)\b(screens?|pages?|views?|modals?|dialogs?)\b",
    r"(?i)\b(buttons?|forms?|inputs?|fields?|dropdowns?|checkbox(es)?)\b",
    r"(?i)\b(layout|header|footer|sidebar|navigation|menus?)\b",
    r"(?i)\b(clicks?|taps?|selects?|hovers?|navigates?|submits?)\b",
];

static FUNCTIONAL: LazyLock<Extractor> =
    LazyLock::new(|| Extractor::for_kind(DocumentKind::Functional));
static TECHNICAL: LazyLock<Extractor> =
    LazyLock::new(|| Extractor::for_kind(DocumentKind::Technical));
static MOCKUPS: LazyLock<Extractor> = LazyLock::new(|| Extractor::for_kind(DocumentKind::Mockups));

/// Extract the lines of `document` relevant to `kind`.
///
/// Pure: the same input always yields the same output.
pub fn extract(document: &str, kind: DocumentKind) -> String {
    let extractor: &Extractor = match kind {
        DocumentKind::Functional => &FUNCTIONAL,
        DocumentKind::Technical => &TECHNICAL,
        DocumentKind::Mockups => &MOCKUPS,
    };
    extractor.extract(document)
}

/// A compiled pattern table plus its fallback ceiling.
#[derive(Debug, Clone)]
pub struct Extractor {
    patterns: Vec<Regex>,
    fallback_chars: usize,
}

impl Extractor {
    pub fn for_kind(kind: DocumentKind) -> Self {
        Self::from_patterns(kind.keyword_patterns(), kind.fallback_chars())
    }

    /// Compile a pattern table. Patterns that fail to compile are logged
    /// and left out; the remaining ones keep their order.
    pub fn from_patterns(patterns: &[&str], fallback_chars: usize) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Skipping extraction pattern {:?}: {}", pattern, e);
                    None
                }
            })
            .collect();

        Self {
            patterns,
            fallback_chars,
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn extract(&self, document: &str) -> String {
        if document.is_empty() {
            return String::new();
        }

        let mut seen = HashSet::new();
        let mut found: Vec<&str> = Vec::new();

        'patterns: for re in &self.patterns {
            for line in document.lines().map(str::trim) {
                if line.is_empty() || !re.is_match(line) {
                    continue;
                }
                if seen.insert(line) {
                    found.push(line);
                    if found.len() == MAX_EXTRACTED_LINES {
                        break 'patterns;
                    }
                }
            }
        }

        if found.is_empty() {
            return truncate_with_marker(document, self.fallback_chars);
        }

        found.join("\n")
    }
}

/// Keep at most `limit` characters of `text`, appending [`TRUNCATION_MARKER`]
/// when anything was dropped.
pub fn truncate_with_marker(text: &str, limit: usize) -> String {
    let prefix = char_prefix(text, limit);
    if prefix.len() == text.len() {
        return text.to_string();
    }
    format!("{}{}", prefix, TRUNCATION_MARKER)
}
