use serde::{Deserialize, Serialize};

/// A generated file attached to a meeting.
///
/// Lookups by name are case-insensitive; the stored name keeps whatever case
/// it was saved with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    pub name: String,
    pub content: String,
}

impl FileResult {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Trimmed, case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

/// The three fixed outputs every file generation must populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalFile {
    Functional,
    Mockups,
    Markdown,
}

impl CanonicalFile {
    /// Slot order used for every generated file list.
    pub const ALL: [CanonicalFile; 3] = [Self::Functional, Self::Mockups, Self::Markdown];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Functional => "FunctionalDoc.txt",
            Self::Mockups => "Mockups.txt",
            Self::Markdown => "Markdown.md",
        }
    }

    /// Keys accepted when a reply is a flat object instead of a list,
    /// compared case-insensitively.
    pub fn object_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Functional => &[
                "FunctionalDoc.txt",
                "functionalDoc",
                "functional_doc",
                "functional",
            ],
            Self::Mockups => &["Mockups.txt", "mockups", "mockup"],
            Self::Markdown => &["Markdown.md", "markdown", "markdownDoc", "markdown_doc"],
        }
    }
}
