//! Closed set of component languages.
//!
//! A [`Language`] is decided once, when a component is created, from its file
//! extension (or from the tag on a reply's opening fence). Only languages with
//! [`Language::is_executable`] are ever launched; everything else is a passive
//! artifact consumed by the entry component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language tag of a component or a fenced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Bash,
    Batch,
    PowerShell,
    JavaScript,
    Json,
    Yaml,
    Toml,
    Markdown,
    Html,
    Css,
    Text,
    Unknown,
}

/// Extension/tag table. Lookups are case-insensitive.
const TABLE: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("sh", Language::Bash),
    ("bat", Language::Batch),
    ("ps1", Language::PowerShell),
    ("js", Language::JavaScript),
    ("json", Language::Json),
    ("yaml", Language::Yaml),
    ("yml", Language::Yaml),
    ("toml", Language::Toml),
    ("md", Language::Markdown),
    ("html", Language::Html),
    ("css", Language::Css),
    ("txt", Language::Text),
];

/// Fence tags that are spelled out instead of abbreviated.
const LONG_TAGS: &[(&str, Language)] = &[
    ("python", Language::Python),
    ("bash", Language::Bash),
    ("shell", Language::Bash),
    ("batch", Language::Batch),
    ("powershell", Language::PowerShell),
    ("javascript", Language::JavaScript),
    ("markdown", Language::Markdown),
    ("text", Language::Text),
];

impl Language {
    /// Classify a file extension (`"py"`, `".PY"`, `"yml"`, ...).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim().trim_start_matches('.');
        TABLE
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(ext))
            .map(|(_, lang)| *lang)
            .unwrap_or(Language::Unknown)
    }

    /// Classify the tag on an opening fence. Accepts both the extension form
    /// (`py`) and the spelled-out form (`python`).
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        match Self::from_extension(tag) {
            Language::Unknown => LONG_TAGS
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(tag))
                .map(|(_, lang)| *lang)
                .unwrap_or(Language::Unknown),
            known => known,
        }
    }

    /// Whether components in this language are launched by the executor.
    pub fn is_executable(self) -> bool {
        matches!(self, Language::Python)
    }

    /// Canonical lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Bash => "bash",
            Language::Batch => "batch",
            Language::PowerShell => "powershell",
            Language::JavaScript => "javascript",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Markdown => "markdown",
            Language::Html => "html",
            Language::Css => "css",
            Language::Text => "text",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table() {
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("sh"), Language::Bash);
        assert_eq!(Language::from_extension("bat"), Language::Batch);
        assert_eq!(Language::from_extension("ps1"), Language::PowerShell);
        assert_eq!(Language::from_extension("js"), Language::JavaScript);
        assert_eq!(Language::from_extension("yml"), Language::Yaml);
        assert_eq!(Language::from_extension("txt"), Language::Text);
    }

    #[test]
    fn extension_is_case_insensitive_and_ignores_dot() {
        assert_eq!(Language::from_extension(".PY"), Language::Python);
        assert_eq!(Language::from_extension("Toml"), Language::Toml);
    }

    #[test]
    fn unmatched_maps_to_unknown() {
        assert_eq!(Language::from_extension("rs"), Language::Unknown);
        assert_eq!(Language::from_extension(""), Language::Unknown);
        assert_eq!(Language::from_tag("cobol"), Language::Unknown);
    }

    #[test]
    fn tags_accept_long_names() {
        assert_eq!(Language::from_tag("python"), Language::Python);
        assert_eq!(Language::from_tag("Bash"), Language::Bash);
        assert_eq!(Language::from_tag("json"), Language::Json);
    }

    #[test]
    fn only_python_is_executable() {
        assert!(Language::Python.is_executable());
        assert!(!Language::Bash.is_executable());
        assert!(!Language::Json.is_executable());
        assert!(!Language::Unknown.is_executable());
    }
}
