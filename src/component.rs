//! A single named, typed, persisted content unit of a solution.

use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Reserved component name of the entry point.
pub const ENTRY_NAME: &str = "main";

/// Execution status of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentStatus {
    #[default]
    Pending,
    Success,
    Error,
    Skipped,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComponentStatus::Pending => "PENDING",
            ComponentStatus::Success => "SUCCESS",
            ComponentStatus::Error => "ERROR",
            ComponentStatus::Skipped => "SKIPPED",
        })
    }
}

/// One file of a solution.
///
/// `language` is derived from `extension` at construction and never changes
/// afterwards. `content` and `status` are only mutated by the correction loop
/// and the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub extension: String,
    pub content: String,
    /// What this component is for, as recorded in the manifest.
    pub description: String,
    language: Language,
    pub status: ComponentStatus,
    pub result_description: String,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let extension = extension.into();
        Self {
            name: name.into(),
            language: Language::from_extension(&extension),
            extension,
            content: content.into(),
            description: String::new(),
            status: ComponentStatus::Pending,
            result_description: String::new(),
        }
    }

    /// Split `helper.py` into (`helper`, `py`). The extension is whatever
    /// follows the last dot; a name without a dot has no extension.
    pub fn split_file_name(file_name: &str) -> (&str, &str) {
        match file_name.rsplit_once('.') {
            Some((name, ext)) if !name.is_empty() => (name, ext),
            _ => (file_name, ""),
        }
    }

    /// Whether `file_name` names a file directly inside a solution folder:
    /// non-empty, not `.` or `..`, and free of path separators and drive
    /// prefixes.
    pub fn is_plain_file_name(file_name: &str) -> bool {
        !file_name.trim().is_empty()
            && file_name != "."
            && file_name != ".."
            && !file_name.contains(['/', '\\', ':', '\0'])
    }

    /// Build a component from a `name.ext` file name.
    pub fn from_file_name(file_name: &str, content: impl Into<String>) -> Self {
        let (name, ext) = Self::split_file_name(file_name);
        Self::new(name, ext, content)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_executable(&self) -> bool {
        self.language.is_executable()
    }

    /// Whether this is the designated entry point (reserved name + executable language).
    pub fn is_entry(&self) -> bool {
        self.name.eq_ignore_ascii_case(ENTRY_NAME) && self.is_executable()
    }

    /// `name.ext`, or just `name` when there is no extension.
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }

    /// Location of this component inside a solution folder.
    pub fn path_in(&self, folder: &Path) -> PathBuf {
        folder.join(self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_follows_extension() {
        assert_eq!(Component::new("main", "py", "").language(), Language::Python);
        assert_eq!(Component::new("setup", "sh", "").language(), Language::Bash);
        assert_eq!(Component::new("notes", "rst", "").language(), Language::Unknown);
    }

    #[test]
    fn split_file_name_uses_last_dot() {
        assert_eq!(Component::split_file_name("helper.py"), ("helper", "py"));
        assert_eq!(Component::split_file_name("a.b.json"), ("a.b", "json"));
        assert_eq!(Component::split_file_name("Makefile"), ("Makefile", ""));
        assert_eq!(Component::split_file_name(".env"), (".env", ""));
    }

    #[test]
    fn plain_file_names_only() {
        for ok in ["helper.py", "a.b.json", ".env", "Makefile"] {
            assert!(Component::is_plain_file_name(ok), "{ok}");
        }
        let bad_names = [
            "", "..", ".", "../escape.py", "sub/x.py", "/etc/passwd", "..\\x.py", "C:x.py",
        ];
        for bad in bad_names {
            assert!(!Component::is_plain_file_name(bad), "{bad}");
        }
    }

    #[test]
    fn entry_requires_name_and_python() {
        assert!(Component::new("main", "py", "").is_entry());
        assert!(Component::new("MAIN", "py", "").is_entry());
        assert!(!Component::new("main", "sh", "").is_entry());
        assert!(!Component::new("helper", "py", "").is_entry());
    }

    #[test]
    fn file_name_and_path() {
        let c = Component::new("helper", "py", "");
        assert_eq!(c.file_name(), "helper.py");
        assert_eq!(c.path_in(Path::new("/tmp/calc")), Path::new("/tmp/calc/helper.py"));
        assert_eq!(Component::new("LICENSE", "", "").file_name(), "LICENSE");
    }

    #[test]
    fn new_component_is_pending() {
        let c = Component::from_file_name("main.py", "print(1)").with_description("entry");
        assert_eq!(c.status, ComponentStatus::Pending);
        assert_eq!(c.description, "entry");
        assert_eq!(c.content, "print(1)");
    }
}
