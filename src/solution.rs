//! An ordered collection of components plus aggregate status.
//!
//! Insertion order is dependency order: the last component is conventionally
//! the entry point (`main.py`). A solution lives in its own folder with one
//! file per component at `<folder>/<name>.<extension>`.

use crate::component::{Component, ComponentStatus};
use crate::error::{CraftError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Aggregate status of a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolutionStatus {
    #[default]
    Pending,
    Success,
    Error,
    Partial,
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolutionStatus::Pending => "PENDING",
            SolutionStatus::Success => "SUCCESS",
            SolutionStatus::Error => "ERROR",
            SolutionStatus::Partial => "PARTIAL",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub name: String,
    /// Semantic description of what the solution should do.
    pub description: String,
    components: Vec<Component>,
    pub status: SolutionStatus,
    /// Transcript of the last run. This is what the correction step diagnoses.
    pub result_description: String,
    pub folder: PathBuf,
    pub execution_time: Duration,
}

impl Solution {
    pub fn new(name: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            components: Vec::new(),
            status: SolutionStatus::Pending,
            result_description: String::new(),
            folder: folder.into(),
            execution_time: Duration::ZERO,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder-style [`add_component`](Self::add_component).
    pub fn with_component(mut self, component: Component) -> Result<Self> {
        self.add_component(component)?;
        Ok(self)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Append a component. `name.extension` must be unique within the solution.
    /// The file name must be a plain name inside the solution folder.
    pub fn add_component(&mut self, component: Component) -> Result<()> {
        let file_name = component.file_name();
        if !Component::is_plain_file_name(&file_name) {
            return Err(CraftError::Other(format!(
                "component file '{}' would leave the folder of solution '{}'",
                file_name, self.name
            )));
        }
        if self.component(&file_name).is_some() {
            return Err(CraftError::Other(format!(
                "component '{}' already exists in solution '{}'",
                file_name, self.name
            )));
        }
        self.components.push(component);
        Ok(())
    }

    /// Remove a component by `name.ext`. Its file on disk is left alone.
    pub fn remove_component(&mut self, file_name: &str) -> Option<Component> {
        let idx = self
            .components
            .iter()
            .position(|c| c.file_name() == file_name)?;
        Some(self.components.remove(idx))
    }

    pub fn component(&self, file_name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.file_name() == file_name)
    }

    pub fn component_mut(&mut self, file_name: &str) -> Option<&mut Component> {
        self.components
            .iter_mut()
            .find(|c| c.file_name() == file_name)
    }

    /// The component launched to run the solution.
    pub fn entry_component(&self) -> Option<&Component> {
        self.components.iter().find(|c| c.is_entry())
    }

    /// Status derived from the components:
    /// ERROR if any component is ERROR, SUCCESS if every executable component
    /// is SUCCESS, PARTIAL otherwise (including when nothing is executable).
    pub fn aggregate_status(&self) -> SolutionStatus {
        if self
            .components
            .iter()
            .any(|c| c.status == ComponentStatus::Error)
        {
            return SolutionStatus::Error;
        }
        let mut executables = self
            .components
            .iter()
            .filter(|c| c.is_executable())
            .peekable();
        if executables.peek().is_none() {
            return SolutionStatus::Partial;
        }
        if executables.all(|c| c.status == ComponentStatus::Success) {
            SolutionStatus::Success
        } else {
            SolutionStatus::Partial
        }
    }

    /// Apply the outcome of one run of the entry component.
    ///
    /// Non-executable components are marked SKIPPED, executable ones take the
    /// run's outcome, and the solution status is re-derived from them.
    pub fn record_run(&mut self, run: SolutionStatus) -> SolutionStatus {
        let executed = match run {
            SolutionStatus::Success => ComponentStatus::Success,
            _ => ComponentStatus::Error,
        };
        for c in &mut self.components {
            c.status = if c.is_executable() {
                executed
            } else {
                ComponentStatus::Skipped
            };
        }
        self.status = self.aggregate_status();
        self.status
    }

    /// Every component's `name.ext` followed by its content, in order.
    pub fn context_listing(&self) -> String {
        let mut out = String::from("Solution Components:\n");
        for c in &self.components {
            out.push_str(&format!("{}:\n{}\n\n", c.file_name(), c.content));
        }
        out
    }

    /// Replace a component's content on disk, then in memory.
    ///
    /// The new content goes to a sibling temp file that is renamed over the
    /// original, so a failed write never leaves a truncated component behind.
    pub fn write_component(&mut self, file_name: &str, content: &str) -> Result<()> {
        let folder = self.folder.clone();
        let component = self.component_mut(file_name).ok_or_else(|| {
            CraftError::Other(format!("component '{}' not found", file_name))
        })?;
        write_atomically(&component.path_in(&folder), content)?;
        component.content = content.to_string();
        Ok(())
    }

    /// Write every component's current content to the solution folder.
    pub fn persist_components(&self) -> Result<()> {
        std::fs::create_dir_all(&self.folder)?;
        for c in &self.components {
            write_atomically(&c.path_in(&self.folder), &c.content)?;
        }
        Ok(())
    }
}

pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    std::fs::write(&tmp, content)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Solution: {}, Execution Time: {:.2}s, Components: {}, Status: {}",
            self.name,
            self.execution_time.as_secs_f64(),
            self.components.len(),
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_statuses(specs: &[(&str, ComponentStatus)]) -> Solution {
        let mut s = Solution::new("agg", "/tmp/agg");
        for (file, status) in specs {
            let mut c = Component::from_file_name(file, "");
            c.status = *status;
            s.add_component(c).unwrap();
        }
        s
    }

    #[test]
    fn record_run_skips_passive_components() {
        let mut s = with_statuses(&[
            ("helper.py", ComponentStatus::Pending),
            ("config.json", ComponentStatus::Pending),
            ("main.py", ComponentStatus::Pending),
        ]);
        assert_eq!(s.record_run(SolutionStatus::Success), SolutionStatus::Success);
        assert_eq!(s.component("config.json").unwrap().status, ComponentStatus::Skipped);
        assert_eq!(s.component("helper.py").unwrap().status, ComponentStatus::Success);

        assert_eq!(s.record_run(SolutionStatus::Error), SolutionStatus::Error);
        assert_eq!(s.status, SolutionStatus::Error);
        assert_eq!(s.component("main.py").unwrap().status, ComponentStatus::Error);
    }

    #[test]
    fn unsafe_file_names_are_rejected() {
        let mut s = Solution::new("x", "/tmp/x");
        assert!(s.add_component(Component::from_file_name("../escape.py", "")).is_err());
        assert!(s.components().is_empty());
    }

    #[test]
    fn aggregate_skipped_executable_is_partial() {
        let s = with_statuses(&[
            ("a.py", ComponentStatus::Success),
            ("b.py", ComponentStatus::Success),
            ("main.py", ComponentStatus::Skipped),
        ]);
        assert_eq!(s.aggregate_status(), SolutionStatus::Partial);
    }

    #[test]
    fn aggregate_any_error_is_error() {
        let s = with_statuses(&[
            ("a.py", ComponentStatus::Success),
            ("main.py", ComponentStatus::Error),
        ]);
        assert_eq!(s.aggregate_status(), SolutionStatus::Error);
    }

    #[test]
    fn aggregate_all_executable_success() {
        let s = with_statuses(&[
            ("a.py", ComponentStatus::Success),
            ("main.py", ComponentStatus::Success),
        ]);
        assert_eq!(s.aggregate_status(), SolutionStatus::Success);
    }

    #[test]
    fn aggregate_ignores_passive_components() {
        let s = with_statuses(&[
            ("config.json", ComponentStatus::Pending),
            ("main.py", ComponentStatus::Success),
        ]);
        assert_eq!(s.aggregate_status(), SolutionStatus::Success);
    }

    #[test]
    fn aggregate_without_executables_is_partial() {
        let s = with_statuses(&[("README.md", ComponentStatus::Skipped)]);
        assert_eq!(s.aggregate_status(), SolutionStatus::Partial);
    }

    #[test]
    fn duplicate_file_names_rejected() {
        let mut s = Solution::new("dup", "/tmp/dup");
        s.add_component(Component::new("main", "py", "")).unwrap();
        assert!(s.add_component(Component::new("main", "py", "x")).is_err());
        // same name, different extension is fine
        s.add_component(Component::new("main", "sh", "")).unwrap();
        assert_eq!(s.components().len(), 2);
    }

    #[test]
    fn entry_component_found_by_name_and_language() {
        let s = Solution::new("e", "/tmp/e")
            .with_component(Component::new("main", "sh", ""))
            .unwrap()
            .with_component(Component::new("helper", "py", ""))
            .unwrap()
            .with_component(Component::new("main", "py", ""))
            .unwrap();
        assert_eq!(s.entry_component().map(|c| c.file_name()), Some("main.py".into()));
    }

    #[test]
    fn remove_component_by_file_name() {
        let mut s = with_statuses(&[("a.py", ComponentStatus::Pending)]);
        assert!(s.remove_component("a.py").is_some());
        assert!(s.remove_component("a.py").is_none());
        assert!(s.components().is_empty());
    }

    #[test]
    fn context_listing_contains_every_component() {
        let s = Solution::new("ctx", "/tmp/ctx")
            .with_component(Component::new("helper", "py", "def f(): pass"))
            .unwrap()
            .with_component(Component::new("main", "py", "import helper"))
            .unwrap();
        let listing = s.context_listing();
        assert!(listing.starts_with("Solution Components:\n"));
        assert!(listing.contains("helper.py:\ndef f(): pass\n"));
        assert!(listing.contains("main.py:\nimport helper\n"));
    }

    #[test]
    fn write_component_updates_disk_and_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = Solution::new("w", dir.path())
            .with_component(Component::new("helper", "py", "old"))
            .unwrap();
        s.persist_components().unwrap();
        s.write_component("helper.py", "new").unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("helper.py")).unwrap(), "new");
        assert_eq!(s.component("helper.py").unwrap().content, "new");
        assert!(!dir.path().join(".helper.py.tmp").exists());
    }

    #[test]
    fn write_unknown_component_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = Solution::new("w", dir.path());
        assert!(s.write_component("ghost.py", "x").is_err());
        assert!(!dir.path().join("ghost.py").exists());
    }

    #[test]
    fn display_summary() {
        let s = Solution::new("calc", "/tmp/calc");
        assert_eq!(
            s.to_string(),
            "Solution: calc, Execution Time: 0.00s, Components: 0, Status: PENDING"
        );
    }
}
