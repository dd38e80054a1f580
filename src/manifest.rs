//! Plain-text solution manifest.
//!
//! ```text
//! Description: Add two numbers and print the result.
//!
//! Component 1: Helper with an add function.
//!
//! File 1: helper.py
//!
//! Component 2: Entry point that prints add(2, 2).
//!
//! File 2: main.py
//! ```
//!
//! The same syntax is used for the component plan an LLM returns when a new
//! solution is generated, so [`parse`] is lenient about blank lines, numbering
//! and surrounding prose.

use crate::component::Component;
use crate::error::{CraftError, Result};
use crate::language::Language;
use crate::solution::{write_atomically, Solution};
use std::path::Path;
use tracing::{debug, info, warn};

/// File names tried, in order, when loading a solution folder.
pub const MANIFEST_FILES: &[&str] = &["model.txt", "descriptor.txt"];

/// File name written by [`save`].
pub const DESCRIPTOR_FILE: &str = "descriptor.txt";

/// Extensions picked up by [`import_dir`].
pub const IMPORTABLE_EXTENSIONS: &[&str] = &["py", "sh", "bat", "ps1", "js"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub description: String,
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub description: String,
    pub name: String,
    pub extension: String,
}

impl ManifestEntry {
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }
}

/// Text after the first `:` of a line, trimmed.
fn value_of(line: &str) -> &str {
    line.split_once(':').map(|(_, v)| v.trim()).unwrap_or("")
}

type PendingEntry = Option<(String, Option<(String, String)>)>;

fn flush(pending: &mut PendingEntry, entries: &mut Vec<ManifestEntry>) {
    if let Some((description, Some((name, extension)))) = pending.take() {
        entries.push(ManifestEntry {
            description,
            name,
            extension,
        });
    }
}

/// Parse manifest text. Entries that never received a `File` line are dropped.
pub fn parse(text: &str) -> Manifest {
    let mut manifest = Manifest::default();
    let mut pending: PendingEntry = None;

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with("Description:") {
            manifest.description = value_of(line).to_string();
        } else if line.starts_with("Component ") && line.contains(':') {
            flush(&mut pending, &mut manifest.entries);
            pending = Some((value_of(line).to_string(), None));
        } else if line.starts_with("File ") && line.contains(':') {
            let (name, ext) = Component::split_file_name(value_of(line));
            let file = Some((name.to_string(), ext.to_string()));
            match pending.as_mut() {
                Some((_, slot)) => *slot = file,
                // a File line with no Component line before it still names a component
                None => pending = Some((String::new(), file)),
            }
        }
    }
    flush(&mut pending, &mut manifest.entries);
    manifest
}

/// Render a solution's manifest.
pub fn render(solution: &Solution) -> String {
    let mut out = format!("Description: {}\n\n", solution.description);
    for (i, c) in solution.components().iter().enumerate() {
        out.push_str(&format!("Component {}: {}\n\n", i + 1, c.description));
        out.push_str(&format!("File {}: {}\n\n", i + 1, c.file_name()));
    }
    out
}

/// Load the solution stored in `folder`.
///
/// Components listed in the manifest whose file is missing are skipped.
pub fn load(folder: &Path, name: &str) -> Result<Solution> {
    if !folder.is_dir() {
        return Err(CraftError::Manifest(format!(
            "solution folder '{}' does not exist",
            folder.display()
        )));
    }
    let manifest_path = MANIFEST_FILES
        .iter()
        .map(|f| folder.join(f))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            CraftError::Manifest(format!(
                "no manifest ({}) in '{}'",
                MANIFEST_FILES.join(" or "),
                folder.display()
            ))
        })?;

    let manifest = parse(&std::fs::read_to_string(&manifest_path)?);
    let mut solution = Solution::new(name, folder).with_description(manifest.description);

    for entry in manifest.entries {
        if !Component::is_plain_file_name(&entry.file_name()) {
            warn!(
                solution = %name,
                file = %entry.file_name(),
                "unsafe component file name, skipping"
            );
            continue;
        }
        let path = folder.join(entry.file_name());
        if !path.is_file() {
            warn!(
                solution = %name,
                file = %entry.file_name(),
                "component file not found, skipping"
            );
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        solution.add_component(
            Component::new(entry.name, entry.extension, content)
                .with_description(entry.description),
        )?;
    }

    info!(solution = %name, components = solution.components().len(), "solution loaded");
    Ok(solution)
}

/// Write the descriptor and every component file.
pub fn save(solution: &Solution) -> Result<()> {
    solution.persist_components()?;
    write_atomically(&solution.folder.join(DESCRIPTOR_FILE), &render(solution))?;
    debug!(solution = %solution.name, folder = %solution.folder.display(), "solution saved");
    Ok(())
}

/// Import every recognised script in `source` as a new solution at `dest`.
///
/// Files are taken in name order with the entry point (`main.py`) moved last.
pub fn import_dir(source: &Path, dest: &Path, name: &str) -> Result<Solution> {
    if !source.is_dir() {
        return Err(CraftError::Manifest(format!(
            "folder '{}' does not exist",
            source.display()
        )));
    }

    let mut files: Vec<_> = std::fs::read_dir(source)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| {
                    IMPORTABLE_EXTENSIONS
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(e))
                })
        })
        .collect();
    files.sort();

    let mut components = Vec::with_capacity(files.len());
    for path in files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = std::fs::read_to_string(&path)?;
        let component = Component::from_file_name(&file_name, content);
        debug!(file = %file_name, language = %component.language(), "importing component");
        components.push(component);
    }
    components.sort_by_key(|c| c.is_entry());

    let mut solution = Solution::new(name, dest);
    for c in components {
        solution.add_component(c)?;
    }
    save(&solution)?;
    info!(solution = %name, components = solution.components().len(), "solution imported");
    Ok(solution)
}

/// Whether a component in `language` would be picked up by [`import_dir`].
pub fn is_importable(language: Language) -> bool {
    IMPORTABLE_EXTENSIONS
        .iter()
        .any(|ext| Language::from_extension(ext) == language)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Description: Add two numbers.\n\n\
        Component 1: Helper with add.\n\n\
        File 1: helper.py\n\n\
        Component 2: Entry point.\n\n\
        File 2: main.py\n";

    #[test]
    fn parse_sample_manifest() {
        let m = parse(SAMPLE);
        assert_eq!(m.description, "Add two numbers.");
        assert_eq!(m.entries.len(), 2);
        assert_eq!(m.entries[0].name, "helper");
        assert_eq!(m.entries[0].extension, "py");
        assert_eq!(m.entries[0].description, "Helper with add.");
        assert_eq!(m.entries[1].file_name(), "main.py");
    }

    #[test]
    fn parse_keeps_colons_in_values() {
        let m = parse("Description: ratio is 1:2\nComponent 1: uses a: b\nFile 1: main.py\n");
        assert_eq!(m.description, "ratio is 1:2");
        assert_eq!(m.entries[0].description, "uses a: b");
    }

    #[test]
    fn parse_drops_component_without_file() {
        let m = parse("Component 1: orphan\nComponent 2: real\nFile 2: main.py\n");
        assert_eq!(m.entries.len(), 1);
        assert_eq!(m.entries[0].description, "real");
    }

    #[test]
    fn parse_ignores_surrounding_prose() {
        let text = "Sure! Here is the plan.\n\n\
            Description: Tool.\n\
            Component 1: Config.\nThis class lives in config.json.\nFile 1: config.json\n\
            Component 2: Main.\nFile 2: main.py\nLet me know!";
        let m = parse(text);
        assert_eq!(m.entries.len(), 2);
        assert_eq!(m.entries[0].file_name(), "config.json");
    }

    #[test]
    fn render_then_parse_preserves_entries() {
        let s = Solution::new("calc", "/tmp/calc")
            .with_description("Add numbers.")
            .with_component(Component::new("helper", "py", "").with_description("Helper."))
            .unwrap()
            .with_component(Component::new("main", "py", "").with_description("Main."))
            .unwrap();
        let text = render(&s);
        assert!(text.starts_with(
            "Description: Add numbers.\n\nComponent 1: Helper.\n\nFile 1: helper.py\n"
        ));
        let m = parse(&text);
        assert_eq!(m.entries.len(), 2);
        assert_eq!(m.entries[1].description, "Main.");
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let s = Solution::new("calc", dir.path())
            .with_description("Add numbers.")
            .with_component(Component::new("helper", "py", "def add(a, b):\n    return a + b\n"))
            .unwrap()
            .with_component(Component::new("main", "py", "print(1)"))
            .unwrap();
        save(&s).unwrap();

        let loaded = load(dir.path(), "calc").unwrap();
        assert_eq!(loaded.description, "Add numbers.");
        assert_eq!(loaded.components().len(), 2);
        assert_eq!(
            loaded.component("helper.py").unwrap().content,
            "def add(a, b):\n    return a + b\n"
        );
        assert!(loaded.entry_component().is_some());
    }

    #[test]
    fn load_prefers_model_txt_and_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("model.txt"),
            "Description: d\nComponent 1: gone\nFile 1: gone.py\nComponent 2: m\nFile 2: main.py\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("descriptor.txt"), "Description: other\n").unwrap();
        std::fs::write(dir.path().join("main.py"), "print(1)").unwrap();

        let s = load(dir.path(), "x").unwrap();
        assert_eq!(s.description, "d");
        assert_eq!(s.components().len(), 1);
    }

    #[test]
    fn load_skips_entries_outside_the_folder() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("sol");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(root.path().join("escape.py"), "print('outside')").unwrap();
        std::fs::write(
            dir.join("descriptor.txt"),
            "Description: d\nComponent 1: x\nFile 1: ../escape.py\n\
             Component 2: m\nFile 2: main.py\n",
        )
        .unwrap();
        std::fs::write(dir.join("main.py"), "print(1)").unwrap();

        let s = load(&dir, "sol").unwrap();
        let files: Vec<_> = s.components().iter().map(|c| c.file_name()).collect();
        assert_eq!(files, vec!["main.py"]);
    }

    #[test]
    fn load_without_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load(dir.path(), "x"), Err(CraftError::Manifest(_))));
        assert!(matches!(
            load(&dir.path().join("nope"), "x"),
            Err(CraftError::Manifest(_))
        ));
    }

    #[test]
    fn import_dir_orders_entry_last_and_classifies() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("main.py"), "import util").unwrap();
        std::fs::write(src.path().join("util.py"), "X = 1").unwrap();
        std::fs::write(src.path().join("setup.sh"), "echo hi").unwrap();
        std::fs::write(src.path().join("notes.md"), "ignored").unwrap();

        let target = dest.path().join("imported");
        let s = import_dir(src.path(), &target, "imported").unwrap();
        let names: Vec<_> = s.components().iter().map(|c| c.file_name()).collect();
        assert_eq!(names, vec!["setup.sh", "util.py", "main.py"]);
        assert_eq!(s.components()[0].language(), Language::Bash);
        assert!(target.join(DESCRIPTOR_FILE).is_file());
        assert!(target.join("util.py").is_file());
        assert!(!target.join("notes.md").exists());
    }

    #[test]
    fn importable_languages() {
        assert!(is_importable(Language::Python));
        assert!(is_importable(Language::PowerShell));
        assert!(!is_importable(Language::Json));
    }
}
