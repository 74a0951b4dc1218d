use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::{DirEntry, FilterEntry, WalkDir};

use crate::errors::{AssistantError, Result};
use crate::indexer::loader::read_text;

pub const PROJECT_FILE: &str = "project.godot";
pub const MAX_STRUCTURE_DEPTH: usize = 3;
const MAX_FILES_PER_DIRECTORY: usize = 10;
const MAX_STRUCTURE_LINES: usize = 100;
const GODOT_EXTENSIONS: &[&str] = &["gd", "tscn", "tres", "godot"];

/// Read-only view of the user's Godot project directory.
#[derive(Debug, Clone)]
pub struct ProjectAnalyzer {
    root: PathBuf,
}

impl ProjectAnalyzer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The project is looked up on every call so a directory mounted after
    /// start-up is picked up.
    pub fn is_mounted(&self) -> bool {
        self.root.is_dir()
    }

    /// Relative paths of the files matching `pattern`, produced lazily.
    ///
    /// A pattern without `/` is matched against the file name at any depth;
    /// one with `/` is matched against the whole relative path. Entries are
    /// visited depth-first in file-name order.
    pub fn find_files(&self, pattern: &str) -> Result<FileMatches> {
        let normalized = pattern.trim().replace('\\', "/");
        let match_path = normalized.contains('/');
        // Relative paths are produced without a `./` prefix.
        let mut pattern = normalized.as_str();
        while let Some(rest) = pattern.strip_prefix("./") {
            pattern = rest;
        }
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| AssistantError::InvalidCommand(format!("Invalid pattern '{}': {}", pattern, e)))?
            .compile_matcher();

        let walker = self.is_mounted().then(|| {
            WalkDir::new(&self.root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(visible as fn(&DirEntry) -> bool)
        });

        Ok(FileMatches {
            root: self.root.clone(),
            walker,
            matcher,
            match_path,
        })
    }

    /// Contents of a file inside the project. Anything outside the root,
    /// missing, or not a regular file is reported as not found.
    pub fn read_file(&self, relative: &str) -> Result<String> {
        let not_found = || AssistantError::FileNotFound(relative.to_string());

        let base = self.root.canonicalize().map_err(|_| not_found())?;
        let target = self
            .root
            .join(relative)
            .canonicalize()
            .map_err(|_| not_found())?;

        if !target.starts_with(&base) {
            tracing::warn!("Rejected read outside project root: {}", relative);
            return Err(not_found());
        }
        if !target.is_file() {
            return Err(not_found());
        }

        read_text(&target)
    }

    pub fn info(&self) -> Result<ProjectInfo> {
        if !self.is_mounted() {
            return Ok(ProjectInfo {
                root: self.root.clone(),
                mounted: false,
                has_project_file: false,
                script_count: 0,
                scene_count: 0,
            });
        }

        Ok(ProjectInfo {
            root: self.root.clone(),
            mounted: true,
            has_project_file: self.root.join(PROJECT_FILE).is_file(),
            script_count: self.find_files("*.gd")?.count(),
            scene_count: self.find_files("*.tscn")?.count(),
        })
    }

    /// Indented directory tree listing Godot files only.
    pub fn structure(&self, max_depth: usize) -> String {
        if !self.is_mounted() {
            return "No project mounted".to_string();
        }

        let mut lines = vec![format!("Project root: {}", self.root.display())];
        if max_depth == 0 {
            return lines.join("\n");
        }

        let dirs = WalkDir::new(&self.root)
            .max_depth(max_depth - 1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_type().is_dir() && visible(e))
            .filter_map(|e| e.ok());

        for dir in dirs {
            let indent = "  ".repeat(dir.depth());
            lines.push(format!("{}{}/", indent, dir.file_name().to_string_lossy()));

            let mut files: Vec<String> = match std::fs::read_dir(dir.path()) {
                Ok(entries) => entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|name| is_godot_file(name))
                    .collect(),
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", dir.path().display(), e);
                    continue;
                }
            };
            files.sort();

            let subindent = "  ".repeat(dir.depth() + 1);
            for file in files.into_iter().take(MAX_FILES_PER_DIRECTORY) {
                lines.push(format!("{}{}", subindent, file));
            }

            if lines.len() >= MAX_STRUCTURE_LINES {
                break;
            }
        }

        lines.truncate(MAX_STRUCTURE_LINES);
        lines.join("\n")
    }
}

fn visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
}

fn is_godot_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| GODOT_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Lazy iterator returned by [`ProjectAnalyzer::find_files`].
pub struct FileMatches {
    root: PathBuf,
    walker: Option<FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>>,
    matcher: GlobMatcher,
    match_path: bool,
}

impl Iterator for FileMatches {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let walker = self.walker.as_mut()?;
        loop {
            let entry = match walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            let matched = if self.match_path {
                self.matcher.is_match(&relative)
            } else {
                self.matcher.is_match(entry.file_name())
            };
            if matched {
                return Some(relative);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub root: PathBuf,
    pub mounted: bool,
    pub has_project_file: bool,
    pub script_count: usize,
    pub scene_count: usize,
}

impl fmt::Display for ProjectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.mounted {
            return write!(f, "No Godot project is currently mounted.");
        }

        writeln!(f, "Project location: {}", self.root.display())?;
        if self.has_project_file {
            writeln!(f, "✓ Valid Godot project detected (project.godot found)")?;
        } else {
            writeln!(f, "⚠ No project.godot found - may not be a Godot project root")?;
        }
        writeln!(f, "GDScript files: {}", self.script_count)?;
        write!(f, "Scene files: {}", self.scene_count)
    }
}
