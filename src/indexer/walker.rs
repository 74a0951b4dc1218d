use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::SourceType;

impl SourceType {
    /// File extensions ingested for each kind of source.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Documentation => &["rst"],
            Self::Lore => &["txt", "md", "rst"],
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions().iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

/// Every file under `dir` whose extension belongs to `source_type`,
/// in file-name order. Hidden directories are skipped.
pub fn walk_directory(dir: &Path, source_type: SourceType) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| source_type.matches(path))
        .collect()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
