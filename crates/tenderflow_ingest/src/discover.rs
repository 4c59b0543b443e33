//! Recursive enumeration of input files and category derivation.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub category: String,
}

/// Recursively enumerates every `.json` file beneath `root`, in a stable
/// (lexicographic) order so resumed runs process files the same way.
pub fn discover_files(root: &Path) -> Vec<DiscoveredFile> {
    let mut found: Vec<DiscoveredFile> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().map(|e| e == "json").unwrap_or(false))
        .map(|entry| {
            let path = entry.path().to_path_buf();
            let category = derive_category(&path);
            DiscoveredFile { path, category }
        })
        .collect();

    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

/// A file's category is the leading underscore-delimited token of its file
/// stem, e.g. `bandi_2024.json` -> `bandi`. Files with no underscore fall
/// back to `unknown`, logged as a warning (an intentionally fragile rule
/// inherited from the source system's naming convention).
fn derive_category(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    match stem.split('_').next() {
        Some(token) if !token.is_empty() && token.len() != stem.len() => token.to_string(),
        _ => {
            warn!(file = %path.display(), "file name has no category token, defaulting to 'unknown'");
            "unknown".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovers_nested_json_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("bandi_2024.json"), "").unwrap();
        fs::write(dir.path().join("sub").join("cig_2024.json"), "").unwrap();
        fs::write(dir.path().join("readme.txt"), "").unwrap();

        let files = discover_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.category == "bandi"));
        assert!(files.iter().any(|f| f.category == "cig"));
    }

    #[test]
    fn falls_back_to_unknown_category() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("noseparator.json"), "").unwrap();
        let files = discover_files(dir.path());
        assert_eq!(files[0].category, "unknown");
    }
}
