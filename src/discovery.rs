use crate::config::get_config;
use anyhow::Result;
use glob::glob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Handles file system traversal and discovery of run files and sizing sources.
pub struct FileDiscovery;

impl FileDiscovery {
    /// Find the run files under one project, sorted by path.
    pub fn run_files_for(project_dir: &Path) -> Result<Vec<PathBuf>> {
        let runs_dir = project_dir.join(".ralph").join("runs");
        if !runs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let pattern = runs_dir.join("run-*.json");
        if let Ok(paths) = glob(&pattern.to_string_lossy()) {
            results.extend(paths.flatten());
        }
        results.sort();
        Ok(results)
    }

    /// The sizing sources consulted when none are given explicitly: the
    /// global canonical store plus each project's local store.
    pub fn default_sizing_files(project_dirs: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();

        // Global canonical store
        files.push(get_config().paths.sizing_home.join("measurements.jsonl"));

        // Common nearby stores
        for project in project_dirs {
            files.push(
                project
                    .join("_infra")
                    .join("sizing")
                    .join("data")
                    .join("measurements.jsonl"),
            );
        }

        Self::dedupe_paths(files)
    }

    /// Keep order while removing duplicates; existing paths are compared by
    /// their resolved form so two spellings of one file collapse.
    pub fn dedupe_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for path in paths {
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if seen.insert(key) {
                ordered.push(path);
            }
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_run_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let runs_dir = temp.path().join(".ralph").join("runs");
        fs::create_dir_all(&runs_dir).unwrap();
        fs::write(runs_dir.join("run-0002.json"), "{}").unwrap();
        fs::write(runs_dir.join("run-0001.json"), "{}").unwrap();
        fs::write(runs_dir.join("notes.txt"), "skip me").unwrap();

        let files = FileDiscovery::run_files_for(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["run-0001.json", "run-0002.json"]);
    }

    #[test]
    fn test_missing_runs_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(FileDiscovery::run_files_for(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_dedupe_paths_preserves_first_occurrence() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("measurements.jsonl");
        fs::write(&file, "").unwrap();

        let deduped = FileDiscovery::dedupe_paths(vec![
            file.clone(),
            file.clone(),
            PathBuf::from("/nonexistent/a.jsonl"),
            PathBuf::from("/nonexistent/a.jsonl"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0], file);
    }
}
