//! Per-project matching context: name aliases and known story-start instants.
//!
//! Both inputs are optional side-channels. The configured display name comes
//! from `.ralph/config.json`; story-start hints come from `ralph.log` lines of
//! the form `[YYYY-MM-DD HH:MM:SS] ... Starting story X.Y:` (local time).
//! Failures to read either source degrade to an empty value, never an error.

use crate::timestamp::TimestampParser;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

static STORY_START_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\].*Starting story (\d+\.\d+):").unwrap()
});

/// Everything the ranker needs to know about one project directory.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub dir: PathBuf,
    pub configured_name: Option<String>,
    /// Normalized name variants used for affinity scoring, never for identity.
    pub aliases: Vec<String>,
    pub story_starts: HashMap<String, Vec<DateTime<Utc>>>,
}

impl ProjectContext {
    pub fn load(dir: &Path) -> Self {
        let configured_name = load_project_name(dir);
        let aliases = project_aliases(dir, configured_name.as_deref());
        let story_starts = story_starts_from_log(dir);
        Self {
            dir: dir.to_path_buf(),
            configured_name,
            aliases,
            story_starts,
        }
    }

    /// Human-facing label for reports: the configured name, falling back to
    /// the directory name.
    pub fn display_name(&self) -> String {
        self.configured_name.clone().unwrap_or_else(|| {
            self.dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

/// Lowercase and strip everything except letters and digits.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn project_aliases(dir: &Path, configured_name: Option<&str>) -> Vec<String> {
    let mut raw: Vec<&str> = Vec::new();
    let dir_name = dir.file_name().map(|n| n.to_string_lossy().into_owned());
    if let Some(name) = dir_name.as_deref() {
        raw.push(name);
    }
    if let Some(name) = configured_name {
        raw.push(name);
    }
    raw.iter()
        .map(|name| normalize(name))
        .filter(|alias| !alias.is_empty())
        .collect()
}

fn load_project_name(dir: &Path) -> Option<String> {
    let config_path = dir.join(".ralph").join("config.json");
    let raw = fs::read_to_string(&config_path).ok()?;
    let data: Value = serde_json::from_str(&raw).ok()?;
    let name = data.pointer("/project/name")?.as_str()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn story_starts_from_log(dir: &Path) -> HashMap<String, Vec<DateTime<Utc>>> {
    let log_path = dir.join("ralph.log");
    match fs::read_to_string(&log_path) {
        Ok(content) => parse_story_starts(&content),
        Err(_) => HashMap::new(),
    }
}

/// Parse `Starting story` lines out of a project log. Lines with unparseable
/// local timestamps are skipped.
pub fn parse_story_starts(content: &str) -> HashMap<String, Vec<DateTime<Utc>>> {
    let mut starts: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();
    for line in content.lines() {
        let Some(caps) = STORY_START_PATTERN.captures(line) else {
            continue;
        };
        let Ok(instant) = TimestampParser::parse_local(&caps[1]) else {
            continue;
        };
        starts.entry(caps[2].to_string()).or_default().push(instant);
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("My Project_2"), "myproject2");
        assert_eq!(normalize("system-weather"), "systemweather");
        assert_eq!(normalize("--- ---"), "");
    }

    #[test]
    fn test_aliases_from_dir_and_configured_name() {
        let aliases = project_aliases(Path::new("/work/system-weather"), Some("Weather Station"));
        assert_eq!(aliases, vec!["systemweather", "weatherstation"]);
    }

    #[test]
    fn test_aliases_drop_empty_normalizations() {
        let aliases = project_aliases(Path::new("/work/app"), Some("***"));
        assert_eq!(aliases, vec!["app"]);
    }

    #[test]
    fn test_parse_story_starts_groups_by_id() {
        let log = "\
[2025-06-01 09:00:00] run begin\n\
[2025-06-01 09:05:00] worker: Starting story 3.2: build the index\n\
[2025-06-01 11:05:00] worker: Starting story 3.2: retry\n\
[2025-06-01 12:00:00] worker: Starting story 4.1: reporting\n\
not a log line\n";
        let starts = parse_story_starts(log);
        assert_eq!(starts.len(), 2);
        assert_eq!(starts["3.2"].len(), 2);
        assert_eq!(starts["4.1"].len(), 1);
    }

    #[test]
    fn test_parse_story_starts_skips_bad_timestamps() {
        let log = "[2025-13-99 09:05:00] Starting story 3.2: nope\n";
        assert!(parse_story_starts(log).is_empty());
    }

    #[test]
    fn test_parse_story_starts_converts_local_to_utc() {
        let log = "[2025-06-01 09:05:00] Starting story 3.2: build\n";
        let starts = parse_story_starts(log);
        let expected = TimestampParser::parse_local("2025-06-01 09:05:00").unwrap();
        assert_eq!(starts["3.2"], vec![expected]);
    }
}
