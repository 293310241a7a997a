//! Sizing Index
//!
//! Loads line-delimited sizing sources into an in-memory index grouped by
//! story identifier. Each line goes through the same gauntlet: parse as JSON,
//! extract a story identifier, parse the strict UTC timestamp, deduplicate on
//! the full observation identity. Survivors are grouped per story and sorted
//! ascending by timestamp. The index is built once and read-only afterwards.
//!
//! Malformed lines are common and non-fatal; they are counted and skipped.

use crate::models::{ActualUsage, SizingRecord, SizingRow};
use crate::story_id;
use crate::timestamp::TimestampParser;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::debug;

/// Load counters, reported after index construction and exposed for tests.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoadStats {
    pub files_used: usize,
    pub rows_total: usize,
    pub rows_with_story: usize,
    pub rows_with_actuals: usize,
    pub rows_deduped: usize,
}

/// Composite identity of one observation. Two rows with identical identity
/// are the same measurement and collapse to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObservationKey {
    story_id: String,
    timestamp: DateTime<Utc>,
    session_id: String,
    project: String,
    git_branch: String,
    model: String,
    counters: ActualUsage,
}

#[derive(Debug, Default)]
pub struct SizingIndex {
    by_story: HashMap<String, Vec<SizingRecord>>,
    stats: LoadStats,
}

impl SizingIndex {
    /// Build the index from a list of candidate source files. Files that do
    /// not exist are silently skipped; unreadable files are errors.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut index = SizingIndex::default();
        let mut seen: HashSet<ObservationKey> = HashSet::new();

        for path in paths {
            if !path.exists() {
                continue;
            }
            index.stats.files_used += 1;

            let file = File::open(path)
                .with_context(|| format!("failed to open sizing source: {}", path.display()))?;
            for line in BufReader::new(file).lines() {
                let line = line
                    .with_context(|| format!("failed to read sizing source: {}", path.display()))?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                index.stats.rows_total += 1;
                index.ingest_line(line, &mut seen);
            }
        }

        for records in index.by_story.values_mut() {
            records.sort_by_key(|record| record.timestamp);
        }

        Ok(index)
    }

    fn ingest_line(&mut self, line: &str, seen: &mut HashSet<ObservationKey>) {
        let row: SizingRow = match serde_json::from_str(line) {
            Ok(row) => row,
            Err(err) => {
                debug!(error = %err, "skipping unparseable sizing row");
                return;
            }
        };

        let description = row
            .task
            .as_ref()
            .and_then(|task| task.description.as_deref())
            .unwrap_or("");
        let dimensions = row.dimensions.unwrap_or_default();
        let project = dimensions.project.unwrap_or_default();
        let git_branch = dimensions.git_branch.unwrap_or_default();

        let Some(sid) = story_id::extract_story_id(description, &project, &git_branch) else {
            return;
        };
        self.stats.rows_with_story += 1;

        let Some(timestamp) = row
            .timestamp
            .as_deref()
            .and_then(|raw| TimestampParser::parse_utc(raw).ok())
        else {
            // Without an instant the record cannot participate in time-based
            // ranking at all.
            return;
        };

        let actuals = row.actuals.as_ref().and_then(ActualUsage::from_value);
        if actuals.is_some() {
            self.stats.rows_with_actuals += 1;
        }

        let record = SizingRecord {
            timestamp,
            session_id: dimensions.session_id.unwrap_or_default(),
            project,
            git_branch,
            model: dimensions.model.unwrap_or_default(),
            actuals,
        };

        let key = ObservationKey {
            story_id: sid.clone(),
            timestamp,
            session_id: record.session_id.clone(),
            project: record.project.clone(),
            git_branch: record.git_branch.clone(),
            model: record.model.clone(),
            counters: actuals.unwrap_or_default(),
        };
        if !seen.insert(key) {
            debug!(story_id = %sid, "skipping duplicate sizing observation");
            return;
        }
        self.stats.rows_deduped += 1;

        self.by_story.entry(sid).or_default().push(record);
    }

    /// All observations for a story, sorted ascending by timestamp.
    pub fn candidates(&self, story_id: &str) -> &[SizingRecord] {
        self.by_story
            .get(story_id)
            .map_or(&[], |records| records.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.by_story.is_empty()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }
}
