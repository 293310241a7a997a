//! Core Data Models
//!
//! This module defines the data structures flowing through the backfill
//! pipeline:
//!
//! 1. **Raw Data**: [`SizingRow`] - Individual rows parsed from measurements.jsonl
//! 2. **Index**: [`SizingRecord`] - Usable observations after extraction and dedupe
//! 3. **Output**: [`RunSummary`] - Per-run-file patch report
//!
//! Run files themselves are handled as `serde_json::Value` documents so that
//! fields the tool does not manage survive a rewrite untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Raw measurement row as it appears in a sizing JSONL source. Every field is
/// optional; rows are parsed best-effort and unusable ones are dropped upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct SizingRow {
    pub timestamp: Option<String>,
    pub task: Option<TaskInfo>,
    pub dimensions: Option<Dimensions>,
    pub actuals: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInfo {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dimensions {
    pub session_id: Option<String>,
    pub project: Option<String>,
    pub git_branch: Option<String>,
    pub model: Option<String>,
}

/// One usable sizing observation: story-tagged, timestamped, deduplicated.
/// Immutable once loaded into the index.
#[derive(Debug, Clone)]
pub struct SizingRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub project: String,
    pub git_branch: String,
    pub model: String,
    pub actuals: Option<ActualUsage>,
}

/// The five actual-usage counters carried by a sizing record. Absent or
/// non-numeric counters read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ActualUsage {
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_cache_creation: i64,
    pub total_cache_read: i64,
    pub message_count: i64,
}

impl ActualUsage {
    /// Returns `Some` only when the raw value is a JSON object; anything else
    /// means the record carries no usable counters.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            total_input_tokens: to_count(map.get("total_input_tokens")),
            total_output_tokens: to_count(map.get("total_output_tokens")),
            total_cache_creation: to_count(map.get("total_cache_creation")),
            total_cache_read: to_count(map.get("total_cache_read")),
            message_count: to_count(map.get("message_count")),
        })
    }
}

/// Best-effort integer coercion for loosely-typed JSON fields: integers pass
/// through, floats truncate, numeric strings parse, everything else is 0.
pub fn to_count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Why a run file was skipped without being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunFileIssue {
    InvalidOrMissingTimestamp,
    MissingStoriesMap,
}

impl fmt::Display for RunFileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFileIssue::InvalidOrMissingTimestamp => write!(f, "invalid_or_missing_timestamp"),
            RunFileIssue::MissingStoriesMap => write!(f, "missing_stories_map"),
        }
    }
}

/// How many times each patchable field was written across a run file.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PatchedFields {
    pub tokens_in: usize,
    pub tokens_out: usize,
    pub turns: usize,
}

/// Per-run-file evaluation result, consumed by the report layer.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub file: PathBuf,
    pub project_name: String,
    pub changed: bool,
    pub touched_stories: usize,
    pub patched_fields: PatchedFields,
    pub missing_candidates: Vec<String>,
    pub skipped_ambiguous: Vec<String>,
    pub backup: Option<PathBuf>,
    pub stories_total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunFileIssue>,
}

impl RunSummary {
    /// Summary for a file skipped before any story was evaluated.
    pub fn skipped(file: PathBuf, project_name: String, issue: RunFileIssue) -> Self {
        Self {
            file,
            project_name,
            changed: false,
            touched_stories: 0,
            patched_fields: PatchedFields::default(),
            missing_candidates: Vec::new(),
            skipped_ambiguous: Vec::new(),
            backup: None,
            stories_total: 0,
            error: Some(issue),
        }
    }
}
