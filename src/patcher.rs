//! Run Patcher
//!
//! Applies sizing observations to one run file at a time. For every story
//! entry missing any of tokens_in/tokens_out/turns, the picker is consulted;
//! a usable candidate fills only the still-missing fields. Fields that are
//! already positive are never rewritten. When anything changed, the totals
//! sub-mapping is recomputed from the full story map so it always reflects
//! on-record state.
//!
//! Persistence is gated twice: apply mode must be on and at least one field
//! must have been written. A timestamped backup copy is taken before the
//! rewrite, so a run file is either fully rewritten behind a backup or left
//! untouched.

use crate::matcher::{pick_candidate, MatchTuning, Pick};
use crate::models::{to_count, PatchedFields, RunFileIssue, RunSummary};
use crate::project::ProjectContext;
use crate::sizing_index::SizingIndex;
use crate::timestamp::TimestampParser;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct RunPatcher<'a> {
    index: &'a SizingIndex,
    tuning: MatchTuning,
    apply: bool,
}

impl<'a> RunPatcher<'a> {
    pub fn new(index: &'a SizingIndex, tuning: MatchTuning, apply: bool) -> Self {
        Self {
            index,
            tuning,
            apply,
        }
    }

    /// Evaluate one run file, mutating it on disk only in apply mode and only
    /// when at least one field was patched.
    pub fn patch_file(&self, run_path: &Path, context: &ProjectContext) -> Result<RunSummary> {
        let raw = fs::read_to_string(run_path)
            .with_context(|| format!("failed to read run file: {}", run_path.display()))?;
        let mut doc: Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse run file: {}", run_path.display()))?;

        let run_ts = doc
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|value| TimestampParser::parse_utc(value).ok());
        let Some(run_ts) = run_ts else {
            return Ok(RunSummary::skipped(
                run_path.to_path_buf(),
                context.display_name(),
                RunFileIssue::InvalidOrMissingTimestamp,
            ));
        };

        let Some(stories) = doc.get_mut("stories").and_then(Value::as_object_mut) else {
            return Ok(RunSummary::skipped(
                run_path.to_path_buf(),
                context.display_name(),
                RunFileIssue::MissingStoriesMap,
            ));
        };

        let stories_total = stories.len();
        let mut changed = false;
        let mut touched_stories = 0;
        let mut patched_fields = PatchedFields::default();
        let mut missing_candidates: Vec<String> = Vec::new();
        let mut skipped_ambiguous: Vec<String> = Vec::new();

        for (sid, story) in stories.iter_mut() {
            let Some(story) = story.as_object_mut() else {
                continue;
            };

            let needs_tokens_in = to_count(story.get("tokens_in")) <= 0;
            let needs_tokens_out = to_count(story.get("tokens_out")) <= 0;
            let needs_turns = to_count(story.get("turns")) <= 0;
            if !(needs_tokens_in || needs_tokens_out || needs_turns) {
                continue;
            }

            let pick = pick_candidate(
                sid,
                run_ts,
                self.index.candidates(sid),
                context,
                &self.tuning,
            );
            let candidate = match pick {
                Pick::NoCandidate => {
                    missing_candidates.push(sid.clone());
                    continue;
                }
                Pick::Ambiguous(_) => {
                    debug!(story_id = %sid, file = %run_path.display(), "top candidates indistinguishable");
                    skipped_ambiguous.push(sid.clone());
                    continue;
                }
                Pick::Chosen(candidate) => candidate,
            };
            let Some(actuals) = candidate.actuals else {
                continue;
            };

            let mut updated_this_story = false;
            if needs_tokens_in && actuals.total_input_tokens > 0 {
                story.insert("tokens_in".to_string(), actuals.total_input_tokens.into());
                patched_fields.tokens_in += 1;
                updated_this_story = true;
            }
            if needs_tokens_out && actuals.total_output_tokens > 0 {
                story.insert("tokens_out".to_string(), actuals.total_output_tokens.into());
                patched_fields.tokens_out += 1;
                updated_this_story = true;
            }
            if needs_turns && actuals.message_count > 0 {
                story.insert("turns".to_string(), actuals.message_count.into());
                patched_fields.turns += 1;
                updated_this_story = true;
            }

            if updated_this_story {
                touched_stories += 1;
                changed = true;
            }
        }

        // Totals mirror the full story map, untouched entries included, but
        // only get recomputed when something actually moved.
        if changed {
            let (total_in, total_out) = sum_story_tokens(stories);
            set_totals(&mut doc, total_in, total_out);
        }

        let mut backup = None;
        if changed && self.apply {
            backup = Some(self.rewrite_with_backup(run_path, &doc)?);
        }

        missing_candidates.sort();
        missing_candidates.dedup();
        skipped_ambiguous.sort();
        skipped_ambiguous.dedup();

        Ok(RunSummary {
            file: run_path.to_path_buf(),
            project_name: context.display_name(),
            changed,
            touched_stories,
            patched_fields,
            missing_candidates,
            skipped_ambiguous,
            backup,
            stories_total,
            error: None,
        })
    }

    fn rewrite_with_backup(&self, run_path: &Path, doc: &Value) -> Result<PathBuf> {
        let stamp = TimestampParser::backup_stamp(Utc::now());
        let mut backup_name = run_path.as_os_str().to_os_string();
        backup_name.push(format!(".bak-{}", stamp));
        let backup_path = PathBuf::from(backup_name);

        fs::copy(run_path, &backup_path)
            .with_context(|| format!("failed to back up run file: {}", run_path.display()))?;

        let mut serialized = serde_json::to_string_pretty(doc)?;
        serialized.push('\n');
        fs::write(run_path, serialized)
            .with_context(|| format!("failed to rewrite run file: {}", run_path.display()))?;

        info!(file = %run_path.display(), backup = %backup_path.display(), "run file patched");
        Ok(backup_path)
    }
}

fn sum_story_tokens(stories: &Map<String, Value>) -> (i64, i64) {
    let mut total_in = 0;
    let mut total_out = 0;
    for story in stories.values() {
        let fields = story.as_object();
        total_in += to_count(fields.and_then(|map| map.get("tokens_in")));
        total_out += to_count(fields.and_then(|map| map.get("tokens_out")));
    }
    (total_in, total_out)
}

fn set_totals(doc: &mut Value, total_in: i64, total_out: i64) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };
    let totals = root
        .entry("totals".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !totals.is_object() {
        *totals = Value::Object(Map::new());
    }
    if let Some(totals) = totals.as_object_mut() {
        totals.insert("tokens_in".to_string(), total_in.into());
        totals.insert("tokens_out".to_string(), total_out.into());
    }
}
