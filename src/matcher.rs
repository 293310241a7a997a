//! Candidate ranking and selection.
//!
//! Run records and sizing records share no key, so a candidate is chosen by a
//! four-part rank compared lexicographically: project affinity, branch match,
//! model presence, then time closeness. Textual affinity is a much stronger
//! signal than timing between two independent streams, so the affinity tiers
//! dominate and time only breaks ties. When the top two candidates land in
//! the same affinity tier within a small time gap, neither can be trusted and
//! the pick is reported ambiguous instead of applied.

use crate::models::SizingRecord;
use crate::project::{normalize, ProjectContext};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use tracing::debug;

/// Tunable selection thresholds. Defaults come from configuration; tests
/// construct these directly.
#[derive(Debug, Clone, Copy)]
pub struct MatchTuning {
    pub max_age_hours: i64,
    pub ambiguity_window_secs: i64,
}

/// Four-part rank key with a derived lexicographic total order. Every field
/// is maximized; `closeness` wraps the time distance in `Reverse` so that a
/// smaller distance compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CandidateRank {
    pub project_affinity: u8,
    pub branch_match: bool,
    pub has_model: bool,
    pub closeness: Reverse<i64>,
}

impl CandidateRank {
    /// True when the non-time components agree, which is the precondition for
    /// the ambiguity rule.
    pub fn same_affinity(&self, other: &CandidateRank) -> bool {
        self.project_affinity == other.project_affinity
            && self.branch_match == other.branch_match
            && self.has_model == other.has_model
    }

    pub fn time_distance_secs(&self) -> i64 {
        self.closeness.0
    }
}

/// Outcome of candidate selection for one story.
#[derive(Debug, Clone, Copy)]
pub enum Pick<'a> {
    /// Nothing admissible: no usage data, or everything outside the age window.
    NoCandidate,
    /// A nominal best exists but the runner-up is statistically
    /// indistinguishable; the caller must not apply it.
    Ambiguous(&'a SizingRecord),
    Chosen(&'a SizingRecord),
}

/// Score one sizing record against a target story and run instant.
pub fn rank_candidate(
    candidate: &SizingRecord,
    story_id: &str,
    run_ts: DateTime<Utc>,
    context: &ProjectContext,
) -> CandidateRank {
    let cand_project = normalize(&candidate.project);
    let cand_branch = candidate.git_branch.to_lowercase();

    let project_affinity = if !cand_project.is_empty()
        && context
            .aliases
            .iter()
            .any(|alias| !alias.is_empty() && (cand_project == *alias || cand_project.contains(alias.as_str())))
    {
        2
    } else if cand_project.starts_with("story") {
        // Generic fallback tier: sizing rows often carry the story label as
        // their whole project field. Weaker than a real alias hit.
        1
    } else {
        0
    };

    let branch_needle = format!("story-{}", story_id);
    let branch_match = cand_branch.contains(&branch_needle);
    let has_model = !candidate.model.is_empty();

    let delta_run = (run_ts - candidate.timestamp).num_seconds().abs();
    // A "story started at T" hint from the project log can override plain
    // proximity to the run's own timestamp.
    let delta = context
        .story_starts
        .get(story_id)
        .into_iter()
        .flatten()
        .map(|start| (candidate.timestamp - *start).num_seconds().abs())
        .min()
        .map_or(delta_run, |delta_start| delta_run.min(delta_start));

    CandidateRank {
        project_affinity,
        branch_match,
        has_model,
        closeness: Reverse(delta),
    }
}

/// Filter candidates by admissibility, select the top-ranked one, and detect
/// statistical ties between the top two.
pub fn pick_candidate<'a>(
    story_id: &str,
    run_ts: DateTime<Utc>,
    candidates: &'a [SizingRecord],
    context: &ProjectContext,
    tuning: &MatchTuning,
) -> Pick<'a> {
    let max_age_secs = tuning.max_age_hours * 3600;

    let mut usable: Vec<(&SizingRecord, CandidateRank)> = candidates
        .iter()
        .filter(|candidate| candidate.actuals.is_some())
        .filter(|candidate| (run_ts - candidate.timestamp).num_seconds().abs() <= max_age_secs)
        .map(|candidate| (candidate, rank_candidate(candidate, story_id, run_ts, context)))
        .collect();

    if usable.is_empty() {
        return Pick::NoCandidate;
    }

    // Stable sort: among fully tied ranks the earliest observation wins.
    usable.sort_by(|a, b| b.1.cmp(&a.1));

    let (best, best_rank) = usable[0];
    if let Some((_, second_rank)) = usable.get(1) {
        let gap = (best_rank.time_distance_secs() - second_rank.time_distance_secs()).abs();
        if best_rank.same_affinity(second_rank) && gap < tuning.ambiguity_window_secs {
            return Pick::Ambiguous(best);
        }
    }

    if best_rank.project_affinity == 1 {
        debug!(
            story_id,
            project = %best.project,
            "picked via generic story-prefix tier; verify cross-project attribution"
        );
    }

    Pick::Chosen(best)
}
