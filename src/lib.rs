//! Ralph Backfill Library
//!
//! Reconciles two independently produced record streams: Ralph run files
//! (per-project execution logs mapping story identifiers to token/turn
//! fields) and sizing measurement records (line-delimited JSON observations
//! of actual usage, tagged only with free text). Missing or zero fields in
//! run records are filled from the best-matching sizing record; populated
//! fields are never overwritten.
//!
//! ## Pipeline
//!
//! 1. [`discovery`] - Finds run files and sizing sources on disk
//! 2. [`sizing_index`] - Parses, deduplicates, and groups sizing records by story
//! 3. [`project`] - Per-project aliases and story-start hints for scoring
//! 4. [`matcher`] - Ranks candidates and refuses statistically tied picks
//! 5. [`patcher`] - Applies winning candidates to run files, dry-run by default
//! 6. [`report`] - Console and JSON reporting
//!
//! ## Matching Model
//!
//! The two streams share no key. A sizing record qualifies for a story only
//! through heuristics: a story identifier extracted from its text fields
//! ([`story_id`]), textual affinity between its project/branch labels and the
//! target project ([`matcher::CandidateRank`]), and time proximity to the run
//! (or to a logged story start). Affinity dominates timing; when the top two
//! candidates are indistinguishable the story is reported ambiguous and left
//! alone rather than risk misattribution.
//!
//! ## Safety Model
//!
//! Dry-run is the default. In apply mode, every modified file gets a
//! timestamped backup copy before being rewritten, and a file is either
//! fully rewritten or left untouched.

pub mod config;
pub mod discovery;
pub mod logging;
pub mod matcher;
pub mod models;
pub mod patcher;
pub mod project;
pub mod report;
pub mod sizing_index;
pub mod story_id;
pub mod timestamp;

pub use matcher::{pick_candidate, CandidateRank, MatchTuning, Pick};
pub use models::*;
pub use patcher::RunPatcher;
pub use project::ProjectContext;
pub use sizing_index::{LoadStats, SizingIndex};
