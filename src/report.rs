//! Output Formatting and Display Management
//!
//! Renders the batch result either as colored human-readable terminal output
//! or as one structured JSON document for programmatic consumption. Each run
//! file gets a status line; skipped files and hard failures are called out
//! individually; a final aggregate summary closes the report.

use crate::models::RunSummary;
use crate::sizing_index::LoadStats;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// A run file that could not be evaluated at all (unreadable, unparseable).
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: String,
}

/// Whole-batch aggregates across all evaluated run files.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchTotals {
    pub files_changed: usize,
    pub stories_touched: usize,
    pub missing_candidates: usize,
    pub ambiguous_skipped: usize,
}

impl BatchTotals {
    pub fn collect(summaries: &[RunSummary]) -> Self {
        let mut totals = BatchTotals::default();
        for summary in summaries {
            if summary.error.is_some() {
                continue;
            }
            if summary.changed {
                totals.files_changed += 1;
                totals.stories_touched += summary.touched_stories;
            }
            totals.missing_candidates += summary.missing_candidates.len();
            totals.ambiguous_skipped += summary.skipped_ambiguous.len();
        }
        totals
    }
}

pub struct ReportPrinter {
    json_output: bool,
    apply: bool,
}

impl ReportPrinter {
    pub fn new(json_output: bool, apply: bool) -> Self {
        Self { json_output, apply }
    }

    pub fn print(
        &self,
        projects: &[PathBuf],
        run_file_count: usize,
        stats: &LoadStats,
        summaries: &[RunSummary],
        failures: &[FileFailure],
    ) {
        let totals = BatchTotals::collect(summaries);

        if self.json_output {
            let output = serde_json::json!({
                "mode": if self.apply { "apply" } else { "dry-run" },
                "projects": projects,
                "run_files": run_file_count,
                "sizing": stats,
                "files": summaries,
                "failures": failures,
                "totals": totals,
            });
            match serde_json::to_string_pretty(&output) {
                Ok(rendered) => println!("{}", rendered),
                Err(err) => eprintln!("Error serializing report: {}", err),
            }
            return;
        }

        self.print_header(projects, run_file_count, stats);
        for summary in summaries {
            self.print_file_line(summary);
        }
        for failure in failures {
            println!(
                "{} {} ({})",
                "[SKIP]".red(),
                failure.file.display(),
                failure.error
            );
        }
        println!();
        println!(
            "Summary: files_changed={}, stories_touched={}, missing_candidates={}, ambiguous_skipped={}",
            totals.files_changed,
            totals.stories_touched,
            totals.missing_candidates,
            totals.ambiguous_skipped
        );
    }

    fn print_header(&self, projects: &[PathBuf], run_file_count: usize, stats: &LoadStats) {
        let mode = if self.apply {
            "APPLY".green().bold()
        } else {
            "DRY-RUN".yellow().bold()
        };
        println!("Mode: {}", mode);
        let project_list: Vec<String> = projects
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        println!("Projects: {}", project_list.join(", "));
        println!("Run files discovered: {}", run_file_count);
        println!(
            "Sizing sources used: {} files, {} rows, {} story-tagged, {} with actuals, {} after dedupe",
            stats.files_used,
            stats.rows_total,
            stats.rows_with_story,
            stats.rows_with_actuals,
            stats.rows_deduped
        );
        println!();
    }

    fn print_file_line(&self, summary: &RunSummary) {
        if let Some(issue) = summary.error {
            println!("{} {} ({})", "[SKIP]".red(), summary.file.display(), issue);
            return;
        }

        let status = if summary.changed && self.apply {
            "[PATCHED]".green()
        } else if summary.changed {
            "[WOULD_PATCH]".yellow()
        } else {
            "[UNCHANGED]".dimmed()
        };
        println!(
            "{} {} stories={} touched={} tin={} tout={} turns={}",
            status,
            summary.file.display(),
            summary.stories_total,
            summary.touched_stories,
            summary.patched_fields.tokens_in,
            summary.patched_fields.tokens_out,
            summary.patched_fields.turns
        );

        if !summary.missing_candidates.is_empty() {
            println!(
                "  missing candidates: {}",
                summary.missing_candidates.join(", ")
            );
        }
        if !summary.skipped_ambiguous.is_empty() {
            println!(
                "  skipped ambiguous: {}",
                summary.skipped_ambiguous.join(", ")
            );
        }
        if let Some(backup) = &summary.backup {
            println!("  backup: {}", backup.display());
        }
    }
}
