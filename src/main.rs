use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::warn;

use ralph_backfill::config::get_config;
use ralph_backfill::discovery::FileDiscovery;
use ralph_backfill::matcher::MatchTuning;
use ralph_backfill::patcher::RunPatcher;
use ralph_backfill::project::ProjectContext;
use ralph_backfill::report::{FileFailure, ReportPrinter};
use ralph_backfill::sizing_index::SizingIndex;
use ralph_backfill::{logging, RunSummary};

#[derive(Parser)]
#[command(name = "ralph-backfill")]
#[command(about = "Backfill Ralph run token/turn metrics from sizing measurements")]
#[command(version)]
struct Cli {
    /// Project directory to scan for .ralph/runs (repeatable)
    #[arg(long = "project", value_name = "DIR", required = true)]
    projects: Vec<PathBuf>,

    /// Additional sizing measurements.jsonl file (repeatable)
    #[arg(long = "sizing-file", value_name = "FILE")]
    sizing_files: Vec<PathBuf>,

    /// Max time distance between run timestamp and sizing record, in hours
    #[arg(long)]
    max_age_hours: Option<i64>,

    /// Rank gap below which two same-tier candidates are indistinguishable, in seconds
    #[arg(long)]
    ambiguity_window_secs: Option<i64>,

    /// Write changes to run files (default is dry-run)
    #[arg(long)]
    apply: bool,

    /// Output the report in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init_logging();
    let config = get_config();

    let projects: Vec<PathBuf> = cli
        .projects
        .iter()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
        .collect();

    // Discover run files per project up front so the header can report the
    // full count before any file is touched.
    let mut run_sets: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
    for project in &projects {
        let run_files = FileDiscovery::run_files_for(project)?;
        run_sets.push((project.clone(), run_files));
    }
    let run_file_count: usize = run_sets.iter().map(|(_, files)| files.len()).sum();
    if run_file_count == 0 {
        println!("No run files found under provided projects.");
        return Ok(());
    }

    let mut sizing_paths = FileDiscovery::default_sizing_files(&projects);
    sizing_paths.extend(
        cli.sizing_files
            .iter()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone())),
    );
    let sizing_paths = FileDiscovery::dedupe_paths(sizing_paths);

    let index = SizingIndex::load(&sizing_paths)?;
    if index.is_empty() {
        println!("No usable sizing records found; nothing to patch.");
        process::exit(1);
    }

    let tuning = MatchTuning {
        max_age_hours: cli.max_age_hours.unwrap_or(config.matching.max_age_hours),
        ambiguity_window_secs: cli
            .ambiguity_window_secs
            .unwrap_or(config.matching.ambiguity_window_secs),
    };
    let patcher = RunPatcher::new(&index, tuning, cli.apply);

    let mut summaries: Vec<RunSummary> = Vec::new();
    let mut failures: Vec<FileFailure> = Vec::new();
    for (project_dir, run_files) in &run_sets {
        let context = ProjectContext::load(project_dir);
        for run_path in run_files {
            match patcher.patch_file(run_path, &context) {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    // One bad run file never stops the batch.
                    warn!(file = %run_path.display(), error = %err, "run file skipped");
                    failures.push(FileFailure {
                        file: run_path.clone(),
                        error: format!("{:#}", err),
                    });
                }
            }
        }
    }

    let printer = ReportPrinter::new(cli.json, cli.apply);
    printer.print(&projects, run_file_count, index.stats(), &summaries, &failures);

    Ok(())
}
