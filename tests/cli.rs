//! Binary-level behavior: exit codes, report text, on-disk effects.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;

mod common;

fn backfill() -> Command {
    Command::cargo_bin("ralph-backfill").unwrap()
}

#[test]
fn test_missing_project_flag_is_usage_error() {
    backfill().assert().failure().code(2);
}

#[test]
fn test_no_run_files_exits_cleanly() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    backfill()
        .arg("--project")
        .arg(temp.path())
        .env("RALPH_SIZING_DIR", temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No run files found"));
    Ok(())
}

#[test]
fn test_no_usable_sizing_records_aborts() -> anyhow::Result<()> {
    let (_guard, project) = common::project_tree("system-weather")?;
    common::write_run_file(
        &project,
        "run-0001.json",
        r#"{"timestamp": "2025-06-01T12:00:00Z", "stories": {}}"#,
    )?;
    let empty = common::write_sizing_file(&project, "measurements.jsonl", &["not json"])?;

    backfill()
        .arg("--project")
        .arg(&project)
        .arg("--sizing-file")
        .arg(&empty)
        .env("RALPH_SIZING_DIR", project.join("nowhere"))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("No usable sizing records"));
    Ok(())
}

#[test]
fn test_dry_run_reports_without_mutating() -> anyhow::Result<()> {
    let (_guard, project) = common::project_tree("system-weather")?;
    let run = r#"{"timestamp": "2025-06-01T12:00:00Z", "stories": {"3.2": {"tokens_in": 0, "tokens_out": 0, "turns": 0}}}"#;
    let run_path = common::write_run_file(&project, "run-0001.json", run)?;
    let sizing = common::write_sizing_file(
        &project,
        "measurements.jsonl",
        &[&common::sizing_row("2025-06-01T11:00:00Z", "3.2", 1200, 900, 8)],
    )?;

    backfill()
        .arg("--project")
        .arg(&project)
        .arg("--sizing-file")
        .arg(&sizing)
        .env("RALPH_SIZING_DIR", project.join("nowhere"))
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY-RUN"))
        .stdout(predicate::str::contains("WOULD_PATCH"))
        .stdout(predicate::str::contains("files_changed=1"));

    assert_eq!(fs::read_to_string(&run_path)?, run);
    Ok(())
}

#[test]
fn test_apply_patches_on_disk() -> anyhow::Result<()> {
    let (_guard, project) = common::project_tree("system-weather")?;
    let run = r#"{"timestamp": "2025-06-01T12:00:00Z", "stories": {"3.2": {"tokens_in": 0, "tokens_out": 0, "turns": 0}}}"#;
    let run_path = common::write_run_file(&project, "run-0001.json", run)?;
    let sizing = common::write_sizing_file(
        &project,
        "measurements.jsonl",
        &[&common::sizing_row("2025-06-01T11:00:00Z", "3.2", 1200, 900, 8)],
    )?;

    backfill()
        .arg("--project")
        .arg(&project)
        .arg("--sizing-file")
        .arg(&sizing)
        .arg("--apply")
        .env("RALPH_SIZING_DIR", project.join("nowhere"))
        .assert()
        .success()
        .stdout(predicate::str::contains("PATCHED"))
        .stdout(predicate::str::contains("backup:"));

    let doc: Value = serde_json::from_str(&fs::read_to_string(&run_path)?)?;
    assert_eq!(doc["stories"]["3.2"]["tokens_in"], 1200);
    assert_eq!(doc["totals"]["tokens_in"], 1200);

    let backups: Vec<_> = fs::read_dir(project.join(".ralph").join("runs"))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with("run-0001.json.bak-")
        })
        .collect();
    assert_eq!(backups.len(), 1);
    Ok(())
}

#[test]
fn test_json_report_shape() -> anyhow::Result<()> {
    let (_guard, project) = common::project_tree("system-weather")?;
    common::write_run_file(
        &project,
        "run-0001.json",
        r#"{"timestamp": "2025-06-01T12:00:00Z", "stories": {"3.2": {"tokens_in": 0, "tokens_out": 0, "turns": 0}}}"#,
    )?;
    let sizing = common::write_sizing_file(
        &project,
        "measurements.jsonl",
        &[&common::sizing_row("2025-06-01T11:00:00Z", "3.2", 1200, 900, 8)],
    )?;

    let output = backfill()
        .arg("--project")
        .arg(&project)
        .arg("--sizing-file")
        .arg(&sizing)
        .arg("--json")
        .env("RALPH_SIZING_DIR", project.join("nowhere"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output)?;
    assert_eq!(report["mode"], "dry-run");
    assert_eq!(report["run_files"], 1);
    assert_eq!(report["totals"]["files_changed"], 1);
    assert_eq!(report["files"][0]["patched_fields"]["tokens_in"], 1);
    assert_eq!(report["sizing"]["rows_deduped"], 1);
    Ok(())
}

#[test]
fn test_max_age_override_excludes_candidates() -> anyhow::Result<()> {
    let (_guard, project) = common::project_tree("system-weather")?;
    common::write_run_file(
        &project,
        "run-0001.json",
        r#"{"timestamp": "2025-06-01T12:00:00Z", "stories": {"3.2": {"tokens_in": 0, "tokens_out": 0, "turns": 0}}}"#,
    )?;
    // Two hours out; admissible by default, inadmissible at --max-age-hours 1.
    let sizing = common::write_sizing_file(
        &project,
        "measurements.jsonl",
        &[&common::sizing_row("2025-06-01T10:00:00Z", "3.2", 1200, 900, 8)],
    )?;

    backfill()
        .arg("--project")
        .arg(&project)
        .arg("--sizing-file")
        .arg(&sizing)
        .arg("--max-age-hours")
        .arg("1")
        .env("RALPH_SIZING_DIR", project.join("nowhere"))
        .assert()
        .success()
        .stdout(predicate::str::contains("missing candidates: 3.2"));
    Ok(())
}
