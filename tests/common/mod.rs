use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a scratch project directory with an empty `.ralph/runs` tree.
/// Returns the tempdir guard alongside the project path.
pub fn project_tree(name: &str) -> Result<(TempDir, PathBuf)> {
    let temp = TempDir::new()?;
    let project = temp.path().join(name);
    fs::create_dir_all(project.join(".ralph").join("runs"))?;
    Ok((temp, project))
}

pub fn write_run_file(project: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = project.join(".ralph").join("runs").join(name);
    fs::write(&path, content)?;
    Ok(path)
}

pub fn write_sizing_file<S: AsRef<str>>(dir: &Path, name: &str, lines: &[S]) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut content = lines
        .iter()
        .map(|line| line.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    content.push('\n');
    fs::write(&path, content)?;
    Ok(path)
}

/// A sizing row tagged for the given story, tier-2 for "System Weather".
pub fn sizing_row(timestamp: &str, story: &str, input: i64, output: i64, turns: i64) -> String {
    format!(
        r#"{{"timestamp":"{ts}","schema_version":1,"task":{{"description":"Story {story} work"}},"dimensions":{{"session_id":"s-{story}","project":"System Weather","git_branch":"ralph/story-{story}","model":"claude"}},"actuals":{{"total_input_tokens":{input},"total_output_tokens":{output},"total_cache_creation":0,"total_cache_read":0,"message_count":{turns}}}}}"#,
        ts = timestamp,
        story = story,
        input = input,
        output = output,
        turns = turns,
    )
}
