// `trickle status` — report schedule progress from on-disk artifacts.
//
// Never talks to the daemon. Successful finalization deletes the schedule
// file, so a surviving schedule is either still in flight (no results
// artifact yet) or was interrupted (partial results present alongside it).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use serde::Serialize;

use trickle_common::paths;
use trickle_common::types::{CommitResult, Schedule};

use crate::output::{self, Color, OutputFormat};

const LOG_TAIL_LINES: usize = 10;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Schedule id (any unique prefix); omit to show all schedules.
    id: Option<String>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    /// Daemon still in flight: no results artifact yet.
    Running,
    /// Partial results exist but the schedule was never finalized.
    Interrupted,
    /// Finalized: the schedule artifact is gone, only results remain.
    Complete,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    pub id: String,
    pub remote: String,
    pub state: ScheduleState,
    pub commits_total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<CommitResult>>,
    pub pending: Vec<PendingCommit>,
    pub log_tail: Vec<String>,
    pub log_file: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCommit {
    pub scheduled_time: chrono::DateTime<Local>,
    pub message: String,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let dir = paths::schedules_dir().context("could not determine home directory")?;

    let schedule_files = list_schedule_files(&dir, args.id.as_deref())?;
    if schedule_files.is_empty() {
        // Finalization deletes the schedule file; a completed run is only
        // visible through its surviving results artifact.
        if let Some(id) = &args.id {
            if let Some(completed) = read_completed(id)? {
                output::print_output(format, &completed, format_completed)?;
                return Ok(());
            }
        }

        let message = match &args.id {
            Some(id) => format!("no schedule found with id {id}"),
            None => "no active schedules — completed runs clean up after themselves".to_string(),
        };
        output::print_warning(format, &message);
        return Ok(());
    }

    let mut statuses = Vec::new();
    for path in &schedule_files {
        statuses.push(read_status(path)?);
    }

    output::print_output(format, &statuses, format_human)?;
    Ok(())
}

fn list_schedule_files(dir: &Path, id_prefix: Option<&str>) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter(|path| match id_prefix {
            Some(prefix) => path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.starts_with(prefix)),
            None => true,
        })
        .collect();

    files.sort();
    Ok(files)
}

fn read_status(schedule_path: &Path) -> Result<ScheduleStatus> {
    let raw = std::fs::read_to_string(schedule_path)
        .with_context(|| format!("failed to read {}", schedule_path.display()))?;
    let schedule: Schedule = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", schedule_path.display()))?;

    let results_path = paths::results_file(&schedule.log_file);
    let results = if results_path.exists() {
        let raw = std::fs::read_to_string(&results_path)
            .with_context(|| format!("failed to read {}", results_path.display()))?;
        let parsed: Vec<CommitResult> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", results_path.display()))?;
        Some(parsed)
    } else {
        None
    };

    let state =
        if results.is_some() { ScheduleState::Interrupted } else { ScheduleState::Running };

    let now = Local::now();
    let pending = schedule
        .commits
        .iter()
        .filter(|commit| commit.scheduled_time > now)
        .map(|commit| PendingCommit {
            scheduled_time: commit.scheduled_time,
            message: commit.message.clone(),
        })
        .collect();

    Ok(ScheduleStatus {
        id: schedule.id,
        remote: schedule.remote,
        state,
        commits_total: schedule.commits.len(),
        results,
        pending,
        log_tail: tail_lines(&schedule.log_file, LOG_TAIL_LINES),
        log_file: schedule.log_file,
    })
}

/// A finalized run, reconstructed from its results artifact alone.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedRun {
    pub id: String,
    pub state: ScheduleState,
    pub results: Vec<CommitResult>,
    pub log_file: PathBuf,
}

fn read_completed(id_prefix: &str) -> Result<Option<CompletedRun>> {
    match paths::logs_dir() {
        Some(dir) => read_completed_in(&dir, id_prefix),
        None => Ok(None),
    }
}

fn read_completed_in(logs_dir: &Path, id_prefix: &str) -> Result<Option<CompletedRun>> {
    if !logs_dir.exists() {
        return Ok(None);
    }

    let mut candidates: Vec<String> = std::fs::read_dir(logs_dir)
        .with_context(|| format!("failed to read {}", logs_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter_map(|name| name.strip_suffix("-results.json").map(str::to_string))
        .filter(|id| id.starts_with(id_prefix))
        .collect();
    candidates.sort();

    let Some(id) = candidates.into_iter().next() else {
        return Ok(None);
    };

    let results_path = logs_dir.join(format!("{id}-results.json"));
    let raw = std::fs::read_to_string(&results_path)
        .with_context(|| format!("failed to read {}", results_path.display()))?;
    let results: Vec<CommitResult> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", results_path.display()))?;

    Ok(Some(CompletedRun {
        log_file: logs_dir.join(format!("{id}.log")),
        id,
        state: ScheduleState::Complete,
        results,
    }))
}

fn format_completed(run: &CompletedRun) -> String {
    let mut lines = Vec::new();

    lines.push(format!("─── schedule {} ─────────────────────────────", run.id));
    lines.push(format!("State:   {}", output::paint(Color::Green, "complete")));
    lines.push(String::new());

    for (i, result) in run.results.iter().enumerate() {
        lines.push(render_result(i, result));
    }

    lines.push(String::new());
    lines.push(output::paint(Color::Dim, &format!("Log: {}", run.log_file.display())));
    lines.join("\n")
}

/// Last `n` journal lines, or nothing if the journal doesn't exist yet.
fn tail_lines(path: &Path, n: usize) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(n);
            lines[start..].iter().map(|line| line.to_string()).collect()
        }
        Err(_) => Vec::new(),
    }
}

fn format_human(statuses: &Vec<ScheduleStatus>) -> String {
    let mut lines = Vec::new();

    for status in statuses {
        lines.push(format!("─── schedule {} ─────────────────────────────", status.id));
        lines.push(format!("Remote:  {}", status.remote));
        lines.push(format!("Commits: {}", status.commits_total));

        match status.state {
            ScheduleState::Interrupted | ScheduleState::Complete => {
                let label = if status.state == ScheduleState::Complete {
                    output::paint(Color::Green, "complete")
                } else {
                    output::paint(Color::Yellow, "interrupted (partial results kept)")
                };
                lines.push(format!("State:   {label}"));
                lines.push(String::new());
                if let Some(results) = &status.results {
                    for (i, result) in results.iter().enumerate() {
                        lines.push(render_result(i, result));
                    }
                }
            }
            ScheduleState::Running => {
                lines.push(format!("State:   {}", output::paint(Color::Green, "running")));
                lines.push(String::new());

                if !status.log_tail.is_empty() {
                    lines.push("Recent log:".to_string());
                    for line in &status.log_tail {
                        lines.push(output::paint(Color::Dim, &format!("  {line}")));
                    }
                    lines.push(String::new());
                }

                for commit in &status.pending {
                    lines.push(format!(
                        "  ⏳ {}  {:?}",
                        commit.scheduled_time.format("%H:%M:%S"),
                        commit.message,
                    ));
                }
            }
        }

        lines.push(String::new());
        lines.push(output::paint(
            Color::Dim,
            &format!("Log: {}", status.log_file.display()),
        ));
    }

    lines.join("\n")
}

fn render_result(index: usize, result: &CommitResult) -> String {
    let icon = if result.success {
        output::paint(Color::Green, "✓")
    } else {
        output::paint(Color::Red, "✗")
    };
    let hash = if result.commit_hash.is_empty() {
        output::paint(Color::Red, "no hash")
    } else {
        result.commit_hash.chars().take(7).collect()
    };

    let mut line = format!(
        "  {icon} #{}  {}  {:?}  {hash}",
        index + 1,
        result.executed_at.format("%H:%M:%S"),
        result.message,
    );
    if let Some(error) = &result.error {
        line.push_str(&format!("\n        {error}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;
    use trickle_common::types::{PushStrategy, ScheduledEntry};

    use super::*;

    fn write_schedule(dir: &Path, id: &str, commits: Vec<ScheduledEntry>) -> PathBuf {
        let schedule = Schedule {
            id: id.to_string(),
            remote: "https://github.com/user/repo.git".into(),
            source_dir: PathBuf::from("/src"),
            work_dir: dir.join("work"),
            author: None,
            push_strategy: PushStrategy::Immediate,
            log_file: dir.join(format!("{id}.log")),
            commits,
        };
        let path = dir.join(format!("{id}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(&schedule).unwrap()).unwrap();
        path
    }

    fn entry_at(time: chrono::DateTime<Local>, message: &str) -> ScheduledEntry {
        ScheduledEntry {
            scheduled_time: time,
            files: vec!["a.rs".into()],
            message: message.into(),
        }
    }

    #[test]
    fn running_schedule_reports_pending_commits_and_log_tail() {
        let dir = TempDir::new().unwrap();
        let future = Local::now() + Duration::hours(2);
        let past = Local::now() - Duration::hours(2);
        let path = write_schedule(
            dir.path(),
            "abc123",
            vec![entry_at(past, "Update src"), entry_at(future, "Update docs")],
        );
        std::fs::write(dir.path().join("abc123.log"), "[t1] line one\n[t2] line two\n").unwrap();

        let status = read_status(&path).unwrap();

        assert_eq!(status.state, ScheduleState::Running);
        assert_eq!(status.commits_total, 2);
        assert_eq!(status.pending.len(), 1);
        assert_eq!(status.pending[0].message, "Update docs");
        assert_eq!(status.log_tail, vec!["[t1] line one", "[t2] line two"]);
    }

    #[test]
    fn results_artifact_marks_the_schedule_interrupted() {
        let dir = TempDir::new().unwrap();
        let path = write_schedule(
            dir.path(),
            "def456",
            vec![entry_at(Local::now() + Duration::hours(1), "Update src")],
        );

        let result = CommitResult {
            message: "Update src".into(),
            files: vec!["src/a.rs".into()],
            scheduled_time: Local.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap(),
            executed_at: Local.with_ymd_and_hms(2026, 8, 6, 10, 0, 1).unwrap(),
            commit_hash: "abc".into(),
            success: true,
            error: None,
        };
        std::fs::write(
            dir.path().join("def456-results.json"),
            serde_json::to_string(&vec![result]).unwrap(),
        )
        .unwrap();

        let status = read_status(&path).unwrap();
        assert_eq!(status.state, ScheduleState::Interrupted);
        assert_eq!(status.results.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn tail_keeps_only_the_last_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.log");
        let content: String = (0..25).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&path, content).unwrap();

        let tail = tail_lines(&path, 10);
        assert_eq!(tail.len(), 10);
        assert_eq!(tail[0], "line 15");
        assert_eq!(tail[9], "line 24");
    }

    #[test]
    fn tail_of_a_missing_journal_is_empty() {
        assert!(tail_lines(Path::new("/nonexistent/trickle.log"), 10).is_empty());
    }

    #[test]
    fn listing_filters_by_id_prefix() {
        let dir = TempDir::new().unwrap();
        write_schedule(dir.path(), "abc123", Vec::new());
        write_schedule(dir.path(), "abd999", Vec::new());

        let all = list_schedule_files(dir.path(), None).unwrap();
        assert_eq!(all.len(), 2);

        let filtered = list_schedule_files(dir.path(), Some("abc")).unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].ends_with("abc123.json"));

        let none = list_schedule_files(dir.path(), Some("zzz")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn listing_a_missing_directory_is_empty() {
        let files = list_schedule_files(Path::new("/nonexistent/trickle"), None).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn completed_run_is_found_from_its_results_artifact() {
        let dir = TempDir::new().unwrap();
        let result = CommitResult {
            message: "Update src".into(),
            files: vec!["src/a.rs".into()],
            scheduled_time: Local.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap(),
            executed_at: Local.with_ymd_and_hms(2026, 8, 6, 10, 0, 1).unwrap(),
            commit_hash: "abc1234".into(),
            success: true,
            error: None,
        };
        std::fs::write(
            dir.path().join("abc123-results.json"),
            serde_json::to_string(&vec![result]).unwrap(),
        )
        .unwrap();

        let completed = read_completed_in(dir.path(), "abc").unwrap().unwrap();
        assert_eq!(completed.id, "abc123");
        assert_eq!(completed.state, ScheduleState::Complete);
        assert_eq!(completed.results.len(), 1);
        assert!(completed.log_file.ends_with("abc123.log"));

        let text = format_completed(&completed);
        assert!(text.contains("complete"));
        assert!(text.contains("abc1234"));
    }

    #[test]
    fn completed_lookup_misses_return_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_completed_in(dir.path(), "zzz").unwrap().is_none());
        assert!(read_completed_in(Path::new("/nonexistent/logs"), "abc").unwrap().is_none());
    }

    #[test]
    fn human_format_renders_interrupted_results() {
        let status = ScheduleStatus {
            id: "abc".into(),
            remote: "https://github.com/user/repo.git".into(),
            state: ScheduleState::Interrupted,
            commits_total: 1,
            results: Some(vec![CommitResult {
                message: "Update src".into(),
                files: vec!["src/a.rs".into()],
                scheduled_time: Local.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap(),
                executed_at: Local.with_ymd_and_hms(2026, 8, 6, 10, 0, 1).unwrap(),
                commit_hash: String::new(),
                success: false,
                error: Some("no changes staged".into()),
            }]),
            pending: Vec::new(),
            log_tail: Vec::new(),
            log_file: PathBuf::from("/x.log"),
        };

        let text = format_human(&vec![status]);
        assert!(text.contains("interrupted"));
        assert!(text.contains("no hash"));
        assert!(text.contains("no changes staged"));
    }
}
