// `trickle preview` — compute and print the schedule without executing
// anything. Clones the remote to diff against, then throws the clone away.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use serde::Serialize;

use trickle_common::types::{ChunkStrategy, PushStrategy, ScheduledCommit};

use crate::config::{self, ResolvedConfig};
use crate::output::{self, Color, OutputFormat};
use crate::{chunk, detect, distribute, provision};

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Path to the config file.
    #[arg(default_value = "trickle.yaml")]
    config: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub remote: String,
    pub source_dir: PathBuf,
    pub window_start: DateTime<Local>,
    pub window_end: DateTime<Local>,
    pub chunk_by: ChunkStrategy,
    pub push_strategy: PushStrategy,
    pub commits: Vec<PlannedCommit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedCommit {
    pub scheduled_time: DateTime<Local>,
    pub label: String,
    pub message: String,
    pub files: Vec<String>,
    /// Already elapsed at preview time; `trickle run` would skip it.
    pub in_past: bool,
}

pub fn run(args: PreviewArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let config = config::load(&args.config)?;

    let workspace = provision::provision(&config.remote, None)
        .with_context(|| format!("failed to provision a working copy of {}", config.remote))?;
    let changed = detect::detect_changed_files(&config.source_dir, &workspace.dir);
    workspace.remove();
    let changed = changed?;

    if changed.is_empty() {
        output::print_warning(
            format,
            "no differences detected — local tree matches the remote HEAD",
        );
        return Ok(());
    }

    let chunks = chunk::chunk_files(&changed, config.chunk_by);
    let mut rng = rand::thread_rng();
    let scheduled =
        distribute::assign_times(chunks, config.window_start, config.window_end, &mut rng);

    let report = build_report(&config, scheduled, Local::now());

    let past_count = report.commits.iter().filter(|c| c.in_past).count();
    if past_count > 0 {
        output::print_warning(
            format,
            &format!("{past_count} commit(s) fall before now and would be skipped by `trickle run`"),
        );
    }

    output::print_output(format, &report, format_human)?;
    Ok(())
}

fn build_report(
    config: &ResolvedConfig,
    scheduled: Vec<ScheduledCommit>,
    now: DateTime<Local>,
) -> PreviewReport {
    let commits = scheduled
        .into_iter()
        .map(|s| PlannedCommit {
            in_past: s.scheduled_time <= now,
            scheduled_time: s.scheduled_time,
            label: s.chunk.label,
            message: s.chunk.message,
            files: s.chunk.files,
        })
        .collect();

    PreviewReport {
        remote: config.remote.clone(),
        source_dir: config.source_dir.clone(),
        window_start: config.window_start,
        window_end: config.window_end,
        chunk_by: config.chunk_by,
        push_strategy: config.push_strategy,
        commits,
    }
}

fn format_human(report: &PreviewReport) -> String {
    let mut lines = Vec::new();

    lines.push("─── trickle preview ─────────────────────────────".to_string());
    lines.push(format!("Remote:    {}", report.remote));
    lines.push(format!("Source:    {}", report.source_dir.display()));
    lines.push(format!(
        "Window:    {} → {} ({})",
        report.window_start.format("%H:%M"),
        report.window_end.format("%H:%M"),
        report.window_start.format("%Y-%m-%d"),
    ));
    lines.push(format!("Chunk by:  {}", report.chunk_by));
    lines.push(format!("Push:      {}", report.push_strategy));
    lines.push(format!("Commits:   {}", report.commits.len()));
    lines.push(String::new());

    for (i, commit) in report.commits.iter().enumerate() {
        let status = if commit.in_past {
            output::paint(Color::Red, "[skip]")
        } else {
            output::paint(Color::Green, "[ ok ]")
        };
        lines.push(format!(
            "  {status} #{} {} {} — {:?}",
            i + 1,
            commit.scheduled_time.format("%H:%M:%S"),
            commit.label,
            commit.message,
        ));
        for file in &commit.files {
            lines.push(output::paint(Color::Dim, &format!("           ↳ {file}")));
        }
    }

    let future = report.commits.iter().filter(|c| !c.in_past).count();
    lines.push(String::new());
    if future == 0 {
        lines.push("All commits are in the past. Adjust window.start or window.end.".to_string());
    } else {
        lines.push(format!("Ready to schedule {future} commit(s). Run: trickle run"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use trickle_common::types::CommitChunk;

    use super::*;

    fn sample_config() -> ResolvedConfig {
        let start = Local.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap();
        ResolvedConfig {
            remote: "https://github.com/user/repo.git".into(),
            source_dir: PathBuf::from("/home/user/project"),
            window: crate::config::WindowSpec {
                start: "09:00".into(),
                end: "17:00".into(),
                date: Some("2026-08-06".into()),
            },
            chunk_by: ChunkStrategy::Directory,
            author: None,
            push_strategy: PushStrategy::Immediate,
            window_start: start,
            window_end: start + Duration::hours(8),
        }
    }

    fn scheduled_at(hour: u32, label: &str) -> ScheduledCommit {
        ScheduledCommit {
            chunk: CommitChunk {
                files: vec![format!("{label}/a.rs")],
                label: label.into(),
                message: format!("Update {label}"),
            },
            scheduled_time: Local.with_ymd_and_hms(2026, 8, 6, hour, 30, 12).unwrap(),
        }
    }

    #[test]
    fn report_marks_elapsed_commits_as_past() {
        let config = sample_config();
        let now = Local.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        let report =
            build_report(&config, vec![scheduled_at(10, "src"), scheduled_at(15, "docs")], now);

        assert!(report.commits[0].in_past);
        assert!(!report.commits[1].in_past);
    }

    #[test]
    fn human_format_shows_the_timeline() {
        let config = sample_config();
        let now = Local.with_ymd_and_hms(2026, 8, 6, 8, 0, 0).unwrap();
        let report =
            build_report(&config, vec![scheduled_at(10, "src"), scheduled_at(15, "docs")], now);

        let text = format_human(&report);
        assert!(text.contains("Commits:   2"));
        assert!(text.contains("10:30:12"));
        assert!(text.contains("Update src"));
        assert!(text.contains("src/a.rs"));
        assert!(text.contains("Ready to schedule 2 commit(s)"));
    }

    #[test]
    fn human_format_flags_an_all_past_schedule() {
        let config = sample_config();
        let now = Local.with_ymd_and_hms(2026, 8, 6, 23, 0, 0).unwrap();
        let report = build_report(&config, vec![scheduled_at(10, "src")], now);

        let text = format_human(&report);
        assert!(text.contains("All commits are in the past"));
    }

    #[test]
    fn report_serializes_with_camel_case_keys() {
        let config = sample_config();
        let now = Local.with_ymd_and_hms(2026, 8, 6, 8, 0, 0).unwrap();
        let report = build_report(&config, vec![scheduled_at(10, "src")], now);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("windowStart").is_some());
        assert!(json["commits"][0].get("scheduledTime").is_some());
        assert!(json["commits"][0].get("inPast").is_some());
    }
}
