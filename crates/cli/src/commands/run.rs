// `trickle run` — detect changes, build the schedule, launch the daemon.
//
// The working copy provisioned here is handed off to the daemon, which
// owns it until finalization; it is only removed on this path when the run
// aborts before the daemon launches.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use trickle_common::paths;
use trickle_common::types::{Schedule, ScheduledCommit, ScheduledEntry};

use crate::config::{self, ResolvedConfig};
use crate::output::{self, Color, OutputFormat};
use crate::{chunk, detect, distribute, launcher, provision};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the config file.
    #[arg(default_value = "trickle.yaml")]
    config: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

/// What the user gets back after a successful launch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchReceipt {
    pub id: String,
    pub pid: u32,
    pub window_start: DateTime<Local>,
    pub window_end: DateTime<Local>,
    pub commits: Vec<LaunchedCommit>,
    pub log_file: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchedCommit {
    pub scheduled_time: DateTime<Local>,
    pub label: String,
    pub message: String,
}

pub fn run(args: RunArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let config = config::load(&args.config)?;

    let workspace = provision::provision(&config.remote, config.author.as_ref())
        .with_context(|| format!("failed to provision a working copy of {}", config.remote))?;

    // The daemon owns the working copy once launched; clean it up only on
    // the paths where no daemon ever starts.
    match build_and_launch(&config, &workspace.dir, format) {
        Ok(Some(receipt)) => {
            output::print_output(format, &receipt, format_human)?;
            Ok(())
        }
        Ok(None) => {
            workspace.remove();
            Ok(())
        }
        Err(error) => {
            workspace.remove();
            Err(error)
        }
    }
}

fn build_and_launch(
    config: &ResolvedConfig,
    work_dir: &Path,
    format: OutputFormat,
) -> Result<Option<LaunchReceipt>> {
    let changed = detect::detect_changed_files(&config.source_dir, work_dir)?;
    if changed.is_empty() {
        output::print_warning(
            format,
            "no differences detected — local tree matches the remote HEAD; nothing to do",
        );
        return Ok(None);
    }

    let chunks = chunk::chunk_files(&changed, config.chunk_by);
    let mut rng = rand::thread_rng();
    let scheduled =
        distribute::assign_times(chunks, config.window_start, config.window_end, &mut rng);

    let (future, past) = distribute::partition_future(scheduled, Local::now());
    if !past.is_empty() {
        output::print_warning(
            format,
            &format!("{} commit(s) fall before now and will be skipped", past.len()),
        );
    }
    if future.is_empty() {
        bail!(
            "no commits are scheduled in the future — \
             adjust window.start/window.end or run earlier in the day"
        );
    }

    // Stage everything in the working copy now; the daemon git-adds each
    // chunk at fire time.
    provision::copy_files(work_dir, &config.source_dir, &changed)?;

    let id = Uuid::new_v4().to_string();
    let schedules_dir = paths::schedules_dir().context("could not determine home directory")?;
    let logs_dir = paths::logs_dir().context("could not determine home directory")?;
    std::fs::create_dir_all(&schedules_dir)
        .with_context(|| format!("failed to create {}", schedules_dir.display()))?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("failed to create {}", logs_dir.display()))?;

    let schedule_path = schedules_dir.join(format!("{id}.json"));
    let log_file = logs_dir.join(format!("{id}.log"));

    let schedule = build_schedule(config, work_dir, &future, &id, &log_file);
    let json = serde_json::to_string_pretty(&schedule).context("failed to serialize schedule")?;
    std::fs::write(&schedule_path, json)
        .with_context(|| format!("failed to write {}", schedule_path.display()))?;

    let pid = match launcher::spawn_daemon(&schedule_path) {
        Ok(pid) => pid,
        Err(error) => {
            let _ = std::fs::remove_file(&schedule_path);
            return Err(error);
        }
    };

    Ok(Some(LaunchReceipt {
        id,
        pid,
        window_start: config.window_start,
        window_end: config.window_end,
        commits: future
            .iter()
            .map(|s| LaunchedCommit {
                scheduled_time: s.scheduled_time,
                label: s.chunk.label.clone(),
                message: s.chunk.message.clone(),
            })
            .collect(),
        log_file,
    }))
}

/// Assemble the persisted schedule artifact from the surviving commits.
fn build_schedule(
    config: &ResolvedConfig,
    work_dir: &Path,
    future: &[ScheduledCommit],
    id: &str,
    log_file: &Path,
) -> Schedule {
    Schedule {
        id: id.to_string(),
        remote: config.remote.clone(),
        source_dir: config.source_dir.clone(),
        work_dir: work_dir.to_path_buf(),
        author: config.author.clone(),
        push_strategy: config.push_strategy,
        log_file: log_file.to_path_buf(),
        commits: future
            .iter()
            .map(|s| ScheduledEntry {
                scheduled_time: s.scheduled_time,
                files: s.chunk.files.clone(),
                message: s.chunk.message.clone(),
            })
            .collect(),
    }
}

fn format_human(receipt: &LaunchReceipt) -> String {
    let mut lines = Vec::new();

    lines.push("─── trickle running ─────────────────────────────".to_string());
    lines.push(format!(
        "{} id: {} (pid {})",
        output::paint(Color::Green, "Background daemon started."),
        receipt.id,
        receipt.pid,
    ));
    lines.push(String::new());
    lines.push(format!(
        "Window:  {} → {} ({})",
        receipt.window_start.format("%H:%M"),
        receipt.window_end.format("%H:%M"),
        receipt.window_start.format("%Y-%m-%d"),
    ));
    lines.push(format!("Commits: {}", receipt.commits.len()));
    lines.push(String::new());

    for (i, commit) in receipt.commits.iter().enumerate() {
        lines.push(format!(
            "  #{}  {}  {}  — {:?}",
            i + 1,
            commit.scheduled_time.format("%H:%M:%S"),
            commit.label,
            commit.message,
        ));
    }

    lines.push(String::new());
    lines.push(format!("Log:    {}", receipt.log_file.display()));
    lines.push(format!("Status: trickle status {}", receipt.id));
    lines.push(String::new());
    lines.push(output::paint(
        Color::Dim,
        "You can close this terminal — commits fire automatically.",
    ));

    lines.join("\n")
}
