// The scheduler loop.
//
// One timer task is armed per scheduled commit at load time. Timer tasks
// only sleep until their wall-clock moment and then report their index on
// the fire queue; all git work happens on this loop, so firings never
// overlap and the results list and completion counter have a single owner.
// A firing that runs long delays its own result, not other timers' trigger
// times. Finalization runs exactly once, gated on the completion count.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use trickle_common::git::{CommandExecutor, GitWorker, ProcessCommandExecutor};
use trickle_common::paths;
use trickle_common::types::{CommitResult, PushStrategy, Schedule, ScheduledEntry};

use crate::journal::Journal;

/// How a daemon run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every firing reported and finalization ran.
    Completed,
    /// A shutdown signal arrived first; partial results were flushed and
    /// the working directory and schedule artifact were kept.
    Interrupted,
}

/// Load the schedule at `schedule_path` and execute it to completion.
pub async fn run(schedule_path: &Path) -> Result<RunOutcome> {
    let schedule = load_schedule(schedule_path)?;
    run_schedule(schedule, schedule_path, ProcessCommandExecutor, shutdown_signal()).await
}

/// Parse the schedule artifact. Failures here exit the daemon non-zero
/// before any timer is armed.
pub fn load_schedule(path: &Path) -> Result<Schedule> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("schedule file not found: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse schedule {}", path.display()))
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(error) => {
                warn!(%error, "failed to install SIGTERM handler");
                return std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Execute a loaded schedule. `shutdown` aborts the run when it resolves:
/// pending timers are cancelled, gathered results are flushed, and the
/// working directory and schedule artifact are retained for inspection.
pub async fn run_schedule<E, S>(
    schedule: Schedule,
    schedule_path: &Path,
    executor: E,
    shutdown: S,
) -> Result<RunOutcome>
where
    E: CommandExecutor,
    S: Future<Output = ()>,
{
    let journal = Journal::open(&schedule.log_file)?;
    let total = schedule.commits.len();
    journal.log(&format!(
        "Daemon started for schedule {} — {total} commit(s) queued",
        schedule.id
    ))?;

    let git = GitWorker::with_executor(&schedule.work_dir, executor);
    apply_author(&git, &schedule)?;

    let (fire_tx, mut fire_rx) = mpsc::channel::<usize>(total.max(1));
    let mut timers: Vec<JoinHandle<()>> = Vec::with_capacity(total);
    for (index, entry) in schedule.commits.iter().enumerate() {
        let _ = journal.log(&format!(
            "Scheduled commit {}/{total}: {:?} at {}",
            index + 1,
            entry.message,
            entry.scheduled_time.format("%H:%M:%S"),
        ));

        let delay = delay_until(entry.scheduled_time);
        let tx = fire_tx.clone();
        timers.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(index).await;
        }));
    }
    drop(fire_tx);

    let mut results: Vec<CommitResult> = Vec::with_capacity(total);
    let mut completed = 0usize;

    tokio::pin!(shutdown);

    let outcome = loop {
        if completed == total {
            break RunOutcome::Completed;
        }

        tokio::select! {
            maybe_index = fire_rx.recv() => {
                let Some(index) = maybe_index else {
                    break RunOutcome::Completed;
                };
                let entry = &schedule.commits[index];
                let _ = journal.log(&format!(
                    "Firing commit {}/{total}: {:?}",
                    index + 1,
                    entry.message,
                ));
                results.push(fire_commit(&git, entry, schedule.push_strategy, &journal));
                completed += 1;
            }
            _ = &mut shutdown => {
                let _ = journal.log(&format!(
                    "Interrupted — cancelling {} pending commit(s)",
                    total - completed,
                ));
                for timer in &timers {
                    timer.abort();
                }
                flush_results(&schedule, &results, &journal)?;
                let _ = journal.log(&format!(
                    "Working directory retained at {}",
                    schedule.work_dir.display(),
                ));
                let _ = journal.log(&format!(
                    "Schedule retained at {}",
                    schedule_path.display(),
                ));
                break RunOutcome::Interrupted;
            }
        }
    };

    if outcome == RunOutcome::Completed {
        finalize(&git, &schedule, schedule_path, &results, &journal)?;
    }

    Ok(outcome)
}

fn apply_author<E: CommandExecutor>(git: &GitWorker<E>, schedule: &Schedule) -> Result<()> {
    if let Some(author) = &schedule.author {
        git.set_config("user.name", &author.name)?;
        git.set_config("user.email", &author.email)?;
    }
    Ok(())
}

/// Wall-clock delay until `at`; already-elapsed times fire immediately.
fn delay_until(at: DateTime<Local>) -> Duration {
    (at - Local::now()).to_std().unwrap_or(Duration::ZERO)
}

/// One firing: stage → commit → (conditional push). Produces exactly one
/// result and never aborts the remaining schedule.
fn fire_commit<E: CommandExecutor>(
    git: &GitWorker<E>,
    entry: &ScheduledEntry,
    push_strategy: PushStrategy,
    journal: &Journal,
) -> CommitResult {
    let executed_at = Local::now();

    let staged = match git.add(&entry.files).and_then(|_| git.staged_files()) {
        Ok(staged) => staged,
        Err(error) => {
            let _ = journal.log(&format!("  Error: {error}"));
            return failure(entry, executed_at, error.to_string());
        }
    };

    if staged.is_empty() {
        let note = "no changes staged — content already matches the remote HEAD";
        let _ = journal.log(&format!("  Skipped: {note}"));
        return failure(entry, executed_at, note.to_string());
    }

    let hash = match git.commit(&entry.message).and_then(|_| git.head_hash()) {
        Ok(hash) => hash,
        Err(error) => {
            let _ = journal.log(&format!("  Error: {error}"));
            return failure(entry, executed_at, error.to_string());
        }
    };
    let _ = journal.log(&format!("  Committed {}: {:?}", &hash[..hash.len().min(7)], entry.message));

    if push_strategy == PushStrategy::Immediate {
        let _ = journal.log("  Pushing...");
        if let Err(error) = git.push_upstream() {
            let _ = journal.log(&format!("  Push failed: {error}"));
            return failure(entry, executed_at, format!("push failed after commit {hash}: {error}"));
        }
        let _ = journal.log("  Push complete");
    }

    CommitResult {
        message: entry.message.clone(),
        files: entry.files.clone(),
        scheduled_time: entry.scheduled_time,
        executed_at,
        commit_hash: hash,
        success: true,
        error: None,
    }
}

fn failure(entry: &ScheduledEntry, executed_at: DateTime<Local>, error: String) -> CommitResult {
    CommitResult {
        message: entry.message.clone(),
        files: entry.files.clone(),
        scheduled_time: entry.scheduled_time,
        executed_at,
        commit_hash: String::new(),
        success: false,
        error: Some(error),
    }
}

/// Runs exactly once, after the final firing reports: batch push, results
/// artifact, then removal of the working directory and schedule file.
fn finalize<E: CommandExecutor>(
    git: &GitWorker<E>,
    schedule: &Schedule,
    schedule_path: &Path,
    results: &[CommitResult],
    journal: &Journal,
) -> Result<()> {
    if schedule.push_strategy == PushStrategy::Batch {
        let _ = journal.log("Pushing all commits...");
        match git.push_upstream() {
            Ok(_) => {
                let _ = journal.log("Push complete");
            }
            Err(error) => {
                let _ = journal.log(&format!("Push failed: {error}"));
            }
        }
    }

    flush_results(schedule, results, journal)?;

    match std::fs::remove_dir_all(&schedule.work_dir) {
        Ok(()) => {
            let _ = journal.log("Working directory removed");
        }
        Err(error) => {
            let _ = journal.log(&format!(
                "Warning: could not remove working directory {}: {error}",
                schedule.work_dir.display(),
            ));
        }
    }

    if let Err(error) = std::fs::remove_file(schedule_path) {
        let _ = journal.log(&format!(
            "Warning: could not remove schedule file {}: {error}",
            schedule_path.display(),
        ));
    }

    let _ = journal.log("Done");
    Ok(())
}

/// Write the ordered result list next to the journal.
fn flush_results(schedule: &Schedule, results: &[CommitResult], journal: &Journal) -> Result<()> {
    let path = paths::results_file(&schedule.log_file);
    let json = serde_json::to_string_pretty(results).context("failed to serialize results")?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write results to {}", path.display()))?;
    let _ = journal.log(&format!("Results written to {}", path.display()));
    Ok(())
}
