// On-disk layout for trickle runtime state.
//
// Everything lives under `~/.trickle`:
//   schedules/<id>.json      pending schedule artifacts
//   logs/<id>.log            daemon journals
//   logs/<id>-results.json   commit result summaries

use std::path::{Path, PathBuf};

/// Root directory for trickle runtime state: `~/.trickle`.
pub fn base_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".trickle"))
}

/// Directory holding pending schedule artifacts.
pub fn schedules_dir() -> Option<PathBuf> {
    base_dir().map(|d| d.join("schedules"))
}

/// Directory holding daemon journals and result summaries.
pub fn logs_dir() -> Option<PathBuf> {
    base_dir().map(|d| d.join("logs"))
}

/// Schedule artifact path for a given schedule id.
pub fn schedule_file(id: &str) -> Option<PathBuf> {
    schedules_dir().map(|d| d.join(format!("{id}.json")))
}

/// Journal path for a given schedule id.
pub fn log_file(id: &str) -> Option<PathBuf> {
    logs_dir().map(|d| d.join(format!("{id}.log")))
}

/// Map a journal path to its results artifact: `<stem>-results.json`.
pub fn results_file(log_file: &Path) -> PathBuf {
    match log_file.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => log_file.with_file_name(format!("{stem}-results.json")),
        None => log_file.with_extension("results.json"),
    }
}
