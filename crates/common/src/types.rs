// Core domain types shared across all trickle crates.
//
// The `Schedule` and `CommitResult` types double as the on-disk artifact
// formats (camelCase JSON), so their field names are part of the tool's
// external contract.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// How changed files are grouped into commit chunks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// One commit per top-level directory; root-level files share a bucket.
    #[default]
    Directory,
    /// One commit per changed file.
    File,
    /// One commit per file extension.
    Extension,
}

impl std::fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChunkStrategy::Directory => "directory",
            ChunkStrategy::File => "file",
            ChunkStrategy::Extension => "extension",
        };
        write!(f, "{name}")
    }
}

/// When commits are pushed to the remote.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PushStrategy {
    /// Push right after every commit.
    #[default]
    Immediate,
    /// Push once after the final commit.
    Batch,
}

impl std::fmt::Display for PushStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PushStrategy::Immediate => "immediate",
            PushStrategy::Batch => "batch",
        };
        write!(f, "{name}")
    }
}

/// Git author identity applied to the working copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// A group of changed files committed together as one git commit.
///
/// Invariant: never empty, and every path comes from the detected
/// changed-file set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitChunk {
    /// Paths relative to the source root, `/`-separated.
    pub files: Vec<String>,
    /// Human-readable group name (e.g. `src`, `*.rs files`, `root`).
    pub label: String,
    /// Synthesized commit message.
    pub message: String,
}

/// A chunk with its assigned wall-clock firing time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCommit {
    pub chunk: CommitChunk,
    pub scheduled_time: DateTime<Local>,
}

/// One commit record inside a persisted schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEntry {
    pub scheduled_time: DateTime<Local>,
    pub files: Vec<String>,
    pub message: String,
}

/// The persisted job description consumed by the daemon.
///
/// Written once by `trickle run`, read-only to the daemon, and deleted by
/// it after successful finalization. A schedule file that outlives the
/// daemon marks a crashed or interrupted run and is kept for postmortem
/// inspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub remote: String,
    pub source_dir: PathBuf,
    pub work_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    pub push_strategy: PushStrategy,
    pub log_file: PathBuf,
    pub commits: Vec<ScheduledEntry>,
}

/// Outcome of firing one scheduled commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub message: String,
    pub files: Vec<String>,
    pub scheduled_time: DateTime<Local>,
    pub executed_at: DateTime<Local>,
    /// Empty whenever `success` is false.
    pub commit_hash: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
