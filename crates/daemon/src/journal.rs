// Append-only run journal.
//
// One line per event: `[<ISO-8601>] message`. The daemon owns this file
// exclusively; `trickle status` tails it to report progress without
// talking to the process.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use tracing::info;

pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Open a journal, creating its parent directory as needed. The file
    /// itself is created lazily on the first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    pub fn log(&self, message: &str) -> Result<()> {
        let stamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let line = format!("[{stamp}] {message}\n");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open journal {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to append to journal {}", self.path.display()))?;

        info!("{message}");
        Ok(())
    }
}
