// Launching the execution daemon as a detached background process.
//
// Resolution order for the daemon binary: the TRICKLED_BIN environment
// override, a `trickled` next to the current executable, then whatever
// `trickled` resolves to on PATH. The child gets null stdio and its own
// process group so the parent terminal can close freely.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};

const DAEMON_BIN: &str = "trickled";

/// Spawn `trickled <schedule_file>` detached. Returns the child pid.
pub fn spawn_daemon(schedule_file: &Path) -> Result<u32> {
    let mut not_found_candidates = Vec::new();

    for candidate in daemon_candidates() {
        let mut command = Command::new(&candidate);
        command.arg(schedule_file);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        match command.spawn() {
            Ok(child) => return Ok(child.id()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                not_found_candidates.push(candidate);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to spawn daemon process with binary `{:?}`", candidate)
                });
            }
        }
    }

    Err(anyhow!(
        "unable to find the trickled daemon binary (tried: {})",
        not_found_candidates
            .iter()
            .map(|name| name.to_string_lossy())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

fn daemon_candidates() -> Vec<OsString> {
    if let Some(explicit_binary) = std::env::var_os("TRICKLED_BIN") {
        return vec![explicit_binary];
    }

    let mut candidates = Vec::new();
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            candidates.push(dir.join(DAEMON_BIN).into_os_string());
        }
    }
    candidates.push(OsString::from(DAEMON_BIN));
    candidates
}
