// trickled: executes a persisted commit schedule in the background.
//
// Invoked by `trickle run` as `trickled <schedule.json>`. Exits 0 after
// successful finalization and on interrupt; non-zero when the schedule
// artifact is missing or unparseable.

use std::path::PathBuf;

use anyhow::{bail, Context};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let schedule_path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => bail!("usage: trickled <schedule.json>"),
    };

    trickle_daemon::runtime::run(&schedule_path)
        .await
        .context("daemon terminated unexpectedly")?;
    Ok(())
}
