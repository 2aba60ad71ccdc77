// CLI subcommand dispatch.

use clap::Subcommand;

pub mod init;
pub mod preview;
pub mod run;
pub mod status;

#[derive(Subcommand)]
pub enum Command {
    /// Generate a sample trickle.yaml config file
    Init(init::InitArgs),
    /// Preview the computed commit schedule without executing anything
    Preview(preview::PreviewArgs),
    /// Detect changes, build the schedule, and start the background daemon
    Run(run::RunArgs),
    /// Show the status of running or interrupted schedules
    Status(status::StatusArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(args),
        Command::Preview(args) => preview::run(args),
        Command::Run(args) => self::run::run(args),
        Command::Status(args) => status::run(args),
    }
}
