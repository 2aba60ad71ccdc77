// trickle CLI entry point.

use clap::Parser;

mod chunk;
mod commands;
mod config;
mod detect;
mod distribute;
mod launcher;
mod output;
mod provision;

#[derive(Parser)]
#[command(
    name = "trickle",
    about = "Spread local changes across a realistic git commit schedule.\n\
             A background daemon fires real commits at the scheduled times — no fake timestamps.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli.command)
}
