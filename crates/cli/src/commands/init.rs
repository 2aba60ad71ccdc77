// `trickle init` — write a sample config file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

const SAMPLE_CONFIG: &str = r#"# trickle configuration
# `trickle preview` shows the computed schedule, `trickle run` starts it.

# Git remote that receives the commits.
# For token auth, embed it in the URL: https://<TOKEN>@github.com/user/repo.git
remote: "https://github.com/your-username/your-repo.git"

# Your local project directory — the source of truth.
source_dir: "./my-project"

# Commits are spread across this window.
window:
  start: "09:00"
  end: "17:00"
  # date: "2026-08-20"   # optional, defaults to today

# How changed files group into commits:
#   directory — one commit per top-level folder (recommended)
#   file      — one commit per changed file
#   extension — one commit per file extension
chunk_by: directory

# Optional author identity for the created commits.
# author:
#   name: "Your Name"
#   email: "you@example.com"

# Push strategy:
#   immediate — push right after every commit (most realistic)
#   batch     — push everything once after the final commit
push_strategy: immediate
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Output file path.
    #[arg(default_value = "trickle.yaml")]
    output: PathBuf,
}

pub fn run(args: InitArgs) -> Result<()> {
    if args.output.exists() {
        bail!(
            "{} already exists — delete it first or pick a different path",
            args.output.display()
        );
    }

    std::fs::write(&args.output, SAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} — set remote, source_dir, and window", args.output.display());
    println!("  2. trickle preview   — review the computed schedule");
    println!("  3. trickle run       — start the background commit daemon");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::Config;

    #[test]
    fn sample_config_is_valid_yaml() {
        let config: Config = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.window.start, "09:00");
        assert_eq!(config.window.end, "17:00");
        assert!(config.author.is_none());
    }

    #[test]
    fn writes_the_sample_to_the_given_path() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("trickle.yaml");

        run(InitArgs { output: output.clone() }).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, SAMPLE_CONFIG);
    }

    #[test]
    fn refuses_to_overwrite_an_existing_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("trickle.yaml");
        std::fs::write(&output, "remote: existing\n").unwrap();

        let error = run(InitArgs { output: output.clone() }).expect_err("should refuse");
        assert!(error.to_string().contains("already exists"));

        // Untouched.
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "remote: existing\n");
    }
}
