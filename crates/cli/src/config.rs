// Loading and resolving `trickle.yaml`.
//
// The raw config is plain validated YAML. Resolution turns the `HH:MM`
// window strings and the optional date into concrete local instants, so
// every component downstream works with timestamps only.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use trickle_common::types::{Author, ChunkStrategy, PushStrategy};

/// The commit window as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowSpec {
    /// Window start, `HH:MM`.
    pub start: String,
    /// Window end, `HH:MM`; must be after `start`.
    pub end: String,
    /// Target date, `YYYY-MM-DD`. Defaults to today.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Raw `trickle.yaml` contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub remote: String,
    pub source_dir: PathBuf,
    pub window: WindowSpec,
    #[serde(default)]
    pub chunk_by: ChunkStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default)]
    pub push_strategy: PushStrategy,
}

/// A config with paths absolutized and the window resolved to instants.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub remote: String,
    pub source_dir: PathBuf,
    pub window: WindowSpec,
    pub chunk_by: ChunkStrategy,
    pub author: Option<Author>,
    pub push_strategy: PushStrategy,
    pub window_start: DateTime<Local>,
    pub window_end: DateTime<Local>,
}

/// Load and resolve a config file.
pub fn load(path: &Path) -> Result<ResolvedConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("config file not found: {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    resolve(config)
}

/// Validate a parsed config and resolve its window against the calendar.
pub fn resolve(config: Config) -> Result<ResolvedConfig> {
    if config.remote.trim().is_empty() {
        bail!("remote URL is required");
    }
    if config.source_dir.as_os_str().is_empty() {
        bail!("source_dir is required");
    }

    let date = match &config.window.date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("invalid window.date {raw:?} — expected YYYY-MM-DD"))?,
        None => Local::now().date_naive(),
    };

    let window_start = local_instant(date, &config.window.start)?;
    let window_end = local_instant(date, &config.window.end)?;
    if window_end <= window_start {
        bail!(
            "window.end ({}) must be after window.start ({})",
            config.window.end,
            config.window.start
        );
    }

    let source_dir = absolutize(&config.source_dir)?;

    Ok(ResolvedConfig {
        remote: config.remote,
        source_dir,
        window: config.window,
        chunk_by: config.chunk_by,
        author: config.author,
        push_strategy: config.push_strategy,
        window_start,
        window_end,
    })
}

fn local_instant(date: NaiveDate, time: &str) -> Result<DateTime<Local>> {
    let parsed = NaiveTime::parse_from_str(time, "%H:%M")
        .with_context(|| format!("invalid time {time:?} — expected HH:MM"))?;
    Local
        .from_local_datetime(&date.and_time(parsed))
        .earliest()
        .with_context(|| format!("time {time} does not exist on {date} in the local timezone"))
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().context("failed to resolve current directory")?;
        Ok(cwd.join(path))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
remote: "https://github.com/user/repo.git"
source_dir: "./project"
window:
  start: "09:00"
  end: "17:00"
  date: "2026-08-06"
"#
    }

    #[test]
    fn minimal_config_uses_documented_defaults() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.chunk_by, ChunkStrategy::Directory);
        assert_eq!(config.push_strategy, PushStrategy::Immediate);
        assert!(config.author.is_none());
    }

    #[test]
    fn full_config_parses() {
        let yaml = r#"
remote: "git@github.com:user/repo.git"
source_dir: "/abs/project"
window:
  start: "08:30"
  end: "18:15"
chunk_by: extension
author:
  name: "Jane Doe"
  email: "jane@example.com"
push_strategy: batch
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.chunk_by, ChunkStrategy::Extension);
        assert_eq!(config.push_strategy, PushStrategy::Batch);
        assert_eq!(config.author.as_ref().unwrap().name, "Jane Doe");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = format!("{}\nchunkBy: directory\n", minimal_yaml().trim_end());
        let error = serde_yaml::from_str::<Config>(&yaml).expect_err("parse should fail");
        assert!(error.to_string().contains("chunkBy"));
    }

    #[test]
    fn resolve_produces_window_instants_on_the_given_date() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        let resolved = resolve(config).unwrap();

        assert_eq!(resolved.window_start.date_naive().to_string(), "2026-08-06");
        assert_eq!(resolved.window_start.hour(), 9);
        assert_eq!(resolved.window_start.minute(), 0);
        assert_eq!(resolved.window_end.hour(), 17);
        assert!(resolved.window_end > resolved.window_start);
    }

    #[test]
    fn resolve_defaults_to_today_without_a_date() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.window.date = None;
        let resolved = resolve(config).unwrap();
        assert_eq!(resolved.window_start.date_naive(), Local::now().date_naive());
    }

    #[test]
    fn resolve_absolutizes_relative_source_dirs() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        let resolved = resolve(config).unwrap();
        assert!(resolved.source_dir.is_absolute());
        assert!(resolved.source_dir.ends_with("project"));
    }

    #[test]
    fn resolve_rejects_inverted_windows() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.window.start = "17:00".into();
        config.window.end = "09:00".into();
        let error = resolve(config).expect_err("inverted window should fail");
        assert!(error.to_string().contains("must be after"));
    }

    #[test]
    fn resolve_rejects_equal_start_and_end() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.window.end = config.window.start.clone();
        assert!(resolve(config).is_err());
    }

    #[test]
    fn resolve_rejects_malformed_times() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.window.start = "9am".into();
        let error = resolve(config).expect_err("bad time should fail");
        assert!(error.to_string().contains("HH:MM"));
    }

    #[test]
    fn resolve_rejects_out_of_range_times() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.window.end = "25:00".into();
        assert!(resolve(config).is_err());
    }

    #[test]
    fn resolve_rejects_malformed_dates() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.window.date = Some("06/08/2026".into());
        let error = resolve(config).expect_err("bad date should fail");
        assert!(error.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn resolve_rejects_empty_remote() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.remote = "   ".into();
        let error = resolve(config).expect_err("empty remote should fail");
        assert!(error.to_string().contains("remote"));
    }
}
