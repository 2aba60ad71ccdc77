// Git subprocess plumbing shared by the CLI and the daemon.
//
// All operations shell out to the system `git` binary, rooted at the
// worker's repository path. The executor is a trait so tests can script
// command outcomes without touching a real repository.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    EmptyAddPaths,
    Spawn { command: String, message: String },
    Command { command: String, code: Option<i32>, stderr: String },
}

impl Display for GitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::EmptyAddPaths => write!(f, "git add requires at least one path"),
            GitError::Spawn { command, message } => {
                write!(f, "failed to run `{command}`: {message}")
            }
            GitError::Command { command, code, stderr } => {
                write!(f, "`{command}` failed with code {:?}: {}", code, stderr.trim())
            }
        }
    }
}

impl Error for GitError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program).args(args).current_dir(cwd).output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs git commands with a fixed working directory.
#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    executor: E,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into(), executor: ProcessCommandExecutor }
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), executor }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Shallow-clone `remote` into `dest`. Runs from the worker's path,
    /// which must be a parent directory of `dest`.
    pub fn clone_shallow(&self, remote: &str, dest: &Path) -> Result<GitOutput, GitError> {
        self.run(vec![
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            remote.to_string(),
            dest.display().to_string(),
        ])
    }

    pub fn init(&self) -> Result<GitOutput, GitError> {
        self.run(vec!["init".to_string()])
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<GitOutput, GitError> {
        self.run(vec!["remote".to_string(), "add".to_string(), name.to_string(), url.to_string()])
    }

    /// Set a repository-local config key (e.g. `user.name`).
    pub fn set_config(&self, key: &str, value: &str) -> Result<GitOutput, GitError> {
        self.run(vec!["config".to_string(), key.to_string(), value.to_string()])
    }

    pub fn add<S: AsRef<str>>(&self, paths: &[S]) -> Result<GitOutput, GitError> {
        if paths.is_empty() {
            return Err(GitError::EmptyAddPaths);
        }

        let mut args = vec!["add".to_string(), "--".to_string()];
        args.extend(paths.iter().map(|path| path.as_ref().to_string()));
        self.run(args)
    }

    /// Relative paths of everything currently staged for commit.
    pub fn staged_files(&self) -> Result<Vec<String>, GitError> {
        let output = self.run(vec![
            "diff".to_string(),
            "--cached".to_string(),
            "--name-only".to_string(),
        ])?;
        Ok(output.stdout.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    pub fn commit(&self, message: &str) -> Result<GitOutput, GitError> {
        self.run(vec!["commit".to_string(), "-m".to_string(), message.to_string()])
    }

    /// Full hash of the current HEAD commit.
    pub fn head_hash(&self) -> Result<String, GitError> {
        let output = self.run(vec!["rev-parse".to_string(), "HEAD".to_string()])?;
        Ok(output.stdout.trim().to_string())
    }

    /// Push the current branch, setting the upstream on first push.
    pub fn push_upstream(&self) -> Result<GitOutput, GitError> {
        self.run(vec![
            "push".to_string(),
            "--set-upstream".to_string(),
            "origin".to_string(),
            "HEAD".to_string(),
        ])
    }

    fn run(&self, args: Vec<String>) -> Result<GitOutput, GitError> {
        let command = format!("git {}", args.join(" "));
        let result = self.executor.execute("git", &args, &self.repo_path).map_err(|error| {
            GitError::Spawn { command: command.clone(), message: error.to_string() }
        })?;

        if result.success {
            return Ok(GitOutput { stdout: result.stdout, stderr: result.stderr });
        }

        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };

        Err(GitError::Command { command, code: result.code, stderr })
    }
}
