//! External command execution
//!
//! Build steps shell out to `configure`, `make`, `git` and the generator.
//! [`CommandRunner`] is the seam the pipeline talks to; [`ProcessRunner`]
//! runs the real process with its output captured to a per-step log file.

use crate::error::{PpbtError, PpbtResult};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Lines of captured output carried on a failed command's error
const ERROR_TAIL_LINES: usize = 40;

/// One external command of a build step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory of the child; the parent never changes its own
    pub cwd: PathBuf,
    /// Variables added to the inherited environment
    pub env: Vec<(String, String)>,
    /// Name of the step, used for the log file
    pub label: String,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
            label: label.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: Vec<(String, String)>) -> Self {
        self.env.extend(env);
        self
    }

    /// Program and arguments as a shell-like line
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs build commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion; a non-zero exit is [`PpbtError::BuildCommand`]
    async fn run(&self, spec: &CommandSpec) -> PpbtResult<()>;
}

/// Runs commands as child processes, logging to `{log_dir}/{label}.log`
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    log_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_path(&self, label: &str) -> PathBuf {
        let name: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.log_dir.join(format!("{}.log", name))
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> PpbtResult<()> {
        let line = spec.command_line();
        info!("Run build cmd: {} (in {})", line, spec.cwd.display());

        fs::create_dir_all(&self.log_dir).map_err(|e| {
            PpbtError::io(format!("creating log directory {}", self.log_dir.display()), e)
        })?;
        let log_path = self.log_path(&spec.label);
        let stdout = fs::File::create(&log_path)
            .map_err(|e| PpbtError::io(format!("creating {}", log_path.display()), e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| PpbtError::io(format!("opening {}", log_path.display()), e))?;

        let status = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .await
            .map_err(|e| PpbtError::command_spawn(&line, e))?;

        if status.success() {
            debug!("Build cmd '{}' succeeded, log at {}", line, log_path.display());
            return Ok(());
        }

        Err(PpbtError::BuildCommand {
            command: line,
            code: status.code(),
            output: log_tail(&log_path),
        })
    }
}

/// Last lines of a log file, empty if it cannot be read
fn log_tail(path: &Path) -> String {
    let content = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => return String::new(),
    };
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}
