use async_trait::async_trait;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

pub const TOOL_TIMEOUT_SECS: u64 = 300;

const PYTHON_BIN: &str = "python";
const BANNER_PHRASE: &str = "Enumerating subdomains";

const PYTHON_MISSING: &str = "Python is not found in system PATH.";
const SUBLIST3R_MISSING: &str = "Sublist3r is not installed or not found.";

// region:        --- ToolError

#[derive(Debug, Clone)]
pub enum ToolError {
    MissingDependencies(Vec<String>),
    Failed { status: ExitStatus, stderr: String },
    LaunchFailed,
    TimedOut(u64),
    Unexpected(String),
}

/// The display form is the `error` field of the HTTP response, so each
/// variant renders the exact wire message. `Unexpected` stays generic,
/// its detail goes to the logs only.
impl core::fmt::Display for ToolError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            ToolError::MissingDependencies(missing) => write!(fmt, "{}", missing.join("; ")),
            ToolError::Failed { status, stderr } => {
                write!(fmt, "Sublist3r error: {}", status)?;
                if !stderr.is_empty() {
                    write!(fmt, ": {}", stderr)?;
                }
                Ok(())
            }
            ToolError::LaunchFailed => write!(fmt, "Sublist3r file not found."),
            ToolError::TimedOut(secs) => write!(fmt, "Sublist3r timed out after {}s.", secs),
            ToolError::Unexpected(_) => write!(fmt, "Unexpected error running Sublist3r."),
        }
    }
}

impl std::error::Error for ToolError {}

// endregion:     --- ToolError

// region:        --- ToolRunner trait

#[derive(Debug)]
pub struct ToolOutput {
    /// Raw combined stdout of the tool, echoed back to the caller as `logs`.
    pub logs: String,
}

#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, domain: &str) -> core::result::Result<ToolOutput, ToolError>;
}

// endregion:     --- ToolRunner trait

// region:        --- Sublist3r runner

pub struct Sublist3r {
    script_path: Option<PathBuf>,
}

impl Sublist3r {
    pub fn new(script_path: Option<PathBuf>) -> Self {
        Self { script_path }
    }

    /// Both preconditions are re-checked per run, the script can disappear
    /// between requests. Returns the script path only when nothing is missing.
    fn check_dependencies(&self) -> core::result::Result<&Path, Vec<String>> {
        let mut missing = Vec::new();

        if find_on_path(PYTHON_BIN).is_none() {
            missing.push(PYTHON_MISSING.to_string());
        }

        let script = match self.script_path.as_deref() {
            Some(path) if path.exists() => Some(path),
            _ => {
                missing.push(SUBLIST3R_MISSING.to_string());
                None
            }
        };

        match script {
            Some(path) if missing.is_empty() => Ok(path),
            _ => Err(missing),
        }
    }
}

#[async_trait]
impl ToolRunner for Sublist3r {
    #[instrument(name = "sublist3r", level = "info", skip(self))]
    async fn run(&self, domain: &str) -> core::result::Result<ToolOutput, ToolError> {
        let script = match self.check_dependencies() {
            Ok(script) => script,
            Err(missing) => {
                error!("{:12} - missing dependencies: {:?}", "SUBLIST3R", missing);
                return Err(ToolError::MissingDependencies(missing));
            }
        };

        info!("{:12} - enumerating {}", "SUBLIST3R", domain);
        let child = Command::new(PYTHON_BIN)
            .arg(script)
            .args(["-d", domain])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                error!("{:12} - launch failed: {}", "SUBLIST3R", err);
                return Err(ToolError::LaunchFailed);
            }
            Err(err) => {
                error!("{:12} - spawn error: {}", "SUBLIST3R", err);
                return Err(ToolError::Unexpected(err.to_string()));
            }
        };

        // kill_on_drop reaps the child when the timeout drops the future
        let tool_timeout = Duration::from_secs(TOOL_TIMEOUT_SECS);
        let output = match timeout(tool_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                error!("{:12} - wait error: {}", "SUBLIST3R", err);
                return Err(ToolError::Unexpected(err.to_string()));
            }
            Err(_) => {
                error!(
                    "{:12} - no exit within {}s, killed",
                    "SUBLIST3R", TOOL_TIMEOUT_SECS
                );
                return Err(ToolError::TimedOut(TOOL_TIMEOUT_SECS));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                "{:12} - {} with stderr: {}",
                "SUBLIST3R", output.status, stderr
            );
            return Err(ToolError::Failed {
                status: output.status,
                stderr,
            });
        }

        let logs = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("{:12} - output:\n{}", "SUBLIST3R", logs);
        Ok(ToolOutput { logs })
    }
}

// endregion:     --- Sublist3r runner

// region:        --- Output parsing

/// Candidate lines are the ones mentioning the domain, minus the tool's
/// banner line. Order and duplicates are kept as printed.
pub fn filter_candidates(domain: &str, output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains(domain) && !line.contains(BANNER_PHRASE))
        .map(|line| line.trim().to_string())
        .collect()
}

// endregion:     --- Output parsing

fn find_on_path(binary: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}
