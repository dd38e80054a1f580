//! Out-of-process execution of a solution's entry component.
//!
//! The entry component (`main.py`) is launched with the interpreter of the
//! solution's isolated environment (`<folder>/venv`), which must already
//! exist. The run is bounded by a timeout; standard output, standard error
//! and the exit code are captured and rendered into the solution's
//! `result_description` transcript:
//!
//! ```text
//! Output:
//! <stdout>
//! Error:
//! <stderr>                         (only when stderr is non-empty)
//! Exit code: 1                     (only when the exit code is not 0)
//!
//! Solution 'calc' completed with status: ERROR
//! ```
//!
//! The transcript is everything the correction step learns about a run.

use crate::error::{CraftError, Result};
use crate::solution::{Solution, SolutionStatus};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_ENV_DIR: &str = "venv";
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

const MISSING_ENV: &str =
    "Virtual environment not found. Please run the installation script first.";

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Environment directory, relative to the solution folder.
    pub env_dir: PathBuf,
    pub run_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            env_dir: PathBuf::from(DEFAULT_ENV_DIR),
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }
}

/// Captured result of one process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Exit code 0 and nothing on standard error.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && self.stderr.is_empty()
    }

    pub fn status(&self) -> SolutionStatus {
        if self.succeeded() {
            SolutionStatus::Success
        } else {
            SolutionStatus::Error
        }
    }

    /// Render the transcript for a solution named `name`.
    pub fn transcript(&self, name: &str) -> String {
        let mut out = format!("Output:\n{}\n", self.stdout);
        if !self.stderr.is_empty() {
            out.push_str(&format!("Error:\n{}\n", self.stderr));
        }
        if self.exit_code != 0 {
            out.push_str(&format!("Exit code: {}\n", self.exit_code));
        }
        out.push_str(&status_line(name, self.status()));
        out
    }
}

fn status_line(name: &str, status: SolutionStatus) -> String {
    format!("\nSolution '{}' completed with status: {}\n", name, status)
}

#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The solution's environment directory.
    pub fn env_path(&self, solution: &Solution) -> PathBuf {
        solution.folder.join(&self.config.env_dir)
    }

    pub fn has_environment(&self, solution: &Solution) -> bool {
        self.env_path(solution).is_dir()
    }

    /// Interpreter inside an environment directory.
    pub fn interpreter_in(env: &Path) -> PathBuf {
        if cfg!(windows) {
            env.join("Scripts").join("python.exe")
        } else {
            env.join("bin").join("python")
        }
    }

    /// Run the solution's entry component and record status, transcript and
    /// execution time on the solution.
    ///
    /// Fails without launching anything when the solution has no entry
    /// component. Every other problem (missing environment, launch failure,
    /// timeout, non-zero exit, stderr output) is an ERROR status with a
    /// transcript.
    pub async fn run(&self, solution: &mut Solution) -> Result<SolutionStatus> {
        let entry = solution
            .entry_component()
            .map(|c| c.file_name())
            .ok_or_else(|| {
                CraftError::Execution(format!(
                    "no 'main.py' Python component found in solution '{}'",
                    solution.name
                ))
            })?;

        info!(solution = %solution.name, entry = %entry, "running solution");
        let started = Instant::now();

        let env = self.env_path(solution);
        let (status, transcript) = if !env.is_dir() {
            warn!(solution = %solution.name, env = %env.display(), "execution environment missing");
            let status = SolutionStatus::Error;
            (status, format!("{}\n{}", MISSING_ENV, status_line(&solution.name, status)))
        } else {
            match self.launch(&env, &solution.folder, &entry).await {
                Ok(result) => {
                    debug!(
                        solution = %solution.name,
                        exit_code = result.exit_code,
                        stderr_bytes = result.stderr.len(),
                        "process finished"
                    );
                    (result.status(), result.transcript(&solution.name))
                }
                Err(e) => {
                    warn!(solution = %solution.name, error = %e, "launch failed");
                    let status = SolutionStatus::Error;
                    (
                        status,
                        format!("Error:\n{}\n{}", e, status_line(&solution.name, status)),
                    )
                }
            }
        };

        solution.execution_time = started.elapsed();
        solution.result_description = transcript;
        let status = solution.record_run(status);

        info!(
            solution = %solution.name,
            %status,
            elapsed_ms = solution.execution_time.as_millis() as u64,
            "solution completed"
        );
        Ok(status)
    }

    async fn launch(&self, env: &Path, folder: &Path, entry: &str) -> Result<ExecutionResult> {
        let env = env.canonicalize()?;
        let interpreter = Self::interpreter_in(&env);

        let mut command = Command::new(&interpreter);
        command
            .arg(entry)
            .current_dir(folder)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            CraftError::Execution(format!("failed to start {}: {}", interpreter.display(), e))
        })?;

        let output = tokio::time::timeout(self.config.run_timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                CraftError::Execution(format!(
                    "timed out after {}s",
                    self.config.run_timeout.as_secs_f64()
                ))
            })??;

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
