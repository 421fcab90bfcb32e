//! Command runner abstraction and shell-backed implementation.
//!
//! The loop authorizes commands against the allow-list before calling
//! [`CommandRunner::run`]; the runner itself executes whatever it is given
//! with shell semantics. A non-zero exit code is data, not an error: it is
//! returned in the result so the loop can feed it back to the agent.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, instrument};

use crate::io::process::run_with_timeout;

/// Exit code reported when a command exceeds its time budget.
const TIMEOUT_EXIT_CODE: i32 = 124;

/// Result of executing a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandExecutionResult {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Abstraction over command execution backends.
pub trait CommandRunner {
    /// Exact command strings permitted for this run. Returns an owned copy
    /// so callers validate against a list the runner cannot mutate later.
    fn allowed_commands(&self) -> Vec<String>;

    /// Execute a command and capture its outcome. Only infrastructure
    /// failures (spawn errors) are `Err`; command failures are results.
    fn run(&self, command: &str) -> Result<CommandExecutionResult>;
}

/// Command runner that executes through `sh -c` in a working directory.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    workdir: PathBuf,
    allow_list: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl ShellCommandRunner {
    pub fn new(
        workdir: impl Into<PathBuf>,
        allow_list: Vec<String>,
        timeout: Duration,
        output_limit_bytes: usize,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            allow_list,
            timeout,
            output_limit_bytes,
        }
    }
}

impl CommandRunner for ShellCommandRunner {
    fn allowed_commands(&self) -> Vec<String> {
        self.allow_list.clone()
    }

    #[instrument(skip_all, fields(command))]
    fn run(&self, command: &str) -> Result<CommandExecutionResult> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(&self.workdir);

        let output = run_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        stdout.push_str(&output.stdout_truncated_notice());
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        stderr.push_str(&output.stderr_truncated_notice());

        let exit_code = if output.timed_out {
            stderr.push_str(&format!(
                "\n[command timed out after {}s]\n",
                self.timeout.as_secs()
            ));
            TIMEOUT_EXIT_CODE
        } else {
            output.status.code().unwrap_or(1)
        };

        info!(command, exit_code, "command executed");
        Ok(CommandExecutionResult {
            command: command.to_string(),
            exit_code,
            stdout,
            stderr,
        })
    }
}
