//! Thread service abstraction over the model backend.
//!
//! The [`ThreadService`] trait decouples the loop from the agent backend
//! (currently `codex exec`). Tests use scripted services that return
//! predetermined responses without spawning processes.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::io::process::run_with_timeout;

/// One completed turn of the model conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadTurn {
    /// Raw completion text. Never empty: an empty completion is the
    /// collaborator's own failure, surfaced as an error.
    pub text: String,
    /// Opaque correlation token for the server-side conversation, when the
    /// backend reports one. Supplied back on subsequent turns.
    pub thread_id: Option<String>,
}

/// Abstraction over model thread backends.
pub trait ThreadService {
    /// Send one prompt, resuming the thread identified by `thread_id` when
    /// present, and return the completion.
    fn run_prompt(&self, prompt: &str, thread_id: Option<&str>) -> Result<ThreadTurn>;
}

/// Thread service that spawns `codex exec`.
///
/// The prompt is piped on stdin; the completion is read back from the
/// `--output-last-message` file under `state_dir`. Thread resumption uses
/// `codex exec resume <id>`.
#[derive(Debug, Clone)]
pub struct CodexThreadService {
    workdir: PathBuf,
    state_dir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

static SESSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"session id:\s*([0-9a-fA-F-]{36})").unwrap());

impl CodexThreadService {
    pub fn new(
        workdir: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
        timeout: Duration,
        output_limit_bytes: usize,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            state_dir: state_dir.into(),
            timeout,
            output_limit_bytes,
        }
    }
}

impl ThreadService for CodexThreadService {
    #[instrument(skip_all, fields(timeout_secs = self.timeout.as_secs(), resuming = thread_id.is_some()))]
    fn run_prompt(&self, prompt: &str, thread_id: Option<&str>) -> Result<ThreadTurn> {
        info!(workdir = %self.workdir.display(), "starting codex exec");
        fs::create_dir_all(&self.state_dir)
            .with_context(|| format!("create state dir {}", self.state_dir.display()))?;
        let output_path = self.state_dir.join("last_message.txt");

        let mut cmd = Command::new("codex");
        cmd.arg("exec");
        if let Some(id) = thread_id {
            cmd.arg("resume").arg(id);
        }
        cmd.arg("--skip-git-repo-check")
            .arg("--output-last-message")
            .arg(&output_path)
            .arg("-")
            .current_dir(&self.workdir);

        let output = run_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .context("run codex exec")?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "codex exec timed out");
            return Err(anyhow!("codex exec timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "codex exec failed");
            return Err(anyhow!(
                "codex exec failed with status {:?}",
                output.status.code()
            ));
        }

        let text = fs::read_to_string(&output_path)
            .with_context(|| format!("read completion {}", output_path.display()))?;
        if text.trim().is_empty() {
            return Err(anyhow!("thread service returned an empty completion"));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let turn_thread_id = extract_session_id(&stdout);
        debug!(thread_id = ?turn_thread_id, "codex exec completed");

        Ok(ThreadTurn {
            text,
            thread_id: turn_thread_id,
        })
    }
}

/// Pull the session id out of codex exec's banner output, when present.
fn extract_session_id(stdout: &str) -> Option<String> {
    SESSION_ID_RE
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
