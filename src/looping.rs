//! Multi-iteration orchestration of the coding-agent loop.
//!
//! Each iteration builds a prompt from the accumulated transcript, sends it
//! to the thread service, parses the returned action envelope, and applies
//! the actions in order against the workspace and command runner. The run
//! ends when a `finish` action is accepted, when the iteration budget is
//! exhausted, or when a validation failure propagates to the caller.

use anyhow::{Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::action::{Action, parse_actions};
use crate::core::allowlist::authorize_command;
use crate::core::required::{RequiredCommandState, RequiredKeywords};
use crate::io::command_runner::{CommandExecutionResult, CommandRunner};
use crate::io::thread::ThreadService;
use crate::io::workspace::Workspace;
use crate::prompt::{PromptInputs, build_prompt};

/// Summary used when the budget runs out before an accepted finish.
pub const MAX_ITERATIONS_SUMMARY: &str =
    "Reached maximum iterations without finish action. Review the iteration logs for more details.";

/// Caller-supplied options for one run. Immutable for its duration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Task description for the agent. Must be non-empty.
    pub task: String,
    /// Maximum number of loop iterations. Must be positive.
    pub max_iterations: u32,
    /// Whether the required-step gate may reject `finish` actions.
    pub enforce_required_commands: bool,
}

impl RunOptions {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            max_iterations: 8,
            enforce_required_commands: true,
        }
    }
}

/// Immutable record of one completed iteration.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// Iteration index, 1-based.
    pub iteration: u32,
    /// Exact prompt text sent to the thread service.
    pub request_prompt: String,
    /// Raw response text received.
    pub response_text: String,
    /// Actions successfully executed this iteration, in order. A rejected
    /// finish still counts as executed.
    pub executed_actions: Vec<Action>,
    /// Command execution results produced this iteration, in order.
    pub command_results: Vec<CommandExecutionResult>,
}

/// Terminal output of one orchestration run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub summary: String,
    /// Correlation token from the thread service, when one was reported.
    pub thread_id: Option<String>,
    pub iterations: Vec<IterationRecord>,
}

/// Drive the agent loop to completion.
///
/// Strictly sequential: one thread-service call and one command execution
/// at a time, actions applied in response order. Validation failures (parse,
/// path, command authorization) abort the run and propagate unchanged;
/// command failures and gate rejections are transcript data and the loop
/// continues. `on_iteration` observes each record as it is produced.
#[instrument(skip_all, fields(max_iterations = options.max_iterations, enforce = options.enforce_required_commands))]
pub fn run_task<T, W, C, F>(
    thread: &T,
    workspace: &W,
    commands: &C,
    keywords: &RequiredKeywords,
    options: &RunOptions,
    mut on_iteration: F,
) -> Result<RunResult>
where
    T: ThreadService,
    W: Workspace,
    C: CommandRunner,
    F: FnMut(&IterationRecord),
{
    if options.task.trim().is_empty() {
        bail!("task must not be empty");
    }
    if options.max_iterations == 0 {
        bail!("max_iterations must be positive");
    }

    info!(task = %options.task, "starting agent run");

    let mut iterations: Vec<IterationRecord> = Vec::new();
    let mut transcript = String::new();
    let mut thread_id: Option<String> = None;
    let mut required = RequiredCommandState::default();

    for iteration in 1..=options.max_iterations {
        let files = workspace.list_project_files()?;
        // Owned copy per iteration: the list the loop validates against
        // cannot be mutated behind its back.
        let allowed = commands.allowed_commands();
        let prompt = build_prompt(&PromptInputs {
            workspace_root: workspace.root_dir(),
            files: &files,
            allowed_commands: &allowed,
            task: &options.task,
            transcript: &transcript,
        });

        debug!(iteration, prompt_bytes = prompt.len(), "sending prompt");
        let turn = thread.run_prompt(&prompt, thread_id.as_deref())?;
        thread_id = turn.thread_id.or(thread_id);

        let actions = parse_actions(&turn.text)?;
        debug!(iteration, action_count = actions.len(), "parsed actions");

        let mut executed: Vec<Action> = Vec::new();
        let mut command_results: Vec<CommandExecutionResult> = Vec::new();
        let mut accepted_summary: Option<String> = None;

        for action in actions {
            match action {
                Action::Message { text } => {
                    transcript.push_str(&format!("\nAgent message: {text}"));
                    executed.push(Action::Message { text });
                }
                Action::UpdateFile { path, content } => {
                    workspace.write_file(&path, &content)?;
                    transcript
                        .push_str(&format!("\nUpdated file {path} (length {}).", content.len()));
                    executed.push(Action::UpdateFile { path, content });
                }
                Action::RunCommand { command } => {
                    authorize_command(&command, &allowed)?;
                    let result = commands.run(&command)?;
                    transcript.push_str(&format!(
                        "\nCommand {command} exited {}.",
                        result.exit_code
                    ));
                    if !result.stdout.is_empty() {
                        transcript.push_str(&format!("\nSTDOUT:\n{}", result.stdout));
                    }
                    if !result.stderr.is_empty() {
                        transcript.push_str(&format!("\nSTDERR:\n{}", result.stderr));
                    }
                    if result.exit_code == 0 {
                        required.record_success(keywords, &command);
                    }
                    command_results.push(result);
                    executed.push(Action::RunCommand { command });
                }
                Action::Finish { summary } => {
                    // A rejected finish is still recorded as executed; the
                    // rejection is transcript data the agent reads next turn.
                    executed.push(Action::Finish {
                        summary: summary.clone(),
                    });
                    if options.enforce_required_commands && !required.all_satisfied() {
                        let missing = required.missing(keywords);
                        warn!(iteration, missing = ?missing, "finish rejected by required-step gate");
                        transcript.push_str(&format!(
                            "\nFINISH REJECTED: The following required steps have not been \
                             completed successfully: {}. Please complete these steps before \
                             finishing.",
                            missing.join(", ")
                        ));
                    } else {
                        accepted_summary = Some(summary);
                        // Stop applying further actions in this batch.
                        break;
                    }
                }
            }
        }

        let record = IterationRecord {
            iteration,
            request_prompt: prompt,
            response_text: turn.text,
            executed_actions: executed,
            command_results,
        };
        on_iteration(&record);
        iterations.push(record);

        if let Some(summary) = accepted_summary {
            info!(iteration, "run finished");
            return Ok(RunResult {
                summary,
                thread_id,
                iterations,
            });
        }
    }

    info!(
        max_iterations = options.max_iterations,
        "iteration budget exhausted"
    );
    Ok(RunResult {
        summary: MAX_ITERATIONS_SUMMARY.to_string(),
        thread_id,
        iterations,
    })
}
