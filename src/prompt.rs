//! Prompt pack builder for the per-iteration thread request.

use std::path::Path;

use minijinja::{Environment, context};

/// Cap on file entries included in the prompt's workspace listing.
///
/// A hard constant, not configuration: it exists to bound prompt size, and
/// the agent contract documents the listing as a subset.
pub const FILE_LIST_LIMIT: usize = 40;

const AGENT_TEMPLATE: &str = include_str!("prompts/agent.md");

/// All inputs needed to build one iteration's prompt.
#[derive(Debug, Clone)]
pub struct PromptInputs<'a> {
    /// Workspace root shown to the agent.
    pub workspace_root: &'a Path,
    /// Sorted tracked-file listing from the workspace.
    pub files: &'a [String],
    /// Allow-listed command strings for this run.
    pub allowed_commands: &'a [String],
    /// The user-supplied task description.
    pub task: &'a str,
    /// Accumulated transcript of previous iterations.
    pub transcript: &'a str,
}

/// Render the outbound prompt: fixed instruction preamble, workspace root,
/// truncated file listing, allow-list, task, and accumulated transcript.
pub fn build_prompt(inputs: &PromptInputs<'_>) -> String {
    let mut env = Environment::new();
    env.add_template("agent", AGENT_TEMPLATE)
        .expect("agent template should be valid");
    let template = env.get_template("agent").expect("agent template registered");

    let shown_files = &inputs.files[..inputs.files.len().min(FILE_LIST_LIMIT)];
    let allowed = if inputs.allowed_commands.is_empty() {
        "(none)".to_string()
    } else {
        inputs.allowed_commands.join(", ")
    };
    let transcript = if inputs.transcript.is_empty() {
        " (none)".to_string()
    } else {
        inputs.transcript.to_string()
    };

    template
        .render(context! {
            workspace_root => inputs.workspace_root.display().to_string(),
            files => shown_files,
            truncated => inputs.files.len() > FILE_LIST_LIMIT,
            allowed_commands => allowed,
            task => inputs.task,
            transcript => transcript,
        })
        .expect("agent template rendering should not fail")
}
