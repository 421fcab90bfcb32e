//! Iterative coding-agent loop CLI.
//!
//! Drives a model-backed agent against a writable workspace: each iteration
//! sends the task plus accumulated transcript to the thread service, applies
//! the returned actions (file edits, allow-listed commands), and gates the
//! agent's `finish` on the required build steps having succeeded.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use coding_agent::io::command_runner::ShellCommandRunner;
use coding_agent::io::config::{AgentConfig, load_config, write_config};
use coding_agent::io::thread::CodexThreadService;
use coding_agent::io::workspace::LocalWorkspace;
use coding_agent::logging;
use coding_agent::looping::{RunOptions, run_task};

#[derive(Parser)]
#[command(
    name = "coding-agent",
    version,
    about = "Iterative coding-agent loop with allow-listed command execution"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent loop against a workspace until finish or budget.
    Run {
        /// Task description for the agent.
        #[arg(long)]
        task: String,
        /// Workspace root the agent may read and write.
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        /// Maximum loop iterations before giving up.
        #[arg(long, default_value_t = 8)]
        max_iterations: u32,
        /// Allow finish even when required steps have not succeeded.
        #[arg(long)]
        no_enforce: bool,
        /// Config file path. Missing file means defaults.
        #[arg(long, default_value = "coding-agent.toml")]
        config: PathBuf,
    },
    /// Write the default config file for editing.
    InitConfig {
        /// Destination path.
        #[arg(long, default_value = "coding-agent.toml")]
        config: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            task,
            workspace,
            max_iterations,
            no_enforce,
            config,
        } => cmd_run(task, workspace, max_iterations, no_enforce, &config),
        Command::InitConfig { config, force } => cmd_init_config(&config, force),
    }
}

fn cmd_run(
    task: String,
    workspace: PathBuf,
    max_iterations: u32,
    no_enforce: bool,
    config_path: &PathBuf,
) -> Result<()> {
    let cfg = load_config(config_path)?;
    let workspace_root = workspace
        .canonicalize()
        .with_context(|| format!("resolve workspace {}", workspace.display()))?;

    let local = LocalWorkspace::new(&workspace_root);
    let runner = ShellCommandRunner::new(
        &workspace_root,
        cfg.allowed_commands.clone(),
        Duration::from_secs(cfg.command_timeout_secs),
        cfg.output_limit_bytes,
    );
    let thread = CodexThreadService::new(
        &workspace_root,
        workspace_root.join(".coding-agent"),
        Duration::from_secs(cfg.thread_timeout_secs),
        cfg.output_limit_bytes,
    );

    let mut options = RunOptions::new(task);
    options.max_iterations = max_iterations;
    options.enforce_required_commands = !no_enforce;

    let result = run_task(&thread, &local, &runner, &cfg.required, &options, |record| {
        println!(
            "iteration {}: {} action(s), {} command(s)",
            record.iteration,
            record.executed_actions.len(),
            record.command_results.len()
        );
    })?;

    println!("summary: {}", result.summary);
    if let Some(thread_id) = &result.thread_id {
        println!("thread id: {thread_id}");
    }
    println!("iterations: {}", result.iterations.len());
    Ok(())
}

fn cmd_init_config(path: &PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    write_config(path, &AgentConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}
