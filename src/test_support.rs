//! Scripted collaborator doubles for loop tests.
//!
//! Compiled for this crate's own tests and, behind the `test-support`
//! feature, for downstream integration tests. Each double records the calls
//! it receives so tests can assert on interaction order, not just outcomes.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::io::command_runner::{CommandExecutionResult, CommandRunner};
use crate::io::thread::{ThreadService, ThreadTurn};
use crate::io::workspace::Workspace;

/// Thread service that replays a fixed sequence of responses.
#[derive(Debug)]
pub struct ScriptedThreadService {
    responses: RefCell<VecDeque<String>>,
    thread_id: Option<String>,
    prompts: RefCell<Vec<String>>,
    received_thread_ids: RefCell<Vec<Option<String>>>,
}

impl ScriptedThreadService {
    /// Script responses with no thread id reported.
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: RefCell::new(responses.iter().map(|s| s.to_string()).collect()),
            thread_id: None,
            prompts: RefCell::new(Vec::new()),
            received_thread_ids: RefCell::new(Vec::new()),
        }
    }

    /// Script responses that all report the same thread id.
    pub fn with_thread_id(responses: &[&str], thread_id: &str) -> Self {
        let mut service = Self::new(responses);
        service.thread_id = Some(thread_id.to_string());
        service
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    /// Thread ids the caller supplied on each call, in call order.
    pub fn received_thread_ids(&self) -> Vec<Option<String>> {
        self.received_thread_ids.borrow().clone()
    }
}

impl ThreadService for ScriptedThreadService {
    fn run_prompt(&self, prompt: &str, thread_id: Option<&str>) -> Result<ThreadTurn> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.received_thread_ids
            .borrow_mut()
            .push(thread_id.map(|s| s.to_string()));
        let text = self
            .responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted response left"))?;
        Ok(ThreadTurn {
            text,
            thread_id: self.thread_id.clone(),
        })
    }
}

/// Workspace backed by an in-memory file map.
#[derive(Debug)]
pub struct InMemoryWorkspace {
    root: PathBuf,
    files: RefCell<BTreeMap<String, String>>,
}

impl InMemoryWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: RefCell::new(BTreeMap::new()),
        }
    }

    /// Pre-populate a file before the run starts.
    pub fn seed(&self, path: &str, content: &str) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
    }

    /// Current content of a file, if written.
    pub fn file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl Workspace for InMemoryWorkspace {
    fn root_dir(&self) -> &Path {
        &self.root
    }

    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn list_project_files(&self) -> Result<Vec<String>> {
        Ok(self.files.borrow().keys().cloned().collect())
    }
}

/// Command runner with a fixed allow-list and canned results per command.
///
/// Unscripted commands succeed with exit code 0 and empty output, so tests
/// only script the commands whose outcomes they care about.
#[derive(Debug)]
pub struct ScriptedCommandRunner {
    allowed: Vec<String>,
    results: HashMap<String, CommandExecutionResult>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedCommandRunner {
    /// `results` entries are `(command, exit_code, stdout, stderr)`.
    pub fn new(allowed: &[&str], results: &[(&str, i32, &str, &str)]) -> Self {
        let results = results
            .iter()
            .map(|(command, exit_code, stdout, stderr)| {
                (
                    command.to_string(),
                    CommandExecutionResult {
                        command: command.to_string(),
                        exit_code: *exit_code,
                        stdout: stdout.to_string(),
                        stderr: stderr.to_string(),
                    },
                )
            })
            .collect();
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
            results,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Commands executed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedCommandRunner {
    fn allowed_commands(&self) -> Vec<String> {
        self.allowed.clone()
    }

    fn run(&self, command: &str) -> Result<CommandExecutionResult> {
        self.calls.borrow_mut().push(command.to_string());
        Ok(self
            .results
            .get(command)
            .cloned()
            .unwrap_or_else(|| CommandExecutionResult {
                command: command.to_string(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }))
    }
}
