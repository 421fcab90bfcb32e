//! Iterative coding-agent orchestration loop.
//!
//! Drives a multi-turn conversation with a model-backed thread service to
//! accomplish a coding task: each iteration requests a structured action
//! plan, validates it against path and command policies, applies it to a
//! sandboxed workspace, and decides whether to continue or finish. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (envelope parsing, path safety,
//!   command authorization, required-step gate). No I/O, fully testable in
//!   isolation.
//! - **[`io`]**: Side-effecting collaborators (config, process execution,
//!   workspace, shell commands, thread service backend). Isolated behind
//!   traits to enable scripted doubles in tests.
//!
//! [`looping`] coordinates core logic with the collaborators to implement
//! the run loop; [`prompt`] builds the per-iteration prompt pack.

pub mod core;
pub mod io;
pub mod logging;
pub mod looping;
pub mod prompt;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
