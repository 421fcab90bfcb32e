//! Side-effecting collaborators for the agent loop.

pub mod command_runner;
pub mod config;
pub mod process;
pub mod thread;
pub mod workspace;
