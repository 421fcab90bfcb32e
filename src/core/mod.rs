//! Pure decision logic for the agent loop.

pub mod action;
pub mod allowlist;
pub mod path;
pub mod required;
