//! Exact-match command authorization.

use anyhow::{Result, anyhow};

/// Permit `command` only when it appears verbatim in the allow-list.
///
/// No prefix, glob, or pattern matching: the command string is handed to a
/// shell-backed runner as-is, so anything short of string equality widens
/// the policy.
pub fn authorize_command<'a>(command: &'a str, allowed: &[String]) -> Result<&'a str> {
    if allowed.iter().any(|entry| entry == command) {
        return Ok(command);
    }
    Err(anyhow!(
        "Command {command} is not allowed. Allowed commands: {}",
        allowed.join(", ")
    ))
}
