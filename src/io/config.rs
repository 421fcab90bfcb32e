//! Agent configuration stored as a TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::required::RequiredKeywords;

/// Agent configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Exact command strings the agent is allowed to run.
    pub allowed_commands: Vec<String>,

    /// Wall-clock budget for one authorized command, in seconds.
    pub command_timeout_secs: u64,

    /// Wall-clock budget for one thread service call, in seconds.
    pub thread_timeout_secs: u64,

    /// Truncate captured command/thread output beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Keyword rules for the required-step completion gate.
    pub required: RequiredKeywords,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            allowed_commands: vec![
                "npm install".to_string(),
                "npm run lint".to_string(),
                "npm run build".to_string(),
                "npm run dev".to_string(),
                "curl http://localhost:3000".to_string(),
            ],
            command_timeout_secs: 10 * 60,
            thread_timeout_secs: 30 * 60,
            output_limit_bytes: 8 * 1024 * 1024,
            required: RequiredKeywords::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.thread_timeout_secs == 0 {
            return Err(anyhow!("thread_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self
            .allowed_commands
            .iter()
            .any(|entry| entry.trim().is_empty())
        {
            return Err(anyhow!("allowed_commands entries must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = AgentConfig::default();
        cfg.allowed_commands.push("pnpm test".to_string());
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults_for_omitted_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "allowed_commands = [\"pnpm test\"]\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.allowed_commands, vec!["pnpm test".to_string()]);
        assert_eq!(
            cfg.command_timeout_secs,
            AgentConfig::default().command_timeout_secs
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = AgentConfig {
            command_timeout_secs: 0,
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn blank_allow_list_entry_is_rejected() {
        let cfg = AgentConfig {
            allowed_commands: vec!["npm install".to_string(), "  ".to_string()],
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
