//! Required-step completion gate.
//!
//! Tracks whether the mandatory verification commands (install, lint, build,
//! health check) have each succeeded at least once during a run. The
//! orchestrator consults the gate when the agent asks to finish; while
//! enforcement is on, an early finish is rejected softly and the loop
//! continues so the agent can complete the missing steps.

use serde::{Deserialize, Serialize};

/// Substring rules identifying one required step in command text.
///
/// Each rule lists substrings that must all be present; the step matches a
/// command when any rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepKeywords {
    /// Human-readable name used in finish-rejection notes.
    pub label: String,
    pub rules: Vec<Vec<String>>,
}

impl StepKeywords {
    fn new(label: &str, rules: &[&[&str]]) -> Self {
        Self {
            label: label.to_string(),
            rules: rules
                .iter()
                .map(|rule| rule.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    /// Whether `command` satisfies any of this step's rules.
    pub fn matches(&self, command: &str) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.iter().all(|needle| command.contains(needle.as_str())))
    }
}

/// Keyword configuration for the four required steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredKeywords {
    pub install: StepKeywords,
    pub lint: StepKeywords,
    pub build: StepKeywords,
    pub health_check: StepKeywords,
}

impl Default for RequiredKeywords {
    fn default() -> Self {
        Self {
            install: StepKeywords::new("npm install", &[&["npm install"]]),
            lint: StepKeywords::new("npm run lint", &[&["npm run lint"], &["npm run eslint"]]),
            build: StepKeywords::new("npm run build", &[&["npm run build"]]),
            health_check: StepKeywords::new("health check (curl)", &[&["curl", "localhost"]]),
        }
    }
}

/// Per-run completion state.
///
/// All flags start false and flip permanently true on the first exit-0
/// command matching the step's keywords. Never reset mid-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequiredCommandState {
    pub install: bool,
    pub lint: bool,
    pub build: bool,
    pub health_check: bool,
}

impl RequiredCommandState {
    /// Record a command that completed with exit code 0.
    pub fn record_success(&mut self, keywords: &RequiredKeywords, command: &str) {
        if keywords.install.matches(command) {
            self.install = true;
        } else if keywords.lint.matches(command) {
            self.lint = true;
        } else if keywords.build.matches(command) {
            self.build = true;
        } else if keywords.health_check.matches(command) {
            self.health_check = true;
        }
    }

    pub fn all_satisfied(&self) -> bool {
        self.install && self.lint && self.build && self.health_check
    }

    /// Labels of steps that have not yet succeeded, in workflow order.
    pub fn missing<'a>(&self, keywords: &'a RequiredKeywords) -> Vec<&'a str> {
        let mut missing = Vec::new();
        if !self.install {
            missing.push(keywords.install.label.as_str());
        }
        if !self.lint {
            missing.push(keywords.lint.label.as_str());
        }
        if !self.build {
            missing.push(keywords.build.label.as_str());
        }
        if !self.health_check {
            missing.push(keywords.health_check.label.as_str());
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_reports_all_steps_missing() {
        let keywords = RequiredKeywords::default();
        let state = RequiredCommandState::default();

        assert!(!state.all_satisfied());
        assert_eq!(
            state.missing(&keywords),
            vec![
                "npm install",
                "npm run lint",
                "npm run build",
                "health check (curl)"
            ]
        );
    }

    #[test]
    fn successful_commands_flip_matching_steps() {
        let keywords = RequiredKeywords::default();
        let mut state = RequiredCommandState::default();

        state.record_success(&keywords, "npm install");
        state.record_success(&keywords, "npm run lint");
        state.record_success(&keywords, "npm run build");
        assert!(!state.all_satisfied());
        assert_eq!(state.missing(&keywords), vec!["health check (curl)"]);

        state.record_success(&keywords, "curl http://localhost:3000");
        assert!(state.all_satisfied());
        assert!(state.missing(&keywords).is_empty());
    }

    #[test]
    fn lint_matches_either_rule() {
        let keywords = RequiredKeywords::default();
        let mut state = RequiredCommandState::default();
        state.record_success(&keywords, "npm run eslint -- --fix");
        assert!(state.lint);
    }

    #[test]
    fn health_check_requires_both_substrings() {
        let keywords = RequiredKeywords::default();
        let mut state = RequiredCommandState::default();

        state.record_success(&keywords, "curl https://example.com");
        assert!(!state.health_check);
        state.record_success(&keywords, "curl http://localhost:3000");
        assert!(state.health_check);
    }

    #[test]
    fn unrelated_command_changes_nothing() {
        let keywords = RequiredKeywords::default();
        let mut state = RequiredCommandState::default();
        state.record_success(&keywords, "ls -la");
        assert_eq!(state, RequiredCommandState::default());
    }

    #[test]
    fn keywords_deserialize_from_partial_toml() {
        let keywords: RequiredKeywords = toml::from_str(
            r#"
            [install]
            label = "pnpm install"
            rules = [["pnpm install"]]
            "#,
        )
        .expect("parse");

        assert_eq!(keywords.install.label, "pnpm install");
        // Omitted steps keep their defaults.
        assert_eq!(keywords.build, RequiredKeywords::default().build);
    }
}
