//! UI context for detecting interactive vs CI environments

use std::io::IsTerminal;

/// Common CI environment indicators besides `CI` itself
const CI_VARS: [&str; 8] = [
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// UI context that determines output behavior
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Whether running in an interactive terminal
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: Self::detect_interactive(),
        }
    }

    /// Create a non-interactive context (for testing or explicit CI mode)
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Check if we should use fancy output (spinners, glyphs)
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }

    /// Whether a CI system is driving this process
    pub fn in_ci() -> bool {
        std::env::var_os("CI").is_some() || CI_VARS.iter().any(|v| std::env::var_os(v).is_some())
    }

    fn detect_interactive() -> bool {
        std::io::stdout().is_terminal() && std::io::stderr().is_terminal() && !Self::in_ci()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_context() {
        let ctx = UiContext::non_interactive();
        assert!(!ctx.use_fancy_output());
    }
}
