//! Output context: interactive terminal or plain (CI, pipes)

use std::io::IsTerminal;

const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Decides between symbol-rich and plain tagged output
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    fancy: bool,
}

impl UiContext {
    /// Detect from stdout and CI environment variables
    pub fn detect() -> Self {
        let fancy =
            std::io::stdout().is_terminal() && !CI_VARS.iter().any(|v| std::env::var_os(v).is_some());
        Self { fancy }
    }

    /// Plain output regardless of the terminal
    pub fn plain() -> Self {
        Self { fancy: false }
    }

    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_context() {
        assert!(!UiContext::plain().use_fancy_output());
    }
}
