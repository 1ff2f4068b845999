//! Command classification by substring heuristics.
//!
//! The classifier drives two policies: the per-command timeout budget and the
//! stop-on-failure decision (an install-class failure invalidates everything
//! after it). Keyword lists are plain data so tests can enumerate edge cases.

use std::time::Duration;

/// Substrings that mark a command as installation/download work.
pub const INSTALL_KEYWORDS: &[&str] = &["install", "download"];

/// Substrings that mark a command as test execution.
pub const TEST_KEYWORDS: &[&str] = &["test"];

/// Grace margin added to the guard budget on top of the remote-side
/// `timeout` budget, so the remote timeout fires first and returns a clean
/// report instead of the guard aborting the call.
pub const GUARD_GRACE: Duration = Duration::from_secs(30);

/// Coarse classification of a pipeline command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Dependency installation or artifact download; longest budget,
    /// failure stops the pipeline.
    Install,
    /// Test execution; medium budget.
    Test,
    /// Anything else; shortest budget.
    Other,
}

impl CommandKind {
    /// Remote execution budget for this command class.
    pub fn budget(self) -> Duration {
        match self {
            Self::Install => Duration::from_secs(600),
            Self::Test => Duration::from_secs(300),
            Self::Other => Duration::from_secs(180),
        }
    }
}

/// Classify a command by case-insensitive substring matching.
///
/// Install keywords win over test keywords, so `pip install pytest` gets the
/// install budget and the install stop-on-failure policy.
pub fn classify_command(command: &str) -> CommandKind {
    let lower = command.to_lowercase();
    if INSTALL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        CommandKind::Install
    } else if TEST_KEYWORDS.iter().any(|k| lower.contains(k)) {
        CommandKind::Test
    } else {
        CommandKind::Other
    }
}
