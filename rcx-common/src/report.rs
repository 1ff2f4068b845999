//! The execution report: the sole output artifact of a run.

use serde::{Deserialize, Serialize};

use crate::classify::{CommandKind, classify_command};

/// Conventional exit code recorded when the guard abandons a command.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Note appended when the promotion rule flips an overall failure.
pub const PROMOTION_NOTE: &str = "Note: some commands failed but installation succeeded";

/// Outcome of one attempted command (or the synthetic clone step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
    pub success: bool,
}

/// The machine-consumable result of a run.
///
/// Serialized as exactly one line on stdout; `success` is derived from the
/// step outcomes plus the promotion rule, never set independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub outputs: Vec<CommandResult>,
    pub errors: Vec<String>,
}

impl Default for ExecutionReport {
    fn default() -> Self {
        Self {
            success: true,
            outputs: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl ExecutionReport {
    /// A terminal failure report with no step outcomes.
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            outputs: Vec::new(),
            errors,
        }
    }

    /// Record a step outcome; a failed step marks the whole run failed
    /// (subject to the later promotion rule).
    pub fn record(&mut self, result: CommandResult) {
        if !result.success {
            self.success = false;
        }
        self.outputs.push(result);
    }

    /// Mark the run failed with a reason.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }

    /// Partial-success promotion: if the run is currently failed but an
    /// install-class command succeeded *after* the last failed step, the
    /// environment ended up usable and the run is promoted to success.
    ///
    /// Returns whether the flip happened. Deliberately not applied to runs
    /// that failed before producing any step outcome.
    pub fn apply_promotion_rule(&mut self) -> bool {
        if self.success {
            return false;
        }
        let Some(last_failed) = self.outputs.iter().rposition(|r| !r.success) else {
            return false;
        };
        let promoted = self.outputs[last_failed + 1..]
            .iter()
            .any(|r| r.success && classify_command(&r.command) == CommandKind::Install);
        if promoted {
            self.success = true;
            self.errors.push(PROMOTION_NOTE.to_string());
        }
        promoted
    }

    /// Serialize to the single stdout line. Serialization of this shape
    /// cannot fail; the fallback keeps the output channel well-formed anyway.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(r#"{{"success":false,"outputs":[],"errors":["report serialization failed: {err}"]}}"#)
        })
    }
}
