//! Error taxonomy for a run.
//!
//! Terminal failures of the primary path are typed here and converted into
//! report content; each variant keeps its reason strings so the final report
//! is reconstructible from structured data alone. Acquisition failures carry
//! remediation steps, since credential and permission problems are the most
//! actionable class.

use thiserror::Error;

/// A failure that terminates the primary path.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// Required credentials were missing; produced before any remote call.
    #[error("configuration error: {}", .errors.join("; "))]
    Configuration { errors: Vec<String> },

    /// Every acquisition strategy failed.
    #[error("session acquisition failed: {last_error}")]
    Acquisition { last_error: String },

    /// An acquired session did not answer the responsiveness probe in time.
    #[error("session is not responsive: {0}")]
    Unresponsive(String),

    /// The workspace clone failed or timed out.
    #[error("workspace preparation failed: {0}")]
    Preparation(String),

    /// A failure that escaped the structured handling above; the only
    /// variant that routes to the CLI fallback.
    #[error("unrecoverable failure: {0}")]
    Unrecoverable(String),
}

impl RunError {
    /// Render this failure as the error lines of an [`crate::ExecutionReport`].
    pub fn report_lines(&self) -> Vec<String> {
        match self {
            Self::Configuration { errors } => errors.clone(),
            Self::Acquisition { last_error } => acquisition_remediation(last_error),
            Self::Unresponsive(reason) => vec![
                format!("Session is not responsive ({reason})"),
                "Try again or check the provider dashboard".to_string(),
            ],
            Self::Preparation(reason) => vec![reason.clone()],
            Self::Unrecoverable(reason) => vec![format!("Session execution failed: {reason}")],
        }
    }

    /// Whether this failure may be retried through the CLI fallback.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Unrecoverable(_))
    }
}

/// Remediation block for exhausted acquisition cascades.
fn acquisition_remediation(last_error: &str) -> Vec<String> {
    vec![
        format!("Session creation failed: {last_error}"),
        String::new(),
        "TROUBLESHOOTING:".to_string(),
        "1. Verify your provider account is active".to_string(),
        "2. Get your credentials from Settings > API Keys".to_string(),
        "3. For a workspace, use the name from your workspace URL".to_string(),
        "4. Try creating a session manually first to verify access".to_string(),
        String::new(),
        "Required env vars:".to_string(),
        "  RCX_API_KEY=<your-api-key>".to_string(),
        "  RCX_USERNAME=<your-username> (or RCX_USER_ID)".to_string(),
        "  RCX_WORKSPACE=<workspace-name> (optional)".to_string(),
    ]
}
