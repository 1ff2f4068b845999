//! The session backend seam.
//!
//! The orchestrator only ever talks to a remote session through the
//! [`SessionApi`] trait: acquisition strategies, start/stop lifecycle, and
//! remote command execution. The binary provides a REST-backed
//! implementation; tests use the scripted mock in [`crate::testing`].

use async_trait::async_trait;
use thiserror::Error;

use crate::types::SessionName;

/// Errors surfaced by a session backend.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// No session with the requested name exists in the requested scope.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The provider API rejected the request.
    #[error("provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a provider response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A remote command ran but exited non-zero.
    #[error("remote command failed: {0}")]
    CommandFailed(String),
}

/// Opaque handle to an acquired remote session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote session provider operations.
///
/// Every method is a single remote call; deadlines are the caller's job
/// (see [`crate::guard`]). `run` returns the command's combined output on a
/// zero exit and [`SessionError::CommandFailed`] otherwise.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Bind to an already-existing session in the given workspace.
    async fn connect(&self, name: &SessionName, workspace: &str) -> Result<SessionId, SessionError>;

    /// Create a new session inside the organizational workspace.
    async fn create(
        &self,
        name: &SessionName,
        workspace: &str,
        user: &str,
    ) -> Result<SessionId, SessionError>;

    /// Create a new session in the user's personal scope, outside any
    /// organizational workspace.
    async fn create_personal(
        &self,
        name: &SessionName,
        user: &str,
    ) -> Result<SessionId, SessionError>;

    /// Start the session's compute environment.
    async fn start(&self, id: &SessionId) -> Result<(), SessionError>;

    /// Execute a shell command inside the session, returning its output.
    async fn run(&self, id: &SessionId, command: &str) -> Result<String, SessionError>;

    /// Stop the session's compute environment.
    async fn stop(&self, id: &SessionId) -> Result<(), SessionError>;
}
