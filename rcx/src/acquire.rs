//! Session acquisition cascade.
//!
//! Three strategies are tried in a fixed order, each under its own
//! deadline. The first one that yields a session wins and the rest are
//! skipped. Only when all three fail does acquisition error out, carrying
//! the last failure reason for the remediation text.

use std::fmt;
use std::time::Duration;

use rcx_common::{Credentials, RunError, SessionApi, SessionId, SessionName, bounded, mask_api_key};
use tracing::{debug, info, warn};

/// Deadline applied to each individual acquisition attempt.
pub const ACQUIRE_BUDGET: Duration = Duration::from_secs(60);

/// The three ways to obtain a session, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStrategy {
    /// Attach to an existing session with the derived name.
    Connect,
    /// Create a fresh session inside the configured team workspace.
    CreateInWorkspace,
    /// Create a fresh session in the user's personal space.
    CreatePersonal,
}

impl AcquireStrategy {
    pub const ORDER: [AcquireStrategy; 3] = [
        AcquireStrategy::Connect,
        AcquireStrategy::CreateInWorkspace,
        AcquireStrategy::CreatePersonal,
    ];
}

impl fmt::Display for AcquireStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireStrategy::Connect => write!(f, "connect to existing session"),
            AcquireStrategy::CreateInWorkspace => write!(f, "create session in workspace"),
            AcquireStrategy::CreatePersonal => write!(f, "create personal session"),
        }
    }
}

/// Run the acquisition cascade against `api`.
///
/// Returns the first session obtained, or [`RunError::Acquisition`] holding
/// the failure reason of the final attempt.
pub async fn acquire_session(
    api: &dyn SessionApi,
    name: &SessionName,
    creds: &Credentials,
) -> Result<SessionId, RunError> {
    debug!(
        api_key = %mask_api_key(&creds.api_key),
        user = %creds.user,
        workspace = %creds.workspace,
        "acquiring session"
    );

    let mut last_error = String::from("no acquisition strategy attempted");
    for strategy in AcquireStrategy::ORDER {
        info!(session = %name, %strategy, "attempting session acquisition");
        let attempt = match strategy {
            AcquireStrategy::Connect => {
                bounded(ACQUIRE_BUDGET, api.connect(name, &creds.workspace)).await
            }
            AcquireStrategy::CreateInWorkspace => {
                bounded(ACQUIRE_BUDGET, api.create(name, &creds.workspace, &creds.user)).await
            }
            AcquireStrategy::CreatePersonal => {
                bounded(ACQUIRE_BUDGET, api.create_personal(name, &creds.user)).await
            }
        };
        match attempt {
            Ok(session) => {
                info!(session = %name, id = %session, %strategy, "session acquired");
                return Ok(session);
            }
            Err(err) => {
                warn!(session = %name, %strategy, error = %err, "acquisition attempt failed");
                last_error = format!("{strategy}: {err}");
            }
        }
    }

    Err(RunError::Acquisition { last_error })
}
