//! Common types used across RCX components.

use serde::{Deserialize, Serialize};

/// Maximum length of a derived session name, in characters.
pub const SESSION_NAME_MAX_CHARS: usize = 50;

/// Identity of a remote session, used as the idempotency key for
/// session lookup and creation.
///
/// Derived deterministically from a project name and a source URL so that
/// repeated runs against the same project reconnect to the same session
/// instead of creating duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionName(String);

impl SessionName {
    /// Derive the session name from a project name and a source location.
    ///
    /// The repository name is the last path segment of the URL with any
    /// trailing `.git` stripped. The combined `{project}-{repo}` string is
    /// lowercased, spaces and any character without a lowercase mapping
    /// become dashes, and the result is truncated to
    /// [`SESSION_NAME_MAX_CHARS`] characters.
    pub fn derive(project: &str, source_url: &str) -> Self {
        let repo = repo_name_from_url(source_url);
        let name: String = format!("{project}-{repo}")
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c.is_uppercase() { '-' } else { c })
            .take(SESSION_NAME_MAX_CHARS)
            .collect();
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract the repository name from a source URL.
///
/// `https://example.com/org/widget.git` -> `widget`. Falls back to `repo`
/// when the URL has no usable path segment.
pub fn repo_name_from_url(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() { "repo" } else { name }
}
