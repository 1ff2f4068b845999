//! Environment-sourced configuration.
//!
//! Credentials are read once at startup from `RCX_`-prefixed environment
//! variables; missing required fields are a terminal configuration error
//! produced before any remote call. Parsing never panics: invalid optional
//! values fall back to defaults and the problem is collected for logging.

use std::env;

use tracing::warn;

use crate::error::RunError;

/// Default organizational workspace when `RCX_WORKSPACE` is unset.
pub const DEFAULT_WORKSPACE: &str = "main";

/// Environment variable prefix for all recognized keys.
const ENV_PREFIX: &str = "RCX_";

/// Immutable per-run credentials and policy flags.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Provider API key.
    pub api_key: String,
    /// Account identifier: username if set, numeric user id otherwise.
    pub user: String,
    /// Organizational workspace sessions are created under.
    pub workspace: String,
    /// Whether the CLI fallback path is allowed.
    pub cli_fallback: bool,
}

impl Credentials {
    /// Load credentials from the environment.
    pub fn from_env() -> Result<Self, RunError> {
        let mut parser = EnvParser::new();

        let api_key = parser.get_optional_string("API_KEY");
        let username = parser.get_optional_string("USERNAME");
        let user_id = parser.get_optional_string("USER_ID");
        let workspace = parser.get_string("WORKSPACE", DEFAULT_WORKSPACE);
        let cli_fallback = parser.get_bool("CLI_FALLBACK", true);

        // Malformed optional values are not fatal; surface them on stderr.
        for problem in parser.take_errors() {
            warn!("{problem}");
        }

        let Some(api_key) = api_key else {
            return Err(RunError::Configuration {
                errors: vec!["RCX_API_KEY not set in environment".to_string()],
            });
        };

        let Some(user) = username.or(user_id) else {
            return Err(RunError::Configuration {
                errors: vec![
                    "RCX_USERNAME or RCX_USER_ID must be set in environment".to_string(),
                    "The provider needs a user parameter when creating sessions".to_string(),
                    "Get your username from your profile page on the provider dashboard"
                        .to_string(),
                ],
            });
        };

        Ok(Self {
            api_key,
            user,
            workspace,
            cli_fallback,
        })
    }
}

/// Type-safe environment variable parser with collected errors.
pub struct EnvParser {
    errors: Vec<String>,
}

impl EnvParser {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    fn var_name(&self, name: &str) -> String {
        format!("{ENV_PREFIX}{name}")
    }

    /// Get a string value with default.
    pub fn get_string(&mut self, name: &str, default: &str) -> String {
        env::var(self.var_name(name)).unwrap_or_else(|_| default.to_string())
    }

    /// Get an optional string (None if unset or empty).
    pub fn get_optional_string(&mut self, name: &str) -> Option<String> {
        match env::var(self.var_name(name)) {
            Ok(value) if value.is_empty() => None,
            Ok(value) => Some(value),
            Err(_) => None,
        }
    }

    /// Get a boolean value with default.
    ///
    /// Accepts: 1, true, yes, on (for true)
    ///          0, false, no, off, "" (for false)
    pub fn get_bool(&mut self, name: &str, default: bool) -> bool {
        let var_name = self.var_name(name);
        match env::var(&var_name) {
            Ok(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    self.errors.push(format!(
                        "Invalid value for {var_name}: expected boolean, got '{value}'"
                    ));
                    default
                }
            },
            Err(_) => default,
        }
    }
}

impl Default for EnvParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}
