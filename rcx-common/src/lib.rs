//! Shared types and utilities for Remote Cloud Executor.
//!
//! This crate holds everything both the CLI binary and its tests need:
//! the execution report data model, the command classifier, the env-sourced
//! configuration layer, the timeout guard, the session backend trait, and a
//! scripted mock backend for tests.

pub mod classify;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod report;
pub mod session;
pub mod testing;
pub mod types;
pub mod util;

pub use classify::{CommandKind, classify_command};
pub use config::Credentials;
pub use error::RunError;
pub use guard::{GuardError, bounded};
pub use report::{CommandResult, ExecutionReport};
pub use session::{SessionApi, SessionError, SessionId};
pub use types::SessionName;
pub use util::{mask_api_key, truncate_output};
