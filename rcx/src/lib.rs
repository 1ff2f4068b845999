//! Remote Cloud Executor orchestration internals.
//!
//! Exposed as a library so integration tests can drive the orchestrator
//! against the scripted mock backend; the `rcx` binary is a thin shell
//! around [`orchestrator::Orchestrator`].

pub mod acquire;
pub mod fallback;
pub mod orchestrator;
pub mod rest;
