//! Scripted mock session backend for tests.
//!
//! The mock never opens network sockets; each operation's behavior is
//! configured up front (succeed, fail, or hang past any guard budget) and
//! every call is recorded so tests can assert ordering, short-circuiting,
//! and teardown attempts. Intended for use with a paused tokio clock.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::session::{SessionApi, SessionError, SessionId};
use crate::types::SessionName;

/// How long a hanging mock operation sleeps; far beyond any guard budget.
const HANG: Duration = Duration::from_secs(86_400);

/// Behavior of a lifecycle operation (connect/create/start/stop).
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Succeed,
    Fail(String),
    Hang,
}

/// Behavior of a `run` call.
#[derive(Debug, Clone)]
pub enum RunBehavior {
    /// Succeed with this output.
    Output(String),
    /// Fail as a remote command failure with this detail.
    Fail(String),
    /// Never resolve within any guard budget.
    Hang,
}

/// A `run` behavior keyed by a command substring.
#[derive(Debug, Clone)]
struct RunRule {
    pattern: String,
    behavior: RunBehavior,
}

/// Scripted [`SessionApi`] implementation.
pub struct MockSessionApi {
    connect: MockBehavior,
    create: MockBehavior,
    create_personal: MockBehavior,
    start: MockBehavior,
    stop: MockBehavior,
    run_rules: Vec<RunRule>,
    default_run: RunBehavior,
    calls: Mutex<Vec<String>>,
}

impl MockSessionApi {
    pub fn builder() -> MockSessionApiBuilder {
        MockSessionApiBuilder::default()
    }

    /// Every call made so far, in order: `connect:<name>`, `create:<name>`,
    /// `create_personal:<name>`, `start`, `run:<command>`, `stop`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    /// The commands passed to `run`, in order.
    pub fn run_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("run:").map(str::to_string))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("mock call log poisoned").push(call);
    }

    async fn lifecycle(&self, behavior: &MockBehavior) -> Result<(), SessionError> {
        match behavior {
            MockBehavior::Succeed => Ok(()),
            MockBehavior::Fail(message) => Err(SessionError::Api {
                status: 400,
                message: message.clone(),
            }),
            MockBehavior::Hang => {
                tokio::time::sleep(HANG).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SessionApi for MockSessionApi {
    async fn connect(
        &self,
        name: &SessionName,
        _workspace: &str,
    ) -> Result<SessionId, SessionError> {
        self.record(format!("connect:{name}"));
        self.lifecycle(&self.connect).await?;
        Ok(SessionId::new("mock-session"))
    }

    async fn create(
        &self,
        name: &SessionName,
        _workspace: &str,
        _user: &str,
    ) -> Result<SessionId, SessionError> {
        self.record(format!("create:{name}"));
        self.lifecycle(&self.create).await?;
        Ok(SessionId::new("mock-session"))
    }

    async fn create_personal(
        &self,
        name: &SessionName,
        _user: &str,
    ) -> Result<SessionId, SessionError> {
        self.record(format!("create_personal:{name}"));
        self.lifecycle(&self.create_personal).await?;
        Ok(SessionId::new("mock-session"))
    }

    async fn start(&self, _id: &SessionId) -> Result<(), SessionError> {
        self.record("start".to_string());
        self.lifecycle(&self.start).await
    }

    async fn run(&self, _id: &SessionId, command: &str) -> Result<String, SessionError> {
        self.record(format!("run:{command}"));
        let behavior = self
            .run_rules
            .iter()
            .find(|rule| command.contains(&rule.pattern))
            .map(|rule| rule.behavior.clone())
            .unwrap_or_else(|| self.default_run.clone());

        match behavior {
            RunBehavior::Output(output) => Ok(output),
            RunBehavior::Fail(detail) => Err(SessionError::CommandFailed(detail)),
            RunBehavior::Hang => {
                tokio::time::sleep(HANG).await;
                Ok(String::new())
            }
        }
    }

    async fn stop(&self, _id: &SessionId) -> Result<(), SessionError> {
        self.record("stop".to_string());
        self.lifecycle(&self.stop).await
    }
}

/// Builder for [`MockSessionApi`]; everything succeeds by default.
pub struct MockSessionApiBuilder {
    connect: MockBehavior,
    create: MockBehavior,
    create_personal: MockBehavior,
    start: MockBehavior,
    stop: MockBehavior,
    run_rules: Vec<RunRule>,
    default_run: RunBehavior,
}

impl Default for MockSessionApiBuilder {
    fn default() -> Self {
        Self {
            connect: MockBehavior::Succeed,
            create: MockBehavior::Succeed,
            create_personal: MockBehavior::Succeed,
            start: MockBehavior::Succeed,
            stop: MockBehavior::Succeed,
            run_rules: Vec::new(),
            default_run: RunBehavior::Output("ok".to_string()),
        }
    }
}

impl MockSessionApiBuilder {
    pub fn connect(mut self, behavior: MockBehavior) -> Self {
        self.connect = behavior;
        self
    }

    pub fn create(mut self, behavior: MockBehavior) -> Self {
        self.create = behavior;
        self
    }

    pub fn create_personal(mut self, behavior: MockBehavior) -> Self {
        self.create_personal = behavior;
        self
    }

    pub fn start(mut self, behavior: MockBehavior) -> Self {
        self.start = behavior;
        self
    }

    pub fn stop(mut self, behavior: MockBehavior) -> Self {
        self.stop = behavior;
        self
    }

    /// Script the behavior of any `run` whose command contains `pattern`.
    /// Rules are matched in insertion order; the first match wins.
    pub fn on_run(mut self, pattern: impl Into<String>, behavior: RunBehavior) -> Self {
        self.run_rules.push(RunRule {
            pattern: pattern.into(),
            behavior,
        });
        self
    }

    /// Behavior for `run` calls no rule matches.
    pub fn default_run(mut self, behavior: RunBehavior) -> Self {
        self.default_run = behavior;
        self
    }

    pub fn build(self) -> MockSessionApi {
        MockSessionApi {
            connect: self.connect,
            create: self.create,
            create_personal: self.create_personal,
            start: self.start,
            stop: self.stop,
            run_rules: self.run_rules,
            default_run: self.default_run,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls_in_order() {
        let mock = MockSessionApi::builder().build();
        let name = SessionName::derive("proj", "https://example.com/a/b.git");
        let id = mock.connect(&name, "main").await.unwrap();
        mock.start(&id).await.unwrap();
        mock.run(&id, "echo hi").await.unwrap();
        mock.stop(&id).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0], "connect:proj-b");
        assert_eq!(calls[1], "start");
        assert_eq!(calls[2], "run:echo hi");
        assert_eq!(calls[3], "stop");
    }

    #[tokio::test]
    async fn test_run_rules_match_by_substring() {
        let mock = MockSessionApi::builder()
            .on_run("pytest", RunBehavior::Fail("2 failed".to_string()))
            .default_run(RunBehavior::Output("fine".to_string()))
            .build();
        let id = SessionId::new("s");

        assert!(mock.run(&id, "cd /x && timeout 300 pytest").await.is_err());
        assert_eq!(mock.run(&id, "ls").await.unwrap(), "fine");
    }
}
