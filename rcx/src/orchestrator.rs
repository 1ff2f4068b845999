//! The primary execution path: acquire, start, probe, prepare, run, tear down.
//!
//! Every remote call goes through [`bounded`] so a wedged session can never
//! stall the run indefinitely. The start phase is optimistic: a slow or
//! failing start is tolerated because the responsiveness probe right after
//! it is the real health check. Teardown is best-effort and never changes
//! the outcome of the run.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use rcx_common::classify::GUARD_GRACE;
use rcx_common::report::TIMEOUT_EXIT_CODE;
use rcx_common::util::{CLONE_STDOUT_CAP, ERROR_CAP, STDERR_CAP, STDOUT_CAP};
use rcx_common::{
    CommandKind, CommandResult, Credentials, ExecutionReport, RunError, SessionApi, SessionId,
    SessionName, bounded, classify_command, truncate_output,
};
use tracing::{debug, info, warn};

use crate::fallback;

/// Deadline for starting an acquired session.
pub const START_BUDGET: Duration = Duration::from_secs(120);
/// Pause after start so the session environment settles before the probe.
pub const SETTLE_PAUSE: Duration = Duration::from_secs(3);
/// Deadline for the responsiveness probe.
pub const PROBE_BUDGET: Duration = Duration::from_secs(30);
/// Deadline covering the pre-clean and clone together.
pub const CLONE_BUDGET: Duration = Duration::from_secs(120);
/// Deadline for each best-effort teardown step.
pub const TEARDOWN_BUDGET: Duration = Duration::from_secs(30);

/// Trivial echo proving the session shell answers at all.
pub const PROBE_COMMAND: &str = "echo 'session ready' && pwd";
/// Parent directory for per-run clone directories on the remote side.
pub const REMOTE_RUN_BASE: &str = "/workspace/runs";

/// One execution request: where the source lives and what to run against it.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source_url: String,
    pub project: String,
    pub commands: Vec<String>,
}

/// Drives a full run against a session backend.
pub struct Orchestrator {
    api: Arc<dyn SessionApi>,
    creds: Credentials,
    cli_tool: String,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn SessionApi>, creds: Credentials) -> Self {
        Self {
            api,
            creds,
            cli_tool: fallback::CLI_TOOL.to_string(),
        }
    }

    /// Override the provider CLI binary used by the fallback path.
    pub fn with_cli_tool(mut self, tool: impl Into<String>) -> Self {
        self.cli_tool = tool.into();
        self
    }

    /// Execute `request`. Structured terminal failures (acquisition
    /// exhausted, unresponsive session, clone failure) produce their report
    /// directly; only an unrecoverable failure may retry through the
    /// provider CLI.
    pub async fn execute(&self, request: &RunRequest) -> ExecutionReport {
        match self.run_primary(request).await {
            Ok(report) => report,
            Err(err) if err.is_unrecoverable() => {
                warn!(error = %err, "unrecoverable failure on primary path");
                let mut report = ExecutionReport::failed(err.report_lines());
                if self.creds.cli_fallback {
                    info!("attempting provider CLI fallback");
                    let cli_report =
                        fallback::execute_with_tool(request, &self.cli_tool).await;
                    if cli_report.success {
                        return cli_report;
                    }
                    report.errors.extend(cli_report.errors);
                } else {
                    debug!("CLI fallback disabled by configuration");
                }
                report
            }
            Err(err) => {
                warn!(error = %err, "primary execution path failed");
                ExecutionReport::failed(err.report_lines())
            }
        }
    }

    /// The session-backed path. Terminal failures before the pipeline starts
    /// come back as errors; anything after that is recorded in the report.
    async fn run_primary(&self, request: &RunRequest) -> Result<ExecutionReport, RunError> {
        let name = SessionName::derive(&request.project, &request.source_url);
        info!(
            session = %name,
            source = %request.source_url,
            commands = request.commands.len(),
            "starting cloud execution"
        );

        let session =
            crate::acquire::acquire_session(self.api.as_ref(), &name, &self.creds).await?;

        self.start_optimistically(&session).await;
        self.probe(&session).await?;

        let run_dir = format!("{REMOTE_RUN_BASE}/repo-{}", chrono::Utc::now().timestamp());
        let mut report = ExecutionReport::default();
        self.prepare_workspace(&session, request, &run_dir, &mut report)
            .await?;

        self.run_pipeline(&session, request, &run_dir, &mut report)
            .await;
        report.apply_promotion_rule();

        self.teardown(&session, &run_dir).await;
        Ok(report)
    }

    /// Start the session, assuming it is already running when start fails
    /// or runs out of time.
    async fn start_optimistically(&self, session: &SessionId) {
        match bounded(START_BUDGET, self.api.start(session)).await {
            Ok(()) => info!(id = %session, "session started"),
            Err(err) => {
                warn!(id = %session, error = %err, "start did not confirm, assuming session is running");
            }
        }
        tokio::time::sleep(SETTLE_PAUSE).await;
    }

    /// Verify the session shell answers. A probe timeout means the session
    /// is unusable and the run is terminal; any other probe error is
    /// unanticipated and may still be retried through the fallback.
    async fn probe(&self, session: &SessionId) -> Result<(), RunError> {
        match bounded(PROBE_BUDGET, self.api.run(session, PROBE_COMMAND)).await {
            Ok(output) => {
                debug!(cwd = %output.trim(), "session is responsive");
                Ok(())
            }
            Err(err) if err.is_timeout() => Err(RunError::Unresponsive(format!(
                "no answer within {}s",
                PROBE_BUDGET.as_secs()
            ))),
            Err(err) => Err(RunError::Unrecoverable(format!("probe failed: {err}"))),
        }
    }

    /// Remove any stale clone directory and clone the source tree into a
    /// fresh one, both under a single deadline.
    async fn prepare_workspace(
        &self,
        session: &SessionId,
        request: &RunRequest,
        run_dir: &str,
        report: &mut ExecutionReport,
    ) -> Result<(), RunError> {
        let url = shell_escape::unix::escape(Cow::from(request.source_url.as_str()));
        let clone_cmd = format!("git clone {url} {run_dir}");
        info!(dir = %run_dir, "preparing workspace");

        let outcome = bounded(CLONE_BUDGET, async {
            self.api.run(session, &format!("rm -rf {run_dir}")).await?;
            self.api.run(session, &clone_cmd).await
        })
        .await;

        match outcome {
            Ok(output) => {
                report.record(CommandResult {
                    command: format!("git clone {}", request.source_url),
                    stdout: truncate_output(&output, CLONE_STDOUT_CAP),
                    stderr: String::new(),
                    exit_code: 0,
                    success: true,
                });
                Ok(())
            }
            Err(err) if err.is_timeout() => Err(RunError::Preparation(format!(
                "git clone timed out (>{}s)",
                CLONE_BUDGET.as_secs()
            ))),
            Err(err) => Err(RunError::Preparation(format!("git clone failed: {err}"))),
        }
    }

    /// Run each command in order inside the clone directory. Timeouts and
    /// failures are recorded and the pipeline continues, except an install
    /// failure which makes the rest of the pipeline pointless.
    async fn run_pipeline(
        &self,
        session: &SessionId,
        request: &RunRequest,
        run_dir: &str,
        report: &mut ExecutionReport,
    ) {
        let total = request.commands.len();
        for (index, command) in request.commands.iter().enumerate() {
            let kind = classify_command(command);
            let budget = kind.budget();
            info!(
                step = index + 1,
                total,
                kind = ?kind,
                budget_secs = budget.as_secs(),
                command = %command,
                "executing command"
            );

            // The remote timeout(1) enforces the budget inside the session;
            // the local guard only catches a transport that stopped answering.
            let remote = format!("cd {run_dir} && timeout {} {command}", budget.as_secs());

            match bounded(budget + GUARD_GRACE, self.api.run(session, &remote)).await {
                Ok(output) => {
                    debug!(preview = %truncate_output(&output, 200), "command succeeded");
                    report.record(CommandResult {
                        command: command.clone(),
                        stdout: truncate_output(&output, STDOUT_CAP),
                        stderr: String::new(),
                        exit_code: 0,
                        success: true,
                    });
                }
                Err(err) if err.is_timeout() => {
                    let reason = format!("Command timed out after {}s", budget.as_secs());
                    warn!(command = %command, "{reason}");
                    report.record(CommandResult {
                        command: command.clone(),
                        stdout: String::new(),
                        stderr: reason,
                        exit_code: TIMEOUT_EXIT_CODE,
                        success: false,
                    });
                    report.fail(truncate_output(
                        &format!("Command '{command}' timed out after {}s", budget.as_secs()),
                        ERROR_CAP,
                    ));
                }
                Err(err) => {
                    warn!(command = %command, error = %err, "command failed");
                    report.record(CommandResult {
                        command: command.clone(),
                        stdout: String::new(),
                        stderr: truncate_output(&err.to_string(), STDERR_CAP),
                        exit_code: 1,
                        success: false,
                    });
                    report.fail(truncate_output(
                        &format!("Command '{command}' failed: {err}"),
                        ERROR_CAP,
                    ));
                    if kind == CommandKind::Install {
                        warn!("install step failed, skipping remaining commands");
                        break;
                    }
                }
            }
        }
    }

    /// Best-effort cleanup: remove the clone directory and stop the session.
    /// Failures here are logged and swallowed.
    async fn teardown(&self, session: &SessionId, run_dir: &str) {
        match bounded(TEARDOWN_BUDGET, self.api.run(session, &format!("rm -rf {run_dir}"))).await {
            Ok(_) => debug!(dir = %run_dir, "workspace removed"),
            Err(err) => warn!(dir = %run_dir, error = %err, "workspace removal failed"),
        }
        match bounded(TEARDOWN_BUDGET, self.api.stop(session)).await {
            Ok(()) => info!(id = %session, "session stopped"),
            Err(err) => warn!(id = %session, error = %err, "session stop failed"),
        }
    }
}
