//! End-to-end orchestrator scenarios against the scripted mock backend.
//!
//! Every test runs under a paused clock so guard deadlines elapse instantly
//! even when a mock stage hangs.

use std::sync::Arc;

use rcx::orchestrator::{Orchestrator, RunRequest};
use rcx_common::report::{PROMOTION_NOTE, TIMEOUT_EXIT_CODE};
use rcx_common::testing::{MockBehavior, MockSessionApi, RunBehavior};
use rcx_common::util::{STDOUT_CAP, TRUNCATION_MARKER};
use rcx_common::{Credentials, ExecutionReport};

fn creds() -> Credentials {
    Credentials {
        api_key: "sk-test-0123456789".to_string(),
        user: "alice".to_string(),
        workspace: "main".to_string(),
        cli_fallback: false,
    }
}

fn request(commands: &[&str]) -> RunRequest {
    RunRequest {
        source_url: "https://example.com/org/widget.git".to_string(),
        project: "proj".to_string(),
        commands: commands.iter().map(|c| c.to_string()).collect(),
    }
}

async fn execute(mock: &Arc<MockSessionApi>, commands: &[&str]) -> ExecutionReport {
    let api: Arc<dyn rcx_common::SessionApi> = mock.clone();
    Orchestrator::new(api, creds()).execute(&request(commands)).await
}

/// A tool name guaranteed to not be on PATH, so fallback-enabled runs have
/// a deterministic CLI outcome.
const MISSING_CLI_TOOL: &str = "rcx-no-such-tool-4183";

async fn execute_with_fallback(mock: &Arc<MockSessionApi>, commands: &[&str]) -> ExecutionReport {
    let api: Arc<dyn rcx_common::SessionApi> = mock.clone();
    let creds = Credentials {
        cli_fallback: true,
        ..creds()
    };
    Orchestrator::new(api, creds)
        .with_cli_tool(MISSING_CLI_TOOL)
        .execute(&request(commands))
        .await
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_reports_clone_and_every_command() {
    let mock = Arc::new(MockSessionApi::builder().build());
    let report = execute(&mock, &["pip install -e .", "pytest"]).await;

    assert!(report.success);
    assert!(report.errors.is_empty());
    assert_eq!(report.outputs.len(), 3);
    assert!(report.outputs[0].command.starts_with("git clone"));
    assert_eq!(report.outputs[1].command, "pip install -e .");
    assert_eq!(report.outputs[2].command, "pytest");
    assert!(report.outputs.iter().all(|r| r.success && r.exit_code == 0));

    let calls = mock.calls();
    assert!(calls.iter().any(|c| c == "start"));
    assert!(calls.iter().any(|c| c == "stop"));
    let runs = mock.run_commands();
    assert!(runs[0].starts_with("echo"));
    assert!(runs.iter().any(|c| c.starts_with("rm -rf /workspace/runs/repo-")));
    assert!(runs.iter().any(|c| c.starts_with("git clone")));
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_commands_run_inside_clone_with_remote_timeout() {
    let mock = Arc::new(MockSessionApi::builder().build());
    execute(&mock, &["pip install -e .", "pytest", "ls"]).await;

    let runs = mock.run_commands();
    let install = runs.iter().find(|c| c.contains("pip install")).unwrap();
    assert!(install.starts_with("cd /workspace/runs/repo-"));
    assert!(install.contains("&& timeout 600 pip install -e ."));
    let test = runs.iter().find(|c| c.contains("pytest")).unwrap();
    assert!(test.contains("&& timeout 300 pytest"));
    let other = runs.iter().find(|c| c.ends_with("ls")).unwrap();
    assert!(other.contains("&& timeout 180 ls"));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_acquisition_reports_remediation_without_outputs() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .connect(MockBehavior::Fail("not found".into()))
            .create(MockBehavior::Fail("quota exceeded".into()))
            .create_personal(MockBehavior::Fail("permission denied".into()))
            .build(),
    );
    let report = execute(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.outputs.is_empty());
    assert!(report.errors.iter().any(|e| e.contains("permission denied")));
    assert!(report.errors.iter().any(|e| e == "TROUBLESHOOTING:"));
    assert!(report.errors.iter().any(|e| e.contains("RCX_API_KEY")));
    assert!(!mock.calls().iter().any(|c| c == "start"));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_start_is_tolerated() {
    let mock = Arc::new(MockSessionApi::builder().start(MockBehavior::Hang).build());
    let report = execute(&mock, &["pytest"]).await;

    assert!(report.success);
    assert_eq!(report.outputs.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failing_start_is_tolerated() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .start(MockBehavior::Fail("already running".into()))
            .build(),
    );
    let report = execute(&mock, &["pytest"]).await;

    assert!(report.success);
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_session_ends_run_before_clone() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("echo", RunBehavior::Hang)
            .build(),
    );
    let report = execute(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.outputs.is_empty());
    assert!(report.errors[0].contains("not responsive"));
    assert!(!mock.run_commands().iter().any(|c| c.starts_with("git clone")));
}

#[tokio::test(start_paused = true)]
async fn test_probe_error_ends_run_when_fallback_disabled() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("echo", RunBehavior::Fail("shell unavailable".into()))
            .build(),
    );
    let report = execute(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.outputs.is_empty());
    assert!(report.errors[0].contains("Session execution failed"));
    assert!(report.errors[0].contains("shell unavailable"));
    assert_eq!(report.errors.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_probe_error_with_fallback_merges_cli_errors() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("echo", RunBehavior::Fail("shell unavailable".into()))
            .build(),
    );
    let report = execute_with_fallback(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.errors[0].contains("Session execution failed"));
    assert!(report.errors.iter().any(|e| e.contains("CLI not available")));
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_failure_is_terminal_despite_fallback() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .connect(MockBehavior::Fail("not found".into()))
            .create(MockBehavior::Fail("quota exceeded".into()))
            .create_personal(MockBehavior::Fail("permission denied".into()))
            .build(),
    );
    let report = execute_with_fallback(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.errors.iter().any(|e| e == "TROUBLESHOOTING:"));
    assert!(!report.errors.iter().any(|e| e.contains("CLI")));
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_is_terminal_despite_fallback() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("echo", RunBehavior::Hang)
            .build(),
    );
    let report = execute_with_fallback(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.errors[0].contains("not responsive"));
    assert!(!report.errors.iter().any(|e| e.contains("CLI")));
}

#[tokio::test(start_paused = true)]
async fn test_clone_failure_is_terminal_despite_fallback() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("git clone", RunBehavior::Fail("authentication required".into()))
            .build(),
    );
    let report = execute_with_fallback(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.errors[0].contains("git clone failed"));
    assert!(!report.errors.iter().any(|e| e.contains("CLI")));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_clone_aborts_without_teardown() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("git clone", RunBehavior::Hang)
            .build(),
    );
    let report = execute(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.outputs.is_empty());
    assert!(report.errors[0].contains("git clone timed out"));
    assert!(!mock.calls().iter().any(|c| c == "stop"));
}

#[tokio::test(start_paused = true)]
async fn test_clone_failure_carries_backend_detail() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("git clone", RunBehavior::Fail("authentication required".into()))
            .build(),
    );
    let report = execute(&mock, &["pytest"]).await;

    assert!(!report.success);
    assert!(report.errors[0].contains("git clone failed"));
    assert!(report.errors[0].contains("authentication required"));
}

#[tokio::test(start_paused = true)]
async fn test_install_failure_stops_the_pipeline() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("pip install", RunBehavior::Fail("no matching distribution".into()))
            .build(),
    );
    let report = execute(&mock, &["pip install -e .", "pytest"]).await;

    assert!(!report.success);
    // clone + the failed install, never the test step
    assert_eq!(report.outputs.len(), 2);
    assert!(!mock.run_commands().iter().any(|c| c.contains("pytest")));
    assert!(report.errors.iter().any(|e| e.contains("failed")));
    // teardown still runs
    assert!(mock.calls().iter().any(|c| c == "stop"));
}

#[tokio::test(start_paused = true)]
async fn test_non_install_failure_continues_pipeline() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("pytest", RunBehavior::Fail("2 tests failed".into()))
            .build(),
    );
    let report = execute(&mock, &["pytest", "ls"]).await;

    assert!(!report.success);
    assert_eq!(report.outputs.len(), 3);
    assert!(mock.run_commands().iter().any(|c| c.ends_with("ls")));
}

#[tokio::test(start_paused = true)]
async fn test_install_ok_then_test_failure_is_overall_failure() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("pytest", RunBehavior::Fail("2 tests failed".into()))
            .build(),
    );
    let report = execute(&mock, &["pip install -e .", "pytest"]).await;

    assert!(!report.success);
    assert_eq!(report.outputs.len(), 3);
    assert!(report.outputs[1].success);
    assert!(!report.outputs[2].success);
    assert!(report.errors.iter().any(|e| e.contains("pytest")));
}

#[tokio::test(start_paused = true)]
async fn test_later_install_success_promotes_overall_result() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("pytest", RunBehavior::Fail("2 tests failed".into()))
            .build(),
    );
    let report = execute(&mock, &["pytest", "pip install -e ."]).await;

    assert!(report.success);
    assert!(report.errors.iter().any(|e| e == PROMOTION_NOTE));
    assert!(report.errors.iter().any(|e| e.contains("pytest")));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_command_records_timeout_and_continues() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .on_run("sleep", RunBehavior::Hang)
            .build(),
    );
    let report = execute(&mock, &["sleep 9999", "ls"]).await;

    assert!(!report.success);
    assert_eq!(report.outputs.len(), 3);
    let timed_out = &report.outputs[1];
    assert_eq!(timed_out.exit_code, TIMEOUT_EXIT_CODE);
    assert!(timed_out.stderr.contains("timed out after 180s"));
    assert!(mock.run_commands().iter().any(|c| c.ends_with("ls")));
    assert!(report.errors.iter().any(|e| e.contains("timed out")));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_failure_does_not_change_outcome() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .stop(MockBehavior::Fail("stop rejected".into()))
            .build(),
    );
    let report = execute(&mock, &["pytest"]).await;

    assert!(report.success);
    assert!(report.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_huge_output_is_truncated_with_marker() {
    let mock = Arc::new(
        MockSessionApi::builder()
            .default_run(RunBehavior::Output("x".repeat(1024 * 1024)))
            .build(),
    );
    let report = execute(&mock, &["pytest"]).await;

    assert!(report.success);
    let stdout = &report.outputs[1].stdout;
    assert!(stdout.ends_with(TRUNCATION_MARKER));
    assert!(stdout.len() <= STDOUT_CAP + TRUNCATION_MARKER.len());
}

#[tokio::test(start_paused = true)]
async fn test_report_serializes_with_camel_case_exit_code() {
    let mock = Arc::new(MockSessionApi::builder().build());
    let report = execute(&mock, &["pytest"]).await;

    let line = report.to_json_line();
    assert!(line.contains(r#""exitCode":0"#));
    assert!(line.contains(r#""success":true"#));
    assert!(!line.contains('\n'));
}
