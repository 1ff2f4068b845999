//! Provider CLI fallback.
//!
//! When the session API path fails before any command ran, the same work can
//! be attempted through the provider's CLI tool: synthesize a single shell
//! script that clones the source and runs every command, then hand it to the
//! CLI. The whole batch reports as one result because the CLI gives us no
//! per-command boundaries.

use std::borrow::Cow;
use std::time::Duration;

use rcx_common::util::{STDERR_CAP, STDOUT_CAP};
use rcx_common::{CommandResult, ExecutionReport, truncate_output};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::orchestrator::{REMOTE_RUN_BASE, RunRequest};

/// Name of the provider CLI binary looked up on PATH.
pub const CLI_TOOL: &str = "studio";
/// Deadline for the `--version` responsiveness check.
pub const CLI_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for the whole scripted batch.
pub const CLI_RUN_TIMEOUT: Duration = Duration::from_secs(600);

/// Label used for the single batched result.
const BATCH_LABEL: &str = "all commands";

/// Attempt the request through the named provider CLI on PATH. The tool
/// name is a parameter so tests can point it at a binary that does not
/// exist; production callers pass [`CLI_TOOL`].
pub async fn execute_with_tool(request: &RunRequest, tool: &str) -> ExecutionReport {
    let mut report = ExecutionReport::failed(Vec::new());

    if which::which(tool).is_err() {
        report.fail(format!("{tool} CLI not available"));
        return report;
    }

    match tokio::time::timeout(
        CLI_PROBE_TIMEOUT,
        Command::new(tool).arg("--version").output(),
    )
    .await
    {
        Ok(Ok(output)) if output.status.success() => {
            debug!(
                version = %String::from_utf8_lossy(&output.stdout).trim(),
                "provider CLI is available"
            );
        }
        Ok(_) => {
            report.fail(format!("{tool} CLI is present but not working"));
            return report;
        }
        Err(_) => {
            report.fail(format!("{tool} CLI version check timed out"));
            return report;
        }
    }

    let script = build_script(request);
    let script_path = std::env::temp_dir().join(format!(
        "rcx-fallback-{}.sh",
        chrono::Utc::now().timestamp()
    ));
    if let Err(err) = std::fs::write(&script_path, &script) {
        report.fail(format!("failed to write fallback script: {err}"));
        return report;
    }

    info!(commands = request.commands.len(), "running batch via provider CLI");
    let outcome = tokio::time::timeout(
        CLI_RUN_TIMEOUT,
        Command::new(tool)
            .args(["run", "session", "--script"])
            .arg(&script_path)
            .output(),
    )
    .await;
    if let Err(err) = std::fs::remove_file(&script_path) {
        debug!(error = %err, "fallback script not removed");
    }

    match outcome {
        Ok(Ok(output)) => {
            let stdout = truncate_output(&String::from_utf8_lossy(&output.stdout), STDOUT_CAP);
            let stderr = truncate_output(&String::from_utf8_lossy(&output.stderr), STDERR_CAP);
            if output.status.success() {
                info!("provider CLI batch succeeded");
                report.success = true;
                report.record(CommandResult {
                    command: BATCH_LABEL.to_string(),
                    stdout,
                    stderr,
                    exit_code: 0,
                    success: true,
                });
            } else {
                let code = output.status.code().unwrap_or(1);
                warn!(exit_code = code, "provider CLI batch failed");
                report.record(CommandResult {
                    command: BATCH_LABEL.to_string(),
                    stdout,
                    stderr: stderr.clone(),
                    exit_code: code,
                    success: false,
                });
                report.fail(format!("CLI execution failed: {stderr}"));
            }
        }
        Ok(Err(err)) => report.fail(format!("CLI execution error: {err}")),
        Err(_) => report.fail(format!(
            "CLI execution timed out after {}s",
            CLI_RUN_TIMEOUT.as_secs()
        )),
    }

    report
}

/// Synthesize the batch script: clone, enter the clone, run every command.
/// `set -e` stops the batch at the first failing step.
pub fn build_script(request: &RunRequest) -> String {
    let url = shell_escape::unix::escape(Cow::from(request.source_url.as_str()));
    let clone_dir = format!("{REMOTE_RUN_BASE}/repo");
    let mut script = String::from("#!/bin/bash\nset -e\n");
    script.push_str(&format!("rm -rf {clone_dir}\n"));
    script.push_str(&format!("git clone {url} {clone_dir}\n"));
    script.push_str(&format!("cd {clone_dir}\n"));
    for command in &request.commands {
        script.push_str(command);
        script.push('\n');
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RunRequest {
        RunRequest {
            source_url: "https://example.com/org/widget.git".to_string(),
            project: "proj".to_string(),
            commands: vec!["pip install -e .".to_string(), "pytest".to_string()],
        }
    }

    #[test]
    fn test_script_clones_then_runs_commands_in_order() {
        let script = build_script(&request());
        assert!(script.starts_with("#!/bin/bash\nset -e\n"));
        let clone_pos = script.find("git clone").unwrap();
        let cd_pos = script.find("cd /workspace/runs/repo").unwrap();
        let install_pos = script.find("pip install -e .").unwrap();
        let test_pos = script.find("pytest").unwrap();
        assert!(clone_pos < cd_pos);
        assert!(cd_pos < install_pos);
        assert!(install_pos < test_pos);
    }

    #[test]
    fn test_script_escapes_shell_metacharacters_in_url() {
        let mut req = request();
        req.source_url = "https://example.com/a repo;rm.git".to_string();
        let script = build_script(&req);
        assert!(script.contains("'https://example.com/a repo;rm.git'"));
    }

    #[tokio::test]
    async fn test_missing_tool_yields_failed_report() {
        let report = execute_with_tool(&request(), "rcx-no-such-tool-4183").await;
        assert!(!report.success);
        assert!(report.outputs.is_empty());
        assert!(report.errors[0].contains("not available"));
    }
}
