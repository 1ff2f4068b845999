//! Remote Cloud Executor CLI.
//!
//! `rcx <source-url> <project-name> <command>...` runs the commands in an
//! ephemeral cloud session and prints exactly one JSON report line on
//! stdout. All diagnostics go to stderr; exit status mirrors the report's
//! `success` field.

use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;
use rcx_common::logging::init_logging;
use rcx_common::{Credentials, ExecutionReport};

use rcx::orchestrator::{Orchestrator, RunRequest};
use rcx::rest::RestClient;

const USAGE_ERROR: &str = "Usage: rcx <source-url> <project-name> <command1> [command2] ...";

#[derive(Parser, Debug)]
#[command(
    name = "rcx",
    version,
    about = "Run commands against a source tree in an ephemeral cloud session"
)]
struct Cli {
    /// Git URL of the source tree to clone into the session
    source_url: String,

    /// Project name; combined with the repository name to derive the
    /// session identity
    project: String,

    /// Shell commands to execute in order inside the clone
    #[arg(required = true, num_args = 1..)]
    commands: Vec<String>,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            // Even argument mistakes keep the stdout contract: one JSON line.
            let report = ExecutionReport::failed(vec![USAGE_ERROR.to_string()]);
            println!("{}", report.to_json_line());
            std::process::exit(1);
        }
    };

    init_logging(if cli.verbose { "debug" } else { "info" });

    let report = run(cli).await;
    println!("{}", report.to_json_line());
    std::process::exit(if report.success { 0 } else { 1 });
}

async fn run(cli: Cli) -> ExecutionReport {
    let creds = match Credentials::from_env() {
        Ok(creds) => creds,
        Err(err) => return ExecutionReport::failed(err.report_lines()),
    };
    let client = match RestClient::new(&creds.api_key) {
        Ok(client) => client,
        Err(err) => {
            return ExecutionReport::failed(vec![format!(
                "failed to initialize provider client: {err}"
            )]);
        }
    };
    let request = RunRequest {
        source_url: cli.source_url,
        project: cli.project,
        commands: cli.commands,
    };
    Orchestrator::new(Arc::new(client), creds).execute(&request).await
}
