// crates/test-ledger-cli/src/main.rs
// ============================================================================
// Module: Test Ledger CLI Entry Point
// Description: Command dispatcher for serving and config validation.
// Purpose: Start the ledger API server or check a config file.
// Dependencies: clap, tokio, tracing, test-ledger-api, test-ledger-config
// ============================================================================

//! ## Overview
//! `test-ledger serve` loads the configuration, opens the store and serves
//! the HTTP API until Ctrl-C. `test-ledger config validate` runs the same
//! fail-closed validation without binding anything. Errors are printed to
//! stderr and map to exit code 1.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod logging;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use logging::LogFormat;
use test_ledger_api::ApiServer;
use test_ledger_config::LedgerConfig;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "test-ledger", version, about = "Test case and execution result ledger")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
    /// Command to run.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config file path (defaults to `TEST_LEDGER_CONFIG`, then `test-ledger.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Bind address overriding `server.bind`.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file and its token secret.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to `TEST_LEDGER_CONFIG`, then `test-ledger.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// CLI failure carrying the message shown to the operator.
#[derive(Debug, Error)]
#[error("{0}")]
struct CliError(String);

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.log_format).map_err(CliError)?;
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => command_config_validate(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let mut config = LedgerConfig::load(command.config.as_deref())
        .map_err(|err| CliError(format!("failed to load config: {err}")))?;
    if let Some(bind) = command.bind {
        config.server.bind = bind;
    }
    tracing::info!(bind = %config.server.bind, "configuration loaded");
    let server = tokio::task::spawn_blocking(move || ApiServer::from_config(&config))
        .await
        .map_err(|err| CliError(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config validate` command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = LedgerConfig::load(command.config.as_deref())
        .map_err(|err| CliError(format!("config invalid: {err}")))?;
    config.auth.resolve_token_secret().map_err(|err| CliError(format!("config invalid: {err}")))?;
    write_stdout_line("config ok").map_err(|err| CliError(format!("stdout write failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
