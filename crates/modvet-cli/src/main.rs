// crates/modvet-cli/src/main.rs
// ============================================================================
// Module: modvet CLI Entry Point
// Description: Command dispatcher for the modvet server and offline tools.
// Purpose: Run the validation server and the snapshot maintenance workflows.
// Dependencies: clap, modvet-config, modvet-core, modvet-dispatch, modvet-server, tokio
// ============================================================================

//! ## Overview
//! `modvet` runs the validation server and the offline tools that operate on
//! its snapshots: `clean` purges packages the purge policy rejects,
//! `tabulate` prints LaTeX statistics, and `rescan` re-queues packages whose
//! download or build failed. Every command shares the configuration loader
//! and the audit sink selected by `[logging]`.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod report;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use modvet_config::LoggingConfig;
use modvet_config::ModvetConfig;
use modvet_core::AuditSink;
use modvet_core::FileAuditSink;
use modvet_core::LogLevel;
use modvet_core::Package;
use modvet_core::PackageStore;
use modvet_core::PurgeReason;
use modvet_core::StderrAuditSink;
use modvet_core::Tabulation;
use modvet_core::clean_store;
use modvet_dispatch::DispatchQueue;
use modvet_dispatch::DispatchRequest;
use modvet_dispatch::ProcessRunner;
use modvet_server::ModvetServer;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "modvet", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to `MODVET_CONFIG`, then ./modvet.toml).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Override `storage.data_dir`.
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Log debug-level audit events.
    #[arg(long, short, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP validation server.
    Serve,
    /// Purge packages rejected by the purge policy from the latest snapshot.
    Clean,
    /// Print LaTeX statistics tables for the latest snapshot.
    Tabulate,
    /// Re-run the validator for failed packages.
    Rescan(RescanCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration for the `rescan` command.
#[derive(Args, Debug)]
struct RescanCommand {
    /// Which failures to select.
    #[arg(long, value_enum, default_value_t = RescanMode::DownloadFailed)]
    mode: RescanMode,
    /// Read this snapshot instead of the latest one in the data directory.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,
    /// Dispatch validator runs instead of printing shell commands.
    #[arg(long, action = ArgAction::SetTrue)]
    execute: bool,
}

/// Rescan selection modes.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RescanMode {
    /// Packages whose download failed.
    DownloadFailed,
    /// Packages that downloaded but failed to build.
    BuildFailed,
}

impl RescanMode {
    /// Returns true when `package` should be rescanned.
    const fn selects(self, package: &Package) -> bool {
        match self {
            Self::DownloadFailed => !package.record.download_succeeded,
            Self::BuildFailed => {
                package.record.download_succeeded && !package.record.all_builds_pass
            }
        }
    }
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a modvet configuration file.
    Validate,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

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
    let mut config = ModvetConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
        config.validate().map_err(|err| CliError::new(err.to_string()))?;
    }

    match cli.command {
        Commands::Serve => {
            let audit = build_audit_sink(&config.logging, cli.verbose)?;
            command_serve(config, audit).await
        }
        Commands::Clean => {
            command_clean(&config, build_audit_sink(&config.logging, cli.verbose)?).await
        }
        Commands::Tabulate => {
            command_tabulate(&config, build_audit_sink(&config.logging, cli.verbose)?).await
        }
        Commands::Rescan(command) => {
            let audit = build_audit_sink(&config.logging, cli.verbose)?;
            command_rescan(&config, audit, &command).await
        }
        Commands::Config {
            command,
        } => command_config(&config, &command),
    }
}

/// Builds the audit sink selected by the logging config.
fn build_audit_sink(logging: &LoggingConfig, verbose: bool) -> CliResult<Arc<dyn AuditSink>> {
    let level = if verbose { LogLevel::Debug } else { logging.level };
    match &logging.audit_path {
        Some(path) => {
            let sink = FileAuditSink::new(path, level).map_err(|err| {
                CliError::new(format!("failed to open audit log {}: {err}", path.display()))
            })?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink::new(level))),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(config: ModvetConfig, audit: Arc<dyn AuditSink>) -> CliResult<ExitCode> {
    let server = ModvetServer::from_config(config, audit)
        .map_err(|err| CliError::new(format!("failed to start server: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Snapshot Commands
// ============================================================================

/// Executes the `clean` command.
async fn command_clean(config: &ModvetConfig, audit: Arc<dyn AuditSink>) -> CliResult<ExitCode> {
    let store = Arc::new(open_latest(&config.storage.data_dir, Arc::clone(&audit)).await?);
    let worker = Arc::clone(&store);
    let (report, saved) = tokio::task::spawn_blocking(move || {
        let report = clean_store(&worker, audit.as_ref());
        worker.save().map(|saved| (report, saved))
    })
    .await
    .map_err(|err| CliError::new(format!("clean join failed: {err}")))?
    .map_err(|err| CliError::new(format!("failed to save store: {err}")))?;

    let mut lines = vec![format!(
        "examined {} packages, purged {}",
        report.examined,
        report.total_purged()
    )];
    for reason in [
        PurgeReason::DomainOnly,
        PurgeReason::Banned,
        PurgeReason::IncommensurateName,
        PurgeReason::DownloadFailed,
    ] {
        lines.push(format!("  {reason}: {}", report.purged_for(reason)));
    }
    lines.push(match saved {
        Some(path) => format!("saved {}", path.display()),
        None => "store unchanged".to_string(),
    });
    write_stdout_line(&lines.join("\n")).map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `tabulate` command.
async fn command_tabulate(
    config: &ModvetConfig,
    audit: Arc<dyn AuditSink>,
) -> CliResult<ExitCode> {
    let store = open_latest(&config.storage.data_dir, audit).await?;
    let tabulation = Tabulation::from_packages(store.all_packages());
    write_stdout_bytes(report::render(&tabulation).as_bytes())
        .map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `rescan` command.
async fn command_rescan(
    config: &ModvetConfig,
    audit: Arc<dyn AuditSink>,
    command: &RescanCommand,
) -> CliResult<ExitCode> {
    let store = match &command.snapshot {
        Some(path) => open_snapshot(path, Arc::clone(&audit)).await?,
        None => open_latest(&config.storage.data_dir, Arc::clone(&audit)).await?,
    };
    let requests: Vec<DispatchRequest> = store
        .all_packages()
        .filter(|package| command.mode.selects(package))
        .map(|package| DispatchRequest::for_package(&config.validator, &package.key))
        .collect();

    if !command.execute {
        let mut lines = Vec::with_capacity(requests.len() * 3);
        for request in &requests {
            if command.mode == RescanMode::BuildFailed {
                lines.push(format!("# {}", request.package()));
            }
            lines.push(request.shell_line());
            lines.push("sleep 30".to_string());
        }
        if !lines.is_empty() {
            write_stdout_line(&lines.join("\n"))
                .map_err(|err| CliError::new(output_error(&err)))?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let queue = DispatchQueue::new(
        config.validator.clone(),
        config.dispatch,
        Arc::new(ProcessRunner),
        audit,
    )
    .map_err(|err| CliError::new(format!("failed to start dispatch queue: {err}")))?;
    let mut dispatched = 0_usize;
    for request in &requests {
        if let Err(err) = queue.enqueue(&request.module, &request.version).await {
            queue.shutdown().await;
            return Err(CliError::new(format!("failed to queue {}: {err}", request.package())));
        }
        dispatched += 1;
    }
    queue.shutdown().await;
    write_stdout_line(&format!("dispatched {dispatched} packages"))
        .map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Opens the store in `dir` and loads its latest snapshot, if any.
async fn open_latest(dir: &Path, audit: Arc<dyn AuditSink>) -> CliResult<PackageStore> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let store = PackageStore::open(&dir, audit)
            .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
        store
            .load_latest()
            .map_err(|err| CliError::new(format!("failed to load latest snapshot: {err}")))?;
        Ok(store)
    })
    .await
    .map_err(|err| CliError::new(format!("load join failed: {err}")))?
}

/// Opens a store over the directory holding `path` and loads that file.
async fn open_snapshot(path: &Path, audit: Arc<dyn AuditSink>) -> CliResult<PackageStore> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let store = PackageStore::open(dir, audit)
            .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
        store.load(&path).map_err(|err| {
            CliError::new(format!("failed to load snapshot {}: {err}", path.display()))
        })?;
        Ok(store)
    })
    .await
    .map_err(|err| CliError::new(format!("load join failed: {err}")))?
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(config: &ModvetConfig, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => command_config_validate(config),
    }
}

/// Executes the config validation command.
fn command_config_validate(config: &ModvetConfig) -> CliResult<ExitCode> {
    let message = match &config.source {
        Some(path) => format!("config ok: {}", path.display()),
        None => "config ok: built-in defaults".to_string(),
    };
    write_stdout_line(&message).map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a stdout write failure.
fn output_error(error: &std::io::Error) -> String {
    format!("failed to write to stdout: {error}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
