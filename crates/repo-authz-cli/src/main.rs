// crates/repo-authz-cli/src/main.rs
// ============================================================================
// Module: Repo Authz CLI Entry Point
// Description: Command dispatcher for repository visibility tooling.
// Purpose: Validate config, explain decisions, list repos, and seed the store.
// Dependencies: clap, repo-authz-config, repo-authz-core,
//               repo-authz-store-sqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `repo-authz` runs the decision engine against a configured `SQLite` store.
//! Every command loads and validates configuration first, so a rejected
//! config never reaches the engine. Input files are read with hard size
//! limits and parsed strictly.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;
mod seed;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use repo_authz_config::RepoAuthzConfig;
use repo_authz_core::AccessDecisionEngine;
use repo_authz_core::Actor;
use repo_authz_core::AuthzState;
use repo_authz_core::ExternalServiceId;
use repo_authz_core::OrgId;
use repo_authz_core::PermissionRecord;
use repo_authz_core::PermissionStore;
use repo_authz_core::RepoId;
use repo_authz_core::RepoLister;
use repo_authz_core::RepoPage;
use repo_authz_core::ReposListOptions;
use repo_authz_core::Timestamp;
use repo_authz_core::UserId;
use repo_authz_store_sqlite::SqliteAuthzStore;
use serde::Serialize;
use thiserror::Error;

use crate::seed::SeedDocument;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a seed document in bytes.
const MAX_SEED_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "repo-authz", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show the visibility decision for an actor.
    Explain(ExplainCommand),
    /// Repository listing utilities.
    Repos {
        /// Selected repos subcommand.
        #[command(subcommand)]
        command: ReposCommand,
    },
    /// Explicit permission administration.
    Permissions {
        /// Selected permissions subcommand.
        #[command(subcommand)]
        command: PermissionsCommand,
    },
    /// Store administration utilities.
    Store {
        /// Selected store subcommand.
        #[command(subcommand)]
        command: StoreCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Validate(ConfigArgs),
}

/// Repos subcommands.
#[derive(Subcommand, Debug)]
enum ReposCommand {
    /// List repositories visible to an actor.
    List(ReposListCommand),
}

/// Permissions subcommands.
#[derive(Subcommand, Debug)]
enum PermissionsCommand {
    /// Replace the repositories a user can read.
    Set(PermissionsSetCommand),
}

/// Store subcommands.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Import users, services, repositories, and permissions from JSON.
    Import(StoreImportCommand),
}

/// Config file selection shared by all commands.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Config file path (defaults to `REPO_AUTHZ_CONFIG`, then `repo-authz.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Actor selection shared by decision commands.
#[derive(Args, Debug, Clone)]
struct ActorArgs {
    /// Kind of caller.
    #[arg(long, value_enum, default_value_t = ActorArg::User)]
    actor: ActorArg,
    /// User id for `--actor user`.
    #[arg(long, value_name = "ID")]
    user_id: Option<u64>,
}

/// Actor kinds accepted on the command line.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum ActorArg {
    /// Trusted internal caller.
    Internal,
    /// Unauthenticated caller.
    Anonymous,
    /// Authenticated user (requires `--user-id`).
    User,
}

/// Output formats.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON.
    Json,
}

/// Arguments for `explain`.
#[derive(Args, Debug)]
struct ExplainCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Actor selection.
    #[command(flatten)]
    actor: ActorArgs,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `repos list`.
#[derive(Args, Debug)]
struct ReposListCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Actor selection.
    #[command(flatten)]
    actor: ActorArgs,
    /// Only repositories whose name contains this text.
    #[arg(long, value_name = "TEXT")]
    name_contains: Option<String>,
    /// Only repositories added by a service owned by this organization.
    #[arg(long, value_name = "ID")]
    org_id: Option<u64>,
    /// Only repositories added by a service owned by this user.
    #[arg(long, value_name = "ID")]
    owner_user_id: Option<u64>,
    /// Only repositories added by this external service.
    #[arg(long, value_name = "ID")]
    external_service_id: Option<u64>,
    /// Maximum number of repositories to return.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
    /// Number of visible repositories to skip.
    #[arg(long, value_name = "N", default_value_t = 0)]
    offset: usize,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `permissions set`.
#[derive(Args, Debug)]
struct PermissionsSetCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// User whose permissions are replaced.
    #[arg(long, value_name = "ID")]
    user_id: u64,
    /// Comma-separated readable repository ids (empty clears the set).
    #[arg(long, value_name = "IDS", value_delimiter = ',', num_args = 0..)]
    repo_ids: Vec<u64>,
}

/// Arguments for `store import`.
#[derive(Args, Debug)]
struct StoreImportCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Seed document path.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
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

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("repo-authz {version}"))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Config {
            command,
        } => command_config(&command),
        Commands::Explain(command) => command_explain(&command),
        Commands::Repos {
            command,
        } => command_repos(&command),
        Commands::Permissions {
            command,
        } => command_permissions(&command),
        Commands::Store {
            command,
        } => command_store(&command),
    }
}

/// Prints the top-level help text.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| output_error(&err))?;
    write_stdout_line("")
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => {
            let config = load_config(args)?;
            write_stdout_line(&format!(
                "config ok: {} provider(s), permissions user mapping {}",
                config.providers.len(),
                if config.permissions_user_mapping.enabled { "enabled" } else { "disabled" }
            ))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Decision Commands
// ============================================================================

/// Runtime assembled from a validated config.
struct Runtime {
    /// Store shared by the engine and the lister.
    store: SqliteAuthzStore,
    /// Decision engine.
    engine: AccessDecisionEngine<SqliteAuthzStore, SqliteAuthzStore>,
}

impl Runtime {
    /// Loads config, opens the store, and publishes policy into a fresh state.
    fn open(args: &ConfigArgs) -> CliResult<Self> {
        let config = load_config(args)?;
        let state = Arc::new(AuthzState::default());
        config
            .apply(&state)
            .map_err(|err| CliError::new(format!("failed to apply config: {err}")))?;
        let audit = config
            .audit
            .build_sink()
            .map_err(|err| CliError::new(format!("failed to open audit sink: {err}")))?;
        let store = open_store(&config)?;
        let engine =
            AccessDecisionEngine::new(state, store.clone(), store.clone()).with_audit(audit);
        Ok(Self {
            store,
            engine,
        })
    }
}

/// Executes `explain`.
fn command_explain(command: &ExplainCommand) -> CliResult<ExitCode> {
    let actor = resolve_actor(&command.actor)?;
    let runtime = Runtime::open(&command.config)?;
    let decision = runtime
        .engine
        .explain(&actor)
        .map_err(|err| CliError::new(format!("decision failed: {err}")))?;
    match command.format {
        OutputFormat::Json => write_json(&decision)?,
        OutputFormat::Text => {
            write_stdout_line(&format!("branch: {}", decision.branch.as_str()))?;
            write_stdout_line(&format!("condition: {}", decision.condition))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Dispatches repos subcommands.
fn command_repos(command: &ReposCommand) -> CliResult<ExitCode> {
    match command {
        ReposCommand::List(command) => command_repos_list(command),
    }
}

/// Executes `repos list`.
fn command_repos_list(command: &ReposListCommand) -> CliResult<ExitCode> {
    let actor = resolve_actor(&command.actor)?;
    let options = list_options(command)?;
    let runtime = Runtime::open(&command.config)?;
    let lister = RepoLister::new(runtime.engine, runtime.store);
    let page = lister
        .list(&actor, &options)
        .map_err(|err| CliError::new(format!("listing failed: {err}")))?;
    match command.format {
        OutputFormat::Json => write_json(&page)?,
        OutputFormat::Text => write_page_text(&page)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds listing options from command arguments.
fn list_options(command: &ReposListCommand) -> CliResult<ReposListOptions> {
    Ok(ReposListOptions {
        name_contains: command.name_contains.clone(),
        org_id: command.org_id.map(|raw| parse_id(raw, OrgId::from_raw, "org id")).transpose()?,
        user_id: command
            .owner_user_id
            .map(|raw| parse_id(raw, UserId::from_raw, "user id"))
            .transpose()?,
        external_service_id: command
            .external_service_id
            .map(|raw| parse_id(raw, ExternalServiceId::from_raw, "external service id"))
            .transpose()?,
        limit: command.limit,
        offset: command.offset,
    })
}

/// Writes a listing page as text.
fn write_page_text(page: &RepoPage) -> CliResult<()> {
    for repo in &page.repos {
        let visibility = if repo.private { "private" } else { "public" };
        write_stdout_line(&format!("{}\t{}\t{visibility}", repo.id, repo.name))?;
    }
    write_stdout_line(&format!("total: {}", page.total_count))
}

// ============================================================================
// SECTION: Administration Commands
// ============================================================================

/// Dispatches permissions subcommands.
fn command_permissions(command: &PermissionsCommand) -> CliResult<ExitCode> {
    match command {
        PermissionsCommand::Set(command) => {
            let config = load_config(&command.config)?;
            let store = open_store(&config)?;
            let user_id = parse_id(command.user_id, UserId::from_raw, "user id")?;
            let repo_ids = command
                .repo_ids
                .iter()
                .map(|raw| parse_id(*raw, RepoId::from_raw, "repo id"))
                .collect::<CliResult<BTreeSet<_>>>()?;
            let count = repo_ids.len();
            let record = PermissionRecord::repo_read(user_id, repo_ids, Timestamp::now());
            store
                .upsert_user_permissions(&record)
                .map_err(|err| CliError::new(format!("failed to write permissions: {err}")))?;
            write_stdout_line(&format!(
                "user {user_id} can now read {count} repository(ies) explicitly"
            ))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Dispatches store subcommands.
fn command_store(command: &StoreCommand) -> CliResult<ExitCode> {
    match command {
        StoreCommand::Import(command) => {
            let config = load_config(&command.config)?;
            let store = open_store(&config)?;
            let document = read_seed(&command.file)?;
            let summary = document
                .import(&store, Timestamp::now())
                .map_err(|err| CliError::new(format!("import failed: {err}")))?;
            write_stdout_line(&format!(
                "imported {} user(s), {} service(s), {} repo(s), {} permission set(s)",
                summary.users, summary.external_services, summary.repos, summary.permissions
            ))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<RepoAuthzConfig> {
    RepoAuthzConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Opens the configured store.
fn open_store(config: &RepoAuthzConfig) -> CliResult<SqliteAuthzStore> {
    SqliteAuthzStore::new(&config.store.sqlite_config())
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))
}

/// Resolves the actor from command arguments.
fn resolve_actor(args: &ActorArgs) -> CliResult<Actor> {
    match (args.actor, args.user_id) {
        (ActorArg::Internal, None) => Ok(Actor::internal()),
        (ActorArg::Anonymous, None) => Ok(Actor::anonymous()),
        (ActorArg::User, Some(raw)) => Ok(Actor::user(parse_id(raw, UserId::from_raw, "user id")?)),
        (ActorArg::User, None) => {
            Err(CliError::new("--actor user requires --user-id".to_string()))
        }
        (ActorArg::Internal | ActorArg::Anonymous, Some(_)) => {
            Err(CliError::new("--user-id is only valid with --actor user".to_string()))
        }
    }
}

/// Converts a raw command-line id into a typed identifier.
fn parse_id<T>(raw: u64, build: fn(u64) -> Option<T>, label: &str) -> CliResult<T> {
    build(raw).ok_or_else(|| CliError::new(format!("{label} must be greater than zero")))
}

/// Reads and parses a seed document.
fn read_seed(path: &Path) -> CliResult<SeedDocument> {
    let bytes = read_bytes_with_limit(path, MAX_SEED_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{} is too large: {size} bytes (limit {limit})",
            path.display()
        )),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid seed document: {err}")))
}

/// Reads a file while enforcing a maximum size.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Writes pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&text)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| output_error(&err))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an stdout write failure.
fn output_error(error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write to stdout: {error}"))
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
