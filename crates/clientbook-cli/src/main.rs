// crates/clientbook-cli/src/main.rs
// ============================================================================
// Module: Clientbook CLI Entry Point
// Description: Command dispatcher for column and client management.
// Purpose: Provide a localized CLI over the clientbook stores.
// Dependencies: clap, clientbook-cli, clientbook-config, clientbook-core,
//               clientbook-store-sqlite, serde, serde_json, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The clientbook CLI loads `clientbook.toml`, assembles the stores it names,
//! and runs one command per invocation: column (schema) management, client
//! record management with search, CSV export and import, and config
//! validation. User-facing strings are routed through the i18n catalog and
//! every command can render JSON instead of text.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
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
use clientbook_cli::csv;
use clientbook_cli::i18n::Locale;
use clientbook_cli::i18n::set_locale;
use clientbook_cli::t;
use clientbook_cli::telemetry;
use clientbook_config::ClientbookConfig;
use clientbook_config::SchemaSourceMode;
use clientbook_config::StoreConfig;
use clientbook_config::StoreType;
use clientbook_core::Clientbook;
use clientbook_core::ClientbookParts;
use clientbook_core::FieldDefinition;
use clientbook_core::FieldDraft;
use clientbook_core::FieldKey;
use clientbook_core::FieldMetadataBackend;
use clientbook_core::FieldValues;
use clientbook_core::FileCache;
use clientbook_core::InMemoryCache;
use clientbook_core::InMemoryRemote;
use clientbook_core::LocalCache;
use clientbook_core::LocalRecordBackend;
use clientbook_core::OrphanPolicy;
use clientbook_core::Record;
use clientbook_core::RecordBackend;
use clientbook_core::RecordId;
use clientbook_core::SchemaLoad;
use clientbook_core::SearchState;
use clientbook_core::TableStructureBackend;
use clientbook_store_sqlite::SqliteClientStore;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a CSV file accepted by `clients import`.
const MAX_IMPORT_BYTES: u64 = 16 * 1024 * 1024;
/// Environment variable selecting the output language.
const LANG_ENV: &str = "CLIENTBOOK_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "clientbook", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `CLIENTBOOK_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Config file path (overrides `CLIENTBOOK_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Render command results as JSON.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    json: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the client columns (schema).
    Columns {
        /// Selected columns subcommand.
        #[command(subcommand)]
        command: ColumnsCommand,
    },
    /// Manage client records.
    Clients {
        /// Selected clients subcommand.
        #[command(subcommand)]
        command: ClientsCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Column subcommands.
#[derive(Subcommand, Debug)]
enum ColumnsCommand {
    /// List columns in display order.
    List,
    /// Add a column.
    Add(ColumnAddCommand),
    /// Edit or rename a column.
    Edit(ColumnEditCommand),
    /// Remove a column.
    Remove(ColumnRemoveCommand),
    /// Create missing physical columns for every field.
    Sync,
}

/// Client subcommands.
#[derive(Subcommand, Debug)]
enum ClientsCommand {
    /// List clients, optionally filtered.
    List(ClientListCommand),
    /// Create a client.
    Add(ClientAddCommand),
    /// Change values of a client.
    Edit(ClientEditCommand),
    /// Delete a client.
    Delete(ClientIdArgs),
    /// Copy a client under a new id.
    Duplicate(ClientIdArgs),
    /// Export clients as CSV.
    Export(ClientExportCommand),
    /// Import clients from CSV.
    Import(ClientImportCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the config file.
    Validate,
}

/// Arguments for `columns add`.
#[derive(Args, Debug)]
struct ColumnAddCommand {
    /// Column label.
    label: String,
    /// Display order (defaults to the next free position).
    #[arg(long)]
    order: Option<i64>,
    /// Comma-separated choice options.
    #[arg(long)]
    options: Option<String>,
}

/// Arguments for `columns edit`.
#[derive(Args, Debug)]
struct ColumnEditCommand {
    /// Key of the column to edit.
    key: String,
    /// New label; a label deriving a different key renames the column.
    #[arg(long)]
    label: Option<String>,
    /// New display order.
    #[arg(long)]
    order: Option<i64>,
    /// New comma-separated choice options.
    #[arg(long, conflicts_with = "clear_options")]
    options: Option<String>,
    /// Turn the column back into free text.
    #[arg(long, action = ArgAction::SetTrue)]
    clear_options: bool,
}

/// Arguments for `columns remove`.
#[derive(Args, Debug)]
struct ColumnRemoveCommand {
    /// Key of the column to remove.
    key: String,
    /// Also erase the column's values from every client.
    #[arg(long, action = ArgAction::SetTrue)]
    clear_values: bool,
}

/// Arguments for `clients list`.
#[derive(Args, Debug)]
struct ClientListCommand {
    /// Case-insensitive search text.
    #[arg(long, short = 'q')]
    query: Option<String>,
    /// Restrict the search to this column (repeatable).
    #[arg(long = "field", value_name = "KEY")]
    fields: Vec<String>,
}

/// Arguments for `clients add`.
#[derive(Args, Debug)]
struct ClientAddCommand {
    /// Value assignment `key=value` (repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE")]
    assignments: Vec<String>,
}

/// Arguments for `clients edit`.
#[derive(Args, Debug)]
struct ClientEditCommand {
    /// Client id.
    id: String,
    /// Value assignment `key=value`; `key=` clears the value (repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE")]
    assignments: Vec<String>,
}

/// Arguments naming a single client.
#[derive(Args, Debug)]
struct ClientIdArgs {
    /// Client id.
    id: String,
}

/// Arguments for `clients export`.
#[derive(Args, Debug)]
struct ClientExportCommand {
    /// Output file; stdout when omitted.
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Arguments for `clients import`.
#[derive(Args, Debug)]
struct ClientImportCommand {
    /// CSV file to import.
    path: PathBuf,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Italian.
    It,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::It => Self::It,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
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
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = ClientbookConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    telemetry::init(&config.logging)
        .map_err(|err| CliError::new(t!("telemetry.init_failed", error = err)))?;
    let output = Output {
        json: cli.json,
    };

    match command {
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(&config, output),
        Commands::Columns {
            command,
        } => {
            let (clientbook, load) = open_clientbook(&config).await?;
            command_columns(clientbook, &load, command, output).await
        }
        Commands::Clients {
            command,
        } => {
            let (clientbook, _) = open_clientbook(&config).await?;
            command_clients(clientbook, command, output).await
        }
    }
}

/// Prints the top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Remote backends shared by one store instance.
struct RemoteHandles {
    /// Records table access.
    records: Arc<dyn RecordBackend>,
    /// Field metadata rows.
    metadata: Arc<dyn FieldMetadataBackend>,
    /// Physical table structure.
    structure: Arc<dyn TableStructureBackend>,
}

/// Opens the configured remote store.
async fn open_remote(store: &StoreConfig) -> CliResult<RemoteHandles> {
    match store.store_type {
        StoreType::Memory => {
            let remote = Arc::new(InMemoryRemote::with_table(store.table.clone(), &[]));
            Ok(RemoteHandles {
                records: remote.clone(),
                metadata: remote.clone(),
                structure: remote,
            })
        }
        StoreType::Sqlite => {
            let sqlite_config = store.sqlite_config();
            let path = sqlite_config.path.clone();
            let opened = tokio::task::spawn_blocking(move || SqliteClientStore::new(sqlite_config))
                .await
                .map_err(|err| {
                    CliError::new(t!(
                        "store.open_failed",
                        path = path.display(),
                        error = format!("open join failed: {err}")
                    ))
                })?
                .map_err(|err| {
                    CliError::new(t!("store.open_failed", path = path.display(), error = err))
                })?;
            let shared = Arc::new(opened);
            Ok(RemoteHandles {
                records: shared.clone(),
                metadata: shared.clone(),
                structure: shared,
            })
        }
    }
}

/// Builds the clientbook collaborators named by the config.
///
/// `metadata_table` wires the store as records, metadata, and structure;
/// `structure` leaves out the metadata rows; `local_only` keeps records in
/// the cache directory and never touches the store. The memory store lives
/// for one process, so it is paired with a memory cache.
async fn assemble_parts(config: &ClientbookConfig) -> CliResult<ClientbookParts> {
    let file_cache =
        || -> Arc<dyn LocalCache> { Arc::new(FileCache::new(config.cache.path.clone())) };
    let mut parts = match config.schema.source {
        SchemaSourceMode::LocalOnly => {
            let cache = file_cache();
            let records = Arc::new(LocalRecordBackend::new(Arc::clone(&cache)));
            ClientbookParts::new(cache, records)
        }
        mode => {
            let cache: Arc<dyn LocalCache> = match config.store.store_type {
                StoreType::Memory => Arc::new(InMemoryCache::new()),
                StoreType::Sqlite => file_cache(),
            };
            let remote = open_remote(&config.store).await?;
            let mut parts = ClientbookParts::new(cache, remote.records);
            parts.structure = Some(remote.structure);
            if mode == SchemaSourceMode::MetadataTable {
                parts.metadata = Some(remote.metadata);
            }
            parts
        }
    };
    parts.table.clone_from(&config.store.table);
    parts.primary_field = config.records.primary_field.as_deref().map(FieldKey::from);
    parts.duplicate_marker = Some(config.records.duplicate_marker.clone());
    Ok(parts)
}

/// Assembles and opens the clientbook.
async fn open_clientbook(config: &ClientbookConfig) -> CliResult<(Clientbook, SchemaLoad)> {
    let parts = assemble_parts(config).await?;
    let (clientbook, load) = Clientbook::open(parts)
        .await
        .map_err(|err| CliError::new(t!("clientbook.open_failed", error = err)))?;
    tracing::debug!(
        origin = load.origin.as_str(),
        fields = load.fields.len(),
        cached = load.cached,
        "clientbook opened"
    );
    if let Some(report) = &load.seed_report
        && !report.is_complete()
    {
        write_stderr_line(&t!("schema.seed.partial", count = report.failed.len()))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok((clientbook, load))
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes `config validate`; loading already validated the file.
fn command_config_validate(config: &ClientbookConfig, output: Output) -> CliResult<ExitCode> {
    let source = config.source.as_ref().map_or_else(
        || t!("config.source.defaults"),
        |path| path.display().to_string(),
    );
    output.emit(config, &[t!("config.validate.ok", source = source)])?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Column Commands
// ============================================================================

/// JSON view of `columns list`.
#[derive(Serialize)]
struct ColumnsView<'a> {
    /// Where the schema came from.
    origin: &'static str,
    /// Fields in display order.
    fields: &'a [FieldDefinition],
}

/// JSON view of `columns remove`.
#[derive(Serialize)]
struct RemovalView<'a> {
    /// Removed field.
    field: &'a FieldDefinition,
    /// Whether the physical column was dropped.
    column_dropped: bool,
    /// Number of clients whose value was cleared by rewriting them.
    cleared: usize,
}

/// Dispatches column subcommands.
async fn command_columns(
    mut clientbook: Clientbook,
    load: &SchemaLoad,
    command: ColumnsCommand,
    output: Output,
) -> CliResult<ExitCode> {
    match command {
        ColumnsCommand::List => {
            let fields = clientbook.fields();
            let mut lines: Vec<String> = fields.iter().map(render_field_row).collect();
            if lines.is_empty() {
                lines.push(t!("columns.list.empty"));
            }
            lines.push(t!("schema.loaded", origin = load.origin.as_str(), count = fields.len()));
            let view = ColumnsView {
                origin: load.origin.as_str(),
                fields,
            };
            output.emit(&view, &lines)?;
        }
        ColumnsCommand::Add(command) => {
            let mut draft = FieldDraft::new(command.label);
            if let Some(order) = command.order {
                draft = draft.with_order(order);
            }
            if let Some(options) = command.options.as_deref() {
                draft = draft.with_options(FieldDraft::parse_options(options));
            }
            let field = clientbook
                .add_field(&draft)
                .await
                .map_err(|err| CliError::new(t!("columns.add.failed", error = err)))?;
            let line = t!("columns.add.ok", label = field.label, key = field.key);
            output.emit(&field, &[line])?;
        }
        ColumnsCommand::Edit(command) => {
            let key = FieldKey::new(command.key);
            let Some(current) = clientbook.schema().field(&key) else {
                return Err(CliError::new(t!("columns.edit.unknown", key = key)));
            };
            let mut draft = FieldDraft::from_field(current);
            if let Some(label) = command.label {
                draft.label = label;
            }
            if let Some(order) = command.order {
                draft = draft.with_order(order);
            }
            if let Some(options) = command.options.as_deref() {
                draft = draft.with_options(FieldDraft::parse_options(options));
            } else if command.clear_options {
                draft = draft.with_options(Vec::new());
            }
            let update = clientbook
                .update_field(&key, &draft)
                .await
                .map_err(|err| CliError::new(t!("columns.edit.failed", key = key, error = err)))?;
            let line = match &update.renamed_from {
                Some(from) => t!("columns.edit.renamed", from = from, key = update.field.key),
                None => t!("columns.edit.ok", key = update.field.key),
            };
            output.emit(&update, &[line])?;
        }
        ColumnsCommand::Remove(command) => {
            let key = FieldKey::new(command.key);
            let policy =
                if command.clear_values { OrphanPolicy::Clear } else { OrphanPolicy::Retain };
            let (removal, cleared) =
                clientbook.remove_field(&key, policy).await.map_err(|err| {
                    CliError::new(t!("columns.remove.failed", key = key, error = err))
                })?;
            let mut lines = vec![t!("columns.remove.ok", key = removal.field.key)];
            if removal.column_dropped {
                lines.push(t!("columns.remove.dropped", key = removal.field.key));
            }
            if cleared > 0 {
                lines.push(t!("columns.remove.cleared", count = cleared));
            }
            let view = RemovalView {
                field: &removal.field,
                column_dropped: removal.column_dropped,
                cleared,
            };
            output.emit(&view, &lines)?;
        }
        ColumnsCommand::Sync => {
            let report = clientbook
                .synchronize()
                .await
                .map_err(|err| CliError::new(t!("columns.sync.failed", error = err)))?;
            let mut lines = vec![t!(
                "columns.sync.ok",
                added = report.added.len(),
                present = report.already_present.len(),
                skipped = report.skipped_reserved.len()
            )];
            lines.extend(report.failed.iter().map(|failure| {
                t!("columns.sync.field_failed", key = failure.key, error = failure.error)
            }));
            output.emit(&report, &lines)?;
            if !report.is_complete() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Renders one field as a text row.
fn render_field_row(field: &FieldDefinition) -> String {
    let options = if field.options.is_empty() {
        t!("columns.list.no_options")
    } else {
        field.options.join(", ")
    };
    t!(
        "columns.list.row",
        order = field.order,
        key = field.key,
        label = field.label,
        options = options
    )
}

// ============================================================================
// SECTION: Client Commands
// ============================================================================

/// JSON view of `clients list`.
#[derive(Serialize)]
struct ClientsView<'a> {
    /// Number of loaded clients before filtering.
    total: usize,
    /// Clients matching the search.
    records: Vec<&'a Record>,
}

/// JSON view of `clients duplicate`.
#[derive(Serialize)]
struct DuplicateView<'a> {
    /// Id of the copied client.
    source: &'a RecordId,
    /// The new client.
    record: &'a Record,
}

/// JSON view of `clients export` to a file and `clients import`.
#[derive(Serialize)]
struct TransferView<'a> {
    /// File written or read.
    path: &'a Path,
    /// Number of clients transferred.
    count: usize,
    /// Header columns dropped on import.
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    ignored: &'a [String],
}

/// Dispatches client subcommands.
async fn command_clients(
    mut clientbook: Clientbook,
    command: ClientsCommand,
    output: Output,
) -> CliResult<ExitCode> {
    match command {
        ClientsCommand::List(command) => {
            let state = search_state(&command, clientbook.fields())?;
            let matches = clientbook.search(&state);
            let total = clientbook.records().len();
            let mut lines: Vec<String> = matches
                .iter()
                .map(|record| {
                    t!(
                        "clients.list.row",
                        id = record.id,
                        summary = summarize(record, clientbook.fields())
                    )
                })
                .collect();
            if lines.is_empty() {
                lines.push(t!("clients.list.empty"));
            }
            lines.push(t!("clients.list.count", shown = matches.len(), total = total));
            let view = ClientsView {
                total,
                records: matches,
            };
            output.emit(&view, &lines)?;
        }
        ClientsCommand::Add(command) => {
            let mut values = FieldValues::new();
            apply_assignments(&mut values, &command.assignments, clientbook.fields())?;
            let record = clientbook
                .create_record(values)
                .await
                .map_err(|err| CliError::new(t!("clients.add.failed", error = err)))?;
            output.emit(&record, &[t!("clients.add.ok", id = record.id)])?;
        }
        ClientsCommand::Edit(command) => {
            let id = RecordId::new(command.id);
            let Some(current) = clientbook.record(&id) else {
                return Err(CliError::new(t!("clients.not_found", id = id)));
            };
            let mut values = current.values.clone();
            apply_assignments(&mut values, &command.assignments, clientbook.fields())?;
            let record = clientbook
                .update_record(&id, values)
                .await
                .map_err(|err| CliError::new(t!("clients.edit.failed", id = id, error = err)))?;
            output.emit(&record, &[t!("clients.edit.ok", id = record.id)])?;
        }
        ClientsCommand::Delete(command) => {
            let id = RecordId::new(command.id);
            clientbook
                .delete_record(&id)
                .await
                .map_err(|err| CliError::new(t!("clients.delete.failed", id = id, error = err)))?;
            output.emit(&id, &[t!("clients.delete.ok", id = id)])?;
        }
        ClientsCommand::Duplicate(command) => {
            let id = RecordId::new(command.id);
            let copy = clientbook.duplicate_record(&id).await.map_err(|err| {
                CliError::new(t!("clients.duplicate.failed", id = id, error = err))
            })?;
            let view = DuplicateView {
                source: &id,
                record: &copy,
            };
            output.emit(&view, &[t!("clients.duplicate.ok", source = id, id = copy.id)])?;
        }
        ClientsCommand::Export(command) => {
            let text = csv::export_records(clientbook.fields(), clientbook.records());
            let Some(path) = command.output else {
                write_stdout_line(&text)
                    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
                return Ok(ExitCode::SUCCESS);
            };
            fs::write(&path, text.as_bytes()).map_err(|err| {
                CliError::new(t!("output.file_write_failed", path = path.display(), error = err))
            })?;
            let count = clientbook.records().len();
            let view = TransferView {
                path: &path,
                count,
                ignored: &[],
            };
            output.emit(&view, &[t!("clients.export.ok", count = count, path = path.display())])?;
        }
        ClientsCommand::Import(command) => {
            let text = read_import_file(&command.path)?;
            let table = csv::parse(&text).map_err(|err| {
                CliError::new(t!(
                    "clients.import.parse_failed",
                    path = command.path.display(),
                    error = err
                ))
            })?;
            let plan = csv::plan_import(&table, clientbook.fields());
            let mut count = 0usize;
            for values in plan.rows {
                clientbook.create_record(values).await.map_err(|err| {
                    CliError::new(t!("clients.import.failed", count = count, error = err))
                })?;
                count += 1;
            }
            let mut lines = Vec::new();
            if !plan.ignored.is_empty() {
                lines.push(t!("clients.import.ignored", columns = plan.ignored.join(", ")));
            }
            lines.push(t!("clients.import.ok", count = count, path = command.path.display()));
            let view = TransferView {
                path: &command.path,
                count,
                ignored: &plan.ignored,
            };
            output.emit(&view, &lines)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds the search state for `clients list`.
fn search_state(command: &ClientListCommand, fields: &[FieldDefinition]) -> CliResult<SearchState> {
    let mut state = SearchState::new();
    if let Some(query) = &command.query {
        state.set_query(query.clone());
    }
    for name in &command.fields {
        let key = known_key(name, fields)?;
        if !state.selected().contains(&key) {
            state.toggle_field(&key);
        }
    }
    Ok(state)
}

/// Applies `key=value` assignments; an empty value removes the key.
fn apply_assignments(
    values: &mut FieldValues,
    assignments: &[String],
    fields: &[FieldDefinition],
) -> CliResult<()> {
    for assignment in assignments {
        let Some((name, value)) = assignment.split_once('=') else {
            return Err(CliError::new(t!("clients.values.invalid", value = assignment)));
        };
        let key = known_key(name, fields)?;
        if value.trim().is_empty() {
            values.remove(&key);
        } else {
            values.insert(key, value.to_string());
        }
    }
    Ok(())
}

/// Resolves a user-supplied column key against the schema.
fn known_key(name: &str, fields: &[FieldDefinition]) -> CliResult<FieldKey> {
    let name = name.trim();
    fields
        .iter()
        .find(|field| field.key.as_str() == name)
        .map(|field| field.key.clone())
        .ok_or_else(|| CliError::new(t!("clients.values.unknown_field", key = name)))
}

/// Joins a record's non-empty values as `label: value` pairs in schema order.
fn summarize(record: &Record, fields: &[FieldDefinition]) -> String {
    fields
        .iter()
        .filter(|field| record.has_value(&field.key))
        .map(|field| format!("{}: {}", field.label, record.value(&field.key)))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Reads an import file, refusing files above [`MAX_IMPORT_BYTES`].
fn read_import_file(path: &Path) -> CliResult<String> {
    let read_failed = |err: std::io::Error| {
        CliError::new(t!("input.read_failed", path = path.display(), error = err))
    };
    let size = fs::metadata(path).map_err(read_failed)?.len();
    if size > MAX_IMPORT_BYTES {
        return Err(CliError::new(t!(
            "input.read_too_large",
            path = path.display(),
            size = size,
            limit = MAX_IMPORT_BYTES
        )));
    }
    fs::read_to_string(path).map_err(read_failed)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Selected rendering for command results.
#[derive(Debug, Clone, Copy)]
struct Output {
    /// Render JSON instead of text lines.
    json: bool,
}

impl Output {
    /// Writes `value` as pretty JSON or `lines` as text.
    fn emit<T: Serialize + ?Sized>(self, value: &T, lines: &[String]) -> CliResult<()> {
        if self.json {
            let rendered = serde_json::to_string_pretty(value)
                .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
            return write_stdout_line(&rendered)
                .map_err(|err| CliError::new(output_error("stdout", &err)));
        }
        for line in lines {
            write_stdout_line(line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        Ok(())
    }
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
