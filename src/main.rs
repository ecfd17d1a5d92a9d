//! Purpose: `rowdb` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Mutating commands write the database back before exiting.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use rowdb::api::{
    Database, DirStorage, Error, ErrorKind, ForeignKey, LinkReport, LinkStatus, LocalClient, Table,
    to_exit_code,
};
use rowdb::notice::{Notice, link_notice, notice_json};

const DIR_ENV: &str = "ROWDB_DIR";

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let root = resolve_root(cli.dir);
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command, root, color_mode)
        .map_err(add_corrupt_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn resolve_root(dir: Option<PathBuf>) -> PathBuf {
    dir.or_else(|| {
        std::env::var_os(DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(DirStorage::default_root)
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let replacement = arg.to_str().and_then(|value| match value {
                "---help" => Some("--help"),
                "---version" => Some("--version"),
                _ => None,
            });
            replacement.map(OsString::from).unwrap_or(arg)
        })
        .collect()
}

#[derive(Parser)]
#[command(
    name = "rowdb",
    version,
    about = "File-backed tables with typed cells and foreign keys",
    long_about = None,
    after_help = r#"EXAMPLES
  $ rowdb db create shop
  $ rowdb table create shop Robot id year function
  $ rowdb table create shop Seller id price --fk Robot.id:id
  $ rowdb row add shop Robot i%1 i%2016 s%spaceExploration
  $ rowdb select function from Robot --db shop
  $ rowdb check shop

NOTES
  - Default location: ~/.rowdb/databases (override with --dir or ROWDB_DIR)
  - Cell tokens are <tag>%<value> with tags i (int), b (bool), s (string)"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Storage root for databases (default: $ROWDB_DIR or ~/.rowdb/databases)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(arg_required_else_help = true, about = "Manage databases")]
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    #[command(arg_required_else_help = true, about = "Manage tables in a database")]
    Table {
        #[command(subcommand)]
        command: TableCommand,
    },
    #[command(arg_required_else_help = true, about = "Add, delete or update rows")]
    Row {
        #[command(subcommand)]
        command: RowCommand,
    },
    #[command(
        about = "Print one column of a table: select <column> from <table> --db <db>",
        after_help = r#"EXAMPLES
  $ rowdb select year from Robot --db shop"#
    )]
    Select {
        #[arg(help = "Column to read")]
        column: String,
        #[arg(value_name = "from", help = "The literal word `from`")]
        from: String,
        #[arg(help = "Table to read from")]
        table: String,
        #[arg(long, help = "Database holding the table")]
        db: String,
    },
    #[command(about = "Report foreign-key resolution for every relationship")]
    Check {
        #[arg(help = "Database name")]
        db: String,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print version info")]
    Version,
}

#[derive(Subcommand)]
enum DbCommand {
    #[command(about = "List databases in the global index")]
    List,
    #[command(about = "Create an empty database")]
    Create { name: String },
    #[command(about = "Delete a database and all of its files")]
    Delete { name: String },
}

#[derive(Subcommand)]
enum TableCommand {
    #[command(about = "List tables and their columns")]
    List { db: String },
    #[command(
        about = "Create a table; the first column is the primary key",
        after_help = r#"EXAMPLES
  $ rowdb table create shop Robot id year function
  $ rowdb table create shop Seller id price --fk Robot.id:id"#
    )]
    Create(TableCreateArgs),
    #[command(about = "Drop a table and its file")]
    Drop { db: String, table: String },
    #[command(about = "Show a table's columns and rows")]
    View { db: String, table: String },
    #[command(about = "Show the value type of every cell")]
    Types { db: String, table: String },
}

#[derive(Args)]
struct TableCreateArgs {
    db: String,
    table: String,
    #[arg(required = true, num_args = 1.., help = "Column names, primary key first")]
    columns: Vec<String>,
    #[arg(
        long,
        value_name = "PT.PC:FKCOL",
        help = "Foreign key: column FKCOL references primary table PT column PC"
    )]
    fk: Option<String>,
}

#[derive(Subcommand)]
enum RowCommand {
    #[command(about = "Append a row of cell tokens (<tag>%<value> or plain strings)")]
    Add {
        db: String,
        table: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        values: Vec<String>,
    },
    #[command(about = "Delete the row with the given primary key")]
    Delete {
        db: String,
        table: String,
        key: String,
    },
    #[command(about = "Replace every value of a row; cells keep their types")]
    Update {
        db: String,
        table: String,
        key: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        values: Vec<String>,
    },
}

#[derive(Serialize)]
struct ForeignKeyJson<'a> {
    table: &'a str,
    column: &'a str,
    primary_table: &'a str,
    primary_column: &'a str,
}

impl<'a> ForeignKeyJson<'a> {
    fn new(table: &'a str, foreign_key: &'a ForeignKey) -> Self {
        Self {
            table,
            column: &foreign_key.foreign_key_column,
            primary_table: &foreign_key.primary_table,
            primary_column: &foreign_key.primary_column,
        }
    }
}

#[derive(Serialize)]
struct LinkJson<'a> {
    #[serde(flatten)]
    foreign_key: ForeignKeyJson<'a>,
    status: &'static str,
    message: String,
}

fn link_json(report: &LinkReport) -> LinkJson<'_> {
    let status = match report.status {
        LinkStatus::Linked { .. } => "linked",
        LinkStatus::MissingTarget { .. } => "missing_target",
        LinkStatus::PartialLink { .. } => "partial_link",
    };
    LinkJson {
        foreign_key: ForeignKeyJson::new(
            &report.relationship.table,
            &report.relationship.foreign_key,
        ),
        status,
        message: report.status.to_string(),
    }
}

fn table_json(table: &Table) -> Value {
    let rows: Vec<Vec<Option<&str>>> = table.rows().map(|row| row.values()).collect();
    json!({
        "table": table.name(),
        "columns": table.column_names(),
        "rows": rows,
        "foreign_key": table
            .foreign_key()
            .map(|fk| ForeignKeyJson::new(table.name(), fk)),
    })
}

fn table_types_json(table: &Table) -> Value {
    let rows: Vec<Value> = table
        .rows()
        .map(|row| {
            let types: Vec<&str> = row.types().into_iter().map(|t| t.as_str()).collect();
            json!({ "key": row.primary_key(), "types": types })
        })
        .collect();
    json!({
        "table": table.name(),
        "columns": table.column_names(),
        "rows": rows,
    })
}

fn emit_table_human(table: &Table) {
    println!("{}", table.name());
    println!("{}", table.column_names().join(" "));
    for row in table.rows() {
        println!("{}", row.render());
    }
}

/// Parses `PT.PC:FKCOL` into a foreign-key facet.
fn parse_foreign_key(input: &str) -> Result<ForeignKey, Error> {
    let parsed = input.split_once(':').and_then(|(target, column)| {
        let (table, primary) = target.split_once('.')?;
        let parts = [table, primary, column];
        if parts.iter().any(|part| part.is_empty()) {
            return None;
        }
        Some(ForeignKey::new(table, primary, column))
    });
    parsed.ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid foreign key {input:?}"))
            .with_hint("Use PRIMARY_TABLE.PRIMARY_COLUMN:FK_COLUMN, for example Robot.id:id.")
    })
}

fn require_table<'a>(db: &'a Database, table: &str) -> Result<&'a Table, Error> {
    db.table(table).ok_or_else(|| {
        Error::new(ErrorKind::NotFound)
            .with_message(format!("table {table:?} does not exist"))
            .with_table(table)
            .with_hint(format!("List tables with `rowdb table list {}`.", db.name()))
    })
}

/// Opens a database and reports any relationship the load could not link.
fn open_database(
    client: &LocalClient,
    name: &str,
    cmd: &str,
    color_mode: ColorMode,
) -> Result<Database, Error> {
    let db = client.open_database(name)?;
    emit_link_notices(&db, cmd, color_mode);
    Ok(db)
}

fn emit_link_notices(db: &Database, cmd: &str, color_mode: ColorMode) {
    for report in db.link_reports().iter().filter(|report| !report.is_linked()) {
        let time = notice_time_now().unwrap_or_default();
        emit_notice(&link_notice(report, cmd, db.name(), time), color_mode);
    }
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => err.with_hint(
            "Permission denied. Check directory permissions or use --dir to a writable location.",
        ),
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        _ => err,
    }
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Corrupt || err.hint().is_some() {
        return err;
    }
    err.with_hint("Database files look damaged. Inspect the table files or FKIndex.txt.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share command/context if it persists.",
    )
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("rowdb {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "rowdb",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} (database: {})", notice.message, notice.database);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::AlreadyExists => "already exists".to_string(),
        ErrorKind::TypeMismatch => "type mismatch".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(table) = err.table() {
        inner.insert("table".to_string(), json!(table));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(table) = err.table() {
        lines.push(format!(
            "{} {table}",
            colorize_label("table:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `rowdb --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "rowdb") else {
        return "Try `rowdb --help`.".to_string();
    };

    let mut parts = Vec::new();
    for token in tokens.iter().skip(pos + 1) {
        if token.starts_with('-') || token.starts_with('<') || token.starts_with('[') {
            break;
        }
        parts.push(*token);
    }

    if parts.is_empty() {
        return "Try `rowdb --help`.".to_string();
    }
    format!("Try `rowdb {} --help`.", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::{Cli, error_json, parse_foreign_key, resolve_root};
    use clap::CommandFactory;
    use rowdb::api::{Error, ErrorKind};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn foreign_key_flag_parses() {
        let fk = parse_foreign_key("Robot.id:robot").expect("fk");
        assert_eq!(fk.primary_table, "Robot");
        assert_eq!(fk.primary_column, "id");
        assert_eq!(fk.foreign_key_column, "robot");

        for bad in ["Robot:id", "Robot.id", ".id:id", "Robot.:id", "Robot.id:"] {
            let err = parse_foreign_key(bad).expect_err(bad);
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
    }

    #[test]
    fn explicit_dir_wins() {
        let dir = PathBuf::from("/tmp/somewhere");
        assert_eq!(resolve_root(Some(dir.clone())), dir);
    }

    #[test]
    fn error_json_carries_table_and_hint() {
        let err = Error::new(ErrorKind::NotFound)
            .with_message("table \"Ghost\" does not exist")
            .with_table("Ghost")
            .with_hint("List tables first.");
        let value = error_json(&err);
        let inner = value.get("error").expect("error object");
        assert_eq!(inner.get("kind").and_then(|v| v.as_str()), Some("NotFound"));
        assert_eq!(inner.get("table").and_then(|v| v.as_str()), Some("Ghost"));
        assert_eq!(
            inner.get("hint").and_then(|v| v.as_str()),
            Some("List tables first.")
        );
    }
}
