//! Purpose: Hold top-level CLI command dispatch for `rowdb`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command that changes a database calls `Database::write` before returning.
//! Invariants: Helpers in `main.rs` remain the source of output formatting.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    root: PathBuf,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    let client = LocalClient::new().with_root(root);
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "rowdb", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Db { command } => dispatch_db(command, &client),
        Command::Table { command } => dispatch_table(command, &client, color_mode),
        Command::Row { command } => dispatch_row(command, &client, color_mode),
        Command::Select {
            column,
            from,
            table,
            db,
        } => {
            if !from.eq_ignore_ascii_case("from") {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("expected `from`, found {from:?}"))
                    .with_hint("Use `rowdb select <column> from <table> --db <db>`."));
            }
            let db = open_database(&client, &db, "select", color_mode)?;
            let table = require_table(&db, &table)?;
            let values = table.get_col(&column).ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("column {column:?} does not exist"))
                    .with_table(table.name())
                    .with_hint(format!(
                        "Available columns: {}.",
                        table.column_names().join(", ")
                    ))
            })?;
            let values: Vec<Option<&str>> = values.values().into_iter().skip(1).collect();
            emit_json(json!({
                "table": table.name(),
                "column": column,
                "values": values,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Check { db } => {
            let db = open_database(&client, &db, "check", color_mode)?;
            let reports = db.link_reports();
            let links: Vec<LinkJson<'_>> = reports.iter().map(link_json).collect();
            emit_json(json!({
                "database": db.name(),
                "foreign_keys": links,
            }));
            let exit_code = if reports.iter().all(LinkReport::is_linked) {
                0
            } else {
                to_exit_code(ErrorKind::Corrupt)
            };
            Ok(RunOutcome::with_code(exit_code))
        }
    }
}

fn dispatch_db(command: DbCommand, client: &LocalClient) -> Result<RunOutcome, Error> {
    match command {
        DbCommand::List => {
            emit_json(json!({ "databases": client.list_databases()? }));
        }
        DbCommand::Create { name } => {
            let db = client.create_database(&name)?;
            db.write()?;
            emit_json(json!({
                "created": {
                    "database": db.name(),
                    "path": client.root().join(db.name()).display().to_string(),
                }
            }));
        }
        DbCommand::Delete { name } => {
            client.delete_database(&name)?;
            emit_json(json!({ "deleted": { "database": name } }));
        }
    }
    Ok(RunOutcome::ok())
}

fn dispatch_table(
    command: TableCommand,
    client: &LocalClient,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        TableCommand::List { db } => {
            let db = open_database(client, &db, "table list", color_mode)?;
            let tables: Vec<Value> = db
                .tables()
                .iter()
                .map(|table| {
                    json!({
                        "table": table.name(),
                        "columns": table.column_names(),
                        "rows": table.len(),
                        "foreign_key": table
                            .foreign_key()
                            .map(|fk| ForeignKeyJson::new(table.name(), fk)),
                    })
                })
                .collect();
            emit_json(json!({ "database": db.name(), "tables": tables }));
        }
        TableCommand::Create(args) => {
            let mut db = open_database(client, &args.db, "table create", color_mode)?;
            let report = match args.fk.as_deref() {
                Some(fk) => {
                    let foreign_key = parse_foreign_key(fk)?;
                    Some(db.add_table_with_foreign_key(&args.table, foreign_key, &args.columns)?)
                }
                None => {
                    db.add_table(&args.table, &args.columns)?;
                    None
                }
            };
            db.write()?;
            let table = require_table(&db, &args.table)?;
            emit_json(json!({
                "created": {
                    "table": table.name(),
                    "columns": table.column_names(),
                    "foreign_key": report.as_ref().map(link_json),
                }
            }));
        }
        TableCommand::Drop { db, table } => {
            let mut db = open_database(client, &db, "table drop", color_mode)?;
            db.remove_table(&table)?;
            db.write()?;
            emit_link_notices(&db, "table drop", color_mode);
            emit_json(json!({ "dropped": { "database": db.name(), "table": table } }));
        }
        TableCommand::View { db, table } => {
            let db = open_database(client, &db, "table view", color_mode)?;
            let table = require_table(&db, &table)?;
            if io::stdout().is_terminal() {
                emit_table_human(table);
            } else {
                emit_json(table_json(table));
            }
        }
        TableCommand::Types { db, table } => {
            let db = open_database(client, &db, "table types", color_mode)?;
            let table = require_table(&db, &table)?;
            emit_json(table_types_json(table));
        }
    }
    Ok(RunOutcome::ok())
}

fn dispatch_row(
    command: RowCommand,
    client: &LocalClient,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        RowCommand::Add { db, table, values } => {
            let mut db = open_database(client, &db, "row add", color_mode)?;
            db.add_row(&table, &values)?;
            db.write()?;
            let key = values.first().map(|token| primary_key_of(token));
            emit_json(json!({ "added": { "table": table, "key": key } }));
        }
        RowCommand::Delete { db, table, key } => {
            let mut db = open_database(client, &db, "row delete", color_mode)?;
            db.delete_row(&table, &key)?;
            db.write()?;
            emit_json(json!({ "deleted": { "table": table, "key": key } }));
        }
        RowCommand::Update {
            db,
            table,
            key,
            values,
        } => {
            let mut db = open_database(client, &db, "row update", color_mode)?;
            let rejected = db.update_row(&table, &key, &values)?;
            db.write()?;
            let table_ref = require_table(&db, &table)?;
            let columns = table_ref.column_names();
            let rejected: Vec<&str> = rejected
                .iter()
                .filter_map(|index| columns.get(*index).copied())
                .collect();
            emit_json(json!({
                "updated": { "table": table, "key": key, "rejected": rejected }
            }));
        }
    }
    Ok(RunOutcome::ok())
}

/// Plain value of a cell token, as the table keys it.
fn primary_key_of(token: &str) -> &str {
    token
        .split_once(rowdb::api::TAG_SEPARATOR)
        .map_or(token, |(_, value)| value)
}
