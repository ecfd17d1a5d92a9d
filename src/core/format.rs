//! Purpose: Centralize the on-disk text layout for tables and index files.
//! Exports: File-name constants, table and foreign-key line codecs, name checks.
//! Role: Shared policy for everything `Database` writes through `Storage`.
//! Invariants: Table file = name line, encoded header line, one encoded row per line.
//! Invariants: `FKIndex.txt` holds `<primaryTable> <primaryCol> <fkTable> <fkCol>` per line.
//! Invariants: Names never contain whitespace or path separators.

use crate::core::error::{Error, ErrorKind};
use crate::core::record::Record;
use crate::core::table::{ForeignKey, Table};

pub const INDEX_FILE: &str = "index.txt";
pub const FK_INDEX_FILE: &str = "FKIndex.txt";
pub const TABLE_EXTENSION: &str = ".txt";

pub fn table_file_name(table: &str) -> String {
    format!("{table}{TABLE_EXTENSION}")
}

/// Table name for a file in a database directory, skipping the FK index.
pub fn table_name_from_file(file: &str) -> Option<&str> {
    if file == FK_INDEX_FILE {
        return None;
    }
    file.strip_suffix(TABLE_EXTENSION)
        .filter(|name| !name.is_empty())
}

pub fn encode_table(table: &Table) -> Vec<String> {
    let mut lines = Vec::with_capacity(table.len() + 2);
    lines.push(table.name().to_string());
    lines.push(table.header().encode());
    lines.extend(table.rows().map(Record::encode));
    lines
}

/// Builds a table from file lines. `Ok(None)` means the file was empty.
/// Rows that no longer satisfy the table invariants are returned as rejects
/// alongside the table instead of failing the whole load.
pub fn decode_table(lines: &[String]) -> Result<Option<(Table, Vec<(usize, Error)>)>, Error> {
    let mut lines = lines.iter().enumerate().filter(|(_, line)| !line.trim().is_empty());
    let Some((_, name)) = lines.next() else {
        return Ok(None);
    };
    let name = name.trim();
    let Some((_, header)) = lines.next() else {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message("table file has no column line")
            .with_table(name));
    };
    let columns: Vec<&str> = header.split_whitespace().collect();
    let mut table = Table::new(name, &columns)?;

    let mut rejects = Vec::new();
    for (number, line) in lines {
        let values: Vec<&str> = line.split_whitespace().collect();
        if let Err(err) = table.add_row(&values) {
            rejects.push((number + 1, err));
        }
    }
    Ok(Some((table, rejects)))
}

pub fn encode_foreign_key(foreign_key: &ForeignKey, table: &str) -> String {
    format!(
        "{} {} {} {}",
        foreign_key.primary_table, foreign_key.primary_column, table, foreign_key.foreign_key_column
    )
}

/// Parses one FK index line into `(fk table, facet)`; blank lines yield `None`.
pub fn decode_foreign_key(line: &str) -> Result<Option<(String, ForeignKey)>, Error> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        [] => Ok(None),
        [primary_table, primary_column, table, column] => Ok(Some((
            table.to_string(),
            ForeignKey::new(*primary_table, *primary_column, *column),
        ))),
        _ => Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("malformed foreign-key index line {line:?}"))),
    }
}

/// Database and table names become directory and file names.
pub fn check_name(kind: &str, name: &str) -> Result<(), Error> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\' || c == '%');
    if bad {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("invalid {kind} name {name:?}"))
            .with_hint("Names must be non-empty and free of whitespace, '/', '\\' and '%'."));
    }
    if kind == "database" && name == INDEX_FILE {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("database name {name:?} is reserved")));
    }
    if kind == "table" && table_file_name(name) == FK_INDEX_FILE {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("table name {name:?} is reserved")));
    }
    Ok(())
}
