// Table ownership, foreign-key resolution, and load/persist orchestration.
//
// Foreign-key references are never persisted; only `(primaryTable, primaryCol,
// fkTable, fkCol)` tuples are. Every load re-runs resolution, which walks both
// columns along their successor chains and pairs cells in O(n·m).
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::format::{
    FK_INDEX_FILE, check_name, decode_foreign_key, decode_table, encode_foreign_key,
    encode_table, table_file_name, table_name_from_file,
};
use crate::core::item::{CellRef, Item, RowId};
use crate::core::storage::{DirStorage, Storage};
use crate::core::table::{ForeignKey, Table};

/// A foreign-key tuple: `table.foreign_key_column` references
/// `primary_table.primary_column`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Relationship {
    pub table: String,
    pub foreign_key: ForeignKey,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LinkStatus {
    /// Every cell of the foreign-key column found its target.
    Linked { links: usize },
    /// A table (`column == None`) or a column named by the tuple does not exist.
    MissingTarget {
        table: String,
        column: Option<String>,
    },
    /// Link count differs from the foreign-key column length; links made are kept.
    PartialLink { linked: usize, expected: usize },
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Linked { links } => write!(f, "linked {links} cells"),
            LinkStatus::MissingTarget {
                table,
                column: None,
            } => write!(f, "table {table} does not exist"),
            LinkStatus::MissingTarget {
                table,
                column: Some(column),
            } => write!(f, "column {table}.{column} does not exist"),
            LinkStatus::PartialLink { linked, expected } => {
                write!(f, "linked {linked} of {expected} cells")
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinkReport {
    pub relationship: Relationship,
    pub status: LinkStatus,
}

impl LinkReport {
    pub fn is_linked(&self) -> bool {
        matches!(self.status, LinkStatus::Linked { .. })
    }
}

#[derive(Debug)]
pub struct Database<S: Storage = DirStorage> {
    name: String,
    storage: S,
    tables: Vec<Table>,
    positions: HashMap<String, usize>,
    link_reports: Vec<LinkReport>,
}

impl<S: Storage> Database<S> {
    /// Opens `name` under the storage root, creating it when absent. An existing
    /// directory is loaded and its foreign keys are resolved. Loaded tables come
    /// back in file-name order, not in the order they were added.
    pub fn open(storage: S, name: &str) -> Result<Self, Error> {
        check_name("database", name)?;
        let created = storage.create_dir_if_absent(Path::new(name))?;
        storage.register_database(name)?;
        let mut db = Self {
            name: name.to_string(),
            storage,
            tables: Vec::new(),
            positions: HashMap::new(),
            link_reports: Vec::new(),
        };
        if created {
            debug!(database = %db.name, "created database");
        } else {
            db.load()?;
        }
        Ok(db)
    }

    pub fn exists(storage: &S, name: &str) -> Result<bool, Error> {
        Ok(storage.database_names()?.iter().any(|existing| existing == name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(Table::name).collect()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.positions.get(name).map(|pos| &self.tables[*pos])
    }

    /// Direct edits bypass link maintenance; call `resolve_foreign_keys` after.
    /// Renaming a column here leaves other tables' foreign keys on the old name;
    /// use `Database::rename_column` instead.
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.positions.get(name).map(|pos| &mut self.tables[*pos])
    }

    /// `(table, columns)` summary used to validate foreign-key targets.
    pub fn catalog(&self) -> Vec<(&str, Vec<&str>)> {
        self.tables
            .iter()
            .map(|table| (table.name(), table.column_names()))
            .collect()
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table).is_some_and(|table| table.has_column(column))
    }

    /// Tuples derived from every table's foreign-key facet, in table order.
    pub fn foreign_keys(&self) -> Vec<Relationship> {
        self.tables
            .iter()
            .filter_map(|table| {
                table.foreign_key().map(|fk| Relationship {
                    table: table.name().to_string(),
                    foreign_key: fk.clone(),
                })
            })
            .collect()
    }

    /// Reports from the last resolution pass (load, add, or explicit resolve).
    pub fn link_reports(&self) -> &[LinkReport] {
        &self.link_reports
    }

    pub fn reference_target(&self, reference: &CellRef) -> Option<&Item> {
        self.table(&reference.table)
            .and_then(|table| table.cell(reference.row, reference.column))
    }

    pub fn add_table<C: AsRef<str>>(&mut self, name: &str, columns: &[C]) -> Result<(), Error> {
        self.check_new_table(name)?;
        let table = Table::new(name, columns)?;
        self.insert_table(table);
        Ok(())
    }

    /// Adds a table whose `foreign_key.foreign_key_column` references an existing
    /// `(table, column)`, then links it right away.
    pub fn add_table_with_foreign_key<C: AsRef<str>>(
        &mut self,
        name: &str,
        foreign_key: ForeignKey,
        columns: &[C],
    ) -> Result<LinkReport, Error> {
        self.check_new_table(name)?;
        if !self.has_column(&foreign_key.primary_table, &foreign_key.primary_column) {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message(format!(
                    "foreign key target {}.{} does not exist",
                    foreign_key.primary_table, foreign_key.primary_column
                ))
                .with_table(name)
                .with_hint("Create the referenced table before the table that points at it."));
        }
        let table = Table::with_foreign_key(name, foreign_key.clone(), columns)?;
        self.insert_table(table);

        let report = self.link(Relationship {
            table: name.to_string(),
            foreign_key,
        });
        self.link_reports.push(report.clone());
        Ok(report)
    }

    /// Drops the table and its file. Relationships into it are re-resolved and
    /// report `MissingTarget` until the table comes back.
    pub fn remove_table(&mut self, name: &str) -> Result<(), Error> {
        let Some(pos) = self.positions.get(name).copied() else {
            return Err(missing_table(name));
        };
        self.tables.remove(pos);
        self.rebuild_positions();
        self.link_reports
            .retain(|report| report.relationship.table != name);
        self.storage.remove_file(&self.table_path(name))?;
        debug!(database = %self.name, table = %name, "removed table");
        if self.is_referenced(name) {
            self.resolve_foreign_keys();
        }
        Ok(())
    }

    /// Renames a column and carries the new name into every foreign key that
    /// targets it, then re-resolves the affected relationships.
    pub fn rename_column(
        &mut self,
        table: &str,
        column: &str,
        new_name: &str,
    ) -> Result<(), Error> {
        self.table_mut(table)
            .ok_or_else(|| missing_table(table))?
            .rename_column(column, new_name)?;
        for dependent in &mut self.tables {
            let Some(fk) = dependent.foreign_key() else {
                continue;
            };
            if fk.primary_table != table || fk.primary_column != column {
                continue;
            }
            let mut renamed = fk.clone();
            renamed.primary_column = new_name.to_string();
            dependent.attach_foreign_key(renamed)?;
        }
        self.relink_touching(table);
        Ok(())
    }

    pub fn add_row<V: AsRef<str>>(&mut self, table: &str, values: &[V]) -> Result<(), Error> {
        self.table_mut(table)
            .ok_or_else(|| missing_table(table))?
            .add_row(values)?;
        self.relink_touching(table);
        Ok(())
    }

    pub fn delete_row(&mut self, table: &str, key: &str) -> Result<(), Error> {
        self.table_mut(table)
            .ok_or_else(|| missing_table(table))?
            .delete_row(key)?;
        self.relink_touching(table);
        Ok(())
    }

    pub fn update_row<V: AsRef<str>>(
        &mut self,
        table: &str,
        key: &str,
        values: &[V],
    ) -> Result<Vec<usize>, Error> {
        let rejected = self
            .table_mut(table)
            .ok_or_else(|| missing_table(table))?
            .update_row(key, values)?;
        self.relink_touching(table);
        Ok(rejected)
    }

    /// Re-runs resolution for every foreign-key tuple.
    pub fn resolve_foreign_keys(&mut self) -> Vec<LinkReport> {
        let reports: Vec<LinkReport> = self
            .foreign_keys()
            .into_iter()
            .map(|relationship| self.link(relationship))
            .collect();
        self.link_reports = reports.clone();
        reports
    }

    /// Writes every table, then the foreign-key index. Tables are written one
    /// file at a time; a failure part way leaves earlier files rewritten.
    pub fn write(&self) -> Result<(), Error> {
        self.storage.create_dir_if_absent(Path::new(&self.name))?;
        for table in &self.tables {
            self.storage
                .write_lines(&self.table_path(table.name()), &encode_table(table))?;
        }
        let lines: Vec<String> = self
            .foreign_keys()
            .iter()
            .map(|rel| encode_foreign_key(&rel.foreign_key, &rel.table))
            .collect();
        self.storage.write_lines(&self.fk_index_path(), &lines)?;
        debug!(
            database = %self.name,
            tables = self.tables.len(),
            foreign_keys = lines.len(),
            "wrote database"
        );
        Ok(())
    }

    /// Removes every table file, the index entry, the FK index and the directory.
    pub fn delete(self) -> Result<(), Error> {
        for table in &self.tables {
            self.storage.remove_file(&self.table_path(table.name()))?;
        }
        self.storage.unregister_database(&self.name)?;
        self.storage.remove_file(&self.fk_index_path())?;
        self.storage.remove_dir_all(Path::new(&self.name))?;
        debug!(database = %self.name, "deleted database");
        Ok(())
    }

    fn load(&mut self) -> Result<(), Error> {
        let dir = PathBuf::from(&self.name);
        for file in self.storage.list_files(&dir)? {
            let Some(file_table) = table_name_from_file(&file) else {
                continue;
            };
            let lines = self.storage.read_lines(&dir.join(&file))?;
            let (table, rejects) = match decode_table(&lines) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => {
                    debug!(database = %self.name, file = %file, "empty table file");
                    continue;
                }
                Err(err) => {
                    warn!(database = %self.name, file = %file, error = %err, "skipping table file");
                    continue;
                }
            };
            for (line, err) in &rejects {
                warn!(database = %self.name, table = %file_table, line, error = %err, "skipping row");
            }
            if self.positions.contains_key(table.name()) {
                warn!(database = %self.name, table = %table.name(), "duplicate table name");
                continue;
            }
            debug!(database = %self.name, table = %table.name(), rows = table.len(), "loaded table");
            self.insert_table(table);
        }

        let mut unattached = Vec::new();
        for line in self.storage.read_lines(&self.fk_index_path())? {
            let (table, foreign_key) = match decode_foreign_key(&line) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => continue,
                Err(err) => {
                    warn!(database = %self.name, error = %err, "skipping foreign-key line");
                    continue;
                }
            };
            let column = foreign_key.foreign_key_column.clone();
            let attached = match self.table_mut(&table) {
                Some(target) => target.attach_foreign_key(foreign_key.clone()).is_ok(),
                None => false,
            };
            if !attached {
                let status = LinkStatus::MissingTarget {
                    column: self.table(&table).map(|_| column),
                    table: table.clone(),
                };
                warn!(database = %self.name, table = %table, status = %status, "foreign key not attached");
                unattached.push(LinkReport {
                    relationship: Relationship { table, foreign_key },
                    status,
                });
            }
        }

        self.resolve_foreign_keys();
        unattached.append(&mut self.link_reports);
        self.link_reports = unattached;
        Ok(())
    }

    fn link(&mut self, relationship: Relationship) -> LinkReport {
        let status = self.link_status(&relationship);
        if !matches!(status, LinkStatus::Linked { .. }) {
            warn!(
                database = %self.name,
                table = %relationship.table,
                primary_table = %relationship.foreign_key.primary_table,
                status = %status,
                "foreign keys failed to link"
            );
        }
        LinkReport {
            relationship,
            status,
        }
    }

    /// Pairs every foreign-key cell with every primary cell. Data cells pair by
    /// equal non-null value; the two header cells always pair with each other.
    fn link_status(&mut self, relationship: &Relationship) -> LinkStatus {
        let fk = &relationship.foreign_key;
        let Some(fk_pos) = self.positions.get(&relationship.table).copied() else {
            return LinkStatus::MissingTarget {
                table: relationship.table.clone(),
                column: None,
            };
        };
        let Some(fk_index) = self.tables[fk_pos].column_index(&fk.foreign_key_column) else {
            return LinkStatus::MissingTarget {
                table: relationship.table.clone(),
                column: Some(fk.foreign_key_column.clone()),
            };
        };
        let missing = match self.positions.get(&fk.primary_table).copied() {
            None => Some(None),
            Some(pos) if !self.tables[pos].has_column(&fk.primary_column) => {
                Some(Some(fk.primary_column.clone()))
            }
            Some(_) => None,
        };
        if let Some(column) = missing {
            self.clear_references(fk_pos, fk_index);
            return LinkStatus::MissingTarget {
                table: fk.primary_table.clone(),
                column,
            };
        }

        let primary_pos = self.positions[&fk.primary_table];
        let primary = &self.tables[primary_pos];
        let primary_index = primary.column_index(&fk.primary_column).unwrap_or_default();
        let primary_cells = primary
            .column_cells(&fk.primary_column)
            .unwrap_or_default();
        let fk_cells = self.tables[fk_pos]
            .column_cells(&fk.foreign_key_column)
            .unwrap_or_default();

        let expected = fk_cells.len();
        let mut linked = 0;
        let mut links = Vec::with_capacity(expected);
        for (fk_row, fk_item) in &fk_cells {
            let mut target = None;
            for (primary_row, primary_item) in &primary_cells {
                let header_pair = *fk_row == RowId::HEADER && *primary_row == RowId::HEADER;
                let value_pair = *fk_row != RowId::HEADER
                    && *primary_row != RowId::HEADER
                    && fk_item.value().is_some()
                    && fk_item.value() == primary_item.value();
                if header_pair || value_pair {
                    linked += 1;
                    target.get_or_insert(*primary_row);
                }
            }
            links.push((*fk_row, target));
        }

        let fk_table = &mut self.tables[fk_pos];
        for (row, target) in links {
            let reference = target.map(|row| CellRef {
                table: fk.primary_table.clone(),
                row,
                column: primary_index,
            });
            fk_table.set_reference(row, fk_index, reference);
        }

        if linked == expected {
            LinkStatus::Linked { links: linked }
        } else {
            LinkStatus::PartialLink { linked, expected }
        }
    }

    fn clear_references(&mut self, table_pos: usize, column: usize) {
        let table = &mut self.tables[table_pos];
        let rows: Vec<RowId> = table
            .column_cells_at(column)
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        for row in rows {
            table.set_reference(row, column, None);
        }
    }

    /// Re-resolves relationships where `table` is either side.
    fn relink_touching(&mut self, table: &str) {
        let touching: Vec<Relationship> = self
            .foreign_keys()
            .into_iter()
            .filter(|rel| rel.table == table || rel.foreign_key.primary_table == table)
            .collect();
        for relationship in touching {
            let report = self.link(relationship);
            self.link_reports
                .retain(|existing| existing.relationship != report.relationship);
            self.link_reports.push(report);
        }
    }

    fn is_referenced(&self, table: &str) -> bool {
        self.tables.iter().any(|t| {
            t.foreign_key()
                .is_some_and(|fk| fk.primary_table == table)
        })
    }

    fn check_new_table(&self, name: &str) -> Result<(), Error> {
        check_name("table", name)?;
        if self.positions.contains_key(name) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("table already exists")
                .with_table(name));
        }
        Ok(())
    }

    fn insert_table(&mut self, table: Table) {
        self.positions
            .insert(table.name().to_string(), self.tables.len());
        self.tables.push(table);
    }

    fn rebuild_positions(&mut self) {
        self.positions = self
            .tables
            .iter()
            .enumerate()
            .map(|(pos, table)| (table.name().to_string(), pos))
            .collect();
    }

    fn table_path(&self, table: &str) -> PathBuf {
        Path::new(&self.name).join(table_file_name(table))
    }

    fn fk_index_path(&self) -> PathBuf {
        Path::new(&self.name).join(FK_INDEX_FILE)
    }
}

fn missing_table(name: &str) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("table does not exist")
        .with_table(name)
}

#[cfg(test)]
mod tests {
    use super::{Database, LinkStatus, Relationship};
    use crate::core::error::ErrorKind;
    use crate::core::item::RowId;
    use crate::core::storage::{DirStorage, Storage};
    use crate::core::table::ForeignKey;

    fn robots(storage: DirStorage) -> Database {
        let mut db = Database::open(storage, "Robots").expect("open");
        db.add_table("Robot", &["s%id", "s%year", "s%function"])
            .expect("robot");
        db.add_row("Robot", &["i%1", "i%2016", "s%spaceExploration"])
            .expect("row");
        db.add_row("Robot", &["i%2", "i%2019", "s%vacuum"])
            .expect("row");
        db
    }

    #[test]
    fn seller_references_robot_rows() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        let report = db
            .add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "id"), &["s%product", "s%id"])
            .expect("seller");
        assert_eq!(report.status, LinkStatus::Linked { links: 1 });

        db.add_row("Seller", &["i%34", "i%1"]).expect("row");
        db.add_row("Seller", &["i%55", "i%2"]).expect("row");
        let reports = db.resolve_foreign_keys();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, LinkStatus::Linked { links: 3 });

        let seller = db.table("Seller").expect("seller");
        let robot = db.table("Robot").expect("robot");
        assert!(seller.has_foreign_key());
        assert!(!robot.has_foreign_key());

        let cell = seller.item("34", "id").expect("cell");
        let reference = cell.reference().expect("reference");
        assert_eq!(reference.table, "Robot");
        assert_eq!(Some(reference.row), robot.row_id("1"));
        let target = db.reference_target(reference).expect("target");
        assert_eq!(target.value(), Some("1"));

        let header = seller.header().get(1).expect("header");
        let header_ref = header.reference().expect("header reference");
        assert_eq!(header_ref.row, RowId::HEADER);
        assert_eq!(db.reference_target(header_ref).and_then(|i| i.value()), Some("id"));
    }

    #[test]
    fn every_fk_cell_references_an_equal_primary_cell() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        db.add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "robot"), &["sku", "robot"])
            .expect("seller");
        for (sku, robot) in [("a", "i%1"), ("b", "i%2"), ("c", "i%1")] {
            db.add_row("Seller", &[sku, robot]).expect("row");
        }
        let report = db.link_reports().last().expect("report").clone();
        assert_eq!(report.status, LinkStatus::Linked { links: 4 });

        let seller = db.table("Seller").expect("seller");
        let cells = seller.column_cells("robot").expect("cells");
        for (_, cell) in cells.iter().skip(1) {
            let target = cell
                .reference()
                .and_then(|r| db.reference_target(r))
                .expect("target");
            assert_eq!(target.value(), cell.value());
        }
    }

    #[test]
    fn missing_target_is_rejected_on_add() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        let err = db
            .add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "serial", "id"), &["p", "id"])
            .expect_err("missing column");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = db
            .add_table_with_foreign_key("Seller", ForeignKey::new("Nope", "id", "id"), &["p", "id"])
            .expect_err("missing table");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(db.table("Seller").is_none());
    }

    #[test]
    fn unmatched_value_reports_partial_link() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        db.add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "id"), &["p", "id"])
            .expect("seller");
        db.add_row("Seller", &["i%34", "i%1"]).expect("row");
        db.add_row("Seller", &["i%35", "i%9"]).expect("row");

        let reports = db.resolve_foreign_keys();
        assert_eq!(
            reports[0].status,
            LinkStatus::PartialLink {
                linked: 2,
                expected: 3
            }
        );
        let seller = db.table("Seller").expect("seller");
        assert!(seller.item("34", "id").and_then(|c| c.reference()).is_some());
        assert!(seller.item("35", "id").and_then(|c| c.reference()).is_none());
    }

    #[test]
    fn data_value_equal_to_column_name_does_not_link_to_header() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        db.add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "ref"), &["p", "ref"])
            .expect("seller");
        db.add_row("Seller", &["x", "ref"]).expect("row");

        let reports = db.resolve_foreign_keys();
        assert_eq!(
            reports[0].status,
            LinkStatus::PartialLink {
                linked: 1,
                expected: 2
            }
        );
        let seller = db.table("Seller").expect("seller");
        assert!(seller.item("x", "ref").and_then(|c| c.reference()).is_none());
    }

    #[test]
    fn removing_primary_table_clears_references() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        db.add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "id"), &["p", "id"])
            .expect("seller");
        db.add_row("Seller", &["i%34", "i%1"]).expect("row");

        db.remove_table("Robot").expect("remove");
        let report = db.link_reports().first().expect("report");
        assert_eq!(
            report.status,
            LinkStatus::MissingTarget {
                table: "Robot".to_string(),
                column: None
            }
        );
        let seller = db.table("Seller").expect("seller");
        assert!(seller.item("34", "id").and_then(|c| c.reference()).is_none());
        assert_eq!(db.remove_table("Robot").expect_err("gone").kind(), ErrorKind::NotFound);
    }

    #[test]
    fn dropping_a_dependent_table_forgets_its_link_report() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        db.add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "id"), &["p", "id"])
            .expect("seller");
        db.add_row("Seller", &["i%34", "i%9"]).expect("row");
        assert!(!db.link_reports()[0].is_linked());

        db.remove_table("Seller").expect("remove");
        assert!(db.link_reports().is_empty());
        assert!(db.foreign_keys().is_empty());
    }

    #[test]
    fn renaming_a_primary_column_follows_into_foreign_keys() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        db.add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "robot"), &["p", "robot"])
            .expect("seller");
        db.add_row("Seller", &["i%34", "i%1"]).expect("row");

        db.rename_column("Robot", "id", "serial").expect("rename");
        assert_eq!(
            db.foreign_keys()[0].foreign_key,
            ForeignKey::new("Robot", "serial", "robot")
        );
        assert!(db.link_reports().iter().all(|r| r.is_linked()));
        let seller = db.table("Seller").expect("seller");
        let target = seller.item("34", "robot").and_then(|c| c.target()).expect("target");
        assert_eq!(target.column, "serial");
        assert!(seller.item("34", "robot").and_then(|c| c.reference()).is_some());

        let err = db.rename_column("Nope", "a", "b").expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn failed_open_does_not_register_the_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let storage = DirStorage::new(temp.path());
        std::fs::write(temp.path().join("notes"), "plain file").expect("file");

        let err = Database::open(storage.clone(), "index.txt").expect_err("reserved");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(Database::open(storage.clone(), "notes").is_err());
        assert!(storage.database_names().expect("names").is_empty());
    }

    #[test]
    fn deleting_a_primary_row_relinks_dependents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        db.add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "id"), &["p", "id"])
            .expect("seller");
        db.add_row("Seller", &["i%34", "i%2"]).expect("row");
        assert!(db.link_reports().iter().all(|r| r.is_linked()));

        db.delete_row("Robot", "2").expect("delete");
        assert!(!db.link_reports().iter().all(|r| r.is_linked()));
        let seller = db.table("Seller").expect("seller");
        assert!(seller.item("34", "id").and_then(|c| c.reference()).is_none());
    }

    #[test]
    fn duplicate_and_invalid_table_names_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        let err = db.add_table("Robot", &["a"]).expect_err("duplicate");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        let err = db.add_table("bad name", &["a"]).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = db.add_row("Nope", &["a"]).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn foreign_keys_are_derived_from_tables() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut db = robots(DirStorage::new(temp.path()));
        assert!(db.foreign_keys().is_empty());
        db.add_table_with_foreign_key("Seller", ForeignKey::new("Robot", "id", "id"), &["p", "id"])
            .expect("seller");
        assert_eq!(
            db.foreign_keys(),
            vec![Relationship {
                table: "Seller".to_string(),
                foreign_key: ForeignKey::new("Robot", "id", "id"),
            }]
        );
        assert_eq!(db.table_names(), vec!["Robot", "Seller"]);
        let catalog = db.catalog();
        assert_eq!(catalog[0], ("Robot", vec!["id", "year", "function"]));
        assert!(db.has_column("Seller", "p"));
        assert!(!db.has_column("Seller", "q"));
    }
}
