// Keyed, insertion-ordered row store with per-column successor chains.
//
// Rows live in an arena of slots addressed by `RowId`; the header is `RowId::HEADER`
// and is always first in insertion order. Every cell carries a `down` link to the
// row below it, so each column is a chain starting at its header cell and visiting
// every live row in insertion order. All mutations keep three things aligned: the
// header length equals every row length, primary keys are unique (the header key
// included), and every column chain matches `order`.
use std::collections::HashMap;

use crate::core::error::{Error, ErrorKind};
use crate::core::item::{CellRef, ForeignKeyTarget, Item, RowId};
use crate::core::record::{Record, item_from_token};

/// Foreign-key facet of a table: `foreign_key_column` references
/// `primary_table.primary_column`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ForeignKey {
    pub primary_table: String,
    pub primary_column: String,
    pub foreign_key_column: String,
}

impl ForeignKey {
    pub fn new(
        primary_table: impl Into<String>,
        primary_column: impl Into<String>,
        foreign_key_column: impl Into<String>,
    ) -> Self {
        Self {
            primary_table: primary_table.into(),
            primary_column: primary_column.into(),
            foreign_key_column: foreign_key_column.into(),
        }
    }

    pub fn target(&self) -> ForeignKeyTarget {
        ForeignKeyTarget::new(&self.primary_table, &self.primary_column)
    }
}

#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    header: Record,
    slots: Vec<Option<Record>>,
    order: Vec<RowId>,
    keys: HashMap<String, RowId>,
    columns: HashMap<String, usize>,
    foreign_key: Option<ForeignKey>,
}

impl Table {
    /// Duplicate column names keep their first occurrence.
    pub fn new<S: AsRef<str>>(name: impl Into<String>, columns: &[S]) -> Result<Self, Error> {
        let name = name.into();
        let mut header = Record::new();
        for token in columns {
            let column = item_from_token(token.as_ref());
            let Some(value) = column.value() else {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("column names must not be empty")
                    .with_table(&name));
            };
            check_token(value).map_err(|err| err.with_table(&name))?;
            if !header.contains(value) {
                header.push(Item::new(value));
            }
        }
        let Some(key) = header.primary_key().map(str::to_string) else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("a table needs at least one column")
                .with_table(&name));
        };

        let mut table = Self {
            name,
            header,
            slots: vec![None],
            order: vec![RowId::HEADER],
            keys: HashMap::from([(key, RowId::HEADER)]),
            columns: HashMap::new(),
            foreign_key: None,
        };
        table.rebuild_columns();
        Ok(table)
    }

    pub fn with_foreign_key<S: AsRef<str>>(
        name: impl Into<String>,
        foreign_key: ForeignKey,
        columns: &[S],
    ) -> Result<Self, Error> {
        let mut table = Self::new(name, columns)?;
        table.attach_foreign_key(foreign_key)?;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &Record {
        &self.header
    }

    pub fn header_key(&self) -> &str {
        self.header.primary_key().unwrap_or_default()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.header.iter().filter_map(Item::value).collect()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.order.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }

    /// Data-row primary keys in insertion order.
    pub fn primary_keys(&self) -> Vec<&str> {
        self.rows().filter_map(Record::primary_key).collect()
    }

    /// Data rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.order[1..].iter().filter_map(|id| self.slot(*id))
    }

    /// Looks up a row by primary key; the header key returns the header.
    pub fn row(&self, key: &str) -> Option<&Record> {
        self.keys.get(key).and_then(|id| self.slot(*id))
    }

    pub fn row_id(&self, key: &str) -> Option<RowId> {
        self.keys.get(key).copied()
    }

    pub fn cell(&self, row: RowId, column: usize) -> Option<&Item> {
        self.slot(row).and_then(|record| record.get(column))
    }

    pub fn item(&self, key: &str, column: &str) -> Option<&Item> {
        let index = self.column_index(column)?;
        self.row(key).and_then(|record| record.get(index))
    }

    pub fn contains(&self, value: &str) -> bool {
        self.header.contains(value) || self.rows().any(|record| record.contains(value))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Appends a row of type-tagged tokens and extends every column chain by one.
    pub fn add_row<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), Error> {
        if values.len() != self.column_count() {
            return Err(self.error(ErrorKind::Usage).with_message(format!(
                "row has {} values but the table has {} columns",
                values.len(),
                self.column_count()
            )));
        }
        for value in values {
            check_token(value.as_ref()).map_err(|err| err.with_table(&self.name))?;
        }

        let mut record = Record::from_tokens(values);
        let key = record
            .primary_key()
            .map(str::to_string)
            .ok_or_else(|| self.error(ErrorKind::Usage).with_message("primary key is null"))?;
        if self.keys.contains_key(&key) {
            return Err(self
                .error(ErrorKind::AlreadyExists)
                .with_message(format!("primary key {key:?} already exists")));
        }

        if let Some(index) = self.foreign_key_index() {
            let target = self.header.get(index).and_then(Item::target).cloned();
            if let Some(item) = record.get_mut(index) {
                item.set_target(target);
            }
        }

        let id = RowId(self.slots.len());
        let last = self.last_row();
        if let Some(top) = self.slot_mut(last) {
            Record::link(top, &record, id);
        }
        self.slots.push(Some(record));
        self.order.push(id);
        self.keys.insert(key, id);
        Ok(())
    }

    /// Inserts each row independently; returns the failures by input position.
    pub fn add_rows<R, S>(&mut self, rows: &[R]) -> Vec<(usize, Error)>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        rows.iter()
            .enumerate()
            .filter_map(|(pos, row)| self.add_row(row.as_ref()).err().map(|err| (pos, err)))
            .collect()
    }

    /// Drops every data row; the header and foreign-key facet stay.
    pub fn clear(&mut self) {
        self.slots.truncate(1);
        self.order.truncate(1);
        let header_key = self.header_key().to_string();
        self.keys.retain(|key, _| *key == header_key);
        for item in self.header.iter_mut() {
            item.set_down(None);
        }
    }

    pub fn replace_rows<R, S>(&mut self, rows: &[R]) -> Vec<(usize, Error)>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.clear();
        self.add_rows(rows)
    }

    /// Removes a data row and splices its successor into the chain above it.
    pub fn delete_row(&mut self, key: &str) -> Result<(), Error> {
        if key == self.header_key() {
            return Err(self
                .error(ErrorKind::Usage)
                .with_message("the column-name row cannot be deleted"));
        }
        let id = self.keys.remove(key).ok_or_else(|| self.missing_row(key))?;
        let Some(pos) = self.order.iter().position(|row| *row == id) else {
            return Err(self
                .error(ErrorKind::Internal)
                .with_message("row missing from insertion order"));
        };
        let removed = self.slots[id.0].take();
        self.order.remove(pos);

        let above = self.order[pos - 1];
        if let (Some(removed), Some(top)) = (removed, self.slot_mut(above)) {
            for (cell, gone) in top.iter_mut().zip(removed.iter()) {
                cell.set_down(gone.down());
            }
        }
        Ok(())
    }

    /// Whole-row replace with plain values. Each cell is validated on its own;
    /// rejected cells keep their old value and their indices are returned.
    pub fn update_row<S: AsRef<str>>(
        &mut self,
        key: &str,
        values: &[S],
    ) -> Result<Vec<usize>, Error> {
        let id = self.data_row_id(key)?;
        if values.len() != self.column_count() {
            return Err(self.error(ErrorKind::Usage).with_message(format!(
                "row has {} values but the table has {} columns",
                values.len(),
                self.column_count()
            )));
        }
        let mut rejected = Vec::new();
        for (index, value) in values.iter().enumerate() {
            if self.set_cell(id, index, value.as_ref()).is_err() {
                rejected.push(index);
            }
        }
        Ok(rejected)
    }

    pub fn update_item(&mut self, key: &str, column: &str, value: &str) -> Result<(), Error> {
        let id = self.data_row_id(key)?;
        let index = self
            .column_index(column)
            .ok_or_else(|| self.missing_column(column))?;
        self.set_cell(id, index, value)
    }

    pub fn rename_column(&mut self, column: &str, new_name: &str) -> Result<(), Error> {
        let index = self
            .column_index(column)
            .ok_or_else(|| self.missing_column(column))?;
        check_name(new_name).map_err(|err| err.with_table(&self.name))?;
        if self.has_column(new_name) {
            return Err(self.duplicate_column(new_name));
        }
        if index == 0 {
            if self.keys.contains_key(new_name) {
                return Err(self
                    .error(ErrorKind::AlreadyExists)
                    .with_message(format!("primary key {new_name:?} already exists")));
            }
            self.keys.remove(column);
            self.keys.insert(new_name.to_string(), RowId::HEADER);
        }
        if let Some(item) = self.header.get_mut(index) {
            item.set_value(new_name)?;
        }
        if let Some(fk) = self.foreign_key.as_mut() {
            if fk.foreign_key_column == column {
                fk.foreign_key_column = new_name.to_string();
            }
        }
        self.rebuild_columns();
        Ok(())
    }

    /// Walks the column chain from its header cell; the header value comes first.
    pub fn get_col(&self, column: &str) -> Option<Record> {
        let cells = self.column_cells(column)?;
        Some(Record::from_items(
            cells.into_iter().map(|(_, item)| item.detached()).collect(),
        ))
    }

    /// Cells of a column paired with their row ids, found by following `down` links.
    pub fn column_cells(&self, column: &str) -> Option<Vec<(RowId, &Item)>> {
        let index = self.column_index(column)?;
        Some(self.column_cells_at(index))
    }

    pub(crate) fn column_cells_at(&self, index: usize) -> Vec<(RowId, &Item)> {
        let mut cells = Vec::with_capacity(self.order.len());
        let mut next = Some(RowId::HEADER);
        while let Some(id) = next {
            let Some(item) = self.cell(id, index) else {
                break;
            };
            cells.push((id, item));
            next = item.down();
        }
        cells
    }

    pub fn add_col(&mut self, column: &str) -> Result<(), Error> {
        let index = self.column_count();
        self.insert_column(index, column)
    }

    /// Adds several columns; nothing changes if any name is invalid or taken.
    pub fn add_cols<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<(), Error> {
        let mut seen = std::collections::HashSet::new();
        for column in columns {
            let column = column.as_ref();
            check_name(column).map_err(|err| err.with_table(&self.name))?;
            if self.has_column(column) || !seen.insert(column) {
                return Err(self.duplicate_column(column));
            }
        }
        for column in columns {
            self.add_col(column.as_ref())?;
        }
        Ok(())
    }

    /// Inserts `column` just before `before`; the primary-key column stays first.
    pub fn add_col_before(&mut self, before: &str, column: &str) -> Result<(), Error> {
        let index = self
            .column_index(before)
            .ok_or_else(|| self.missing_column(before))?;
        if index == 0 {
            return Err(self
                .error(ErrorKind::Usage)
                .with_message("cannot insert a column before the primary-key column"));
        }
        self.insert_column(index, column)
    }

    pub fn remove_col(&mut self, column: &str) -> Result<(), Error> {
        let index = self
            .column_index(column)
            .ok_or_else(|| self.missing_column(column))?;
        if index == 0 {
            return Err(self
                .error(ErrorKind::Usage)
                .with_message("the primary-key column cannot be removed"));
        }
        self.header.remove(index)?;
        for slot in self.slots.iter_mut().flatten() {
            slot.remove(index)?;
        }
        if self
            .foreign_key
            .as_ref()
            .is_some_and(|fk| fk.foreign_key_column == column)
        {
            self.foreign_key = None;
        }
        self.rebuild_columns();
        Ok(())
    }

    /// Assigns one value per data row, top to bottom along the column chain.
    pub fn update_col<S: AsRef<str>>(
        &mut self,
        column: &str,
        values: &[S],
    ) -> Result<Vec<usize>, Error> {
        let index = self
            .column_index(column)
            .ok_or_else(|| self.missing_column(column))?;
        if values.len() != self.len() {
            return Err(self.error(ErrorKind::Usage).with_message(format!(
                "column update has {} values but the table has {} rows",
                values.len(),
                self.len()
            )));
        }
        let ids: Vec<RowId> = self
            .column_cells(column)
            .unwrap_or_default()
            .into_iter()
            .skip(1)
            .map(|(id, _)| id)
            .collect();
        let mut rejected = Vec::new();
        for (pos, (id, value)) in ids.into_iter().zip(values).enumerate() {
            if self.set_cell(id, index, value.as_ref()).is_err() {
                rejected.push(pos);
            }
        }
        Ok(rejected)
    }

    /// Sets the facet and tags the foreign-key column's cells with its target.
    pub(crate) fn attach_foreign_key(&mut self, foreign_key: ForeignKey) -> Result<(), Error> {
        let index = self
            .column_index(&foreign_key.foreign_key_column)
            .ok_or_else(|| self.missing_column(&foreign_key.foreign_key_column))?;
        let target = foreign_key.target();
        if let Some(item) = self.header.get_mut(index) {
            item.set_target(Some(target.clone()));
        }
        for slot in self.slots.iter_mut().flatten() {
            if let Some(item) = slot.get_mut(index) {
                item.set_target(Some(target.clone()));
            }
        }
        self.foreign_key = Some(foreign_key);
        Ok(())
    }

    pub(crate) fn set_reference(&mut self, row: RowId, column: usize, reference: Option<CellRef>) {
        if let Some(item) = self.slot_mut(row).and_then(|record| record.get_mut(column)) {
            item.set_reference(reference);
        }
    }

    fn insert_column(&mut self, index: usize, column: &str) -> Result<(), Error> {
        check_name(column).map_err(|err| err.with_table(&self.name))?;
        if self.has_column(column) {
            return Err(self.duplicate_column(column));
        }
        self.header.insert(index, Item::new(column))?;
        for slot in self.slots.iter_mut().flatten() {
            slot.insert(index, Item::null())?;
        }
        self.relink_column(index);
        self.rebuild_columns();
        Ok(())
    }

    fn relink_column(&mut self, index: usize) {
        for pos in 0..self.order.len() {
            let below = self.order.get(pos + 1).copied();
            let id = self.order[pos];
            if let Some(item) = self.slot_mut(id).and_then(|record| record.get_mut(index)) {
                item.set_down(below);
            }
        }
    }

    fn rebuild_columns(&mut self) {
        self.columns = self
            .header
            .iter()
            .enumerate()
            .filter_map(|(index, item)| item.value().map(|name| (name.to_string(), index)))
            .collect();
    }

    /// Writes one cell; a new primary-key value re-keys the row unless taken.
    fn set_cell(&mut self, id: RowId, index: usize, value: &str) -> Result<(), Error> {
        check_token(value).map_err(|err| err.with_table(&self.name))?;
        let old_key = self
            .slot(id)
            .and_then(Record::primary_key)
            .map(str::to_string);
        if index == 0 && value.is_empty() {
            return Err(self.error(ErrorKind::Usage).with_message("primary key is null"));
        }
        let rekey = index == 0 && old_key.as_deref() != Some(value);
        if rekey && self.keys.contains_key(value) {
            return Err(self
                .error(ErrorKind::AlreadyExists)
                .with_message(format!("primary key {value:?} already exists")));
        }
        let name = self.name.clone();
        let record = self
            .slot_mut(id)
            .ok_or_else(|| Error::new(ErrorKind::NotFound).with_table(&name))?;
        record.update(index, value).map_err(|err| err.with_table(&name))?;
        if rekey {
            if let Some(old) = old_key {
                self.keys.remove(&old);
            }
            self.keys.insert(value.to_string(), id);
        }
        Ok(())
    }

    fn data_row_id(&self, key: &str) -> Result<RowId, Error> {
        match self.keys.get(key) {
            Some(&RowId::HEADER) => Err(self
                .error(ErrorKind::Usage)
                .with_message("the column-name row cannot be updated as data")
                .with_hint("Use rename_column to change column names.")),
            Some(id) => Ok(*id),
            None => Err(self.missing_row(key)),
        }
    }

    fn foreign_key_index(&self) -> Option<usize> {
        self.foreign_key
            .as_ref()
            .and_then(|fk| self.column_index(&fk.foreign_key_column))
    }

    fn last_row(&self) -> RowId {
        self.order.last().copied().unwrap_or(RowId::HEADER)
    }

    fn slot(&self, id: RowId) -> Option<&Record> {
        if id == RowId::HEADER {
            return Some(&self.header);
        }
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: RowId) -> Option<&mut Record> {
        if id == RowId::HEADER {
            return Some(&mut self.header);
        }
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    fn error(&self, kind: ErrorKind) -> Error {
        Error::new(kind).with_table(&self.name)
    }

    fn missing_row(&self, key: &str) -> Error {
        self.error(ErrorKind::NotFound)
            .with_message(format!("no row with primary key {key:?}"))
    }

    fn missing_column(&self, column: &str) -> Error {
        self.error(ErrorKind::NotFound)
            .with_message(format!("no column named {column:?}"))
    }

    fn duplicate_column(&self, column: &str) -> Error {
        self.error(ErrorKind::AlreadyExists)
            .with_message(format!("column {column:?} already exists"))
    }
}

/// Cells are whitespace-delimited on disk.
fn check_token(value: &str) -> Result<(), Error> {
    if value.chars().any(char::is_whitespace) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("value {value:?} must not contain whitespace")));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("column names must not be empty"));
    }
    check_token(name)
}
