// Single typed cell plus its non-owning column and foreign-key links.
use crate::core::error::{Error, ErrorKind};
use crate::core::value::ValueType;

/// Stable slot id of a row inside its table; the header is always slot 0.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RowId(pub(crate) usize);

impl RowId {
    pub const HEADER: RowId = RowId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Declared `(table, column)` a foreign-key column points at.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub column: String,
}

impl ForeignKeyTarget {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Coordinates of a resolved foreign-key target cell.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CellRef {
    pub table: String,
    pub row: RowId,
    pub column: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Item {
    value: Option<String>,
    value_type: ValueType,
    target: Option<ForeignKeyTarget>,
    reference: Option<CellRef>,
    down: Option<RowId>,
}

impl Item {
    /// An empty value is stored as null, matching how it loads from disk.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: stored(value.into()),
            ..Self::default()
        }
    }

    /// Placeholder cell used when a column is inserted into existing rows.
    pub fn null() -> Self {
        Self::default()
    }

    /// Falls back to `String` when `value` does not satisfy `value_type`.
    pub fn typed(value: impl Into<String>, value_type: ValueType) -> Self {
        let value = value.into();
        let value_type = if Self::is_valid(&value, value_type) {
            value_type
        } else {
            ValueType::String
        };
        Self {
            value: stored(value),
            value_type,
            ..Self::default()
        }
    }

    pub fn foreign_key(
        value: impl Into<String>,
        value_type: ValueType,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        let mut item = Self::typed(value, value_type);
        item.target = Some(ForeignKeyTarget::new(table, column));
        item
    }

    pub fn is_valid(value: &str, value_type: ValueType) -> bool {
        value_type.accepts(value)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Replaces the value only if it satisfies the current type.
    pub fn set_value(&mut self, value: &str) -> Result<(), Error> {
        if !Self::is_valid(value, self.value_type) {
            return Err(Error::new(ErrorKind::TypeMismatch).with_message(format!(
                "value {value:?} is not a valid {}",
                self.value_type
            )));
        }
        self.value = stored(value.to_string());
        Ok(())
    }

    pub fn is_foreign_key(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&ForeignKeyTarget> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Option<ForeignKeyTarget>) {
        self.target = target;
    }

    pub fn reference(&self) -> Option<&CellRef> {
        self.reference.as_ref()
    }

    pub fn set_reference(&mut self, reference: Option<CellRef>) {
        self.reference = reference;
    }

    pub fn down(&self) -> Option<RowId> {
        self.down
    }

    pub fn set_down(&mut self, down: Option<RowId>) {
        self.down = down;
    }

    /// Copy of the cell without its table-relative links.
    pub fn detached(&self) -> Self {
        Self {
            value: self.value.clone(),
            value_type: self.value_type,
            target: self.target.clone(),
            reference: None,
            down: None,
        }
    }
}

fn stored(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
