// Ordered row of cells with type-tagged token encoding.
//
// Encoded form: every cell is written as `<tag>%<value>` followed by a single
// space, so an encoded record always ends with a trailing space. Tokens split
// on the first `%` only, values may contain further `%` characters. A null
// cell is written with an empty value and an empty value loads as null.
use crate::core::error::{Error, ErrorKind};
use crate::core::item::{Item, RowId};
use crate::core::value::ValueType;

pub const TAG_SEPARATOR: char = '%';

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    items: Vec<Item>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// One cell per token; the first token becomes the primary key.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            items: tokens
                .into_iter()
                .map(|token| item_from_token(token.as_ref()))
                .collect(),
        }
    }

    pub fn decode(line: &str) -> Self {
        Self::from_tokens(line.split_whitespace())
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            out.push(item.value_type().tag());
            out.push(TAG_SEPARATOR);
            out.push_str(item.value().unwrap_or(""));
            out.push(' ');
        }
        out
    }

    /// Points every cell of `top` at `bottom_row`, the slot `bottom` lives in.
    pub fn link(top: &mut Record, bottom: &Record, bottom_row: RowId) -> bool {
        if top.is_empty() || top.len() != bottom.len() {
            return false;
        }
        for item in &mut top.items {
            item.set_down(Some(bottom_row));
        }
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.items.first().and_then(Item::value)
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Item> {
        self.items.get_mut(index)
    }

    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Item::value)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Item> {
        self.items.iter_mut()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.index_of(value).is_some()
    }

    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.items.iter().position(|item| item.value() == Some(value))
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn insert(&mut self, index: usize, item: Item) -> Result<(), Error> {
        if index > self.items.len() {
            return Err(out_of_range(index, self.items.len()));
        }
        self.items.insert(index, item);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Item, Error> {
        if index >= self.items.len() {
            return Err(out_of_range(index, self.items.len()));
        }
        Ok(self.items.remove(index))
    }

    /// Re-validates against the existing cell type; a mismatch keeps the old value.
    pub fn update(&mut self, index: usize, value: &str) -> Result<(), Error> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))?;
        item.set_value(value)
    }

    pub fn values(&self) -> Vec<Option<&str>> {
        self.items.iter().map(Item::value).collect()
    }

    pub fn types(&self) -> Vec<ValueType> {
        self.items.iter().map(Item::value_type).collect()
    }

    /// Plain space-joined values, nulls rendered as `null`.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|item| item.value().unwrap_or("null"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn item_from_token(token: &str) -> Item {
    match token.split_once(TAG_SEPARATOR) {
        Some((_, "")) => Item::null(),
        Some((tag, value)) => Item::typed(value, ValueType::from_tag(tag)),
        None => Item::new(token),
    }
}

fn out_of_range(index: usize, len: usize) -> Error {
    Error::new(ErrorKind::Usage).with_message(format!(
        "cell index {index} out of range for record of length {len}"
    ))
}
