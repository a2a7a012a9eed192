use crate::{AsValue, Error, Result, Value};
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeStruct},
};
use std::{ops::Index, slice, sync::Arc};

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(names: RowNames, values: Row) -> Self {
        Self {
            labels: names,
            values,
        }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values()[i])
    }
    /// Fetch a column and convert it into `T`.
    pub fn get<T: AsValue>(&self, name: &str) -> Result<T> {
        let Some(value) = self.get_column(name) else {
            return Err(Error::msg(format!("The row has no column `{name}`")));
        };
        T::try_from_value(value.clone())
    }
    /// Column name and value pairs, in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for RowLabeled {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Ordered rows of a query, all sharing the same column labels.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct TabularResult {
    pub(crate) columns: RowNames,
    pub(crate) rows: Vec<RowLabeled>,
}

impl TabularResult {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn rows(&self) -> &[RowLabeled] {
        &self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&RowLabeled> {
        self.rows.get(index)
    }
    pub fn iter(&self) -> slice::Iter<'_, RowLabeled> {
        self.rows.iter()
    }
}

impl Index<usize> for TabularResult {
    type Output = RowLabeled;

    fn index(&self, index: usize) -> &Self::Output {
        &self.rows[index]
    }
}

impl IntoIterator for TabularResult {
    type Item = RowLabeled;
    type IntoIter = std::vec::IntoIter<RowLabeled>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a TabularResult {
    type Item = &'a RowLabeled;
    type IntoIter = slice::Iter<'a, RowLabeled>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl Serialize for TabularResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Generated keys, string encoded, in the order the driver reported them.
    pub keys: Vec<String>,
}

impl Serialize for UpdateOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = serializer.serialize_struct("UpdateOutcome", 2)?;
        value.serialize_field("rows_affected", &self.rows_affected)?;
        value.serialize_field("keys", &self.keys)?;
        value.end()
    }
}
