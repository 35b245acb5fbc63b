use std::sync::Arc;

use serde::Serialize;

use super::Columns;
use super::row::Row;
use crate::types::Value;

/// Rows of one fully stepped execution pass, in the order the engine produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Table {
    /// The rows returned by the statement
    pub rows: Vec<Row>,
    #[serde(skip)]
    columns: Arc<Columns>,
}

impl Table {
    pub(crate) fn with_capacity(columns: Arc<Columns>, capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            columns,
        }
    }

    pub(crate) fn add_row_values(&mut self, values: Vec<Value>) {
        self.rows.push(Row::new(Arc::clone(&self.columns), values));
    }

    /// Column names reported by the engine for this pass.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl IntoIterator for Table {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
