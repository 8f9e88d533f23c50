use indexmap::IndexMap;

use crate::engine::core::column::column::Column;
use crate::engine::core::column::data_type::DataType;
use crate::engine::errors::LogicError;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWithType {
    pub data_type: DataType,
    pub column: Column,
}

/// Named columns in insertion order. All columns are expected to hold the
/// same number of rows; `rows()` checks it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    columns: IndexMap<String, ColumnWithType>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ColumnWithType> {
        self.columns.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ColumnWithType> {
        self.columns.get_mut(name)
    }

    /// Adds a column at the end, or replaces an existing one in place.
    pub fn insert(&mut self, name: impl Into<String>, data_type: DataType, column: Column) {
        self.columns
            .insert(name.into(), ColumnWithType { data_type, column });
    }

    pub fn remove(&mut self, name: &str) -> Option<ColumnWithType> {
        self.columns.shift_remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnWithType)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Row count shared by every column; 0 for a block without columns.
    pub fn rows(&self) -> Result<usize, LogicError> {
        let mut iter = self.columns.iter();
        let Some((first, first_col)) = iter.next() else {
            return Ok(0);
        };
        let first_rows = first_col.column.len();
        for (name, col) in iter {
            let rows = col.column.len();
            if rows != first_rows {
                return Err(LogicError::RowCountMismatch {
                    first: first.clone(),
                    first_rows,
                    column: name.clone(),
                    rows,
                });
            }
        }
        Ok(first_rows)
    }

    /// Keeps exactly the columns named in `order`, in that order. Names
    /// without a column are skipped; returns the names of dropped columns.
    pub fn reorder<S: AsRef<str>>(&mut self, order: &[S]) -> Vec<String> {
        let mut reordered = IndexMap::with_capacity(order.len());
        for name in order {
            if let Some((name, col)) = self.columns.shift_remove_entry(name.as_ref()) {
                reordered.insert(name, col);
            }
        }
        let dropped = self.columns.keys().cloned().collect();
        self.columns = reordered;
        dropped
    }
}
