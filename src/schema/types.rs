// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a schema column.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    Float,
    Str,
    Bool,
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Str => "str",
            DataType::Bool => "bool",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column definition as declared in a schema file.
///
/// `name` is the canonical name used inside the pipeline; `old_name` is the
/// header found in (or written to) the CSV file.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub old_name: String,
    pub data_type: DataType,
}

/// On-disk shape of a single schema entry; the key carries the canonical name.
#[derive(Debug, Deserialize)]
pub(crate) struct ColumnEntry {
    pub old_name: String,
    pub data_type: DataType,
}

/// Ordered list of columns for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
