// src/schema/load.rs

use anyhow::{anyhow, Context, Result};
use std::{fs, path::Path};
use tracing::debug;

use super::types::{Column, ColumnEntry, TableSchema};

/// Load a schema file: a YAML mapping of canonical name → `{old_name, data_type}`.
///
/// Column order follows the file.
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<TableSchema> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("reading schema {:?}", path))?;
    let schema = parse_schema(&text).with_context(|| format!("parsing schema {:?}", path))?;
    debug!(path = %path.display(), columns = schema.columns.len(), "loaded schema");
    Ok(schema)
}

pub fn parse_schema(text: &str) -> Result<TableSchema> {
    let mapping: serde_yaml::Mapping = serde_yaml::from_str(text)?;

    let mut columns = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| anyhow!("schema keys must be strings, got {:?}", key))?
            .to_string();
        let entry: ColumnEntry = serde_yaml::from_value(value)
            .with_context(|| format!("invalid schema entry for `{}`", name))?;
        columns.push(Column {
            name,
            old_name: entry.old_name,
            data_type: entry.data_type,
        });
    }

    Ok(TableSchema::new(columns))
}
