// src/tables/read.rs

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{fs::File, io::BufReader, path::Path};
use tracing::{debug, info, warn};

use super::utils::clean_str;
use crate::{
    error::AdjustError,
    frame::{Frame, Value},
    schema::{derive_type, DataType, TableSchema},
};

#[derive(Debug)]
pub struct RawTable {
    /// Column names as found in the file header.
    pub headers: Vec<String>,
    /// Each data row, as a Vec of Strings (one per field).
    pub rows: Vec<Vec<String>>,
}

/// Read a headed CSV file into memory without interpreting any cell.
pub fn read_raw_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header of {:?}", path))?
        .iter()
        .map(clean_str)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {:?} at record {}", path, idx))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Read a CSV file and shape it with `schema`.
///
/// 1) every schema column is looked up by `old_name` and renamed to its
///    canonical name (a missing column is fatal);
/// 2) schema columns are coerced to their declared type, other columns get a
///    sampled type (`float` if numeric, else `str`);
/// 3) cells that fail coercion become `Null`, with one warning per column.
#[tracing::instrument(level = "info", skip(path, schema), fields(path = %path.as_ref().display()))]
pub fn read_with_schema<P: AsRef<Path>>(path: P, schema: &TableSchema) -> Result<Frame> {
    info!("loading data");
    let raw = read_raw_csv(&path)?;
    let frame = apply_schema(raw, schema)?;
    info!(rows = frame.len(), columns = frame.headers().len(), "data loaded successfully");
    Ok(frame)
}

/// Rename and coerce an in-memory table according to `schema`.
pub fn apply_schema(raw: RawTable, schema: &TableSchema) -> Result<Frame> {
    let RawTable { mut headers, rows } = raw;

    // 1) rename old → canonical
    for col in &schema.columns {
        let idx = headers
            .iter()
            .position(|h| *h == col.old_name)
            .ok_or_else(|| AdjustError::MissingColumn(col.old_name.clone()))?;
        if headers[idx] != col.name {
            debug!("renamed column '{}' to '{}'", col.old_name, col.name);
            headers[idx] = col.name.clone();
        }
    }

    // 2) pick a type per column
    let types: Vec<DataType> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| match schema.get(name) {
            Some(col) => col.data_type,
            None => derive_type(name, rows.iter().filter_map(|r| r.get(i).map(String::as_str))),
        })
        .collect();

    // 3) coerce every cell
    let mut failures = vec![0usize; headers.len()];
    let mut out = Frame::new(headers.clone());
    for row in rows {
        let mut cells = Vec::with_capacity(headers.len());
        for (i, ty) in types.iter().enumerate() {
            let raw = row.get(i).map(String::as_str).unwrap_or("");
            let (value, failed) = coerce_cell(raw, *ty);
            if failed {
                failures[i] += 1;
            }
            cells.push(value);
        }
        out.push_row(cells)?;
    }

    for (i, n) in failures.iter().enumerate() {
        if *n > 0 {
            warn!(
                "failed to convert {} value(s) of column '{}' to {}; stored as null",
                n, headers[i], types[i]
            );
        }
    }

    Ok(out)
}

/// Convert one cell to `ty`. The flag is true when a non-empty cell could
/// not be converted; non-finite numbers count as unconvertible.
pub fn coerce_cell(raw: &str, ty: DataType) -> (Value, bool) {
    let v = clean_str(raw);
    if v.is_empty() || v.eq_ignore_ascii_case("nan") {
        return (Value::Null, false);
    }

    match ty {
        DataType::Str => (Value::Str(v), false),
        DataType::Float => match v.parse::<f64>() {
            Ok(x) if x.is_finite() => (Value::Float(x), false),
            _ => (Value::Null, true),
        },
        DataType::Int => match v.parse::<i64>() {
            Ok(i) => (Value::Int(i), false),
            Err(_) => match v.parse::<f64>() {
                Ok(x) if x.is_finite() && x.fract() == 0.0 => (Value::Int(x as i64), false),
                _ => (Value::Null, true),
            },
        },
        DataType::Bool => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => (Value::Bool(true), false),
            "false" | "0" | "no" => (Value::Bool(false), false),
            _ => (Value::Null, true),
        },
    }
}
