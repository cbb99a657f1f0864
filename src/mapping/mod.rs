// src/mapping/mod.rs

//! Remap Scottish LAU-coded rows onto LAD codes.
//!
//! English data already carries LAD codes and passes through untouched. Data
//! whose LAD column holds `S30…` codes is joined to an LAU→LAD lookup and can
//! optionally be summed up to LAD level.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::HashMap, path::Path};
use tracing::{info, warn};

use crate::{
    config::MappingSettings,
    error::AdjustResult,
    frame::{row_key_at, Frame, Value},
    schema::{load_schema, TableSchema},
    tables::{read_with_schema, write_with_schema, OutputFormat},
};

/// Year value columns: four digits starting with 1 or 2.
static YEAR_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[12]\d{3}$").expect("year column pattern is valid"));

pub const DATA_LAU_CODE: &str = "data_lau_code";
pub const DATA_LAU_NAME: &str = "data_lau_name";
pub const MAPPER_LAD_CODE: &str = "mapper_lad_code";
pub const MAPPER_LAD_NAME: &str = "mapper_lad_name";
pub const MAPPER_LAU_CODE: &str = "mapper_lau_code";
pub const MAPPER_LAU_NAME: &str = "mapper_lau_name";

pub fn is_year_value_column(name: &str) -> bool {
    YEAR_COLUMN.is_match(name)
}

/// Rename the LAD columns to LAU columns if any code starts with `S30`.
///
/// Returns whether mapping is needed.
pub fn rename_s30_to_lau(frame: &mut Frame, settings: &MappingSettings) -> AdjustResult<bool> {
    if !frame.has_column(&settings.data_lad_code) {
        info!(column = %settings.data_lad_code, "no LAD code column; mapping not needed");
        return Ok(false);
    }

    let has_s30 = frame
        .column(&settings.data_lad_code)?
        .iter()
        .any(|v| v.to_string().starts_with("S30"));
    if !has_s30 {
        info!("no S30 codes detected in LAD code column");
        return Ok(false);
    }

    info!(
        "detected S30 codes; renaming {} and {} to LAU columns",
        settings.data_lad_code, settings.data_lad_name
    );
    frame.rename(&settings.data_lad_code, DATA_LAU_CODE)?;
    frame.rename(&settings.data_lad_name, DATA_LAU_NAME)?;
    Ok(true)
}

/// Keep the four lookup columns, one row per distinct mapping.
pub fn clean_mapper(mapper: &Frame) -> AdjustResult<Frame> {
    Ok(mapper
        .select(&[MAPPER_LAD_CODE, MAPPER_LAD_NAME, MAPPER_LAU_CODE, MAPPER_LAU_NAME])?
        .distinct())
}

/// Left-join the lookup on LAU code, then drop the LAU columns.
pub fn join_mapper(frame: &Frame, mapper: &Frame) -> AdjustResult<Frame> {
    let mut keyed = mapper.clone();
    keyed.rename(MAPPER_LAU_CODE, DATA_LAU_CODE)?;

    let joined = frame.left_join(&keyed, &[DATA_LAU_CODE])?;
    let unmapped = joined
        .column(MAPPER_LAD_CODE)?
        .iter()
        .filter(|v| v.is_null())
        .count();
    if unmapped > 0 {
        warn!(rows = unmapped, "rows without a LAD after mapping");
    }
    Ok(joined.drop_columns(&[DATA_LAU_CODE, DATA_LAU_NAME, MAPPER_LAU_NAME]))
}

/// Sum the year columns over every other column, in first-seen group order.
///
/// Null cells count as zero.
pub fn aggregate_lad(frame: &Frame) -> AdjustResult<Frame> {
    let value_idx: Vec<usize> = (0..frame.headers().len())
        .filter(|&i| is_year_value_column(&frame.headers()[i]))
        .collect();
    let key_idx: Vec<usize> = (0..frame.headers().len())
        .filter(|i| !value_idx.contains(i))
        .collect();

    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Vec<f64>)> = Vec::new();
    for row in frame.rows() {
        let key = row_key_at(row, &key_idx);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push((
                key_idx.iter().map(|&i| row[i].clone()).collect(),
                vec![0.0; value_idx.len()],
            ));
            groups.len() - 1
        });
        for (acc, &i) in groups[slot].1.iter_mut().zip(&value_idx) {
            *acc += row[i].as_f64().unwrap_or(0.0);
        }
    }

    let headers: Vec<String> = key_idx
        .iter()
        .chain(&value_idx)
        .map(|&i| frame.headers()[i].clone())
        .collect();
    let rows = groups
        .into_iter()
        .map(|(mut keys, sums)| {
            keys.extend(sums.into_iter().map(Value::Float));
            keys
        })
        .collect();
    info!(groups = slots.len(), "aggregated data to LAD level");
    Frame::from_rows(headers, rows)
}

/// Put the LAD columns back under their original names and order.
pub fn restore_columns(
    mut frame: Frame,
    settings: &MappingSettings,
    original: &[String],
) -> AdjustResult<Frame> {
    frame.rename(MAPPER_LAD_CODE, &settings.data_lad_code)?;
    frame.rename(MAPPER_LAD_NAME, &settings.data_lad_name)?;
    let cols: Vec<&str> = original.iter().map(String::as_str).collect();
    frame.select(&cols)
}

/// Read the configured data file.
pub fn load_data(settings: &MappingSettings) -> Result<Frame> {
    let path = Path::new(&settings.data_dir).join(&settings.data_file);
    info!(path = %path.display(), "reading data to map");
    read_with_schema(&path, &TableSchema::default())
}

/// Map `frame` from LAU to LAD codes and write the result.
///
/// Returns the input unchanged (and writes nothing) when no S30 codes are
/// present.
#[tracing::instrument(level = "info", skip_all)]
pub fn lau_lad_main(settings: &MappingSettings, schema_dir: &Path, mut frame: Frame) -> Result<Frame> {
    let original: Vec<String> = frame.headers().to_vec();

    if !rename_s30_to_lau(&mut frame, settings)? {
        info!("mapping LAUs to LADs not needed; returning input");
        return Ok(frame);
    }

    // 1) lookup
    let mapper_path = Path::new(&settings.mapper_dir).join(&settings.lau_lad_file);
    let schema = load_schema(schema_dir.join(&settings.lau_lad_schema_name))?;
    info!(path = %mapper_path.display(), "loading LAU to LAD mapping");
    let mapper = clean_mapper(&read_with_schema(&mapper_path, &schema)?)?;

    // 2) join + optional aggregate
    let mut result = join_mapper(&frame, &mapper)?;
    if settings.aggregate_to_lad {
        result = aggregate_lad(&result)?;
    } else {
        info!("aggregation to LAD not requested");
    }
    let result = restore_columns(result, settings, &original)?;

    // 3) persist
    let out = Path::new(&settings.output_dir).join(&settings.output_file);
    write_with_schema(result.clone(), &TableSchema::default(), &out, OutputFormat::Csv)
        .with_context(|| format!("writing mapped output {:?}", out))?;
    info!(rows = result.len(), "completed mapping LAUs to LADs");
    Ok(result)
}
