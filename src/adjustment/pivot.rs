// src/adjustment/pivot.rs

use tracing::debug;

use super::model::cols;
use crate::{
    error::{AdjustError, AdjustResult},
    frame::{
        pivot::{melt, pivot_wide},
        Frame, Value,
    },
    tables::utils::is_year_column,
};

/// Columns carried through the wide→long reshape.
const LONG_IDS: [&str; 6] = [
    cols::LSOA_CODE,
    cols::LSOA_NAME,
    cols::LAD_CODE,
    cols::LAD_NAME,
    cols::ADJUST,
    cols::YEAR_TO_ADJUST,
];

/// Melt the joined wide table into one row per (area, year).
///
/// Raw year columns (`2002`, ...) become `uncon_gdhi`, `CON_` columns become
/// `con_gdhi`; the two are matched on the id columns and year.
pub fn pivot_adjustment_long(frame: &Frame) -> AdjustResult<Frame> {
    let uncon_cols: Vec<&str> = frame
        .headers()
        .iter()
        .map(String::as_str)
        .filter(|h| is_year_column(h))
        .collect();
    let con_cols: Vec<&str> = frame
        .headers()
        .iter()
        .map(String::as_str)
        .filter(|h| h.starts_with(cols::CON_PREFIX))
        .collect();

    let uncon = melt(frame, &LONG_IDS, &uncon_cols, cols::YEAR, cols::UNCON_GDHI)?;
    let mut con = melt(frame, &LONG_IDS, &con_cols, cols::YEAR, cols::CON_GDHI)?;
    con.map_column(cols::YEAR, |v| {
        Ok(match v {
            Value::Str(s) => Value::Str(s.trim_start_matches(cols::CON_PREFIX).to_string()),
            other => other.clone(),
        })
    })?;

    let on: Vec<&str> = LONG_IDS.iter().copied().chain([cols::YEAR]).collect();
    let mut long = uncon.left_join(&con, &on)?;
    long.map_column(cols::YEAR, |v| {
        let text = v.to_string();
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| AdjustError::InvalidValue {
                column: cols::YEAR.to_string(),
                value: text.clone(),
                reason: "year column header is not an integer".to_string(),
            })
    })?;

    debug!(rows = long.len(), years = uncon_cols.len(), "pivoted to long format");
    Ok(long)
}

/// Pivot adjusted values back to one column per year.
pub fn pivot_wide_final(long: &Frame) -> AdjustResult<Frame> {
    pivot_wide(long, &cols::AREA_IDS, cols::YEAR, cols::ADJUSTED_CON_GDHI)
}
