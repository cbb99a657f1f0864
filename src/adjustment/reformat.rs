// src/adjustment/reformat.rs

use std::collections::BTreeSet;
use tracing::debug;

use super::model::{cols, YearRange};
use crate::{
    error::{AdjustError, AdjustResult},
    frame::{Frame, Value},
};

/// The shapes a year-list cell can arrive in.
#[derive(Clone, Debug, PartialEq)]
pub enum YearCell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<YearCell>),
}

impl From<&Value> for YearCell {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => YearCell::Empty,
            Value::Int(i) => YearCell::Int(*i),
            Value::Float(f) if f.is_nan() => YearCell::Empty,
            Value::Float(f) => YearCell::Float(*f),
            Value::Str(s) => YearCell::Text(s.clone()),
            Value::Bool(b) => YearCell::Text(b.to_string()),
            Value::Years(ys) => YearCell::List(ys.iter().map(|y| YearCell::Int(*y as i64)).collect()),
        }
    }
}

/// Parse a year-list cell, keeping order and duplicates.
///
/// `"2003, 2004"`, `"[2003,2004]"`, `2003`, `2003.0` and lists of those are
/// all accepted. Empty cells and `"nan"` give an empty list.
pub fn to_year_list(cell: &YearCell) -> AdjustResult<Vec<i32>> {
    match cell {
        YearCell::Empty => Ok(Vec::new()),
        YearCell::Int(i) => Ok(vec![*i as i32]),
        YearCell::Float(f) if f.is_nan() => Ok(Vec::new()),
        YearCell::Float(f) => Ok(vec![f.trunc() as i32]),
        YearCell::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("nan") {
                return Ok(Vec::new());
            }
            let inner = s.trim_start_matches('[').trim_end_matches(']');
            inner
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| parse_token(t, s))
                .collect()
        }
        YearCell::List(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(to_year_list(item)?);
            }
            Ok(out)
        }
    }
}

fn parse_token(token: &str, cell: &str) -> AdjustResult<i32> {
    let token = token.trim_matches(|c| c == '\'' || c == '"');
    if let Ok(i) = token.parse::<i32>() {
        return Ok(i);
    }
    match token.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f.trunc() as i32),
        _ => Err(AdjustError::YearParse {
            token: token.to_string(),
            cell: cell.to_string(),
        }),
    }
}

/// `adjust` becomes `true` only for a boolean true or the text "TRUE".
pub fn reformat_adjust_col(frame: &mut Frame) -> AdjustResult<()> {
    frame.map_column(cols::ADJUST, |v| {
        let flag = match v {
            Value::Bool(b) => *b,
            Value::Str(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        };
        Ok(Value::Bool(flag))
    })
}

/// Parse `year_to_adjust` into year sets and validate them.
///
/// Fails on a year listed twice for one area or a year outside `range`.
pub fn reformat_year_col(frame: &mut Frame, range: YearRange) -> AdjustResult<()> {
    let code_i = frame.column_index(cols::LSOA_CODE)?;
    let years_i = frame.column_index(cols::YEAR_TO_ADJUST)?;

    let mut parsed = Vec::with_capacity(frame.len());
    for row in frame.rows() {
        let years = to_year_list(&YearCell::from(&row[years_i]))?;
        let area_code = row[code_i].to_string();

        let set: BTreeSet<i32> = years.iter().copied().collect();
        if set.len() != years.len() {
            let mut dups: Vec<i32> = years
                .iter()
                .filter(|y| years.iter().filter(|z| z == y).count() > 1)
                .copied()
                .collect();
            dups.sort_unstable();
            dups.dedup();
            return Err(AdjustError::DuplicateYears { area_code, years: dups });
        }
        if let Some(&year) = set.iter().find(|y| !range.contains(**y)) {
            return Err(AdjustError::YearOutOfRange {
                year,
                start_year: range.start,
                end_year: range.end,
            });
        }

        parsed.push(if set.is_empty() { Value::Null } else { Value::Years(set) });
    }

    debug!(rows = parsed.len(), "parsed year_to_adjust");
    frame.set_column(cols::YEAR_TO_ADJUST, parsed)
}
