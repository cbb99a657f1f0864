// src/adjustment/model.rs

//! Typed rows for the long-format stages, and their conversion to and from
//! [`Frame`].

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use crate::{
    error::{AdjustError, AdjustResult},
    frame::{Frame, Value, YearSet},
};

/// Canonical column names shared by the schemas and the stages.
pub mod cols {
    pub const LSOA_CODE: &str = "lsoa_code";
    pub const LSOA_NAME: &str = "lsoa_name";
    pub const LAD_CODE: &str = "lad_code";
    pub const LAD_NAME: &str = "lad_name";
    pub const ADJUST: &str = "adjust";
    pub const YEAR_TO_ADJUST: &str = "year_to_adjust";
    pub const YEAR: &str = "year";
    pub const UNCON_GDHI: &str = "uncon_gdhi";
    pub const CON_GDHI: &str = "con_gdhi";
    pub const CON_PREFIX: &str = "CON_";
    pub const PREV_SAFE_YEAR: &str = "prev_safe_year";
    pub const PREV_CON_GDHI: &str = "prev_con_gdhi";
    pub const NEXT_SAFE_YEAR: &str = "next_safe_year";
    pub const NEXT_CON_GDHI: &str = "next_con_gdhi";
    pub const IMPUTED_GDHI: &str = "imputed_gdhi";
    pub const IMPUTE_METHOD: &str = "impute_method";
    pub const IMPUTED_DIFF: &str = "imputed_diff";
    pub const ADJUSTMENT_VAL: &str = "adjustment_val";
    pub const LSOA_COUNT: &str = "lsoa_count";
    pub const ADJUSTED_CON_GDHI: &str = "adjusted_con_gdhi";
    pub const SAS_CODE: &str = "sas_code";
    pub const CORD_CODE: &str = "cord_code";
    pub const CREDIT_DEBIT: &str = "credit_debit";

    /// Identifies one small area in both input tables.
    pub const AREA_IDS: [&str; 4] = [LSOA_CODE, LSOA_NAME, LAD_CODE, LAD_NAME];
}

/// Replacement policy for a flagged value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputeMethod {
    /// Mean of the two adjacent years.
    Midpoint,
    /// Linear interpolation between the nearest safe years, or extrapolation
    /// from one side when the other is unavailable.
    #[default]
    Interpolation,
}

impl ImputeMethod {
    pub fn as_str(&self) -> &str {
        match self {
            ImputeMethod::Midpoint => "midpoint",
            ImputeMethod::Interpolation => "interpolation",
        }
    }
}

impl fmt::Display for ImputeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive range of years under adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    /// Lowest year the backward safe-year walk may reach.
    pub fn backward_bound(&self) -> i32 {
        self.start - 1
    }

    /// Highest year the forward safe-year walk may reach.
    pub fn forward_bound(&self) -> i32 {
        self.end + 1
    }
}

/// One observation for one small area in one year.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesRow {
    pub area_code: String,
    pub area_name: String,
    pub parent_code: String,
    pub parent_name: String,
    pub year: i32,
    pub raw_value: Option<f64>,
    pub constrained_value: f64,
    pub flagged_years: YearSet,
}

impl TimeSeriesRow {
    pub fn is_flagged(&self) -> bool {
        self.flagged_years.contains(&self.year)
    }
}

/// A flagged (area, year) pair, borrowed from the table it was found in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anomaly<'a> {
    pub area_code: &'a str,
    pub year: i32,
    pub original: f64,
    pub flagged_years: &'a YearSet,
}

/// Every flagged row, ordered by area code then year.
pub fn anomalies(rows: &[TimeSeriesRow]) -> Vec<Anomaly<'_>> {
    let mut out: Vec<Anomaly<'_>> = rows
        .iter()
        .filter(|r| r.is_flagged())
        .map(|r| Anomaly {
            area_code: &r.area_code,
            year: r.year,
            original: r.constrained_value,
            flagged_years: &r.flagged_years,
        })
        .collect();
    out.sort_by(|a, b| a.area_code.cmp(b.area_code).then(a.year.cmp(&b.year)));
    out
}

/// Read-only snapshot of constrained values, keyed by area then year.
///
/// Built once before imputation; no imputed value is ever written back.
#[derive(Debug, Default)]
pub struct Lookup<'a> {
    values: HashMap<&'a str, BTreeMap<i32, f64>>,
}

impl<'a> Lookup<'a> {
    pub fn build(rows: &'a [TimeSeriesRow]) -> Self {
        let mut values: HashMap<&'a str, BTreeMap<i32, f64>> = HashMap::new();
        for r in rows {
            values
                .entry(r.area_code.as_str())
                .or_default()
                .insert(r.year, r.constrained_value);
        }
        Self { values }
    }

    pub fn get(&self, area_code: &str, year: i32) -> Option<f64> {
        self.values
            .get(area_code)
            .and_then(|years| years.get(&year))
            .copied()
            .filter(|v| v.is_finite())
    }
}

/// One anomaly after imputation, kept for audit.
#[derive(Clone, Debug, PartialEq)]
pub struct ImputedRow {
    pub area_code: String,
    pub year: i32,
    pub original: f64,
    pub flagged_years: YearSet,
    pub prev_safe_year: i32,
    pub prev_value: Option<f64>,
    pub next_safe_year: i32,
    pub next_value: Option<f64>,
    pub imputed: Option<f64>,
    pub method: ImputeMethod,
}

impl ImputedRow {
    /// `original − imputed`, absent when nothing could be imputed.
    pub fn diff(&self) -> Option<f64> {
        self.imputed.map(|v| self.original - v)
    }
}

/// Total correction needed for one (parent, year) group.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectionRecord {
    pub parent_code: String,
    pub year: i32,
    pub total_diff: f64,
}

/// A time-series row carrying its imputation audit and correction columns.
#[derive(Clone, Debug, PartialEq)]
pub struct AdjustedRow {
    pub row: TimeSeriesRow,
    pub imputation: Option<ImputedRow>,
    pub imputed_diff: Option<f64>,
    pub adjustment_total: Option<f64>,
    pub member_count: usize,
    pub final_value: f64,
}

impl AdjustedRow {
    /// A row before aggregation: no correction, final value unchanged.
    pub fn unadjusted(row: TimeSeriesRow) -> Self {
        let final_value = row.constrained_value;
        Self {
            row,
            imputation: None,
            imputed_diff: None,
            adjustment_total: None,
            member_count: 0,
            final_value,
        }
    }

    pub fn imputed_value(&self) -> Option<f64> {
        self.imputation.as_ref().and_then(|i| i.imputed)
    }
}

/// Convert the long table into typed rows.
///
/// `con_gdhi` must be present and finite on every row and each (area, year)
/// may occur only once.
pub fn rows_from_long(frame: &Frame) -> AdjustResult<Vec<TimeSeriesRow>> {
    let idx = |name: &str| frame.column_index(name);
    let (code_i, name_i, parent_i, parent_name_i) = (
        idx(cols::LSOA_CODE)?,
        idx(cols::LSOA_NAME)?,
        idx(cols::LAD_CODE)?,
        idx(cols::LAD_NAME)?,
    );
    let (year_i, raw_i, con_i, flags_i) = (
        idx(cols::YEAR)?,
        idx(cols::UNCON_GDHI)?,
        idx(cols::CON_GDHI)?,
        idx(cols::YEAR_TO_ADJUST)?,
    );

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(frame.len());
    for row in frame.rows() {
        let area_code = text(&row[code_i]);
        let year = row[year_i]
            .as_i64()
            .ok_or_else(|| AdjustError::InvalidValue {
                column: cols::YEAR.to_string(),
                value: row[year_i].to_string(),
                reason: "expected an integer year".to_string(),
            })? as i32;

        if !seen.insert((area_code.clone(), year)) {
            return Err(AdjustError::InvalidValue {
                column: cols::YEAR.to_string(),
                value: year.to_string(),
                reason: format!("more than one row for area {}", area_code),
            });
        }

        let constrained_value =
            row[con_i]
                .as_f64()
                .ok_or_else(|| AdjustError::MissingConstrainedValue {
                    area_code: area_code.clone(),
                    year,
                })?;
        if !constrained_value.is_finite() {
            return Err(AdjustError::InvalidValue {
                column: cols::CON_GDHI.to_string(),
                value: constrained_value.to_string(),
                reason: format!("non-finite value for area {} in {}", area_code, year),
            });
        }

        let flagged_years = match &row[flags_i] {
            Value::Years(ys) => ys.clone(),
            v if v.is_null() => YearSet::new(),
            other => {
                return Err(AdjustError::InvalidValue {
                    column: cols::YEAR_TO_ADJUST.to_string(),
                    value: other.to_string(),
                    reason: "expected a parsed year list".to_string(),
                })
            }
        };

        out.push(TimeSeriesRow {
            area_name: text(&row[name_i]),
            parent_code: text(&row[parent_i]),
            parent_name: text(&row[parent_name_i]),
            year,
            raw_value: row[raw_i].as_f64(),
            constrained_value,
            flagged_years,
            area_code,
        });
    }
    Ok(out)
}

fn text(v: &Value) -> String {
    if v.is_null() {
        String::new()
    } else {
        v.to_string()
    }
}

/// Column order of the interim table.
pub const INTERIM_COLUMNS: [&str; 18] = [
    cols::LSOA_CODE,
    cols::LSOA_NAME,
    cols::LAD_CODE,
    cols::LAD_NAME,
    cols::YEAR,
    cols::UNCON_GDHI,
    cols::CON_GDHI,
    cols::YEAR_TO_ADJUST,
    cols::PREV_SAFE_YEAR,
    cols::PREV_CON_GDHI,
    cols::NEXT_SAFE_YEAR,
    cols::NEXT_CON_GDHI,
    cols::IMPUTED_GDHI,
    cols::IMPUTE_METHOD,
    cols::IMPUTED_DIFF,
    cols::ADJUSTMENT_VAL,
    cols::LSOA_COUNT,
    cols::ADJUSTED_CON_GDHI,
];

/// Lay the adjusted rows out as the interim long table.
pub fn adjusted_to_frame(rows: &[AdjustedRow]) -> AdjustResult<Frame> {
    let mut frame = Frame::new(INTERIM_COLUMNS);
    for r in rows {
        let imp = r.imputation.as_ref();
        let flags = if r.row.flagged_years.is_empty() {
            Value::Null
        } else {
            Value::Years(r.row.flagged_years.clone())
        };
        let cells = vec![
            r.row.area_code.as_str().into(),
            r.row.area_name.as_str().into(),
            r.row.parent_code.as_str().into(),
            r.row.parent_name.as_str().into(),
            Value::Int(r.row.year as i64),
            r.row.raw_value.into(),
            r.row.constrained_value.into(),
            flags,
            imp.map(|i| i.prev_safe_year as i64).into(),
            imp.and_then(|i| i.prev_value).into(),
            imp.map(|i| i.next_safe_year as i64).into(),
            imp.and_then(|i| i.next_value).into(),
            r.imputed_value().into(),
            imp.map(|i| i.method.as_str()).into(),
            r.imputed_diff.into(),
            r.adjustment_total.into(),
            Value::Int(r.member_count as i64),
            r.final_value.into(),
        ];
        frame.push_row(cells)?;
    }
    Ok(frame)
}
