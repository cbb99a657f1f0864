// src/error.rs

/// Fatal conditions raised by the adjustment stages.
///
/// Missing neighbour values are never errors; they flow through the engine
/// as absent imputations and zero corrections.
#[derive(Debug, thiserror::Error)]
pub enum AdjustError {
    #[error("Duplicate years found in year column within area {area_code}: {years:?}")]
    DuplicateYears { area_code: String, years: Vec<i32> },

    #[error("Year {year} in year column is out of valid range {start_year}-{end_year}.")]
    YearOutOfRange {
        year: i32,
        start_year: i32,
        end_year: i32,
    },

    #[error("Cannot convert value {token:?} to a year in cell {cell:?}")]
    YearParse { token: String, cell: String },

    #[error("Missing expected column: {0}")]
    MissingColumn(String),

    #[error("Column '{column}' does not match expected type {expected}")]
    ColumnType { column: String, expected: String },

    #[error("Number of rows to adjust between analyst and {table} data do not match ({analyst} vs {joined}).")]
    AdjustCountMismatch {
        table: String,
        analyst: usize,
        joined: usize,
    },

    #[error("Number of rows of {table} data after join has increased ({before} -> {after}).")]
    RowCountGrowth {
        table: String,
        before: usize,
        after: usize,
    },

    #[error("{field} '{code}' not found in data.")]
    UnknownComponent { field: String, code: String },

    #[error("Missing constrained value for area {area_code} in {year}")]
    MissingConstrainedValue { area_code: String, year: i32 },

    #[error("Invalid value {value:?} in column '{column}': {reason}")]
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },

    #[error(
        "Aggregate not preserved for {parent_code} in {year}: before {before}, after {after}"
    )]
    AggregateMismatch {
        parent_code: String,
        year: i32,
        before: f64,
        after: f64,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type AdjustResult<T> = std::result::Result<T, AdjustError>;
