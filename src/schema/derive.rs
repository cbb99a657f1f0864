// src/schema/derive.rs

//! Fallback typing for columns a schema does not declare (the per-year
//! value columns of the wide tables).

use tracing::{debug, warn};

use super::types::DataType;

const SAMPLE_LIMIT: usize = 1_000;

/// Look through up to the first 1 000 non-empty cells of a column and pick
/// `float` when numeric samples outnumber the rest, otherwise `str`.
///
/// Stray tokens in a numeric column are warned about here and become nulls
/// when the column is coerced.
pub fn derive_type<'a, I>(column: &str, cells: I) -> DataType
where
    I: IntoIterator<Item = &'a str>,
{
    let (mut numeric, mut other) = (0usize, 0usize);
    let mut first_bad: Option<&str> = None;
    for cell in cells {
        let v = cell.trim();
        if v.is_empty() {
            continue;
        }
        if numeric + other >= SAMPLE_LIMIT {
            break;
        }

        if infer_type(v) == DataType::Float {
            numeric += 1;
        } else {
            other += 1;
            if first_bad.is_none() {
                first_bad = Some(v);
            }
        }
    }

    if numeric + other == 0 {
        warn!("derive_type: no non-empty sample for `{}`, defaulting to str", column);
        return DataType::Str;
    }
    if numeric <= other {
        debug!("derive_type: column `{}` is mostly non-numeric", column);
        return DataType::Str;
    }
    if let Some(bad) = first_bad {
        warn!(
            "derive_type: column `{}` typed float despite {} non-numeric sample(s), first {:?}",
            column, other, bad
        );
    }
    DataType::Float
}

fn infer_type(raw: &str) -> DataType {
    // strip wrapping quotes
    let v = raw.trim().trim_matches('"');
    if v.parse::<f64>().is_ok_and(f64::is_finite) {
        DataType::Float
    } else {
        DataType::Str
    }
}
