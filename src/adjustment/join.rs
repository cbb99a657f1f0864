// src/adjustment/join.rs

use tracing::info;

use super::model::cols;
use crate::{
    error::{AdjustError, AdjustResult},
    frame::{Frame, Value},
    tables::utils::is_year_column,
};

/// Attach the analyst flags to the constrained table and prefix its year
/// columns with `CON_`.
///
/// Fails if the join loses or duplicates flagged rows, or grows the table.
pub fn join_analyst_constrained(constrained: &Frame, analyst: &Frame) -> AdjustResult<Frame> {
    let mut joined = constrained.left_join(analyst, &[cols::LSOA_CODE, cols::LAD_CODE])?;
    joined.rename_with(|h| is_year_column(h).then(|| format!("{}{}", cols::CON_PREFIX, h)));

    check_join("constrained", analyst, constrained, &joined)?;
    info!(rows = joined.len(), "joined analyst flags onto constrained data");
    Ok(joined)
}

/// Attach the constrained columns and analyst flags to the unconstrained
/// table. Rows without a flag get `adjust = false`.
pub fn join_analyst_unconstrained(unconstrained: &Frame, joined: &Frame) -> AdjustResult<Frame> {
    let mut out = unconstrained.left_join(joined, &cols::AREA_IDS)?;
    out.map_column(cols::ADJUST, |v| Ok(Value::Bool(v.as_bool().unwrap_or(false))))?;

    check_join("unconstrained", joined, unconstrained, &out)?;
    info!(rows = out.len(), "joined unconstrained data");
    Ok(out)
}

fn check_join(table: &str, analyst: &Frame, base: &Frame, joined: &Frame) -> AdjustResult<()> {
    let expected = count_adjust(analyst)?;
    let found = count_adjust(joined)?;
    if expected != found {
        return Err(AdjustError::AdjustCountMismatch {
            table: table.to_string(),
            analyst: expected,
            joined: found,
        });
    }
    if joined.len() != base.len() {
        return Err(AdjustError::RowCountGrowth {
            table: table.to_string(),
            before: base.len(),
            after: joined.len(),
        });
    }
    Ok(())
}

fn count_adjust(frame: &Frame) -> AdjustResult<usize> {
    Ok(frame
        .column(cols::ADJUST)?
        .into_iter()
        .filter(|v| v.as_bool() == Some(true))
        .count())
}
