// src/adjustment/filter.rs

use tracing::info;

use super::model::{cols, YearRange};
use crate::{
    config::ComponentFilter,
    error::{AdjustError, AdjustResult},
    frame::{Frame, Value},
};

/// Analyst rows marked for adjustment, projected to the join columns.
pub fn filter_flagged(frame: &Frame) -> AdjustResult<Frame> {
    let adjust_i = frame.column_index(cols::ADJUST)?;
    let out = frame
        .clone()
        .filter(|r| r[adjust_i].as_bool().unwrap_or(false))
        .select(&[cols::LSOA_CODE, cols::LAD_CODE, cols::ADJUST, cols::YEAR_TO_ADJUST])?;
    info!(before = frame.len(), after = out.len(), "kept rows flagged for adjustment");
    Ok(out)
}

/// Rows whose `year` lies in `range` (inclusive).
pub fn filter_year(frame: Frame, range: YearRange) -> AdjustResult<Frame> {
    let year_i = frame.column_index(cols::YEAR)?;
    let before = frame.len();
    let out = frame.filter(|r| {
        r[year_i]
            .as_i64()
            .is_some_and(|y| range.contains(y as i32))
    });
    info!(before, after = out.len(), start = range.start, end = range.end, "filtered by year");
    Ok(out)
}

/// Rows matching all three component codes.
///
/// Each code must occur somewhere in its column, otherwise the filter is
/// rejected before any row is dropped.
pub fn filter_component(frame: Frame, filter: &ComponentFilter) -> AdjustResult<Frame> {
    let checks = [
        (cols::SAS_CODE, "SAS code", filter.sas_code.as_str()),
        (cols::CORD_CODE, "CORD code", filter.cord_code.as_str()),
        (cols::CREDIT_DEBIT, "Credit/Debit code", filter.credit_debit.as_str()),
    ];

    let mut idxs = Vec::with_capacity(checks.len());
    for (column, label, code) in checks {
        let i = frame.column_index(column)?;
        if !frame.rows().iter().any(|r| matches_code(&r[i], code)) {
            return Err(AdjustError::UnknownComponent {
                field: label.to_string(),
                code: code.to_string(),
            });
        }
        idxs.push((i, code));
    }

    let before = frame.len();
    let out = frame.filter(|r| idxs.iter().all(|(i, code)| matches_code(&r[*i], code)));
    info!(before, after = out.len(), "filtered by component");
    Ok(out)
}

fn matches_code(v: &Value, code: &str) -> bool {
    !v.is_null() && v.to_string() == code
}
