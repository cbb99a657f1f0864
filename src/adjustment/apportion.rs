// src/adjustment/apportion.rs

use std::collections::HashMap;
use tracing::{error, info};

use super::model::AdjustedRow;
use crate::error::{AdjustError, AdjustResult};

/// Largest absolute drift allowed between a group's original and final sums.
pub const AGGREGATE_TOLERANCE: f64 = 1e-6;

/// Spread each group's correction evenly over its members.
///
/// - `member_count` is the size of the (parent, year) group;
/// - `final_value` starts from the imputed value where there is one, else
///   the original, and adds `adjustment_total / member_count`;
/// - a row without a total keeps its base value exactly.
///
/// Fails with [`AdjustError::AggregateMismatch`] if any group's sum moves by
/// more than [`AGGREGATE_TOLERANCE`]. Output is stable-sorted by parent then
/// year.
#[tracing::instrument(level = "info", skip_all, fields(rows = rows.len()))]
pub fn apportion(mut rows: Vec<AdjustedRow>) -> AdjustResult<Vec<AdjustedRow>> {
    // 1) member counts
    let mut counts: HashMap<(String, i32), usize> = HashMap::new();
    for r in &rows {
        *counts
            .entry((r.row.parent_code.clone(), r.row.year))
            .or_default() += 1;
    }

    // 2) final values
    for r in rows.iter_mut() {
        let n = counts
            .get(&(r.row.parent_code.clone(), r.row.year))
            .copied()
            .unwrap_or(1);
        let base = r.imputed_value().unwrap_or(r.row.constrained_value);
        r.member_count = n;
        r.final_value = match r.adjustment_total {
            Some(total) => base + total / n as f64,
            None => base,
        };
    }

    // 3) aggregate gate
    check_aggregates(&rows)?;

    rows.sort_by(|a, b| {
        a.row
            .parent_code
            .cmp(&b.row.parent_code)
            .then(a.row.year.cmp(&b.row.year))
    });
    info!(groups = counts.len(), "adjustment apportioned");
    Ok(rows)
}

/// Compare Σ original against Σ final for every (parent, year) group.
///
/// A non-finite sum on either side is a mismatch.
pub fn check_aggregates(rows: &[AdjustedRow]) -> AdjustResult<()> {
    let mut sums: HashMap<(&str, i32), (f64, f64)> = HashMap::new();
    for r in rows {
        let s = sums.entry((r.row.parent_code.as_str(), r.row.year)).or_default();
        s.0 += r.row.constrained_value;
        s.1 += r.final_value;
    }

    let mut groups: Vec<_> = sums.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    for ((parent_code, year), (before, after)) in groups {
        let drift = (before - after).abs();
        if drift.is_nan() || drift > AGGREGATE_TOLERANCE {
            error!(parent = parent_code, year, before, after, "aggregate not preserved");
            return Err(AdjustError::AggregateMismatch {
                parent_code: parent_code.to_string(),
                year,
                before,
                after,
            });
        }
    }
    Ok(())
}
