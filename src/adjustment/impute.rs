// src/adjustment/impute.rs

use rayon::prelude::*;
use tracing::{debug, info};

use super::{
    locate::{find_safe_year, Direction},
    model::{Anomaly, ImputeMethod, ImputedRow, Lookup, YearRange},
};

/// How replacements are computed, and the years the walk is confined to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImputePolicy {
    pub method: ImputeMethod,
    pub range: YearRange,
}

/// Compute the replacement for one anomaly from the snapshot.
///
/// A missing imputed value means no usable neighbour was found; it is not
/// an error.
pub fn impute(anomaly: &Anomaly<'_>, lookup: &Lookup<'_>, policy: &ImputePolicy) -> ImputedRow {
    match policy.method {
        ImputeMethod::Midpoint => midpoint(anomaly, lookup),
        ImputeMethod::Interpolation => interpolate(anomaly, lookup, &policy.range),
    }
}

fn midpoint(anomaly: &Anomaly<'_>, lookup: &Lookup<'_>) -> ImputedRow {
    let (prev_year, next_year) = (anomaly.year - 1, anomaly.year + 1);
    let prev = lookup.get(anomaly.area_code, prev_year);
    let next = lookup.get(anomaly.area_code, next_year);
    let imputed = match (prev, next) {
        (Some(p), Some(n)) => Some((p + n) / 2.0),
        _ => None,
    };
    audit_row(anomaly, ImputeMethod::Midpoint, (prev_year, prev), (next_year, next), imputed)
}

fn interpolate(anomaly: &Anomaly<'_>, lookup: &Lookup<'_>, range: &YearRange) -> ImputedRow {
    let area = anomaly.area_code;
    let year = anomaly.year;

    // 1) nearest unflagged neighbours, confined to [start-1, end+1]
    let prev_year = find_safe_year(year, anomaly.flagged_years, Direction::Backward, range.backward_bound());
    let next_year = find_safe_year(year, anomaly.flagged_years, Direction::Forward, range.forward_bound());
    let prev = lookup.get(area, prev_year);
    let next = lookup.get(area, next_year);

    // 2) interpolate between them, or extrapolate from whichever side exists
    let imputed = match (prev, next) {
        (Some(p), Some(n)) => {
            Some(p + (n - p) / f64::from(next_year - prev_year) * f64::from(year - prev_year))
        }
        (None, Some(n)) => extrapolation_reference(anomaly, lookup, next_year + 1)
            .map(|after| n + (after - n) * f64::from(year - next_year)),
        (Some(p), None) => extrapolation_reference(anomaly, lookup, prev_year - 1)
            .map(|before| p + (p - before) * f64::from(year - prev_year)),
        (None, None) => None,
    };

    audit_row(anomaly, ImputeMethod::Interpolation, (prev_year, prev), (next_year, next), imputed)
}

/// Second point of an extrapolation slope: the year just beyond the safe
/// neighbour, taken as stored even when the analyst flagged it.
fn extrapolation_reference(anomaly: &Anomaly<'_>, lookup: &Lookup<'_>, ref_year: i32) -> Option<f64> {
    let value = lookup.get(anomaly.area_code, ref_year);
    if value.is_some() && anomaly.flagged_years.contains(&ref_year) {
        debug!(
            area = anomaly.area_code,
            year = anomaly.year,
            ref_year,
            "extrapolation slope uses a flagged reference year"
        );
    }
    value
}

fn audit_row(
    anomaly: &Anomaly<'_>,
    method: ImputeMethod,
    (prev_safe_year, prev_value): (i32, Option<f64>),
    (next_safe_year, next_value): (i32, Option<f64>),
    imputed: Option<f64>,
) -> ImputedRow {
    ImputedRow {
        area_code: anomaly.area_code.to_string(),
        year: anomaly.year,
        original: anomaly.original,
        flagged_years: anomaly.flagged_years.clone(),
        prev_safe_year,
        prev_value,
        next_safe_year,
        next_value,
        imputed,
        method,
    }
}

/// Impute every anomaly in parallel against the same snapshot.
///
/// Output order matches `anomalies`.
#[tracing::instrument(level = "info", skip(anomalies, lookup), fields(anomalies = anomalies.len(), method = %policy.method))]
pub fn impute_all(anomalies: &[Anomaly<'_>], lookup: &Lookup<'_>, policy: &ImputePolicy) -> Vec<ImputedRow> {
    let rows: Vec<ImputedRow> = anomalies
        .par_iter()
        .map(|a| impute(a, lookup, policy))
        .collect();

    let missing = rows.iter().filter(|r| r.imputed.is_none()).count();
    for r in rows.iter().filter(|r| r.imputed.is_none()) {
        debug!(area = %r.area_code, year = r.year, "no neighbour value available; nothing imputed");
    }
    info!(imputed = rows.len() - missing, missing, "imputation finished");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::model::{anomalies, tests::ts, TimeSeriesRow};

    fn series(values: &[f64], flags: &[i32]) -> Vec<TimeSeriesRow> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ts("E1", "E01", 2002 + i as i32, *v, flags))
            .collect()
    }

    fn run(rows: &[TimeSeriesRow], method: ImputeMethod) -> Vec<ImputedRow> {
        let policy = ImputePolicy {
            method,
            range: YearRange::new(2002, 2005),
        };
        impute_all(&anomalies(rows), &Lookup::build(rows), &policy)
    }

    #[test]
    fn interpolates_across_flagged_run() {
        let rows = series(&[10.0, 8.0, 10.0, 16.0], &[2003, 2004]);
        let out = run(&rows, ImputeMethod::Interpolation);

        assert_eq!(out.len(), 2);
        assert_eq!((out[0].year, out[0].imputed), (2003, Some(12.0)));
        assert_eq!((out[1].year, out[1].imputed), (2004, Some(14.0)));
        assert_eq!((out[0].prev_safe_year, out[0].prev_value), (2002, Some(10.0)));
        assert_eq!((out[1].next_safe_year, out[1].next_value), (2005, Some(16.0)));
    }

    #[test]
    fn extrapolates_backwards_from_later_years() {
        let rows = series(&[35.0, 32.0, 24.0, 26.0], &[2002, 2003]);
        let out = run(&rows, ImputeMethod::Interpolation);

        assert_eq!(out[0].imputed, Some(20.0));
        assert_eq!(out[1].imputed, Some(22.0));
        assert_eq!((out[0].prev_safe_year, out[0].prev_value), (2001, None));
        assert_eq!((out[0].next_safe_year, out[0].next_value), (2004, Some(24.0)));
    }

    #[test]
    fn extrapolates_forwards_from_earlier_years() {
        let rows = series(&[10.0, 12.0, 14.0, 99.0], &[2005]);
        let out = run(&rows, ImputeMethod::Interpolation);

        assert_eq!(out[0].next_safe_year, 2006);
        assert_eq!(out[0].imputed, Some(16.0));
    }

    #[test]
    fn flagged_second_reference_still_sets_slope() {
        // 2005 is flagged but is the year just after the safe neighbour 2004
        let rows = series(&[40.0, 30.0, 20.0, 26.0, 24.0], &[2002, 2003, 2005]);
        let out = run(&rows, ImputeMethod::Interpolation);

        assert_eq!((out[0].year, out[0].imputed), (2002, Some(8.0)));
        assert_eq!((out[1].year, out[1].imputed), (2003, Some(14.0)));
        assert_eq!((out[2].year, out[2].imputed), (2005, Some(22.0)));
    }

    #[test]
    fn missing_second_reference_leaves_gap() {
        let rows = series(&[35.0, 32.0, 24.0], &[2002, 2003]);
        let out = run(&rows, ImputeMethod::Interpolation);
        assert!(out.iter().all(|r| r.imputed.is_none()));
        assert!(out.iter().all(|r| r.diff().is_none()));
    }

    #[test]
    fn no_neighbours_leaves_gap() {
        let rows = series(&[1.0, 2.0, 3.0, 4.0], &[2002, 2003, 2004, 2005]);
        let out = run(&rows, ImputeMethod::Interpolation);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|r| r.imputed.is_none()));
    }

    #[test]
    fn midpoint_uses_adjacent_years() {
        let rows = series(&[10.0, 50.0, 20.0, 16.0], &[2003]);
        let out = run(&rows, ImputeMethod::Midpoint);
        assert_eq!(out[0].imputed, Some(15.0));
        assert_eq!((out[0].prev_safe_year, out[0].next_safe_year), (2002, 2004));
        assert_eq!(out[0].method, ImputeMethod::Midpoint);
    }

    #[test]
    fn midpoint_at_edge_has_no_value() {
        let rows = series(&[10.0, 50.0, 20.0, 16.0], &[2002]);
        let out = run(&rows, ImputeMethod::Midpoint);
        assert_eq!(out[0].imputed, None);
    }

    #[test]
    fn imputation_reads_originals_not_replacements() {
        // 2003 and 2005 are flagged separately; 2004 sits between them
        let rows = series(&[10.0, 99.0, 20.0, 99.0], &[2003, 2005]);
        let out = run(&rows, ImputeMethod::Midpoint);
        assert_eq!(out[0].imputed, Some(15.0));
        assert_eq!(out[1].prev_value, Some(20.0));
    }
}
