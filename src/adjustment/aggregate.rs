// src/adjustment/aggregate.rs

use std::collections::HashMap;
use tracing::info;

use super::model::{AdjustedRow, CorrectionRecord, ImputedRow, TimeSeriesRow};

/// Attach each imputation to its row and broadcast the per-(parent, year)
/// correction total to every member of the group.
///
/// A row without an imputed value contributes nothing; a group with no
/// contributions gets a total of `0.0`.
#[tracing::instrument(level = "info", skip_all, fields(rows = table.len(), imputed = imputed.len()))]
pub fn aggregate(table: Vec<TimeSeriesRow>, imputed: Vec<ImputedRow>) -> Vec<AdjustedRow> {
    let mut by_key: HashMap<(String, i32), ImputedRow> = imputed
        .into_iter()
        .map(|r| ((r.area_code.clone(), r.year), r))
        .collect();

    // 1) join diffs back by (area, year)
    let mut rows: Vec<AdjustedRow> = table
        .into_iter()
        .map(|row| {
            let imputation = by_key.remove(&(row.area_code.clone(), row.year));
            let imputed_diff = imputation.as_ref().and_then(ImputedRow::diff);
            AdjustedRow {
                imputation,
                imputed_diff,
                ..AdjustedRow::unadjusted(row)
            }
        })
        .collect();

    // 2) group totals, then broadcast
    let totals = corrections(&rows);
    let lookup: HashMap<(&str, i32), f64> = totals
        .iter()
        .map(|c| ((c.parent_code.as_str(), c.year), c.total_diff))
        .collect();
    let broadcast: Vec<f64> = rows
        .iter()
        .map(|r| {
            lookup
                .get(&(r.row.parent_code.as_str(), r.row.year))
                .copied()
                .unwrap_or(0.0)
        })
        .collect();
    for (row, total) in rows.iter_mut().zip(broadcast) {
        row.adjustment_total = Some(total);
    }

    let nonzero = totals.iter().filter(|c| c.total_diff != 0.0).count();
    info!(groups = totals.len(), nonzero, "corrections aggregated");
    rows
}

/// Sum of `imputed_diff` per (parent, year), in first-seen order.
pub fn corrections(rows: &[AdjustedRow]) -> Vec<CorrectionRecord> {
    let mut index: HashMap<(&str, i32), usize> = HashMap::new();
    let mut out: Vec<CorrectionRecord> = Vec::new();
    for r in rows {
        let key = (r.row.parent_code.as_str(), r.row.year);
        let i = *index.entry(key).or_insert_with(|| {
            out.push(CorrectionRecord {
                parent_code: r.row.parent_code.clone(),
                year: r.row.year,
                total_diff: 0.0,
            });
            out.len() - 1
        });
        if let Some(d) = r.imputed_diff {
            out[i].total_diff += d;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::model::{tests::ts, ImputeMethod};

    fn imputed(area: &str, year: i32, original: f64, value: Option<f64>) -> ImputedRow {
        ImputedRow {
            area_code: area.to_string(),
            year,
            original,
            flagged_years: [year].into_iter().collect(),
            prev_safe_year: year - 1,
            prev_value: None,
            next_safe_year: year + 1,
            next_value: None,
            imputed: value,
            method: ImputeMethod::Interpolation,
        }
    }

    fn table() -> Vec<TimeSeriesRow> {
        vec![
            ts("E1", "E01", 2002, 5.0, &[]),
            ts("E2", "E01", 2002, 8.0, &[2002]),
            ts("E3", "E01", 2002, 10.0, &[2002]),
            ts("E1", "E01", 2003, 15.0, &[]),
        ]
    }

    #[test]
    fn broadcasts_group_total() {
        let out = aggregate(
            table(),
            vec![imputed("E2", 2002, 8.0, Some(7.5)), imputed("E3", 2002, 10.0, Some(11.0))],
        );

        let diffs: Vec<Option<f64>> = out.iter().map(|r| r.imputed_diff).collect();
        assert_eq!(diffs, vec![None, Some(0.5), Some(-1.0), None]);
        let totals: Vec<Option<f64>> = out.iter().map(|r| r.adjustment_total).collect();
        assert_eq!(totals, vec![Some(-0.5), Some(-0.5), Some(-0.5), Some(0.0)]);
        assert_eq!(out[1].imputed_value(), Some(7.5));
        assert_eq!(out[0].imputed_value(), None);
    }

    #[test]
    fn missing_imputation_contributes_nothing() {
        let out = aggregate(
            table(),
            vec![imputed("E2", 2002, 8.0, None), imputed("E3", 2002, 10.0, Some(11.0))],
        );
        assert_eq!(out[1].imputed_diff, None);
        assert!(out[1].imputation.is_some());
        assert_eq!(out[0].adjustment_total, Some(-1.0));
    }

    #[test]
    fn corrections_keep_first_seen_order() {
        let out = aggregate(table(), vec![imputed("E3", 2002, 10.0, Some(11.0))]);
        let records = corrections(&out);
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].year, records[0].total_diff), (2002, -1.0));
        assert_eq!((records[1].year, records[1].total_diff), (2003, 0.0));
    }
}
