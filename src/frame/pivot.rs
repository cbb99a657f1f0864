// src/frame/pivot.rs

use std::collections::{HashMap, HashSet};

use super::{row_key_at, Frame, Value};
use crate::error::{AdjustError, AdjustResult};

/// Un-pivot `value_cols` into `(var_name, value_name)` pairs.
///
/// For each value column, in order, one output row is emitted per input row
/// carrying the id columns, the column header and the cell.
pub fn melt(
    frame: &Frame,
    id_cols: &[&str],
    value_cols: &[&str],
    var_name: &str,
    value_name: &str,
) -> AdjustResult<Frame> {
    let id_idx = id_cols
        .iter()
        .map(|c| frame.column_index(c))
        .collect::<AdjustResult<Vec<_>>>()?;
    let val_idx = value_cols
        .iter()
        .map(|c| frame.column_index(c))
        .collect::<AdjustResult<Vec<_>>>()?;

    let mut headers: Vec<String> = id_cols.iter().map(|c| c.to_string()).collect();
    headers.push(var_name.to_string());
    headers.push(value_name.to_string());

    let mut out = Frame::new(headers);
    for (&vi, name) in val_idx.iter().zip(value_cols) {
        for row in frame.rows() {
            let mut r: Vec<Value> = id_idx.iter().map(|&i| row[i].clone()).collect();
            r.push(Value::Str(name.to_string()));
            r.push(row[vi].clone());
            out.push_row(r)?;
        }
    }
    Ok(out)
}

/// Pivot `values_col` into one column per distinct value of `columns_col`.
///
/// Output rows follow the first-seen order of the index; output columns are
/// sorted (numerically where possible). A repeated `(index, column)` pair is
/// an error. Missing cells are `Null`.
pub fn pivot_wide(
    frame: &Frame,
    index_cols: &[&str],
    columns_col: &str,
    values_col: &str,
) -> AdjustResult<Frame> {
    let idx_idx = index_cols
        .iter()
        .map(|c| frame.column_index(c))
        .collect::<AdjustResult<Vec<_>>>()?;
    let col_idx = frame.column_index(columns_col)?;
    let val_idx = frame.column_index(values_col)?;

    // 1) distinct output columns, sorted
    let mut keys: Vec<Value> = Vec::new();
    for row in frame.rows() {
        if !keys.contains(&row[col_idx]) {
            keys.push(row[col_idx].clone());
        }
    }
    keys.sort_by(|a, b| a.cmp_loose(b));
    let key_pos: HashMap<String, usize> = keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.to_string(), i))
        .collect();

    // 2) fill one output row per distinct index, first-seen order
    let mut order: Vec<Vec<Value>> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut filled: HashSet<(usize, usize)> = HashSet::new();
    for row in frame.rows() {
        let index_key = row_key_at(row, &idx_idx);
        let slot = match slots.get(&index_key) {
            Some(&s) => s,
            None => {
                let mut out: Vec<Value> = idx_idx.iter().map(|&i| row[i].clone()).collect();
                out.extend(keys.iter().map(|_| Value::Null));
                order.push(out);
                slots.insert(index_key.clone(), order.len() - 1);
                order.len() - 1
            }
        };

        let pos = index_cols.len() + key_pos[&row[col_idx].to_string()];
        if !filled.insert((slot, pos)) {
            return Err(AdjustError::InvalidValue {
                column: columns_col.to_string(),
                value: row[col_idx].to_string(),
                reason: format!("duplicate entry for index {}", index_key.replace('\u{1f}', "/")),
            });
        }
        order[slot][pos] = row[val_idx].clone();
    }

    let mut headers: Vec<String> = index_cols.iter().map(|c| c.to_string()).collect();
    headers.extend(keys.iter().map(|k| k.to_string()));
    Frame::from_rows(headers, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn melt_emits_one_row_per_value_column_then_row() {
        let wide = Frame::from_rows(
            ["area_code", "2002", "2003"],
            vec![
                vec!["E1".into(), 10.0.into(), 20.0.into()],
                vec!["E2".into(), 11.0.into(), 21.0.into()],
            ],
        )
        .unwrap();

        let long = melt(&wide, &["area_code"], &["2002", "2003"], "year", "value").unwrap();
        assert_eq!(long.len(), 4);
        let codes: Vec<String> = long.column("area_code").unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(codes, ["E1", "E2", "E1", "E2"]);
        assert_eq!(long.value(2, "year").unwrap(), &Value::Str("2003".into()));
        assert_eq!(long.value(3, "value").unwrap(), &Value::Float(21.0));
    }

    #[test]
    fn pivot_wide_sorts_year_columns_numerically() {
        let long = Frame::from_rows(
            ["area_code", "year", "v"],
            vec![
                vec!["E1".into(), Value::Int(2010), 3.0.into()],
                vec!["E1".into(), Value::Int(2009), 2.0.into()],
                vec!["E2".into(), Value::Int(2009), 5.0.into()],
            ],
        )
        .unwrap();

        let wide = pivot_wide(&long, &["area_code"], "year", "v").unwrap();
        assert_eq!(wide.headers(), &["area_code", "2009", "2010"]);
        assert_eq!(wide.value(0, "2009").unwrap(), &Value::Float(2.0));
        assert!(wide.value(1, "2010").unwrap().is_null());
    }

    #[test]
    fn pivot_wide_rejects_duplicate_entries() {
        let long = Frame::from_rows(
            ["area_code", "year", "v"],
            vec![
                vec!["E1".into(), Value::Int(2009), 1.0.into()],
                vec!["E1".into(), Value::Int(2009), 2.0.into()],
            ],
        )
        .unwrap();
        assert!(pivot_wide(&long, &["area_code"], "year", "v").is_err());
    }
}
