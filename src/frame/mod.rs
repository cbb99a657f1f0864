// src/frame/mod.rs

//! A small column-named, row-major table with typed cells.
//!
//! Every wide/long reshaping, join and filter in the pipeline runs over a
//! [`Frame`]. Typed structs take over once the table reaches long format
//! (see `adjustment::model`).

pub mod pivot;

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
};

use crate::error::{AdjustError, AdjustResult};

/// Ordered set of years attached to an area.
pub type YearSet = BTreeSet<i32>;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Years(YearSet),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric-aware ordering used for pivot headers.
    pub fn cmp_loose(&self, other: &Value) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_nan() => Ok(()),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Years(ys) => {
                let parts: Vec<String> = ys.iter().map(|y| y.to_string()).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a frame from headers and rows, rejecting ragged rows.
    pub fn from_rows<S: Into<String>>(
        headers: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> AdjustResult<Self> {
        let mut frame = Frame::new(headers);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn column_index(&self, name: &str) -> AdjustResult<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AdjustError::MissingColumn(name.to_string()))
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> AdjustResult<()> {
        if row.len() != self.headers.len() {
            return Err(AdjustError::InvalidValue {
                column: "<row>".into(),
                value: format!("{} cells", row.len()),
                reason: format!("expected {} cells", self.headers.len()),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn value(&self, row: usize, name: &str) -> AdjustResult<&Value> {
        let idx = self.column_index(name)?;
        Ok(&self.rows[row][idx])
    }

    pub fn column(&self, name: &str) -> AdjustResult<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Rewrite every cell of `name` in place.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> AdjustResult<()>
    where
        F: FnMut(&Value) -> AdjustResult<Value>,
    {
        let idx = self.column_index(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx])?;
        }
        Ok(())
    }

    /// Append a column, or overwrite it if it already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> AdjustResult<()> {
        if values.len() != self.rows.len() {
            return Err(AdjustError::InvalidValue {
                column: name.to_string(),
                value: format!("{} values", values.len()),
                reason: format!("frame has {} rows", self.rows.len()),
            });
        }
        match self.headers.iter().position(|h| h == name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    pub fn rename(&mut self, from: &str, to: &str) -> AdjustResult<()> {
        let idx = self.column_index(from)?;
        self.headers[idx] = to.to_string();
        Ok(())
    }

    /// Rename every header for which `f` returns a new name.
    pub fn rename_with<F>(&mut self, f: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for h in &mut self.headers {
            if let Some(new) = f(h) {
                *h = new;
            }
        }
    }

    pub fn select(&self, cols: &[&str]) -> AdjustResult<Frame> {
        let idxs = cols
            .iter()
            .map(|c| self.column_index(c))
            .collect::<AdjustResult<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|r| idxs.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Ok(Frame {
            headers: cols.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    pub fn drop_columns(&self, cols: &[&str]) -> Frame {
        let keep: Vec<&str> = self
            .headers
            .iter()
            .map(String::as_str)
            .filter(|h| !cols.contains(h))
            .collect();
        // every kept header exists by construction
        self.select(&keep).unwrap_or_default()
    }

    /// Keep rows for which `pred` returns true.
    pub fn filter<F>(mut self, mut pred: F) -> Frame
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|r| pred(r.as_slice()));
        self
    }

    /// Keep the first occurrence of each distinct row.
    pub fn distinct(mut self) -> Frame {
        let mut seen = HashSet::new();
        self.rows.retain(|r| seen.insert(row_key(r)));
        self
    }

    /// Left join in the manner of a relational `LEFT JOIN ... USING (on)`.
    ///
    /// Every left row is kept; a left row matching several right rows is
    /// repeated, so callers that assume many-to-one must check `len()`.
    /// Right-hand columns that collide with a left column get a `_right`
    /// suffix.
    pub fn left_join(&self, right: &Frame, on: &[&str]) -> AdjustResult<Frame> {
        let left_keys = on
            .iter()
            .map(|c| self.column_index(c))
            .collect::<AdjustResult<Vec<_>>>()?;
        let right_keys = on
            .iter()
            .map(|c| right.column_index(c))
            .collect::<AdjustResult<Vec<_>>>()?;
        let right_payload: Vec<usize> = (0..right.headers.len())
            .filter(|i| !right_keys.contains(i))
            .collect();

        let mut headers = self.headers.clone();
        for &i in &right_payload {
            let name = &right.headers[i];
            if headers.contains(name) {
                headers.push(format!("{}_right", name));
            } else {
                headers.push(name.clone());
            }
        }

        // 1) index the right side by join key
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (ri, row) in right.rows.iter().enumerate() {
            let key = row_key_at(row, &right_keys);
            index.entry(key).or_default().push(ri);
        }

        // 2) look up each left row, preserving left order
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let key = row_key_at(row, &left_keys);
            match index.get(&key) {
                Some(matches) => {
                    for &ri in matches {
                        let mut out = row.clone();
                        out.extend(right_payload.iter().map(|&i| right.rows[ri][i].clone()));
                        rows.push(out);
                    }
                }
                None => {
                    let mut out = row.clone();
                    out.extend(right_payload.iter().map(|_| Value::Null));
                    rows.push(out);
                }
            }
        }

        Ok(Frame { headers, rows })
    }
}

fn row_key(row: &[Value]) -> String {
    row.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

pub(crate) fn row_key_at(row: &[Value], idxs: &[usize]) -> String {
    idxs.iter()
        .map(|&i| row[i].to_string())
        .collect::<Vec<_>>()
        .join("\u{1f}")
}
