// src/tables/convert.rs

use anyhow::Result;
use arrow::{
    array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::{
    frame::{Frame, Value},
    schema::{build_arrow_schema, Column, DataType, TableSchema},
};

/// Pick the type of an undeclared column from its values.
///
/// All-int → int, numeric → float, all-bool → bool, otherwise str.
pub fn infer_column_type<'a, I>(values: I) -> DataType
where
    I: IntoIterator<Item = &'a Value>,
{
    let (mut ints, mut floats, mut bools, mut other) = (0, 0, 0, 0);
    for v in values {
        match v {
            Value::Null => {}
            Value::Float(x) if x.is_nan() => {}
            Value::Int(_) => ints += 1,
            Value::Float(_) => floats += 1,
            Value::Bool(_) => bools += 1,
            Value::Str(_) | Value::Years(_) => other += 1,
        }
    }
    if other > 0 || (bools > 0 && ints + floats > 0) {
        DataType::Str
    } else if bools > 0 {
        DataType::Bool
    } else if floats > 0 {
        DataType::Float
    } else if ints > 0 {
        DataType::Int
    } else {
        DataType::Str
    }
}

/// Convert a frame into a single Arrow RecordBatch.
///
/// Columns declared in `schema` use the declared type; the rest are inferred.
pub fn frame_to_record_batch(frame: &Frame, schema: &TableSchema) -> Result<RecordBatch> {
    let mut columns = Vec::with_capacity(frame.headers().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(frame.headers().len());

    for (i, name) in frame.headers().iter().enumerate() {
        let cells = frame.rows().iter().map(|r| &r[i]);
        let ty = match schema.get(name) {
            Some(col) => col.data_type,
            None => infer_column_type(cells.clone()),
        };

        let array: ArrayRef = match ty {
            DataType::Int => {
                let mut b = Int64Builder::with_capacity(frame.len());
                for v in cells {
                    b.append_option(v.as_i64());
                }
                Arc::new(b.finish())
            }
            DataType::Float => {
                let mut b = Float64Builder::with_capacity(frame.len());
                for v in cells {
                    b.append_option(v.as_f64());
                }
                Arc::new(b.finish())
            }
            DataType::Bool => {
                let mut b = BooleanBuilder::with_capacity(frame.len());
                for v in cells {
                    b.append_option(v.as_bool());
                }
                Arc::new(b.finish())
            }
            DataType::Str => {
                let mut b = StringBuilder::new();
                for v in cells {
                    if v.is_null() {
                        b.append_null();
                    } else {
                        b.append_value(v.to_string());
                    }
                }
                Arc::new(b.finish())
            }
        };

        columns.push(Column {
            name: name.clone(),
            old_name: name.clone(),
            data_type: ty,
        });
        arrays.push(array);
    }

    RecordBatch::try_new(build_arrow_schema(&columns), arrays).map_err(Into::into)
}
