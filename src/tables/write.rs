// src/tables/write.rs

use anyhow::{Context, Result};
use arrow::csv::WriterBuilder;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
};
use tracing::{debug, info};

use super::{convert::frame_to_record_batch, OutputFormat};
use crate::{
    error::AdjustError,
    frame::{Frame, Value},
    schema::{DataType, TableSchema},
};

/// Rename the frame's columns for output and validate them against `schema`.
///
/// For every schema column, `old_name` is the frame column and `name` is the
/// header written to disk. Undeclared columns pass through unchanged.
pub fn prepare_output(mut frame: Frame, schema: &TableSchema) -> Result<Frame> {
    for col in &schema.columns {
        if frame.has_column(&col.old_name) {
            if col.old_name != col.name {
                frame.rename(&col.old_name, &col.name)?;
                debug!("renamed column '{}' to '{}'", col.old_name, col.name);
            }
        } else if !frame.has_column(&col.name) {
            return Err(AdjustError::MissingColumn(col.old_name.clone()).into());
        }
    }

    validate_schema(&frame, schema)?;
    Ok(frame)
}

/// Every declared column must exist and hold only values of its type (or nulls).
pub fn validate_schema(frame: &Frame, schema: &TableSchema) -> Result<(), AdjustError> {
    for col in &schema.columns {
        let values = frame.column(&col.name)?;
        let ok = values.iter().all(|v| value_matches(v, col.data_type));
        if !ok {
            return Err(AdjustError::ColumnType {
                column: col.name.clone(),
                expected: col.data_type.to_string(),
            });
        }
    }
    Ok(())
}

fn value_matches(v: &Value, ty: DataType) -> bool {
    if v.is_null() {
        return true;
    }
    match ty {
        DataType::Int => matches!(v, Value::Int(_)),
        DataType::Float => matches!(v, Value::Float(_) | Value::Int(_)),
        DataType::Str => matches!(v, Value::Str(_) | Value::Years(_)),
        DataType::Bool => matches!(v, Value::Bool(_)),
    }
}

/// Validate `frame` against `schema`, then write it to `path`.
///
/// The file is written to `<path>.tmp` first and renamed into place.
#[tracing::instrument(level = "info", skip(frame, schema, path), fields(path = %path.as_ref().display()))]
pub fn write_with_schema<P: AsRef<Path>>(
    frame: Frame,
    schema: &TableSchema,
    path: P,
    format: OutputFormat,
) -> Result<()> {
    let path = path.as_ref();
    let frame = prepare_output(frame, schema)?;
    let batch = frame_to_record_batch(&frame, schema).context("building output record batch")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {:?}", parent))?;
        }
    }

    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));
    let file = File::create(&tmp_path)
        .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
    let buf_writer = BufWriter::new(file);

    match format {
        OutputFormat::Csv => {
            let mut writer = WriterBuilder::new().with_header(true).build(buf_writer);
            writer.write(&batch).context("writing CSV batch")?;
        }
        OutputFormat::Parquet => {
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let mut writer = ArrowWriter::try_new(buf_writer, batch.schema(), Some(props))
                .context("creating ArrowWriter for output")?;
            writer.write(&batch).context("writing parquet batch")?;
            writer.close().context("closing ArrowWriter for output")?;
        }
    }

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to rename `{}` to `{}`",
            tmp_path.display(),
            path.display()
        )
    })?;

    info!(rows = frame.len(), "data saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use tempfile::tempdir;

    const OUT_SCHEMA: &str = r#"
LSOA code:
  old_name: lsoa_code
  data_type: str
"#;

    fn sample() -> Frame {
        Frame::from_rows(
            ["lsoa_code", "2002"],
            vec![
                vec!["E1".into(), 10.0.into()],
                vec!["E2".into(), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn writes_renamed_csv() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");
        write_with_schema(sample(), &parse_schema(OUT_SCHEMA)?, &path, OutputFormat::Csv)?;

        let text = fs::read_to_string(&path)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("LSOA code,2002"));
        assert!(lines.next().is_some_and(|l| l.starts_with("E1,10")));
        assert_eq!(lines.next(), Some("E2,"));
        Ok(())
    }

    #[test]
    fn writes_parquet() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.parquet");
        write_with_schema(sample(), &parse_schema(OUT_SCHEMA)?, &path, OutputFormat::Parquet)?;

        let reader = SerializedFileReader::new(File::open(&path)?)?;
        assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
        Ok(())
    }

    #[test]
    fn missing_output_column_is_fatal() -> Result<()> {
        let schema = parse_schema("LAD code:\n  old_name: lad_code\n  data_type: str\n")?;
        let err = prepare_output(sample(), &schema).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdjustError>(),
            Some(AdjustError::MissingColumn(c)) if c == "lad_code"
        ));
        Ok(())
    }

    #[test]
    fn wrong_type_is_rejected() -> Result<()> {
        let schema = parse_schema("'2002':\n  old_name: '2002'\n  data_type: bool\n")?;
        let err = validate_schema(&sample(), &schema).unwrap_err();
        assert!(matches!(err, AdjustError::ColumnType { .. }));
        Ok(())
    }
}
