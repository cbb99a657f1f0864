// src/schema/arrow.rs

use arrow::datatypes::{DataType as ArrowDataType, Field as ArrowField, Schema as ArrowSchema};
use std::sync::Arc;

use super::types::{Column, DataType};

/// Map a schema column type onto an Arrow DataType.
///
/// - int   → Int64
/// - float → Float64
/// - str   → Utf8
/// - bool  → Boolean
pub fn map_to_arrow_type(ty: DataType) -> ArrowDataType {
    match ty {
        DataType::Int => ArrowDataType::Int64,
        DataType::Float => ArrowDataType::Float64,
        DataType::Str => ArrowDataType::Utf8,
        DataType::Bool => ArrowDataType::Boolean,
    }
}

/// Arrow schema for `cols`, every field nullable, in the given order.
pub fn build_arrow_schema(cols: &[Column]) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = cols
        .iter()
        .map(|col| ArrowField::new(&col.name, map_to_arrow_type(col.data_type), true))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nullable_fields_in_order() {
        let cols = vec![
            Column {
                name: "lsoa_code".into(),
                old_name: "LSOA code".into(),
                data_type: DataType::Str,
            },
            Column {
                name: "adjusted_con_gdhi".into(),
                old_name: "Adjusted GDHI".into(),
                data_type: DataType::Float,
            },
            Column {
                name: "lsoa_count".into(),
                old_name: "LSOA count".into(),
                data_type: DataType::Int,
            },
        ];
        let schema = build_arrow_schema(&cols);
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.field(0).data_type(), &ArrowDataType::Utf8);
        assert_eq!(schema.field(1).name(), "adjusted_con_gdhi");
        assert_eq!(schema.field(1).data_type(), &ArrowDataType::Float64);
        assert_eq!(schema.field(2).data_type(), &ArrowDataType::Int64);
        assert!(schema.fields().iter().all(|f| f.is_nullable()));
    }
}
