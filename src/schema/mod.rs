// src/schema/mod.rs

pub mod arrow;
pub mod derive;
pub mod load;
pub mod types;

pub use self::arrow::{build_arrow_schema, map_to_arrow_type};
pub use derive::derive_type;
pub use load::{load_schema, parse_schema};
pub use types::{Column, DataType, TableSchema};
