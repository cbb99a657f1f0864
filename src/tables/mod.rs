// src/tables/mod.rs

pub mod convert;
pub mod read;
pub mod utils;
pub mod write;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use read::{read_raw_csv, read_with_schema};
pub use write::{prepare_output, validate_schema, write_with_schema};

/// On-disk format of the output tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
