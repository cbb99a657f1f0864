// src/lib.rs

//! Small-area GDHI adjustment.
//!
//! Replaces analyst-flagged values in an LSOA time series and redistributes
//! the correction across each LAD so that LAD totals are unchanged.

pub mod adjustment;
pub mod config;
pub mod error;
pub mod frame;
pub mod history;
pub mod mapping;
pub mod schema;
pub mod tables;

pub use error::{AdjustError, AdjustResult};
