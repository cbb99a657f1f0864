// src/adjustment/mod.rs

//! The adjustment pipeline, leaf-first:
//!
//! - [`locate`]: nearest unflagged year in either direction;
//! - [`impute`]: midpoint or interpolation/extrapolation replacements;
//! - [`aggregate`]: per-(parent, year) correction totals;
//! - [`apportion`]: spreads each total over the group and checks the
//!   aggregate is unchanged;
//! - [`run`]: stage orchestration, persistence and run history.
//!
//! [`reformat`], [`filter`], [`join`] and [`pivot`] prepare the long-format
//! table the engine works on.

pub mod aggregate;
pub mod apportion;
pub mod filter;
pub mod impute;
pub mod join;
pub mod locate;
pub mod model;
pub mod pivot;
pub mod reformat;
pub mod run;

pub use apportion::AGGREGATE_TOLERANCE;
pub use model::{cols, AdjustedRow, ImputeMethod, ImputedRow, TimeSeriesRow, YearRange};
pub use run::{run_adjustment, run_with_paths, RunOutcome, RunSettings};
