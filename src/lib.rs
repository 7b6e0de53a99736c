//! Filter-and-aggregate engine behind a sales analytics dashboard.
//!
//! Load a cleaned sales extract once, share it through a [`state::Session`],
//! and recompute the [`report::DashboardSummary`] after every filter change.

pub mod data;
pub mod report;
pub mod state;

pub use data::filter::{
    apply, init_criteria, DateRange, FilterCriteria, FilterRequest, FilteredView,
};
pub use data::loader::load_file;
pub use data::model::{Dataset, Dimension, FieldError, IdKey, Measure, Record, YearMonth};
pub use report::DashboardSummary;
pub use state::Session;
