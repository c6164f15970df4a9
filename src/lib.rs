pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use error::{DashboardError, Result};
pub use report::{Column, ColumnValues, FlatTable};
