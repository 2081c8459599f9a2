//! Run output: the JSON result document and terminal progress.

pub mod generator;
pub mod progress;

pub use generator::{approximate_cost, write_json_report};
pub use progress::BarProgress;
