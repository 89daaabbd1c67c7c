//! Shared utilities for the directory-authority voting core.

pub mod stats;
pub mod time;

pub use stats::{median, median_of, most_frequent, most_frequent_by};
pub use time::{format_duration, format_relative};
