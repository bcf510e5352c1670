//! Persistence for benchmark cases and reviewed answers.

pub mod results;

pub use results::{BenchmarkResultRow, BenchmarkStore, TestCaseRow};
