//! Output module for the dataset file and run reports
//!
//! This module handles:
//! - Assembling extracted records into the final table
//! - Writing and reading the `;`-delimited dataset file
//! - Run and dataset statistics

mod dataset;
pub mod stats;

pub use dataset::{read_dataset, Dataset, COLUMNS};
pub use stats::{load_statistics, print_run_summary, print_statistics, DatasetStatistics, RunStats};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid dataset path: {0}")]
    InvalidPath(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
