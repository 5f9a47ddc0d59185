//! Error type shared by instance parsing, schedule evaluation and resolution.

use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LotSizingError {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed input at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("{what} row {row} has {found} entries, expected {expected}")]
    Structural {
        what: &'static str,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("{what} has {found} rows, expected {expected}")]
    RowCount {
        what: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("demand of item {item} in period {period} is {value}, expected 0 or 1")]
    NonBinaryDemand { item: usize, period: usize, value: u32 },

    #[error("{what} {index} is out of range, expected a value smaller than {bound}")]
    Range {
        what: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("schedule spans {found} periods, expected {expected}")]
    LengthMismatch { found: usize, expected: usize },

    #[error("item {item} is produced {produced} times but has {due} due dates")]
    UnderProduction { item: usize, produced: usize, due: usize },

    #[error("several items {items:?} produced in period {period}")]
    InconsistentSolution { period: usize, items: Vec<usize> },

    #[error("invalid generator parameters: {0}")]
    InvalidParameters(String),

    #[error("solver failed: {0}")]
    Solver(#[from] good_lp::ResolutionError),

    #[error("invalid json instance: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LotSizingError>;
