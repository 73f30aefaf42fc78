//! Error taxonomy for the analysis core.
//!
//! Only conditions that must stop the pipeline are errors. Degenerate data
//! (zero observations, constant columns, out-of-range bucket values) is
//! represented in the output types instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Required column '{column}' is missing from the dataset")]
    MissingColumn { column: String },

    #[error("Column '{column}' is declared {found} but {expected} is required")]
    ColumnTypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("Column '{column}' is declared more than once")]
    DuplicateColumn { column: String },

    #[error("Row {row} has {found} value(s) but the schema declares {expected} column(s)")]
    RecordWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Derived column '{column}' has {found} value(s) but the dataset has {expected} row(s)")]
    DerivedLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Bucket breakpoints need at least 2 entries, got {0}")]
    TooFewBreakpoints(usize),

    #[error("Bucket breakpoint {index} is not finite")]
    NonFiniteBreakpoint { index: usize },

    #[error(
        "Bucket breakpoints must be strictly increasing: breakpoint {index} ({current}) follows {previous}"
    )]
    NonIncreasingBreakpoints {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("{labels} bucket label(s) supplied for {intervals} interval(s)")]
    LabelCountMismatch { labels: usize, intervals: usize },

    #[error("Bucket output column '{output_column}' would overwrite input column '{column}'")]
    BucketOutputOverwrites {
        output_column: String,
        column: String,
    },

    #[error("Bucket output column '{output_column}' is configured more than once")]
    DuplicateBucketOutput { output_column: String },

    #[error("Top performer quantile {0} is outside [0, 1]")]
    QuantileOutOfRange(f64),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
