use thiserror::Error;

/// Errors surfaced by the benchmark pipeline.
///
/// Every variant aborts the current run; nothing is retried. The on-disk
/// result table is only ever replaced after a fully successful run, so any
/// of these leaves previously recorded results untouched.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    /// The external benchmark could not be launched, timed out, or exited
    /// with a non-zero status.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The expected `Time: <seconds> s` pattern was absent from the
    /// benchmark output (or its capture did not parse as a float).
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// An existing result table is missing its `size` column or contains a
    /// non-integer size value.
    #[error("malformed result table: {0}")]
    MalformedTable(String),

    /// The result table could not be written back to disk.
    #[error("storage failed: {0}")]
    Storage(String),
}
