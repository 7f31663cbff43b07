//! Error types for the clonewright clone-detection engine.
//!
//! Every fallible operation in this crate returns [`Result`], a thin alias
//! over [`Error`]. Per-entry failures inside the pair matcher and aggregator
//! are swallowed at the call site (see their module docs) rather than turned
//! into propagated errors; the variants below are for conditions a caller
//! must actually observe.

use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong building signatures, indexing them, or
/// orchestrating a repository-wide pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `Signature::new` was asked for zero (or fewer) hash functions.
    #[error("signature requires at least one hash function, got {0}")]
    ZeroHashes(usize),

    /// `LshIndex::new` was given a non-positive band or row count.
    #[error("invalid LSH parameters: bands={bands}, rows={rows}")]
    InvalidParams {
        /// Requested band count.
        bands: usize,
        /// Requested row count.
        rows: usize,
    },

    /// A signature was expected but absent at an API boundary that still
    /// admits the possibility (see `LshIndex::insert`'s typed `Option` form).
    #[error("expected a signature, found none")]
    NilSignature,

    /// Two signatures (or a signature and an index) disagree on length.
    #[error("signature size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Expected slot count.
        expected: usize,
        /// Actual slot count.
        actual: usize,
    },

    /// `Signature::from_bytes` was given malformed input.
    #[error("invalid serialized signature: {0}")]
    InvalidData(String),

    /// The operation observed a cancellation token before or during work.
    #[error("operation cancelled")]
    Cancelled,

    /// One or more sub-analyzers failed; their messages are joined here.
    #[error("{} analyzer(s) failed: {}", .0.len(), .0.join("; "))]
    AggregatedAnalyzerError(Vec<String>),
}
