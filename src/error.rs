//! Error type shared by every fallible `CarDb` operation.

use thiserror::Error;

/// Why a table operation did not take effect.
///
/// Every variant leaves the table exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The empty sentinel (`Car::EMPTY` or any unused record) was passed in.
    #[error("the empty record cannot be stored or removed")]
    EmptyRecord,

    /// A live record with the same model and dealer already exists.
    #[error("a record with this model and dealer is already present")]
    DuplicateKey,

    /// No live record with this model and dealer exists in either generation.
    #[error("no record with this model and dealer is present")]
    NotFound,

    /// The probe sequence visited every attempt without meeting a free slot.
    /// Only reachable once capacity is pinned at `MAX_CAPACITY`.
    #[error("no free slot on the probe sequence (capacity {capacity})")]
    ProbeExhausted {
        /// Capacity of the generation that was probed.
        capacity: usize,
    },

    /// `CarDb::check_invariants` found a structural violation.
    #[error("invariant violated in {generation} generation: {detail}")]
    Invariant {
        /// `"current"` or `"old"`.
        generation: &'static str,
        /// What was wrong.
        detail: String,
    },
}

/// Result alias for table operations.
pub type Result<T> = core::result::Result<T, Error>;
