use thiserror::Error;

/// Errors surfaced synchronously to host ingest calls.
///
/// Per the propagation policy, `OutOfSpace` is the only variant that ever
/// reaches a caller: out-of-bounds coordinates resolve to the zero handle,
/// a degenerate ray direction is fixed locally with an epsilon, and a
/// ray-budget exhaustion resolves to a miss. An `InvalidHandle` decode is a
/// violated invariant, not a recoverable error, and is caught with
/// `debug_assert!` at the single decode site instead of being part of this
/// enum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{arena} arena out of space: requested {requested} words, {available} available")]
    OutOfSpace {
        arena: &'static str,
        requested: usize,
        available: usize,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
