use std::collections::TryReserveError;

use thiserror::Error;

/// Faults raised by the value layer and the table engine.
///
/// ConstViolation, LengthOverflow and OutOfMemory abort the operation that
/// raised them; no partial state is rolled back. MalformedLiteral is only
/// produced by callers that turn a failed parse into an error value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuError {
    /// Write attempted through a frozen handle
    #[error("attempted to modify a frozen {0}")]
    ConstViolation(&'static str),

    /// Resulting count or text would exceed `MU_MAXLEN`
    #[error("exceeded max length in {0}")]
    LengthOverflow(&'static str),

    /// Allocator exhaustion
    #[error("out of memory")]
    OutOfMemory,

    /// Text failed to parse as a value
    #[error("malformed literal")]
    MalformedLiteral,
}

impl From<TryReserveError> for MuError {
    fn from(_: TryReserveError) -> Self {
        MuError::OutOfMemory
    }
}

pub type MuResult<T> = Result<T, MuError>;
