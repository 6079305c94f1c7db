//! # Error Types
//!
//! The action error taxonomy carried inside every failed `CommandResult`, and
//! the codec error shared by the wire types.

use thiserror::Error;

/// Result error codes.
///
/// `1000..=1999` are caller-attributable, `2000..=2999` are internal.
pub mod codes {
    /// No error.
    pub const OK: i16 = 0;

    // Caller-attributable (1000 - 1999)
    pub const CALLER_RANGE_START: i16 = 1000;
    pub const INVALID_CREDENTIALS: i16 = 1001;
    pub const NOT_FOUND: i16 = 1002;
    pub const CALLER_RANGE_END: i16 = 1999;

    // Internal (2000 - 2999)
    pub const INTERNAL_RANGE_START: i16 = 2000;
    pub const PAYLOAD_DECODE: i16 = 2001;
    pub const RESULT_ENCODE: i16 = 2002;
    pub const STORAGE_FAILURE: i16 = 2003;
    pub const INTERNAL_INVARIANT: i16 = 2004;
    pub const INTERNAL_RANGE_END: i16 = 2999;
}

/// Who is responsible for a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// The request was wrong.
    Caller,
    /// The handler or one of its collaborators failed.
    Internal,
}

impl Attribution {
    /// Classify a raw result error code.
    ///
    /// Returns `None` for `0` and for codes outside both ranges.
    #[must_use]
    pub fn of_code(code: i16) -> Option<Self> {
        match code {
            codes::CALLER_RANGE_START..=codes::CALLER_RANGE_END => Some(Self::Caller),
            codes::INTERNAL_RANGE_START..=codes::INTERNAL_RANGE_END => Some(Self::Internal),
            _ => None,
        }
    }
}

/// Errors an action can return. Each maps to exactly one result code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// Username unknown or password mismatch. Deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The command payload could not be decoded for this action.
    #[error("payload decode failed: {0}")]
    PayloadDecode(String),

    /// The success payload could not be encoded.
    #[error("result encode failed: {0}")]
    ResultEncode(String),

    /// The storage collaborator failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A stored value or internal state broke an expected invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// The result code for this error.
    #[must_use]
    pub fn code(&self) -> i16 {
        match self {
            Self::InvalidCredentials => codes::INVALID_CREDENTIALS,
            Self::NotFound(_) => codes::NOT_FOUND,
            Self::PayloadDecode(_) => codes::PAYLOAD_DECODE,
            Self::ResultEncode(_) => codes::RESULT_ENCODE,
            Self::Storage(_) => codes::STORAGE_FAILURE,
            Self::Internal(_) => codes::INTERNAL_INVARIANT,
        }
    }

    /// Whether the caller or the handler is at fault.
    #[must_use]
    pub fn attribution(&self) -> Attribution {
        match self {
            Self::InvalidCredentials | Self::NotFound(_) => Attribution::Caller,
            _ => Attribution::Internal,
        }
    }
}

/// Wire codec failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),
}
