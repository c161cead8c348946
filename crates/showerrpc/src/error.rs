//! # Error Definitions
//!
//! Protocol-level failures while building or parsing transaction frames, and the
//! status codes a reply uses to carry a failure back to the caller.

use showerpack::Error as PackError;

use crate::registry::WireType;

/// Operational failures within the transaction protocol itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The underlying Showerpack (de)serialization failed (truncation, bad tag, bad UTF-8).
    Encoding(PackError),
    /// The descriptor token in a call does not name the interface we serve.
    DescriptorMismatch { expected: String, found: String },
    /// A call was built with the wrong number of arguments for its method.
    ArityMismatch { method: &'static str, expected: usize, found: usize },
    /// A call argument or a reply result was not of the type the registry declares.
    TypeMismatch { method: &'static str, expected: WireType, found: WireType },
    /// The frame was well-formed but violated the protocol (trailing bytes, zero status on an error path).
    ProtocolViolation(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoding(e) => write!(f, "Encoding error: {}", e),
            Self::DescriptorMismatch { expected, found } => {
                write!(f, "Descriptor mismatch: expected '{}', found '{}'", expected, found)
            }
            Self::ArityMismatch { method, expected, found } => {
                write!(f, "{} takes {} arguments, got {}", method, expected, found)
            }
            Self::TypeMismatch { method, expected, found } => {
                write!(f, "{} expected {:?}, got {:?}", method, expected, found)
            }
            Self::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encoding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PackError> for Error {
    fn from(e: PackError) -> Self { Self::Encoding(e) }
}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The status word at the head of every reply.
///
/// `Ok` is zero. Every other code marks a failure reply, which carries a message
/// and never a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    Ok,
    /// The call's descriptor token did not match.
    Security,
    /// The receiving side could not decode the call.
    BadParcelable,
    IllegalArgument,
    IllegalState,
    UnsupportedOperation,
    /// A failure specific to the service implementation.
    ServiceSpecific,
    /// A code this build does not know; the raw value is kept.
    Other(i32),
}

impl ExceptionCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Security => -1,
            Self::BadParcelable => -2,
            Self::IllegalArgument => -3,
            Self::IllegalState => -5,
            Self::UnsupportedOperation => -7,
            Self::ServiceSpecific => -8,
            Self::Other(raw) => raw,
        }
    }

    pub fn from_i32(raw: i32) -> Self {
        match raw {
            0 => Self::Ok,
            -1 => Self::Security,
            -2 => Self::BadParcelable,
            -3 => Self::IllegalArgument,
            -5 => Self::IllegalState,
            -7 => Self::UnsupportedOperation,
            -8 => Self::ServiceSpecific,
            other => Self::Other(other),
        }
    }

    pub fn is_ok(self) -> bool {
        self.as_i32() == 0
    }
}

/// The failure half of a decoded reply: a nonzero status plus its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub code: ExceptionCode,
    pub message: String,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({}): {}", self.code, self.code.as_i32(), self.message)
    }
}
