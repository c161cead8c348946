//! # Error Taxonomy
//!
//! The errors a caller of the shower interface can observe, whether the target
//! is local or behind a transport. Nothing in this crate retries on any of them.

use showerrpc::ExceptionCode;
use showerrpc::Failure;

use crate::transport;

/// A failure raised by a service implementation, carried back to the caller
/// with its status code and message intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteException {
    pub code: ExceptionCode,
    pub message: String,
}

impl RemoteException {
    /// A service-specific failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: ExceptionCode::ServiceSpecific, message: message.into() }
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self { code: ExceptionCode::IllegalState, message: message.into() }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self { code: ExceptionCode::IllegalArgument, message: message.into() }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self { code: ExceptionCode::UnsupportedOperation, message: message.into() }
    }
}

impl std::fmt::Display for RemoteException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The channel broke or timed out.
    Transport(transport::Error),
    /// The receiving side serves a different interface (or the request was forged).
    DescriptorMismatch(String),
    /// The receiving side did not recognise the transaction code.
    UnknownOpcode(u32),
    /// A body could not be encoded or decoded, on either side.
    Encoding(String),
    /// The service implementation failed.
    Remote(RemoteException),
}

impl Error {
    /// Shorthand for a service-specific `Remote` failure.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(RemoteException::new(message))
    }

    /// Rebuilds the caller-side error from a failure reply.
    pub fn from_failure(failure: Failure) -> Self {
        match failure.code {
            ExceptionCode::Security => Self::DescriptorMismatch(failure.message),
            ExceptionCode::BadParcelable => Self::Encoding(failure.message),
            code => Self::Remote(RemoteException { code, message: failure.message }),
        }
    }

    /// The status code and message a dispatcher writes for this error.
    pub fn to_failure(&self) -> Failure {
        let (code, message) = match self {
            // Ok, Security and BadParcelable belong to the protocol; an implementation
            // raising one of them is reported as service-specific.
            Self::Remote(ex) if is_reserved(ex.code) => (ExceptionCode::ServiceSpecific, ex.message.clone()),
            Self::Remote(ex) => (ex.code, ex.message.clone()),
            Self::DescriptorMismatch(msg) => (ExceptionCode::Security, msg.clone()),
            Self::Encoding(msg) => (ExceptionCode::BadParcelable, msg.clone()),
            Self::UnknownOpcode(code) => (
                ExceptionCode::UnsupportedOperation,
                format!("transaction {} not handled", code),
            ),
            Self::Transport(e) => (ExceptionCode::ServiceSpecific, format!("transport: {}", e)),
        };
        Failure { code, message }
    }
}

/// Compared by raw value so `Other(-1)` and friends are caught too.
fn is_reserved(code: ExceptionCode) -> bool {
    [ExceptionCode::Ok, ExceptionCode::Security, ExceptionCode::BadParcelable]
        .iter()
        .any(|reserved| reserved.as_i32() == code.as_i32())
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::DescriptorMismatch(msg) => write!(f, "Descriptor mismatch: {}", msg),
            Self::UnknownOpcode(code) => write!(f, "Unknown transaction code {}", code),
            Self::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Self::Remote(ex) => write!(f, "Remote exception: {}", ex),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<showerrpc::Error> for Error {
    fn from(e: showerrpc::Error) -> Self {
        match e {
            showerrpc::Error::DescriptorMismatch { .. } => Self::DescriptorMismatch(e.to_string()),
            other => Self::Encoding(other.to_string()),
        }
    }
}

impl From<RemoteException> for Error {
    fn from(e: RemoteException) -> Self {
        Self::Remote(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
