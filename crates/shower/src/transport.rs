//! # Transport Abstraction
//!
//! A minimal, async interface for moving transaction bodies between processes.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The Transport knows nothing about descriptors, parameters or
//!   status words. It moves an opaque body plus the transaction code that travels
//!   beside it.
//! - **Request-Response**: "send code + bytes, await reply". A receiver may answer
//!   with `Transaction::Unhandled` instead of a reply when it does not know the code.
//! - **Capability Query**: A transport that fronts an object living in this process
//!   can hand that object out directly through `query_local`, skipping the wire.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::service::ShowerService;

/// Errors that occur at the channel layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// The operation timed out before a reply was received.
    Timeout,
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Timeout => write!(f, "Request timed out"),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// What came back from the far side of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// A reply body.
    Reply(Vec<u8>),
    /// The receiver did not recognise the code and wrote no reply.
    Unhandled,
}

/// A mechanism to deliver a transaction and receive its outcome.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a body under a transaction code and waits for the outcome.
    ///
    /// # Invariants
    /// - Must return `Ok` with the raw reply (or the unhandled sentinel) on delivery.
    /// - Must return `Err` if the channel fails; never retries on its own.
    /// - Must not interpret the body.
    async fn transact(&self, code: u32, data: &[u8]) -> Result<Transaction>;

    /// Returns the in-process implementation behind this transport, if there is
    /// one and it serves `descriptor`.
    fn query_local(&self, _descriptor: &str) -> Option<Arc<dyn ShowerService>> {
        None
    }
}

/// Bounds every transaction on an inner transport.
///
/// Expiry surfaces as `Error::Timeout`. The transaction itself is not cancelled on
/// the far side; only the wait is abandoned.
pub struct TimeoutTransport<T> {
    inner: T,
    timeout: Duration,
}

impl<T: Transport> TimeoutTransport<T> {
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl<T: Transport> Transport for TimeoutTransport<T> {
    async fn transact(&self, code: u32, data: &[u8]) -> Result<Transaction> {
        match tokio::time::timeout(self.timeout, self.inner.transact(code, data)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(code, timeout_ms = self.timeout.as_millis() as u64, "transaction timed out");
                Err(Error::Timeout)
            }
        }
    }

    fn query_local(&self, descriptor: &str) -> Option<Arc<dyn ShowerService>> {
        self.inner.query_local(descriptor)
    }
}
