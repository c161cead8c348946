//! # Shower
//!
//! Typed remote control of a virtual display host.
//!
//! ## Architecture
//!
//! - **Service**: `ShowerService` is the twelve-operation contract. Callers hold an
//!   `Arc<dyn ShowerService>` and never learn whether it is local or remote.
//! - **Transport**: `Transport` moves a transaction code plus an opaque body and
//!   returns the reply or the unhandled sentinel.
//! - **Proxy / Dispatcher**: `RemoteProxy` marshals calls onto a transport;
//!   `Dispatcher` unmarshals them on the far side and invokes the implementation.
//! - **Resolver**: `resolve` hands out the in-process implementation when the target
//!   offers one, and a proxy otherwise.
//! - **Controller**: `Controller` layers session state and input helpers on top.

pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod loopback;
pub mod proxy;
pub mod resolver;
pub mod service;
pub mod transport;

#[cfg(test)]
mod tests;

pub use showerpack::Handle;
pub use showerrpc::DESCRIPTOR;
pub use showerrpc::ExceptionCode;

pub use controller::Controller;
pub use controller::ControllerConfig;
pub use controller::FrameRelay;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use error::RemoteException;
pub use error::Result;
pub use handle::HandleTable;
pub use loopback::LoopbackTransport;
pub use proxy::RemoteProxy;
pub use resolver::Stub;
pub use resolver::resolve;
pub use resolver::resolve_opt;
pub use service::ShowerService;
pub use service::VideoSink;
pub use transport::TimeoutTransport;
pub use transport::Transaction;
pub use transport::Transport;
