//! # ShowerRPC
//!
//! A strict, table-driven transaction protocol over Showerpack.
//!
//! ## Architecture
//!
//! - **Registry**: One static table maps every method of the shower interface to
//!   its transaction code and wire signature.
//! - **Frames**: Call and reply bodies are flat runs of Showerpack primitives whose
//!   order is dictated by the registry. The descriptor token opens every call.
//! - **Errors**: `Error` covers failures of the protocol machinery; `Failure`
//!   is a well-formed reply reporting that the remote side failed.

pub mod error;
pub mod frame;
pub mod registry;


pub use error::Error;
pub use error::ExceptionCode;
pub use error::Failure;
pub use error::Result;

pub use frame::Arg;
pub use frame::CallDecoder;
pub use frame::CallEncoder;
pub use frame::ReplyDecoder;
pub use frame::ReplyEncoder;
pub use frame::decode_arg;
pub use frame::decode_interface_reply;
pub use frame::encode_arg;
pub use frame::encode_interface_reply;
pub use frame::enforce_interface;

pub use registry::DESCRIPTOR;
pub use registry::FIRST_CALL_TRANSACTION;
pub use registry::INTERFACE_TRANSACTION;
pub use registry::METHODS;
pub use registry::Method;
pub use registry::MethodSpec;
pub use registry::WireType;
