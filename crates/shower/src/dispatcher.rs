//! # Transaction Dispatcher
//!
//! Receiving side of the protocol: turns an inbound (code, body) pair into a call
//! on the bound `ShowerService` and encodes the reply.
//!
//! ## Protocol
//!
//! 1. Code 0 answers with the descriptor. The implementation is not touched.
//! 2. A code outside the registry yields `Transaction::Unhandled`, never an error.
//! 3. The descriptor token is verified before any parameter is read. A mismatch
//!    replies `Security` and the implementation is not touched.
//! 4. Parameters are decoded strictly in registry order; a malformed body replies
//!    `BadParcelable`.
//! 5. The implementation runs to completion; its failure becomes a status + message
//!    reply with no result.
//!
//! ## Invariants
//!
//! - The dispatcher holds no mutable state and is safe to call from many tasks at once.

use std::sync::Arc;

use showerpack::Encoder;
use showerrpc::Arg;
use showerrpc::CallDecoder;
use showerrpc::ExceptionCode;
use showerrpc::Method;
use showerrpc::ReplyEncoder;
use showerrpc::DESCRIPTOR;
use showerrpc::INTERFACE_TRANSACTION;

use crate::error::Error;
use crate::service::ShowerService;
use crate::transport::Transaction;

/// Routes transactions to one bound implementation.
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn ShowerService>,
    descriptor: &'static str,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn ShowerService>) -> Self {
        Self { service, descriptor: DESCRIPTOR }
    }

    /// Binds under a different descriptor, e.g. a versioned interface name.
    pub fn with_descriptor(service: Arc<dyn ShowerService>, descriptor: &'static str) -> Self {
        Self { service, descriptor }
    }

    pub fn service(&self) -> &Arc<dyn ShowerService> {
        &self.service
    }

    pub fn descriptor(&self) -> &'static str {
        self.descriptor
    }

    /// Handles one inbound transaction.
    ///
    /// The `Err` arm is reserved for failing to encode the reply itself; every
    /// protocol or implementation failure is written into the reply.
    pub async fn transact(&self, code: u32, data: &[u8]) -> showerrpc::Result<Transaction> {
        if code == INTERFACE_TRANSACTION {
            let mut enc = Encoder::new();
            showerrpc::encode_interface_reply(&mut enc, self.descriptor)?;
            return Ok(Transaction::Reply(enc.into_bytes()));
        }

        let Some(method) = Method::from_code(code) else {
            tracing::debug!(code, "unhandled transaction code");
            return Ok(Transaction::Unhandled);
        };

        let call = match CallDecoder::decode(self.descriptor, method, data) {
            Ok(call) => call,
            Err(e) => {
                let code = match e {
                    showerrpc::Error::DescriptorMismatch { .. } => ExceptionCode::Security,
                    _ => ExceptionCode::BadParcelable,
                };
                tracing::warn!(%method, error = %e, "rejecting transaction");
                return Self::reply_err(code, &e.to_string());
            }
        };

        match self.invoke(call).await {
            Ok(result) => {
                let bytes = ReplyEncoder::ok(result.as_ref()).to_bytes()?;
                Ok(Transaction::Reply(bytes))
            }
            Err(e) => {
                tracing::debug!(%method, error = %e, "service call failed");
                let failure = e.to_failure();
                Self::reply_err(failure.code, &failure.message)
            }
        }
    }

    fn reply_err(code: ExceptionCode, message: &str) -> showerrpc::Result<Transaction> {
        let bytes = ReplyEncoder::err(code, message).to_bytes()?;
        Ok(Transaction::Reply(bytes))
    }

    async fn invoke(&self, call: CallDecoder) -> crate::Result<Option<Arg>> {
        let service = &self.service;
        match (call.method, call.args.as_slice()) {
            (Method::EnsureDisplay, [Arg::S32(width), Arg::S32(height), Arg::S32(dpi), Arg::S32(bitrate)]) => {
                service.ensure_display(*width, *height, *dpi, *bitrate).await?;
            }
            (Method::DestroyDisplay, []) => service.destroy_display().await?,
            (Method::LaunchApp, [Arg::Str(package)]) => service.launch_app(package).await?,
            (Method::Tap, [Arg::F32(x), Arg::F32(y)]) => service.tap(*x, *y).await?,
            (Method::Swipe, [Arg::F32(x1), Arg::F32(y1), Arg::F32(x2), Arg::F32(y2), Arg::S64(duration)]) => {
                service.swipe(*x1, *y1, *x2, *y2, *duration).await?;
            }
            (Method::TouchDown, [Arg::F32(x), Arg::F32(y)]) => service.touch_down(*x, *y).await?,
            (Method::TouchMove, [Arg::F32(x), Arg::F32(y)]) => service.touch_move(*x, *y).await?,
            (Method::TouchUp, [Arg::F32(x), Arg::F32(y)]) => service.touch_up(*x, *y).await?,
            (Method::InjectKey, [Arg::S32(key)]) => service.inject_key(*key).await?,
            (Method::RequestScreenshot, []) => {
                let image = service.request_screenshot().await?;
                return Ok(Some(Arg::Bytes(image)));
            }
            (Method::GetDisplayId, []) => {
                let id = service.get_display_id().await?;
                return Ok(Some(Arg::S32(id)));
            }
            (Method::SetVideoSink, [Arg::Handle(sink)]) => service.set_video_sink(*sink).await?,
            (method, args) => {
                // CallDecoder reads exactly the registry signature, so this is a table bug.
                return Err(Error::Encoding(format!(
                    "{} cannot take {} decoded arguments", method, args.len()
                )));
            }
        }
        Ok(None)
    }
}
