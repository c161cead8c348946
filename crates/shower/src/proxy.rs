//! # Remote Procedure Call Proxy
//!
//! Implements `ShowerService` by marshaling each call across a `Transport`.
//!
//! The proxy is stateless beyond the transport it wraps; every call owns its
//! request and reply buffers and drops them on every exit path.
//!
//! ## Invariants
//!
//! - The reply status is read before anything else; on failure the message is
//!   turned back into an `Error` and no result is read.
//! - The unhandled sentinel becomes `Error::UnknownOpcode`.
//! - Nothing is retried.

use std::sync::Arc;

use async_trait::async_trait;
use showerpack::Handle;
use showerrpc::Arg;
use showerrpc::CallEncoder;
use showerrpc::Method;
use showerrpc::ReplyDecoder;
use showerrpc::INTERFACE_TRANSACTION;

use crate::error::Error;
use crate::error::Result;
use crate::service::ShowerService;
use crate::transport::Transaction;
use crate::transport::Transport;

/// Client-side stand-in for a service living behind a transport.
#[derive(Clone)]
pub struct RemoteProxy {
    remote: Arc<dyn Transport>,
}

impl RemoteProxy {
    pub fn new(remote: Arc<dyn Transport>) -> Self {
        Self { remote }
    }

    /// The transport this proxy talks through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.remote
    }

    /// Asks the far side which interface it serves.
    pub async fn interface_descriptor(&self) -> Result<String> {
        match self.remote.transact(INTERFACE_TRANSACTION, &[]).await? {
            Transaction::Reply(bytes) => {
                showerrpc::decode_interface_reply(&bytes)?.map_err(Error::from_failure)
            }
            Transaction::Unhandled => Err(Error::UnknownOpcode(INTERFACE_TRANSACTION)),
        }
    }

    /// Executes one typed call and returns the method's declared result, if any.
    async fn call(&self, method: Method, args: &[Arg]) -> Result<Option<Arg>> {
        let data = CallEncoder::new(method, args).to_bytes()?;
        tracing::trace!(%method, len = data.len(), "transact");

        let reply = match self.remote.transact(method.code(), &data).await? {
            Transaction::Reply(bytes) => bytes,
            Transaction::Unhandled => return Err(Error::UnknownOpcode(method.code())),
        };

        ReplyDecoder::decode(method, &reply)?
            .status
            .map_err(Error::from_failure)
    }

    async fn call_void(&self, method: Method, args: &[Arg]) -> Result<()> {
        self.call(method, args).await.map(|_| ())
    }

    fn missing_result(method: Method) -> Error {
        Error::Encoding(format!("{} reply carried no result", method))
    }
}

#[async_trait]
impl ShowerService for RemoteProxy {
    async fn ensure_display(&self, width: i32, height: i32, dpi: i32, bitrate_kbps: i32) -> Result<()> {
        let args = [Arg::S32(width), Arg::S32(height), Arg::S32(dpi), Arg::S32(bitrate_kbps)];
        self.call_void(Method::EnsureDisplay, &args).await
    }

    async fn destroy_display(&self) -> Result<()> {
        self.call_void(Method::DestroyDisplay, &[]).await
    }

    async fn launch_app(&self, package_name: &str) -> Result<()> {
        self.call_void(Method::LaunchApp, &[Arg::Str(package_name.to_string())]).await
    }

    async fn tap(&self, x: f32, y: f32) -> Result<()> {
        self.call_void(Method::Tap, &[Arg::F32(x), Arg::F32(y)]).await
    }

    async fn swipe(&self, x1: f32, y1: f32, x2: f32, y2: f32, duration_ms: i64) -> Result<()> {
        let args = [Arg::F32(x1), Arg::F32(y1), Arg::F32(x2), Arg::F32(y2), Arg::S64(duration_ms)];
        self.call_void(Method::Swipe, &args).await
    }

    async fn touch_down(&self, x: f32, y: f32) -> Result<()> {
        self.call_void(Method::TouchDown, &[Arg::F32(x), Arg::F32(y)]).await
    }

    async fn touch_move(&self, x: f32, y: f32) -> Result<()> {
        self.call_void(Method::TouchMove, &[Arg::F32(x), Arg::F32(y)]).await
    }

    async fn touch_up(&self, x: f32, y: f32) -> Result<()> {
        self.call_void(Method::TouchUp, &[Arg::F32(x), Arg::F32(y)]).await
    }

    async fn inject_key(&self, key_code: i32) -> Result<()> {
        self.call_void(Method::InjectKey, &[Arg::S32(key_code)]).await
    }

    async fn request_screenshot(&self) -> Result<Vec<u8>> {
        let method = Method::RequestScreenshot;
        self.call(method, &[])
            .await?
            .and_then(Arg::into_bytes)
            .ok_or_else(|| Self::missing_result(method))
    }

    async fn get_display_id(&self) -> Result<i32> {
        let method = Method::GetDisplayId;
        self.call(method, &[])
            .await?
            .and_then(|arg| arg.as_s32())
            .ok_or_else(|| Self::missing_result(method))
    }

    async fn set_video_sink(&self, sink: Handle) -> Result<()> {
        self.call_void(Method::SetVideoSink, &[Arg::Handle(sink)]).await
    }
}
