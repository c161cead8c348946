//! # Service Contract
//!
//! The twelve operations a shower host exposes. The same trait is implemented by
//! the real host service (out of this crate) and by `RemoteProxy`, so callers never
//! care which one they hold.

use async_trait::async_trait;
use showerpack::Handle;

use crate::error::Result;

/// Control surface of a virtual display session.
///
/// Implementations must tolerate concurrent calls unless the transport in front of
/// them serializes delivery; the dispatcher adds no locking of its own.
///
/// Failures are reported as `Error::Remote`. Coordinates are passed through as-is.
#[async_trait]
pub trait ShowerService: Send + Sync + 'static {
    /// Creates the virtual display, or reconfigures the existing one.
    async fn ensure_display(&self, width: i32, height: i32, dpi: i32, bitrate_kbps: i32) -> Result<()>;

    async fn destroy_display(&self) -> Result<()>;

    /// Starts `package_name` on the virtual display.
    async fn launch_app(&self, package_name: &str) -> Result<()>;

    async fn tap(&self, x: f32, y: f32) -> Result<()>;

    async fn swipe(&self, x1: f32, y1: f32, x2: f32, y2: f32, duration_ms: i64) -> Result<()>;

    async fn touch_down(&self, x: f32, y: f32) -> Result<()>;

    async fn touch_move(&self, x: f32, y: f32) -> Result<()>;

    async fn touch_up(&self, x: f32, y: f32) -> Result<()>;

    async fn inject_key(&self, key_code: i32) -> Result<()>;

    /// Encoded image of the current display contents.
    async fn request_screenshot(&self) -> Result<Vec<u8>>;

    async fn get_display_id(&self) -> Result<i32>;

    /// Attaches the sink that receives encoded video frames. `Handle::NULL` detaches.
    ///
    /// The handle is only meaningful to the side that minted it.
    async fn set_video_sink(&self, sink: Handle) -> Result<()>;
}

/// Receiver of encoded video frames.
pub trait VideoSink: Send + Sync {
    fn on_video_frame(&self, frame: &[u8]);
}
