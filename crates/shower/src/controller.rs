//! # Session Controller
//!
//! Client-side convenience over a resolved `ShowerService`: remembers the current
//! display id and video size, normalises input coordinates, bounds screenshot
//! waits, and relays video frames to whoever is listening.
//!
//! The controller never retries. A failed call is reported once, as-is.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use showerpack::Handle;

use crate::service::ShowerService;
use crate::service::VideoSink;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The service call failed.
    Service(crate::Error),
    /// `launch_app` was given an empty or whitespace package name.
    BlankPackage,
    /// The host created a display but reported a negative id for it.
    InvalidDisplayId(i32),
    /// The screenshot did not arrive within the configured bound.
    Timeout(Duration),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service(e) => write!(f, "Service error: {}", e),
            Self::BlankPackage => write!(f, "Package name is blank"),
            Self::InvalidDisplayId(id) => write!(f, "Host reported invalid display id {}", id),
            Self::Timeout(after) => write!(f, "Timed out after {:?}", after),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Service(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::Error> for Error {
    fn from(e: crate::Error) -> Self {
        Self::Service(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Tunables for a `Controller`.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub screenshot_timeout: Duration,
    pub swipe_duration_ms: i64,
    /// Frames a `FrameRelay` keeps while nobody is listening.
    pub early_frame_capacity: usize,
    /// Display width and height are rounded down to a multiple of this.
    pub size_alignment: i32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            screenshot_timeout: Duration::from_millis(3000),
            swipe_duration_ms: 300,
            early_frame_capacity: 120,
            size_alignment: 8,
        }
    }
}

impl ControllerConfig {
    pub fn with_screenshot_timeout(mut self, timeout: Duration) -> Self {
        self.screenshot_timeout = timeout;
        self
    }

    pub fn with_swipe_duration_ms(mut self, duration_ms: i64) -> Self {
        self.swipe_duration_ms = duration_ms;
        self
    }

    pub fn with_early_frame_capacity(mut self, capacity: usize) -> Self {
        self.early_frame_capacity = capacity;
        self
    }

    pub fn with_size_alignment(mut self, alignment: i32) -> Self {
        self.size_alignment = alignment.max(1);
        self
    }

    /// Rounds `size` down to the alignment, keeping the raw size if that would be zero.
    ///
    /// An alignment below 1 is treated as 1.
    pub fn align(&self, size: i32) -> i32 {
        let step = self.size_alignment.max(1);
        let aligned = size - size.rem_euclid(step);
        if aligned > 0 { aligned } else { size }
    }
}

const NO_DISPLAY: i32 = -1;

/// Drives one virtual display session.
pub struct Controller {
    service: Arc<dyn ShowerService>,
    config: ControllerConfig,
    display_id: AtomicI32,
    video_width: AtomicI32,
    video_height: AtomicI32,
    relay: Option<Arc<FrameRelay>>,
}

impl Controller {
    pub fn new(service: Arc<dyn ShowerService>) -> Self {
        Self::with_config(service, ControllerConfig::default())
    }

    pub fn with_config(service: Arc<dyn ShowerService>, config: ControllerConfig) -> Self {
        Self {
            service,
            config,
            display_id: AtomicI32::new(NO_DISPLAY),
            video_width: AtomicI32::new(0),
            video_height: AtomicI32::new(0),
            relay: None,
        }
    }

    /// Ties a client-side frame relay to this session so `shutdown` resets it.
    pub fn with_frame_relay(mut self, relay: Arc<FrameRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn frame_relay(&self) -> Option<&Arc<FrameRelay>> {
        self.relay.as_ref()
    }

    pub fn service(&self) -> &Arc<dyn ShowerService> {
        &self.service
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Id of the display created by the last successful `ensure_display`.
    pub fn display_id(&self) -> Option<i32> {
        let id = self.display_id.load(Ordering::Acquire);
        (id >= 0).then_some(id)
    }

    /// Aligned video size of the current display.
    pub fn video_size(&self) -> Option<(i32, i32)> {
        let width = self.video_width.load(Ordering::Acquire);
        let height = self.video_height.load(Ordering::Acquire);
        (width > 0 && height > 0).then_some((width, height))
    }

    /// Recreates the virtual display at an aligned size and returns its id.
    ///
    /// Any previous display is destroyed first so the host starts clean.
    pub async fn ensure_display(&self, width: i32, height: i32, dpi: i32, bitrate_kbps: Option<i32>) -> Result<i32> {
        let width = self.config.align(width);
        let height = self.config.align(height);
        self.video_width.store(width, Ordering::Release);
        self.video_height.store(height, Ordering::Release);
        self.display_id.store(NO_DISPLAY, Ordering::Release);

        self.service.destroy_display().await?;
        self.service.ensure_display(width, height, dpi, bitrate_kbps.unwrap_or(0)).await?;

        let id = self.service.get_display_id().await?;
        if id < 0 {
            tracing::error!(id, "host reported invalid display id");
            return Err(Error::InvalidDisplayId(id));
        }
        self.display_id.store(id, Ordering::Release);
        tracing::debug!(id, width, height, dpi, "display ready");
        Ok(id)
    }

    pub async fn launch_app(&self, package_name: &str) -> Result<()> {
        if package_name.trim().is_empty() {
            return Err(Error::BlankPackage);
        }
        Ok(self.service.launch_app(package_name).await?)
    }

    pub async fn tap(&self, x: i32, y: i32) -> Result<()> {
        Ok(self.service.tap(x as f32, y as f32).await?)
    }

    /// Swipes from start to end; `duration_ms` defaults to the configured duration.
    pub async fn swipe(&self, start: (i32, i32), end: (i32, i32), duration_ms: Option<i64>) -> Result<()> {
        let duration = duration_ms.unwrap_or(self.config.swipe_duration_ms);
        self.service
            .swipe(start.0 as f32, start.1 as f32, end.0 as f32, end.1 as f32, duration)
            .await?;
        Ok(())
    }

    pub async fn touch_down(&self, x: i32, y: i32) -> Result<()> {
        Ok(self.service.touch_down(x as f32, y as f32).await?)
    }

    pub async fn touch_move(&self, x: i32, y: i32) -> Result<()> {
        Ok(self.service.touch_move(x as f32, y as f32).await?)
    }

    pub async fn touch_up(&self, x: i32, y: i32) -> Result<()> {
        Ok(self.service.touch_up(x as f32, y as f32).await?)
    }

    pub async fn key(&self, key_code: i32) -> Result<()> {
        Ok(self.service.inject_key(key_code).await?)
    }

    /// Fetches a screenshot, giving up after the configured timeout.
    pub async fn request_screenshot(&self) -> Result<Vec<u8>> {
        let limit = self.config.screenshot_timeout;
        match tokio::time::timeout(limit, self.service.request_screenshot()).await {
            Ok(image) => Ok(image?),
            Err(_) => Err(Error::Timeout(limit)),
        }
    }

    pub async fn attach_video_sink(&self, sink: Handle) -> Result<()> {
        Ok(self.service.set_video_sink(sink).await?)
    }

    /// Tears the session down: forgets local state, resets the frame relay, destroys
    /// the display and detaches the video sink. Both calls are attempted; the first
    /// failure is returned.
    pub async fn shutdown(&self) -> Result<()> {
        self.display_id.store(NO_DISPLAY, Ordering::Release);
        self.video_width.store(0, Ordering::Release);
        self.video_height.store(0, Ordering::Release);
        if let Some(relay) = &self.relay {
            relay.clear();
        }

        let destroyed = self.service.destroy_display().await;
        let detached = self.service.set_video_sink(Handle::NULL).await;
        if let Err(e) = &destroyed {
            tracing::error!(error = %e, "shutdown: destroyDisplay failed");
        }
        destroyed?;
        detached?;
        Ok(())
    }
}

type FrameHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

struct RelayState {
    handler: Option<FrameHandler>,
    early: VecDeque<Vec<u8>>,
}

/// A `VideoSink` that hands frames to a replaceable handler.
///
/// Frames arriving while no handler is installed are kept, up to a capacity with
/// the oldest dropped first, and replayed in order when a handler appears.
pub struct FrameRelay {
    state: Mutex<RelayState>,
    capacity: usize,
}

impl FrameRelay {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RelayState { handler: None, early: VecDeque::new() }),
            capacity,
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.early_frame_capacity)
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        // A panicking handler runs outside the lock, so poisoning only means a
        // panic mid-push; the queue is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Installs (or clears) the frame handler and replays anything buffered.
    pub fn set_handler(&self, handler: Option<FrameHandler>) {
        let replay: Vec<Vec<u8>> = {
            let mut state = self.lock();
            state.handler = handler.clone();
            if handler.is_some() { state.early.drain(..).collect() } else { Vec::new() }
        };
        if let Some(handler) = handler {
            if !replay.is_empty() {
                tracing::debug!(frames = replay.len(), "replaying buffered video frames");
            }
            for frame in &replay {
                deliver(&handler, frame);
            }
        }
    }

    /// Drops the handler and every buffered frame.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.handler = None;
        state.early.clear();
    }

    /// Frames currently waiting for a handler.
    pub fn buffered(&self) -> usize {
        self.lock().early.len()
    }
}

impl VideoSink for FrameRelay {
    fn on_video_frame(&self, frame: &[u8]) {
        let handler = {
            let mut state = self.lock();
            match &state.handler {
                Some(handler) => Some(handler.clone()),
                None => {
                    if self.capacity == 0 {
                        return;
                    }
                    if state.early.len() >= self.capacity {
                        state.early.pop_front();
                    }
                    state.early.push_back(frame.to_vec());
                    None
                }
            }
        };
        if let Some(handler) = handler {
            deliver(&handler, frame);
        }
    }
}

/// Runs the handler on one frame. A panic is logged and confined to that frame.
fn deliver(handler: &FrameHandler, frame: &[u8]) {
    if std::panic::catch_unwind(AssertUnwindSafe(|| handler(frame))).is_err() {
        tracing::error!(len = frame.len(), "video frame handler panicked");
    }
}
