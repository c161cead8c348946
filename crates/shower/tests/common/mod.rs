//! Shared fixtures: an in-memory host service and a transport that counts traffic.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;

use shower::Error;
use shower::ExceptionCode;
use shower::Handle;
use shower::HandleTable;
use shower::RemoteException;
use shower::Result;
use shower::ShowerService;
use shower::Transaction;
use shower::Transport;
use shower::VideoSink;
use shower::transport;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A call as the host saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    EnsureDisplay(i32, i32, i32, i32),
    DestroyDisplay,
    LaunchApp(String),
    Tap(f32, f32),
    Swipe(f32, f32, f32, f32, i64),
    TouchDown(f32, f32),
    TouchMove(f32, f32),
    TouchUp(f32, f32),
    InjectKey(i32),
    RequestScreenshot,
    GetDisplayId,
    SetVideoSink(Handle),
}

#[derive(Default)]
struct HostState {
    display: Option<i32>,
    next_id: i32,
    sink: Option<Arc<dyn VideoSink>>,
}

/// Host-side service backed by plain memory.
///
/// Display ids start at 2 and advance on every fresh display. Input without an
/// active display fails with `IllegalState("no active display")`.
pub struct MockShower {
    state: Mutex<HostState>,
    calls: Mutex<Vec<Call>>,
    invocations: AtomicUsize,
    screenshot: Vec<u8>,
    pub sinks: HandleTable<dyn VideoSink>,
    screenshot_delay: Option<Duration>,
    reported_id: Option<i32>,
    key_failure: Option<ExceptionCode>,
}

impl MockShower {
    pub fn new() -> Self {
        Self::with_screenshot(b"\x89PNG\r\n\x1a\nfake-image".to_vec())
    }

    pub fn with_screenshot(screenshot: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(HostState { next_id: 2, ..HostState::default() }),
            calls: Mutex::new(Vec::new()),
            invocations: AtomicUsize::new(0),
            screenshot,
            sinks: HandleTable::new(),
            screenshot_delay: None,
            reported_id: None,
            key_failure: None,
        }
    }

    /// Makes `request_screenshot` stall before answering.
    pub fn with_screenshot_delay(mut self, delay: Duration) -> Self {
        self.screenshot_delay = Some(delay);
        self
    }

    /// Makes `get_display_id` report this id regardless of state.
    pub fn reporting_display_id(mut self, id: i32) -> Self {
        self.reported_id = Some(id);
        self
    }

    /// Makes `inject_key` fail with this status code.
    pub fn failing_keys_with(mut self, code: ExceptionCode) -> Self {
        self.key_failure = Some(code);
        self
    }

    /// Number of times any operation was entered.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Pushes a frame to the attached sink, if any. Returns whether it was delivered.
    pub fn emit_frame(&self, frame: &[u8]) -> bool {
        let sink = self.state.lock().unwrap().sink.clone();
        match sink {
            Some(sink) => {
                sink.on_video_frame(frame);
                true
            }
            None => false,
        }
    }

    fn record(&self, call: Call) {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call);
    }

    fn require_display(&self) -> Result<i32> {
        self.state
            .lock()
            .unwrap()
            .display
            .ok_or_else(|| RemoteException::illegal_state("no active display").into())
    }
}

#[async_trait]
impl ShowerService for MockShower {
    async fn ensure_display(&self, width: i32, height: i32, dpi: i32, bitrate_kbps: i32) -> Result<()> {
        self.record(Call::EnsureDisplay(width, height, dpi, bitrate_kbps));
        if width <= 0 || height <= 0 || dpi <= 0 {
            return Err(RemoteException::illegal_argument("display size must be positive").into());
        }
        let mut state = self.state.lock().unwrap();
        if state.display.is_none() {
            state.display = Some(state.next_id);
            state.next_id += 1;
        }
        Ok(())
    }

    async fn destroy_display(&self) -> Result<()> {
        self.record(Call::DestroyDisplay);
        self.state.lock().unwrap().display = None;
        Ok(())
    }

    async fn launch_app(&self, package_name: &str) -> Result<()> {
        self.record(Call::LaunchApp(package_name.to_string()));
        self.require_display()?;
        if !package_name.starts_with("com.") {
            return Err(Error::remote(format!("package not found: {}", package_name)));
        }
        Ok(())
    }

    async fn tap(&self, x: f32, y: f32) -> Result<()> {
        self.record(Call::Tap(x, y));
        self.require_display().map(|_| ())
    }

    async fn swipe(&self, x1: f32, y1: f32, x2: f32, y2: f32, duration_ms: i64) -> Result<()> {
        self.record(Call::Swipe(x1, y1, x2, y2, duration_ms));
        self.require_display().map(|_| ())
    }

    async fn touch_down(&self, x: f32, y: f32) -> Result<()> {
        self.record(Call::TouchDown(x, y));
        self.require_display().map(|_| ())
    }

    async fn touch_move(&self, x: f32, y: f32) -> Result<()> {
        self.record(Call::TouchMove(x, y));
        self.require_display().map(|_| ())
    }

    async fn touch_up(&self, x: f32, y: f32) -> Result<()> {
        self.record(Call::TouchUp(x, y));
        self.require_display().map(|_| ())
    }

    async fn inject_key(&self, key_code: i32) -> Result<()> {
        self.record(Call::InjectKey(key_code));
        if let Some(code) = self.key_failure {
            let message = "permission denied: INJECT_EVENTS".to_string();
            return Err(RemoteException { code, message }.into());
        }
        self.require_display().map(|_| ())
    }

    async fn request_screenshot(&self) -> Result<Vec<u8>> {
        self.record(Call::RequestScreenshot);
        if let Some(delay) = self.screenshot_delay {
            tokio::time::sleep(delay).await;
        }
        self.require_display()?;
        Ok(self.screenshot.clone())
    }

    async fn get_display_id(&self) -> Result<i32> {
        self.record(Call::GetDisplayId);
        if let Some(id) = self.reported_id {
            return Ok(id);
        }
        Ok(self.state.lock().unwrap().display.unwrap_or(-1))
    }

    async fn set_video_sink(&self, sink: Handle) -> Result<()> {
        self.record(Call::SetVideoSink(sink));
        let resolved = if sink.is_null() {
            None
        } else {
            let found = self.sinks.get(sink);
            if found.is_none() {
                return Err(RemoteException::illegal_argument(format!("unknown sink {}", sink)).into());
            }
            found
        };
        self.state.lock().unwrap().sink = resolved;
        Ok(())
    }
}

/// Wraps a transport and counts how often it is asked to move bytes.
pub struct SpyTransport<T> {
    pub inner: T,
    transactions: AtomicUsize,
}

impl<T: Transport> SpyTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, transactions: AtomicUsize::new(0) }
    }

    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Transport> Transport for SpyTransport<T> {
    async fn transact(&self, code: u32, data: &[u8]) -> transport::Result<Transaction> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        self.inner.transact(code, data).await
    }

    fn query_local(&self, descriptor: &str) -> Option<Arc<dyn ShowerService>> {
        self.inner.query_local(descriptor)
    }
}

/// A transport whose peer is gone.
pub struct DeadTransport;

#[async_trait]
impl Transport for DeadTransport {
    async fn transact(&self, _code: u32, _data: &[u8]) -> transport::Result<Transaction> {
        Err(transport::Error::ConnectionLost("peer process exited".into()))
    }
}
