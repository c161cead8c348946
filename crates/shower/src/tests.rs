//! Unit tests for the shower crate: error mapping, handle tables, transports,
//! the proxy against scripted replies and the frame relay.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use showerpack::Encoder;
use showerpack::Handle;
use showerrpc::Arg;
use showerrpc::ExceptionCode;
use showerrpc::Failure;
use showerrpc::Method;
use showerrpc::ReplyEncoder;

use crate::controller::ControllerConfig;
use crate::controller::FrameRelay;
use crate::error::Error;
use crate::error::RemoteException;
use crate::handle::HandleTable;
use crate::proxy::RemoteProxy;
use crate::service::ShowerService;
use crate::service::VideoSink;
use crate::transport;
use crate::transport::TimeoutTransport;
use crate::transport::Transaction;
use crate::transport::Transport;

/// Transport that answers every transaction with the same canned outcome and
/// remembers what it was sent.
struct ScriptedTransport {
    outcome: transport::Result<Transaction>,
    sent: Mutex<Vec<(u32, Vec<u8>)>>,
}

impl ScriptedTransport {
    fn new(outcome: transport::Result<Transaction>) -> Arc<Self> {
        Arc::new(Self { outcome, sent: Mutex::new(Vec::new()) })
    }

    fn reply(reply: ReplyEncoder<'_>) -> Arc<Self> {
        let bytes = reply.to_bytes().expect("reply encodes");
        Self::new(Ok(Transaction::Reply(bytes)))
    }

    fn sent(&self) -> Vec<(u32, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn transact(&self, code: u32, data: &[u8]) -> transport::Result<Transaction> {
        self.sent.lock().unwrap().push((code, data.to_vec()));
        self.outcome.clone()
    }
}

fn proxy_over(remote: Arc<ScriptedTransport>) -> RemoteProxy {
    RemoteProxy::new(remote)
}

// ============================================================================
//  ERROR MAPPING
// ============================================================================

#[test]
fn test_failure_codes_map_back_to_taxonomy() {
    let security = Failure { code: ExceptionCode::Security, message: "bad token".into() };
    assert_eq!(Error::from_failure(security), Error::DescriptorMismatch("bad token".into()));

    let parcel = Failure { code: ExceptionCode::BadParcelable, message: "short".into() };
    assert_eq!(Error::from_failure(parcel), Error::Encoding("short".into()));

    let state = Failure { code: ExceptionCode::IllegalState, message: "no active display".into() };
    assert_eq!(
        Error::from_failure(state),
        Error::Remote(RemoteException::illegal_state("no active display"))
    );

    let unknown = Failure { code: ExceptionCode::Other(-42), message: "odd".into() };
    match Error::from_failure(unknown) {
        Error::Remote(ex) => assert_eq!(ex.code.as_i32(), -42),
        other => panic!("expected Remote, got {:?}", other),
    }
}

#[test]
fn test_remote_failure_survives_round_trip() {
    let original = Error::Remote(RemoteException::illegal_argument("width must be positive"));
    let failure = original.to_failure();
    assert_eq!(failure.code, ExceptionCode::IllegalArgument);
    assert_eq!(Error::from_failure(failure), original);
}

#[test]
fn test_remote_exception_with_ok_code_is_not_written_as_success() {
    let sneaky = Error::Remote(RemoteException { code: ExceptionCode::Ok, message: "oops".into() });
    let failure = sneaky.to_failure();
    assert!(!failure.code.is_ok());
    assert_eq!(failure.message, "oops");
}

#[test]
fn test_reserved_codes_raised_by_service_stay_remote() {
    for code in [ExceptionCode::Security, ExceptionCode::BadParcelable, ExceptionCode::Other(-1)] {
        let raised = Error::Remote(RemoteException { code, message: "permission denied: INJECT_EVENTS".into() });
        let failure = raised.to_failure();
        assert_eq!(failure.code, ExceptionCode::ServiceSpecific, "{:?}", code);
        assert_eq!(
            Error::from_failure(failure),
            Error::remote("permission denied: INJECT_EVENTS")
        );
    }
}

#[test]
fn test_rpc_errors_convert_by_kind() {
    let mismatch = showerrpc::Error::DescriptorMismatch { expected: "a".into(), found: "b".into() };
    assert!(matches!(Error::from(mismatch), Error::DescriptorMismatch(_)));

    let truncated = showerrpc::Error::Encoding(showerpack::Error::UnexpectedEnd);
    assert!(matches!(Error::from(truncated), Error::Encoding(_)));

    assert_eq!(Error::from(transport::Error::Timeout), Error::Transport(transport::Error::Timeout));
}

// ============================================================================
//  HANDLE TABLE
// ============================================================================

struct Counter(AtomicUsize);

impl VideoSink for Counter {
    fn on_video_frame(&self, _frame: &[u8]) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_handle_table_insert_get_remove() {
    let table: HandleTable<dyn VideoSink> = HandleTable::new();
    let sink = Arc::new(Counter(AtomicUsize::new(0)));

    let handle = table.insert(sink.clone());
    assert!(!handle.is_null());
    assert_eq!(table.len(), 1);

    table.get(handle).expect("registered").on_video_frame(b"frame");
    assert_eq!(sink.0.load(Ordering::SeqCst), 1);

    assert!(table.remove(handle).is_some());
    assert!(table.get(handle).is_none());
    assert!(table.is_empty());
}

#[test]
fn test_handle_table_null_and_unknown_resolve_to_none() {
    let table: HandleTable<dyn VideoSink> = HandleTable::default();
    assert!(table.get(Handle::NULL).is_none());
    assert!(table.get(Handle::from_raw(999)).is_none());
}

#[test]
fn test_handle_table_mints_distinct_handles() {
    let table: HandleTable<dyn VideoSink> = HandleTable::new();
    let a = table.insert(Arc::new(Counter(AtomicUsize::new(0))));
    let b = table.insert(Arc::new(Counter(AtomicUsize::new(0))));
    assert_ne!(a, b);
    assert_eq!(table.len(), 2);
}

// ============================================================================
//  PROXY AGAINST SCRIPTED REPLIES
// ============================================================================

#[tokio::test]
async fn test_proxy_sends_registry_code_and_descriptor() {
    let remote = ScriptedTransport::reply(ReplyEncoder::ok(None));
    let proxy = proxy_over(remote.clone());

    proxy.inject_key(66).await.expect("ok reply");

    let sent = remote.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Method::InjectKey.code());

    let call = showerrpc::CallDecoder::decode(showerrpc::DESCRIPTOR, Method::InjectKey, &sent[0].1)
        .expect("proxy writes a well-formed call");
    assert_eq!(call.args, vec![Arg::S32(66)]);
}

#[tokio::test]
async fn test_proxy_maps_unhandled_to_unknown_opcode() {
    let proxy = proxy_over(ScriptedTransport::new(Ok(Transaction::Unhandled)));
    let err = proxy.destroy_display().await.unwrap_err();
    assert_eq!(err, Error::UnknownOpcode(Method::DestroyDisplay.code()));
}

#[tokio::test]
async fn test_proxy_surfaces_transport_failure_once() {
    let remote = ScriptedTransport::new(Err(transport::Error::ConnectionLost("peer died".into())));
    let proxy = proxy_over(remote.clone());

    let err = proxy.tap(1.0, 2.0).await.unwrap_err();
    assert!(matches!(err, Error::Transport(transport::Error::ConnectionLost(_))));
    assert_eq!(remote.sent().len(), 1, "no retry");
}

#[tokio::test]
async fn test_proxy_reports_failure_reply_message_verbatim() {
    let remote = ScriptedTransport::reply(ReplyEncoder::err(ExceptionCode::ServiceSpecific, "package not found"));
    let proxy = proxy_over(remote);

    let err = proxy.launch_app("com.missing").await.unwrap_err();
    assert_eq!(err, Error::remote("package not found"));
}

#[tokio::test]
async fn test_proxy_rejects_truncated_reply() {
    let mut enc = Encoder::new();
    enc.s32(0);
    let mut bytes = enc.into_bytes();
    bytes.pop();
    let proxy = proxy_over(ScriptedTransport::new(Ok(Transaction::Reply(bytes))));

    assert!(matches!(proxy.get_display_id().await, Err(Error::Encoding(_))));
}

#[tokio::test]
async fn test_proxy_decodes_results() {
    let id = Arg::S32(7);
    let proxy = proxy_over(ScriptedTransport::reply(ReplyEncoder::ok(Some(&id))));
    assert_eq!(proxy.get_display_id().await.unwrap(), 7);

    let image = Arg::Bytes(vec![0x89, b'P', b'N', b'G', 0, 255]);
    let proxy = proxy_over(ScriptedTransport::reply(ReplyEncoder::ok(Some(&image))));
    assert_eq!(proxy.request_screenshot().await.unwrap(), vec![0x89, b'P', b'N', b'G', 0, 255]);
}

#[tokio::test]
async fn test_proxy_interface_descriptor() {
    let mut enc = Encoder::new();
    showerrpc::encode_interface_reply(&mut enc, showerrpc::DESCRIPTOR).unwrap();
    let remote = ScriptedTransport::new(Ok(Transaction::Reply(enc.into_bytes())));
    let proxy = proxy_over(remote.clone());

    assert_eq!(proxy.interface_descriptor().await.unwrap(), showerrpc::DESCRIPTOR);
    assert_eq!(remote.sent()[0].0, showerrpc::INTERFACE_TRANSACTION);
}

// ============================================================================
//  TIMEOUT TRANSPORT
// ============================================================================

struct SlowTransport(Duration);

#[async_trait::async_trait]
impl Transport for SlowTransport {
    async fn transact(&self, _code: u32, _data: &[u8]) -> transport::Result<Transaction> {
        tokio::time::sleep(self.0).await;
        Ok(Transaction::Unhandled)
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_transport_expires() {
    let bounded = TimeoutTransport::new(SlowTransport(Duration::from_secs(10)), Duration::from_secs(1));
    assert_eq!(bounded.timeout(), Duration::from_secs(1));
    assert_eq!(bounded.transact(1, &[]).await, Err(transport::Error::Timeout));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_transport_passes_fast_replies() {
    let bounded = TimeoutTransport::new(SlowTransport(Duration::from_millis(5)), Duration::from_secs(1));
    assert_eq!(bounded.transact(1, &[]).await, Ok(Transaction::Unhandled));
    assert!(bounded.query_local(showerrpc::DESCRIPTOR).is_none());
}

// ============================================================================
//  CONTROLLER CONFIG & FRAME RELAY
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = ControllerConfig::default();
    assert_eq!(config.screenshot_timeout, Duration::from_millis(3000));
    assert_eq!(config.swipe_duration_ms, 300);
    assert_eq!(config.early_frame_capacity, 120);
    assert_eq!(config.size_alignment, 8);
}

#[test]
fn test_config_align() {
    let config = ControllerConfig::default();
    assert_eq!(config.align(1080), 1080);
    assert_eq!(config.align(1085), 1080);
    assert_eq!(config.align(7), 7, "falls back to the raw size");

    let config = config.with_size_alignment(0);
    assert_eq!(config.size_alignment, 1);
    assert_eq!(config.align(1085), 1085);
}

#[test]
fn test_align_with_literal_zero_alignment() {
    let config = ControllerConfig { size_alignment: 0, ..ControllerConfig::default() };
    assert_eq!(config.align(1085), 1085);

    let config = ControllerConfig { size_alignment: -8, ..ControllerConfig::default() };
    assert_eq!(config.align(1920), 1920);
}

fn collecting_handler() -> (Arc<Mutex<Vec<Vec<u8>>>>, Arc<dyn Fn(&[u8]) + Send + Sync>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler: Arc<dyn Fn(&[u8]) + Send + Sync> = Arc::new(move |frame: &[u8]| {
        sink.lock().unwrap().push(frame.to_vec());
    });
    (seen, handler)
}

#[test]
fn test_relay_replays_early_frames_in_order() {
    let relay = FrameRelay::new(4);
    relay.on_video_frame(b"one");
    relay.on_video_frame(b"two");
    assert_eq!(relay.buffered(), 2);

    let (seen, handler) = collecting_handler();
    relay.set_handler(Some(handler));
    relay.on_video_frame(b"three");

    assert_eq!(relay.buffered(), 0);
    assert_eq!(*seen.lock().unwrap(), vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
}

#[test]
fn test_relay_drops_oldest_beyond_capacity() {
    let relay = FrameRelay::from_config(&ControllerConfig::default().with_early_frame_capacity(2));
    for frame in [b"a", b"b", b"c"] {
        relay.on_video_frame(frame);
    }
    assert_eq!(relay.buffered(), 2);

    let (seen, handler) = collecting_handler();
    relay.set_handler(Some(handler));
    assert_eq!(*seen.lock().unwrap(), vec![b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_relay_buffers_again_after_handler_cleared() {
    let relay = FrameRelay::new(8);
    let (seen, handler) = collecting_handler();
    relay.set_handler(Some(handler));
    relay.set_handler(None);

    relay.on_video_frame(b"late");
    assert_eq!(relay.buffered(), 1);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_relay_with_zero_capacity_keeps_nothing() {
    let relay = FrameRelay::new(0);
    relay.on_video_frame(b"x");
    assert_eq!(relay.buffered(), 0);
}

#[test]
fn test_relay_clear_drops_handler_and_backlog() {
    let relay = FrameRelay::new(8);
    relay.on_video_frame(b"early");
    let (seen, handler) = collecting_handler();
    relay.set_handler(Some(handler));
    relay.on_video_frame(b"more");
    relay.on_video_frame(b"again");
    assert_eq!(seen.lock().unwrap().len(), 3);

    relay.clear();
    relay.on_video_frame(b"after");
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(relay.buffered(), 1);

    relay.clear();
    assert_eq!(relay.buffered(), 0);
}

#[test]
fn test_relay_replay_survives_a_panicking_frame() {
    let relay = FrameRelay::new(8);
    for frame in [b"one".as_slice(), b"bad", b"three"] {
        relay.on_video_frame(frame);
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler: Arc<dyn Fn(&[u8]) + Send + Sync> = Arc::new(move |frame: &[u8]| {
        if frame == b"bad" {
            panic!("corrupt frame");
        }
        sink.lock().unwrap().push(frame.to_vec());
    });
    relay.set_handler(Some(handler));
    relay.on_video_frame(b"bad");
    relay.on_video_frame(b"four");

    assert_eq!(
        *seen.lock().unwrap(),
        vec![b"one".to_vec(), b"three".to_vec(), b"four".to_vec()]
    );
    assert_eq!(relay.buffered(), 0);
}
