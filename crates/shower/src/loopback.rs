//! In-memory channel transport.
//!
//! Pairs a client-side `Transport` with a dispatcher running in a spawned task, so
//! every call really goes through encode, channel, dispatch, reply and decode. It
//! never answers the capability query, which forces the remote path even though
//! both halves share a process.

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::dispatcher::Dispatcher;
use crate::transport;
use crate::transport::Transaction;
use crate::transport::Transport;

struct Request {
    code: u32,
    data: Vec<u8>,
    reply: oneshot::Sender<transport::Result<Transaction>>,
}

/// Client half of a loopback channel. Dropping it stops the server task.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<Request>,
    server: JoinHandle<()>,
}

impl LoopbackTransport {
    /// Spawns the server half on the current tokio runtime.
    ///
    /// Each inbound transaction is handled in its own task, so the dispatcher sees
    /// concurrent calls exactly as it would behind a threaded transport.
    pub fn spawn(dispatcher: Dispatcher) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Request>();

        let server = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let outcome = dispatcher
                        .transact(request.code, &request.data)
                        .await
                        .map_err(|e| transport::Error::Io(e.to_string()));
                    // ignore if the caller gave up
                    let _ = request.reply.send(outcome);
                });
            }
            tracing::debug!("loopback server stopped");
        });

        Self { tx, server }
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[async_trait::async_trait]
impl Transport for LoopbackTransport {
    async fn transact(&self, code: u32, data: &[u8]) -> transport::Result<Transaction> {
        let (reply, rx) = oneshot::channel();
        let request = Request { code, data: data.to_vec(), reply };

        self.tx
            .send(request)
            .map_err(|_| transport::Error::ConnectionLost("loopback server closed".into()))?;

        rx.await
            .map_err(|_| transport::Error::ConnectionLost("reply channel dropped".into()))?
    }
}
