//! # Interface Resolution
//!
//! Turns a transport-level target into something that speaks `ShowerService`.
//!
//! A target that fronts an implementation in this process answers the capability
//! query and is used directly; anything else is wrapped in a `RemoteProxy`. The
//! caller gets an `Arc<dyn ShowerService>` either way.

use std::sync::Arc;

use async_trait::async_trait;
use showerrpc::DESCRIPTOR;

use crate::dispatcher::Dispatcher;
use crate::proxy::RemoteProxy;
use crate::service::ShowerService;
use crate::transport;
use crate::transport::Transaction;
use crate::transport::Transport;

/// The publishable, in-process face of a service implementation.
///
/// Over the wire it behaves like any transport endpoint, routing transactions into
/// its dispatcher. In the same process it answers `query_local` with the
/// implementation itself.
#[derive(Clone)]
pub struct Stub {
    dispatcher: Dispatcher,
}

impl Stub {
    pub fn new(service: Arc<dyn ShowerService>) -> Self {
        Self { dispatcher: Dispatcher::new(service) }
    }

    pub fn from_dispatcher(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[async_trait]
impl Transport for Stub {
    async fn transact(&self, code: u32, data: &[u8]) -> transport::Result<Transaction> {
        self.dispatcher
            .transact(code, data)
            .await
            .map_err(|e| transport::Error::Io(format!("reply encoding failed: {}", e)))
    }

    fn query_local(&self, descriptor: &str) -> Option<Arc<dyn ShowerService>> {
        (descriptor == self.dispatcher.descriptor()).then(|| self.dispatcher.service().clone())
    }
}

/// Resolves a target to the shower interface.
///
/// Same-process targets come back as the exact implementation they wrap, so
/// resolving the same local target twice yields the same `Arc`.
pub fn resolve(target: &Arc<dyn Transport>) -> Arc<dyn ShowerService> {
    if let Some(local) = target.query_local(DESCRIPTOR) {
        tracing::debug!("resolved shower target to local implementation");
        return local;
    }
    tracing::debug!("resolved shower target to remote proxy");
    Arc::new(RemoteProxy::new(target.clone()))
}

/// `resolve` for a target that may be absent.
pub fn resolve_opt(target: Option<&Arc<dyn Transport>>) -> Option<Arc<dyn ShowerService>> {
    target.map(resolve)
}
