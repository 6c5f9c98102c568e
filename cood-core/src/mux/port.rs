//! Per-port state and the client-facing handle.

use cood_common::remote::ResponseMessage;
use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use std::sync::Arc;

/// A port's readiness, mirroring the multiplexer's own state machine one level
/// down: a port only reaches `Ready` while the multiplexer itself is `Ready`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortLifecycle {
    NoClient,
    NotReady,
    Ready,
}

/// Notified of readiness changes and delivered responses routed to this port.
///
/// Must not re-enter `connect`/`disconnect` on the owning [`super::Multiplexer`]
/// -- notifications run synchronously on the multiplexer's callback thread.
pub trait ClientNotifiable: Send + Sync {
    fn on_ready(&self) {}
    fn on_not_ready(&self) {}
    fn on_response(&self, response: ResponseMessage) {
        let _ = response;
    }
}

pub(crate) struct PortState {
    pub(crate) client: Mutex<Option<Arc<dyn ClientNotifiable>>>,
    pub(crate) lifecycle: Mutex<PortLifecycle>,
    pub(crate) session_id: AtomicCell<u8>,
    pub(crate) oldest_used_session_id: AtomicCell<u8>,
    pub(crate) exec_requested: AtomicCell<bool>,
}

impl PortState {
    pub(crate) fn new() -> Self {
        Self {
            client: Mutex::new(None),
            lifecycle: Mutex::new(PortLifecycle::NoClient),
            session_id: AtomicCell::new(0),
            oldest_used_session_id: AtomicCell::new(0),
            exec_requested: AtomicCell::new(false),
        }
    }
}

/// A handle to a port created by [`super::Multiplexer::create_port`].
///
/// Holding a handle keeps the port's state alive; destroying the multiplexer
/// while any handle is still referenced is a contract violation (panics), the
/// same "still referenced" shape as [`crate::dict::ObjectHandle`].
pub struct PortHandle {
    pub(crate) index: u8,
    pub(crate) state: Arc<PortState>,
}

impl PortHandle {
    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn set_client(&self, client: Arc<dyn ClientNotifiable>) {
        *self.state.client.lock() = Some(client);
    }

    pub fn clear_client(&self) {
        *self.state.client.lock() = None;
        *self.state.lifecycle.lock() = PortLifecycle::NoClient;
    }

    pub fn lifecycle(&self) -> PortLifecycle {
        *self.state.lifecycle.lock()
    }

    pub fn session_id(&self) -> u8 {
        self.state.session_id.load()
    }
}
