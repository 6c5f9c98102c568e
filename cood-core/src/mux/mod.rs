//! Component E: share one upstream remote-OD-access link among up to 256
//! independent client ports, preserving per-port ready/not-ready semantics and
//! routing responses back to the port that requested them via the
//! return-stack.

mod port;
mod routing;

pub use port::{ClientNotifiable, PortHandle, PortLifecycle};

use cood_common::remote::{ReturnStackItem, ResponseMessage};
use parking_lot::{Mutex, RwLock};
use port::PortState;
use snafu::Snafu;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Something the multiplexer can forward requests to and register itself
/// against. A production implementation wraps a real transport connection;
/// tests substitute something that records calls.
pub trait UpstreamLink: Send + Sync {
    fn send_request(&self, owner_id: u32, return_stack_item: ReturnStackItem);
}

/// The multiplexer's own state machine, §4.E.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MuxState {
    NotConnected,
    NotReady,
    Ready,
    Disconnecting,
}

/// Errors from multiplexer operations that are not panics.
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
pub enum MultiplexerError {
    #[snafu(display("cannot create port {index}: maximum of {max} ports already reached"))]
    TooManyPorts { index: usize, max: usize },
    #[snafu(display("upstream link is not ready"))]
    NotReady,
}

struct Shared {
    state: MuxState,
    link: Option<Arc<dyn UpstreamLink>>,
}

/// Fans one upstream remote-OD-access link out to up to 256 ports.
///
/// Upstream callbacks (`on_ready`, `on_disconnected`, `on_request_processed`,
/// `loan_execution_context`) are serialized by `shared`'s mutex; client
/// notifications happen synchronously within that same call, never from a
/// thread the multiplexer spawns itself.
pub struct Multiplexer {
    owner_id: u32,
    max_n_ports: usize,
    shared: Mutex<Shared>,
    ports: RwLock<HashMap<u8, Arc<PortState>>>,
}

impl Multiplexer {
    pub fn new(owner_id: u32, max_n_ports: usize) -> Self {
        Self {
            owner_id,
            max_n_ports,
            shared: Mutex::new(Shared {
                state: MuxState::NotConnected,
                link: None,
            }),
            ports: RwLock::new(HashMap::new()),
        }
    }

    pub fn owner_id(&self) -> u32 {
        self.owner_id
    }

    // ---- multiplexer-side state machine ----

    /// `NotConnected -> NotReady`, registering `link` as the upstream.
    pub fn connect(&self, link: Arc<dyn UpstreamLink>) {
        let mut shared = self.shared.lock();
        if shared.state != MuxState::NotConnected {
            return;
        }
        shared.link = Some(link);
        shared.state = MuxState::NotReady;
        #[cfg(feature = "log")]
        log::debug!("multiplexer {} connected, awaiting ready", self.owner_id);
    }

    /// No-op from `NotConnected`; otherwise unregisters the link and returns to
    /// `NotConnected`.
    pub fn disconnect(&self) {
        let mut shared = self.shared.lock();
        if shared.state == MuxState::NotConnected {
            return;
        }
        shared.state = MuxState::Disconnecting;
        shared.link = None;
        shared.state = MuxState::NotConnected;
        drop(shared);

        let ports = self.ports.read();
        for state in ports.values() {
            self.set_port_not_ready(state);
        }
        #[cfg(feature = "log")]
        log::debug!("multiplexer {} disconnected", self.owner_id);
    }

    /// Upstream announced readiness: `NotReady -> Ready`. Every `NotReady` port
    /// flips to `Ready` and its client is notified.
    pub fn on_ready(&self, _max_request_size: u32, _max_response_size: u32) {
        let mut shared = self.shared.lock();
        if shared.state != MuxState::NotReady {
            return;
        }
        shared.state = MuxState::Ready;
        drop(shared);

        let ports = self.ports.read();
        for (&index, state) in ports.iter() {
            let new_session = state.session_id.load().wrapping_add(1);
            state.session_id.store(new_session);
            if *state.lifecycle.lock() == PortLifecycle::NotReady {
                self.set_port_ready(index, state);
            }
        }
    }

    /// Upstream reported disconnection: `Ready -> NotReady`, every ready port
    /// flips to `NotReady` (with client notification), pending-exec flags are
    /// cleared, and each port remembers its oldest-used session ID.
    pub fn on_disconnected(&self) {
        let mut shared = self.shared.lock();
        if shared.state != MuxState::Ready {
            return;
        }
        shared.state = MuxState::NotReady;
        drop(shared);

        let ports = self.ports.read();
        for state in ports.values() {
            state.exec_requested.store(false);
            state.oldest_used_session_id.store(state.session_id.load());
            if *state.lifecycle.lock() == PortLifecycle::Ready {
                self.set_port_not_ready(state);
            }
        }
    }

    /// Upstream loaned an execution context: ports sitting on a pending
    /// request get forwarded now; any `NotReady` port (reconnect race) flips
    /// to `Ready` first.
    pub fn loan_execution_context(&self) {
        let shared = self.shared.lock();
        if shared.state != MuxState::Ready {
            return;
        }
        let link = shared.link.clone();
        drop(shared);

        let ports = self.ports.read();
        for (&index, state) in ports.iter() {
            if *state.lifecycle.lock() == PortLifecycle::NotReady {
                self.set_port_ready(index, state);
            }
            if state.exec_requested.swap(false) {
                if let Some(link) = &link {
                    let item = ReturnStackItem {
                        id: self.owner_id,
                        info: routing::encode_info(index, false, state.session_id.load()),
                    };
                    link.send_request(self.owner_id, item);
                }
            }
        }
    }

    /// A response arrived from upstream carrying `item` as the top
    /// return-stack entry that was popped for it. Delivers to the owning
    /// port's client if `item.id` matches this multiplexer and the session is
    /// current; silently drops stale or mismatched responses.
    pub fn on_request_processed(&self, item: ReturnStackItem, response: ResponseMessage) {
        if item.id != self.owner_id {
            return;
        }
        let decoded = routing::decode_info(item.info);
        if decoded.gap != 0 {
            return;
        }

        let ports = self.ports.read();
        let Some(state) = ports.get(&decoded.port_index) else {
            #[cfg(feature = "log")]
            log::trace!("dropping response for unknown port {}", decoded.port_index);
            return;
        };

        if routing::session_is_stale(decoded.session_id, state.oldest_used_session_id.load()) {
            #[cfg(feature = "log")]
            log::trace!("dropping stale response for port {}", decoded.port_index);
            return;
        }
        if decoded.session_id != state.session_id.load() {
            #[cfg(feature = "log")]
            log::trace!("dropping response from a superseded session on port {}", decoded.port_index);
            return;
        }

        if decoded.my_ping {
            state.oldest_used_session_id.store(decoded.session_id);
            return;
        }

        let client = state.client.lock().clone();
        if let Some(client) = client {
            notify(|| client.on_response(response));
        }
    }

    // ---- port management ----

    /// Creates port `index`. Errors if `index >= max_n_ports`.
    pub fn create_port(&self, index: u8) -> Result<PortHandle, MultiplexerError> {
        if index as usize >= self.max_n_ports {
            return Err(MultiplexerError::TooManyPorts {
                index: index as usize,
                max: self.max_n_ports,
            });
        }
        let state = {
            let mut ports = self.ports.write();
            ports
                .entry(index)
                .or_insert_with(|| Arc::new(PortState::new()))
                .clone()
        };
        Ok(PortHandle { index, state })
    }

    pub fn attach_client(&self, port: &PortHandle, client: Arc<dyn ClientNotifiable>) {
        *port.state.client.lock() = Some(client);
        let is_ready = self.shared.lock().state == MuxState::Ready;
        if is_ready {
            self.set_port_ready(port.index, &port.state);
        } else {
            *port.state.lifecycle.lock() = PortLifecycle::NotReady;
        }
    }

    /// Forwards `return_stack_item`'s owning request upstream on behalf of
    /// `port`, pushing the routing item that identifies it.
    pub fn forward(&self, port: &PortHandle) -> Result<ReturnStackItem, MultiplexerError> {
        let shared = self.shared.lock();
        if shared.state != MuxState::Ready {
            return Err(MultiplexerError::NotReady);
        }
        Ok(ReturnStackItem {
            id: self.owner_id,
            info: routing::encode_info(port.index, false, port.state.session_id.load()),
        })
    }

    /// Sends this port's own ping (`my_ping=true`) to detect that all
    /// responses from the previous session have drained.
    pub fn send_own_ping(&self, port: &PortHandle) -> ReturnStackItem {
        ReturnStackItem {
            id: self.owner_id,
            info: routing::encode_info(port.index, true, port.state.session_id.load()),
        }
    }

    pub fn request_execution(&self, port: &PortHandle) {
        port.state.exec_requested.store(true);
    }

    fn set_port_ready(&self, index: u8, state: &Arc<PortState>) {
        *state.lifecycle.lock() = PortLifecycle::Ready;
        let client = state.client.lock().clone();
        if let Some(client) = client {
            notify(|| client.on_ready());
        }
        let _ = index;
    }

    fn set_port_not_ready(&self, state: &Arc<PortState>) {
        let mut lifecycle = state.lifecycle.lock();
        if *lifecycle == PortLifecycle::Ready {
            *lifecycle = PortLifecycle::NotReady;
        }
        drop(lifecycle);
        let client = state.client.lock().clone();
        if let Some(client) = client {
            notify(|| client.on_not_ready());
        }
    }

    /// Consumes the multiplexer. Panics if still connected, or if any
    /// [`PortHandle`] is still externally referenced.
    pub fn destroy(self) {
        if self.shared.lock().state != MuxState::NotConnected {
            panic!("Multiplexer::destroy: multiplexer destroyed while still connected");
        }
        for (index, state) in self.ports.read().iter() {
            if Arc::strong_count(state) > 1 {
                panic!("Multiplexer::destroy: port {index} handle still referenced");
            }
        }
    }
}

/// Runs a client notification, catching and logging a panic rather than
/// letting it unwind into the multiplexer's own call stack -- notifications
/// are documented as noexcept from the multiplexer's point of view.
fn notify<F: FnOnce()>(f: F) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        #[cfg(feature = "log")]
        log::warn!("client notification panicked; dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cood_common::remote::{Response, ResponseMessage, ReturnStack};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingLink {
        sent: Mutex<Vec<ReturnStackItem>>,
    }
    impl UpstreamLink for RecordingLink {
        fn send_request(&self, _owner_id: u32, item: ReturnStackItem) {
            self.sent.lock().push(item);
        }
    }

    struct CountingClient {
        ready_count: AtomicUsize,
        not_ready_count: AtomicUsize,
        responses: AtomicUsize,
    }
    impl CountingClient {
        fn new() -> Self {
            Self {
                ready_count: AtomicUsize::new(0),
                not_ready_count: AtomicUsize::new(0),
                responses: AtomicUsize::new(0),
            }
        }
    }
    impl ClientNotifiable for CountingClient {
        fn on_ready(&self) {
            self.ready_count.fetch_add(1, Ordering::SeqCst);
        }
        fn on_not_ready(&self) {
            self.not_ready_count.fetch_add(1, Ordering::SeqCst);
        }
        fn on_response(&self, _response: ResponseMessage) {
            self.responses.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn dummy_response() -> ResponseMessage {
        ResponseMessage::new(ReturnStack::new(), Response::Ping)
    }

    #[test]
    fn port_creation_respects_max() {
        let mux = Multiplexer::new(1, 2);
        mux.create_port(0).unwrap();
        mux.create_port(1).unwrap();
        assert_eq!(
            mux.create_port(2),
            Err(MultiplexerError::TooManyPorts { index: 2, max: 2 })
        );
    }

    #[test]
    fn port_becomes_ready_when_mux_becomes_ready() {
        let mux = Multiplexer::new(1, 4);
        let port = mux.create_port(0).unwrap();
        let client = Arc::new(CountingClient::new());
        mux.attach_client(&port, client.clone());
        assert_eq!(port.lifecycle(), PortLifecycle::NotReady);

        let link = Arc::new(RecordingLink { sent: Mutex::new(Vec::new()) });
        mux.connect(link);
        mux.on_ready(1024, 1024);

        assert_eq!(port.lifecycle(), PortLifecycle::Ready);
        assert_eq!(client.ready_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disconnect_notifies_ready_ports() {
        let mux = Multiplexer::new(1, 4);
        let port = mux.create_port(0).unwrap();
        let client = Arc::new(CountingClient::new());
        mux.attach_client(&port, client.clone());
        mux.connect(Arc::new(RecordingLink { sent: Mutex::new(Vec::new()) }));
        mux.on_ready(1024, 1024);

        mux.on_disconnected();
        assert_eq!(port.lifecycle(), PortLifecycle::NotReady);
        assert_eq!(client.not_ready_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn response_with_wrong_owner_id_is_dropped() {
        let mux = Multiplexer::new(1, 4);
        let port = mux.create_port(0).unwrap();
        let client = Arc::new(CountingClient::new());
        mux.attach_client(&port, client.clone());

        let item = ReturnStackItem {
            id: 99,
            info: routing::encode_info(0, false, 0),
        };
        mux.on_request_processed(item, dummy_response());
        assert_eq!(client.responses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn response_is_delivered_to_the_matching_port() {
        let mux = Multiplexer::new(7, 4);
        let port = mux.create_port(0).unwrap();
        let client = Arc::new(CountingClient::new());
        mux.attach_client(&port, client.clone());

        let item = ReturnStackItem {
            id: 7,
            info: routing::encode_info(0, false, port.session_id()),
        };
        mux.on_request_processed(item, dummy_response());
        assert_eq!(client.responses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_session_response_is_dropped() {
        let mux = Multiplexer::new(7, 4);
        let port = mux.create_port(0).unwrap();
        let client = Arc::new(CountingClient::new());
        mux.attach_client(&port, client.clone());
        mux.connect(Arc::new(RecordingLink { sent: Mutex::new(Vec::new()) }));
        mux.on_ready(1024, 1024);
        let stale_session = port.session_id();
        mux.on_disconnected();
        mux.on_ready(1024, 1024);

        let item = ReturnStackItem {
            id: 7,
            info: routing::encode_info(0, false, stale_session),
        };
        mux.on_request_processed(item, dummy_response());
        assert_eq!(client.responses.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[should_panic(expected = "still connected")]
    fn destroy_panics_while_connected() {
        let mux = Multiplexer::new(1, 4);
        mux.connect(Arc::new(RecordingLink { sent: Mutex::new(Vec::new()) }));
        mux.destroy();
    }

    #[test]
    #[should_panic(expected = "still referenced")]
    fn destroy_panics_with_live_port_handle() {
        let mux = Multiplexer::new(1, 4);
        let _port = mux.create_port(0).unwrap();
        mux.destroy();
    }
}
