//! WebSocket connection and event loop.
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming messages from the renderer host (responses, events)
//! - Outgoing requests from the shell
//! - Request/response correlation by UUID
//! - Event handler callbacks
//!
//! Requests come in two flavours. [`Connection::send`] waits for the
//! response. [`Connection::post`] returns immediately; its response is
//! still correlated and an error response is logged.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Event, Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 256;

/// Timeout for the READY handshake.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Map of request IDs to response channels.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<Response>>>;

/// Event handler callback type.
///
/// Called on the event loop task for each event received from the host.
/// Must not block.
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

// ============================================================================
// ReadyData
// ============================================================================

/// Data received in the READY handshake message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyData {
    /// Initial content area width.
    pub width: u32,
    /// Initial content area height.
    pub height: u32,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and route its response.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the renderer host.
///
/// `Send + Sync` and cheap to clone; every clone drives the same socket.
/// The socket stays open until [`shutdown`](Self::shutdown) is called or
/// the host disconnects.
#[derive(Clone)]
pub struct Connection {
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    correlation: Arc<Mutex<CorrelationMap>>,
    event_handler: Arc<Mutex<Option<EventHandler>>>,
    closed_rx: watch::Receiver<bool>,
    /// READY receiver, registered before the event loop starts.
    ready_rx: Arc<Mutex<Option<oneshot::Receiver<Result<Response>>>>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection {
    /// Creates a new connection from a WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub(crate) fn new(ws_stream: WebSocketStream<TcpStream>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let event_handler: Arc<Mutex<Option<EventHandler>>> = Arc::new(Mutex::new(None));

        let (ready_tx, ready_rx) = oneshot::channel();
        correlation.lock().insert(RequestId::ready(), ready_tx);

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            Arc::clone(&event_handler),
            closed_tx,
        ));

        Self {
            command_tx,
            correlation,
            event_handler,
            closed_rx,
            ready_rx: Arc::new(Mutex::new(Some(ready_rx))),
        }
    }

    /// Waits for the READY handshake message.
    ///
    /// The host sends READY with the nil UUID right after connecting.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if READY is not received in time
    /// - [`Error::ConnectionClosed`] if the connection closes before READY
    /// - [`Error::Protocol`] if READY was already consumed
    pub async fn wait_ready(&self) -> Result<ReadyData> {
        let rx = self
            .ready_rx
            .lock()
            .take()
            .ok_or_else(|| Error::protocol("READY already consumed"))?;

        let response = timeout(READY_TIMEOUT, rx)
            .await
            .map_err(|_| Error::connection_timeout(READY_TIMEOUT.as_millis() as u64))??;
        let response = response?;

        let ready = ReadyData {
            width: response.get_u64("width") as u32,
            height: response.get_u64("height") as u32,
        };
        debug!(width = ready.width, height = ready.height, "READY handshake completed");
        Ok(ready)
    }

    /// Sets the event handler callback.
    pub fn set_event_handler(&self, handler: EventHandler) {
        *self.event_handler.lock() = Some(handler);
    }

    /// Clears the event handler.
    pub fn clear_event_handler(&self) {
        *self.event_handler.lock() = None;
    }

    /// Sends a request and waits for its response with the default timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if too many requests are pending
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, DEFAULT_REQUEST_TIMEOUT)
            .await
    }

    /// Sends a request and waits for its response.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let request_id = request.id;
        let response_rx = self.enqueue(request)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(request_id));
                Err(Error::request_timeout(
                    request_id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Sends a request without waiting.
    ///
    /// An error response is logged at `warn` level. Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] or [`Error::Protocol`] if the request
    /// could not be queued.
    pub fn post(&self, request: Request) -> Result<()> {
        let request_id = request.id;
        let response_rx = self.enqueue(request)?;

        tokio::spawn(async move {
            let outcome = match timeout(DEFAULT_REQUEST_TIMEOUT, response_rx).await {
                Ok(Ok(result)) => result.and_then(Response::into_result),
                Ok(Err(_)) => Err(Error::ConnectionClosed),
                Err(_) => Err(Error::request_timeout(
                    request_id,
                    DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
                )),
            };
            if let Err(e) = outcome {
                warn!(?request_id, error = %e, "Posted request failed");
            }
        });
        Ok(())
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Resolves once the event loop has stopped.
    pub async fn closed(&self) {
        let mut rx = self.closed_rx.clone();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Shuts down the connection gracefully.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    fn enqueue(&self, request: Request) -> Result<oneshot::Receiver<Result<Response>>> {
        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(pending = correlation.len(), "Too many pending requests");
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;
        Ok(response_rx)
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WebSocketStream<TcpStream>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        event_handler: Arc<Mutex<Option<EventHandler>>>,
        closed_tx: watch::Sender<bool>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &correlation, &event_handler);
                        }
                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by host");
                            break;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }
                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }
                        // Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { request, response_tx }) => {
                            Self::handle_send_command(request, response_tx, &mut ws_write, &correlation).await;
                        }
                        Some(ConnectionCommand::RemoveCorrelation(request_id)) => {
                            correlation.lock().remove(&request_id);
                            debug!(?request_id, "Removed timed-out correlation");
                        }
                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }
                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending_requests(&correlation);
        let _ = closed_tx.send(true);
        debug!("Event loop terminated");
    }

    /// Routes one text frame to a waiting request or the event handler.
    fn handle_incoming_message(
        text: &str,
        correlation: &Mutex<CorrelationMap>,
        event_handler: &Mutex<Option<EventHandler>>,
    ) {
        if let Ok(response) = from_str::<Response>(text) {
            let tx = correlation.lock().remove(&response.id);
            match tx {
                Some(tx) => {
                    let _ = tx.send(Ok(response));
                }
                None => warn!(id = %response.id, "Response for unknown request"),
            }
            return;
        }

        if let Ok(event) = from_str::<Event>(text) {
            trace!(method = %event.method, "Event received");
            if let Some(handler) = event_handler.lock().as_ref() {
                handler(event);
            }
            return;
        }

        warn!(text = %text, "Failed to parse incoming message");
    }

    /// Writes a request frame after registering its correlation.
    async fn handle_send_command(
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
        ws_write: &mut WsSink,
        correlation: &Mutex<CorrelationMap>,
    ) {
        let request_id = request.id;

        let json = match to_string(&request) {
            Ok(j) => j,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        correlation.lock().insert(request_id, response_tx);

        if let Err(e) = ws_write.send(Message::Text(json.into())).await
            && let Some(tx) = correlation.lock().remove(&request_id)
        {
            let _ = tx.send(Err(Error::connection(e.to_string())));
        }

        trace!(?request_id, "Request sent");
    }

    /// Fails all pending requests with [`Error::ConnectionClosed`].
    fn fail_pending_requests(correlation: &Mutex<CorrelationMap>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use serde_json::{Value, json};
    use tokio_tungstenite::connect_async;

    use crate::identifiers::TabId;
    use crate::protocol::{ParsedEvent, ViewCommand};
    use crate::transport::PendingServer;

    /// Connects a scripted host that answers every request with `reply`.
    ///
    /// Before answering `view.loadUrl` the host emits a title event for the
    /// same view, so handlers observe it before the response resolves.
    async fn connect_host(reply: fn(&Value) -> Value) -> (Connection, ReadyData) {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let url = server.ws_url();

        tokio::spawn(async move {
            let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
            let ready = json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "type": "success",
                "result": { "width": 1024, "height": 768 }
            });
            ws.send(Message::Text(ready.to_string().into())).await.expect("ready");

            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: Value = serde_json::from_str(&text).expect("request json");
                if request["method"] == "view.loadUrl" {
                    let event = json!({
                        "type": "event",
                        "method": "view.titleUpdated",
                        "params": { "tabId": request["params"]["tabId"], "title": "Loaded" }
                    });
                    ws.send(Message::Text(event.to_string().into())).await.expect("event");
                }
                let mut response = reply(&request);
                response["id"] = request["id"].clone();
                ws.send(Message::Text(response.to_string().into())).await.expect("reply");
            }
        });

        server.accept().await.expect("accept")
    }

    fn echo_method(request: &Value) -> Value {
        json!({ "type": "success", "result": { "title": request["method"] } })
    }

    #[tokio::test]
    async fn test_ready_carries_content_size() {
        let (_connection, ready) = connect_host(echo_method).await;
        assert_eq!(ready, ReadyData { width: 1024, height: 768 });
    }

    #[tokio::test]
    async fn test_send_correlates_response() {
        let (connection, _) = connect_host(echo_method).await;
        let request = Request::new(ViewCommand::GetTitle {
            tab_id: TabId::new(3).expect("non-zero"),
        });

        let response = connection.send(request).await.expect("response");
        assert_eq!(response.get_string("title"), "view.getTitle");
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_events_reach_handler_in_order() {
        let (connection, _) = connect_host(echo_method).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        connection.set_event_handler(Box::new(move |event| {
            let _ = tx.send(event.parse());
        }));

        let tab_id = TabId::new(9).expect("non-zero");
        connection
            .send(Request::new(ViewCommand::LoadUrl {
                tab_id,
                url: "https://example.com".to_string(),
            }))
            .await
            .expect("load");

        assert_eq!(
            rx.try_recv().expect("event delivered before response"),
            ParsedEvent::ViewTitleUpdated {
                tab_id,
                title: "Loaded".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_error_response_surfaces() {
        fn fail(_: &Value) -> Value {
            json!({ "type": "error", "error": "no such view", "message": "tab 4" })
        }
        let (connection, _) = connect_host(fail).await;

        let err = connection
            .send(Request::new(ViewCommand::GetUrl {
                tab_id: TabId::new(4).expect("non-zero"),
            }))
            .await
            .and_then(Response::into_result)
            .expect_err("error response");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_and_closes() {
        let (connection, _) = connect_host(echo_method).await;
        connection.shutdown();
        timeout(Duration::from_secs(2), connection.closed())
            .await
            .expect("closed in time");

        assert!(connection.is_closed());
        let err = connection
            .send(Request::new(ViewCommand::GetTitle {
                tab_id: TabId::new(1).expect("non-zero"),
            }))
            .await
            .expect_err("closed");
        assert!(err.is_connection_error());
    }
}
