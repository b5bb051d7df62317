//! Renderer host backend.
//!
//! The renderer host is a separate process that owns the native window and
//! the web views. [`RemoteHost`] drives it over a [`Connection`] and
//! implements [`HostWindow`] and [`ViewFactory`] on top of it.
//!
//! Window-level notifications the tab core does not handle itself (menu
//! selections, resize, close) are forwarded as [`HostSignal`]s.

// ============================================================================
// Submodules
// ============================================================================

mod view;

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::TabId;
use crate::protocol::{
    Event, ParsedEvent, Request, SessionCommand, ViewCommand, WindowCommand,
};
use crate::tabs::{MenuAction, MenuModel, TabMode};
use crate::transport::{Connection, ReadyData};
use crate::view::{ContentEvent, HostWindow, RenderingSurface, ViewFactory, ViewPair};

pub use view::RemoteView;

use view::EventRoutes;

// ============================================================================
// HostSignal
// ============================================================================

/// Window-level notifications from the renderer host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSignal {
    /// The user picked a menu entry.
    Menu(MenuAction),
    /// The host asks for the menu to be rebuilt.
    RefreshMenu,
    /// The content area changed size.
    Resized {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
    /// The window was closed.
    Closed,
}

// ============================================================================
// RemoteHost
// ============================================================================

/// Host window and view factory backed by the renderer host.
pub struct RemoteHost {
    connection: Connection,
    size: Arc<Mutex<(u32, u32)>>,
    routes: EventRoutes,
}

impl std::fmt::Debug for RemoteHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHost")
            .field("size", &*self.size.lock())
            .field("views", &self.routes.lock().len())
            .finish_non_exhaustive()
    }
}

impl RemoteHost {
    /// Wraps an accepted connection and starts routing its events.
    ///
    /// Returns the host and the stream of window-level signals.
    #[must_use]
    pub fn new(
        connection: Connection,
        ready: ReadyData,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<HostSignal>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let size = Arc::new(Mutex::new((ready.width, ready.height)));
        let routes = EventRoutes::default();

        let handler_size = Arc::clone(&size);
        let handler_routes = Arc::clone(&routes);
        connection.set_event_handler(Box::new(move |event: Event| {
            route_event(&event, &handler_size, &handler_routes, &signal_tx);
        }));

        let host = Arc::new(Self {
            connection,
            size,
            routes,
        });
        (host, signal_rx)
    }

    /// Sends the renderer storage root. Must run before the first view.
    ///
    /// # Errors
    ///
    /// Transport errors or an error response from the host.
    pub async fn configure_session(&self, user_data_path: Option<&Path>) -> Result<()> {
        let user_data_path = user_data_path.map(|p| p.to_string_lossy().into_owned());
        debug!(?user_data_path, "Configuring renderer session");
        self.connection
            .send(Request::new(SessionCommand::Configure { user_data_path }))
            .await?
            .into_checked()?;
        Ok(())
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn post(&self, command: WindowCommand) {
        if let Err(e) = self.connection.post(Request::new(command)) {
            warn!(error = %e, "Window command not sent");
        }
    }
}

fn route_event(
    event: &Event,
    size: &Mutex<(u32, u32)>,
    routes: &EventRoutes,
    signals: &mpsc::UnboundedSender<HostSignal>,
) {
    let signal = match event.parse() {
        ParsedEvent::ViewTitleUpdated { tab_id, title } => {
            match routes.lock().get(&tab_id) {
                Some(tx) => {
                    let _ = tx.send(ContentEvent::TitleChanged(title));
                }
                None => trace!(tab_id = %tab_id, "Title for unknown view"),
            }
            return;
        }
        ParsedEvent::WindowResized { width, height } => {
            *size.lock() = (width, height);
            HostSignal::Resized { width, height }
        }
        ParsedEvent::WindowClosed => HostSignal::Closed,
        ParsedEvent::MenuSelect { action } => HostSignal::Menu(action),
        ParsedEvent::MenuRefresh => HostSignal::RefreshMenu,
        ParsedEvent::Unknown { method, .. } => {
            debug!(method = %method, "Ignoring unknown event");
            return;
        }
    };
    let _ = signals.send(signal);
}

impl HostWindow for RemoteHost {
    fn content_size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    fn add_view(&self, surface: &dyn RenderingSurface) {
        self.post(WindowCommand::AddView {
            tab_id: surface.tab_id(),
        });
    }

    fn remove_view(&self, surface: &dyn RenderingSurface) {
        self.post(WindowCommand::RemoveView {
            tab_id: surface.tab_id(),
        });
    }

    fn set_title(&self, title: &str) {
        self.post(WindowCommand::SetTitle {
            title: title.to_string(),
        });
    }

    fn set_menu(&self, menu: &MenuModel) {
        self.post(WindowCommand::SetMenu { menu: menu.clone() });
    }
}

#[async_trait]
impl ViewFactory for RemoteHost {
    async fn create_view(&self, tab_id: TabId, mode: TabMode) -> Result<ViewPair> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.lock().insert(tab_id, tx);

        let created = self
            .connection
            .send(Request::new(ViewCommand::Create { tab_id, mode }))
            .await
            .and_then(|r| r.into_checked());
        if let Err(e) = created {
            self.routes.lock().remove(&tab_id);
            return Err(e);
        }

        debug!(tab_id = %tab_id, mode = mode.as_str(), "Remote view created");
        let view = Arc::new(RemoteView::new(
            tab_id,
            self.connection.clone(),
            Arc::clone(&self.routes),
        ));
        Ok(ViewPair {
            surface: view.clone(),
            control: view,
            events: rx,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::error::Error;
    use crate::transport::PendingServer;
    use crate::view::Bounds;

    /// Scripted renderer host. Reports every received method on the
    /// returned channel.
    async fn fake_host() -> (Arc<RemoteHost>, mpsc::UnboundedReceiver<HostSignal>, mpsc::UnboundedReceiver<String>) {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let url = server.ws_url();
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
            let ready = json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "type": "success",
                "result": { "width": 900, "height": 600 }
            });
            ws.send(Message::Text(ready.to_string().into())).await.expect("ready");

            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: Value = serde_json::from_str(&text).expect("request json");
                let method = request["method"].as_str().unwrap_or_default().to_string();
                let params = request["params"].clone();
                let _ = seen_tx.send(method.clone());

                let mut outgoing = Vec::new();
                let result = match method.as_str() {
                    "view.loadUrl" => {
                        outgoing.push(json!({
                            "type": "event",
                            "method": "view.titleUpdated",
                            "params": { "tabId": params["tabId"], "title": "Loaded" }
                        }));
                        json!({})
                    }
                    "view.getUrl" => json!({ "url": "https://example.com/" }),
                    "view.getTitle" => json!({ "title": "Example" }),
                    "view.canGoBack" => json!({ "canGoBack": true }),
                    "view.executeScript" => json!({ "value": "<html></html>" }),
                    "window.setMenu" => {
                        outgoing.push(json!({
                            "type": "event",
                            "method": "menu.select",
                            "params": { "action": "newTab" }
                        }));
                        json!({})
                    }
                    _ => json!({}),
                };
                outgoing.push(json!({ "id": request["id"], "type": "success", "result": result }));

                for message in outgoing {
                    ws.send(Message::Text(message.to_string().into())).await.expect("send");
                }
            }
        });

        let (connection, ready) = server.accept().await.expect("accept");
        let (host, signals) = RemoteHost::new(connection, ready);
        (host, signals, seen_rx)
    }

    async fn next_method(seen: &mut mpsc::UnboundedReceiver<String>, method: &str) {
        timeout(Duration::from_secs(2), async {
            while let Some(seen) = seen.recv().await {
                if seen == method {
                    return;
                }
            }
            panic!("host stopped before {method}");
        })
        .await
        .expect("method observed in time");
    }

    #[tokio::test]
    async fn test_ready_size_is_content_size() {
        let (host, _, _) = fake_host().await;
        assert_eq!(host.content_size(), (900, 600));
    }

    #[tokio::test]
    async fn test_view_queries_and_title_routing() {
        let (host, _, _) = fake_host().await;
        let tab_id = TabId::generate();
        let mut pair = host.create_view(tab_id, TabMode::Headful).await.expect("create");

        pair.control.load_url("https://example.com/").await.expect("load");
        assert_eq!(
            pair.events.try_recv().expect("title routed before load resolves"),
            ContentEvent::TitleChanged("Loaded".to_string())
        );
        assert_eq!(pair.control.url().await.expect("url"), "https://example.com/");
        assert_eq!(pair.control.title().await.expect("title"), "Example");
        assert!(pair.control.can_go_back().await.expect("can go back"));
        assert_eq!(
            pair.control.serialized_markup().await.expect("markup"),
            "<html></html>"
        );
    }

    #[tokio::test]
    async fn test_surface_commands_are_posted() {
        let (host, _, mut seen) = fake_host().await;
        let pair = host
            .create_view(TabId::generate(), TabMode::Headless)
            .await
            .expect("create");

        host.add_view(pair.surface.as_ref());
        pair.surface.set_bounds(Bounds { x: 0, y: 0, width: 900, height: 600 });
        pair.surface.destroy();

        next_method(&mut seen, "window.addView").await;
        next_method(&mut seen, "view.setBounds").await;
        next_method(&mut seen, "view.destroy").await;

        assert!(pair.surface.is_destroyed());
        let err = pair.control.url().await.expect_err("destroyed");
        assert!(matches!(err, Error::ViewDestroyed { .. }));
    }

    #[tokio::test]
    async fn test_menu_selection_becomes_signal() {
        let (host, mut signals, _) = fake_host().await;
        host.set_menu(&MenuModel::default());

        let signal = timeout(Duration::from_secs(2), signals.recv())
            .await
            .expect("signal in time");
        assert_eq!(signal, Some(HostSignal::Menu(MenuAction::NewTab)));
    }

    #[tokio::test]
    async fn test_configure_session() {
        let (host, _, mut seen) = fake_host().await;
        host.configure_session(Some(Path::new("/tmp/profile")))
            .await
            .expect("configure");
        next_method(&mut seen, "session.configure").await;
    }
}
