//! The shell runner.
//!
//! Ties the transport, the renderer host backend and the tab manager
//! together for one window session:
//!
//! 1. accept the renderer host and wait for READY
//! 2. configure the renderer storage root
//! 3. install the menu and open the home tab
//! 4. dispatch menu selections until the window closes

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::Result;
use crate::remote::{HostSignal, RemoteHost};
use crate::tabs::{TabManager, TabMode};
use crate::transport::PendingServer;

use super::builder::ShellBuilder;
use super::options::ShellOptions;

// ============================================================================
// Shell
// ============================================================================

/// A bound shell waiting for its renderer host.
///
/// Created by [`ShellBuilder::bind`].
#[derive(Debug)]
pub struct Shell {
    server: PendingServer,
    options: ShellOptions,
    user_data_dir: Option<PathBuf>,
}

impl Shell {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ShellBuilder {
        ShellBuilder::new()
    }

    pub(crate) fn new(
        server: PendingServer,
        options: ShellOptions,
        user_data_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            server,
            options,
            user_data_dir,
        }
    }

    /// WebSocket URL the renderer host should connect to.
    #[must_use]
    pub fn ws_url(&self) -> String {
        self.server.ws_url()
    }

    /// Bound socket address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Resolved options, home address included.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ShellOptions {
        &self.options
    }

    /// Resolved renderer storage root.
    #[inline]
    #[must_use]
    pub fn user_data_dir(&self) -> Option<&Path> {
        self.user_data_dir.as_deref()
    }

    /// Serves one window session until the window closes or the host
    /// disconnects.
    ///
    /// Every menu selection runs on its own task, so a slow load never
    /// blocks other commands.
    ///
    /// # Errors
    ///
    /// Connection and handshake errors, and an error response to the
    /// session configuration.
    pub async fn run(self) -> Result<()> {
        let (connection, ready) = self.server.accept().await?;
        let (host, mut signals) = RemoteHost::new(connection.clone(), ready);
        host.configure_session(self.user_data_dir.as_deref()).await?;

        let manager = TabManager::new(host.clone(), host, self.options);
        spawn_home_tab(&manager);

        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(HostSignal::Menu(action)) => {
                        let manager = manager.clone();
                        tokio::spawn(async move {
                            if let Err(e) = manager.dispatch(action).await {
                                error!(?action, error = %e, "Menu action failed");
                            }
                        });
                    }
                    Some(HostSignal::RefreshMenu) => manager.refresh_menu(),
                    Some(HostSignal::Resized { width, height }) => {
                        debug!(width, height, "Window resized");
                    }
                    Some(HostSignal::Closed) | None => {
                        info!("Window closed");
                        break;
                    }
                },
                () = connection.closed() => {
                    info!("Renderer host disconnected");
                    break;
                }
            }
        }

        manager.close_all_tabs();
        connection.shutdown();
        Ok(())
    }
}

fn spawn_home_tab(manager: &TabManager) {
    let manager = manager.clone();
    tokio::spawn(async move {
        let home = manager.options().home_address.clone();
        if let Err(e) = manager.create_tab(&home, TabMode::Headful).await {
            error!(address = %home, error = %e, "Home tab failed to open");
        }
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    /// Host that answers everything and closes the window once the home
    /// tab is bound.
    async fn run_host(url: String, seen: mpsc::UnboundedSender<Value>) {
        let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
        let ready = json!({
            "id": "00000000-0000-0000-0000-000000000000",
            "type": "success",
            "result": { "width": 1200, "height": 800 }
        });
        ws.send(Message::Text(ready.to_string().into())).await.expect("ready");

        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let request: Value = serde_json::from_str(&text).expect("request json");
            let method = request["method"].as_str().unwrap_or_default().to_string();
            let _ = seen.send(request.clone());

            let result = match method.as_str() {
                "view.getTitle" => json!({ "title": "Home" }),
                _ => json!({}),
            };
            let response = json!({ "id": request["id"], "type": "success", "result": result });
            ws.send(Message::Text(response.to_string().into())).await.expect("reply");

            if method == "window.addView" {
                let closed = json!({ "type": "event", "method": "window.closed" });
                ws.send(Message::Text(closed.to_string().into())).await.expect("close");
            }
        }
    }

    #[tokio::test]
    async fn test_session_opens_home_tab_and_stops_on_close() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("config.json"),
            r#"{ "userDataPath": "data" }"#,
        )
        .expect("write config");

        let shell = Shell::builder()
            .app_dir(dir.path())
            .home_address("https://home.test/")
            .bind()
            .await
            .expect("bind");
        assert_eq!(shell.user_data_dir(), Some(dir.path().join("data").as_path()));

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_host(shell.ws_url(), seen_tx));

        timeout(Duration::from_secs(5), shell.run())
            .await
            .expect("session ends")
            .expect("run");

        let mut methods = Vec::new();
        let mut loaded = None;
        while let Ok(request) = seen_rx.try_recv() {
            if request["method"] == "view.loadUrl" {
                loaded = request["params"]["url"].as_str().map(str::to_string);
            }
            methods.push(request["method"].as_str().unwrap_or_default().to_string());
        }

        assert_eq!(methods.first().map(String::as_str), Some("session.configure"));
        for expected in ["window.setMenu", "view.create", "view.loadUrl", "window.addView"] {
            assert!(methods.iter().any(|m| m == expected), "missing {expected}");
        }
        assert_eq!(loaded.as_deref(), Some("https://home.test/"));
    }
}
