//! One view living in the renderer host.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::protocol::{Request, Response, ViewCommand};
use crate::transport::Connection;
use crate::view::{AutoResize, Bounds, ContentControl, ContentEvent, RenderingSurface};

// ============================================================================
// Constants
// ============================================================================

/// Transport bound for `view.loadUrl`.
///
/// Load deadlines are a shell policy; this only stops a dead host from
/// pinning the request forever.
const LOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

// ============================================================================
// Types
// ============================================================================

/// Per-view title senders, keyed by owner.
pub(crate) type EventRoutes = Arc<Mutex<FxHashMap<TabId, mpsc::UnboundedSender<ContentEvent>>>>;

// ============================================================================
// RemoteView
// ============================================================================

/// Surface and control for a view owned by the renderer host.
pub struct RemoteView {
    tab_id: TabId,
    connection: Connection,
    routes: EventRoutes,
    destroyed: AtomicBool,
}

impl std::fmt::Debug for RemoteView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteView")
            .field("tab_id", &self.tab_id)
            .field("destroyed", &self.destroyed.load(Ordering::Acquire))
            .finish()
    }
}

impl RemoteView {
    pub(crate) fn new(tab_id: TabId, connection: Connection, routes: EventRoutes) -> Self {
        Self {
            tab_id,
            connection,
            routes,
            destroyed: AtomicBool::new(false),
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(Error::view_destroyed(self.tab_id));
        }
        Ok(())
    }

    async fn request(&self, command: ViewCommand) -> Result<Response> {
        self.ensure_alive()?;
        self.connection
            .send(Request::new(command))
            .await?
            .into_checked()
    }

    fn post(&self, command: ViewCommand) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = self.connection.post(Request::new(command)) {
            warn!(tab_id = %self.tab_id, error = %e, "View command not sent");
        }
    }
}

impl RenderingSurface for RemoteView {
    fn tab_id(&self) -> TabId {
        self.tab_id
    }

    fn set_bounds(&self, bounds: Bounds) {
        self.post(ViewCommand::SetBounds {
            tab_id: self.tab_id,
            bounds,
        });
    }

    fn set_auto_resize(&self, auto_resize: AutoResize) {
        self.post(ViewCommand::SetAutoResize {
            tab_id: self.tab_id,
            auto_resize,
        });
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.routes.lock().remove(&self.tab_id);
        if let Err(e) = self.connection.post(Request::new(ViewCommand::Destroy {
            tab_id: self.tab_id,
        })) {
            warn!(tab_id = %self.tab_id, error = %e, "Destroy not sent");
        }
        trace!(tab_id = %self.tab_id, "Remote view destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ContentControl for RemoteView {
    async fn load_url(&self, url: &str) -> Result<()> {
        self.ensure_alive()?;
        let request = Request::new(ViewCommand::LoadUrl {
            tab_id: self.tab_id,
            url: url.to_string(),
        });
        self.connection
            .send_with_timeout(request, LOAD_REQUEST_TIMEOUT)
            .await
            .and_then(Response::into_checked)
            .map_err(|e| match e {
                Error::Protocol { message } => Error::load(url, message),
                other => other,
            })?;
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        let response = self
            .request(ViewCommand::GetUrl { tab_id: self.tab_id })
            .await?;
        Ok(response.get_string("url"))
    }

    async fn title(&self) -> Result<String> {
        let response = self
            .request(ViewCommand::GetTitle { tab_id: self.tab_id })
            .await?;
        Ok(response.get_string("title"))
    }

    async fn can_go_back(&self) -> Result<bool> {
        let response = self
            .request(ViewCommand::CanGoBack { tab_id: self.tab_id })
            .await?;
        Ok(response.get_bool("canGoBack"))
    }

    async fn go_back(&self) -> Result<()> {
        self.request(ViewCommand::GoBack { tab_id: self.tab_id })
            .await?;
        Ok(())
    }

    async fn can_go_forward(&self) -> Result<bool> {
        let response = self
            .request(ViewCommand::CanGoForward { tab_id: self.tab_id })
            .await?;
        Ok(response.get_bool("canGoForward"))
    }

    async fn go_forward(&self) -> Result<()> {
        self.request(ViewCommand::GoForward { tab_id: self.tab_id })
            .await?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        let value = self
            .request(ViewCommand::ExecuteScript {
                tab_id: self.tab_id,
                script: script.to_string(),
            })
            .await
            .map_err(|e| match e {
                Error::Protocol { message } => Error::script(message),
                other => other,
            })?
            .into_result()?;
        Ok(value.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn replace_history_entry(&self, url: &str) -> Result<()> {
        self.request(ViewCommand::ReplaceHistoryEntry {
            tab_id: self.tab_id,
            url: url.to_string(),
        })
        .await?;
        Ok(())
    }
}
