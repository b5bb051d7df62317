//! DOM-snapshot duplication of a live view.
//!
//! A full clone captures the source document's serialized markup and
//! address, then materializes a new view that displays the same markup
//! without fetching the address again:
//!
//! 1. capture `url()` and `serialized_markup()` of the source
//! 2. create a new view and navigate it to `about:blank`
//! 3. `document.open()` / `document.write(markup)` / `document.close()`
//! 4. rewrite the current history entry to the captured address
//!
//! The result is a static snapshot. Timers, closures and any in-memory
//! script state of the source page are not carried over; scripts embedded
//! in the markup run again from scratch.

use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::view::{BLANK_ADDRESS, ContentControl, ViewFactory, ViewPair};

use super::tab::TabMode;

// ============================================================================
// DocumentSnapshot
// ============================================================================

/// A rendered document frozen at capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Address reported by the source view.
    pub address: String,
    /// Serialized DOM.
    pub markup: String,
}

// ============================================================================
// StateCloner
// ============================================================================

/// Produces views pre-filled with a captured document.
pub struct StateCloner<'a> {
    factory: &'a dyn ViewFactory,
    load_timeout: Option<Duration>,
}

impl<'a> StateCloner<'a> {
    /// Creates a cloner that allocates views from `factory`.
    #[inline]
    #[must_use]
    pub fn new(factory: &'a dyn ViewFactory) -> Self {
        Self {
            factory,
            load_timeout: None,
        }
    }

    /// Bounds the blank load and injection steps together.
    #[inline]
    #[must_use]
    pub fn with_load_timeout(mut self, limit: Option<Duration>) -> Self {
        self.load_timeout = limit;
        self
    }

    /// Captures the source view's address and markup.
    pub async fn capture(source: &dyn ContentControl) -> Result<DocumentSnapshot> {
        let address = source.url().await?;
        let markup = source.serialized_markup().await?;
        debug!(address = %address, markup_len = markup.len(), "Document captured");
        Ok(DocumentSnapshot { address, markup })
    }

    /// Creates a view for `tab_id` showing `snapshot`.
    ///
    /// On failure, including [`Error::LoadTimeout`] when a load timeout is
    /// set, the new surface is destroyed before the error is returned.
    pub async fn materialize(
        &self,
        tab_id: TabId,
        mode: TabMode,
        snapshot: &DocumentSnapshot,
    ) -> Result<ViewPair> {
        let pair = self.factory.create_view(tab_id, mode).await?;

        let injected = match self.load_timeout {
            Some(limit) => timeout(limit, Self::inject(pair.control.as_ref(), snapshot))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::load_timeout(&snapshot.address, limit.as_millis() as u64))
                }),
            None => Self::inject(pair.control.as_ref(), snapshot).await,
        };
        if let Err(e) = injected {
            pair.surface.destroy();
            return Err(e);
        }

        debug!(tab_id = %tab_id, address = %snapshot.address, "Snapshot materialized");
        Ok(pair)
    }

    async fn inject(control: &dyn ContentControl, snapshot: &DocumentSnapshot) -> Result<()> {
        control.load_url(BLANK_ADDRESS).await?;
        control.write_document(&snapshot.markup).await?;
        control.replace_history_entry(&snapshot.address).await
    }
}

// ============================================================================
// Tests
// ============================================================================
