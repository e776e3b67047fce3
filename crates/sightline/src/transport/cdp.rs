//! Chromium transport over CDP.
//!
//! Commands are serialized to JSON and evaluated as a call to a receiver
//! function installed by the test page (`window.__sightline_dispatch` by
//! default). The receiver answers with `{ "ok": value }` or
//! `{ "error": "notFound" | "rejected", "message": text }`.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CommandTransport, RemoteCommand, RemoteFailure};
use crate::result::{LocatorError, LocatorResult};

/// Default name of the in-page command receiver
pub const DEFAULT_RECEIVER: &str = "window.__sightline_dispatch";

/// Remote session living in a Chromium page
#[derive(Debug, Clone)]
pub struct CdpTransport {
    page: Arc<Mutex<CdpPage>>,
    receiver: String,
    browser: Option<Arc<Mutex<CdpBrowser>>>,
    handler: Option<Arc<tokio::task::JoinHandle<()>>>,
}

impl CdpTransport {
    /// Transport over an open page
    #[must_use]
    pub fn new(page: CdpPage) -> Self {
        Self {
            page: Arc::new(Mutex::new(page)),
            receiver: DEFAULT_RECEIVER.to_string(),
            browser: None,
            handler: None,
        }
    }

    /// Launch a headless Chromium and open `url` in a new page
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::Transport`] if the browser cannot be launched
    /// or the page cannot be opened
    pub async fn launch(url: &str) -> LocatorResult<Self> {
        let config = CdpConfig::builder()
            .no_sandbox()
            .build()
            .map_err(|message| LocatorError::Transport { message })?;
        let (browser, mut handler) =
            CdpBrowser::launch(config)
                .await
                .map_err(|e| LocatorError::Transport {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| LocatorError::Transport {
                message: e.to_string(),
            })?;
        debug!(url, "launched chromium session");

        Ok(Self {
            page: Arc::new(Mutex::new(page)),
            receiver: DEFAULT_RECEIVER.to_string(),
            browser: Some(Arc::new(Mutex::new(browser))),
            handler: Some(Arc::new(handle)),
        })
    }

    /// Close the launched browser, if this transport owns one
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::Transport`] if the browser fails to close
    pub async fn close(&self) -> LocatorResult<()> {
        if let Some(browser) = &self.browser {
            browser
                .lock()
                .await
                .close()
                .await
                .map_err(|e| LocatorError::Transport {
                    message: e.to_string(),
                })?;
        }
        if let Some(handler) = &self.handler {
            handler.abort();
        }
        Ok(())
    }

    /// Call a differently named receiver
    #[must_use]
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = receiver.into();
        self
    }
}

#[async_trait]
impl CommandTransport for CdpTransport {
    async fn send(&self, command: RemoteCommand) -> Result<Value, RemoteFailure> {
        let payload =
            serde_json::to_string(&command).map_err(|e| RemoteFailure::Rejected(e.to_string()))?;
        let expression = format!("{}({payload})", self.receiver);

        let page = self.page.lock().await;
        let result = page
            .evaluate(expression)
            .await
            .map_err(|e| RemoteFailure::Closed(e.to_string()))?;
        let reply: Value = result
            .into_value()
            .map_err(|e| RemoteFailure::Rejected(e.to_string()))?;

        if let Some(value) = reply.get("ok") {
            return Ok(value.clone());
        }
        let message = reply["message"].as_str().unwrap_or_default().to_string();
        match reply["error"].as_str() {
            Some("notFound") => Err(RemoteFailure::NotFound(message)),
            _ => Err(RemoteFailure::Rejected(message)),
        }
    }
}
