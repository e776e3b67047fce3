//! Remote command channel.
//!
//! The remote-driver and remote-session adapters never touch the document
//! themselves: they encode an [`Action`] plus a selector handle and the
//! backend-native options into a [`RemoteCommand`] and hand it to a
//! [`CommandTransport`]. The session on the other side resolves the selector
//! and performs the interaction.
//!
//! Implementations:
//! - [`RecordingTransport`] - records commands, for unit tests
//! - [`LoopbackTransport`] - replays commands against an in-process document
//! - `CdpTransport` - forwards to a Chromium page (requires `browser` feature)

#[cfg(feature = "browser")]
mod cdp;
mod loopback;
mod recording;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::Provider;
use crate::options::NativeOptions;
use crate::result::{LocatorError, LocatorResult};

#[cfg(feature = "browser")]
pub use cdp::CdpTransport;
pub use loopback::LoopbackTransport;
pub use recording::RecordingTransport;

/// Interaction verbs understood by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    /// Single click
    #[serde(rename = "click")]
    Click,
    /// Double click
    #[serde(rename = "dblClick")]
    DblClick,
    /// Triple click
    #[serde(rename = "tripleClick")]
    TripleClick,
    /// Move the pointer over the element
    #[serde(rename = "hover")]
    Hover,
    /// Move the pointer away from the element
    #[serde(rename = "unhover")]
    Unhover,
    /// Replace the element's value
    #[serde(rename = "fill")]
    Fill,
    /// Empty the element's value
    #[serde(rename = "clear")]
    Clear,
    /// Choose `<option>`s of a `<select>`
    #[serde(rename = "selectOptions")]
    SelectOptions,
    /// Set the files of a file input
    #[serde(rename = "upload")]
    Upload,
    /// Drag the element onto another
    #[serde(rename = "dragAndDrop")]
    DragAndDrop,
}

impl Action {
    /// Wire name of the verb
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::DblClick => "dblClick",
            Self::TripleClick => "tripleClick",
            Self::Hover => "hover",
            Self::Unhover => "unhover",
            Self::Fill => "fill",
            Self::Clear => "clear",
            Self::SelectOptions => "selectOptions",
            Self::Upload => "upload",
            Self::DragAndDrop => "dragAndDrop",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One action forwarded to a remote session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteCommand {
    /// Backend the command is phrased for
    pub provider: Provider,
    /// Interaction verb
    pub action: Action,
    /// Addressable handle of the target element
    pub selector: String,
    /// Action arguments (`text`, `values`, `files`, `target`), or null
    #[serde(skip_serializing_if = "Value::is_null")]
    pub args: Value,
    /// Backend-native options
    pub options: NativeOptions,
}

impl RemoteCommand {
    /// Command without arguments
    #[must_use]
    pub fn new(
        provider: Provider,
        action: Action,
        selector: impl Into<String>,
        options: NativeOptions,
    ) -> Self {
        Self {
            provider,
            action,
            selector: selector.into(),
            args: Value::Null,
            options,
        }
    }

    /// Attach action arguments
    #[must_use]
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }
}

/// Structured failure reported by a remote session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFailure {
    /// The session could not resolve the selector
    #[error("{0}")]
    NotFound(String),
    /// The session resolved the element but refused the interaction
    #[error("{0}")]
    Rejected(String),
    /// The channel to the session is gone
    #[error("{0}")]
    Closed(String),
}

impl RemoteFailure {
    fn into_locator_error(self, command: &RemoteCommand, container: &str) -> LocatorError {
        match self {
            Self::NotFound(message) => LocatorError::ElementNotFound {
                selector: command.selector.clone(),
                container: if message.is_empty() {
                    container.to_string()
                } else {
                    format!("{message}\n\n{container}")
                },
            },
            Self::Rejected(message) => LocatorError::ActionFailed {
                action: command.action.to_string(),
                selector: command.selector.clone(),
                message,
                container: container.to_string(),
            },
            Self::Closed(message) => LocatorError::Transport { message },
        }
    }
}

/// Out-of-process automation session
#[async_trait]
pub trait CommandTransport: Send + Sync + fmt::Debug {
    /// Deliver one command and wait for the session's answer
    async fn send(&self, command: RemoteCommand) -> Result<Value, RemoteFailure>;
}

/// Send `command`, bounded by the timeout carried in its options.
///
/// `container` describes the query scope and is embedded in not-found
/// errors.
pub async fn dispatch(
    transport: &dyn CommandTransport,
    command: RemoteCommand,
    container: &str,
) -> LocatorResult<Value> {
    debug!(
        provider = command.provider.name(),
        action = command.action.as_str(),
        selector = %command.selector,
        "dispatching remote command"
    );

    let action = command.action;
    let selector = command.selector.clone();
    let reply = match command.options.timeout_ms() {
        Some(ms) => {
            let call = transport.send(command.clone());
            match tokio::time::timeout(Duration::from_millis(ms), call).await {
                Ok(reply) => reply,
                Err(_) => {
                    return Err(LocatorError::Timeout {
                        action: action.to_string(),
                        selector,
                        ms,
                        container: container.to_string(),
                    })
                }
            }
        }
        None => transport.send(command.clone()).await,
    };

    reply.map_err(|failure| failure.into_locator_error(&command, container))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PlainOptions;
    use serde_json::json;

    fn plain(timeout: Option<u64>) -> NativeOptions {
        NativeOptions::Plain(PlainOptions { timeout })
    }

    mod command_tests {
        use super::*;

        #[test]
        fn test_command_serializes_with_wire_names() {
            let command = RemoteCommand::new(
                Provider::RemoteDriver,
                Action::DragAndDrop,
                "#a",
                plain(Some(100)),
            )
            .with_args(json!({"target": "#b"}));
            assert_eq!(
                serde_json::to_value(&command).unwrap(),
                json!({
                    "provider": "remote-driver",
                    "action": "dragAndDrop",
                    "selector": "#a",
                    "args": {"target": "#b"},
                    "options": {"timeout": 100}
                })
            );
        }

        #[test]
        fn test_null_args_are_omitted() {
            let command = RemoteCommand::new(Provider::RemoteSession, Action::Click, "#a", plain(None));
            let value = serde_json::to_value(&command).unwrap();
            assert!(value.get("args").is_none());
        }

        #[test]
        fn test_action_display() {
            assert_eq!(Action::TripleClick.to_string(), "tripleClick");
            assert_eq!(Action::SelectOptions.as_str(), "selectOptions");
        }
    }

    mod dispatch_tests {
        use super::*;
        use crate::result::ErrorKind;

        #[tokio::test]
        async fn test_dispatch_records_and_returns_reply() {
            let transport = RecordingTransport::new();
            let command = RemoteCommand::new(Provider::RemoteDriver, Action::Click, "#a", plain(None));
            let reply = dispatch(&transport, command, "<body>").await.unwrap();
            assert_eq!(reply, Value::Null);
            assert!(transport.was_called("click"));
        }

        #[tokio::test]
        async fn test_failures_map_onto_taxonomy() {
            let transport = RecordingTransport::new()
                .fail_on(Action::Click, RemoteFailure::NotFound(String::new()))
                .fail_on(Action::Fill, RemoteFailure::Rejected("element is not visible".into()))
                .fail_on(Action::Hover, RemoteFailure::Closed("session ended".into()));

            let err = dispatch(
                &transport,
                RemoteCommand::new(Provider::RemoteDriver, Action::Click, "#a", plain(None)),
                "<body>",
            )
            .await
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ElementNotFound);
            assert!(err.to_string().contains("#a"));
            assert!(err.to_string().contains("<body>"));

            let err = dispatch(
                &transport,
                RemoteCommand::new(Provider::RemoteDriver, Action::Fill, "#a", plain(None)),
                "<body>",
            )
            .await
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ActionFailed);
            assert!(err.to_string().contains("element is not visible"));

            let err = dispatch(
                &transport,
                RemoteCommand::new(Provider::RemoteDriver, Action::Hover, "#a", plain(None)),
                "<body>",
            )
            .await
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Transport);
        }

        #[tokio::test]
        async fn test_timeout_elapses() {
            let transport = RecordingTransport::new().with_delay(Duration::from_millis(200));
            let err = dispatch(
                &transport,
                RemoteCommand::new(Provider::RemoteDriver, Action::Click, "#slow", plain(Some(10))),
                "<body>",
            )
            .await
            .unwrap_err();
            assert!(matches!(
                err,
                LocatorError::Timeout { ref selector, ms: 10, .. } if selector == "#slow"
            ));
        }
    }
}
