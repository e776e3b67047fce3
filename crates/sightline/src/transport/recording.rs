//! Recording transport for tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Action, CommandTransport, RemoteCommand, RemoteFailure};

/// Transport that records every command and answers from a script.
///
/// Without scripted failures every command succeeds with `null`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    history: Mutex<Vec<RemoteCommand>>,
    failures: HashMap<Action, RemoteFailure>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    /// Create an empty transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `action` command with `failure`
    #[must_use]
    pub fn fail_on(mut self, action: Action, failure: RemoteFailure) -> Self {
        self.failures.insert(action, failure);
        self
    }

    /// Sleep before answering
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Commands received so far
    #[must_use]
    pub fn history(&self) -> Vec<RemoteCommand> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent command
    #[must_use]
    pub fn last(&self) -> Option<RemoteCommand> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Check whether a command with this wire verb was received
    #[must_use]
    pub fn was_called(&self, action: &str) -> bool {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|c| c.action.as_str() == action)
    }

    /// Forget recorded commands
    pub fn clear(&self) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl CommandTransport for RecordingTransport {
    async fn send(&self, command: RemoteCommand) -> Result<Value, RemoteFailure> {
        let action = command.action;
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.get(&action) {
            Some(failure) => Err(failure.clone()),
            None => Ok(Value::Null),
        }
    }
}
