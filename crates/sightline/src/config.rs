//! Locator configuration context.
//!
//! Captured once when a [`crate::PageContext`] is built and handed to every
//! adapter explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::result::LocatorResult;

/// Default attribute used by `get_by_test_id`
pub const DEFAULT_TEST_ID_ATTRIBUTE: &str = "data-testid";

/// Automation backend selected at process start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Out-of-process automation driver addressed by selector strings
    #[default]
    RemoteDriver,
    /// In-process synthetic DOM events
    Native,
    /// Remote session protocol with index-only option selection
    RemoteSession,
}

impl Provider {
    /// Provider name used in diagnostics
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RemoteDriver => "remote-driver",
            Self::Native => "native",
            Self::RemoteSession => "remote-session",
        }
    }

    /// Whether actions go over a [`crate::CommandTransport`]
    #[must_use]
    pub const fn is_remote(self) -> bool {
        !matches!(self, Self::Native)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration shared by every locator created from one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Active backend
    pub provider: Provider,
    /// Attribute matched by `get_by_test_id`
    pub test_id_attribute: String,
    /// UI rendering mode that scales the tester iframe
    pub ui_overlay: bool,
    /// Timeout injected into action options that omit one
    #[serde(with = "duration_ms")]
    pub action_timeout: Option<Duration>,
    /// Reject ambiguous matches for locally resolved single-target actions
    pub strict: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            test_id_attribute: DEFAULT_TEST_ID_ATTRIBUTE.to_string(),
            ui_overlay: false,
            action_timeout: None,
            strict: true,
        }
    }
}

impl LocatorConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration handed across a process boundary.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> LocatorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the provider
    #[must_use]
    pub const fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    /// Set the test-id attribute name
    #[must_use]
    pub fn with_test_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.test_id_attribute = attribute.into();
        self
    }

    /// Enable or disable the UI overlay rendering mode
    #[must_use]
    pub const fn with_ui_overlay(mut self, enabled: bool) -> Self {
        self.ui_overlay = enabled;
        self
    }

    /// Set the default action timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = Some(timeout);
        self
    }

    /// Set strict single-target resolution
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
