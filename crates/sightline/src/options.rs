//! Action option types.
//!
//! Callers build the high-level shapes ([`ClickOptions`], [`HoverOptions`],
//! [`DragAndDropOptions`], [`ActionOptions`]); [`crate::normalize`] turns
//! them into the backend-native [`NativeOptions`] payload right before
//! dispatch. Nothing here is mutated in place.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point relative to the element's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Position {
    /// Create a new position
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates multiplied by `scale`
    #[must_use]
    pub fn scaled(self, scale: f64) -> Self {
        Self {
            x: self.x * scale,
            y: self.y * scale,
        }
    }
}

/// Options carrying a cooperative timeout
pub trait TimeoutOption: Sized {
    /// Explicit timeout, if any
    fn timeout(&self) -> Option<Duration>;

    /// Copy with the timeout replaced
    #[must_use]
    fn with_timeout(self, timeout: Duration) -> Self;
}

macro_rules! impl_timeout_option {
    ($($ty:ty),*) => {
        $(
            impl TimeoutOption for $ty {
                fn timeout(&self) -> Option<Duration> {
                    self.timeout
                }

                fn with_timeout(mut self, timeout: Duration) -> Self {
                    self.timeout = Some(timeout);
                    self
                }
            }
        )*
    };
}

/// Options for click, double-click and triple-click
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClickOptions {
    /// Pointer position relative to the element
    pub position: Option<Position>,
    /// Cooperative timeout
    pub timeout: Option<Duration>,
}

impl ClickOptions {
    /// Empty options
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: None,
            timeout: None,
        }
    }

    /// Click at a position
    #[must_use]
    pub const fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }
}

/// Options for hover
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoverOptions {
    /// Pointer position relative to the element
    pub position: Option<Position>,
    /// Cooperative timeout
    pub timeout: Option<Duration>,
}

impl HoverOptions {
    /// Empty options
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: None,
            timeout: None,
        }
    }

    /// Hover at a position
    #[must_use]
    pub const fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }
}

/// Options for drag-and-drop
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragAndDropOptions {
    /// Where to grab the source element
    pub source_position: Option<Position>,
    /// Where to release over the target element
    pub target_position: Option<Position>,
    /// Cooperative timeout
    pub timeout: Option<Duration>,
}

impl DragAndDropOptions {
    /// Empty options
    #[must_use]
    pub const fn new() -> Self {
        Self {
            source_position: None,
            target_position: None,
            timeout: None,
        }
    }

    /// Grab the source at a position
    #[must_use]
    pub const fn with_source_position(mut self, x: f64, y: f64) -> Self {
        self.source_position = Some(Position::new(x, y));
        self
    }

    /// Release over the target at a position
    #[must_use]
    pub const fn with_target_position(mut self, x: f64, y: f64) -> Self {
        self.target_position = Some(Position::new(x, y));
        self
    }
}

/// Options for fill, clear, select-options, upload and unhover
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionOptions {
    /// Cooperative timeout
    pub timeout: Option<Duration>,
}

impl ActionOptions {
    /// Empty options
    #[must_use]
    pub const fn new() -> Self {
        Self { timeout: None }
    }
}

impl_timeout_option!(ClickOptions, HoverOptions, DragAndDropOptions, ActionOptions);

/// Remote-driver pointer payload: `{ position, timeout }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverPointerOptions {
    /// Scaled pointer position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Remote-driver drag payload: `{ sourcePosition, targetPosition, timeout }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverDragOptions {
    /// Scaled source position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_position: Option<Position>,
    /// Scaled target position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_position: Option<Position>,
    /// Timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Remote-session click payload: `{ x, y }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionClickOptions {
    /// Horizontal offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Vertical offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Remote-session hover payload: `{ xOffset, yOffset }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHoverOptions {
    /// Horizontal offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_offset: Option<f64>,
    /// Vertical offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_offset: Option<f64>,
    /// Timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Remote-session drag payload: `{ sourceX, sourceY, targetX, targetY }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDragOptions {
    /// Source X
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_x: Option<f64>,
    /// Source Y
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_y: Option<f64>,
    /// Target X
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_x: Option<f64>,
    /// Target Y
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_y: Option<f64>,
    /// Timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Timeout-only payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainOptions {
    /// Timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Backend-native option payload, ready to serialize
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NativeOptions {
    /// Remote-driver click/hover
    DriverPointer(DriverPointerOptions),
    /// Remote-driver drag-and-drop
    DriverDrag(DriverDragOptions),
    /// Remote-session click
    SessionClick(SessionClickOptions),
    /// Remote-session hover
    SessionHover(SessionHoverOptions),
    /// Remote-session drag-and-drop
    SessionDrag(SessionDragOptions),
    /// Any other action
    Plain(PlainOptions),
}

impl NativeOptions {
    /// Timeout carried by the payload, in milliseconds
    #[must_use]
    pub const fn timeout_ms(&self) -> Option<u64> {
        match self {
            Self::DriverPointer(o) => o.timeout,
            Self::DriverDrag(o) => o.timeout,
            Self::SessionClick(o) => o.timeout,
            Self::SessionHover(o) => o.timeout,
            Self::SessionDrag(o) => o.timeout,
            Self::Plain(o) => o.timeout,
        }
    }

    /// JSON form sent over the transport
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A file handed to `upload`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInput {
    /// Path on the machine running the remote session
    Path(String),
    /// In-memory file
    Contents {
        /// File name
        name: String,
        /// MIME type
        mime_type: String,
        /// Raw bytes
        bytes: Vec<u8>,
    },
}

impl FileInput {
    /// File at `path`
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// In-memory file
    #[must_use]
    pub fn contents(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Contents {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Base name of the file
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(path)
                .to_string(),
            Self::Contents { name, .. } => name.clone(),
        }
    }

    /// Wire form: a bare path, or `{ name, mimeType, base64 }`
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Path(path) => serde_json::Value::String(path.clone()),
            Self::Contents {
                name,
                mime_type,
                bytes,
            } => serde_json::json!({
                "name": name,
                "mimeType": mime_type,
                "base64": base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes),
            }),
        }
    }
}

pub(crate) fn millis(timeout: Option<Duration>) -> Option<u64> {
    timeout.map(|d| d.as_millis() as u64)
}
