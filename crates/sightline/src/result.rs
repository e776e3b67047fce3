//! Result and error types for Sightline.

use thiserror::Error;

/// Result type for locator operations
pub type LocatorResult<T> = Result<T, LocatorError>;

/// Errors that can occur while resolving locators or dispatching actions.
///
/// Resolution and action variants carry the selector string and a description
/// of the container the selector was resolved against, so a failure can be
/// diagnosed from the message alone.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// Zero elements matched where one was required
    #[error("Cannot find element with locator: {selector}\n\n{container}")]
    ElementNotFound {
        /// Selector that was resolved
        selector: String,
        /// Container description
        container: String,
    },

    /// More than one element matched where exactly one was required
    #[error("Strict mode violation: locator {selector} resolved to {count} elements\n\n{container}")]
    AmbiguousMatch {
        /// Selector that was resolved
        selector: String,
        /// Number of matching elements
        count: usize,
        /// Container description
        container: String,
    },

    /// A select-option target has no matching `<option>`
    #[error("The {option} was not found in the \"select\" options of {selector}.\n\n{container}")]
    OptionNotFound {
        /// `option "<value or label>"` or `element <preview>`
        option: String,
        /// Selector of the `<select>`
        selector: String,
        /// Container description
        container: String,
    },

    /// The backend cannot perform the requested variant of an action
    #[error("Provider \"{provider}\" doesn't support {operation} ({selector})\n\n{container}")]
    UnsupportedOperation {
        /// Provider name
        provider: String,
        /// What was attempted
        operation: String,
        /// Selector of the target
        selector: String,
        /// Container description
        container: String,
    },

    /// Wrong element kind supplied
    #[error("{message}")]
    TypeMismatch {
        /// Error message
        message: String,
    },

    /// Content document is not reachable (cross-origin frame)
    #[error("{message}")]
    AccessDenied {
        /// Error message
        message: String,
    },

    /// The backend rejected the interaction
    #[error("{action} failed on {selector}: {message}\n\n{container}")]
    ActionFailed {
        /// Action verb
        action: String,
        /// Selector of the target
        selector: String,
        /// Backend diagnostic text
        message: String,
        /// Container description
        container: String,
    },

    /// The resolved element cannot accept this kind of input
    #[error("{action} cannot target {element} ({selector}): expected {expected}\n\n{container}")]
    InvalidTarget {
        /// Action verb
        action: String,
        /// Selector of the target
        selector: String,
        /// Preview of the resolved element
        element: String,
        /// What the action accepts
        expected: String,
        /// Container description
        container: String,
    },

    /// The query service refused to parse a selector
    #[error("Invalid selector {selector}: {message}")]
    InvalidSelector {
        /// Selector text
        selector: String,
        /// Parse failure
        message: String,
    },

    /// The cooperative action timeout elapsed
    #[error("{action} on {selector} timed out after {ms}ms\n\n{container}")]
    Timeout {
        /// Action verb
        action: String,
        /// Selector of the target
        selector: String,
        /// Timeout in milliseconds
        ms: u64,
        /// Container description
        container: String,
    },

    /// Iframe scale could not be computed
    #[error("Cannot compute iframe scale: {message}")]
    ScaleUnavailable {
        /// Error message
        message: String,
    },

    /// HTML fragment could not be parsed
    #[error("HTML parse error: {message}")]
    HtmlParse {
        /// Error message
        message: String,
    },

    /// Remote command channel failure
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fieldless view of [`LocatorError`] for branching on the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`LocatorError::ElementNotFound`]
    ElementNotFound,
    /// See [`LocatorError::AmbiguousMatch`]
    AmbiguousMatch,
    /// See [`LocatorError::OptionNotFound`]
    OptionNotFound,
    /// See [`LocatorError::UnsupportedOperation`]
    UnsupportedOperation,
    /// See [`LocatorError::TypeMismatch`]
    TypeMismatch,
    /// See [`LocatorError::AccessDenied`]
    AccessDenied,
    /// See [`LocatorError::ActionFailed`]
    ActionFailed,
    /// See [`LocatorError::InvalidTarget`]
    InvalidTarget,
    /// See [`LocatorError::InvalidSelector`]
    InvalidSelector,
    /// See [`LocatorError::Timeout`]
    Timeout,
    /// See [`LocatorError::ScaleUnavailable`]
    ScaleUnavailable,
    /// See [`LocatorError::HtmlParse`]
    HtmlParse,
    /// See [`LocatorError::Transport`]
    Transport,
    /// See [`LocatorError::Json`]
    Json,
}

impl LocatorError {
    /// Taxonomy bucket of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Self::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            Self::OptionNotFound { .. } => ErrorKind::OptionNotFound,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::ActionFailed { .. } => ErrorKind::ActionFailed,
            Self::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            Self::InvalidSelector { .. } => ErrorKind::InvalidSelector,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ScaleUnavailable { .. } => ErrorKind::ScaleUnavailable,
            Self::HtmlParse { .. } => ErrorKind::HtmlParse,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Json(_) => ErrorKind::Json,
        }
    }

    /// Fill in the container description of an action error that was raised
    /// without one
    #[must_use]
    pub(crate) fn in_container(mut self, description: String) -> Self {
        match &mut self {
            Self::ActionFailed { container, .. }
            | Self::InvalidTarget { container, .. }
            | Self::UnsupportedOperation { container, .. }
            | Self::Timeout { container, .. }
                if container.is_empty() =>
            {
                *container = description;
            }
            _ => {}
        }
        self
    }
}
