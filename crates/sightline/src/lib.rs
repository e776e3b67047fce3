//! Sightline: backend-agnostic element locators for browser tests
//!
//! Tests describe *what* element they want ("the button named Save", "the
//! input labeled Email") and Sightline decides *how* the active automation
//! backend finds and drives it. The same test code runs unchanged against
//! three backends and inside same-origin iframes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Page / FramePage (LocatorFactory)                               │
//! │    get_by_role, get_by_label_text, get_by_test_id, ...           │
//! │             │ selector string                                    │
//! │             ▼                                                    │
//! │  ┌────────────────────┐ ┌──────────────┐ ┌────────────────────┐  │
//! │  │ RemoteDriverLocator│ │ NativeLocator│ │RemoteSessionLocator│  │
//! │  │ selector + scaled  │ │ synthetic DOM│ │ CSS paths, index   │  │
//! │  │ options            │ │ events       │ │ option selection   │  │
//! │  └─────────┬──────────┘ └──────┬───────┘ └─────────┬──────────┘  │
//! │            │ CommandTransport  │ user_event        │            │
//! │            ▼                   ▼                   ▼            │
//! │     remote session       dom::Document       remote session     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use sightline::{Document, LocatorConfig, LocatorFactory, Page, Provider};
//!
//! let document = Document::with_body(
//!     r#"<iframe id="app" srcdoc='<button data-testid="go">Go</button>'></iframe>"#,
//! )
//! .unwrap();
//! let page = Page::new(document, LocatorConfig::new().with_provider(Provider::Native));
//! let frame = page.create_frame_page(page.locator("#app").as_ref()).unwrap();
//! let button = frame.get_by_test_id("go".into()).element().unwrap();
//! assert_eq!(button.text_content(), "Go");
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod config;
pub mod dom;
mod frame;
pub mod locator;
pub mod logging;
pub mod normalize;
pub mod options;
mod page;
mod result;
pub mod selector;
pub mod transport;
pub mod user_event;

pub use config::{LocatorConfig, Provider, DEFAULT_TEST_ID_ATTRIBUTE};
pub use dom::{Document, DomEvent, ElementRef, FrameContent};
pub use frame::FramePage;
pub use locator::{
    Locator, LocatorCore, NativeLocator, RemoteDriverLocator, RemoteSessionLocator, Scope,
    SelectTarget,
};
pub use normalize::{FixedScale, FrameGeometry, ScaleSource, TesterElementScale};
pub use options::{
    ActionOptions, ClickOptions, DragAndDropOptions, FileInput, HoverOptions, NativeOptions,
    Position, TimeoutOption,
};
pub use page::{FrameTarget, LocatorFactory, Page, PageContext};
pub use result::{ErrorKind, LocatorError, LocatorResult};
pub use selector::builder::{RoleOptions, TextOptions, TextPattern};
pub use selector::role::AriaState;
pub use selector::{DomSelectorEngine, SelectorEngine};
pub use transport::{
    Action, CommandTransport, LoopbackTransport, RecordingTransport, RemoteCommand, RemoteFailure,
};

#[cfg(feature = "browser")]
pub use transport::CdpTransport;
