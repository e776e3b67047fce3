//! Frame pages: locator factories bound to an iframe's content document.
//!
//! A [`FramePage`] builds exactly the selector strings the top-level
//! [`Page`] builds, but its locators query the iframe's document element
//! instead of the top-level document. Everything that is not a locator
//! factory is delegated to the owning page.
//!
//! The content document is captured when the frame page is created. If the
//! iframe navigates afterwards the frame page keeps querying the old
//! document; [`FramePage::is_stale`] reports that case and the caller should
//! create a new frame page.

use std::sync::Arc;

use crate::config::LocatorConfig;
use crate::dom::{Document, ElementRef};
use crate::locator::{Locator, LocatorCore, Scope};
use crate::page::{FrameTarget, LocatorFactory, Page};
use crate::result::LocatorResult;

/// Page-level locator factory scoped to one iframe
#[derive(Debug, Clone)]
pub struct FramePage {
    page: Page,
    iframe: ElementRef,
    document: Document,
    hosts: Vec<ElementRef>,
}

impl FramePage {
    pub(crate) const fn new(
        page: Page,
        iframe: ElementRef,
        document: Document,
        hosts: Vec<ElementRef>,
    ) -> Self {
        Self {
            page,
            iframe,
            document,
            hosts,
        }
    }

    /// The top-level page this frame page delegates to
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// The iframe element
    #[must_use]
    pub const fn iframe(&self) -> &ElementRef {
        &self.iframe
    }

    /// The content document locators are resolved against
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Whether the iframe no longer shows the document this frame page was
    /// bound to (navigated, detached or made cross-origin)
    #[must_use]
    pub fn is_stale(&self) -> bool {
        !self.iframe.is_connected()
            || !self
                .iframe
                .content_document()
                .is_some_and(|current| current.ptr_eq(&self.document))
    }

    /// Locator configuration of the owning page
    #[must_use]
    pub fn config(&self) -> &LocatorConfig {
        self.page.config()
    }

    /// Locator anchored on a concrete element
    #[must_use]
    pub fn element_locator(&self, element: &ElementRef) -> Box<dyn Locator> {
        self.page.element_locator(element)
    }

    /// Frame page for an iframe nested in this frame
    ///
    /// # Errors
    ///
    /// Same as [`Page::create_frame_page`]
    pub fn create_frame_page<'a>(
        &self,
        target: impl Into<FrameTarget<'a>>,
    ) -> LocatorResult<Self> {
        self.page.create_frame_page(target)
    }
}

impl LocatorFactory for FramePage {
    fn locator(&self, selector: &str) -> Box<dyn Locator> {
        let scope = Scope::Frame {
            document: self.document.clone(),
            hosts: self.hosts.clone(),
        };
        self.page.wrap(LocatorCore::new(
            Arc::clone(self.page.context()),
            selector,
            scope,
        ))
    }

    fn test_id_attribute(&self) -> &str {
        self.page.test_id_attribute()
    }
}

/// Iframe elements leading from `top` down to `target`, outermost first.
///
/// Only same-origin frames are searched.
pub(crate) fn frame_hosts(top: &Document, target: &Document) -> Option<Vec<ElementRef>> {
    for element in top.document_element().descendants() {
        if !element.is_iframe() {
            continue;
        }
        let Some(inner) = element.content_document() else {
            continue;
        };
        if inner.ptr_eq(target) {
            return Some(vec![element]);
        }
        if let Some(mut chain) = frame_hosts(&inner, target) {
            chain.insert(0, element);
            return Some(chain);
        }
    }
    None
}
