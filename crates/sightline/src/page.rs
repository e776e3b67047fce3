//! Page object: the entry point tests build locators from.

use std::sync::Arc;

use tracing::debug;

use crate::config::{LocatorConfig, Provider};
use crate::dom::{Document, ElementRef, FrameContent};
use crate::frame::{frame_hosts, FramePage};
use crate::locator::{
    Locator, LocatorCore, NativeLocator, RemoteDriverLocator, RemoteSessionLocator, Scope,
};
use crate::normalize::{FixedScale, ScaleSource};
use crate::result::{LocatorError, LocatorResult};
use crate::selector::builder::{
    get_by_alt_text_selector, get_by_label_selector, get_by_placeholder_selector,
    get_by_role_selector, get_by_test_id_selector, get_by_text_selector, get_by_title_selector,
    RoleOptions, TextOptions, TextPattern,
};
use crate::selector::{DomSelectorEngine, SelectorEngine};
use crate::transport::CommandTransport;

/// Everything a locator needs besides its selector, captured once per page
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Top-level document
    pub document: Document,
    /// Selector query service
    pub engine: Arc<dyn SelectorEngine>,
    /// Locator configuration
    pub config: LocatorConfig,
    /// Channel to the remote session, for remote providers
    pub transport: Option<Arc<dyn CommandTransport>>,
    /// Iframe rendering scale used by coordinate normalization
    pub scale: Arc<dyn ScaleSource>,
}

/// Locator factories shared by [`Page`] and [`FramePage`].
///
/// Implementors only decide how a selector string becomes a locator; every
/// `get_by_*` factory builds the same selector string everywhere.
pub trait LocatorFactory {
    /// Locator for a raw selector string
    fn locator(&self, selector: &str) -> Box<dyn Locator>;

    /// Attribute matched by [`LocatorFactory::get_by_test_id`]
    fn test_id_attribute(&self) -> &str;

    /// Elements with an ARIA role
    fn get_by_role(&self, role: &str, options: &RoleOptions) -> Box<dyn Locator> {
        self.locator(&get_by_role_selector(role, options))
    }

    /// Form controls by label text
    fn get_by_label_text(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_label_selector(&text, options))
    }

    /// Elements by test id
    fn get_by_test_id(&self, test_id: TextPattern) -> Box<dyn Locator> {
        self.locator(&get_by_test_id_selector(self.test_id_attribute(), &test_id))
    }

    /// Elements by `alt` text
    fn get_by_alt_text(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_alt_text_selector(&text, options))
    }

    /// Elements by placeholder
    fn get_by_placeholder(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_placeholder_selector(&text, options))
    }

    /// Elements by visible text
    fn get_by_text(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_text_selector(&text, options))
    }

    /// Elements by `title`
    fn get_by_title(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_title_selector(&text, options))
    }
}

/// What `create_frame_page` accepts
#[derive(Debug)]
pub enum FrameTarget<'a> {
    /// The iframe element itself
    Element(ElementRef),
    /// A locator resolving to the iframe element
    Locator(&'a dyn Locator),
}

impl From<ElementRef> for FrameTarget<'_> {
    fn from(value: ElementRef) -> Self {
        Self::Element(value)
    }
}

impl From<&ElementRef> for FrameTarget<'_> {
    fn from(value: &ElementRef) -> Self {
        Self::Element(value.clone())
    }
}

impl<'a> From<&'a dyn Locator> for FrameTarget<'a> {
    fn from(value: &'a dyn Locator) -> Self {
        Self::Locator(value)
    }
}

impl<'a> From<&'a Box<dyn Locator>> for FrameTarget<'a> {
    fn from(value: &'a Box<dyn Locator>) -> Self {
        Self::Locator(value.as_ref())
    }
}

/// Top-level page object
#[derive(Debug, Clone)]
pub struct Page {
    ctx: Arc<PageContext>,
}

impl Page {
    /// Page over `document` with the default query engine, a unit scale and
    /// no transport
    #[must_use]
    pub fn new(document: Document, config: LocatorConfig) -> Self {
        Self {
            ctx: Arc::new(PageContext {
                document,
                engine: Arc::new(DomSelectorEngine::new()),
                config,
                transport: None,
                scale: Arc::new(FixedScale::default()),
            }),
        }
    }

    /// Attach the remote command channel
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn CommandTransport>) -> Self {
        Arc::make_mut(&mut self.ctx).transport = Some(transport);
        self
    }

    /// Use a different query engine
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn SelectorEngine>) -> Self {
        Arc::make_mut(&mut self.ctx).engine = engine;
        self
    }

    /// Use a different iframe scale source
    #[must_use]
    pub fn with_scale_source(mut self, scale: Arc<dyn ScaleSource>) -> Self {
        Arc::make_mut(&mut self.ctx).scale = scale;
        self
    }

    /// Shared context
    #[must_use]
    pub const fn context(&self) -> &Arc<PageContext> {
        &self.ctx
    }

    /// Top-level document
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.ctx.document
    }

    /// Locator configuration
    #[must_use]
    pub fn config(&self) -> &LocatorConfig {
        &self.ctx.config
    }

    /// Active backend
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.ctx.config.provider
    }

    /// Wrap a core in the configured adapter
    pub(crate) fn wrap(&self, core: LocatorCore) -> Box<dyn Locator> {
        match self.provider() {
            Provider::RemoteDriver => Box::new(RemoteDriverLocator::new(core)),
            Provider::Native => Box::new(NativeLocator::new(core)),
            Provider::RemoteSession => Box::new(RemoteSessionLocator::new(core)),
        }
    }

    /// Locator anchored on a concrete element
    #[must_use]
    pub fn element_locator(&self, element: &ElementRef) -> Box<dyn Locator> {
        self.wrap(LocatorCore::for_element(Arc::clone(&self.ctx), element))
    }

    /// Page bound to an iframe's content document.
    ///
    /// # Errors
    ///
    /// - [`LocatorError::ElementNotFound`] if a locator target resolves to
    ///   nothing
    /// - [`LocatorError::TypeMismatch`] if the target is not an `<iframe>`
    /// - [`LocatorError::AccessDenied`] if its content document is not
    ///   reachable
    pub fn create_frame_page<'a>(&self, target: impl Into<FrameTarget<'a>>) -> LocatorResult<FramePage> {
        let iframe = match target.into() {
            FrameTarget::Element(element) => element,
            FrameTarget::Locator(locator) => locator.element()?,
        };
        if !iframe.is_iframe() {
            return Err(LocatorError::TypeMismatch {
                message: "Expected frameElement to be an iframe element".to_string(),
            });
        }
        let document = match iframe.frame_content() {
            Some(FrameContent::SameOrigin(document)) => document,
            _ => {
                return Err(LocatorError::AccessDenied {
                    message: "Could not access iframe content document".to_string(),
                })
            }
        };

        let mut hosts = if iframe.document().ptr_eq(self.document()) {
            Vec::new()
        } else {
            frame_hosts(self.document(), iframe.document()).unwrap_or_default()
        };
        hosts.push(iframe.clone());

        debug!(
            iframe = %iframe.preview(),
            depth = hosts.len(),
            "created frame page"
        );
        Ok(FramePage::new(self.clone(), iframe, document, hosts))
    }
}

impl LocatorFactory for Page {
    fn locator(&self, selector: &str) -> Box<dyn Locator> {
        self.wrap(LocatorCore::new(Arc::clone(&self.ctx), selector, Scope::Page))
    }

    fn test_id_attribute(&self) -> &str {
        &self.ctx.config.test_id_attribute
    }
}
