//! The Locator contract and its backend adapters.
//!
//! A [`Locator`] is an immutable `(selector, container, scope)` triple bound
//! to a [`PageContext`]. Element retrieval and sub-locator derivation are
//! shared by every backend through [`LocatorCore`]; the three adapters only
//! decide how an action reaches the target:
//!
//! - [`RemoteDriverLocator`] - forwards the selector string itself
//! - [`NativeLocator`] - resolves locally and dispatches synthetic events
//! - [`RemoteSessionLocator`] - forwards the CSS paths of the resolved
//!   elements and selects options by index

mod native;
mod remote_driver;
mod remote_session;
mod select;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::Provider;
use crate::dom::{Document, ElementRef};
use crate::frame::frame_hosts;
use crate::options::{
    ActionOptions, ClickOptions, DragAndDropOptions, FileInput, HoverOptions,
};
use crate::page::PageContext;
use crate::result::{LocatorError, LocatorResult};
use crate::selector::builder::{
    chain, get_by_alt_text_selector, get_by_label_selector, get_by_placeholder_selector,
    get_by_role_selector, get_by_test_id_selector, get_by_text_selector, get_by_title_selector,
    nth_selector, RoleOptions, TextOptions, TextPattern, CHAIN_SEPARATOR, ENTER_FRAME,
};
use crate::selector::ParsedSelector;
use crate::transport::{dispatch, Action, RemoteCommand};

pub use native::NativeLocator;
pub use remote_driver::RemoteDriverLocator;
pub use remote_session::RemoteSessionLocator;

/// What `select_options` should choose
#[derive(Debug)]
pub enum SelectTarget {
    /// An option value, or failing that its visible label
    Text(String),
    /// An `<option>` element, matched by identity
    Element(ElementRef),
    /// A locator resolving to an `<option>` element
    Locator(Box<dyn Locator>),
}

impl From<&str> for SelectTarget {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SelectTarget {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<ElementRef> for SelectTarget {
    fn from(value: ElementRef) -> Self {
        Self::Element(value)
    }
}

impl From<Box<dyn Locator>> for SelectTarget {
    fn from(value: Box<dyn Locator>) -> Self {
        Self::Locator(value)
    }
}

/// Which document a locator queries
#[derive(Debug, Clone)]
pub enum Scope {
    /// The page's top-level document
    Page,
    /// A same-origin iframe's content document
    Frame {
        /// The content document queried
        document: Document,
        /// Iframe elements leading from the top-level document to `document`
        hosts: Vec<ElementRef>,
    },
}

/// State shared by every adapter: selector, container and query scope
#[derive(Debug, Clone)]
pub struct LocatorCore {
    selector: String,
    container: Option<ElementRef>,
    scope: Scope,
    ctx: Arc<PageContext>,
}

impl LocatorCore {
    /// Core for `selector` in `scope`
    #[must_use]
    pub fn new(ctx: Arc<PageContext>, selector: impl Into<String>, scope: Scope) -> Self {
        Self {
            selector: selector.into(),
            container: None,
            scope,
            ctx,
        }
    }

    /// Core anchored on a concrete element, in whichever document holds it
    #[must_use]
    pub fn for_element(ctx: Arc<PageContext>, element: &ElementRef) -> Self {
        let scope = scope_of(&ctx, element.document());
        Self {
            selector: ctx.engine.generate_selector_simple(element),
            container: Some(element.clone()),
            scope,
            ctx,
        }
    }

    /// Selector string this core was built from
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Element the locator is anchored on, if any
    #[must_use]
    pub const fn container(&self) -> Option<&ElementRef> {
        self.container.as_ref()
    }

    /// Query scope
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Owning page context
    #[must_use]
    pub const fn context(&self) -> &Arc<PageContext> {
        &self.ctx
    }

    /// Document queried by this locator
    #[must_use]
    pub fn document(&self) -> &Document {
        match &self.scope {
            Scope::Page => &self.ctx.document,
            Scope::Frame { document, .. } => document,
        }
    }

    /// Query root: the scope document's element
    #[must_use]
    pub fn root(&self) -> ElementRef {
        self.document().document_element()
    }

    /// Description of the container, embedded in resolution errors
    #[must_use]
    pub fn container_description(&self) -> String {
        let container = self
            .container
            .clone()
            .unwrap_or_else(|| self.document().body());
        self.ctx.engine.preview_node(&container)
    }

    /// Same container and scope, different selector
    #[must_use]
    pub fn derive(&self, selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            container: self.container.clone(),
            scope: self.scope.clone(),
            ctx: Arc::clone(&self.ctx),
        }
    }

    fn parsed(&self) -> LocatorResult<ParsedSelector> {
        self.ctx.engine.parse_selector(&self.selector)
    }

    pub(crate) fn not_found(&self) -> LocatorError {
        LocatorError::ElementNotFound {
            selector: self.selector.clone(),
            container: self.container_description(),
        }
    }

    /// First match, or `None`
    pub fn query(&self) -> LocatorResult<Option<ElementRef>> {
        let parsed = self.parsed()?;
        self.ctx.engine.query_selector(&parsed, &self.root(), false)
    }

    /// First match; zero matches is [`LocatorError::ElementNotFound`]
    pub fn element(&self) -> LocatorResult<ElementRef> {
        self.query()?.ok_or_else(|| self.not_found())
    }

    /// Every match in document order. An unparsable selector matches nothing.
    #[must_use]
    pub fn elements(&self) -> Vec<ElementRef> {
        match self.parsed() {
            Ok(parsed) => self.ctx.engine.query_selector_all(&parsed, &self.root()),
            Err(error) => {
                debug!(selector = %self.selector, %error, "selector did not parse");
                Vec::new()
            }
        }
    }

    /// Exactly one match when `strict`, else the first match
    pub fn single(&self, strict: bool) -> LocatorResult<ElementRef> {
        let parsed = self.parsed()?;
        let mut matches = self.ctx.engine.query_selector_all(&parsed, &self.root());
        match matches.len() {
            0 => Err(self.not_found()),
            1 => Ok(matches.remove(0)),
            count if strict => Err(LocatorError::AmbiguousMatch {
                selector: self.selector.clone(),
                count,
                container: self.container_description(),
            }),
            _ => Ok(matches.remove(0)),
        }
    }

    /// Selector prefix that walks a remote session into this core's frame
    #[must_use]
    pub fn frame_prefix(&self) -> String {
        match &self.scope {
            Scope::Page => String::new(),
            Scope::Frame { hosts, .. } => self.hosts_prefix(hosts),
        }
    }

    fn hosts_prefix(&self, hosts: &[ElementRef]) -> String {
        hosts
            .iter()
            .map(|host| {
                format!(
                    "{}{CHAIN_SEPARATOR}{ENTER_FRAME}{CHAIN_SEPARATOR}",
                    self.ctx.engine.generate_selector_simple(host)
                )
            })
            .collect()
    }

    /// Remote handle for an arbitrary element: frame prefix plus its
    /// generated selector
    #[must_use]
    pub fn element_handle(&self, element: &ElementRef) -> String {
        let prefix = match scope_of(&self.ctx, element.document()) {
            Scope::Page => String::new(),
            Scope::Frame { hosts, .. } => self.hosts_prefix(&hosts),
        };
        format!("{prefix}{}", self.ctx.engine.generate_selector_simple(element))
    }

    /// CSS paths of every match joined by `", "`, behind the frame prefix
    pub fn css_handle(&self) -> LocatorResult<String> {
        let paths: Vec<String> = self
            .elements()
            .iter()
            .map(|e| self.ctx.engine.generate_selector_simple(e))
            .collect();
        if paths.is_empty() {
            return Err(self.not_found());
        }
        Ok(format!("{}{}", self.frame_prefix(), paths.join(", ")))
    }

    /// Send one command over the page's transport
    pub(crate) async fn send(&self, command: RemoteCommand) -> LocatorResult<()> {
        let transport = self
            .ctx
            .transport
            .as_deref()
            .ok_or_else(|| LocatorError::Transport {
                message: format!(
                    "provider \"{}\" needs a command transport, none is attached",
                    command.provider
                ),
            })?;
        dispatch(transport, command, &self.container_description()).await?;
        Ok(())
    }
}

/// Scope for a document: the page itself, or the frame chain reaching it
fn scope_of(ctx: &PageContext, document: &Document) -> Scope {
    if document.ptr_eq(&ctx.document) {
        return Scope::Page;
    }
    Scope::Frame {
        document: document.clone(),
        hosts: frame_hosts(&ctx.document, document).unwrap_or_default(),
    }
}

/// Backend-agnostic element locator.
///
/// Every derivation (`locator`, `nth`, `get_by_*`, ...) returns a new
/// locator of the same adapter; the receiver is never modified. Actions
/// resolve, normalize their options and dispatch through the adapter.
#[async_trait]
pub trait Locator: Send + Sync + fmt::Debug {
    /// Shared selector/container/scope state
    fn core(&self) -> &LocatorCore;

    /// Backend this locator dispatches to
    fn provider(&self) -> Provider;

    /// New locator of the same adapter over `core`
    fn with_core(&self, core: LocatorCore) -> Box<dyn Locator>;

    /// Addressable handle the backend receives for this locator
    fn handle(&self) -> LocatorResult<String>;

    /// Selector string this locator was built from
    fn selector(&self) -> &str {
        self.core().selector()
    }

    /// First matching element, or `None`
    fn query(&self) -> LocatorResult<Option<ElementRef>> {
        self.core().query()
    }

    /// First matching element
    ///
    /// # Errors
    ///
    /// [`LocatorError::ElementNotFound`] when nothing matches
    fn element(&self) -> LocatorResult<ElementRef> {
        self.core().element()
    }

    /// Every matching element in document order
    fn elements(&self) -> Vec<ElementRef> {
        self.core().elements()
    }

    /// Number of matching elements
    fn count(&self) -> usize {
        self.elements().len()
    }

    /// `this >> selector`
    fn locator(&self, selector: &str) -> Box<dyn Locator> {
        self.with_core(self.core().derive(chain(self.selector(), selector)))
    }

    /// Locator anchored on `element`
    fn element_locator(&self, element: &ElementRef) -> Box<dyn Locator> {
        self.with_core(LocatorCore::for_element(
            Arc::clone(self.core().context()),
            element,
        ))
    }

    /// The `index`-th match; negative indexes count from the end
    fn nth(&self, index: i64) -> Box<dyn Locator> {
        self.locator(&nth_selector(index))
    }

    /// The first match
    fn first(&self) -> Box<dyn Locator> {
        self.nth(0)
    }

    /// The last match
    fn last(&self) -> Box<dyn Locator> {
        self.nth(-1)
    }

    /// One element-anchored locator per current match
    fn all(&self) -> Vec<Box<dyn Locator>> {
        self.elements()
            .iter()
            .map(|element| self.element_locator(element))
            .collect()
    }

    /// Descendants with an ARIA role
    fn get_by_role(&self, role: &str, options: &RoleOptions) -> Box<dyn Locator> {
        self.locator(&get_by_role_selector(role, options))
    }

    /// Descendant form controls by label text
    fn get_by_label_text(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_label_selector(&text, options))
    }

    /// Descendants by test id
    fn get_by_test_id(&self, test_id: TextPattern) -> Box<dyn Locator> {
        let attribute = self.core().context().config.test_id_attribute.clone();
        self.locator(&get_by_test_id_selector(&attribute, &test_id))
    }

    /// Descendants by `alt` text
    fn get_by_alt_text(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_alt_text_selector(&text, options))
    }

    /// Descendants by placeholder
    fn get_by_placeholder(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_placeholder_selector(&text, options))
    }

    /// Descendants by visible text
    fn get_by_text(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_text_selector(&text, options))
    }

    /// Descendants by `title`
    fn get_by_title(&self, text: TextPattern, options: TextOptions) -> Box<dyn Locator> {
        self.locator(&get_by_title_selector(&text, options))
    }

    /// Click the element
    async fn click(&self, options: ClickOptions) -> LocatorResult<()>;

    /// Double-click the element
    async fn dbl_click(&self, options: ClickOptions) -> LocatorResult<()>;

    /// Triple-click the element
    async fn triple_click(&self, options: ClickOptions) -> LocatorResult<()>;

    /// Move the pointer over the element
    async fn hover(&self, options: HoverOptions) -> LocatorResult<()>;

    /// Move the pointer away from the element
    async fn unhover(&self, options: ActionOptions) -> LocatorResult<()>;

    /// Replace the element's value with `text`
    async fn fill(&self, text: &str, options: ActionOptions) -> LocatorResult<()>;

    /// Empty the element's value
    async fn clear(&self, options: ActionOptions) -> LocatorResult<()>;

    /// Choose options of the `<select>` element
    async fn select_options(
        &self,
        values: Vec<SelectTarget>,
        options: ActionOptions,
    ) -> LocatorResult<()>;

    /// Assign files to the file input
    async fn upload(&self, files: Vec<FileInput>, options: ActionOptions) -> LocatorResult<()>;

    /// Drag the element onto `target`'s element.
    ///
    /// Both sides are resolved before anything is dispatched.
    async fn drop_to(&self, target: &dyn Locator, options: DragAndDropOptions)
        -> LocatorResult<()>;
}

/// Build the command for `action` on `locator`
pub(crate) fn command(
    locator: &dyn Locator,
    action: Action,
    handle: String,
    options: crate::options::NativeOptions,
) -> RemoteCommand {
    RemoteCommand::new(locator.provider(), action, handle, options)
}
