//! Native-DOM adapter: resolve locally, dispatch synthetic events.

use async_trait::async_trait;
use tracing::debug;

use crate::config::Provider;
use crate::dom::ElementRef;
use crate::options::{ActionOptions, ClickOptions, DragAndDropOptions, FileInput, HoverOptions};
use crate::result::LocatorResult;
use crate::transport::Action;
use crate::user_event;

use super::{select, Locator, LocatorCore, SelectTarget};

/// Locator that acts on the in-process document
#[derive(Debug, Clone)]
pub struct NativeLocator {
    core: LocatorCore,
}

impl NativeLocator {
    /// Wrap a core
    #[must_use]
    pub const fn new(core: LocatorCore) -> Self {
        Self { core }
    }

    fn target(&self, action: Action) -> LocatorResult<ElementRef> {
        let element = self.core.single(self.core.context().config.strict)?;
        debug!(
            provider = Provider::Native.name(),
            action = action.as_str(),
            selector = %self.core.selector(),
            "dispatching native event"
        );
        Ok(element)
    }

    fn described(&self, result: LocatorResult<()>) -> LocatorResult<()> {
        result.map_err(|e| e.in_container(self.core.container_description()))
    }
}

#[async_trait]
impl Locator for NativeLocator {
    fn core(&self) -> &LocatorCore {
        &self.core
    }

    fn provider(&self) -> Provider {
        Provider::Native
    }

    fn with_core(&self, core: LocatorCore) -> Box<dyn Locator> {
        Box::new(Self::new(core))
    }

    fn handle(&self) -> LocatorResult<String> {
        self.core.css_handle()
    }

    async fn click(&self, _options: ClickOptions) -> LocatorResult<()> {
        self.described(user_event::click(&self.target(Action::Click)?, self.selector(), 1))
    }

    async fn dbl_click(&self, _options: ClickOptions) -> LocatorResult<()> {
        self.described(user_event::click(&self.target(Action::DblClick)?, self.selector(), 2))
    }

    async fn triple_click(&self, _options: ClickOptions) -> LocatorResult<()> {
        self.described(user_event::click(&self.target(Action::TripleClick)?, self.selector(), 3))
    }

    async fn hover(&self, _options: HoverOptions) -> LocatorResult<()> {
        self.described(user_event::hover(&self.target(Action::Hover)?, self.selector()))
    }

    async fn unhover(&self, _options: ActionOptions) -> LocatorResult<()> {
        self.described(user_event::unhover(&self.target(Action::Unhover)?, self.selector()))
    }

    async fn fill(&self, text: &str, _options: ActionOptions) -> LocatorResult<()> {
        self.described(user_event::fill(&self.target(Action::Fill)?, self.selector(), text))
    }

    async fn clear(&self, _options: ActionOptions) -> LocatorResult<()> {
        self.described(user_event::clear(&self.target(Action::Clear)?, self.selector()))
    }

    async fn select_options(
        &self,
        values: Vec<SelectTarget>,
        _options: ActionOptions,
    ) -> LocatorResult<()> {
        let element = self.target(Action::SelectOptions)?;
        let chosen = select::resolve_options(&self.core, &element, &values)?;
        self.described(user_event::select_options(&element, self.selector(), &chosen))
    }

    async fn upload(&self, files: Vec<FileInput>, _options: ActionOptions) -> LocatorResult<()> {
        let element = self.target(Action::Upload)?;
        self.described(user_event::upload(&element, self.selector(), &files))
    }

    async fn drop_to(
        &self,
        target: &dyn Locator,
        _options: DragAndDropOptions,
    ) -> LocatorResult<()> {
        let source = self.target(Action::DragAndDrop)?;
        let destination = target.element()?;
        self.described(user_event::drag_and_drop(
            &source,
            self.selector(),
            &destination,
            target.selector(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocatorConfig;
    use crate::dom::Document;
    use crate::locator::test_support::page;
    use crate::page::{LocatorFactory, Page};
    use crate::result::ErrorKind;
    use crate::selector::builder::{RoleOptions, TextOptions};

    #[tokio::test]
    async fn test_fill_by_label() {
        let (page, transport) = page(Provider::Native);
        let input = page.get_by_label_text("Name".into(), TextOptions::default());
        input.fill("Ada", ActionOptions::new()).await.unwrap();
        assert_eq!(input.element().unwrap().value(), "Ada");
        assert!(transport.history().is_empty());
    }

    #[tokio::test]
    async fn test_action_errors_describe_the_container() {
        let document = Document::with_body(
            r#"<div id="d">x</div><input id="f" disabled>"#,
        )
        .unwrap();
        let page = Page::new(document, LocatorConfig::new().with_provider(Provider::Native));

        let err = page
            .locator("#d")
            .fill("text", ActionOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
        assert!(err.to_string().contains("#d"));
        assert!(err.to_string().contains("<body"), "{err}");

        let err = page
            .locator("#f")
            .fill("text", ActionOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActionFailed);
        assert!(err.to_string().contains("element is disabled"));
        assert!(err.to_string().contains("<body"), "{err}");
    }

    #[tokio::test]
    async fn test_select_options_red() {
        let (page, _) = page(Provider::Native);
        let select = page.get_by_test_id("color".into());
        select
            .select_options(vec!["green".into()], ActionOptions::new())
            .await
            .unwrap();
        select
            .select_options(vec!["red".into()], ActionOptions::new())
            .await
            .unwrap();
        assert_eq!(select.element().unwrap().value(), "red");
    }

    #[tokio::test]
    async fn test_select_unknown_option() {
        let (page, _) = page(Provider::Native);
        let err = page
            .locator("#color")
            .select_options(vec!["purple".into()], ActionOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OptionNotFound);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_ambiguous_click() {
        let (page, _) = page(Provider::Native);
        let err = page
            .get_by_role("button", &RoleOptions::new())
            .click(ClickOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::LocatorError::AmbiguousMatch { count: 2, .. }));
        assert!(page.document().events().is_empty());

        let lenient = Page::new(
            page.document().clone(),
            LocatorConfig::new()
                .with_provider(Provider::Native)
                .with_strict(false),
        );
        lenient
            .get_by_role("button", &RoleOptions::new())
            .click(ClickOptions::new())
            .await
            .unwrap();
        let clicked = page
            .document()
            .events()
            .into_iter()
            .find(|e| e.kind == "click")
            .unwrap();
        assert_eq!(clicked.target.text_content(), "Save");
    }

    #[tokio::test]
    async fn test_drop_to_missing_target_fires_nothing() {
        let (page, _) = page(Provider::Native);
        let err = page
            .locator("#source")
            .drop_to(page.locator("#nowhere").as_ref(), DragAndDropOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ElementNotFound);
        assert!(page.document().events().is_empty());
    }

    #[tokio::test]
    async fn test_hover_and_unhover() {
        let document = Document::with_body(r#"<a href="/" title="Home">home</a>"#).unwrap();
        let page = Page::new(document.clone(), LocatorConfig::new().with_provider(Provider::Native));
        let link = page.get_by_title("Home".into(), TextOptions::default());
        link.hover(HoverOptions::new()).await.unwrap();
        assert_eq!(document.hovered(), Some(link.element().unwrap()));
        link.unhover(ActionOptions::new()).await.unwrap();
        assert_eq!(document.hovered(), None);
    }
}
