//! Remote-driver adapter.
//!
//! The selector string is the handle: the remote session resolves it
//! itself. Every action gets the configured default timeout, and pointer
//! positions are scaled by the iframe rendering scale.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Provider;
use crate::normalize;
use crate::options::{ActionOptions, ClickOptions, DragAndDropOptions, FileInput, HoverOptions};
use crate::result::LocatorResult;
use crate::transport::Action;

use super::{command, Locator, LocatorCore, SelectTarget};

/// Locator for an out-of-process automation driver
#[derive(Debug, Clone)]
pub struct RemoteDriverLocator {
    core: LocatorCore,
}

impl RemoteDriverLocator {
    /// Wrap a core
    #[must_use]
    pub const fn new(core: LocatorCore) -> Self {
        Self { core }
    }

    async fn pointer(&self, action: Action, options: &ClickOptions) -> LocatorResult<()> {
        let ctx = self.core.context();
        let native = normalize::driver_click(options, &ctx.config, ctx.scale.as_ref())?;
        self.core
            .send(command(self, action, self.handle()?, native))
            .await
    }

    async fn plain(&self, action: Action, args: Value, options: &ActionOptions) -> LocatorResult<()> {
        let native = normalize::driver_plain(options, &self.core.context().config);
        self.core
            .send(command(self, action, self.handle()?, native).with_args(args))
            .await
    }

    fn select_token(&self, target: &SelectTarget) -> LocatorResult<Value> {
        Ok(match target {
            SelectTarget::Text(text) => Value::String(text.clone()),
            SelectTarget::Element(element) => json!({ "element": self.core.element_handle(element) }),
            SelectTarget::Locator(locator) => json!({ "element": locator.handle()? }),
        })
    }
}

#[async_trait]
impl Locator for RemoteDriverLocator {
    fn core(&self) -> &LocatorCore {
        &self.core
    }

    fn provider(&self) -> Provider {
        Provider::RemoteDriver
    }

    fn with_core(&self, core: LocatorCore) -> Box<dyn Locator> {
        Box::new(Self::new(core))
    }

    fn handle(&self) -> LocatorResult<String> {
        Ok(format!("{}{}", self.core.frame_prefix(), self.core.selector()))
    }

    async fn click(&self, options: ClickOptions) -> LocatorResult<()> {
        self.pointer(Action::Click, &options).await
    }

    async fn dbl_click(&self, options: ClickOptions) -> LocatorResult<()> {
        self.pointer(Action::DblClick, &options).await
    }

    async fn triple_click(&self, options: ClickOptions) -> LocatorResult<()> {
        self.pointer(Action::TripleClick, &options).await
    }

    async fn hover(&self, options: HoverOptions) -> LocatorResult<()> {
        let ctx = self.core.context();
        let native = normalize::driver_hover(&options, &ctx.config, ctx.scale.as_ref())?;
        self.core
            .send(command(self, Action::Hover, self.handle()?, native))
            .await
    }

    async fn unhover(&self, options: ActionOptions) -> LocatorResult<()> {
        self.plain(Action::Unhover, Value::Null, &options).await
    }

    async fn fill(&self, text: &str, options: ActionOptions) -> LocatorResult<()> {
        self.plain(Action::Fill, json!({ "text": text }), &options)
            .await
    }

    async fn clear(&self, options: ActionOptions) -> LocatorResult<()> {
        self.plain(Action::Clear, Value::Null, &options).await
    }

    async fn select_options(
        &self,
        values: Vec<SelectTarget>,
        options: ActionOptions,
    ) -> LocatorResult<()> {
        let tokens = values
            .iter()
            .map(|target| self.select_token(target))
            .collect::<LocatorResult<Vec<_>>>()?;
        self.plain(Action::SelectOptions, json!({ "values": tokens }), &options)
            .await
    }

    async fn upload(&self, files: Vec<FileInput>, options: ActionOptions) -> LocatorResult<()> {
        let files: Vec<Value> = files.iter().map(FileInput::to_value).collect();
        self.plain(Action::Upload, json!({ "files": files }), &options)
            .await
    }

    async fn drop_to(
        &self,
        target: &dyn Locator,
        options: DragAndDropOptions,
    ) -> LocatorResult<()> {
        self.element()?;
        target.element()?;
        let ctx = self.core.context();
        let native = normalize::driver_drag(&options, &ctx.config, ctx.scale.as_ref())?;
        let args = json!({ "target": target.handle()? });
        self.core
            .send(command(self, Action::DragAndDrop, self.handle()?, native).with_args(args))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::config::LocatorConfig;
    use crate::dom::Document;
    use crate::locator::test_support::page;
    use crate::normalize::FixedScale;
    use crate::page::{LocatorFactory, Page};
    use crate::result::ErrorKind;
    use crate::transport::RecordingTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_click_forwards_selector_and_scaled_position() {
        let document = Document::with_body(r#"<button data-testid="go">Go</button>"#).unwrap();
        let transport = Arc::new(RecordingTransport::new());
        let page = Page::new(
            document,
            LocatorConfig::new().with_action_timeout(Duration::from_millis(1500)),
        )
        .with_transport(transport.clone())
        .with_scale_source(Arc::new(FixedScale(0.5)));

        page.get_by_test_id("go".into())
            .click(ClickOptions::new().with_position(10.0, 5.0))
            .await
            .unwrap();

        let sent = transport.last().unwrap();
        assert_eq!(sent.action, Action::Click);
        assert_eq!(sent.selector, r#"internal:testid=[data-testid="go"s]"#);
        assert_eq!(
            sent.options.to_value(),
            json!({"position": {"x": 5.0, "y": 2.5}, "timeout": 1500})
        );
    }

    #[tokio::test]
    async fn test_explicit_timeout_is_kept() {
        let (page, transport) = page(Provider::RemoteDriver);
        let page = Page::new(
            page.document().clone(),
            LocatorConfig::new().with_action_timeout(Duration::from_secs(9)),
        )
        .with_transport(transport.clone());
        page.locator("#name")
            .fill(
                "Ada",
                ActionOptions {
                    timeout: Some(Duration::from_millis(300)),
                },
            )
            .await
            .unwrap();
        let sent = transport.last().unwrap();
        assert_eq!(sent.args, json!({"text": "Ada"}));
        assert_eq!(sent.options.timeout_ms(), Some(300));
    }

    #[tokio::test]
    async fn test_select_tokens_keep_values_and_reference_elements() {
        let (page, transport) = page(Provider::RemoteDriver);
        let select = page.locator("#color");
        let green = page.locator("#color >> option >> nth=1");
        let navy = select.element().unwrap().options()[3].clone();
        select
            .select_options(
                vec!["red".into(), green.into(), navy.into()],
                ActionOptions::new(),
            )
            .await
            .unwrap();
        let sent = transport.last().unwrap();
        assert_eq!(
            sent.args,
            json!({"values": [
                "red",
                {"element": "#color >> option >> nth=1"},
                {"element": "#color > option:nth-child(4)"}
            ]})
        );
    }

    #[tokio::test]
    async fn test_upload_encodes_contents() {
        let (page, transport) = page(Provider::RemoteDriver);
        page.locator("#file")
            .upload(
                vec![FileInput::contents("a.txt", "text/plain", b"hi".to_vec())],
                ActionOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            transport.last().unwrap().args,
            json!({"files": [{"name": "a.txt", "mimeType": "text/plain", "base64": "aGk="}]})
        );
    }

    #[tokio::test]
    async fn test_drop_to_sends_both_selectors() {
        let (page, transport) = page(Provider::RemoteDriver);
        page.locator("#source")
            .drop_to(
                page.locator("#target").as_ref(),
                DragAndDropOptions::new().with_target_position(4.0, 4.0),
            )
            .await
            .unwrap();
        let sent = transport.last().unwrap();
        assert_eq!(sent.selector, "#source");
        assert_eq!(sent.args, json!({"target": "#target"}));
        assert_eq!(
            sent.options.to_value(),
            json!({"targetPosition": {"x": 4.0, "y": 4.0}})
        );
    }

    #[tokio::test]
    async fn test_drop_to_unresolved_dispatches_nothing() {
        let (page, transport) = page(Provider::RemoteDriver);
        let err = page
            .locator("#source")
            .drop_to(page.locator("#absent").as_ref(), DragAndDropOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ElementNotFound);
        assert!(transport.history().is_empty());
    }

    #[tokio::test]
    async fn test_missing_transport() {
        let document = Document::with_body("<p>x</p>").unwrap();
        let page = Page::new(document, LocatorConfig::new());
        let err = page.locator("p").click(ClickOptions::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
