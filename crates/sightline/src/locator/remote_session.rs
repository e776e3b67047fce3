//! Remote-session adapter.
//!
//! The session addresses elements by CSS path, so the handle is the joined
//! CSS paths of every current match. Its option-selection command only takes
//! a positional index, which is resolved here against the live `<option>`
//! elements. Coordinates are scaled and rounded only under the UI overlay.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Provider;
use crate::normalize;
use crate::options::{ActionOptions, ClickOptions, DragAndDropOptions, FileInput, HoverOptions};
use crate::result::LocatorResult;
use crate::transport::Action;

use super::{command, select, Locator, LocatorCore, SelectTarget};

/// Locator for a remote session protocol
#[derive(Debug, Clone)]
pub struct RemoteSessionLocator {
    core: LocatorCore,
}

impl RemoteSessionLocator {
    /// Wrap a core
    #[must_use]
    pub const fn new(core: LocatorCore) -> Self {
        Self { core }
    }

    async fn pointer(&self, action: Action, options: &ClickOptions) -> LocatorResult<()> {
        let ctx = self.core.context();
        let native = normalize::session_click(options, &ctx.config, ctx.scale.as_ref())?;
        self.core
            .send(command(self, action, self.handle()?, native))
            .await
    }

    async fn plain(&self, action: Action, args: Value, options: &ActionOptions) -> LocatorResult<()> {
        let native = normalize::session_plain(options);
        self.core
            .send(command(self, action, self.handle()?, native).with_args(args))
            .await
    }
}

#[async_trait]
impl Locator for RemoteSessionLocator {
    fn core(&self) -> &LocatorCore {
        &self.core
    }

    fn provider(&self) -> Provider {
        Provider::RemoteSession
    }

    fn with_core(&self, core: LocatorCore) -> Box<dyn Locator> {
        Box::new(Self::new(core))
    }

    fn handle(&self) -> LocatorResult<String> {
        self.core.css_handle()
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
        let native = normalize::session_hover(&options, &ctx.config, ctx.scale.as_ref())?;
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
        let element = self.element()?;
        let indexes = select::resolve_index(&self.core, self.provider(), &element, &values)?;
        let tokens: Vec<Value> = indexes.iter().map(|index| json!({ "index": index })).collect();
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
        let source = self.handle()?;
        let target_handle = target.handle()?;
        let ctx = self.core.context();
        let native = normalize::session_drag(&options, &ctx.config, ctx.scale.as_ref())?;
        self.core
            .send(
                command(self, Action::DragAndDrop, source, native)
                    .with_args(json!({ "target": target_handle })),
            )
            .await
    }
}
