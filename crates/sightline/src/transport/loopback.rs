//! Loopback transport: plays remote commands back against a local document.
//!
//! Stands in for an out-of-process automation session. The selector handle
//! is resolved with a [`SelectorEngine`] against the document element, and
//! the interaction is performed by [`crate::user_event`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Action, CommandTransport, RemoteCommand, RemoteFailure};
use crate::dom::{Document, ElementRef};
use crate::options::FileInput;
use crate::selector::{DomSelectorEngine, SelectorEngine};
use crate::user_event;

/// In-process automation session over a [`Document`]
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    document: Document,
    engine: Arc<dyn SelectorEngine>,
}

impl LoopbackTransport {
    /// Session over `document` using the default engine
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            engine: Arc::new(DomSelectorEngine::new()),
        }
    }

    /// Use a different query engine
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn SelectorEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// The document commands are played against
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    fn resolve(&self, selector: &str) -> Result<ElementRef, RemoteFailure> {
        let parsed = self
            .engine
            .parse_selector(selector)
            .map_err(|e| RemoteFailure::Rejected(e.to_string()))?;
        self.engine
            .query_selector(&parsed, &self.document.document_element(), false)
            .map_err(|e| RemoteFailure::Rejected(e.to_string()))?
            .ok_or_else(|| RemoteFailure::NotFound(format!("no element matches {selector}")))
    }

    fn resolve_option(
        &self,
        select: &ElementRef,
        options: &[ElementRef],
        token: &Value,
    ) -> Result<ElementRef, RemoteFailure> {
        let found = match token {
            Value::String(text) => options
                .iter()
                .find(|o| o.value() == *text)
                .or_else(|| {
                    options.iter().find(|o| {
                        o.text_content().trim() == text.as_str()
                            || o.attribute("aria-label").as_deref() == Some(text.as_str())
                    })
                })
                .cloned(),
            Value::Object(map) => {
                if let Some(index) = map.get("index").and_then(Value::as_u64) {
                    usize::try_from(index)
                        .ok()
                        .and_then(|i| options.get(i))
                        .cloned()
                } else if let Some(selector) = map.get("element").and_then(Value::as_str) {
                    let element = self.resolve(selector)?;
                    options.iter().find(|o| **o == element).cloned()
                } else {
                    None
                }
            }
            _ => None,
        };
        found.ok_or_else(|| {
            RemoteFailure::Rejected(format!(
                "option {token} was not found in {}",
                select.preview()
            ))
        })
    }

    fn perform(&self, command: &RemoteCommand) -> Result<Value, RemoteFailure> {
        let element = self.resolve(&command.selector)?;
        let selector = command.selector.as_str();
        let result = match command.action {
            Action::Click => user_event::click(&element, selector, 1),
            Action::DblClick => user_event::click(&element, selector, 2),
            Action::TripleClick => user_event::click(&element, selector, 3),
            Action::Hover => user_event::hover(&element, selector),
            Action::Unhover => user_event::unhover(&element, selector),
            Action::Fill => {
                let text = command.args["text"].as_str().unwrap_or_default();
                user_event::fill(&element, selector, text)
            }
            Action::Clear => user_event::clear(&element, selector),
            Action::SelectOptions => {
                let options = element.options();
                let chosen = command.args["values"]
                    .as_array()
                    .map(|tokens| {
                        tokens
                            .iter()
                            .map(|token| self.resolve_option(&element, &options, token))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .transpose()?
                    .unwrap_or_default();
                user_event::select_options(&element, selector, &chosen)
            }
            Action::Upload => {
                let files: Vec<FileInput> = command.args["files"]
                    .as_array()
                    .map(|files| files.iter().filter_map(file_from_wire).collect())
                    .unwrap_or_default();
                user_event::upload(&element, selector, &files)
            }
            Action::DragAndDrop => {
                let target_selector = command.args["target"].as_str().unwrap_or_default();
                let target = self.resolve(target_selector)?;
                user_event::drag_and_drop(&element, selector, &target, target_selector)
            }
        };
        // the caller's dispatch adds its own container description
        result
            .map(|()| Value::Null)
            .map_err(|e| RemoteFailure::Rejected(e.to_string().trim_end().to_string()))
    }
}

fn file_from_wire(value: &Value) -> Option<FileInput> {
    match value {
        Value::String(path) => Some(FileInput::path(path.clone())),
        Value::Object(map) => Some(FileInput::contents(
            map.get("name")?.as_str()?,
            map.get("mimeType").and_then(Value::as_str).unwrap_or_default(),
            Vec::new(),
        )),
        _ => None,
    }
}

#[async_trait]
impl CommandTransport for LoopbackTransport {
    async fn send(&self, command: RemoteCommand) -> Result<Value, RemoteFailure> {
        debug!(action = command.action.as_str(), selector = %command.selector, "loopback command");
        self.perform(&command)
    }
}
