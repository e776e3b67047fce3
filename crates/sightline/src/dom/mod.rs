//! In-process document model.
//!
//! An arena DOM shared behind `Arc<RwLock<..>>` so element handles stay
//! cheap to clone and comparable by identity. Iframe elements own their
//! content document (same-origin) or an opaque marker (cross-origin).

mod html;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::result::LocatorResult;

/// Maximum characters of an element preview used in diagnostics
const PREVIEW_LIMIT: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(usize);

#[derive(Debug)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    value: Option<String>,
    checked: bool,
    selected: bool,
    files: Vec<String>,
    frame: Option<FrameContent>,
}

impl ElementData {
    fn new(tag: String, attrs: Vec<(String, String)>) -> Self {
        let checked = attrs.iter().any(|(k, _)| k == "checked");
        let selected = attrs.iter().any(|(k, _)| k == "selected");
        Self {
            tag,
            attrs,
            value: None,
            checked,
            selected,
            files: Vec::new(),
            frame: None,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Content behind an `<iframe>` element
#[derive(Debug, Clone)]
pub enum FrameContent {
    /// Reachable content document
    SameOrigin(Document),
    /// Content document exists but may not be read
    CrossOrigin,
}

#[derive(Debug)]
struct EventRecord {
    kind: String,
    target: NodeId,
    detail: Option<String>,
}

#[derive(Debug)]
struct DomTree {
    nodes: Vec<Node>,
    root: NodeId,
    events: Vec<EventRecord>,
    hovered: Option<NodeId>,
    focused: Option<NodeId>,
}

impl DomTree {
    fn new() -> Self {
        let mut tree = Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
            events: Vec::new(),
            hovered: None,
            focused: None,
        };
        let html = tree.create_element(Some(tree.root), "html".into(), Vec::new());
        tree.create_element(Some(html), "head".into(), Vec::new());
        tree.create_element(Some(html), "body".into(), Vec::new());
        tree
    }

    fn create_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn create_element(
        &mut self,
        parent: Option<NodeId>,
        tag: String,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.create_node(parent, NodeKind::Element(ElementData::new(tag, attrs)))
    }

    fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeKind::Text(text))
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(node.0)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn tag(&self, node: NodeId) -> &str {
        self.element(node).map_or("", |e| e.tag.as_str())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.attr(name))
    }

    fn document_element(&self) -> NodeId {
        self.nodes[self.root.0]
            .children
            .iter()
            .copied()
            .find(|c| self.element(*c).is_some())
            .unwrap_or(self.root)
    }

    fn find_child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.tag(*c) == tag)
    }

    fn body(&self) -> NodeId {
        let html = self.document_element();
        self.find_child_by_tag(html, "body").unwrap_or(html)
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node.0].children {
            if self.element(*child).is_some() {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.push_text(node, &mut out);
        out
    }

    fn push_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in &self.nodes[node.0].children {
                    self.push_text(*child, out);
                }
            }
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.nodes[node.0].parent {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    fn detach_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0]
            .parent
            .filter(|p| self.element(*p).is_some())
    }

    fn is_connected(&self, mut node: NodeId) -> bool {
        loop {
            if node == self.root {
                return true;
            }
            match self.nodes[node.0].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn options_of(&self, select: NodeId) -> Vec<NodeId> {
        let mut all = Vec::new();
        self.collect_descendants(select, &mut all);
        all.retain(|n| self.tag(*n) == "option");
        all
    }

    fn option_value(&self, option: NodeId) -> String {
        self.attr(option, "value").map_or_else(
            || collapse_whitespace(&self.text_content(option)),
            str::to_string,
        )
    }

    fn select_value(&self, select: NodeId) -> String {
        let options = self.options_of(select);
        let selected = options
            .iter()
            .copied()
            .find(|o| self.element(*o).is_some_and(|e| e.selected));
        let multiple = self.attr(select, "multiple").is_some();
        match selected.or_else(|| (!multiple).then(|| options.first().copied()).flatten()) {
            Some(option) => self.option_value(option),
            None => String::new(),
        }
    }

    fn preview(&self, node: NodeId) -> String {
        let Some(data) = self.element(node) else {
            return "#document".to_string();
        };
        let mut out = format!("<{}", data.tag);
        for (k, v) in &data.attrs {
            if v.is_empty() {
                out.push_str(&format!(" {k}"));
            } else {
                out.push_str(&format!(" {k}=\"{v}\""));
            }
        }
        out.push('>');
        let text = collapse_whitespace(&self.text_content(node));
        if !html::is_void_tag(&data.tag) {
            out.push_str(&text);
            out.push_str(&format!("</{}>", data.tag));
        }
        truncate_chars(&out, PREVIEW_LIMIT)
    }

    fn css_path(&self, mut node: NodeId) -> String {
        let mut path = Vec::new();
        while let Some(parent) = self.nodes[node.0].parent {
            let Some(data) = self.element(node) else {
                break;
            };
            if let Some(id) = data.attr("id").filter(|id| !id.is_empty()) {
                path.push(id_selector(id));
                break;
            }
            let siblings = self.element_children(parent);
            if siblings.len() == 1 {
                path.push(data.tag.clone());
            } else {
                let same_tag = siblings.iter().filter(|s| self.tag(**s) == data.tag).count();
                if same_tag > 1 {
                    let position = siblings.iter().position(|s| *s == node).unwrap_or(0) + 1;
                    path.push(format!("{}:nth-child({position})", data.tag));
                } else {
                    path.push(data.tag.clone());
                }
            }
            node = parent;
        }
        path.reverse();
        path.join(" > ")
    }
}

/// A document: the tree behind a page or an iframe.
///
/// Cloning yields another handle to the same document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<RwLock<DomTree>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.read().nodes.len())
            .finish()
    }
}

impl Document {
    /// Create an empty `<html><head></head><body></body></html>` document
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DomTree::new())),
        }
    }

    /// Create a document whose body holds the given HTML
    pub fn with_body(html: &str) -> LocatorResult<Self> {
        let document = Self::new();
        document.body().set_inner_html(html)?;
        Ok(document)
    }

    fn read(&self) -> RwLockReadGuard<'_, DomTree> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DomTree> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, node: NodeId) -> ElementRef {
        ElementRef {
            document: self.clone(),
            node,
        }
    }

    /// Whether two handles point at the same document
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The `<html>` element
    #[must_use]
    pub fn document_element(&self) -> ElementRef {
        let node = self.read().document_element();
        self.handle(node)
    }

    /// The `<body>` element
    #[must_use]
    pub fn body(&self) -> ElementRef {
        let node = self.read().body();
        self.handle(node)
    }

    /// First connected element with the given id
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<ElementRef> {
        let found = {
            let tree = self.read();
            let root = tree.document_element();
            let mut all = vec![root];
            tree.collect_descendants(root, &mut all);
            all.into_iter().find(|n| tree.attr(*n, "id") == Some(id))
        };
        found.map(|n| self.handle(n))
    }

    /// Currently hovered element
    #[must_use]
    pub fn hovered(&self) -> Option<ElementRef> {
        let node = self.read().hovered;
        node.map(|n| self.handle(n))
    }

    /// Currently focused element
    #[must_use]
    pub fn focused(&self) -> Option<ElementRef> {
        let node = self.read().focused;
        node.map(|n| self.handle(n))
    }

    /// Events dispatched against this document so far
    #[must_use]
    pub fn events(&self) -> Vec<DomEvent> {
        let records: Vec<(String, NodeId, Option<String>)> = self
            .read()
            .events
            .iter()
            .map(|e| (e.kind.clone(), e.target, e.detail.clone()))
            .collect();
        records
            .into_iter()
            .map(|(kind, target, detail)| DomEvent {
                kind,
                target: self.handle(target),
                detail,
            })
            .collect()
    }

    /// Event names dispatched so far, in order
    #[must_use]
    pub fn event_kinds(&self) -> Vec<String> {
        self.read().events.iter().map(|e| e.kind.clone()).collect()
    }

    /// Forget recorded events
    pub fn clear_events(&self) {
        self.write().events.clear();
    }

    pub(crate) fn record_event(&self, kind: &str, target: &ElementRef, detail: Option<String>) {
        self.write().events.push(EventRecord {
            kind: kind.to_string(),
            target: target.node,
            detail,
        });
    }

    pub(crate) fn set_hovered(&self, element: Option<&ElementRef>) {
        self.write().hovered = element.map(|e| e.node);
    }

    pub(crate) fn set_focused(&self, element: Option<&ElementRef>) {
        self.write().focused = element.map(|e| e.node);
    }
}

/// A synthetic event recorded by the native backend
#[derive(Debug, Clone)]
pub struct DomEvent {
    /// Event type (`click`, `input`, ...)
    pub kind: String,
    /// Event target
    pub target: ElementRef,
    /// Extra data (click count, typed value)
    pub detail: Option<String>,
}

/// Handle to one element. Equality is element identity.
#[derive(Clone)]
pub struct ElementRef {
    document: Document,
    node: NodeId,
}

impl PartialEq for ElementRef {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.document.ptr_eq(&other.document)
    }
}

impl Eq for ElementRef {}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementRef").field(&self.preview()).finish()
    }
}

impl ElementRef {
    pub(crate) const fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn from_parts(document: &Document, node: NodeId) -> Self {
        document.handle(node)
    }

    /// Owning document
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Lowercase tag name
    #[must_use]
    pub fn tag_name(&self) -> String {
        self.document.read().tag(self.node).to_string()
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.document
            .read()
            .attr(self.node, name)
            .map(str::to_string)
    }

    /// Whether the attribute is present
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.document.read().attr(self.node, name).is_some()
    }

    /// Set or replace an attribute
    pub fn set_attribute(&self, name: &str, value: &str) {
        let mut tree = self.document.write();
        if let Some(data) = tree.element_mut(self.node) {
            let name = name.to_ascii_lowercase();
            match data.attrs.iter_mut().find(|(k, _)| *k == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => data.attrs.push((name, value.to_string())),
            }
        }
    }

    /// Remove an attribute
    pub fn remove_attribute(&self, name: &str) {
        let mut tree = self.document.write();
        if let Some(data) = tree.element_mut(self.node) {
            data.attrs.retain(|(k, _)| k != name);
        }
    }

    /// Concatenated text of all descendant text nodes
    #[must_use]
    pub fn text_content(&self) -> String {
        self.document.read().text_content(self.node)
    }

    /// Replace the children of this element with parsed HTML
    pub fn set_inner_html(&self, markup: &str) -> LocatorResult<()> {
        let fragment = html::parse_fragment(markup)?;
        let frames = {
            let mut tree = self.document.write();
            tree.detach_children(self.node);
            html::insert_fragment(&mut tree, self.node, fragment)
        };
        for (node, srcdoc) in frames {
            let content = Document::new();
            if let Some(markup) = srcdoc {
                content.body().set_inner_html(&markup)?;
            }
            self.document.handle(node).set_frame_content(FrameContent::SameOrigin(content));
        }
        Ok(())
    }

    /// Parent element, if any
    #[must_use]
    pub fn parent_element(&self) -> Option<Self> {
        let parent = self.document.read().parent_element(self.node);
        parent.map(|n| self.document.handle(n))
    }

    /// Element children in order
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        let children = self.document.read().element_children(self.node);
        children.into_iter().map(|n| self.document.handle(n)).collect()
    }

    /// All descendant elements in document order
    #[must_use]
    pub fn descendants(&self) -> Vec<Self> {
        let mut out = Vec::new();
        self.document.read().collect_descendants(self.node, &mut out);
        out.into_iter().map(|n| self.document.handle(n)).collect()
    }

    /// Whether `other` is a strict descendant of this element
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.document.ptr_eq(&other.document)
            && self.document.read().is_ancestor(self.node, other.node)
    }

    /// Whether the element is still attached to its document
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.document.read().is_connected(self.node)
    }

    /// Whether this is an `<iframe>`
    #[must_use]
    pub fn is_iframe(&self) -> bool {
        self.document.read().tag(self.node) == "iframe"
    }

    /// What sits behind this iframe, if it is one
    #[must_use]
    pub fn frame_content(&self) -> Option<FrameContent> {
        self.document
            .read()
            .element(self.node)
            .and_then(|e| e.frame.clone())
    }

    /// Reachable content document of this iframe
    #[must_use]
    pub fn content_document(&self) -> Option<Document> {
        match self.frame_content()? {
            FrameContent::SameOrigin(document) => Some(document),
            FrameContent::CrossOrigin => None,
        }
    }

    /// Replace what sits behind this iframe
    pub fn set_frame_content(&self, content: FrameContent) {
        if let Some(data) = self.document.write().element_mut(self.node) {
            data.frame = Some(content);
        }
    }

    /// Load new markup into this iframe, replacing its content document
    pub fn navigate_frame(&self, body_html: &str) -> LocatorResult<Document> {
        let document = Document::with_body(body_html)?;
        self.set_frame_content(FrameContent::SameOrigin(document.clone()));
        Ok(document)
    }

    /// Current form value (`input`, `textarea`, `select`, `option`)
    #[must_use]
    pub fn value(&self) -> String {
        let tree = self.document.read();
        let Some(data) = tree.element(self.node) else {
            return String::new();
        };
        match data.tag.as_str() {
            "select" => tree.select_value(self.node),
            "option" => tree.option_value(self.node),
            "textarea" => data
                .value
                .clone()
                .unwrap_or_else(|| tree.text_content(self.node)),
            _ => data
                .value
                .clone()
                .or_else(|| data.attr("value").map(str::to_string))
                .unwrap_or_default(),
        }
    }

    pub(crate) fn set_value(&self, value: &str) {
        if let Some(data) = self.document.write().element_mut(self.node) {
            data.value = Some(value.to_string());
        }
    }

    /// Checkedness of a checkbox or radio
    #[must_use]
    pub fn checked(&self) -> bool {
        self.document
            .read()
            .element(self.node)
            .is_some_and(|e| e.checked)
    }

    pub(crate) fn set_checked(&self, checked: bool) {
        if let Some(data) = self.document.write().element_mut(self.node) {
            data.checked = checked;
        }
    }

    /// Selectedness of an `<option>`
    #[must_use]
    pub fn selected(&self) -> bool {
        self.document
            .read()
            .element(self.node)
            .is_some_and(|e| e.selected)
    }

    pub(crate) fn set_selected(&self, selected: bool) {
        if let Some(data) = self.document.write().element_mut(self.node) {
            data.selected = selected;
        }
    }

    /// `<option>` descendants of a `<select>`, in order
    #[must_use]
    pub fn options(&self) -> Vec<Self> {
        let options = self.document.read().options_of(self.node);
        options.into_iter().map(|n| self.document.handle(n)).collect()
    }

    /// File names assigned to a file input
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.document
            .read()
            .element(self.node)
            .map(|e| e.files.clone())
            .unwrap_or_default()
    }

    pub(crate) fn set_files(&self, files: Vec<String>) {
        if let Some(data) = self.document.write().element_mut(self.node) {
            data.files = files;
        }
    }

    /// Whether the element or an ancestor `<fieldset>` is disabled
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        let tree = self.document.read();
        if tree.attr(self.node, "disabled").is_some() {
            return true;
        }
        let mut node = self.node;
        while let Some(parent) = tree.parent_element(node) {
            if tree.tag(parent) == "fieldset" && tree.attr(parent, "disabled").is_some() {
                return true;
            }
            node = parent;
        }
        false
    }

    /// Short markup preview used in diagnostics
    #[must_use]
    pub fn preview(&self) -> String {
        self.document.read().preview(self.node)
    }

    /// Unique CSS path from the document element to this element
    #[must_use]
    pub fn css_path(&self) -> String {
        self.document.read().css_path(self.node)
    }
}

/// Collapse runs of whitespace to one space and trim
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// `#id`, or an attribute selector when the id cannot start an identifier
fn id_selector(id: &str) -> String {
    if id.starts_with(|c: char| c.is_ascii_digit()) || id.starts_with("--") {
        return format!("[id=\"{}\"]", id.replace('\\', "\\\\").replace('"', "\\\""));
    }
    let mut out = String::from("#");
    for ch in id.chars() {
        if !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
