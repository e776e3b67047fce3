//! Selector query service.
//!
//! [`SelectorEngine`] is the seam the locator adapters consume: parse a
//! selector string, run it against a document root, and synthesize a
//! selector for a concrete element. [`DomSelectorEngine`] implements it over
//! the in-process [`crate::dom`] model.

pub mod builder;
mod css;
mod parse;
pub mod role;

use std::fmt;

use tracing::trace;

use crate::dom::{Document, ElementRef};
use crate::result::{LocatorError, LocatorResult};

pub use css::CssSelector;
pub use parse::{split_chain, AttrMatcher, ParsedSelector, RoleQuery, SelectorPart, TextMatcher};

/// Opaque querying service consumed by every locator adapter
pub trait SelectorEngine: Send + Sync + fmt::Debug {
    /// Parse a selector string
    fn parse_selector(&self, selector: &str) -> LocatorResult<ParsedSelector>;

    /// First match under `root`. With `strict`, more than one match is an
    /// [`LocatorError::AmbiguousMatch`].
    fn query_selector(
        &self,
        parsed: &ParsedSelector,
        root: &ElementRef,
        strict: bool,
    ) -> LocatorResult<Option<ElementRef>>;

    /// Every match under `root`, in document order
    fn query_selector_all(&self, parsed: &ParsedSelector, root: &ElementRef) -> Vec<ElementRef>;

    /// A selector string that resolves to exactly this element
    fn generate_selector_simple(&self, element: &ElementRef) -> String;

    /// Short markup preview used in error messages
    fn preview_node(&self, element: &ElementRef) -> String {
        element.preview()
    }
}

/// Query service over the in-process document model
#[derive(Debug, Clone, Copy, Default)]
pub struct DomSelectorEngine;

impl DomSelectorEngine {
    /// Create the engine
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn evaluate(&self, parsed: &ParsedSelector, root: &ElementRef) -> Vec<ElementRef> {
        let mut current = vec![root.clone()];
        let mut include_self = true;

        for part in &parsed.parts {
            match part {
                SelectorPart::Nth(index) => {
                    current = pick_nth(current, *index);
                    include_self = false;
                }
                SelectorPart::EnterFrame => {
                    current = current
                        .iter()
                        .filter_map(ElementRef::content_document)
                        .map(|document| document.document_element())
                        .collect();
                    include_self = true;
                }
                _ => {
                    current = match_part(part, &current, include_self);
                    include_self = false;
                }
            }
            if current.is_empty() {
                break;
            }
        }

        trace!(
            selector = parsed.source(),
            matches = current.len(),
            "evaluated selector"
        );
        current
    }
}

impl SelectorEngine for DomSelectorEngine {
    fn parse_selector(&self, selector: &str) -> LocatorResult<ParsedSelector> {
        parse::parse_selector(selector)
    }

    fn query_selector(
        &self,
        parsed: &ParsedSelector,
        root: &ElementRef,
        strict: bool,
    ) -> LocatorResult<Option<ElementRef>> {
        let mut matches = self.evaluate(parsed, root);
        if strict && matches.len() > 1 {
            return Err(LocatorError::AmbiguousMatch {
                selector: parsed.source().to_string(),
                count: matches.len(),
                container: self.preview_node(root),
            });
        }
        Ok((!matches.is_empty()).then(|| matches.swap_remove(0)))
    }

    fn query_selector_all(&self, parsed: &ParsedSelector, root: &ElementRef) -> Vec<ElementRef> {
        self.evaluate(parsed, root)
    }

    fn generate_selector_simple(&self, element: &ElementRef) -> String {
        element.css_path()
    }
}

fn pick_nth(mut elements: Vec<ElementRef>, index: i64) -> Vec<ElementRef> {
    let len = elements.len() as i64;
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 || resolved >= len {
        return Vec::new();
    }
    vec![elements.swap_remove(resolved as usize)]
}

/// Candidates under the given scopes, grouped per document in document order
fn candidates(scopes: &[ElementRef], include_self: bool) -> Vec<ElementRef> {
    let mut documents: Vec<Document> = Vec::new();
    for scope in scopes {
        if !documents.iter().any(|d| d.ptr_eq(scope.document())) {
            documents.push(scope.document().clone());
        }
    }

    let mut out = Vec::new();
    for document in documents {
        let root = document.document_element();
        let mut all = vec![root.clone()];
        all.extend(root.descendants());
        out.extend(all.into_iter().filter(|element| {
            scopes.iter().any(|scope| {
                (include_self && scope == element) || scope.contains(element)
            })
        }));
    }
    out
}

fn match_part(part: &SelectorPart, scopes: &[ElementRef], include_self: bool) -> Vec<ElementRef> {
    candidates(scopes, include_self)
        .into_iter()
        .filter(|element| matches_part(part, element))
        .collect()
}

fn matches_part(part: &SelectorPart, element: &ElementRef) -> bool {
    match part {
        SelectorPart::Css(css) => css.matches(element),
        SelectorPart::Text(matcher) => {
            text_candidate(element)
                && matcher.matches(&element.text_content())
                && !element
                    .children()
                    .iter()
                    .any(|child| text_candidate(child) && matcher.matches(&child.text_content()))
        }
        SelectorPart::Label(matcher) => role::label_texts(element)
            .iter()
            .any(|text| matcher.matches(text)),
        SelectorPart::Role(query) => matches_role(query, element),
        SelectorPart::Attr { name, matcher } => element
            .attribute(name)
            .is_some_and(|value| matcher.matches(&value)),
        SelectorPart::Nth(_) | SelectorPart::EnterFrame => false,
    }
}

fn text_candidate(element: &ElementRef) -> bool {
    !matches!(
        element.tag_name().as_str(),
        "head" | "script" | "style" | "noscript" | "template" | "title"
    )
}

fn matches_role(query: &RoleQuery, element: &ElementRef) -> bool {
    if role::element_role(element).as_deref() != Some(query.role.as_str()) {
        return false;
    }
    if !query.include_hidden && role::is_hidden(element) {
        return false;
    }
    if let Some(checked) = query.checked {
        if role::checked_state(element) != Some(checked) {
            return false;
        }
    }
    if let Some(pressed) = query.pressed {
        if role::pressed_state(element) != pressed {
            return false;
        }
    }
    if let Some(disabled) = query.disabled {
        if role::disabled_state(element) != disabled {
            return false;
        }
    }
    if let Some(expanded) = query.expanded {
        if role::expanded_state(element) != Some(expanded) {
            return false;
        }
    }
    if let Some(selected) = query.selected {
        if role::selected_state(element) != selected {
            return false;
        }
    }
    if let Some(level) = query.level {
        if role::heading_level(element) != Some(level) {
            return false;
        }
    }
    if let Some(name) = &query.name {
        if !name.matches(&role::accessible_name(element)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::FrameContent;

    fn page() -> Document {
        Document::with_body(
            r#"<div id="app">
                 <h1>Dashboard</h1>
                 <form>
                   <label for="user">Username</label><input id="user" placeholder="Your name">
                   <button type="submit">Sign in</button>
                   <button disabled>Reset</button>
                 </form>
                 <ul><li>Alpha</li><li>Beta <b>bold</b></li><li>Gamma</li></ul>
                 <img alt="Company logo" src="logo.png">
                 <span data-testid="shared">top</span>
                 <iframe id="frame" srcdoc="<span data-testid='shared'>inner</span><p>inside</p>"></iframe>
               </div>"#,
        )
        .unwrap()
    }

    fn query_all(doc: &Document, selector: &str) -> Vec<ElementRef> {
        let engine = DomSelectorEngine::new();
        let parsed = engine.parse_selector(selector).unwrap();
        engine.query_selector_all(&parsed, &doc.document_element())
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_css_query() {
            let doc = page();
            assert_eq!(query_all(&doc, "li").len(), 3);
            assert_eq!(query_all(&doc, "html").len(), 1);
        }

        #[test]
        fn test_chain_scopes_to_previous_matches() {
            let doc = page();
            assert_eq!(query_all(&doc, "ul >> b").len(), 1);
            assert_eq!(query_all(&doc, "form >> li").len(), 0);
            assert_eq!(query_all(&doc, "ul >> ul").len(), 0);
        }

        #[test]
        fn test_nth() {
            let doc = page();
            assert_eq!(query_all(&doc, "li >> nth=0")[0].text_content(), "Alpha");
            assert_eq!(query_all(&doc, "li >> nth=-1")[0].text_content(), "Gamma");
            assert!(query_all(&doc, "li >> nth=7").is_empty());
        }

        #[test]
        fn test_text_picks_smallest_element() {
            let doc = page();
            let found = query_all(&doc, r#"internal:text="beta"i"#);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].tag_name(), "li");

            let found = query_all(&doc, r#"internal:text="bold"s"#);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].tag_name(), "b");
        }

        #[test]
        fn test_label_placeholder_alt() {
            let doc = page();
            assert_eq!(query_all(&doc, r#"internal:label="username"i"#)[0].attribute("id").as_deref(), Some("user"));
            assert_eq!(query_all(&doc, r#"internal:attr=[placeholder="your"i]"#).len(), 1);
            assert_eq!(query_all(&doc, r#"internal:attr=[alt="Company logo"s]"#).len(), 1);
        }

        #[test]
        fn test_role_query() {
            let doc = page();
            assert_eq!(query_all(&doc, "internal:role=button").len(), 2);
            assert_eq!(query_all(&doc, r#"internal:role=button[name="sign"i]"#).len(), 1);
            assert_eq!(query_all(&doc, "internal:role=button[disabled=true]").len(), 1);
            assert_eq!(query_all(&doc, "internal:role=heading[level=1]").len(), 1);
            assert_eq!(query_all(&doc, "internal:role=heading[level=2]").len(), 0);
            assert_eq!(query_all(&doc, "internal:role=listitem").len(), 3);
        }

        #[test]
        fn test_testid_scoped_to_document() {
            let doc = page();
            let found = query_all(&doc, r#"internal:testid=[data-testid="shared"s]"#);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].text_content(), "top");
        }
    }

    mod frame_tests {
        use super::*;

        #[test]
        fn test_enter_frame_continues_in_content_document() {
            let doc = page();
            let found = query_all(
                &doc,
                r#"#frame >> internal:control=enter-frame >> internal:testid=[data-testid="shared"s]"#,
            );
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].text_content(), "inner");
            assert!(!found[0].document().ptr_eq(&doc));
        }

        #[test]
        fn test_enter_frame_on_cross_origin_matches_nothing() {
            let doc = page();
            doc.get_element_by_id("frame")
                .unwrap()
                .set_frame_content(FrameContent::CrossOrigin);
            assert!(query_all(&doc, "#frame >> internal:control=enter-frame >> p").is_empty());
        }
    }

    mod strict_tests {
        use super::*;

        #[test]
        fn test_strict_rejects_multiple_matches() {
            let doc = page();
            let engine = DomSelectorEngine::new();
            let parsed = engine.parse_selector("li").unwrap();
            let err = engine
                .query_selector(&parsed, &doc.document_element(), true)
                .unwrap_err();
            assert!(matches!(err, LocatorError::AmbiguousMatch { count: 3, .. }));

            let first = engine
                .query_selector(&parsed, &doc.document_element(), false)
                .unwrap()
                .unwrap();
            assert_eq!(first.text_content(), "Alpha");
        }

        #[test]
        fn test_no_match_is_none() {
            let doc = page();
            let engine = DomSelectorEngine::new();
            let parsed = engine.parse_selector("table").unwrap();
            assert!(engine
                .query_selector(&parsed, &doc.document_element(), true)
                .unwrap()
                .is_none());
        }
    }

    mod generate_tests {
        use super::*;

        #[test]
        fn test_generated_selector_resolves_back() {
            let doc = page();
            let engine = DomSelectorEngine::new();
            for element in doc.document_element().descendants() {
                let selector = engine.generate_selector_simple(&element);
                let parsed = engine.parse_selector(&selector).unwrap();
                let found = engine.query_selector_all(&parsed, &doc.document_element());
                assert_eq!(found, vec![element.clone()], "selector {selector}");
            }
        }
    }
}
