//! ARIA role and accessible-name computation used by `internal:role` and
//! `internal:label`.

use crate::dom::{collapse_whitespace, ElementRef};

/// Roles whose accessible name may come from their content
const NAME_FROM_CONTENT: &[&str] = &[
    "button",
    "cell",
    "checkbox",
    "columnheader",
    "gridcell",
    "heading",
    "link",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "radio",
    "row",
    "rowheader",
    "switch",
    "tab",
    "tooltip",
    "treeitem",
];

/// Explicit `role` attribute (first token) or the implicit role of the tag
pub fn element_role(element: &ElementRef) -> Option<String> {
    if let Some(explicit) = element
        .attribute("role")
        .and_then(|r| r.split_whitespace().next().map(str::to_ascii_lowercase))
    {
        return Some(explicit);
    }
    implicit_role(element).map(str::to_string)
}

fn implicit_role(element: &ElementRef) -> Option<&'static str> {
    let role = match element.tag_name().as_str() {
        "a" | "area" if element.has_attribute("href") => "link",
        "article" => "article",
        "aside" => "complementary",
        "button" => "button",
        "dialog" => "dialog",
        "fieldset" => "group",
        "footer" => "contentinfo",
        "form" => "form",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "header" => "banner",
        "hr" => "separator",
        "img" => {
            if element.attribute("alt").is_some_and(|alt| alt.is_empty()) {
                "presentation"
            } else {
                "img"
            }
        }
        "input" => return input_role(element),
        "li" => "listitem",
        "main" => "main",
        "nav" => "navigation",
        "ol" | "ul" => "list",
        "option" => "option",
        "progress" => "progressbar",
        "section" => "region",
        "select" => {
            let size = element
                .attribute("size")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(0);
            if element.has_attribute("multiple") || size > 1 {
                "listbox"
            } else {
                "combobox"
            }
        }
        "table" => "table",
        "tbody" | "thead" | "tfoot" => "rowgroup",
        "td" => "cell",
        "textarea" => "textbox",
        "th" => "columnheader",
        "tr" => "row",
        _ => return None,
    };
    Some(role)
}

fn input_role(element: &ElementRef) -> Option<&'static str> {
    let kind = element
        .attribute("type")
        .unwrap_or_default()
        .to_ascii_lowercase();
    let has_list = element.has_attribute("list");
    let role = match kind.as_str() {
        "button" | "image" | "reset" | "submit" => "button",
        "checkbox" => "checkbox",
        "radio" => "radio",
        "range" => "slider",
        "number" => "spinbutton",
        "hidden" | "file" | "color" | "date" | "datetime-local" | "month" | "time" | "week"
        | "password" => return None,
        "search" if has_list => "combobox",
        "search" => "searchbox",
        _ if has_list => "combobox",
        _ => "textbox",
    };
    Some(role)
}

/// Whether the element or an ancestor is excluded from the accessibility tree
pub fn is_hidden(element: &ElementRef) -> bool {
    let mut cursor = Some(element.clone());
    while let Some(current) = cursor {
        if self_hidden(&current) {
            return true;
        }
        cursor = current.parent_element();
    }
    false
}

fn self_hidden(element: &ElementRef) -> bool {
    if element.has_attribute("hidden")
        || element.attribute("aria-hidden").as_deref() == Some("true")
    {
        return true;
    }
    if matches!(
        element.tag_name().as_str(),
        "head" | "script" | "style" | "template" | "noscript"
    ) {
        return true;
    }
    element.attribute("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

/// Whether `label` text may name this element
pub fn is_labelable(element: &ElementRef) -> bool {
    match element.tag_name().as_str() {
        "input" => element.attribute("type").as_deref() != Some("hidden"),
        "button" | "meter" | "output" | "progress" | "select" | "textarea" => true,
        _ => false,
    }
}

/// Control a `<label>` points at, by `for` or by nesting
pub fn label_control(label: &ElementRef) -> Option<ElementRef> {
    if label.tag_name() != "label" {
        return None;
    }
    if let Some(target) = label
        .attribute("for")
        .and_then(|id| label.document().get_element_by_id(&id))
    {
        return is_labelable(&target).then_some(target);
    }
    label.descendants().into_iter().find(is_labelable)
}

/// `<label>` elements associated with a control
pub fn labels_of(element: &ElementRef) -> Vec<ElementRef> {
    if !is_labelable(element) {
        return Vec::new();
    }
    let root = element.document().document_element();
    root.descendants()
        .into_iter()
        .filter(|candidate| candidate.tag_name() == "label")
        .filter(|label| label_control(label).as_ref() == Some(element))
        .collect()
}

fn labelled_by_text(element: &ElementRef) -> Option<String> {
    let ids = element.attribute("aria-labelledby")?;
    let parts: Vec<String> = ids
        .split_whitespace()
        .filter_map(|id| element.document().get_element_by_id(id))
        .map(|target| collapse_whitespace(&target.text_content()))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Texts that `internal:label` matches against: label elements,
/// `aria-labelledby` targets and `aria-label`
pub fn label_texts(element: &ElementRef) -> Vec<String> {
    let mut texts: Vec<String> = labels_of(element)
        .iter()
        .map(|label| collapse_whitespace(&label.text_content()))
        .collect();
    if let Some(text) = labelled_by_text(element) {
        texts.push(text);
    }
    if let Some(label) = element.attribute("aria-label") {
        texts.push(collapse_whitespace(&label));
    }
    texts
}

/// Accessible name, simplified from the accname algorithm
pub fn accessible_name(element: &ElementRef) -> String {
    if let Some(text) = labelled_by_text(element) {
        return text;
    }
    if let Some(label) = element
        .attribute("aria-label")
        .map(|l| collapse_whitespace(&l))
        .filter(|l| !l.is_empty())
    {
        return label;
    }

    let tag = element.tag_name();
    if tag == "input" {
        let kind = element.attribute("type").unwrap_or_default().to_ascii_lowercase();
        match kind.as_str() {
            "button" | "submit" | "reset" => {
                let fallback = match kind.as_str() {
                    "submit" => "Submit",
                    "reset" => "Reset",
                    _ => "",
                };
                return element
                    .attribute("value")
                    .map_or_else(|| fallback.to_string(), |v| collapse_whitespace(&v));
            }
            "image" => {
                if let Some(alt) = element.attribute("alt") {
                    return collapse_whitespace(&alt);
                }
            }
            _ => {}
        }
    }

    let labels: Vec<String> = labels_of(element)
        .iter()
        .map(|label| collapse_whitespace(&label.text_content()))
        .filter(|text| !text.is_empty())
        .collect();
    if !labels.is_empty() {
        return labels.join(" ");
    }

    if tag == "img" || tag == "area" {
        if let Some(alt) = element.attribute("alt") {
            return collapse_whitespace(&alt);
        }
    }

    let from_content = element_role(element)
        .is_some_and(|role| NAME_FROM_CONTENT.contains(&role.as_str()));
    if from_content {
        let text = collapse_whitespace(&content_text(element));
        if !text.is_empty() {
            return text;
        }
    }

    element
        .attribute("title")
        .or_else(|| element.attribute("placeholder"))
        .map(|t| collapse_whitespace(&t))
        .unwrap_or_default()
}

fn content_text(element: &ElementRef) -> String {
    let children = element.children();
    if children.is_empty() {
        return element.text_content();
    }
    // Embedded images contribute their alt text
    let mut out = String::new();
    let mut text = element.text_content();
    for child in children {
        if child.tag_name() == "img" {
            if let Some(alt) = child.attribute("alt") {
                out.push_str(&alt);
                out.push(' ');
            }
        }
    }
    if out.is_empty() {
        return text;
    }
    text.push(' ');
    text.push_str(&out);
    text
}

/// Heading level from `aria-level` or the `h1`..`h6` tag
pub fn heading_level(element: &ElementRef) -> Option<u32> {
    if let Some(level) = element
        .attribute("aria-level")
        .and_then(|l| l.parse::<u32>().ok())
    {
        return Some(level);
    }
    let tag = element.tag_name();
    let digit = tag.strip_prefix('h')?;
    digit.parse::<u32>().ok().filter(|l| (1..=6).contains(l))
}

/// `aria-checked` style tri-state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AriaState {
    /// `true`
    True,
    /// `false`
    False,
    /// `mixed`
    Mixed,
}

impl AriaState {
    /// Parse `true`, `false` or `mixed`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    /// Selector text of this state
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::Mixed => "mixed",
        }
    }

    const fn from_bool(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

/// Checked state of checkbox-like roles
pub fn checked_state(element: &ElementRef) -> Option<AriaState> {
    if let Some(state) = element
        .attribute("aria-checked")
        .and_then(|v| AriaState::parse(&v))
    {
        return Some(state);
    }
    let is_check_input = element.tag_name() == "input"
        && matches!(
            element.attribute("type").as_deref(),
            Some("checkbox" | "radio")
        );
    is_check_input.then(|| AriaState::from_bool(element.checked()))
}

/// Pressed state of toggle buttons
pub fn pressed_state(element: &ElementRef) -> AriaState {
    element
        .attribute("aria-pressed")
        .and_then(|v| AriaState::parse(&v))
        .unwrap_or(AriaState::False)
}

/// Expanded state, `None` when the element is not expandable
pub fn expanded_state(element: &ElementRef) -> Option<bool> {
    element.attribute("aria-expanded").map(|v| v == "true")
}

/// Selected state of options, tabs and rows
pub fn selected_state(element: &ElementRef) -> bool {
    if element.tag_name() == "option" {
        return element.selected();
    }
    element.attribute("aria-selected").as_deref() == Some("true")
}

/// Disabled state, native or via `aria-disabled` on an ancestor
pub fn disabled_state(element: &ElementRef) -> bool {
    if element.is_disabled() {
        return true;
    }
    let mut cursor = Some(element.clone());
    while let Some(current) = cursor {
        if current.attribute("aria-disabled").as_deref() == Some("true") {
            return true;
        }
        cursor = current.parent_element();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn find(doc: &Document, id: &str) -> ElementRef {
        doc.get_element_by_id(id).unwrap()
    }

    #[test]
    fn test_implicit_roles() {
        let doc = Document::with_body(
            r#"<a id="l" href="/x">x</a><a id="n">y</a><input id="t"><input id="c" type="checkbox">
               <input id="s" type="submit"><select id="sel"></select><select id="multi" multiple></select>
               <h2 id="h">Title</h2><img id="deco" alt=""><div id="d" role="tab switch">z</div>"#,
        )
        .unwrap();
        assert_eq!(element_role(&find(&doc, "l")).as_deref(), Some("link"));
        assert_eq!(element_role(&find(&doc, "n")), None);
        assert_eq!(element_role(&find(&doc, "t")).as_deref(), Some("textbox"));
        assert_eq!(element_role(&find(&doc, "c")).as_deref(), Some("checkbox"));
        assert_eq!(element_role(&find(&doc, "s")).as_deref(), Some("button"));
        assert_eq!(element_role(&find(&doc, "sel")).as_deref(), Some("combobox"));
        assert_eq!(element_role(&find(&doc, "multi")).as_deref(), Some("listbox"));
        assert_eq!(element_role(&find(&doc, "h")).as_deref(), Some("heading"));
        assert_eq!(element_role(&find(&doc, "deco")).as_deref(), Some("presentation"));
        assert_eq!(element_role(&find(&doc, "d")).as_deref(), Some("tab"));
        assert_eq!(heading_level(&find(&doc, "h")), Some(2));
    }

    #[test]
    fn test_accessible_name_sources() {
        let doc = Document::with_body(
            r#"<span id="cap">Caption</span>
               <button id="b1" aria-labelledby="cap">ignored</button>
               <button id="b2" aria-label="Close dialog">x</button>
               <button id="b3">  Save
                  changes </button>
               <label for="email">Email address</label><input id="email">
               <label>Nested <input id="nested" type="checkbox"></label>
               <input id="submit" type="submit">
               <img id="logo" alt="Company logo">
               <div id="titled" title="Tooltip"></div>"#,
        )
        .unwrap();
        assert_eq!(accessible_name(&find(&doc, "b1")), "Caption");
        assert_eq!(accessible_name(&find(&doc, "b2")), "Close dialog");
        assert_eq!(accessible_name(&find(&doc, "b3")), "Save changes");
        assert_eq!(accessible_name(&find(&doc, "email")), "Email address");
        assert_eq!(accessible_name(&find(&doc, "nested")), "Nested");
        assert_eq!(accessible_name(&find(&doc, "submit")), "Submit");
        assert_eq!(accessible_name(&find(&doc, "logo")), "Company logo");
        assert_eq!(accessible_name(&find(&doc, "titled")), "Tooltip");
    }

    #[test]
    fn test_label_texts_collects_all_sources() {
        let doc = Document::with_body(
            r#"<label for="i">First</label><label for="i">Second</label>
               <input id="i" aria-label="Third">"#,
        )
        .unwrap();
        assert_eq!(label_texts(&find(&doc, "i")), vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_hidden_states() {
        let doc = Document::with_body(
            r#"<div hidden><button id="a">a</button></div>
               <div style="display: none"><button id="b">b</button></div>
               <button id="c" aria-hidden="true">c</button>
               <button id="d">d</button>"#,
        )
        .unwrap();
        assert!(is_hidden(&find(&doc, "a")));
        assert!(is_hidden(&find(&doc, "b")));
        assert!(is_hidden(&find(&doc, "c")));
        assert!(!is_hidden(&find(&doc, "d")));
    }

    #[test]
    fn test_widget_states() {
        let doc = Document::with_body(
            r#"<input id="cb" type="checkbox" checked>
               <div id="mixed" role="checkbox" aria-checked="mixed"></div>
               <button id="toggle" aria-pressed="true" aria-expanded="false">t</button>
               <div aria-disabled="true"><button id="inner">i</button></div>"#,
        )
        .unwrap();
        assert_eq!(checked_state(&find(&doc, "cb")), Some(AriaState::True));
        assert_eq!(checked_state(&find(&doc, "mixed")), Some(AriaState::Mixed));
        assert_eq!(pressed_state(&find(&doc, "toggle")), AriaState::True);
        assert_eq!(expanded_state(&find(&doc, "toggle")), Some(false));
        assert!(disabled_state(&find(&doc, "inner")));
        assert!(!disabled_state(&find(&doc, "toggle")));
    }
}
