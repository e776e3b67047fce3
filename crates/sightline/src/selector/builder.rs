//! Selector-builder primitives.
//!
//! Pure functions mapping a semantic criterion to a selector string in the
//! `internal:*` engine syntax understood by [`super::DomSelectorEngine`]
//! and by remote automation sessions.

use regex::Regex;

use super::role::AriaState;

/// Text to match: a literal or a regular expression
#[derive(Debug, Clone)]
pub enum TextPattern {
    /// Literal text. Case-insensitive substring unless `exact` is requested
    Literal(String),
    /// Regular expression tested against whitespace-normalized text
    Regex(Regex),
}

impl From<&str> for TextPattern {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for TextPattern {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<Regex> for TextPattern {
    fn from(value: Regex) -> Self {
        Self::Regex(value)
    }
}

/// Matching options shared by text-like `get_by_*` factories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextOptions {
    /// Case-sensitive whole-string match
    pub exact: bool,
}

impl TextOptions {
    /// Exact matching
    #[must_use]
    pub const fn exact() -> Self {
        Self { exact: true }
    }
}

/// Filters for `get_by_role`
#[derive(Debug, Clone, Default)]
pub struct RoleOptions {
    /// Checked state of checkboxes and radios
    pub checked: Option<AriaState>,
    /// Disabled state
    pub disabled: Option<bool>,
    /// Selected state
    pub selected: Option<bool>,
    /// Expanded state
    pub expanded: Option<bool>,
    /// Also match elements hidden from the accessibility tree
    pub include_hidden: bool,
    /// Heading level
    pub level: Option<u32>,
    /// Accessible name
    pub name: Option<TextPattern>,
    /// Exact accessible-name matching
    pub exact: bool,
    /// Pressed state of toggle buttons
    pub pressed: Option<AriaState>,
}

impl RoleOptions {
    /// Options with no filters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match by accessible name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<TextPattern>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Require an exact accessible-name match
    #[must_use]
    pub const fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Filter by checked state
    #[must_use]
    pub const fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(if checked {
            AriaState::True
        } else {
            AriaState::False
        });
        self
    }

    /// Filter by disabled state
    #[must_use]
    pub const fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// Filter by selected state
    #[must_use]
    pub const fn with_selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    /// Filter by expanded state
    #[must_use]
    pub const fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = Some(expanded);
        self
    }

    /// Include hidden elements
    #[must_use]
    pub const fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Filter by heading level
    #[must_use]
    pub const fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    /// Filter by pressed state
    #[must_use]
    pub const fn with_pressed(mut self, pressed: AriaState) -> Self {
        self.pressed = Some(pressed);
        self
    }
}

/// `"text"i` or `"text"s`, JSON-quoted
pub fn escape_for_text_selector(pattern: &TextPattern, exact: bool) -> String {
    match pattern {
        TextPattern::Regex(re) => escape_regex_for_selector(re),
        TextPattern::Literal(text) => {
            let quoted = serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""));
            format!("{quoted}{}", if exact { 's' } else { 'i' })
        }
    }
}

/// `"value"i` or `"value"s`, escaping only backslashes and double quotes
pub fn escape_for_attribute_selector(pattern: &TextPattern, exact: bool) -> String {
    match pattern {
        TextPattern::Regex(re) => escape_regex_for_selector(re),
        TextPattern::Literal(value) => format!(
            "\"{}\"{}",
            value.replace('\\', "\\\\").replace('"', "\\\""),
            if exact { 's' } else { 'i' }
        ),
    }
}

/// `/source/` with quotes and chain separators escaped
pub fn escape_regex_for_selector(re: &Regex) -> String {
    let mut body = String::new();
    let mut backslashes = 0usize;
    for ch in re.as_str().chars() {
        if matches!(ch, '"' | '\'' | '`') && backslashes % 2 == 0 {
            body.push('\\');
        }
        if ch == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
        body.push(ch);
    }
    format!("/{}/", body.replace(">>", "\\>\\>"))
}

/// `internal:role=<role>[..]`
pub fn get_by_role_selector(role: &str, options: &RoleOptions) -> String {
    let mut props: Vec<(&str, String)> = Vec::new();
    if let Some(checked) = options.checked {
        props.push(("checked", checked.as_str().to_string()));
    }
    if let Some(disabled) = options.disabled {
        props.push(("disabled", disabled.to_string()));
    }
    if let Some(selected) = options.selected {
        props.push(("selected", selected.to_string()));
    }
    if let Some(expanded) = options.expanded {
        props.push(("expanded", expanded.to_string()));
    }
    if options.include_hidden {
        props.push(("include-hidden", "true".to_string()));
    }
    if let Some(level) = options.level {
        props.push(("level", level.to_string()));
    }
    if let Some(name) = &options.name {
        props.push(("name", escape_for_attribute_selector(name, options.exact)));
    }
    if let Some(pressed) = options.pressed {
        props.push(("pressed", pressed.as_str().to_string()));
    }

    let mut selector = format!("internal:role={role}");
    for (key, value) in props {
        selector.push_str(&format!("[{key}={value}]"));
    }
    selector
}

/// `internal:label=..`
pub fn get_by_label_selector(text: &TextPattern, options: TextOptions) -> String {
    format!(
        "internal:label={}",
        escape_for_text_selector(text, options.exact)
    )
}

/// `internal:text=..`
pub fn get_by_text_selector(text: &TextPattern, options: TextOptions) -> String {
    format!(
        "internal:text={}",
        escape_for_text_selector(text, options.exact)
    )
}

/// `internal:testid=[<attr>="<id>"s]`
pub fn get_by_test_id_selector(attribute: &str, test_id: &TextPattern) -> String {
    format!(
        "internal:testid=[{attribute}={}]",
        escape_for_attribute_selector(test_id, true)
    )
}

fn get_by_attribute_text_selector(
    attribute: &str,
    text: &TextPattern,
    options: TextOptions,
) -> String {
    format!(
        "internal:attr=[{attribute}={}]",
        escape_for_attribute_selector(text, options.exact)
    )
}

/// `internal:attr=[alt=..]`
pub fn get_by_alt_text_selector(text: &TextPattern, options: TextOptions) -> String {
    get_by_attribute_text_selector("alt", text, options)
}

/// `internal:attr=[placeholder=..]`
pub fn get_by_placeholder_selector(text: &TextPattern, options: TextOptions) -> String {
    get_by_attribute_text_selector("placeholder", text, options)
}

/// `internal:attr=[title=..]`
pub fn get_by_title_selector(text: &TextPattern, options: TextOptions) -> String {
    get_by_attribute_text_selector("title", text, options)
}

/// `nth=<index>`
pub fn nth_selector(index: i64) -> String {
    format!("nth={index}")
}

/// Chain separator token between sub-queries
pub const CHAIN_SEPARATOR: &str = " >> ";

/// Control token that continues a chain inside an iframe's content document
pub const ENTER_FRAME: &str = "internal:control=enter-frame";

/// `<parent> >> <child>`
pub fn chain(parent: &str, child: &str) -> String {
    format!("{parent}{CHAIN_SEPARATOR}{child}")
}
