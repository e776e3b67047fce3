//! Parser for chained selectors (`part >> part >> ...`).

use regex::Regex;

use super::css::CssSelector;
use super::role::AriaState;
use crate::dom::collapse_whitespace;
use crate::result::{LocatorError, LocatorResult};

/// How text is compared
#[derive(Debug, Clone)]
pub enum TextMatcher {
    /// Case-insensitive substring of whitespace-normalized text
    Substring(String),
    /// Whole whitespace-normalized text, case-sensitive
    Exact(String),
    /// Regular expression
    Pattern(Regex),
}

impl TextMatcher {
    /// Test normalized text
    pub fn matches(&self, text: &str) -> bool {
        let text = collapse_whitespace(text);
        match self {
            Self::Substring(needle) => text.to_lowercase().contains(needle.as_str()),
            Self::Exact(expected) => text == *expected,
            Self::Pattern(re) => re.is_match(&text),
        }
    }

    fn substring(text: &str) -> Self {
        Self::Substring(collapse_whitespace(text).to_lowercase())
    }

    fn exact(text: &str) -> Self {
        Self::Exact(collapse_whitespace(text))
    }
}

/// Attribute value comparison used by `internal:attr` and `internal:testid`
#[derive(Debug, Clone)]
pub enum AttrMatcher {
    /// Exact raw value
    Equals(String),
    /// Case-insensitive substring of the normalized value
    Contains(String),
    /// Regular expression
    Pattern(Regex),
}

impl AttrMatcher {
    /// Test a raw attribute value
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::Contains(needle) => collapse_whitespace(value).to_lowercase().contains(needle.as_str()),
            Self::Pattern(re) => re.is_match(value),
        }
    }
}

/// Parsed `internal:role` filters
#[derive(Debug, Clone)]
pub struct RoleQuery {
    /// Required role
    pub role: String,
    /// Accessible name filter
    pub name: Option<TextMatcher>,
    /// `checked` filter
    pub checked: Option<AriaState>,
    /// `disabled` filter
    pub disabled: Option<bool>,
    /// `expanded` filter
    pub expanded: Option<bool>,
    /// Match hidden elements too
    pub include_hidden: bool,
    /// Heading level
    pub level: Option<u32>,
    /// `pressed` filter
    pub pressed: Option<AriaState>,
    /// `selected` filter
    pub selected: Option<bool>,
}

/// One `>>`-separated step of a chained selector
#[derive(Debug, Clone)]
pub enum SelectorPart {
    Css(CssSelector),
    Text(TextMatcher),
    Label(TextMatcher),
    Role(RoleQuery),
    Attr { name: String, matcher: AttrMatcher },
    Nth(i64),
    EnterFrame,
}

/// A selector string parsed by the query service
#[derive(Debug, Clone)]
pub struct ParsedSelector {
    source: String,
    pub(crate) parts: Vec<SelectorPart>,
}

impl ParsedSelector {
    /// The selector text this was parsed from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of chained steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the selector has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Whether evaluation crosses into an iframe document
    #[must_use]
    pub fn enters_frame(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, SelectorPart::EnterFrame))
    }
}

fn invalid(selector: &str, message: impl Into<String>) -> LocatorError {
    LocatorError::InvalidSelector {
        selector: selector.to_string(),
        message: message.into(),
    }
}

/// Parse a chained selector
pub fn parse_selector(selector: &str) -> LocatorResult<ParsedSelector> {
    let raw_parts = split_chain(selector).map_err(|message| invalid(selector, message))?;
    let parts = raw_parts
        .iter()
        .map(|part| parse_part(part).map_err(|message| invalid(selector, message)))
        .collect::<LocatorResult<Vec<_>>>()?;
    Ok(ParsedSelector {
        source: selector.to_string(),
        parts,
    })
}

/// Split on `>>` outside quotes and brackets
pub fn split_chain(selector: &str) -> Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = selector.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(ch);
            if let Some(next) = chars.next() {
                current.push(next);
            }
            continue;
        }
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '>' if depth == 0 && chars.peek() == Some(&'>') => {
                chars.next();
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err("empty selector part".to_string());
                }
                parts.push(trimmed.to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    if quote.is_some() {
        return Err("unterminated string".to_string());
    }
    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err("empty selector part".to_string());
    }
    parts.push(trimmed.to_string());
    Ok(parts)
}

fn parse_part(part: &str) -> Result<SelectorPart, String> {
    let Some((engine, body)) = engine_prefix(part) else {
        return CssSelector::parse(part).map(SelectorPart::Css);
    };
    match engine {
        "css" => CssSelector::parse(body).map(SelectorPart::Css),
        "internal:text" | "text" => parse_text_body(body).map(SelectorPart::Text),
        "internal:label" => parse_text_body(body).map(SelectorPart::Label),
        "internal:role" => parse_role(body).map(SelectorPart::Role),
        "internal:attr" | "internal:testid" => parse_attr_part(body),
        "nth" => body
            .trim()
            .parse::<i64>()
            .map(SelectorPart::Nth)
            .map_err(|_| format!("invalid nth index \"{body}\"")),
        "internal:control" if body == "enter-frame" => Ok(SelectorPart::EnterFrame),
        other => Err(format!("unknown selector engine \"{other}\"")),
    }
}

fn engine_prefix(part: &str) -> Option<(&str, &str)> {
    let (name, body) = part.split_once('=')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '+' | '*'));
    valid.then_some((name, body))
}

fn parse_text_body(body: &str) -> Result<TextMatcher, String> {
    let body = body.trim();
    if body.starts_with('/') {
        return parse_regex(body).map(TextMatcher::Pattern);
    }
    if body.starts_with('"') || body.starts_with('\'') {
        let (text, rest) = parse_quoted(body)?;
        return match rest {
            "i" | "I" => Ok(TextMatcher::substring(&text)),
            "" | "s" | "S" => Ok(TextMatcher::exact(&text)),
            other => Err(format!("unexpected \"{other}\" after quoted text")),
        };
    }
    Ok(TextMatcher::substring(body))
}

/// Returns the unescaped body and whatever follows the closing quote
fn parse_quoted(input: &str) -> Result<(String, &str), String> {
    let quote = input
        .chars()
        .next()
        .ok_or_else(|| "expected quoted string".to_string())?;
    let mut escaped = false;
    for (at, ch) in input.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            let inner = &input[1..at];
            let rest = &input[at + 1..];
            return Ok((unescape_quoted(inner, quote), rest));
        }
    }
    Err("unterminated string".to_string())
}

fn unescape_quoted(inner: &str, quote: char) -> String {
    if quote == '"' {
        if let Ok(value) = serde_json::from_str::<String>(&format!("\"{inner}\"")) {
            return value;
        }
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// `/source/flags`
fn parse_regex(body: &str) -> Result<Regex, String> {
    let close = body
        .rfind('/')
        .filter(|at| *at > 0)
        .ok_or_else(|| format!("unterminated regular expression {body}"))?;
    let source = &body[1..close];
    let flags = &body[close + 1..];
    let mut prefix = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 's' | 'm' => prefix.push(flag),
            'u' | 'g' => {}
            other => return Err(format!("unsupported regular expression flag '{other}'")),
        }
    }
    let pattern = if prefix.is_empty() {
        source.to_string()
    } else {
        format!("(?{prefix}){source}")
    };
    Regex::new(&pattern).map_err(|e| e.to_string())
}

/// One `[key=value]` property
#[derive(Debug)]
enum PropValue {
    Quoted { text: String, exact: bool },
    Regex(Regex),
    Bare(String),
}

fn parse_props(mut input: &str) -> Result<Vec<(String, PropValue)>, String> {
    let mut props = Vec::new();
    loop {
        input = input.trim_start();
        if input.is_empty() {
            return Ok(props);
        }
        let inner = input
            .strip_prefix('[')
            .ok_or_else(|| format!("expected '[' at \"{input}\""))?;
        let (key, rest) = inner
            .split_once('=')
            .ok_or_else(|| format!("expected '=' in \"[{inner}\""))?;
        let key = key.trim().to_ascii_lowercase();
        let rest = rest.trim_start();

        let (value, rest) = if rest.starts_with('"') || rest.starts_with('\'') {
            let (text, after) = parse_quoted(rest)?;
            let (exact, after) = match after.chars().next() {
                Some('s' | 'S') => (true, &after[1..]),
                Some('i' | 'I') => (false, &after[1..]),
                _ => (false, after),
            };
            (PropValue::Quoted { text, exact }, after)
        } else if rest.starts_with('/') {
            let close = find_regex_end(rest).ok_or_else(|| "unterminated regular expression".to_string())?;
            let (body, after) = rest.split_at(close);
            (PropValue::Regex(parse_regex(body)?), after)
        } else {
            let end = rest
                .find(']')
                .ok_or_else(|| format!("unterminated property \"{key}\""))?;
            (PropValue::Bare(rest[..end].trim().to_string()), &rest[end..])
        };

        input = rest
            .trim_start()
            .strip_prefix(']')
            .ok_or_else(|| format!("expected ']' after property \"{key}\""))?;
        props.push((key, value));
    }
}

/// End of `/source/flags` inside a property (exclusive)
fn find_regex_end(input: &str) -> Option<usize> {
    let mut escaped = false;
    let mut in_class = false;
    for (at, ch) in input.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' if in_class => in_class = false,
            '/' if !in_class => {
                let flags_end = input[at + 1..]
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .map_or(input.len(), |n| at + 1 + n);
                return Some(flags_end);
            }
            _ => {}
        }
    }
    None
}

fn parse_attr_part(body: &str) -> Result<SelectorPart, String> {
    let mut props = parse_props(body)?;
    if props.len() != 1 {
        return Err(format!("expected exactly one attribute in \"{body}\""));
    }
    let (name, value) = props.remove(0);
    let matcher = match value {
        PropValue::Quoted { text, exact: true } => AttrMatcher::Equals(text),
        PropValue::Quoted { text, exact: false } => {
            AttrMatcher::Contains(collapse_whitespace(&text).to_lowercase())
        }
        PropValue::Regex(re) => AttrMatcher::Pattern(re),
        PropValue::Bare(text) => AttrMatcher::Equals(text),
    };
    Ok(SelectorPart::Attr { name, matcher })
}

fn parse_bool(key: &str, value: &PropValue) -> Result<bool, String> {
    match value {
        PropValue::Bare(v) | PropValue::Quoted { text: v, .. } if v == "true" => Ok(true),
        PropValue::Bare(v) | PropValue::Quoted { text: v, .. } if v == "false" => Ok(false),
        _ => Err(format!("\"{key}\" must be true or false")),
    }
}

fn parse_state(key: &str, value: &PropValue) -> Result<AriaState, String> {
    match value {
        PropValue::Bare(v) | PropValue::Quoted { text: v, .. } => {
            AriaState::parse(v).ok_or_else(|| format!("\"{key}\" must be true, false or mixed"))
        }
        PropValue::Regex(_) => Err(format!("\"{key}\" must be true, false or mixed")),
    }
}

fn parse_role(body: &str) -> Result<RoleQuery, String> {
    let split_at = body.find('[').unwrap_or(body.len());
    let role = body[..split_at].trim().to_ascii_lowercase();
    if role.is_empty() || !role.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!("invalid role \"{role}\""));
    }

    let mut query = RoleQuery {
        role,
        name: None,
        checked: None,
        disabled: None,
        expanded: None,
        include_hidden: false,
        level: None,
        pressed: None,
        selected: None,
    };

    for (key, value) in parse_props(&body[split_at..])? {
        match key.as_str() {
            "name" => {
                query.name = Some(match value {
                    PropValue::Quoted { text, exact: true } => TextMatcher::exact(&text),
                    PropValue::Quoted { text, exact: false } | PropValue::Bare(text) => {
                        TextMatcher::substring(&text)
                    }
                    PropValue::Regex(re) => TextMatcher::Pattern(re),
                });
            }
            "checked" => query.checked = Some(parse_state(&key, &value)?),
            "pressed" => query.pressed = Some(parse_state(&key, &value)?),
            "disabled" => query.disabled = Some(parse_bool(&key, &value)?),
            "expanded" => query.expanded = Some(parse_bool(&key, &value)?),
            "selected" => query.selected = Some(parse_bool(&key, &value)?),
            "include-hidden" => query.include_hidden = parse_bool(&key, &value)?,
            "level" => {
                let PropValue::Bare(level) = &value else {
                    return Err("\"level\" must be a number".to_string());
                };
                query.level = Some(
                    level
                        .parse()
                        .map_err(|_| "\"level\" must be a number".to_string())?,
                );
            }
            other => return Err(format!("unknown role property \"{other}\"")),
        }
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod split_tests {
        use super::*;

        #[test]
        fn test_split_simple_chain() {
            assert_eq!(
                split_chain("div >> span >> nth=0").unwrap(),
                vec!["div", "span", "nth=0"]
            );
        }

        #[test]
        fn test_split_ignores_quoted_separators() {
            assert_eq!(
                split_chain(r#"internal:text="a >> b"i >> p"#).unwrap(),
                vec![r#"internal:text="a >> b"i"#, "p"]
            );
        }

        #[test]
        fn test_split_ignores_css_child_combinator() {
            assert_eq!(split_chain("ul > li").unwrap(), vec!["ul > li"]);
        }

        #[test]
        fn test_split_rejects_empty_parts() {
            assert!(split_chain(">> div").is_err());
            assert!(split_chain("div >> ").is_err());
            assert!(split_chain("").is_err());
        }
    }

    mod part_tests {
        use super::*;

        #[test]
        fn test_text_bodies() {
            let SelectorPart::Text(TextMatcher::Substring(s)) =
                parse_part(r#"internal:text="Click  Me"i"#).unwrap()
            else {
                panic!("expected substring matcher");
            };
            assert_eq!(s, "click me");

            assert!(matches!(
                parse_part(r#"internal:text="Exact"s"#).unwrap(),
                SelectorPart::Text(TextMatcher::Exact(_))
            ));
            assert!(matches!(
                parse_part("internal:text=/^go$/i").unwrap(),
                SelectorPart::Text(TextMatcher::Pattern(_))
            ));
        }

        #[test]
        fn test_testid_and_attr() {
            let SelectorPart::Attr { name, matcher } =
                parse_part(r#"internal:testid=[data-testid="iframe-button"s]"#).unwrap()
            else {
                panic!("expected attr part");
            };
            assert_eq!(name, "data-testid");
            assert!(matcher.matches("iframe-button"));
            assert!(!matcher.matches("iframe-button-2"));

            let SelectorPart::Attr { matcher, .. } =
                parse_part(r#"internal:attr=[placeholder="Your Name"i]"#).unwrap()
            else {
                panic!("expected attr part");
            };
            assert!(matcher.matches("Enter your  name here"));
        }

        #[test]
        fn test_role_properties() {
            let SelectorPart::Role(query) = parse_part(
                r#"internal:role=button[checked=mixed][level=2][name="Save"s][include-hidden=true]"#,
            )
            .unwrap() else {
                panic!("expected role part");
            };
            assert_eq!(query.role, "button");
            assert_eq!(query.checked, Some(AriaState::Mixed));
            assert_eq!(query.level, Some(2));
            assert!(query.include_hidden);
            assert!(query.name.unwrap().matches("Save"));
        }

        #[test]
        fn test_role_regex_name() {
            let SelectorPart::Role(query) =
                parse_part(r"internal:role=link[name=/docs\/v\d/i]").unwrap()
            else {
                panic!("expected role part");
            };
            assert!(query.name.unwrap().matches("DOCS/V2"));
        }

        #[test]
        fn test_nth_and_frame() {
            assert!(matches!(parse_part("nth=-1").unwrap(), SelectorPart::Nth(-1)));
            assert!(matches!(
                parse_part("internal:control=enter-frame").unwrap(),
                SelectorPart::EnterFrame
            ));
            assert!(parse_part("nth=first").is_err());
            assert!(parse_part("internal:control=leave-frame").is_err());
        }

        #[test]
        fn test_unknown_engine() {
            assert!(parse_part("xpath=//div").is_err());
            assert!(parse_part("internal:role=button[bogus=1]").is_err());
        }

        #[test]
        fn test_parse_selector_reports_invalid_selector() {
            let err = parse_selector("div >> [").unwrap_err();
            assert!(matches!(err, LocatorError::InvalidSelector { .. }));
            assert!(err.to_string().contains("div >> ["));
        }
    }

    mod matcher_tests {
        use super::*;

        #[test]
        fn test_text_matcher_normalizes_whitespace() {
            assert!(TextMatcher::substring("click me").matches("  Click\n  me now "));
            assert!(TextMatcher::exact("Click me").matches(" Click  me "));
            assert!(!TextMatcher::exact("Click me").matches("click me"));
        }

        #[test]
        fn test_unescape_json_and_fallback() {
            assert_eq!(parse_quoted(r#""a\"b"s"#).unwrap(), ("a\"b".to_string(), "s"));
            assert_eq!(parse_quoted(r#""tab\there"i"#).unwrap().0, "tab\there");
            assert_eq!(parse_quoted("'single'").unwrap().0, "single");
            assert!(parse_quoted("\"open").is_err());
        }
    }
}
