//! HTML fragment parser.
//!
//! Tolerant, stack-based tokenizer: unknown end tags pop to the nearest
//! matching open element, void elements never take children and raw-text
//! elements (`script`, `style`, `textarea`, `title`) swallow everything
//! up to their end tag.

use super::{DomTree, NodeId};
use crate::result::{LocatorError, LocatorResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum FragmentNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<FragmentNode>,
    },
    Text(String),
}

fn parse_error(message: impl Into<String>) -> LocatorError {
    LocatorError::HtmlParse {
        message: message.into(),
    }
}

struct OpenElement {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<FragmentNode>,
}

impl OpenElement {
    fn close(self) -> FragmentNode {
        FragmentNode::Element {
            tag: self.tag,
            attrs: self.attrs,
            children: self.children,
        }
    }
}

/// Parse markup into a forest of fragment nodes
pub(super) fn parse_fragment(html: &str) -> LocatorResult<Vec<FragmentNode>> {
    let mut roots: Vec<FragmentNode> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let bytes = html.as_bytes();
    let mut i = 0usize;

    let push = |stack: &mut Vec<OpenElement>, roots: &mut Vec<FragmentNode>, node| match stack
        .last_mut()
    {
        Some(open) => open.children.push(node),
        None => roots.push(node),
    };

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            let end = find_subslice(bytes, i + 4, b"-->")
                .ok_or_else(|| parse_error("unclosed HTML comment"))?;
            i = end + 3;
            continue;
        }

        if starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?") {
            let end = find_byte(bytes, i, b'>').ok_or_else(|| parse_error("unclosed declaration"))?;
            i = end + 1;
            continue;
        }

        if starts_with_at(bytes, i, b"</") {
            let (tag, next) = parse_end_tag(html, i)?;
            i = next;
            if stack.iter().any(|open| open.tag == tag) {
                while let Some(open) = stack.pop() {
                    let matched = open.tag == tag;
                    let node = open.close();
                    push(&mut stack, &mut roots, node);
                    if matched {
                        break;
                    }
                }
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            if is_raw_text_tag(&tag) && !self_closing {
                let close = find_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| parse_error(format!("unclosed <{tag}>")))?;
                let body = html.get(i..close).unwrap_or_default();
                let children = if body.is_empty() {
                    Vec::new()
                } else if tag == "script" || tag == "style" {
                    vec![FragmentNode::Text(body.to_string())]
                } else {
                    vec![FragmentNode::Text(decode_character_references(body))]
                };
                let (_, after) = parse_end_tag(html, close)?;
                i = after;
                push(
                    &mut stack,
                    &mut roots,
                    FragmentNode::Element {
                        tag,
                        attrs,
                        children,
                    },
                );
                continue;
            }

            if self_closing || is_void_tag(&tag) {
                push(
                    &mut stack,
                    &mut roots,
                    FragmentNode::Element {
                        tag,
                        attrs,
                        children: Vec::new(),
                    },
                );
            } else {
                stack.push(OpenElement {
                    tag,
                    attrs,
                    children: Vec::new(),
                });
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        if let Some(text) = html.get(text_start..i) {
            push(
                &mut stack,
                &mut roots,
                FragmentNode::Text(decode_character_references(text)),
            );
        }
    }

    while let Some(open) = stack.pop() {
        let node = open.close();
        push(&mut stack, &mut roots, node);
    }
    Ok(roots)
}

/// Append parsed nodes under `parent`.
///
/// Returns every inserted `<iframe>` with its `srcdoc` so the caller can
/// attach content documents once the tree lock is released.
pub(super) fn insert_fragment(
    tree: &mut DomTree,
    parent: NodeId,
    fragment: Vec<FragmentNode>,
) -> Vec<(NodeId, Option<String>)> {
    let mut frames = Vec::new();
    for node in fragment {
        insert_node(tree, parent, node, &mut frames);
    }
    frames
}

fn insert_node(
    tree: &mut DomTree,
    parent: NodeId,
    node: FragmentNode,
    frames: &mut Vec<(NodeId, Option<String>)>,
) {
    match node {
        FragmentNode::Text(text) => {
            tree.create_text(parent, text);
        }
        FragmentNode::Element {
            tag,
            attrs,
            children,
        } => {
            let srcdoc = (tag == "iframe")
                .then(|| attrs.iter().find(|(k, _)| k == "srcdoc").map(|(_, v)| v.clone()));
            let id = tree.create_element(Some(parent), tag, attrs);
            if let Some(srcdoc) = srcdoc {
                frames.push((id, srcdoc));
            }
            for child in children {
                insert_node(tree, id, child, frames);
            }
        }
    }
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> LocatorResult<(String, Vec<(String, String)>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at + 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| parse_error("invalid tag name"))?
        .to_ascii_lowercase();
    if tag.is_empty() {
        return Err(parse_error("empty tag name"));
    }

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(parse_error(format!("unclosed start tag <{tag}")));
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            i += 1;
            if bytes.get(i) == Some(&b'>') {
                self_closing = true;
                i += 1;
                break;
            }
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        let name = html
            .get(name_start..i)
            .ok_or_else(|| parse_error("invalid attribute name"))?
            .to_ascii_lowercase();
        if name.is_empty() {
            return Err(parse_error(format!("invalid attribute in <{tag}>")));
        }

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            String::new()
        };

        if !attrs.iter().any(|(k, _)| *k == name) {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> LocatorResult<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| parse_error("invalid end tag"))?
        .to_ascii_lowercase();

    let close = find_byte(bytes, i, b'>').ok_or_else(|| parse_error("unclosed end tag"))?;
    Ok((tag, close + 1))
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> LocatorResult<String> {
    if *i >= bytes.len() {
        return Err(parse_error("missing attribute value"));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        let end = find_byte(bytes, start, quote)
            .ok_or_else(|| parse_error("unclosed quoted attribute value"))?;
        *i = end + 1;
        let raw = html
            .get(start..end)
            .ok_or_else(|| parse_error("invalid attribute value"))?;
        return Ok(decode_character_references(raw));
    }

    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        if bytes[*i] == b'/' && bytes.get(*i + 1) == Some(&b'>') {
            break;
        }
        *i += 1;
    }
    let raw = html
        .get(start..*i)
        .ok_or_else(|| parse_error("invalid attribute value"))?;
    Ok(decode_character_references(raw))
}

/// Decode the common named and all numeric character references
pub(super) fn decode_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint = match value.strip_prefix('x').or_else(|| value.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => value.parse::<u32>().ok()?,
        };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            "copy" => Some('©'),
            "hellip" => Some('…'),
            "mdash" => Some('\u{2014}'),
            "ndash" => Some('\u{2013}'),
            _ => None,
        }
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let decoded = tail.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &tail[..end];
            let ch = match entity.strip_prefix('#') {
                Some(numeric) => decode_numeric(numeric),
                None => decode_named(entity),
            };
            ch.map(|ch| (ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.get(at..at + needle.len()) == Some(needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    (from..bytes.len()).find(|&i| starts_with_at(bytes, i, needle))
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|b| *b == needle)
        .map(|p| p + from)
}

fn find_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    (from..bytes.len()).find(|&i| {
        starts_with_at(bytes, i, b"</")
            && bytes
                .get(i + 2..i + 2 + tag.len())
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    })
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

const fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

const fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && b != b'=' && b != b'>' && b != b'/' && b != b'"' && b != b'\''
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea" | "title")
}

pub(super) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attrs: &[(&str, &str)], children: Vec<FragmentNode>) -> FragmentNode {
        FragmentNode::Element {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            children,
        }
    }

    fn text(value: &str) -> FragmentNode {
        FragmentNode::Text(value.to_string())
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let parsed = parse_fragment(r#"<div id="a" class='b'><span>hi</span></div>"#).unwrap();
        assert_eq!(
            parsed,
            vec![element(
                "div",
                &[("id", "a"), ("class", "b")],
                vec![element("span", &[], vec![text("hi")])]
            )]
        );
    }

    #[test]
    fn test_void_and_self_closing() {
        let parsed = parse_fragment(r#"<input disabled><br/><p>x</p>"#).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0], element("input", &[("disabled", "")], vec![]));
        assert_eq!(parsed[1], element("br", &[], vec![]));
    }

    #[test]
    fn test_unquoted_attribute_and_case_folding() {
        let parsed = parse_fragment("<BUTTON TYPE=submit>Go</BUTTON>").unwrap();
        assert_eq!(
            parsed,
            vec![element("button", &[("type", "submit")], vec![text("Go")])]
        );
    }

    #[test]
    fn test_comments_and_doctype_are_skipped() {
        let parsed = parse_fragment("<!doctype html><!-- note --><b>x</b>").unwrap();
        assert_eq!(parsed, vec![element("b", &[], vec![text("x")])]);
    }

    #[test]
    fn test_unclosed_elements_close_at_end() {
        let parsed = parse_fragment("<ul><li>a<li>b").unwrap();
        assert_eq!(parsed.len(), 1);
        if let FragmentNode::Element { children, .. } = &parsed[0] {
            assert_eq!(children.len(), 1);
        } else {
            panic!("expected element");
        }
    }

    #[test]
    fn test_stray_end_tag_is_ignored() {
        let parsed = parse_fragment("<p>a</span>b</p>").unwrap();
        assert_eq!(parsed, vec![element("p", &[], vec![text("a"), text("b")])]);
    }

    #[test]
    fn test_raw_text_elements() {
        let parsed = parse_fragment("<textarea>a <b> &amp; c</textarea>").unwrap();
        assert_eq!(
            parsed,
            vec![element("textarea", &[], vec![text("a <b> & c")])]
        );
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let parsed = parse_fragment("1 < 2").unwrap();
        assert_eq!(parsed, vec![text("1 "), text("< 2")]);
    }

    #[test]
    fn test_errors() {
        assert!(parse_fragment("<!-- open").is_err());
        assert!(parse_fragment("<div class=\"x").is_err());
        assert!(parse_fragment("<script>never closed").is_err());
    }

    #[test]
    fn test_character_references() {
        assert_eq!(decode_character_references("a &amp; b"), "a & b");
        assert_eq!(decode_character_references("&#65;&#x42;"), "AB");
        assert_eq!(decode_character_references("&unknown; &"), "&unknown; &");
        assert_eq!(decode_character_references("&quot;q&quot;"), "\"q\"");
    }
}
