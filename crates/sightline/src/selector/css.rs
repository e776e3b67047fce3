//! CSS selector subset: compound selectors, combinators, attribute
//! operators, structural pseudo-classes and selector lists.

use crate::dom::ElementRef;

/// Parsed selector list (`a, b`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssSelector {
    groups: Vec<Vec<CssPart>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CssPart {
    step: Compound,
    // Relation to the part on the left
    combinator: Option<Combinator>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
    ignore_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    NthChild { a: i64, b: i64 },
    Checked,
    Disabled,
    Enabled,
    Not(CssSelector),
}

impl CssSelector {
    /// Parse a selector list; the error string describes what was rejected
    pub fn parse(selector: &str) -> Result<Self, String> {
        let groups = split_groups(selector)?
            .iter()
            .map(|group| parse_chain(group))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    /// Whether the element matches any selector of the list
    pub fn matches(&self, element: &ElementRef) -> bool {
        self.groups.iter().any(|chain| matches_chain(element, chain))
    }
}

fn matches_chain(element: &ElementRef, parts: &[CssPart]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    if !matches_compound(element, &last.step) {
        return false;
    }
    let Some(combinator) = last.combinator else {
        return rest.is_empty();
    };

    match combinator {
        Combinator::Child => element
            .parent_element()
            .is_some_and(|parent| matches_chain(&parent, rest)),
        Combinator::Descendant => {
            let mut cursor = element.parent_element();
            while let Some(parent) = cursor {
                if matches_chain(&parent, rest) {
                    return true;
                }
                cursor = parent.parent_element();
            }
            false
        }
        Combinator::AdjacentSibling => previous_siblings(element)
            .last()
            .is_some_and(|sibling| matches_chain(sibling, rest)),
        Combinator::GeneralSibling => previous_siblings(element)
            .iter()
            .any(|sibling| matches_chain(sibling, rest)),
    }
}

fn siblings(element: &ElementRef) -> Vec<ElementRef> {
    element
        .parent_element()
        .map_or_else(|| vec![element.clone()], |parent| parent.children())
}

fn previous_siblings(element: &ElementRef) -> Vec<ElementRef> {
    let mut all = siblings(element);
    let position = all.iter().position(|s| s == element).unwrap_or(0);
    all.truncate(position);
    all
}

fn matches_compound(element: &ElementRef, step: &Compound) -> bool {
    if let Some(tag) = &step.tag {
        if element.tag_name() != *tag {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if element.attribute("id").as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !step.classes.is_empty() {
        let class_attr = element.attribute("class").unwrap_or_default();
        let classes: Vec<&str> = class_attr.split_whitespace().collect();
        if !step.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
    }
    step.attrs.iter().all(|cond| matches_attr(element, cond))
        && step.pseudos.iter().all(|pseudo| matches_pseudo(element, pseudo))
}

fn matches_attr(element: &ElementRef, cond: &AttrCondition) -> bool {
    let Some(actual) = element.attribute(&cond.name) else {
        return false;
    };
    let (actual, expected) = if cond.ignore_case {
        (actual.to_lowercase(), cond.value.to_lowercase())
    } else {
        (actual, cond.value.clone())
    };
    match cond.op {
        AttrOp::Exists => true,
        AttrOp::Equals => actual == expected,
        AttrOp::Includes => actual.split_whitespace().any(|token| token == expected),
        AttrOp::DashMatch => actual == expected || actual.starts_with(&format!("{expected}-")),
        AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
    }
}

fn matches_pseudo(element: &ElementRef, pseudo: &Pseudo) -> bool {
    match pseudo {
        Pseudo::FirstChild => siblings(element).first() == Some(element),
        Pseudo::LastChild => siblings(element).last() == Some(element),
        Pseudo::OnlyChild => siblings(element).len() == 1,
        Pseudo::FirstOfType | Pseudo::LastOfType => {
            let tag = element.tag_name();
            let same: Vec<ElementRef> = siblings(element)
                .into_iter()
                .filter(|s| s.tag_name() == tag)
                .collect();
            if matches!(pseudo, Pseudo::FirstOfType) {
                same.first() == Some(element)
            } else {
                same.last() == Some(element)
            }
        }
        Pseudo::NthChild { a, b } => {
            let index = siblings(element)
                .iter()
                .position(|s| s == element)
                .map_or(0, |p| p as i64 + 1);
            nth_matches(*a, *b, index)
        }
        Pseudo::Checked => match element.tag_name().as_str() {
            "option" => element.selected(),
            "input" => element.checked(),
            _ => false,
        },
        Pseudo::Disabled => is_form_control(element) && element.is_disabled(),
        Pseudo::Enabled => is_form_control(element) && !element.is_disabled(),
        Pseudo::Not(inner) => !inner.matches(element),
    }
}

fn is_form_control(element: &ElementRef) -> bool {
    matches!(
        element.tag_name().as_str(),
        "button" | "input" | "select" | "textarea" | "option" | "optgroup" | "fieldset"
    )
}

const fn nth_matches(a: i64, b: i64, index: i64) -> bool {
    if a == 0 {
        return index == b;
    }
    let diff = index - b;
    diff % a == 0 && diff / a >= 0
}

fn split_groups(selector: &str) -> Result<Vec<String>, String> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = Depth::default();
    let mut chars = selector.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(ch);
            if let Some(next) = chars.next() {
                current.push(next);
            }
            continue;
        }
        if depth.track(ch)? {
            current.push(ch);
            continue;
        }
        if ch == ',' {
            push_group(&mut groups, &current, selector)?;
            current.clear();
        } else {
            current.push(ch);
        }
    }
    depth.finish(selector)?;
    push_group(&mut groups, &current, selector)?;
    Ok(groups)
}

fn push_group(groups: &mut Vec<String>, current: &str, selector: &str) -> Result<(), String> {
    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(format!("empty selector in list \"{selector}\""));
    }
    groups.push(trimmed.to_string());
    Ok(())
}

/// Bracket, parenthesis and quote nesting while scanning
#[derive(Default)]
struct Depth {
    bracket: usize,
    paren: usize,
    quote: Option<char>,
}

impl Depth {
    /// Returns true when `ch` is nested and must be kept verbatim
    fn track(&mut self, ch: char) -> Result<bool, String> {
        if let Some(quote) = self.quote {
            if ch == quote {
                self.quote = None;
            }
            return Ok(true);
        }
        match ch {
            '"' | '\'' if self.bracket > 0 || self.paren > 0 => {
                self.quote = Some(ch);
                Ok(true)
            }
            '[' => {
                self.bracket += 1;
                Ok(true)
            }
            ']' => {
                self.bracket = self
                    .bracket
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ']'".to_string())?;
                Ok(true)
            }
            '(' => {
                self.paren += 1;
                Ok(true)
            }
            ')' => {
                self.paren = self
                    .paren
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ')'".to_string())?;
                Ok(true)
            }
            _ => Ok(self.bracket > 0 || self.paren > 0),
        }
    }

    fn finish(&self, selector: &str) -> Result<(), String> {
        if self.bracket > 0 || self.paren > 0 || self.quote.is_some() {
            return Err(format!("unterminated group in \"{selector}\""));
        }
        Ok(())
    }
}

fn tokenize(selector: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = Depth::default();
    let mut chars = selector.chars();

    let flush = |tokens: &mut Vec<String>, current: &mut String| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
    };

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(ch);
            if let Some(next) = chars.next() {
                current.push(next);
            }
            continue;
        }
        if depth.track(ch)? {
            current.push(ch);
            continue;
        }
        match ch {
            '>' | '+' | '~' => {
                flush(&mut tokens, &mut current);
                tokens.push(ch.to_string());
            }
            ch if ch.is_whitespace() => flush(&mut tokens, &mut current),
            _ => current.push(ch),
        }
    }
    depth.finish(selector)?;
    flush(&mut tokens, &mut current);
    Ok(tokens)
}

fn parse_chain(selector: &str) -> Result<Vec<CssPart>, String> {
    let mut parts: Vec<CssPart> = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokenize(selector)? {
        let combinator = match token.as_str() {
            ">" => Some(Combinator::Child),
            "+" => Some(Combinator::AdjacentSibling),
            "~" => Some(Combinator::GeneralSibling),
            _ => None,
        };
        if let Some(combinator) = combinator {
            if pending.is_some() || parts.is_empty() {
                return Err(format!("dangling combinator in \"{selector}\""));
            }
            pending = Some(combinator);
            continue;
        }

        let step = parse_compound(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(CssPart { step, combinator });
    }

    if parts.is_empty() || pending.is_some() {
        return Err(format!("incomplete selector \"{selector}\""));
    }
    Ok(parts)
}

fn parse_compound(part: &str) -> Result<Compound, String> {
    let chars: Vec<char> = part.chars().collect();
    let mut i = 0usize;
    let mut step = Compound::default();

    while i < chars.len() {
        match chars[i] {
            '*' => {
                step.universal = true;
                i += 1;
            }
            '#' => {
                let (id, next) = parse_ident(&chars, i + 1)
                    .ok_or_else(|| format!("expected id after '#' in \"{part}\""))?;
                step.id = Some(id);
                i = next;
            }
            '.' => {
                let (class, next) = parse_ident(&chars, i + 1)
                    .ok_or_else(|| format!("expected class after '.' in \"{part}\""))?;
                step.classes.push(class);
                i = next;
            }
            '[' => {
                let (cond, next) = parse_attr_condition(&chars, i, part)?;
                step.attrs.push(cond);
                i = next;
            }
            ':' => {
                let (pseudo, next) = parse_pseudo(&chars, i, part)?;
                step.pseudos.push(pseudo);
                i = next;
            }
            _ => {
                if step.tag.is_some() || step.universal || i != 0 {
                    return Err(format!("unexpected '{}' in \"{part}\"", chars[i]));
                }
                let (tag, next) = parse_ident(&chars, i)
                    .ok_or_else(|| format!("unexpected '{}' in \"{part}\"", chars[i]))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }
    Ok(step)
}

fn parse_ident(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut i = start;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '\\' {
            let escaped = *chars.get(i + 1)?;
            out.push(escaped);
            i += 2;
        } else if ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            out.push(ch);
            i += 1;
        } else {
            break;
        }
    }
    (!out.is_empty()).then_some((out, i))
}

fn parse_attr_condition(
    chars: &[char],
    start: usize,
    part: &str,
) -> Result<(AttrCondition, usize), String> {
    let close = find_closing(chars, start, '[', ']')
        .ok_or_else(|| format!("unterminated attribute selector in \"{part}\""))?;
    let inner: String = chars[start + 1..close].iter().collect();
    let inner = inner.trim();

    let op_at = inner.find(|c: char| matches!(c, '=' | '~' | '|' | '^' | '$' | '*'));
    let Some(op_at) = op_at else {
        return Ok((
            AttrCondition {
                name: inner.to_ascii_lowercase(),
                op: AttrOp::Exists,
                value: String::new(),
                ignore_case: false,
            },
            close + 1,
        ));
    };

    let name = inner[..op_at].trim().to_ascii_lowercase();
    let rest = &inner[op_at..];
    let (op, rest) = [
        ("~=", AttrOp::Includes),
        ("|=", AttrOp::DashMatch),
        ("^=", AttrOp::Prefix),
        ("$=", AttrOp::Suffix),
        ("*=", AttrOp::Substring),
        ("=", AttrOp::Equals),
    ]
    .iter()
    .find_map(|(token, op)| rest.strip_prefix(token).map(|r| (*op, r.trim())))
    .ok_or_else(|| format!("invalid attribute operator in \"{part}\""))?;

    if name.is_empty() {
        return Err(format!("missing attribute name in \"{part}\""));
    }

    let (value, flags) = match rest.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let body = &rest[1..];
            let end = find_unescaped(body, quote)
                .ok_or_else(|| format!("unterminated string in \"{part}\""))?;
            (unescape(&body[..end]), body[end + 1..].trim())
        }
        _ => match rest.split_once(char::is_whitespace) {
            Some((value, flags)) => (unescape(value), flags.trim()),
            None => (unescape(rest), ""),
        },
    };

    let ignore_case = match flags {
        "" | "s" | "S" => false,
        "i" | "I" => true,
        other => return Err(format!("unknown attribute flag '{other}' in \"{part}\"")),
    };

    Ok((
        AttrCondition {
            name,
            op,
            value,
            ignore_case,
        },
        close + 1,
    ))
}

fn parse_pseudo(chars: &[char], start: usize, part: &str) -> Result<(Pseudo, usize), String> {
    let (name, mut i) = parse_ident(chars, start + 1)
        .ok_or_else(|| format!("expected pseudo-class in \"{part}\""))?;
    let argument = if chars.get(i) == Some(&'(') {
        let close = find_closing(chars, i, '(', ')')
            .ok_or_else(|| format!("unterminated pseudo-class argument in \"{part}\""))?;
        let arg: String = chars[i + 1..close].iter().collect();
        i = close + 1;
        Some(arg)
    } else {
        None
    };

    let pseudo = match (name.to_ascii_lowercase().as_str(), argument) {
        ("first-child", None) => Pseudo::FirstChild,
        ("last-child", None) => Pseudo::LastChild,
        ("only-child", None) => Pseudo::OnlyChild,
        ("first-of-type", None) => Pseudo::FirstOfType,
        ("last-of-type", None) => Pseudo::LastOfType,
        ("checked", None) => Pseudo::Checked,
        ("disabled", None) => Pseudo::Disabled,
        ("enabled", None) => Pseudo::Enabled,
        ("nth-child", Some(arg)) => {
            let (a, b) = parse_nth(&arg).ok_or_else(|| format!("invalid :nth-child({arg})"))?;
            Pseudo::NthChild { a, b }
        }
        ("not", Some(arg)) => Pseudo::Not(CssSelector::parse(&arg)?),
        (other, _) => return Err(format!("unsupported pseudo-class ':{other}'")),
    };
    Ok((pseudo, i))
}

/// Parse `An+B`, `odd`, `even` or an integer
fn parse_nth(arg: &str) -> Option<(i64, i64)> {
    let arg: String = arg.chars().filter(|c| !c.is_whitespace()).collect();
    match arg.to_ascii_lowercase().as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }
    let Some(n_at) = arg.find(['n', 'N']) else {
        return arg.parse().ok().map(|b| (0, b));
    };
    let a = match &arg[..n_at] {
        "" | "+" => 1,
        "-" => -1,
        coefficient => coefficient.parse().ok()?,
    };
    let b = match &arg[n_at + 1..] {
        "" => 0,
        offset => offset.strip_prefix('+').unwrap_or(offset).parse().ok()?,
    };
    Some((a, b))
}

fn find_closing(chars: &[char], start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '\\' {
            i += 2;
            continue;
        }
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == open => depth += 1,
            None if ch == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            None => {}
        }
        i += 1;
    }
    None
}

fn find_unescaped(body: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (at, ch) in body.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Some(at);
        }
    }
    None
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn doc() -> Document {
        Document::with_body(
            r#"<main id="app">
                 <ul class="list primary">
                   <li class="item">one</li>
                   <li class="item active" data-kind="fruit-apple">two</li>
                   <li class="item">three</li>
                 </ul>
                 <form>
                   <input type="checkbox" checked>
                   <input type="text" disabled>
                   <label for="a b">weird</label>
                 </form>
               </main>"#,
        )
        .unwrap()
    }

    fn select(doc: &Document, selector: &str) -> Vec<ElementRef> {
        let css = CssSelector::parse(selector).unwrap();
        let root = doc.document_element();
        let mut all = vec![root.clone()];
        all.extend(root.descendants());
        all.into_iter().filter(|e| css.matches(e)).collect()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_rejects_malformed() {
            assert!(CssSelector::parse("").is_err());
            assert!(CssSelector::parse("div >").is_err());
            assert!(CssSelector::parse("a,,b").is_err());
            assert!(CssSelector::parse("[unterminated").is_err());
            assert!(CssSelector::parse(":hover").is_err());
            assert!(CssSelector::parse("div span!").is_err());
        }

        #[test]
        fn test_parse_nth() {
            assert_eq!(parse_nth("odd"), Some((2, 1)));
            assert_eq!(parse_nth("even"), Some((2, 0)));
            assert_eq!(parse_nth("3"), Some((0, 3)));
            assert_eq!(parse_nth("2n+1"), Some((2, 1)));
            assert_eq!(parse_nth("-n + 3"), Some((-1, 3)));
            assert_eq!(parse_nth("x"), None);
        }
    }

    mod match_tests {
        use super::*;

        #[test]
        fn test_type_class_id() {
            let doc = doc();
            assert_eq!(select(&doc, "li").len(), 3);
            assert_eq!(select(&doc, ".item.active").len(), 1);
            assert_eq!(select(&doc, "#app").len(), 1);
            assert_eq!(select(&doc, "*").len(), 12);
        }

        #[test]
        fn test_combinators() {
            let doc = doc();
            assert_eq!(select(&doc, "main li").len(), 3);
            assert_eq!(select(&doc, "main > li").len(), 0);
            assert_eq!(select(&doc, "ul > li").len(), 3);
            assert_eq!(select(&doc, ".active + li")[0].text_content(), "three");
            assert_eq!(select(&doc, "li:first-child ~ li").len(), 2);
        }

        #[test]
        fn test_attribute_operators() {
            let doc = doc();
            assert_eq!(select(&doc, "[data-kind]").len(), 1);
            assert_eq!(select(&doc, "[data-kind=\"fruit-apple\"]").len(), 1);
            assert_eq!(select(&doc, "[data-kind|=fruit]").len(), 1);
            assert_eq!(select(&doc, "[data-kind^=fruit]").len(), 1);
            assert_eq!(select(&doc, "[data-kind$=apple]").len(), 1);
            assert_eq!(select(&doc, "[data-kind*=\"t-a\"]").len(), 1);
            assert_eq!(select(&doc, "[class~=primary]").len(), 1);
            assert_eq!(select(&doc, "[data-kind=\"FRUIT-APPLE\" i]").len(), 1);
            assert_eq!(select(&doc, "[for=\"a b\"]").len(), 1);
        }

        #[test]
        fn test_structural_pseudos() {
            let doc = doc();
            assert_eq!(select(&doc, "li:nth-child(2)")[0].text_content(), "two");
            assert_eq!(select(&doc, "li:last-child")[0].text_content(), "three");
            assert_eq!(select(&doc, "li:nth-child(odd)").len(), 2);
            assert_eq!(select(&doc, "li:not(.active)").len(), 2);
            assert_eq!(select(&doc, "ul:only-child").len(), 0);
        }

        #[test]
        fn test_state_pseudos() {
            let doc = doc();
            assert_eq!(select(&doc, "input:checked").len(), 1);
            assert_eq!(select(&doc, "input:disabled").len(), 1);
            assert_eq!(select(&doc, "input:enabled").len(), 1);
        }

        #[test]
        fn test_selector_list() {
            let doc = doc();
            assert_eq!(select(&doc, "ul, form").len(), 2);
        }

        #[test]
        fn test_escaped_identifier() {
            let doc = Document::with_body(r#"<p id="a.b">x</p>"#).unwrap();
            assert_eq!(select(&doc, "#a\\.b").len(), 1);
        }
    }
}
