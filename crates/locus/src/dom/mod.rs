//! Owned markup tree.
//!
//! Page markup is parsed into a [`Document`] the caller owns outright, so
//! filtering (see [`DomReducer`]) never reaches back into the live page.

mod parser;
mod reduce;
mod selector;

pub use reduce::{DomReducer, ReducerOptions, ALLOWED_ATTRIBUTES, REMOVED_ELEMENTS};
pub use selector::{SelectorError, SelectorList};

use std::borrow::Cow;

/// Elements that never have children or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// One attribute, value kept exactly as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lower-cased attribute name
    pub name: String,
    /// Raw attribute value (empty for bare attributes)
    pub value: String,
}

/// An element node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lower-cased tag name
    pub name: String,
    /// Attributes in source order
    pub attrs: Vec<Attribute>,
    /// Child nodes
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Attribute value with character references decoded
    #[must_use]
    pub fn attr_decoded(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attr(name).map(decode_entities)
    }

    /// Whether the attribute is present
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    /// Whitespace-separated class names
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Whether this is a void element
    #[must_use]
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }

    /// Concatenated text of all descendants
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Serialize this element and its subtree
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

/// A node in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element
    Element(Element),
    /// Character data, kept raw (entities are not decoded)
    Text(String),
    /// `<!-- ... -->`
    Comment(String),
    /// `<!DOCTYPE ...>` and other `<!...>` / `<?...>` declarations,
    /// stored without the surrounding angle brackets
    Declaration(String),
}

/// A parsed markup document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Top-level nodes
    pub children: Vec<Node>,
}

impl Document {
    /// Parse markup. Never fails: malformed input yields a best-effort tree.
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        parser::parse(markup)
    }

    /// First element with the given tag name, depth-first
    #[must_use]
    pub fn find_first(&self, name: &str) -> Option<&Element> {
        let mut found = None;
        self.any_element(|el, _| {
            if el.name == name {
                found = Some(el);
                true
            } else {
                false
            }
        });
        found
    }

    /// Visit elements depth-first with their ancestor chain (root first)
    /// until `visit` returns `true`. Returns whether it did.
    pub fn any_element<'a>(
        &'a self,
        mut visit: impl FnMut(&'a Element, &[&'a Element]) -> bool,
    ) -> bool {
        let mut ancestors = Vec::new();
        walk(&self.children, &mut ancestors, &mut visit)
    }

    /// All elements matching a selector list, in document order
    #[must_use]
    pub fn select(&self, selector: &SelectorList) -> Vec<&Element> {
        let mut out = Vec::new();
        self.any_element(|el, ancestors| {
            if selector.matches(el, ancestors) {
                out.push(el);
            }
            false
        });
        out
    }

    /// Serialize the whole document
    #[must_use]
    pub fn to_html(&self) -> String {
        serialize(&self.children)
    }
}

fn walk<'a>(
    nodes: &'a [Node],
    ancestors: &mut Vec<&'a Element>,
    visit: &mut impl FnMut(&'a Element, &[&'a Element]) -> bool,
) -> bool {
    for node in nodes {
        if let Node::Element(el) = node {
            if visit(el, ancestors) {
                return true;
            }
            ancestors.push(el);
            let stop = walk(&el.children, ancestors, visit);
            ancestors.pop();
            if stop {
                return true;
            }
        }
    }
    false
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => collect_text(&el.children, out),
            Node::Comment(_) | Node::Declaration(_) => {}
        }
    }
}

/// Decode character references in attribute text.
///
/// Handles the named references common in attribute values plus decimal
/// and hex numeric references. Anything unrecognised stays as written.
#[must_use]
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_reference(&tail[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Serialize a node list to markup
#[must_use]
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(el) => write_element(el, out),
        Node::Text(t) => out.push_str(t),
        Node::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        Node::Declaration(d) => {
            out.push('<');
            out.push_str(d);
            out.push('>');
        }
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attrs {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&attr.value.replace('"', "&quot;"));
        out.push('"');
    }
    out.push('>');
    if el.is_void() && el.children.is_empty() {
        return;
    }
    for child in &el.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert!(matches!(decode_entities("plain"), Cow::Borrowed("plain")));
        assert_eq!(decode_entities("Save &amp; exit"), "Save & exit");
        assert_eq!(decode_entities("&lt;b&gt; &quot;q&quot; &apos;"), "<b> \"q\" '");
        assert_eq!(decode_entities("&#38;&#x26;&#X41;"), "&&A");
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{a0}b");
        assert_eq!(decode_entities("R&D &bogus; &#xZZ; & ;"), "R&D &bogus; &#xZZ; & ;");
    }

    #[test]
    fn test_element_accessors() {
        let doc = Document::parse(r#"<button id="go" class="btn  primary" disabled>Go <b>now</b></button>"#);
        let button = doc.find_first("button").unwrap();
        assert_eq!(button.attr("id"), Some("go"));
        assert!(button.has_attr("disabled"));
        assert_eq!(button.classes().collect::<Vec<_>>(), vec!["btn", "primary"]);
        assert_eq!(button.text(), "Go now");
    }

    #[test]
    fn test_serialize_normalizes_attributes() {
        let doc = Document::parse("<input type=text disabled><p title='say \"hi\"'>x</p>");
        assert_eq!(
            doc.to_html(),
            r#"<input type="text" disabled=""><p title="say &quot;hi&quot;">x</p>"#
        );
    }

    #[test]
    fn test_serialize_is_stable_on_reparse() {
        let html = r#"<!DOCTYPE html><html><head><title>T</title></head><body><!-- c --><div a='1'>t &amp; u<br></div></body></html>"#;
        let once = Document::parse(html).to_html();
        let twice = Document::parse(&once).to_html();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_any_element_reports_ancestors() {
        let doc = Document::parse("<main><section><a id=x>x</a></section></main>");
        let mut chain = Vec::new();
        doc.any_element(|el, ancestors| {
            if el.name == "a" {
                chain = ancestors.iter().map(|a| a.name.clone()).collect();
                true
            } else {
                false
            }
        });
        assert_eq!(chain, vec!["main", "section"]);
    }

    #[test]
    fn test_select_returns_document_order() {
        let doc = Document::parse("<ul><li class=a>1</li><li>2</li><li class=a>3</li></ul>");
        let selector = SelectorList::parse("li.a").unwrap();
        let texts: Vec<String> = doc.select(&selector).iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["1", "3"]);
    }
}
