//! Tolerant markup tokenizer and tree builder.
//!
//! Handles what browsers emit from `outerHTML` plus the usual hand-written
//! sloppiness: unquoted and bare attributes, stray end tags, unclosed
//! elements. Implicit end tags (`<p>`, `<li>`) are not inferred.

use super::{Attribute, Document, Element, Node, VOID_ELEMENTS};

/// Elements whose content is not markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, PartialEq, Eq)]
enum Token {
    StartTag {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag(String),
    Text(String),
    Comment(String),
    Declaration(String),
}

pub(super) fn parse(markup: &str) -> Document {
    let mut tokenizer = Tokenizer::new(markup);
    let mut builder = TreeBuilder::default();
    while let Some(token) = tokenizer.next_token() {
        builder.push(token);
    }
    builder.finish()
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw_text_end: Option<String>,
}

/// Offset of the first `</tag` in `haystack`, tag compared ASCII
/// case-insensitively.
fn find_close_tag(haystack: &[u8], tag: &[u8]) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = haystack[from..].windows(2).position(|w| w == b"</") {
        let at = from + offset;
        let name = &haystack[at + 2..];
        if name.len() >= tag.len() && name[..tag.len()].eq_ignore_ascii_case(tag) {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

const fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

impl<'a> Tokenizer<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text_end: None,
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        if let Some(tag) = self.raw_text_end.take() {
            if let Some(text) = self.raw_text(&tag) {
                return Some(Token::Text(text));
            }
        }
        if self.pos >= self.input.len() {
            return None;
        }

        let rest = &self.input[self.pos..];
        let next = rest.as_bytes().get(1).copied().unwrap_or(0);
        if rest.starts_with("<!--") {
            Some(self.comment())
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            Some(self.declaration())
        } else if rest.starts_with("</") && rest.as_bytes().get(2).is_some_and(u8::is_ascii_alphabetic)
        {
            Some(self.end_tag())
        } else if rest.starts_with('<') && next.is_ascii_alphabetic() {
            Some(self.start_tag())
        } else {
            Some(self.text())
        }
    }

    /// Consume everything up to `</tag`, returning it unless empty.
    fn raw_text(&mut self, tag: &str) -> Option<String> {
        let rest = &self.input[self.pos..];
        let end = find_close_tag(rest.as_bytes(), tag.as_bytes()).unwrap_or(rest.len());
        self.pos += end;
        (end > 0).then(|| rest[..end].to_string())
    }

    fn text(&mut self) -> Token {
        let rest = &self.input[self.pos..];
        // a lone '<' that starts nothing is plain text
        let first = rest.chars().next().map_or(1, char::len_utf8);
        let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
        self.pos += end;
        Token::Text(rest[..end].to_string())
    }

    fn comment(&mut self) -> Token {
        let body = &self.input[self.pos + 4..];
        let (content, consumed) = match body.find("-->") {
            Some(i) => (&body[..i], i + 3),
            None => (body, body.len()),
        };
        self.pos += 4 + consumed;
        Token::Comment(content.to_string())
    }

    fn declaration(&mut self) -> Token {
        let body = &self.input[self.pos + 1..];
        let (content, consumed) = match body.find('>') {
            Some(i) => (&body[..i], i + 1),
            None => (body, body.len()),
        };
        self.pos += 1 + consumed;
        Token::Declaration(content.to_string())
    }

    fn end_tag(&mut self) -> Token {
        let bytes = self.input.as_bytes();
        let mut i = self.pos + 2;
        let start = i;
        while i < bytes.len() && !is_space(bytes[i]) && bytes[i] != b'>' && bytes[i] != b'/' {
            i += 1;
        }
        let name = self.input[start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i] != b'>' {
            i += 1;
        }
        self.pos = (i + 1).min(bytes.len());
        Token::EndTag(name)
    }

    fn start_tag(&mut self) -> Token {
        let input = self.input;
        let bytes = input.as_bytes();
        let len = bytes.len();
        let mut i = self.pos + 1;

        let start = i;
        while i < len && !is_space(bytes[i]) && bytes[i] != b'>' && bytes[i] != b'/' {
            i += 1;
        }
        let name = input[start..i].to_ascii_lowercase();

        let mut attrs: Vec<Attribute> = Vec::new();
        let mut self_closing = false;
        loop {
            while i < len && is_space(bytes[i]) {
                i += 1;
            }
            if i >= len {
                break;
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    i += 1;
                    if i < len && bytes[i] == b'>' {
                        self_closing = true;
                        i += 1;
                        break;
                    }
                }
                _ => {
                    let name_start = i;
                    while i < len && !is_space(bytes[i]) && !matches!(bytes[i], b'=' | b'>' | b'/')
                    {
                        i += 1;
                    }
                    if i == name_start {
                        // stray '='
                        i += 1;
                        continue;
                    }
                    let attr_name = input[name_start..i].to_ascii_lowercase();

                    let mut j = i;
                    while j < len && is_space(bytes[j]) {
                        j += 1;
                    }
                    let value = if j < len && bytes[j] == b'=' {
                        i = j + 1;
                        while i < len && is_space(bytes[i]) {
                            i += 1;
                        }
                        if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                            let quote = bytes[i];
                            i += 1;
                            let value_start = i;
                            while i < len && bytes[i] != quote {
                                i += 1;
                            }
                            let value = input[value_start..i].to_string();
                            if i < len {
                                i += 1;
                            }
                            value
                        } else {
                            let value_start = i;
                            while i < len && !is_space(bytes[i]) && bytes[i] != b'>' {
                                i += 1;
                            }
                            input[value_start..i].to_string()
                        }
                    } else {
                        String::new()
                    };

                    // duplicate attributes: first one wins
                    if !attrs.iter().any(|a| a.name == attr_name) {
                        attrs.push(Attribute {
                            name: attr_name,
                            value,
                        });
                    }
                }
            }
        }
        self.pos = i;

        if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text_end = Some(name.clone());
        }
        Token::StartTag {
            name,
            attrs,
            self_closing,
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn push(&mut self, token: Token) {
        match token {
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                let void = VOID_ELEMENTS.contains(&name.as_str());
                let element = Element {
                    name,
                    attrs,
                    children: Vec::new(),
                };
                if self_closing || void {
                    self.append(Node::Element(element));
                } else {
                    self.open.push(element);
                }
            }
            Token::EndTag(name) => {
                if let Some(idx) = self.open.iter().rposition(|e| e.name == name) {
                    while self.open.len() > idx {
                        self.close_one();
                    }
                }
            }
            Token::Text(text) => self.append(Node::Text(text)),
            Token::Comment(text) => self.append(Node::Comment(text)),
            Token::Declaration(text) => self.append(Node::Declaration(text)),
        }
    }

    fn append(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn close_one(&mut self) {
        if let Some(element) = self.open.pop() {
            self.append(Node::Element(element));
        }
    }

    fn finish(mut self) -> Document {
        while !self.open.is_empty() {
            self.close_one();
        }
        Document {
            children: self.root,
        }
    }
}
