//! CSS selector subset for matching against an owned [`Document`](super::Document).
//!
//! Supported: selector lists, type/universal selectors, `#id`, `.class`,
//! attribute selectors (`[a]`, `=`, `~=`, `^=`, `$=`, `*=`), descendant and
//! child combinators. Pseudo-classes and sibling combinators are rejected.

use super::Element;
use thiserror::Error;

/// Selector parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// Nothing to parse
    #[error("empty selector")]
    Empty,
    /// Syntax outside the supported subset
    #[error("unsupported selector syntax '{found}' at position {position} in '{selector}'")]
    Unsupported {
        /// Full selector text
        selector: String,
        /// Character offset
        position: usize,
        /// Offending character
        found: char,
    },
    /// Attribute selector or string not closed
    #[error("unterminated selector '{0}'")]
    Unterminated(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    test: Option<(AttrOp, String)>,
}

impl AttrMatcher {
    fn matches(&self, element: &Element) -> bool {
        let Some(actual) = element.attr_decoded(&self.name) else {
            return false;
        };
        let actual = actual.as_ref();
        match &self.test {
            None => true,
            Some((AttrOp::Equals, v)) => actual == v,
            Some((AttrOp::Includes, v)) => actual.split_whitespace().any(|w| w == v),
            Some((AttrOp::Prefix, v)) => !v.is_empty() && actual.starts_with(v.as_str()),
            Some((AttrOp::Suffix, v)) => !v.is_empty() && actual.ends_with(v.as_str()),
            Some((AttrOp::Substring, v)) => !v.is_empty() && actual.contains(v.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if &element.name != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attr_decoded("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class = element.attr_decoded("class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|c| class.split_whitespace().any(|have| have == c))
            {
                return false;
            }
        }
        self.attrs.iter().all(|a| a.matches(element))
    }
}

/// One comma-free selector: compounds joined by combinators
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// `(combinator to the previous part, compound)`; the first combinator is unused
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, element: &Element, ancestors: &[&Element]) -> bool {
        match_from(&self.parts, self.parts.len() - 1, element, ancestors)
    }
}

fn match_from(
    parts: &[(Combinator, Compound)],
    idx: usize,
    element: &Element,
    ancestors: &[&Element],
) -> bool {
    let (combinator, compound) = &parts[idx];
    if !compound.matches(element) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match combinator {
        Combinator::Child => match ancestors.split_last() {
            Some((parent, rest)) => match_from(parts, idx - 1, parent, rest),
            None => false,
        },
        Combinator::Descendant => (0..ancestors.len())
            .rev()
            .any(|k| match_from(parts, idx - 1, ancestors[k], &ancestors[..k])),
    }
}

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let chars: Vec<char> = input.chars().collect();
        let mut parser = Parser {
            source: input,
            chars: &chars,
            pos: 0,
        };
        let mut selectors = vec![parser.complex()?];
        while parser.peek() == Some(',') {
            parser.pos += 1;
            selectors.push(parser.complex()?);
        }
        Ok(Self { selectors })
    }

    /// Whether `element`, with the given ancestors (root first), matches
    #[must_use]
    pub fn matches(&self, element: &Element, ancestors: &[&Element]) -> bool {
        self.selectors.iter().any(|s| s.matches(element, ancestors))
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: &'a [char],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_space(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unsupported(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unsupported {
                selector: self.source.to_string(),
                position: self.pos,
                found,
            },
            None => SelectorError::Unterminated(self.source.to_string()),
        }
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts: Vec<(Combinator, Compound)> = Vec::new();
        let mut pending = Combinator::Descendant;
        let mut dangling = false;
        loop {
            self.skip_space();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    if parts.is_empty() || dangling {
                        return Err(self.unsupported());
                    }
                    pending = Combinator::Child;
                    dangling = true;
                    self.pos += 1;
                }
                Some(_) => {
                    let compound = self.compound()?;
                    parts.push((pending, compound));
                    pending = Combinator::Descendant;
                    dangling = false;
                }
            }
        }
        if dangling {
            return Err(SelectorError::Unterminated(self.source.to_string()));
        }
        if parts.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Complex { parts })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();
        match self.peek() {
            Some('*') => self.pos += 1,
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident().to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    let id = self.ident();
                    if id.is_empty() {
                        return Err(self.unsupported());
                    }
                    compound.id = Some(id);
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.ident();
                    if class.is_empty() {
                        return Err(self.unsupported());
                    }
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                None | Some(',' | '>') => break,
                Some(c) if c.is_whitespace() => break,
                Some(_) => return Err(self.unsupported()),
            }
        }
        if self.pos == start {
            return Err(self.unsupported());
        }
        Ok(compound)
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                if let Some(&escaped) = self.chars.get(self.pos + 1) {
                    out.push(escaped);
                    self.pos += 2;
                    continue;
                }
                break;
            }
            if !is_ident_char(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn attribute(&mut self) -> Result<AttrMatcher, SelectorError> {
        self.skip_space();
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.unsupported());
        }
        self.skip_space();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrMatcher { name, test: None });
            }
            Some('=') => {
                self.pos += 1;
                AttrOp::Equals
            }
            Some(c @ ('~' | '^' | '$' | '*')) if self.chars.get(self.pos + 1) == Some(&'=') => {
                self.pos += 2;
                match c {
                    '~' => AttrOp::Includes,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            _ => return Err(self.unsupported()),
        };
        self.skip_space();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => return Err(SelectorError::Unterminated(self.source.to_string())),
                        Some(c) if c == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some('\\') => {
                            if let Some(&escaped) = self.chars.get(self.pos + 1) {
                                value.push(escaped);
                            }
                            self.pos += 2;
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                    }
                }
                value
            }
            _ => self.ident(),
        };
        self.skip_space();
        if self.peek() != Some(']') {
            return Err(self.unsupported());
        }
        self.pos += 1;
        Ok(AttrMatcher {
            name,
            test: Some((op, value)),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
