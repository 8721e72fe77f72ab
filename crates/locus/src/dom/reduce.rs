//! DOM reduction for inference prompts.
//!
//! Page markup is dominated by scripts, styles, icon graphics and
//! tracking attributes that say nothing about which element is which.
//! Reduction drops all of that and keeps the identifying skeleton.

use super::{serialize, Document, Element, Node};
use serde::{Deserialize, Serialize};

/// Element kinds removed together with their subtree
pub const REMOVED_ELEMENTS: &[&str] = &["script", "style", "svg", "iframe", "meta", "link"];

/// Attributes that survive reduction
pub const ALLOWED_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "class",
    "type",
    "role",
    "aria-label",
    "placeholder",
    "data-testid",
    "data-test",
    "data-test-id",
    "data-cy",
    "data-qa",
    "href",
    "value",
];

/// Reduction options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerOptions {
    /// Cap on characters kept per text node (`None` keeps everything)
    pub max_text_len: Option<usize>,
}

impl ReducerOptions {
    /// Truncate text nodes longer than `max` characters
    #[must_use]
    pub const fn with_max_text_len(mut self, max: usize) -> Self {
        self.max_text_len = Some(max);
        self
    }
}

/// Produces the reduced snapshot handed to inference
#[derive(Debug, Clone, Copy, Default)]
pub struct DomReducer {
    options: ReducerOptions,
}

impl DomReducer {
    /// Create a reducer with the given options
    #[must_use]
    pub const fn new(options: ReducerOptions) -> Self {
        Self { options }
    }

    /// Reducer options
    #[must_use]
    pub const fn options(&self) -> &ReducerOptions {
        &self.options
    }

    /// Reduce full page markup to its identifying skeleton.
    ///
    /// Works on a freshly parsed copy; the result depends only on `markup`.
    #[must_use]
    pub fn reduce(&self, markup: &str) -> String {
        let document = Document::parse(markup);
        let root = match document.find_first("body") {
            Some(body) => vec![Node::Element(body.clone())],
            None => document.children,
        };
        let reduced: Vec<Node> = root
            .into_iter()
            .filter_map(|node| self.reduce_node(node))
            .collect();
        serialize(&reduced)
    }

    fn reduce_node(&self, node: Node) -> Option<Node> {
        match node {
            Node::Element(element) => self.reduce_element(element).map(Node::Element),
            Node::Text(text) => self.reduce_text(&text).map(Node::Text),
            Node::Comment(_) | Node::Declaration(_) => None,
        }
    }

    fn reduce_element(&self, mut element: Element) -> Option<Element> {
        if REMOVED_ELEMENTS.contains(&element.name.as_str()) {
            return None;
        }
        element
            .attrs
            .retain(|attr| ALLOWED_ATTRIBUTES.contains(&attr.name.as_str()));
        element.children = std::mem::take(&mut element.children)
            .into_iter()
            .filter_map(|child| self.reduce_node(child))
            .collect();
        Some(element)
    }

    /// Collapse whitespace runs; drop whitespace-only nodes.
    fn reduce_text(&self, text: &str) -> Option<String> {
        let mut collapsed = String::with_capacity(text.len());
        let mut in_space = false;
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !in_space {
                    collapsed.push(' ');
                }
                in_space = true;
            } else {
                collapsed.push(ch);
                in_space = false;
            }
        }
        if collapsed.trim().is_empty() {
            return None;
        }
        match self.options.max_text_len {
            Some(max) if collapsed.chars().count() > max => {
                let mut truncated: String = collapsed.chars().take(max).collect();
                truncated.push('…');
                Some(truncated)
            }
            _ => Some(collapsed),
        }
    }
}
