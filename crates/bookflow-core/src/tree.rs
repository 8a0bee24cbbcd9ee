//! Document tree assembly.
//!
//! [`TreeBuilder`] is the reference consumer of the event stream: it folds
//! tag/attribute/text events into an element tree suitable for downstream
//! rendering or serialization. Parsers stay oblivious to it; any
//! [`DocumentSink`] implementation can replace it.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::event::{DocumentSink, TextFlags};

/// One attribute of an element, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Namespace prefix, if the source wrote `ns:name`.
    pub ns: Option<String>,
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

/// A text run with its source byte range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Decoded text content.
    pub text: String,
    /// Absolute byte offset of the source range.
    pub fpos: u64,
    /// Byte length of the source range.
    pub fsize: u64,
}

/// An element node: name, attributes, ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Namespace prefix, if any.
    pub ns: Option<String>,
    /// Element name. Processing-instruction pseudo-elements keep their `?`
    /// prefix (`?xml`).
    pub name: String,
    /// Attributes in definition order.
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Text run.
    Text(TextSpan),
}

impl Element {
    /// Creates an element with no attributes or children.
    #[must_use]
    pub fn new(ns: Option<&str>, name: &str) -> Self {
        Self {
            ns: ns.map(str::to_string),
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// First child element with the given name, if any.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|n| match n {
            Node::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// All child elements with the given name.
    #[must_use]
    pub fn children_named(&self, name: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Element(e) if e.name == name => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Value of the named attribute, if present.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Concatenated text of all descendant text runs.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(span) => out.push_str(&span.text),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }
}

/// The assembled document: top-level nodes plus stream facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Top-level nodes: usually one `?xml` pseudo-element and one root element.
    pub items: Vec<Node>,
    /// Last charset reported via `on_encoding`, if any.
    pub encoding: Option<String>,
}

impl Document {
    /// The root element: the first top-level element that is not a
    /// processing-instruction pseudo-element.
    #[must_use]
    pub fn root(&self) -> Option<&Element> {
        self.items.iter().find_map(|n| match n {
            Node::Element(e) if !e.name.starts_with('?') => Some(e),
            _ => None,
        })
    }
}

/// Sink that assembles a [`Document`] from the event stream.
///
/// Unbalanced closes are tolerated the same way the parsers tolerate bad
/// markup: a close with no matching open is dropped with a warning, and
/// anything still open at `on_stop` is closed implicitly.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    finished: Vec<Node>,
    stack: Vec<Element>,
    encoding: Option<String>,
}

impl TreeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the builder and returns the assembled document.
    ///
    /// Elements left open by a truncated stream are attached to their parents
    /// as-is.
    #[must_use]
    pub fn into_document(mut self) -> Document {
        while let Some(open) = self.stack.pop() {
            self.attach(Node::Element(open));
        }
        Document {
            items: self.finished,
            encoding: self.encoding,
        }
    }

    fn attach(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        } else {
            self.finished.push(node);
        }
    }
}

impl DocumentSink for TreeBuilder {
    fn on_encoding(&mut self, name: &str, _table: Option<&[char; 128]>) {
        self.encoding = Some(name.to_string());
    }

    fn on_tag_open(&mut self, ns: Option<&str>, name: &str) {
        self.stack.push(Element::new(ns, name));
    }

    fn on_tag_close(&mut self, _ns: Option<&str>, name: &str) {
        match self.stack.pop() {
            Some(open) => {
                if open.name != name {
                    warn!("closing <{}> while <{}> is open", name, open.name);
                }
                self.attach(Node::Element(open));
            }
            None => warn!("dropping close of <{name}> with no open element"),
        }
    }

    fn on_attribute(&mut self, ns: Option<&str>, name: &str, value: &str) {
        if let Some(open) = self.stack.last_mut() {
            open.attributes.push(Attribute {
                ns: ns.map(str::to_string),
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    fn on_text(&mut self, text: &str, fpos: u64, fsize: u64, _flags: TextFlags) {
        if text.is_empty() {
            return;
        }
        self.attach(Node::Text(TextSpan {
            text: text.to_string(),
            fpos,
            fsize,
        }));
    }
}
