//! Minimal XML element tree
//!
//! Built with quick-xml. Reading stops at the first syntax error and whatever
//! was read so far is kept, so a malformed document still yields a tree.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// An XML element with its attributes, text and child elements
///
/// The tree returned by [`XmlNode::parse`] is rooted at a nameless document
/// node whose children are the top-level elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parses `bytes`, recovering from errors by keeping the partial tree
    pub fn parse(bytes: &[u8]) -> Self {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut stack = vec![XmlNode::default()];
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(start)) => stack.push(Self::from_start(&start)),
                Ok(Event::Empty(start)) => {
                    let node = Self::from_start(&start);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Ok(Event::End(_)) => close_top(&mut stack),
                Ok(Event::Text(text)) => {
                    let text = text
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&text);
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    tracing::debug!(
                        "XML error at byte {}, keeping partial tree: {}",
                        reader.buffer_position(),
                        e
                    );
                    break;
                }
                Ok(_) => {}
            }
            buf.clear();
        }

        while stack.len() > 1 {
            close_top(&mut stack);
        }
        stack.pop().unwrap_or_default()
    }

    fn from_start(start: &BytesStart<'_>) -> Self {
        let attributes = start
            .attributes()
            .filter_map(|attr| attr.ok())
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();

        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            ..Default::default()
        }
    }

    /// Element name (empty for the document node)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the attribute `name`
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text directly inside this element
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// First descendant named `name`, depth first
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.find(name)
            }
        })
    }

    /// Every descendant named `name`, in document order
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a XmlNode> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect(name, found);
        }
    }
}

/// Pops the innermost open element into its parent
fn close_top(stack: &mut Vec<XmlNode>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(node) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        }
    }
}
