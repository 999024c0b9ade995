//! Generic XML decoding.
//!
//! Turns a document into a tree where every element is an [`XmlNode`] holding
//! its attributes, its own text, and its children grouped by element name.
//! Children are always array-wrapped, even when an element occurs once, so
//! consumers never have to distinguish "one" from "many". The decoder has no
//! knowledge of any particular feed; shape assumptions belong to callers.

use std::collections::BTreeMap;

use bookshelf_shared::{BookshelfError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A decoded XML document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// Name of the root element.
    pub root_name: String,
    /// The root element itself.
    pub root: XmlNode,
}

/// One decoded element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    attributes: BTreeMap<String, String>,
    text: String,
    children: BTreeMap<String, Vec<XmlNode>>,
}

impl XmlNode {
    /// Value of the attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Character data directly inside this element (empty for containers).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All children named `name`, in document order.
    pub fn all(&self, name: &str) -> &[XmlNode] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first child named `name`.
    pub fn first(&self, name: &str) -> Option<&XmlNode> {
        self.all(name).first()
    }

    /// Text of the first child named `name`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.first(name).map(XmlNode::text)
    }

    /// Remove and return all children named `name`.
    pub fn take_all(&mut self, name: &str) -> Vec<XmlNode> {
        self.children.remove(name).unwrap_or_default()
    }

    fn push_child(&mut self, name: String, child: XmlNode) {
        self.children.entry(name).or_default().push(child);
    }

    /// Drop inter-element whitespace from container elements.
    fn finish(mut self) -> Self {
        if !self.children.is_empty() && self.text.trim().is_empty() {
            self.text.clear();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decode an XML payload into a generic tree.
///
/// Fails with a parse error when the payload is not well-formed: syntax
/// errors, mismatched or unclosed tags, a missing root element, or content
/// after the root element.
pub fn decode(xml: &str) -> Result<XmlDocument> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<(String, XmlNode)> = Vec::new();
    let mut root: Option<XmlDocument> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            BookshelfError::parse(format!("at byte {}: {e}", reader.error_position()))
        })?;

        match event {
            Event::Start(e) => {
                ensure_no_root(&root)?;
                stack.push(open_element(&e)?);
            }
            Event::Empty(e) => {
                ensure_no_root(&root)?;
                let (name, node) = open_element(&e)?;
                close_element(&mut stack, &mut root, name, node);
            }
            Event::End(e) => {
                let Some((name, node)) = stack.pop() else {
                    return Err(BookshelfError::parse(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                };
                close_element(&mut stack, &mut root, name, node);
            }
            Event::Text(e) => {
                let text = String::from_utf8_lossy(e.as_ref());
                push_text(&mut stack, &text)?;
            }
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                let reference = format!("&{entity};");
                let resolved = quick_xml::escape::unescape(&reference)
                    .map_err(|err| BookshelfError::parse(format!("entity &{entity};: {err}")))?;
                push_text(&mut stack, &resolved)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(e.as_ref());
                push_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
    }

    if let Some((name, _)) = stack.last() {
        return Err(BookshelfError::parse(format!("unclosed element <{name}>")));
    }

    root.ok_or_else(|| BookshelfError::parse("document has no root element"))
}

fn ensure_no_root(root: &Option<XmlDocument>) -> Result<()> {
    match root {
        Some(doc) => Err(BookshelfError::parse(format!(
            "element found after root element <{}>",
            doc.root_name
        ))),
        None => Ok(()),
    }
}

fn open_element(e: &BytesStart<'_>) -> Result<(String, XmlNode)> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut node = XmlNode::default();

    for attr in e.attributes() {
        let attr = attr.map_err(|err| BookshelfError::parse(format!("<{name}>: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|err| BookshelfError::parse(format!("<{name} {key}>: {err}")))?;
        node.attributes.insert(key, value.into_owned());
    }

    Ok((name, node))
}

fn close_element(
    stack: &mut [(String, XmlNode)],
    root: &mut Option<XmlDocument>,
    name: String,
    node: XmlNode,
) {
    let node = node.finish();
    match stack.last_mut() {
        Some((_, parent)) => parent.push_child(name, node),
        None => {
            *root = Some(XmlDocument {
                root_name: name,
                root: node,
            })
        }
    }
}

fn push_text(stack: &mut [(String, XmlNode)], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some((_, node)) => {
            node.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(BookshelfError::parse("text content outside the root element")),
    }
}
