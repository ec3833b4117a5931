//! Generic XML tree conversion.
//!
//! Turns raw markup into an [`XmlNode`] graph without any knowledge of the
//! timetable format. A tag that occurs once under its parent is stored as a
//! single node; a tag that repeats becomes a [`XmlNode::List`]. Consumers go
//! through [`as_sequence`] whenever they treat a tag as a collection.

use std::fmt::Display;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::TimetableError;

/// Key under which an element's text is stored when it also has attributes
/// or child elements.
pub const TEXT_KEY: &str = "#text";

/// Prefix for attribute keys.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Generic XML value graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Text-only element (trimmed). Empty elements become `Text("")`.
    Text(String),
    /// Element with attributes and/or children, in document order.
    Element(Vec<(String, XmlNode)>),
    /// All occurrences of a repeated tag, in document order.
    List(Vec<XmlNode>),
}

impl XmlNode {
    /// Looks up a child (or `@attribute`) by tag name.
    ///
    /// Returns `None` for text and list nodes.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Self> {
        match self {
            Self::Element(entries) => entries
                .iter()
                .find_map(|(key, value)| (key == tag).then_some(value)),
            Self::Text(_) | Self::List(_) => None,
        }
    }

    /// Follows a path of tag names from this node.
    #[must_use]
    pub fn path(&self, tags: &[&str]) -> Option<&Self> {
        tags.iter().try_fold(self, |node, tag| node.get(tag))
    }

    /// Scalar text of this node.
    ///
    /// An element carrying attributes exposes its text under `#text`; an
    /// attributed element without text yields `None`.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Element(_) => self.get(TEXT_KEY).and_then(Self::text),
            Self::List(_) => None,
        }
    }

    /// Returns `true` if the element carries the attribute `name`.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        match self {
            Self::Element(entries) => entries.iter().any(|(key, _)| {
                key.strip_prefix(ATTRIBUTE_PREFIX)
                    .is_some_and(|attr| attr == name)
            }),
            Self::Text(_) | Self::List(_) => false,
        }
    }
}

/// Normalizes a "one or many" node into a slice.
///
/// A [`XmlNode::List`] yields its items; any other node is a sequence of one.
#[must_use]
pub fn as_sequence(node: &XmlNode) -> &[XmlNode] {
    match node {
        XmlNode::List(items) => items,
        XmlNode::Text(_) | XmlNode::Element(_) => std::slice::from_ref(node),
    }
}

/// An element that has been opened but not yet closed.
#[derive(Debug)]
struct OpenElement {
    name: String,
    entries: Vec<(String, XmlNode)>,
    text: String,
}

impl OpenElement {
    /// Closes the element, deciding between a text node and a mapping.
    fn finish(self) -> (String, XmlNode) {
        let text = self.text.trim();
        let node = if self.entries.is_empty() {
            XmlNode::Text(String::from(text))
        } else {
            let mut entries = self.entries;
            if !text.is_empty() {
                entries.push((String::from(TEXT_KEY), XmlNode::Text(String::from(text))));
            }
            XmlNode::Element(entries)
        };
        (self.name, node)
    }
}

/// Inserts a child, turning a second occurrence of the same tag into a list.
fn insert_child(entries: &mut Vec<(String, XmlNode)>, name: String, node: XmlNode) {
    let Some((_, existing)) = entries.iter_mut().find(|(key, _)| *key == name) else {
        entries.push((name, node));
        return;
    };
    match existing {
        XmlNode::List(items) => items.push(node),
        XmlNode::Text(_) | XmlNode::Element(_) => {
            let first = std::mem::replace(existing, XmlNode::List(Vec::new()));
            *existing = XmlNode::List(vec![first, node]);
        }
    }
}

fn malformed(position: impl Display, detail: impl Display) -> TimetableError {
    TimetableError::MalformedDocument(format!("at byte {position}: {detail}"))
}

/// Reads the tag name and attributes of a start tag.
fn open_element(
    start: &BytesStart<'_>,
    position: impl Display + Copy,
) -> Result<OpenElement, TimetableError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut entries = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(position, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref());
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map_err(|e| malformed(position, e))?;
        insert_child(
            &mut entries,
            format!("{ATTRIBUTE_PREFIX}{key}"),
            XmlNode::Text(value.into_owned()),
        );
    }
    Ok(OpenElement {
        name,
        entries,
        text: String::new(),
    })
}

/// Parses raw markup into a generic tree.
///
/// The returned node is an [`XmlNode::Element`] holding exactly one entry:
/// the document's root element.
///
/// # Errors
///
/// Returns [`TimetableError::MalformedDocument`] if the input is not
/// well-formed XML (syntax error, mismatched or unclosed tags, missing root
/// element, multiple root elements, text outside the root).
pub fn parse(raw: &str) -> Result<XmlNode, TimetableError> {
    let mut reader = Reader::from_str(raw);
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<(String, XmlNode)> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| malformed(position, e))?;

        let closed = match event {
            Event::Start(start) => {
                stack.push(open_element(&start, position)?);
                None
            }
            Event::Empty(start) => Some(open_element(&start, position)?.finish()),
            Event::End(_) => stack.pop().map(OpenElement::finish),
            Event::Text(text) => {
                let raw_text = String::from_utf8_lossy(&text);
                let value = unescape(&raw_text).map_err(|e| malformed(position, e))?;
                append_text(&mut stack, &value, position)?;
                None
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data);
                append_text(&mut stack, &value, position)?;
                None
            }
            Event::GeneralRef(reference) => {
                let entity = format!("&{};", String::from_utf8_lossy(&reference));
                let value = unescape(&entity).map_err(|e| malformed(position, e))?;
                append_text(&mut stack, &value, position)?;
                None
            }
            Event::Eof => break,
            _ => None,
        };

        let Some((name, node)) = closed else {
            continue;
        };
        if let Some(parent) = stack.last_mut() {
            insert_child(&mut parent.entries, name, node);
        } else if root.is_some() {
            return Err(malformed(position, format!("second root element <{name}>")));
        } else {
            root = Some((name, node));
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(
            reader.buffer_position(),
            format!("unclosed element <{}>", open.name),
        ));
    }
    let (name, node) = root.ok_or_else(|| malformed(0, "no root element"))?;
    Ok(XmlNode::Element(vec![(name, node)]))
}

/// Appends character data to the innermost open element.
fn append_text(
    stack: &mut [OpenElement],
    value: &str,
    position: impl Display,
) -> Result<(), TimetableError> {
    match stack.last_mut() {
        Some(open) => {
            open.text.push_str(value);
            Ok(())
        }
        None if value.trim().is_empty() => Ok(()),
        None => Err(malformed(position, "text outside the root element")),
    }
}
