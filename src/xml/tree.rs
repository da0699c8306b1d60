//! Owned XML tree built from `quick-xml` events.
//!
//! Every element keeps the raw start/end events it was parsed from, and every
//! non-element node keeps its raw event. Serializing writes those events back
//! unchanged, so markup that is not edited is reproduced byte-for-byte.

use crate::container::decode_xml_bytes;
use crate::error::{Error, Result};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};

use super::namespace::ExpandedName;

/// A child of an element.
#[derive(Debug, Clone)]
pub enum Node {
    /// A nested element
    Element(Element),
    /// Text, CDATA, comments, processing instructions
    Other(Event<'static>),
}

/// An element together with its resolved namespace and children.
#[derive(Debug, Clone)]
pub struct Element {
    start: BytesStart<'static>,
    namespace: Option<String>,
    children: Vec<Node>,
    /// `None` for self-closing elements.
    end: Option<BytesEnd<'static>>,
}

/// A parsed XML document: prolog, a single root element, epilog.
#[derive(Debug, Clone)]
pub struct XmlTree {
    prolog: Vec<Event<'static>>,
    root: Element,
    epilog: Vec<Event<'static>>,
}

impl XmlTree {
    /// Parse raw part bytes, detecting UTF-8/UTF-16 encodings.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let xml = decode_xml_bytes(bytes)?;
        Self::parse(&xml)
    }

    /// Parse an XML string.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);

        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            let namespace = match resolved {
                ResolveResult::Bound(Namespace(uri)) => {
                    Some(String::from_utf8_lossy(uri).into_owned())
                }
                ResolveResult::Unbound => None,
                ResolveResult::Unknown(prefix) => {
                    return Err(Error::XmlParse(format!(
                        "undeclared namespace prefix '{}'",
                        String::from_utf8_lossy(&prefix)
                    )));
                }
            };

            match event {
                Event::Start(start) => stack.push(Element {
                    start: start.into_owned(),
                    namespace,
                    children: Vec::new(),
                    end: None,
                }),
                Event::Empty(start) => {
                    let element = Element {
                        start: start.into_owned(),
                        namespace,
                        children: Vec::new(),
                        end: None,
                    };
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(end) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| Error::XmlParse("unexpected closing tag".to_string()))?;
                    element.end = Some(end.into_owned());
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                Event::Text(ref text)
                    if stack.is_empty() && !text.iter().all(u8::is_ascii_whitespace) =>
                {
                    return Err(Error::XmlParse(
                        "text content outside the root element".to_string(),
                    ));
                }
                other => match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Other(other.into_owned())),
                    None if root.is_none() => prolog.push(other.into_owned()),
                    None => epilog.push(other.into_owned()),
                },
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::XmlParse(format!(
                "unclosed element <{}>",
                open.name()
            )));
        }
        let root = root.ok_or_else(|| Error::XmlParse("document has no root element".to_string()))?;

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    /// The document element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The document element, mutably.
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Serialize the tree back to UTF-8 bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.prolog {
            writer.write_event(event.borrow())?;
        }
        self.root.write(&mut writer)?;
        for event in &self.epilog {
            writer.write_event(event.borrow())?;
        }
        Ok(writer.into_inner())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::XmlParse("multiple root elements".to_string()));
    }
    *root = Some(element);
    Ok(())
}

/// Unescaped value of an attribute.
pub(crate) fn attribute_value(attr: &Attribute<'_>) -> Result<String> {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(|e| Error::XmlParse(e.to_string()))
}

/// Local part of a possibly prefixed name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

impl Element {
    /// Qualified name as written in the document (e.g. `c:numCache`).
    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.start.name().into_inner()).into_owned()
    }

    /// Local name without prefix.
    pub fn local_name(&self) -> &[u8] {
        local_name(self.start.name().into_inner())
    }

    /// Resolved namespace URI, if the element is in a namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Raw start tag, including namespace declarations.
    pub fn start(&self) -> &BytesStart<'static> {
        &self.start
    }

    /// Whether this element has the given namespace and local name.
    pub fn is(&self, name: ExpandedName<'_>) -> bool {
        self.namespace.as_deref() == Some(name.namespace)
            && self.local_name() == name.local.as_bytes()
    }

    /// All child nodes.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Other(_) => None,
        })
    }

    /// Child elements in document order, mutably.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Other(_) => None,
        })
    }

    /// First child element with the given name.
    pub fn child(&self, name: ExpandedName<'_>) -> Option<&Element> {
        self.elements().find(|e| e.is(name))
    }

    /// First child element with the given name, mutably.
    pub fn child_mut(&mut self, name: ExpandedName<'_>) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(name))
    }

    /// Detach the first child element with the given name.
    pub fn remove_child(&mut self, name: ExpandedName<'_>) -> Option<Element> {
        let idx = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.is(name)))?;
        match self.children.remove(idx) {
            Node::Element(e) => Some(e),
            Node::Other(_) => None,
        }
    }

    /// Detach every descendant element with the given name.
    ///
    /// Returns the number of removed subtrees.
    pub fn remove_descendants(&mut self, name: ExpandedName<'_>) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, Node::Element(e) if e.is(name)));
        let mut removed = before - self.children.len();
        for child in self.elements_mut() {
            removed += child.remove_descendants(name);
        }
        removed
    }

    /// Unescaped value of an unprefixed attribute.
    pub fn attribute(&self, key: &str) -> Result<Option<String>> {
        for attr in self.start.attributes() {
            let attr = attr?;
            if attr.key.as_ref() == key.as_bytes() {
                return attribute_value(&attr).map(Some);
            }
        }
        Ok(None)
    }

    /// Concatenated text and CDATA content of direct children.
    pub fn text(&self) -> Result<String> {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Other(Event::Text(text)) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::XmlParse(e.to_string()))?;
                    out.push_str(&text);
                }
                Node::Other(Event::CData(data)) => {
                    out.push_str(&String::from_utf8_lossy(data));
                }
                _ => {}
            }
        }
        Ok(out)
    }

    /// Replace all children with a single escaped text node.
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children
                .push(Node::Other(Event::Text(BytesText::new(text).into_owned())));
        }
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        if self.end.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(self.start.borrow()))?;
            return Ok(());
        }

        writer.write_event(Event::Start(self.start.borrow()))?;
        for node in &self.children {
            match node {
                Node::Element(e) => e.write(writer)?,
                Node::Other(event) => writer.write_event(event.borrow())?,
            }
        }
        match &self.end {
            Some(end) => writer.write_event(Event::End(end.borrow()))?,
            None => writer.write_event(Event::End(self.start.to_end()))?,
        }
        Ok(())
    }
}
