//! Generic XML document tree.
//!
//! OVF descriptors are loaded into a small arena-backed tree that supports the
//! lookups every extractor needs: elements by name anywhere in the document,
//! ordered iteration over direct children, depth-first traversal, attribute
//! lookup and concatenated text content.
//!
//! OVF producers are inconsistent about namespace prefixes (`ovf:href` vs.
//! `href`, `rasd:InstanceID` vs. `InstanceID`), so every name comparison goes
//! through [`matches_local_name`]. The reader is deliberately not
//! namespace-aware: fragments using undeclared prefixes load fine.

use std::str::FromStr;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

/// Returns true if `name` is `wanted` or ends in `:wanted`.
///
/// ```
/// use ovfkit_core::xml::matches_local_name;
///
/// assert!(matches_local_name("rasd:HostResource", "HostResource"));
/// assert!(matches_local_name("File", "File"));
/// assert!(!matches_local_name("ovf:FileSection", "File"));
/// ```
pub fn matches_local_name(name: &str, wanted: &str) -> bool {
    name == wanted
        || name
            .strip_suffix(wanted)
            .is_some_and(|prefix| prefix.ends_with(':'))
}

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<NodeId>,
    },
    Text(String),
    CData(String),
    /// Raw (still escaped) comment body.
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    /// Parse a document from an XML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Xml`] for malformed input: mismatched or unclosed
    /// tags, a missing or duplicated root element, or non-whitespace text
    /// outside the root element.
    pub fn parse_str(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut nodes: Vec<NodeData> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::xml(format!("{} at position {}", e, reader.buffer_position()))
            })?;

            match event {
                Event::Start(ref start) | Event::Empty(ref start) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let id = NodeId(nodes.len());
                    let parent = stack.last().copied();
                    nodes.push(NodeData {
                        parent,
                        kind: NodeKind::Element {
                            name: decode_name(start.name().as_ref())?,
                            attributes: read_attributes(start)?,
                            children: Vec::new(),
                        },
                    });

                    match parent {
                        Some(parent) => push_child(&mut nodes, parent, id),
                        None if root.is_some() => {
                            return Err(Error::xml(format!(
                                "more than one root element at position {}",
                                reader.buffer_position()
                            )));
                        }
                        None => root = Some(id),
                    }

                    if !is_empty {
                        stack.push(id);
                    }
                }
                Event::End(_) => {
                    if stack.pop().is_none() {
                        return Err(Error::xml(format!(
                            "unexpected end tag at position {}",
                            reader.buffer_position()
                        )));
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    match stack.last().copied() {
                        Some(parent) => append_leaf(&mut nodes, parent, NodeKind::Text(text)),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(Error::xml(format!(
                                "content outside of the root element at position {}",
                                reader.buffer_position()
                            )));
                        }
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    match stack.last().copied() {
                        Some(parent) => append_leaf(&mut nodes, parent, NodeKind::CData(text)),
                        None => {
                            return Err(Error::xml(format!(
                                "CDATA outside of the root element at position {}",
                                reader.buffer_position()
                            )));
                        }
                    }
                }
                Event::Comment(comment) => {
                    // Comments outside the root element are dropped.
                    if let Some(parent) = stack.last().copied() {
                        let body = String::from_utf8_lossy(&comment).into_owned();
                        append_leaf(&mut nodes, parent, NodeKind::Comment(body));
                    }
                }
                Event::Eof => break,
                // Declarations, processing instructions and doctypes carry
                // nothing an OVF consumer reads.
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            let name = match &nodes[open.0].kind {
                NodeKind::Element { name, .. } => name.clone(),
                _ => String::new(),
            };
            return Err(Error::xml(format!("unclosed element <{}>", name)));
        }

        let root = root.ok_or_else(|| Error::xml("document has no root element"))?;
        Ok(Self { nodes, root })
    }

    /// The root element.
    pub fn root(&self) -> Node<'_> {
        self.node(self.root)
    }

    /// Handle for the node with the given id.
    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { doc: self, id }
    }

    /// All elements (root included) whose local name is `name`, in document order.
    pub fn elements_by_name(&self, name: &str) -> Vec<Node<'_>> {
        self.root()
            .descendants()
            .filter(|node| node.has_local_name(name))
            .collect()
    }

    /// Remove a node from its parent. The root element cannot be detached.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.0].parent.take() else {
            return;
        };
        if let NodeKind::Element { children, .. } = &mut self.nodes[parent.0].kind {
            children.retain(|child| *child != id);
        }
    }

    /// Serialize the document, prefixed by an XML declaration.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        write_event(&mut writer, Event::Text(BytesText::new("\n")))?;
        self.write_node(&mut writer, self.root)?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::xml(format!("serialized document is not UTF-8: {}", e)))
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        match &self.nodes[id.0].kind {
            NodeKind::Element {
                name,
                attributes,
                children,
            } => {
                let mut start = BytesStart::new(name.as_str());
                for (key, value) in attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if children.is_empty() {
                    write_event(writer, Event::Empty(start))?;
                } else {
                    write_event(writer, Event::Start(start))?;
                    for child in children {
                        self.write_node(writer, *child)?;
                    }
                    write_event(writer, Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
            NodeKind::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
            NodeKind::CData(text) => {
                write_event(writer, Event::CData(BytesCData::new(text.as_str())))?
            }
            NodeKind::Comment(body) => write_event(
                writer,
                Event::Comment(BytesText::from_escaped(body.as_str())),
            )?,
        }
        Ok(())
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

/// A borrowed handle to one node of a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Node<'a> {
    /// Arena id of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Qualified tag name, or the empty string for non-element nodes.
    pub fn name(&self) -> &'a str {
        match &self.data().kind {
            NodeKind::Element { name, .. } => name,
            _ => "",
        }
    }

    /// Whether this node is an element.
    pub fn is_element(&self) -> bool {
        matches!(self.data().kind, NodeKind::Element { .. })
    }

    /// Whether this is an element whose local name is `wanted`.
    pub fn has_local_name(&self, wanted: &str) -> bool {
        self.is_element() && matches_local_name(self.name(), wanted)
    }

    /// Value of the first attribute whose local name is `name`.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|(key, _)| matches_local_name(key, name))
            .map(|(_, value)| value.as_str())
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> &'a [(String, String)] {
        match &self.data().kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// The parent element, if still attached.
    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| self.doc.node(id))
    }

    /// Direct children of any kind, in document order.
    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        let children: &'a [NodeId] = match &self.data().kind {
            NodeKind::Element { children, .. } => children,
            _ => &[],
        };
        children.iter().map(move |&id| Node { doc, id })
    }

    /// Direct child elements, in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.children().filter(|child| child.is_element())
    }

    /// Direct child elements with the given local name.
    pub fn children_named(&self, name: &str) -> Vec<Node<'a>> {
        self.child_elements()
            .filter(|child| matches_local_name(child.name(), name))
            .collect()
    }

    /// First direct child element with the given local name.
    pub fn first_child_named(&self, name: &str) -> Option<Node<'a>> {
        self.child_elements()
            .find(|child| matches_local_name(child.name(), name))
    }

    /// Text content of the first direct child element named `name`.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.first_child_named(name).map(|child| child.text())
    }

    /// Concatenated text of this node and all its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.data().kind {
            NodeKind::Text(text) | NodeKind::CData(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
            NodeKind::Comment(_) => {}
        }
    }

    /// Depth-first, pre-order traversal over this element and every element below it.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            doc: self.doc,
            stack: vec![self.id],
        }
    }

    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.id.0]
    }
}

/// Iterator returned by [`Node::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let NodeKind::Element { children, .. } = &self.doc.nodes[id.0].kind {
                self.stack.extend(children.iter().rev().copied());
                return Some(self.doc.node(id));
            }
        }
        None
    }
}

fn decode_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| Error::xml(format!("tag name is not valid UTF-8: {}", e)))
}

fn read_attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|e| Error::xml(e.to_string()))?;
            let key = decode_name(attr.key.as_ref())?;
            let value = attr.unescape_value()?.into_owned();
            Ok((key, value))
        })
        .collect()
}

fn push_child(nodes: &mut [NodeData], parent: NodeId, child: NodeId) {
    if let NodeKind::Element { children, .. } = &mut nodes[parent.0].kind {
        children.push(child);
    }
}

fn append_leaf(nodes: &mut Vec<NodeData>, parent: NodeId, kind: NodeKind) {
    let id = NodeId(nodes.len());
    nodes.push(NodeData {
        parent: Some(parent),
        kind,
    });
    push_child(nodes, parent, id);
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::xml(format!("failed to serialize document: {}", e)))
}
