//! Generic parsed descriptor tree

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;

use crate::{CameraError, Result};

/// One named node of a parsed XML document.
///
/// The capability model walks this tree instead of binding the vendor's
/// vocabulary to Rust types, so unknown elements never fail a parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorNode {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    /// Concatenated text content, trimmed
    pub text: String,
    pub children: Vec<DescriptorNode>,
}

impl DescriptorNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Builder helper for constructing trees by hand.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder helper for constructing trees by hand.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder helper for constructing trees by hand.
    pub fn with_child(mut self, child: DescriptorNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&DescriptorNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// This node or the first descendant (depth-first) with the given name.
    pub fn find(&self, name: &str) -> Option<&DescriptorNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Depth-first pre-order traversal, including this node.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DescriptorNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Parse an XML document into its root node.
    pub fn parse_xml(xml: &str) -> Result<DescriptorNode> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        // Synthetic document node; its single element child is the root.
        let mut stack = vec![DescriptorNode::new("#document")];

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(node_from_start(&start)?),
                Event::Empty(start) => {
                    let node = node_from_start(&start)?;
                    push_child(&mut stack, node);
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(CameraError::parse("descriptor XML", "unbalanced end tag"));
                    }
                    if let Some(node) = stack.pop() {
                        push_child(&mut stack, node);
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    append_text(&mut stack, &String::from_utf8_lossy(&data));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(CameraError::parse(
                "descriptor XML",
                format!("{} unclosed element(s)", stack.len() - 1),
            ));
        }

        let mut document = stack.pop().unwrap_or_default();
        match document.children.len() {
            1 => Ok(document.children.remove(0)),
            0 => Err(CameraError::parse("descriptor XML", "document has no root element")),
            n => Err(CameraError::parse("descriptor XML", format!("{n} root elements"))),
        }
    }
}

fn node_from_start(start: &BytesStart<'_>) -> Result<DescriptorNode> {
    let mut node = DescriptorNode::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CameraError::parse("descriptor XML attribute", e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        node.attributes.insert(key, value);
    }
    Ok(node)
}

fn push_child(stack: &mut [DescriptorNode], node: DescriptorNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn append_text(stack: &mut [DescriptorNode], text: &str) {
    if let Some(node) = stack.last_mut() {
        node.text.push_str(text);
    }
}
