//! Owned document tree for law exports.
//!
//! A [`LawDocument`] is parsed once from the XML text contained in a snapshot
//! archive and then shared by every consumer: the fingerprinting code walks the
//! whole tree, the citation resolver and the renderer query a few well-known
//! paths.
//!
//! The tree keeps every element, attribute and text node exactly as parsed.
//! Comments and processing instructions are dropped; the DTD reference the
//! publisher puts in front of each export is accepted but never resolved.
//!
//! # Examples
//!
//! ```rust
//! use canonical::LawDocument;
//!
//! let doc = LawDocument::parse(
//!     r#"<dokumente builddate="20190101"><norm><metadaten><jurabk>BGB</jurabk></metadaten></norm></dokumente>"#,
//! ).unwrap();
//!
//! assert_eq!(doc.root().name, "dokumente");
//! assert_eq!(doc.root().attribute("builddate"), Some("20190101"));
//! let abbrev = doc.root().descendants("jurabk").next().unwrap();
//! assert_eq!(abbrev.text(), "BGB");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;

/// A node in the document tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes in document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of the attribute `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child element called `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    /// All descendant elements called `name`, in document order.
    ///
    /// The element itself is not included.
    pub fn descendants<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        Descendants {
            stack: self.elements().collect::<Vec<_>>().into_iter().rev().collect(),
        }
        .filter(move |el| el.name == name)
    }

    /// Concatenated text of this element and all of its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Copy of the tree with every attribute called `name` removed, at any depth.
    pub fn without_attribute(&self, name: &str) -> XmlElement {
        XmlElement {
            name: self.name.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|(key, _)| key != name)
                .cloned()
                .collect(),
            children: self
                .children
                .iter()
                .map(|node| match node {
                    XmlNode::Element(el) => XmlNode::Element(el.without_attribute(name)),
                    XmlNode::Text(text) => XmlNode::Text(text.clone()),
                })
                .collect(),
        }
    }
}

/// Pre-order walk over descendant elements.
struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let children: Vec<&XmlElement> = next.elements().collect();
        self.stack.extend(children.into_iter().rev());
        Some(next)
    }
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for node in &el.children {
        match node {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(child) => collect_text(child, out),
        }
    }
}

/// A parsed law export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LawDocument {
    root: XmlElement,
}

impl LawDocument {
    /// Parse XML text into an owned tree.
    pub fn parse(xml: &str) -> Result<Self, CanonicalError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let parsed = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|err| CanonicalError::InvalidXml(err.to_string()))?;
        let root = parsed
            .root()
            .children()
            .find(|node| node.is_element())
            .ok_or(CanonicalError::MissingRoot)?;
        Ok(Self {
            root: convert_element(root),
        })
    }

    pub fn from_root(root: XmlElement) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Long title of the law, falling back to its official abbreviation.
    pub fn formal_title(&self) -> Option<String> {
        ["langue", "jurabk"].iter().find_map(|field| {
            self.root
                .descendants("metadaten")
                .filter_map(|meta| meta.child(field))
                .map(|el| el.text().trim().to_string())
                .find(|text| !text.is_empty())
        })
    }
}

fn convert_element(node: roxmltree::Node<'_, '_>) -> XmlElement {
    let attributes = node
        .attributes()
        .map(|attr| (attr.name().to_string(), attr.value().to_string()))
        .collect();
    let children = node
        .children()
        .filter_map(|child| {
            if child.is_element() {
                Some(XmlNode::Element(convert_element(child)))
            } else if child.is_text() {
                child.text().map(|text| XmlNode::Text(text.to_string()))
            } else {
                None
            }
        })
        .collect();
    XmlElement {
        name: node.tag_name().name().to_string(),
        attributes,
        children,
    }
}
