//! Tree representation for parsed documents.
//!
//! A parse produces a flat [`Document`]: the ordered top-level sequence of
//! [`XmlNode`] entries. The document is not itself a node - it has no tag and
//! no attributes. Nodes borrow from the input buffer; [`XmlNode::into_owned`]
//! detaches a node when the buffer cannot outlive it (the streaming driver
//! relies on this).

use std::borrow::Cow;

/// The ordered top-level sequence produced by one parse call.
pub type Document<'a> = Vec<XmlNode<'a>>;

/// A single entry in the tree: a tagged element or a text leaf.
///
/// Text leaves carry ordinary character data, CDATA interiors, and - when the
/// corresponding options are set - verbatim comments and doctype fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode<'a> {
    Element(Element<'a>),
    Text(Cow<'a, str>),
}

/// A parsed tag: name, attributes, and ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    /// Tag name. A leading `?` marks a processing instruction.
    pub name: Cow<'a, str>,
    pub attributes: Attributes<'a>,
    /// Child entries in source order. Empty for self-closing tags and
    /// processing instructions.
    pub children: Vec<XmlNode<'a>>,
}

impl<'a> XmlNode<'a> {
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self, XmlNode::Element(_))
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, XmlNode::Text(_))
    }

    /// Get the element if this is an element node.
    #[inline]
    pub fn as_element(&self) -> Option<&Element<'a>> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }

    /// Get the text content if this is a text leaf.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlNode::Text(t) => Some(t.as_ref()),
            XmlNode::Element(_) => None,
        }
    }

    /// Detach the node from the input buffer it was parsed from.
    pub fn into_owned(self) -> XmlNode<'static> {
        match self {
            XmlNode::Element(el) => XmlNode::Element(el.into_owned()),
            XmlNode::Text(t) => XmlNode::Text(Cow::Owned(t.into_owned())),
        }
    }
}

impl<'a> Element<'a> {
    /// Create an element with no attributes and no children.
    pub fn new(name: impl Into<Cow<'a, str>>) -> Self {
        Element {
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// True for `?`-prefixed processing-instruction tags.
    #[inline]
    pub fn is_processing_instruction(&self) -> bool {
        self.name.starts_with('?')
    }

    /// Look up an attribute value by name.
    ///
    /// `Some(None)` is a valueless attribute (`disabled`), distinct from both
    /// an absent attribute and an empty string.
    pub fn attr(&self, name: &str) -> Option<Option<&str>> {
        self.attributes.get(name)
    }

    pub fn into_owned(self) -> Element<'static> {
        Element {
            name: Cow::Owned(self.name.into_owned()),
            attributes: self.attributes.into_owned(),
            children: self.children.into_iter().map(XmlNode::into_owned).collect(),
        }
    }
}

impl<'a> From<Element<'a>> for XmlNode<'a> {
    fn from(el: Element<'a>) -> Self {
        XmlNode::Element(el)
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// Ordered attribute map.
///
/// Keys are unique; writing an existing key replaces its value in place, so
/// the last occurrence wins while the first occurrence keeps its position.
/// `None` values are valueless boolean-style attributes (`disabled`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes<'a> {
    entries: Vec<(Cow<'a, str>, Option<Cow<'a, str>>)>,
}

impl<'a> Attributes<'a> {
    pub fn new() -> Self {
        Attributes { entries: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite. Last write wins, insertion position is kept.
    pub fn insert(&mut self, name: Cow<'a, str>, value: Option<Cow<'a, str>>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name, value)),
        }
    }

    /// `Some(None)` means the attribute is present but valueless.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_ref(), v.as_deref()))
    }

    pub fn into_owned(self) -> Attributes<'static> {
        Attributes {
            entries: self
                .entries
                .into_iter()
                .map(|(n, v)| (Cow::Owned(n.into_owned()), v.map(|v| Cow::Owned(v.into_owned()))))
                .collect(),
        }
    }
}

impl<'a, const N: usize> From<[(&'a str, Option<&'a str>); N]> for Attributes<'a> {
    fn from(pairs: [(&'a str, Option<&'a str>); N]) -> Self {
        let mut attrs = Attributes::new();
        for (n, v) in pairs {
            attrs.insert(Cow::Borrowed(n), v.map(Cow::Borrowed));
        }
        attrs
    }
}

/// Convert captured bytes to text, borrowing when the slice is valid UTF-8.
pub(crate) fn bytes_to_cow(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(String::from_utf8_lossy(bytes).into_owned()),
    }
}

// ============================================================================
// Tests
// ============================================================================
