//! The recursive-descent parser.
//!
//! [`Parser`] is an explicit state machine over the input buffer: the buffer
//! reference, the cursor and the options travel together through every
//! sub-parser, and each sub-parser consumes exactly the span it scanned,
//! leaving the cursor on the first unconsumed byte. There is no validation
//! beyond close-tag name matching, and most malformations are absorbed by
//! scanning to end-of-input.
//!
//! Scanning works on raw bytes. All delimiters in the grammar are ASCII, so
//! captured ranges land on character boundaries for any valid UTF-8 input;
//! invalid UTF-8 is captured lossily rather than rejected.

use std::borrow::Cow;

use regex::Regex;
use thiserror::Error;

use crate::node::{bytes_to_cow, Attributes, Document, Element, XmlNode};
use crate::transform;

/// Tags that never consume a children region, even without an explicit `/>`.
pub static DEFAULT_SELF_CLOSING_TAGS: phf::Set<&'static str> = phf::phf_set! {
    "img", "br", "input", "meta", "link", "hr",
};

/// Fatal parse failure.
///
/// Everything else the grammar can run into (unterminated comments, quotes,
/// CDATA, missing close tags at end-of-input, stray close tags at the root)
/// is tolerated and reflected only in the shape of the tree.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// A closing tag did not contain the name of the currently open element.
    ///
    /// `line` counts newlines before the offending position, `column` is
    /// 1-based within that line, `found` is the byte at the position when
    /// input did not end first.
    #[error("unexpected close tag at line {line}, column {column}")]
    UnexpectedCloseTag {
        line: usize,
        column: usize,
        found: Option<char>,
    },

    /// The `attr_value` search option was not a valid regular expression.
    #[error("invalid attribute search pattern: {0}")]
    AttrPattern(#[from] regex::Error),
}

/// Predicate for the post-parse `filter` option and for [`transform::filter`]:
/// receives the element, its index among its siblings, its depth, and the
/// dotted `index.tagName` path of its ancestry.
pub type FilterPredicate = dyn Fn(&Element<'_>, usize, usize, &str) -> bool;

/// Parse configuration. Construct with struct-update syntax:
///
/// ```
/// use laxml_core::ParseOptions;
///
/// let options = ParseOptions { keep_comments: true, ..Default::default() };
/// ```
pub struct ParseOptions {
    /// Byte offset to start scanning at.
    pub pos: usize,
    /// Override the default self-closing tag set.
    pub self_closing_tags: Option<Vec<String>>,
    /// Retain comments verbatim (including delimiters) as text entries.
    pub keep_comments: bool,
    /// Keep text runs untrimmed; only entirely empty runs are dropped.
    pub keep_whitespace: bool,
    /// Parse a single node instead of a document.
    pub parse_node: bool,
    /// With `parse_node`, also return the cursor position after the node.
    pub set_pos: bool,
    /// Attribute name for the targeted search; defaults to `id` when only
    /// `attr_value` is given.
    pub attr_name: Option<String>,
    /// Regular-expression fragment the attribute value must match. Setting
    /// this switches to the targeted search, which takes precedence over
    /// `parse_node`.
    pub attr_value: Option<String>,
    /// Post-parse filter applied to document results.
    pub filter: Option<Box<FilterPredicate>>,
    /// Apply [`transform::simplify`] to the result.
    pub simplify: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            pos: 0,
            self_closing_tags: None,
            keep_comments: false,
            keep_whitespace: false,
            parse_node: false,
            set_pos: false,
            attr_name: None,
            attr_value: None,
            filter: None,
            simplify: false,
        }
    }
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("pos", &self.pos)
            .field("self_closing_tags", &self.self_closing_tags)
            .field("keep_comments", &self.keep_comments)
            .field("keep_whitespace", &self.keep_whitespace)
            .field("parse_node", &self.parse_node)
            .field("set_pos", &self.set_pos)
            .field("attr_name", &self.attr_name)
            .field("attr_value", &self.attr_value)
            .field("filter", &self.filter.as_ref().map(|_| "<predicate>"))
            .field("simplify", &self.simplify)
            .finish()
    }
}

/// Result of [`parse_with`], tagged by the requested parse mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<'a> {
    /// Whole-document and attribute-search results.
    Document(Document<'a>),
    /// `parse_node` result.
    Node(XmlNode<'a>),
    /// `parse_node` + `set_pos` result; `pos` is the first unconsumed byte.
    NodeWithPos { node: XmlNode<'a>, pos: usize },
    /// `simplify` result.
    Simplified(serde_json::Value),
}

impl<'a> Parsed<'a> {
    /// Extract the node list, wrapping single-node results.
    pub fn into_document(self) -> Document<'a> {
        match self {
            Parsed::Document(nodes) => nodes,
            Parsed::Node(node) | Parsed::NodeWithPos { node, .. } => vec![node],
            Parsed::Simplified(_) => Vec::new(),
        }
    }
}

/// Parse a whole document with default options.
pub fn parse(input: &str) -> Result<Document<'_>, ParseError> {
    let options = ParseOptions::default();
    Parser::new(input, &options).parse_document()
}

/// Parse with explicit options, selecting the output shape by mode.
///
/// Mode precedence: attribute search (`attr_value`) over `parse_node` over
/// whole-document; the `filter` option applies to document results and
/// `simplify` wraps whatever remains.
pub fn parse_with<'a>(input: &'a str, options: &ParseOptions) -> Result<Parsed<'a>, ParseError> {
    if options.attr_value.is_some() {
        let mut nodes = attr_search(input, options)?;
        if let Some(predicate) = &options.filter {
            nodes = apply_filter(&nodes, predicate);
        }
        if options.simplify {
            return Ok(Parsed::Simplified(transform::simplify(&nodes)));
        }
        return Ok(Parsed::Document(nodes));
    }

    if options.parse_node {
        let mut parser = Parser::new(input, options);
        let node = XmlNode::Element(parser.parse_node()?);
        if options.simplify {
            return Ok(Parsed::Simplified(transform::simplify(std::slice::from_ref(&node))));
        }
        if options.set_pos {
            return Ok(Parsed::NodeWithPos { node, pos: parser.pos() });
        }
        return Ok(Parsed::Node(node));
    }

    let mut nodes = Parser::new(input, options).parse_document()?;
    if let Some(predicate) = &options.filter {
        nodes = apply_filter(&nodes, predicate);
    }
    if options.simplify {
        return Ok(Parsed::Simplified(transform::simplify(&nodes)));
    }
    Ok(Parsed::Document(nodes))
}

fn apply_filter<'a>(nodes: &[XmlNode<'a>], predicate: &FilterPredicate) -> Document<'a> {
    transform::filter(nodes, |el, i, depth, path| predicate(el, i, depth, path))
        .into_iter()
        .cloned()
        .map(XmlNode::Element)
        .collect()
}

/// Targeted search: regex pre-scan for a matching attribute, then a normal
/// single-node parse anchored at the nearest preceding `<`. The node parser
/// is the same one used everywhere, so result shapes are identical to a
/// whole-document parse followed by a search.
fn attr_search<'a>(input: &'a str, options: &ParseOptions) -> Result<Document<'a>, ParseError> {
    let name = options.attr_name.as_deref().unwrap_or("id");
    let value = options.attr_value.as_deref().unwrap_or_default();
    let re = Regex::new(&format!(r#"\s{}\s*=['"]{}['"]"#, name, value))?;

    let mut out = Vec::new();
    let mut base = 0;
    while base < input.len() {
        let window = &input[base..];
        let Some(m) = re.find(window) else { break };
        // anchor at the start of the tag the matching attribute sits in
        let Some(lt) = window[..m.start()].rfind('<') else { break };
        let mut parser = Parser::new_at(window, lt, options);
        out.push(XmlNode::Element(parser.parse_node()?));
        base += parser.pos();
    }
    Ok(out)
}

// ============================================================================
// Parser state machine
// ============================================================================

/// Explicit parser state: input buffer, cursor, configuration.
///
/// The cursor invariant holds across every method: on return, `pos` sits on
/// the first byte the method did not consume.
pub struct Parser<'a, 'o> {
    input: &'a [u8],
    pos: usize,
    options: &'o ParseOptions,
    incomplete: bool,
}

impl<'a, 'o> Parser<'a, 'o> {
    /// Parser starting at `options.pos`.
    pub fn new(input: &'a str, options: &'o ParseOptions) -> Self {
        Self::new_at(input, options.pos, options)
    }

    /// Parser starting at an explicit offset (the streaming driver re-anchors
    /// one parser per buffered element).
    pub fn new_at(input: &'a str, pos: usize, options: &'o ParseOptions) -> Self {
        Parser {
            input: input.as_bytes(),
            pos,
            options,
            incomplete: false,
        }
    }

    /// Current cursor position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// True when input ended inside a construct and the parse was completed
    /// by end-of-input tolerance rather than by explicit structure.
    #[inline]
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Parse the top-level node sequence to end-of-input.
    pub fn parse_document(&mut self) -> Result<Document<'a>, ParseError> {
        // the root has no enclosing tag, so stray close tags always "match"
        self.parse_children("")
    }

    // ------------------------------------------------------------------
    // Scanner primitives
    // ------------------------------------------------------------------

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    fn at(&self, index: usize) -> Option<u8> {
        self.input.get(index).copied()
    }

    #[inline]
    fn find_byte(&self, byte: u8, from: usize) -> Option<usize> {
        let from = from.min(self.input.len());
        memchr::memchr(byte, &self.input[from..]).map(|i| i + from)
    }

    #[inline]
    fn find_literal(&self, literal: &[u8], from: usize) -> Option<usize> {
        let from = from.min(self.input.len());
        memchr::memmem::find(&self.input[from..], literal).map(|i| i + from)
    }

    fn capture(&self, start: usize, end: usize) -> Cow<'a, str> {
        let end = end.min(self.input.len());
        let start = start.min(end);
        bytes_to_cow(&self.input[start..end])
    }

    fn is_self_closing(&self, name: &str) -> bool {
        match &self.options.self_closing_tags {
            Some(tags) => tags.iter().any(|t| t == name),
            None => DEFAULT_SELF_CLOSING_TAGS.contains(name),
        }
    }

    // ------------------------------------------------------------------
    // Lexical sub-parsers
    // ------------------------------------------------------------------

    /// Scan a name: everything up to space, tab, CR, LF, `>`, `/` or `=`.
    fn parse_name(&mut self) -> Cow<'a, str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/' | b'=') {
                break;
            }
            self.pos += 1;
        }
        self.capture(start, self.pos)
    }

    /// Scan a quoted string; the cursor sits on the opening quote. The
    /// interior is returned verbatim, no entity decoding. A missing close
    /// quote is tolerated: the value runs to end-of-input.
    fn parse_string(&mut self) -> Cow<'a, str> {
        let quote = self.input[self.pos];
        let start = self.pos + 1;
        match self.find_byte(quote, start) {
            Some(end) => {
                self.pos = end + 1;
                self.capture(start, end)
            }
            None => {
                self.incomplete = true;
                self.pos = self.input.len();
                self.capture(start, self.pos)
            }
        }
    }

    /// Scan a text run up to the next `<` or end-of-input.
    fn parse_text(&mut self) -> Cow<'a, str> {
        let start = self.pos;
        self.pos = self.find_byte(b'<', self.pos).unwrap_or(self.input.len());
        self.capture(start, self.pos)
    }

    // ------------------------------------------------------------------
    // Node parser
    // ------------------------------------------------------------------

    /// Parse one element; the cursor sits on its `<`.
    pub fn parse_node(&mut self) -> Result<Element<'a>, ParseError> {
        self.pos += 1;
        let name = self.parse_name();
        let mut attributes = Attributes::new();

        // attribute loop: letters start a name, everything else in between
        // (`=`, whitespace) is filler
        while self.pos < self.input.len() && self.input[self.pos] != b'>' {
            let b = self.input[self.pos];
            if b.is_ascii_alphabetic() {
                let attr_name = self.parse_name();
                while let Some(b) = self.peek() {
                    if b == b'\'' || b == b'"' || b == b'>' || b.is_ascii_alphabetic() {
                        break;
                    }
                    self.pos += 1;
                }
                let value = match self.peek() {
                    Some(b'\'') | Some(b'"') => Some(self.parse_string()),
                    // valueless attribute; the cursor stays put so a letter
                    // here starts the next attribute name
                    _ => None,
                };
                attributes.insert(attr_name, value);
            } else {
                self.pos += 1;
            }
        }

        if self.pos >= self.input.len() {
            // input ended inside the tag
            self.incomplete = true;
            return Ok(Element { name, attributes, children: Vec::new() });
        }

        // explicit `/>`
        if self.input[self.pos - 1] == b'/' {
            self.pos += 1;
            return Ok(Element { name, attributes, children: Vec::new() });
        }

        // raw-text elements capture their body verbatim up to the literal
        // close tag, embedded `<`/`>` included
        if name == "script" || name == "style" {
            let close: &[u8] = if name == "script" { b"</script>" } else { b"</style>" };
            let start = self.pos + 1;
            let children = match self.find_literal(close, self.pos) {
                Some(i) => {
                    let body = self.capture(start, i);
                    self.pos = i + close.len();
                    vec![XmlNode::Text(body)]
                }
                None => {
                    self.incomplete = true;
                    let body = self.capture(start, self.input.len());
                    self.pos = self.input.len();
                    vec![XmlNode::Text(body)]
                }
            };
            return Ok(Element { name, attributes, children });
        }

        if self.is_self_closing(&name) {
            self.pos += 1;
            return Ok(Element { name, attributes, children: Vec::new() });
        }

        // processing instructions close at their own `>` and never carry
        // children
        if name.starts_with('?') {
            self.pos += 1;
            return Ok(Element { name, attributes, children: Vec::new() });
        }

        self.pos += 1;
        let children = self.parse_children(name.as_ref())?;
        Ok(Element { name, attributes, children })
    }

    // ------------------------------------------------------------------
    // Children parser
    // ------------------------------------------------------------------

    /// Parse a content region into an ordered child list, returning when the
    /// parent's close tag (or end-of-input) is reached.
    fn parse_children(&mut self, tag_name: &str) -> Result<Vec<XmlNode<'a>>, ParseError> {
        let mut children = Vec::new();

        while self.pos < self.input.len() {
            if self.input[self.pos] != b'<' {
                let text = self.parse_text();
                if self.options.keep_whitespace {
                    if !text.is_empty() {
                        children.push(XmlNode::Text(text));
                    }
                } else {
                    let trimmed = trim_cow(text);
                    if !trimmed.is_empty() {
                        children.push(XmlNode::Text(trimmed));
                    }
                }
                continue;
            }

            match self.at(self.pos + 1) {
                Some(b'/') => {
                    // close tag: the name between `</` and `>` must contain
                    // the open tag's name, anything else is fatal. A close
                    // tag cut off by end-of-input is not checked - it is the
                    // implicit-close tolerance, not a mismatch.
                    let close_start = self.pos + 2;
                    match self.find_byte(b'>', self.pos) {
                        Some(gt) => {
                            let close_tag = self.capture(close_start, gt);
                            if !close_tag.contains(tag_name) {
                                return Err(self.unexpected_close_tag(gt));
                            }
                            self.pos = gt + 1;
                        }
                        None => {
                            self.incomplete = true;
                            self.pos = self.input.len();
                        }
                    }
                    return Ok(children);
                }
                Some(b'!') => {
                    if self.at(self.pos + 2) == Some(b'-') {
                        self.scan_comment(&mut children);
                    } else if self.at_cdata() {
                        self.scan_cdata(&mut children);
                    } else {
                        self.scan_doctype(&mut children);
                    }
                }
                _ => {
                    let node = self.parse_node()?;
                    children.push(XmlNode::Element(node));
                }
            }
        }

        if !tag_name.is_empty() {
            // missing close tag: implicit close at end-of-input
            self.incomplete = true;
        }
        Ok(children)
    }

    /// Comment at the cursor. Kept verbatim (delimiters included) only with
    /// `keep_comments`; an unterminated comment runs to end-of-input.
    fn scan_comment(&mut self, children: &mut Vec<XmlNode<'a>>) {
        let start = self.pos;
        match self.find_literal(b"-->", self.pos + 2) {
            Some(i) => {
                if self.options.keep_comments {
                    children.push(XmlNode::Text(self.capture(start, i + 3)));
                }
                self.pos = i + 3;
            }
            None => {
                self.incomplete = true;
                if self.options.keep_comments {
                    children.push(XmlNode::Text(self.capture(start, self.input.len())));
                }
                self.pos = self.input.len();
            }
        }
    }

    fn at_cdata(&self) -> bool {
        self.at(self.pos + 2) == Some(b'[')
            && self.at(self.pos + 8) == Some(b'[')
            && self
                .input
                .get(self.pos + 3..self.pos + 8)
                .is_some_and(|s| s.eq_ignore_ascii_case(b"cdata"))
    }

    /// CDATA section at the cursor. The interior is always inlined as text;
    /// unterminated sections take the remainder of the input.
    fn scan_cdata(&mut self, children: &mut Vec<XmlNode<'a>>) {
        let start = self.pos + 9;
        match self.find_literal(b"]]>", self.pos) {
            Some(i) => {
                children.push(XmlNode::Text(self.capture(start, i)));
                self.pos = i + 3;
            }
            None => {
                self.incomplete = true;
                children.push(XmlNode::Text(self.capture(start, self.input.len())));
                self.pos = self.input.len();
            }
        }
    }

    /// Doctype/declaration at the cursor: scan to the first `>` outside
    /// `[`...`]` nesting. The interior (from the `!`) is always kept as text.
    fn scan_doctype(&mut self, children: &mut Vec<XmlNode<'a>>) {
        let start = self.pos + 1;
        self.pos += 2;
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => {
                    self.incomplete = true;
                    break;
                }
                Some(b'>') if depth == 0 => break,
                Some(b'[') => depth += 1,
                Some(b']') => depth = depth.saturating_sub(1),
                Some(_) => {}
            }
            self.pos += 1;
        }
        children.push(XmlNode::Text(self.capture(start, self.pos)));
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn unexpected_close_tag(&self, at: usize) -> ParseError {
        let at = at.min(self.input.len());
        let before = &self.input[..at];
        let line = memchr::memchr_iter(b'\n', before).count();
        let line_start = memchr::memrchr(b'\n', before).map_or(0, |i| i + 1);
        let column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
        ParseError::UnexpectedCloseTag {
            line,
            column,
            found: self.at(at).map(char::from),
        }
    }
}

fn trim_cow<'a>(text: Cow<'a, str>) -> Cow<'a, str> {
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
