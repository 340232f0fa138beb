//! Incremental parsing over chunked input.
//!
//! [`ParseStream`] re-applies the node parser to a growing buffer, emitting
//! completed top-level items and holding back unconsumed tail bytes. The
//! resumption protocol tracks two offsets: the scan cursor, and `last_pos`,
//! the end of the last item known to be fully consumed. Whenever a construct
//! turns out to need bytes that have not arrived yet, the buffer is cut back
//! to `last_pos`, the cursor rewinds, and the same construct is re-attempted
//! in full once more data is fed - nothing is emitted twice and nothing is
//! lost.
//!
//! Each stream owns its buffer and offsets outright, so independent streams
//! can run on independent tasks without any shared state.

use crate::node::XmlNode;
use crate::parser::{ParseError, ParseOptions, Parser};

/// Streaming driver state.
///
/// Feed chunks with [`feed`](ParseStream::feed), collect emitted items from
/// each call, and [`finish`](ParseStream::finish) at end-of-input. Emitted
/// nodes are owned: the internal buffer is discarded as it is consumed.
pub struct ParseStream {
    options: ParseOptions,
    buffer: String,
    /// Scan cursor into `buffer`. Starts at the construction offset so a
    /// known-length preamble is never scanned.
    position: usize,
}

impl ParseStream {
    /// New stream scanning from `offset` (0 for no preamble).
    pub fn new(offset: usize, options: ParseOptions) -> Self {
        ParseStream {
            options,
            buffer: String::new(),
            position: offset,
        }
    }

    /// Append a chunk and drain every item that is now complete.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<XmlNode<'static>>, ParseError> {
        self.buffer.push_str(chunk);
        self.drain(false)
    }

    /// Signal end-of-input and drain the tail.
    ///
    /// End-of-input tolerances now apply (unterminated comments, CDATA and
    /// doctype run to the end, as in a whole-document parse), but a trailing
    /// element that never completed is silently dropped - never
    /// force-completed, never an error.
    pub fn finish(mut self) -> Result<Vec<XmlNode<'static>>, ParseError> {
        self.drain(true)
    }

    fn drain(&mut self, at_end: bool) -> Result<Vec<XmlNode<'static>>, ParseError> {
        let mut out = Vec::new();
        // everything before the entry cursor (preamble or previously consumed
        // input) counts as confirmed
        let mut last_pos = self.position.min(self.buffer.len());

        loop {
            let bytes = self.buffer.as_bytes();
            let len = bytes.len();

            let from = self.position.min(len);
            let Some(lt) = memchr::memchr(b'<', &bytes[from..]).map(|i| i + from) else {
                // no more markers: undo any speculative advance and suspend
                self.position = last_pos;
                return Ok(out);
            };

            match bytes.get(lt + 1).copied() {
                // stray close tag with no open element in this window
                Some(b'/') => {
                    self.position = lt + 2;
                    last_pos = self.position;
                }
                Some(b'!') if bytes.get(lt + 2) == Some(&b'-') => {
                    let end = memchr::memmem::find(&bytes[lt + 2..], b"-->").map(|i| i + lt + 2);
                    match end {
                        Some(i) => {
                            if self.options.keep_comments {
                                out.push(XmlNode::Text(self.buffer[lt..i + 3].to_string().into()));
                            }
                            self.position = i + 3;
                            last_pos = self.position;
                        }
                        None if at_end => {
                            if self.options.keep_comments {
                                out.push(XmlNode::Text(self.buffer[lt..].to_string().into()));
                            }
                            self.position = len;
                            last_pos = len;
                        }
                        None => return Ok(self.suspend(last_pos, out)),
                    }
                }
                Some(b'!') if at_cdata(bytes, lt) => {
                    let end = memchr::memmem::find(&bytes[lt..], b"]]>").map(|i| i + lt);
                    match end {
                        Some(i) => {
                            out.push(XmlNode::Text(self.buffer[lt + 9..i].to_string().into()));
                            self.position = i + 3;
                            last_pos = self.position;
                        }
                        None if at_end => {
                            let start = (lt + 9).min(len);
                            out.push(XmlNode::Text(self.buffer[start..].to_string().into()));
                            self.position = len;
                            last_pos = len;
                        }
                        None => return Ok(self.suspend(last_pos, out)),
                    }
                }
                Some(b'!') => {
                    match doctype_end(bytes, lt) {
                        Some(gt) => {
                            out.push(XmlNode::Text(self.buffer[lt + 1..gt].to_string().into()));
                            self.position = gt + 1;
                            last_pos = self.position;
                        }
                        None if at_end => {
                            let start = (lt + 1).min(len);
                            out.push(XmlNode::Text(self.buffer[start..].to_string().into()));
                            self.position = len;
                            last_pos = len;
                        }
                        None => return Ok(self.suspend(last_pos, out)),
                    }
                }
                // anything else: one node-parser pass anchored at the `<`
                _ => {
                    let (node, end, incomplete) = {
                        let mut parser = Parser::new_at(&self.buffer, lt, &self.options);
                        let node = parser.parse_node()?;
                        (node.into_owned(), parser.pos(), parser.is_incomplete())
                    };
                    // a parse that ran to (or past) the buffered end may be
                    // missing data; retry it when more arrives
                    let unconfirmed = incomplete || end >= len || end < last_pos;
                    if unconfirmed && !at_end {
                        return Ok(self.suspend(last_pos, out));
                    }
                    if incomplete {
                        // truncated trailing element at end-of-input: drop
                        self.position = len;
                        return Ok(out);
                    }
                    out.push(XmlNode::Element(node));
                    self.position = end;
                    last_pos = end;
                }
            }
        }
    }

    /// Cut the buffer back to the last confirmed offset and rewind, so the
    /// in-flight construct is re-attempted from scratch on the next feed.
    fn suspend(&mut self, last_pos: usize, out: Vec<XmlNode<'static>>) -> Vec<XmlNode<'static>> {
        let mut cut = last_pos.min(self.buffer.len());
        while !self.buffer.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buffer.drain(..cut);
        self.position = 0;
        out
    }
}

fn at_cdata(bytes: &[u8], lt: usize) -> bool {
    bytes.get(lt + 2) == Some(&b'[')
        && bytes.get(lt + 8) == Some(&b'[')
        && bytes
            .get(lt + 3..lt + 8)
            .is_some_and(|s| s.eq_ignore_ascii_case(b"cdata"))
}

/// First `>` outside `[`...`]` nesting, starting after `<!`.
fn doctype_end(bytes: &[u8], lt: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = lt + 2;
    while pos < bytes.len() {
        match bytes[pos] {
            b'>' if depth == 0 => return Some(pos),
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        pos += 1;
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
