//! laxml Core Parser
//!
//! Minimal-validation, fault-tolerant XML/HTML parser. Produces an in-memory
//! tree of tagged elements and text leaves from raw text, with companion
//! operations to re-serialize, simplify, search, and incrementally parse
//! streamed input.
//!
//! # Architecture
//!
//! - **parser.rs** - recursive-descent state machine, options, error type
//! - **node.rs** - tree types (`XmlNode`, `Element`, `Attributes`)
//! - **transform.rs** - stringify, simplify variants, filter, text flattening
//! - **select.rs** - targeted id/class lookup via regex pre-scan
//! - **streaming.rs** - chunked-input driver with buffered resumption
//!
//! # Example
//!
//! ```
//! use laxml_core::parse;
//!
//! let doc = parse("<list><item>a</item><item done>b</item></list>").unwrap();
//! let list = doc[0].as_element().unwrap();
//! assert_eq!(list.children.len(), 2);
//! assert_eq!(list.children[1].as_element().unwrap().attr("done"), Some(None));
//! ```

pub mod node;
pub mod parser;
pub mod select;
pub mod streaming;
pub mod transform;

pub use node::{Attributes, Document, Element, XmlNode};
pub use parser::{
    parse, parse_with, ParseError, ParseOptions, Parsed, Parser, DEFAULT_SELF_CLOSING_TAGS,
};
pub use select::{get_element_by_id, get_elements_by_class_name};
pub use streaming::ParseStream;
pub use transform::{filter, simplify, simplify_lost_less, stringify, to_content_string};
