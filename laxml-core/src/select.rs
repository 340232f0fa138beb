//! Targeted element lookup.
//!
//! Both helpers ride on the parser's attribute search: a regex pre-scan
//! locates a matching attribute, the scan backs up to the nearest preceding
//! `<`, and the ordinary node parser takes over from there. Results are
//! therefore shaped exactly as a whole-document parse would shape them,
//! while skipping everything before the first hit.

use crate::node::{Element, XmlNode};
use crate::parser::{parse_with, ParseError, ParseOptions};

/// Find the first element whose `id` attribute equals `id`.
pub fn get_element_by_id<'a>(input: &'a str, id: &str) -> Result<Option<Element<'a>>, ParseError> {
    let options = ParseOptions {
        attr_value: Some(id.to_string()),
        ..Default::default()
    };
    let nodes = parse_with(input, &options)?.into_document();
    Ok(nodes.into_iter().find_map(element))
}

/// Find every element whose `class` attribute contains `class_name`.
pub fn get_elements_by_class_name<'a>(
    input: &'a str,
    class_name: &str,
) -> Result<Vec<Element<'a>>, ParseError> {
    let options = ParseOptions {
        attr_name: Some("class".to_string()),
        attr_value: Some(format!("[a-zA-Z0-9- ]*{}[a-zA-Z0-9- ]*", class_name)),
        ..Default::default()
    };
    let nodes = parse_with(input, &options)?.into_document();
    Ok(nodes.into_iter().filter_map(element).collect())
}

fn element(node: XmlNode<'_>) -> Option<Element<'_>> {
    match node {
        XmlNode::Element(el) => Some(el),
        XmlNode::Text(_) => None,
    }
}
