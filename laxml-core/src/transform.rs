//! Tree-shape transformations.
//!
//! Everything here consumes a parsed node list and produces a derived value;
//! the tree itself is never mutated. [`simplify`] and [`simplify_lost_less`]
//! produce tag-keyed [`serde_json::Value`] maps in the manner of PHP's
//! `simple_xml_load_*` - lossy but convenient for schema-tolerant consumers.

use serde_json::{Map, Value};

use crate::node::{Attributes, Element, XmlNode};

/// Serialize a node list back to markup.
///
/// Attribute values are double-quoted unless they contain a double quote, in
/// which case single quotes are used; valueless attributes emit just their
/// name. Text entries and attribute values are trimmed on output. `?`-tagged
/// nodes close with `?>` and have no close tag.
pub fn stringify(nodes: &[XmlNode<'_>]) -> String {
    let mut out = String::new();
    write_children(&mut out, nodes);
    out
}

fn write_children(out: &mut String, nodes: &[XmlNode<'_>]) {
    for node in nodes {
        match node {
            XmlNode::Text(text) => out.push_str(text.trim()),
            XmlNode::Element(el) => write_node(out, el),
        }
    }
}

fn write_node(out: &mut String, el: &Element<'_>) {
    out.push('<');
    out.push_str(&el.name);
    for (name, value) in el.attributes.iter() {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            let quote = if value.contains('"') { '\'' } else { '"' };
            out.push('=');
            out.push(quote);
            out.push_str(value.trim());
            out.push(quote);
        }
    }
    if el.name.starts_with('?') {
        out.push_str("?>");
        return;
    }
    out.push('>');
    write_children(out, &el.children);
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

/// Collapse a sibling list into a tag-keyed map.
///
/// Repeated tags group into arrays, single occurrences collapse to their
/// value, a lone text child collapses to a string, and attributes attach
/// under `"_attributes"` when (and only when) the simplified value is itself
/// a map. Lossy: interleaving between distinct tags is not preserved.
pub fn simplify(children: &[XmlNode<'_>]) -> Value {
    if children.is_empty() {
        return Value::String(String::new());
    }
    if children.len() == 1 {
        if let XmlNode::Text(text) = &children[0] {
            return Value::String(text.to_string());
        }
    }

    let mut out = Map::new();
    for child in children {
        let XmlNode::Element(el) = child else { continue };
        let mut kids = simplify(&el.children);
        if let Value::Object(map) = &mut kids {
            if !el.attributes.is_empty() {
                map.insert("_attributes".to_string(), attributes_value(&el.attributes));
            }
        }
        match out.get_mut(el.name.as_ref()) {
            Some(Value::Array(group)) => group.push(kids),
            _ => {
                out.insert(el.name.to_string(), Value::Array(vec![kids]));
            }
        }
    }

    for (_, value) in out.iter_mut() {
        if let Value::Array(group) = value {
            if group.len() == 1 {
                *value = group.remove(0);
            }
        }
    }

    Value::Object(out)
}

/// Like [`simplify`], but keeps more: per-tag groups stay arrays even with a
/// single entry, and a text leaf whose element carries attributes is wrapped
/// as `{"_attributes": ..., "value": ...}` instead of dropping them.
pub fn simplify_lost_less(children: &[XmlNode<'_>], parent_attributes: &Attributes<'_>) -> Value {
    if children.is_empty() {
        return Value::Object(Map::new());
    }
    if children.len() == 1 {
        if let XmlNode::Text(text) = &children[0] {
            if !parent_attributes.is_empty() {
                let mut wrapped = Map::new();
                wrapped.insert("_attributes".to_string(), attributes_value(parent_attributes));
                wrapped.insert("value".to_string(), Value::String(text.to_string()));
                return Value::Object(wrapped);
            }
            return Value::String(text.to_string());
        }
    }

    let mut out = Map::new();
    for child in children {
        let XmlNode::Element(el) = child else { continue };
        let mut kids = simplify_lost_less(&el.children, &el.attributes);
        if let Value::Object(map) = &mut kids {
            if !el.attributes.is_empty() && !map.contains_key("_attributes") {
                map.insert("_attributes".to_string(), attributes_value(&el.attributes));
            }
        }
        match out.get_mut(el.name.as_ref()) {
            Some(Value::Array(group)) => group.push(kids),
            _ => {
                out.insert(el.name.to_string(), Value::Array(vec![kids]));
            }
        }
    }
    Value::Object(out)
}

fn attributes_value(attrs: &Attributes<'_>) -> Value {
    let mut map = Map::new();
    for (name, value) in attrs.iter() {
        let value = match value {
            Some(v) => Value::String(v.to_string()),
            None => Value::Null,
        };
        map.insert(name.to_string(), value);
    }
    Value::Object(map)
}

/// Depth-first search over every element in the tree.
///
/// The predicate receives `(element, sibling_index, depth, path)`; `path`
/// accumulates dotted `siblingIndex.tagName` segments from the root. Every
/// element's children are visited whether or not the element itself matched,
/// and matches are returned in document order.
pub fn filter<'t, 'a, F>(children: &'t [XmlNode<'a>], mut predicate: F) -> Vec<&'t Element<'a>>
where
    F: FnMut(&Element<'a>, usize, usize, &str) -> bool,
{
    let mut out = Vec::new();
    filter_into(children, &mut predicate, 0, "", &mut out);
    out
}

fn filter_into<'t, 'a, F>(
    children: &'t [XmlNode<'a>],
    predicate: &mut F,
    depth: usize,
    path: &str,
    out: &mut Vec<&'t Element<'a>>,
) where
    F: FnMut(&Element<'a>, usize, usize, &str) -> bool,
{
    for (index, child) in children.iter().enumerate() {
        let XmlNode::Element(el) = child else { continue };
        if predicate(el, index, depth, path) {
            out.push(el);
        }
        let child_path = if path.is_empty() {
            format!("{}.{}", index, el.name)
        } else {
            format!("{}.{}.{}", path, index, el.name)
        };
        filter_into(&el.children, predicate, depth + 1, &child_path, out);
    }
}

/// Flatten every text leaf into one space-joined, trimmed string, in
/// document order, ignoring tag structure. Good for mixed content.
pub fn to_content_string(nodes: &[XmlNode<'_>]) -> String {
    let mut out = String::new();
    for node in nodes {
        let piece = match node {
            XmlNode::Text(text) => format!(" {}", text),
            XmlNode::Element(el) => to_content_string(&el.children),
        };
        out.push(' ');
        out.push_str(&piece);
        out = out.trim().to_string();
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn el<'a>(name: &'a str, children: Vec<XmlNode<'a>>) -> XmlNode<'a> {
        XmlNode::Element(Element {
            name: Cow::Borrowed(name),
            attributes: Attributes::new(),
            children,
        })
    }

    #[test]
    fn stringify_empty_is_empty() {
        assert_eq!(stringify(&[]), "");
    }

    #[test]
    fn stringify_valueless_attribute() {
        let mut item = Element::new("something");
        item.attributes.insert(Cow::Borrowed("flag"), None);
        let tree = vec![el("test", vec![XmlNode::Element(item)])];
        assert_eq!(stringify(&tree), "<test><something flag></something></test>");
    }

    #[test]
    fn stringify_falls_back_to_single_quotes() {
        let mut item = Element::new("a");
        item.attributes
            .insert(Cow::Borrowed("x"), Some(Cow::Borrowed("g\"g")));
        assert_eq!(stringify(&[XmlNode::Element(item)]), "<a x='g\"g'></a>");
    }

    #[test]
    fn simplify_of_nothing_is_empty_string() {
        assert_eq!(simplify(&[]), Value::String(String::new()));
    }

    #[test]
    fn simplify_lost_less_of_nothing_is_empty_map() {
        assert_eq!(
            simplify_lost_less(&[], &Attributes::new()),
            Value::Object(Map::new())
        );
    }

    #[test]
    fn simplify_lost_less_lone_text_collapses() {
        let children = vec![XmlNode::Text(Cow::Borrowed("3"))];
        assert_eq!(
            simplify_lost_less(&children, &Attributes::new()),
            Value::String("3".to_string())
        );
    }

    #[test]
    fn simplify_lost_less_ignores_text_between_elements() {
        let children = vec![
            XmlNode::Text(Cow::Borrowed("1")),
            XmlNode::Text(Cow::Borrowed("2")),
        ];
        assert_eq!(
            simplify_lost_less(&children, &Attributes::new()),
            Value::Object(Map::new())
        );
    }

    #[test]
    fn filter_handles_childless_elements() {
        let tree = vec![el("a", Vec::new())];
        let found = filter(&tree, |_, _, _, _| true);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn content_string_trims_between_pieces() {
        let tree = vec![el(
            "test",
            vec![
                XmlNode::Text(Cow::Borrowed("f")),
                el("case", vec![XmlNode::Text(Cow::Borrowed("f"))]),
                XmlNode::Text(Cow::Borrowed("f")),
            ],
        )];
        assert_eq!(to_content_string(&tree), "f f  f");
    }
}
