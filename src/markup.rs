//! Minimal serialization of a resolved tree to markup.
//!
//! This exists so callers (and the test suite) can compare resolved trees
//! textually; it is deliberately small and handles only primitive nodes. A
//! tree that still contains components, providers or consumers has not been
//! harvested and is rejected.

use crate::error::MarkupError;
use crate::node::Node;

/// Serializes a fully-resolved tree to a markup string.
///
/// # Example
///
/// ```rust
/// # use karitori::{Element, markup};
/// let node = Element::new("p").attr("class", "note").child("hi").into();
/// assert_eq!(markup::stringify(&node).unwrap(), r#"<p class="note">hi</p>"#);
/// ```
pub fn stringify(node: &Node) -> Result<String, MarkupError> {
    let mut out = String::new();
    write_node(&mut out, node)?;
    Ok(out)
}

fn write_node(out: &mut String, node: &Node) -> Result<(), MarkupError> {
    match node {
        Node::Null => {}
        Node::Text(text) => escape_into(out, text),
        Node::Fragment(children) => {
            for child in children.iter() {
                write_node(out, child)?;
            }
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(out, value);
                out.push('"');
            }
            out.push('>');
            for child in el.children.iter() {
                write_node(out, child)?;
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
        Node::Component(_) | Node::Provider(_) | Node::Consumer(_) => {
            return Err(MarkupError::Unresolved(node.describe().into()));
        }
    }
    Ok(())
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}
