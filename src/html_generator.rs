//! HTML serialization of an in-memory live tree, with consistent escaping
use crate::backend::{MemContent, MemoryBackend};
use crate::types::NodeHandle;
use phf::phf_set;

// Elements that never have children or a closing tag
static VOID_KINDS: phf::Set<&'static str> = phf_set! {
    "br", "hr", "img", "input",
};

/// Consistent HTML attribute escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn text_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

enum Snapshot {
    Element {
        kind: String,
        attributes: Vec<(String, serde_json::Value)>,
        children: Vec<NodeHandle>,
    },
    Text(String),
}

/// Render the subtree rooted at `node`. Listeners are not part of the output;
/// a stale handle renders as an empty string.
pub fn to_html(backend: &MemoryBackend, node: NodeHandle) -> String {
    let mut out = String::new();
    write_node(backend, node, &mut out);
    out
}

fn write_node(backend: &MemoryBackend, node: NodeHandle, out: &mut String) {
    let snapshot = backend.with_node(node, |n| match &n.content {
        MemContent::Element { kind, attributes, children, .. } => Snapshot::Element {
            kind: kind.clone(),
            attributes: attributes.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            children: children.clone(),
        },
        MemContent::Text(t) => Snapshot::Text(t.clone()),
    });

    match snapshot {
        Some(Snapshot::Text(t)) => out.push_str(&text_escape(&t)),
        Some(Snapshot::Element { kind, attributes, children }) => {
            out.push('<');
            out.push_str(&kind);
            for (name, value) in &attributes {
                write_attribute(name, value, out);
            }
            out.push('>');
            if VOID_KINDS.contains(kind.as_str()) {
                return;
            }
            for child in children {
                write_node(backend, child, out);
            }
            out.push_str("</");
            out.push_str(&kind);
            out.push('>');
        }
        None => {}
    }
}

fn write_attribute(name: &str, value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Null | serde_json::Value::Bool(false) => {}
        serde_json::Value::Bool(true) => {
            out.push(' ');
            out.push_str(name);
        }
        serde_json::Value::String(s) => {
            out.push_str(&format!(" {}=\"{}\"", name, html_escape(s)));
        }
        other => {
            out.push_str(&format!(" {}=\"{}\"", name, html_escape(&other.to_string())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NodeBackend;
    use serde_json::json;

    #[test]
    fn renders_nested_tree_with_escaping() {
        let b = MemoryBackend::new();
        let div = b.create_element("div").unwrap();
        b.set_attribute(div, "title", &json!("a \"quoted\" <title>")).unwrap();
        b.set_attribute(div, "hidden", &json!(false)).unwrap();
        b.set_attribute(div, "disabled", &json!(true)).unwrap();
        b.set_attribute(div, "tabindex", &json!(2)).unwrap();
        let t = b.create_text_node("1 < 2 & 3").unwrap();
        let br = b.create_element("br").unwrap();
        b.append_child(div, t).unwrap();
        b.append_child(div, br).unwrap();

        assert_eq!(
            to_html(&b, div),
            "<div title=\"a &quot;quoted&quot; &lt;title&gt;\" disabled tabindex=\"2\">1 &lt; 2 &amp; 3<br></div>"
        );
    }

    #[test]
    fn stale_handle_renders_nothing() {
        let b = MemoryBackend::new();
        assert_eq!(to_html(&b, NodeHandle(42)), "");
    }
}
