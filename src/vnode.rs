//! Node descriptors: the pure description of desired structure
use crate::config::{KEY_ATTRIBUTE, LISTENER_PREFIX};
use crate::types::{AttrValue, Event, Listener, NodeHandle};
use indexmap::IndexMap;
use log::warn;

/// Description of one element: kind, attributes, ordered children, optional key,
/// and the live node it is bound to once materialized or reconciled.
#[derive(Debug)]
pub struct VNode {
    pub kind: String,
    pub attributes: IndexMap<String, AttrValue>,
    pub children: Children,
    pub key: Option<String>,
    pub(crate) el: Option<NodeHandle>,
}

/// Children of a descriptor: either bare text content or a sequence of nodes.
#[derive(Debug)]
pub enum Children {
    Text(String),
    List(Vec<Child>),
}

#[derive(Debug)]
pub enum Child {
    Text(TextChild),
    Element(VNode),
}

/// A text entry inside a children sequence. It keeps its own live text node so
/// reconciliation never has to locate it by position.
#[derive(Debug)]
pub struct TextChild {
    pub content: String,
    pub(crate) el: Option<NodeHandle>,
}

impl TextChild {
    pub fn new(content: impl Into<String>) -> Self {
        TextChild {
            content: content.into(),
            el: None,
        }
    }

    pub fn el(&self) -> Option<NodeHandle> {
        self.el
    }
}

impl VNode {
    pub fn new(kind: impl Into<String>) -> Self {
        VNode {
            kind: kind.into(),
            attributes: IndexMap::new(),
            children: Children::List(Vec::new()),
            key: None,
            el: None,
        }
    }

    /// Live node this descriptor is bound to, `None` until materialized.
    pub fn el(&self) -> Option<NodeHandle> {
        self.el
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let name = name.into();
        let value = value.into();
        if name == KEY_ATTRIBUTE {
            self.key = key_from(&value);
        } else {
            self.attributes.insert(name, value);
        }
        self
    }

    /// Bind `listener` to `event` (stored as the `on<event>` attribute).
    pub fn on(mut self, event: &str, listener: impl Fn(&Event) + 'static) -> Self {
        self.attributes
            .insert(format!("{LISTENER_PREFIX}{event}"), AttrValue::Listener(Listener::new(listener)));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        let child = child.into();
        match &mut self.children {
            Children::List(list) => list.push(child),
            Children::Text(text) => {
                let previous = TextChild::new(std::mem::take(text));
                self.children = Children::List(vec![Child::Text(previous), child]);
            }
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children = Children::Text(text.into());
        self
    }

    /// Element children in order, skipping text entries.
    pub fn element_children(&self) -> impl Iterator<Item = &VNode> {
        let list: &[Child] = match &self.children {
            Children::List(list) => list,
            Children::Text(_) => &[],
        };
        list.iter().filter_map(|c| match c {
            Child::Element(v) => Some(v),
            Child::Text(_) => None,
        })
    }
}

impl Children {
    /// True when any entry carries a stable key.
    pub fn has_keys(&self) -> bool {
        match self {
            Children::Text(_) => false,
            Children::List(list) => list.iter().any(|c| c.key().is_some()),
        }
    }
}

impl Child {
    pub fn key(&self) -> Option<&str> {
        match self {
            Child::Element(v) => v.key.as_deref(),
            Child::Text(_) => None,
        }
    }

    pub fn el(&self) -> Option<NodeHandle> {
        match self {
            Child::Element(v) => v.el,
            Child::Text(t) => t.el,
        }
    }
}

impl From<VNode> for Child {
    fn from(v: VNode) -> Self {
        Child::Element(v)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Text(TextChild::new(s))
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Text(TextChild::new(s))
    }
}

impl From<&str> for Children {
    fn from(s: &str) -> Self {
        Children::Text(s.to_string())
    }
}

impl From<String> for Children {
    fn from(s: String) -> Self {
        Children::Text(s)
    }
}

impl From<VNode> for Children {
    fn from(v: VNode) -> Self {
        Children::List(vec![Child::Element(v)])
    }
}

impl From<Child> for Children {
    fn from(c: Child) -> Self {
        Children::List(vec![c])
    }
}

impl From<Vec<Child>> for Children {
    fn from(list: Vec<Child>) -> Self {
        Children::List(list)
    }
}

impl From<Vec<VNode>> for Children {
    fn from(list: Vec<VNode>) -> Self {
        Children::List(list.into_iter().map(Child::Element).collect())
    }
}

impl From<()> for Children {
    fn from(_: ()) -> Self {
        Children::List(Vec::new())
    }
}

/// Build a descriptor. The reserved `key` attribute is moved into [`VNode::key`];
/// a single child is normalized to a one-element sequence, a string stays bare text.
pub fn h<N, A>(kind: &str, attrs: A, children: impl Into<Children>) -> VNode
where
    N: Into<String>,
    A: IntoIterator<Item = (N, AttrValue)>,
{
    let mut node = VNode::new(kind);
    for (name, value) in attrs {
        node = node.attr(name, value);
    }
    node.children = children.into();
    node
}

fn key_from(value: &AttrValue) -> Option<String> {
    match value {
        AttrValue::Value(serde_json::Value::String(s)) => Some(s.clone()),
        AttrValue::Value(serde_json::Value::Null) => None,
        AttrValue::Value(other) => Some(other.to_string()),
        AttrValue::Listener(_) => {
            warn!("ignoring listener passed as '{}'", KEY_ATTRIBUTE);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_key_attribute() {
        let node = h("li", [("key", AttrValue::from(7i64)), ("class", "row".into())], "x");
        assert_eq!(node.key.as_deref(), Some("7"));
        assert!(!node.attributes.contains_key("key"));
        assert_eq!(node.attributes["class"], AttrValue::Value(json!("row")));
    }

    #[test]
    fn normalizes_single_child() {
        let node = h("div", Vec::<(&str, AttrValue)>::new(), VNode::new("span"));
        match &node.children {
            Children::List(list) => {
                assert_eq!(list.len(), 1);
                assert!(matches!(&list[0], Child::Element(v) if v.kind == "span"));
            }
            Children::Text(_) => panic!("expected a list"),
        }
    }

    #[test]
    fn string_children_stay_text() {
        let node = h("p", Vec::<(&str, AttrValue)>::new(), "hello");
        assert!(matches!(&node.children, Children::Text(t) if t == "hello"));
        assert!(node.el().is_none());
    }

    #[test]
    fn child_after_text_converts_to_list() {
        let node = VNode::new("p").text("a").child(VNode::new("b"));
        match &node.children {
            Children::List(list) => {
                assert!(matches!(&list[0], Child::Text(t) if t.content == "a"));
                assert!(matches!(&list[1], Child::Element(v) if v.kind == "b"));
            }
            Children::Text(_) => panic!("expected a list"),
        }
    }

    #[test]
    fn detects_keyed_children() {
        let keyed = VNode::new("ul").child(VNode::new("li").key("a")).child("tail");
        assert!(keyed.children.has_keys());
        let plain = VNode::new("ul").child(VNode::new("li"));
        assert!(!plain.children.has_keys());
    }
}
