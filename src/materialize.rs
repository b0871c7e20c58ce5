//! Turns descriptors into live nodes and binds them back
use crate::backend::NodeBackend;
use crate::config::listener_event;
use crate::errors::ReconcilerError;
use crate::types::{AttrValue, NodeHandle};
use crate::vnode::{Child, Children, VNode};
use log::warn;

/// Create the live subtree for `vnode` and bind every descriptor in it.
/// The returned root is detached; see [`mount`] to attach it.
pub fn materialize<B: NodeBackend + ?Sized>(
    backend: &B,
    vnode: &mut VNode,
) -> Result<NodeHandle, ReconcilerError> {
    let el = backend.create_element(&vnode.kind)?;
    for (name, value) in &vnode.attributes {
        apply_attribute(backend, el, name, value)?;
    }
    match &mut vnode.children {
        Children::Text(text) => {
            if !text.is_empty() {
                backend.set_text_content(el, text)?;
            }
        }
        Children::List(list) => {
            for child in list.iter_mut() {
                let node = materialize_child(backend, child)?;
                backend.append_child(el, node)?;
            }
        }
    }
    vnode.el = Some(el);
    Ok(el)
}

pub fn materialize_child<B: NodeBackend + ?Sized>(
    backend: &B,
    child: &mut Child,
) -> Result<NodeHandle, ReconcilerError> {
    match child {
        Child::Text(text) => {
            let node = backend.create_text_node(&text.content)?;
            text.el = Some(node);
            Ok(node)
        }
        Child::Element(vnode) => materialize(backend, vnode),
    }
}

/// Materialize `vnode` and append it under `parent`.
pub fn mount<B: NodeBackend + ?Sized>(
    backend: &B,
    vnode: &mut VNode,
    parent: NodeHandle,
) -> Result<NodeHandle, ReconcilerError> {
    let el = materialize(backend, vnode)?;
    backend.append_child(parent, el)?;
    Ok(el)
}

pub(crate) fn apply_attribute<B: NodeBackend + ?Sized>(
    backend: &B,
    el: NodeHandle,
    name: &str,
    value: &AttrValue,
) -> Result<(), ReconcilerError> {
    match (listener_event(name), value) {
        (Some(event), AttrValue::Listener(listener)) => {
            backend.add_event_listener(el, &event, listener)
        }
        (_, AttrValue::Value(v)) => backend.set_attribute(el, name, v),
        (None, AttrValue::Listener(_)) => {
            warn!("listener under non-listener attribute '{}' ignored", name);
            Ok(())
        }
    }
}

/// Undo [`apply_attribute`] for a value that is no longer wanted.
pub(crate) fn clear_attribute<B: NodeBackend + ?Sized>(
    backend: &B,
    el: NodeHandle,
    name: &str,
    previous: &AttrValue,
) -> Result<(), ReconcilerError> {
    match (listener_event(name), previous) {
        (Some(event), AttrValue::Listener(listener)) => {
            backend.remove_event_listener(el, &event, listener)
        }
        (_, AttrValue::Value(_)) => backend.remove_attribute(el, name),
        (None, AttrValue::Listener(_)) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::types::Mutation;
    use serde_json::json;

    #[test]
    fn binds_every_descriptor() {
        let b = MemoryBackend::new();
        let root = b.create_element("main").unwrap();
        let mut tree = VNode::new("ul")
            .attr("class", "list")
            .child(VNode::new("li").text("one"))
            .child("two");

        let el = mount(&b, &mut tree, root).unwrap();
        assert_eq!(tree.el(), Some(el));
        assert_eq!(b.children(root), vec![el]);
        let children = match &tree.children {
            Children::List(list) => list,
            Children::Text(_) => unreachable!(),
        };
        assert!(children.iter().all(|c| c.el().is_some()));
        assert_eq!(b.to_html(el), "<ul class=\"list\"><li>one</li>two</ul>");
    }

    #[test]
    fn listeners_are_bound_not_set() {
        let b = MemoryBackend::new();
        let mut tree = VNode::new("button").on("click", |_| {}).attr("onhover", "plain");
        let el = materialize(&b, &mut tree).unwrap();

        assert_eq!(b.listener_count(el, "click"), 1);
        assert_eq!(b.attribute(el, "onclick"), None);
        // a plain value under the listener prefix is still an attribute
        assert_eq!(b.attribute(el, "onhover"), Some(json!("plain")));
        assert!(b.mutations().contains(&Mutation::AddListener { node: el, event: "click".into() }));
    }

    #[test]
    fn unknown_kind_propagates() {
        let b = MemoryBackend::new();
        let mut tree = VNode::new("div").child(VNode::new("marquee"));
        let err = materialize(&b, &mut tree).unwrap_err();
        assert!(matches!(err, ReconcilerError::UnknownKind { ref kind } if kind == "marquee"));
        assert!(tree.el().is_none());
    }
}
