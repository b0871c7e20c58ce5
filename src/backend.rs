//! The node backend collaborator and an in-memory implementation of it
use crate::errors::ReconcilerError;
use crate::types::{Event, Listener, Mutation, NodeHandle};
use indexmap::IndexMap;
use log::trace;
use phf::phf_set;
use std::cell::RefCell;
use std::collections::HashMap;

/// Primitives the reconciler needs from whatever owns the live nodes.
///
/// Methods take `&self`: listeners fired by a backend may write reactive state,
/// which re-renders synchronously and calls back into the same backend.
pub trait NodeBackend {
    fn create_element(&self, kind: &str) -> Result<NodeHandle, ReconcilerError>;
    fn create_text_node(&self, text: &str) -> Result<NodeHandle, ReconcilerError>;
    fn set_attribute(
        &self,
        node: NodeHandle,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), ReconcilerError>;
    fn remove_attribute(&self, node: NodeHandle, name: &str) -> Result<(), ReconcilerError>;
    fn add_event_listener(
        &self,
        node: NodeHandle,
        event: &str,
        listener: &Listener,
    ) -> Result<(), ReconcilerError>;
    fn remove_event_listener(
        &self,
        node: NodeHandle,
        event: &str,
        listener: &Listener,
    ) -> Result<(), ReconcilerError>;
    fn append_child(&self, parent: NodeHandle, child: NodeHandle) -> Result<(), ReconcilerError>;
    /// Insert `child` before `anchor`, or at the end when `anchor` is `None`.
    /// A child that is already attached somewhere is moved.
    fn insert_before(
        &self,
        parent: NodeHandle,
        child: NodeHandle,
        anchor: Option<NodeHandle>,
    ) -> Result<(), ReconcilerError>;
    fn remove_child(&self, parent: NodeHandle, child: NodeHandle) -> Result<(), ReconcilerError>;
    /// On an element, replaces every child with the text; on a text node, sets its data.
    fn set_text_content(&self, node: NodeHandle, text: &str) -> Result<(), ReconcilerError>;
    fn parent_node(&self, node: NodeHandle) -> Result<Option<NodeHandle>, ReconcilerError>;
    fn next_sibling(&self, node: NodeHandle) -> Result<Option<NodeHandle>, ReconcilerError>;
}

// Compile-time set of element kinds the in-memory backend accepts
static KNOWN_KINDS: phf::Set<&'static str> = phf_set! {
    "a", "article", "aside", "b", "body", "br", "button", "canvas", "code", "div",
    "em", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "i", "img", "input", "label", "li", "main", "nav", "ol", "option", "p", "pre",
    "section", "select", "small", "span", "strong", "table", "tbody", "td",
    "textarea", "th", "thead", "tr", "ul",
};

#[derive(Debug)]
pub(crate) enum MemContent {
    Element {
        kind: String,
        attributes: IndexMap<String, serde_json::Value>,
        listeners: IndexMap<String, Vec<Listener>>,
        children: Vec<NodeHandle>,
    },
    Text(String),
}

#[derive(Debug)]
pub(crate) struct MemNode {
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) content: MemContent,
}

#[derive(Default)]
struct Arena {
    nodes: HashMap<NodeHandle, MemNode>,
    next: u64,
    log: Vec<Mutation>,
}

impl Arena {
    fn alloc(&mut self, content: MemContent) -> NodeHandle {
        self.next += 1;
        let handle = NodeHandle(self.next);
        self.nodes.insert(handle, MemNode { parent: None, content });
        handle
    }

    fn node(&self, handle: NodeHandle) -> Result<&MemNode, ReconcilerError> {
        self.nodes.get(&handle).ok_or(ReconcilerError::StaleNode { handle })
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut MemNode, ReconcilerError> {
        self.nodes.get_mut(&handle).ok_or(ReconcilerError::StaleNode { handle })
    }

    fn children_mut(&mut self, handle: NodeHandle) -> Result<&mut Vec<NodeHandle>, ReconcilerError> {
        match &mut self.node_mut(handle)?.content {
            MemContent::Element { children, .. } => Ok(children),
            MemContent::Text(_) => Err(ReconcilerError::NotAChild { parent: handle, child: handle }),
        }
    }

    fn detach(&mut self, child: NodeHandle) -> Result<(), ReconcilerError> {
        if let Some(parent) = self.node(child)?.parent {
            self.children_mut(parent)?.retain(|c| *c != child);
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    /// Drop `handle` and its whole subtree from the arena.
    fn free(&mut self, handle: NodeHandle) {
        let mut pending = vec![handle];
        while let Some(h) = pending.pop() {
            if let Some(MemNode { content: MemContent::Element { children, .. }, .. }) =
                self.nodes.remove(&h)
            {
                pending.extend(children);
            }
        }
    }
}

/// Arena-backed live tree. Every mutating primitive is appended to an operation
/// log so callers can observe exactly what a reconciliation did.
#[derive(Default)]
pub struct MemoryBackend {
    arena: RefCell<Arena>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known_kind(kind: &str) -> bool {
        KNOWN_KINDS.contains(kind) || kind.contains('-')
    }

    /// Recorded mutations since creation or the last [`clear_mutations`](Self::clear_mutations).
    pub fn mutations(&self) -> Vec<Mutation> {
        self.arena.borrow().log.clone()
    }

    pub fn clear_mutations(&self) {
        self.arena.borrow_mut().log.clear();
    }

    pub fn take_mutations(&self) -> Vec<Mutation> {
        std::mem::take(&mut self.arena.borrow_mut().log)
    }

    pub fn kind(&self, node: NodeHandle) -> Option<String> {
        match &self.arena.borrow().nodes.get(&node)?.content {
            MemContent::Element { kind, .. } => Some(kind.clone()),
            MemContent::Text(_) => None,
        }
    }

    pub fn attribute(&self, node: NodeHandle, name: &str) -> Option<serde_json::Value> {
        match &self.arena.borrow().nodes.get(&node)?.content {
            MemContent::Element { attributes, .. } => attributes.get(name).cloned(),
            MemContent::Text(_) => None,
        }
    }

    pub fn children(&self, node: NodeHandle) -> Vec<NodeHandle> {
        match self.arena.borrow().nodes.get(&node).map(|n| &n.content) {
            Some(MemContent::Element { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text_content(&self, node: NodeHandle) -> String {
        let arena = self.arena.borrow();
        let mut out = String::new();
        collect_text(&arena, node, &mut out);
        out
    }

    /// Number of nodes the arena currently holds, attached or not.
    pub fn node_count(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    pub fn listener_count(&self, node: NodeHandle, event: &str) -> usize {
        match self.arena.borrow().nodes.get(&node).map(|n| &n.content) {
            Some(MemContent::Element { listeners, .. }) => {
                listeners.get(event).map(Vec::len).unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Invoke every listener bound to `event` on `node`, returning how many ran.
    ///
    /// The listeners are cloned out first so they may call back into the backend.
    pub fn dispatch(
        &self,
        node: NodeHandle,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<usize, ReconcilerError> {
        let bound: Vec<Listener> = {
            let arena = self.arena.borrow();
            match &arena.node(node)?.content {
                MemContent::Element { listeners, .. } => {
                    listeners.get(event).cloned().unwrap_or_default()
                }
                MemContent::Text(_) => Vec::new(),
            }
        };
        let ev = Event {
            name: event.to_string(),
            target: node,
            payload,
        };
        for listener in &bound {
            listener.call(&ev);
        }
        Ok(bound.len())
    }

    /// Serialize the subtree rooted at `node` as HTML.
    pub fn to_html(&self, node: NodeHandle) -> String {
        crate::html_generator::to_html(self, node)
    }

    pub(crate) fn with_node<R>(&self, node: NodeHandle, f: impl FnOnce(&MemNode) -> R) -> Option<R> {
        self.arena.borrow().nodes.get(&node).map(f)
    }

    fn record(&self, m: Mutation) {
        trace!("MemoryBackend: {}", m);
        self.arena.borrow_mut().log.push(m);
    }
}

fn collect_text(arena: &Arena, node: NodeHandle, out: &mut String) {
    match arena.nodes.get(&node).map(|n| &n.content) {
        Some(MemContent::Text(t)) => out.push_str(t),
        Some(MemContent::Element { children, .. }) => {
            for c in children {
                collect_text(arena, *c, out);
            }
        }
        None => {}
    }
}

impl NodeBackend for MemoryBackend {
    fn create_element(&self, kind: &str) -> Result<NodeHandle, ReconcilerError> {
        if !Self::is_known_kind(kind) {
            return Err(ReconcilerError::UnknownKind { kind: kind.to_string() });
        }
        let node = self.arena.borrow_mut().alloc(MemContent::Element {
            kind: kind.to_string(),
            attributes: IndexMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
        });
        self.record(Mutation::CreateElement { node, kind: kind.to_string() });
        Ok(node)
    }

    fn create_text_node(&self, text: &str) -> Result<NodeHandle, ReconcilerError> {
        let node = self.arena.borrow_mut().alloc(MemContent::Text(text.to_string()));
        self.record(Mutation::CreateText { node, text: text.to_string() });
        Ok(node)
    }

    fn set_attribute(
        &self,
        node: NodeHandle,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), ReconcilerError> {
        {
            let mut arena = self.arena.borrow_mut();
            if let MemContent::Element { attributes, .. } = &mut arena.node_mut(node)?.content {
                attributes.insert(name.to_string(), value.clone());
            }
        }
        self.record(Mutation::SetAttribute {
            node,
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn remove_attribute(&self, node: NodeHandle, name: &str) -> Result<(), ReconcilerError> {
        {
            let mut arena = self.arena.borrow_mut();
            if let MemContent::Element { attributes, .. } = &mut arena.node_mut(node)?.content {
                attributes.shift_remove(name);
            }
        }
        self.record(Mutation::RemoveAttribute { node, name: name.to_string() });
        Ok(())
    }

    fn add_event_listener(
        &self,
        node: NodeHandle,
        event: &str,
        listener: &Listener,
    ) -> Result<(), ReconcilerError> {
        {
            let mut arena = self.arena.borrow_mut();
            if let MemContent::Element { listeners, .. } = &mut arena.node_mut(node)?.content {
                let bound = listeners.entry(event.to_string()).or_default();
                if !bound.iter().any(|l| l.same(listener)) {
                    bound.push(listener.clone());
                }
            }
        }
        self.record(Mutation::AddListener { node, event: event.to_string() });
        Ok(())
    }

    fn remove_event_listener(
        &self,
        node: NodeHandle,
        event: &str,
        listener: &Listener,
    ) -> Result<(), ReconcilerError> {
        {
            let mut arena = self.arena.borrow_mut();
            if let MemContent::Element { listeners, .. } = &mut arena.node_mut(node)?.content {
                if let Some(bound) = listeners.get_mut(event) {
                    bound.retain(|l| !l.same(listener));
                }
            }
        }
        self.record(Mutation::RemoveListener { node, event: event.to_string() });
        Ok(())
    }

    fn append_child(&self, parent: NodeHandle, child: NodeHandle) -> Result<(), ReconcilerError> {
        {
            let mut arena = self.arena.borrow_mut();
            arena.node(child)?;
            arena.detach(child)?;
            arena.children_mut(parent)?.push(child);
            arena.node_mut(child)?.parent = Some(parent);
        }
        self.record(Mutation::AppendChild { parent, child });
        Ok(())
    }

    fn insert_before(
        &self,
        parent: NodeHandle,
        child: NodeHandle,
        anchor: Option<NodeHandle>,
    ) -> Result<(), ReconcilerError> {
        {
            let mut arena = self.arena.borrow_mut();
            if anchor != Some(child) {
                arena.node(child)?;
                if let Some(a) = anchor {
                    if arena.node(a)?.parent != Some(parent) {
                        return Err(ReconcilerError::NotAChild { parent, child: a });
                    }
                }
                arena.detach(child)?;
                let children = arena.children_mut(parent)?;
                let at = anchor
                    .and_then(|a| children.iter().position(|c| *c == a))
                    .unwrap_or(children.len());
                children.insert(at, child);
                arena.node_mut(child)?.parent = Some(parent);
            }
        }
        self.record(Mutation::InsertBefore { parent, child, anchor });
        Ok(())
    }

    fn remove_child(&self, parent: NodeHandle, child: NodeHandle) -> Result<(), ReconcilerError> {
        {
            let mut arena = self.arena.borrow_mut();
            if arena.node(child)?.parent != Some(parent) {
                return Err(ReconcilerError::NotAChild { parent, child });
            }
            arena.detach(child)?;
        }
        self.record(Mutation::RemoveChild { parent, child });
        Ok(())
    }

    fn set_text_content(&self, node: NodeHandle, text: &str) -> Result<(), ReconcilerError> {
        {
            let mut arena = self.arena.borrow_mut();
            let is_text = matches!(arena.node(node)?.content, MemContent::Text(_));
            if is_text {
                arena.node_mut(node)?.content = MemContent::Text(text.to_string());
            } else {
                let old = std::mem::take(arena.children_mut(node)?);
                // a lone text child is rewritten in place
                let reuse = match old.as_slice() {
                    [only] if !text.is_empty() => arena
                        .nodes
                        .get(only)
                        .is_some_and(|n| matches!(n.content, MemContent::Text(_)))
                        .then_some(*only),
                    _ => None,
                };
                match reuse {
                    Some(t) => {
                        arena.node_mut(t)?.content = MemContent::Text(text.to_string());
                        arena.children_mut(node)?.push(t);
                    }
                    None => {
                        for c in old {
                            arena.free(c);
                        }
                        if !text.is_empty() {
                            let t = arena.alloc(MemContent::Text(text.to_string()));
                            arena.children_mut(node)?.push(t);
                            arena.node_mut(t)?.parent = Some(node);
                        }
                    }
                }
            }
        }
        self.record(Mutation::SetTextContent { node, text: text.to_string() });
        Ok(())
    }

    fn parent_node(&self, node: NodeHandle) -> Result<Option<NodeHandle>, ReconcilerError> {
        Ok(self.arena.borrow().node(node)?.parent)
    }

    fn next_sibling(&self, node: NodeHandle) -> Result<Option<NodeHandle>, ReconcilerError> {
        let arena = self.arena.borrow();
        let Some(parent) = arena.node(node)?.parent else {
            return Ok(None);
        };
        match &arena.node(parent)?.content {
            MemContent::Element { children, .. } => {
                let at = children.iter().position(|c| *c == node);
                Ok(at.and_then(|i| children.get(i + 1)).copied())
            }
            MemContent::Text(_) => Ok(None),
        }
    }
}
