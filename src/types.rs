//! Handles, ids, attribute values and the mutation vocabulary of the node backend
use once_cell::sync::Lazy;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle to a live node owned by a [`NodeBackend`](crate::backend::NodeBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u64);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Referential identity of a task. Two tasks with the same body are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Identity of an observable subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(pub u64);

/// Global id generator (lock-free, atomic)
static ID_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(1));

pub(crate) fn next_id() -> u64 {
    ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Event delivered to a bound listener.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub target: NodeHandle,
    pub payload: serde_json::Value,
}

/// Event callback. Equality is identity of the underlying closure.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Listener(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn same(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

/// Value of one descriptor attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Value(serde_json::Value),
    Listener(Listener),
}

impl AttrValue {
    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            AttrValue::Listener(l) => Some(l),
            AttrValue::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            AttrValue::Value(v) => Some(v),
            AttrValue::Listener(_) => None,
        }
    }
}

impl From<serde_json::Value> for AttrValue {
    fn from(v: serde_json::Value) -> Self {
        AttrValue::Value(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Value(serde_json::Value::String(v.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Value(serde_json::Value::String(v))
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Value(serde_json::Value::from(v))
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Value(serde_json::Value::Bool(v))
    }
}

impl From<Listener> for AttrValue {
    fn from(l: Listener) -> Self {
        AttrValue::Listener(l)
    }
}

/// One primitive applied to the live tree, as recorded by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateElement { node: NodeHandle, kind: String },
    CreateText { node: NodeHandle, text: String },
    SetAttribute { node: NodeHandle, name: String, value: serde_json::Value },
    RemoveAttribute { node: NodeHandle, name: String },
    AddListener { node: NodeHandle, event: String },
    RemoveListener { node: NodeHandle, event: String },
    AppendChild { parent: NodeHandle, child: NodeHandle },
    InsertBefore { parent: NodeHandle, child: NodeHandle, anchor: Option<NodeHandle> },
    RemoveChild { parent: NodeHandle, child: NodeHandle },
    SetTextContent { node: NodeHandle, text: String },
}

impl Mutation {
    /// Node the mutation was applied to (the parent for structural edits).
    pub fn target(&self) -> NodeHandle {
        match self {
            Mutation::CreateElement { node, .. }
            | Mutation::CreateText { node, .. }
            | Mutation::SetAttribute { node, .. }
            | Mutation::RemoveAttribute { node, .. }
            | Mutation::AddListener { node, .. }
            | Mutation::RemoveListener { node, .. }
            | Mutation::SetTextContent { node, .. } => *node,
            Mutation::AppendChild { parent, .. }
            | Mutation::InsertBefore { parent, .. }
            | Mutation::RemoveChild { parent, .. } => *parent,
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::CreateElement { node, kind } => write!(f, "CREATE {node} <{kind}>"),
            Mutation::CreateText { node, text } => write!(f, "CREATE_TEXT {node} {text:?}"),
            Mutation::SetAttribute { node, name, value } => write!(f, "SET {node} {name}={value}"),
            Mutation::RemoveAttribute { node, name } => write!(f, "UNSET {node} {name}"),
            Mutation::AddListener { node, event } => write!(f, "LISTEN {node} {event}"),
            Mutation::RemoveListener { node, event } => write!(f, "UNLISTEN {node} {event}"),
            Mutation::AppendChild { parent, child } => write!(f, "APPEND {child} -> {parent}"),
            Mutation::InsertBefore { parent, child, anchor } => match anchor {
                Some(a) => write!(f, "INSERT {child} -> {parent} before {a}"),
                None => write!(f, "INSERT {child} -> {parent} at end"),
            },
            Mutation::RemoveChild { parent, child } => write!(f, "REMOVE {child} from {parent}"),
            Mutation::SetTextContent { node, text } => write!(f, "TEXT {node} {text:?}"),
        }
    }
}
