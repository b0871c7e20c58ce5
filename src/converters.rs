//! Zero-panic conversions between JSON values, subjects and descriptors
use crate::errors::ReconcilerError;
use crate::types::AttrValue;
use crate::vnode::{Child, Children, VNode};
use indexmap::IndexMap;
use serde_json::{Map, Value};

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Convert a JSON object into an insertion-ordered field map.
pub fn object_fields(value: Value) -> Result<IndexMap<String, Value>, ReconcilerError> {
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(ReconcilerError::TypeConversionError {
            expected: "object".into(),
            actual: type_name(&other).into(),
        }),
    }
}

/// Build a descriptor tree from its JSON form:
/// `{"kind": "ul", "attributes": {...}, "key": "k", "children": "text" | [child, ...]}`
/// where each child is a string (text) or a nested node object.
///
/// Listeners cannot be expressed in JSON; `on*` attributes become plain attributes.
pub fn vnode_from_json(value: &Value) -> Result<VNode, ReconcilerError> {
    let obj = value.as_object().ok_or_else(|| ReconcilerError::InvalidDescriptor {
        details: format!("expected a node object, got {}", type_name(value)),
    })?;
    let kind = obj.get("kind").and_then(Value::as_str).ok_or_else(|| {
        ReconcilerError::InvalidDescriptor {
            details: "missing string field 'kind'".into(),
        }
    })?;

    let mut node = VNode::new(kind);
    match obj.get("attributes") {
        None | Some(Value::Null) => {}
        Some(Value::Object(attrs)) => {
            for (name, v) in attrs {
                node = node.attr(name.as_str(), AttrValue::Value(v.clone()));
            }
        }
        Some(other) => {
            return Err(ReconcilerError::InvalidDescriptor {
                details: format!("'attributes' of <{}> must be an object, got {}", kind, type_name(other)),
            });
        }
    }
    match obj.get("key") {
        None | Some(Value::Null) => {}
        Some(Value::String(k)) => node.key = Some(k.clone()),
        Some(other) => node.key = Some(other.to_string()),
    }

    node.children = match obj.get("children") {
        None | Some(Value::Null) => Children::List(Vec::new()),
        Some(Value::String(text)) => Children::Text(text.clone()),
        Some(Value::Array(items)) => Children::List(
            items
                .iter()
                .map(child_from_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(single @ Value::Object(_)) => Children::List(vec![child_from_json(single)?]),
        Some(other) => {
            return Err(ReconcilerError::InvalidDescriptor {
                details: format!("'children' of <{}> cannot be {}", kind, type_name(other)),
            });
        }
    };
    Ok(node)
}

fn child_from_json(value: &Value) -> Result<Child, ReconcilerError> {
    match value {
        Value::String(s) => Ok(Child::from(s.as_str())),
        Value::Number(n) => Ok(Child::from(n.to_string())),
        Value::Object(_) => Ok(Child::Element(vnode_from_json(value)?)),
        other => Err(ReconcilerError::InvalidDescriptor {
            details: format!("a child cannot be {}", type_name(other)),
        }),
    }
}

/// JSON form of a descriptor tree. Listener attributes are omitted.
pub fn vnode_to_json(node: &VNode) -> Value {
    let mut obj = Map::new();
    obj.insert("kind".into(), Value::String(node.kind.clone()));
    if let Some(key) = &node.key {
        obj.insert("key".into(), Value::String(key.clone()));
    }
    let attrs: Map<String, Value> = node
        .attributes
        .iter()
        .filter_map(|(k, v)| v.as_value().map(|v| (k.clone(), v.clone())))
        .collect();
    if !attrs.is_empty() {
        obj.insert("attributes".into(), Value::Object(attrs));
    }
    let children = match &node.children {
        Children::Text(t) => Value::String(t.clone()),
        Children::List(list) => Value::Array(
            list.iter()
                .map(|c| match c {
                    Child::Text(t) => Value::String(t.content.clone()),
                    Child::Element(v) => vnode_to_json(v),
                })
                .collect(),
        ),
    };
    obj.insert("children".into(), children);
    Value::Object(obj)
}
