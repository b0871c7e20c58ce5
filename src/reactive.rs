//! Observable subjects: every field read tracks, every field write triggers
use crate::converters::object_fields;
use crate::errors::ReconcilerError;
use crate::runtime::Runtime;
use crate::types::{next_id, SubjectId};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Handle to a structured value whose field accesses go through the runtime.
///
/// Nested values are returned as plain clones; only top-level fields are observed.
/// Writes always trigger, even when the new value equals the old one.
#[derive(Clone)]
pub struct Reactive {
    id: SubjectId,
    fields: Rc<RefCell<IndexMap<String, Value>>>,
    runtime: Runtime,
}

impl Runtime {
    /// Make a JSON object observable.
    pub fn reactive(&self, value: Value) -> Result<Reactive, ReconcilerError> {
        Ok(Reactive {
            id: SubjectId(next_id()),
            fields: Rc::new(RefCell::new(object_fields(value)?)),
            runtime: self.clone(),
        })
    }

    /// Make any serializable struct observable.
    pub fn reactive_from<T: Serialize>(&self, value: &T) -> Result<Reactive, ReconcilerError> {
        self.reactive(serde_json::to_value(value)?)
    }
}

impl Reactive {
    pub fn id(&self) -> SubjectId {
        self.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Tracked read. A missing field reads as `null`.
    pub fn get(&self, field: &str) -> Value {
        self.runtime.track(self.id, field);
        self.peek(field)
    }

    /// Untracked read.
    pub fn peek(&self, field: &str) -> Value {
        self.fields.borrow().get(field).cloned().unwrap_or(Value::Null)
    }

    /// Write `value`, then synchronously re-run every task that read `field`.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<(), ReconcilerError> {
        self.fields
            .borrow_mut()
            .insert(field.to_string(), value.into());
        self.runtime.trigger(self.id, field)
    }

    pub fn update(
        &self,
        field: &str,
        f: impl FnOnce(Value) -> Value,
    ) -> Result<(), ReconcilerError> {
        let next = f(self.get(field));
        self.set(field, next)
    }

    /// Field names, tracking each of them.
    pub fn fields(&self) -> Vec<String> {
        let names: Vec<String> = self.fields.borrow().keys().cloned().collect();
        for name in &names {
            self.runtime.track(self.id, name);
        }
        names
    }

    /// Deserialize the current fields, tracking all of them.
    pub fn snapshot<T: DeserializeOwned>(&self) -> Result<T, ReconcilerError> {
        self.fields();
        let map: serde_json::Map<String, Value> = self
            .fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.id)
            .field("fields", &self.fields.borrow())
            .finish()
    }
}
