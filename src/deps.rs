//! Bidirectional mapping between subject fields and the tasks that read them
use crate::runtime::Task;
use crate::types::{SubjectId, TaskId};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

type FieldKey = (SubjectId, String);

/// Dependency sets only grow: a task that stops reading a field stays registered
/// and is re-run (redundantly) on later writes, until it is explicitly removed.
#[derive(Default)]
pub(crate) struct DependencyGraph {
    // insertion-ordered so triggers run tasks in registration order
    dependents: HashMap<FieldKey, IndexMap<TaskId, Task>>,
    dependencies: HashMap<TaskId, IndexSet<FieldKey>>,
}

impl DependencyGraph {
    /// Register `task` as a dependent of `(subject, field)`. Returns false when it
    /// was already registered.
    pub(crate) fn track(&mut self, subject: SubjectId, field: &str, task: &Task) -> bool {
        let key = (subject, field.to_string());
        let set = self.dependents.entry(key.clone()).or_default();
        if set.contains_key(&task.id()) {
            return false;
        }
        set.insert(task.id(), task.clone());
        self.dependencies.entry(task.id()).or_default().insert(key);
        true
    }

    /// Tasks depending on `(subject, field)`, in registration order.
    pub(crate) fn dependents(&self, subject: SubjectId, field: &str) -> Vec<Task> {
        self.dependents
            .get(&(subject, field.to_string()))
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn dependencies(&self, task: TaskId) -> Vec<(SubjectId, String)> {
        self.dependencies
            .get(&task)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every registration of `task`.
    pub(crate) fn remove_task(&mut self, task: TaskId) {
        let Some(keys) = self.dependencies.remove(&task) else {
            return;
        };
        for key in keys {
            if let Some(set) = self.dependents.get_mut(&key) {
                set.shift_remove(&task);
                if set.is_empty() {
                    self.dependents.remove(&key);
                }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.dependents.values().map(IndexMap::len).sum()
    }
}
