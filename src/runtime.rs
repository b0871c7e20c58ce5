//! Task runner: executes recomputation tasks while tracking which one is current
//!
//! The runtime owns two pieces of state: the dependency graph and a single
//! "current task" slot. Every task execution saves the slot, installs itself,
//! runs, and restores the saved value on the way out, including when the body
//! returns an error or panics. Nested executions therefore behave like a stack
//! even though only one slot exists.
use crate::deps::DependencyGraph;
use crate::errors::ReconcilerError;
use crate::types::{next_id, SubjectId, TaskId};
use log::{debug, trace};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type TaskBody = dyn Fn() -> Result<(), ReconcilerError>;

/// A zero-argument unit of recomputation with referential identity.
///
/// Cloning yields another handle to the same task.
#[derive(Clone)]
pub struct Task {
    inner: Rc<TaskInner>,
}

struct TaskInner {
    id: TaskId,
    body: Box<TaskBody>,
    runtime: Weak<RuntimeInner>,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Execute the task as the current task. Reads performed by the body are
    /// attributed to it.
    pub fn run(&self) -> Result<(), ReconcilerError> {
        let Some(runtime) = self.inner.runtime.upgrade() else {
            return (self.inner.body)();
        };
        let _slot = CurrentSlot::enter(&runtime.current, Some(self.clone()));
        trace!("running {}", self.inner.id);
        (self.inner.body)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Task").field(&self.inner.id).finish()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Task {}

/// Saves the current-task slot on entry and restores it on drop.
struct CurrentSlot<'a> {
    slot: &'a RefCell<Option<Task>>,
    previous: Option<Task>,
}

impl<'a> CurrentSlot<'a> {
    fn enter(slot: &'a RefCell<Option<Task>>, task: Option<Task>) -> Self {
        let previous = slot.replace(task);
        CurrentSlot { slot, previous }
    }
}

impl Drop for CurrentSlot<'_> {
    fn drop(&mut self) {
        self.slot.replace(self.previous.take());
    }
}

#[derive(Default)]
pub(crate) struct RuntimeInner {
    current: RefCell<Option<Task>>,
    graph: RefCell<DependencyGraph>,
}

/// Explicit reactive context. Clones share the same graph and slot.
#[derive(Clone, Default)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task without running it.
    pub fn task(&self, body: impl Fn() -> Result<(), ReconcilerError> + 'static) -> Task {
        Task {
            inner: Rc::new(TaskInner {
                id: TaskId(next_id()),
                body: Box::new(body),
                runtime: Rc::downgrade(&self.inner),
            }),
        }
    }

    /// Run `body` once immediately, establishing its dependencies, and return the
    /// task so callers may re-run it manually.
    pub fn effect(
        &self,
        body: impl Fn() -> Result<(), ReconcilerError> + 'static,
    ) -> Result<Task, ReconcilerError> {
        let task = self.task(body);
        debug!("effect {} created", task.id());
        self.run(&task)?;
        Ok(task)
    }

    pub fn run(&self, task: &Task) -> Result<(), ReconcilerError> {
        task.run()
    }

    pub fn current_task(&self) -> Option<TaskId> {
        self.inner.current.borrow().as_ref().map(Task::id)
    }

    /// Run `f` with no current task, so its reads are not tracked.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _slot = CurrentSlot::enter(&self.inner.current, None);
        f()
    }

    /// Register the current task, if any, as a dependent of `(subject, field)`.
    pub fn track(&self, subject: SubjectId, field: &str) {
        let current = self.inner.current.borrow().clone();
        if let Some(task) = current {
            if self.inner.graph.borrow_mut().track(subject, field, &task) {
                trace!("{} depends on {:?}.{}", task.id(), subject, field);
            }
        }
    }

    /// Synchronously re-run every task depending on `(subject, field)`, in
    /// registration order. The first failure stops the cascade and is returned.
    pub fn trigger(&self, subject: SubjectId, field: &str) -> Result<(), ReconcilerError> {
        let tasks = self.inner.graph.borrow().dependents(subject, field);
        if !tasks.is_empty() {
            debug!("{:?}.{} changed, re-running {} task(s)", subject, field, tasks.len());
        }
        for task in tasks {
            task.run()?;
        }
        Ok(())
    }

    /// Remove `task` from every dependency set it belongs to.
    pub fn stop(&self, task: &Task) {
        self.inner.graph.borrow_mut().remove_task(task.id());
    }

    pub fn dependents(&self, subject: SubjectId, field: &str) -> Vec<TaskId> {
        self.inner
            .graph
            .borrow()
            .dependents(subject, field)
            .iter()
            .map(Task::id)
            .collect()
    }

    pub fn dependencies(&self, task: &Task) -> Vec<(SubjectId, String)> {
        self.inner.graph.borrow().dependencies(task.id())
    }

    /// Total number of (field, task) registrations.
    pub fn dependency_count(&self) -> usize {
        self.inner.graph.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn effect_runs_once_and_clears_slot() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0));
        let seen = Rc::new(Cell::new(None));
        let (r, s, rt2) = (runs.clone(), seen.clone(), rt.clone());
        let task = rt
            .effect(move || {
                r.set(r.get() + 1);
                s.set(rt2.current_task());
                Ok(())
            })
            .unwrap();
        assert_eq!(runs.get(), 1);
        assert_eq!(seen.get(), Some(task.id()));
        assert_eq!(rt.current_task(), None);

        task.run().unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nested_runs_restore_outer_task() {
        let rt = Runtime::new();
        let observed = Rc::new(RefCell::new(Vec::new()));

        let inner = {
            let (rt, obs) = (rt.clone(), observed.clone());
            rt.clone().task(move || {
                obs.borrow_mut().push(("inner", rt.current_task()));
                Ok(())
            })
        };
        let outer = {
            let (rt, obs, inner) = (rt.clone(), observed.clone(), inner.clone());
            rt.clone().task(move || {
                obs.borrow_mut().push(("before", rt.current_task()));
                inner.run()?;
                obs.borrow_mut().push(("after", rt.current_task()));
                Ok(())
            })
        };
        outer.run().unwrap();

        assert_eq!(
            *observed.borrow(),
            vec![
                ("before", Some(outer.id())),
                ("inner", Some(inner.id())),
                ("after", Some(outer.id())),
            ]
        );
    }

    #[test]
    fn failing_task_restores_slot() {
        let rt = Runtime::new();
        let failing = {
            let rt = rt.clone();
            rt.clone().task(move || {
                let id = rt.current_task().unwrap_or(TaskId(0));
                Err(ReconcilerError::task_failed(id, "boom"))
            })
        };
        let outer_seen = Rc::new(Cell::new(None));
        let outer = {
            let (rt, failing, seen) = (rt.clone(), failing.clone(), outer_seen.clone());
            rt.clone().task(move || {
                assert!(failing.run().is_err());
                seen.set(rt.current_task());
                Ok(())
            })
        };
        outer.run().unwrap();
        assert_eq!(outer_seen.get(), Some(outer.id()));
        assert_eq!(rt.current_task(), None);
    }

    #[test]
    fn panicking_task_restores_slot() {
        let rt = Runtime::new();
        let task = rt.task(|| panic!("render exploded"));
        let result = catch_unwind(AssertUnwindSafe(|| task.run()));
        assert!(result.is_err());
        assert_eq!(rt.current_task(), None);
    }

    #[test]
    fn untracked_hides_current_task() {
        let rt = Runtime::new();
        let seen = Rc::new(Cell::new(Some(TaskId(0))));
        let (rt2, s) = (rt.clone(), seen.clone());
        let task = rt
            .effect(move || {
                s.set(rt2.untracked(|| rt2.current_task()));
                Ok(())
            })
            .unwrap();
        assert_eq!(seen.get(), None);
        task.run().unwrap();
    }
}
