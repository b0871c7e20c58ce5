//! Mount points, render-to-container and component instances
use crate::backend::NodeBackend;
use crate::config::ReconcileOptions;
use crate::diff_engine::DiffEngine;
use crate::errors::ReconcilerError;
use crate::materialize::mount;
use crate::reactive::Reactive;
use crate::runtime::{Runtime, Task};
use crate::types::NodeHandle;
use crate::vnode::VNode;
use log::debug;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// An external node that holds one rendered tree, plus the descriptor tree last
/// rendered into it.
pub struct Container {
    node: NodeHandle,
    tree: RefCell<Option<VNode>>,
    options: ReconcileOptions,
}

impl Container {
    pub fn new(node: NodeHandle) -> Self {
        Self::with_options(node, ReconcileOptions::default())
    }

    pub fn with_options(node: NodeHandle, options: ReconcileOptions) -> Self {
        Container {
            node,
            tree: RefCell::new(None),
            options,
        }
    }

    pub fn node(&self) -> NodeHandle {
        self.node
    }

    pub fn is_mounted(&self) -> bool {
        self.tree.borrow().is_some()
    }

    /// Live root of the current tree, if anything was rendered.
    pub fn root(&self) -> Option<NodeHandle> {
        self.tree.borrow().as_ref().and_then(VNode::el)
    }

    pub fn with_tree<R>(&self, f: impl FnOnce(Option<&VNode>) -> R) -> R {
        f(self.tree.borrow().as_ref())
    }
}

/// Mount `tree` on the first call for `container`; afterwards reconcile it
/// against the previously rendered tree. On failure the previous tree is kept.
pub fn render<B: NodeBackend + ?Sized>(
    backend: &B,
    mut tree: VNode,
    container: &Container,
) -> Result<(), ReconcilerError> {
    let previous = container.tree.borrow_mut().take();
    match previous {
        None => {
            debug!("render: mounting <{}> into {}", tree.kind, container.node);
            mount(backend, &mut tree, container.node)?;
        }
        Some(old) => {
            let mut engine = DiffEngine::with_options(backend, container.options.clone());
            if let Err(e) = engine.reconcile(&old, &mut tree) {
                *container.tree.borrow_mut() = Some(old);
                return Err(e);
            }
        }
    }
    *container.tree.borrow_mut() = Some(tree);
    Ok(())
}

type RenderFn = dyn Fn(&Reactive) -> VNode;
type StateFn = dyn Fn() -> Value;

/// A render function plus an optional initial-state factory.
#[derive(Clone)]
pub struct Component {
    render: Rc<RenderFn>,
    state: Option<Rc<StateFn>>,
}

impl Component {
    pub fn new(render: impl Fn(&Reactive) -> VNode + 'static) -> Self {
        Component {
            render: Rc::new(render),
            state: None,
        }
    }

    pub fn with_state(mut self, state: impl Fn() -> Value + 'static) -> Self {
        self.state = Some(Rc::new(state));
        self
    }
}

pub struct App {
    component: Component,
}

pub fn create_app(component: Component) -> App {
    App { component }
}

impl App {
    /// Wrap the initial state, then start the render task: it renders once now
    /// and again whenever a field it read is written.
    pub fn mount<B: NodeBackend + 'static>(
        &self,
        runtime: &Runtime,
        backend: Rc<B>,
        container: Rc<Container>,
    ) -> Result<ComponentInstance, ReconcilerError> {
        let initial = match &self.component.state {
            Some(factory) => factory(),
            None => Value::Object(Default::default()),
        };
        let state = runtime.reactive(initial)?;

        let render_fn = self.component.render.clone();
        let task = {
            let (state, container) = (state.clone(), container.clone());
            runtime.effect(move || {
                let tree = render_fn(&state);
                render(backend.as_ref(), tree, &container)
            })?
        };
        debug!("component mounted as {}", task.id());

        Ok(ComponentInstance {
            state,
            task,
            container,
        })
    }
}

/// A mounted component: its state, its render task and where it renders.
pub struct ComponentInstance {
    state: Reactive,
    task: Task,
    container: Rc<Container>,
}

impl ComponentInstance {
    pub fn state(&self) -> &Reactive {
        &self.state
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Re-render without a state change.
    pub fn rerender(&self) -> Result<(), ReconcilerError> {
        self.task.run()
    }
}
