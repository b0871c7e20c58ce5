//! Minimal reactive rendering runtime.
//!
//! Two cooperating halves:
//!
//! - a dependency-tracking reactive layer ([`Runtime`], [`Reactive`], [`Task`]):
//!   reading a field inside a running task registers the task, writing the field
//!   re-runs every registered task synchronously;
//! - a descriptor-tree renderer ([`VNode`], [`materialize`], [`DiffEngine`]) that
//!   keeps a live tree owned by a [`NodeBackend`] in sync with the latest
//!   description, reusing live nodes wherever kinds and keys allow.
//!
//! [`create_app`] ties them together: a component's render task reads state,
//! produces a new tree, and the tree is reconciled into its [`Container`].
//!
//! ```ignore
//! let rt = Runtime::new();
//! let backend = Rc::new(MemoryBackend::new());
//! let host = backend.create_element("main")?;
//! let app = create_app(
//!     Component::new(|s| VNode::new("p").text(s.get("n").to_string()))
//!         .with_state(|| json!({"n": 0})),
//! );
//! let instance = app.mount(&rt, backend.clone(), Rc::new(Container::new(host)))?;
//! instance.state().set("n", 1)?; // re-renders before returning
//! ```
//!
//! Everything is single-threaded and synchronous; there is no batching.
mod backend;
mod component;
mod config;
mod converters;
mod deps;
mod diff_engine;
mod errors;
mod html_generator;
mod materialize;
mod reactive;
mod runtime;
mod types;
mod vnode;

pub use backend::{MemoryBackend, NodeBackend};
pub use component::{create_app, render, App, Component, ComponentInstance, Container};
pub use config::{MoveStrategy, ReconcileOptions, KEY_ATTRIBUTE, LISTENER_PREFIX};
pub use converters::{object_fields, vnode_from_json, vnode_to_json};
pub use diff_engine::{reconcile, DiffEngine, DiffStats};
pub use errors::ReconcilerError;
pub use html_generator::to_html;
pub use materialize::{materialize, materialize_child, mount};
pub use reactive::Reactive;
pub use runtime::{Runtime, Task};
pub use types::{AttrValue, Event, Listener, Mutation, NodeHandle, SubjectId, TaskId};
pub use vnode::{h, Child, Children, TextChild, VNode};
