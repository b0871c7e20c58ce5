//! Core diffing engine: reconciles two descriptor trees against the live tree
//!
//! The old tree must be fully bound (it is what is currently displayed). After a
//! successful reconciliation every descriptor in the new tree is bound, either to
//! a reused live node or to a freshly materialized one.
use crate::backend::NodeBackend;
use crate::config::{MoveStrategy, ReconcileOptions};
use crate::errors::ReconcilerError;
use crate::materialize::{apply_attribute, clear_attribute, materialize, materialize_child};
use crate::types::{AttrValue, NodeHandle};
use crate::vnode::{Child, Children, VNode};
use indexmap::IndexMap;
use log::{debug, trace};
use std::collections::HashMap;

/// Work performed by one reconciliation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    /// Subtrees materialized and inserted.
    pub inserted: usize,
    /// Live nodes detached.
    pub removed: usize,
    /// Live nodes relocated among their siblings.
    pub moved: usize,
    /// Nodes swapped for a fresh subtree because their kind or shape changed.
    pub replaced: usize,
    pub attributes_set: usize,
    pub attributes_removed: usize,
    pub texts_updated: usize,
}

pub struct DiffEngine<'a, B: NodeBackend + ?Sized> {
    backend: &'a B,
    options: ReconcileOptions,
    stats: DiffStats,
}

/// Reconcile with default options.
pub fn reconcile<B: NodeBackend + ?Sized>(
    backend: &B,
    old: &VNode,
    new: &mut VNode,
) -> Result<(), ReconcilerError> {
    DiffEngine::new(backend).reconcile(old, new).map(|_| ())
}

impl<'a, B: NodeBackend + ?Sized> DiffEngine<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self::with_options(backend, ReconcileOptions::default())
    }

    pub fn with_options(backend: &'a B, options: ReconcileOptions) -> Self {
        DiffEngine {
            backend,
            options,
            stats: DiffStats::default(),
        }
    }

    /// Mutate the live tree bound to `old` so it matches `new`, binding `new`.
    pub fn reconcile(&mut self, old: &VNode, new: &mut VNode) -> Result<DiffStats, ReconcilerError> {
        self.stats = DiffStats::default();
        self.diff_node(old, new)?;
        debug!("DiffEngine: reconciled <{}>: {:?}", new.kind, self.stats);
        Ok(self.stats)
    }

    fn diff_node(&mut self, old: &VNode, new: &mut VNode) -> Result<(), ReconcilerError> {
        let el = old.el.ok_or_else(|| ReconcilerError::Unbound { kind: old.kind.clone() })?;

        if old.kind != new.kind {
            return self.replace_node(el, new);
        }

        new.el = Some(el);
        self.diff_attributes(el, &old.attributes, &new.attributes)?;
        self.diff_children(el, &old.children, &mut new.children)
    }

    /// Kinds differ: drop the old subtree and put a fresh one at the same position.
    fn replace_node(&mut self, old_el: NodeHandle, new: &mut VNode) -> Result<(), ReconcilerError> {
        debug!("DiffEngine: replacing {} with fresh <{}>", old_el, new.kind);
        // build first so a failed materialization leaves the live tree intact
        let el = materialize(self.backend, new)?;
        if let Some(p) = self.backend.parent_node(old_el)? {
            let next = self.backend.next_sibling(old_el)?;
            self.backend.remove_child(p, old_el)?;
            self.backend.insert_before(p, el, next)?;
        }
        self.stats.replaced += 1;
        Ok(())
    }

    fn diff_attributes(
        &mut self,
        el: NodeHandle,
        old: &IndexMap<String, AttrValue>,
        new: &IndexMap<String, AttrValue>,
    ) -> Result<(), ReconcilerError> {
        for (name, value) in new {
            let previous = old.get(name);
            if previous == Some(value) {
                continue;
            }
            if let Some(prev) = previous {
                // a listener has to be unbound before its replacement is bound,
                // and a plain value does not survive becoming a listener
                if prev.as_listener().is_some() || value.as_listener().is_some() {
                    clear_attribute(self.backend, el, name, prev)?;
                }
            }
            apply_attribute(self.backend, el, name, value)?;
            self.stats.attributes_set += 1;
        }

        for (name, prev) in old {
            if !new.contains_key(name) {
                clear_attribute(self.backend, el, name, prev)?;
                self.stats.attributes_removed += 1;
            }
        }
        Ok(())
    }

    fn diff_children(
        &mut self,
        el: NodeHandle,
        old: &Children,
        new: &mut Children,
    ) -> Result<(), ReconcilerError> {
        let keyed = new.has_keys();
        match (old, new) {
            (old, Children::Text(text)) => {
                let unchanged = match old {
                    Children::Text(prev) => prev.as_str() == text.as_str(),
                    Children::List(list) => list.is_empty() && text.is_empty(),
                };
                if !unchanged {
                    self.backend.set_text_content(el, text)?;
                    self.stats.texts_updated += 1;
                }
            }
            (Children::Text(prev), Children::List(list)) => {
                if !prev.is_empty() {
                    self.backend.set_text_content(el, "")?;
                }
                for child in list.iter_mut() {
                    let node = materialize_child(self.backend, child)?;
                    self.backend.append_child(el, node)?;
                    self.stats.inserted += 1;
                }
            }
            (Children::List(old_list), Children::List(new_list)) => {
                if keyed {
                    self.diff_keyed(el, old_list, new_list)?;
                } else {
                    self.diff_indexed(el, old_list, new_list)?;
                }
            }
        }
        Ok(())
    }

    /// Unkeyed children are matched by position.
    fn diff_indexed(
        &mut self,
        parent: NodeHandle,
        old: &[Child],
        new: &mut [Child],
    ) -> Result<(), ReconcilerError> {
        let shared = old.len().min(new.len());
        trace!("DiffEngine: index diff old={} new={}", old.len(), new.len());

        for (o, n) in old.iter().zip(new.iter_mut()) {
            match (o, n) {
                (Child::Text(o), Child::Text(n)) => {
                    let el = o.el.ok_or_else(unbound_text)?;
                    if o.content != n.content {
                        self.backend.set_text_content(el, &n.content)?;
                        self.stats.texts_updated += 1;
                    }
                    n.el = Some(el);
                }
                (Child::Element(o), Child::Element(n)) => self.diff_node(o, n)?,
                (o, n) => {
                    let old_el = live(o)?;
                    let el = materialize_child(self.backend, n)?;
                    self.backend.insert_before(parent, el, Some(old_el))?;
                    self.backend.remove_child(parent, old_el)?;
                    self.stats.replaced += 1;
                }
            }
        }

        for n in new.iter_mut().skip(shared) {
            let el = materialize_child(self.backend, n)?;
            self.backend.append_child(parent, el)?;
            self.stats.inserted += 1;
        }

        for o in old[shared..].iter().rev() {
            self.backend.remove_child(parent, live(o)?)?;
            self.stats.removed += 1;
        }
        Ok(())
    }

    /// Keyed children are matched by key, patched in place, then reordered.
    fn diff_keyed(
        &mut self,
        parent: NodeHandle,
        old: &[Child],
        new: &mut [Child],
    ) -> Result<(), ReconcilerError> {
        // last occurrence wins for duplicate keys
        let new_index: HashMap<String, usize> = new
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.key().map(|k| (k.to_string(), i)))
            .collect();

        // new index -> old index of the child it was matched with
        let mut sources: Vec<Option<usize>> = vec![None; new.len()];

        for (old_idx, child) in old.iter().enumerate() {
            let target = child
                .key()
                .and_then(|k| new_index.get(k).copied())
                .filter(|&j| sources[j].is_none());

            match (target, child) {
                (Some(j), Child::Element(o)) => {
                    sources[j] = Some(old_idx);
                    if let Child::Element(n) = &mut new[j] {
                        self.diff_node(o, n)?;
                    }
                }
                _ => {
                    let el = live(child)?;
                    trace!("DiffEngine: removing unmatched {} (key {:?})", el, child.key());
                    self.backend.remove_child(parent, el)?;
                    self.stats.removed += 1;
                }
            }
        }

        let stays = self.stable_positions(&sources);

        // Walk backwards so the anchor (the next new sibling) is always final.
        let mut anchor: Option<NodeHandle> = None;
        for j in (0..new.len()).rev() {
            if stays[j] {
                anchor = new[j].el();
                continue;
            }
            let el = match sources[j] {
                Some(_) => {
                    let el = live(&new[j])?;
                    trace!("DiffEngine: moving {} before {:?}", el, anchor);
                    self.stats.moved += 1;
                    el
                }
                None => {
                    let el = materialize_child(self.backend, &mut new[j])?;
                    self.stats.inserted += 1;
                    el
                }
            };
            self.backend.insert_before(parent, el, anchor)?;
            anchor = Some(el);
        }
        Ok(())
    }

    /// Which matched new positions keep their live node where it is.
    fn stable_positions(&self, sources: &[Option<usize>]) -> Vec<bool> {
        let mut stays = vec![false; sources.len()];
        match self.options.move_strategy {
            MoveStrategy::Heuristic => {
                // running maximum of old positions, in new order
                let mut last: Option<usize> = None;
                for (j, source) in sources.iter().enumerate() {
                    if let Some(old_idx) = *source {
                        if last.is_none_or(|l| old_idx > l) {
                            stays[j] = true;
                            last = Some(old_idx);
                        }
                    }
                }
            }
            MoveStrategy::LongestIncreasingSubsequence => {
                let matched: Vec<(usize, usize)> = sources
                    .iter()
                    .enumerate()
                    .filter_map(|(j, s)| s.map(|old_idx| (j, old_idx)))
                    .collect();
                let olds: Vec<usize> = matched.iter().map(|&(_, old_idx)| old_idx).collect();
                // nothing matched means nothing stays; the lis crate rejects empty input
                if !olds.is_empty() {
                    for k in lis::longest_increasing_subsequence(&olds) {
                        stays[matched[k].0] = true;
                    }
                }
            }
        }
        stays
    }
}

fn live(child: &Child) -> Result<NodeHandle, ReconcilerError> {
    match child {
        Child::Element(v) => v.el.ok_or_else(|| ReconcilerError::Unbound { kind: v.kind.clone() }),
        Child::Text(t) => t.el.ok_or_else(unbound_text),
    }
}

fn unbound_text() -> ReconcilerError {
    ReconcilerError::Unbound { kind: "#text".to_string() }
}
