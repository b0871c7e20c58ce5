use proptest::prelude::*;
use reactive_vdom::{
    mount, DiffEngine, MemoryBackend, MoveStrategy, Mutation, NodeBackend, NodeHandle,
    ReconcileOptions, VNode,
};
use rstest::rstest;
use serde_json::json;
use std::collections::HashMap;

fn list<K: ToString>(keys: &[K]) -> VNode {
    keys.iter().fold(VNode::new("ul"), |ul, k| {
        ul.child(VNode::new("li").key(k.to_string()).text(k.to_string()))
    })
}

fn mounted(tree: &mut VNode) -> MemoryBackend {
    let b = MemoryBackend::new();
    let host = b.create_element("body").unwrap();
    mount(&b, tree, host).unwrap();
    b.clear_mutations();
    b
}

fn live_by_key(tree: &VNode) -> HashMap<String, NodeHandle> {
    tree.element_children()
        .filter_map(|c| Some((c.key.clone()?, c.el()?)))
        .collect()
}

fn rendered_keys(b: &MemoryBackend, parent: NodeHandle) -> Vec<String> {
    b.children(parent).into_iter().map(|c| b.text_content(c)).collect()
}

fn engine(b: &MemoryBackend, strategy: MoveStrategy) -> DiffEngine<'_, MemoryBackend> {
    DiffEngine::with_options(b, ReconcileOptions::default().with_move_strategy(strategy))
}

#[rstest]
#[case::rotate_right(&["1", "2", "3"], &["3", "1", "2"])]
#[case::rotate_left(&["1", "2", "3"], &["2", "3", "1"])]
#[case::reverse(&["a", "b", "c", "d"], &["d", "c", "b", "a"])]
#[case::swap_ends(&["a", "b", "c", "d", "e"], &["e", "b", "c", "d", "a"])]
#[case::unchanged(&["x", "y"], &["x", "y"])]
fn keyed_reorders_only_move(
    #[case] before: &[&str],
    #[case] after: &[&str],
    #[values(MoveStrategy::Heuristic, MoveStrategy::LongestIncreasingSubsequence)]
    strategy: MoveStrategy,
) {
    let mut old = list(before);
    let b = mounted(&mut old);
    let parent = old.el().unwrap();
    let reused = live_by_key(&old);

    let mut new = list(after);
    let stats = engine(&b, strategy).reconcile(&old, &mut new).unwrap();

    assert_eq!(rendered_keys(&b, parent), after);
    assert_eq!(live_by_key(&new), reused);
    assert_eq!(stats.inserted + stats.removed + stats.replaced, 0);
    assert!(b
        .mutations()
        .iter()
        .all(|m| matches!(m, Mutation::InsertBefore { parent: p, .. } if *p == parent)));
}

#[test]
fn keyed_insertion_after_survivor() {
    let mut old = list(&["1", "2"]);
    let b = mounted(&mut old);
    let parent = old.el().unwrap();
    let a = live_by_key(&old)["1"];
    let kept = live_by_key(&old)["2"];

    let mut new = list(&["2", "4"]);
    engine(&b, MoveStrategy::Heuristic).reconcile(&old, &mut new).unwrap();

    let d = live_by_key(&new)["4"];
    assert_eq!(b.children(parent), vec![kept, d]);
    let log = b.mutations();
    assert!(log.contains(&Mutation::RemoveChild { parent, child: a }));
    assert!(log.contains(&Mutation::InsertBefore { parent, child: d, anchor: None }));
    assert!(!log.iter().any(|m| matches!(m, Mutation::InsertBefore { child, .. } if *child == kept)));
}

#[test]
fn reconcile_against_structural_copy_is_silent() {
    let build = || {
        VNode::new("section")
            .attr("class", "card")
            .attr("data-n", json!({"nested": [1, 2]}))
            .child(VNode::new("h2").text("Title"))
            .child(list(&["a", "b", "c"]))
            .child("footer text")
    };
    let mut old = build();
    let b = mounted(&mut old);
    let mut new = build();
    let stats = DiffEngine::new(&b).reconcile(&old, &mut new).unwrap();

    assert!(b.mutations().is_empty());
    assert_eq!(stats.attributes_set, 0);
    assert_eq!(new.el(), old.el());
}

#[test]
fn attribute_diff_leaves_unchanged_values_alone() {
    let mut old = VNode::new("div").attr("a", 1i64).attr("b", 2i64);
    let b = mounted(&mut old);
    let el = old.el().unwrap();

    let mut new = VNode::new("div").attr("a", 1i64).attr("b", 3i64).attr("c", 4i64);
    DiffEngine::new(&b).reconcile(&old, &mut new).unwrap();

    let log = b.mutations();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|m| m.target() == el));
    assert!(!log.iter().any(|m| matches!(m, Mutation::SetAttribute { name, .. } if name == "a")));
    assert_eq!(b.attribute(el, "b"), Some(json!(3)));
    assert_eq!(b.attribute(el, "c"), Some(json!(4)));
}

fn key_lists() -> impl Strategy<Value = (Vec<u32>, Vec<u32>)> {
    (0u32..10).prop_flat_map(|n| {
        let old: Vec<u32> = (0..n).collect();
        let pool: Vec<u32> = (0..n + 5).collect();
        let len = pool.len();
        (
            Just(old),
            proptest::sample::subsequence(pool, 0..=len).prop_shuffle(),
        )
    })
}

proptest! {
    #[test]
    fn keyed_reconcile_always_matches_new_order(
        (before, after) in key_lists(),
        minimal in any::<bool>(),
    ) {
        let strategy = if minimal {
            MoveStrategy::LongestIncreasingSubsequence
        } else {
            MoveStrategy::Heuristic
        };
        let mut old = list(&before);
        let b = mounted(&mut old);
        let parent = old.el().unwrap();
        let reused = live_by_key(&old);

        let mut new = list(&after);
        let stats = engine(&b, strategy).reconcile(&old, &mut new).unwrap();

        let expected: Vec<String> = after.iter().map(u32::to_string).collect();
        prop_assert_eq!(rendered_keys(&b, parent), expected);

        let survivors = after.iter().filter(|k| before.contains(k)).count();
        prop_assert_eq!(stats.removed, before.len() - survivors);
        prop_assert_eq!(stats.inserted, after.len() - survivors);
        for (key, el) in live_by_key(&new) {
            if let Some(prev) = reused.get(&key) {
                prop_assert_eq!(*prev, el);
            }
        }
    }

    #[test]
    fn minimal_strategy_never_moves_more(
        (before, after) in key_lists(),
    ) {
        let mut moves = Vec::new();
        for strategy in [MoveStrategy::Heuristic, MoveStrategy::LongestIncreasingSubsequence] {
            let mut old = list(&before);
            let b = mounted(&mut old);
            let mut new = list(&after);
            moves.push(engine(&b, strategy).reconcile(&old, &mut new).unwrap().moved);
        }
        prop_assert!(moves[1] <= moves[0]);
    }
}
