//! Reconciler configuration
use crate::errors::ReconcilerError;
use serde::Deserialize;

/// Attribute name extracted into [`VNode::key`](crate::vnode::VNode::key) by the constructor.
pub const KEY_ATTRIBUTE: &str = "key";

/// Attribute names starting with this prefix bind event listeners.
pub const LISTENER_PREFIX: &str = "on";

/// How the keyed children algorithm decides which matched nodes to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStrategy {
    /// Single pass with a running maximum of old positions. Never misorders,
    /// but can move more nodes than necessary.
    #[default]
    Heuristic,
    /// Keeps the longest increasing subsequence of old positions in place,
    /// which yields the minimal number of moves.
    LongestIncreasingSubsequence,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    pub move_strategy: MoveStrategy,
}

impl ReconcileOptions {
    pub fn from_json(raw: &str) -> Result<Self, ReconcilerError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_move_strategy(mut self, strategy: MoveStrategy) -> Self {
        self.move_strategy = strategy;
        self
    }
}

/// Event name bound by a listener attribute, if `name` uses the listener prefix.
pub(crate) fn listener_event(name: &str) -> Option<String> {
    let rest = name.strip_prefix(LISTENER_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategy_from_json() {
        let opts = ReconcileOptions::from_json(r#"{"move_strategy":"longest_increasing_subsequence"}"#).unwrap();
        assert_eq!(opts.move_strategy, MoveStrategy::LongestIncreasingSubsequence);

        let opts = ReconcileOptions::from_json("{}").unwrap();
        assert_eq!(opts.move_strategy, MoveStrategy::Heuristic);
    }

    #[test]
    fn rejects_unknown_strategy() {
        let err = ReconcileOptions::from_json(r#"{"move_strategy":"optimal"}"#).unwrap_err();
        assert!(matches!(err, ReconcilerError::SerdeError(_)));
    }

    #[test]
    fn listener_names() {
        assert_eq!(listener_event("onClick").as_deref(), Some("click"));
        assert_eq!(listener_event("oninput").as_deref(), Some("input"));
        assert_eq!(listener_event("on"), None);
        assert_eq!(listener_event("class"), None);
    }
}
