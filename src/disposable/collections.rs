//! Collection-disposal evaluator.
//!
//! A collection of disposables is considered disposed when any action calls
//! one of the disposal helpers on it; the helpers dispose the items they
//! release.

use crate::source::syntax::{self, refers_to};
use crate::source::{NodeId, NodeKind, SyntaxTree};

/// Extension methods that dispose collection items.
pub const DISPOSE_HELPERS: &[&str] = &[
    "DisposeItems",
    "RemoveAndDispose",
    "RemoveAtAndDispose",
    "RemoveAllAndDispose",
    "RemoveRangeAndDispose",
];

/// Removal methods that drop items without disposing them.
pub const REMOVE_METHODS: &[&str] = &["Remove", "RemoveAt", "RemoveAll", "RemoveRange"];

/// Whether any of `actions` calls a disposal helper on `name`.
pub fn is_disposed_by_helper(tree: &SyntaxTree, actions: &[NodeId], name: &str) -> bool {
    actions
        .iter()
        .flat_map(|&action| tree.subtree(action))
        .any(|node| helper_call_on(tree, node, name))
}

fn helper_call_on(tree: &SyntaxTree, node: NodeId, name: &str) -> bool {
    let call = match tree.kind(node) {
        NodeKind::InvocationExpression => syntax::invoked_member(tree, node)
            .or_else(|| syntax::conditional_invocation(tree, node)),
        NodeKind::ConditionalAccessExpression => syntax::conditional_invocation(tree, node),
        _ => None,
    };
    call.is_some_and(|(receiver, method)| {
        DISPOSE_HELPERS.contains(&method) && refers_to(tree, receiver, name)
    })
}
