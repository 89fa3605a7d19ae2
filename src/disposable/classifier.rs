//! Expression classifier: turns the nodes of a scope into the ordered trace
//! of events that touch one variable.

use crate::source::syntax::{self, refers_to, DISPOSE_METHODS};
use crate::source::{NodeId, NodeKind, Span, SyntaxTree};

use super::collections::DISPOSE_HELPERS;

/// Methods that hand an argument over to a collection.
pub const COLLECTION_ADD_METHODS: &[&str] = &["Add", "Enqueue", "Push", "Insert", "TryAdd"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `name = <non-literal>`
    Assignment,
    /// `name = null` (or another literal)
    AssignmentNull,
    /// `name.Dispose()`, `name.Close()`, `name?.Dispose()`, collection helpers
    Dispose,
    /// `using (name) { }`
    Using,
    /// `using (name = expr) { }`
    UsingAssignment,
    /// `collection.Add(name)`
    CollectionAdd,
    /// `other = name`: ownership moves elsewhere
    Exit,
}

impl EventKind {
    /// Whether this event settles the value assigned just before it.
    pub fn releases_previous(self) -> bool {
        matches!(
            self,
            EventKind::Dispose
                | EventKind::Using
                | EventKind::UsingAssignment
                | EventKind::CollectionAdd
                | EventKind::Exit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionEvent {
    pub node: NodeId,
    pub kind: EventKind,
    pub span: Span,
}

/// Classify `nodes` (in source order) against `name`.
///
/// Returns `None` when the value escapes through a `return`, `yield return`
/// or expression body: the caller owns it from then on, and nothing more can
/// be said about this scope.
pub fn classify_ordered(
    tree: &SyntaxTree,
    nodes: impl IntoIterator<Item = NodeId>,
    name: &str,
) -> Option<Vec<ExpressionEvent>> {
    let mut events = Vec::new();
    for node in nodes {
        if returns_name(tree, node, name) {
            return None;
        }
        if let Some(kind) = classify_node(tree, node, name) {
            events.push(ExpressionEvent {
                node,
                kind,
                span: tree.span(node),
            });
        }
    }
    Some(events)
}

/// Event produced by a single node, if any.
pub fn classify_node(tree: &SyntaxTree, node: NodeId, name: &str) -> Option<EventKind> {
    match tree.kind(node) {
        NodeKind::AssignmentExpression => classify_assignment(tree, node, name),
        NodeKind::InvocationExpression => classify_invocation(tree, node, name),
        NodeKind::ConditionalAccessExpression => {
            let (receiver, method) = syntax::conditional_invocation(tree, node)?;
            (refers_to(tree, receiver, name) && is_dispose_call(method)).then_some(EventKind::Dispose)
        }
        NodeKind::UsingStatement => {
            let resource = tree.unparenthesize(syntax::using_resource(tree, node)?);
            match tree.kind(resource) {
                NodeKind::AssignmentExpression => {
                    let (left, _, _) = syntax::assignment_parts(tree, resource)?;
                    refers_to(tree, left, name).then_some(EventKind::UsingAssignment)
                }
                _ => refers_to(tree, resource, name).then_some(EventKind::Using),
            }
        }
        _ => None,
    }
}

fn classify_assignment(tree: &SyntaxTree, node: NodeId, name: &str) -> Option<EventKind> {
    if !syntax::is_simple_assignment(tree, node)
        || in_initializer(tree, node)
        || syntax::is_in_using_resource(tree, node)
    {
        return None;
    }
    let (left, _, right) = syntax::assignment_parts(tree, node)?;
    let right = tree.unparenthesize(right);
    if refers_to(tree, left, name) {
        if tree.kind(right).is_literal() {
            Some(EventKind::AssignmentNull)
        } else {
            Some(EventKind::Assignment)
        }
    } else if refers_to(tree, right, name) {
        Some(EventKind::Exit)
    } else {
        None
    }
}

fn classify_invocation(tree: &SyntaxTree, node: NodeId, name: &str) -> Option<EventKind> {
    if let Some((receiver, method)) = syntax::invoked_member(tree, node) {
        if refers_to(tree, receiver, name) && is_dispose_call(method) {
            return Some(EventKind::Dispose);
        }
        if COLLECTION_ADD_METHODS.contains(&method) {
            let list = syntax::argument_list(tree, node)?;
            let passes_name = syntax::argument_expressions(tree, list)
                .into_iter()
                .any(|arg| refers_to(tree, tree.unparenthesize(arg), name));
            return passes_name.then_some(EventKind::CollectionAdd);
        }
        return None;
    }
    let (receiver, method) = syntax::conditional_invocation(tree, node)?;
    (refers_to(tree, receiver, name) && is_dispose_call(method)).then_some(EventKind::Dispose)
}

fn is_dispose_call(method: &str) -> bool {
    DISPOSE_METHODS.contains(&method) || DISPOSE_HELPERS.contains(&method)
}

/// Assignments inside `{ Name = value }` object and collection initializers
/// set members of the new object, not the tracked variable.
fn in_initializer(tree: &SyntaxTree, node: NodeId) -> bool {
    for ancestor in tree.ancestors(node) {
        let kind = tree.kind(ancestor);
        if kind == NodeKind::InitializerExpression {
            return true;
        }
        if kind.is_statement() || kind.is_member_with_body() {
            return false;
        }
    }
    false
}

/// `return name;`, `yield return name;`, or a member expression body
/// `=> name`, including through nested ternaries.
fn returns_name(tree: &SyntaxTree, node: NodeId, name: &str) -> bool {
    let returned = match tree.kind(node) {
        NodeKind::ReturnStatement | NodeKind::YieldStatement => syntax::returned_expression(tree, node),
        NodeKind::ArrowExpressionClause => {
            let owner = tree.parent(node);
            if owner.is_some_and(|o| tree.kind(o).is_member_with_body()) {
                tree.first_syntax_child(node)
            } else {
                None
            }
        }
        _ => None,
    };
    returned.is_some_and(|expr| yields(tree, expr, name))
}

/// Whether `expr` evaluates to `name` in some branch.
pub fn yields(tree: &SyntaxTree, expr: NodeId, name: &str) -> bool {
    let expr = tree.unparenthesize(expr);
    match tree.kind(expr) {
        NodeKind::ConditionalExpression => match syntax::ternary_parts(tree, expr) {
            Some((_, consequence, alternative)) => {
                yields(tree, consequence, name) || yields(tree, alternative, name)
            }
            None => false,
        },
        _ => refers_to(tree, expr, name),
    }
}
