//! Where a freshly produced value goes: the syntactic context that decides
//! who owns the result of a call or `new` expression.

use crate::source::syntax::{self, DISPOSE_METHODS};
use crate::source::{NodeId, NodeKind, SyntaxTree};

use super::classifier::COLLECTION_ADD_METHODS;
use super::context::RuleContext;

/// Consumer of a value, found by walking up through parentheses, casts,
/// `as`, `await`, `??` operands and ternary branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// `using (value)` or `using var x = value`.
    Using,
    /// Right side of an assignment, or a variable, field or property
    /// initializer.
    Stored,
    /// Element of an array or collection initializer.
    Element,
    /// `return value`, `yield return value` or `=> value` of the given member.
    Returned(NodeId),
    /// Body of a lambda or anonymous method.
    LambdaBody,
    /// Argument of the given invocation, object creation or constructor
    /// initializer.
    Argument(NodeId),
    /// Receiver of `Dispose()` or `Close()`.
    Disposed,
    /// Discarded, or used in a way that takes no ownership.
    Other,
}

/// Classify the consumer of the value produced by `expr`.
pub fn value_sink(tree: &SyntaxTree, expr: NodeId) -> Sink {
    let mut current = expr;
    while let Some(parent) = tree.parent(current) {
        match tree.kind(parent) {
            NodeKind::ParenthesizedExpression
            | NodeKind::CastExpression
            | NodeKind::AsExpression
            | NodeKind::AwaitExpression => {}
            NodeKind::ConditionalExpression => match syntax::ternary_parts(tree, parent) {
                Some((condition, _, _)) if condition != current => {}
                _ => return Sink::Other,
            },
            NodeKind::BinaryExpression => match syntax::binary_parts(tree, parent) {
                Some((_, "??", _)) => {}
                _ => return Sink::Other,
            },
            NodeKind::UsingStatement => {
                return if syntax::using_resource(tree, parent) == Some(current) {
                    Sink::Using
                } else {
                    Sink::Other
                };
            }
            NodeKind::VariableDeclarator | NodeKind::EqualsValueClause | NodeKind::PropertyDeclaration => {
                return if syntax::is_in_using_resource(tree, parent) {
                    Sink::Using
                } else {
                    Sink::Stored
                };
            }
            NodeKind::AssignmentExpression => {
                return match syntax::assignment_parts(tree, parent) {
                    Some((_, _, right)) if right == current => Sink::Stored,
                    _ => Sink::Other,
                };
            }
            NodeKind::InitializerExpression => return Sink::Element,
            NodeKind::ReturnStatement | NodeKind::YieldStatement => return returned_from(tree, parent),
            NodeKind::ArrowExpressionClause => {
                return match tree.parent(parent) {
                    Some(owner) if tree.kind(owner).is_member_with_body() => Sink::Returned(owner),
                    _ => Sink::Other,
                };
            }
            NodeKind::LambdaExpression | NodeKind::AnonymousMethodExpression => return Sink::LambdaBody,
            NodeKind::Argument => {
                return tree
                    .parent(parent)
                    .filter(|&list| tree.kind(list) == NodeKind::ArgumentList)
                    .and_then(|list| tree.parent(list))
                    .map_or(Sink::Other, Sink::Argument);
            }
            NodeKind::MemberAccessExpression => return disposed_via_member_access(tree, parent, current),
            NodeKind::ConditionalAccessExpression => {
                let is_receiver = syntax::conditional_invocation(tree, parent)
                    .or_else(|| tree.parent(parent).and_then(|call| syntax::conditional_invocation(tree, call)))
                    .is_some_and(|(receiver, method)| receiver == current && DISPOSE_METHODS.contains(&method));
                return if is_receiver { Sink::Disposed } else { Sink::Other };
            }
            _ => return Sink::Other,
        }
        current = parent;
    }
    Sink::Other
}

/// `return` inside a lambda belongs to the lambda, not the member.
fn returned_from(tree: &SyntaxTree, statement: NodeId) -> Sink {
    let owner = tree.nearest_ancestor_where(statement, |k| {
        k.is_member_with_body()
            || matches!(k, NodeKind::LambdaExpression | NodeKind::AnonymousMethodExpression)
    });
    match owner {
        Some(owner) if tree.kind(owner).is_member_with_body() => Sink::Returned(owner),
        Some(_) => Sink::LambdaBody,
        None => Sink::Other,
    }
}

fn disposed_via_member_access(tree: &SyntaxTree, access: NodeId, current: NodeId) -> Sink {
    let Some(call) = tree.parent(access).filter(|&p| tree.kind(p) == NodeKind::InvocationExpression) else {
        return Sink::Other;
    };
    match syntax::invoked_member(tree, call) {
        Some((receiver, method))
            if receiver == current
                && syntax::invocation_function(tree, call) == Some(access)
                && DISPOSE_METHODS.contains(&method) =>
        {
            Sink::Disposed
        }
        _ => Sink::Other,
    }
}

/// `items.Add(value)`-style call on a receiver that implements
/// `IEnumerable<T>`: the collection now owns the value.
pub fn is_collection_add(ctx: &RuleContext<'_>, call: NodeId) -> bool {
    let tree = ctx.tree;
    if tree.kind(call) != NodeKind::InvocationExpression {
        return false;
    }
    let Some((receiver, method)) =
        syntax::invoked_member(tree, call).or_else(|| syntax::conditional_invocation(tree, call))
    else {
        return false;
    };
    if !COLLECTION_ADD_METHODS.contains(&method) {
        return false;
    }
    ctx.model.type_of(tree, receiver).is_some_and(|t| {
        ctx.model
            .find_supertype(&t, "System.Collections.Generic", "IEnumerable")
            .is_some()
    })
}

/// `new Wrapper(value)` where the wrapper is disposable: the wrapper takes
/// over the value and is tracked itself.
pub fn is_disposable_wrapper(ctx: &RuleContext<'_>, call: NodeId) -> bool {
    matches!(
        ctx.tree.kind(call),
        NodeKind::ObjectCreationExpression | NodeKind::ImplicitObjectCreationExpression
    ) && ctx.oracle.is_node_disposable(ctx.tree, call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_csharp;
    use std::path::Path;

    fn sink_of_first_creation(body: &str) -> (SyntaxTree, Sink) {
        let tree = parse_csharp(Path::new("Test.cs"), &format!("class A {{ object M() {{ {} }} }}", body))
            .expect("parse");
        let creation = tree
            .nodes_of_kind(NodeKind::ObjectCreationExpression)
            .next()
            .expect("creation");
        let sink = value_sink(&tree, creation);
        (tree, sink)
    }

    fn sink(body: &str) -> Sink {
        sink_of_first_creation(body).1
    }

    #[test]
    fn test_stored_and_using() {
        assert_eq!(sink("var s = new S();"), Sink::Stored);
        assert_eq!(sink("s = (flag ? new S() : null);"), Sink::Stored);
        assert_eq!(sink("using (new S()) { }"), Sink::Using);
        assert_eq!(sink("using (var s = new S()) { }"), Sink::Using);
        assert_eq!(sink("using var s = new S();"), Sink::Using);
    }

    #[test]
    fn test_returned() {
        let (tree, found) = sink_of_first_creation("return flag ? null : (S)new S();");
        let method = tree.nodes_of_kind(NodeKind::MethodDeclaration).next().expect("method");
        assert_eq!(found, Sink::Returned(method));
        assert_eq!(sink("Func<S> f = () => { return new S(); };"), Sink::LambdaBody);
    }

    #[test]
    fn test_disposed_and_discarded() {
        assert_eq!(sink("new S().Dispose();"), Sink::Disposed);
        assert_eq!(sink("(new S())?.Close();"), Sink::Disposed);
        assert_eq!(sink("new S().Flush();"), Sink::Other);
        assert_eq!(sink("new S();"), Sink::Other);
    }

    #[test]
    fn test_argument_and_element() {
        let (tree, found) = sink_of_first_creation("items.Add(new S());");
        let call = tree.nodes_of_kind(NodeKind::InvocationExpression).next().expect("call");
        assert_eq!(found, Sink::Argument(call));
        assert_eq!(sink("var all = new[] { new S() };"), Sink::Element);
    }
}
