//! Member-level helpers shared by the class, constructor and field rules.

use crate::source::syntax::{self, refers_to};
use crate::source::{NodeId, NodeKind, Span, SyntaxTree};

use super::oracle::CollectionType;

/// A disposable (or disposable-collection) field or property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposableDeclaration {
    /// Declarator for fields, the declaration itself for properties.
    pub node: NodeId,
    /// Enclosing field or property declaration.
    pub member: NodeId,
    pub name: String,
    pub span: Span,
    pub is_assigned_at_declaration: bool,
    pub is_static: bool,
    pub collection_type: CollectionType,
}

/// Method-like body that may touch members: methods, constructors,
/// finalizers, accessors and expression-bodied properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub node: NodeId,
    pub is_static: bool,
}

/// Direct members of a type declaration, in source order.
pub fn type_members(tree: &SyntaxTree, type_decl: NodeId) -> Vec<NodeId> {
    tree.child_of_kind(type_decl, NodeKind::DeclarationList)
        .map(|body| tree.syntax_children(body).collect())
        .unwrap_or_default()
}

/// Declared names of a field (one per declarator) or property.
pub fn member_names(tree: &SyntaxTree, member: NodeId) -> Vec<(NodeId, String)> {
    match tree.kind(member) {
        NodeKind::FieldDeclaration => syntax::variable_declaration(tree, member)
            .map(|declaration| {
                syntax::declarators(tree, declaration)
                    .into_iter()
                    .filter_map(|d| {
                        let name = syntax::declarator_name(tree, d)?;
                        Some((d, tree.text(name).to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default(),
        NodeKind::PropertyDeclaration => tree
            .name_of(member)
            .map(|name| vec![(member, name.to_string())])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Initializer of a field declarator or auto-property.
pub fn initializer(tree: &SyntaxTree, declared: NodeId) -> Option<NodeId> {
    match tree.kind(declared) {
        NodeKind::VariableDeclarator => syntax::declarator_value(tree, declared),
        NodeKind::PropertyDeclaration => syntax::property_initializer(tree, declared),
        _ => None,
    }
}

/// Whether the declaration holds a non-literal initializer.
pub fn is_assigned_at_declaration(tree: &SyntaxTree, declared: NodeId) -> bool {
    initializer(tree, declared).is_some_and(|value| !tree.kind(tree.unparenthesize(value)).is_literal())
}

/// Whether every assignment to `name` in `type_decl` happens in a
/// constructor and takes one of that constructor's parameters.
///
/// Requires at least one assignment, and no initializer at the declaration.
pub fn is_solely_constructor_assigned(
    tree: &SyntaxTree,
    type_decl: NodeId,
    declared: NodeId,
    name: &str,
) -> bool {
    if initializer(tree, declared).is_some() {
        return false;
    }
    let mut assignments = tree
        .descendants(type_decl)
        .filter(|&n| tree.kind(n) == NodeKind::AssignmentExpression)
        .filter(|&n| syntax::enclosing_type(tree, n) == Some(type_decl))
        .filter_map(|n| syntax::assignment_parts(tree, n).map(|parts| (n, parts)))
        .filter(|(_, (left, op, _))| *op == "=" && refers_to(tree, *left, name))
        .peekable();
    if assignments.peek().is_none() {
        return false;
    }
    assignments.all(|(assignment, (_, _, right))| {
        let Some(ctor) = tree.nearest_ancestor(assignment, NodeKind::ConstructorDeclaration) else {
            return false;
        };
        let source = parameter_source(tree, right);
        tree.kind(source) == NodeKind::Identifier
            && syntax::parameters(tree, ctor)
                .iter()
                .any(|&p| tree.name_of(p) == Some(tree.text(source)))
    })
}

/// `p`, `(p)` and `p ?? throw ...` all take their value from `p`.
fn parameter_source(tree: &SyntaxTree, expr: NodeId) -> NodeId {
    let expr = tree.unparenthesize(expr);
    if tree.kind(expr) == NodeKind::BinaryExpression {
        if let Some((left, "??", _)) = syntax::binary_parts(tree, expr) {
            return tree.unparenthesize(left);
        }
    }
    expr
}

/// Properties that only expose another field or property of the same type
/// (`Stream Output => output;`, `get { return output; }`).
pub fn is_pass_through_property(tree: &SyntaxTree, type_decl: NodeId, property: NodeId) -> bool {
    if tree.kind(property) != NodeKind::PropertyDeclaration {
        return false;
    }
    let own_name = tree.name_of(property).unwrap_or("");
    let known: Vec<String> = type_members(tree, type_decl)
        .into_iter()
        .flat_map(|m| member_names(tree, m))
        .map(|(_, name)| name)
        .filter(|name| name != own_name)
        .collect();
    let exposes_member = |expr: NodeId| known.iter().any(|name| refers_to(tree, tree.unparenthesize(expr), name));

    if let Some(arrow) = syntax::arrow_body(tree, property) {
        return tree.first_syntax_child(arrow).is_some_and(exposes_member);
    }
    let Some(accessors) = tree.child_of_kind(property, NodeKind::AccessorList) else {
        return false;
    };
    let Some(getter) = tree
        .children_of_kind(accessors, NodeKind::AccessorDeclaration)
        .find(|&a| tree.name_of(a) == Some("get"))
    else {
        return false;
    };
    match syntax::body(tree, getter) {
        Some(body) if tree.kind(body) == NodeKind::ArrowExpressionClause => {
            tree.first_syntax_child(body).is_some_and(exposes_member)
        }
        Some(body) => {
            let statements: Vec<NodeId> = tree.syntax_children(body).collect();
            matches!(statements.as_slice(), [only] if tree.kind(*only) == NodeKind::ReturnStatement
                && syntax::returned_expression(tree, *only).is_some_and(exposes_member))
        }
        None => false,
    }
}

/// Bodies of `type_decl` that can assign or dispose members, in source
/// order.
pub fn actions(tree: &SyntaxTree, type_decl: NodeId) -> Vec<Action> {
    let mut actions = Vec::new();
    for member in type_members(tree, type_decl) {
        let is_static = tree.has_modifier(member, "static");
        match tree.kind(member) {
            NodeKind::MethodDeclaration | NodeKind::ConstructorDeclaration | NodeKind::DestructorDeclaration => {
                actions.push(Action { node: member, is_static });
            }
            NodeKind::PropertyDeclaration | NodeKind::IndexerDeclaration => {
                if let Some(arrow) = syntax::arrow_body(tree, member) {
                    actions.push(Action { node: arrow, is_static });
                }
                if let Some(list) = tree.child_of_kind(member, NodeKind::AccessorList) {
                    actions.extend(
                        tree.children_of_kind(list, NodeKind::AccessorDeclaration)
                            .map(|node| Action { node, is_static }),
                    );
                }
            }
            _ => {}
        }
    }
    actions
}

/// Instance and static constructors declared directly in `type_decl`.
pub fn constructors(tree: &SyntaxTree, type_decl: NodeId) -> Vec<NodeId> {
    type_members(tree, type_decl)
        .into_iter()
        .filter(|&m| tree.kind(m) == NodeKind::ConstructorDeclaration)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_csharp;
    use std::path::Path;

    fn parse(src: &str) -> SyntaxTree {
        parse_csharp(Path::new("Test.cs"), src).expect("parse")
    }

    fn class(tree: &SyntaxTree) -> NodeId {
        tree.nodes_of_kind(NodeKind::ClassDeclaration).next().expect("class")
    }

    fn declared(tree: &SyntaxTree, name: &str) -> NodeId {
        type_members(tree, class(tree))
            .into_iter()
            .flat_map(|m| member_names(tree, m))
            .find(|(_, n)| n == name)
            .map(|(node, _)| node)
            .expect("member")
    }

    #[test]
    fn test_member_names_split_declarators() {
        let tree = parse("class A { Stream a, b; Stream C { get; set; } }");
        let names: Vec<String> = type_members(&tree, class(&tree))
            .into_iter()
            .flat_map(|m| member_names(&tree, m))
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["a", "b", "C"]);
    }

    #[test]
    fn test_constructor_parameter_assignment() {
        let tree = parse(
            "class A { Stream s; Stream t; Stream u = Open();\n\
             A(Stream input, Stream other) { s = input; this.t = other ?? throw new Exception(); u = input; }\n\
             void Reset() { t = Open(); } }",
        );
        let a = class(&tree);
        assert!(is_solely_constructor_assigned(&tree, a, declared(&tree, "s"), "s"));
        assert!(!is_solely_constructor_assigned(&tree, a, declared(&tree, "t"), "t"));
        assert!(!is_solely_constructor_assigned(&tree, a, declared(&tree, "u"), "u"));
    }

    #[test]
    fn test_unassigned_member_is_not_constructor_assigned() {
        let tree = parse("class A { Stream s; }");
        let a = class(&tree);
        assert!(!is_solely_constructor_assigned(&tree, a, declared(&tree, "s"), "s"));
    }

    #[test]
    fn test_pass_through_properties() {
        let tree = parse(
            "class A { Stream s; Stream S => s; Stream T { get { return this.s; } } Stream U { get; } = Open(); }",
        );
        let a = class(&tree);
        let props: Vec<_> = tree.nodes_of_kind(NodeKind::PropertyDeclaration).collect();
        assert!(is_pass_through_property(&tree, a, props[0]));
        assert!(is_pass_through_property(&tree, a, props[1]));
        assert!(!is_pass_through_property(&tree, a, props[2]));
    }

    #[test]
    fn test_actions_in_source_order() {
        let tree = parse(
            "class A { A() { } static void S() { } Stream P { get { return null; } set { } } ~A() { } }",
        );
        let found = actions(&tree, class(&tree));
        assert_eq!(found.len(), 5);
        assert!(!found[0].is_static);
        assert!(found[1].is_static);
        assert!(found.windows(2).all(|w| w[0].node.index() < w[1].node.index()));
    }

    #[test]
    fn test_assigned_at_declaration_ignores_null() {
        let tree = parse("class A { Stream a = null; Stream b = Open(); }");
        assert!(!is_assigned_at_declaration(&tree, declared(&tree, "a")));
        assert!(is_assigned_at_declaration(&tree, declared(&tree, "b")));
    }
}
