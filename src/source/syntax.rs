//! Accessors for the C# node shapes the analyzer inspects.
//!
//! Grammar releases disagree on field labels in a few places (method return
//! type, declarator values, assignment operators). Each accessor tries the
//! labelled child first and falls back to position.

use super::tree::{NodeId, NodeKind, SyntaxTree};

/// Method names whose invocation on a receiver counts as disposing it.
pub const DISPOSE_METHODS: &[&str] = &["Dispose", "Close"];

/// Whether `kind` can stand for a type in a declaration.
pub fn is_type_kind(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Identifier
            | NodeKind::GenericName
            | NodeKind::QualifiedName
            | NodeKind::AliasQualifiedName
            | NodeKind::PredefinedType
            | NodeKind::ImplicitType
            | NodeKind::NullableType
            | NodeKind::ArrayType
            | NodeKind::TupleType
    )
}

// -----------------------------------------------------------------------------
// Declarations
// -----------------------------------------------------------------------------

/// Declared name of a variable declarator.
pub fn declarator_name(tree: &SyntaxTree, declarator: NodeId) -> Option<NodeId> {
    tree.child_by_field(declarator, "name")
        .or_else(|| tree.child_of_kind(declarator, NodeKind::Identifier))
}

/// Initializer expression of a variable declarator, if any.
pub fn declarator_value(tree: &SyntaxTree, declarator: NodeId) -> Option<NodeId> {
    if let Some(clause) = tree.child_of_kind(declarator, NodeKind::EqualsValueClause) {
        return tree.first_syntax_child(clause);
    }
    if let Some(value) = tree.child_by_field(declarator, "value") {
        return Some(value);
    }
    let name = declarator_name(tree, declarator)?;
    tree.syntax_children(declarator)
        .filter(|&c| c != name && tree.kind(c) != NodeKind::BracketedArgumentList)
        .last()
}

/// Declared type node of a variable declaration.
pub fn declaration_type(tree: &SyntaxTree, declaration: NodeId) -> Option<NodeId> {
    tree.child_by_field(declaration, "type").or_else(|| {
        tree.syntax_children(declaration)
            .find(|&c| is_type_kind(tree.kind(c)))
    })
}

/// Declarators of a variable declaration.
pub fn declarators(tree: &SyntaxTree, declaration: NodeId) -> Vec<NodeId> {
    tree.children_of_kind(declaration, NodeKind::VariableDeclarator).collect()
}

/// The `VariableDeclaration` held by a field, event field or local
/// declaration statement.
pub fn variable_declaration(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    match tree.kind(node) {
        NodeKind::VariableDeclaration => Some(node),
        NodeKind::FieldDeclaration
        | NodeKind::EventFieldDeclaration
        | NodeKind::LocalDeclarationStatement => {
            tree.child_of_kind(node, NodeKind::VariableDeclaration)
        }
        NodeKind::VariableDeclarator => tree
            .parent(node)
            .filter(|&p| tree.kind(p) == NodeKind::VariableDeclaration),
        _ => None,
    }
}

/// Type node of a property or indexer declaration.
pub fn property_type(tree: &SyntaxTree, property: NodeId) -> Option<NodeId> {
    tree.child_by_field(property, "type").or_else(|| {
        let name = tree.name_node(property);
        tree.syntax_children(property)
            .take_while(|&c| Some(c) != name)
            .filter(|&c| is_type_kind(tree.kind(c)))
            .last()
    })
}

/// Initializer of an auto-property (`{ get; } = value;`).
pub fn property_initializer(tree: &SyntaxTree, property: NodeId) -> Option<NodeId> {
    if let Some(clause) = tree.child_of_kind(property, NodeKind::EqualsValueClause) {
        return tree.first_syntax_child(clause);
    }
    tree.child_by_field(property, "value")
        .filter(|&v| tree.kind(v) != NodeKind::ArrowExpressionClause)
        .or_else(|| {
            let accessors = tree.child_of_kind(property, NodeKind::AccessorList)?;
            tree.syntax_children(property)
                .skip_while(|&c| c != accessors)
                .nth(1)
        })
}

/// Expression body (`=> expr`) of a member.
pub fn arrow_body(tree: &SyntaxTree, member: NodeId) -> Option<NodeId> {
    tree.child_of_kind(member, NodeKind::ArrowExpressionClause)
}

/// Return type node of a method or local function.
pub fn return_type(tree: &SyntaxTree, method: NodeId) -> Option<NodeId> {
    tree.child_by_field(method, "returns")
        .or_else(|| tree.child_by_field(method, "type"))
        .or_else(|| {
            let name = tree.name_node(method);
            tree.syntax_children(method)
                .take_while(|&c| Some(c) != name)
                .filter(|&c| is_type_kind(tree.kind(c)))
                .last()
        })
}

/// Parameters of a method, constructor, local function or lambda.
pub fn parameters(tree: &SyntaxTree, member: NodeId) -> Vec<NodeId> {
    tree.child_of_kind(member, NodeKind::ParameterList)
        .map(|list| tree.children_of_kind(list, NodeKind::Parameter).collect())
        .unwrap_or_default()
}

pub fn parameter_type(tree: &SyntaxTree, parameter: NodeId) -> Option<NodeId> {
    tree.child_by_field(parameter, "type").or_else(|| {
        let name = tree.name_node(parameter);
        tree.syntax_children(parameter)
            .take_while(|&c| Some(c) != name)
            .filter(|&c| is_type_kind(tree.kind(c)))
            .last()
    })
}

/// Body of a method-like member: block or expression body.
pub fn body(tree: &SyntaxTree, member: NodeId) -> Option<NodeId> {
    tree.child_by_field(member, "body")
        .or_else(|| tree.child_of_kind(member, NodeKind::Block))
        .or_else(|| arrow_body(tree, member))
}

/// `this(...)` initializer of a constructor.
pub fn this_initializer(tree: &SyntaxTree, constructor: NodeId) -> Option<NodeId> {
    tree.child_of_kind(constructor, NodeKind::ConstructorInitializer)
        .filter(|&init| {
            tree.text(init)
                .trim_start_matches(':')
                .trim_start()
                .starts_with("this")
        })
}

// -----------------------------------------------------------------------------
// Expressions
// -----------------------------------------------------------------------------

/// Left side, operator text and right side of an assignment.
pub fn assignment_parts(tree: &SyntaxTree, assignment: NodeId) -> Option<(NodeId, &str, NodeId)> {
    let left = tree
        .child_by_field(assignment, "left")
        .or_else(|| tree.first_syntax_child(assignment))?;
    let right = tree
        .child_by_field(assignment, "right")
        .or_else(|| tree.last_syntax_child(assignment))?;
    if left == right {
        return None;
    }
    let start = tree.node(left).end_byte;
    let end = tree.node(right).start_byte;
    let op = tree.source().get(start..end).unwrap_or("").trim();
    Some((left, op, right))
}

/// Simple `=` assignment, as opposed to compound or `??=` forms.
pub fn is_simple_assignment(tree: &SyntaxTree, assignment: NodeId) -> bool {
    matches!(assignment_parts(tree, assignment), Some((_, "=", _)))
}

/// Left operand, operator text and right operand of a binary expression.
pub fn binary_parts(tree: &SyntaxTree, binary: NodeId) -> Option<(NodeId, &str, NodeId)> {
    let left = tree
        .child_by_field(binary, "left")
        .or_else(|| tree.first_syntax_child(binary))?;
    let right = tree
        .child_by_field(binary, "right")
        .or_else(|| tree.last_syntax_child(binary))?;
    if left == right {
        return None;
    }
    let op = tree
        .source()
        .get(tree.node(left).end_byte..tree.node(right).start_byte)
        .unwrap_or("")
        .trim();
    Some((left, op, right))
}

/// Invoked expression of an invocation.
pub fn invocation_function(tree: &SyntaxTree, invocation: NodeId) -> Option<NodeId> {
    tree.child_by_field(invocation, "function")
        .or_else(|| tree.first_syntax_child(invocation))
        .filter(|&f| tree.kind(f) != NodeKind::ArgumentList)
}

/// Argument list of an invocation or object creation.
pub fn argument_list(tree: &SyntaxTree, call: NodeId) -> Option<NodeId> {
    tree.child_by_field(call, "arguments")
        .or_else(|| tree.child_of_kind(call, NodeKind::ArgumentList))
}

/// Value expressions of each argument, in order.
pub fn argument_expressions(tree: &SyntaxTree, list: NodeId) -> Vec<NodeId> {
    tree.children_of_kind(list, NodeKind::Argument)
        .filter_map(|arg| argument_value(tree, arg))
        .collect()
}

/// Value of a single argument, skipping a `name:` label.
pub fn argument_value(tree: &SyntaxTree, argument: NodeId) -> Option<NodeId> {
    tree.syntax_children(argument)
        .filter(|&c| tree.kind(c) != NodeKind::NameColon)
        .last()
}

/// Receiver and member name node of `receiver.Name`.
pub fn member_access_parts(tree: &SyntaxTree, access: NodeId) -> Option<(NodeId, NodeId)> {
    let receiver = tree
        .child_by_field(access, "expression")
        .or_else(|| tree.first_syntax_child(access))?;
    let name = tree
        .child_by_field(access, "name")
        .or_else(|| tree.last_syntax_child(access))?;
    if receiver == name {
        return None;
    }
    Some((receiver, name))
}

/// Simple name text of an identifier or generic name (`Foo` for `Foo<T>`).
pub fn simple_name(tree: &SyntaxTree, name: NodeId) -> &str {
    match tree.kind(name) {
        NodeKind::GenericName => tree
            .child_of_kind(name, NodeKind::Identifier)
            .map(|id| tree.text(id))
            .unwrap_or(""),
        NodeKind::Identifier => tree.text(name),
        NodeKind::MemberBindingExpression => tree
            .child_by_field(name, "name")
            .or_else(|| tree.last_syntax_child(name))
            .map(|n| simple_name(tree, n))
            .unwrap_or(""),
        _ => "",
    }
}

/// Receiver and simple method name of `receiver.Method(...)`.
pub fn invoked_member(tree: &SyntaxTree, invocation: NodeId) -> Option<(NodeId, &str)> {
    let function = invocation_function(tree, invocation)?;
    if tree.kind(function) != NodeKind::MemberAccessExpression {
        return None;
    }
    let (receiver, name) = member_access_parts(tree, function)?;
    Some((receiver, simple_name(tree, name)))
}

/// Receiver and method name of a null-conditional call `receiver?.Method()`.
///
/// Accepts both grammar shapes: the conditional access wrapping the call,
/// and the call wrapping the conditional access.
pub fn conditional_invocation(tree: &SyntaxTree, node: NodeId) -> Option<(NodeId, &str)> {
    match tree.kind(node) {
        NodeKind::ConditionalAccessExpression => {
            let receiver = tree
                .child_by_field(node, "condition")
                .or_else(|| tree.first_syntax_child(node))?;
            let tail = tree.last_syntax_child(node)?;
            if tail == receiver || tree.kind(tail) != NodeKind::InvocationExpression {
                return None;
            }
            let function = invocation_function(tree, tail)?;
            if tree.kind(function) != NodeKind::MemberBindingExpression {
                return None;
            }
            Some((receiver, simple_name(tree, function)))
        }
        NodeKind::InvocationExpression => {
            let function = invocation_function(tree, node)?;
            if tree.kind(function) != NodeKind::ConditionalAccessExpression {
                return None;
            }
            let receiver = tree
                .child_by_field(function, "condition")
                .or_else(|| tree.first_syntax_child(function))?;
            let binding = tree.last_syntax_child(function)?;
            if tree.kind(binding) != NodeKind::MemberBindingExpression {
                return None;
            }
            Some((receiver, simple_name(tree, binding)))
        }
        _ => None,
    }
}

/// Condition, consequence and alternative of a ternary.
pub fn ternary_parts(tree: &SyntaxTree, conditional: NodeId) -> Option<(NodeId, NodeId, NodeId)> {
    let parts: Vec<NodeId> = tree.syntax_children(conditional).collect();
    let condition = tree
        .child_by_field(conditional, "condition")
        .or_else(|| parts.first().copied())?;
    let consequence = tree
        .child_by_field(conditional, "consequence")
        .or_else(|| parts.get(1).copied())?;
    let alternative = tree
        .child_by_field(conditional, "alternative")
        .or_else(|| parts.get(2).copied())?;
    Some((condition, consequence, alternative))
}

/// Expression returned by a `return` or `yield return` statement.
pub fn returned_expression(tree: &SyntaxTree, statement: NodeId) -> Option<NodeId> {
    tree.first_syntax_child(statement)
}

/// Resource part of `using (resource) body`.
pub fn using_resource(tree: &SyntaxTree, using: NodeId) -> Option<NodeId> {
    let body = tree.child_by_field(using, "body");
    let children: Vec<NodeId> = tree.syntax_children(using).collect();
    if children.len() < 2 {
        return None;
    }
    children.into_iter().find(|&c| Some(c) != body && !tree.kind(c).is_statement())
}

/// Whether `node` sits inside the resource part of a `using` statement or
/// is declared by a `using var` declaration.
pub fn is_in_using_resource(tree: &SyntaxTree, node: NodeId) -> bool {
    let mut child = node;
    for ancestor in tree.ancestors(node) {
        match tree.kind(ancestor) {
            NodeKind::UsingStatement => {
                return using_resource(tree, ancestor) == Some(child);
            }
            NodeKind::LocalDeclarationStatement => return is_using_declaration(tree, ancestor),
            kind if kind.is_statement() || kind.is_member_with_body() => return false,
            _ => {}
        }
        child = ancestor;
    }
    false
}

/// `using var x = ...;` / `await using var x = ...;`
pub fn is_using_declaration(tree: &SyntaxTree, statement: NodeId) -> bool {
    let text = tree.text(statement).trim_start();
    let text = text.strip_prefix("await").map(str::trim_start).unwrap_or(text);
    text.starts_with("using") && text[5..].starts_with(|c: char| c.is_whitespace())
}

/// Whether the expression is `name` or `this.name`.
pub fn refers_to(tree: &SyntaxTree, expr: NodeId, name: &str) -> bool {
    match tree.kind(expr) {
        NodeKind::Identifier => tree.text(expr) == name,
        NodeKind::MemberAccessExpression => match member_access_parts(tree, expr) {
            Some((receiver, member)) => {
                tree.kind(receiver) == NodeKind::This && simple_name(tree, member) == name
            }
            None => false,
        },
        _ => false,
    }
}

/// Nearest enclosing member that owns a body.
pub fn enclosing_member(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    tree.nearest_ancestor_where(node, |k| {
        matches!(
            k,
            NodeKind::MethodDeclaration
                | NodeKind::ConstructorDeclaration
                | NodeKind::DestructorDeclaration
                | NodeKind::AccessorDeclaration
                | NodeKind::PropertyDeclaration
                | NodeKind::IndexerDeclaration
                | NodeKind::LocalFunctionStatement
                | NodeKind::FieldDeclaration
        )
    })
}

/// Nearest enclosing class, struct, record or interface.
pub fn enclosing_type(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    tree.nearest_ancestor_where(node, NodeKind::is_type_declaration)
}

/// Name of an attribute without namespace or `Attribute` suffix.
pub fn attribute_name(tree: &SyntaxTree, attribute: NodeId) -> &str {
    let name = tree
        .child_by_field(attribute, "name")
        .or_else(|| tree.first_syntax_child(attribute))
        .map(|n| tree.text(n))
        .unwrap_or("");
    let simple = name.rsplit('.').next().unwrap_or(name);
    simple.strip_suffix("Attribute").unwrap_or(simple)
}

/// Arguments of an attribute as `(name, value)` pairs; `name` is set for
/// `Name = value` arguments.
pub fn attribute_arguments(tree: &SyntaxTree, attribute: NodeId) -> Vec<(Option<&str>, NodeId)> {
    let Some(list) = tree.child_of_kind(attribute, NodeKind::AttributeArgumentList) else {
        return Vec::new();
    };
    tree.children_of_kind(list, NodeKind::AttributeArgument)
        .filter_map(|arg| {
            // Current grammars label `Name =` with a `name` field; older ones
            // wrap it in a name_equals/name_colon node.
            let label_node = tree.child_by_field(arg, "name").or_else(|| {
                tree.child_of_kind(arg, NodeKind::NameEquals)
                    .or_else(|| tree.child_of_kind(arg, NodeKind::NameColon))
                    .and_then(|n| tree.first_syntax_child(n))
            });
            let value = tree.child_by_field(arg, "expression").or_else(|| {
                tree.syntax_children(arg)
                    .filter(|&c| {
                        Some(c) != label_node
                            && !matches!(tree.kind(c), NodeKind::NameEquals | NodeKind::NameColon)
                    })
                    .last()
            })?;
            Some((label_node.map(|n| tree.text(n)), value))
        })
        .collect()
}

/// Content of a string literal, without quotes or `@` prefix.
pub fn string_literal_value(tree: &SyntaxTree, literal: NodeId) -> Option<&str> {
    if tree.kind(literal) != NodeKind::Literal {
        return None;
    }
    let text = tree.text(literal);
    let text = text.strip_prefix('@').unwrap_or(text);
    text.strip_prefix('"').and_then(|t| t.strip_suffix('"'))
}
