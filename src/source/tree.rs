//! Owned syntax arena.
//!
//! Parsed C# files are lowered into a flat `Vec<Node>` so that rules can hold
//! plain `NodeId` handles, walk parents without lifetimes, and share the tree
//! across rayon workers. Nodes are stored in pre-order, which makes the id
//! order identical to source order.

use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// NODE KINDS
// =============================================================================

/// Syntactic kind of a lowered node.
///
/// This is a closed set: grammar kinds the analyzer never inspects are
/// collapsed into [`NodeKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Declarations
    CompilationUnit,
    NamespaceDeclaration,
    FileScopedNamespace,
    UsingDirective,
    ClassDeclaration,
    InterfaceDeclaration,
    StructDeclaration,
    RecordDeclaration,
    EnumDeclaration,
    DelegateDeclaration,
    DeclarationList,
    Modifier,
    TypeParameterList,
    TypeParameter,
    BaseList,
    AttributeList,
    Attribute,
    AttributeArgumentList,
    AttributeArgument,
    NameEquals,
    NameColon,
    FieldDeclaration,
    PropertyDeclaration,
    IndexerDeclaration,
    EventFieldDeclaration,
    AccessorList,
    AccessorDeclaration,
    ArrowExpressionClause,
    MethodDeclaration,
    ConstructorDeclaration,
    DestructorDeclaration,
    ConstructorInitializer,
    ParameterList,
    Parameter,
    VariableDeclaration,
    VariableDeclarator,
    EqualsValueClause,

    // Statements
    Block,
    LocalDeclarationStatement,
    LocalFunctionStatement,
    ExpressionStatement,
    ReturnStatement,
    YieldStatement,
    IfStatement,
    ElseClause,
    SwitchStatement,
    SwitchSection,
    UsingStatement,
    ForStatement,
    ForEachStatement,
    WhileStatement,
    DoStatement,
    TryStatement,
    CatchClause,
    FinallyClause,
    ThrowStatement,

    // Expressions
    AssignmentExpression,
    BinaryExpression,
    InvocationExpression,
    ArgumentList,
    Argument,
    MemberAccessExpression,
    ConditionalAccessExpression,
    MemberBindingExpression,
    ObjectCreationExpression,
    ImplicitObjectCreationExpression,
    ArrayCreationExpression,
    ImplicitArrayCreationExpression,
    InitializerExpression,
    ConditionalExpression,
    ParenthesizedExpression,
    CastExpression,
    AsExpression,
    AwaitExpression,
    LambdaExpression,
    AnonymousMethodExpression,
    ElementAccessExpression,
    BracketedArgumentList,
    TypeofExpression,
    DeclarationExpression,

    // Names, types and literals
    Identifier,
    GenericName,
    QualifiedName,
    AliasQualifiedName,
    PredefinedType,
    ImplicitType,
    NullableType,
    ArrayType,
    TupleType,
    TypeArgumentList,
    NullLiteral,
    Literal,
    This,
    Base,

    /// A keyword or operator token that carries a grammar field label.
    Token,
    Other,
}

impl NodeKind {
    /// Map a tree-sitter-c-sharp kind name to a `NodeKind`.
    ///
    /// Several grammar releases renamed nodes; all known spellings are
    /// accepted.
    pub fn from_grammar(kind: &str) -> Self {
        match kind {
            "compilation_unit" => Self::CompilationUnit,
            "namespace_declaration" => Self::NamespaceDeclaration,
            "file_scoped_namespace_declaration" => Self::FileScopedNamespace,
            "using_directive" => Self::UsingDirective,
            "class_declaration" => Self::ClassDeclaration,
            "interface_declaration" => Self::InterfaceDeclaration,
            "struct_declaration" => Self::StructDeclaration,
            "record_declaration" | "record_struct_declaration" => Self::RecordDeclaration,
            "enum_declaration" => Self::EnumDeclaration,
            "delegate_declaration" => Self::DelegateDeclaration,
            "declaration_list" => Self::DeclarationList,
            "modifier" => Self::Modifier,
            "type_parameter_list" => Self::TypeParameterList,
            "type_parameter" => Self::TypeParameter,
            "base_list" => Self::BaseList,
            "attribute_list" => Self::AttributeList,
            "attribute" => Self::Attribute,
            "attribute_argument_list" => Self::AttributeArgumentList,
            "attribute_argument" => Self::AttributeArgument,
            "name_equals" => Self::NameEquals,
            "name_colon" => Self::NameColon,
            "field_declaration" => Self::FieldDeclaration,
            "property_declaration" => Self::PropertyDeclaration,
            "indexer_declaration" => Self::IndexerDeclaration,
            "event_field_declaration" => Self::EventFieldDeclaration,
            "accessor_list" => Self::AccessorList,
            "accessor_declaration" => Self::AccessorDeclaration,
            "arrow_expression_clause" => Self::ArrowExpressionClause,
            "method_declaration" => Self::MethodDeclaration,
            "constructor_declaration" => Self::ConstructorDeclaration,
            "destructor_declaration" => Self::DestructorDeclaration,
            "constructor_initializer" => Self::ConstructorInitializer,
            "parameter_list" => Self::ParameterList,
            "parameter" => Self::Parameter,
            "variable_declaration" | "using_variable_declaration" => Self::VariableDeclaration,
            "variable_declarator" | "using_variable_declarator" => Self::VariableDeclarator,
            "equals_value_clause" => Self::EqualsValueClause,

            "block" => Self::Block,
            "local_declaration_statement" => Self::LocalDeclarationStatement,
            "local_function_statement" => Self::LocalFunctionStatement,
            "expression_statement" => Self::ExpressionStatement,
            "return_statement" => Self::ReturnStatement,
            "yield_statement" => Self::YieldStatement,
            "if_statement" => Self::IfStatement,
            "else_clause" => Self::ElseClause,
            "switch_statement" => Self::SwitchStatement,
            "switch_section" => Self::SwitchSection,
            "using_statement" => Self::UsingStatement,
            "for_statement" => Self::ForStatement,
            "foreach_statement" | "for_each_statement" => Self::ForEachStatement,
            "while_statement" => Self::WhileStatement,
            "do_statement" => Self::DoStatement,
            "try_statement" => Self::TryStatement,
            "catch_clause" => Self::CatchClause,
            "finally_clause" => Self::FinallyClause,
            "throw_statement" => Self::ThrowStatement,

            "assignment_expression" => Self::AssignmentExpression,
            "binary_expression" => Self::BinaryExpression,
            "invocation_expression" => Self::InvocationExpression,
            "argument_list" => Self::ArgumentList,
            "argument" => Self::Argument,
            "member_access_expression" => Self::MemberAccessExpression,
            "conditional_access_expression" => Self::ConditionalAccessExpression,
            "member_binding_expression" => Self::MemberBindingExpression,
            "object_creation_expression" => Self::ObjectCreationExpression,
            "implicit_object_creation_expression" => Self::ImplicitObjectCreationExpression,
            "array_creation_expression" => Self::ArrayCreationExpression,
            "implicit_array_creation_expression" => Self::ImplicitArrayCreationExpression,
            "initializer_expression" => Self::InitializerExpression,
            "conditional_expression" => Self::ConditionalExpression,
            "parenthesized_expression" => Self::ParenthesizedExpression,
            "cast_expression" => Self::CastExpression,
            "as_expression" => Self::AsExpression,
            "await_expression" => Self::AwaitExpression,
            "lambda_expression" => Self::LambdaExpression,
            "anonymous_method_expression" => Self::AnonymousMethodExpression,
            "element_access_expression" => Self::ElementAccessExpression,
            "bracketed_argument_list" => Self::BracketedArgumentList,
            "typeof_expression" => Self::TypeofExpression,
            "declaration_expression" => Self::DeclarationExpression,

            "identifier" => Self::Identifier,
            "generic_name" => Self::GenericName,
            "qualified_name" => Self::QualifiedName,
            "alias_qualified_name" => Self::AliasQualifiedName,
            "predefined_type" => Self::PredefinedType,
            "implicit_type" => Self::ImplicitType,
            "nullable_type" => Self::NullableType,
            "array_type" => Self::ArrayType,
            "tuple_type" => Self::TupleType,
            "type_argument_list" => Self::TypeArgumentList,
            "null_literal" => Self::NullLiteral,
            "integer_literal" | "real_literal" | "string_literal" | "character_literal"
            | "boolean_literal" | "verbatim_string_literal" | "raw_string_literal"
            | "interpolated_string_expression" => Self::Literal,
            "this" | "this_expression" => Self::This,
            "base" | "base_expression" => Self::Base,
            _ => Self::Other,
        }
    }

    /// Type-level declarations (class, struct, record, interface).
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            Self::ClassDeclaration
                | Self::StructDeclaration
                | Self::RecordDeclaration
                | Self::InterfaceDeclaration
        )
    }

    /// Members that own a body the analyzer can scan.
    pub fn is_member_with_body(self) -> bool {
        matches!(
            self,
            Self::MethodDeclaration
                | Self::ConstructorDeclaration
                | Self::DestructorDeclaration
                | Self::AccessorDeclaration
                | Self::PropertyDeclaration
                | Self::IndexerDeclaration
                | Self::LocalFunctionStatement
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(self, Self::NullLiteral | Self::Literal)
    }

    /// Statements: the boundary at which upward context searches stop.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Self::Block
                | Self::LocalDeclarationStatement
                | Self::LocalFunctionStatement
                | Self::ExpressionStatement
                | Self::ReturnStatement
                | Self::YieldStatement
                | Self::IfStatement
                | Self::SwitchStatement
                | Self::UsingStatement
                | Self::ForStatement
                | Self::ForEachStatement
                | Self::WhileStatement
                | Self::DoStatement
                | Self::TryStatement
                | Self::ThrowStatement
        )
    }
}

// =============================================================================
// SPANS
// =============================================================================

/// 1-indexed line/column span of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self { start_line, start_col, end_line, end_col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

// =============================================================================
// ARENA
// =============================================================================

/// Handle into a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Grammar kind as reported by tree-sitter.
    pub grammar_kind: &'static str,
    /// Grammar field label under the parent, e.g. `"left"` or `"body"`.
    pub field: Option<&'static str>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub start_byte: usize,
    pub end_byte: usize,
    pub span: Span,
}

/// A `//` or `/* */` comment, kept out of the node list.
#[derive(Debug, Clone)]
pub struct Comment {
    pub line: usize,
    pub end_line: usize,
    pub text: String,
}

/// Immutable, owned syntax tree for one source file.
#[derive(Debug)]
pub struct SyntaxTree {
    path: PathBuf,
    source: String,
    nodes: Vec<Node>,
    comments: Vec<Comment>,
    has_errors: bool,
}

impl SyntaxTree {
    pub(crate) fn from_parts(
        path: PathBuf,
        source: String,
        nodes: Vec<Node>,
        comments: Vec<Comment>,
        has_errors: bool,
    ) -> Self {
        Self { path, source, nodes, comments, has_errors }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// True when the parser had to recover from syntax errors.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The compilation unit. Lowering always emits it first.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    pub fn is(&self, id: NodeId, kind: NodeKind) -> bool {
        self.kind(id) == kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn field(&self, id: NodeId) -> Option<&'static str> {
        self.nodes[id.index()].field
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn text(&self, id: NodeId) -> &str {
        let node = &self.nodes[id.index()];
        self.source.get(node.start_byte..node.end_byte).unwrap_or("")
    }

    /// First child carrying the given grammar field label.
    pub fn child_by_field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.field(c) == Some(field))
    }

    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.kind(c) == kind)
    }

    pub fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().copied().filter(move |&c| self.kind(c) == kind)
    }

    /// Children that are real syntax, i.e. not field-labelled tokens.
    pub fn syntax_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.kind(c) != NodeKind::Token)
    }

    pub fn first_syntax_child(&self, id: NodeId) -> Option<NodeId> {
        self.syntax_children(id).next()
    }

    pub fn last_syntax_child(&self, id: NodeId) -> Option<NodeId> {
        self.syntax_children(id).last()
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors { tree: self, next: self.parent(id) }
    }

    pub fn nearest_ancestor(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.kind(a) == kind)
    }

    pub fn nearest_ancestor_where(
        &self,
        id: NodeId,
        pred: impl Fn(NodeKind) -> bool,
    ) -> Option<NodeId> {
        self.ancestors(id).find(|&a| pred(self.kind(a)))
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// All proper descendants of `id` in source (pre-)order.
    ///
    /// Because nodes are stored in pre-order, a subtree is a contiguous
    /// id range; this walks it without recursion.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = id.index() + 1;
        let end = self.subtree_end(id);
        (start..end).map(|i| NodeId(i as u32))
    }

    /// `id` followed by its descendants.
    pub fn subtree(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let end = self.subtree_end(id);
        (id.index()..end).map(|i| NodeId(i as u32))
    }

    fn subtree_end(&self, id: NodeId) -> usize {
        let mut current = id;
        loop {
            match self.children(current).last() {
                Some(&last) => current = last,
                None => return current.index() + 1,
            }
        }
    }

    /// Every node of the given kind, in source order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.kind == kind)
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Name identifier of a declaration (`name` field).
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.name_node(id).map(|n| self.text(n))
    }

    pub fn name_node(&self, id: NodeId) -> Option<NodeId> {
        self.child_by_field(id, "name")
            .or_else(|| self.child_of_kind(id, NodeKind::Identifier))
    }

    /// Modifier keywords (`public`, `static`, ...) of a declaration.
    pub fn modifiers(&self, id: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.children_of_kind(id, NodeKind::Modifier).map(move |m| self.text(m).trim())
    }

    pub fn has_modifier(&self, id: NodeId, modifier: &str) -> bool {
        self.modifiers(id).any(|m| m == modifier)
    }

    /// Strip parentheses around an expression.
    pub fn unparenthesize(&self, mut id: NodeId) -> NodeId {
        while self.kind(id) == NodeKind::ParenthesizedExpression {
            match self.first_syntax_child(id) {
                Some(inner) => id = inner,
                None => break,
            }
        }
        id
    }

    /// Attributes attached to a declaration.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children_of_kind(id, NodeKind::AttributeList)
            .flat_map(move |list| self.children_of_kind(list, NodeKind::Attribute))
    }
}

pub struct Ancestors<'t> {
    tree: &'t SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
