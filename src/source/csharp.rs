//! C# front-end: tree-sitter parsing and lowering into [`SyntaxTree`].

use std::path::Path;

use tracing::debug;
use tree_sitter::{Node as TsNode, Parser};

use super::tree::{Comment, Node, NodeId, NodeKind, Span, SyntaxTree};
use crate::error::LintError;

/// Create a parser configured for C#.
pub fn parser(path: &Path) -> Result<Parser, LintError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|e| LintError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    Ok(parser)
}

/// Parse C# source text into an owned syntax tree.
///
/// Files with syntax errors still produce a tree; tree-sitter recovers and
/// the analyzer works on whatever structure survived.
pub fn parse_csharp(path: &Path, source: &str) -> Result<SyntaxTree, LintError> {
    let mut parser = parser(path)?;
    let ts_tree = parser.parse(source, None).ok_or_else(|| LintError::Parse {
        path: path.to_path_buf(),
        detail: "parser produced no tree".to_string(),
    })?;

    let root = ts_tree.root_node();
    let has_errors = root.has_error();
    if has_errors {
        debug!("{}: syntax errors, analysing recovered tree", path.display());
    }

    let mut lowering = Lowering::new(source);
    lowering.lower(root);
    Ok(SyntaxTree::from_parts(
        path.to_path_buf(),
        source.to_string(),
        lowering.nodes,
        lowering.comments,
        has_errors,
    ))
}

struct Lowering<'s> {
    source: &'s str,
    nodes: Vec<Node>,
    comments: Vec<Comment>,
}

impl<'s> Lowering<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            nodes: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Pre-order walk with a cursor, so arena ids follow source order and
    /// deeply nested expressions cannot overflow the stack.
    ///
    /// Named nodes are kept. Anonymous tokens are kept only when the grammar
    /// labels them with a field (assignment operators, accessor keywords), or
    /// when they are a `this`/`base` receiver or operand.
    fn lower(&mut self, root: TsNode<'_>) {
        let root_id = self.push(root, None, None);
        let mut stack = vec![root_id];
        let mut cursor = root.walk();
        if !cursor.goto_first_child() {
            return;
        }

        'walk: loop {
            let node = cursor.node();
            let field = cursor.field_name();

            if node.kind() == "comment" {
                self.record_comment(node);
            } else if node.is_named() || field.is_some() || is_receiver_keyword(node) {
                let id = self.push(node, field, stack.last().copied());
                if node.is_named() && cursor.goto_first_child() {
                    stack.push(id);
                    continue 'walk;
                }
            }

            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
                stack.pop();
            }
        }
    }

    fn push(&mut self, node: TsNode<'_>, field: Option<&'static str>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let kind = if node.is_named() || is_receiver_keyword(node) {
            NodeKind::from_grammar(node.kind())
        } else {
            NodeKind::Token
        };
        let start = node.start_position();
        let end = node.end_position();
        self.nodes.push(Node {
            kind,
            grammar_kind: node.kind(),
            field,
            parent,
            children: Vec::new(),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            span: Span::new(start.row + 1, start.column + 1, end.row + 1, end.column + 1),
        });
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }
        id
    }

    fn record_comment(&mut self, node: TsNode<'_>) {
        let text = node.utf8_text(self.source.as_bytes()).unwrap_or("");
        self.comments.push(Comment {
            line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            text: text.to_string(),
        });
    }
}

/// `this` and `base` are anonymous keyword tokens in the C# grammar. They
/// stand for an expression everywhere except in constructor initializers,
/// indexer declarations and extension-method parameters.
fn is_receiver_keyword(node: TsNode<'_>) -> bool {
    if node.is_named() || !matches!(node.kind(), "this" | "base") {
        return false;
    }
    !node
        .parent()
        .is_some_and(|p| matches!(
            p.kind(),
            "constructor_initializer" | "indexer_declaration" | "parameter" | "parameter_list"
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SyntaxTree {
        parse_csharp(Path::new("Test.cs"), src).expect("parse")
    }

    #[test]
    fn test_parser_loads_grammar() {
        let mut parser = parser(Path::new("Test.cs")).expect("grammar loads");
        let tree = parser
            .parse("class A { void M() { var s = new MemoryStream(); } }", None)
            .expect("tree");
        assert_eq!(tree.root_node().kind(), "compilation_unit");
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn test_this_receiver_is_lowered() {
        let tree = parse("class A { A() : this(1) { } void M() { this.s = null; Use(this); } }");
        let this_nodes: Vec<_> = tree.nodes_of_kind(NodeKind::This).collect();
        assert_eq!(this_nodes.len(), 2);
        assert!(this_nodes.iter().all(|&n| tree.text(n) == "this"));
        let access = tree.nodes_of_kind(NodeKind::MemberAccessExpression).next().expect("access");
        assert_eq!(tree.kind(tree.children(access)[0]), NodeKind::This);
    }

    #[test]
    fn test_root_is_compilation_unit() {
        let tree = parse("class A {}");
        assert_eq!(tree.kind(tree.root()), NodeKind::CompilationUnit);
        assert!(!tree.has_errors());
    }

    #[test]
    fn test_ids_follow_source_order() {
        let tree = parse("class A { void M() { a = 1; b = 2; } }");
        let assigns: Vec<_> = tree.nodes_of_kind(NodeKind::AssignmentExpression).collect();
        assert_eq!(assigns.len(), 2);
        assert!(tree.span(assigns[0]).start_col < tree.span(assigns[1]).start_col);
    }

    #[test]
    fn test_class_name_and_modifiers() {
        let tree = parse("public static class Holder {}");
        let class = tree.nodes_of_kind(NodeKind::ClassDeclaration).next().expect("class");
        assert_eq!(tree.name_of(class), Some("Holder"));
        assert!(tree.has_modifier(class, "static"));
        assert!(tree.has_modifier(class, "public"));
    }

    #[test]
    fn test_assignment_sides_are_labelled() {
        let tree = parse("class A { void M() { x = null; } }");
        let assign = tree.nodes_of_kind(NodeKind::AssignmentExpression).next().expect("assign");
        let left = tree.child_by_field(assign, "left").expect("left");
        let right = tree.child_by_field(assign, "right").expect("right");
        assert_eq!(tree.text(left), "x");
        assert_eq!(tree.kind(right), NodeKind::NullLiteral);
    }

    #[test]
    fn test_comments_are_collected_not_lowered() {
        let tree = parse("// header\nclass A { /* inner */ }");
        assert_eq!(tree.comments().len(), 2);
        assert_eq!(tree.comments()[0].line, 1);
        assert_eq!(tree.nodes_of_kind(NodeKind::Other).filter(|&n| tree.text(n).starts_with("//")).count(), 0);
    }

    #[test]
    fn test_descendants_stay_inside_subtree() {
        let tree = parse("class A { void M() { var x = new B(); } } class C {}");
        let method = tree.nodes_of_kind(NodeKind::MethodDeclaration).next().expect("method");
        let classes: Vec<_> = tree.nodes_of_kind(NodeKind::ClassDeclaration).collect();
        assert!(tree.descendants(method).all(|d| tree.is_within(d, method)));
        assert!(!tree.descendants(method).any(|d| d == classes[1]));
        assert!(tree
            .descendants(method)
            .any(|d| tree.kind(d) == NodeKind::ObjectCreationExpression));
    }

    #[test]
    fn test_recovers_from_syntax_errors() {
        let tree = parse("class A { void M( { }");
        assert!(tree.has_errors());
        assert!(tree.nodes_of_kind(NodeKind::ClassDeclaration).next().is_some());
    }

    #[test]
    fn test_position_is_one_indexed() {
        let tree = parse("class A\n{\n}\n");
        let class = tree.nodes_of_kind(NodeKind::ClassDeclaration).next().expect("class");
        let name = tree.name_node(class).expect("name");
        assert_eq!(tree.span(name).start_line, 1);
        assert_eq!(tree.span(name).start_col, 7);
    }
}
