//! DSP004: local variables holding a disposable that is never released.

use crate::lint::{Diagnostic, Rule, RuleCode};
use crate::source::syntax;
use crate::source::{NodeId, NodeKind, SyntaxTree};

use super::classifier::{classify_ordered, EventKind, ExpressionEvent};
use super::context::RuleContext;

pub struct LocalVariableRule;

impl LocalVariableRule {
    pub fn new() -> Self {
        Self
    }

    /// Diagnostics for one declaration statement. A `return` of any declared
    /// variable drops the whole statement.
    fn check_statement(&self, ctx: &RuleContext<'_>, stmt: NodeId) -> Option<Vec<Diagnostic>> {
        let tree = ctx.tree;
        let declaration = syntax::variable_declaration(tree, stmt)?;
        let disposable: Vec<NodeId> = syntax::declarators(tree, declaration)
            .into_iter()
            .filter(|&d| ctx.oracle.is_node_disposable(tree, d))
            .collect();
        if disposable.is_empty() {
            return Some(Vec::new());
        }
        let member = syntax::enclosing_member(tree, stmt)?;
        let stmt_end = tree.subtree(stmt).last().map_or(stmt.index(), |n| n.index());
        let later: Vec<NodeId> = tree.descendants(member).filter(|n| n.index() > stmt_end).collect();

        let mut diagnostics = Vec::new();
        for declarator in disposable {
            let Some(name_node) = syntax::declarator_name(tree, declarator) else {
                continue;
            };
            let name = tree.text(name_node);
            let events = classify_ordered(tree, later.iter().copied(), name)?;
            for node in self.leaks(tree, member, stmt, declarator, &events) {
                if ctx.is_suppressed(RuleCode::DSP004, node) {
                    continue;
                }
                diagnostics.push(ctx.diagnostic(
                    RuleCode::DSP004,
                    node,
                    format!("Local variable '{}' holds a disposable value that is not disposed", name),
                ));
            }
        }
        Some(diagnostics)
    }

    /// Nodes where a value held by the variable is lost.
    fn leaks(
        &self,
        tree: &SyntaxTree,
        member: NodeId,
        stmt: NodeId,
        declarator: NodeId,
        events: &[ExpressionEvent],
    ) -> Vec<NodeId> {
        let mut found = Vec::new();
        let holds_value = syntax::declarator_value(tree, declarator)
            .is_some_and(|v| !tree.kind(tree.unparenthesize(v)).is_literal());
        if holds_value {
            let settled = events.first().is_some_and(|first| {
                first.kind.releases_previous() || is_flow_controlled(tree, member, stmt, first.node)
            });
            if !settled {
                found.push(declarator);
            }
        }
        for (i, event) in events.iter().enumerate() {
            if event.kind != EventKind::Assignment || is_flow_controlled(tree, member, stmt, event.node) {
                continue;
            }
            if events.get(i + 1).is_some_and(|next| !next.kind.releases_previous()) {
                found.push(event.node);
            }
        }
        found
    }
}

/// Whether `node` runs under an `if`, `else` or `switch` branch that does
/// not also contain the declaration.
fn is_flow_controlled(tree: &SyntaxTree, member: NodeId, stmt: NodeId, node: NodeId) -> bool {
    tree.ancestors(node)
        .take_while(|&a| a != member)
        .filter(|&a| {
            matches!(
                tree.kind(a),
                NodeKind::IfStatement | NodeKind::ElseClause | NodeKind::SwitchSection | NodeKind::SwitchStatement
            )
        })
        .any(|branch| !tree.is_within(stmt, branch))
}

impl Default for LocalVariableRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for LocalVariableRule {
    fn code(&self) -> RuleCode {
        RuleCode::DSP004
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let tree = ctx.tree;
        tree.nodes_of_kind(NodeKind::LocalDeclarationStatement)
            .filter(|&stmt| !syntax::is_using_declaration(tree, stmt))
            .filter(|&stmt| !ctx.is_suppressed(RuleCode::DSP004, stmt))
            .filter_map(|stmt| self.check_statement(ctx, stmt))
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::test_support::check_rule;

    const PRELUDE: &str = "using System; using System.IO; using System.Collections.Generic;\n";

    fn check_body(body: &str) -> Vec<Diagnostic> {
        let src = format!("{}class A {{ void M(bool flag, List<Stream> sink) {{\n{}\n}} }}", PRELUDE, body);
        check_rule(&LocalVariableRule::new(), &src)
    }

    #[test]
    fn test_undisposed_local() {
        let diags = check_body("var s = new MemoryStream();");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start_line, 3);
        assert!(diags[0].message.contains("'s'"));
    }

    #[test]
    fn test_disposed_local() {
        assert!(check_body("var s = new MemoryStream(); s.Dispose();").is_empty());
        assert!(check_body("var s = new MemoryStream(); s?.Close();").is_empty());
    }

    #[test]
    fn test_using_forms_are_safe() {
        assert!(check_body("using (var s = new MemoryStream()) { }").is_empty());
        assert!(check_body("using var s = new MemoryStream();").is_empty());
        assert!(check_body("var s = new MemoryStream(); using (s) { }").is_empty());
    }

    #[test]
    fn test_double_assignment_reports_declaration_once() {
        let diags = check_body("MemoryStream item = new MemoryStream();\nitem = new MemoryStream();");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start_line, 3);
    }

    #[test]
    fn test_reassignment_without_dispose() {
        let diags = check_body(
            "Stream s = null;\n\
             s = new MemoryStream();\n\
             s = new MemoryStream();\n\
             s.Dispose();",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start_line, 4);
    }

    #[test]
    fn test_flow_controlled_assignments() {
        assert!(check_body(
            "Stream s = new MemoryStream();\n\
             if (flag) { s = new MemoryStream(); } else { s = new MemoryStream(); }\n\
             s.Dispose();",
        )
        .is_empty());
    }

    #[test]
    fn test_collection_add_and_exit() {
        assert!(check_body("var s = new MemoryStream(); sink.Add(s);").is_empty());
        assert!(check_body("Stream t; var s = new MemoryStream(); t = s; t.Dispose();").is_empty());
    }

    #[test]
    fn test_return_aborts_statement() {
        let src = format!(
            "{}class A {{ Stream M() {{ var a = new MemoryStream(); var b = new MemoryStream(); return a; }} }}",
            PRELUDE
        );
        let diags = check_rule(&LocalVariableRule::new(), &src);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("'b'"));
    }

    #[test]
    fn test_non_disposable_locals() {
        assert!(check_body("var n = 1; var text = \"x\"; var list = new List<int>();").is_empty());
    }

    #[test]
    fn test_suppressed_statement() {
        assert!(check_body("// dispose-lint:ignore DSP004\nvar s = new MemoryStream();").is_empty());
    }
}
