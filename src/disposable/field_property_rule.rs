//! DSP003: disposable fields and properties that are overwritten or never
//! disposed.
//!
//! Every action of the declaring type (methods, constructors, finalizers,
//! accessors) is scanned in source order. Instance members are only touched
//! by instance actions; static members by any action.

use crate::lint::{Diagnostic, Rule, RuleCode};
use crate::source::{NodeId, NodeKind};

use super::classifier::{classify_ordered, EventKind, ExpressionEvent};
use super::collections::is_disposed_by_helper;
use super::context::RuleContext;
use super::members::{
    actions, is_assigned_at_declaration, is_pass_through_property, is_solely_constructor_assigned,
    member_names, type_members, Action, DisposableDeclaration,
};
use super::oracle::CollectionType;

pub struct FieldPropertyRule;

impl FieldPropertyRule {
    pub fn new() -> Self {
        Self
    }

    /// Disposable members of `type_decl` that this rule tracks.
    fn declarations(&self, ctx: &RuleContext<'_>, type_decl: NodeId) -> Vec<DisposableDeclaration> {
        let tree = ctx.tree;
        let mut found = Vec::new();
        for member in type_members(tree, type_decl) {
            if !matches!(tree.kind(member), NodeKind::FieldDeclaration | NodeKind::PropertyDeclaration)
                || is_pass_through_property(tree, type_decl, member)
                || ctx.is_suppressed(RuleCode::DSP003, member)
            {
                continue;
            }
            let Some(ty) = ctx.oracle.node_type(tree, member) else {
                continue;
            };
            let collection_type = if ctx.oracle.is_disposable(&ty) {
                CollectionType::None
            } else if ctx.oracle.has_disposable_elements(&ty) {
                ctx.oracle.collection_type(&ty)
            } else {
                continue;
            };
            let is_static = tree.has_modifier(member, "static") || tree.has_modifier(member, "const");
            for (declared, name) in member_names(tree, member) {
                if is_solely_constructor_assigned(tree, type_decl, declared, &name) {
                    continue;
                }
                found.push(DisposableDeclaration {
                    node: declared,
                    member,
                    span: tree.span(declared),
                    is_assigned_at_declaration: is_assigned_at_declaration(tree, declared),
                    is_static,
                    collection_type,
                    name,
                });
            }
        }
        found
    }

    fn check_declaration(
        &self,
        ctx: &RuleContext<'_>,
        decl: &DisposableDeclaration,
        all_actions: &[Action],
    ) -> Vec<Diagnostic> {
        let tree = ctx.tree;
        let scope: Vec<NodeId> = all_actions
            .iter()
            .filter(|a| decl.is_static || !a.is_static)
            .map(|a| a.node)
            .collect();

        if decl.collection_type != CollectionType::None {
            if is_disposed_by_helper(tree, &scope, &decl.name) {
                return Vec::new();
            }
            return vec![ctx.diagnostic(
                RuleCode::DSP003,
                decl.node,
                format!(
                    "Collection '{}' holds disposable items that are never disposed; call DisposeItems() or a RemoveAndDispose helper",
                    decl.name
                ),
            )];
        }

        let nodes = scope.iter().flat_map(|&action| tree.subtree(action));
        let Some(events) = classify_ordered(tree, nodes, &decl.name) else {
            return Vec::new();
        };

        let mut trace = Vec::with_capacity(events.len() + 1);
        if decl.is_assigned_at_declaration {
            trace.push(ExpressionEvent {
                node: decl.node,
                kind: EventKind::Assignment,
                span: decl.span,
            });
        }
        trace.extend(events);

        unsafe_assignments(&trace)
            .into_iter()
            .filter(|e| !ctx.is_suppressed(RuleCode::DSP003, e.node))
            .map(|e| {
                ctx.diagnostic(
                    RuleCode::DSP003,
                    e.node,
                    format!(
                        "'{}' is assigned a disposable value that is overwritten or never disposed",
                        decl.name
                    ),
                )
            })
            .collect()
    }
}

/// Assignments not immediately followed by an event that releases the
/// value. A trailing assignment is never released.
fn unsafe_assignments(trace: &[ExpressionEvent]) -> Vec<ExpressionEvent> {
    trace
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == EventKind::Assignment)
        .filter(|(i, _)| !trace.get(i + 1).is_some_and(|next| next.kind.releases_previous()))
        .map(|(_, e)| *e)
        .collect()
}

impl Default for FieldPropertyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for FieldPropertyRule {
    fn code(&self) -> RuleCode {
        RuleCode::DSP003
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let tree = ctx.tree;
        let mut diagnostics = Vec::new();
        for type_decl in tree
            .nodes_of_kind(NodeKind::ClassDeclaration)
            .chain(tree.nodes_of_kind(NodeKind::StructDeclaration))
        {
            if tree.has_modifier(type_decl, "static") {
                continue;
            }
            let declarations = self.declarations(ctx, type_decl);
            if declarations.is_empty() {
                continue;
            }
            let all_actions = actions(tree, type_decl);
            for decl in &declarations {
                diagnostics.extend(self.check_declaration(ctx, decl, &all_actions));
            }
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::test_support::check_rule;

    const PRELUDE: &str = "using System; using System.IO; using System.Collections.Generic;\n";

    fn check(src: &str) -> Vec<Diagnostic> {
        check_rule(&FieldPropertyRule::new(), &format!("{}{}", PRELUDE, src))
    }

    #[test]
    fn test_assigned_and_disposed() {
        assert!(check(
            "class A : IDisposable { Stream s;\n\
               void Open() { s = File.OpenRead(\"x\"); }\n\
               public void Dispose() { s.Dispose(); } }",
        )
        .is_empty());
    }

    #[test]
    fn test_overwrite_without_dispose() {
        let diags = check(
            "class A : IDisposable { Stream s;\n\
               void Open() { s = File.OpenRead(\"x\"); }\n\
               void Reopen() { s = File.OpenRead(\"y\"); }\n\
               public void Dispose() { s?.Dispose(); } }",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start_line, 3);
    }

    #[test]
    fn test_this_qualified_overwrite() {
        let diags = check(
            "class A : IDisposable { Stream s;\n\
               void Open() { this.s = File.OpenRead(\"x\"); }\n\
               void Reopen() { this.s = File.OpenRead(\"y\"); }\n\
               public void Dispose() { this.s?.Dispose(); } }",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start_line, 3);
    }

    #[test]
    fn test_declaration_initializer_then_assignment() {
        let diags = check(
            "class A : IDisposable { Stream s = new MemoryStream();\n\
               void Reset() { s = new MemoryStream(); s.Dispose(); }\n\
               public void Dispose() { } }",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start_line, 2);
    }

    #[test]
    fn test_never_disposed_field() {
        let diags = check("class A { Stream s = new MemoryStream(); }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("'s'"));
    }

    #[test]
    fn test_constructor_parameter_member_is_exempt() {
        assert!(check("class A { Stream s; A(Stream input) { s = input; } void Reset() { } }").is_empty());
    }

    #[test]
    fn test_returned_member_is_skipped() {
        assert!(check("class A { Stream s; Stream Take() { s = new MemoryStream(); return s; } }").is_empty());
    }

    #[test]
    fn test_static_member_disposed_in_static_action() {
        assert!(check(
            "class A { static Stream shared;\n\
               static void Init() { shared = new MemoryStream(); }\n\
               static void Shutdown() { shared.Dispose(); } }",
        )
        .is_empty());
    }

    #[test]
    fn test_instance_member_ignores_static_actions() {
        let diags = check(
            "class A { Stream s;\n\
               void Init() { s = new MemoryStream(); }\n\
               static void Shutdown(A a) { s.Dispose(); } }",
        );
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_collection_without_helper() {
        let diags = check("class A : IDisposable { List<Stream> items = new List<Stream>(); public void Dispose() { items.Clear(); } }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("'items'"));
    }

    #[test]
    fn test_collection_with_helper() {
        assert!(check(
            "class A : IDisposable { Dictionary<string, Stream> cache = new Dictionary<string, Stream>();\n\
               public void Dispose() { cache.DisposeItems(); } }",
        )
        .is_empty());
    }

    #[test]
    fn test_pass_through_property_is_not_tracked() {
        let diags = check(
            "class A : IDisposable { Stream s = new MemoryStream(); Stream Output => s;\n\
               public void Dispose() { s.Dispose(); } }",
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_static_class_is_skipped() {
        assert!(check("static class A { static Stream s = new MemoryStream(); }").is_empty());
    }
}
