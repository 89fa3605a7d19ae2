//! DSP001: class owns a disposable member but is not disposable itself.
//!
//! One diagnostic per class at most, anchored at the class name. Members
//! that only ever receive constructor parameters are owned by the caller.

use crate::lint::{Diagnostic, Rule, RuleCode};
use crate::source::{NodeId, NodeKind, TypeHandle};

use super::context::RuleContext;
use super::members::{is_solely_constructor_assigned, member_names, type_members};

pub struct ClassRule;

impl ClassRule {
    pub fn new() -> Self {
        Self
    }

    fn check_class(&self, ctx: &RuleContext<'_>, class: NodeId) -> Option<Diagnostic> {
        let tree = ctx.tree;
        if tree.has_modifier(class, "static") || ctx.is_suppressed(RuleCode::DSP001, class) {
            return None;
        }
        let own = TypeHandle::Named(ctx.model.declared_type(tree, class)?);
        if ctx.oracle.is_disposable(&own) || ctx.oracle.is_type_whitelisted(&own) {
            return None;
        }

        let class_name = tree.name_of(class)?;
        for member in type_members(tree, class) {
            if !matches!(tree.kind(member), NodeKind::FieldDeclaration | NodeKind::PropertyDeclaration)
                || tree.has_modifier(member, "static")
                || !ctx.oracle.is_node_disposable(tree, member)
            {
                continue;
            }
            let owned = member_names(tree, member)
                .into_iter()
                .find(|(declared, name)| !is_solely_constructor_assigned(tree, class, *declared, name));
            if let Some((_, name)) = owned {
                let anchor = tree.name_node(class).unwrap_or(class);
                return Some(ctx.diagnostic(
                    RuleCode::DSP001,
                    anchor,
                    format!(
                        "Class '{}' owns disposable member '{}' but does not implement IDisposable",
                        class_name, name
                    ),
                ));
            }
        }
        None
    }
}

impl Default for ClassRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ClassRule {
    fn code(&self) -> RuleCode {
        RuleCode::DSP001
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        ctx.tree
            .nodes_of_kind(NodeKind::ClassDeclaration)
            .filter_map(|class| self.check_class(ctx, class))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::test_support::check_rule;

    const PRELUDE: &str = "using System; using System.IO; using System.Collections.Generic;\n";

    fn check(src: &str) -> Vec<Diagnostic> {
        check_rule(&ClassRule::new(), &format!("{}{}", PRELUDE, src))
    }

    #[test]
    fn test_one_diagnostic_per_class_at_class_name() {
        let diags = check("class Owner { Stream a = new MemoryStream(); Stream b; List<Stream> c; }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, RuleCode::DSP001);
        assert_eq!(diags[0].range.start_line, 2);
        assert_eq!(diags[0].range.start_col, 7);
        assert!(diags[0].message.contains("'Owner'"));
        assert!(diags[0].message.contains("'a'"));
    }

    #[test]
    fn test_disposable_class_is_skipped() {
        assert!(check("class Owner : IDisposable { Stream a = new MemoryStream(); public void Dispose() { a.Dispose(); } }").is_empty());
        assert!(check("class Owner : MemoryStream { Stream a = new MemoryStream(); }").is_empty());
    }

    #[test]
    fn test_static_class_and_static_members_are_skipped() {
        assert!(check("static class Holder { static Stream a = new MemoryStream(); }").is_empty());
        assert!(check("class Holder { static Stream a = new MemoryStream(); }").is_empty());
    }

    #[test]
    fn test_constructor_parameter_members_are_exempt() {
        assert!(check("class Reader { Stream input; Reader(Stream input) { this.input = input; } }").is_empty());
        let diags = check(
            "class Reader { Stream input; Stream log; Reader(Stream input) { this.input = input; log = File.OpenRead(\"x\"); } }",
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("'log'"));
    }

    #[test]
    fn test_suppression_comment() {
        assert!(check("// dispose-lint:ignore DSP001\nclass Owner { Stream a = new MemoryStream(); }").is_empty());
    }

    #[test]
    fn test_non_disposable_members() {
        assert!(check("class Plain { int a; string b; List<int> c; }").is_empty());
    }
}
