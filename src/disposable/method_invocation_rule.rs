//! DSP005: invocations whose disposable result is dropped, and removals
//! that discard disposable collection items.

use crate::lint::{Diagnostic, Rule, RuleCode};
use crate::source::syntax;
use crate::source::{MethodHandle, NodeId, NodeKind};

use super::collections::REMOVE_METHODS;
use super::context::RuleContext;
use super::oracle::CollectionType;
use super::sink::{is_collection_add, is_disposable_wrapper, value_sink, Sink};

pub struct MethodInvocationRule;

impl MethodInvocationRule {
    pub fn new() -> Self {
        Self
    }

    fn check_invocation(&self, ctx: &RuleContext<'_>, call: NodeId) -> Option<Diagnostic> {
        let tree = ctx.tree;
        if syntax::is_in_using_resource(tree, call) || ctx.is_suppressed(RuleCode::DSP005, call) {
            return None;
        }
        let method = ctx.model.resolve_method(tree, call)?;
        if ctx.oracle.is_method_whitelisted(&method) {
            return None;
        }

        if REMOVE_METHODS.contains(&method.name.as_str()) {
            return self.check_removal(ctx, call, &method);
        }

        let returned = method.return_type.as_ref()?;
        if !ctx.oracle.is_disposable(returned) || self.is_owned(ctx, call) {
            return None;
        }
        Some(ctx.diagnostic(
            RuleCode::DSP005,
            call,
            format!(
                "Disposable result of '{}' is never disposed",
                method.original_definition_display()
            ),
        ))
    }

    /// `list.RemoveAt(i)` / `dict.Remove(key)` on a collection of disposables.
    fn check_removal(&self, ctx: &RuleContext<'_>, call: NodeId, method: &MethodHandle) -> Option<Diagnostic> {
        let tree = ctx.tree;
        let (receiver, _) =
            syntax::invoked_member(tree, call).or_else(|| syntax::conditional_invocation(tree, call))?;
        let receiver_type = ctx.model.type_of(tree, receiver)?;
        let discards = matches!(
            ctx.oracle.collection_type(&receiver_type),
            CollectionType::List | CollectionType::Dictionary
        ) && ctx.oracle.has_disposable_elements(&receiver_type);
        discards.then(|| {
            ctx.diagnostic(
                RuleCode::DSP005,
                call,
                format!(
                    "'{}' removes disposable items without disposing them; use {}AndDispose",
                    method.original_definition_display(),
                    method.name
                ),
            )
        })
    }

    /// Whether something downstream takes ownership of the result.
    fn is_owned(&self, ctx: &RuleContext<'_>, call: NodeId) -> bool {
        match value_sink(ctx.tree, call) {
            Sink::Disposed | Sink::Using => return true,
            Sink::Argument(outer) if is_collection_add(ctx, outer) || is_disposable_wrapper(ctx, outer) => {
                return true
            }
            _ => {}
        }
        self.in_whitelisted_call(ctx, call) || self.in_owning_context(ctx, call)
    }

    /// An enclosing call, up to the statement, targets a whitelisted method.
    fn in_whitelisted_call(&self, ctx: &RuleContext<'_>, call: NodeId) -> bool {
        let tree = ctx.tree;
        tree.ancestors(call)
            .take_while(|&a| !tree.kind(a).is_statement())
            .filter(|&a| tree.kind(a) == NodeKind::InvocationExpression)
            .filter_map(|a| ctx.model.resolve_method(tree, a))
            .any(|m| ctx.oracle.is_method_whitelisted(&m))
    }

    /// A `return`, assignment or initializer encloses the call. The rules
    /// for fields, locals and returns track the value from there.
    fn in_owning_context(&self, ctx: &RuleContext<'_>, call: NodeId) -> bool {
        let tree = ctx.tree;
        for ancestor in tree.ancestors(call) {
            match tree.kind(ancestor) {
                NodeKind::ReturnStatement
                | NodeKind::YieldStatement
                | NodeKind::AssignmentExpression
                | NodeKind::VariableDeclarator
                | NodeKind::EqualsValueClause
                | NodeKind::InitializerExpression
                | NodeKind::ArrowExpressionClause
                | NodeKind::LambdaExpression
                | NodeKind::AnonymousMethodExpression
                | NodeKind::UsingStatement => return true,
                kind if kind.is_statement() || kind.is_member_with_body() => return false,
                _ => {}
            }
        }
        false
    }
}

impl Default for MethodInvocationRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for MethodInvocationRule {
    fn code(&self) -> RuleCode {
        RuleCode::DSP005
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        ctx.tree
            .nodes_of_kind(NodeKind::InvocationExpression)
            .filter_map(|call| self.check_invocation(ctx, call))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::test_support::{check_rule, check_rule_with};
    use crate::disposable::{AnalysisSettings, Whitelist};

    const PRELUDE: &str = "using System; using System.IO; using System.Collections.Generic;\n\
        class Res : IDisposable { public void Dispose() { } public static Res Create() { return new Res(); } }\n";

    fn check_body(body: &str) -> Vec<Diagnostic> {
        let src = format!(
            "{}class A {{ List<Res> items; Dictionary<string, Res> byName; List<int> numbers;\n\
             object M() {{\n{}\nreturn null; }} }}",
            PRELUDE, body
        );
        check_rule(&MethodInvocationRule::new(), &src)
    }

    #[test]
    fn test_orphaned_result() {
        let diags = check_body("Res.Create();");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start_line, 5);
        assert!(diags[0].message.contains("Res.Create()"));
    }

    #[test]
    fn test_chained_dispose() {
        assert!(check_body("Res.Create().Dispose();").is_empty());
        assert!(check_body("Res.Create()?.Dispose();").is_empty());
    }

    #[test]
    fn test_owned_results() {
        assert!(check_body("var r = Res.Create(); r.Dispose();").is_empty());
        assert!(check_body("using (Res.Create()) { }").is_empty());
        assert!(check_body("items.Add(Res.Create());").is_empty());
        assert!(check_body("Func<Res> f = () => Res.Create();").is_empty());
    }

    #[test]
    fn test_framework_factory_result() {
        let diags = check_body("File.OpenRead(\"x\");");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("File.OpenRead(string)"));
    }

    #[test]
    fn test_removals() {
        let diags = check_body("items.RemoveAt(0); byName.Remove(\"a\"); numbers.RemoveAt(0);");
        assert_eq!(diags.len(), 2);
        assert!(diags[0].message.contains("RemoveAtAndDispose"));
    }

    #[test]
    fn test_whitelisted_signature() {
        let src = format!("{}class A {{ void M() {{ Res.Create(); }} }}", PRELUDE);
        let whitelist = Whitelist::new(&[], &["Res.Create()".to_string()]);
        let diags = check_rule_with(&MethodInvocationRule::new(), &src, &whitelist, &AnalysisSettings::default());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_non_disposable_results() {
        assert!(check_body("var n = numbers.Count; numbers.Add(1); Console.WriteLine(\"x\");").is_empty());
    }
}
