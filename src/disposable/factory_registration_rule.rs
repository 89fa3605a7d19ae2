//! DSP007: disposable class registered with a factory under an interface
//! that is not disposable, so callers can never dispose what they receive.

use crate::lint::{Diagnostic, Rule, RuleCode};
use crate::source::syntax;
use crate::source::{NodeId, NodeKind, TypeHandle};

use super::context::RuleContext;

/// Named attribute argument that overrides the positional interface type.
const INTERFACE_ARGUMENT: &str = "InterfaceType";

pub struct FactoryRegistrationRule;

impl FactoryRegistrationRule {
    pub fn new() -> Self {
        Self
    }

    fn check_class(&self, ctx: &RuleContext<'_>, class: NodeId) -> Vec<Diagnostic> {
        let tree = ctx.tree;
        if ctx.is_suppressed(RuleCode::DSP007, class) {
            return Vec::new();
        }
        let Some(own) = ctx.model.declared_type(tree, class).map(TypeHandle::Named) else {
            return Vec::new();
        };
        if !ctx.oracle.is_disposable(&own) {
            return Vec::new();
        }
        tree.attributes(class)
            .filter(|&attr| {
                let name = syntax::attribute_name(tree, attr);
                ctx.settings.factory_attributes.iter().any(|a| a == name)
            })
            .filter_map(|attr| {
                let registered = self.registered_type(ctx, attr)?;
                if ctx.oracle.is_disposable(&registered) || ctx.oracle.is_type_whitelisted(&registered) {
                    return None;
                }
                Some(ctx.diagnostic(
                    RuleCode::DSP007,
                    attr,
                    format!(
                        "Class '{}' is registered as '{}', which does not implement IDisposable",
                        own.display(),
                        registered.display()
                    ),
                ))
            })
            .collect()
    }

    /// Type named by `typeof(...)` in the `InterfaceType =` argument, or in
    /// the first positional argument.
    fn registered_type(&self, ctx: &RuleContext<'_>, attribute: NodeId) -> Option<TypeHandle> {
        let tree = ctx.tree;
        let arguments = syntax::attribute_arguments(tree, attribute);
        let value = arguments
            .iter()
            .find(|(label, _)| *label == Some(INTERFACE_ARGUMENT))
            .or_else(|| arguments.iter().find(|(label, _)| label.is_none()))
            .map(|(_, value)| *value)?;
        if tree.kind(value) != NodeKind::TypeofExpression {
            return None;
        }
        let inner = tree.first_syntax_child(value)?;
        ctx.model.resolve_type(tree, inner)
    }
}

impl Default for FactoryRegistrationRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for FactoryRegistrationRule {
    fn code(&self) -> RuleCode {
        RuleCode::DSP007
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        ctx.tree
            .nodes_of_kind(NodeKind::ClassDeclaration)
            .flat_map(|class| self.check_class(ctx, class))
            .collect()
    }
}
