//! DSP006: `new T(...)` of a disposable type whose instance nobody owns.

use crate::lint::{Diagnostic, Rule, RuleCode};
use crate::source::{NodeId, NodeKind};

use super::context::RuleContext;
use super::sink::{is_collection_add, is_disposable_wrapper, value_sink, Sink};

pub struct ObjectCreationRule;

impl ObjectCreationRule {
    pub fn new() -> Self {
        Self
    }

    fn check_creation(&self, ctx: &RuleContext<'_>, creation: NodeId) -> Option<Diagnostic> {
        let tree = ctx.tree;
        let created = ctx.oracle.node_type(tree, creation)?;
        if !ctx.oracle.is_disposable(&created) || ctx.is_suppressed(RuleCode::DSP006, creation) {
            return None;
        }
        let owned = match value_sink(tree, creation) {
            Sink::Using | Sink::Stored | Sink::Element | Sink::Disposed | Sink::LambdaBody => true,
            Sink::Returned(member) => ctx
                .model
                .member_value_type(tree, member)
                .is_some_and(|t| ctx.oracle.owns_disposables(&t)),
            Sink::Argument(call) => {
                tree.kind(call) == NodeKind::ConstructorInitializer
                    || is_collection_add(ctx, call)
                    || is_disposable_wrapper(ctx, call)
            }
            Sink::Other => false,
        };
        if owned {
            return None;
        }
        Some(ctx.diagnostic(
            RuleCode::DSP006,
            creation,
            format!(
                "Disposable object of type '{}' is created but never disposed",
                created.display()
            ),
        ))
    }
}

impl Default for ObjectCreationRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ObjectCreationRule {
    fn code(&self) -> RuleCode {
        RuleCode::DSP006
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let tree = ctx.tree;
        tree.nodes_of_kind(NodeKind::ObjectCreationExpression)
            .chain(tree.nodes_of_kind(NodeKind::ImplicitObjectCreationExpression))
            .filter_map(|creation| self.check_creation(ctx, creation))
            .collect()
    }
}
