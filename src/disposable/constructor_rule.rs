//! DSP002: constructor receives a disposable it never captures or disposes.
//!
//! Non-public constructors are checked directly unless another constructor
//! delegates to them with `this(...)`. Public and protected constructors
//! that delegate are checked through the target: arguments that are not
//! the delegating constructor's own parameters are created there, so the
//! target must take ownership of them.

use rustc_hash::FxHashSet;

use crate::lint::{Diagnostic, Rule, RuleCode};
use crate::source::syntax::{self, DISPOSE_METHODS};
use crate::source::{NodeId, NodeKind, Span, SyntaxTree, TypeHandle};

use super::context::RuleContext;
use super::members::constructors;

/// Per-constructor facts gathered once per class.
#[derive(Debug, Clone)]
struct ConstructorData {
    node: NodeId,
    is_protected_or_public: bool,
    params: Vec<NodeId>,
    /// Parameter types; `None` where the type did not resolve.
    param_types: Vec<Option<TypeHandle>>,
    /// Argument expressions and types of a `this(...)` initializer.
    initializer_args: Option<Vec<(NodeId, Option<TypeHandle>)>>,
}

impl ConstructorData {
    fn initializer_types(&self) -> Option<Vec<Option<TypeHandle>>> {
        self.initializer_args
            .as_ref()
            .map(|args| args.iter().map(|(_, t)| t.clone()).collect())
    }
}

/// Signatures match position by position. An unresolved type on either side
/// matches anything, so partially typed code still pairs constructors.
fn signatures_match(a: &[Option<TypeHandle>], b: &[Option<TypeHandle>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => x.qualified_display() == y.qualified_display(),
            _ => true,
        })
}

pub struct ConstructorRule;

impl ConstructorRule {
    pub fn new() -> Self {
        Self
    }

    fn gather(&self, ctx: &RuleContext<'_>, class: NodeId) -> Vec<ConstructorData> {
        let tree = ctx.tree;
        constructors(tree, class)
            .into_iter()
            .filter(|&ctor| !tree.has_modifier(ctor, "static"))
            .map(|ctor| {
                let params = syntax::parameters(tree, ctor);
                let param_types = params.iter().map(|&p| ctx.model.parameter_type(tree, p)).collect();
                let initializer_args = syntax::this_initializer(tree, ctor).map(|init| {
                    syntax::argument_list(tree, init)
                        .map(|list| {
                            syntax::argument_expressions(tree, list)
                                .into_iter()
                                .map(|arg| (arg, ctx.model.type_of(tree, arg)))
                                .collect()
                        })
                        .unwrap_or_default()
                });
                ConstructorData {
                    node: ctor,
                    is_protected_or_public: tree.has_modifier(ctor, "public")
                        || tree.has_modifier(ctor, "protected"),
                    params,
                    param_types,
                    initializer_args,
                }
            })
            .collect()
    }

    fn is_disposable(&self, ctx: &RuleContext<'_>, t: &Option<TypeHandle>) -> bool {
        t.as_ref().is_some_and(|t| ctx.oracle.is_disposable(t))
    }

    /// Non-public constructors that nothing delegates to.
    fn private_pass(&self, ctx: &RuleContext<'_>, data: &[ConstructorData]) -> Vec<(NodeId, String)> {
        let tree = ctx.tree;
        let mut found = Vec::new();
        for ctor in data.iter().filter(|c| !c.is_protected_or_public) {
            if !ctor.param_types.iter().any(|t| self.is_disposable(ctx, t)) {
                continue;
            }
            let is_delegation_target = data.iter().any(|other| {
                other.node != ctor.node
                    && other
                        .initializer_types()
                        .is_some_and(|sig| signatures_match(&sig, &ctor.param_types))
            });
            if is_delegation_target {
                continue;
            }
            for (&param, ty) in ctor.params.iter().zip(&ctor.param_types) {
                if self.is_disposable(ctx, ty) && !is_parameter_utilized(tree, ctor.node, param) {
                    found.push((param, parameter_message(tree, param, ctor.node)));
                }
            }
        }
        found
    }

    /// Public and protected constructors that create disposables and hand
    /// them to another constructor.
    fn public_pass(&self, ctx: &RuleContext<'_>, data: &[ConstructorData]) -> Vec<(NodeId, String)> {
        let tree = ctx.tree;
        let mut found = Vec::new();
        for ctor in data.iter().filter(|c| c.is_protected_or_public) {
            let Some(args) = &ctor.initializer_args else {
                continue;
            };
            let own_params: Vec<&str> = ctor.params.iter().filter_map(|&p| tree.name_of(p)).collect();
            let created: Vec<usize> = args
                .iter()
                .enumerate()
                .filter(|(_, (_, ty))| self.is_disposable(ctx, ty))
                .filter(|(_, (arg, _))| {
                    let arg = tree.unparenthesize(*arg);
                    !(tree.kind(arg) == NodeKind::Identifier && own_params.contains(&tree.text(arg)))
                })
                .map(|(i, _)| i)
                .collect();
            if created.is_empty() {
                continue;
            }
            let Some(sig) = ctor.initializer_types() else {
                continue;
            };
            let Some(target) = data
                .iter()
                .find(|other| other.node != ctor.node && signatures_match(&sig, &other.param_types))
            else {
                continue;
            };
            for i in created {
                if let Some(&param) = target.params.get(i) {
                    if !is_parameter_utilized(tree, target.node, param) {
                        found.push((param, parameter_message(tree, param, target.node)));
                    }
                }
            }
        }
        found
    }
}

fn parameter_message(tree: &SyntaxTree, param: NodeId, ctor: NodeId) -> String {
    format!(
        "Disposable parameter '{}' of constructor '{}' is neither stored nor disposed",
        tree.name_of(param).unwrap_or("?"),
        tree.name_of(ctor).unwrap_or("?")
    )
}

/// Whether the constructor body stores or disposes the parameter: it appears
/// inside the right side of an assignment, inside a variable initializer, or
/// as the receiver of `Dispose()`/`Close()`.
pub fn is_parameter_utilized(tree: &SyntaxTree, ctor: NodeId, param: NodeId) -> bool {
    let Some(name) = tree.name_of(param) else {
        return false;
    };
    let Some(body) = syntax::body(tree, ctor) else {
        return false;
    };
    let mentions = |expr: NodeId| {
        tree.subtree(expr)
            .any(|n| tree.kind(n) == NodeKind::Identifier && tree.text(n) == name)
    };
    tree.subtree(body).any(|node| match tree.kind(node) {
        NodeKind::AssignmentExpression => {
            syntax::assignment_parts(tree, node).is_some_and(|(_, _, right)| mentions(right))
        }
        NodeKind::VariableDeclarator => syntax::declarator_value(tree, node).is_some_and(mentions),
        NodeKind::InvocationExpression => syntax::invoked_member(tree, node)
            .or_else(|| syntax::conditional_invocation(tree, node))
            .is_some_and(|(receiver, method)| {
                DISPOSE_METHODS.contains(&method) && tree.text(tree.unparenthesize(receiver)) == name
            }),
        NodeKind::ConditionalAccessExpression => syntax::conditional_invocation(tree, node)
            .is_some_and(|(receiver, method)| {
                DISPOSE_METHODS.contains(&method) && tree.text(tree.unparenthesize(receiver)) == name
            }),
        _ => false,
    })
}

impl Default for ConstructorRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ConstructorRule {
    fn code(&self) -> RuleCode {
        RuleCode::DSP002
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let tree = ctx.tree;
        let mut diagnostics = Vec::new();
        for class in tree
            .nodes_of_kind(NodeKind::ClassDeclaration)
            .chain(tree.nodes_of_kind(NodeKind::StructDeclaration))
        {
            let data = self.gather(ctx, class);
            if data.is_empty() {
                continue;
            }
            let mut seen: FxHashSet<Span> = FxHashSet::default();
            let found = self
                .private_pass(ctx, &data)
                .into_iter()
                .chain(self.public_pass(ctx, &data));
            for (param, message) in found {
                if ctx.is_suppressed(RuleCode::DSP002, param) || !seen.insert(tree.span(param)) {
                    continue;
                }
                diagnostics.push(ctx.diagnostic(RuleCode::DSP002, param, message));
            }
        }
        diagnostics
    }
}
