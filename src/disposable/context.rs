//! Per-file context handed to every rule.

use crate::lint::{Diagnostic, DiagnosticSeverity, RuleCode, Suppressions};
use crate::source::{NodeId, SemanticModel, SyntaxTree};

use super::oracle::DisposableOracle;

pub const DEFAULT_FACTORY_ATTRIBUTES: &[&str] = &["FactoryRegistration"];

/// Analysis options that are not whitelist data.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Attribute names (without `Attribute` suffix) that register a class
    /// with a factory under an interface.
    pub factory_attributes: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            factory_attributes: DEFAULT_FACTORY_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub struct RuleContext<'a> {
    pub tree: &'a SyntaxTree,
    pub model: &'a SemanticModel,
    pub oracle: &'a DisposableOracle<'a>,
    pub settings: &'a AnalysisSettings,
    suppressions: Suppressions,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        tree: &'a SyntaxTree,
        oracle: &'a DisposableOracle<'a>,
        settings: &'a AnalysisSettings,
    ) -> Self {
        Self {
            tree,
            model: oracle.model(),
            oracle,
            settings,
            suppressions: Suppressions::from_tree(tree),
        }
    }

    pub fn is_suppressed(&self, code: RuleCode, node: NodeId) -> bool {
        self.suppressions.is_suppressed(self.tree, code, node)
    }

    /// Error diagnostic anchored at `node`. Severity overrides are applied
    /// by the engine.
    pub fn diagnostic(&self, rule: RuleCode, node: NodeId, message: String) -> Diagnostic {
        Diagnostic {
            rule,
            severity: DiagnosticSeverity::Error,
            file: self.tree.path().to_path_buf(),
            range: self.tree.span(node).into(),
            message,
        }
    }
}
