//! Fixtures for rule unit tests.

use std::path::Path;

use crate::lint::{Diagnostic, Rule};
use crate::source::{parse_csharp, SemanticModel};

use super::context::{AnalysisSettings, RuleContext};
use super::oracle::DisposableOracle;
use super::whitelist::Whitelist;

/// Run one rule over a single C# snippet with default settings.
pub fn check_rule(rule: &dyn Rule, src: &str) -> Vec<Diagnostic> {
    check_rule_with(rule, src, &Whitelist::default(), &AnalysisSettings::default())
}

pub fn check_rule_with(
    rule: &dyn Rule,
    src: &str,
    whitelist: &Whitelist,
    settings: &AnalysisSettings,
) -> Vec<Diagnostic> {
    let tree = parse_csharp(Path::new("Test.cs"), src).expect("parse");
    let model = SemanticModel::build(std::slice::from_ref(&tree), &[]);
    let oracle = DisposableOracle::new(&model, whitelist);
    let ctx = RuleContext::new(&tree, &oracle, settings);
    let mut diags = rule.check(&ctx);
    diags.sort_by_key(|d| (d.range.start_line, d.range.start_col));
    diags
}
