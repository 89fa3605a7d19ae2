//! Lint driver: rule codes, diagnostics, suppression, the engine and output.

mod engine;
mod output;
mod rules;
mod suppression;

pub use engine::{LintConfig, LintEngine};
pub use output::{
    color_config, init_color, print_diagnostics, print_summary, write_diagnostics, ColorConfig,
    ColorMode, LintSummary, OutputFormat,
};
pub use rules::{print_rules, Diagnostic, DiagnosticSeverity, Range, Rule, RuleCode};
pub use suppression::Suppressions;
