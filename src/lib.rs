//! IDisposable ownership analysis for C#.
//!
//! Parses C# sources with tree-sitter, builds a project-wide semantic model
//! and runs seven rules that find disposable objects nobody disposes.

pub mod cli;
pub mod disposable;
pub mod error;
pub mod lint;
pub mod lint_config;
pub mod source;

pub use cli::{validate_cli_semantics, Cli, Commands};
pub use error::{exit_code, LintError, Result};
pub use lint::{Diagnostic, DiagnosticSeverity, LintConfig, LintEngine, OutputFormat, RuleCode};
pub use lint_config::{
    discover_and_load_config, discover_config, ConfigError, FileMatcher, LintFileConfig, CONFIG_FILE_NAME,
};
