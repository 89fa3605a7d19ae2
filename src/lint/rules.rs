//! Lint rule definitions and diagnostic types.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::disposable::RuleContext;
use crate::source::Span;

/// Rule codes for disposal analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RuleCode {
    /// DSP001: Class owns a disposable field or property but is not disposable.
    DSP001,
    /// DSP002: Constructor receives a disposable parameter it never captures or disposes.
    DSP002,
    /// DSP003: Disposable field or property overwritten or never disposed.
    DSP003,
    /// DSP004: Disposable local variable not disposed before it goes out of scope.
    DSP004,
    /// DSP005: Disposable result of a method call discarded.
    DSP005,
    /// DSP006: Disposable object created and never captured.
    DSP006,
    /// DSP007: Disposable class registered under a non-disposable interface.
    DSP007,
}

impl RuleCode {
    /// Parse a rule code from string (e.g., "DSP001").
    pub fn parse_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DSP001" => Some(RuleCode::DSP001),
            "DSP002" => Some(RuleCode::DSP002),
            "DSP003" => Some(RuleCode::DSP003),
            "DSP004" => Some(RuleCode::DSP004),
            "DSP005" => Some(RuleCode::DSP005),
            "DSP006" => Some(RuleCode::DSP006),
            "DSP007" => Some(RuleCode::DSP007),
            _ => None,
        }
    }

    /// All available rule codes.
    pub fn all() -> &'static [RuleCode] {
        &[
            RuleCode::DSP001,
            RuleCode::DSP002,
            RuleCode::DSP003,
            RuleCode::DSP004,
            RuleCode::DSP005,
            RuleCode::DSP006,
            RuleCode::DSP007,
        ]
    }

    /// Short name for the rule.
    pub fn name(&self) -> &'static str {
        match self {
            RuleCode::DSP001 => "undisposable-owner",
            RuleCode::DSP002 => "constructor-parameter",
            RuleCode::DSP003 => "field-property",
            RuleCode::DSP004 => "local-variable",
            RuleCode::DSP005 => "method-invocation",
            RuleCode::DSP006 => "object-creation",
            RuleCode::DSP007 => "factory-registration",
        }
    }

    /// Detailed description of what the rule checks.
    pub fn description(&self) -> &'static str {
        match self {
            RuleCode::DSP001 => {
                "Flags classes that hold a disposable field or property they create themselves \
                 but do not implement IDisposable. Members assigned only from constructor \
                 parameters are owned by the caller and do not count."
            }
            RuleCode::DSP002 => {
                "Flags disposable constructor parameters that are neither stored nor disposed. \
                 Private and internal constructors reached through this(...) chains are checked \
                 from the public constructor that delegates to them."
            }
            RuleCode::DSP003 => {
                "Flags assignments to disposable fields and properties that overwrite a value \
                 which was never disposed, and disposable collections whose items are never \
                 disposed with DisposeItems or a RemoveAndDispose helper."
            }
            RuleCode::DSP004 => {
                "Flags disposable local variables that are assigned and then overwritten or \
                 abandoned without Dispose, Close, a using block or hand-off to a collection."
            }
            RuleCode::DSP005 => {
                "Flags method calls whose disposable return value is discarded, and \
                 Remove/RemoveAt/RemoveAll/RemoveRange calls that drop disposable items \
                 from a list or dictionary."
            }
            RuleCode::DSP006 => {
                "Flags object creations of disposable types whose result is neither stored, \
                 returned, wrapped in using, nor handed to a collection."
            }
            RuleCode::DSP007 => {
                "Flags disposable classes registered with a factory under an interface that \
                 does not extend IDisposable. Callers resolving the interface can never \
                 dispose the instance."
            }
        }
    }

    /// Return the string representation (e.g., `"DSP001"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCode::DSP001 => "DSP001",
            RuleCode::DSP002 => "DSP002",
            RuleCode::DSP003 => "DSP003",
            RuleCode::DSP004 => "DSP004",
            RuleCode::DSP005 => "DSP005",
            RuleCode::DSP006 => "DSP006",
            RuleCode::DSP007 => "DSP007",
        }
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl DiagnosticSeverity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" => Some(Self::Info),
            "hint" => Some(Self::Hint),
            _ => None,
        }
    }

    /// Higher is more severe.
    pub fn rank(self) -> u8 {
        match self {
            Self::Error => 3,
            Self::Warning => 2,
            Self::Info => 1,
            Self::Hint => 0,
        }
    }

    /// Whether a diagnostic at this severity passes a `minimum` filter.
    pub fn at_least(self, minimum: Self) -> bool {
        self.rank() >= minimum.rank()
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
            DiagnosticSeverity::Hint => write!(f, "hint"),
        }
    }
}

/// A text range in a file (1-indexed lines and columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Range {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a range for a single point.
    pub fn point(line: usize, col: usize) -> Self {
        Self::new(line, col, line, col)
    }
}

impl From<Span> for Range {
    fn from(span: Span) -> Self {
        Self::new(span.start_line, span.start_col, span.end_line, span.end_col)
    }
}

/// A lint diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The rule that produced this diagnostic.
    pub rule: RuleCode,
    /// Severity level.
    pub severity: DiagnosticSeverity,
    /// File path.
    pub file: PathBuf,
    /// Location in the file.
    pub range: Range,
    /// Human-readable message.
    pub message: String,
}

/// A lint rule.
///
/// Rules are pure: they read the file's syntax tree and the shared semantic
/// model through the context and return their diagnostics.
pub trait Rule: Send + Sync {
    /// The rule code.
    fn code(&self) -> RuleCode;

    /// Check one file and return diagnostics.
    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic>;
}

/// Print all available rules in a formatted table.
pub fn print_rules() {
    println!("Available dispose-lint rules:\n");
    println!("{:<8} {:<24} Description", "Code", "Name");
    println!("{}", "-".repeat(80));

    for code in RuleCode::all() {
        // Table shows the first sentence only
        let desc = code.description();
        let short_desc = desc.split(". ").next().unwrap_or(desc).trim_end_matches('.');
        println!("{:<8} {:<24} {}", code, code.name(), short_desc);
    }

    println!("\nUse --select to enable specific rules (e.g., --select DSP001,DSP004)");
    println!("Use --exclude to disable specific rules (e.g., --exclude DSP005)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_is_case_insensitive() {
        assert_eq!(RuleCode::parse_code("dsp004"), Some(RuleCode::DSP004));
        assert_eq!(RuleCode::parse_code(" DSP007 "), Some(RuleCode::DSP007));
        assert_eq!(RuleCode::parse_code("DSP999"), None);
        assert_eq!(RuleCode::parse_code("CA2000"), None);
    }

    #[test]
    fn test_all_codes_round_trip_through_display() {
        for code in RuleCode::all() {
            assert_eq!(RuleCode::parse_code(&code.to_string()), Some(*code));
            assert!(!code.name().is_empty());
            assert!(!code.description().is_empty());
        }
        assert_eq!(RuleCode::all().len(), 7);
    }

    #[test]
    fn test_severity_parse_and_display() {
        assert_eq!(DiagnosticSeverity::parse("Warning"), Some(DiagnosticSeverity::Warning));
        assert_eq!(DiagnosticSeverity::parse("warn"), Some(DiagnosticSeverity::Warning));
        assert_eq!(DiagnosticSeverity::parse("fatal"), None);
        assert_eq!(DiagnosticSeverity::Error.to_string(), "error");
    }

    #[test]
    fn test_severity_threshold() {
        assert!(DiagnosticSeverity::Error.at_least(DiagnosticSeverity::Warning));
        assert!(DiagnosticSeverity::Warning.at_least(DiagnosticSeverity::Warning));
        assert!(!DiagnosticSeverity::Info.at_least(DiagnosticSeverity::Warning));
    }

    #[test]
    fn test_range_from_span() {
        let range = Range::from(Span::new(3, 5, 3, 14));
        assert_eq!(range, Range::new(3, 5, 3, 14));
        assert_eq!(Range::point(2, 1).end_col, 1);
    }
}
