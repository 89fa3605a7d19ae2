//! Rule suppression: comment directives and `SuppressMessage` attributes.
//!
//! ```csharp
//! // dispose-lint:ignore DSP004, DSP006
//! var cache = new MemoryCache("shared");
//!
//! [SuppressMessage("IDisposable", "DSP001:Owner")]
//! class Holder { ... }
//! ```
//!
//! A directive applies to nodes that start on the directive's line or on the
//! line below it, and to everything inside those nodes. A bare
//! `// dispose-lint:ignore` suppresses every rule.

use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::rules::RuleCode;
use crate::source::syntax::{attribute_arguments, attribute_name, string_literal_value};
use crate::source::{NodeId, SyntaxTree};

lazy_static! {
    static ref DIRECTIVE_RE: Regex =
        Regex::new(r"dispose-lint:ignore\b([A-Za-z0-9_,\s]*)").unwrap_or_else(|e| panic!("regex: {e}"));
}

/// Rules named by a directive on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    All,
    Rules(FxHashSet<RuleCode>),
}

impl Directive {
    fn covers(&self, code: RuleCode) -> bool {
        match self {
            Directive::All => true,
            Directive::Rules(codes) => codes.contains(&code),
        }
    }
}

/// Suppression index of one file.
#[derive(Debug, Default)]
pub struct Suppressions {
    by_line: FxHashMap<usize, Directive>,
}

impl Suppressions {
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let mut by_line = FxHashMap::default();
        for comment in tree.comments() {
            if let Some(directive) = parse_directive(&comment.text) {
                by_line.insert(comment.end_line, directive);
            }
        }
        Self { by_line }
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }

    /// Whether `code` is suppressed at `node`.
    pub fn is_suppressed(&self, tree: &SyntaxTree, code: RuleCode, node: NodeId) -> bool {
        std::iter::once(node)
            .chain(tree.ancestors(node))
            .any(|n| self.directive_covers(tree, code, n) || has_suppress_attribute(tree, code, n))
    }

    fn directive_covers(&self, tree: &SyntaxTree, code: RuleCode, node: NodeId) -> bool {
        if self.by_line.is_empty() {
            return false;
        }
        let line = tree.span(node).start_line;
        [Some(line), line.checked_sub(1)]
            .into_iter()
            .flatten()
            .filter_map(|l| self.by_line.get(&l))
            .any(|d| d.covers(code))
    }
}

fn parse_directive(comment: &str) -> Option<Directive> {
    let caps = DIRECTIVE_RE.captures(comment)?;
    let args = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
    if args.is_empty() {
        return Some(Directive::All);
    }
    let codes: FxHashSet<RuleCode> = args
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(RuleCode::parse_code)
        .collect();
    if codes.is_empty() {
        // Only unknown codes: suppress nothing rather than everything.
        return None;
    }
    Some(Directive::Rules(codes))
}

/// `[SuppressMessage("category", "DSP003...")]` on a declaration.
fn has_suppress_attribute(tree: &SyntaxTree, code: RuleCode, node: NodeId) -> bool {
    tree.attributes(node)
        .filter(|&attr| attribute_name(tree, attr) == "SuppressMessage")
        .flat_map(|attr| attribute_arguments(tree, attr))
        .filter(|(label, _)| label.is_none() || *label == Some("checkId"))
        .filter_map(|(_, value)| string_literal_value(tree, value))
        .any(|id| id.trim().to_uppercase().starts_with(code.as_str()))
}
