//! Lint engine that collects C# files, builds the project-wide semantic
//! model and runs the disposal rules.
//!
//! Performance notes:
//! - **Parallel file collection**: directory walks run in a rayon scope.
//! - **Parallel parsing**: every file is read and parsed exactly once.
//! - **Shared model**: one `SemanticModel` is built over all files, so a type
//!   declared in one file resolves in every other.
//! - **Parallel rules**: files are checked concurrently; rules are stateless.
//! - **Early termination**: `--max-diagnostics` stops collecting once the
//!   limit is reached.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use super::output::{print_diagnostics, print_summary, LintSummary, OutputFormat};
use super::rules::{Diagnostic, DiagnosticSeverity, Rule, RuleCode};
use crate::disposable::{self, AnalysisSettings, DisposableOracle, RuleContext, Whitelist};
use crate::error::{exit_code, LintError};
use crate::lint_config::FileMatcher;
use crate::source::{parse_csharp, SemanticModel, SyntaxTree, TypeName};

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["bin", "obj", "node_modules", "target"];

/// Configuration for the lint engine.
#[derive(Debug, Clone, Default)]
pub struct LintConfig {
    /// Rules to enable (if None, all rules are enabled).
    pub select: Option<HashSet<RuleCode>>,
    /// Rules to skip; wins over `select`.
    pub ignore: HashSet<RuleCode>,
    /// Per-rule severity replacing the default `error`.
    pub severity_overrides: HashMap<RuleCode, DiagnosticSeverity>,
    /// Drop diagnostics below this severity.
    pub min_severity: Option<DiagnosticSeverity>,
    /// `None` means unlimited.
    pub max_diagnostics: Option<usize>,
    pub whitelist: Whitelist,
    pub analysis: AnalysisSettings,
    /// Disposable types from referenced assemblies.
    pub disposable_types: Vec<TypeName>,
    pub file_matcher: FileMatcher,
}

impl LintConfig {
    /// Create a configuration from comma-separated `--select` and
    /// `--exclude` lists.
    ///
    /// Unknown codes are reported on stderr and skipped. If `select` yields
    /// no valid code, `has_empty_selection()` returns true.
    pub fn new(select: Option<String>, ignore: Option<String>) -> Self {
        let select_set = select.map(|s| parse_code_list(&s, "--select"));
        if select_set.as_ref().is_some_and(HashSet::is_empty) {
            eprintln!("Warning: No valid rules selected, nothing will be checked");
        }
        Self {
            select: select_set,
            ignore: ignore.map(|s| parse_code_list(&s, "--exclude")).unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn with_max_diagnostics(mut self, max: Option<usize>) -> Self {
        self.max_diagnostics = max;
        self
    }

    pub fn with_min_severity(mut self, min: Option<DiagnosticSeverity>) -> Self {
        self.min_severity = min;
        self
    }

    pub fn with_severity_overrides(
        mut self,
        overrides: impl IntoIterator<Item = (RuleCode, DiagnosticSeverity)>,
    ) -> Self {
        self.severity_overrides.extend(overrides);
        self
    }

    pub fn with_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn with_analysis(mut self, analysis: AnalysisSettings, disposable_types: Vec<TypeName>) -> Self {
        self.analysis = analysis;
        self.disposable_types = disposable_types;
        self
    }

    pub fn with_file_matcher(mut self, matcher: FileMatcher) -> Self {
        self.file_matcher = matcher;
        self
    }

    /// `--select` was given but named no valid rule.
    pub fn has_empty_selection(&self) -> bool {
        matches!(&self.select, Some(set) if set.is_empty())
    }

    pub fn is_rule_enabled(&self, rule: RuleCode) -> bool {
        if self.ignore.contains(&rule) {
            return false;
        }
        match &self.select {
            Some(selected) => selected.contains(&rule),
            None => true,
        }
    }

    fn severity_for(&self, rule: RuleCode) -> DiagnosticSeverity {
        self.severity_overrides
            .get(&rule)
            .copied()
            .unwrap_or(DiagnosticSeverity::Error)
    }
}

fn parse_code_list(list: &str, flag: &str) -> HashSet<RuleCode> {
    let mut valid = HashSet::new();
    for raw in list.split(',') {
        let code = raw.trim();
        if code.is_empty() {
            continue;
        }
        match RuleCode::parse_code(code) {
            Some(rc) => {
                valid.insert(rc);
            }
            None => eprintln!("Warning: Unknown rule code '{}' in {} (ignored)", code, flag),
        }
    }
    valid
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct LintEngine {
    config: LintConfig,
    rules: Vec<Box<dyn Rule>>,
}

impl LintEngine {
    pub fn new(config: LintConfig) -> Self {
        let rules = RuleCode::all()
            .iter()
            .filter(|&&code| config.is_rule_enabled(code))
            .map(|&code| disposable::rule_for(code))
            .collect();
        Self { config, rules }
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Check files and print results. Returns the process exit code.
    pub fn check(&self, paths: &[PathBuf], format: OutputFormat) -> i32 {
        if self.config.has_empty_selection() {
            return exit_code::CONFIG_ERROR;
        }

        info!("Checking {} path(s)", paths.len());
        let files = self.collect_files(paths);
        info!("Found {} C# file(s)", files.len());

        let sources = read_files_parallel(&files);
        let trees = parse_sources(&sources);
        drop(sources);
        debug!("Parsed {} file(s)", trees.len());
        if trees.is_empty() && !files.is_empty() {
            error!("None of the {} C# file(s) could be read and parsed", files.len());
            return exit_code::IO_ERROR;
        }

        let diagnostics = self.analyze(&trees);

        let files_with_issues: HashSet<&PathBuf> = diagnostics.iter().map(|d| &d.file).collect();
        let mut summary = LintSummary {
            files_checked: trees.len(),
            files_with_issues: files_with_issues.len(),
            ..LintSummary::default()
        };
        for diag in &diagnostics {
            summary.add_diagnostic(diag);
        }

        if let Err(e) = print_diagnostics(&diagnostics, format) {
            eprintln!("Error printing diagnostics: {}", e);
        }
        if let Err(e) = print_summary(&summary, format) {
            eprintln!("Error printing summary: {}", e);
        }

        if diagnostics.is_empty() {
            exit_code::CLEAN
        } else {
            exit_code::LINT_ISSUES
        }
    }

    /// Analyse in-memory sources as one project.
    pub fn check_sources(&self, sources: &[(PathBuf, String)]) -> Vec<Diagnostic> {
        self.analyze(&parse_sources(sources))
    }

    /// Analyse a single in-memory file.
    pub fn check_content(&self, file: &Path, content: &str) -> Vec<Diagnostic> {
        self.check_sources(&[(file.to_path_buf(), content.to_string())])
    }

    /// Run every enabled rule over `trees` against one shared model.
    /// Results are sorted by file, line and column.
    pub fn analyze(&self, trees: &[SyntaxTree]) -> Vec<Diagnostic> {
        if self.rules.is_empty() || trees.is_empty() {
            return Vec::new();
        }
        let model = SemanticModel::build(trees, &self.config.disposable_types);
        let oracle = DisposableOracle::new(&model, &self.config.whitelist);

        let max_diags = self.config.max_diagnostics.unwrap_or(usize::MAX);
        let diag_count = AtomicUsize::new(0);
        let limit_reached = AtomicBool::new(false);

        let mut all_diagnostics: Vec<Diagnostic> = trees
            .par_iter()
            .flat_map_iter(|tree| {
                if limit_reached.load(Ordering::Relaxed) {
                    return Vec::new();
                }
                let ctx = RuleContext::new(tree, &oracle, &self.config.analysis);
                let mut diags = Vec::new();
                for rule in &self.rules {
                    if limit_reached.load(Ordering::Relaxed) {
                        break;
                    }
                    diags.extend(rule.check(&ctx).into_iter().filter_map(|mut d| {
                        d.severity = self.config.severity_for(d.rule);
                        match self.config.min_severity {
                            Some(min) if !d.severity.at_least(min) => None,
                            _ => Some(d),
                        }
                    }));
                }
                if !diags.is_empty() {
                    let prev = diag_count.fetch_add(diags.len(), Ordering::Relaxed);
                    if prev + diags.len() >= max_diags {
                        limit_reached.store(true, Ordering::Relaxed);
                        diags.truncate(max_diags.saturating_sub(prev));
                    }
                }
                diags
            })
            .collect();

        // Parallel collection is unordered.
        all_diagnostics.sort_unstable_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.range.start_line.cmp(&b.range.start_line))
                .then_with(|| a.range.start_col.cmp(&b.range.start_col))
                .then_with(|| a.rule.cmp(&b.rule))
        });
        all_diagnostics
    }

    /// Collect C# files under `paths`, walking directories in parallel.
    fn collect_files(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let files = Mutex::new(Vec::new());

        rayon::scope(|s| {
            for path in paths {
                let files = &files;
                s.spawn(move |s| {
                    if !path.exists() {
                        warn!("Path does not exist: {}", path.display());
                        return;
                    }
                    if path.is_file() {
                        if is_csharp_file(path) {
                            if let Ok(mut guard) = files.lock() {
                                guard.push(path.clone());
                            }
                        }
                    } else if path.is_dir() {
                        collect_dir_recursive(s, path, files);
                    }
                });
            }
        });

        let mut result = files.into_inner().unwrap_or_else(|e| e.into_inner());
        result.retain(|p| {
            let relative = p.strip_prefix(".").unwrap_or(p.as_path());
            self.config.file_matcher.is_included(relative)
        });
        result.sort();
        result
    }
}

/// Read files in parallel. Unreadable and non-UTF-8 files are skipped.
fn read_files_parallel(files: &[PathBuf]) -> Vec<(PathBuf, String)> {
    files
        .par_iter()
        .filter_map(|file| match read_source(file) {
            Ok(content) => Some((file.clone(), content)),
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .collect()
}

fn read_source(path: &Path) -> Result<String, LintError> {
    let bytes = fs::read(path).map_err(|source| LintError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    // Visual Studio writes a BOM by default.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes[..]);
    String::from_utf8(bytes.to_vec()).map_err(|_| LintError::Encoding {
        path: path.to_path_buf(),
    })
}

fn parse_sources(sources: &[(PathBuf, String)]) -> Vec<SyntaxTree> {
    sources
        .par_iter()
        .filter_map(|(path, content)| match parse_csharp(path, content) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .collect()
}

fn collect_dir_recursive<'s>(scope: &rayon::Scope<'s>, dir: &Path, files: &'s Mutex<Vec<PathBuf>>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read directory {}: {}", dir.display(), e);
            return;
        }
    };

    // Batch to reduce mutex contention.
    let mut batch = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && is_csharp_file(&path) {
            batch.push(path);
        } else if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !name.starts_with('.') && !SKIPPED_DIRS.contains(&name) {
                scope.spawn(move |s| collect_dir_recursive(s, &path, files));
            }
        }
    }

    if !batch.is_empty() {
        if let Ok(mut guard) = files.lock() {
            guard.extend(batch);
        }
    }
}

fn is_csharp_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("cs")
}

// =========================================================================
// Tests
// =========================================================================
