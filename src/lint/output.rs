//! Output formatting for disposal diagnostics.
//!
//! - **Text**: human-readable, colour aware, with why/fix hints
//! - **Concise**: one line per diagnostic
//! - **JSON**: diagnostics plus summary
//! - **GitHub**: `::error` / `::warning` workflow annotations
//! - **SARIF 2.1.0**: for code-scanning uploads
//!
//! Colour honours `--color`, `NO_COLOR`, `FORCE_COLOR` and TTY detection.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::rules::{Diagnostic, DiagnosticSeverity, RuleCode};

// ============================================================================
// TERMINAL WIDTH
// ============================================================================

/// `COLUMNS`, or 80.
fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|cols| cols.parse::<usize>().ok())
        .filter(|&w| w > 0)
        .unwrap_or(80)
}

/// Wrap `text` at whitespace to `width` columns; continuation lines start
/// with `indent`. Words longer than a line are hard-broken.
fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    if text.len() <= width || width <= indent.len() {
        return text.to_string();
    }
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let limit = if lines.is_empty() { width } else { width - indent.len() };
        if !current.is_empty() && current.len() + 1 + word.len() > limit {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join(&format!("\n{}", indent))
}

// ============================================================================
// COLOR CONFIGURATION
// ============================================================================

/// When to emit ANSI colour codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ColorMode {
    /// Colour when stdout is a terminal, unless `NO_COLOR` is set.
    #[default]
    Auto,
    /// Always colour, even when piped.
    Always,
    /// Never colour.
    Never,
}

/// Resolved colour switch; accessors return an escape code or `""`.
#[derive(Debug, Clone, Copy)]
pub struct ColorConfig {
    enabled: bool,
}

impl ColorConfig {
    /// Explicit mode wins, then `FORCE_COLOR`, then `NO_COLOR`, then TTY
    /// detection.
    pub fn from_mode(mode: ColorMode) -> Self {
        let enabled = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                let forced = std::env::var("FORCE_COLOR").is_ok_and(|v| !v.is_empty() && v != "0");
                forced || (std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal())
            }
        };
        Self { enabled }
    }

    pub fn auto() -> Self {
        Self::from_mode(ColorMode::Auto)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn code(&self, seq: &'static str) -> &'static str {
        if self.enabled {
            seq
        } else {
            ""
        }
    }

    pub fn reset(&self) -> &'static str { self.code("\x1b[0m") }
    pub fn bold(&self) -> &'static str { self.code("\x1b[1m") }
    pub fn dim(&self) -> &'static str { self.code("\x1b[2m") }
    pub fn red(&self) -> &'static str { self.code("\x1b[31m") }
    pub fn green(&self) -> &'static str { self.code("\x1b[32m") }
    pub fn yellow(&self) -> &'static str { self.code("\x1b[33m") }
    pub fn cyan(&self) -> &'static str { self.code("\x1b[36m") }
    pub fn gray(&self) -> &'static str { self.code("\x1b[90m") }
}

static COLOR: OnceLock<ColorConfig> = OnceLock::new();

/// Set the process-wide colour mode. First call wins.
pub fn init_color(mode: ColorMode) {
    let _ = COLOR.set(ColorConfig::from_mode(mode));
}

/// Active colour configuration; auto-detected if `init_color` never ran.
pub fn color_config() -> &'static ColorConfig {
    COLOR.get_or_init(ColorConfig::auto)
}

// ============================================================================
// OUTPUT FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text with colour and hints.
    #[default]
    Text,
    /// One line per diagnostic.
    Concise,
    /// JSON with diagnostics and summary.
    Json,
    /// GitHub Actions annotations.
    Github,
    /// SARIF 2.1.0.
    Sarif,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(s.trim(), true).ok()
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Default)]
pub struct LintSummary {
    pub files_checked: usize,
    pub files_with_issues: usize,
    pub total_diagnostics: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hints: usize,
    pub by_rule: BTreeMap<RuleCode, usize>,
}

impl LintSummary {
    pub fn add_diagnostic(&mut self, diag: &Diagnostic) {
        self.total_diagnostics += 1;
        match diag.severity {
            DiagnosticSeverity::Error => self.errors += 1,
            DiagnosticSeverity::Warning => self.warnings += 1,
            DiagnosticSeverity::Info => self.infos += 1,
            DiagnosticSeverity::Hint => self.hints += 1,
        }
        *self.by_rule.entry(diag.rule).or_insert(0) += 1;
    }
}

// ============================================================================
// RULE HINTS
// ============================================================================

fn rule_why(code: RuleCode) -> &'static str {
    match code {
        RuleCode::DSP001 => "Owners of disposable state must be disposable themselves, or nobody can release it.",
        RuleCode::DSP002 => "A disposable handed to a constructor that ignores it is leaked by whoever created it.",
        RuleCode::DSP003 => "Overwriting a member that still holds a disposable loses the only reference to it.",
        RuleCode::DSP004 => "A disposable local that goes out of scope undisposed holds its handle until finalization.",
        RuleCode::DSP005 => "Discarding a disposable return value leaks the resource the callee opened.",
        RuleCode::DSP006 => "An object created and never stored can never be disposed.",
        RuleCode::DSP007 => "Callers only see the registered interface and cannot dispose through it.",
    }
}

fn rule_how_to_fix(code: RuleCode) -> &'static str {
    match code {
        RuleCode::DSP001 => "Implement IDisposable and dispose the member in Dispose().",
        RuleCode::DSP002 => "Store the parameter in a field, or dispose it before the constructor returns.",
        RuleCode::DSP003 => "Dispose the previous value before assigning, or use DisposeItems() for collections.",
        RuleCode::DSP004 => "Wrap the variable in a using statement or declaration.",
        RuleCode::DSP005 => "Store, return or dispose the result; use the *AndDispose helpers for removals.",
        RuleCode::DSP006 => "Assign the object, wrap it in using, or call Dispose() on it.",
        RuleCode::DSP007 => "Register under an interface that extends IDisposable.",
    }
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Print diagnostics to stdout in `format`.
pub fn print_diagnostics(diagnostics: &[Diagnostic], format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_diagnostics(&mut handle, diagnostics, format)
}

pub fn write_diagnostics<W: Write>(w: &mut W, diagnostics: &[Diagnostic], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => print_text(w, diagnostics),
        OutputFormat::Concise => print_concise(w, diagnostics),
        OutputFormat::Json => print_json(w, diagnostics),
        OutputFormat::Github => print_github(w, diagnostics),
        OutputFormat::Sarif => print_sarif(w, diagnostics),
    }
}

/// Print the summary; machine formats carry their own.
pub fn print_summary(summary: &LintSummary, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text | OutputFormat::Concise => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            print_text_summary(&mut handle, summary)
        }
        OutputFormat::Json | OutputFormat::Github | OutputFormat::Sarif => Ok(()),
    }
}

// ============================================================================
// TEXT
// ============================================================================

fn print_text<W: Write>(w: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()> {
    let c = color_config();
    let (bold, dim, reset) = (c.bold(), c.dim(), c.reset());
    let width = terminal_width().saturating_sub(6);

    for diag in diagnostics {
        let severity_color = match diag.severity {
            DiagnosticSeverity::Error => c.red(),
            DiagnosticSeverity::Warning => c.yellow(),
            DiagnosticSeverity::Info => c.cyan(),
            DiagnosticSeverity::Hint => c.gray(),
        };
        writeln!(
            w,
            "{bold}{}:{}:{}{reset}: {severity_color}{}{reset} {}",
            diag.file.display(),
            diag.range.start_line,
            diag.range.start_col,
            diag.rule,
            diag.message,
        )?;
        if matches!(diag.severity, DiagnosticSeverity::Error | DiagnosticSeverity::Warning) {
            writeln!(w, "  {dim}why: {}{reset}", wrap_text(rule_why(diag.rule), width, "       "))?;
            writeln!(w, "  {dim}fix: {}{reset}", wrap_text(rule_how_to_fix(diag.rule), width, "       "))?;
        }
    }
    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn print_text_summary<W: Write>(w: &mut W, summary: &LintSummary) -> io::Result<()> {
    let c = color_config();
    let (bold, dim, reset) = (c.bold(), c.dim(), c.reset());

    writeln!(w)?;
    if summary.total_diagnostics == 0 {
        writeln!(
            w,
            "{}No disposal issues in {} file{}.{reset}",
            c.green(),
            summary.files_checked,
            plural(summary.files_checked)
        )?;
        return Ok(());
    }

    writeln!(
        w,
        "{bold}Found {} issue{} in {} file{}{reset}",
        summary.total_diagnostics,
        plural(summary.total_diagnostics),
        summary.files_with_issues,
        plural(summary.files_with_issues)
    )?;

    let mut parts = Vec::new();
    if summary.errors > 0 {
        parts.push(format!("{}{} error{}{reset}", c.red(), summary.errors, plural(summary.errors)));
    }
    if summary.warnings > 0 {
        parts.push(format!("{}{} warning{}{reset}", c.yellow(), summary.warnings, plural(summary.warnings)));
    }
    if summary.infos > 0 {
        parts.push(format!("{}{} info{reset}", c.cyan(), summary.infos));
    }
    if summary.hints > 0 {
        parts.push(format!("{dim}{} hint{}{reset}", summary.hints, plural(summary.hints)));
    }
    writeln!(w, "  {}", parts.join(", "))?;

    if summary.by_rule.len() > 1 {
        writeln!(w)?;
        let mut rules: Vec<_> = summary.by_rule.iter().collect();
        rules.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (rule, count) in rules {
            writeln!(w, "  {dim}{:<8}{reset} {:<24} {:>4}", rule, rule.name(), count)?;
        }
    }
    Ok(())
}

// ============================================================================
// CONCISE
// ============================================================================

fn print_concise<W: Write>(w: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()> {
    for diag in diagnostics {
        writeln!(
            w,
            "{}:{}:{}: {} {}",
            diag.file.display(),
            diag.range.start_line,
            diag.range.start_col,
            diag.rule,
            diag.message
        )?;
    }
    Ok(())
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: RuleCode,
    code_name: &'static str,
    message: &'a str,
    severity: DiagnosticSeverity,
    file: String,
    location: JsonLocation,
    why: &'static str,
    how_to_fix: &'static str,
}

#[derive(Serialize)]
struct JsonLocation {
    start_line: usize,
    start_column: usize,
    end_line: usize,
    end_column: usize,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    version: &'static str,
    diagnostics: Vec<JsonDiagnostic<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
    hints: usize,
    by_rule: BTreeMap<RuleCode, usize>,
}

fn print_json<W: Write>(w: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()> {
    let mut summary = LintSummary::default();
    let json_diags = diagnostics
        .iter()
        .map(|d| {
            summary.add_diagnostic(d);
            JsonDiagnostic {
                code: d.rule,
                code_name: d.rule.name(),
                message: &d.message,
                severity: d.severity,
                file: d.file.display().to_string(),
                location: JsonLocation {
                    start_line: d.range.start_line,
                    start_column: d.range.start_col,
                    end_line: d.range.end_line,
                    end_column: d.range.end_col,
                },
                why: rule_why(d.rule),
                how_to_fix: rule_how_to_fix(d.rule),
            }
        })
        .collect();

    let output = JsonOutput {
        version: "1",
        diagnostics: json_diags,
        summary: JsonSummary {
            total: summary.total_diagnostics,
            errors: summary.errors,
            warnings: summary.warnings,
            infos: summary.infos,
            hints: summary.hints,
            by_rule: summary.by_rule,
        },
    };
    serde_json::to_writer_pretty(&mut *w, &output).map_err(io::Error::other)?;
    writeln!(w)
}

// ============================================================================
// GITHUB ACTIONS
// ============================================================================

/// Percent-encode the characters workflow commands reserve.
fn github_escape(s: &str) -> String {
    s.replace('%', "%25").replace('\n', "%0A").replace('\r', "%0D")
}

fn print_github<W: Write>(w: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()> {
    for diag in diagnostics {
        let level = match diag.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info | DiagnosticSeverity::Hint => "notice",
        };
        writeln!(
            w,
            "::{level} file={},line={},col={},endLine={},endColumn={},title={} ({})::{}",
            diag.file.display(),
            diag.range.start_line,
            diag.range.start_col,
            diag.range.end_line,
            diag.range.end_col,
            diag.rule,
            diag.rule.name(),
            github_escape(&diag.message),
        )?;
    }
    Ok(())
}

// ============================================================================
// SARIF 2.1.0
// ============================================================================

#[derive(Serialize)]
struct SarifLog {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: RuleCode,
    name: &'static str,
    short_description: SarifMessage,
    full_description: SarifMessage,
    help: SarifMessage,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: RuleCode,
    rule_index: usize,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: usize,
    start_column: usize,
    end_line: usize,
    end_column: usize,
}

fn sarif_level(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => "error",
        DiagnosticSeverity::Warning => "warning",
        DiagnosticSeverity::Info | DiagnosticSeverity::Hint => "note",
    }
}

fn print_sarif<W: Write>(w: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()> {
    // Rules table lists every rule so rule indices are stable across runs.
    let rules = RuleCode::all()
        .iter()
        .map(|&code| SarifRule {
            id: code,
            name: code.name(),
            short_description: SarifMessage { text: code.name().to_string() },
            full_description: SarifMessage { text: code.description().to_string() },
            help: SarifMessage {
                text: format!("Why: {}\nFix: {}", rule_why(code), rule_how_to_fix(code)),
            },
        })
        .collect();

    let results = diagnostics
        .iter()
        .map(|d| SarifResult {
            rule_id: d.rule,
            rule_index: RuleCode::all().iter().position(|&c| c == d.rule).unwrap_or(0),
            level: sarif_level(d.severity),
            message: SarifMessage { text: d.message.clone() },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifactLocation {
                        uri: d.file.display().to_string().replace('\\', "/"),
                    },
                    region: SarifRegion {
                        start_line: d.range.start_line,
                        start_column: d.range.start_col,
                        end_line: d.range.end_line,
                        end_column: d.range.end_col,
                    },
                },
            }],
        })
        .collect();

    let log = SarifLog {
        schema: "https://json.schemastore.org/sarif-2.1.0.json",
        version: "2.1.0",
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "dispose-lint",
                    version: env!("CARGO_PKG_VERSION"),
                    rules,
                },
            },
            results,
        }],
    };
    serde_json::to_writer_pretty(&mut *w, &log).map_err(io::Error::other)?;
    writeln!(w)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Range;
    use std::path::PathBuf;

    fn make_diag(rule: RuleCode, severity: DiagnosticSeverity, message: &str) -> Diagnostic {
        Diagnostic {
            rule,
            severity,
            file: PathBuf::from("src/Owner.cs"),
            range: Range::new(10, 5, 10, 20),
            message: message.to_string(),
        }
    }

    fn render(diags: &[Diagnostic], format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_diagnostics(&mut buf, diags, format).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("short", 80, "  "), "short");
        let wrapped = wrap_text("one two three four five six", 10, "  ");
        assert!(wrapped.lines().count() > 1);
        assert!(wrapped.lines().skip(1).all(|l| l.starts_with("  ")));
    }

    #[test]
    fn test_color_modes() {
        let never = ColorConfig::from_mode(ColorMode::Never);
        assert!(!never.is_enabled());
        assert_eq!(never.red(), "");
        let always = ColorConfig::from_mode(ColorMode::Always);
        assert_eq!(always.red(), "\x1b[31m");
        assert_eq!(always.reset(), "\x1b[0m");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = LintSummary::default();
        summary.add_diagnostic(&make_diag(RuleCode::DSP004, DiagnosticSeverity::Error, "a"));
        summary.add_diagnostic(&make_diag(RuleCode::DSP004, DiagnosticSeverity::Warning, "b"));
        summary.add_diagnostic(&make_diag(RuleCode::DSP006, DiagnosticSeverity::Hint, "c"));
        assert_eq!(summary.total_diagnostics, 3);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.hints, 1);
        assert_eq!(summary.by_rule[&RuleCode::DSP004], 2);
    }

    #[test]
    fn test_text_output() {
        let out = render(
            &[make_diag(RuleCode::DSP006, DiagnosticSeverity::Error, "Disposable object of type 'DisposeMe'")],
            OutputFormat::Text,
        );
        assert!(out.contains("src/Owner.cs:10:5"));
        assert!(out.contains("DSP006"));
        assert!(out.contains("why:"));
        assert!(out.contains("fix:"));
    }

    #[test]
    fn test_text_output_hint_has_no_hints() {
        let out = render(&[make_diag(RuleCode::DSP005, DiagnosticSeverity::Hint, "m")], OutputFormat::Text);
        assert!(!out.contains("why:"));
    }

    #[test]
    fn test_concise_output() {
        let out = render(&[make_diag(RuleCode::DSP001, DiagnosticSeverity::Error, "msg")], OutputFormat::Concise);
        assert_eq!(out, "src/Owner.cs:10:5: DSP001 msg\n");
    }

    #[test]
    fn test_json_output() {
        let out = render(
            &[
                make_diag(RuleCode::DSP003, DiagnosticSeverity::Error, "x"),
                make_diag(RuleCode::DSP003, DiagnosticSeverity::Warning, "y"),
            ],
            OutputFormat::Json,
        );
        let value: serde_json::Value = serde_json::from_str(&out).expect("json");
        assert_eq!(value["diagnostics"][0]["code"], "DSP003");
        assert_eq!(value["diagnostics"][1]["severity"], "warning");
        assert_eq!(value["diagnostics"][0]["location"]["start_column"], 5);
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["by_rule"]["DSP003"], 2);
    }

    #[test]
    fn test_github_output_escapes_message() {
        let out = render(&[make_diag(RuleCode::DSP002, DiagnosticSeverity::Warning, "50%\nleak")], OutputFormat::Github);
        assert!(out.starts_with("::warning file=src/Owner.cs,line=10,col=5"));
        assert!(out.contains("title=DSP002 (constructor-parameter)"));
        assert!(out.contains("50%25%0Aleak"));
    }

    #[test]
    fn test_sarif_output() {
        let out = render(&[make_diag(RuleCode::DSP007, DiagnosticSeverity::Info, "m")], OutputFormat::Sarif);
        let value: serde_json::Value = serde_json::from_str(&out).expect("sarif");
        assert_eq!(value["version"], "2.1.0");
        let run = &value["runs"][0];
        assert_eq!(run["tool"]["driver"]["name"], "dispose-lint");
        assert_eq!(run["tool"]["driver"]["rules"].as_array().map(Vec::len), Some(7));
        assert_eq!(run["results"][0]["ruleId"], "DSP007");
        assert_eq!(run["results"][0]["ruleIndex"], 6);
        assert_eq!(run["results"][0]["level"], "note");
        assert_eq!(run["results"][0]["locations"][0]["physicalLocation"]["region"]["startLine"], 10);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("SARIF"), Some(OutputFormat::Sarif));
        assert_eq!(OutputFormat::parse("github"), Some(OutputFormat::Github));
        assert_eq!(OutputFormat::parse("xml"), None);
    }
}
