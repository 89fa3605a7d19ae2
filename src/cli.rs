//! CLI argument definitions and validation for dispose-lint.
//!
//! Kept out of `main.rs` so integration tests can drive
//! [`Cli::try_parse_from`] without spawning a subprocess.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::lint::{ColorMode, DiagnosticSeverity, OutputFormat, RuleCode};

/// Parse a positive (>= 1) usize value.
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let val: usize = s.parse().map_err(|e| format!("invalid integer: {}", e))?;
    if val == 0 {
        return Err("value must be at least 1".to_string());
    }
    Ok(val)
}

/// Reject unknown codes in a comma-separated list at parse time.
fn validate_rule_codes(s: &str) -> Result<String, String> {
    for code in s.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if RuleCode::parse_code(code).is_none() {
            let valid: Vec<&str> = RuleCode::all().iter().map(|r| r.as_str()).collect();
            return Err(format!("unknown rule code '{}'. Valid codes: {}", code, valid.join(", ")));
        }
    }
    Ok(s.to_string())
}

fn parse_severity(s: &str) -> Result<DiagnosticSeverity, String> {
    DiagnosticSeverity::parse(s)
        .ok_or_else(|| format!("invalid severity '{}' (valid: error, warning, info, hint)", s))
}

/// dispose-lint: IDisposable ownership checker for C#.
///
/// Finds disposable objects that are created, received, stored or returned
/// without anyone taking responsibility for disposing them.
///
/// Quick start:
///   dispose-lint check src/          Check files for issues
///   dispose-lint rules               List all available rules
///   dispose-lint init                Generate default .dispose-lint.toml
#[derive(Parser, Debug)]
#[command(name = "dispose-lint")]
#[command(author)]
#[command(version)]
#[command(about = "IDisposable ownership checker for C#", long_about = None)]
#[command(after_help = "\
CONFIGURATION:
  dispose-lint looks for a .dispose-lint.toml config file, searching from the\n\
  current directory up to the nearest .git root. Use `dispose-lint init` to\n\
  generate a default config. CLI flags always override config file settings.\n\
\n\
EXAMPLES:\n\
  dispose-lint check src/                        Check all C# files under src/\n\
  dispose-lint check . --select DSP004,DSP006    Only run specific rules\n\
  dispose-lint check . --exclude DSP005          Skip specific rules\n\
  dispose-lint check . --format sarif > out.sarif")]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true, help_heading = "Global Options")]
    pub debug: bool,

    /// When to use ANSI color in output.
    ///
    /// auto: enable when stdout is a terminal and NO_COLOR is unset (default).
    /// always: force color even when piped.
    /// never: disable color unconditionally.
    #[arg(long, value_enum, global = true, default_value = "auto", help_heading = "Global Options")]
    pub color: ColorMode,

    /// Suppress all non-diagnostic output.
    #[arg(short, long, global = true, help_heading = "Global Options")]
    pub quiet: bool,

    /// Show additional details during execution.
    #[arg(short, long, global = true, help_heading = "Global Options")]
    pub verbose: bool,

    /// Path to a .dispose-lint.toml config file.
    ///
    /// Overrides discovery from the current directory.
    #[arg(long, global = true, help_heading = "Global Options")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check C# files for disposal issues.
    ///
    /// All files under the given paths are analysed together, so types
    /// declared in one file are known in every other. Returns exit code 1
    /// if any issues are found, unless --exit-zero is used.
    Check {
        /// Files or directories to check (recursive for directories).
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Comma-separated rule codes to enable (e.g., DSP001,DSP004).
        ///
        /// Overrides [rules.select] in .dispose-lint.toml.
        #[arg(long, value_parser = validate_rule_codes)]
        select: Option<String>,

        /// Comma-separated rule codes to skip (e.g., DSP005).
        ///
        /// Takes precedence over --select. Alias: --ignore.
        #[arg(long, alias = "ignore", value_parser = validate_rule_codes)]
        exclude: Option<String>,

        /// Minimum severity to report: error, warning, info, hint.
        #[arg(long, value_parser = parse_severity)]
        severity: Option<DiagnosticSeverity>,

        /// Output format. Defaults to [output.format], then text.
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Exit with code 0 even if issues are found.
        #[arg(long)]
        exit_zero: bool,

        /// Stop after collecting this many diagnostics (>= 1).
        #[arg(long, value_parser = parse_positive_usize)]
        max_diagnostics: Option<usize>,
    },

    /// List all available rules with descriptions.
    Rules,

    /// Generate a default .dispose-lint.toml configuration file.
    Init {
        /// Output path for the config file.
        #[arg(short, long, default_value = ".dispose-lint.toml")]
        output: PathBuf,

        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
}

/// Non-fatal warnings about flag combinations clap cannot reject.
pub fn validate_cli_semantics(cli: &Cli) -> Vec<String> {
    let mut warnings = Vec::new();

    if cli.quiet && cli.verbose {
        warnings.push("Warning: --quiet and --verbose are contradictory; --quiet takes precedence".to_string());
    }

    if let Commands::Check { select: Some(select), exclude: Some(exclude), .. } = &cli.command {
        let excluded: Vec<RuleCode> = exclude.split(',').filter_map(RuleCode::parse_code).collect();
        let all_excluded = select
            .split(',')
            .filter_map(RuleCode::parse_code)
            .all(|code| excluded.contains(&code));
        if all_excluded {
            warnings.push("Warning: --exclude removes every rule named in --select".to_string());
        }
    }

    warnings
}
