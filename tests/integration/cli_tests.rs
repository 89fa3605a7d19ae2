//! CLI argument validation via [`clap::Parser::try_parse_from`].

use clap::Parser;
use dispose_lint::cli::{validate_cli_semantics, Cli, Commands};
use dispose_lint::lint::{ColorMode, DiagnosticSeverity, OutputFormat};

// ============================================================================
// HELPERS
// ============================================================================

fn try_parse(args: &[&str]) -> Result<Cli, String> {
    Cli::try_parse_from(args).map_err(|e| e.to_string())
}

fn must_parse(args: &[&str]) -> Cli {
    try_parse(args).unwrap_or_else(|e| panic!("expected parse to succeed, got:\n{}", e))
}

fn must_fail_containing(args: &[&str], needle: &str) {
    let err = try_parse(args).expect_err("expected parse to fail");
    assert!(err.contains(needle), "error does not contain '{}'. Full error:\n{}", needle, err);
}

// ============================================================================
// CHECK
// ============================================================================

#[test]
fn check_requires_paths() {
    assert!(try_parse(&["dispose-lint", "check"]).is_err());
}

#[test]
fn check_full_flag_set() {
    let cli = must_parse(&[
        "dispose-lint",
        "--color",
        "never",
        "check",
        "src",
        "tests",
        "--select",
        "DSP001,dsp004",
        "--exclude",
        "DSP005",
        "--severity",
        "warning",
        "--format",
        "sarif",
        "--exit-zero",
        "--max-diagnostics",
        "10",
    ]);
    assert_eq!(cli.color, ColorMode::Never);
    let Commands::Check { paths, select, exclude, severity, format, exit_zero, max_diagnostics } = cli.command else {
        panic!("expected Check command");
    };
    assert_eq!(paths.len(), 2);
    assert_eq!(select.as_deref(), Some("DSP001,dsp004"));
    assert_eq!(exclude.as_deref(), Some("DSP005"));
    assert_eq!(severity, Some(DiagnosticSeverity::Warning));
    assert_eq!(format, Some(OutputFormat::Sarif));
    assert!(exit_zero);
    assert_eq!(max_diagnostics, Some(10));
}

#[test]
fn format_defaults_to_config_or_text() {
    let cli = must_parse(&["dispose-lint", "check", "."]);
    assert!(matches!(cli.command, Commands::Check { format: None, .. }));
}

#[test]
fn unknown_rule_code_rejected() {
    must_fail_containing(&["dispose-lint", "check", ".", "--select", "DSP001,CA2000"], "unknown rule code 'CA2000'");
}

#[test]
fn ignore_is_an_alias_for_exclude() {
    let cli = must_parse(&["dispose-lint", "check", ".", "--ignore", "DSP006"]);
    assert!(matches!(cli.command, Commands::Check { exclude: Some(ref e), .. } if e == "DSP006"));
}

#[test]
fn max_diagnostics_zero_rejected() {
    must_fail_containing(&["dispose-lint", "check", ".", "--max-diagnostics", "0"], "must be at least 1");
}

#[test]
fn invalid_severity_rejected() {
    must_fail_containing(&["dispose-lint", "check", ".", "--severity", "fatal"], "invalid severity 'fatal'");
}

// ============================================================================
// OTHER COMMANDS
// ============================================================================

#[test]
fn init_defaults() {
    let cli = must_parse(&["dispose-lint", "init"]);
    let Commands::Init { output, force } = cli.command else {
        panic!("expected Init command");
    };
    assert_eq!(output.to_str(), Some(".dispose-lint.toml"));
    assert!(!force);
}

#[test]
fn rules_command_parses() {
    assert!(matches!(must_parse(&["dispose-lint", "rules"]).command, Commands::Rules));
}

// ============================================================================
// SEMANTIC WARNINGS
// ============================================================================

#[test]
fn quiet_and_verbose_warns() {
    let cli = must_parse(&["dispose-lint", "-q", "-v", "rules"]);
    let warnings = validate_cli_semantics(&cli);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("contradictory"));
}

#[test]
fn exclude_covering_select_warns() {
    let cli = must_parse(&["dispose-lint", "check", ".", "--select", "DSP004", "--exclude", "DSP004,DSP005"]);
    assert_eq!(validate_cli_semantics(&cli).len(), 1);

    let cli = must_parse(&["dispose-lint", "check", ".", "--select", "DSP004,DSP006", "--exclude", "DSP004"]);
    assert!(validate_cli_semantics(&cli).is_empty());
}
