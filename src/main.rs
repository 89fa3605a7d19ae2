//! dispose-lint: IDisposable ownership checker for C#.
//!
//! # Usage
//!
//! ```bash
//! # Check a solution directory
//! dispose-lint check src/
//!
//! # Machine-readable output for CI
//! dispose-lint check . --format sarif > dispose-lint.sarif
//!
//! # Generate default config
//! dispose-lint init
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dispose_lint::cli::{validate_cli_semantics, Cli, Commands};
use dispose_lint::disposable::{AnalysisSettings, Whitelist};
use dispose_lint::exit_code;
use dispose_lint::lint::{init_color, print_rules, ColorMode, DiagnosticSeverity, LintConfig, LintEngine, OutputFormat};
use dispose_lint::lint_config::{discover_and_load_config, ConfigError, LintFileConfig};
use dispose_lint::LintError;

fn main() {
    let cli = Cli::parse();

    // Colour must be fixed before anything writes to stdout.
    init_color(cli.color);

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(!matches!(cli.color, ColorMode::Never))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(exit_code::INTERNAL_ERROR);
    }

    for warning in validate_cli_semantics(&cli) {
        eprintln!("{}", warning);
    }

    match cli.command {
        Commands::Check {
            ref paths,
            ref select,
            ref exclude,
            severity,
            format,
            exit_zero,
            max_diagnostics,
        } => {
            let file_config = load_file_config(cli.config.as_deref()).unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                std::process::exit(exit_code::CONFIG_ERROR);
            });
            let options = CheckOptions {
                select: select.clone(),
                exclude: exclude.clone(),
                severity,
                max_diagnostics,
            };
            let (config, file_format) = match build_lint_config(options, file_config.as_ref()) {
                Ok(built) => built,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(exit_code::CONFIG_ERROR);
                }
            };
            let format = format.or(file_format).unwrap_or_default();
            let engine = LintEngine::new(config);
            let code = engine.check(paths, format);
            if exit_zero && code == exit_code::LINT_ISSUES {
                std::process::exit(exit_code::CLEAN);
            }
            std::process::exit(code);
        }
        Commands::Rules => print_rules(),
        Commands::Init { ref output, force } => run_init(output, force),
    }
}

/// `--config` wins; otherwise search upwards from the working directory.
fn load_file_config(explicit: Option<&Path>) -> Result<Option<LintFileConfig>, LintError> {
    if let Some(path) = explicit {
        let config = LintFileConfig::load(path)?;
        info!("Loaded config from {}", path.display());
        return Ok(Some(config));
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match discover_and_load_config(&cwd)? {
        Some((config, path)) => {
            info!("Using config: {}", path.display());
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

struct CheckOptions {
    select: Option<String>,
    exclude: Option<String>,
    severity: Option<DiagnosticSeverity>,
    max_diagnostics: Option<usize>,
}

/// Merge CLI flags over the file config. Also returns the file's output
/// format, which only applies when `--format` is absent.
fn build_lint_config(
    cli: CheckOptions,
    file_config: Option<&LintFileConfig>,
) -> Result<(LintConfig, Option<OutputFormat>), ConfigError> {
    let Some(fc) = file_config else {
        let config = LintConfig::new(cli.select, cli.exclude)
            .with_min_severity(cli.severity)
            .with_max_diagnostics(cli.max_diagnostics);
        return Ok((config, None));
    };

    let select = cli
        .select
        .or_else(|| (!fc.rules.select.is_empty()).then(|| fc.rules.select.join(",")));
    let exclude = cli
        .exclude
        .or_else(|| (!fc.rules.exclude.is_empty()).then(|| fc.rules.exclude.join(",")));

    let analysis = match &fc.analysis.factory_attributes {
        Some(names) => AnalysisSettings { factory_attributes: names.clone() },
        None => AnalysisSettings::default(),
    };

    let config = LintConfig::new(select, exclude)
        .with_min_severity(cli.severity)
        .with_max_diagnostics(cli.max_diagnostics.or(fc.output.max_diagnostics))
        .with_severity_overrides(fc.severity_overrides()?)
        .with_whitelist(Whitelist::new(&fc.whitelist.types, &fc.whitelist.methods))
        .with_analysis(analysis, fc.analysis.disposable_types.clone())
        .with_file_matcher(fc.build_file_matcher()?);
    Ok((config, fc.output_format()?))
}

/// Write a default `.dispose-lint.toml`.
fn run_init(output: &Path, force: bool) {
    if output.exists() && !force {
        eprintln!("Error: {} already exists. Use --force to overwrite.", output.display());
        std::process::exit(exit_code::CONFIG_ERROR);
    }

    match std::fs::write(output, LintFileConfig::default_toml()) {
        Ok(()) => {
            println!("Created {}", output.display());
            println!();
            println!("Edit the file to customize rule selection, severity overrides,");
            println!("whitelisted types and methods, and file include/exclude patterns.");
        }
        Err(e) => {
            eprintln!("Error writing {}: {}", output.display(), e);
            std::process::exit(exit_code::IO_ERROR);
        }
    }
}
