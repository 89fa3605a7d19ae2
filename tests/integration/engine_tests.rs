//! Engine runs over real directories, with and without a config file.

use std::fs;
use std::path::{Path, PathBuf};

use dispose_lint::disposable::{AnalysisSettings, Whitelist};
use dispose_lint::lint::{write_diagnostics, DiagnosticSeverity};
use dispose_lint::{exit_code, LintConfig, LintEngine, LintFileConfig, OutputFormat, RuleCode, CONFIG_FILE_NAME};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, content).expect("write file");
    path
}

fn project() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(
        &dir,
        "src/Resources/Handle.cs",
        "using System;\nnamespace App.Resources {\npublic class Handle : IDisposable { public void Dispose() { } }\n}\n",
    );
    write(
        &dir,
        "src/Services/Worker.cs",
        "using App.Resources;\nnamespace App.Services {\nclass Worker {\nvoid Run() {\nnew Handle();\n}\n}\n}\n",
    );
    dir
}

fn config_from(toml: &str) -> LintConfig {
    let fc = LintFileConfig::parse(toml).expect("parse");
    fc.validate().expect("validate");
    let analysis = fc
        .analysis
        .factory_attributes
        .clone()
        .map(|names| AnalysisSettings { factory_attributes: names })
        .unwrap_or_default();
    LintConfig::new(None, None)
        .with_severity_overrides(fc.severity_overrides().expect("severity"))
        .with_whitelist(Whitelist::new(&fc.whitelist.types, &fc.whitelist.methods))
        .with_analysis(analysis, fc.analysis.disposable_types.clone())
        .with_file_matcher(fc.build_file_matcher().expect("matcher"))
}

#[test]
fn project_types_resolve_across_directories() {
    let dir = project();
    let engine = LintEngine::new(LintConfig::default());
    assert_eq!(engine.check(&[dir.path().to_path_buf()], OutputFormat::Concise), exit_code::LINT_ISSUES);
}

#[test]
fn single_file_check_still_uses_builtins() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let file = write(&dir, "A.cs", "using System.IO;\nclass A { void M() { var s = new MemoryStream(); s.Dispose(); } }\n");
    let engine = LintEngine::new(LintConfig::default());
    assert_eq!(engine.check(&[file], OutputFormat::Concise), exit_code::CLEAN);
}

#[test]
fn missing_path_is_skipped() {
    let engine = LintEngine::new(LintConfig::default());
    let code = engine.check(&[PathBuf::from("/definitely/not/here")], OutputFormat::Concise);
    assert_eq!(code, exit_code::CLEAN);
}

#[test]
fn empty_selection_is_a_config_error() {
    let engine = LintEngine::new(LintConfig::new(Some("NOPE".to_string()), None));
    assert_eq!(engine.check(&[PathBuf::from(".")], OutputFormat::Concise), exit_code::CONFIG_ERROR);
}

#[test]
fn whitelist_from_config_file() {
    let config = config_from("[whitelist]\ntypes = [{ namespace = \"App.Resources\", name = \"Handle\" }]\n");
    let dir = project();
    let engine = LintEngine::new(config);
    assert_eq!(engine.check(&[dir.path().to_path_buf()], OutputFormat::Concise), exit_code::CLEAN);
}

#[test]
fn excluded_files_are_not_analysed() {
    let config = config_from("[files]\nexclude = [\"**/Services/**\"]\n");
    let dir = project();
    let engine = LintEngine::new(config);
    assert_eq!(engine.check(&[dir.path().to_path_buf()], OutputFormat::Concise), exit_code::CLEAN);
}

#[test]
fn severity_override_from_config_file() {
    let config = config_from("[rules.severity]\nDSP006 = \"warning\"\n");
    let engine = LintEngine::new(config);
    let diags = engine.check_content(
        Path::new("A.cs"),
        "using System.IO;\nclass A { void M() { new MemoryStream(); } }\n",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, DiagnosticSeverity::Warning);
}

#[test]
fn configured_factory_attribute() {
    let config = config_from("[analysis]\nfactory_attributes = [\"Export\"]\n");
    let engine = LintEngine::new(config);
    let diags = engine.check_content(
        Path::new("A.cs"),
        "using System;\ninterface IService { }\n[Export(typeof(IService))]\nclass Service : IService, IDisposable { public void Dispose() { } }\n",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].rule, RuleCode::DSP007);
}

#[test]
fn json_report_lists_project_diagnostics() {
    let dir = project();
    let sources: Vec<(PathBuf, String)> = ["src/Resources/Handle.cs", "src/Services/Worker.cs"]
        .iter()
        .map(|rel| {
            let path = dir.path().join(rel);
            let content = fs::read_to_string(&path).expect("read");
            (PathBuf::from(rel), content)
        })
        .collect();
    let diags = LintEngine::new(LintConfig::default()).check_sources(&sources);

    let mut buf = Vec::new();
    write_diagnostics(&mut buf, &diags, OutputFormat::Json).expect("json");
    let value: serde_json::Value = serde_json::from_slice(&buf).expect("valid json");
    assert_eq!(value["summary"]["total"], 1);
    assert_eq!(value["diagnostics"][0]["file"], "src/Services/Worker.cs");
    assert_eq!(value["diagnostics"][0]["location"]["start_line"], 5);
}

#[test]
fn default_config_file_round_trips() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write(&dir, CONFIG_FILE_NAME, LintFileConfig::default_toml());
    let loaded = LintFileConfig::load(&path).expect("load default config");
    assert!(loaded.rules.select.is_empty());
}
