//! `.dispose-lint.toml` configuration file support.
//!
//! Provides deserialization, discovery (walk up to the `.git` root), and
//! validation. CLI flags always take precedence over file config.
//!
//! # Example config
//!
//! ```toml
//! [rules]
//! select = ["DSP001", "DSP004"]
//! exclude = ["DSP005"]
//!
//! [rules.severity]
//! DSP005 = "warning"
//!
//! [whitelist]
//! types = [{ namespace = "Acme.Services", name = "ServiceProxy" }]
//! methods = ["Acme.Composition.Container.Resolve<T>()"]
//!
//! [analysis]
//! factory_attributes = ["FactoryRegistration"]
//! disposable_types = [{ namespace = "Acme.Native", name = "Handle" }]
//!
//! [files]
//! include = ["src/**/*.cs"]
//! exclude = ["**/obj/**", "**/bin/**"]
//!
//! [output]
//! format = "text"
//! max_diagnostics = 200
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lint::{DiagnosticSeverity, OutputFormat, RuleCode};
use crate::source::TypeName;

/// Top-level `.dispose-lint.toml` configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LintFileConfig {
    #[serde(default)]
    pub rules: RulesConfig,

    /// Types and method signatures exempt from disposal tracking.
    #[serde(default)]
    pub whitelist: WhitelistConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Rule selection and severity overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Rules to enable. Empty means all.
    #[serde(default)]
    pub select: Vec<String>,

    /// Rules to disable; wins over `select`.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Rule code to `"error"`, `"warning"`, `"info"` or `"hint"`.
    #[serde(default)]
    pub severity: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WhitelistConfig {
    #[serde(default)]
    pub types: Vec<TypeName>,

    /// Original-definition display strings, e.g.
    /// `Acme.Container.Resolve<T>(string)`.
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Attribute names treated as factory registrations. Defaults to
    /// `FactoryRegistration` when absent.
    #[serde(default)]
    pub factory_attributes: Option<Vec<String>>,

    /// Types from referenced assemblies that implement `IDisposable`.
    #[serde(default)]
    pub disposable_types: Vec<TypeName>,
}

/// File include/exclude glob patterns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    /// Patterns to include. Empty means every `.cs` file.
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Output settings (overridden by CLI flags).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// "text", "concise", "json", "github" or "sarif".
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub max_diagnostics: Option<usize>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl LintFileConfig {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for code in self.rules.select.iter().chain(&self.rules.exclude) {
            parse_rule_code(code)?;
        }
        self.severity_overrides()?;

        for entry in self.whitelist.types.iter().chain(&self.analysis.disposable_types) {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::InvalidWhitelistEntry(entry.to_string()));
            }
        }
        for method in &self.whitelist.methods {
            if !method.contains('(') || !method.ends_with(')') {
                return Err(ConfigError::InvalidWhitelistEntry(method.clone()));
            }
        }

        for pattern in self.files.include.iter().chain(&self.files.exclude) {
            compile_glob(pattern)?;
        }

        self.output_format()?;
        if self.output.max_diagnostics == Some(0) {
            return Err(ConfigError::InvalidMaxDiagnostics);
        }
        Ok(())
    }

    pub fn selected_rules(&self) -> Result<Vec<RuleCode>, ConfigError> {
        self.rules.select.iter().map(|c| parse_rule_code(c)).collect()
    }

    pub fn excluded_rules(&self) -> Result<Vec<RuleCode>, ConfigError> {
        self.rules.exclude.iter().map(|c| parse_rule_code(c)).collect()
    }

    pub fn severity_overrides(&self) -> Result<Vec<(RuleCode, DiagnosticSeverity)>, ConfigError> {
        self.rules
            .severity
            .iter()
            .map(|(code, severity)| {
                let rule = parse_rule_code(code)?;
                let level = DiagnosticSeverity::parse(severity).ok_or_else(|| ConfigError::InvalidSeverity {
                    rule: code.clone(),
                    severity: severity.clone(),
                })?;
                Ok((rule, level))
            })
            .collect()
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>, ConfigError> {
        match self.output.format.as_deref() {
            None => Ok(None),
            Some(s) => OutputFormat::parse(s)
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidFormat(s.to_string())),
        }
    }

    /// Contents written by `dispose-lint init`.
    pub fn default_toml() -> &'static str {
        r#"# dispose-lint configuration file

# Rule selection and severity overrides.
[rules]
# Enable specific rules only (empty = all rules enabled):
# select = ["DSP001", "DSP004"]
#
# Disable specific rules:
# exclude = ["DSP005"]

# Override severity per rule (error, warning, info, hint):
# [rules.severity]
# DSP005 = "warning"

# Types and method signatures that never need disposal.
[whitelist]
# types = [{ namespace = "Acme.Services", name = "ServiceProxy" }]
# methods = ["Acme.Composition.Container.Resolve<T>()"]

[analysis]
# factory_attributes = ["FactoryRegistration"]
# Disposable types from referenced assemblies:
# disposable_types = [{ namespace = "Acme.Native", name = "Handle" }]

# File include/exclude glob patterns.
[files]
# include = ["src/**/*.cs"]
exclude = ["**/obj/**", "**/bin/**"]

[output]
# format = "text"
# max_diagnostics = 200
"#
    }

    pub fn build_file_matcher(&self) -> Result<FileMatcher, ConfigError> {
        FileMatcher::new(&self.files)
    }
}

fn parse_rule_code(code: &str) -> Result<RuleCode, ConfigError> {
    RuleCode::parse_code(code).ok_or_else(|| ConfigError::InvalidRuleCode(code.to_string()))
}

fn compile_glob(pattern: &str) -> Result<Glob, ConfigError> {
    Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// File matching
// ---------------------------------------------------------------------------

/// Compiled include/exclude globs.
#[derive(Debug, Clone, Default)]
pub struct FileMatcher {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl FileMatcher {
    pub fn new(files: &FilesConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            include: build_set(&files.include)?,
            exclude: build_set(&files.exclude)?,
        })
    }

    /// Excludes win; an empty include list admits everything else.
    pub fn is_included(&self, path: &Path) -> bool {
        if self.exclude.as_ref().is_some_and(|set| set.is_match(path)) {
            return false;
        }
        self.include.as_ref().map_or(true, |set| set.is_match(path))
    }
}

fn build_set(patterns: &[String]) -> Result<Option<GlobSet>, ConfigError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern)?);
    }
    builder.build().map(Some).map_err(|e| ConfigError::InvalidGlob {
        pattern: patterns.join(", "),
        detail: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Config file discovery
// ---------------------------------------------------------------------------

pub const CONFIG_FILE_NAME: &str = ".dispose-lint.toml";

/// Walk up from `start_dir` looking for `.dispose-lint.toml`, stopping at
/// the directory that contains `.git`.
pub fn discover_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = if start_dir.is_file() {
        start_dir.parent()?.to_path_buf()
    } else {
        start_dir.to_path_buf()
    };

    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if current.join(".git").exists() {
            return None;
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => return None,
        }
    }
}

/// `Ok(None)` when no config file exists.
pub fn discover_and_load_config(start_dir: &Path) -> Result<Option<(LintFileConfig, PathBuf)>, ConfigError> {
    match discover_config(start_dir) {
        Some(path) => {
            let config = LintFileConfig::load(&path)?;
            Ok(Some((config, path)))
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown rule code '{0}' in config (valid: DSP001..DSP007)")]
    InvalidRuleCode(String),

    #[error("invalid severity '{severity}' for rule {rule} (valid: error, warning, info, hint)")]
    InvalidSeverity { rule: String, severity: String },

    #[error("invalid glob pattern '{pattern}': {detail}")]
    InvalidGlob { pattern: String, detail: String },

    #[error("invalid output format '{0}' (valid: text, concise, json, github, sarif)")]
    InvalidFormat(String),

    #[error("max_diagnostics must be >= 1")]
    InvalidMaxDiagnostics,

    #[error("invalid whitelist entry '{0}'")]
    InvalidWhitelistEntry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(tmp.path().join(".git")).expect("create .git");
        tmp
    }

    #[test]
    fn parse_minimal_config() {
        let config = LintFileConfig::parse("").unwrap();
        assert_eq!(config, LintFileConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[rules]
select = ["DSP001", "DSP004"]
exclude = ["DSP005"]

[rules.severity]
DSP005 = "warning"

[whitelist]
types = [{ namespace = "Acme.Services", name = "ServiceProxy" }]
methods = ["Acme.Composition.Container.Resolve<T>()"]

[analysis]
factory_attributes = ["Export"]
disposable_types = [{ namespace = "Acme.Native", name = "Handle" }]

[files]
include = ["src/**/*.cs"]
exclude = ["**/obj/**"]

[output]
format = "json"
max_diagnostics = 100
"#;
        let config = LintFileConfig::parse(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.selected_rules().unwrap(), vec![RuleCode::DSP001, RuleCode::DSP004]);
        assert_eq!(config.excluded_rules().unwrap(), vec![RuleCode::DSP005]);
        assert_eq!(
            config.severity_overrides().unwrap(),
            vec![(RuleCode::DSP005, DiagnosticSeverity::Warning)]
        );
        assert_eq!(config.whitelist.types, vec![TypeName::new("Acme.Services", "ServiceProxy")]);
        assert_eq!(config.whitelist.methods.len(), 1);
        assert_eq!(config.analysis.factory_attributes, Some(vec!["Export".to_string()]));
        assert_eq!(config.analysis.disposable_types[0].name, "Handle");
        assert_eq!(config.output_format().unwrap(), Some(OutputFormat::Json));
        assert_eq!(config.output.max_diagnostics, Some(100));
    }

    #[test]
    fn invalid_rule_code_rejected() {
        let config = LintFileConfig::parse("[rules]\nselect = [\"BOGUS\"]\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown rule code 'BOGUS'"));
    }

    #[test]
    fn invalid_severity_rejected() {
        let config = LintFileConfig::parse("[rules.severity]\nDSP001 = \"fatal\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid severity 'fatal'"));
    }

    #[test]
    fn invalid_glob_rejected() {
        let config = LintFileConfig::parse("[files]\ninclude = [\"[invalid\"]\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid glob pattern"));
    }

    #[test]
    fn invalid_format_rejected() {
        let config = LintFileConfig::parse("[output]\nformat = \"xml\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid output format 'xml'"));
    }

    #[test]
    fn max_diagnostics_zero_rejected() {
        let config = LintFileConfig::parse("[output]\nmax_diagnostics = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxDiagnostics)));
    }

    #[test]
    fn malformed_whitelist_method_rejected() {
        let config = LintFileConfig::parse("[whitelist]\nmethods = [\"Acme.Container.Resolve\"]\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWhitelistEntry(_)));
    }

    #[test]
    fn whitelist_type_requires_namespace_and_name() {
        let err = LintFileConfig::parse("[whitelist]\ntypes = [{ name = \"Proxy\" }]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_key_rejected() {
        let err = LintFileConfig::parse("[rules]\nbogus_key = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn file_matcher_include_and_exclude() {
        let files = FilesConfig {
            include: vec!["src/**/*.cs".to_string()],
            exclude: vec!["**/obj/**".to_string()],
        };
        let matcher = FileMatcher::new(&files).unwrap();
        assert!(matcher.is_included(Path::new("src/Core/Owner.cs")));
        assert!(!matcher.is_included(Path::new("src/Core/obj/Generated.cs")));
        assert!(!matcher.is_included(Path::new("tools/Build.cs")));
    }

    #[test]
    fn file_matcher_empty_passes_all() {
        let matcher = FileMatcher::new(&FilesConfig::default()).unwrap();
        assert!(matcher.is_included(Path::new("anything.cs")));
    }

    #[test]
    fn discover_config_walks_up() {
        let tmp = init_repo();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = tmp.path().join("src").join("Core");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_config(&nested), Some(tmp.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn discover_config_stops_at_git_root() {
        let tmp = init_repo();
        let nested = tmp.path().join("src");
        std::fs::create_dir_all(&nested).unwrap();

        assert!(discover_config(&nested).is_none());
        assert!(discover_and_load_config(&nested).unwrap().is_none());
    }

    #[test]
    fn discover_and_load_rejects_invalid_config() {
        let tmp = init_repo();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "[rules]\nselect = [\"BOGUS\"]\n").unwrap();
        assert!(discover_and_load_config(tmp.path()).is_err());
    }

    #[test]
    fn default_toml_is_valid() {
        let config = LintFileConfig::parse(LintFileConfig::default_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.files.exclude.len(), 2);
    }
}
