//! Lint configuration: exclusions, warnings, and effective CLI settings.
//!
//! The configuration lives in a `.lint` YAML file next to the dashboards
//! (`.lint.toml` is read when no `.lint` exists):
//!
//! ```yaml
//! exclusions:
//!   template-job-rule:            # null: every violation of the rule
//!   panel-job-instance-rule:
//!     reason: legacy exporters
//!     entries:
//!       - dashboard: Node Exporter
//!         panel: CPU
//!         targetIdx: 0
//! warnings:
//!   panel-datasource-rule:
//!     entries:
//!       - dashboard: Sandbox
//! ```
//!
//! Resolution per result runs the exclusion pass, then the warning pass, so
//! a result matched by both ends up as a warning. Within one pass the
//! entries of a rule are OR-ed; their order does not matter.

use crate::models::{ResultContext, Severity};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the YAML configuration file looked up in a dashboard directory.
pub const CONFIG_FILE: &str = ".lint";
/// TOML alternative, used only when `.lint` is absent.
pub const CONFIG_FILE_TOML: &str = ".lint.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read lint configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not unmarshal lint configuration {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("could not unmarshal lint configuration {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
/// Exclusions and warnings keyed by rule name.
///
/// A rule mapped to `None` (YAML `null`) is present with no entries and
/// matches every result of that rule.
pub struct ConfigurationFile {
    #[serde(default)]
    pub exclusions: HashMap<String, Option<ConfigurationRuleEntries>>,
    #[serde(default)]
    pub warnings: HashMap<String, Option<ConfigurationRuleEntries>>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConfigurationRuleEntries {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<ConfigurationEntry>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
/// One matcher. Every field that is set must equal the corresponding field
/// of the result; `reason` is documentation only.
pub struct ConfigurationEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// An empty title counts as unset.
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub dashboard: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub panel: Option<String>,
    /// Zero is a real index, distinct from unset.
    #[serde(
        default,
        rename = "targetIdx",
        deserialize_with = "target_idx",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_idx: Option<usize>,
}

impl ConfigurationRuleEntries {
    pub fn add_entry(&mut self, entry: ConfigurationEntry) {
        self.entries.push(entry);
    }
}

impl ConfigurationEntry {
    pub fn is_match(&self, ctx: &ResultContext) -> bool {
        if let (Some(want), Some(d)) = (set(&self.dashboard), ctx.dashboard) {
            if want != d.title {
                return false;
            }
        }
        if let (Some(want), Some(p)) = (set(&self.panel), ctx.panel) {
            if want != p.title {
                return false;
            }
        }
        if let (Some(want), Some(t)) = (self.target_idx, ctx.target) {
            if want != t.idx {
                return false;
            }
        }
        true
    }
}

fn rule_matches(
    rules: &HashMap<String, Option<ConfigurationRuleEntries>>,
    ctx: &ResultContext,
) -> bool {
    match rules.get(ctx.rule.name()) {
        None => false,
        Some(None) => true,
        Some(Some(rule)) => {
            rule.entries.is_empty() || rule.entries.iter().any(|e| e.is_match(ctx))
        }
    }
}

impl ConfigurationFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites the severity of `ctx` according to this configuration.
    ///
    /// Always starts from the rule's own verdict, so applying twice, or
    /// applying a different configuration later, never stacks overrides.
    pub fn apply<'a>(&self, mut ctx: ResultContext<'a>) -> ResultContext<'a> {
        ctx.result = ctx.evaluated().clone();
        if rule_matches(&self.exclusions, &ctx) {
            ctx.result.severity = Severity::Exclude;
            ctx.result.message.push_str(" (Excluded)");
        }
        if rule_matches(&self.warnings, &ctx) {
            ctx.result.severity = Severity::Warning;
        }
        ctx
    }

    /// Adds an exclusion entry for `rule`. `None` excludes the whole rule.
    pub fn add_exclusion(&mut self, rule: &str, entry: Option<ConfigurationEntry>) {
        add_to(&mut self.exclusions, rule, entry);
    }

    /// Adds a warning entry for `rule`. `None` downgrades the whole rule.
    pub fn add_warning(&mut self, rule: &str, entry: Option<ConfigurationEntry>) {
        add_to(&mut self.warnings, rule, entry);
    }

    /// Loads `.lint` (or `.lint.toml`) from `dir`. A missing file yields an
    /// empty configuration.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let yaml_path = dir.join(CONFIG_FILE);
        if yaml_path.is_file() {
            let s = read(&yaml_path)?;
            debug!(path = %yaml_path.display(), "loading lint configuration");
            // An empty document decodes as null.
            if s.trim().is_empty() {
                return Ok(Self::default());
            }
            return serde_yaml::from_str(&s).map_err(|source| ConfigError::Yaml {
                path: yaml_path,
                source,
            });
        }
        let toml_path = dir.join(CONFIG_FILE_TOML);
        if toml_path.is_file() {
            let s = read(&toml_path)?;
            debug!(path = %toml_path.display(), "loading lint configuration");
            return toml::from_str(&s).map_err(|source| ConfigError::Toml {
                path: toml_path,
                source,
            });
        }
        debug!(dir = %dir.display(), "no lint configuration found");
        Ok(Self::default())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn add_to(
    map: &mut HashMap<String, Option<ConfigurationRuleEntries>>,
    rule: &str,
    entry: Option<ConfigurationEntry>,
) {
    let slot = map.entry(rule.to_string()).or_insert(None);
    if let Some(entry) = entry {
        slot.get_or_insert_with(Default::default).add_entry(entry);
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn set(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn non_empty<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(de)?;
    Ok(s.filter(|s| !s.is_empty()))
}

/// Accepts `targetIdx: 3`, `targetIdx: "3"`, and `targetIdx: ""` (unset).
fn target_idx<'de, D>(de: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(usize),
        Str(String),
    }

    match Option::<Raw>::deserialize(de)? {
        None => Ok(None),
        Some(Raw::Int(i)) => Ok(Some(i)),
        Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid targetIdx '{}'", s))),
    }
}

#[derive(Debug, Clone)]
/// Fully-resolved settings for a CLI run.
pub struct Effective {
    pub output: String,
    pub strict: bool,
    pub verbose: bool,
    /// Directory to read the lint configuration from instead of each
    /// dashboard's own directory.
    pub config_dir: Option<PathBuf>,
}

/// Resolve `Effective` from CLI flags and defaults.
pub fn resolve_effective(
    cli_output: Option<&str>,
    cli_strict: bool,
    cli_verbose: bool,
    cli_config: Option<&str>,
) -> Effective {
    Effective {
        output: cli_output
            .map(|s| s.to_string())
            .unwrap_or_else(|| "human".to_string()),
        strict: cli_strict,
        verbose: cli_verbose,
        config_dir: cli_config.map(PathBuf::from),
    }
}

impl Effective {
    /// Directory whose configuration applies to the dashboard at `path`.
    pub fn config_dir_for(&self, path: &Path) -> PathBuf {
        match &self.config_dir {
            Some(dir) => dir.clone(),
            None => match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    /// Lowest severity that makes the run fail.
    pub fn failure_threshold(&self) -> Severity {
        if self.strict {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}
