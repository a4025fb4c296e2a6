//! Dashboard file loading and path expansion for the CLI.

use crate::models::Dashboard;
use glob::glob;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dashboard {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse dashboard {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid path pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("no dashboards match '{0}'")]
    NoMatch(String),
}

/// Reads and decodes a Grafana dashboard JSON file.
pub fn load_dashboard(path: &Path) -> Result<Dashboard, LoadError> {
    let data = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let dashboard: Dashboard = serde_json::from_str(&data).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        title = %dashboard.title,
        panels = dashboard.all_panels().len(),
        "loaded dashboard"
    );
    Ok(dashboard)
}

fn is_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Expands CLI arguments into dashboard paths.
///
/// Plain paths are passed through untouched (a missing file surfaces later as
/// a read error). Glob patterns expand to their matches in sorted order and
/// must match at least one file. Duplicates keep their first position.
pub fn expand_paths(args: &[String]) -> Result<Vec<PathBuf>, LoadError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for arg in args {
        let mut found = Vec::new();
        if is_pattern(arg) {
            let entries = glob(arg).map_err(|source| LoadError::Pattern {
                pattern: arg.clone(),
                source,
            })?;
            for entry in entries.flatten() {
                if entry.is_file() {
                    found.push(entry);
                }
            }
            if found.is_empty() {
                return Err(LoadError::NoMatch(arg.clone()));
            }
        } else {
            found.push(PathBuf::from(arg));
        }
        for p in found {
            if seen.insert(p.clone()) {
                out.push(p);
            }
        }
    }
    Ok(out)
}
