//! Grafana dashboard linter library.
//!
//! Evaluates a set of rules against Grafana dashboards at dashboard, panel
//! and query scope, then rewrites verdict severities from a per-directory
//! `.lint` configuration (exclusions and warnings).
//!
//! High-level modules:
//! - `models`: dashboard schema and verdict types.
//! - `promql`: query parser used to enumerate vector selectors.
//! - `rules`: the `Rule` trait and the built-in rules.
//! - `config`: lint configuration loading and severity resolution.
//! - `results`: ordered, configurable collection of verdicts.
//! - `lint`: evaluation driver.
//! - `output`: human/JSON reports.
//! - `load`: dashboard file loading and path expansion.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `utils`: supporting helpers.
pub mod cli;
pub mod config;
pub mod lint;
pub mod load;
pub mod models;
pub mod output;
pub mod promql;
pub mod results;
pub mod rules;
pub mod utils;
