//! Verdict types: severity scale, rule results and their evaluation context.

use crate::models::dashboard::{Dashboard, Panel, Target};
use crate::rules::Rule;
use serde::Serialize;
use std::fmt;

/// Ordered verdict scale.
///
/// `Quiet` sits between `Exclude` and `Warning`: it only suppresses output
/// and never raises an aggregate to the warning or failing threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Exclude,
    Quiet,
    Warning,
    Error,
}

impl Severity {
    /// Status symbol printed in front of a result line. `None` for `Quiet`.
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            Severity::Success => Some("✔️"),
            Severity::Exclude => Some("➖"),
            Severity::Warning => Some("⚠️"),
            Severity::Error => Some("❌"),
            Severity::Quiet => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Exclude => write!(f, "exclude"),
            Severity::Quiet => write!(f, "quiet"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single rule verdict.
pub struct LintResult {
    pub severity: Severity,
    pub message: String,
}

impl LintResult {
    pub const OK_MESSAGE: &'static str = "OK";

    pub fn ok() -> Self {
        LintResult {
            severity: Severity::Success,
            message: Self::OK_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        LintResult {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// A verdict together with the rule that produced it and the dashboard
/// scope it was evaluated against.
///
/// A missing `panel`/`target` means the rule ran at a broader scope. The
/// references borrow from the dashboards and rules of one lint pass.
#[derive(Clone)]
pub struct ResultContext<'a> {
    pub result: LintResult,
    pub rule: &'a dyn Rule,
    pub dashboard: Option<&'a Dashboard>,
    pub panel: Option<&'a Panel>,
    pub target: Option<&'a Target>,
    evaluated: LintResult,
}

impl<'a> ResultContext<'a> {
    pub fn new(rule: &'a dyn Rule, result: LintResult) -> Self {
        ResultContext {
            evaluated: result.clone(),
            result,
            rule,
            dashboard: None,
            panel: None,
            target: None,
        }
    }

    pub fn with_dashboard(mut self, dashboard: &'a Dashboard) -> Self {
        self.dashboard = Some(dashboard);
        self
    }

    pub fn with_panel(mut self, panel: &'a Panel) -> Self {
        self.panel = Some(panel);
        self
    }

    pub fn with_target(mut self, target: &'a Target) -> Self {
        self.target = Some(target);
        self
    }

    /// The verdict exactly as the rule returned it, before any configuration
    /// override.
    pub fn evaluated(&self) -> &LintResult {
        &self.evaluated
    }

    /// Title of the owning dashboard, empty when the context has none.
    pub fn dashboard_title(&self) -> &'a str {
        self.dashboard.map(|d| d.title.as_str()).unwrap_or("")
    }
}

impl fmt::Debug for ResultContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResultContext")
            .field("rule", &self.rule.name())
            .field("result", &self.result)
            .field("dashboard", &self.dashboard.map(|d| &d.title))
            .field("panel", &self.panel.map(|p| &p.title))
            .field("target", &self.target.map(|t| t.idx))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Success < Severity::Exclude);
        assert!(Severity::Exclude < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Quiet < Severity::Warning);
    }

    #[test]
    fn test_symbols() {
        assert_eq!(Severity::Error.symbol(), Some("❌"));
        assert_eq!(Severity::Exclude.symbol(), Some("➖"));
        assert_eq!(Severity::Quiet.symbol(), None);
    }
}
