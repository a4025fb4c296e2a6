//! Lint rules.
//!
//! Every rule has a stable `name` (the key used by exclusion and warning
//! configuration, so it must never change) and a human `description` used as
//! the report section header. A rule declares the scope it evaluates at and
//! implements the matching entry point; each evaluation returns exactly one
//! `LintResult`.
//!
//! Rules fail open: input they do not understand (an unparsable query, a
//! dashboard for another backend) passes.

mod panel_datasource;
mod panel_job_instance;
mod template_datasource;
mod template_instance;
mod template_job;

pub use panel_datasource::PanelDatasourceRule;
pub use panel_job_instance::PanelJobInstanceRule;
pub use template_datasource::TemplateDatasourceRule;
pub use template_instance::TemplateInstanceRule;
pub use template_job::TemplateJobRule;

use crate::models::{Dashboard, LintResult, Panel, Target};

/// Query marker of a datasource template that points at Prometheus.
pub const PROMETHEUS: &str = "prometheus";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Granularity at which a rule is evaluated.
pub enum Scope {
    Dashboard,
    Panel,
    Target,
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn scope(&self) -> Scope;

    fn lint_dashboard(&self, _dashboard: &Dashboard) -> LintResult {
        LintResult::ok()
    }

    fn lint_panel(&self, _dashboard: &Dashboard, _panel: &Panel) -> LintResult {
        LintResult::ok()
    }

    fn lint_target(&self, _dashboard: &Dashboard, _panel: &Panel, _target: &Target) -> LintResult {
        LintResult::ok()
    }
}

/// The built-in rule set, in report order.
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(TemplateDatasourceRule),
        Box::new(TemplateJobRule),
        Box::new(TemplateInstanceRule),
        Box::new(PanelDatasourceRule),
        Box::new(PanelJobInstanceRule),
    ]
}

/// Whether `ds` names the shared datasource template variable.
pub(crate) fn is_datasource_variable(ds: &str) -> bool {
    ds == "$datasource" || ds == "${datasource}"
}

/// True when the dashboard carries a datasource template selecting
/// Prometheus; template rules do not apply otherwise.
pub(crate) fn uses_prometheus_template(dashboard: &Dashboard) -> bool {
    dashboard
        .datasource_template()
        .is_some_and(|t| t.query == PROMETHEUS)
}

/// Checks that the template variable `name` exists and is a Prometheus
/// query variable bound to the shared datasource and labelled `name`.
/// Checks run in a fixed order and the first failure wins.
pub(crate) fn check_query_template(dashboard: &Dashboard, name: &str) -> LintResult {
    let Some(t) = dashboard.template(name) else {
        return LintResult::error(format!(
            "Dashboard '{}' is missing the {} template",
            dashboard.title, name
        ));
    };
    if !is_datasource_variable(&t.datasource) {
        return LintResult::error(format!(
            "Dashboard '{}' {} template should use datasource '$datasource'",
            dashboard.title, name
        ));
    }
    if t.kind != "query" {
        return LintResult::error(format!(
            "Dashboard '{}' {} template should be a Prometheus query",
            dashboard.title, name
        ));
    }
    if t.label != name {
        return LintResult::error(format!(
            "Dashboard '{}' {} template should be a labelled '{}'",
            dashboard.title, name, name
        ));
    }
    LintResult::ok()
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_rule_names_are_unique() {
        let rules = builtin_rules();
        let names: HashSet<&str> = rules.iter().map(|r| r.name()).collect();
        assert_eq!(names.len(), rules.len());
        assert!(names.contains("template-job-rule"));
        assert!(names.contains("panel-job-instance-rule"));
    }

    #[test]
    fn test_datasource_variable_forms() {
        assert!(is_datasource_variable("$datasource"));
        assert!(is_datasource_variable("${datasource}"));
        assert!(!is_datasource_variable("prometheus"));
    }
}
