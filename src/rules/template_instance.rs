use crate::models::{Dashboard, LintResult};
use crate::rules::{check_query_template, uses_prometheus_template, Rule, Scope};

/// Prometheus dashboards must expose an `instance` query template.
pub struct TemplateInstanceRule;

impl Rule for TemplateInstanceRule {
    fn name(&self) -> &'static str {
        "template-instance-rule"
    }

    fn description(&self) -> &'static str {
        "Checks that the dashboard has a templated instance."
    }

    fn scope(&self) -> Scope {
        Scope::Dashboard
    }

    fn lint_dashboard(&self, dashboard: &Dashboard) -> LintResult {
        if !uses_prometheus_template(dashboard) {
            return LintResult::ok();
        }
        check_query_template(dashboard, "instance")
    }
}
