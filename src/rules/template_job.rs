use crate::models::{Dashboard, LintResult};
use crate::rules::{check_query_template, uses_prometheus_template, Rule, Scope};

/// Prometheus dashboards must expose a `job` query template.
pub struct TemplateJobRule;

impl Rule for TemplateJobRule {
    fn name(&self) -> &'static str {
        "template-job-rule"
    }

    fn description(&self) -> &'static str {
        "Checks that the dashboard has a templated job."
    }

    fn scope(&self) -> Scope {
        Scope::Dashboard
    }

    fn lint_dashboard(&self, dashboard: &Dashboard) -> LintResult {
        if !uses_prometheus_template(dashboard) {
            return LintResult::ok();
        }
        check_query_template(dashboard, "job")
    }
}
