use crate::models::{Dashboard, LintResult};
use crate::rules::{Rule, Scope};

/// Dashboards must let viewers pick the data source through a template
/// variable named `datasource`.
pub struct TemplateDatasourceRule;

impl Rule for TemplateDatasourceRule {
    fn name(&self) -> &'static str {
        "template-datasource-rule"
    }

    fn description(&self) -> &'static str {
        "Checks that the dashboard has a templated datasource."
    }

    fn scope(&self) -> Scope {
        Scope::Dashboard
    }

    fn lint_dashboard(&self, dashboard: &Dashboard) -> LintResult {
        let Some(t) = dashboard.datasource_template() else {
            return LintResult::error(format!(
                "Dashboard '{}' does not have a templated data source",
                dashboard.title
            ));
        };
        if t.name != "datasource" {
            return LintResult::error(format!(
                "Dashboard '{}' templated data source variable named '{}', should be named 'datasource'",
                dashboard.title, t.name
            ));
        }
        if t.label != "Data Source" {
            return LintResult::error(format!(
                "Dashboard '{}' templated data source variable labeled '{}', should be labeled 'Data Source'",
                dashboard.title, t.label
            ));
        }
        LintResult::ok()
    }
}
