use crate::models::{Dashboard, LintResult, Panel};
use crate::rules::{is_datasource_variable, Rule, Scope};

/// Panel types that issue queries and so must use the templated datasource.
const QUERY_PANELS: &[&str] = &["singlestat", "graph", "table", "timeseries", "stat"];

pub struct PanelDatasourceRule;

impl Rule for PanelDatasourceRule {
    fn name(&self) -> &'static str {
        "panel-datasource-rule"
    }

    fn description(&self) -> &'static str {
        "Checks that each panel uses the templated datasource."
    }

    fn scope(&self) -> Scope {
        Scope::Panel
    }

    fn lint_panel(&self, dashboard: &Dashboard, panel: &Panel) -> LintResult {
        if !QUERY_PANELS.contains(&panel.kind.as_str()) || is_datasource_variable(&panel.datasource)
        {
            return LintResult::ok();
        }
        LintResult::error(format!(
            "Dashboard '{}', panel '{}' does not use templates datasource, uses '{}'",
            dashboard.title, panel.title, panel.datasource
        ))
    }
}
