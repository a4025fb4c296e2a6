//! Lint driver: evaluates every rule at its scope.
//!
//! Dashboard rules run once per dashboard, panel rules once per panel and
//! target rules once per query. Dashboards are independent, so they are
//! evaluated in parallel and their results merged back in input order.

use crate::config::ConfigurationFile;
use crate::models::{Dashboard, ResultContext};
use crate::results::ResultSet;
use crate::rules::{Rule, Scope};
use rayon::prelude::*;
use tracing::debug;

/// Evaluate `rules` against one dashboard.
pub fn lint_dashboard<'a>(
    rules: &'a [Box<dyn Rule>],
    dashboard: &'a Dashboard,
) -> Vec<ResultContext<'a>> {
    let mut out = Vec::new();
    for rule in rules {
        let rule: &'a dyn Rule = rule.as_ref();
        debug!(rule = rule.name(), dashboard = %dashboard.title, "evaluating rule");
        match rule.scope() {
            Scope::Dashboard => {
                let res = rule.lint_dashboard(dashboard);
                out.push(ResultContext::new(rule, res).with_dashboard(dashboard));
            }
            Scope::Panel => {
                for panel in dashboard.all_panels() {
                    let res = rule.lint_panel(dashboard, panel);
                    out.push(
                        ResultContext::new(rule, res)
                            .with_dashboard(dashboard)
                            .with_panel(panel),
                    );
                }
            }
            Scope::Target => {
                for panel in dashboard.all_panels() {
                    for target in &panel.targets {
                        let res = rule.lint_target(dashboard, panel, target);
                        out.push(
                            ResultContext::new(rule, res)
                                .with_dashboard(dashboard)
                                .with_panel(panel)
                                .with_target(target),
                        );
                    }
                }
            }
        }
    }
    out
}

/// Lint many dashboards into one `ResultSet`.
///
/// `config` is attached before results are added; attaching it afterwards
/// would give the same outcome.
pub fn run_lint<'a>(
    rules: &'a [Box<dyn Rule>],
    dashboards: &'a [Dashboard],
    config: Option<ConfigurationFile>,
) -> ResultSet<'a> {
    let per_dashboard: Vec<Vec<ResultContext<'a>>> = dashboards
        .par_iter()
        .map(|d| lint_dashboard(rules, d))
        .collect();

    let mut rs = ResultSet::new();
    if let Some(config) = config {
        rs.configure(config);
    }
    for results in per_dashboard {
        rs.extend(results);
    }
    debug!(
        results = rs.len(),
        maximum = %rs.maximum_severity(),
        "lint finished"
    );
    rs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Panel, Severity};
    use crate::rules::builtin_rules;
    use crate::rules::{PanelJobInstanceRule, TemplateJobRule};

    fn dashboard(title: &str, queries: &[&str]) -> Dashboard {
        let mut d: Dashboard = serde_json::from_str(
            r#"{
                "templating": {"list": [
                    {"name": "datasource", "type": "datasource", "label": "Data Source", "query": "prometheus"},
                    {"name": "job", "type": "query", "label": "job", "datasource": "$datasource"},
                    {"name": "instance", "type": "query", "label": "instance", "datasource": "$datasource"}
                ]}
            }"#,
        )
        .unwrap();
        d.title = title.into();
        let mut p = Panel::new("panel", "graph");
        p.datasource = "$datasource".into();
        for q in queries {
            p.push_target(q);
        }
        d.panels.push(p);
        d
    }

    #[test]
    fn test_scopes_produce_one_result_each() {
        let rules: Vec<Box<dyn Rule>> =
            vec![Box::new(TemplateJobRule), Box::new(PanelJobInstanceRule)];
        let d = dashboard("d", &["up", "down"]);
        let results = lint_dashboard(&rules, &d);
        assert_eq!(results.len(), 3);
        assert!(results[0].panel.is_none());
        assert_eq!(results[1].target.map(|t| t.idx), Some(0));
        assert_eq!(results[2].target.map(|t| t.idx), Some(1));
        assert_eq!(results[2].panel.map(|p| p.title.as_str()), Some("panel"));
    }

    #[test]
    fn test_clean_dashboard_passes_all_builtin_rules() {
        let rules = builtin_rules();
        let ds = vec![dashboard(
            "clean",
            &[r#"sum(rate(http_requests_total{job=~"$job",instance=~"$instance"}[5m]))"#],
        )];
        let rs = run_lint(&rules, &ds, None);
        assert_eq!(rs.maximum_severity(), Severity::Success);
        assert_eq!(rs.len(), rules.len());
    }

    #[test]
    fn test_run_lint_keeps_input_order_and_applies_config() {
        let rules = builtin_rules();
        let ds = vec![
            dashboard("zeta", &["up"]),
            dashboard("alpha", &[r#"up{job=~"$job",instance=~"$instance"}"#, "down"]),
        ];
        let mut config = ConfigurationFile::new();
        config.add_exclusion(
            "panel-job-instance-rule",
            Some(crate::config::ConfigurationEntry {
                dashboard: Some("alpha".into()),
                target_idx: Some(1),
                ..Default::default()
            }),
        );
        let rs = run_lint(&rules, &ds, Some(config));
        assert_eq!(rs.results()[0].dashboard_title(), "zeta");
        assert_eq!(rs.maximum_severity(), Severity::Error);

        let by_rule = rs.by_rule();
        let got: Vec<(&str, Severity)> = by_rule["panel-job-instance-rule"]
            .iter()
            .map(|r| (r.dashboard_title(), r.result.severity))
            .collect();
        assert_eq!(
            got,
            vec![
                ("alpha", Severity::Success),
                ("alpha", Severity::Exclude),
                ("zeta", Severity::Error),
            ]
        );
    }
}
