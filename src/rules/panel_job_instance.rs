use crate::models::{Dashboard, LintResult, Panel, Severity, Target};
use crate::promql::{parse_selectors, MatchOp, VectorSelector};
use crate::rules::{Rule, Scope};

/// Every selector of every panel query must filter on the `job` and
/// `instance` template variables with regex matchers.
pub struct PanelJobInstanceRule;

impl Rule for PanelJobInstanceRule {
    fn name(&self) -> &'static str {
        "panel-job-instance-rule"
    }

    fn description(&self) -> &'static str {
        "Checks that every PromQL query has job and instance matchers."
    }

    fn scope(&self) -> Scope {
        Scope::Target
    }

    /// Panel-level verdict: the first failing target, or OK.
    fn lint_panel(&self, dashboard: &Dashboard, panel: &Panel) -> LintResult {
        panel
            .targets
            .iter()
            .map(|t| self.lint_target(dashboard, panel, t))
            .find(|r| r.severity != Severity::Success)
            .unwrap_or_else(LintResult::ok)
    }

    fn lint_target(&self, dashboard: &Dashboard, panel: &Panel, target: &Target) -> LintResult {
        // Queries we cannot parse are not ours to judge.
        let Ok(selectors) = parse_selectors(&target.expr) else {
            return LintResult::ok();
        };
        for selector in &selectors {
            let checked = check_matcher(selector, "job", "$job")
                .and_then(|_| check_matcher(selector, "instance", "$instance"));
            if let Err(reason) = checked {
                return LintResult::error(format!(
                    "Dashboard '{}', panel '{}' invalid PromQL query '{}': {}",
                    dashboard.title, panel.title, target.expr, reason
                ));
            }
        }
        LintResult::ok()
    }
}

fn check_matcher(selector: &VectorSelector, label: &str, value: &str) -> Result<(), String> {
    let Some(m) = selector.matcher(label) else {
        return Err(format!("{} selector not found", label));
    };
    if m.op != MatchOp::Regex {
        return Err(format!("{} selector is {}, not =~", label, m.op));
    }
    if m.value != value {
        return Err(format!("{} selector is {}, not {}", label, m.value, value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testutil::prometheus_dashboard;

    fn lint(expr: &str) -> LintResult {
        let d = prometheus_dashboard("dashboard", vec![]);
        let mut p = Panel::new("panel", "singlestat");
        p.push_target(expr);
        PanelJobInstanceRule.lint_panel(&d, &p)
    }

    #[test]
    fn test_query_table() {
        let cases = [
            (
                r#"sum(rate(foo{job=~"$job",instance=~"$instance"}[5m]))"#,
                None,
            ),
            ("foo(bar.baz)", None),
            (
                "sum(rate(foo[5m]))",
                Some("Dashboard 'dashboard', panel 'panel' invalid PromQL query 'sum(rate(foo[5m]))': job selector not found"),
            ),
            (
                r#"sum(rate(foo{job=~"$job"}[5m]))"#,
                Some(r#"Dashboard 'dashboard', panel 'panel' invalid PromQL query 'sum(rate(foo{job=~"$job"}[5m]))': instance selector not found"#),
            ),
            (
                r#"sum(rate(foo{job="$job",instance="$instance"}[5m]))"#,
                Some(r#"Dashboard 'dashboard', panel 'panel' invalid PromQL query 'sum(rate(foo{job="$job",instance="$instance"}[5m]))': job selector is =, not =~"#),
            ),
            (
                r#"sum(rate(foo{job=~"$instance",instance=~"$job"}[5m]))"#,
                Some(r#"Dashboard 'dashboard', panel 'panel' invalid PromQL query 'sum(rate(foo{job=~"$instance",instance=~"$job"}[5m]))': job selector is $instance, not $job"#),
            ),
        ];
        for (expr, want) in cases {
            let res = lint(expr);
            match want {
                None => assert_eq!(res, LintResult::ok(), "query {}", expr),
                Some(msg) => assert_eq!(res, LintResult::error(msg), "query {}", expr),
            }
        }
    }

    #[test]
    fn test_first_failing_selector_is_reported() {
        let res = lint(r#"a{job=~"$job",instance=~"$instance"} / b{job=~"$job"} / c"#);
        assert_eq!(res.severity, Severity::Error);
        assert!(res.message.ends_with("instance selector not found"));
    }

    #[test]
    fn test_per_target_evaluation() {
        let d = prometheus_dashboard("dashboard", vec![]);
        let mut p = Panel::new("panel", "graph");
        p.push_target(r#"up{job=~"$job",instance=~"$instance"}"#);
        p.push_target("up");
        assert_eq!(
            PanelJobInstanceRule.lint_target(&d, &p, &p.targets[0]),
            LintResult::ok()
        );
        assert_eq!(
            PanelJobInstanceRule.lint_target(&d, &p, &p.targets[1]).severity,
            Severity::Error
        );
        assert_eq!(PanelJobInstanceRule.lint_panel(&d, &p).severity, Severity::Error);
    }

    #[test]
    fn test_deeply_nested_query_passes() {
        let expr = format!("{}up{}", "(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(lint(&expr), LintResult::ok());
    }

    #[test]
    fn test_query_with_invalid_escape_passes() {
        assert_eq!(lint(r#"up{job=~"a\.b"}"#), LintResult::ok());
    }

    #[test]
    fn test_not_regex_operator_is_reported() {
        let res = lint(r#"up{job!~"$job",instance=~"$instance"}"#);
        assert!(res.message.ends_with("job selector is !~, not =~"));
    }
}
