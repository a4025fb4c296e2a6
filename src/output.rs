//! Output rendering for lint results.
//!
//! Supports `human` (default) and `json` outputs. The human form prints one
//! `[symbol] message` line per result, grouped under each rule's
//! description. Results with the `Quiet` severity are never printed.

use crate::models::{ResultContext, Severity};
use crate::results::ResultSet;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// One report line for `ctx`, or `None` when its severity is silent.
pub fn format_result_line(ctx: &ResultContext, color: bool) -> Option<String> {
    let sym = ctx.result.severity.symbol()?;
    let msg = &ctx.result.message;
    let msg = if !color {
        msg.clone()
    } else {
        match ctx.result.severity {
            Severity::Error => msg.red().to_string(),
            Severity::Warning => msg.yellow().to_string(),
            Severity::Exclude => msg.bright_black().to_string(),
            _ => msg.clone(),
        }
    };
    Some(format!("[{}] {}", sym, msg))
}

/// Compose the grouped human report (pure) for testing purposes.
///
/// Rules appear in name order; results within a rule are ordered by
/// dashboard title. Passing results are shown only when `verbose` is set,
/// and a rule with nothing to show is skipped.
pub fn compose_report(rs: &ResultSet, verbose: bool, color: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for group in rs.by_rule().into_values() {
        let body: Vec<String> = group
            .iter()
            .filter(|r| verbose || r.result.severity != Severity::Success)
            .filter_map(|r| format_result_line(r, color))
            .collect();
        if body.is_empty() {
            continue;
        }
        let header = group[0].rule.description();
        if color {
            lines.push(header.bold().to_string());
        } else {
            lines.push(header.to_string());
        }
        lines.extend(body);
    }
    lines
}

fn summary_line(rs: &ResultSet) -> String {
    let counts = rs.counts();
    let n = |s: Severity| counts.get(&s).copied().unwrap_or(0);
    format!(
        "— Summary — errors={} warnings={} excluded={} ok={}",
        n(Severity::Error),
        n(Severity::Warning),
        n(Severity::Exclude),
        n(Severity::Success)
    )
}

/// Print lint results in the requested format.
pub fn print_lint(rs: &ResultSet, output: &str, verbose: bool) {
    match output {
        "json" => match serde_json::to_string_pretty(&compose_lint_json(rs)) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("{} {}", crate::utils::error_prefix(), e),
        },
        _ => {
            let color = use_colors(output);
            for line in compose_report(rs, verbose, color) {
                println!("{}", line);
            }
            let summary = summary_line(rs);
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

/// Compose lint JSON object (pure) for testing/snapshot purposes.
pub fn compose_lint_json(rs: &ResultSet) -> JsonVal {
    let rules: Vec<JsonVal> = rs
        .by_rule()
        .into_iter()
        .map(|(name, group)| {
            let results: Vec<JsonVal> = group
                .iter()
                .filter(|r| r.result.severity != Severity::Quiet)
                .map(|r| {
                    json!({
                        "severity": r.result.severity,
                        "message": r.result.message,
                        "dashboard": r.dashboard.map(|d| d.title.as_str()),
                        "panel": r.panel.map(|p| p.title.as_str()),
                        "target": r.target.map(|t| t.idx),
                    })
                })
                .collect();
            json!({
                "rule": name,
                "description": group[0].rule.description(),
                "results": results,
            })
        })
        .collect();
    let counts = rs.counts();
    let n = |s: Severity| counts.get(&s).copied().unwrap_or(0);
    json!({
        "rules": rules,
        "summary": {
            "errors": n(Severity::Error),
            "warnings": n(Severity::Warning),
            "excluded": n(Severity::Exclude),
            "ok": n(Severity::Success),
            "maximum": rs.maximum_severity(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dashboard, LintResult, Panel};
    use crate::rules::{PanelDatasourceRule, TemplateJobRule};

    fn dashboards() -> Vec<Dashboard> {
        ["b", "a"]
            .iter()
            .map(|t| Dashboard {
                title: t.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_result_line_symbols() {
        let cases = [
            (Severity::Success, Some("[✔️] m")),
            (Severity::Exclude, Some("[➖] m")),
            (Severity::Warning, Some("[⚠️] m")),
            (Severity::Error, Some("[❌] m")),
            (Severity::Quiet, None),
        ];
        for (severity, want) in cases {
            let ctx = ResultContext::new(
                &TemplateJobRule,
                LintResult {
                    severity,
                    message: "m".into(),
                },
            );
            assert_eq!(format_result_line(&ctx, false).as_deref(), want);
        }
    }

    #[test]
    fn test_compose_report_groups_and_orders() {
        let ds = dashboards();
        let panel = Panel::new("p", "graph");
        let mut rs = ResultSet::new();
        rs.add_result(
            ResultContext::new(&TemplateJobRule, LintResult::error("job b")).with_dashboard(&ds[0]),
        );
        rs.add_result(
            ResultContext::new(&PanelDatasourceRule, LintResult::ok())
                .with_dashboard(&ds[0])
                .with_panel(&panel),
        );
        rs.add_result(
            ResultContext::new(&TemplateJobRule, LintResult::error("job a")).with_dashboard(&ds[1]),
        );

        let lines = compose_report(&rs, false, false);
        assert_eq!(
            lines,
            vec![
                "Checks that the dashboard has a templated job.",
                "[❌] job a",
                "[❌] job b",
            ]
        );

        let verbose = compose_report(&rs, true, false);
        assert_eq!(verbose.len(), 5);
        assert_eq!(verbose[0], "Checks that each panel uses the templated datasource.");
        assert_eq!(verbose[1], "[✔️] OK");
    }

    #[test]
    fn test_compose_lint_json_shape() {
        let ds = dashboards();
        let mut panel = Panel::new("p", "graph");
        panel.push_target("up");
        let mut rs = ResultSet::new();
        rs.add_result(
            ResultContext::new(&PanelDatasourceRule, LintResult::error("bad"))
                .with_dashboard(&ds[1])
                .with_panel(&panel)
                .with_target(&panel.targets[0]),
        );
        rs.add_result(
            ResultContext::new(
                &TemplateJobRule,
                LintResult {
                    severity: Severity::Quiet,
                    message: "hidden".into(),
                },
            )
            .with_dashboard(&ds[0]),
        );
        let out = compose_lint_json(&rs);
        assert_eq!(out["summary"]["errors"], 1);
        assert_eq!(out["summary"]["maximum"], "error");
        assert_eq!(out["rules"][0]["rule"], "panel-datasource-rule");
        assert_eq!(out["rules"][0]["results"][0]["dashboard"], "a");
        assert_eq!(out["rules"][0]["results"][0]["target"], 0);
        assert_eq!(out["rules"][1]["results"].as_array().unwrap().len(), 0);
    }
}
