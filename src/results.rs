//! Accumulator of lint verdicts.

use crate::config::ConfigurationFile;
use crate::models::{ResultContext, Severity};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
/// Ordered results of a lint run plus the configuration applied to them.
///
/// The configuration may be attached before or after results are added;
/// the final severities are the same either way.
pub struct ResultSet<'a> {
    results: Vec<ResultContext<'a>>,
    config: Option<ConfigurationFile>,
}

impl<'a> ResultSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `config` and re-applies it to every result already present.
    pub fn configure(&mut self, config: ConfigurationFile) {
        let results = std::mem::take(&mut self.results);
        self.results = results.into_iter().map(|r| config.apply(r)).collect();
        self.config = Some(config);
    }

    /// Appends a result, applying the attached configuration if any.
    pub fn add_result(&mut self, ctx: ResultContext<'a>) {
        let ctx = match &self.config {
            Some(config) => config.apply(ctx),
            None => ctx,
        };
        self.results.push(ctx);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ResultContext<'a>>) {
        for r in results {
            self.add_result(r);
        }
    }

    pub fn results(&self) -> &[ResultContext<'a>] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Worst severity present; `Success` when empty.
    pub fn maximum_severity(&self) -> Severity {
        self.results
            .iter()
            .map(|r| r.result.severity)
            .max()
            .unwrap_or(Severity::Success)
    }

    /// Results grouped by rule name. Each group is stably sorted by
    /// dashboard title, so ties keep insertion order.
    pub fn by_rule(&self) -> BTreeMap<&'a str, Vec<ResultContext<'a>>> {
        let mut out: BTreeMap<&'a str, Vec<ResultContext<'a>>> = BTreeMap::new();
        for r in &self.results {
            out.entry(r.rule.name()).or_default().push(r.clone());
        }
        for group in out.values_mut() {
            group.sort_by(|a, b| a.dashboard_title().cmp(b.dashboard_title()));
        }
        out
    }

    /// Number of results per severity.
    pub fn counts(&self) -> BTreeMap<Severity, usize> {
        let mut out = BTreeMap::new();
        for r in &self.results {
            *out.entry(r.result.severity).or_insert(0) += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dashboard, LintResult};
    use crate::rules::{Rule, Scope};

    struct TestRule(&'static str);

    impl Rule for TestRule {
        fn name(&self) -> &'static str {
            self.0
        }
        fn description(&self) -> &'static str {
            "Test Rule"
        }
        fn scope(&self) -> Scope {
            Scope::Dashboard
        }
    }

    static RULE1: TestRule = TestRule("rule1");
    static RULE2: TestRule = TestRule("rule2");

    fn result(severity: Severity, message: &str) -> LintResult {
        LintResult {
            severity,
            message: message.into(),
        }
    }

    fn dashboards(titles: &[&str]) -> Vec<Dashboard> {
        titles
            .iter()
            .map(|t| Dashboard {
                title: t.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_maximum_severity() {
        let mut rs = ResultSet::new();
        assert_eq!(rs.maximum_severity(), Severity::Success);
        rs.add_result(ResultContext::new(&RULE1, result(Severity::Success, "OK")));
        rs.add_result(ResultContext::new(&RULE1, result(Severity::Warning, "w")));
        rs.add_result(ResultContext::new(&RULE1, result(Severity::Error, "e")));
        rs.add_result(ResultContext::new(&RULE1, result(Severity::Exclude, "x")));
        assert_eq!(rs.maximum_severity(), Severity::Error);
    }

    #[test]
    fn test_maximum_severity_ignores_order() {
        let sets = [
            vec![Severity::Exclude, Severity::Success],
            vec![Severity::Success, Severity::Warning, Severity::Exclude],
            vec![Severity::Error, Severity::Warning],
        ];
        for sevs in sets {
            let mut rs = ResultSet::new();
            for s in &sevs {
                rs.add_result(ResultContext::new(&RULE1, result(*s, "m")));
            }
            assert_eq!(rs.maximum_severity(), *sevs.iter().max().unwrap());
        }
    }

    #[test]
    fn test_by_rule() {
        let mut rs = ResultSet::new();
        rs.add_result(ResultContext::new(&RULE1, LintResult::ok()));
        rs.add_result(ResultContext::new(&RULE2, LintResult::ok()));
        let by_rule = rs.by_rule();
        assert_eq!(by_rule.len(), 2);
        assert_eq!(by_rule["rule1"].len(), 1);
        assert_eq!(by_rule["rule2"].len(), 1);
    }

    #[test]
    fn test_by_rule_is_stably_sorted_by_dashboard() {
        let ds = dashboards(&["b", "a", "b", "a"]);
        let mut rs = ResultSet::new();
        for (i, d) in ds.iter().enumerate() {
            rs.add_result(
                ResultContext::new(&RULE1, result(Severity::Error, &i.to_string()))
                    .with_dashboard(d),
            );
        }
        let got: Vec<String> = rs.by_rule()["rule1"]
            .iter()
            .map(|r| format!("{}{}", r.dashboard_title(), r.result.message))
            .collect();
        assert_eq!(got, vec!["a1", "a3", "b0", "b2"]);
    }

    #[test]
    fn test_config_before_results() {
        let mut c = ConfigurationFile::new();
        c.add_exclusion("rule1", None);
        let mut rs = ResultSet::new();
        rs.configure(c);
        rs.add_result(ResultContext::new(&RULE1, LintResult::error("foo")));
        assert_eq!(rs.maximum_severity(), Severity::Exclude);
        assert_eq!(rs.by_rule()["rule1"][0].result.severity, Severity::Exclude);
    }

    #[test]
    fn test_config_after_results() {
        let mut c = ConfigurationFile::new();
        c.add_exclusion("rule1", None);
        let mut rs = ResultSet::new();
        rs.add_result(ResultContext::new(&RULE1, LintResult::error("foo")));
        rs.configure(c);
        assert_eq!(rs.maximum_severity(), Severity::Exclude);
        assert_eq!(rs.by_rule()["rule1"][0].result.severity, Severity::Exclude);
    }

    #[test]
    fn test_configuration_commutes_with_insertion() {
        let ds = dashboards(&["dash1", "dash2"]);
        let mut c = ConfigurationFile::new();
        c.add_exclusion("rule1", None);
        c.add_warning(
            "rule1",
            Some(crate::config::ConfigurationEntry {
                dashboard: Some("dash2".into()),
                ..Default::default()
            }),
        );
        c.add_warning("rule2", None);

        let contexts = || {
            vec![
                ResultContext::new(&RULE1, LintResult::error("a")).with_dashboard(&ds[0]),
                ResultContext::new(&RULE1, LintResult::error("b")).with_dashboard(&ds[1]),
                ResultContext::new(&RULE2, LintResult::error("c")).with_dashboard(&ds[0]),
                ResultContext::new(&RULE2, LintResult::ok()).with_dashboard(&ds[1]),
            ]
        };

        let mut before = ResultSet::new();
        before.configure(c.clone());
        before.extend(contexts());

        let mut after = ResultSet::new();
        after.extend(contexts());
        after.configure(c.clone());

        // Re-attaching must not stack overrides either.
        after.configure(c);

        let a: Vec<&LintResult> = before.results().iter().map(|r| &r.result).collect();
        let b: Vec<&LintResult> = after.results().iter().map(|r| &r.result).collect();
        assert_eq!(a, b);
        assert_eq!(a[0].severity, Severity::Exclude);
        assert_eq!(a[1].severity, Severity::Warning);
        assert_eq!(a[1].message, "b (Excluded)");
        assert_eq!(a[2].severity, Severity::Warning);
        assert_eq!(a[3].severity, Severity::Warning);
    }

    #[test]
    fn test_counts() {
        let mut rs = ResultSet::new();
        rs.add_result(ResultContext::new(&RULE1, LintResult::ok()));
        rs.add_result(ResultContext::new(&RULE1, LintResult::error("e")));
        rs.add_result(ResultContext::new(&RULE2, LintResult::error("e")));
        let counts = rs.counts();
        assert_eq!(counts[&Severity::Error], 2);
        assert_eq!(counts[&Severity::Success], 1);
    }
}
