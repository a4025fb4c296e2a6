//! Shared data models: the dashboard schema and lint verdicts.

pub mod dashboard;
pub mod result;

pub use dashboard::{Dashboard, Panel, Row, Target, Template, Templating};
pub use result::{LintResult, ResultContext, Severity};
