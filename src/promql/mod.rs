//! Query selector validation for embedded metric queries.
//!
//! Parses just enough of the query language to enumerate series selectors
//! and their label matchers. Queries are never evaluated.
//!
//! A parse failure is reported as `ParseError`; rules treat it as "not
//! applicable" rather than as a violation.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, LabelMatcher, MatchOp, VectorSelector};
pub use parser::parse;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at char {pos}: {message}")]
pub struct ParseError {
    pub pos: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(pos: usize, message: impl Into<String>) -> Self {
        ParseError {
            pos,
            message: message.into(),
        }
    }
}

/// Parses `query` and returns every selector in traversal order.
pub fn parse_selectors(query: &str) -> Result<Vec<VectorSelector>, ParseError> {
    let expr = parse(query)?;
    Ok(expr.selectors().into_iter().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selectors_reports_each_selector() {
        let selectors =
            parse_selectors(r#"rate(a{job="x"}[5m]) / ignoring(instance) b{instance=~"y"}"#)
                .unwrap();
        assert_eq!(selectors.len(), 2);
        assert!(selectors[0].has_matcher("job"));
        assert!(!selectors[0].has_matcher("instance"));
        assert_eq!(selectors[1].matcher("instance").unwrap().op, MatchOp::Regex);
    }

    #[test]
    fn test_parse_error_is_distinct_from_missing_label() {
        assert!(parse_selectors("foo(bar.baz)").is_err());
        let ok = parse_selectors("sum(rate(foo[5m]))").unwrap();
        assert!(!ok[0].has_matcher("job"));
    }

    #[test]
    fn test_aggregate_operand_precedes_parameter() {
        let names: Vec<Option<String>> = parse_selectors("topk(scalar(a), b)")
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec![Some("b".into()), Some("a".into())]);
    }

    #[test]
    fn test_matchop_display() {
        assert_eq!(MatchOp::Equal.to_string(), "=");
        assert_eq!(MatchOp::Regex.to_string(), "=~");
        assert_eq!(MatchOp::NotRegex.to_string(), "!~");
    }
}
