//! Recursive-descent parser producing an `Expr` tree.
//!
//! Binary operators are handled by precedence climbing. Postfix forms
//! (`[range]`, `[range:step]`, `offset`, `@`) are applied after each primary
//! expression.

use crate::promql::ast::{
    BinaryOp, Expr, GroupSide, LabelMatcher, MatchOp, VectorMatching, VectorSelector,
};
use crate::promql::lexer::{tokenize, Spanned, Token};
use crate::promql::ParseError;
use regex::Regex;

const AGGREGATIONS: &[&str] = &[
    "sum",
    "avg",
    "count",
    "min",
    "max",
    "group",
    "stddev",
    "stdvar",
    "topk",
    "bottomk",
    "count_values",
    "quantile",
    "limitk",
    "limit_ratio",
];

const PARAMETERIZED: &[&str] = &[
    "topk",
    "bottomk",
    "count_values",
    "quantile",
    "limitk",
    "limit_ratio",
];

const FUNCTIONS: &[&str] = &[
    "abs",
    "absent",
    "absent_over_time",
    "acos",
    "acosh",
    "asin",
    "asinh",
    "atan",
    "atanh",
    "avg_over_time",
    "ceil",
    "changes",
    "clamp",
    "clamp_max",
    "clamp_min",
    "cos",
    "cosh",
    "count_over_time",
    "day_of_month",
    "day_of_week",
    "day_of_year",
    "days_in_month",
    "deg",
    "delta",
    "deriv",
    "double_exponential_smoothing",
    "exp",
    "floor",
    "histogram_avg",
    "histogram_count",
    "histogram_fraction",
    "histogram_quantile",
    "histogram_stddev",
    "histogram_stdvar",
    "histogram_sum",
    "holt_winters",
    "hour",
    "idelta",
    "increase",
    "irate",
    "label_join",
    "label_replace",
    "last_over_time",
    "ln",
    "log10",
    "log2",
    "mad_over_time",
    "max_over_time",
    "min_over_time",
    "minute",
    "month",
    "pi",
    "predict_linear",
    "present_over_time",
    "quantile_over_time",
    "rad",
    "rate",
    "resets",
    "round",
    "scalar",
    "sgn",
    "sin",
    "sinh",
    "sort",
    "sort_by_label",
    "sort_by_label_desc",
    "sort_desc",
    "sqrt",
    "stddev_over_time",
    "stdvar_over_time",
    "sum_over_time",
    "tan",
    "tanh",
    "time",
    "timestamp",
    "vector",
    "year",
];

/// Deepest nesting of parentheses, unary and binary operators, calls and
/// aggregations accepted before the query is rejected.
const MAX_DEPTH: usize = 128;

const KEYWORDS: &[&str] = &[
    "and",
    "or",
    "unless",
    "atan2",
    "by",
    "without",
    "on",
    "ignoring",
    "group_left",
    "group_right",
    "bool",
    "offset",
];

/// Parses a complete query.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut p = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = p.parse_expr(0)?;
    match p.peek() {
        Token::Eof => Ok(expr),
        other => Err(p.error(format!("unexpected {:?} after expression", other))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        // The token stream always ends with Eof.
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let idx = self.pos.min(self.tokens.len() - 1);
        ParseError::new(self.tokens[idx].pos, message)
    }

    /// Runs `f` one nesting level deeper, failing past `MAX_DEPTH`.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("query nested too deeply"));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn expect(&mut self, want: Token) -> Result<(), ParseError> {
        if *self.peek() == want {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", want, self.peek())))
        }
    }

    fn peek_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == word)
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if self.peek_ident(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_duration(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Duration(d) => Ok(d),
            other => Err(self.error(format!("expected duration, found {:?}", other))),
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        // Each operator in a chain nests the tree one level deeper.
        let mut chain = 0;
        while let Some(op) = self.peek_binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            chain += 1;
            if self.depth + chain > MAX_DEPTH {
                return Err(self.error("query nested too deeply"));
            }
            self.advance();
            let return_bool = self.eat_ident("bool");
            if return_bool && !op.is_comparison() {
                return Err(self.error("bool modifier can only be used on comparison operators"));
            }
            let matching = self.parse_vector_matching()?;
            let next_min = if op.is_right_assoc() { prec } else { prec + 1 };
            let rhs = self.nested(|p| p.parse_expr(next_min))?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                return_bool,
                matching,
            };
        }
        Ok(lhs)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let op = match self.peek() {
            Token::Add => BinaryOp::Add,
            Token::Sub => BinaryOp::Sub,
            Token::Mul => BinaryOp::Mul,
            Token::Div => BinaryOp::Div,
            Token::Mod => BinaryOp::Mod,
            Token::Pow => BinaryOp::Pow,
            Token::Eql => BinaryOp::Eql,
            Token::Neq => BinaryOp::Neq,
            Token::Lss => BinaryOp::Lss,
            Token::Lte => BinaryOp::Lte,
            Token::Gtr => BinaryOp::Gtr,
            Token::Gte => BinaryOp::Gte,
            Token::Ident(s) => match s.as_str() {
                "and" => BinaryOp::And,
                "or" => BinaryOp::Or,
                "unless" => BinaryOp::Unless,
                "atan2" => BinaryOp::Atan2,
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }

    fn parse_vector_matching(&mut self) -> Result<Option<VectorMatching>, ParseError> {
        let on = if self.eat_ident("on") {
            true
        } else if self.eat_ident("ignoring") {
            false
        } else {
            return Ok(None);
        };
        let labels = self.parse_label_list()?;
        let side = if self.eat_ident("group_left") {
            Some(GroupSide::Left)
        } else if self.eat_ident("group_right") {
            Some(GroupSide::Right)
        } else {
            None
        };
        let group = match side {
            Some(side) => {
                let include = if *self.peek() == Token::LParen {
                    self.parse_label_list()?
                } else {
                    Vec::new()
                };
                Some((side, include))
            }
            None => None,
        };
        Ok(Some(VectorMatching { on, labels, group }))
    }

    fn parse_label_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(Token::LParen)?;
        let mut labels = Vec::new();
        loop {
            match self.advance() {
                Token::RParen => break,
                Token::Ident(name) => {
                    labels.push(name);
                    match self.advance() {
                        Token::Comma => continue,
                        Token::RParen => break,
                        other => {
                            return Err(self.error(format!(
                                "unexpected {:?} in grouping opts",
                                other
                            )))
                        }
                    }
                }
                other => {
                    return Err(self.error(format!("unexpected {:?} in grouping opts", other)))
                }
            }
        }
        Ok(labels)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Token::Sub | Token::Add => {
                let negate = self.advance() == Token::Sub;
                // Unary operators bind tighter than everything but `^`.
                let expr = self.nested(|p| p.parse_expr(BinaryOp::Pow.precedence()))?;
                Ok(Expr::Unary {
                    negate,
                    expr: Box::new(expr),
                })
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::String(s)),
            Token::LParen => {
                let inner = self.nested(|p| p.parse_expr(0))?;
                self.expect(Token::RParen)?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            Token::LBrace => {
                let selector = VectorSelector {
                    matchers: self.parse_matchers()?,
                    ..Default::default()
                };
                self.check_selector(&selector)?;
                Ok(Expr::Vector(selector))
            }
            Token::Ident(name) => self.parse_ident(name),
            other => Err(self.error(format!("unexpected {:?}", other))),
        }
    }

    fn parse_ident(&mut self, name: String) -> Result<Expr, ParseError> {
        let next = self.peek().clone();
        if AGGREGATIONS.contains(&name.as_str())
            && (next == Token::LParen || self.peek_ident("by") || self.peek_ident("without"))
        {
            return self.parse_aggregate(name);
        }
        if next == Token::LParen {
            if !FUNCTIONS.contains(&name.as_str()) {
                return Err(self.error(format!("unknown function with name \"{}\"", name)));
            }
            let args = self.parse_args()?;
            return Ok(Expr::Call { func: name, args });
        }
        let lower = name.to_ascii_lowercase();
        if (lower == "inf" || lower == "nan") && next != Token::LBrace {
            return Ok(Expr::Number(if lower == "inf" {
                f64::INFINITY
            } else {
                f64::NAN
            }));
        }
        if KEYWORDS.contains(&name.as_str()) {
            return Err(self.error(format!("unexpected keyword \"{}\"", name)));
        }
        let matchers = if next == Token::LBrace {
            self.advance();
            self.parse_matchers()?
        } else {
            Vec::new()
        };
        Ok(Expr::Vector(VectorSelector {
            name: Some(name),
            matchers,
            ..Default::default()
        }))
    }

    fn parse_aggregate(&mut self, op: String) -> Result<Expr, ParseError> {
        let mut grouping = Vec::new();
        let mut without = false;
        let mut grouped = false;
        if self.peek_ident("by") || self.peek_ident("without") {
            without = self.advance() == Token::Ident("without".into());
            grouping = self.parse_label_list()?;
            grouped = true;
        }
        let mut args = self.parse_args()?;
        if !grouped && (self.peek_ident("by") || self.peek_ident("without")) {
            without = self.advance() == Token::Ident("without".into());
            grouping = self.parse_label_list()?;
        }
        let want = if PARAMETERIZED.contains(&op.as_str()) { 2 } else { 1 };
        if args.len() != want {
            return Err(self.error(format!(
                "wrong number of arguments for aggregate expression provided, expected {}, got {}",
                want,
                args.len()
            )));
        }
        let expr = args.pop().map(Box::new).ok_or_else(|| self.error("missing argument"))?;
        let param = args.pop().map(Box::new);
        Ok(Expr::Aggregate {
            op,
            expr,
            param,
            grouping,
            without,
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if *self.peek() == Token::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.nested(|p| p.parse_expr(0))?);
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => break,
                other => {
                    return Err(self.error(format!("unexpected {:?} in argument list", other)))
                }
            }
        }
        Ok(args)
    }

    fn parse_matchers(&mut self) -> Result<Vec<LabelMatcher>, ParseError> {
        let mut matchers = Vec::new();
        loop {
            let name = match self.advance() {
                Token::RBrace => break,
                Token::Ident(name) => name,
                other => {
                    return Err(self.error(format!("unexpected {:?} in label matching", other)))
                }
            };
            let op = match self.advance() {
                Token::Assign => MatchOp::Equal,
                Token::Neq => MatchOp::NotEqual,
                Token::EqlRegex => MatchOp::Regex,
                Token::NeqRegex => MatchOp::NotRegex,
                other => {
                    return Err(self.error(format!(
                        "unexpected {:?} in label matching, expected label matching operator",
                        other
                    )))
                }
            };
            let value = match self.advance() {
                Token::Str(s) => s,
                other => {
                    return Err(self.error(format!(
                        "unexpected {:?} in label matching, expected string",
                        other
                    )))
                }
            };
            matchers.push(LabelMatcher { name, op, value });
            match self.advance() {
                Token::Comma => continue,
                Token::RBrace => break,
                other => {
                    return Err(self.error(format!("unexpected {:?} in label matching", other)))
                }
            }
        }
        Ok(matchers)
    }

    /// A selector without a metric name needs at least one matcher that
    /// does not match the empty string.
    fn check_selector(&self, selector: &VectorSelector) -> Result<(), ParseError> {
        if selector.name.is_some() || selector.matchers.iter().any(|m| !matches_empty(m)) {
            Ok(())
        } else {
            Err(self.error("vector selector must contain at least one non-empty matcher"))
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            match self.peek() {
                Token::LBracket => {
                    self.advance();
                    let range = self.expect_duration()?;
                    if *self.peek() == Token::Colon {
                        self.advance();
                        let step = match self.peek() {
                            Token::Duration(_) => Some(self.expect_duration()?),
                            _ => None,
                        };
                        self.expect(Token::RBracket)?;
                        expr = Expr::Subquery {
                            expr: Box::new(expr),
                            range,
                            step,
                        };
                    } else {
                        self.expect(Token::RBracket)?;
                        expr = match expr {
                            Expr::Vector(selector) => Expr::Matrix { selector, range },
                            _ => {
                                return Err(self.error(
                                    "ranges only allowed for vector selectors",
                                ))
                            }
                        };
                    }
                }
                Token::Ident(s) if s == "offset" => {
                    self.advance();
                    let negative = *self.peek() == Token::Sub;
                    if negative {
                        self.advance();
                    }
                    let d = self.expect_duration()?;
                    let d = if negative { format!("-{}", d) } else { d };
                    if let Some(selector) = selector_mut(&mut expr) {
                        selector.offset = Some(d);
                    }
                }
                Token::At => {
                    self.advance();
                    let at = match self.advance() {
                        Token::Number(n) => n.to_string(),
                        Token::Sub => match self.advance() {
                            Token::Number(n) => format!("-{}", n),
                            other => {
                                return Err(self.error(format!("unexpected {:?} after @", other)))
                            }
                        },
                        Token::Ident(f) if f == "start" || f == "end" => {
                            self.expect(Token::LParen)?;
                            self.expect(Token::RParen)?;
                            format!("{}()", f)
                        }
                        other => {
                            return Err(self.error(format!("unexpected {:?} after @", other)))
                        }
                    };
                    if let Some(selector) = selector_mut(&mut expr) {
                        selector.at = Some(at);
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }
}

fn selector_mut(expr: &mut Expr) -> Option<&mut VectorSelector> {
    match expr {
        Expr::Vector(selector) | Expr::Matrix { selector, .. } => Some(selector),
        _ => None,
    }
}

fn matches_empty(m: &LabelMatcher) -> bool {
    let regex_matches_empty = |v: &str| {
        Regex::new(&format!("^(?:{})$", v))
            .map(|re| re.is_match(""))
            .unwrap_or(false)
    };
    match m.op {
        MatchOp::Equal => m.value.is_empty(),
        MatchOp::NotEqual => !m.value.is_empty(),
        MatchOp::Regex => regex_matches_empty(&m.value),
        MatchOp::NotRegex => !regex_matches_empty(&m.value),
    }
}
