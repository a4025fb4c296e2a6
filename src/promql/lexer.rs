//! Tokenizer for the metric query language.

use crate::promql::ParseError;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Duration(String),
    Str(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    At,
    /// `=` inside label matchers.
    Assign,
    EqlRegex,
    NeqRegex,
    Eql,
    Neq,
    Lss,
    Lte,
    Gtr,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[0-9]+(?:ms|[smhdwy]))+$").expect("valid duration pattern")
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Splits `input` into tokens, ending with `Token::Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut out = Vec::new();
    let mut i = 0;
    // Inside `[...]` a bare colon separates subquery range and step.
    let mut bracket_depth = 0usize;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
            continue;
        }

        let peek = chars.get(i + 1).map(|(_, c)| *c);
        let simple = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '[' => {
                bracket_depth += 1;
                Some(Token::LBracket)
            }
            ']' => {
                bracket_depth = bracket_depth.saturating_sub(1);
                Some(Token::RBracket)
            }
            ',' => Some(Token::Comma),
            '@' => Some(Token::At),
            '+' => Some(Token::Add),
            '-' => Some(Token::Sub),
            '*' => Some(Token::Mul),
            '/' => Some(Token::Div),
            '%' => Some(Token::Mod),
            '^' => Some(Token::Pow),
            ':' if bracket_depth > 0 => Some(Token::Colon),
            _ => None,
        };
        if let Some(token) = simple {
            out.push(Spanned { token, pos });
            i += 1;
            continue;
        }

        match c {
            '=' => {
                let (token, len) = match peek {
                    Some('=') => (Token::Eql, 2),
                    Some('~') => (Token::EqlRegex, 2),
                    _ => (Token::Assign, 1),
                };
                out.push(Spanned { token, pos });
                i += len;
            }
            '!' => {
                let token = match peek {
                    Some('=') => Token::Neq,
                    Some('~') => Token::NeqRegex,
                    _ => return Err(ParseError::new(pos, "unexpected character after '!'")),
                };
                out.push(Spanned { token, pos });
                i += 2;
            }
            '<' | '>' => {
                let eq = peek == Some('=');
                let token = match (c, eq) {
                    ('<', true) => Token::Lte,
                    ('<', false) => Token::Lss,
                    (_, true) => Token::Gte,
                    (_, false) => Token::Gtr,
                };
                out.push(Spanned { token, pos });
                i += if eq { 2 } else { 1 };
            }
            '"' | '\'' | '`' => {
                let (s, next) = lex_string(&chars, i)?;
                out.push(Spanned {
                    token: Token::Str(s),
                    pos,
                });
                i = next;
            }
            c if c.is_ascii_digit() || (c == '.' && peek.is_some_and(|p| p.is_ascii_digit())) => {
                let start = i;
                while i < chars.len()
                    && (chars[i].1.is_ascii_alphanumeric()
                        || chars[i].1 == '.'
                        || ((chars[i].1 == '+' || chars[i].1 == '-')
                            && matches!(chars[i - 1].1, 'e' | 'E')
                            && !is_hex(&chars[start..i])))
                {
                    i += 1;
                }
                let end = chars.get(i).map(|(p, _)| *p).unwrap_or(input.len());
                let text = &input[pos..end];
                out.push(Spanned {
                    token: number_or_duration(text, pos)?,
                    pos,
                });
            }
            c if is_ident_start(c) => {
                while i < chars.len() && is_ident_char(chars[i].1) {
                    i += 1;
                }
                let end = chars.get(i).map(|(p, _)| *p).unwrap_or(input.len());
                out.push(Spanned {
                    token: Token::Ident(input[pos..end].to_string()),
                    pos,
                });
            }
            other => {
                return Err(ParseError::new(
                    pos,
                    format!("unexpected character: '{}'", other),
                ))
            }
        }
    }

    out.push(Spanned {
        token: Token::Eof,
        pos: input.len(),
    });
    Ok(out)
}

fn is_hex(chars: &[(usize, char)]) -> bool {
    chars.len() >= 2 && chars[0].1 == '0' && matches!(chars[1].1, 'x' | 'X')
}

fn number_or_duration(text: &str, pos: usize) -> Result<Token, ParseError> {
    if duration_re().is_match(text) {
        return Ok(Token::Duration(text.to_string()));
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|v| Token::Number(v as f64))
            .map_err(|_| ParseError::new(pos, format!("bad number or duration syntax: \"{}\"", text)));
    }
    text.parse::<f64>()
        .map(Token::Number)
        .map_err(|_| ParseError::new(pos, format!("bad number or duration syntax: \"{}\"", text)))
}

fn lex_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), ParseError> {
    let (pos, quote) = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((out, i + 1));
        }
        if c == '\n' && quote != '`' {
            break;
        }
        if c == '\\' && quote != '`' {
            let Some(&(esc_pos, esc)) = chars.get(i + 1) else {
                break;
            };
            let simple = match esc {
                'n' => Some('\n'),
                't' => Some('\t'),
                'r' => Some('\r'),
                '\\' | '"' | '\'' => Some(esc),
                'a' => Some('\u{7}'),
                'b' => Some('\u{8}'),
                'f' => Some('\u{c}'),
                'v' => Some('\u{b}'),
                _ => None,
            };
            if let Some(ch) = simple {
                out.push(ch);
                i += 2;
                continue;
            }
            // Numeric escapes: \xHH, \uHHHH, \UHHHHHHHH and octal \NNN.
            let (radix, len) = match esc {
                'x' => (16, 2),
                'u' => (16, 4),
                'U' => (16, 8),
                '0'..='7' => (8, 3),
                _ => {
                    return Err(ParseError::new(
                        esc_pos,
                        format!("unknown escape sequence '\\{}'", esc),
                    ))
                }
            };
            let first = if radix == 8 { i + 1 } else { i + 2 };
            let digits: String = chars
                .get(first..first + len)
                .map(|ds| ds.iter().map(|(_, c)| *c).collect())
                .unwrap_or_default();
            let ch = u32::from_str_radix(&digits, radix)
                .ok()
                .filter(|_| digits.len() == len && digits.chars().all(|c| c.is_digit(radix)))
                .and_then(char::from_u32)
                .ok_or_else(|| ParseError::new(esc_pos, "invalid escape sequence"))?;
            out.push(ch);
            i = first + len;
            continue;
        }
        out.push(c);
        i += 1;
    }
    Err(ParseError::new(pos, "unterminated quoted string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_selector_tokens() {
        assert_eq!(
            kinds(r#"foo{job=~"$job",instance!="x"}[5m]"#),
            vec![
                Token::Ident("foo".into()),
                Token::LBrace,
                Token::Ident("job".into()),
                Token::EqlRegex,
                Token::Str("$job".into()),
                Token::Comma,
                Token::Ident("instance".into()),
                Token::Neq,
                Token::Str("x".into()),
                Token::RBrace,
                Token::LBracket,
                Token::Duration("5m".into()),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers_and_durations() {
        assert_eq!(kinds("1h30m")[0], Token::Duration("1h30m".into()));
        assert_eq!(kinds("100ms")[0], Token::Duration("100ms".into()));
        assert_eq!(kinds("1.5")[0], Token::Number(1.5));
        assert_eq!(kinds("1e-3")[0], Token::Number(0.001));
        assert_eq!(kinds("0x1f")[0], Token::Number(31.0));
        assert!(tokenize("5mx").is_err());
    }

    #[test]
    fn test_subquery_colon_and_metric_colon() {
        assert_eq!(
            kinds("job:rate5m[1h:5m]"),
            vec![
                Token::Ident("job:rate5m".into()),
                Token::LBracket,
                Token::Duration("1h".into()),
                Token::Colon,
                Token::Duration("5m".into()),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_rejects_foreign_syntax() {
        assert!(tokenize("foo(bar.baz)").is_err());
        assert!(tokenize("rate(foo[$__interval])").is_err());
        assert!(tokenize(r#"foo{job="unterminated}"#).is_err());
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#""a\"b""#)[0], Token::Str("a\"b".into()));
        assert_eq!(kinds(r#""a\\.b""#)[0], Token::Str("a\\.b".into()));
        assert_eq!(kinds(r#""\x41\u00e9\101""#)[0], Token::Str("AéA".into()));
        assert!(tokenize(r#""a\.b""#).is_err());
        assert!(tokenize(r#""\xZ1""#).is_err());
        assert_eq!(kinds(r"`raw\n`")[0], Token::Str("raw\\n".into()));
    }
}
