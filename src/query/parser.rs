//! Query parser (§4.F).
//!
//! Recursive-descent over a hand-rolled tokenizer, the same approach used
//! by the triple parser (§9 "no grammar generator is required"). Anything
//! outside the advertised fragment — `OPTIONAL`, `UNION`, aggregation,
//! subqueries, `DESCRIBE`/`CONSTRUCT` — is rejected as
//! [`QueryError::UnsupportedConstruct`] rather than silently
//! mis-interpreted.

use std::collections::HashMap;

use super::ast::{FilterExpr, GraphPattern, Query, Term, TriplePattern};
use super::QueryError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Var(String),
    Uri(String),
    StringLit(String),
    Integer(String),
    Dot,
    Comma,
    Semicolon,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Eq,
    Ne,
    AndAnd,
    OrOr,
    Bang,
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    _src: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { chars: src.chars().collect(), pos: 0, _src: src }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }
    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn tokenize(mut self) -> Result<Vec<Tok>, QueryError> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            let Some(c) = self.peek() else { break };
            match c {
                '.' => {
                    self.bump();
                    out.push(Tok::Dot);
                }
                ',' => {
                    self.bump();
                    out.push(Tok::Comma);
                }
                ';' => {
                    self.bump();
                    out.push(Tok::Semicolon);
                }
                '{' => {
                    self.bump();
                    out.push(Tok::OpenBrace);
                }
                '}' => {
                    self.bump();
                    out.push(Tok::CloseBrace);
                }
                '(' => {
                    self.bump();
                    out.push(Tok::OpenParen);
                }
                ')' => {
                    self.bump();
                    out.push(Tok::CloseParen);
                }
                '!' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        out.push(Tok::Ne);
                    } else {
                        out.push(Tok::Bang);
                    }
                }
                '=' => {
                    self.bump();
                    out.push(Tok::Eq);
                }
                '&' if self.peek_at(1) == Some('&') => {
                    self.bump();
                    self.bump();
                    out.push(Tok::AndAnd);
                }
                '|' if self.peek_at(1) == Some('|') => {
                    self.bump();
                    self.bump();
                    out.push(Tok::OrOr);
                }
                '?' => {
                    self.bump();
                    let mut name = String::new();
                    while let Some(d) = self.peek() {
                        if d.is_alphanumeric() || d == '_' {
                            name.push(self.bump().unwrap());
                        } else {
                            break;
                        }
                    }
                    out.push(Tok::Var(name));
                }
                '<' => {
                    self.bump();
                    let mut text = String::new();
                    loop {
                        match self.bump() {
                            Some('>') => break,
                            Some(ch) => text.push(ch),
                            None => return Err(QueryError::ParseError("unterminated <uri>".into())),
                        }
                    }
                    out.push(Tok::Uri(text));
                }
                '"' => {
                    self.bump();
                    let mut text = String::new();
                    loop {
                        match self.bump() {
                            Some('"') => break,
                            Some('\\') => match self.bump() {
                                Some('n') => text.push('\n'),
                                Some('"') => text.push('"'),
                                Some('\\') => text.push('\\'),
                                Some(o) => text.push(o),
                                None => return Err(QueryError::ParseError("unterminated string".into())),
                            },
                            Some(ch) => text.push(ch),
                            None => return Err(QueryError::ParseError("unterminated string".into())),
                        }
                    }
                    out.push(Tok::StringLit(text));
                }
                c if c.is_ascii_digit() => {
                    let mut text = String::new();
                    while let Some(d) = self.peek() {
                        if d.is_ascii_digit() {
                            text.push(self.bump().unwrap());
                        } else {
                            break;
                        }
                    }
                    out.push(Tok::Integer(text));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut text = String::new();
                    while let Some(d) = self.peek() {
                        if d.is_alphanumeric() || d == '_' || d == ':' {
                            text.push(self.bump().unwrap());
                        } else {
                            break;
                        }
                    }
                    out.push(Tok::Ident(text));
                }
                other => return Err(QueryError::ParseError(format!("unexpected character '{other}'"))),
            }
        }
        Ok(out)
    }
}

struct P<'a> {
    toks: &'a [Tok],
    pos: usize,
}

const UNSUPPORTED_KEYWORDS: &[&str] = &["OPTIONAL", "UNION", "GROUP", "DESCRIBE", "CONSTRUCT", "ORDER"];

impl<'a> P<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }
    fn bump(&mut self) -> Option<&Tok> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }
    fn expect_ident(&mut self, word: &str) -> Result<(), QueryError> {
        match self.bump() {
            Some(Tok::Ident(s)) if s.eq_ignore_ascii_case(word) => Ok(()),
            other => Err(QueryError::ParseError(format!("expected '{word}', found {other:?}"))),
        }
    }
    fn expect(&mut self, tok: Tok) -> Result<(), QueryError> {
        match self.bump() {
            Some(t) if *t == tok => Ok(()),
            other => Err(QueryError::ParseError(format!("expected {tok:?}, found {other:?}"))),
        }
    }

    fn peek_ident_is(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(s)) if s.eq_ignore_ascii_case(word))
    }

    fn parse_query(&mut self, base_prefixes: HashMap<String, String>) -> Result<Query, QueryError> {
        let mut prefixes = base_prefixes;
        while self.peek_ident_is("PREFIX") {
            self.bump();
            let name = match self.bump() {
                Some(Tok::Ident(s)) => s.trim_end_matches(':').to_string(),
                other => return Err(QueryError::ParseError(format!("expected prefix name, found {other:?}"))),
            };
            let uri = match self.bump() {
                Some(Tok::Uri(u)) => u.clone(),
                other => return Err(QueryError::ParseError(format!("expected <uri>, found {other:?}"))),
            };
            prefixes.insert(name, uri);
        }

        self.expect_ident("SELECT")?;
        let mut projection = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Var(v)) => {
                    projection.push(v.clone());
                    self.bump();
                }
                _ => break,
            }
        }
        if projection.is_empty() {
            return Err(QueryError::ParseError("SELECT requires at least one ?variable".into()));
        }

        self.expect_ident("WHERE")?;
        self.expect(Tok::OpenBrace)?;
        let pattern = self.parse_graph_pattern(&prefixes)?;
        self.expect(Tok::CloseBrace)?;

        let mut limit = None;
        if self.peek_ident_is("LIMIT") {
            self.bump();
            match self.bump() {
                Some(Tok::Integer(n)) => {
                    limit = Some(n.parse::<usize>().map_err(|_| QueryError::ParseError("invalid LIMIT".into()))?)
                }
                other => return Err(QueryError::ParseError(format!("expected integer after LIMIT, found {other:?}"))),
            }
        }

        if self.pos != self.toks.len() {
            return Err(QueryError::ParseError("unexpected trailing tokens after query".into()));
        }

        Ok(Query { prefixes, projection, pattern, limit })
    }

    fn parse_graph_pattern(&mut self, prefixes: &HashMap<String, String>) -> Result<GraphPattern, QueryError> {
        let mut pattern = GraphPattern::default();
        loop {
            match self.peek() {
                Some(Tok::CloseBrace) | None => break,
                Some(Tok::Ident(s)) if UNSUPPORTED_KEYWORDS.iter().any(|kw| s.eq_ignore_ascii_case(kw)) => {
                    return Err(QueryError::UnsupportedConstruct(s.clone()));
                }
                Some(Tok::Ident(s)) if s.eq_ignore_ascii_case("FILTER") => {
                    self.bump();
                    if self.peek_ident_is("NOT") {
                        self.bump();
                        self.expect_ident("EXISTS")?;
                        self.expect(Tok::OpenBrace)?;
                        let inner = self.parse_graph_pattern(prefixes)?;
                        self.expect(Tok::CloseBrace)?;
                        pattern.filter_not_exists.push(inner);
                    } else {
                        self.expect(Tok::OpenParen)?;
                        let expr = self.parse_filter_expr(prefixes)?;
                        self.expect(Tok::CloseParen)?;
                        pattern.filters.push(expr);
                    }
                    if matches!(self.peek(), Some(Tok::Dot)) {
                        self.bump();
                    }
                }
                _ => {
                    self.parse_triple_statement(prefixes, &mut pattern.triples)?;
                }
            }
        }
        Ok(pattern)
    }

    fn resolve_name(&self, prefixes: &HashMap<String, String>, text: &str) -> Result<String, QueryError> {
        if let Some((pfx, local)) = text.split_once(':') {
            prefixes
                .get(pfx)
                .map(|base| format!("{base}{local}"))
                .ok_or_else(|| QueryError::UnknownPrefix(pfx.to_string()))
        } else {
            Err(QueryError::ParseError(format!("'{text}' is not a valid prefixed name")))
        }
    }

    fn parse_term(&mut self, prefixes: &HashMap<String, String>, allow_a: bool) -> Result<Term, QueryError> {
        match self.bump().cloned() {
            Some(Tok::Var(v)) => Ok(Term::Var(v)),
            Some(Tok::Uri(u)) => Ok(Term::Uri(u)),
            Some(Tok::StringLit(s)) => Ok(Term::Literal(s)),
            Some(Tok::Integer(n)) => Ok(Term::Literal(n)),
            Some(Tok::Ident(s)) if allow_a && s == "a" => Ok(Term::Uri(crate::triple::RDF_TYPE.to_string())),
            Some(Tok::Ident(s)) => Ok(Term::Uri(self.resolve_name(prefixes, &s)?)),
            other => Err(QueryError::ParseError(format!("expected a term, found {other:?}"))),
        }
    }

    fn parse_triple_statement(
        &mut self,
        prefixes: &HashMap<String, String>,
        out: &mut Vec<TriplePattern>,
    ) -> Result<(), QueryError> {
        let subject = self.parse_term(prefixes, false)?;
        loop {
            let predicate = self.parse_term(prefixes, true)?;
            loop {
                let object = self.parse_term(prefixes, false)?;
                out.push(TriplePattern { subject: subject.clone(), predicate: predicate.clone(), object });
                if matches!(self.peek(), Some(Tok::Comma)) {
                    self.bump();
                    continue;
                }
                break;
            }
            if matches!(self.peek(), Some(Tok::Semicolon)) {
                self.bump();
                continue;
            }
            break;
        }
        if matches!(self.peek(), Some(Tok::Dot)) {
            self.bump();
        }
        Ok(())
    }

    fn parse_filter_expr(&mut self, prefixes: &HashMap<String, String>) -> Result<FilterExpr, QueryError> {
        self.parse_or(prefixes)
    }

    fn parse_or(&mut self, prefixes: &HashMap<String, String>) -> Result<FilterExpr, QueryError> {
        let mut lhs = self.parse_and(prefixes)?;
        while matches!(self.peek(), Some(Tok::OrOr)) {
            self.bump();
            let rhs = self.parse_and(prefixes)?;
            lhs = FilterExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self, prefixes: &HashMap<String, String>) -> Result<FilterExpr, QueryError> {
        let mut lhs = self.parse_unary(prefixes)?;
        while matches!(self.peek(), Some(Tok::AndAnd)) {
            self.bump();
            let rhs = self.parse_unary(prefixes)?;
            lhs = FilterExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, prefixes: &HashMap<String, String>) -> Result<FilterExpr, QueryError> {
        if matches!(self.peek(), Some(Tok::Bang)) {
            self.bump();
            let inner = self.parse_unary(prefixes)?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary(prefixes)
    }

    fn parse_primary(&mut self, prefixes: &HashMap<String, String>) -> Result<FilterExpr, QueryError> {
        if matches!(self.peek(), Some(Tok::OpenParen)) {
            self.bump();
            let inner = self.parse_or(prefixes)?;
            self.expect(Tok::CloseParen)?;
            return Ok(inner);
        }

        if let Some(Tok::Ident(name)) = self.peek().cloned() {
            let upper = name.to_ascii_uppercase();
            if matches!(upper.as_str(), "CONTAINS" | "STRSTARTS" | "STRENDS") {
                self.bump();
                self.expect(Tok::OpenParen)?;
                let a = self.parse_term(prefixes, false)?;
                self.expect(Tok::Comma)?;
                let b = self.parse_term(prefixes, false)?;
                self.expect(Tok::CloseParen)?;
                return Ok(match upper.as_str() {
                    "CONTAINS" => FilterExpr::Contains(a, b),
                    "STRSTARTS" => FilterExpr::StrStarts(a, b),
                    _ => FilterExpr::StrEnds(a, b),
                });
            }
        }

        let lhs = self.parse_term(prefixes, false)?;
        match self.peek() {
            Some(Tok::Eq) => {
                self.bump();
                let rhs = self.parse_term(prefixes, false)?;
                Ok(FilterExpr::Eq(lhs, rhs))
            }
            Some(Tok::Ne) => {
                self.bump();
                let rhs = self.parse_term(prefixes, false)?;
                Ok(FilterExpr::Ne(lhs, rhs))
            }
            other => Err(QueryError::ParseError(format!("expected '=' or '!=', found {other:?}"))),
        }
    }
}

pub fn parse_query(text: &str) -> Result<Query, QueryError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = P { toks: &tokens, pos: 0 };
    parser.parse_query(HashMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_select() {
        let q = parse_query(
            "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?m WHERE { ?m a <Module> ; code:layer \"service\" }",
        )
        .unwrap();
        assert_eq!(q.projection, vec!["m".to_string()]);
        assert_eq!(q.pattern.triples.len(), 2);
    }

    #[test]
    fn parses_filter_not_exists() {
        let q = parse_query(
            "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?m WHERE { ?m code:exports ?e . FILTER NOT EXISTS { ?m code:description ?d } }",
        )
        .unwrap();
        assert_eq!(q.pattern.filter_not_exists.len(), 1);
    }

    #[test]
    fn rejects_unsupported_construct() {
        let err = parse_query("SELECT ?m WHERE { OPTIONAL { ?m a <T> } }").unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedConstruct(_)));
    }

    #[test]
    fn unknown_prefix_is_reported() {
        let err = parse_query("SELECT ?m WHERE { ?m foo:bar <T> }").unwrap_err();
        assert!(matches!(err, QueryError::UnknownPrefix(_)));
    }

    #[test]
    fn parses_limit() {
        let q = parse_query("SELECT ?m WHERE { ?m a <T> } LIMIT 0").unwrap();
        assert_eq!(q.limit, Some(0));
    }
}
