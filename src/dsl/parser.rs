//! Parser for the filter language.
//!
//! Grammar (in rough EBNF):
//!
//! filter     = or_expr
//! or_expr    = and_expr ("or" and_expr)*
//! and_expr   = unary_expr ("and" unary_expr)*
//! unary_expr = "not" unary_expr | comparison
//! comparison = primary (compare_op primary)?
//! compare_op = "==" | "!=" | ">" | ">=" | "<" | "<=" | "like" ["not"]
//!            | "contains" ["not"] ["any"] | ["not"] "in"
//! primary    = PATH | STRING | NUMBER | DATE | PARAM | "true" | "false" | "null"
//!            | FUNC "(" (primary ("," primary)*)? ")" | "(" filter ")"
//!
//! A primary without an operator may stand alone as the whole filter, or
//! inside parentheses, but not directly under `and`, `or` or `not`.

use super::ast::{CompareOp, Node};
use super::lexer::{Token, TokenKind, tokenize};
use crate::error::{FilterError, ParseError};
use crate::value::{Value, parse_date};

/// A parsed sub-expression, remembering whether it is a bare operand.
struct Term {
    node: Node,
    /// Position of an operand that was not compared and not parenthesized.
    bare: Option<usize>,
}

/// Parser state.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::String => format!("string '{}'", token.text),
        TokenKind::Path => format!("path [{}]", token.text),
        TokenKind::Param => format!("parameter ${}", token.text),
        TokenKind::Func => format!("function {}()", token.text),
        _ => format!("'{}'", token.text),
    }
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let end = tokens.last().map(|t| t.position).unwrap_or(0);
        Parser {
            tokens,
            pos: 0,
            eof: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                position: end,
            },
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        self.pos += 1;
        tok
    }

    fn error(&self, expected: &str) -> ParseError {
        let found = self.peek();
        ParseError {
            position: found.position,
            expected: expected.to_string(),
            found: describe(found),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    /// Parse the top-level filter expression and require end of input.
    fn parse_filter(&mut self) -> Result<Node, ParseError> {
        let term = self.parse_or_expr()?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.error("'and', 'or' or end of input"));
        }
        Ok(term.node)
    }

    /// Reject bare operands used as a condition of `and`, `or` or `not`.
    fn condition(&self, term: Term) -> Result<Node, ParseError> {
        match term.bare {
            None => Ok(term.node),
            Some(position) => Err(ParseError {
                position,
                expected: "a comparison or a parenthesized group".to_string(),
                found: format!("bare operand {}", term.node),
            }),
        }
    }

    /// Parse OR expression: and_expr ("or" and_expr)*
    fn parse_or_expr(&mut self) -> Result<Term, ParseError> {
        let first = self.parse_and_expr()?;
        if self.peek().kind != TokenKind::Or {
            return Ok(first);
        }

        let mut children = vec![self.condition(first)?];
        while self.peek().kind == TokenKind::Or {
            self.advance(); // consume or
            let next = self.parse_and_expr()?;
            children.push(self.condition(next)?);
        }

        Ok(Term {
            node: Node::or(children).simplify(),
            bare: None,
        })
    }

    /// Parse AND expression: unary_expr ("and" unary_expr)*
    fn parse_and_expr(&mut self) -> Result<Term, ParseError> {
        let first = self.parse_unary_expr()?;
        if self.peek().kind != TokenKind::And {
            return Ok(first);
        }

        let mut children = vec![self.condition(first)?];
        while self.peek().kind == TokenKind::And {
            self.advance(); // consume and
            let next = self.parse_unary_expr()?;
            children.push(self.condition(next)?);
        }

        Ok(Term {
            node: Node::and(children).simplify(),
            bare: None,
        })
    }

    /// Parse unary expression: "not" unary_expr | comparison
    fn parse_unary_expr(&mut self) -> Result<Term, ParseError> {
        if self.peek().kind == TokenKind::Not {
            self.advance(); // consume not
            let inner = self.parse_unary_expr()?;
            return Ok(Term {
                node: Node::not(self.condition(inner)?),
                bare: None,
            });
        }
        self.parse_comparison()
    }

    /// Parse comparison: primary (compare_op primary)?
    fn parse_comparison(&mut self) -> Result<Term, ParseError> {
        let position = self.peek().position;
        let (left, grouped) = self.parse_primary()?;

        match self.parse_compare_op()? {
            Some(op) => {
                let (right, _) = self.parse_primary()?;
                Ok(Term {
                    node: Node::compare(left, op, right),
                    bare: None,
                })
            }
            None => Ok(Term {
                node: left,
                bare: if grouped { None } else { Some(position) },
            }),
        }
    }

    /// Parse an optional comparison operator, including the word forms.
    fn parse_compare_op(&mut self) -> Result<Option<CompareOp>, ParseError> {
        let (kind, text) = {
            let tok = self.peek();
            (tok.kind, tok.text.clone())
        };
        let op = match (kind, text.as_str()) {
            (TokenKind::Op, "==") => CompareOp::Eq,
            (TokenKind::Op, "!=") => CompareOp::Ne,
            (TokenKind::Op, ">") => CompareOp::Gt,
            (TokenKind::Op, ">=") => CompareOp::Ge,
            (TokenKind::Op, "<") => CompareOp::Lt,
            (TokenKind::Op, "<=") => CompareOp::Le,
            (TokenKind::Op, "in") => CompareOp::In,
            (TokenKind::Op, "like") => {
                self.advance();
                if self.peek().kind == TokenKind::Not {
                    self.advance();
                    return Ok(Some(CompareOp::NotLike));
                }
                return Ok(Some(CompareOp::Like));
            }
            (TokenKind::Op, "contains") => {
                self.advance();
                let negated = self.peek().kind == TokenKind::Not;
                if negated {
                    self.advance();
                }
                let any = self.peek().kind == TokenKind::Ident && self.peek().text == "any";
                if any {
                    self.advance();
                }
                return Ok(Some(match (negated, any) {
                    (false, false) => CompareOp::Contains,
                    (true, false) => CompareOp::NotContains,
                    (false, true) => CompareOp::ContainsAny,
                    (true, true) => CompareOp::NotContainsAny,
                }));
            }
            (TokenKind::Not, _) => {
                let next = self.peek_at(1);
                if next.kind == TokenKind::Op && next.text == "in" {
                    self.advance();
                    self.advance();
                    return Ok(Some(CompareOp::NotIn));
                }
                return Err(self.error("a comparison operator, 'and', 'or' or end of input"));
            }
            (TokenKind::Op, _) => return Err(self.error("a comparison operator")),
            _ => return Ok(None),
        };
        self.advance(); // consume operator
        Ok(Some(op))
    }

    /// Parse a primary. The flag is true for parenthesized expressions.
    fn parse_primary(&mut self) -> Result<(Node, bool), ParseError> {
        let tok = self.peek().clone();
        let node = match tok.kind {
            TokenKind::Path => Node::Path {
                segments: tok.text.split('/').map(str::to_string).collect(),
            },
            TokenKind::String => Node::Literal(Value::String(tok.text.clone())),
            TokenKind::Number => Node::Literal(parse_number(&tok)?),
            TokenKind::Date => match parse_date(&tok.text) {
                Some(dt) => Node::Literal(Value::Date(dt)),
                None => {
                    return Err(ParseError {
                        position: tok.position,
                        expected: "a valid date".to_string(),
                        found: format!("'{}'", tok.text),
                    });
                }
            },
            TokenKind::Param => Node::Parameter(tok.text.clone()),
            TokenKind::Ident => match tok.text.as_str() {
                "true" => Node::Literal(Value::Boolean(true)),
                "false" => Node::Literal(Value::Boolean(false)),
                "null" => Node::Literal(Value::Null),
                _ => return Err(self.error("an operand")),
            },
            TokenKind::Func => {
                self.advance(); // consume name
                let args = self.parse_arguments()?;
                return Ok((
                    Node::Function {
                        name: tok.text,
                        args,
                    },
                    false,
                ));
            }
            TokenKind::LParen => {
                self.advance(); // consume (
                let inner = self.parse_or_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok((inner.node, true));
            }
            _ => return Err(self.error("an operand")),
        };
        self.advance();
        Ok((node, false))
    }

    /// Parse argument list: "(" (primary ("," primary)*)? ")"
    fn parse_arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }

        loop {
            let (arg, _) = self.parse_primary()?;
            args.push(arg);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.error("',' or ')'")),
            }
        }
    }
}

fn parse_number(tok: &Token) -> Result<Value, ParseError> {
    let text = tok.text.as_str();
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Value::Long(n));
        }
    }
    text.parse::<f64>()
        .map(Value::Double)
        .map_err(|_| ParseError {
            position: tok.position,
            expected: "a number".to_string(),
            found: format!("'{}'", text),
        })
}

/// Parse a filter expression into an AST.
pub fn parse_filter(input: &str) -> Result<Node, FilterError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse_filter()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::LogicOp;
    use time::macros::datetime;

    fn parse_err(input: &str) -> ParseError {
        match parse_filter(input) {
            Err(FilterError::Parse(e)) => e,
            other => panic!("expected parse error for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_comparison() {
        let ast = parse_filter("[jcr:content/jcr:title] == $lang").unwrap();
        assert_eq!(
            ast,
            Node::compare(
                Node::Path {
                    segments: vec!["jcr:content".into(), "jcr:title".into()],
                },
                CompareOp::Eq,
                Node::Parameter("lang".into()),
            )
        );
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let ast = parse_filter("[a] == 1 or [b] == 2 and [c] == 3").unwrap();
        assert_eq!(ast.to_string(), "([a] == 1 or ([b] == 2 and [c] == 3))");
    }

    #[test]
    fn test_not_applies_to_next_operand_only() {
        let ast = parse_filter("not [a] == 1 and [b] == 2").unwrap();
        assert_eq!(ast.to_string(), "((not [a] == 1) and [b] == 2)");

        let ast = parse_filter("not ([a] == 1 and [b] == 2)").unwrap();
        assert_eq!(ast.to_string(), "(not ([a] == 1 and [b] == 2))");
    }

    #[test]
    fn test_chains_are_flattened() {
        let ast = parse_filter("[a] == 1 and [b] == 2 and [c] == 3").unwrap();
        match ast {
            Node::Logic { op, children } => {
                assert_eq!(op, LogicOp::And);
                assert_eq!(children.len(), 3);
            }
            other => panic!("expected logic node, got {other:?}"),
        }
    }

    #[test]
    fn test_function_call_with_arguments() {
        let ast = parse_filter("date([created], 'yyyy') > 2013-01-01").unwrap();
        assert_eq!(
            ast,
            Node::compare(
                Node::Function {
                    name: "date".into(),
                    args: vec![Node::path("created"), Node::Literal(Value::from("yyyy"))],
                },
                CompareOp::Gt,
                Node::Literal(Value::Date(datetime!(2013-01-01 0:00 UTC))),
            )
        );
    }

    #[test]
    fn test_word_operators() {
        let cases = [
            ("[a] like 'x'", CompareOp::Like),
            ("[a] like not 'x'", CompareOp::NotLike),
            ("[a] contains 'x'", CompareOp::Contains),
            ("[a] contains not 'x'", CompareOp::NotContains),
            ("[a] contains any $x", CompareOp::ContainsAny),
            ("[a] contains not any $x", CompareOp::NotContainsAny),
            ("[a] in $x", CompareOp::In),
            ("[a] not in $x", CompareOp::NotIn),
        ];
        for (input, expected) in cases {
            match parse_filter(input).unwrap() {
                Node::Comparison { op, .. } => assert_eq!(op, expected, "{input}"),
                other => panic!("expected comparison for {input}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_literals() {
        let ast = parse_filter("[a] != -2.5").unwrap();
        assert!(matches!(
            ast,
            Node::Comparison { ref right, .. } if **right == Node::Literal(Value::Double(-2.5))
        ));
        let ast = parse_filter("[hidden] == true").unwrap();
        assert!(matches!(
            ast,
            Node::Comparison { ref right, .. } if **right == Node::Literal(Value::Boolean(true))
        ));
    }

    #[test]
    fn test_bare_operand_allowed_as_root_or_group() {
        assert_eq!(parse_filter("[hidden]").unwrap(), Node::path("hidden"));
        let ast = parse_filter("([hidden]) and [a] == 1").unwrap();
        assert_eq!(ast.to_string(), "([hidden] and [a] == 1)");
    }

    #[test]
    fn test_bare_operand_rejected_under_logic() {
        let err = parse_err("[hidden] and [a] == 1");
        assert_eq!(err.position, 0);
        assert_eq!(err.expected, "a comparison or a parenthesized group");

        let err = parse_err("[a] == 1 or name()");
        assert_eq!(err.position, 12);

        let err = parse_err("not [hidden]");
        assert_eq!(err.position, 4);
    }

    #[test]
    fn test_comparison_is_not_associative() {
        let err = parse_err("[a] == [b] == [c]");
        assert_eq!(err.position, 11);
        assert_eq!(err.expected, "'and', 'or' or end of input");
    }

    #[test]
    fn test_unmatched_parenthesis() {
        let err = parse_err("([a] == 1");
        assert_eq!(err.expected, "')'");
        assert_eq!(err.found, "end of input");

        let err = parse_err("[a] == 1)");
        assert_eq!(err.position, 8);
    }

    #[test]
    fn test_empty_and_dangling_input() {
        let err = parse_err("");
        assert_eq!(err.expected, "an operand");
        let err = parse_err("[a] ==");
        assert_eq!(err.found, "end of input");
        let err = parse_err("[a] == 1 and");
        assert_eq!(err.expected, "an operand");
    }

    #[test]
    fn test_invalid_date_literal() {
        let err = parse_err("[created] > 2013-13-45");
        assert_eq!(err.expected, "a valid date");
        assert_eq!(err.position, 12);
    }

    #[test]
    fn test_unknown_bare_identifier() {
        let err = parse_err("[a] == primary");
        assert_eq!(err.found, "'primary'");
    }

    #[test]
    fn test_lex_errors_pass_through() {
        assert!(matches!(
            parse_filter("[a] == 'open"),
            Err(FilterError::Lex(_))
        ));
    }
}
