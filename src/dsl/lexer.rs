//! Lexer/tokenizer for the filter language.

use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, fail};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;

use crate::error::LexError;

/// Token types for the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident, // bare word: true, false, null, any
    Path,  // [jcr:content/jcr:title], text without brackets
    String,
    Number,
    Date, // 2013-08-08T16:32:59
    Param, // $lang, text without '$'
    Op,    // ==, !=, >, >=, <, <=, like, contains, in
    LParen,
    RParen,
    And,
    Or,
    Not,
    Func, // identifier directly followed by '('
    Comma,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Decoded text: string contents without quotes and escapes,
    /// operators and keywords in lower case.
    pub text: String,
    /// Byte offset of the first character of the token.
    pub position: usize,
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, ErrMode<ContextError>>;

/// Fail without backtracking; callers leave `input` at the offending character.
fn expected<T>(input: &mut &str, what: &'static str) -> PResult<T> {
    cut_err(fail.context(StrContext::Expected(StrContextValue::Description(what))))
        .parse_next(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Lex a symbolic operator or punctuation.
fn lex_symbol(input: &mut &str) -> PResult<(TokenKind, &'static str)> {
    alt((
        // Multi-char operators first
        "==".value((TokenKind::Op, "==")),
        "!=".value((TokenKind::Op, "!=")),
        ">=".value((TokenKind::Op, ">=")),
        "<=".value((TokenKind::Op, "<=")),
        "&&".value((TokenKind::And, "and")),
        "||".value((TokenKind::Or, "or")),
        // Single-char operators
        ">".value((TokenKind::Op, ">")),
        "<".value((TokenKind::Op, "<")),
        "!".value((TokenKind::Not, "not")),
        "(".value((TokenKind::LParen, "(")),
        ")".value((TokenKind::RParen, ")")),
        ",".value((TokenKind::Comma, ",")),
    ))
    .parse_next(input)
}

/// Lex a bracketed attribute path. Returns the text between the brackets.
fn lex_path(input: &mut &str) -> PResult<String> {
    let source = *input;
    let body = &source[1..];
    let Some(end) = body.find(']') else {
        *input = &source[source.len()..];
        return expected(input, "closing ']'");
    };
    let inner = &body[..end];

    let mut offset = 1;
    for segment in inner.split('/') {
        if segment.trim().is_empty() {
            *input = &source[offset..];
            return expected(input, "a path segment");
        }
        if let Some(idx) = segment.find(|c: char| c == '[' || c.is_control()) {
            *input = &source[offset + idx..];
            return expected(input, "a path character");
        }
        offset += segment.len() + 1;
    }

    *input = &body[end + 1..];
    Ok(inner
        .split('/')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("/"))
}

/// Lex a quoted string literal, decoding escapes.
fn lex_string(input: &mut &str) -> PResult<String> {
    let source = *input;
    let mut chars = source.char_indices();
    let Some((_, quote)) = chars.next() else {
        return expected(input, "a string");
    };
    let mut out = String::new();

    while let Some((idx, c)) = chars.next() {
        match c {
            c if c == quote => {
                *input = &source[idx + c.len_utf8()..];
                return Ok(out);
            }
            '\\' => {
                let Some((esc_idx, esc)) = chars.next() else {
                    *input = &source[source.len()..];
                    return expected(input, "an escape sequence");
                };
                match esc {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '\\' | '\'' | '"' | '/' => out.push(esc),
                    'u' => {
                        let hex_start = esc_idx + 1;
                        let hex = source.get(hex_start..hex_start + 4).unwrap_or("");
                        let decoded = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
                        match decoded {
                            Some(ch) if hex.len() == 4 => {
                                out.push(ch);
                                for _ in 0..4 {
                                    chars.next();
                                }
                            }
                            _ => {
                                *input = &source[hex_start.min(source.len())..];
                                return expected(input, "four hex digits after \\u");
                            }
                        }
                    }
                    _ => {
                        *input = &source[esc_idx..];
                        return expected(input, "a valid escape sequence");
                    }
                }
            }
            other => out.push(other),
        }
    }

    *input = &source[source.len()..];
    expected(input, "closing quote")
}

/// Lex a `$name` parameter reference.
fn lex_param(input: &mut &str) -> PResult<String> {
    let source = *input;
    let body = &source[1..];
    let len = body
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    if len == 0 || !body.starts_with(is_ident_start) {
        *input = body;
        return expected(input, "a parameter name after '$'");
    }
    let name = body[..len].to_string();
    *input = &body[len..];
    Ok(name)
}

/// Four digits and a dash start a date; anything else numeric is a number.
fn looks_like_date(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() >= 6
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5].is_ascii_digit()
}

fn lex_date(input: &mut &str) -> PResult<String> {
    let source = *input;
    let len = source
        .find(|c: char| !(c.is_ascii_digit() || "-:.TZ+".contains(c)))
        .unwrap_or(source.len());
    *input = &source[len..];
    Ok(source[..len].to_string())
}

/// Lex a number (integer, decimal, optional exponent).
fn lex_number(input: &mut &str) -> PResult<String> {
    let source = *input;
    let bytes = source.as_bytes();
    let mut end = 0;

    if bytes.first() == Some(&b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        *input = &source[end..];
        return expected(input, "a digit");
    }

    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        let frac_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == frac_start {
            *input = &source[end..];
            return expected(input, "a digit after the decimal point");
        }
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_digits = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > exp_digits {
            end = exp;
        }
    }

    *input = &source[end..];
    Ok(source[..end].to_string())
}

/// Lex a word: keyword, operator word, function head or bare identifier.
fn lex_word(input: &mut &str) -> PResult<(TokenKind, String)> {
    let source = *input;
    let len = source
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(source.len());
    let word = &source[..len];
    *input = &source[len..];

    let lower = word.to_ascii_lowercase();
    let kind = match lower.as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "like" | "contains" | "in" => TokenKind::Op,
        _ if input.trim_start().starts_with('(') => {
            return Ok((TokenKind::Func, word.to_string()));
        }
        _ => TokenKind::Ident,
    };
    Ok((kind, lower))
}

/// Lex a single token. Leading whitespace must already be consumed.
fn lex_token(input: &mut &str) -> PResult<(TokenKind, String)> {
    let Some(first) = input.chars().next() else {
        return Ok((TokenKind::Eof, String::new()));
    };

    match first {
        '[' => lex_path(input).map(|p| (TokenKind::Path, p)),
        '\'' | '"' => lex_string(input).map(|s| (TokenKind::String, s)),
        '$' => lex_param(input).map(|p| (TokenKind::Param, p)),
        c if c.is_ascii_digit() && looks_like_date(input) => {
            lex_date(input).map(|d| (TokenKind::Date, d))
        }
        c if c.is_ascii_digit() => lex_number(input).map(|n| (TokenKind::Number, n)),
        '-' if input[1..].starts_with(|c: char| c.is_ascii_digit()) => {
            lex_number(input).map(|n| (TokenKind::Number, n))
        }
        c if is_ident_start(c) => lex_word(input),
        _ => match lex_symbol(input) {
            Ok((kind, text)) => Ok((kind, text.to_string())),
            Err(ErrMode::Backtrack(_)) => expected(input, "an operator, operand or keyword"),
            Err(e) => Err(e),
        },
    }
}

fn to_lex_error(source: &str, remaining: &str, err: ErrMode<ContextError>) -> LexError {
    let expected = match &err {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e
            .context()
            .filter_map(|c| match c {
                StrContext::Expected(value) => Some(value.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" or "),
        ErrMode::Incomplete(_) => String::new(),
    };
    LexError {
        position: source.len() - remaining.len(),
        expected: if expected.is_empty() {
            "a token".to_string()
        } else {
            expected
        },
        found: remaining.chars().next(),
    }
}

/// Tokenize the entire input. The last token is always `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    loop {
        let _ = multispace0::<_, ContextError>.parse_next(&mut remaining);
        let position = input.len() - remaining.len();

        match lex_token(&mut remaining) {
            Ok((TokenKind::Eof, _)) => {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    position,
                });
                break;
            }
            Ok((kind, text)) => tokens.push(Token {
                kind,
                text,
                position,
            }),
            Err(e) => return Err(to_lex_error(input, remaining, e)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_path_comparison_with_param() {
        let tokens = tokenize("[jcr:content/jcr:title] == $lang").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token {
                    kind: TokenKind::Path,
                    text: "jcr:content/jcr:title".into(),
                    position: 0,
                },
                Token {
                    kind: TokenKind::Op,
                    text: "==".into(),
                    position: 24,
                },
                Token {
                    kind: TokenKind::Param,
                    text: "lang".into(),
                    position: 27,
                },
                Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    position: 32,
                },
            ]
        );
    }

    #[test]
    fn test_function_head_and_word_operator() {
        assert_eq!(
            kinds("name() like $regex"),
            vec![
                TokenKind::Func,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Op,
                TokenKind::Param,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("NOT [a] AND [b] Or [c] && [d] || ![e]"),
            vec![
                TokenKind::Not,
                TokenKind::Path,
                TokenKind::And,
                TokenKind::Path,
                TokenKind::Or,
                TokenKind::Path,
                TokenKind::And,
                TokenKind::Path,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Path,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dates_and_numbers() {
        let tokens = tokenize("2013-08-08T16:32:59 -12.5 3e2 42").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Date);
        assert_eq!(tokens[0].text, "2013-08-08T16:32:59");
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].text, "-12.5");
        assert_eq!(tokens[2].text, "3e2");
        assert_eq!(tokens[3].text, "42");
    }

    #[test]
    fn test_date_with_offset() {
        let tokens = tokenize("[created] < 2013-08-08T16:32:59-05:00)").unwrap();
        assert_eq!(tokens[2].text, "2013-08-08T16:32:59-05:00");
        assert_eq!(tokens[3].kind, TokenKind::RParen);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            texts(r#"'it\'s' "a\"b" 'tab\there' '\u0041'"#),
            vec!["it's", "a\"b", "tab\there", "A", ""]
        );
    }

    #[test]
    fn test_word_operators() {
        assert_eq!(
            texts("[a] contains not any $x"),
            vec!["a", "contains", "not", "any", "x", ""]
        );
        assert_eq!(
            kinds("[a] contains not any $x"),
            vec![
                TokenKind::Path,
                TokenKind::Op,
                TokenKind::Not,
                TokenKind::Ident,
                TokenKind::Param,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_colon_only_inside_brackets() {
        let err = tokenize("jcr:title == 'x'").unwrap_err();
        assert_eq!(err.position, 3);
        assert_eq!(err.found, Some(':'));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("[a] == 'abc").unwrap_err();
        assert_eq!(err.expected, "closing quote");
        assert_eq!(err.position, 11);
        assert_eq!(err.found, None);
    }

    #[test]
    fn test_bad_escape() {
        let err = tokenize(r"'a\qb'").unwrap_err();
        assert_eq!(err.expected, "a valid escape sequence");
        assert_eq!(err.position, 3);
        assert_eq!(err.found, Some('q'));
    }

    #[test]
    fn test_unterminated_path_and_empty_segment() {
        let err = tokenize("[a/b == 1").unwrap_err();
        assert_eq!(err.expected, "closing ']'");

        let err = tokenize("[a//b] == 1").unwrap_err();
        assert_eq!(err.expected, "a path segment");
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_missing_param_name() {
        let err = tokenize("[a] == $ ").unwrap_err();
        assert_eq!(err.position, 8);
        assert_eq!(err.expected, "a parameter name after '$'");
    }

    #[test]
    fn test_unrecognized_character() {
        let err = tokenize("[a] = 1").unwrap_err();
        assert_eq!(err.position, 4);
        assert_eq!(err.found, Some('='));
    }
}
