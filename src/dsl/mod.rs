//! Resource filter language.
//!
//! Syntax:
//!   [a/b:c] == 'value'          - compare the property at a relative path
//!   [created] > 2013-08-08      - unquoted ISO-8601 date literal
//!   name() like 'page[1-2]'     - full-match regular expression
//!   [tags] contains any $wanted - multi-value operators
//!   $param                      - value bound before compiling
//!   expr1 and expr2             - AND (also `&&`)
//!   expr1 or expr2              - OR (also `||`, lower precedence than and)
//!   not expr                    - NOT (also `!`)
//!   (expr)                      - grouping

mod ast;
mod lexer;
mod parser;
mod source;

pub use ast::*;
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::parse_filter;
pub use source::decode;
