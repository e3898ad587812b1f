//! rispl_parser: recursive-descent parser producing `Expr` trees.
//!
//! The parser consumes tokens from `rispl_lexer` with one token of
//! lookahead, dispatches parenthesized forms on the token after `(`, and
//! reports errors through a diagnostic collection. Errors inside a form are
//! fatal to that form; parsing recovers at the next top-level form. An
//! error at end of input marks the unit as incomplete rather than
//! malformed, for interactive hosts.

pub mod parser;

pub use parser::{parse_one, parse_program, ParseOutput, Parser};
