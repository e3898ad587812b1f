//! rispl_lexer: converts source text into a token stream.
//!
//! The lexer recognizes parentheses, dot, quote, numeric and string
//! literals, and identifiers/keywords, and supports one token of push-back
//! for the parser's lookahead. `;` starts a line comment. A `\` before an
//! identifier forces it to be read as a plain identifier even if the
//! spelling matches a keyword.

pub mod lexer;

pub use lexer::Lexer;
