//! rispl_ast: token and AST node definitions.
//!
//! Tokens are produced by `rispl_lexer`; `Expr` trees are produced by
//! `rispl_parser` and consumed by `rispl_codegen`. Every node owns its
//! children and is never mutated after parsing.

pub mod expr;
pub mod token;

pub use expr::{BinaryOp, Expr, IdToken, LetBinding, ListItem, Literal, QuoteForm, UnaryOp};
pub use token::{KeywordKind, SyntaxKind, Token, TokenKind};
