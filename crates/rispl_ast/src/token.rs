//! Token kinds produced by the lexer.
//!
//! The language is case-insensitive for keyword and identifier lookup but
//! case-preserving in the token text, so member names flow through to the
//! host with their source spelling intact.

use rispl_core::text::TextSpan;
use std::fmt;

/// Punctuation and end-of-input token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    OpenParen,
    CloseParen,
    Dot,
    Quote,
    Eof,
}

impl SyntaxKind {
    /// Human-readable description, used in "X expected" diagnostics.
    pub fn description(self) -> &'static str {
        match self {
            SyntaxKind::OpenParen => "'('",
            SyntaxKind::CloseParen => "')'",
            SyntaxKind::Dot => "'.'",
            SyntaxKind::Quote => "'''",
            SyntaxKind::Eof => "end of input",
        }
    }
}

/// Every keyword in the language. Lookup is case-insensitive; the spelling
/// returned by [`KeywordKind::as_str`] is the canonical lowercase form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordKind {
    Import,
    Defun,
    Lambda,
    Defclass,
    Defmethod,
    New,
    Set,
    LetStar,
    Block,
    Loop,
    Break,
    Continue,
    Return,
    Cons,
    Eq,
    List,
    Elt,
    Nil,
    True,
    False,
    If,
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    And,
    Or,
    Not,
}

impl KeywordKind {
    /// Case-insensitive keyword lookup. Returns `None` for plain identifiers.
    pub fn from_name(name: &str) -> Option<KeywordKind> {
        // The table is small enough that a lowercase match beats a map.
        let lower = name.to_ascii_lowercase();
        Some(match lower.as_str() {
            "import" => KeywordKind::Import,
            "defun" => KeywordKind::Defun,
            "lambda" => KeywordKind::Lambda,
            "defclass" => KeywordKind::Defclass,
            "defmethod" => KeywordKind::Defmethod,
            "new" => KeywordKind::New,
            "set" => KeywordKind::Set,
            "let*" => KeywordKind::LetStar,
            "block" => KeywordKind::Block,
            "loop" => KeywordKind::Loop,
            "break" => KeywordKind::Break,
            "continue" => KeywordKind::Continue,
            "return" => KeywordKind::Return,
            "cons" => KeywordKind::Cons,
            "eq" => KeywordKind::Eq,
            "list" => KeywordKind::List,
            "elt" => KeywordKind::Elt,
            "nil" => KeywordKind::Nil,
            "true" => KeywordKind::True,
            "false" => KeywordKind::False,
            "if" => KeywordKind::If,
            "+" => KeywordKind::Add,
            "-" => KeywordKind::Subtract,
            "*" => KeywordKind::Multiply,
            "/" => KeywordKind::Divide,
            "=" => KeywordKind::Equal,
            "!=" => KeywordKind::NotEqual,
            ">" => KeywordKind::GreaterThan,
            "<" => KeywordKind::LessThan,
            "and" => KeywordKind::And,
            "or" => KeywordKind::Or,
            "not" => KeywordKind::Not,
            _ => return None,
        })
    }

    /// The canonical spelling of this keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            KeywordKind::Import => "import",
            KeywordKind::Defun => "defun",
            KeywordKind::Lambda => "lambda",
            KeywordKind::Defclass => "defclass",
            KeywordKind::Defmethod => "defmethod",
            KeywordKind::New => "new",
            KeywordKind::Set => "set",
            KeywordKind::LetStar => "let*",
            KeywordKind::Block => "block",
            KeywordKind::Loop => "loop",
            KeywordKind::Break => "break",
            KeywordKind::Continue => "continue",
            KeywordKind::Return => "return",
            KeywordKind::Cons => "cons",
            KeywordKind::Eq => "eq",
            KeywordKind::List => "list",
            KeywordKind::Elt => "elt",
            KeywordKind::Nil => "nil",
            KeywordKind::True => "true",
            KeywordKind::False => "false",
            KeywordKind::If => "if",
            KeywordKind::Add => "+",
            KeywordKind::Subtract => "-",
            KeywordKind::Multiply => "*",
            KeywordKind::Divide => "/",
            KeywordKind::Equal => "=",
            KeywordKind::NotEqual => "!=",
            KeywordKind::GreaterThan => ">",
            KeywordKind::LessThan => "<",
            KeywordKind::And => "and",
            KeywordKind::Or => "or",
            KeywordKind::Not => "not",
        }
    }

    /// Keywords that denote literal constants rather than forms.
    pub fn is_constant(self) -> bool {
        matches!(self, KeywordKind::Nil | KeywordKind::True | KeywordKind::False)
    }

    /// Keywords that head a binary operator form.
    pub fn is_binary_operator(self) -> bool {
        matches!(
            self,
            KeywordKind::Add
                | KeywordKind::Subtract
                | KeywordKind::Multiply
                | KeywordKind::Divide
                | KeywordKind::Equal
                | KeywordKind::NotEqual
                | KeywordKind::GreaterThan
                | KeywordKind::LessThan
                | KeywordKind::And
                | KeywordKind::Or
        )
    }
}

impl fmt::Display for KeywordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A token: punctuation, an identifier-or-keyword, or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Parenthesis, dot, quote, or end of input.
    Syntax(SyntaxKind),
    /// An identifier, with its keyword classification if the (unescaped)
    /// spelling matches a keyword. The name keeps exact source casing.
    IdOrKeyword {
        name: String,
        keyword: Option<KeywordKind>,
    },
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A string literal with escapes already processed.
    Str(String),
}

impl TokenKind {
    /// Human-readable description, used in diagnostics.
    pub fn description(&self) -> String {
        match self {
            TokenKind::Syntax(kind) => kind.description().to_string(),
            TokenKind::IdOrKeyword { name, keyword: Some(_) } => format!("keyword '{}'", name),
            TokenKind::IdOrKeyword { name, keyword: None } => format!("identifier '{}'", name),
            TokenKind::Int(n) => format!("number {}", n),
            TokenKind::Float(n) => format!("number {}", n),
            TokenKind::Str(s) => format!("string {:?}", s),
        }
    }
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: TextSpan,
}

impl Token {
    pub fn new(kind: TokenKind, span: TextSpan) -> Self {
        Self { kind, span }
    }

    /// Whether this token is the given punctuation kind.
    pub fn is_syntax(&self, kind: SyntaxKind) -> bool {
        matches!(self.kind, TokenKind::Syntax(k) if k == kind)
    }

    /// Whether this token is the end-of-input marker.
    pub fn is_eof(&self) -> bool {
        self.is_syntax(SyntaxKind::Eof)
    }

    /// Whether this token is the given keyword.
    pub fn is_keyword(&self, kind: KeywordKind) -> bool {
        matches!(self.kind, TokenKind::IdOrKeyword { keyword: Some(k), .. } if k == kind)
    }

    /// The keyword classification of this token, if any.
    pub fn keyword(&self) -> Option<KeywordKind> {
        match self.kind {
            TokenKind::IdOrKeyword { keyword, .. } => keyword,
            _ => None,
        }
    }
}
