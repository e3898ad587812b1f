//! AST node definitions.
//!
//! `Expr` is a tagged union of every construct the parser can produce.
//! `ListItem` models the raw list/atom structure used only inside quoted
//! data and parameter lists, where sub-forms are data rather than code.

use crate::token::KeywordKind;
use rispl_core::text::TextSpan;

/// An identifier (or keyword used as a name) with its source spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct IdToken {
    /// Exact source casing; lookup elsewhere is case-insensitive.
    pub name: String,
    /// Keyword classification, if the spelling matches a keyword.
    pub keyword: Option<KeywordKind>,
    pub span: TextSpan,
}

impl IdToken {
    pub fn new(name: impl Into<String>, keyword: Option<KeywordKind>, span: TextSpan) -> Self {
        Self {
            name: name.into(),
            keyword,
            span,
        }
    }
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Raw list-and-atom structure. Produced only for quoted data and for the
/// parameter lists of `defun`/`lambda`.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    List(Vec<ListItem>, TextSpan),
    Id(IdToken),
    Literal(Literal, TextSpan),
}

impl ListItem {
    pub fn span(&self) -> TextSpan {
        match self {
            ListItem::List(_, span) => *span,
            ListItem::Id(id) => id.span,
            ListItem::Literal(_, span) => *span,
        }
    }
}

/// The payload of a quote: a list, an identifier, or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteForm {
    List(Vec<ListItem>, TextSpan),
    Id(IdToken),
    Literal(Literal, TextSpan),
}

/// A single `let*` binding.
#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub name: IdToken,
    pub value: Expr,
}

/// Binary operator kinds. `And`/`Or` never reach the dispatch engine: the
/// code generator desugars them into conditionals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
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
}

impl BinaryOp {
    pub fn from_keyword(kind: KeywordKind) -> Option<BinaryOp> {
        Some(match kind {
            KeywordKind::Add => BinaryOp::Add,
            KeywordKind::Subtract => BinaryOp::Subtract,
            KeywordKind::Multiply => BinaryOp::Multiply,
            KeywordKind::Divide => BinaryOp::Divide,
            KeywordKind::Equal => BinaryOp::Equal,
            KeywordKind::NotEqual => BinaryOp::NotEqual,
            KeywordKind::GreaterThan => BinaryOp::GreaterThan,
            KeywordKind::LessThan => BinaryOp::LessThan,
            KeywordKind::And => BinaryOp::And,
            KeywordKind::Or => BinaryOp::Or,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "!=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::LessThan => "<",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// Unary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

/// An expression node. Every node owns its children; nodes are produced
/// once during parsing and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `(import ns-or-dotted-id [member-names] [as-names])`
    Import {
        namespaces: Vec<IdToken>,
        members: Vec<IdToken>,
        renames: Vec<IdToken>,
        span: TextSpan,
    },
    /// `(fun args...)` — also member invocation when `function` is dotted.
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
        span: TextSpan,
    },
    /// `(defun name (params...) body...)`
    Defun {
        name: IdToken,
        params: Vec<IdToken>,
        body: Vec<Expr>,
        span: TextSpan,
    },
    /// `(lambda (params...) body...)`
    Lambda {
        params: Vec<IdToken>,
        body: Vec<Expr>,
        span: TextSpan,
    },
    /// A name reference, or a `nil`/`true`/`false` constant.
    Identifier(IdToken),
    /// `'expr`
    Quote { form: QuoteForm, span: TextSpan },
    /// A literal constant.
    Literal { value: Literal, span: TextSpan },
    /// `(set lhs value)`
    Set {
        target: Box<Expr>,
        value: Box<Expr>,
        span: TextSpan,
    },
    /// `(let* ((id value)...) body...)`
    LetStar {
        bindings: Vec<LetBinding>,
        body: Vec<Expr>,
        span: TextSpan,
    },
    /// `(block body...)`
    Block { body: Vec<Expr>, span: TextSpan },
    /// `(eq a b)`
    Eq {
        left: Box<Expr>,
        right: Box<Expr>,
        span: TextSpan,
    },
    /// `(cons a b)`
    Cons {
        left: Box<Expr>,
        right: Box<Expr>,
        span: TextSpan,
    },
    /// `(list items...)`
    ListCall { elements: Vec<Expr>, span: TextSpan },
    /// `(if test consequent [alternative])`
    If {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternative: Option<Box<Expr>>,
        span: TextSpan,
    },
    /// Dotted postfix chain: `obj.a.(b 1 2).c`. Each segment is an
    /// `Identifier` or a `Call` whose function is an identifier.
    Dot {
        target: Box<Expr>,
        segments: Vec<Expr>,
        span: TextSpan,
    },
    /// `(new type-expr args...)`
    New {
        type_expr: Box<Expr>,
        args: Vec<Expr>,
        span: TextSpan,
    },
    /// `(loop body...)`
    Loop { body: Vec<Expr>, span: TextSpan },
    /// `(break [value])`
    Break {
        value: Option<Box<Expr>>,
        span: TextSpan,
    },
    /// `(elt obj idx...)`
    Elt {
        target: Box<Expr>,
        indexes: Vec<Expr>,
        span: TextSpan,
    },
    /// `(+ a b)` and friends.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: TextSpan,
    },
    /// `(not x)`
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: TextSpan,
    },
}

impl Expr {
    /// The source span covering this expression.
    pub fn span(&self) -> TextSpan {
        match self {
            Expr::Import { span, .. }
            | Expr::Call { span, .. }
            | Expr::Defun { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::Quote { span, .. }
            | Expr::Literal { span, .. }
            | Expr::Set { span, .. }
            | Expr::LetStar { span, .. }
            | Expr::Block { span, .. }
            | Expr::Eq { span, .. }
            | Expr::Cons { span, .. }
            | Expr::ListCall { span, .. }
            | Expr::If { span, .. }
            | Expr::Dot { span, .. }
            | Expr::New { span, .. }
            | Expr::Loop { span, .. }
            | Expr::Break { span, .. }
            | Expr::Elt { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. } => *span,
            Expr::Identifier(id) => id.span,
        }
    }

    /// Whether this is an identifier node (keyword-constants included).
    pub fn is_identifier(&self) -> bool {
        matches!(self, Expr::Identifier(_))
    }
}
