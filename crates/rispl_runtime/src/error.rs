//! Runtime and binding error types.

use thiserror::Error;

/// The kind of a deferred binding failure. Binding failures never raise
/// from inside the dispatch engine; they become guarded raise-on-execution
/// rules so that a call site only fails when actually run with the
/// offending operand shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindErrorKind {
    /// No member with the requested name, or the member cannot be accessed
    /// the way the operation requires.
    MissingMember,
    /// More than one member matched a name that requires a unique match.
    AmbiguousMember,
    /// No method overload matched the arity and argument types.
    NoMatchingOverload,
    /// No constructor matched the arity and argument types.
    NoMatchingConstructor,
    /// No indexer matched the arity and argument types.
    NoMatchingIndexer,
    /// The operation requires a different number of operands.
    WrongArity,
    /// The invocation target is not a callable value.
    NotCallable,
    /// Invoking a field or property member as a method is not supported.
    NotInvokableMember,
    /// The operator is not defined for the operand types.
    NoSuchOperator,
}

impl BindErrorKind {
    pub fn describe(self) -> &'static str {
        match self {
            BindErrorKind::MissingMember => "missing member",
            BindErrorKind::AmbiguousMember => "ambiguous member",
            BindErrorKind::NoMatchingOverload => "no matching overload",
            BindErrorKind::NoMatchingConstructor => "no matching constructor",
            BindErrorKind::NoMatchingIndexer => "no matching indexer",
            BindErrorKind::WrongArity => "wrong number of arguments",
            BindErrorKind::NotCallable => "target is not callable",
            BindErrorKind::NotInvokableMember => "member is not invokable",
            BindErrorKind::NoSuchOperator => "operator not defined for operand types",
        }
    }
}

/// An error raised while executing generated code.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// A deferred binding failure whose guard matched at execution time.
    #[error("can't bind: {}: {message}", kind.describe())]
    Bind { kind: BindErrorKind, message: String },

    /// A list or array index walked past the end of the structure.
    #[error("index out of range: {0}")]
    IndexOutOfRange(i64),

    /// A late-bound global lookup found no slot with the name.
    #[error("name '{0}' is not defined")]
    UnboundGlobal(String),

    /// Integer division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A break escaped the function it appeared in without an enclosing
    /// loop to receive it.
    #[error("break executed outside of any enclosing loop")]
    BreakOutsideLoop,

    /// An import could not resolve its target in the host globals.
    #[error("import: can't find name in globals -- {0}")]
    ImportNotFound(String),

    /// A host-registered member or function reported a failure.
    #[error("{0}")]
    Host(String),
}

impl RuntimeError {
    /// Convenience constructor for deferred binding failures.
    pub fn bind(kind: BindErrorKind, message: impl Into<String>) -> Self {
        RuntimeError::Bind {
            kind,
            message: message.into(),
        }
    }

    /// The binding failure kind, if this is a binding error.
    pub fn bind_kind(&self) -> Option<BindErrorKind> {
        match self {
            RuntimeError::Bind { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
