//! The executable representation: a tree of `Code` nodes.
//!
//! Generated once per compilation and immutable afterwards; a tree-walking
//! evaluator runs it against an `(execution context, module namespace)`
//! pair. Dynamic operation sites are embedded as [`Code::Dynamic`] nodes
//! owning their inline caches.

use crate::scope::SlotRef;
use rispl_binder::CallSite;
use rispl_runtime::Value;
use std::sync::Arc;

/// One executable expression node.
#[derive(Debug)]
pub enum Code {
    /// A constant: literal, quoted datum, or keyword constant.
    Const(Value),
    /// Read a lexical slot.
    Local(SlotRef),
    /// Write a lexical slot; evaluates to the stored value.
    AssignLocal(SlotRef, Box<Code>),
    /// The module namespace value.
    Module,
    /// A dynamic operation site: operands are evaluated left to right and
    /// handed to the site's cache/binder machinery.
    Dynamic {
        site: Arc<CallSite>,
        operands: Vec<Code>,
    },
    /// A sequence; value = last expression, nil when empty.
    Block(Vec<Code>),
    /// Enter an environment with `slots` cells and run the body (binding
    /// initializers first, then body expressions); value = last.
    LetStar { slots: usize, body: Vec<Code> },
    /// Conditional on an already-wrapped boolean test.
    If {
        test: Box<Code>,
        consequent: Box<Code>,
        alternative: Box<Code>,
    },
    /// Coerce to a boolean: a boolean is itself; anything else is true
    /// iff it is not nil. Evaluates the operand exactly once.
    Truthy(Box<Code>),
    /// Negated truthiness.
    Not(Box<Code>),
    /// Repeat the body forever; a `break` in the body supplies the value.
    Loop(Vec<Code>),
    /// Escape the nearest enclosing loop with an optional value.
    Break(Option<Box<Code>>),
    /// Create a closure over the current environment.
    Lambda(Arc<LambdaDef>),
    /// Identity/primitive equality.
    Eq { left: Box<Code>, right: Box<Code> },
    /// Allocate a cons cell.
    ConsCell { left: Box<Code>, right: Box<Code> },
    /// Build a proper list from element values.
    ListCall(Vec<Code>),
    /// Resolve names from the host globals into the module namespace.
    Import {
        namespaces: Vec<String>,
        members: Vec<String>,
        renames: Vec<String>,
    },
}

/// A generated function body: parameter count plus code. The closure's
/// environment chain is captured when the `Lambda` node is evaluated.
#[derive(Debug)]
pub struct LambdaDef {
    /// Name for diagnostics and printing, when known (`defun`).
    pub name: Option<String>,
    /// Number of parameters; slots 0..params hold the arguments.
    pub params: usize,
    pub body: Vec<Code>,
}

/// A compiled unit: takes `(execution context, module namespace)` and
/// produces a value.
#[derive(Debug)]
pub struct Executable {
    pub body: Vec<Code>,
}

impl Executable {
    pub fn new(body: Vec<Code>) -> Self {
        Self { body }
    }
}
