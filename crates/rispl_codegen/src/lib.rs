//! rispl_codegen: scope resolution and code generation.
//!
//! Walks the AST with a chained lexical-scope structure, resolves
//! identifiers to local slots or late-bound global lookups, desugars
//! `and`/`or` into conditionals with fresh temporaries, and emits a `Code`
//! tree with embedded dynamic operation sites wherever static resolution
//! was not possible. Structural errors (break outside a loop, import
//! outside the module scope, unsupported assignment targets) are raised
//! here, not deferred to execution.

pub mod code;
pub mod error;
pub mod generate;
pub mod scope;

pub use code::{Code, Executable, LambdaDef};
pub use error::AnalysisError;
pub use generate::{generate_expression, generate_program, Generator};
pub use scope::{ScopeArena, ScopeFlags, ScopeId, SlotRef};
