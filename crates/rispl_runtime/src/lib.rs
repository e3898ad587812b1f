//! rispl_runtime: the runtime object model and host type information.
//!
//! This crate holds everything generated code touches at execution time:
//! the dynamic [`Value`] model, mutable [`Cons`] cells, the process-wide
//! interned [`Symbol`] table, [`Namespace`] slot objects, and the
//! [`HostTypeTable`] — an explicit registration-table implementation of the
//! type-information provider that the dispatch engine consults for member,
//! constructor, and indexer lookup.

pub mod cons;
pub mod error;
pub mod namespace;
pub mod ops;
pub mod symbol;
pub mod types;
pub mod value;

pub use cons::Cons;
pub use error::{BindErrorKind, RuntimeError};
pub use namespace::Namespace;
pub use symbol::{Symbol, SymbolTable};
pub use types::{
    classes, ClassBuilder, ClassId, CtorDef, FieldDef, HostTypeTable, IndexerDef, MemberDef,
    MemberScope, MethodDef, ParamType, Shape, TypeHandle, TypeInfo,
};
pub use value::{Function, Instance, Value};
