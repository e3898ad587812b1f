//! rispl_binder: the dynamic dispatch engine.
//!
//! Generated code contains dynamic operation sites: member access,
//! indexing, invocation, construction, and operators whose meaning depends
//! on operand shapes observed at run time. Each site owns a small inline
//! cache of guarded rules and shares a canonical [`Binder`] with every
//! other site that performs the same operation, so resolution work is
//! amortized across the whole program. Resolution consults the host's
//! type-information provider; failures become guarded raise-on-execution
//! rules rather than raising inside the engine.

pub mod context;
pub mod key;
pub mod resolve;
pub mod rule;
pub mod site;

pub use context::ExecutionContext;
pub use key::{BinderTable, CallSiteKey, OpKind};
pub use rule::{Action, Guard, GuardSet, Rule};
pub use site::{Binder, CallSite};
