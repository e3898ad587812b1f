//! Call-site keys and the canonical binder table.
//!
//! Structurally identical sites (same operation kind, name, arity) share
//! one binder instance and therefore share cached rules. One site
//! somewhere producing a rule means every functionally equivalent site can
//! reuse it instead of resolving again.

use crate::site::Binder;
use dashmap::DashMap;
use rispl_ast::expr::{BinaryOp, UnaryOp};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The kind of a dynamic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    GetMember,
    SetMember,
    GetIndex,
    SetIndex,
    Invoke,
    InvokeMember,
    CreateInstance,
    Binary(BinaryOp),
    Unary(UnaryOp),
}

/// Canonical identity for a dynamic operation: kind, optional member name
/// (compared case-insensitively), optional arity. Used to deduplicate
/// binder instances process-wide.
#[derive(Debug, Clone)]
pub struct CallSiteKey {
    pub kind: OpKind,
    /// The member name with its source casing, kept for host metadata.
    pub name: Option<Arc<str>>,
    pub arity: Option<usize>,
}

impl CallSiteKey {
    pub fn get_member(name: &str) -> Self {
        Self {
            kind: OpKind::GetMember,
            name: Some(Arc::from(name)),
            arity: None,
        }
    }

    pub fn set_member(name: &str) -> Self {
        Self {
            kind: OpKind::SetMember,
            name: Some(Arc::from(name)),
            arity: None,
        }
    }

    pub fn get_index(arity: usize) -> Self {
        Self {
            kind: OpKind::GetIndex,
            name: None,
            arity: Some(arity),
        }
    }

    pub fn set_index(arity: usize) -> Self {
        Self {
            kind: OpKind::SetIndex,
            name: None,
            arity: Some(arity),
        }
    }

    pub fn invoke(arity: usize) -> Self {
        Self {
            kind: OpKind::Invoke,
            name: None,
            arity: Some(arity),
        }
    }

    pub fn invoke_member(name: &str, arity: usize) -> Self {
        Self {
            kind: OpKind::InvokeMember,
            name: Some(Arc::from(name)),
            arity: Some(arity),
        }
    }

    pub fn create_instance(arity: usize) -> Self {
        Self {
            kind: OpKind::CreateInstance,
            name: None,
            arity: Some(arity),
        }
    }

    pub fn binary(op: BinaryOp) -> Self {
        Self {
            kind: OpKind::Binary(op),
            name: None,
            arity: None,
        }
    }

    pub fn unary(op: UnaryOp) -> Self {
        Self {
            kind: OpKind::Unary(op),
            name: None,
            arity: None,
        }
    }

    /// The member name, if this operation has one.
    pub fn member_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for CallSiteKey {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.arity == other.arity
            && match (&self.name, &other.name) {
                (None, None) => true,
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            }
    }
}

impl Eq for CallSiteKey {}

impl Hash for CallSiteKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.arity.hash(state);
        if let Some(name) = &self.name {
            for byte in name.bytes() {
                byte.to_ascii_lowercase().hash(state);
            }
        }
    }
}

impl fmt::Display for CallSiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(name) = &self.name {
            write!(f, " '{}'", name)?;
        }
        if let Some(arity) = self.arity {
            write!(f, "/{}", arity)?;
        }
        Ok(())
    }
}

/// The process-wide concurrent table of canonical binders, keyed by
/// [`CallSiteKey`]. `binder` is an atomic get-or-create; binders persist
/// for the table's lifetime once created.
#[derive(Default)]
pub struct BinderTable {
    binders: DashMap<CallSiteKey, Arc<Binder>>,
}

impl BinderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical binder for the key, creating it on first use.
    pub fn binder(&self, key: CallSiteKey) -> Arc<Binder> {
        let entry = self
            .binders
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Binder::new(key)));
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.binders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }
}

impl fmt::Debug for BinderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinderTable")
            .field("len", &self.len())
            .finish()
    }
}
