//! The execution context: process-scoped state shared by every compiled
//! unit that runs against it.

use crate::key::{BinderTable, CallSiteKey};
use crate::site::CallSite;
use rispl_runtime::{HostTypeTable, Namespace, RuntimeError, Symbol, SymbolTable, TypeInfo, Value};
use std::fmt;
use std::sync::Arc;

/// Holds the host globals namespace, the symbol intern table, the host
/// type-information table, and the canonical binder table. Compiled units
/// take `(context, module namespace)` and may run concurrently against one
/// context: all three core tables support concurrent get-or-create.
pub struct ExecutionContext {
    globals: Arc<Namespace>,
    symbols: SymbolTable,
    types: Arc<HostTypeTable>,
    binders: BinderTable,
}

impl ExecutionContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            globals: Namespace::new(),
            symbols: SymbolTable::new(),
            types: Arc::new(HostTypeTable::new()),
            binders: BinderTable::new(),
        })
    }

    /// The host globals namespace: the root that imports resolve against.
    pub fn globals(&self) -> &Arc<Namespace> {
        &self.globals
    }

    /// The process-wide symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Intern a symbol, usable by hosts for sentinel comparison.
    pub fn intern(&self, name: &str) -> Arc<Symbol> {
        self.symbols.intern(name)
    }

    /// The host type table, for registering classes.
    pub fn types(&self) -> &Arc<HostTypeTable> {
        &self.types
    }

    /// The type-information provider view of the type table.
    pub fn type_info(&self) -> &dyn TypeInfo {
        self.types.as_ref()
    }

    /// The canonical binder table.
    pub fn binders(&self) -> &BinderTable {
        &self.binders
    }

    /// Create a call site for an operation, sharing the canonical binder
    /// with every other site carrying the same key.
    pub fn call_site(&self, key: CallSiteKey) -> CallSite {
        CallSite::new(self.binders.binder(key))
    }

    /// Create a call site with an explicit inline-cache bound.
    pub fn call_site_with_bound(&self, key: CallSiteKey, max_cache: usize) -> CallSite {
        CallSite::with_cache_bound(self.binders.binder(key), max_cache)
    }

    /// Create a fresh module namespace value.
    pub fn make_module(&self) -> Arc<Namespace> {
        Namespace::new()
    }

    /// Perform an `import` against this context's globals.
    ///
    /// With a single namespace name, the value is fetched from globals.
    /// With a dotted path, each segment must resolve to a namespace to
    /// descend into. If `members` is empty the resolved value itself is
    /// stored in the module under the last path segment; otherwise each
    /// member is fetched from the resolved value and stored under its own
    /// name, or under the matching rename when renames are given.
    pub fn import(
        &self,
        module: &Namespace,
        namespaces: &[String],
        members: &[String],
        renames: &[String],
    ) -> Result<Value, RuntimeError> {
        let mut value = Value::Namespace(Arc::clone(&self.globals));
        for name in namespaces {
            value = get_slot(&value, name)?;
        }

        if members.is_empty() {
            let last = namespaces.last().map(String::as_str).unwrap_or_default();
            module.set(last, value);
        } else {
            let renames = if renames.is_empty() { members } else { renames };
            for (member, rename) in members.iter().zip(renames) {
                let fetched = get_slot(&value, member)?;
                module.set(rename, fetched);
            }
        }

        Ok(Value::Nil)
    }
}

fn get_slot(value: &Value, name: &str) -> Result<Value, RuntimeError> {
    match value {
        Value::Namespace(ns) => ns
            .get(name)
            .ok_or_else(|| RuntimeError::ImportNotFound(name.to_string())),
        _ => Err(RuntimeError::ImportNotFound(name.to_string())),
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("globals", &self.globals.len())
            .field("symbols", &self.symbols.len())
            .field("binders", &self.binders.len())
            .finish()
    }
}
