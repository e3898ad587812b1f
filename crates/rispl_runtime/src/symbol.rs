//! Interned symbols and the process-wide symbol table.

use crate::value::Value;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// An interned symbol. Identity is case-insensitive by name; the spelling
/// of the first interning wins. Carries a mutable value slot and a mutable
/// property list for future extension.
pub struct Symbol {
    name: String,
    value: RwLock<Value>,
    plist: RwLock<Value>,
}

impl Symbol {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: RwLock::new(Value::Nil),
            plist: RwLock::new(Value::Nil),
        }
    }

    /// The symbol's name with its original casing.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Value {
        self.value.read().clone()
    }

    pub fn set_value(&self, value: Value) {
        *self.value.write() = value;
    }

    /// The property list (a Cons list).
    pub fn plist(&self) -> Value {
        self.plist.read().clone()
    }

    pub fn set_plist(&self, plist: Value) {
        *self.plist.write() = plist;
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.name)
    }
}

/// The case-insensitive concurrent symbol intern table. `intern` returns
/// the canonical instance, creating it on first use. Symbols live for the
/// process lifetime once created.
#[derive(Default)]
pub struct SymbolTable {
    symbols: DashMap<String, Arc<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical symbol for the name, interning it on first use.
    /// Lookup is case-insensitive; the first-seen casing is kept.
    pub fn intern(&self, name: &str) -> Arc<Symbol> {
        let key = name.to_lowercase();
        let entry = self
            .symbols
            .entry(key)
            .or_insert_with(|| Arc::new(Symbol::new(name)));
        Arc::clone(entry.value())
    }

    /// Look up a symbol without creating it.
    pub fn get(&self, name: &str) -> Option<Arc<Symbol>> {
        self.symbols
            .get(&name.to_lowercase())
            .map(|e| Arc::clone(e.value()))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("len", &self.len())
            .finish()
    }
}
