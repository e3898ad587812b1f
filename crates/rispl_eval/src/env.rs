//! Runtime environment records for lexical slots.

use parking_lot::RwLock;
use rispl_runtime::Value;
use std::sync::Arc;

/// One environment record: a fixed block of slots plus a parent link.
/// Records are created when execution enters a `let*` or a function body
/// and shared by any closures captured inside.
pub struct Env {
    slots: RwLock<Vec<Value>>,
    parent: Option<Arc<Env>>,
}

impl Env {
    /// Push a record with `slots` nil-initialized cells.
    pub fn push(parent: &Option<Arc<Env>>, slots: usize) -> Option<Arc<Env>> {
        Some(Arc::new(Env {
            slots: RwLock::new(vec![Value::Nil; slots]),
            parent: parent.clone(),
        }))
    }

    /// Push a record pre-filled with argument values (function entry).
    pub fn push_with(parent: &Option<Arc<Env>>, slots: usize, args: &[Value]) -> Option<Arc<Env>> {
        let mut values = Vec::with_capacity(slots);
        values.extend_from_slice(args);
        values.resize(slots, Value::Nil);
        Some(Arc::new(Env {
            slots: RwLock::new(values),
            parent: parent.clone(),
        }))
    }

    fn record(env: &Option<Arc<Env>>, up: usize) -> &Arc<Env> {
        let mut current = env.as_ref().expect("environment chain too short");
        for _ in 0..up {
            current = current.parent.as_ref().expect("environment chain too short");
        }
        current
    }

    /// Read a slot `up` records out.
    pub fn get(env: &Option<Arc<Env>>, up: usize, index: usize) -> Value {
        Self::record(env, up).slots.read()[index].clone()
    }

    /// Write a slot `up` records out.
    pub fn set(env: &Option<Arc<Env>>, up: usize, index: usize, value: Value) {
        Self::record(env, up).slots.write()[index] = value;
    }
}
