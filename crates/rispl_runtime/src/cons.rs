//! The Cons cell: the language's native list representation.

use crate::error::RuntimeError;
use crate::value::Value;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A mutable pair. `rest` is another Cons for a proper list continuation,
/// nil for the list end, or any other value for a dotted tail.
///
/// No cycle detection is performed; printing a circular structure will not
/// terminate.
pub struct Cons {
    first: RwLock<Value>,
    rest: RwLock<Value>,
}

impl Cons {
    pub fn new(first: Value, rest: Value) -> Arc<Cons> {
        Arc::new(Cons {
            first: RwLock::new(first),
            rest: RwLock::new(rest),
        })
    }

    pub fn first(&self) -> Value {
        self.first.read().clone()
    }

    pub fn set_first(&self, value: Value) {
        *self.first.write() = value;
    }

    pub fn rest(&self) -> Value {
        self.rest.read().clone()
    }

    pub fn set_rest(&self, value: Value) {
        *self.rest.write() = value;
    }

    /// Build a proper list from elements; the empty list is nil.
    pub fn list(elements: &[Value]) -> Value {
        let mut result = Value::Nil;
        for element in elements.iter().rev() {
            result = Value::Cons(Cons::new(element.clone(), result));
        }
        result
    }

    /// Walk `rest` i times and return that cell, failing if the chain ends
    /// early.
    fn nth_cell(list: &Arc<Cons>, i: i64) -> Result<Arc<Cons>, RuntimeError> {
        if i < 0 {
            return Err(RuntimeError::IndexOutOfRange(i));
        }
        let mut cell = Arc::clone(list);
        let mut remaining = i;
        while remaining > 0 {
            let next = match cell.rest() {
                Value::Cons(next) => next,
                _ => return Err(RuntimeError::IndexOutOfRange(i)),
            };
            cell = next;
            remaining -= 1;
        }
        Ok(cell)
    }

    /// Get the i-th element of the list.
    pub fn nth(list: &Arc<Cons>, i: i64) -> Result<Value, RuntimeError> {
        Ok(Self::nth_cell(list, i)?.first())
    }

    /// Set the i-th element of the list and return the stored value.
    pub fn set_nth(list: &Arc<Cons>, i: i64, value: Value) -> Result<Value, RuntimeError> {
        let cell = Self::nth_cell(list, i)?;
        cell.set_first(value.clone());
        Ok(value)
    }
}

impl fmt::Display for Cons {
    /// Renders `(a b c)` for proper lists and `(a . b)` for a dotted tail.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.first())?;
        let mut rest = self.rest();
        loop {
            match rest {
                Value::Nil => break,
                Value::Cons(next) => {
                    write!(f, " {}", next.first())?;
                    rest = next.rest();
                }
                other => {
                    write!(f, " . {}", other)?;
                    break;
                }
            }
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Cons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_construction() {
        let list = Cons::list(&[Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(list.to_string(), "(1 2 3)");
        assert_eq!(Cons::list(&[]), Value::Nil);
    }

    #[test]
    fn test_nth() {
        let list = match Cons::list(&[Value::Int(1), Value::Int(2), Value::Int(3)]) {
            Value::Cons(cell) => cell,
            other => panic!("expected cons, got {:?}", other),
        };
        assert_eq!(Cons::nth(&list, 0).unwrap(), Value::Int(1));
        assert_eq!(Cons::nth(&list, 2).unwrap(), Value::Int(3));
        assert!(Cons::nth(&list, 3).is_err());
    }

    #[test]
    fn test_set_nth() {
        let list = match Cons::list(&[Value::Int(1), Value::Int(2), Value::Int(3)]) {
            Value::Cons(cell) => cell,
            other => panic!("expected cons, got {:?}", other),
        };
        let stored = Cons::set_nth(&list, 1, Value::Int(100)).unwrap();
        assert_eq!(stored, Value::Int(100));
        assert_eq!(Cons::nth(&list, 1).unwrap(), Value::Int(100));
    }

    #[test]
    fn test_dotted_display() {
        let cell = Cons::new(Value::Int(1), Value::Int(2));
        assert_eq!(cell.to_string(), "(1 . 2)");
    }

    #[test]
    fn test_nested_display() {
        let inner = Cons::list(&[Value::Int(2), Value::Int(3)]);
        let outer = Cons::new(Value::Int(1), Value::Cons(Cons::new(inner, Value::Nil)));
        assert_eq!(outer.to_string(), "(1 (2 3))");
    }
}
