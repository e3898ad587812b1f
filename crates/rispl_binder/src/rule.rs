//! Guarded rules: the unit of inline caching.
//!
//! A rule pairs a guard set with an action. Guards test operand shapes
//! (exact runtime class, or the specific wrapped class of a type handle);
//! a rule is reusable at a site whenever every guard holds for the
//! operands observed there. A failed resolution is an ordinary rule whose
//! action raises, so a site only fails when executed with the offending
//! shapes and can still succeed later with different ones.

use rispl_ast::expr::{BinaryOp, UnaryOp};
use rispl_runtime::{
    ops, BindErrorKind, ClassId, Cons, CtorDef, IndexerDef, MemberDef, RuntimeError, Shape, Value,
};
use std::fmt;
use std::sync::Arc;

/// A single guard condition over the operand shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Operand `index` has exactly this runtime class.
    ClassIs { index: usize, class: ClassId },
    /// Operand `index` is a type handle wrapping exactly this class: an
    /// exact-value test, since a type handle's identity is its wrapped
    /// type.
    WrappedIs { index: usize, class: ClassId },
}

impl Guard {
    pub fn holds(&self, shapes: &[Shape]) -> bool {
        match *self {
            Guard::ClassIs { index, class } => {
                shapes.get(index).map_or(false, |s| s.class == class)
            }
            Guard::WrappedIs { index, class } => {
                shapes.get(index).map_or(false, |s| s.wrapped == Some(class))
            }
        }
    }
}

/// The conjunction of guards carried by a rule.
#[derive(Debug, Clone, Default)]
pub struct GuardSet {
    guards: Vec<Guard>,
}

impl GuardSet {
    pub fn new(guards: Vec<Guard>) -> Self {
        Self { guards }
    }

    /// Guard the exact shape of every operand in `shapes[range]`,
    /// including wrapped-type identity for type handles.
    pub fn for_shapes(shapes: &[Shape]) -> Self {
        Self::for_shape_range(shapes, 0, shapes.len())
    }

    /// Guard operands `start..end` of the shape vector.
    pub fn for_shape_range(shapes: &[Shape], start: usize, end: usize) -> Self {
        let mut guards = Vec::with_capacity(end - start);
        for (index, shape) in shapes.iter().enumerate().take(end).skip(start) {
            guards.push(Guard::ClassIs {
                index,
                class: shape.class,
            });
            if let Some(wrapped) = shape.wrapped {
                guards.push(Guard::WrappedIs { index, class: wrapped });
            }
        }
        Self { guards }
    }

    /// Union with guards contributed by a nested resolution step.
    pub fn merge(mut self, other: GuardSet) -> Self {
        for guard in other.guards {
            if !self.guards.contains(&guard) {
                self.guards.push(guard);
            }
        }
        self
    }

    pub fn holds(&self, shapes: &[Shape]) -> bool {
        self.guards.iter().all(|g| g.holds(shapes))
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

/// What a matched rule does with its operands.
///
/// Operand convention: `operands[0]` is the target. `SetMember` appends
/// the value; `GetIndex` appends the indexes; `SetIndex` appends indexes
/// then the value; `Invoke`/`InvokeMember`/`CreateInstance` append the
/// arguments.
pub enum Action {
    /// Read a field/property member.
    GetField(Arc<MemberDef>),
    /// Write a field/property member; evaluates to the stored value.
    SetField(Arc<MemberDef>),
    /// Invoke a resolved method overload.
    CallMethod(Arc<MemberDef>),
    /// Invoke a resolved constructor overload.
    Construct(Arc<CtorDef>),
    /// Read through a resolved indexer.
    GetIndexer(Arc<IndexerDef>),
    /// Write through a resolved indexer; evaluates to the stored value.
    SetIndexer(Arc<IndexerDef>),
    /// List cell indexing: walk `rest` and read `first`.
    ConsGetIndex,
    /// List cell indexing: walk `rest` and write `first`.
    ConsSetIndex,
    /// Direct positional read on a native array.
    ArrayGetIndex,
    /// Direct positional write on a native array.
    ArraySetIndex,
    /// Call a first-class callable with exact parameter count.
    InvokeFunction,
    /// Late-bound slot read on a namespace object.
    NamespaceGet(Arc<str>),
    /// Late-bound slot write on a namespace object.
    NamespaceSet(Arc<str>),
    /// Late-bound member fetch on a namespace followed by invocation.
    NamespaceInvoke(Arc<str>),
    /// Apply native binary operator semantics.
    Binary(BinaryOp),
    /// Apply native unary operator semantics.
    Unary(UnaryOp),
    /// A deferred binding failure: raise when executed.
    Raise {
        kind: BindErrorKind,
        message: Arc<str>,
    },
}

impl Action {
    /// Execute the action against concrete operands.
    pub fn apply(&self, operands: &[Value]) -> Result<Value, RuntimeError> {
        match self {
            Action::GetField(member) => field_of(member).get(&operands[0]),
            Action::SetField(member) => {
                let value = &operands[1];
                field_of(member).set(&operands[0], value)?;
                Ok(value.clone())
            }
            Action::CallMethod(member) => {
                let method = member.as_method().expect("method action on non-method");
                method.invoke(&operands[0], &operands[1..])
            }
            Action::Construct(ctor) => ctor.construct(&operands[1..]),
            Action::GetIndexer(indexer) => indexer.get(&operands[0], &operands[1..]),
            Action::SetIndexer(indexer) => {
                let (value, indexes) = operands[1..].split_last().expect("set-index operands");
                indexer.set(&operands[0], indexes, value)?;
                Ok(value.clone())
            }
            Action::ConsGetIndex => {
                let cell = expect_cons(&operands[0])?;
                Cons::nth(cell, expect_index(&operands[1])?)
            }
            Action::ConsSetIndex => {
                let cell = expect_cons(&operands[0])?;
                Cons::set_nth(cell, expect_index(&operands[1])?, operands[2].clone())
            }
            Action::ArrayGetIndex => {
                let index = expect_index(&operands[1])?;
                match &operands[0] {
                    Value::Array(items) => items
                        .read()
                        .get(index as usize)
                        .cloned()
                        .ok_or(RuntimeError::IndexOutOfRange(index)),
                    other => Err(RuntimeError::Host(format!("expected an array, got {}", other))),
                }
            }
            Action::ArraySetIndex => {
                let index = expect_index(&operands[1])?;
                let value = operands[2].clone();
                match &operands[0] {
                    Value::Array(items) => {
                        let mut items = items.write();
                        match items.get_mut(index as usize) {
                            Some(slot) => {
                                *slot = value.clone();
                                Ok(value)
                            }
                            None => Err(RuntimeError::IndexOutOfRange(index)),
                        }
                    }
                    other => Err(RuntimeError::Host(format!("expected an array, got {}", other))),
                }
            }
            Action::InvokeFunction => match &operands[0] {
                Value::Function(func) => {
                    let args = &operands[1..];
                    if func.arity() != args.len() {
                        return Err(RuntimeError::bind(
                            BindErrorKind::WrongArity,
                            format!(
                                "function takes {} arguments, got {}",
                                func.arity(),
                                args.len()
                            ),
                        ));
                    }
                    func.invoke(args)
                }
                other => Err(RuntimeError::bind(
                    BindErrorKind::NotCallable,
                    format!("{} is not callable", other),
                )),
            },
            Action::NamespaceGet(name) => match &operands[0] {
                Value::Namespace(ns) => ns
                    .get(name)
                    .ok_or_else(|| RuntimeError::UnboundGlobal(name.to_string())),
                other => Err(RuntimeError::Host(format!("expected a namespace, got {}", other))),
            },
            Action::NamespaceSet(name) => match &operands[0] {
                Value::Namespace(ns) => {
                    let value = operands[1].clone();
                    ns.set(name, value.clone());
                    Ok(value)
                }
                other => Err(RuntimeError::Host(format!("expected a namespace, got {}", other))),
            },
            Action::NamespaceInvoke(name) => match &operands[0] {
                Value::Namespace(ns) => {
                    let callee = ns
                        .get(name)
                        .ok_or_else(|| RuntimeError::UnboundGlobal(name.to_string()))?;
                    let mut call_operands = Vec::with_capacity(operands.len());
                    call_operands.push(callee);
                    call_operands.extend_from_slice(&operands[1..]);
                    Action::InvokeFunction.apply(&call_operands)
                }
                other => Err(RuntimeError::Host(format!("expected a namespace, got {}", other))),
            },
            Action::Binary(op) => ops::apply_binary(*op, &operands[0], &operands[1]),
            Action::Unary(op) => ops::apply_unary(*op, &operands[0]),
            Action::Raise { kind, message } => Err(RuntimeError::bind(*kind, message.to_string())),
        }
    }

    /// Whether this action raises a deferred binding failure.
    pub fn is_raise(&self) -> bool {
        matches!(self, Action::Raise { .. })
    }
}

fn field_of(member: &MemberDef) -> &rispl_runtime::FieldDef {
    match member {
        MemberDef::Field(field) => field,
        MemberDef::Method(method) => {
            unreachable!("field action on method member '{}'", method.name)
        }
    }
}

fn expect_cons(value: &Value) -> Result<&Arc<Cons>, RuntimeError> {
    match value {
        Value::Cons(cell) => Ok(cell),
        other => Err(RuntimeError::Host(format!("expected a list, got {}", other))),
    }
}

fn expect_index(value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeError::Host(format!(
            "expected an integer index, got {}",
            other
        ))),
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::GetField(m) => write!(f, "GetField({})", m.name()),
            Action::SetField(m) => write!(f, "SetField({})", m.name()),
            Action::CallMethod(m) => write!(f, "CallMethod({})", m.name()),
            Action::Construct(_) => write!(f, "Construct"),
            Action::GetIndexer(_) => write!(f, "GetIndexer"),
            Action::SetIndexer(_) => write!(f, "SetIndexer"),
            Action::ConsGetIndex => write!(f, "ConsGetIndex"),
            Action::ConsSetIndex => write!(f, "ConsSetIndex"),
            Action::ArrayGetIndex => write!(f, "ArrayGetIndex"),
            Action::ArraySetIndex => write!(f, "ArraySetIndex"),
            Action::InvokeFunction => write!(f, "InvokeFunction"),
            Action::NamespaceGet(name) => write!(f, "NamespaceGet({})", name),
            Action::NamespaceSet(name) => write!(f, "NamespaceSet({})", name),
            Action::NamespaceInvoke(name) => write!(f, "NamespaceInvoke({})", name),
            Action::Binary(op) => write!(f, "Binary({})", op.as_str()),
            Action::Unary(_) => write!(f, "Unary"),
            Action::Raise { kind, .. } => write!(f, "Raise({:?})", kind),
        }
    }
}

/// A cached (guard-set, action) pair. Immutable once built; selected
/// purely by guard evaluation.
#[derive(Debug)]
pub struct Rule {
    pub guards: GuardSet,
    pub action: Action,
}

impl Rule {
    pub fn new(guards: GuardSet, action: Action) -> Self {
        Self { guards, action }
    }

    /// A deferred-failure rule with the same guards a successful rule
    /// would have had.
    pub fn raise(guards: GuardSet, kind: BindErrorKind, message: impl Into<Arc<str>>) -> Self {
        Self {
            guards,
            action: Action::Raise {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn matches(&self, shapes: &[Shape]) -> bool {
        self.guards.holds(shapes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rispl_runtime::classes;

    #[test]
    fn test_guard_class_is() {
        let shapes = [Value::Int(1).shape(), Value::str("x").shape()];
        assert!(Guard::ClassIs { index: 0, class: classes::INT }.holds(&shapes));
        assert!(Guard::ClassIs { index: 1, class: classes::STR }.holds(&shapes));
        assert!(!Guard::ClassIs { index: 0, class: classes::STR }.holds(&shapes));
        assert!(!Guard::ClassIs { index: 2, class: classes::INT }.holds(&shapes));
    }

    #[test]
    fn test_guard_set_for_shapes() {
        let shapes = [Value::Int(1).shape(), Value::Bool(true).shape()];
        let guards = GuardSet::for_shapes(&shapes);
        assert!(guards.holds(&shapes));
        assert!(!guards.holds(&[Value::Int(1).shape(), Value::Int(2).shape()]));
    }

    #[test]
    fn test_guard_set_merge_deduplicates() {
        let shapes = [Value::Int(1).shape()];
        let a = GuardSet::for_shapes(&shapes);
        let b = GuardSet::for_shapes(&shapes);
        assert_eq!(a.merge(b).len(), 1);
    }

    #[test]
    fn test_raise_rule() {
        let rule = Rule::raise(GuardSet::default(), BindErrorKind::MissingMember, "nope");
        assert!(rule.action.is_raise());
        let err = rule.action.apply(&[Value::Nil]).unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::MissingMember));
    }
}
