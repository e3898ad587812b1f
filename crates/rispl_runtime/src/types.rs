//! Host type information: classes, members, and the registration table.
//!
//! Rust has no runtime reflection, so the type-information provider is an
//! explicit registration table: hosts describe each class's public members,
//! constructors, and indexers up front, and the dispatch engine consults
//! the table through the [`TypeInfo`] interface. Member names are matched
//! case-insensitively; overloads keep registration order, and resolution
//! takes the first arity-and-assignability match in that order.

use crate::error::RuntimeError;
use crate::value::Value;
use dashmap::DashMap;
use indexmap::IndexMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Identifies a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

/// Well-known classes of the runtime's own types. Hosts get ids from
/// [`HostTypeTable::register`] starting at `FIRST_HOST`.
pub mod classes {
    use super::ClassId;

    pub const NIL: ClassId = ClassId(0);
    pub const BOOL: ClassId = ClassId(1);
    pub const INT: ClassId = ClassId(2);
    pub const DOUBLE: ClassId = ClassId(3);
    pub const STR: ClassId = ClassId(4);
    pub const SYMBOL: ClassId = ClassId(5);
    pub const CONS: ClassId = ClassId(6);
    pub const ARRAY: ClassId = ClassId(7);
    pub const FUNCTION: ClassId = ClassId(8);
    pub const TYPE: ClassId = ClassId(9);
    pub const NAMESPACE: ClassId = ClassId(10);

    /// The first id handed out to host registrations.
    pub const FIRST_HOST: u32 = 32;
}

/// A host type used as a first-class value. Identity is the wrapped class:
/// two handles to the same class are the same type value. Member lookup on
/// a handle resolves against the wrapped class's static surface; when the
/// handle must act as an ordinary instance it re-dispatches against the
/// `Type` class's own instance surface.
#[derive(Clone)]
pub struct TypeHandle {
    pub class: ClassId,
    name: Arc<str>,
}

impl TypeHandle {
    pub fn new(class: ClassId, name: impl Into<Arc<str>>) -> Self {
        Self {
            class,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
    }
}

impl Eq for TypeHandle {}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.name)
    }
}

/// The runtime shape of an operand as seen by rule guards: its class, and
/// for type handles the specific wrapped class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub class: ClassId,
    pub wrapped: Option<ClassId>,
}

impl Shape {
    pub fn of_class(class: ClassId) -> Shape {
        Shape {
            class,
            wrapped: None,
        }
    }
}

/// A parameter's declared type for assignability filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Accepts any value.
    Any,
    /// Expects a type identity; a type-handle argument is assignable.
    TypeIdentity,
    /// Expects an instance of the exact class.
    Class(ClassId),
}

/// Which member surface a lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberScope {
    Static,
    Instance,
    Both,
}

impl MemberScope {
    fn admits(self, is_static: bool) -> bool {
        match self {
            MemberScope::Static => is_static,
            MemberScope::Instance => !is_static,
            MemberScope::Both => true,
        }
    }
}

type GetFn = Box<dyn Fn(&Value) -> Result<Value, RuntimeError> + Send + Sync>;
type SetFn = Box<dyn Fn(&Value, &Value) -> Result<(), RuntimeError> + Send + Sync>;
type MethodFn = Box<dyn Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;
type CtorFn = Box<dyn Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync>;
type IndexGetFn = Box<dyn Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;
type IndexSetFn = Box<dyn Fn(&Value, &[Value], &Value) -> Result<(), RuntimeError> + Send + Sync>;

/// A field or property: readable, optionally writable.
pub struct FieldDef {
    pub name: String,
    pub is_static: bool,
    get: GetFn,
    set: Option<SetFn>,
}

impl FieldDef {
    pub fn get(&self, target: &Value) -> Result<Value, RuntimeError> {
        (self.get)(target)
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    pub fn set(&self, target: &Value, value: &Value) -> Result<(), RuntimeError> {
        match &self.set {
            Some(set) => set(target, value),
            None => Err(RuntimeError::Host(format!(
                "member '{}' is read-only",
                self.name
            ))),
        }
    }
}

/// A method overload. Overloads with the same name are separate entries in
/// registration order.
pub struct MethodDef {
    pub name: String,
    pub is_static: bool,
    pub params: Vec<ParamType>,
    invoke: MethodFn,
}

impl MethodDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn invoke(&self, target: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.invoke)(target, args)
    }
}

/// A member of a class: a field/property or one method overload.
pub enum MemberDef {
    Field(FieldDef),
    Method(MethodDef),
}

impl MemberDef {
    pub fn name(&self) -> &str {
        match self {
            MemberDef::Field(field) => &field.name,
            MemberDef::Method(method) => &method.name,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            MemberDef::Field(field) => field.is_static,
            MemberDef::Method(method) => method.is_static,
        }
    }

    pub fn as_method(&self) -> Option<&MethodDef> {
        match self {
            MemberDef::Method(method) => Some(method),
            MemberDef::Field(_) => None,
        }
    }
}

impl fmt::Debug for MemberDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberDef::Field(field) => write!(f, "Field({})", field.name),
            MemberDef::Method(method) => {
                write!(f, "Method({}/{})", method.name, method.params.len())
            }
        }
    }
}

/// A constructor overload.
pub struct CtorDef {
    pub params: Vec<ParamType>,
    construct: CtorFn,
}

impl CtorDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn construct(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.construct)(args)
    }
}

/// An indexer: get, optionally set, keyed by index parameter types.
pub struct IndexerDef {
    pub params: Vec<ParamType>,
    get: IndexGetFn,
    set: Option<IndexSetFn>,
}

impl IndexerDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn get(&self, target: &Value, indexes: &[Value]) -> Result<Value, RuntimeError> {
        (self.get)(target, indexes)
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    pub fn set(&self, target: &Value, indexes: &[Value], value: &Value) -> Result<(), RuntimeError> {
        match &self.set {
            Some(set) => set(target, indexes, value),
            None => Err(RuntimeError::Host("indexer is read-only".to_string())),
        }
    }
}

/// A registered class: members keyed by lowercase name, in registration
/// order.
struct ClassDef {
    name: Arc<str>,
    members: IndexMap<String, Vec<Arc<MemberDef>>>,
    constructors: Vec<Arc<CtorDef>>,
    indexers: Vec<Arc<IndexerDef>>,
}

/// The type-information provider interface the dispatch engine consumes:
/// member/constructor/indexer enumeration plus the assignability test.
pub trait TypeInfo: Send + Sync {
    /// The class's name, if registered.
    fn class_name(&self, class: ClassId) -> Option<Arc<str>>;

    /// All members with the (case-insensitive) name on the given surface,
    /// in registration order.
    fn find_members(&self, class: ClassId, name: &str, scope: MemberScope) -> Vec<Arc<MemberDef>>;

    /// The class's constructors, in registration order.
    fn constructors(&self, class: ClassId) -> Vec<Arc<CtorDef>>;

    /// The class's indexers, in registration order.
    fn indexers(&self, class: ClassId) -> Vec<Arc<IndexerDef>>;

    /// Whether a value of the given shape is assignable to the parameter.
    /// A type handle is assignable to a parameter expecting a type
    /// identity.
    fn is_assignable(&self, param: ParamType, shape: Shape) -> bool;
}

/// Builder for one class registration.
pub struct ClassBuilder {
    name: String,
    members: IndexMap<String, Vec<Arc<MemberDef>>>,
    constructors: Vec<Arc<CtorDef>>,
    indexers: Vec<Arc<IndexerDef>>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: IndexMap::new(),
            constructors: Vec::new(),
            indexers: Vec::new(),
        }
    }

    fn add_member(&mut self, name: &str, member: MemberDef) {
        self.members
            .entry(name.to_lowercase())
            .or_default()
            .push(Arc::new(member));
    }

    /// Add a read-only instance field/property.
    pub fn field(
        mut self,
        name: &str,
        get: impl Fn(&Value) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.add_member(
            name,
            MemberDef::Field(FieldDef {
                name: name.to_string(),
                is_static: false,
                get: Box::new(get),
                set: None,
            }),
        );
        self
    }

    /// Add a read-write instance field/property.
    pub fn field_mut(
        mut self,
        name: &str,
        get: impl Fn(&Value) -> Result<Value, RuntimeError> + Send + Sync + 'static,
        set: impl Fn(&Value, &Value) -> Result<(), RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.add_member(
            name,
            MemberDef::Field(FieldDef {
                name: name.to_string(),
                is_static: false,
                get: Box::new(get),
                set: Some(Box::new(set)),
            }),
        );
        self
    }

    /// Add a read-only static field/property. The getter receives the
    /// type-handle value as its target.
    pub fn static_field(
        mut self,
        name: &str,
        get: impl Fn(&Value) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.add_member(
            name,
            MemberDef::Field(FieldDef {
                name: name.to_string(),
                is_static: true,
                get: Box::new(get),
                set: None,
            }),
        );
        self
    }

    /// Add an instance method overload.
    pub fn method(
        mut self,
        name: &str,
        params: &[ParamType],
        invoke: impl Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.add_member(
            name,
            MemberDef::Method(MethodDef {
                name: name.to_string(),
                is_static: false,
                params: params.to_vec(),
                invoke: Box::new(invoke),
            }),
        );
        self
    }

    /// Add a static method overload. The target passed to `invoke` is the
    /// type-handle value.
    pub fn static_method(
        mut self,
        name: &str,
        params: &[ParamType],
        invoke: impl Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.add_member(
            name,
            MemberDef::Method(MethodDef {
                name: name.to_string(),
                is_static: true,
                params: params.to_vec(),
                invoke: Box::new(invoke),
            }),
        );
        self
    }

    /// Add a constructor overload.
    pub fn constructor(
        mut self,
        params: &[ParamType],
        construct: impl Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.constructors.push(Arc::new(CtorDef {
            params: params.to_vec(),
            construct: Box::new(construct),
        }));
        self
    }

    /// Add a read-only indexer.
    pub fn indexer(
        mut self,
        params: &[ParamType],
        get: impl Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.indexers.push(Arc::new(IndexerDef {
            params: params.to_vec(),
            get: Box::new(get),
            set: None,
        }));
        self
    }

    /// Add a read-write indexer.
    pub fn indexer_mut(
        mut self,
        params: &[ParamType],
        get: impl Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
        set: impl Fn(&Value, &[Value], &Value) -> Result<(), RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.indexers.push(Arc::new(IndexerDef {
            params: params.to_vec(),
            get: Box::new(get),
            set: Some(Box::new(set)),
        }));
        self
    }

    fn build(self, name: Arc<str>) -> ClassDef {
        ClassDef {
            name,
            members: self.members,
            constructors: self.constructors,
            indexers: self.indexers,
        }
    }
}

/// The registration-table type-information provider. Thread-safe;
/// registration and lookup may interleave freely.
pub struct HostTypeTable {
    classes: DashMap<u32, Arc<ClassDef>>,
    by_name: DashMap<String, ClassId>,
    next_id: AtomicU32,
}

impl HostTypeTable {
    /// Create a table pre-seeded with the runtime's own classes, so
    /// scripts can reflect on lists, symbols, strings, and type handles.
    pub fn new() -> Self {
        let table = Self {
            classes: DashMap::new(),
            by_name: DashMap::new(),
            next_id: AtomicU32::new(classes::FIRST_HOST),
        };
        table.seed_builtins();
        table
    }

    /// Register a class and return its type handle.
    pub fn register(&self, builder: ClassBuilder) -> TypeHandle {
        let id = ClassId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.insert(id, builder)
    }

    /// Pre-allocate a class with an empty surface, so that member and
    /// constructor closures passed to [`define`](Self::define) can
    /// construct instances of the class being defined.
    pub fn declare(&self, name: &str) -> TypeHandle {
        let id = ClassId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.insert(id, ClassBuilder::new(name))
    }

    /// Fill in (or replace) a declared class's surface. The handle's name
    /// wins over the builder's.
    pub fn define(&self, handle: &TypeHandle, builder: ClassBuilder) {
        let def = Arc::new(builder.build(handle.name_arc()));
        self.classes.insert(handle.class.0, def);
    }

    fn insert(&self, id: ClassId, builder: ClassBuilder) -> TypeHandle {
        let name: Arc<str> = Arc::from(builder.name.as_str());
        let def = Arc::new(builder.build(Arc::clone(&name)));
        self.by_name.insert(name.to_lowercase(), id);
        self.classes.insert(id.0, def);
        TypeHandle::new(id, name)
    }

    /// The handle for a registered class id.
    pub fn handle(&self, class: ClassId) -> Option<TypeHandle> {
        self.classes
            .get(&class.0)
            .map(|def| TypeHandle::new(class, Arc::clone(&def.name)))
    }

    /// Case-insensitive class lookup by name.
    pub fn lookup(&self, name: &str) -> Option<TypeHandle> {
        let id = *self.by_name.get(&name.to_lowercase())?;
        self.handle(id)
    }

    // ========================================================================
    // Builtin classes
    // ========================================================================

    fn seed_builtins(&self) {
        self.insert(classes::NIL, ClassBuilder::new("Nil"));
        self.insert(classes::BOOL, ClassBuilder::new("Bool"));
        self.insert(classes::INT, ClassBuilder::new("Int"));
        self.insert(classes::DOUBLE, ClassBuilder::new("Double"));
        self.insert(classes::STR, str_class());
        self.insert(classes::SYMBOL, symbol_class());
        self.insert(classes::CONS, cons_class());
        self.insert(classes::ARRAY, array_class());
        self.insert(classes::FUNCTION, ClassBuilder::new("Function"));
        self.insert(classes::TYPE, type_class());
        self.insert(classes::NAMESPACE, ClassBuilder::new("Namespace"));
    }
}

impl Default for HostTypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostTypeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostTypeTable")
            .field("classes", &self.classes.len())
            .finish()
    }
}

impl TypeInfo for HostTypeTable {
    fn class_name(&self, class: ClassId) -> Option<Arc<str>> {
        self.classes.get(&class.0).map(|def| Arc::clone(&def.name))
    }

    fn find_members(&self, class: ClassId, name: &str, scope: MemberScope) -> Vec<Arc<MemberDef>> {
        let Some(def) = self.classes.get(&class.0) else {
            return Vec::new();
        };
        match def.members.get(&name.to_lowercase()) {
            Some(entries) => entries
                .iter()
                .filter(|m| scope.admits(m.is_static()))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    fn constructors(&self, class: ClassId) -> Vec<Arc<CtorDef>> {
        self.classes
            .get(&class.0)
            .map(|def| def.constructors.clone())
            .unwrap_or_default()
    }

    fn indexers(&self, class: ClassId) -> Vec<Arc<IndexerDef>> {
        self.classes
            .get(&class.0)
            .map(|def| def.indexers.clone())
            .unwrap_or_default()
    }

    fn is_assignable(&self, param: ParamType, shape: Shape) -> bool {
        match param {
            ParamType::Any => true,
            ParamType::TypeIdentity => shape.class == classes::TYPE,
            ParamType::Class(class) => shape.class == class,
        }
    }
}

// ============================================================================
// Builtin class definitions
// ============================================================================

fn expect_str(value: &Value) -> Result<&Arc<String>, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(RuntimeError::Host(format!("expected a string, got {}", other))),
    }
}

fn str_class() -> ClassBuilder {
    ClassBuilder::new("Str")
        .field("Length", |v| {
            Ok(Value::Int(expect_str(v)?.chars().count() as i64))
        })
        .method("ToUpper", &[], |v, _| {
            Ok(Value::str(expect_str(v)?.to_uppercase()))
        })
        .method("ToLower", &[], |v, _| {
            Ok(Value::str(expect_str(v)?.to_lowercase()))
        })
        .method("Substring", &[ParamType::Class(classes::INT)], |v, args| {
            let s = expect_str(v)?;
            let start = expect_int(&args[0])?;
            substring(s, start, None)
        })
        .method(
            "Substring",
            &[ParamType::Class(classes::INT), ParamType::Class(classes::INT)],
            |v, args| {
                let s = expect_str(v)?;
                let start = expect_int(&args[0])?;
                let count = expect_int(&args[1])?;
                substring(s, start, Some(count))
            },
        )
}

fn expect_int(value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeError::Host(format!("expected an integer, got {}", other))),
    }
}

fn substring(s: &str, start: i64, count: Option<i64>) -> Result<Value, RuntimeError> {
    let len = s.chars().count() as i64;
    if start < 0 || start > len {
        return Err(RuntimeError::IndexOutOfRange(start));
    }
    let tail = s.chars().skip(start as usize);
    let result: String = match count {
        Some(count) => {
            if count < 0 || start + count > len {
                return Err(RuntimeError::IndexOutOfRange(start + count));
            }
            tail.take(count as usize).collect()
        }
        None => tail.collect(),
    };
    Ok(Value::str(result))
}

fn symbol_class() -> ClassBuilder {
    ClassBuilder::new("Symbol")
        .field("Name", |v| match v {
            Value::Symbol(sym) => Ok(Value::str(sym.name())),
            other => Err(RuntimeError::Host(format!("expected a symbol, got {}", other))),
        })
        .field_mut(
            "Value",
            |v| match v {
                Value::Symbol(sym) => Ok(sym.value()),
                other => Err(RuntimeError::Host(format!("expected a symbol, got {}", other))),
            },
            |v, new| match v {
                Value::Symbol(sym) => {
                    sym.set_value(new.clone());
                    Ok(())
                }
                other => Err(RuntimeError::Host(format!("expected a symbol, got {}", other))),
            },
        )
}

fn expect_cons(value: &Value) -> Result<&Arc<crate::cons::Cons>, RuntimeError> {
    match value {
        Value::Cons(cell) => Ok(cell),
        other => Err(RuntimeError::Host(format!("expected a list, got {}", other))),
    }
}

fn cons_class() -> ClassBuilder {
    ClassBuilder::new("Cons")
        .field_mut(
            "First",
            |v| Ok(expect_cons(v)?.first()),
            |v, new| {
                expect_cons(v)?.set_first(new.clone());
                Ok(())
            },
        )
        .field_mut(
            "Rest",
            |v| Ok(expect_cons(v)?.rest()),
            |v, new| {
                expect_cons(v)?.set_rest(new.clone());
                Ok(())
            },
        )
}

fn array_class() -> ClassBuilder {
    ClassBuilder::new("Array").field("Length", |v| match v {
        Value::Array(items) => Ok(Value::Int(items.read().len() as i64)),
        other => Err(RuntimeError::Host(format!("expected an array, got {}", other))),
    })
}

/// The instance surface of a type handle: what a type value exposes when
/// it must act as an ordinary object rather than a lookup target.
fn type_class() -> ClassBuilder {
    ClassBuilder::new("Type").field("Name", |v| match v {
        Value::Type(handle) => Ok(Value::str(handle.name())),
        other => Err(RuntimeError::Host(format!("expected a type, got {}", other))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let table = HostTypeTable::new();
        assert_eq!(table.lookup("cons").map(|h| h.class), Some(classes::CONS));
        assert_eq!(table.class_name(classes::STR).as_deref(), Some("Str"));
    }

    #[test]
    fn test_find_members_is_case_insensitive() {
        let table = HostTypeTable::new();
        let members = table.find_members(classes::STR, "length", MemberScope::Both);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name(), "Length");
    }

    #[test]
    fn test_overloads_keep_registration_order() {
        let table = HostTypeTable::new();
        let members = table.find_members(classes::STR, "substring", MemberScope::Instance);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].as_method().map(|m| m.arity()), Some(1));
        assert_eq!(members[1].as_method().map(|m| m.arity()), Some(2));
    }

    #[test]
    fn test_register_host_class() {
        let table = HostTypeTable::new();
        let handle = table.register(
            ClassBuilder::new("Point").constructor(
                &[ParamType::Class(classes::INT), ParamType::Class(classes::INT)],
                |_args| Ok(Value::Nil),
            ),
        );
        assert!(handle.class.0 >= classes::FIRST_HOST);
        assert_eq!(table.lookup("point"), Some(handle.clone()));
        assert_eq!(table.constructors(handle.class).len(), 1);
    }

    #[test]
    fn test_assignability() {
        let table = HostTypeTable::new();
        let int_shape = Shape::of_class(classes::INT);
        let type_shape = Shape {
            class: classes::TYPE,
            wrapped: Some(classes::CONS),
        };
        assert!(table.is_assignable(ParamType::Any, int_shape));
        assert!(table.is_assignable(ParamType::Class(classes::INT), int_shape));
        assert!(!table.is_assignable(ParamType::Class(classes::DOUBLE), int_shape));
        // A type handle satisfies a parameter expecting a type identity.
        assert!(table.is_assignable(ParamType::TypeIdentity, type_shape));
        assert!(!table.is_assignable(ParamType::TypeIdentity, int_shape));
    }
}
