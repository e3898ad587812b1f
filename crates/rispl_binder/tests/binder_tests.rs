//! Dispatch engine integration tests.
//!
//! Exercises binder canonicalization, inline-cache reuse at polymorphic
//! sites, first-match overload resolution, type-handle duality, and
//! deferred failure rules.

use rispl_binder::{CallSiteKey, ExecutionContext};
use rispl_runtime::{
    classes, BindErrorKind, ClassBuilder, Cons, Instance, ParamType, TypeHandle, Value,
};
use std::sync::Arc;

/// Helper: a host class with a counter field, an Echo method, and a
/// constructor taking one integer.
fn register_counter(ctx: &ExecutionContext) -> TypeHandle {
    let handle = ctx.types().declare("Counter");
    let for_ctor = handle.clone();
    ctx.types().define(
        &handle,
        ClassBuilder::new("Counter")
            .field_mut(
                "Count",
                |v| with_counter(v, |n| Ok(Value::Int(*n.lock()))),
                |v, new| {
                    with_counter(v, |n| {
                        if let Value::Int(i) = new {
                            *n.lock() = *i;
                        }
                        Ok(Value::Nil)
                    })
                    .map(|_| ())
                },
            )
            .method("Echo", &[ParamType::Any], |_, args| Ok(args[0].clone()))
            .static_method("Zero", &[], |_, _| Ok(Value::Int(0)))
            .constructor(&[ParamType::Class(classes::INT)], move |args| {
                let initial = match &args[0] {
                    Value::Int(n) => *n,
                    _ => 0,
                };
                Ok(Value::Object(Arc::new(Instance::new(
                    &for_ctor,
                    parking_lot::Mutex::new(initial),
                ))))
            }),
    );
    handle
}

fn with_counter<T>(
    value: &Value,
    f: impl FnOnce(&parking_lot::Mutex<i64>) -> Result<T, rispl_runtime::RuntimeError>,
) -> Result<T, rispl_runtime::RuntimeError> {
    match value {
        Value::Object(instance) => match instance.data::<parking_lot::Mutex<i64>>() {
            Some(n) => f(n),
            None => Err(rispl_runtime::RuntimeError::Host("bad payload".into())),
        },
        other => Err(rispl_runtime::RuntimeError::Host(format!(
            "expected a Counter, got {}",
            other
        ))),
    }
}

fn sample_list() -> Value {
    Cons::list(&[Value::Int(1), Value::Int(2), Value::Int(3)])
}

// ============================================================================
// Canonicalization
// ============================================================================

#[test]
fn test_binder_canonicalization_is_idempotent() {
    let ctx = ExecutionContext::new();
    let a = ctx.binders().binder(CallSiteKey::get_member("first"));
    let b = ctx.binders().binder(CallSiteKey::get_member("FIRST"));
    assert!(Arc::ptr_eq(&a, &b));

    let c = ctx.binders().binder(CallSiteKey::invoke(2));
    let d = ctx.binders().binder(CallSiteKey::invoke(2));
    assert!(Arc::ptr_eq(&c, &d));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn test_sites_with_same_key_share_rules() {
    let ctx = ExecutionContext::new();
    let site_a = ctx.call_site(CallSiteKey::get_member("First"));
    let site_b = ctx.call_site(CallSiteKey::get_member("first"));

    let list = sample_list();
    assert_eq!(site_a.execute(ctx.type_info(), &[list.clone()]).unwrap(), Value::Int(1));
    // The second site hits the shared binder's cache: no new resolution.
    assert_eq!(site_b.execute(ctx.type_info(), &[list]).unwrap(), Value::Int(1));
    assert_eq!(site_a.binder().resolve_count(), 1);
}

// ============================================================================
// Polymorphic sites and cache reuse
// ============================================================================

#[test]
fn test_polymorphic_site_resolves_per_shape_and_reuses() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::get_member("Length"));

    let s = Value::str("hello");
    let a = Value::array(vec![Value::Int(1), Value::Int(2)]);

    // Type A resolves once.
    assert_eq!(site.execute(ctx.type_info(), &[s.clone()]).unwrap(), Value::Int(5));
    assert_eq!(site.binder().resolve_count(), 1);

    // Type B resolves a second rule.
    assert_eq!(site.execute(ctx.type_info(), &[a]).unwrap(), Value::Int(2));
    assert_eq!(site.binder().resolve_count(), 2);

    // Type A again reuses the cached rule: the count does not move.
    assert_eq!(site.execute(ctx.type_info(), &[s]).unwrap(), Value::Int(5));
    assert_eq!(site.binder().resolve_count(), 2);
    assert_eq!(site.binder().rule_count(), 2);
}

#[test]
fn test_failure_rule_does_not_poison_other_shapes() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::get_member("Length"));

    // Int has no Length member: a guarded failure rule.
    let err = site.execute(ctx.type_info(), &[Value::Int(3)]).unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::MissingMember));

    // A string at the same site still binds successfully.
    assert_eq!(
        site.execute(ctx.type_info(), &[Value::str("abc")]).unwrap(),
        Value::Int(3)
    );

    // And the failing shape keeps failing, from cache.
    let count = site.binder().resolve_count();
    assert!(site.execute(ctx.type_info(), &[Value::Int(9)]).is_err());
    assert_eq!(site.binder().resolve_count(), count);
}

// ============================================================================
// InvokeMember: overloads
// ============================================================================

#[test]
fn test_invoke_member_binds_by_arity() {
    let ctx = ExecutionContext::new();
    let one = ctx.call_site(CallSiteKey::invoke_member("Substring", 1));
    let two = ctx.call_site(CallSiteKey::invoke_member("Substring", 2));

    let s = Value::str("hello");
    assert_eq!(
        one.execute(ctx.type_info(), &[s.clone(), Value::Int(1)]).unwrap(),
        Value::str("ello")
    );
    assert_eq!(
        two.execute(ctx.type_info(), &[s, Value::Int(1), Value::Int(3)]).unwrap(),
        Value::str("ell")
    );
}

#[test]
fn test_unique_arity_overload_rule_reuses_across_argument_types() {
    let ctx = ExecutionContext::new();
    register_counter(&ctx);

    let site = ctx.call_site(CallSiteKey::invoke_member("Echo", 1));
    let counter = make_counter(&ctx, 0);

    // First call binds Echo(Any) and resolves once.
    assert_eq!(
        site.execute(ctx.type_info(), &[counter.clone(), Value::Int(7)]).unwrap(),
        Value::Int(7)
    );
    assert_eq!(site.binder().resolve_count(), 1);

    // A different argument type still satisfies the same overload's
    // assignability: the cached rule is reused without re-reflecting.
    assert_eq!(
        site.execute(ctx.type_info(), &[counter, Value::str("x")]).unwrap(),
        Value::str("x")
    );
    assert_eq!(site.binder().resolve_count(), 1);
}

#[test]
fn test_first_match_overload_in_declaration_order() {
    let ctx = ExecutionContext::new();
    // Two same-arity overloads; the first accepts anything, the second is
    // more specific. Declaration order wins: the second is unreachable.
    ctx.types().register(
        ClassBuilder::new("Picky")
            .method("Pick", &[ParamType::Any], |_, _| Ok(Value::Int(1)))
            .method("Pick", &[ParamType::Class(classes::INT)], |_, _| Ok(Value::Int(2))),
    );
    let handle = ctx.types().lookup("Picky").expect("registered");
    let instance = Value::Object(Arc::new(Instance::new(&handle, ())));

    let site = ctx.call_site(CallSiteKey::invoke_member("Pick", 1));
    let result = site
        .execute(ctx.type_info(), &[instance, Value::Int(5)])
        .unwrap();
    assert_eq!(result, Value::Int(1));
}

#[test]
fn test_invoke_member_no_matching_overload() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::invoke_member("Substring", 3));
    let err = site
        .execute(
            ctx.type_info(),
            &[Value::str("x"), Value::Int(0), Value::Int(1), Value::Int(2)],
        )
        .unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::NoMatchingOverload));
}

#[test]
fn test_invoking_a_field_member_is_not_implemented() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::invoke_member("First", 0));
    let err = site.execute(ctx.type_info(), &[sample_list()]).unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::NotInvokableMember));
}

// ============================================================================
// GetMember / SetMember
// ============================================================================

fn make_counter(ctx: &ExecutionContext, initial: i64) -> Value {
    let handle = ctx
        .types()
        .lookup("Counter")
        .unwrap_or_else(|| register_counter(ctx));
    let site = ctx.call_site(CallSiteKey::create_instance(1));
    site.execute(ctx.type_info(), &[Value::Type(handle), Value::Int(initial)])
        .expect("constructed")
}

#[test]
fn test_get_and_set_member_on_host_object() {
    let ctx = ExecutionContext::new();
    register_counter(&ctx);
    let counter = make_counter(&ctx, 5);

    let get = ctx.call_site(CallSiteKey::get_member("Count"));
    assert_eq!(get.execute(ctx.type_info(), &[counter.clone()]).unwrap(), Value::Int(5));

    // Set-member evaluates to the stored value.
    let set = ctx.call_site(CallSiteKey::set_member("Count"));
    assert_eq!(
        set.execute(ctx.type_info(), &[counter.clone(), Value::Int(9)]).unwrap(),
        Value::Int(9)
    );
    assert_eq!(get.execute(ctx.type_info(), &[counter]).unwrap(), Value::Int(9));
}

#[test]
fn test_get_member_missing_and_ambiguous() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::get_member("Nope"));
    let err = site.execute(ctx.type_info(), &[sample_list()]).unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::MissingMember));

    // Substring has two overloads: reading it as a value is ambiguous.
    let site = ctx.call_site(CallSiteKey::get_member("Substring"));
    let err = site.execute(ctx.type_info(), &[Value::str("s")]).unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::AmbiguousMember));
}

#[test]
fn test_member_lookup_is_case_insensitive() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::get_member("lEnGtH"));
    assert_eq!(
        site.execute(ctx.type_info(), &[Value::str("abcd")]).unwrap(),
        Value::Int(4)
    );
}

// ============================================================================
// Type-handle duality
// ============================================================================

#[test]
fn test_type_handle_invokes_static_surface() {
    let ctx = ExecutionContext::new();
    let handle = register_counter(&ctx);
    let site = ctx.call_site(CallSiteKey::invoke_member("Zero", 0));
    assert_eq!(
        site.execute(ctx.type_info(), &[Value::Type(handle)]).unwrap(),
        Value::Int(0)
    );
}

#[test]
fn test_type_handle_falls_back_to_instance_surface() {
    let ctx = ExecutionContext::new();
    let handle = register_counter(&ctx);
    // `Name` is not a static member of Counter; the handle re-dispatches
    // as an instance of the Type class.
    let site = ctx.call_site(CallSiteKey::get_member("Name"));
    assert_eq!(
        site.execute(ctx.type_info(), &[Value::Type(handle)]).unwrap(),
        Value::str("Counter")
    );
}

#[test]
fn test_type_handle_rules_are_per_wrapped_type() {
    let ctx = ExecutionContext::new();
    let counter = register_counter(&ctx);
    let other = ctx.types().register(ClassBuilder::new("Other").static_method(
        "Zero",
        &[],
        |_, _| Ok(Value::Int(100)),
    ));

    let site = ctx.call_site(CallSiteKey::invoke_member("Zero", 0));
    assert_eq!(
        site.execute(ctx.type_info(), &[Value::Type(counter)]).unwrap(),
        Value::Int(0)
    );
    // A handle wrapping a different type must not reuse the rule.
    assert_eq!(
        site.execute(ctx.type_info(), &[Value::Type(other)]).unwrap(),
        Value::Int(100)
    );
    assert_eq!(site.binder().resolve_count(), 2);
}

// ============================================================================
// CreateInstance
// ============================================================================

#[test]
fn test_create_instance_by_arity_and_assignability() {
    let ctx = ExecutionContext::new();
    register_counter(&ctx);
    let counter = make_counter(&ctx, 3);
    let get = ctx.call_site(CallSiteKey::get_member("Count"));
    assert_eq!(get.execute(ctx.type_info(), &[counter]).unwrap(), Value::Int(3));
}

#[test]
fn test_create_instance_no_matching_constructor() {
    let ctx = ExecutionContext::new();
    let handle = register_counter(&ctx);
    let site = ctx.call_site(CallSiteKey::create_instance(2));
    let err = site
        .execute(
            ctx.type_info(),
            &[Value::Type(handle), Value::Int(1), Value::Int(2)],
        )
        .unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::NoMatchingConstructor));
}

#[test]
fn test_create_instance_requires_a_type() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::create_instance(0));
    let err = site.execute(ctx.type_info(), &[Value::Int(5)]).unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::NotCallable));
}

// ============================================================================
// Indexing
// ============================================================================

#[test]
fn test_cons_get_index() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::get_index(1));
    let list = sample_list();
    assert_eq!(
        site.execute(ctx.type_info(), &[list.clone(), Value::Int(0)]).unwrap(),
        Value::Int(1)
    );
    assert_eq!(
        site.execute(ctx.type_info(), &[list, Value::Int(2)]).unwrap(),
        Value::Int(3)
    );
}

#[test]
fn test_cons_index_arity_error() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::get_index(2));
    let err = site
        .execute(ctx.type_info(), &[sample_list(), Value::Int(0), Value::Int(1)])
        .unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::WrongArity));
}

#[test]
fn test_cons_index_out_of_range_is_runtime() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::get_index(1));
    let err = site
        .execute(ctx.type_info(), &[sample_list(), Value::Int(10)])
        .unwrap_err();
    // Out of range surfaces when the index is walked, not as a bind error.
    assert!(err.bind_kind().is_none());
}

#[test]
fn test_cons_set_index_returns_stored_value() {
    let ctx = ExecutionContext::new();
    let set = ctx.call_site(CallSiteKey::set_index(1));
    let get = ctx.call_site(CallSiteKey::get_index(1));
    let list = sample_list();
    assert_eq!(
        set.execute(ctx.type_info(), &[list.clone(), Value::Int(1), Value::Int(100)])
            .unwrap(),
        Value::Int(100)
    );
    assert_eq!(
        get.execute(ctx.type_info(), &[list, Value::Int(1)]).unwrap(),
        Value::Int(100)
    );
}

#[test]
fn test_array_direct_indexing() {
    let ctx = ExecutionContext::new();
    let array = Value::array(vec![Value::Int(10), Value::Int(20)]);
    let get = ctx.call_site(CallSiteKey::get_index(1));
    let set = ctx.call_site(CallSiteKey::set_index(1));
    assert_eq!(
        get.execute(ctx.type_info(), &[array.clone(), Value::Int(1)]).unwrap(),
        Value::Int(20)
    );
    set.execute(ctx.type_info(), &[array.clone(), Value::Int(0), Value::Int(99)])
        .unwrap();
    assert_eq!(
        get.execute(ctx.type_info(), &[array, Value::Int(0)]).unwrap(),
        Value::Int(99)
    );
}

#[test]
fn test_host_indexer_resolution() {
    let ctx = ExecutionContext::new();
    let handle = ctx.types().declare("Grid");
    let for_ctor = handle.clone();
    ctx.types().define(
        &handle,
        ClassBuilder::new("Grid").indexer_mut(
            &[ParamType::Class(classes::INT), ParamType::Class(classes::INT)],
            |v, idx| grid(v, |cells| Ok(cells.lock()[key(idx)].clone())),
            |v, idx, value| {
                grid(v, |cells| {
                    cells.lock()[key(idx)] = value.clone();
                    Ok(Value::Nil)
                })
                .map(|_| ())
            },
        ),
    );

    fn key(idx: &[Value]) -> usize {
        match (&idx[0], &idx[1]) {
            (Value::Int(r), Value::Int(c)) => (*r * 2 + *c) as usize,
            _ => 0,
        }
    }
    fn grid<T>(
        value: &Value,
        f: impl FnOnce(&parking_lot::Mutex<Vec<Value>>) -> Result<T, rispl_runtime::RuntimeError>,
    ) -> Result<T, rispl_runtime::RuntimeError> {
        match value {
            Value::Object(instance) => match instance.data::<parking_lot::Mutex<Vec<Value>>>() {
                Some(cells) => f(cells),
                None => Err(rispl_runtime::RuntimeError::Host("bad payload".into())),
            },
            other => Err(rispl_runtime::RuntimeError::Host(format!("expected a Grid, got {}", other))),
        }
    }

    let cells = parking_lot::Mutex::new(vec![Value::Nil; 4]);
    let instance = Value::Object(Arc::new(Instance::new(&for_ctor, cells)));

    // Two indexes route through the registered indexer, not the list path.
    let set = ctx.call_site(CallSiteKey::set_index(2));
    let get = ctx.call_site(CallSiteKey::get_index(2));
    assert_eq!(
        set.execute(
            ctx.type_info(),
            &[instance.clone(), Value::Int(1), Value::Int(0), Value::Int(42)],
        )
        .unwrap(),
        Value::Int(42)
    );
    assert_eq!(
        get.execute(ctx.type_info(), &[instance, Value::Int(1), Value::Int(0)])
            .unwrap(),
        Value::Int(42)
    );
}

#[test]
fn test_no_matching_indexer() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::get_index(1));
    let err = site
        .execute(ctx.type_info(), &[Value::Int(5), Value::Int(0)])
        .unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::NoMatchingIndexer));
}

// ============================================================================
// Invoke
// ============================================================================

#[test]
fn test_invoke_function_checks_arity() {
    let ctx = ExecutionContext::new();
    let double = Value::Function(Arc::new(rispl_runtime::Function::new(
        Some("double".to_string()),
        1,
        |args| match &args[0] {
            Value::Int(n) => Ok(Value::Int(n * 2)),
            other => Err(rispl_runtime::RuntimeError::Host(format!("bad arg {}", other))),
        },
    )));

    let site = ctx.call_site(CallSiteKey::invoke(1));
    assert_eq!(
        site.execute(ctx.type_info(), &[double.clone(), Value::Int(21)]).unwrap(),
        Value::Int(42)
    );

    let wrong = ctx.call_site(CallSiteKey::invoke(2));
    let err = wrong
        .execute(ctx.type_info(), &[double, Value::Int(1), Value::Int(2)])
        .unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::WrongArity));
}

#[test]
fn test_invoke_non_callable() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::invoke(0));
    let err = site.execute(ctx.type_info(), &[Value::Int(5)]).unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::NotCallable));
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_binary_operator_site() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::binary(rispl_ast::BinaryOp::Add));
    assert_eq!(
        site.execute(ctx.type_info(), &[Value::Int(2), Value::Int(3)]).unwrap(),
        Value::Int(5)
    );
    // Same site, different shapes: promotes to double under a new rule.
    assert_eq!(
        site.execute(ctx.type_info(), &[Value::Int(2), Value::Double(0.5)]).unwrap(),
        Value::Double(2.5)
    );
    assert_eq!(site.binder().resolve_count(), 2);
}

#[test]
fn test_binary_operator_unsupported_types() {
    let ctx = ExecutionContext::new();
    let site = ctx.call_site(CallSiteKey::binary(rispl_ast::BinaryOp::Add));
    let err = site
        .execute(ctx.type_info(), &[Value::str("a"), Value::Int(1)])
        .unwrap_err();
    assert_eq!(err.bind_kind(), Some(BindErrorKind::NoSuchOperator));
}

// ============================================================================
// Namespace late binding
// ============================================================================

#[test]
fn test_namespace_member_binding_is_late() {
    let ctx = ExecutionContext::new();
    let module = ctx.make_module();
    let ns = Value::Namespace(Arc::clone(&module));

    let get = ctx.call_site(CallSiteKey::get_member("x"));
    let set = ctx.call_site(CallSiteKey::set_member("x"));

    // Unbound: a late failure, not a cached bind error.
    let err = get.execute(ctx.type_info(), &[ns.clone()]).unwrap_err();
    assert!(matches!(err, rispl_runtime::RuntimeError::UnboundGlobal(_)));

    // Binding the slot afterwards makes the same site succeed.
    assert_eq!(
        set.execute(ctx.type_info(), &[ns.clone(), Value::Int(1)]).unwrap(),
        Value::Int(1)
    );
    assert_eq!(get.execute(ctx.type_info(), &[ns]).unwrap(), Value::Int(1));
}
