//! Resolution: computing a rule from a call-site key and operand shapes.
//!
//! One resolver per operation kind, matched over the target's capability
//! shape. Member lookup is case-insensitive; overload, constructor, and
//! indexer candidates are filtered by exact arity and per-parameter
//! assignability, and the first candidate in declaration order wins.
//!
//! A type handle targeted by member/constructor/index lookup searches the
//! wrapped type's static surface; when nothing matches there, the handle
//! is re-dispatched as an ordinary instance of the `Type` class, so both
//! directions of the type-handle duality hold.

use crate::key::{CallSiteKey, OpKind};
use crate::rule::{Action, Guard, GuardSet, Rule};
use rispl_ast::expr::{BinaryOp, UnaryOp};
use rispl_runtime::{
    classes, ops, BindErrorKind, ClassId, MemberDef, MemberScope, ParamType, Shape, TypeInfo,
};
use std::sync::Arc;

/// Resolve a rule for the operation against the observed operand shapes.
/// Never raises: failed resolutions produce rules whose action raises when
/// executed, carrying the same guards a successful rule would have had.
pub fn resolve(key: &CallSiteKey, provider: &dyn TypeInfo, shapes: &[Shape]) -> Rule {
    match key.kind {
        OpKind::GetMember => resolve_get_member(key.name_or_empty(), provider, shapes),
        OpKind::SetMember => resolve_set_member(key.name_or_empty(), provider, shapes),
        OpKind::GetIndex => resolve_get_index(provider, shapes),
        OpKind::SetIndex => resolve_set_index(provider, shapes),
        OpKind::Invoke => resolve_invoke(shapes),
        OpKind::InvokeMember => resolve_invoke_member(key.name_or_empty(), provider, shapes),
        OpKind::CreateInstance => resolve_create_instance(provider, shapes),
        OpKind::Binary(op) => resolve_binary(op, shapes),
        OpKind::Unary(op) => resolve_unary(op, shapes),
    }
}

impl CallSiteKey {
    fn name_or_empty(&self) -> &str {
        self.member_name().unwrap_or("")
    }
}

fn class_name(provider: &dyn TypeInfo, class: ClassId) -> String {
    provider
        .class_name(class)
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("#{}", class.0))
}

/// Guard on the target shape only.
fn target_guard(shapes: &[Shape]) -> GuardSet {
    GuardSet::for_shape_range(shapes, 0, 1)
}

// ============================================================================
// GetMember
// ============================================================================

fn resolve_get_member(name: &str, provider: &dyn TypeInfo, shapes: &[Shape]) -> Rule {
    let target = shapes[0];

    // Module scopes and import targets bind late: slot presence is checked
    // at execution, so additions to the namespace are always visible.
    if target.class == classes::NAMESPACE {
        return Rule::new(target_guard(shapes), Action::NamespaceGet(Arc::from(name)));
    }

    // A type handle searches the wrapped type's static surface first.
    if let Some(wrapped) = target.wrapped {
        let members = provider.find_members(wrapped, name, MemberScope::Static);
        if members.len() == 1 {
            if let MemberDef::Field(_) = members[0].as_ref() {
                return Rule::new(target_guard(shapes), Action::GetField(members[0].clone()));
            }
        }
        // No unique static member: the handle acts as an ordinary instance
        // of the `Type` class and is re-dispatched against that surface.
        return get_member_on_instance(name, provider, shapes, classes::TYPE);
    }

    get_member_on_instance(name, provider, shapes, target.class)
}

fn get_member_on_instance(
    name: &str,
    provider: &dyn TypeInfo,
    shapes: &[Shape],
    class: ClassId,
) -> Rule {
    let members = provider.find_members(class, name, MemberScope::Both);
    let guards = target_guard(shapes);
    match members.len() {
        0 => Rule::raise(
            guards,
            BindErrorKind::MissingMember,
            format!("cannot bind member '{}' on {}", name, class_name(provider, class)),
        ),
        1 => match members[0].as_ref() {
            MemberDef::Field(_) => Rule::new(guards, Action::GetField(members[0].clone())),
            MemberDef::Method(_) => Rule::raise(
                guards,
                BindErrorKind::MissingMember,
                format!("member '{}' on {} is not a readable value", name, class_name(provider, class)),
            ),
        },
        _ => Rule::raise(
            guards,
            BindErrorKind::AmbiguousMember,
            format!("member '{}' on {} is ambiguous", name, class_name(provider, class)),
        ),
    }
}

// ============================================================================
// SetMember
// ============================================================================

fn resolve_set_member(name: &str, provider: &dyn TypeInfo, shapes: &[Shape]) -> Rule {
    let target = shapes[0];

    if target.class == classes::NAMESPACE {
        return Rule::new(target_guard(shapes), Action::NamespaceSet(Arc::from(name)));
    }

    // A type handle has no writable static surface here; it is treated as
    // an instance of the `Type` class.
    let class = if target.wrapped.is_some() {
        classes::TYPE
    } else {
        target.class
    };

    let members = provider.find_members(class, name, MemberScope::Both);
    let guards = target_guard(shapes);
    match members.len() {
        0 => Rule::raise(
            guards,
            BindErrorKind::MissingMember,
            format!("cannot bind member '{}' on {}", name, class_name(provider, class)),
        ),
        1 => match members[0].as_ref() {
            MemberDef::Field(_) => Rule::new(guards, Action::SetField(members[0].clone())),
            MemberDef::Method(_) => Rule::raise(
                guards,
                BindErrorKind::MissingMember,
                "only fields and properties can be assigned".to_string(),
            ),
        },
        _ => Rule::raise(
            guards,
            BindErrorKind::AmbiguousMember,
            format!("member '{}' on {} is ambiguous", name, class_name(provider, class)),
        ),
    }
}

// ============================================================================
// InvokeMember
// ============================================================================

fn resolve_invoke_member(name: &str, provider: &dyn TypeInfo, shapes: &[Shape]) -> Rule {
    let target = shapes[0];
    let guards = GuardSet::for_shapes(shapes);

    if target.class == classes::NAMESPACE {
        // Late-bound member fetch plus invocation; the member value's own
        // shape is checked at execution.
        return Rule::new(target_guard(shapes), Action::NamespaceInvoke(Arc::from(name)));
    }

    // A type handle invokes the wrapped type's static methods.
    if let Some(wrapped) = target.wrapped {
        let members = provider.find_members(wrapped, name, MemberScope::Static);
        if members.len() == 1 && members[0].as_method().is_none() {
            // Invoking a field/property member is a documented limitation.
            return Rule::raise(
                guards,
                BindErrorKind::NotInvokableMember,
                format!("invoking member '{}' is not implemented", name),
            );
        }
        if let Some(rule) = method_rule(provider, &members, shapes) {
            return rule;
        }
        // Nothing on the static surface: fall back to the handle's own
        // instance surface on the `Type` class.
        return invoke_member_on_instance(name, provider, shapes, classes::TYPE);
    }

    invoke_member_on_instance(name, provider, shapes, target.class)
}

fn invoke_member_on_instance(
    name: &str,
    provider: &dyn TypeInfo,
    shapes: &[Shape],
    class: ClassId,
) -> Rule {
    let arg_shapes = &shapes[1..];

    // Instance invocation searches instance members only.
    let members = provider.find_members(class, name, MemberScope::Instance);
    if members.len() == 1 && members[0].as_method().is_none() {
        return Rule::raise(
            GuardSet::for_shapes(shapes),
            BindErrorKind::NotInvokableMember,
            format!("invoking member '{}' is not implemented", name),
        );
    }

    match method_rule(provider, &members, shapes) {
        Some(rule) => rule,
        None => Rule::raise(
            GuardSet::for_shapes(shapes),
            BindErrorKind::NoMatchingOverload,
            format!(
                "can't bind member invoke '{}' on {} with {} argument(s)",
                name,
                class_name(provider, class),
                arg_shapes.len()
            ),
        ),
    }
}

/// Filter method candidates by exact arity and per-parameter
/// assignability, taking the first match in declaration order. There is no
/// most-specific-overload tie-break.
///
/// Guards: when several overloads compete at this arity, every argument's
/// exact runtime type is guarded so a different shape re-runs selection.
/// When the arity picks a unique overload, argument guards come from the
/// overload's own parameter types, so any later arguments the overload
/// accepts reuse the rule without re-resolving.
fn method_rule(
    provider: &dyn TypeInfo,
    members: &[Arc<MemberDef>],
    shapes: &[Shape],
) -> Option<Rule> {
    let arg_shapes = &shapes[1..];
    let arity_candidates: Vec<&Arc<MemberDef>> = members
        .iter()
        .filter(|member| {
            member
                .as_method()
                .map_or(false, |m| m.arity() == arg_shapes.len())
        })
        .collect();

    let chosen = arity_candidates.iter().find(|member| {
        let method = member.as_method().expect("arity candidates are methods");
        method
            .params
            .iter()
            .zip(arg_shapes)
            .all(|(param, shape)| provider.is_assignable(*param, *shape))
    })?;

    let method = chosen.as_method().expect("chosen candidate is a method");
    let guards = if arity_candidates.len() == 1 {
        let mut guards = GuardSet::for_shape_range(shapes, 0, 1);
        for (i, param) in method.params.iter().enumerate() {
            let guard = match param {
                ParamType::Class(class) => Some(Guard::ClassIs {
                    index: i + 1,
                    class: *class,
                }),
                ParamType::TypeIdentity => Some(Guard::ClassIs {
                    index: i + 1,
                    class: classes::TYPE,
                }),
                ParamType::Any => None,
            };
            if let Some(guard) = guard {
                guards = guards.merge(GuardSet::new(vec![guard]));
            }
        }
        guards
    } else {
        GuardSet::for_shapes(shapes)
    };

    Some(Rule::new(guards, Action::CallMethod(Arc::clone(chosen))))
}

// ============================================================================
// GetIndex / SetIndex
// ============================================================================

fn resolve_get_index(provider: &dyn TypeInfo, shapes: &[Shape]) -> Rule {
    let target = shapes[0];
    let index_shapes = &shapes[1..];
    let guards = GuardSet::for_shapes(shapes);

    // The built-in list cell takes exactly one integer index.
    if target.class == classes::CONS {
        if index_shapes.len() != 1 {
            return Rule::raise(
                guards,
                BindErrorKind::WrongArity,
                format!("indexing list takes single index, got {}", index_shapes.len()),
            );
        }
        if index_shapes[0].class != classes::INT {
            return Rule::raise(
                guards,
                BindErrorKind::NoMatchingIndexer,
                "list index must be an integer".to_string(),
            );
        }
        return Rule::new(guards, Action::ConsGetIndex);
    }

    // Native arrays use direct positional access.
    if target.class == classes::ARRAY {
        if index_shapes.len() != 1 {
            return Rule::raise(
                guards,
                BindErrorKind::WrongArity,
                format!("indexing array takes single index, got {}", index_shapes.len()),
            );
        }
        if index_shapes[0].class != classes::INT {
            return Rule::raise(
                guards,
                BindErrorKind::NoMatchingIndexer,
                "array index must be an integer".to_string(),
            );
        }
        return Rule::new(guards, Action::ArrayGetIndex);
    }

    match first_matching_indexer(provider, target, index_shapes) {
        Some(indexer) => Rule::new(guards, Action::GetIndexer(indexer)),
        None => Rule::raise(
            guards,
            BindErrorKind::NoMatchingIndexer,
            format!(
                "can't bind because there is no matching indexer on {}",
                class_name(provider, target.class)
            ),
        ),
    }
}

fn resolve_set_index(provider: &dyn TypeInfo, shapes: &[Shape]) -> Rule {
    let target = shapes[0];
    // The last operand is the value being stored; it is not guarded.
    let index_shapes = &shapes[1..shapes.len() - 1];
    let guards = GuardSet::for_shape_range(shapes, 0, shapes.len() - 1);

    if target.class == classes::CONS {
        if index_shapes.len() != 1 {
            return Rule::raise(
                guards,
                BindErrorKind::WrongArity,
                format!("indexing list takes single index, got {}", index_shapes.len()),
            );
        }
        if index_shapes[0].class != classes::INT {
            return Rule::raise(
                guards,
                BindErrorKind::NoMatchingIndexer,
                "list index must be an integer".to_string(),
            );
        }
        return Rule::new(guards, Action::ConsSetIndex);
    }

    if target.class == classes::ARRAY {
        if index_shapes.len() != 1 {
            return Rule::raise(
                guards,
                BindErrorKind::WrongArity,
                format!("indexing array takes single index, got {}", index_shapes.len()),
            );
        }
        if index_shapes[0].class != classes::INT {
            return Rule::raise(
                guards,
                BindErrorKind::NoMatchingIndexer,
                "array index must be an integer".to_string(),
            );
        }
        return Rule::new(guards, Action::ArraySetIndex);
    }

    match first_matching_indexer(provider, target, index_shapes) {
        Some(indexer) => Rule::new(guards, Action::SetIndexer(indexer)),
        None => Rule::raise(
            guards,
            BindErrorKind::NoMatchingIndexer,
            format!(
                "can't bind because there is no matching indexer on {}",
                class_name(provider, target.class)
            ),
        ),
    }
}

/// Filter the type's indexers by arity and assignability, first match in
/// declaration order.
fn first_matching_indexer(
    provider: &dyn TypeInfo,
    target: Shape,
    index_shapes: &[Shape],
) -> Option<Arc<rispl_runtime::IndexerDef>> {
    // A type handle indexes the wrapped type's surface.
    let class = target.wrapped.unwrap_or(target.class);
    provider
        .indexers(class)
        .into_iter()
        .find(|indexer| {
            indexer.arity() == index_shapes.len()
                && indexer
                    .params
                    .iter()
                    .zip(index_shapes)
                    .all(|(param, shape)| provider.is_assignable(*param, *shape))
        })
}

// ============================================================================
// Invoke
// ============================================================================

fn resolve_invoke(shapes: &[Shape]) -> Rule {
    let target = shapes[0];
    let guards = target_guard(shapes);

    if target.class == classes::FUNCTION {
        // The callable's own parameter count is checked on invocation; the
        // class guard alone cannot distinguish arities.
        return Rule::new(guards, Action::InvokeFunction);
    }

    Rule::raise(
        guards,
        BindErrorKind::NotCallable,
        "invocation target is not a function".to_string(),
    )
}

// ============================================================================
// CreateInstance
// ============================================================================

fn resolve_create_instance(provider: &dyn TypeInfo, shapes: &[Shape]) -> Rule {
    let target = shapes[0];
    let arg_shapes = &shapes[1..];
    let guards = GuardSet::for_shapes(shapes);

    let Some(wrapped) = target.wrapped else {
        return Rule::raise(
            guards,
            BindErrorKind::NotCallable,
            "a type object must be used when creating an instance".to_string(),
        );
    };

    let ctor = provider.constructors(wrapped).into_iter().find(|ctor| {
        ctor.arity() == arg_shapes.len()
            && ctor
                .params
                .iter()
                .zip(arg_shapes)
                .all(|(param, shape)| provider.is_assignable(*param, *shape))
    });

    match ctor {
        Some(ctor) => Rule::new(guards, Action::Construct(ctor)),
        None => Rule::raise(
            guards,
            BindErrorKind::NoMatchingConstructor,
            format!(
                "can't bind create instance of {} with {} argument(s)",
                class_name(provider, wrapped),
                arg_shapes.len()
            ),
        ),
    }
}

// ============================================================================
// Operators
// ============================================================================

fn resolve_binary(op: BinaryOp, shapes: &[Shape]) -> Rule {
    let guards = GuardSet::for_shapes(shapes);
    if ops::supports_binary(op, shapes[0], shapes[1]) {
        Rule::new(guards, Action::Binary(op))
    } else {
        Rule::raise(
            guards,
            BindErrorKind::NoSuchOperator,
            format!("operator '{}' is not defined for the operand types", op.as_str()),
        )
    }
}

fn resolve_unary(op: UnaryOp, shapes: &[Shape]) -> Rule {
    let guards = GuardSet::for_shapes(shapes);
    if ops::supports_unary(op, shapes[0]) {
        Rule::new(guards, Action::Unary(op))
    } else {
        Rule::raise(
            guards,
            BindErrorKind::NoSuchOperator,
            "unary operator is not defined for the operand type".to_string(),
        )
    }
}
