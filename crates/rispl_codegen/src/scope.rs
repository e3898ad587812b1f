//! The lexical scope chain, stored as an arena of parent-indexed records.
//!
//! Scopes exist only during code generation. A scope that introduces
//! names (lambda parameters, `let*` bindings) materializes a runtime
//! environment record; identifier references compile to a hop count over
//! materializing scopes plus a slot index. Loop scopes carry a break
//! target and no names; the chain terminates at exactly one module-scope
//! root.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

bitflags! {
    /// Scope classification flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScopeFlags: u8 {
        const MODULE = 1 << 0;
        const LAMBDA = 1 << 1;
        const LOOP = 1 << 2;
    }
}

/// Index of a scope record in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// A reference to a local slot: how many environment records to hop
/// outward, and the slot index within the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    pub up: usize,
    pub index: usize,
}

#[derive(Debug)]
struct ScopeData {
    parent: Option<ScopeId>,
    flags: ScopeFlags,
    /// Lowercased name → slot index, for scopes that materialize an
    /// environment.
    names: FxHashMap<String, usize>,
    /// Whether this scope materializes a runtime environment record.
    has_env: bool,
    /// Number of materializing scopes from the root up to and including
    /// this one (inherited when this scope has no environment).
    env_depth: usize,
    /// Slots allocated so far in this scope's environment.
    slot_count: usize,
}

/// The scope arena. Records are never removed; a generation pass builds
/// and discards the whole arena.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<ScopeData>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, parent: Option<ScopeId>, flags: ScopeFlags, has_env: bool) -> ScopeId {
        let parent_depth = parent.map_or(0, |p| self.scopes[p.0].env_depth);
        let id = ScopeId(self.scopes.len());
        self.scopes.push(ScopeData {
            parent,
            flags,
            names: FxHashMap::default(),
            has_env,
            env_depth: parent_depth + usize::from(has_env),
            slot_count: 0,
        });
        id
    }

    /// The module-scope root. Every chain ends here; it carries the
    /// execution-context and module-namespace handles rather than user
    /// slots, so it materializes no environment.
    pub fn push_module(&mut self) -> ScopeId {
        self.push(None, ScopeFlags::MODULE, false)
    }

    /// A function scope: one slot per parameter, environment at call time.
    pub fn push_lambda(&mut self, parent: ScopeId) -> ScopeId {
        self.push(Some(parent), ScopeFlags::LAMBDA, true)
    }

    /// A `let*` scope: slots appear one by one as bindings are generated.
    pub fn push_let(&mut self, parent: ScopeId) -> ScopeId {
        self.push(Some(parent), ScopeFlags::empty(), true)
    }

    /// A loop scope: a break target, no names.
    pub fn push_loop(&mut self, parent: ScopeId) -> ScopeId {
        self.push(Some(parent), ScopeFlags::LOOP, false)
    }

    /// Whether the scope is the module root.
    pub fn is_module(&self, scope: ScopeId) -> bool {
        self.scopes[scope.0].flags.contains(ScopeFlags::MODULE)
    }

    /// Declare a name in the scope, allocating (or reusing) a slot.
    /// A redeclaration of the same name rebinds it to a fresh slot, so a
    /// later `let*` binding shadows an earlier one in the same form.
    pub fn declare(&mut self, scope: ScopeId, name: &str) -> usize {
        let data = &mut self.scopes[scope.0];
        debug_assert!(data.has_env, "declaring a name in a non-environment scope");
        let index = data.slot_count;
        data.slot_count += 1;
        data.names.insert(name.to_lowercase(), index);
        index
    }

    /// The number of slots the scope's environment needs.
    pub fn slot_count(&self, scope: ScopeId) -> usize {
        self.scopes[scope.0].slot_count
    }

    /// Resolve an identifier by walking outward from the scope, stopping
    /// at (and excluding) the module root. Case-insensitive. Returns the
    /// slot reference relative to the innermost environment at `from`.
    pub fn resolve(&self, from: ScopeId, name: &str) -> Option<SlotRef> {
        let key = name.to_lowercase();
        let from_depth = self.scopes[from.0].env_depth;
        let mut current = Some(from);

        while let Some(id) = current {
            let data = &self.scopes[id.0];
            if data.flags.contains(ScopeFlags::MODULE) {
                break;
            }
            if let Some(&index) = data.names.get(&key) {
                return Some(SlotRef {
                    up: from_depth - data.env_depth,
                    index,
                });
            }
            current = data.parent;
        }

        None
    }

    /// Find the nearest enclosing loop scope, if any. The walk does not
    /// stop at lambda boundaries; it stops only at the module root.
    pub fn find_loop(&self, from: ScopeId) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let data = &self.scopes[id.0];
            if data.flags.contains(ScopeFlags::LOOP) {
                return Some(id);
            }
            current = data.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_in_same_scope() {
        let mut arena = ScopeArena::new();
        let module = arena.push_module();
        let lambda = arena.push_lambda(module);
        arena.declare(lambda, "x");
        arena.declare(lambda, "y");

        assert_eq!(arena.resolve(lambda, "x"), Some(SlotRef { up: 0, index: 0 }));
        assert_eq!(arena.resolve(lambda, "Y"), Some(SlotRef { up: 0, index: 1 }));
        assert_eq!(arena.resolve(lambda, "z"), None);
    }

    #[test]
    fn test_resolve_across_environments() {
        let mut arena = ScopeArena::new();
        let module = arena.push_module();
        let outer = arena.push_lambda(module);
        arena.declare(outer, "a");
        let inner = arena.push_let(outer);
        arena.declare(inner, "b");

        assert_eq!(arena.resolve(inner, "b"), Some(SlotRef { up: 0, index: 0 }));
        assert_eq!(arena.resolve(inner, "a"), Some(SlotRef { up: 1, index: 0 }));
    }

    #[test]
    fn test_loop_scope_does_not_add_hops() {
        let mut arena = ScopeArena::new();
        let module = arena.push_module();
        let lambda = arena.push_lambda(module);
        arena.declare(lambda, "n");
        let looped = arena.push_loop(lambda);

        // The loop materializes no environment.
        assert_eq!(arena.resolve(looped, "n"), Some(SlotRef { up: 0, index: 0 }));
    }

    #[test]
    fn test_resolution_stops_at_module() {
        let mut arena = ScopeArena::new();
        let module = arena.push_module();
        let lambda = arena.push_lambda(module);
        // Nothing declared: the reference falls through to the module
        // namespace, which is the caller's concern.
        assert_eq!(arena.resolve(lambda, "global"), None);
    }

    #[test]
    fn test_find_loop() {
        let mut arena = ScopeArena::new();
        let module = arena.push_module();
        let lambda = arena.push_lambda(module);
        assert!(arena.find_loop(lambda).is_none());

        let looped = arena.push_loop(lambda);
        let inner_let = arena.push_let(looped);
        assert_eq!(arena.find_loop(inner_let), Some(looped));
    }

    #[test]
    fn test_redeclaration_rebinds() {
        let mut arena = ScopeArena::new();
        let module = arena.push_module();
        let letscope = arena.push_let(module);
        let first = arena.declare(letscope, "x");
        let second = arena.declare(letscope, "x");
        assert_ne!(first, second);
        assert_eq!(arena.resolve(letscope, "x"), Some(SlotRef { up: 0, index: second }));
        assert_eq!(arena.slot_count(letscope), 2);
    }
}
