//! Canonical binders and per-site inline caches.
//!
//! Caching is two-level. Each call site owns a small bounded cache of
//! rules checked in order (L1); behind it sits the canonical binder shared
//! by every site with the same operation signature, holding every rule
//! ever resolved for that signature (L2). A site that misses both levels
//! asks the binder to resolve, which is the only step that consults the
//! type-information provider.

use crate::key::CallSiteKey;
use crate::resolve;
use crate::rule::Rule;
use parking_lot::RwLock;
use rispl_runtime::{RuntimeError, Shape, TypeInfo, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default bound for a site's L1 cache.
pub const DEFAULT_SITE_CACHE: usize = 8;

/// The canonical, shared resolver for all call sites with an identical
/// operation signature. Long-lived: binders and their rules persist for
/// the process lifetime once created.
pub struct Binder {
    key: CallSiteKey,
    /// Shared rule cache (L2). Rules are immutable once built; duplicates
    /// from racing resolutions are harmless because selection is purely by
    /// guard evaluation.
    rules: RwLock<Vec<Arc<Rule>>>,
    /// How many times this binder has computed a fresh rule. Lets hosts
    /// and tests observe cache reuse.
    resolve_count: AtomicU64,
}

impl Binder {
    pub fn new(key: CallSiteKey) -> Self {
        Self {
            key,
            rules: RwLock::new(Vec::new()),
            resolve_count: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &CallSiteKey {
        &self.key
    }

    /// The number of fresh resolutions this binder has performed.
    pub fn resolve_count(&self) -> u64 {
        self.resolve_count.load(Ordering::Relaxed)
    }

    /// The number of cached rules.
    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    /// Find a cached rule whose guards hold for the shapes.
    pub fn find_rule(&self, shapes: &[Shape]) -> Option<Arc<Rule>> {
        self.rules
            .read()
            .iter()
            .find(|rule| rule.matches(shapes))
            .cloned()
    }

    /// Return a rule for the shapes: a cached one if any guard set holds,
    /// else a fresh resolution (recorded in `resolve_count`).
    pub fn bind(&self, provider: &dyn TypeInfo, shapes: &[Shape]) -> Arc<Rule> {
        if let Some(rule) = self.find_rule(shapes) {
            return rule;
        }

        self.resolve_count.fetch_add(1, Ordering::Relaxed);
        let rule = Arc::new(resolve::resolve(&self.key, provider, shapes));
        self.rules.write().push(Arc::clone(&rule));
        rule
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("key", &self.key)
            .field("rules", &self.rule_count())
            .field("resolve_count", &self.resolve_count())
            .finish()
    }
}

/// One dynamic operation embedded in generated code. Owns a bounded
/// inline cache of rules checked in order before falling back to the
/// shared binder.
pub struct CallSite {
    binder: Arc<Binder>,
    cache: RwLock<Vec<Arc<Rule>>>,
    max_cache: usize,
}

impl CallSite {
    pub fn new(binder: Arc<Binder>) -> Self {
        Self::with_cache_bound(binder, DEFAULT_SITE_CACHE)
    }

    pub fn with_cache_bound(binder: Arc<Binder>, max_cache: usize) -> Self {
        Self {
            binder,
            cache: RwLock::new(Vec::new()),
            max_cache: max_cache.max(1),
        }
    }

    pub fn binder(&self) -> &Arc<Binder> {
        &self.binder
    }

    /// Execute the operation: match the site cache, then the shared
    /// binder, resolving freshly only when both miss.
    pub fn execute(
        &self,
        provider: &dyn TypeInfo,
        operands: &[Value],
    ) -> Result<Value, RuntimeError> {
        let shapes: Vec<Shape> = operands.iter().map(Value::shape).collect();

        if let Some(rule) = self.find_cached(&shapes) {
            return rule.action.apply(operands);
        }

        let rule = self.binder.bind(provider, &shapes);
        self.insert(Arc::clone(&rule));
        rule.action.apply(operands)
    }

    fn find_cached(&self, shapes: &[Shape]) -> Option<Arc<Rule>> {
        self.cache
            .read()
            .iter()
            .find(|rule| rule.matches(shapes))
            .cloned()
    }

    fn insert(&self, rule: Arc<Rule>) {
        let mut cache = self.cache.write();
        if cache.len() >= self.max_cache {
            // Evict the oldest entry; the shared binder still has it.
            cache.remove(0);
        }
        cache.push(rule);
    }

    /// The number of rules in this site's own cache.
    pub fn cached_rules(&self) -> usize {
        self.cache.read().len()
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("binder", &self.binder)
            .field("cached", &self.cached_rules())
            .finish()
    }
}
