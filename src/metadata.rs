//! Per-method query metadata: lock mode, query hints, comment, fetch graph.
//!
//! Repository methods carry declarative metadata that must reach the query
//! being built deep inside the fluent layer. Resolution happens at most once
//! per distinct method (memoized in a process-wide map keyed by
//! [`MethodId`]); the resolved bundle is handed to the executing query
//! through an explicit call-scoped [`MetadataContext`] rather than ambient
//! thread-local state, so nested repository calls restore their caller's
//! binding on exit.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

/// Lock mode requested for a query, applied by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Optimistic,
    OptimisticForceIncrement,
    PessimisticRead,
    PessimisticWrite,
    PessimisticForceIncrement,
}

/// A single provider hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHint {
    pub name: String,
    pub value: String,
    /// Whether the hint also applies to derived count queries.
    pub for_counting: bool,
}

/// Ordered collection of query hints.
///
/// Order is preserved; the same hint name may appear more than once. Data
/// queries receive every hint, count queries only those flagged
/// `for_counting`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryHints {
    entries: Vec<QueryHint>,
}

impl QueryHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hint applying to data queries only.
    pub fn add(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push(QueryHint {
            name: name.into(),
            value: value.into(),
            for_counting: false,
        });
        self
    }

    /// Add a hint applying to both data and count queries.
    pub fn add_for_counting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push(QueryHint {
            name: name.into(),
            value: value.into(),
            for_counting: true,
        });
        self
    }

    /// Hints for the data query, in declaration order.
    pub fn for_query(&self) -> impl Iterator<Item = &QueryHint> {
        self.entries.iter()
    }

    /// Hints for a derived count query, in declaration order.
    pub fn for_count(&self) -> impl Iterator<Item = &QueryHint> {
        self.entries.iter().filter(|h| h.for_counting)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How an entity graph shapes fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// Attributes in the graph are eagerly fetched, everything else lazily.
    Fetch,
    /// Attributes in the graph are eagerly fetched, everything else per its
    /// declared fetch type.
    Load,
}

/// A named or ad-hoc fetch graph passed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityGraph {
    /// Name of a graph declared on the entity, if any.
    pub name: Option<String>,
    pub kind: GraphKind,
    /// Dotted attribute paths for an ad-hoc graph.
    pub attribute_paths: Vec<String>,
}

impl EntityGraph {
    pub fn named(name: impl Into<String>, kind: GraphKind) -> Self {
        Self {
            name: Some(name.into()),
            kind,
            attribute_paths: Vec::new(),
        }
    }

    pub fn ad_hoc(kind: GraphKind, attribute_paths: Vec<String>) -> Self {
        Self {
            name: None,
            kind,
            attribute_paths,
        }
    }
}

/// Stable identity of a repository method, standing in for a reflected
/// method as the metadata cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    pub repository: &'static str,
    pub method: &'static str,
}

impl MethodId {
    pub const fn new(repository: &'static str, method: &'static str) -> Self {
        Self { repository, method }
    }
}

/// Resolved, immutable metadata bundle for one repository method.
///
/// Absence of metadata is a valid, degraded state: the default bundle means
/// "no hints, no lock, no comment, no graph".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrudMethodMetadata {
    pub lock: Option<LockMode>,
    pub hints: QueryHints,
    pub comment: Option<String>,
    pub graph: Option<EntityGraph>,
}

impl CrudMethodMetadata {
    /// The shared no-lock/no-hints bundle.
    pub fn none() -> Arc<CrudMethodMetadata> {
        Arc::clone(&EMPTY_METADATA)
    }

    pub fn lock_mode(&self) -> Option<LockMode> {
        self.lock
    }

    pub fn query_hints(&self) -> &QueryHints {
        &self.hints
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn entity_graph(&self) -> Option<&EntityGraph> {
        self.graph.as_ref()
    }
}

/// The metadata/reflection collaborator: yields the declared metadata for a
/// method, or `None` when the method declares none.
pub trait MetadataSource {
    fn describe(&self, method: MethodId) -> Option<CrudMethodMetadata>;
}

/// A source with no declared metadata for any method.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataSource for NoMetadata {
    fn describe(&self, _method: MethodId) -> Option<CrudMethodMetadata> {
        None
    }
}

static METHOD_METADATA: Lazy<RwLock<HashMap<MethodId, Arc<CrudMethodMetadata>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static EMPTY_METADATA: Lazy<Arc<CrudMethodMetadata>> =
    Lazy::new(|| Arc::new(CrudMethodMetadata::default()));

/// Resolve the metadata for `method`, computing it at most once per process.
///
/// A race on first resolution is tolerated: duplicate computation is
/// harmless and the first inserted entry wins for every caller.
pub fn resolve(source: &dyn MetadataSource, method: MethodId) -> Arc<CrudMethodMetadata> {
    {
        let map = METHOD_METADATA
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(found) = map.get(&method) {
            return Arc::clone(found);
        }
    }
    let computed = Arc::new(source.describe(method).unwrap_or_default());
    log::trace!(
        "resolved metadata for {}::{}",
        method.repository,
        method.method
    );
    let mut map = METHOD_METADATA
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(map.entry(method).or_insert(computed))
}

/// Call-scoped stack of resolved metadata.
///
/// The repository pushes the current method's metadata before delegating to
/// the query layer and the guard pops it when the call completes, including
/// on unwind. Nesting is supported: an inner push shadows the outer binding
/// and restores it on exit.
#[derive(Debug, Default)]
pub struct MetadataContext {
    stack: RefCell<Vec<Arc<CrudMethodMetadata>>>,
}

impl MetadataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `metadata` for the duration of the returned guard.
    pub fn enter(&self, metadata: Arc<CrudMethodMetadata>) -> MetadataScope<'_> {
        self.stack.borrow_mut().push(metadata);
        MetadataScope { context: self }
    }

    /// The innermost bound metadata, or the empty bundle when nothing has
    /// been established. Absence is not an error.
    pub fn current(&self) -> Arc<CrudMethodMetadata> {
        self.stack
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::clone(&EMPTY_METADATA))
    }
}

/// Guard returned by [`MetadataContext::enter`]; pops the binding on drop.
pub struct MetadataScope<'c> {
    context: &'c MetadataContext,
}

impl Drop for MetadataScope<'_> {
    fn drop(&mut self) {
        self.context.stack.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl MetadataSource for CountingSource {
        fn describe(&self, _method: MethodId) -> Option<CrudMethodMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(CrudMethodMetadata {
                lock: Some(LockMode::PessimisticWrite),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_resolution_is_memoized() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        let method = MethodId::new("UserRepository", "find_by_lastname_memo_test");
        let first = resolve(&source, method);
        let second = resolve(&source, method);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.lock_mode(), Some(LockMode::PessimisticWrite));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_absent_metadata_degrades_to_default() {
        let method = MethodId::new("UserRepository", "find_plain_default_test");
        let resolved = resolve(&NoMetadata, method);
        assert_eq!(resolved.lock_mode(), None);
        assert!(resolved.query_hints().is_empty());
        assert_eq!(resolved.comment(), None);
    }

    #[test]
    fn test_hint_split_for_counting() {
        let hints = QueryHints::new()
            .add("provider.fetchSize", "64")
            .add_for_counting("provider.comment", "audited");
        assert_eq!(hints.for_query().count(), 2);
        let count_hints: Vec<_> = hints.for_count().collect();
        assert_eq!(count_hints.len(), 1);
        assert_eq!(count_hints[0].name, "provider.comment");
    }

    #[test]
    fn test_context_nesting_restores_outer_binding() {
        let context = MetadataContext::new();
        let outer = Arc::new(CrudMethodMetadata {
            comment: Some("outer".to_string()),
            ..Default::default()
        });
        let inner = Arc::new(CrudMethodMetadata {
            comment: Some("inner".to_string()),
            ..Default::default()
        });

        let _outer_scope = context.enter(Arc::clone(&outer));
        assert_eq!(context.current().comment(), Some("outer"));
        {
            let _inner_scope = context.enter(Arc::clone(&inner));
            assert_eq!(context.current().comment(), Some("inner"));
        }
        assert_eq!(context.current().comment(), Some("outer"));
    }

    #[test]
    fn test_context_pops_on_unwind() {
        let context = MetadataContext::new();
        let bound = Arc::new(CrudMethodMetadata {
            comment: Some("bound".to_string()),
            ..Default::default()
        });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = context.enter(Arc::clone(&bound));
            panic!("inner failure");
        }));
        assert!(result.is_err());
        assert_eq!(context.current().comment(), None);
    }

    #[test]
    fn test_empty_context_yields_empty_bundle() {
        let context = MetadataContext::new();
        let current = context.current();
        assert_eq!(current.lock_mode(), None);
        assert!(current.query_hints().is_empty());
    }
}
