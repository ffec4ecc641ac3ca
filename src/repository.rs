//! The read-side repository facade.
//!
//! `SimpleRepository` wraps an executor and an entity's identifier
//! information, resolves per-method metadata through the process-wide
//! cache, binds it on a call-scoped context, and hands everything beyond
//! id lookups to the fluent layer.

use sea_query::{Condition, Expr, ExprTrait, Value};

use crate::entity::{EntityInformation, EntityTrait};
use crate::error::QuarryError;
use crate::executor::QueryExecutor;
use crate::fluent::FluentSelect;
use crate::metadata::{self, MetadataContext, MetadataScope, MetadataSource, MethodId, NoMetadata};
use crate::sort::Sort;
use crate::specification::Specification;

/// An identifier value set, ordered like the entity's identifier columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityKey(Vec<Value>);

impl EntityKey {
    /// A single-attribute identifier.
    pub fn of(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    /// A composite identifier; values follow the entity's declared
    /// identifier column order.
    pub fn composite(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

/// Read-side repository over entity `E`.
///
/// # Example
///
/// ```ignore
/// let repository = SimpleRepository::<User>::new(&executor);
/// let found = repository.find_by_id(&EntityKey::of(1i64))?;
/// ```
pub struct SimpleRepository<'e, E: EntityTrait> {
    executor: &'e dyn QueryExecutor,
    information: EntityInformation<E>,
    source: Box<dyn MetadataSource>,
    context: MetadataContext,
}

impl<'e, E: EntityTrait> SimpleRepository<'e, E> {
    pub fn new(executor: &'e dyn QueryExecutor) -> Self {
        Self::with_metadata_source(executor, Box::new(NoMetadata))
    }

    /// Use `source` to resolve per-method lock/hint/graph metadata. The
    /// resolution result is cached per method for the process lifetime.
    pub fn with_metadata_source(
        executor: &'e dyn QueryExecutor,
        source: Box<dyn MetadataSource>,
    ) -> Self {
        Self {
            executor,
            information: EntityInformation::new(),
            source,
            context: MetadataContext::new(),
        }
    }

    pub fn information(&self) -> &EntityInformation<E> {
        &self.information
    }

    /// The metadata bound to the repository call currently on this
    /// repository's stack, if any.
    pub fn metadata_context(&self) -> &MetadataContext {
        &self.context
    }

    /// Resolve `method`'s metadata and bind it for the duration of the
    /// returned guard. Nested calls shadow the outer binding and restore
    /// it when their guard drops.
    fn scoped(&self, method: &'static str) -> MetadataScope<'_> {
        let metadata = metadata::resolve(
            self.source.as_ref(),
            MethodId::new(E::default().table_name(), method),
        );
        self.context.enter(metadata)
    }

    fn select(&self, spec: Option<Specification<E>>) -> FluentSelect<'e, E> {
        FluentSelect::new(self.executor, spec).with_metadata(self.context.current())
    }

    fn key_condition(&self, key: &EntityKey) -> Result<Condition, QuarryError> {
        let columns = E::id_columns();
        if key.values().len() != columns.len() {
            return Err(QuarryError::InvalidUsage(format!(
                "entity '{}' has {} identifier attribute(s) but the key carries {} value(s)",
                self.information.table_name(),
                columns.len(),
                key.values().len()
            )));
        }

        let mut condition = Condition::all();
        for (column, value) in columns.iter().zip(key.values()) {
            condition = condition.add(Expr::col(*column).eq(value.clone()));
        }
        Ok(condition)
    }

    pub fn find_by_id(&self, key: &EntityKey) -> Result<Option<E::Model>, QuarryError> {
        let condition = self.key_condition(key)?;
        let _scope = self.scoped("find_by_id");
        self.select(Some(Specification::from_condition(condition)))
            .first()
    }

    pub fn exists_by_id(&self, key: &EntityKey) -> Result<bool, QuarryError> {
        let condition = self.key_condition(key)?;
        let _scope = self.scoped("exists_by_id");
        self.select(Some(Specification::from_condition(condition)))
            .exists()
    }

    pub fn find_all(&self) -> Result<Vec<E::Model>, QuarryError> {
        let _scope = self.scoped("find_all");
        self.select(None).all()
    }

    pub fn find_all_sorted(&self, sort: Sort) -> Result<Vec<E::Model>, QuarryError> {
        let _scope = self.scoped("find_all_sorted");
        self.select(None).sort_by(sort).all()
    }

    /// Bulk lookup by identifier.
    ///
    /// A single-attribute identifier becomes one `IN` query; a composite
    /// identifier cannot be expressed as an `IN` list, so each key is
    /// looked up individually.
    pub fn find_all_by_id(&self, keys: &[EntityKey]) -> Result<Vec<E::Model>, QuarryError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let _scope = self.scoped("find_all_by_id");

        if self.information.has_composite_id() {
            log::debug!(
                "composite identifier on '{}': looking up {} key(s) individually",
                self.information.table_name(),
                keys.len()
            );
            let mut found = Vec::with_capacity(keys.len());
            for key in keys {
                if let Some(model) = self.find_by_id(key)? {
                    found.push(model);
                }
            }
            return Ok(found);
        }

        let column = E::id_columns()[0];
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            if key.values().len() != 1 {
                return Err(QuarryError::InvalidUsage(format!(
                    "entity '{}' has a single identifier attribute but a key carries {} value(s)",
                    self.information.table_name(),
                    key.values().len()
                )));
            }
            values.push(key.values()[0].clone());
        }

        let condition = Condition::all().add(Expr::col(column).is_in(values));
        self.select(Some(Specification::from_condition(condition)))
            .all()
    }

    pub fn count(&self) -> Result<u64, QuarryError> {
        let _scope = self.scoped("count");
        self.select(None).count()
    }

    /// Entry to the fluent surface; the repository's metadata source is
    /// already wired onto the returned query.
    pub fn query(&self, spec: Option<Specification<E>>) -> FluentSelect<'e, E> {
        let _scope = self.scoped("query");
        self.select(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::{Enrollment, User};
    use crate::entity::{ColumnTrait, ModelTrait};
    use crate::executor::test_support::MockExecutor;
    use crate::executor::{FromRow, Row};
    use crate::metadata::{CrudMethodMetadata, LockMode, MethodId};
    use sea_query::{Iden, IdenStatic};

    fn user_row(id: i64, lastname: &str) -> Row {
        Row::new(
            ["id", "firstname", "lastname", "age", "version"]
                .iter()
                .map(|s| ToString::to_string(s))
                .collect(),
            vec![
                Value::BigInt(Some(id)),
                Value::String(Some("First".to_string())),
                Value::String(Some(lastname.to_string())),
                Value::Int(Some(30)),
                Value::BigInt(Some(0)),
            ],
        )
        .unwrap()
    }

    fn enrollment_row(student_id: i64, course_id: i64, grade: &str) -> Row {
        Row::new(
            ["student_id", "course_id", "grade"]
                .iter()
                .map(|s| ToString::to_string(s))
                .collect(),
            vec![
                Value::BigInt(Some(student_id)),
                Value::BigInt(Some(course_id)),
                Value::String(Some(grade.to_string())),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_find_by_id_matches_identifier_column() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![user_row(1, "Gierke")]);

        let repository = SimpleRepository::<User>::new(&executor);
        let found = repository.find_by_id(&EntityKey::of(1i64)).unwrap();

        assert_eq!(found.unwrap().lastname, "Gierke");
        let sql = &executor.captured_sql()[0];
        assert!(sql.contains(r#""id" = "#), "sql: {sql}");
    }

    #[test]
    fn test_find_by_id_rejects_wrong_key_arity() {
        let executor = MockExecutor::new();
        let repository = SimpleRepository::<User>::new(&executor);
        let err = repository
            .find_by_id(&EntityKey::composite(vec![
                Value::BigInt(Some(1)),
                Value::BigInt(Some(2)),
            ]))
            .unwrap_err();
        assert!(matches!(err, QuarryError::InvalidUsage(_)));
    }

    #[test]
    fn test_find_all_by_id_uses_single_in_query() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![user_row(1, "Gierke"), user_row(2, "Paluch")]);

        let repository = SimpleRepository::<User>::new(&executor);
        let found = repository
            .find_all_by_id(&[EntityKey::of(1i64), EntityKey::of(2i64)])
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(executor.query_count(), 1);
        let sql = &executor.captured_sql()[0];
        assert!(sql.contains(r#""id" IN "#), "sql: {sql}");
    }

    #[test]
    fn test_find_all_by_composite_id_looks_up_each_key() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![enrollment_row(1, 10, "A")]);
        executor.push_rows(vec![enrollment_row(2, 20, "B")]);

        let repository = SimpleRepository::<Enrollment>::new(&executor);
        let found = repository
            .find_all_by_id(&[
                EntityKey::composite(vec![Value::BigInt(Some(1)), Value::BigInt(Some(10))]),
                EntityKey::composite(vec![Value::BigInt(Some(2)), Value::BigInt(Some(20))]),
            ])
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(executor.query_count(), 2);
        for sql in executor.captured_sql() {
            assert!(sql.contains(r#""student_id" = "#), "sql: {sql}");
            assert!(sql.contains(r#""course_id" = "#), "sql: {sql}");
            assert!(!sql.contains(" IN "), "sql: {sql}");
        }
    }

    #[test]
    fn test_missing_ids_are_skipped_in_composite_lookup() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![enrollment_row(1, 10, "A")]);
        executor.push_rows(vec![]);

        let repository = SimpleRepository::<Enrollment>::new(&executor);
        let found = repository
            .find_all_by_id(&[
                EntityKey::composite(vec![Value::BigInt(Some(1)), Value::BigInt(Some(10))]),
                EntityKey::composite(vec![Value::BigInt(Some(9)), Value::BigInt(Some(90))]),
            ])
            .unwrap();

        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_find_all_by_id_with_no_keys_issues_no_query() {
        let executor = MockExecutor::new();
        let repository = SimpleRepository::<User>::new(&executor);
        assert!(repository.find_all_by_id(&[]).unwrap().is_empty());
        assert_eq!(executor.query_count(), 0);
    }

    #[test]
    fn test_find_all_sorted_orders_results() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![user_row(1, "Arrasz")]);

        let repository = SimpleRepository::<User>::new(&executor);
        repository
            .find_all_sorted(Sort::asc(&["lastname"]))
            .unwrap();

        assert!(executor.captured_sql()[0].contains(r#"ORDER BY "lastname" ASC"#));
    }

    // A composite-id entity with a table name private to this module, so
    // the metadata cache entries below are never resolved anywhere else.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    struct Trace;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TraceColumn {
        TraceId,
        SpanId,
        Name,
    }

    impl Iden for TraceColumn {
        fn unquoted(&self) -> &str {
            self.as_str()
        }
    }

    impl IdenStatic for TraceColumn {
        fn as_str(&self) -> &'static str {
            match self {
                TraceColumn::TraceId => "trace_id",
                TraceColumn::SpanId => "span_id",
                TraceColumn::Name => "name",
            }
        }
    }

    impl ColumnTrait for TraceColumn {
        fn all() -> &'static [Self] {
            &[TraceColumn::TraceId, TraceColumn::SpanId, TraceColumn::Name]
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TraceModel {
        trace_id: i64,
        span_id: i64,
        name: String,
    }

    impl ModelTrait for TraceModel {
        type Entity = Trace;

        fn get(&self, column: TraceColumn) -> Value {
            match column {
                TraceColumn::TraceId => Value::BigInt(Some(self.trace_id)),
                TraceColumn::SpanId => Value::BigInt(Some(self.span_id)),
                TraceColumn::Name => Value::String(Some(self.name.clone())),
            }
        }
    }

    impl FromRow for TraceModel {
        fn from_row(row: &Row) -> Result<Self, QuarryError> {
            Ok(TraceModel {
                trace_id: row.get("trace_id")?,
                span_id: row.get("span_id")?,
                name: row.get("name")?,
            })
        }
    }

    impl EntityTrait for Trace {
        type Model = TraceModel;
        type Column = TraceColumn;

        fn table_name(&self) -> &'static str {
            "repo_traces"
        }

        fn id_columns() -> &'static [TraceColumn] {
            &[TraceColumn::TraceId, TraceColumn::SpanId]
        }
    }

    fn trace_row(trace_id: i64, span_id: i64) -> Row {
        Row::new(
            ["trace_id", "span_id", "name"]
                .iter()
                .map(|s| ToString::to_string(s))
                .collect(),
            vec![
                Value::BigInt(Some(trace_id)),
                Value::BigInt(Some(span_id)),
                Value::String(Some("root".to_string())),
            ],
        )
        .unwrap()
    }

    /// Comments every statement with the name of the repository method
    /// that issued it.
    struct CommentingSource;

    impl MetadataSource for CommentingSource {
        fn describe(&self, method: MethodId) -> Option<CrudMethodMetadata> {
            Some(CrudMethodMetadata {
                comment: Some(method.method.to_string()),
                ..CrudMethodMetadata::default()
            })
        }
    }

    #[test]
    fn test_nested_lookups_bind_and_restore_method_metadata() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![trace_row(1, 10)]);
        executor.push_rows(vec![trace_row(2, 20)]);

        let repository =
            SimpleRepository::<Trace>::with_metadata_source(&executor, Box::new(CommentingSource));
        repository
            .find_all_by_id(&[
                EntityKey::composite(vec![Value::BigInt(Some(1)), Value::BigInt(Some(10))]),
                EntityKey::composite(vec![Value::BigInt(Some(2)), Value::BigInt(Some(20))]),
            ])
            .unwrap();

        // the per-key lookups run under the inner find_by_id binding
        for statement in executor.captured() {
            assert_eq!(statement.comment.as_deref(), Some("find_by_id"));
        }
        // every scope was popped with its call
        assert_eq!(repository.metadata_context().current().comment(), None);

        // the next call binds its own metadata again
        executor.push_rows(vec![]);
        repository.find_all().unwrap();
        assert_eq!(
            executor.captured().last().unwrap().comment.as_deref(),
            Some("find_all")
        );
    }

    #[test]
    fn test_find_all_sorted_resolves_metadata_under_its_own_name() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);

        let repository =
            SimpleRepository::<Trace>::with_metadata_source(&executor, Box::new(CommentingSource));
        repository.find_all_sorted(Sort::asc(&["name"])).unwrap();

        assert_eq!(
            executor.captured()[0].comment.as_deref(),
            Some("find_all_sorted")
        );
    }

    #[test]
    fn test_metadata_source_is_wired_onto_queries() {
        struct LockingSource;

        impl MetadataSource for LockingSource {
            fn describe(&self, method: MethodId) -> Option<CrudMethodMetadata> {
                (method.method == "count").then(|| CrudMethodMetadata {
                    lock: Some(LockMode::PessimisticRead),
                    ..CrudMethodMetadata::default()
                })
            }
        }

        let executor = MockExecutor::new();
        executor.push_rows(vec![Row::new(
            vec!["count".to_string()],
            vec![Value::BigInt(Some(3))],
        )
        .unwrap()]);

        let repository =
            SimpleRepository::<User>::with_metadata_source(&executor, Box::new(LockingSource));
        assert_eq!(repository.count().unwrap(), 3);
        // lock mode never reaches a count statement
        assert_eq!(executor.captured()[0].lock, None);
    }
}
