//! Fluent query execution over a specification.
//!
//! A [`FluentSelect`] starts from an optional [`Specification`] and is
//! refined by chainable, copy-on-write mutators before one of the terminal
//! operations runs it against the executor. Every mutator leaves the
//! receiver untouched and returns a new instance, so a base query can be
//! shared and refined along several paths.
//!
//! # Example
//!
//! ```ignore
//! let window = repository
//!     .query(Some(adults))
//!     .sort_by(Sort::asc(&["lastname"]))
//!     .limit(20)
//!     .scroll(&ScrollPosition::keyset())?;
//! ```

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use sea_query::{
    Alias, Condition, Expr, NullOrdering, Order, PostgresQueryBuilder, SelectStatement,
};

use crate::entity::{ColumnTrait, EntityTrait};
use crate::error::QuarryError;
use crate::executor::{FromRow, QueryExecutor, Row, Statement};
use crate::keyset::{KeysetScrollDelegate, SeaKeysetStrategy};
use crate::metadata::CrudMethodMetadata;
use crate::page::{Page, Pageable, Slice};
use crate::scroll::{ScrollDirection, ScrollPosition, Window};
use crate::sort::{NullHandling, Sort};
use crate::specification::{EntityRoot, Specification};

/// Dynamic projection record: rows re-typed by column name instead of a
/// declared model struct.
pub type ProjectedRow = Row;

/// A refinable select over entity `E`, producing results of type `R`.
pub struct FluentSelect<'e, E: EntityTrait, R = <E as EntityTrait>::Model> {
    executor: &'e dyn QueryExecutor,
    spec: Option<Specification<E>>,
    sort: Sort,
    limit: Option<u64>,
    properties: Vec<String>,
    metadata: Arc<CrudMethodMetadata>,
    _result: PhantomData<R>,
}

impl<'e, E: EntityTrait, R> Clone for FluentSelect<'e, E, R> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor,
            spec: self.spec.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            properties: self.properties.clone(),
            metadata: Arc::clone(&self.metadata),
            _result: PhantomData,
        }
    }
}

impl<'e, E: EntityTrait> FluentSelect<'e, E> {
    pub fn new(executor: &'e dyn QueryExecutor, spec: Option<Specification<E>>) -> Self {
        Self {
            executor,
            spec,
            sort: Sort::unsorted(),
            limit: None,
            properties: Vec::new(),
            metadata: CrudMethodMetadata::none(),
            _result: PhantomData,
        }
    }
}

impl<'e, E: EntityTrait, R> FluentSelect<'e, E, R> {
    /// Append sort criteria after any already present.
    pub fn sort_by(&self, sort: Sort) -> Self {
        let mut next = self.clone();
        next.sort = next.sort.clone().and(sort);
        next
    }

    pub fn limit(&self, limit: u64) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    /// Narrow the select list to the named properties (merged with any
    /// already requested). Sort properties and, for keyset scrolling, the
    /// identifier properties are always fetched as well.
    pub fn project(&self, properties: &[&str]) -> Self {
        let mut next = self.clone();
        for property in properties {
            if !next.properties.iter().any(|p| p == property) {
                next.properties.push((*property).to_string());
            }
        }
        next
    }

    /// Attach resolved method metadata; it is copied onto every statement
    /// this query issues.
    pub fn with_metadata(&self, metadata: Arc<CrudMethodMetadata>) -> Self {
        let mut next = self.clone();
        next.metadata = metadata;
        next
    }

    /// Re-type the results. `M` can be a model, a DTO reading columns in
    /// the projected order, or [`ProjectedRow`] for by-name access.
    pub fn as_model<M: FromRow>(&self) -> FluentSelect<'e, E, M> {
        FluentSelect {
            executor: self.executor,
            spec: self.spec.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            properties: self.properties.clone(),
            metadata: Arc::clone(&self.metadata),
            _result: PhantomData,
        }
    }

    fn column_for(&self, property: &str) -> Result<E::Column, QuarryError> {
        E::Column::from_name(property).ok_or_else(|| {
            QuarryError::InvalidUsage(format!(
                "property '{property}' does not resolve against entity '{}'",
                E::default().table_name()
            ))
        })
    }

    /// Assemble the select: projection, where-clause, ordering. `keyset`
    /// forces identifier columns into a narrowed projection so resume
    /// positions can be extracted from the rows.
    fn select(
        &self,
        sort: &Sort,
        keyset: bool,
        extra: Option<Condition>,
    ) -> Result<SelectStatement, QuarryError> {
        let mut statement = SelectStatement::default();
        statement.from(Alias::new(E::default().table_name()));

        if self.properties.is_empty() {
            statement.columns(E::Column::all().iter().copied());
        } else {
            let mut columns: Vec<E::Column> = Vec::new();
            for order in sort.iter() {
                push_unique(&mut columns, self.column_for(&order.property)?);
            }
            for property in &self.properties {
                push_unique(&mut columns, self.column_for(property)?);
            }
            if keyset {
                for id in E::id_columns() {
                    push_unique(&mut columns, *id);
                }
            }
            statement.columns(columns);
        }

        let root = EntityRoot::<E>::new();
        let base = self.spec.as_ref().and_then(|spec| spec.to_condition(&root));
        let condition = match (base, extra) {
            (None, None) => None,
            (Some(condition), None) | (None, Some(condition)) => Some(condition),
            (Some(base), Some(extra)) => Some(Condition::all().add(base).add(extra)),
        };
        if let Some(condition) = condition {
            statement.cond_where(condition);
        }

        for order in sort.iter() {
            let column = self.column_for(&order.property)?;
            let direction = Order::from(order.direction);
            match order.nulls {
                NullHandling::Native => {
                    statement.order_by(column, direction);
                }
                NullHandling::NullsFirst => {
                    statement.order_by_with_nulls(column, direction, NullOrdering::First);
                }
                NullHandling::NullsLast => {
                    statement.order_by_with_nulls(column, direction, NullOrdering::Last);
                }
            }
        }

        Ok(statement)
    }

    fn run(
        &self,
        statement: SelectStatement,
        for_count: bool,
    ) -> Result<Vec<Row>, QuarryError> {
        let (sql, values) = statement.build(PostgresQueryBuilder);
        log::debug!("executing: {sql}");
        let statement = Statement::new(sql, values).apply_metadata(&self.metadata, for_count);
        self.executor.query(&statement)
    }

    fn fetch(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Row>, QuarryError> {
        let mut statement = self.select(&self.sort, false, None)?;
        if let Some(limit) = limit {
            statement.limit(limit);
        }
        if let Some(offset) = offset {
            statement.offset(offset);
        }
        self.run(statement, false)
    }

    /// Count rows matching the specification. The statement carries no
    /// ordering, limit or offset and only count-applicable hints.
    pub fn count(&self) -> Result<u64, QuarryError> {
        let mut statement = SelectStatement::default();
        statement
            .expr(Expr::cust("COUNT(*)"))
            .from(Alias::new(E::default().table_name()));

        let root = EntityRoot::<E>::new();
        if let Some(condition) = self.spec.as_ref().and_then(|spec| spec.to_condition(&root)) {
            statement.cond_where(condition);
        }

        let rows = self.run(statement, true)?;
        let row = rows.first().ok_or_else(|| {
            QuarryError::Execution("count query returned no rows".to_string())
        })?;
        let count: i64 = row.get_at(0)?;
        Ok(count.max(0) as u64)
    }

    /// Probe with a single row; cheaper than counting.
    pub fn exists(&self) -> Result<bool, QuarryError> {
        let rows = self.fetch(Some(1), None)?;
        Ok(!rows.is_empty())
    }
}

impl<'e, E: EntityTrait, R: FromRow> FluentSelect<'e, E, R> {
    fn convert(rows: Vec<Row>) -> Result<Vec<R>, QuarryError> {
        rows.iter().map(R::from_row).collect()
    }

    /// Exactly zero or one result. Probes with a two-row cap: a second row
    /// proves the violation without fetching the rest.
    pub fn one(&self) -> Result<Option<R>, QuarryError> {
        let rows = self.fetch(Some(2), None)?;
        match rows.len() {
            0 => Ok(None),
            1 => R::from_row(&rows[0]).map(Some),
            _ => Err(QuarryError::IncorrectResultSize {
                expected: 1,
                actual: 2,
            }),
        }
    }

    /// The first result under the current sort, if any.
    pub fn first(&self) -> Result<Option<R>, QuarryError> {
        let rows = self.fetch(Some(1), None)?;
        match rows.first() {
            Some(row) => R::from_row(row).map(Some),
            None => Ok(None),
        }
    }

    pub fn all(&self) -> Result<Vec<R>, QuarryError> {
        let rows = self.fetch(self.limit, None)?;
        Self::convert(rows)
    }

    /// All results as an iterator. Materialized up front; the provider
    /// contract is blocking and row-at-a-time cursors are its concern.
    pub fn stream(&self) -> Result<Box<dyn Iterator<Item = R>>, QuarryError>
    where
        R: 'static,
    {
        Ok(Box::new(self.all()?.into_iter()))
    }

    /// One slice: fetches `size + 1` rows so `has_next` never needs a
    /// count query.
    pub fn slice(&self, pageable: Pageable) -> Result<Slice<R>, QuarryError> {
        let Some(size) = pageable.size() else {
            let items = self.all()?;
            return Ok(Slice::new(items, false, pageable));
        };

        let mut rows = self.fetch(Some(size + 1), Some(pageable.offset()))?;
        let has_next = rows.len() as u64 > size;
        rows.truncate(size as usize);
        Ok(Slice::new(Self::convert(rows)?, has_next, pageable))
    }

    /// One page with its total. The count query is skipped whenever the
    /// fetched page proves the total on its own: an unpaged request, a
    /// first page below the size, or a later page that came back partially
    /// filled. Only an exactly-full page (or an empty one past the first)
    /// needs the explicit count.
    pub fn page(&self, pageable: Pageable) -> Result<Page<R>, QuarryError> {
        let Some(size) = pageable.size() else {
            let items = self.all()?;
            let total = items.len() as u64;
            return Ok(Page::new(items, total, pageable));
        };

        let offset = pageable.offset();
        let rows = self.fetch(Some(size), Some(offset))?;
        let fetched = rows.len() as u64;
        let items = Self::convert(rows)?;

        let total = if offset == 0 {
            if size > fetched {
                fetched
            } else {
                self.count()?
            }
        } else if fetched != 0 && size > fetched {
            offset + fetched
        } else {
            self.count()?
        };

        Ok(Page::new(items, total, pageable))
    }

    /// Scroll one window forward or backward from `position`.
    pub fn scroll(&self, position: &ScrollPosition) -> Result<Window<R>, QuarryError> {
        let limit = self.limit.ok_or_else(|| {
            QuarryError::InvalidUsage(
                "scrolling requires a window size; call limit() first".to_string(),
            )
        })?;

        match position {
            ScrollPosition::Offset(offset) => self.scroll_offset(*offset, limit),
            ScrollPosition::Keyset { keys, direction } => {
                self.scroll_keyset(keys, *direction, limit)
            }
        }
    }

    fn scroll_offset(&self, offset: u64, limit: u64) -> Result<Window<R>, QuarryError> {
        let mut rows = self.fetch(Some(limit + 1), Some(offset))?;
        let has_next = rows.len() as u64 > limit;
        rows.truncate(limit as usize);

        let positions = (0..rows.len())
            .map(|index| ScrollPosition::offset_at(offset + index as u64 + 1))
            .collect();
        Ok(Window::new(Self::convert(rows)?, positions, has_next))
    }

    fn scroll_keyset(
        &self,
        keys: &BTreeMap<String, sea_query::Value>,
        direction: ScrollDirection,
        limit: u64,
    ) -> Result<Window<R>, QuarryError> {
        let delegate = KeysetScrollDelegate::of(direction);
        let stabilized = KeysetScrollDelegate::stabilize_sort::<E>(&self.sort);

        let root = EntityRoot::<E>::new();
        let strategy = SeaKeysetStrategy::new(&root);
        let predicate = delegate.predicate(keys, &stabilized, &strategy)?;

        let query_sort = delegate.sort_for_query(&stabilized);
        let mut statement = self.select(&query_sort, true, predicate)?;
        statement.limit(limit + 1);

        let rows = self.run(statement, false)?;
        let has_next = rows.len() as u64 > limit;
        let rows = delegate.result_window(delegate.post_process(rows), limit as usize);

        let properties = KeysetScrollDelegate::keyset_properties::<E>(&stabilized);
        let mut positions = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut key_map = BTreeMap::new();
            for property in &properties {
                let value = row.raw(property).cloned().ok_or_else(|| {
                    QuarryError::Conversion(format!(
                        "result row is missing keyset property '{property}'"
                    ))
                })?;
                key_map.insert(property.clone(), value);
            }
            positions.push(ScrollPosition::keyset_at(key_map, direction));
        }

        Ok(Window::new(Self::convert(rows)?, positions, has_next))
    }
}

fn push_unique<C: PartialEq + Copy>(columns: &mut Vec<C>, column: C) {
    if !columns.contains(&column) {
        columns.push(column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::{User, UserColumn};
    use crate::executor::test_support::MockExecutor;
    use crate::metadata::{LockMode, QueryHints};
    use sea_query::{ExprTrait, Value};

    fn user_row(id: i64, firstname: &str, lastname: &str, age: i32) -> Row {
        Row::new(
            ["id", "firstname", "lastname", "age", "version"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![
                Value::BigInt(Some(id)),
                Value::String(Some(firstname.to_string())),
                Value::String(Some(lastname.to_string())),
                Value::Int(Some(age)),
                Value::BigInt(Some(0)),
            ],
        )
        .unwrap()
    }

    fn count_row(count: i64) -> Row {
        Row::new(vec!["count".to_string()], vec![Value::BigInt(Some(count))]).unwrap()
    }

    fn adults() -> Specification<User> {
        Specification::from_condition(Expr::col(UserColumn::Age).gte(18))
    }

    #[test]
    fn test_all_renders_filter_and_sort() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![user_row(1, "Oliver", "Gierke", 40)]);

        let found = FluentSelect::<User>::new(&executor, Some(adults()))
            .sort_by(Sort::asc(&["lastname"]))
            .all()
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].lastname, "Gierke");
        let sql = &executor.captured_sql()[0];
        assert!(sql.contains(r#""age" >= "#), "sql: {sql}");
        assert!(sql.contains(r#"ORDER BY "lastname" ASC"#), "sql: {sql}");
    }

    #[test]
    fn test_one_probes_with_two_row_cap() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![user_row(1, "Oliver", "Gierke", 40)]);

        let found = FluentSelect::<User>::new(&executor, None).one().unwrap();
        assert!(found.is_some());
        let captured = executor.captured();
        assert!(captured[0].sql.contains("LIMIT"));
        // the probe caps at two rows
        assert!(captured[0]
            .values
            .0
            .contains(&Value::BigUnsigned(Some(2))));
    }

    #[test]
    fn test_one_with_two_rows_reports_result_size() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![
            user_row(1, "Oliver", "Gierke", 40),
            user_row(2, "Mark", "Paluch", 41),
        ]);

        let err = FluentSelect::<User>::new(&executor, None).one().unwrap_err();
        assert!(matches!(
            err,
            QuarryError::IncorrectResultSize {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_one_with_no_rows_is_none() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        let found = FluentSelect::<User>::new(&executor, None).one().unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_exists_probes_single_row() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![user_row(1, "Oliver", "Gierke", 40)]);

        assert!(FluentSelect::<User>::new(&executor, None).exists().unwrap());
        let captured = executor.captured();
        assert!(captured[0].sql.contains("LIMIT"));
        assert!(captured[0]
            .values
            .0
            .contains(&Value::BigUnsigned(Some(1))));
    }

    #[test]
    fn test_count_statement_has_no_ordering() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![count_row(12)]);

        let count = FluentSelect::<User>::new(&executor, Some(adults()))
            .sort_by(Sort::asc(&["lastname"]))
            .count()
            .unwrap();

        assert_eq!(count, 12);
        let sql = &executor.captured_sql()[0];
        assert!(sql.contains("COUNT(*)"), "sql: {sql}");
        assert!(!sql.contains("ORDER BY"), "sql: {sql}");
    }

    #[test]
    fn test_partial_first_page_skips_count_query() {
        let executor = MockExecutor::new();
        executor.push_rows(
            (0..7)
                .map(|n| user_row(n, "First", "Last", 30))
                .collect(),
        );

        let page = FluentSelect::<User>::new(&executor, None)
            .page(Pageable::page(0, 10))
            .unwrap();

        assert_eq!(page.total_elements(), 7);
        assert_eq!(executor.query_count(), 1);
    }

    #[test]
    fn test_full_page_issues_count_query() {
        let executor = MockExecutor::new();
        executor.push_rows((0..10).map(|n| user_row(n, "First", "Last", 30)).collect());
        executor.push_rows(vec![count_row(25)]);

        let page = FluentSelect::<User>::new(&executor, None)
            .page(Pageable::page(0, 10))
            .unwrap();

        assert_eq!(page.total_elements(), 25);
        assert_eq!(executor.query_count(), 2);
        assert!(executor.captured_sql()[1].contains("COUNT(*)"));
    }

    #[test]
    fn test_partial_later_page_infers_total_from_offset() {
        let executor = MockExecutor::new();
        executor.push_rows((0..3).map(|n| user_row(n, "First", "Last", 30)).collect());

        let page = FluentSelect::<User>::new(&executor, None)
            .page(Pageable::page(1, 10))
            .unwrap();

        assert_eq!(page.total_elements(), 13);
        assert_eq!(executor.query_count(), 1);
    }

    #[test]
    fn test_empty_later_page_falls_back_to_count() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        executor.push_rows(vec![count_row(4)]);

        let page = FluentSelect::<User>::new(&executor, None)
            .page(Pageable::page(2, 10))
            .unwrap();

        assert_eq!(page.total_elements(), 4);
        assert_eq!(executor.query_count(), 2);
    }

    #[test]
    fn test_unpaged_page_never_counts() {
        let executor = MockExecutor::new();
        executor.push_rows((0..4).map(|n| user_row(n, "First", "Last", 30)).collect());

        let page = FluentSelect::<User>::new(&executor, None)
            .page(Pageable::Unpaged)
            .unwrap();

        assert_eq!(page.total_elements(), 4);
        assert_eq!(page.total_pages(), 1);
        assert_eq!(executor.query_count(), 1);
    }

    #[test]
    fn test_slice_probes_one_row_past_the_size() {
        let executor = MockExecutor::new();
        executor.push_rows((0..3).map(|n| user_row(n, "First", "Last", 30)).collect());

        let slice = FluentSelect::<User>::new(&executor, None)
            .slice(Pageable::page(0, 2))
            .unwrap();

        assert_eq!(slice.len(), 2);
        assert!(slice.has_next());
        // one row past the requested size
        assert!(executor.captured()[0]
            .values
            .0
            .contains(&Value::BigUnsigned(Some(3))));
    }

    #[test]
    fn test_scroll_requires_a_limit() {
        let executor = MockExecutor::new();
        let err = FluentSelect::<User>::new(&executor, None)
            .scroll(&ScrollPosition::offset())
            .unwrap_err();
        assert!(matches!(err, QuarryError::InvalidUsage(_)));
    }

    #[test]
    fn test_offset_scroll_positions_resume_after_each_row() {
        let executor = MockExecutor::new();
        executor.push_rows((0..3).map(|n| user_row(n, "First", "Last", 30)).collect());

        let window = FluentSelect::<User>::new(&executor, None)
            .limit(2)
            .scroll(&ScrollPosition::offset_at(4))
            .unwrap();

        assert_eq!(window.len(), 2);
        assert!(window.has_next());
        assert_eq!(window.position_at(0), Some(&ScrollPosition::offset_at(5)));
        assert_eq!(window.position_at(1), Some(&ScrollPosition::offset_at(6)));
        let captured = executor.captured();
        assert!(captured[0].sql.contains("LIMIT"));
        assert!(captured[0].sql.contains("OFFSET"));
        assert!(captured[0]
            .values
            .0
            .contains(&Value::BigUnsigned(Some(3))));
        assert!(captured[0]
            .values
            .0
            .contains(&Value::BigUnsigned(Some(4))));
    }

    #[test]
    fn test_keyset_scroll_stabilizes_sort_and_probes() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![
            user_row(1, "Jens", "Arrasz", 30),
            user_row(2, "Oliver", "Gierke", 40),
            user_row(3, "Mike", "Matthews", 50),
        ]);

        let window = FluentSelect::<User>::new(&executor, None)
            .sort_by(Sort::asc(&["lastname"]))
            .limit(2)
            .scroll(&ScrollPosition::keyset())
            .unwrap();

        assert_eq!(window.len(), 2);
        assert!(window.has_next());

        let sql = &executor.captured_sql()[0];
        assert!(
            sql.contains(r#"ORDER BY "lastname" ASC, "id" ASC"#),
            "sql: {sql}"
        );
        assert!(sql.contains("LIMIT"), "sql: {sql}");

        // the resume position carries the last retained row's keys
        match window.last_position() {
            Some(ScrollPosition::Keyset { keys, .. }) => {
                assert_eq!(
                    keys.get("lastname"),
                    Some(&Value::String(Some("Gierke".to_string())))
                );
                assert_eq!(keys.get("id"), Some(&Value::BigInt(Some(2))));
            }
            other => panic!("unexpected position: {other:?}"),
        }
    }

    #[test]
    fn test_keyset_resume_filters_after_position() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![user_row(3, "Mike", "Matthews", 50)]);

        let position = ScrollPosition::keyset_at(
            [
                (
                    "lastname".to_string(),
                    Value::String(Some("Gierke".to_string())),
                ),
                ("id".to_string(), Value::BigInt(Some(2))),
            ]
            .into_iter()
            .collect(),
            ScrollDirection::Forward,
        );

        let window = FluentSelect::<User>::new(&executor, None)
            .sort_by(Sort::asc(&["lastname"]))
            .limit(2)
            .scroll(&position)
            .unwrap();

        assert_eq!(window.len(), 1);
        assert!(!window.has_next());
        let sql = &executor.captured_sql()[0];
        assert!(sql.contains(r#""lastname" > "#), "sql: {sql}");
        assert!(sql.contains(r#""lastname" = "#), "sql: {sql}");
    }

    #[test]
    fn test_projection_keeps_sort_and_identifier_columns_for_keyset() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);

        FluentSelect::<User>::new(&executor, None)
            .sort_by(Sort::asc(&["lastname"]))
            .project(&["firstname"])
            .limit(2)
            .as_model::<ProjectedRow>()
            .scroll(&ScrollPosition::keyset())
            .unwrap();

        let sql = &executor.captured_sql()[0];
        assert!(
            sql.starts_with(r#"SELECT "lastname", "firstname", "id" FROM"#),
            "sql: {sql}"
        );
    }

    #[test]
    fn test_projection_narrows_plain_select() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);

        FluentSelect::<User>::new(&executor, None)
            .project(&["firstname", "lastname"])
            .as_model::<ProjectedRow>()
            .all()
            .unwrap();

        let sql = &executor.captured_sql()[0];
        assert!(
            sql.starts_with(r#"SELECT "firstname", "lastname" FROM"#),
            "sql: {sql}"
        );
    }

    #[test]
    fn test_unknown_property_is_rejected() {
        let executor = MockExecutor::new();
        let err = FluentSelect::<User>::new(&executor, None)
            .sort_by(Sort::asc(&["salary"]))
            .all()
            .unwrap_err();
        assert!(err.to_string().contains("salary"));
    }

    #[test]
    fn test_metadata_is_copied_onto_statements() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        executor.push_rows(vec![count_row(0)]);

        let metadata = Arc::new(CrudMethodMetadata {
            lock: Some(LockMode::PessimisticRead),
            hints: QueryHints::new().add("fetchSize", "32"),
            comment: Some("audited read".to_string()),
            graph: None,
        });

        let select = FluentSelect::<User>::new(&executor, None).with_metadata(metadata);
        select.all().unwrap();
        select.count().unwrap();

        let captured = executor.captured();
        assert_eq!(captured[0].lock, Some(LockMode::PessimisticRead));
        assert_eq!(captured[0].hints.len(), 1);
        // count statements never lock and only carry counting hints
        assert_eq!(captured[1].lock, None);
        assert!(captured[1].hints.is_empty());
    }
}
