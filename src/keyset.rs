//! Keyset scrolling: sort stabilization and the "after this row" predicate.
//!
//! Given a sort and the last-seen key values, the delegate builds one
//! disjunctive clause per sort position: clause *i* requires equality on
//! every sort property before *i* and a directional inequality on property
//! *i*. The disjunction reproduces strict lexicographic "after" semantics
//! for the sort order.
//!
//! Backward traversal reuses the same code path: every order's direction is
//! flipped and the inequalities become inclusive, the query fetches in the
//! flipped order, and the fetched rows are reversed in memory before
//! windowing so the caller still sees the original sort order.

use std::collections::BTreeMap;

use sea_query::{Condition, Expr, ExprTrait, IdenStatic, IntoCondition, Value};

use crate::entity::EntityTrait;
use crate::error::QuarryError;
use crate::scroll::ScrollDirection;
use crate::sort::{Direction, Sort, SortOrder};
use crate::specification::EntityRoot;

/// Provider-agnostic predicate factory used by the delegate.
///
/// The delegate only decides the shape of the matrix; a strategy renders
/// property expressions and comparisons in whatever predicate type the
/// query backend uses.
pub trait KeysetStrategy {
    type Expression;
    type Predicate;

    fn property_expression(&self, property: &str) -> Result<Self::Expression, QuarryError>;

    /// Directional comparison for one sort criterion: `>` for ascending,
    /// `<` for descending, or their inclusive forms.
    fn compare_with_order(
        &self,
        expression: Self::Expression,
        order: &SortOrder,
        value: Value,
        inclusive: bool,
    ) -> Self::Predicate;

    fn compare_equal(&self, expression: Self::Expression, value: Value) -> Self::Predicate;

    fn and(&self, predicates: Vec<Self::Predicate>) -> Self::Predicate;

    fn or(&self, predicates: Vec<Self::Predicate>) -> Self::Predicate;
}

/// Sea-query strategy: predicates are [`Condition`] trees over an entity
/// root.
pub struct SeaKeysetStrategy<'r, E: EntityTrait> {
    root: &'r EntityRoot<E>,
}

impl<'r, E: EntityTrait> SeaKeysetStrategy<'r, E> {
    pub fn new(root: &'r EntityRoot<E>) -> Self {
        Self { root }
    }
}

impl<E: EntityTrait> KeysetStrategy for SeaKeysetStrategy<'_, E> {
    type Expression = Expr;
    type Predicate = Condition;

    fn property_expression(&self, property: &str) -> Result<Expr, QuarryError> {
        self.root.property(property)
    }

    fn compare_with_order(
        &self,
        expression: Expr,
        order: &SortOrder,
        value: Value,
        inclusive: bool,
    ) -> Condition {
        let compared = match (order.direction, inclusive) {
            (Direction::Asc, false) => expression.gt(value),
            (Direction::Asc, true) => expression.gte(value),
            (Direction::Desc, false) => expression.lt(value),
            (Direction::Desc, true) => expression.lte(value),
        };
        compared.into_condition()
    }

    fn compare_equal(&self, expression: Expr, value: Value) -> Condition {
        expression.eq(value).into_condition()
    }

    fn and(&self, predicates: Vec<Condition>) -> Condition {
        predicates
            .into_iter()
            .fold(Condition::all(), Condition::add)
    }

    fn or(&self, predicates: Vec<Condition>) -> Condition {
        predicates
            .into_iter()
            .fold(Condition::any(), Condition::add)
    }
}

/// Direction-aware scroll delegate.
#[derive(Debug, Clone, Copy)]
pub struct KeysetScrollDelegate {
    direction: ScrollDirection,
}

impl KeysetScrollDelegate {
    pub fn of(direction: ScrollDirection) -> Self {
        Self { direction }
    }

    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    /// Amend `sort` so ties are always broken by the identifier
    /// attribute(s); an empty caller sort becomes identifier-only. The
    /// result is never empty.
    pub fn stabilize_sort<E: EntityTrait>(sort: &Sort) -> Sort {
        let mut stabilized = sort.clone();
        for id in E::id_columns() {
            if !stabilized.contains_property(id.as_str()) {
                stabilized = stabilized.then(SortOrder::asc(id.as_str()));
            }
        }
        stabilized
    }

    /// The sort actually sent to the provider: unchanged going forward,
    /// fully reversed going backward.
    pub fn sort_for_query(&self, stabilized: &Sort) -> Sort {
        match self.direction {
            ScrollDirection::Forward => stabilized.clone(),
            ScrollDirection::Backward => stabilized.reverse(),
        }
    }

    /// Build the "rows strictly after this keyset" predicate.
    ///
    /// Returns `None` for an empty key map (first page). Fails naming the
    /// property when the keyset lacks a value some sort criterion needs.
    pub fn predicate<S: KeysetStrategy>(
        &self,
        keys: &BTreeMap<String, Value>,
        stabilized: &Sort,
        strategy: &S,
    ) -> Result<Option<S::Predicate>, QuarryError> {
        if keys.is_empty() {
            return Ok(None);
        }

        let sort = self.sort_for_query(stabilized);
        let inclusive = matches!(self.direction, ScrollDirection::Backward);

        let mut clauses = Vec::with_capacity(sort.len());
        for i in 0..sort.len() {
            let mut constraint = Vec::with_capacity(i + 1);
            for (j, order) in sort.iter().enumerate().take(i + 1) {
                let value = keys.get(&order.property).cloned().ok_or_else(|| {
                    QuarryError::MissingKeysetValue(order.property.clone())
                })?;
                let expression = strategy.property_expression(&order.property)?;
                if j == i {
                    constraint.push(strategy.compare_with_order(
                        expression, order, value, inclusive,
                    ));
                } else {
                    constraint.push(strategy.compare_equal(expression, value));
                }
            }
            clauses.push(strategy.and(constraint));
        }

        Ok(Some(strategy.or(clauses)))
    }

    /// Restore the caller's expected order: backward fetches arrive in the
    /// flipped sort order and are reversed here.
    pub fn post_process<T>(&self, mut rows: Vec<T>) -> Vec<T> {
        if matches!(self.direction, ScrollDirection::Backward) {
            rows.reverse();
        }
        rows
    }

    /// Trim a `limit + 1` probe fetch to the window contents.
    ///
    /// Going forward the window is the first `limit` rows. Going backward,
    /// after [`Self::post_process`] has already reversed the list, it is
    /// the last `limit` rows, so the extra probe row at the far end is the
    /// one dropped.
    pub fn result_window<T>(&self, rows: Vec<T>, limit: usize) -> Vec<T> {
        if rows.len() <= limit {
            return rows;
        }
        match self.direction {
            ScrollDirection::Forward => {
                let mut rows = rows;
                rows.truncate(limit);
                rows
            }
            ScrollDirection::Backward => {
                let skip = rows.len() - limit;
                rows.into_iter().skip(skip).collect()
            }
        }
    }

    /// The property paths a resume position must capture for this sort:
    /// every sort property followed by any identifier attribute not already
    /// sorted on.
    pub fn keyset_properties<E: EntityTrait>(stabilized: &Sort) -> Vec<String> {
        stabilized.iter().map(|o| o.property.clone()).collect()
    }
}
