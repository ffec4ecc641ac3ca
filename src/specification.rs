//! Composable, deferred predicates over an entity root.
//!
//! A [`Specification`] is a pure function from the entity root to an
//! optional condition; evaluation is deferred until the fluent layer builds
//! a statement. Composition is algebraic (`and`, `or`, `not`) with
//! null-absorption: an absent constraint composed with a present one yields
//! the present one unchanged, and two absent constraints yield no
//! constraint. Repositories rely on this when appending internally generated
//! predicates (such as the keyset matrix) to caller-supplied ones.

use std::marker::PhantomData;
use std::sync::Arc;

use sea_query::{Condition, Expr, IntoCondition};

use crate::entity::{ColumnTrait, EntityTrait};
use crate::error::QuarryError;

/// Query root for one entity: resolves attributes to column expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityRoot<E: EntityTrait> {
    _marker: PhantomData<E>,
}

impl<E: EntityTrait> EntityRoot<E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Column expression for a typed column.
    pub fn column(&self, column: E::Column) -> Expr {
        Expr::col(column)
    }

    /// Column expression for a property path, failing on unknown paths.
    pub fn property(&self, name: &str) -> Result<Expr, QuarryError> {
        let column = E::Column::from_name(name).ok_or_else(|| {
            QuarryError::InvalidUsage(format!(
                "property '{name}' does not resolve against entity '{}'",
                E::default().table_name()
            ))
        })?;
        Ok(Expr::col(column))
    }
}

/// A deferred, composable predicate for entity `E`.
#[derive(Clone)]
pub struct Specification<E: EntityTrait> {
    eval: Arc<dyn Fn(&EntityRoot<E>) -> Option<Condition> + Send + Sync>,
}

impl<E: EntityTrait> Specification<E> {
    pub fn new<F>(eval: F) -> Self
    where
        F: Fn(&EntityRoot<E>) -> Option<Condition> + Send + Sync + 'static,
    {
        Self {
            eval: Arc::new(eval),
        }
    }

    /// The specification matching everything (no constraint).
    pub fn all() -> Self {
        Self::new(|_| None)
    }

    /// A specification from a fixed condition or expression.
    pub fn from_condition<C: IntoCondition + Clone + Send + Sync + 'static>(condition: C) -> Self {
        Self::new(move |_| Some(condition.clone().into_condition()))
    }

    /// Evaluate against a concrete root. `None` means "no constraint".
    pub fn to_condition(&self, root: &EntityRoot<E>) -> Option<Condition> {
        (self.eval)(root)
    }

    /// Conjunction; an operand evaluating to no constraint is absorbed.
    pub fn and(&self, other: &Specification<E>) -> Specification<E> {
        let left = self.clone();
        let right = other.clone();
        Self::new(move |root| {
            match (left.to_condition(root), right.to_condition(root)) {
                (Some(a), Some(b)) => Some(Condition::all().add(a).add(b)),
                (Some(a), None) | (None, Some(a)) => Some(a),
                (None, None) => None,
            }
        })
    }

    /// Disjunction; an operand evaluating to no constraint is absorbed.
    pub fn or(&self, other: &Specification<E>) -> Specification<E> {
        let left = self.clone();
        let right = other.clone();
        Self::new(move |root| {
            match (left.to_condition(root), right.to_condition(root)) {
                (Some(a), Some(b)) => Some(Condition::any().add(a).add(b)),
                (Some(a), None) | (None, Some(a)) => Some(a),
                (None, None) => None,
            }
        })
    }

    /// Negation; negating no constraint still constrains nothing.
    pub fn negate(&self) -> Specification<E> {
        let inner = self.clone();
        Self::new(move |root| inner.to_condition(root).map(Condition::not))
    }

    /// Null-absorbing conjunction over optional operands: a `None` operand
    /// yields the other unchanged; two `None`s yield `None` ("no
    /// constraint").
    pub fn and_opt(
        a: Option<Specification<E>>,
        b: Option<Specification<E>>,
    ) -> Option<Specification<E>> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.and(&b)),
            (Some(s), None) | (None, Some(s)) => Some(s),
            (None, None) => None,
        }
    }

    /// Null-absorbing disjunction over optional operands.
    pub fn or_opt(
        a: Option<Specification<E>>,
        b: Option<Specification<E>>,
    ) -> Option<Specification<E>> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.or(&b)),
            (Some(s), None) | (None, Some(s)) => Some(s),
            (None, None) => None,
        }
    }

    /// Conjunction of any number of optional specifications.
    pub fn all_of(specs: impl IntoIterator<Item = Option<Specification<E>>>) -> Option<Self> {
        specs.into_iter().fold(None, Self::and_opt)
    }

    /// Disjunction of any number of optional specifications.
    pub fn any_of(specs: impl IntoIterator<Item = Option<Specification<E>>>) -> Option<Self> {
        specs.into_iter().fold(None, Self::or_opt)
    }
}

impl<E: EntityTrait> std::fmt::Debug for Specification<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Specification(..)")
    }
}
