//! Sort model: ordered property/direction/null-handling triples.
//!
//! Property paths are plain attribute names resolved against the entity's
//! column set when the query is built; order is significant and preserved
//! through every derived query, including keyset predicates.

use sea_query::Order;
use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn is_ascending(self) -> bool {
        matches!(self, Direction::Asc)
    }

    /// The opposite direction; used when scrolling backward.
    pub fn flip(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        }
    }
}

/// Where nulls sort relative to non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NullHandling {
    /// Provider default.
    #[default]
    Native,
    NullsFirst,
    NullsLast,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub property: String,
    pub direction: Direction,
    pub nulls: NullHandling,
}

impl SortOrder {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
            nulls: NullHandling::Native,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
            nulls: NullHandling::Native,
        }
    }

    pub fn with_nulls(mut self, nulls: NullHandling) -> Self {
        self.nulls = nulls;
        self
    }

    /// Same property, opposite direction.
    pub fn reverse(&self) -> Self {
        Self {
            property: self.property.clone(),
            direction: self.direction.flip(),
            nulls: self.nulls,
        }
    }
}

/// An ordered sequence of sort criteria.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<SortOrder>,
}

impl Sort {
    /// The empty (unsorted) sort.
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(orders: Vec<SortOrder>) -> Self {
        Self { orders }
    }

    /// Ascending sort over the given properties, in order.
    pub fn asc(properties: &[&str]) -> Self {
        Self {
            orders: properties.iter().map(|p| SortOrder::asc(*p)).collect(),
        }
    }

    /// Descending sort over the given properties, in order.
    pub fn desc(properties: &[&str]) -> Self {
        Self {
            orders: properties.iter().map(|p| SortOrder::desc(*p)).collect(),
        }
    }

    /// Append another sort's criteria after this one's.
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    /// Append a single criterion.
    pub fn then(mut self, order: SortOrder) -> Self {
        self.orders.push(order);
        self
    }

    /// Every criterion with its direction flipped, order preserved.
    pub fn reverse(&self) -> Self {
        Self {
            orders: self.orders.iter().map(SortOrder::reverse).collect(),
        }
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SortOrder> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Whether `property` already appears as a criterion.
    pub fn contains_property(&self, property: &str) -> bool {
        self.orders.iter().any(|o| o.property == property)
    }
}

impl<'a> IntoIterator for &'a Sort {
    type Item = &'a SortOrder;
    type IntoIter = std::slice::Iter<'a, SortOrder>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}
