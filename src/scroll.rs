//! Scroll positions and result windows.
//!
//! A [`ScrollPosition`] marks where iteration resumes: either an absolute
//! row offset or a keyset: the last-seen values of every sorted property,
//! plus a traversal direction. A [`Window`] pairs one fetch's rows with the
//! position that would resume after each row and a has-more flag.

use std::collections::BTreeMap;

use sea_query::Value;

/// Traversal direction for keyset scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Forward,
    Backward,
}

impl ScrollDirection {
    pub fn is_forward(self) -> bool {
        matches!(self, ScrollDirection::Forward)
    }
}

/// Where to resume a scroll.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollPosition {
    /// Absolute row offset; rows before it are skipped.
    Offset(u64),
    /// Sort-property name → last-seen value, plus traversal direction. An
    /// empty key map means "start from the beginning".
    Keyset {
        keys: BTreeMap<String, Value>,
        direction: ScrollDirection,
    },
}

impl ScrollPosition {
    /// Initial offset position (offset zero).
    pub fn offset() -> Self {
        ScrollPosition::Offset(0)
    }

    pub fn offset_at(offset: u64) -> Self {
        ScrollPosition::Offset(offset)
    }

    /// Initial keyset position (empty key map, forward).
    pub fn keyset() -> Self {
        ScrollPosition::Keyset {
            keys: BTreeMap::new(),
            direction: ScrollDirection::Forward,
        }
    }

    pub fn keyset_at(keys: BTreeMap<String, Value>, direction: ScrollDirection) -> Self {
        ScrollPosition::Keyset { keys, direction }
    }

    /// Whether this position points at the very start of the result set.
    pub fn is_initial(&self) -> bool {
        match self {
            ScrollPosition::Offset(offset) => *offset == 0,
            ScrollPosition::Keyset { keys, .. } => keys.is_empty(),
        }
    }

    /// The same keyset, traversed the other way. Offset positions are
    /// returned unchanged.
    pub fn reversed(&self) -> Self {
        match self {
            ScrollPosition::Offset(o) => ScrollPosition::Offset(*o),
            ScrollPosition::Keyset { keys, direction } => ScrollPosition::Keyset {
                keys: keys.clone(),
                direction: match direction {
                    ScrollDirection::Forward => ScrollDirection::Backward,
                    ScrollDirection::Backward => ScrollDirection::Forward,
                },
            },
        }
    }
}

/// One fetched window of a scroll sequence.
///
/// Invariant: `has_next` and the element count are consistent with the
/// requested limit: the delegate fetches one row past the limit to decide
/// `has_next`, then trims.
#[derive(Debug, Clone)]
pub struct Window<T> {
    items: Vec<T>,
    positions: Vec<ScrollPosition>,
    has_next: bool,
}

impl<T> Window<T> {
    /// Build a window; `positions[i]` must resume iteration after
    /// `items[i]`.
    pub fn new(items: Vec<T>, positions: Vec<ScrollPosition>, has_next: bool) -> Self {
        debug_assert_eq!(items.len(), positions.len());
        Self {
            items,
            positions,
            has_next,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The position resuming iteration after the row at `index`.
    pub fn position_at(&self, index: usize) -> Option<&ScrollPosition> {
        self.positions.get(index)
    }

    /// The position resuming after the last row of this window.
    pub fn last_position(&self) -> Option<&ScrollPosition> {
        self.positions.last()
    }

    /// The position resuming before the first row of this window (for
    /// scrolling backward from here).
    pub fn first_position(&self) -> Option<&ScrollPosition> {
        self.positions.first()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Window<U> {
        Window {
            items: self.items.into_iter().map(f).collect(),
            positions: self.positions,
            has_next: self.has_next,
        }
    }
}

impl<T> IntoIterator for Window<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
