//! Offset pagination: page requests, slices and pages.
//!
//! A [`Slice`] knows whether a next page exists but not the total; a
//! [`Page`] additionally carries the total element count. Whether that total
//! came from a count query or was inferred is decided in the fluent layer.

use serde::{Deserialize, Serialize};

/// A page request: either unpaged (everything) or a 0-based page of a fixed
/// size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pageable {
    Unpaged,
    Paged { page: u64, size: u64 },
}

impl Pageable {
    /// First page of the given size.
    pub fn of_size(size: u64) -> Self {
        Pageable::Paged { page: 0, size }
    }

    pub fn page(page: u64, size: u64) -> Self {
        Pageable::Paged { page, size }
    }

    pub fn is_paged(&self) -> bool {
        matches!(self, Pageable::Paged { .. })
    }

    /// Absolute row offset of this request; 0 when unpaged.
    pub fn offset(&self) -> u64 {
        match self {
            Pageable::Unpaged => 0,
            Pageable::Paged { page, size } => page * size,
        }
    }

    pub fn size(&self) -> Option<u64> {
        match self {
            Pageable::Unpaged => None,
            Pageable::Paged { size, .. } => Some(*size),
        }
    }

    /// The request for the page after this one.
    pub fn next(&self) -> Self {
        match self {
            Pageable::Unpaged => Pageable::Unpaged,
            Pageable::Paged { page, size } => Pageable::Paged {
                page: page + 1,
                size: *size,
            },
        }
    }
}

/// A chunk of results with a has-next flag but no total.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    items: Vec<T>,
    has_next: bool,
    pageable: Pageable,
}

impl<T> Slice<T> {
    pub fn new(items: Vec<T>, has_next: bool, pageable: Pageable) -> Self {
        Self {
            items,
            has_next,
            pageable,
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

    pub fn pageable(&self) -> Pageable {
        self.pageable
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            items: self.items.into_iter().map(f).collect(),
            has_next: self.has_next,
            pageable: self.pageable,
        }
    }
}

impl<T> IntoIterator for Slice<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// A chunk of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    total: u64,
    pageable: Pageable,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pageable: Pageable) -> Self {
        Self {
            items,
            total,
            pageable,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn total_elements(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u64 {
        match self.pageable.size() {
            None | Some(0) => 1,
            Some(size) => self.total.div_ceil(size),
        }
    }

    pub fn has_next(&self) -> bool {
        self.pageable.offset() + (self.items.len() as u64) < self.total
    }

    pub fn pageable(&self) -> Pageable {
        self.pageable
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pageable: self.pageable,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
