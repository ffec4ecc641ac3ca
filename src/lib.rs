//! # Quarry
//!
//! Repository and query-execution core over an opaque, blocking persistence
//! provider. Builds specification-driven selects with `sea-query`, supports
//! offset and keyset scrolling in both directions, binds named/positional
//! parameters into hand-written queries, and carries per-method lock/hint
//! metadata onto every statement it issues.
//!
//! See [README on GitHub](https://github.com/microscaler/quarry) for the full tour.

pub mod binder;
pub mod entity;
pub mod error;
pub mod executor;
pub mod fluent;
pub mod keyset;
pub mod metadata;
pub mod page;
pub mod procedure;
pub mod repository;
pub mod scroll;
pub mod sort;
pub mod specification;
pub mod value;

pub use error::QuarryError;
pub use executor::{FromRow, QueryExecutor, Row, Statement};
pub use fluent::{FluentSelect, ProjectedRow};
pub use page::{Page, Pageable, Slice};
pub use repository::{EntityKey, SimpleRepository};
pub use scroll::{ScrollDirection, ScrollPosition, Window};
pub use sort::{Direction, Sort, SortOrder};
pub use specification::{EntityRoot, Specification};

pub use sea_query;
